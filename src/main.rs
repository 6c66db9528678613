use lottery_server::{Config, Supervisor};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    }

    #[cfg(not(unix))]
    {
        std::future::pending::<()>().await;
    }
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lottery_server=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false).compact())
        .init();

    let config = Config::from_env();
    tracing::info!(
        action = "startup",
        result = "in_progress",
        port = config.port,
        required_agencies = config.required_agencies,
        store_path = %config.store_path.display(),
    );

    let supervisor = Supervisor::bind(config).await?;
    supervisor.run(shutdown_signal()).await;

    Ok(())
}
