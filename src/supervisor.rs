use std::net::SocketAddr;
use std::sync::Arc;

use socket2::{Domain, Socket, Type};
use tokio::net::TcpListener;
use tokio::task::JoinSet;
use tracing::{error, info};

use crate::config::Config;
use crate::coordinator::NotificationSet;
use crate::session;
use crate::store::FileBetStore;

/// Builds the listening socket by hand so the configured backlog actually
/// reaches the kernel's accept queue, then hands it off to tokio.
fn bind_listener(addr: &str, backlog: u32) -> Result<TcpListener, std::io::Error> {
    let addr: SocketAddr = addr
        .parse()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;

    let socket = Socket::new(Domain::for_address(addr), Type::STREAM, None)?;
    socket.set_reuse_address(true)?;
    socket.bind(&addr.into())?;
    socket.listen(backlog as i32)?;
    socket.set_nonblocking(true)?;

    TcpListener::from_std(socket.into())
}

/// Owns the listening socket, accepts connections, spawns session handlers,
/// and tracks them for graceful shutdown.
pub struct Supervisor {
    listener: TcpListener,
    store: Arc<FileBetStore>,
    coordinator: Arc<NotificationSet>,
    config: Arc<Config>,
    sessions: JoinSet<()>,
}

impl Supervisor {
    pub async fn bind(config: Config) -> Result<Self, std::io::Error> {
        let listener = bind_listener(&config.addr(), config.listen_backlog)?;
        info!(action = "bind", result = "success", addr = %config.addr(), backlog = config.listen_backlog);
        Ok(Self {
            listener,
            store: Arc::new(FileBetStore::new(config.store_path.clone())),
            coordinator: Arc::new(NotificationSet::new(config.required_agencies)),
            config: Arc::new(config),
            sessions: JoinSet::new(),
        })
    }

    /// Accepts connections and spawns a session task per connection until
    /// `shutdown` resolves, then closes the listener, aborts every live
    /// session, and waits for them all to finish.
    pub async fn run(mut self, shutdown: impl std::future::Future<Output = ()>) {
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                accepted = self.listener.accept() => {
                    match accepted {
                        Ok((stream, peer_addr)) => {
                            info!(action = "accept_connections", result = "success", ip = %peer_addr.ip());
                            let store = self.store.clone();
                            let coordinator = self.coordinator.clone();
                            let config = self.config.clone();
                            self.sessions.spawn(async move {
                                session::handle_session(stream, peer_addr, store, coordinator, config).await;
                            });
                        }
                        Err(e) => {
                            error!(action = "accept_connections", result = "fail", error = %e);
                        }
                    }
                }
                _ = &mut shutdown => {
                    info!(action = "graceful_shutdown", result = "in_progress");
                    break;
                }
            }
        }

        // Drop the listener explicitly: any in-progress accept fails and no
        // new connection can be accepted.
        drop(self.listener);

        self.sessions.abort_all();
        while self.sessions.join_next().await.is_some() {}

        info!(action = "graceful_shutdown", result = "success");
    }
}
