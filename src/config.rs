use std::path::PathBuf;

/// Server-wide configuration, loaded from the environment at startup.
///
/// Holds the listening port and backlog plus the ambient values any
/// concrete deployment needs (store path, required-agencies count, batch
/// size bound).
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub listen_backlog: u32,
    pub required_agencies: u32,
    pub store_path: PathBuf,
    pub max_batch_bytes: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 12345,
            listen_backlog: 1024,
            required_agencies: 5,
            store_path: PathBuf::from("bets.csv"),
            max_batch_bytes: 8 * 1024,
        }
    }
}

impl Config {
    /// Loads configuration from the environment, falling back to defaults
    /// for anything unset or unparseable.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let port = std::env::var("SERVER_PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.port);

        let listen_backlog = std::env::var("SERVER_LISTEN_BACKLOG")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.listen_backlog);

        let required_agencies = std::env::var("SERVER_REQUIRED_AGENCIES")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.required_agencies);

        let store_path = std::env::var("SERVER_STORE_PATH")
            .ok()
            .map(PathBuf::from)
            .unwrap_or(defaults.store_path);

        let max_batch_bytes = std::env::var("SERVER_MAX_BATCH_BYTES")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.max_batch_bytes);

        Self {
            port,
            listen_backlog,
            required_agencies,
            store_path,
            max_batch_bytes,
        }
    }

    pub fn addr(&self) -> String {
        format!("0.0.0.0:{}", self.port)
    }
}
