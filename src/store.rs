use std::path::{Path, PathBuf};

use tokio::fs::OpenOptions;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::Mutex;

use crate::bet::Bet;
use crate::error::ServerError;

/// Append-only, file-backed persistence layer for bets.
///
/// A single process-wide lock surrounds both `append` and `scan` in their
/// entirety: readers during the winners phase must see the complete
/// submitted dataset, and no agency sends both bets and a winners request
/// at the same time, so contention under this single lock is benign. The
/// lock wraps no shared file handle — each operation opens the file itself
/// — so the mutex's scope is visibly the critical section.
pub struct FileBetStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileBetStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Atomically (with respect to concurrent appenders) appends all given
    /// bets, in order. Creates the backing file on first use.
    pub async fn append(&self, bets: &[Bet]) -> Result<(), ServerError> {
        let _guard = self.lock.lock().await;

        let mut file = OpenOptions::new()
            .append(true)
            .create(true)
            .open(&self.path)
            .await
            .map_err(ServerError::Io)?;

        let mut buf = String::new();
        for bet in bets {
            buf.push_str(&bet.to_line());
            buf.push('\n');
        }

        file.write_all(buf.as_bytes()).await.map_err(ServerError::Io)?;
        file.flush().await.map_err(ServerError::Io)?;
        Ok(())
    }

    /// Produces every bet appended so far, in append order. Held under the
    /// same lock as `append` so a winners scan sees the full dataset.
    pub async fn scan(&self) -> Result<Vec<Bet>, ServerError> {
        let _guard = self.lock.lock().await;

        let file = match OpenOptions::new().read(true).open(&self.path).await {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(ServerError::Io(e)),
        };

        let mut lines = BufReader::new(file).lines();
        let mut bets = Vec::new();
        while let Some(line) = lines.next_line().await.map_err(ServerError::Io)? {
            if line.is_empty() {
                continue;
            }
            let bet = Bet::from_line(&line)
                .map_err(|e| ServerError::Scan(format!("unreadable store line: {e}")))?;
            bets.push(bet);
        }
        Ok(bets)
    }
}
