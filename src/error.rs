use thiserror::Error;

/// The five error kinds a session can terminate on.
///
/// Every variant is handled at a single close-and-log point in the session
/// handler; none of them propagate out to the supervisor.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("unexpected end of stream")]
    UnexpectedEof,

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("store scan error: {0}")]
    Scan(String),
}

impl ServerError {
    /// Coarse label used in structured log lines (`action: X | result: fail | error: ...`).
    pub fn kind(&self) -> &'static str {
        match self {
            ServerError::Io(_) => "io_error",
            ServerError::UnexpectedEof => "unexpected_eof",
            ServerError::Protocol(_) => "protocol_error",
            ServerError::Parse(_) => "parse_error",
            ServerError::Scan(_) => "scan_error",
        }
    }
}
