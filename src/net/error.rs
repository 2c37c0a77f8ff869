use thiserror::Error;

/// Errors from the listener.
#[derive(Debug, Error)]
pub enum NetError {
    /// Network I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The listen address cannot be used.
    #[error("invalid listen address: {0}")]
    InvalidAddress(std::net::SocketAddr),
}
