use thiserror::Error;

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Bridge capability not available: {0}")]
    NotAvailable(String),

    #[error("Bridge operation failed: {0}")]
    OperationFailed(String),

    /// The remote service answered with an error payload.
    #[error("Remote service error: {0}")]
    Remote(String),

    #[error("{operation} failed after {attempts} attempts (last status: {})", last_status.map(|s| s.to_string()).unwrap_or_else(|| "none".to_string()))]
    RetriesExhausted {
        operation: String,
        attempts: u32,
        last_status: Option<u16>,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, BridgeError>;
