use bridge_traits::error::BridgeError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    /// Missing or invalid setting, detected before any remote call
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Not a directory: {}", path.display())]
    NotADirectory { path: PathBuf },

    /// The table service answered a read with an error payload
    #[error("Remote service error: {0}")]
    Remote(String),

    /// A row could not be created after retries
    #[error("Row write failed: {0}")]
    Write(String),

    /// Staging storage rejected an upload
    #[error("Storage error: {0}")]
    Storage(String),

    /// A prerequisite failed and the run cannot continue
    #[error("Fatal error: {0}")]
    Fatal(String),

    #[error("IO error: {0}")]
    Io(String),

    #[error("Invalid state transition from {from} to {to}")]
    InvalidStateTransition { from: String, to: String },
}

impl From<core_runtime::Error> for SyncError {
    fn from(error: core_runtime::Error) -> Self {
        SyncError::Config(error.to_string())
    }
}

impl SyncError {
    /// Classify a failed table read
    pub fn remote(error: BridgeError) -> Self {
        match error {
            BridgeError::Remote(msg) => SyncError::Remote(msg),
            other => SyncError::Remote(other.to_string()),
        }
    }

    /// Classify a failed row creation
    pub fn write(error: BridgeError) -> Self {
        SyncError::Write(error.to_string())
    }

    /// Classify a failed staging upload or file read
    pub fn storage(error: BridgeError) -> Self {
        match error {
            BridgeError::Io(e) => SyncError::Io(e.to_string()),
            other => SyncError::Storage(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;
