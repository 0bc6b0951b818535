//! Error types for the bucket storage provider

use bridge_traits::error::BridgeError;
use thiserror::Error;

/// Bucket storage errors
#[derive(Error, Debug)]
pub enum CloudStorageError {
    /// Token rejected or missing bucket permissions
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// API request returned an error
    #[error("Cloud Storage API error (status {status_code}): {message}")]
    ApiError { status_code: u16, message: String },

    /// The local path has no usable file name
    #[error("Invalid local file: {0}")]
    InvalidFile(String),

    #[error(transparent)]
    BridgeError(#[from] BridgeError),
}

/// Result type for bucket storage operations
pub type Result<T> = std::result::Result<T, CloudStorageError>;

impl CloudStorageError {
    pub fn from_status(status_code: u16, message: String) -> Self {
        match status_code {
            401 | 403 => CloudStorageError::AuthenticationFailed(message),
            _ => CloudStorageError::ApiError {
                status_code,
                message,
            },
        }
    }
}

impl From<CloudStorageError> for BridgeError {
    fn from(error: CloudStorageError) -> Self {
        match error {
            CloudStorageError::BridgeError(e) => e,
            other => BridgeError::OperationFailed(format!("Bucket storage: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_conversion() {
        let bridge: BridgeError = CloudStorageError::from_status(403, "denied".to_string()).into();
        match bridge {
            BridgeError::OperationFailed(msg) => {
                assert_eq!(msg, "Bucket storage: Authentication failed: denied")
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
