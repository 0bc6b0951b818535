//! Error types for Google Drive provider

use bridge_traits::error::BridgeError;
use thiserror::Error;

/// Google Drive provider errors
#[derive(Error, Debug)]
pub enum GoogleDriveError {
    /// Authentication failed or token is invalid
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// API request returned an error
    #[error("Google Drive API error (status {status_code}): {message}")]
    ApiError { status_code: u16, message: String },

    /// The local path has no usable file name
    #[error("Invalid local file: {0}")]
    InvalidFile(String),

    /// Failed to parse API response
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// The file was uploaded but could not be shared
    #[error("Failed to share file {file_id}: {message}")]
    PermissionFailed { file_id: String, message: String },

    /// Bridge error
    #[error(transparent)]
    BridgeError(#[from] BridgeError),
}

/// Result type for Google Drive operations
pub type Result<T> = std::result::Result<T, GoogleDriveError>;

impl GoogleDriveError {
    /// Classify a non-success HTTP response
    pub fn from_status(status_code: u16, message: String) -> Self {
        match status_code {
            401 | 403 => GoogleDriveError::AuthenticationFailed(message),
            _ => GoogleDriveError::ApiError {
                status_code,
                message,
            },
        }
    }
}

impl From<GoogleDriveError> for BridgeError {
    fn from(error: GoogleDriveError) -> Self {
        match error {
            GoogleDriveError::BridgeError(e) => e,
            other => BridgeError::OperationFailed(format!("Drive storage: {}", other)),
        }
    }
}
