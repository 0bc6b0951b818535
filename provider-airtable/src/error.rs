//! Error types for the Airtable provider

use bridge_traits::error::BridgeError;
use thiserror::Error;

/// Airtable provider errors
#[derive(Error, Debug)]
pub enum AirtableError {
    /// The response body carried an `error` payload
    #[error("Airtable API error: {message}")]
    Api {
        kind: Option<String>,
        message: String,
    },

    /// Non-success status without a usable error payload
    #[error("Airtable request failed with status {status}: {body}")]
    Status { status: u16, body: String },

    /// Failed to parse API response
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Transport failure (connection, TLS, timeout)
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Bridge error
    #[error(transparent)]
    BridgeError(#[from] BridgeError),
}

/// Result type for Airtable operations
pub type Result<T> = std::result::Result<T, AirtableError>;

impl From<AirtableError> for BridgeError {
    fn from(error: AirtableError) -> Self {
        match error {
            AirtableError::Api { kind, message } => match kind {
                Some(kind) => BridgeError::Remote(format!("{}: {}", kind, message)),
                None => BridgeError::Remote(message),
            },
            AirtableError::Status { status, body } => {
                BridgeError::Remote(format!("HTTP {}: {}", status, body))
            }
            AirtableError::ParseError(msg) => {
                BridgeError::Remote(format!("Unreadable response: {}", msg))
            }
            AirtableError::NetworkError(msg) => BridgeError::Remote(format!("Network error: {}", msg)),
            AirtableError::BridgeError(e) => e,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = AirtableError::Status {
            status: 404,
            body: "NOT_FOUND".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Airtable request failed with status 404: NOT_FOUND"
        );
    }

    #[test]
    fn test_api_error_converts_to_remote() {
        let error = AirtableError::Api {
            kind: Some("LIST_RECORDS_ITERATOR_NOT_AVAILABLE".to_string()),
            message: "Iterator expired".to_string(),
        };
        match BridgeError::from(error) {
            BridgeError::Remote(msg) => {
                assert_eq!(msg, "LIST_RECORDS_ITERATOR_NOT_AVAILABLE: Iterator expired")
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_bridge_error_passes_through() {
        let inner = BridgeError::RetriesExhausted {
            operation: "create row".to_string(),
            attempts: 3,
            last_status: Some(500),
        };
        let converted: BridgeError = AirtableError::BridgeError(inner).into();
        assert!(matches!(converted, BridgeError::RetriesExhausted { .. }));
    }
}
