//! Google Drive API request and response types

use serde::{Deserialize, Serialize};

/// Metadata part of a multipart upload
///
/// See: https://developers.google.com/drive/api/v3/reference/files/create
#[derive(Debug, Clone, Serialize)]
pub struct FileMetadata<'a> {
    pub name: &'a str,

    /// Parent folder IDs; omitted to upload into the drive root
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub parents: Vec<&'a str>,
}

/// File resource returned by `files.create` with `fields=id,name`
#[derive(Debug, Clone, Deserialize)]
pub struct DriveFile {
    pub id: String,

    #[serde(default)]
    pub name: Option<String>,
}

/// Body of `permissions.create`
///
/// See: https://developers.google.com/drive/api/v3/reference/permissions/create
#[derive(Debug, Clone, Serialize)]
pub struct PermissionRequest {
    pub role: &'static str,

    #[serde(rename = "type")]
    pub grantee_type: &'static str,
}

impl PermissionRequest {
    /// Anyone with the link can read
    pub fn public_reader() -> Self {
        Self {
            role: "reader",
            grantee_type: "anyone",
        }
    }
}

/// Error envelope returned by Google APIs
#[derive(Debug, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub code: Option<u16>,
    #[serde(default)]
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_metadata_omits_empty_parents() {
        let root = serde_json::to_value(FileMetadata {
            name: "a.png",
            parents: vec![],
        })
        .unwrap();
        assert_eq!(root, json!({"name": "a.png"}));

        let nested = serde_json::to_value(FileMetadata {
            name: "a.png",
            parents: vec!["folder1"],
        })
        .unwrap();
        assert_eq!(nested, json!({"name": "a.png", "parents": ["folder1"]}));
    }

    #[test]
    fn test_permission_request() {
        let body = serde_json::to_value(PermissionRequest::public_reader()).unwrap();
        assert_eq!(body, json!({"role": "reader", "type": "anyone"}));
    }

    #[test]
    fn test_deserialize_error_response() {
        let response: ErrorResponse = serde_json::from_value(json!({
            "error": {"code": 403, "message": "Insufficient Permission", "errors": []}
        }))
        .unwrap();
        assert_eq!(response.error.code, Some(403));
        assert_eq!(response.error.message, "Insufficient Permission");
    }

    #[test]
    fn test_deserialize_drive_file() {
        let file: DriveFile = serde_json::from_value(json!({"id": "abc123", "name": "a.png"})).unwrap();
        assert_eq!(file.id, "abc123");
        assert_eq!(file.name.as_deref(), Some("a.png"));
    }
}
