//! Google Drive API connector implementation
//!
//! Implements the `ObjectStore` trait for Google Drive API v3.

use async_trait::async_trait;
use bridge_traits::error::Result;
use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest, HttpResponse, RetryPolicy};
use bridge_traits::storage::{FileSystemAccess, ObjectStore, StagedObject};
use bytes::{BufMut, Bytes, BytesMut};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use crate::error::GoogleDriveError;
use crate::types::{DriveFile, ErrorResponse, FileMetadata, PermissionRequest};

/// Google APIs host for metadata calls
const DRIVE_API_BASE: &str = "https://www.googleapis.com";

/// Public download link for a shared file
const PUBLIC_DOWNLOAD_BASE: &str = "https://drive.google.com/uc?export=download&id=";

/// Drive-backed staging storage
///
/// # Example
///
/// ```ignore
/// use provider_google_drive::DriveObjectStore;
///
/// let store = DriveObjectStore::new(http_client, fs, access_token, Some(folder_id));
/// let staged = store.upload(Path::new("/uploads/report.pdf")).await?;
/// // staged.url is fetchable without credentials
/// store.delete(&staged.key).await?;
/// ```
pub struct DriveObjectStore {
    http_client: Arc<dyn HttpClient>,
    fs: Arc<dyn FileSystemAccess>,
    access_token: String,
    folder_id: Option<String>,
    api_base: String,
    timeout: Duration,
}

impl DriveObjectStore {
    /// Create a new Drive store
    ///
    /// # Arguments
    ///
    /// * `http_client` - HTTP client implementation
    /// * `fs` - File system used to read local files
    /// * `access_token` - OAuth 2.0 access token with `drive.file` scope
    /// * `folder_id` - Folder uploads are placed in; drive root when `None`
    pub fn new(
        http_client: Arc<dyn HttpClient>,
        fs: Arc<dyn FileSystemAccess>,
        access_token: String,
        folder_id: Option<String>,
    ) -> Self {
        Self {
            http_client,
            fs,
            access_token,
            folder_id,
            api_base: DRIVE_API_BASE.to_string(),
            timeout: Duration::from_secs(30),
        }
    }

    /// Point the store at a different API host
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn public_url(file_id: &str) -> String {
        format!("{}{}", PUBLIC_DOWNLOAD_BASE, file_id)
    }

    fn request(&self, method: HttpMethod, url: String) -> HttpRequest {
        HttpRequest::new(method, url)
            .bearer_token(&self.access_token)
            .timeout(self.timeout)
    }

    /// Build a `multipart/related` body: JSON metadata part, then the media part
    fn multipart_body(boundary: &str, metadata: &[u8], mime_type: &str, data: &[u8]) -> Bytes {
        let mut body = BytesMut::with_capacity(metadata.len() + data.len() + 256);
        body.put_slice(format!("--{}\r\n", boundary).as_bytes());
        body.put_slice(b"Content-Type: application/json; charset=UTF-8\r\n\r\n");
        body.put_slice(metadata);
        body.put_slice(format!("\r\n--{}\r\n", boundary).as_bytes());
        body.put_slice(format!("Content-Type: {}\r\n\r\n", mime_type).as_bytes());
        body.put_slice(data);
        body.put_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());
        body.freeze()
    }

    fn error_from_response(response: &HttpResponse) -> GoogleDriveError {
        let message = match serde_json::from_slice::<ErrorResponse>(&response.body) {
            Ok(parsed) => parsed.error.message,
            Err(_) => String::from_utf8_lossy(&response.body).trim().to_string(),
        };
        GoogleDriveError::from_status(response.status, message)
    }

    /// Retrying send for idempotent calls
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        self.http_client
            .execute_with_retry(request, RetryPolicy::default())
            .await
    }

    /// Upload bytes with metadata and return the created file ID
    async fn create_file(&self, filename: &str, mime_type: &str, data: &[u8]) -> Result<String> {
        let metadata = serde_json::to_vec(&FileMetadata {
            name: filename,
            parents: self.folder_id.iter().map(String::as_str).collect(),
        })
        .map_err(|e| GoogleDriveError::ParseError(e.to_string()))?;

        let boundary = format!("attachment_sync_{}", uuid::Uuid::new_v4().simple());
        let url = format!(
            "{}/upload/drive/v3/files?uploadType=multipart&fields=id,name",
            self.api_base
        );
        let request = self
            .request(HttpMethod::Post, url)
            .header(
                "Content-Type",
                format!("multipart/related; boundary={}", boundary),
            )
            .body(Self::multipart_body(&boundary, &metadata, mime_type, data));

        // Single attempt: a repeated create leaves a second file behind.
        let response = self.http_client.execute(request).await?;
        if !response.is_success() {
            return Err(Self::error_from_response(&response).into());
        }

        let file: DriveFile = response
            .json()
            .map_err(|e| GoogleDriveError::ParseError(e.to_string()))?;
        Ok(file.id)
    }

    /// Make the file readable by anyone holding the link
    async fn share_publicly(&self, file_id: &str) -> Result<()> {
        let url = format!("{}/drive/v3/files/{}/permissions", self.api_base, file_id);
        let request = self
            .request(HttpMethod::Post, url)
            .json(&PermissionRequest::public_reader())?;

        let response = self.execute(request).await?;
        if !response.is_success() {
            return Err(GoogleDriveError::PermissionFailed {
                file_id: file_id.to_string(),
                message: Self::error_from_response(&response).to_string(),
            }
            .into());
        }
        Ok(())
    }
}

#[async_trait]
impl ObjectStore for DriveObjectStore {
    fn name(&self) -> &'static str {
        "drive"
    }

    #[instrument(skip(self), fields(store = "drive"))]
    async fn upload(&self, local_path: &Path) -> Result<StagedObject> {
        let filename = local_path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| GoogleDriveError::InvalidFile(local_path.display().to_string()))?
            .to_string();
        let mime_type = mime_guess::from_path(local_path).first_or_octet_stream();
        let data = self.fs.read_file(local_path).await?;

        debug!(
            filename = %filename,
            mime_type = %mime_type,
            size = data.len(),
            "Uploading file to Drive"
        );
        let file_id = self
            .create_file(&filename, mime_type.essence_str(), &data)
            .await?;

        if let Err(e) = self.share_publicly(&file_id).await {
            warn!(file_id = %file_id, error = %e, "Sharing failed, removing uploaded file");
            if let Err(cleanup) = self.delete(&file_id).await {
                warn!(file_id = %file_id, error = %cleanup, "Failed to remove unshared file");
            }
            return Err(e);
        }

        info!(filename = %filename, file_id = %file_id, "Staged file on Drive");
        Ok(StagedObject {
            url: Self::public_url(&file_id),
            key: file_id,
        })
    }

    #[instrument(skip(self), fields(store = "drive"))]
    async fn delete(&self, key: &str) -> Result<()> {
        let url = format!("{}/drive/v3/files/{}", self.api_base, key);
        let response = self.execute(self.request(HttpMethod::Delete, url)).await?;

        match response.status {
            status if (200..300).contains(&status) => {
                debug!(file_id = %key, "Deleted staged file");
                Ok(())
            }
            404 => {
                debug!(file_id = %key, "Staged file already gone");
                Ok(())
            }
            _ => Err(Self::error_from_response(&response).into()),
        }
    }
}
