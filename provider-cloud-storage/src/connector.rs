//! Google Cloud Storage JSON API connector

use async_trait::async_trait;
use bridge_traits::error::Result;
use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest, HttpResponse, RetryPolicy};
use bridge_traits::storage::{FileSystemAccess, ObjectStore, StagedObject};
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument};

use crate::error::CloudStorageError;

const STORAGE_API_BASE: &str = "https://storage.googleapis.com";

const PUBLIC_BASE: &str = "https://storage.googleapis.com";

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
}

/// Bucket-backed staging storage
pub struct BucketObjectStore {
    http_client: Arc<dyn HttpClient>,
    fs: Arc<dyn FileSystemAccess>,
    bucket: String,
    prefix: Option<String>,
    access_token: String,
    api_base: String,
    timeout: Duration,
}

impl BucketObjectStore {
    pub fn new(
        http_client: Arc<dyn HttpClient>,
        fs: Arc<dyn FileSystemAccess>,
        bucket: String,
        prefix: Option<String>,
        access_token: String,
    ) -> Self {
        Self {
            http_client,
            fs,
            bucket,
            prefix: prefix
                .map(|p| p.trim_matches('/').to_string())
                .filter(|p| !p.is_empty()),
            access_token,
            api_base: STORAGE_API_BASE.to_string(),
            timeout: Duration::from_secs(30),
        }
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Object name for a local file name
    fn object_key(&self, filename: &str) -> String {
        match &self.prefix {
            Some(prefix) => format!("{}/{}", prefix, filename),
            None => filename.to_string(),
        }
    }

    /// Public URL; each path segment is encoded but `/` separators are kept
    fn public_url(&self, key: &str) -> String {
        let encoded: Vec<String> = key
            .split('/')
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect();
        format!("{}/{}/{}", PUBLIC_BASE, self.bucket, encoded.join("/"))
    }

    fn request(&self, method: HttpMethod, url: String) -> HttpRequest {
        HttpRequest::new(method, url)
            .bearer_token(&self.access_token)
            .timeout(self.timeout)
    }

    fn error_from_response(response: &HttpResponse) -> CloudStorageError {
        let message = match serde_json::from_slice::<ErrorResponse>(&response.body) {
            Ok(parsed) => parsed.error.message,
            Err(_) => String::from_utf8_lossy(&response.body).trim().to_string(),
        };
        CloudStorageError::from_status(response.status, message)
    }
}

#[async_trait]
impl ObjectStore for BucketObjectStore {
    fn name(&self) -> &'static str {
        "bucket"
    }

    #[instrument(skip(self), fields(store = "bucket", bucket = %self.bucket))]
    async fn upload(&self, local_path: &Path) -> Result<StagedObject> {
        let filename = local_path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| CloudStorageError::InvalidFile(local_path.display().to_string()))?;
        let key = self.object_key(filename);
        let mime_type = mime_guess::from_path(local_path).first_or_octet_stream();
        let data = self.fs.read_file(local_path).await?;

        let url = format!(
            "{}/upload/storage/v1/b/{}/o?uploadType=media&name={}",
            self.api_base,
            self.bucket,
            urlencoding::encode(&key)
        );
        debug!(key = %key, size = data.len(), "Uploading object");

        let request = self
            .request(HttpMethod::Post, url)
            .header("Content-Type", mime_type.essence_str())
            .body(data);
        // Uploads get one attempt; only deletes are retried.
        let response = self.http_client.execute(request).await?;

        if !response.is_success() {
            return Err(Self::error_from_response(&response).into());
        }

        info!(key = %key, "Staged object in bucket");
        Ok(StagedObject {
            url: self.public_url(&key),
            key,
        })
    }

    #[instrument(skip(self), fields(store = "bucket", bucket = %self.bucket))]
    async fn delete(&self, key: &str) -> Result<()> {
        let url = format!(
            "{}/storage/v1/b/{}/o/{}",
            self.api_base,
            self.bucket,
            urlencoding::encode(key)
        );
        let response = self
            .http_client
            .execute_with_retry(self.request(HttpMethod::Delete, url), RetryPolicy::default())
            .await?;

        if response.is_success() || response.status == 404 {
            debug!(key = %key, status = response.status, "Removed staged object");
            Ok(())
        } else {
            Err(Self::error_from_response(&response).into())
        }
    }
}
