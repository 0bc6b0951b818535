//! # Sync Configuration Module
//!
//! Provides the immutable configuration a sync run is driven by.
//!
//! ## Overview
//!
//! The configuration system uses a builder pattern to construct a
//! [`SyncConfig`]. Settings can be supplied programmatically or read from an
//! environment-style source (see [`SyncConfigBuilder::from_env`]). Validation
//! is fail-fast: a missing base, table or token is a configuration error
//! before any network call is made.
//!
//! ## Environment Variables
//!
//! | Variable | Meaning |
//! |----------|---------|
//! | `BASE_ID` | Base identifier (required) |
//! | `TABLE_ID` | Table ID or name (required) |
//! | `API_KEY` / `AIRTABLE_TOKEN` | Personal access token (required) |
//! | `VIEW_NAMES` / `VIEW_NAME` | Comma-separated views to read |
//! | `ATTACHMENT_FIELDS` | Comma-separated attachment fields to download from |
//! | `DESIRED_FILE_TYPES` | MIME allow-list for downloads |
//! | `DESIRED_FILE_EXTENSIONS` | Extension allow-list for downloads |
//! | `ORGANIZE_BY_DIRECTORY` | Put downloads in per-extension folders |
//! | `OUTPUT_DIRECTORY` | Download root |
//! | `GROUP_BY_FIELD` / `NAME_FIELD` | Per-row subfolder / file name source |
//! | `TARGET_FIELDS` | Fields stamped with the uploaded attachment |
//! | `DEFAULT_FIELD_VALUES` | JSON object merged into every created row |
//! | `UPLOAD_EXTENSIONS` | Extension allow-list for uploads |
//! | `VERIFY_UPLOADS` | Poll the table after upload |
//! | `STORAGE_PROVIDER` | `bucket` or `drive` |
//! | `STORAGE_BUCKET` / `STORAGE_PREFIX` / `DRIVE_FOLDER_ID` | Provider settings |
//! | `STORAGE_ACCESS_TOKEN` / `CREDENTIALS_PATH` | Storage token or a JSON file holding `access_token` |
//! | `REQUEST_TIMEOUT_SECS` | Per-request timeout (default 30) |
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::SyncConfig;
//!
//! let config = SyncConfig::builder()
//!     .base_id("appXXXXXXXXXXXXXX")
//!     .table_id("Documents")
//!     .api_key(token)
//!     .view_names(vec!["Grid view".to_string()])
//!     .build()?;
//! ```

use crate::error::{Error, Result};
use crate::logging::{redact_if_sensitive, strip_path};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

/// Default API host for the table service
pub const DEFAULT_API_BASE: &str = "https://api.airtable.com";

/// Default per-request timeout
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Interval between post-upload verification polls
pub const DEFAULT_VERIFY_INTERVAL: Duration = Duration::from_secs(5);

/// Extensions uploaded when no explicit allow-list is configured
pub const DEFAULT_UPLOAD_EXTENSIONS: &[&str] =
    &["png", "jpg", "jpeg", "gif", "pdf", "docx", "xlsx", "txt"];

/// Field stamped with the uploaded attachment when none is configured
pub const DEFAULT_TARGET_FIELD: &str = "Attachment";

/// Where the table lives and how to authenticate against it.
#[derive(Clone, PartialEq, Eq)]
pub struct TableConfig {
    pub base_id: String,
    /// Table ID or table name
    pub table_id: String,
    pub api_key: String,
    /// Scheme and host of the API, without trailing slash
    pub api_base: String,
    /// Views to read; empty means a single unscoped pass
    pub view_names: Vec<String>,
}

impl fmt::Debug for TableConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TableConfig")
            .field("base_id", &self.base_id)
            .field("table_id", &self.table_id)
            .field("api_key", &redact_if_sensitive("api_key", &self.api_key))
            .field("api_base", &self.api_base)
            .field("view_names", &self.view_names)
            .finish()
    }
}

/// Allow-lists deciding which attachments are processed.
///
/// An empty set accepts everything. Extensions are stored lower-cased without
/// a leading dot; the empty string stands for "no extension".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterSpec {
    pub allowed_mime_types: BTreeSet<String>,
    pub allowed_extensions: BTreeSet<String>,
}

impl FilterSpec {
    pub fn new<M, E>(mime_types: M, extensions: E) -> Self
    where
        M: IntoIterator,
        M::Item: Into<String>,
        E: IntoIterator,
        E::Item: AsRef<str>,
    {
        Self {
            allowed_mime_types: mime_types
                .into_iter()
                .map(Into::into)
                .map(|m: String| m.trim().to_string())
                .filter(|m| !m.is_empty())
                .collect(),
            allowed_extensions: extensions
                .into_iter()
                .map(|e| Self::normalize_extension(e.as_ref()))
                .collect(),
        }
    }

    /// A filter that accepts every attachment
    pub fn accept_all() -> Self {
        Self::default()
    }

    /// A filter restricting extensions only
    pub fn with_extensions<E>(extensions: E) -> Self
    where
        E: IntoIterator,
        E::Item: AsRef<str>,
    {
        Self::new(Vec::<String>::new(), extensions)
    }

    /// `".PDF"` -> `"pdf"`
    pub fn normalize_extension(extension: &str) -> String {
        extension.trim().trim_start_matches('.').to_lowercase()
    }

    pub fn is_unrestricted(&self) -> bool {
        self.allowed_mime_types.is_empty() && self.allowed_extensions.is_empty()
    }
}

/// Options for download runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadOptions {
    /// Root directory downloads are written under
    pub output_dir: PathBuf,
    /// Fields to read attachments from; empty means every attachment field
    pub attachment_fields: Vec<String>,
    pub filter: FilterSpec,
    /// Write into `{output_dir}/{EXT}/` folders named by upper-cased extension
    pub organize_by_extension: bool,
    /// Field whose value names a per-row subfolder
    pub group_by_field: Option<String>,
    /// Field whose value (spaces removed) replaces the attachment's base name
    pub name_field: Option<String>,
}

impl Default for DownloadOptions {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("downloads"),
            attachment_fields: Vec::new(),
            filter: FilterSpec::accept_all(),
            organize_by_extension: true,
            group_by_field: None,
            name_field: None,
        }
    }
}

/// Options for upload runs.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadOptions {
    /// Fields stamped with a single-element attachment list
    pub target_fields: Vec<String>,
    /// Values merged into every created row
    pub default_field_values: Map<String, Value>,
    /// Which local files are eligible (extensions only)
    pub file_filter: FilterSpec,
    /// Poll the table after row creation until attachments show up
    pub verify: bool,
    pub verify_interval: Duration,
}

impl Default for UploadOptions {
    fn default() -> Self {
        Self {
            target_fields: vec![DEFAULT_TARGET_FIELD.to_string()],
            default_field_values: Map::new(),
            file_filter: FilterSpec::with_extensions(DEFAULT_UPLOAD_EXTENSIONS),
            verify: false,
            verify_interval: DEFAULT_VERIFY_INTERVAL,
        }
    }
}

/// Storage variants available for staging uploads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageKind {
    /// Bucket storage (Google Cloud Storage JSON API)
    Bucket,
    /// Drive storage (Google Drive v3)
    Drive,
}

impl StorageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageKind::Bucket => "bucket",
            StorageKind::Drive => "drive",
        }
    }
}

impl FromStr for StorageKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "bucket" | "gcs" | "cloud-storage" => Ok(StorageKind::Bucket),
            "drive" | "google-drive" | "gdrive" => Ok(StorageKind::Drive),
            other => Err(Error::Config(format!(
                "Unknown storage provider '{}'. Expected 'bucket' or 'drive'.",
                other
            ))),
        }
    }
}

impl fmt::Display for StorageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Resolved settings for the selected storage variant.
#[derive(Clone, PartialEq, Eq)]
pub enum StorageConfig {
    Bucket {
        bucket: String,
        prefix: Option<String>,
        access_token: String,
    },
    Drive {
        folder_id: Option<String>,
        access_token: String,
    },
}

impl StorageConfig {
    pub fn kind(&self) -> StorageKind {
        match self {
            StorageConfig::Bucket { .. } => StorageKind::Bucket,
            StorageConfig::Drive { .. } => StorageKind::Drive,
        }
    }
}

impl fmt::Debug for StorageConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageConfig::Bucket {
                bucket,
                prefix,
                access_token,
            } => f
                .debug_struct("Bucket")
                .field("bucket", bucket)
                .field("prefix", prefix)
                .field(
                    "access_token",
                    &redact_if_sensitive("access_token", access_token),
                )
                .finish(),
            StorageConfig::Drive {
                folder_id,
                access_token,
            } => f
                .debug_struct("Drive")
                .field("folder_id", folder_id)
                .field(
                    "access_token",
                    &redact_if_sensitive("access_token", access_token),
                )
                .finish(),
        }
    }
}

/// Immutable configuration for one sync run.
///
/// Use [`SyncConfigBuilder`] to construct instances.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncConfig {
    pub table: TableConfig,
    pub download: DownloadOptions,
    pub upload: UploadOptions,
    /// Storage used to stage uploads; required for upload runs only
    pub storage: Option<StorageConfig>,
    pub request_timeout: Duration,
}

impl SyncConfig {
    pub fn builder() -> SyncConfigBuilder {
        SyncConfigBuilder::default()
    }

    /// Validates the configuration and returns an error if invalid.
    pub fn validate(&self) -> Result<()> {
        if self.request_timeout.is_zero() {
            return Err(Error::Config(
                "Request timeout must be greater than 0 seconds".to_string(),
            ));
        }

        if self.upload.verify_interval.is_zero() {
            return Err(Error::Config(
                "Verification interval must be greater than 0 seconds".to_string(),
            ));
        }

        if self.upload.target_fields.iter().any(|f| f.trim().is_empty()) {
            return Err(Error::Config(
                "Target field names cannot be empty".to_string(),
            ));
        }

        if !self.table.api_base.starts_with("http://") && !self.table.api_base.starts_with("https://")
        {
            return Err(Error::Config(format!(
                "API base '{}' must start with http:// or https://",
                self.table.api_base
            )));
        }

        Ok(())
    }

    /// The storage settings, or a configuration error naming what is missing.
    pub fn require_storage(&self) -> Result<&StorageConfig> {
        self.storage.as_ref().ok_or_else(|| {
            Error::Config(
                "Uploads need staging storage. Set STORAGE_PROVIDER to 'bucket' or 'drive'."
                    .to_string(),
            )
        })
    }
}

#[derive(Deserialize)]
struct CredentialsFile {
    access_token: String,
}

/// Read an access token from a credentials file.
///
/// Accepts a JSON object with an `access_token` field, or a file holding only
/// the token.
pub fn read_access_token(path: &Path) -> Result<String> {
    let contents = std::fs::read_to_string(path).map_err(|e| {
        Error::Config(format!(
            "Cannot read credentials file {}: {}",
            path.display(),
            e
        ))
    })?;

    let token = match serde_json::from_str::<CredentialsFile>(&contents) {
        Ok(file) => file.access_token,
        Err(_) if !contents.trim_start().starts_with('{') => contents.trim().to_string(),
        Err(e) => {
            return Err(Error::Config(format!(
                "Credentials file {} has no usable access_token: {}",
                path.display(),
                e
            )))
        }
    };

    if token.trim().is_empty() {
        return Err(Error::Config(format!(
            "Credentials file {} contains an empty token",
            path.display()
        )));
    }
    debug!(
        file = %strip_path(&path.to_string_lossy()),
        "Loaded storage access token"
    );
    Ok(token.trim().to_string())
}

fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Like [`parse_list`], but `.` or `""` stands for files without an extension.
fn parse_extension_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter_map(|s| match s {
            "" => None,
            "\"\"" | "''" => Some(String::new()),
            other => Some(other.to_string()),
        })
        .collect()
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(Error::Config(format!(
            "{} must be a boolean, got '{}'",
            key, other
        ))),
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Builder for constructing [`SyncConfig`] instances.
#[derive(Debug, Default, Clone)]
pub struct SyncConfigBuilder {
    base_id: Option<String>,
    table_id: Option<String>,
    api_key: Option<String>,
    api_base: Option<String>,
    view_names: Vec<String>,
    download: DownloadOptions,
    upload: UploadOptions,
    storage_kind: Option<StorageKind>,
    storage_bucket: Option<String>,
    storage_prefix: Option<String>,
    drive_folder_id: Option<String>,
    storage_access_token: Option<String>,
    credentials_path: Option<PathBuf>,
    request_timeout: Option<Duration>,
}

impl SyncConfigBuilder {
    /// Seed a builder from the process environment.
    ///
    /// Call `dotenvy::dotenv()` first if values should also come from a
    /// `.env` file.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Seed a builder from an arbitrary key/value source.
    ///
    /// Only malformed values are errors here; missing required values are
    /// reported by [`build`](Self::build).
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| non_empty(lookup(key));
        let mut builder = Self::default();

        builder.base_id = get("BASE_ID");
        builder.table_id = get("TABLE_ID");
        builder.api_key = get("API_KEY").or_else(|| get("AIRTABLE_TOKEN"));
        builder.api_base = get("AIRTABLE_API_BASE");

        if let Some(views) = get("VIEW_NAMES").or_else(|| get("VIEW_NAME")) {
            builder.view_names = parse_list(&views);
        }

        if let Some(fields) = get("ATTACHMENT_FIELDS") {
            builder.download.attachment_fields = parse_list(&fields);
        }
        let mime_types = get("DESIRED_FILE_TYPES")
            .map(|v| parse_list(&v))
            .unwrap_or_default();
        let extensions = get("DESIRED_FILE_EXTENSIONS")
            .map(|v| parse_extension_list(&v))
            .unwrap_or_default();
        builder.download.filter = FilterSpec::new(mime_types, extensions);
        if let Some(value) = get("ORGANIZE_BY_DIRECTORY") {
            builder.download.organize_by_extension = parse_bool("ORGANIZE_BY_DIRECTORY", &value)?;
        }
        if let Some(dir) = get("OUTPUT_DIRECTORY") {
            builder.download.output_dir = PathBuf::from(dir);
        }
        builder.download.group_by_field = get("GROUP_BY_FIELD");
        builder.download.name_field = get("NAME_FIELD");

        if let Some(fields) = get("TARGET_FIELDS") {
            builder.upload.target_fields = parse_list(&fields);
        }
        if let Some(json) = get("DEFAULT_FIELD_VALUES") {
            builder.upload.default_field_values = serde_json::from_str(&json).map_err(|e| {
                Error::Config(format!("DEFAULT_FIELD_VALUES must be a JSON object: {}", e))
            })?;
        }
        if let Some(extensions) = lookup("UPLOAD_EXTENSIONS") {
            builder.upload.file_filter = if extensions.trim() == "*" {
                FilterSpec::accept_all()
            } else {
                FilterSpec::with_extensions(parse_extension_list(&extensions))
            };
        }
        if let Some(value) = get("VERIFY_UPLOADS") {
            builder.upload.verify = parse_bool("VERIFY_UPLOADS", &value)?;
        }

        if let Some(kind) = get("STORAGE_PROVIDER") {
            builder.storage_kind = Some(kind.parse()?);
        }
        builder.storage_bucket = get("STORAGE_BUCKET");
        builder.storage_prefix = get("STORAGE_PREFIX");
        builder.drive_folder_id = get("DRIVE_FOLDER_ID");
        builder.storage_access_token = get("STORAGE_ACCESS_TOKEN");
        builder.credentials_path = get("CREDENTIALS_PATH").map(PathBuf::from);

        if let Some(secs) = get("REQUEST_TIMEOUT_SECS") {
            let secs: u64 = secs.parse().map_err(|_| {
                Error::Config(format!(
                    "REQUEST_TIMEOUT_SECS must be a whole number of seconds, got '{}'",
                    secs
                ))
            })?;
            builder.request_timeout = Some(Duration::from_secs(secs));
        }

        Ok(builder)
    }

    pub fn base_id(mut self, base_id: impl Into<String>) -> Self {
        self.base_id = Some(base_id.into());
        self
    }

    pub fn table_id(mut self, table_id: impl Into<String>) -> Self {
        self.table_id = Some(table_id.into());
        self
    }

    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Overrides the API host (used by tests against a local server)
    pub fn api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = Some(api_base.into());
        self
    }

    pub fn view_names(mut self, view_names: Vec<String>) -> Self {
        self.view_names = view_names;
        self
    }

    pub fn download(mut self, options: DownloadOptions) -> Self {
        self.download = options;
        self
    }

    pub fn upload(mut self, options: UploadOptions) -> Self {
        self.upload = options;
        self
    }

    pub fn output_dir<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.download.output_dir = path.into();
        self
    }

    pub fn attachment_fields(mut self, fields: Vec<String>) -> Self {
        self.download.attachment_fields = fields;
        self
    }

    pub fn download_filter(mut self, filter: FilterSpec) -> Self {
        self.download.filter = filter;
        self
    }

    pub fn organize_by_extension(mut self, enabled: bool) -> Self {
        self.download.organize_by_extension = enabled;
        self
    }

    pub fn target_fields(mut self, fields: Vec<String>) -> Self {
        self.upload.target_fields = fields;
        self
    }

    pub fn default_field_values(mut self, values: Map<String, Value>) -> Self {
        self.upload.default_field_values = values;
        self
    }

    pub fn verify_uploads(mut self, enabled: bool) -> Self {
        self.upload.verify = enabled;
        self
    }

    pub fn storage_kind(mut self, kind: StorageKind) -> Self {
        self.storage_kind = Some(kind);
        self
    }

    pub fn storage_bucket(mut self, bucket: impl Into<String>) -> Self {
        self.storage_bucket = Some(bucket.into());
        self
    }

    pub fn storage_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.storage_prefix = Some(prefix.into());
        self
    }

    pub fn drive_folder_id(mut self, folder_id: impl Into<String>) -> Self {
        self.drive_folder_id = Some(folder_id.into());
        self
    }

    pub fn storage_access_token(mut self, token: impl Into<String>) -> Self {
        self.storage_access_token = Some(token.into());
        self
    }

    pub fn credentials_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.credentials_path = Some(path.into());
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    fn resolve_storage(&self) -> Result<Option<StorageConfig>> {
        let Some(kind) = self.storage_kind else {
            return Ok(None);
        };

        let access_token = match (non_empty(self.storage_access_token.clone()), &self.credentials_path) {
            (Some(token), _) => token,
            (None, Some(path)) => read_access_token(path)?,
            (None, None) => {
                return Err(Error::Config(format!(
                    "Storage provider '{}' needs STORAGE_ACCESS_TOKEN or CREDENTIALS_PATH",
                    kind
                )))
            }
        };

        let storage = match kind {
            StorageKind::Bucket => {
                let bucket = non_empty(self.storage_bucket.clone()).ok_or_else(|| {
                    Error::Config(
                        "Storage provider 'bucket' needs STORAGE_BUCKET".to_string(),
                    )
                })?;
                StorageConfig::Bucket {
                    bucket,
                    prefix: non_empty(self.storage_prefix.clone())
                        .map(|p| p.trim_matches('/').to_string())
                        .filter(|p| !p.is_empty()),
                    access_token,
                }
            }
            StorageKind::Drive => StorageConfig::Drive {
                folder_id: non_empty(self.drive_folder_id.clone()),
                access_token,
            },
        };
        Ok(Some(storage))
    }

    /// Builds the final `SyncConfig` instance.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when the base, table or token is missing, when
    /// a selected storage provider lacks its settings, or when a value is out
    /// of range.
    pub fn build(self) -> Result<SyncConfig> {
        let base_id = non_empty(self.base_id.clone()).ok_or_else(|| {
            Error::Config("Base ID is required. Set BASE_ID or use .base_id().".to_string())
        })?;

        let table_id = non_empty(self.table_id.clone()).ok_or_else(|| {
            Error::Config("Table ID is required. Set TABLE_ID or use .table_id().".to_string())
        })?;

        let api_key = non_empty(self.api_key.clone()).ok_or_else(|| {
            Error::Config(
                "API token is required. Set API_KEY (or AIRTABLE_TOKEN) or use .api_key()."
                    .to_string(),
            )
        })?;

        let storage = self.resolve_storage()?;

        let config = SyncConfig {
            table: TableConfig {
                base_id,
                table_id,
                api_key,
                api_base: self
                    .api_base
                    .map(|b| b.trim_end_matches('/').to_string())
                    .unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
                view_names: self.view_names,
            },
            download: self.download,
            upload: self.upload,
            storage,
            request_timeout: self.request_timeout.unwrap_or(DEFAULT_REQUEST_TIMEOUT),
        };

        config.validate()?;

        Ok(config)
    }
}
