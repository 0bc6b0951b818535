//! Storage and File System Abstractions
//!
//! Provides traits for local file I/O and for staging files in remote object
//! storage.

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::Result;

/// File system access trait
///
/// Abstracts the file operations the sync engine performs so the orchestrator
/// can be exercised against a temporary directory or an in-memory fake.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::storage::FileSystemAccess;
///
/// async fn save(fs: &dyn FileSystemAccess, dir: &Path, data: Bytes) -> Result<()> {
///     fs.create_dir_all(dir).await?;
///     fs.write_file(&dir.join("report.pdf"), data).await?;
///     Ok(())
/// }
/// ```
#[async_trait]
pub trait FileSystemAccess: Send + Sync {
    /// Create a directory and all parent directories if they don't exist
    async fn create_dir_all(&self, path: &Path) -> Result<()>;

    /// Read entire file contents into memory
    async fn read_file(&self, path: &Path) -> Result<Bytes>;

    /// Write data to a file, creating it if it doesn't exist and truncating it
    /// if it does
    async fn write_file(&self, path: &Path, data: Bytes) -> Result<()>;
}

/// A file staged in object storage.
///
/// `key` is what [`ObjectStore::delete`] expects; `url` is a location the table
/// service can fetch the bytes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StagedObject {
    pub key: String,
    pub url: String,
}

/// Object storage used to stage local files behind a fetchable URL.
///
/// Implementations:
/// - bucket storage (`provider-cloud-storage`)
/// - drive storage (`provider-google-drive`)
///
/// Exactly one implementation is active per run; callers must not depend on
/// which.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Short provider name used in log lines
    fn name(&self) -> &'static str;

    /// Upload the file at `local_path` under a key derived from its base
    /// filename and return where it can be fetched from
    async fn upload(&self, local_path: &Path) -> Result<StagedObject>;

    /// Remove a previously staged object
    ///
    /// Callers treat failures as best-effort and only log them.
    async fn delete(&self, key: &str) -> Result<()>;
}
