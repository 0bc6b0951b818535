//! Service façade and bootstrap helpers.
//!
//! This crate wires bridge implementations (HTTP, filesystem, clock) and the
//! configured providers into a [`SyncOrchestrator`]. Desktop builds enable the
//! `desktop-shims` feature (on by default), which pulls in `bridge-desktop`
//! and both staging storage providers so [`SyncService::from_config`] can
//! build everything from a [`SyncConfig`].

pub mod error;

pub use error::{Result, ServiceError};

use std::path::Path;
use std::sync::Arc;

use bridge_traits::{
    http::HttpClient,
    storage::{FileSystemAccess, ObjectStore},
    table::TableClient,
    time::Clock,
};
use core_runtime::config::SyncConfig;
use core_sync::{DownloadReport, SyncOrchestrator, UploadReport};
use provider_airtable::AirtableConnector;
use tracing::info;

/// Aggregated handle to the bridge dependencies a run needs.
pub struct SyncDependencies {
    pub http_client: Arc<dyn HttpClient>,
    pub filesystem: Arc<dyn FileSystemAccess>,
    pub clock: Arc<dyn Clock>,
}

impl SyncDependencies {
    pub fn new(
        http_client: Arc<dyn HttpClient>,
        filesystem: Arc<dyn FileSystemAccess>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            http_client,
            filesystem,
            clock,
        }
    }

    /// Desktop bridges: reqwest with the configured timeout, tokio filesystem
    /// and the system clock.
    #[cfg(all(feature = "desktop-shims", not(target_arch = "wasm32")))]
    pub fn desktop(config: &SyncConfig) -> Result<Self> {
        let http_client = bridge_desktop::ReqwestHttpClient::with_timeout(config.request_timeout)
            .map_err(|e| ServiceError::InitializationFailed(e.to_string()))?;
        Ok(Self::new(
            Arc::new(http_client),
            Arc::new(bridge_desktop::TokioFileSystem::new()),
            Arc::new(bridge_traits::time::SystemClock),
        ))
    }
}

/// Primary façade used by the command-line front end.
#[derive(Clone)]
pub struct SyncService {
    config: Arc<SyncConfig>,
    orchestrator: Arc<SyncOrchestrator>,
}

impl SyncService {
    /// Create a service from explicit parts.
    ///
    /// `storage` may be `None`; uploads then fail with a configuration error.
    pub fn new(
        config: Arc<SyncConfig>,
        deps: SyncDependencies,
        table: Arc<dyn TableClient>,
        storage: Option<Arc<dyn ObjectStore>>,
    ) -> Self {
        let mut orchestrator = SyncOrchestrator::new(
            Arc::clone(&config),
            table,
            deps.http_client,
            deps.filesystem,
            deps.clock,
        );
        if let Some(storage) = storage {
            orchestrator = orchestrator.with_storage(storage);
        }

        Self {
            config,
            orchestrator: Arc::new(orchestrator),
        }
    }

    /// Build the service with the desktop bridges and the providers selected
    /// by `config`.
    #[cfg(all(feature = "desktop-shims", not(target_arch = "wasm32")))]
    pub fn from_config(config: Arc<SyncConfig>) -> Result<Self> {
        let deps = SyncDependencies::desktop(&config)?;
        let table: Arc<dyn TableClient> = Arc::new(AirtableConnector::new(
            Arc::clone(&deps.http_client),
            Arc::clone(&deps.clock),
            &config.table,
            config.request_timeout,
        ));
        let storage = config
            .storage
            .as_ref()
            .map(|storage| build_storage(storage, &deps, &config));

        info!(
            base = %config.table.base_id,
            table = %config.table.table_id,
            storage = storage.as_ref().map(|s| s.name()).unwrap_or("none"),
            "Service initialized"
        );
        Ok(Self::new(config, deps, table, storage))
    }

    /// Build the service from explicit bridges, using the table provider for
    /// the configured base. Storage is supplied by the caller.
    pub fn with_dependencies(
        config: Arc<SyncConfig>,
        deps: SyncDependencies,
        storage: Option<Arc<dyn ObjectStore>>,
    ) -> Self {
        let table: Arc<dyn TableClient> = Arc::new(AirtableConnector::new(
            Arc::clone(&deps.http_client),
            Arc::clone(&deps.clock),
            &config.table,
            config.request_timeout,
        ));
        Self::new(config, deps, table, storage)
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Download every accepted attachment to the configured output directory.
    pub async fn download(&self) -> Result<DownloadReport> {
        Ok(self.orchestrator.run_download().await?)
    }

    /// Upload every eligible file under `root`.
    ///
    /// # Errors
    ///
    /// [`ServiceError::Runtime`] when no staging storage is configured, before
    /// any filesystem or network access.
    pub async fn upload(&self, root: &Path) -> Result<UploadReport> {
        self.config.require_storage()?;
        Ok(self.orchestrator.run_upload(root).await?)
    }
}

#[cfg(all(feature = "desktop-shims", not(target_arch = "wasm32")))]
fn build_storage(
    storage: &core_runtime::config::StorageConfig,
    deps: &SyncDependencies,
    config: &SyncConfig,
) -> Arc<dyn ObjectStore> {
    match storage {
        core_runtime::config::StorageConfig::Bucket {
            bucket,
            prefix,
            access_token,
        } => Arc::new(
            provider_cloud_storage::BucketObjectStore::new(
                Arc::clone(&deps.http_client),
                Arc::clone(&deps.filesystem),
                bucket.clone(),
                prefix.clone(),
                access_token.clone(),
            )
            .with_timeout(config.request_timeout),
        ),
        core_runtime::config::StorageConfig::Drive {
            folder_id,
            access_token,
        } => Arc::new(
            provider_google_drive::DriveObjectStore::new(
                Arc::clone(&deps.http_client),
                Arc::clone(&deps.filesystem),
                access_token.clone(),
                folder_id.clone(),
            )
            .with_timeout(config.request_timeout),
        ),
    }
}
