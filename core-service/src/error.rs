use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Service initialization failed: {0}")]
    InitializationFailed(String),

    #[error(transparent)]
    Runtime(#[from] core_runtime::Error),

    #[error(transparent)]
    Sync(#[from] core_sync::SyncError),
}

impl ServiceError {
    /// Whether the failure came from settings rather than a run
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            ServiceError::Runtime(core_runtime::Error::Config(_))
                | ServiceError::Sync(core_sync::SyncError::Config(_))
                | ServiceError::Sync(core_sync::SyncError::NotADirectory { .. })
        )
    }
}

pub type Result<T> = std::result::Result<T, ServiceError>;
