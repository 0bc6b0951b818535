//! # Core Runtime Module
//!
//! Provides foundational runtime infrastructure for the attachment sync engine:
//! - Logging and tracing infrastructure
//! - Configuration management
//!
//! ## Overview
//!
//! This crate contains the configuration struct every run is driven by and the
//! logging conventions used throughout the workspace. Configuration is built
//! once, validated up front and then shared read-only.

pub mod config;
pub mod error;
pub mod logging;

pub use config::{
    DownloadOptions, FilterSpec, StorageConfig, StorageKind, SyncConfig, SyncConfigBuilder,
    TableConfig, UploadOptions,
};
pub use error::{Error, Result};
pub use logging::{init_logging, LogFormat, LogLevel, LoggingConfig};
