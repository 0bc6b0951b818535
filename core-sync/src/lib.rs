//! # Attachment Sync Engine
//!
//! Moves file attachments between a remote table and the local filesystem.
//!
//! ## Overview
//!
//! - **Download**: pages through the table's views, filters attachments by MIME
//!   type and extension, and writes the accepted files under an output root
//! - **Upload**: walks a local directory, stages each file in object storage,
//!   creates one row per file referencing the staged URL, optionally verifies
//!   the rows, then removes the staged objects
//!
//! ## Components
//!
//! - **Filter** (`filter`): attachment acceptance rules
//! - **Enumerator** (`enumerator`): deterministic local directory walk
//! - **Run State Machine** (`job`): validated phase transitions and per-file upload jobs
//! - **Orchestrator** (`coordinator`): drives both run types over the bridge traits

pub mod coordinator;
pub mod enumerator;
pub mod error;
pub mod filter;
pub mod job;

pub use coordinator::{
    DownloadReport, ItemFailure, SyncOrchestrator, UploadReport, VerificationOutcome,
};
pub use enumerator::{LocalFile, LocalFileEnumerator};
pub use error::{Result, SyncError};
pub use job::{DownloadPhase, Phase, SyncRun, SyncRunId, UploadJob, UploadJobState, UploadPhase};
