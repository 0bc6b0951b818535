//! # Run Phase State Machine
//!
//! Tracks the phase of a download or upload run and the lifecycle of each
//! file being uploaded. Every transition is validated.
//!
//! ## Download
//!
//! ```text
//! FetchingRows → FilteringAttachments → DownloadingBytes → Done
//!      └──────────────────────────────────────────────────↗
//!                  (remote error while fetching)
//! ```
//!
//! ## Upload
//!
//! ```text
//! Enumerating → StagingUpload → CreatingRows → [Verifying] → CleaningUp → Done
//!      └────────────────────────────────────────────────────────────────↗
//!                               (nothing to upload)
//! ```

use crate::enumerator::LocalFile;
use crate::{Result, SyncError};
use bridge_traits::storage::StagedObject;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::fmt;
use std::path::PathBuf;
use uuid::Uuid;

// ============================================================================
// ID Types
// ============================================================================

/// Unique identifier for a sync run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SyncRunId(Uuid);

impl SyncRunId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SyncRunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SyncRunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Phases
// ============================================================================

/// A phase of a run with a fixed set of allowed successors
pub trait Phase: Copy + PartialEq + fmt::Display + fmt::Debug {
    /// Phase every run starts in
    fn initial() -> Self;

    fn can_transition_to(&self, next: Self) -> bool;

    fn is_terminal(&self) -> bool;
}

/// Phases of a download run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DownloadPhase {
    FetchingRows,
    FilteringAttachments,
    DownloadingBytes,
    Done,
}

impl DownloadPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            DownloadPhase::FetchingRows => "fetching_rows",
            DownloadPhase::FilteringAttachments => "filtering_attachments",
            DownloadPhase::DownloadingBytes => "downloading_bytes",
            DownloadPhase::Done => "done",
        }
    }
}

impl fmt::Display for DownloadPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Phase for DownloadPhase {
    fn initial() -> Self {
        DownloadPhase::FetchingRows
    }

    fn can_transition_to(&self, next: Self) -> bool {
        use DownloadPhase::*;
        matches!(
            (self, next),
            (FetchingRows, FilteringAttachments)
                | (FetchingRows, Done)
                | (FilteringAttachments, DownloadingBytes)
                | (DownloadingBytes, Done)
        )
    }

    fn is_terminal(&self) -> bool {
        matches!(self, DownloadPhase::Done)
    }
}

/// Phases of an upload run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadPhase {
    Enumerating,
    StagingUpload,
    CreatingRows,
    Verifying,
    CleaningUp,
    Done,
}

impl UploadPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            UploadPhase::Enumerating => "enumerating",
            UploadPhase::StagingUpload => "staging_upload",
            UploadPhase::CreatingRows => "creating_rows",
            UploadPhase::Verifying => "verifying",
            UploadPhase::CleaningUp => "cleaning_up",
            UploadPhase::Done => "done",
        }
    }
}

impl fmt::Display for UploadPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Phase for UploadPhase {
    fn initial() -> Self {
        UploadPhase::Enumerating
    }

    fn can_transition_to(&self, next: Self) -> bool {
        use UploadPhase::*;
        matches!(
            (self, next),
            (Enumerating, StagingUpload)
                | (Enumerating, Done)
                | (StagingUpload, CreatingRows)
                | (CreatingRows, Verifying)
                | (CreatingRows, CleaningUp)
                | (Verifying, CleaningUp)
                | (CleaningUp, Done)
        )
    }

    fn is_terminal(&self) -> bool {
        matches!(self, UploadPhase::Done)
    }
}

// ============================================================================
// Sync Run
// ============================================================================

/// One execution of a download or upload
#[derive(Debug, Clone, PartialEq)]
pub struct SyncRun<P: Phase> {
    pub id: SyncRunId,
    pub phase: P,
    pub started_at: DateTime<Utc>,
    /// Set when the run reaches its terminal phase
    pub finished_at: Option<DateTime<Utc>>,
}

impl<P: Phase> SyncRun<P> {
    pub fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            id: SyncRunId::new(),
            phase: P::initial(),
            started_at,
            finished_at: None,
        }
    }

    /// Move to `next`.
    ///
    /// # Errors
    ///
    /// [`SyncError::InvalidStateTransition`] when `next` is not a successor of
    /// the current phase.
    pub fn advance(&mut self, next: P, now: DateTime<Utc>) -> Result<()> {
        if !self.phase.can_transition_to(next) {
            return Err(SyncError::InvalidStateTransition {
                from: self.phase.to_string(),
                to: next.to_string(),
            });
        }

        self.phase = next;
        if next.is_terminal() {
            self.finished_at = Some(now);
        }
        Ok(())
    }

    pub fn is_finished(&self) -> bool {
        self.phase.is_terminal()
    }
}

// ============================================================================
// Upload Jobs
// ============================================================================

/// Lifecycle of a single file in an upload run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadJobState {
    Pending,
    Staged,
    RowCreated,
    Failed,
}

impl UploadJobState {
    pub fn as_str(&self) -> &'static str {
        match self {
            UploadJobState::Pending => "pending",
            UploadJobState::Staged => "staged",
            UploadJobState::RowCreated => "row_created",
            UploadJobState::Failed => "failed",
        }
    }
}

impl fmt::Display for UploadJobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One local file on its way to becoming a row
#[derive(Debug, Clone, PartialEq)]
pub struct UploadJob {
    pub id: Uuid,
    pub local_path: PathBuf,
    pub filename: String,
    pub target_fields: Vec<String>,
    pub default_field_values: Map<String, Value>,
    /// Present once staging succeeded; stays set after failures so cleanup can
    /// still remove the object
    pub staged: Option<StagedObject>,
    pub row_id: Option<String>,
    pub state: UploadJobState,
    pub error: Option<String>,
}

impl UploadJob {
    pub fn new(
        file: LocalFile,
        target_fields: Vec<String>,
        default_field_values: Map<String, Value>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            local_path: file.path,
            filename: file.filename,
            target_fields,
            default_field_values,
            staged: None,
            row_id: None,
            state: UploadJobState::Pending,
            error: None,
        }
    }

    fn invalid(&self, to: UploadJobState) -> SyncError {
        SyncError::InvalidStateTransition {
            from: self.state.to_string(),
            to: to.to_string(),
        }
    }

    pub fn mark_staged(&mut self, staged: StagedObject) -> Result<()> {
        if self.state != UploadJobState::Pending {
            return Err(self.invalid(UploadJobState::Staged));
        }
        self.staged = Some(staged);
        self.state = UploadJobState::Staged;
        Ok(())
    }

    pub fn mark_row_created(&mut self, row_id: String) -> Result<()> {
        if self.state != UploadJobState::Staged {
            return Err(self.invalid(UploadJobState::RowCreated));
        }
        self.row_id = Some(row_id);
        self.state = UploadJobState::RowCreated;
        Ok(())
    }

    pub fn mark_failed(&mut self, reason: impl Into<String>) -> Result<()> {
        if matches!(
            self.state,
            UploadJobState::RowCreated | UploadJobState::Failed
        ) {
            return Err(self.invalid(UploadJobState::Failed));
        }
        self.error = Some(reason.into());
        self.state = UploadJobState::Failed;
        Ok(())
    }

    /// Field values for the row this job creates.
    ///
    /// Starts from the default values and stamps every target field with a
    /// single-element attachment list. Returns `None` before staging.
    pub fn row_fields(&self) -> Option<Map<String, Value>> {
        let staged = self.staged.as_ref()?;
        let mut fields = self.default_field_values.clone();
        for field in &self.target_fields {
            fields.insert(
                field.clone(),
                json!([{ "url": staged.url, "filename": self.filename }]),
            );
        }
        Some(fields)
    }
}
