//! # Sync Orchestrator
//!
//! Composes the table client, attachment filter, file enumerator and staging
//! storage into the two run types.
//!
//! ## Workflow
//!
//! ### Download
//! 1. Fetch every row of every configured view
//! 2. Pick attachments out of the configured fields and filter them
//! 3. Fetch each accepted attachment and write it under the output root
//!
//! A remote error while fetching ends the run before anything is written.
//!
//! ### Upload
//! 1. Check the upload root, then read the table schema
//! 2. Enumerate local files
//! 3. Stage each file in object storage
//! 4. Create one row per staged file
//! 5. Optionally poll the table until the attachments show up
//! 6. Delete every staged object
//!
//! One file failing never stops the batch. Everything runs sequentially.

use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest};
use bridge_traits::storage::{FileSystemAccess, ObjectStore};
use bridge_traits::table::{Attachment, Row, TableClient};
use bridge_traits::time::Clock;
use chrono::{DateTime, Utc};
use core_runtime::config::SyncConfig;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

use crate::enumerator::LocalFileEnumerator;
use crate::error::{Result, SyncError};
use crate::filter::accepts;
use crate::job::{DownloadPhase, Phase, SyncRun, SyncRunId, UploadJob, UploadJobState, UploadPhase};

/// Folder used for a group whose value is empty
const UNTITLED_GROUP: &str = "untitled";

// ============================================================================
// Reports
// ============================================================================

/// An item that failed without stopping the run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemFailure {
    pub filename: String,
    pub reason: String,
}

/// Outcome of a download run
#[derive(Debug, Clone, PartialEq)]
pub struct DownloadReport {
    pub run_id: SyncRunId,
    pub rows_fetched: usize,
    /// Attachments found in the inspected fields
    pub attachments_seen: usize,
    /// Attachments that passed the filter
    pub attachments_accepted: usize,
    /// Paths written, in download order
    pub files_written: Vec<PathBuf>,
    pub failures: Vec<ItemFailure>,
    /// Fetch errors that ended the run early
    pub remote_errors: Vec<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl DownloadReport {
    fn new(run: &SyncRun<DownloadPhase>) -> Self {
        Self {
            run_id: run.id,
            rows_fetched: 0,
            attachments_seen: 0,
            attachments_accepted: 0,
            files_written: Vec::new(),
            failures: Vec::new(),
            remote_errors: Vec::new(),
            started_at: run.started_at,
            finished_at: None,
        }
    }

    /// No remote errors and no failed items
    pub fn is_clean(&self) -> bool {
        self.remote_errors.is_empty() && self.failures.is_empty()
    }
}

/// Result of the post-upload polling loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationOutcome {
    /// Verification disabled or no rows were created
    Skipped,
    Verified { polls: usize },
    TimedOut { polls: usize },
}

/// Outcome of an upload run
#[derive(Debug, Clone, PartialEq)]
pub struct UploadReport {
    pub run_id: SyncRunId,
    pub files_found: usize,
    pub staged: usize,
    /// IDs of created rows, in file order
    pub rows_created: Vec<String>,
    pub failures: Vec<ItemFailure>,
    pub verification: VerificationOutcome,
    pub cleaned_up: usize,
    pub cleanup_failures: usize,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl UploadReport {
    fn new(run: &SyncRun<UploadPhase>) -> Self {
        Self {
            run_id: run.id,
            files_found: 0,
            staged: 0,
            rows_created: Vec::new(),
            failures: Vec::new(),
            verification: VerificationOutcome::Skipped,
            cleaned_up: 0,
            cleanup_failures: 0,
            started_at: run.started_at,
            finished_at: None,
        }
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
            && self.cleanup_failures == 0
            && !matches!(self.verification, VerificationOutcome::TimedOut { .. })
    }
}

/// An accepted attachment and where it will be written
#[derive(Debug)]
struct PlannedDownload {
    attachment: Attachment,
    target: PathBuf,
}

// ============================================================================
// Orchestrator
// ============================================================================

/// Runs downloads and uploads against one table.
///
/// ```ignore
/// let orchestrator = SyncOrchestrator::new(config, table, http, fs, clock)
///     .with_storage(store);
/// let report = orchestrator.run_upload(Path::new("/srv/uploads")).await?;
/// ```
pub struct SyncOrchestrator {
    config: Arc<SyncConfig>,
    table: Arc<dyn TableClient>,
    http_client: Arc<dyn HttpClient>,
    fs: Arc<dyn FileSystemAccess>,
    clock: Arc<dyn Clock>,
    storage: Option<Arc<dyn ObjectStore>>,
}

impl SyncOrchestrator {
    pub fn new(
        config: Arc<SyncConfig>,
        table: Arc<dyn TableClient>,
        http_client: Arc<dyn HttpClient>,
        fs: Arc<dyn FileSystemAccess>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            config,
            table,
            http_client,
            fs,
            clock,
            storage: None,
        }
    }

    /// Attach the staging storage used by uploads
    pub fn with_storage(mut self, storage: Arc<dyn ObjectStore>) -> Self {
        self.storage = Some(storage);
        self
    }

    fn advance<P: Phase>(&self, run: &mut SyncRun<P>, next: P) -> Result<()> {
        let from = run.phase;
        run.advance(next, self.clock.now())?;
        info!(run_id = %run.id, from = %from, to = %next, "Phase transition");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Download
    // ------------------------------------------------------------------

    /// Download every accepted attachment to the configured output root.
    #[instrument(skip(self), fields(table = %self.config.table.table_id))]
    pub async fn run_download(&self) -> Result<DownloadReport> {
        let mut run: SyncRun<DownloadPhase> = SyncRun::new(self.clock.now());
        let mut report = DownloadReport::new(&run);
        info!(run_id = %run.id, views = ?self.config.table.view_names, "Starting download");

        let fetch = self.table.fetch_all_rows(&self.config.table.view_names).await;
        report.rows_fetched = fetch.rows.len();

        if !fetch.is_complete() {
            for failure in fetch.errors {
                let error = SyncError::remote(failure.error);
                error!(
                    view = failure.view.as_deref().unwrap_or("<all>"),
                    pages_fetched = failure.pages_fetched,
                    error = %error,
                    "Fetching rows failed"
                );
                report.remote_errors.push(error.to_string());
            }
            self.advance(&mut run, DownloadPhase::Done)?;
            report.finished_at = run.finished_at;
            warn!(
                rows_fetched = report.rows_fetched,
                "Download stopped before writing any files"
            );
            return Ok(report);
        }
        info!(rows = fetch.rows.len(), "Fetched rows");

        self.advance(&mut run, DownloadPhase::FilteringAttachments)?;
        let planned = self.plan_downloads(&fetch.rows, &mut report);
        info!(
            seen = report.attachments_seen,
            accepted = report.attachments_accepted,
            "Filtered attachments"
        );

        self.advance(&mut run, DownloadPhase::DownloadingBytes)?;
        for download in planned {
            match self.download_one(&download).await {
                Ok(()) => report.files_written.push(download.target),
                Err(e) => {
                    warn!(
                        filename = %download.attachment.filename,
                        error = %e,
                        "Attachment download failed"
                    );
                    report.failures.push(ItemFailure {
                        filename: download.attachment.filename.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        self.advance(&mut run, DownloadPhase::Done)?;
        report.finished_at = run.finished_at;
        info!(
            run_id = %run.id,
            written = report.files_written.len(),
            failed = report.failures.len(),
            "Download finished"
        );
        Ok(report)
    }

    /// Select accepted attachments and compute their target paths
    fn plan_downloads(&self, rows: &[Row], report: &mut DownloadReport) -> Vec<PlannedDownload> {
        let options = &self.config.download;
        let mut planned = Vec::new();

        for row in rows {
            let fields = if options.attachment_fields.is_empty() {
                row.attachment_fields()
            } else {
                options.attachment_fields.clone()
            };

            for field in &fields {
                for attachment in row.attachments(field) {
                    report.attachments_seen += 1;
                    if !accepts(&attachment, &options.filter) {
                        debug!(
                            filename = %attachment.filename,
                            mime_type = %attachment.mime_type,
                            "Attachment filtered out"
                        );
                        continue;
                    }
                    report.attachments_accepted += 1;

                    match self.target_path(row, &attachment) {
                        Some(target) => planned.push(PlannedDownload { attachment, target }),
                        None => {
                            warn!(filename = %attachment.filename, row_id = %row.id, "Unsafe file name, skipping");
                            report.failures.push(ItemFailure {
                                filename: attachment.filename.clone(),
                                reason: "file name cannot be written safely".to_string(),
                            });
                        }
                    }
                }
            }
        }
        planned
    }

    /// `{output}/{EXT?}/{group?}/{filename}`, or `None` if a segment is unsafe
    fn target_path(&self, row: &Row, attachment: &Attachment) -> Option<PathBuf> {
        let options = &self.config.download;
        let extension = attachment.extension();
        let mut path = options.output_dir.clone();

        if options.organize_by_extension && !extension.is_empty() {
            path.push(sanitize_segment(&extension.to_uppercase())?);
        }

        if let Some(group_field) = &options.group_by_field {
            let group = row
                .field_text(group_field)
                .map(|v| v.replace(' ', ""))
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| UNTITLED_GROUP.to_string());
            path.push(sanitize_segment(&group)?);
        }

        let renamed = options
            .name_field
            .as_ref()
            .and_then(|field| row.field_text(field))
            .map(|v| v.replace(' ', ""))
            .filter(|v| !v.is_empty())
            .map(|base| {
                if extension.is_empty() {
                    base
                } else {
                    format!("{}.{}", base, extension)
                }
            });
        let filename = renamed.unwrap_or_else(|| attachment.filename.clone());
        path.push(sanitize_segment(&filename)?);

        Some(path)
    }

    async fn download_one(&self, download: &PlannedDownload) -> Result<()> {
        let request = HttpRequest::new(HttpMethod::Get, download.attachment.url.clone())
            .timeout(self.config.request_timeout);

        let response = self
            .http_client
            .execute(request)
            .await
            .map_err(|e| SyncError::Remote(e.to_string()))?;

        if !response.is_success() {
            return Err(SyncError::Remote(format!(
                "download returned status {}",
                response.status
            )));
        }

        self.fs
            .write_file(&download.target, response.body)
            .await
            .map_err(|e| SyncError::Io(e.to_string()))?;

        debug!(
            filename = %download.attachment.filename,
            path = %download.target.display(),
            "Wrote attachment"
        );
        Ok(())
    }

    // ------------------------------------------------------------------
    // Upload
    // ------------------------------------------------------------------

    /// Upload every eligible file under `root` as one row each.
    ///
    /// # Errors
    ///
    /// - [`SyncError::Config`] when no staging storage is attached
    /// - [`SyncError::NotADirectory`] when `root` is not a directory
    /// - [`SyncError::Fatal`] when the table schema cannot be read
    #[instrument(skip(self), fields(table = %self.config.table.table_id))]
    pub async fn run_upload(&self, root: &Path) -> Result<UploadReport> {
        let storage = self.storage.clone().ok_or_else(|| {
            SyncError::Config("Uploads need a staging storage provider".to_string())
        })?;
        let options = &self.config.upload;

        let enumerator =
            LocalFileEnumerator::new(root)?.with_filter(options.file_filter.clone());
        self.check_schema().await?;

        let mut run: SyncRun<UploadPhase> = SyncRun::new(self.clock.now());
        let mut report = UploadReport::new(&run);
        info!(run_id = %run.id, root = %enumerator.root().display(), store = storage.name(), "Starting upload");

        let mut jobs = Vec::new();
        for entry in enumerator.iter() {
            match entry {
                Ok(file) => jobs.push(UploadJob::new(
                    file,
                    options.target_fields.clone(),
                    options.default_field_values.clone(),
                )),
                Err(e) => warn!(error = %e, "Skipping unreadable directory entry"),
            }
        }
        report.files_found = jobs.len();
        info!(files = jobs.len(), "Enumerated files");

        if jobs.is_empty() {
            self.advance(&mut run, UploadPhase::Done)?;
            report.finished_at = run.finished_at;
            info!("Nothing to upload");
            return Ok(report);
        }

        self.advance(&mut run, UploadPhase::StagingUpload)?;
        for job in jobs.iter_mut() {
            match storage.upload(&job.local_path).await {
                Ok(staged) => {
                    debug!(filename = %job.filename, key = %staged.key, "Staged file");
                    job.mark_staged(staged)?;
                    report.staged += 1;
                }
                Err(e) => {
                    let error = SyncError::storage(e);
                    warn!(filename = %job.filename, error = %error, "Staging failed, skipping file");
                    job.mark_failed(error.to_string())?;
                    report.failures.push(ItemFailure {
                        filename: job.filename.clone(),
                        reason: error.to_string(),
                    });
                }
            }
        }

        self.advance(&mut run, UploadPhase::CreatingRows)?;
        for job in jobs.iter_mut() {
            let Some(fields) = job.row_fields() else {
                continue;
            };
            match self.table.create_row(fields).await {
                Ok(row_id) => {
                    info!(filename = %job.filename, row_id = %row_id, "Created row");
                    report.rows_created.push(row_id.clone());
                    job.mark_row_created(row_id)?;
                }
                Err(e) => {
                    let error = SyncError::write(e);
                    error!(filename = %job.filename, error = %error, "Row creation failed");
                    job.mark_failed(error.to_string())?;
                    report.failures.push(ItemFailure {
                        filename: job.filename.clone(),
                        reason: error.to_string(),
                    });
                }
            }
        }

        if options.verify && !report.rows_created.is_empty() {
            self.advance(&mut run, UploadPhase::Verifying)?;
            report.verification = self.verify(&jobs).await;
        }

        self.advance(&mut run, UploadPhase::CleaningUp)?;
        for job in &jobs {
            let Some(staged) = &job.staged else {
                continue;
            };
            match storage.delete(&staged.key).await {
                Ok(()) => report.cleaned_up += 1,
                Err(e) => {
                    warn!(key = %staged.key, error = %e, "Failed to delete staged object");
                    report.cleanup_failures += 1;
                }
            }
        }

        self.advance(&mut run, UploadPhase::Done)?;
        report.finished_at = run.finished_at;
        info!(
            run_id = %run.id,
            rows_created = report.rows_created.len(),
            failed = report.failures.len(),
            cleaned_up = report.cleaned_up,
            "Upload finished"
        );
        Ok(report)
    }

    /// Read the schema before touching storage.
    ///
    /// Exhausted retries are fatal. A missing table or missing fields only
    /// warn; the service reports those again on row creation.
    async fn check_schema(&self) -> Result<()> {
        let table_ref = &self.config.table.table_id;
        let schema = self
            .table
            .fetch_table_schema(table_ref)
            .await
            .map_err(|e| SyncError::Fatal(format!("Could not read table schema: {}", e)))?;

        let Some(schema) = schema else {
            warn!(table = %table_ref, "Table not found in base schema, continuing");
            return Ok(());
        };

        let options = &self.config.upload;
        let expected = options
            .target_fields
            .iter()
            .chain(options.default_field_values.keys());
        for field in expected {
            if !schema.has_field(field) {
                warn!(table = %schema.name, field = %field, "Field not present in table schema");
            }
        }
        Ok(())
    }

    /// Poll the table until the created rows show their attachments.
    ///
    /// Polls at most once per job in the run, sleeping the configured interval
    /// before each poll.
    async fn verify(&self, jobs: &[UploadJob]) -> VerificationOutcome {
        let created: Vec<&UploadJob> = jobs
            .iter()
            .filter(|job| job.state == UploadJobState::RowCreated)
            .collect();
        let interval = self.config.upload.verify_interval;
        let max_polls = jobs.len();

        for poll in 1..=max_polls {
            self.clock.sleep(interval).await;

            let rows = match self.table.get_rows_snapshot().await {
                Ok(rows) => rows,
                Err(e) => {
                    warn!(poll, error = %e, "Verification poll failed");
                    continue;
                }
            };

            // FIXME: this accepts any row with a non-empty first target field;
            // it does not check that the row is the one created for `job`.
            let all_present = created.iter().all(|job| {
                job.target_fields
                    .first()
                    .map(|field| rows.iter().any(|row| row.has_value(field)))
                    .unwrap_or(true)
            });

            if all_present {
                info!(polls = poll, "Uploaded attachments verified");
                return VerificationOutcome::Verified { polls: poll };
            }
            debug!(poll, max_polls, "Attachments not visible yet");
        }

        warn!(polls = max_polls, "Verification timed out");
        VerificationOutcome::TimedOut { polls: max_polls }
    }
}

/// Make a single path segment safe to join under the output root.
///
/// Separators become `_`; empty, `.` and `..` segments are rejected.
fn sanitize_segment(segment: &str) -> Option<String> {
    let cleaned: String = segment
        .chars()
        .map(|c| if c == '/' || c == '\\' || c == '\0' { '_' } else { c })
        .collect();
    let trimmed = cleaned.trim();
    if trimmed.is_empty() || trimmed == "." || trimmed == ".." {
        None
    } else {
        Some(cleaned)
    }
}
