//! Integration tests for download runs
//!
//! Runs the orchestrator against an in-memory table, a mocked HTTP client and
//! the real tokio filesystem in a temporary directory.

mod common;

use bridge_desktop::TokioFileSystem;
use common::{attachment, row, serving, FakeTable, MockHttpClient, RecordingClock};
use core_runtime::config::{DownloadOptions, FilterSpec, SyncConfig};
use core_sync::SyncOrchestrator;
use serde_json::json;
use std::path::Path;
use std::sync::Arc;

fn config(options: DownloadOptions, views: &[&str]) -> Arc<SyncConfig> {
    Arc::new(
        SyncConfig::builder()
            .base_id("appBase")
            .table_id("tblUploads")
            .api_key("patKey")
            .view_names(views.iter().map(|v| v.to_string()).collect())
            .download(options)
            .build()
            .unwrap(),
    )
}

fn orchestrator(config: Arc<SyncConfig>, table: FakeTable, http: MockHttpClient) -> SyncOrchestrator {
    SyncOrchestrator::new(
        config,
        Arc::new(table),
        Arc::new(http),
        Arc::new(TokioFileSystem::new()),
        Arc::new(RecordingClock::default()),
    )
}

fn read(path: &Path) -> Vec<u8> {
    std::fs::read(path).unwrap()
}

#[tokio::test]
async fn test_pdf_filter_writes_into_upper_case_extension_folder() {
    let dir = tempfile::tempdir().unwrap();
    let table = FakeTable::new(vec![row(
        "rec1",
        json!({
            "Name": "Quarterly",
            "Files": [
                attachment("report.PDF", "application/pdf", "https://files.example/1"),
                attachment("photo.png", "image/png", "https://files.example/2"),
            ]
        }),
    )]);
    let http = serving(&[
        ("https://files.example/1", b"%PDF-1.7"),
        ("https://files.example/2", b"PNG"),
    ]);

    let options = DownloadOptions {
        output_dir: dir.path().to_path_buf(),
        attachment_fields: vec!["Files".to_string()],
        filter: FilterSpec::new(["application/pdf"], ["pdf"]),
        ..Default::default()
    };
    let report = orchestrator(config(options, &[]), table, http)
        .run_download()
        .await
        .unwrap();

    let expected = dir.path().join("PDF").join("report.PDF");
    assert_eq!(report.files_written, vec![expected.clone()]);
    assert_eq!(read(&expected), b"%PDF-1.7");
    assert_eq!(report.attachments_seen, 2);
    assert_eq!(report.attachments_accepted, 1);
    assert!(!dir.path().join("PNG").exists());
    assert!(report.is_clean());
    assert!(report.finished_at.is_some());
}

#[tokio::test]
async fn test_remote_error_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let mut table = FakeTable::new(vec![row(
        "rec1",
        json!({"Files": [attachment("a.pdf", "application/pdf", "https://files.example/a")]}),
    )]);
    table.failing_views = vec![Some("Missing".to_string())];

    let mut http = MockHttpClient::new();
    http.expect_execute().never();

    let options = DownloadOptions {
        output_dir: dir.path().to_path_buf(),
        ..Default::default()
    };
    let report = orchestrator(config(options, &["Grid", "Missing"]), table, http)
        .run_download()
        .await
        .unwrap();

    assert_eq!(report.remote_errors.len(), 1);
    assert!(report.remote_errors[0].contains("VIEW_NAME_NOT_FOUND"));
    assert!(report.files_written.is_empty());
    // Rows from the healthy view were fetched but not downloaded
    assert_eq!(report.rows_fetched, 1);
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_group_and_name_fields_shape_the_path() {
    let dir = tempfile::tempdir().unwrap();
    let table = FakeTable::new(vec![
        row(
            "rec1",
            json!({
                "Client": "Acme Corp",
                "Title": "Signed Contract",
                "Attachment": [attachment("scan 01.pdf", "application/pdf", "https://files.example/c")]
            }),
        ),
        row(
            "rec2",
            json!({
                "Attachment": [attachment("notes.txt", "text/plain", "https://files.example/n")]
            }),
        ),
    ]);
    let http = serving(&[
        ("https://files.example/c", b"contract"),
        ("https://files.example/n", b"notes"),
    ]);

    let options = DownloadOptions {
        output_dir: dir.path().to_path_buf(),
        organize_by_extension: false,
        group_by_field: Some("Client".to_string()),
        name_field: Some("Title".to_string()),
        ..Default::default()
    };
    let report = orchestrator(config(options, &[]), table, http)
        .run_download()
        .await
        .unwrap();

    let contract = dir.path().join("AcmeCorp").join("SignedContract.pdf");
    let notes = dir.path().join("untitled").join("notes.txt");
    assert_eq!(report.files_written, vec![contract.clone(), notes.clone()]);
    assert_eq!(read(&contract), b"contract");
    assert_eq!(read(&notes), b"notes");
}

#[tokio::test]
async fn test_failed_fetch_does_not_stop_the_batch() {
    let dir = tempfile::tempdir().unwrap();
    let table = FakeTable::new(vec![row(
        "rec1",
        json!({
            "Files": [
                attachment("gone.pdf", "application/pdf", "https://files.example/expired"),
                attachment("kept.pdf", "application/pdf", "https://files.example/kept"),
            ]
        }),
    )]);
    let http = serving(&[("https://files.example/kept", b"kept")]);

    let options = DownloadOptions {
        output_dir: dir.path().to_path_buf(),
        ..Default::default()
    };
    let report = orchestrator(config(options, &[]), table, http)
        .run_download()
        .await
        .unwrap();

    assert_eq!(report.files_written, vec![dir.path().join("PDF").join("kept.pdf")]);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].filename, "gone.pdf");
    assert!(report.failures[0].reason.contains("404"));
    assert!(!report.is_clean());
}

#[tokio::test]
async fn test_same_target_path_last_write_wins() {
    let dir = tempfile::tempdir().unwrap();
    let table = FakeTable::new(vec![
        row("rec1", json!({"Files": [attachment("a.txt", "text/plain", "https://files.example/1")]})),
        row("rec2", json!({"Files": [attachment("a.txt", "text/plain", "https://files.example/2")]})),
    ]);
    let http = serving(&[
        ("https://files.example/1", b"first"),
        ("https://files.example/2", b"second"),
    ]);

    let options = DownloadOptions {
        output_dir: dir.path().to_path_buf(),
        ..Default::default()
    };
    let report = orchestrator(config(options, &[]), table, http)
        .run_download()
        .await
        .unwrap();

    assert_eq!(report.files_written.len(), 2);
    assert_eq!(read(&dir.path().join("TXT").join("a.txt")), b"second");
}

#[tokio::test]
async fn test_all_attachment_fields_used_when_none_configured() {
    let dir = tempfile::tempdir().unwrap();
    let table = FakeTable::new(vec![row(
        "rec1",
        json!({
            "Name": "not an attachment",
            "Front": [attachment("front.jpg", "image/jpeg", "https://files.example/f")],
            "Back": [attachment("back", "application/octet-stream", "https://files.example/b")]
        }),
    )]);
    let http = serving(&[
        ("https://files.example/f", b"front"),
        ("https://files.example/b", b"back"),
    ]);

    let options = DownloadOptions {
        output_dir: dir.path().to_path_buf(),
        ..Default::default()
    };
    let report = orchestrator(config(options, &[]), table, http)
        .run_download()
        .await
        .unwrap();

    assert_eq!(report.attachments_seen, 2);
    // No extension means no extension folder
    assert!(dir.path().join("back").exists());
    assert!(dir.path().join("JPG").join("front.jpg").exists());
}

#[tokio::test]
async fn test_path_traversal_in_file_name_stays_under_root() {
    let dir = tempfile::tempdir().unwrap();
    let table = FakeTable::new(vec![row(
        "rec1",
        json!({
            "Files": [
                attachment("../../escape.txt", "text/plain", "https://files.example/e"),
                attachment("..", "text/plain", "https://files.example/d"),
            ]
        }),
    )]);
    let http = serving(&[("https://files.example/e", b"e")]);

    let options = DownloadOptions {
        output_dir: dir.path().to_path_buf(),
        organize_by_extension: false,
        ..Default::default()
    };
    let report = orchestrator(config(options, &[]), table, http)
        .run_download()
        .await
        .unwrap();

    assert_eq!(report.files_written, vec![dir.path().join(".._.._escape.txt")]);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].filename, "..");
}
