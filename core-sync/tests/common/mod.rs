//! Shared fakes for the orchestrator integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use bridge_traits::error::{BridgeError, Result};
use bridge_traits::http::{HttpClient, HttpRequest, HttpResponse};
use bridge_traits::storage::{ObjectStore, StagedObject};
use bridge_traits::table::{Page, Row, TableClient, TableSchema};
use bridge_traits::time::Clock;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use mockall::mock;
use serde_json::{json, Map, Value};
use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

// ============================================================================
// Table
// ============================================================================

/// In-memory table. Every view returns the same rows in a single page.
pub struct FakeTable {
    pub rows: Vec<Row>,
    /// Views whose first page answers with an error payload
    pub failing_views: Vec<Option<String>>,
    pub schema: std::result::Result<Option<TableSchema>, String>,
    /// Files whose row creation fails after retries
    pub failing_creates: Vec<String>,
    pub created: Mutex<Vec<Map<String, Value>>>,
    /// Snapshots handed out by verification polls, oldest first
    pub snapshots: Mutex<VecDeque<Vec<Row>>>,
    pub snapshot_calls: Mutex<usize>,
}

impl FakeTable {
    pub fn new(rows: Vec<Row>) -> Self {
        Self {
            rows,
            failing_views: Vec::new(),
            schema: Ok(Some(schema(&["Name", "Attachment", "Status"]))),
            failing_creates: Vec::new(),
            created: Mutex::new(Vec::new()),
            snapshots: Mutex::new(VecDeque::new()),
            snapshot_calls: Mutex::new(0),
        }
    }

    pub fn created(&self) -> Vec<Map<String, Value>> {
        self.created.lock().unwrap().clone()
    }

    pub fn push_snapshot(&self, rows: Vec<Row>) {
        self.snapshots.lock().unwrap().push_back(rows);
    }

    pub fn snapshot_calls(&self) -> usize {
        *self.snapshot_calls.lock().unwrap()
    }
}

#[async_trait]
impl TableClient for FakeTable {
    async fn fetch_page(&self, view: Option<&str>, _offset: Option<&str>) -> Result<Page> {
        let view = view.map(str::to_string);
        if self.failing_views.contains(&view) {
            return Err(BridgeError::Remote(
                "VIEW_NAME_NOT_FOUND: Could not find view".to_string(),
            ));
        }
        Ok(Page {
            rows: self.rows.clone(),
            offset: None,
        })
    }

    async fn create_row(&self, fields: Map<String, Value>) -> Result<String> {
        let filename = fields
            .values()
            .filter_map(|v| v.pointer("/0/filename"))
            .filter_map(Value::as_str)
            .next()
            .unwrap_or_default()
            .to_string();
        if self.failing_creates.contains(&filename) {
            return Err(BridgeError::RetriesExhausted {
                operation: "create row".to_string(),
                attempts: 3,
                last_status: Some(422),
            });
        }

        let mut created = self.created.lock().unwrap();
        created.push(fields);
        Ok(format!("rec{}", created.len()))
    }

    async fn fetch_table_schema(&self, _table_ref: &str) -> Result<Option<TableSchema>> {
        self.schema.clone().map_err(|msg| BridgeError::RetriesExhausted {
            operation: msg,
            attempts: 3,
            last_status: Some(503),
        })
    }

    async fn get_rows_snapshot(&self) -> Result<Vec<Row>> {
        *self.snapshot_calls.lock().unwrap() += 1;
        let mut snapshots = self.snapshots.lock().unwrap();
        Ok(if snapshots.len() > 1 {
            snapshots.pop_front().unwrap_or_default()
        } else {
            snapshots.front().cloned().unwrap_or_default()
        })
    }
}

pub fn schema(fields: &[&str]) -> TableSchema {
    serde_json::from_value(json!({
        "id": "tblUploads",
        "name": "Uploads",
        "fields": fields.iter().map(|name| json!({"name": name, "type": "singleLineText"})).collect::<Vec<_>>()
    }))
    .unwrap()
}

pub fn row(id: &str, fields: Value) -> Row {
    Row::new(id, fields.as_object().cloned().unwrap_or_default())
}

pub fn attachment(filename: &str, mime_type: &str, url: &str) -> Value {
    json!({"id": format!("att-{}", filename), "url": url, "filename": filename, "type": mime_type})
}

// ============================================================================
// Storage
// ============================================================================

#[derive(Default)]
pub struct FakeStore {
    /// File names whose upload is rejected
    pub failing_uploads: Vec<String>,
    /// Keys whose delete fails
    pub failing_deletes: Vec<String>,
    pub uploads: Mutex<Vec<PathBuf>>,
    pub deletes: Mutex<Vec<String>>,
}

impl FakeStore {
    pub fn uploads(&self) -> Vec<PathBuf> {
        self.uploads.lock().unwrap().clone()
    }

    pub fn deletes(&self) -> Vec<String> {
        self.deletes.lock().unwrap().clone()
    }
}

#[async_trait]
impl ObjectStore for FakeStore {
    fn name(&self) -> &'static str {
        "fake"
    }

    async fn upload(&self, local_path: &Path) -> Result<StagedObject> {
        let filename = local_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_string();
        self.uploads.lock().unwrap().push(local_path.to_path_buf());
        if self.failing_uploads.contains(&filename) {
            return Err(BridgeError::OperationFailed(
                "Bucket storage: quota exceeded".to_string(),
            ));
        }
        Ok(StagedObject {
            key: format!("staging/{}", filename),
            url: format!("https://stage.example/{}", filename),
        })
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.deletes.lock().unwrap().push(key.to_string());
        if self.failing_deletes.iter().any(|k| k == key) {
            return Err(BridgeError::OperationFailed("delete refused".to_string()));
        }
        Ok(())
    }
}

// ============================================================================
// Clock
// ============================================================================

/// Clock whose sleeps return immediately and are recorded
#[derive(Default)]
pub struct RecordingClock {
    pub sleeps: Mutex<Vec<Duration>>,
}

impl RecordingClock {
    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().unwrap().clone()
    }
}

#[async_trait]
impl Clock for RecordingClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    async fn sleep(&self, duration: Duration) {
        self.sleeps.lock().unwrap().push(duration);
    }
}

// ============================================================================
// HTTP
// ============================================================================

mock! {
    pub HttpClient {}

    #[async_trait]
    impl HttpClient for HttpClient {
        async fn execute(&self, request: HttpRequest) -> Result<HttpResponse>;
    }
}

/// HTTP mock serving fixed bodies by URL; unknown URLs answer 404
pub fn serving(files: &[(&str, &[u8])]) -> MockHttpClient {
    let files: HashMap<String, Bytes> = files
        .iter()
        .map(|(url, body)| (url.to_string(), Bytes::copy_from_slice(body)))
        .collect();

    let mut http = MockHttpClient::new();
    http.expect_execute().returning(move |request| {
        let (status, body) = match files.get(&request.url) {
            Some(body) => (200, body.clone()),
            None => (404, Bytes::from_static(b"not found")),
        };
        Ok(HttpResponse {
            status,
            headers: HashMap::new(),
            body,
        })
    });
    http
}
