//! Remote Table Abstraction
//!
//! Data model for rows and attachments of a spreadsheet-style table service,
//! and the [`TableClient`] trait the sync engine talks to.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{BridgeError, Result};

/// A file reference nested inside a row field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    /// Service-side attachment ID (absent on attachments we create)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Fetch location; may be time-limited
    pub url: String,

    pub filename: String,

    /// MIME type as reported by the service
    #[serde(rename = "type", default)]
    pub mime_type: String,

    #[serde(rename = "size", default, skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<u64>,
}

impl Attachment {
    /// Lower-cased substring after the last `.` of the filename, or `""` when
    /// the filename has no dot.
    pub fn extension(&self) -> String {
        match self.filename.rfind('.') {
            Some(idx) => self.filename[idx + 1..].to_lowercase(),
            None => String::new(),
        }
    }
}

/// A remote record: an opaque ID plus named field values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    pub id: String,

    #[serde(default)]
    pub fields: Map<String, Value>,

    #[serde(
        rename = "createdTime",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub created_time: Option<String>,
}

impl Row {
    pub fn new(id: impl Into<String>, fields: Map<String, Value>) -> Self {
        Self {
            id: id.into(),
            fields,
            created_time: None,
        }
    }

    /// Decode `field` as an attachment list.
    ///
    /// Missing fields, non-list values and lists that do not decode as
    /// attachments all yield an empty list.
    pub fn attachments(&self, field: &str) -> Vec<Attachment> {
        match self.fields.get(field) {
            Some(value @ Value::Array(_)) => {
                serde_json::from_value(value.clone()).unwrap_or_default()
            }
            _ => Vec::new(),
        }
    }

    /// Names of all fields holding a non-empty attachment list, in field order.
    pub fn attachment_fields(&self) -> Vec<String> {
        self.fields
            .keys()
            .filter(|name| !self.attachments(name).is_empty())
            .cloned()
            .collect()
    }

    /// Whether `field` is present and holds something other than null, an
    /// empty string or an empty list.
    pub fn has_value(&self, field: &str) -> bool {
        match self.fields.get(field) {
            None | Some(Value::Null) => false,
            Some(Value::String(s)) => !s.is_empty(),
            Some(Value::Array(items)) => !items.is_empty(),
            Some(_) => true,
        }
    }

    /// Text rendering of a scalar field (strings, numbers, booleans, lists of
    /// strings joined with `", "`).
    pub fn field_text(&self, field: &str) -> Option<String> {
        match self.fields.get(field)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            Value::Array(items) => {
                let parts: Vec<&str> = items.iter().filter_map(Value::as_str).collect();
                if parts.is_empty() {
                    None
                } else {
                    Some(parts.join(", "))
                }
            }
            _ => None,
        }
    }
}

/// One batch of rows plus the cursor for the next batch.
///
/// A present `offset` means more pages exist.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub rows: Vec<Row>,
    pub offset: Option<String>,
}

/// A field definition from the table schema
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSchema {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(rename = "type", default)]
    pub field_type: String,
}

/// Table definition from the metadata endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSchema {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub fields: Vec<FieldSchema>,
}

impl TableSchema {
    pub fn has_field(&self, name: &str) -> bool {
        self.fields.iter().any(|f| f.name == name)
    }
}

/// Failure that stopped pagination of one view
#[derive(Debug)]
pub struct ViewFetchError {
    /// View being fetched; `None` for the unscoped pass
    pub view: Option<String>,
    /// Pages that were fetched successfully before the failure
    pub pages_fetched: u32,
    pub error: BridgeError,
}

/// Result of a multi-view fetch: rows accumulated so far plus any per-view
/// failures. Rows fetched before a failure are kept.
#[derive(Debug, Default)]
pub struct RowFetch {
    pub rows: Vec<Row>,
    pub errors: Vec<ViewFetchError>,
}

impl RowFetch {
    pub fn is_complete(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Client for a remote table resource.
///
/// Implementations own their retry policy for writes and schema reads.
/// Pagination across views is provided on top of [`fetch_page`](TableClient::fetch_page).
#[async_trait]
pub trait TableClient: Send + Sync {
    /// Fetch one page of rows, optionally scoped to a view, starting at `offset`.
    ///
    /// An error payload in the response body yields [`BridgeError::Remote`].
    async fn fetch_page(&self, view: Option<&str>, offset: Option<&str>) -> Result<Page>;

    /// Create a single row and return its ID
    async fn create_row(&self, fields: Map<String, Value>) -> Result<String>;

    /// Look up the schema of `table_ref` (matched by table ID or name).
    ///
    /// Returns `Ok(None)` when the base has no such table.
    async fn fetch_table_schema(&self, table_ref: &str) -> Result<Option<TableSchema>>;

    /// Fetch every row of every requested view.
    ///
    /// With no view names a single unscoped pass is made. Each view is paged
    /// until the service stops returning a cursor. A failing page stops that
    /// view only; rows already accumulated are kept and the failure is
    /// reported in [`RowFetch::errors`].
    async fn fetch_all_rows(&self, view_names: &[String]) -> RowFetch {
        let views: Vec<Option<&str>> = if view_names.is_empty() {
            vec![None]
        } else {
            view_names.iter().map(|v| Some(v.as_str())).collect()
        };

        let mut fetch = RowFetch::default();
        for view in views {
            let mut offset: Option<String> = None;
            let mut pages_fetched = 0u32;
            loop {
                match self.fetch_page(view, offset.as_deref()).await {
                    Ok(page) => {
                        pages_fetched += 1;
                        fetch.rows.extend(page.rows);
                        match page.offset {
                            Some(next) => offset = Some(next),
                            None => break,
                        }
                    }
                    Err(error) => {
                        fetch.errors.push(ViewFetchError {
                            view: view.map(str::to_string),
                            pages_fetched,
                            error,
                        });
                        break;
                    }
                }
            }
        }
        fetch
    }

    /// Unfiltered read of the current table state
    async fn get_rows_snapshot(&self) -> Result<Vec<Row>> {
        let mut fetch = self.fetch_all_rows(&[]).await;
        match fetch.errors.pop() {
            Some(failure) => Err(failure.error),
            None => Ok(fetch.rows),
        }
    }
}
