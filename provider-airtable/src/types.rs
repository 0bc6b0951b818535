//! Airtable API wire types
//!
//! Request and response bodies for the record and metadata endpoints.

use bridge_traits::table::{Row, TableSchema};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// `error` member of a failed response.
///
/// The service sends either `{"type": ..., "message": ...}` or a bare string
/// such as `"NOT_FOUND"`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum ApiErrorPayload {
    Detailed {
        #[serde(rename = "type", default)]
        kind: Option<String>,
        #[serde(default)]
        message: Option<String>,
    },
    Plain(String),
}

impl ApiErrorPayload {
    pub fn kind(&self) -> Option<String> {
        match self {
            ApiErrorPayload::Detailed { kind, .. } => kind.clone(),
            ApiErrorPayload::Plain(_) => None,
        }
    }

    pub fn message(&self) -> String {
        match self {
            ApiErrorPayload::Detailed { kind, message } => message
                .clone()
                .or_else(|| kind.clone())
                .unwrap_or_else(|| "unknown error".to_string()),
            ApiErrorPayload::Plain(text) => text.clone(),
        }
    }
}

/// List records response
///
/// See: https://airtable.com/developers/web/api/list-records
#[derive(Debug, Deserialize)]
pub struct ListRecordsResponse {
    #[serde(default)]
    pub records: Vec<Row>,

    /// Cursor for the next page; absent on the last page
    #[serde(default)]
    pub offset: Option<String>,

    #[serde(default)]
    pub error: Option<ApiErrorPayload>,
}

/// Body of a create-record request
#[derive(Debug, Serialize)]
pub struct CreateRecordRequest<'a> {
    pub fields: &'a Map<String, Value>,
    /// Let the service coerce values (e.g. select options) to the field type
    pub typecast: bool,
}

/// The record echoed back after creation
#[derive(Debug, Deserialize)]
pub struct CreatedRecord {
    pub id: String,
}

/// Base schema response from the metadata API
///
/// See: https://airtable.com/developers/web/api/get-base-schema
#[derive(Debug, Deserialize)]
pub struct TablesResponse {
    #[serde(default)]
    pub tables: Vec<TableSchema>,
}

/// Generic envelope used to pull an error payload out of any response body
#[derive(Debug, Deserialize)]
pub struct ErrorEnvelope {
    pub error: ApiErrorPayload,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_list_response_with_cursor() {
        let response: ListRecordsResponse = serde_json::from_value(json!({
            "records": [
                {"id": "rec1", "createdTime": "2024-03-01T10:00:00.000Z", "fields": {"Name": "a"}},
                {"id": "rec2", "fields": {}}
            ],
            "offset": "itrABC/rec2"
        }))
        .unwrap();

        assert_eq!(response.records.len(), 2);
        assert_eq!(response.offset.as_deref(), Some("itrABC/rec2"));
        assert!(response.error.is_none());
    }

    #[test]
    fn test_error_payload_shapes() {
        let detailed: ListRecordsResponse = serde_json::from_value(json!({
            "error": {"type": "VIEW_NAME_NOT_FOUND", "message": "Could not find view"}
        }))
        .unwrap();
        let error = detailed.error.unwrap();
        assert_eq!(error.kind().as_deref(), Some("VIEW_NAME_NOT_FOUND"));
        assert_eq!(error.message(), "Could not find view");

        let plain: ListRecordsResponse =
            serde_json::from_value(json!({"error": "NOT_FOUND"})).unwrap();
        let error = plain.error.unwrap();
        assert_eq!(error.kind(), None);
        assert_eq!(error.message(), "NOT_FOUND");

        let type_only: ErrorEnvelope =
            serde_json::from_value(json!({"error": {"type": "INVALID_PERMISSIONS"}})).unwrap();
        assert_eq!(type_only.error.message(), "INVALID_PERMISSIONS");
    }

    #[test]
    fn test_create_request_serialization() {
        let mut fields = Map::new();
        fields.insert("Name".to_string(), json!("report.pdf"));
        let body = serde_json::to_value(CreateRecordRequest {
            fields: &fields,
            typecast: true,
        })
        .unwrap();

        assert_eq!(body, json!({"fields": {"Name": "report.pdf"}, "typecast": true}));
    }

    #[test]
    fn test_tables_response() {
        let response: TablesResponse = serde_json::from_value(json!({
            "tables": [{
                "id": "tbl1",
                "name": "Documents",
                "primaryFieldId": "fld1",
                "fields": [
                    {"id": "fld1", "name": "Name", "type": "singleLineText"},
                    {"id": "fld2", "name": "Attachment", "type": "multipleAttachments"}
                ]
            }]
        }))
        .unwrap();

        assert_eq!(response.tables.len(), 1);
        assert!(response.tables[0].has_field("Attachment"));
        assert_eq!(response.tables[0].fields[1].field_type, "multipleAttachments");
    }
}
