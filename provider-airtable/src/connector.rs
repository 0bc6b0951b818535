//! Airtable REST API connector
//!
//! Implements the `TableClient` trait for Airtable API v0.

use async_trait::async_trait;
use bridge_traits::error::{BridgeError, Result};
use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
use bridge_traits::table::{Page, TableClient, TableSchema};
use bridge_traits::time::Clock;
use core_runtime::config::TableConfig;
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use crate::error::AirtableError;
use crate::types::{
    CreateRecordRequest, CreatedRecord, ErrorEnvelope, ListRecordsResponse, TablesResponse,
};

/// Attempts made for writes and schema reads, including the first one
const MAX_ATTEMPTS: u32 = 3;

/// Airtable API connector
///
/// # Retry policy
///
/// Row creation and schema reads make up to three attempts. Any non-2xx
/// status or transport error counts as a failed attempt. After failed attempt
/// `n` (zero-based) the connector sleeps `2^n` seconds, so a fully failing
/// call waits 1 s and then 2 s and never sleeps after the last attempt.
/// Record listing is not retried: an error payload stops pagination.
///
/// # Example
///
/// ```ignore
/// use provider_airtable::AirtableConnector;
/// use bridge_traits::table::TableClient;
///
/// let connector = AirtableConnector::new(http_client, clock, &config.table, timeout);
/// let fetch = connector.fetch_all_rows(&config.table.view_names).await;
/// ```
pub struct AirtableConnector {
    http_client: Arc<dyn HttpClient>,
    clock: Arc<dyn Clock>,
    api_key: String,
    base_id: String,
    table_id: String,
    api_base: String,
    timeout: Duration,
}

impl AirtableConnector {
    /// Create a connector for the table described by `table`
    ///
    /// # Arguments
    ///
    /// * `http_client` - HTTP client implementation
    /// * `clock` - Time source used for backoff sleeps
    /// * `table` - Base, table, token and API host
    /// * `timeout` - Per-request timeout
    pub fn new(
        http_client: Arc<dyn HttpClient>,
        clock: Arc<dyn Clock>,
        table: &TableConfig,
        timeout: Duration,
    ) -> Self {
        Self {
            http_client,
            clock,
            api_key: table.api_key.clone(),
            base_id: table.base_id.clone(),
            table_id: table.table_id.clone(),
            api_base: table.api_base.trim_end_matches('/').to_string(),
            timeout,
        }
    }

    /// `{api_base}/v0/{base}/{table}`
    fn table_endpoint(&self) -> String {
        format!(
            "{}/v0/{}/{}",
            self.api_base,
            self.base_id,
            urlencoding::encode(&self.table_id)
        )
    }

    /// `{api_base}/v0/meta/bases/{base}`
    fn meta_endpoint(&self) -> String {
        format!("{}/v0/meta/bases/{}", self.api_base, self.base_id)
    }

    fn request(&self, method: HttpMethod, url: String) -> HttpRequest {
        HttpRequest::new(method, url)
            .bearer_token(&self.api_key)
            .header("Accept", "application/json")
            .timeout(self.timeout)
    }

    /// Build the list URL with optional `view` and `offset` query parameters
    fn list_url(&self, view: Option<&str>, offset: Option<&str>) -> String {
        let mut params = Vec::new();
        if let Some(view) = view {
            params.push(format!("view={}", urlencoding::encode(view)));
        }
        if let Some(offset) = offset {
            params.push(format!("offset={}", urlencoding::encode(offset)));
        }

        if params.is_empty() {
            self.table_endpoint()
        } else {
            format!("{}?{}", self.table_endpoint(), params.join("&"))
        }
    }

    /// Extract an error message from a non-success response
    fn error_from_response(response: &HttpResponse) -> AirtableError {
        match serde_json::from_slice::<ErrorEnvelope>(&response.body) {
            Ok(envelope) => AirtableError::Api {
                kind: envelope.error.kind(),
                message: envelope.error.message(),
            },
            Err(_) => AirtableError::Status {
                status: response.status,
                body: String::from_utf8_lossy(&response.body).trim().to_string(),
            },
        }
    }

    /// Execute `request` under the fixed retry policy.
    ///
    /// Returns the first 2xx response, or `RetriesExhausted` after
    /// [`MAX_ATTEMPTS`] failures.
    async fn execute_with_backoff(
        &self,
        operation: &str,
        request: HttpRequest,
    ) -> Result<HttpResponse> {
        let mut last_status = None;

        for attempt in 0..MAX_ATTEMPTS {
            match self.http_client.execute(request.clone()).await {
                Ok(response) if response.is_success() => {
                    debug!(operation, attempt = attempt + 1, status = response.status, "Request succeeded");
                    return Ok(response);
                }
                Ok(response) => {
                    last_status = Some(response.status);
                    warn!(
                        operation,
                        attempt = attempt + 1,
                        max_attempts = MAX_ATTEMPTS,
                        status = response.status,
                        error = %Self::error_from_response(&response),
                        "Request failed"
                    );
                }
                Err(e) => {
                    warn!(
                        operation,
                        attempt = attempt + 1,
                        max_attempts = MAX_ATTEMPTS,
                        error = %e,
                        "Request failed"
                    );
                }
            }

            if attempt + 1 < MAX_ATTEMPTS {
                let delay = Duration::from_secs(1u64 << attempt);
                debug!(operation, delay_secs = delay.as_secs(), "Backing off before retry");
                self.clock.sleep(delay).await;
            }
        }

        Err(BridgeError::RetriesExhausted {
            operation: operation.to_string(),
            attempts: MAX_ATTEMPTS,
            last_status,
        })
    }
}

#[async_trait]
impl TableClient for AirtableConnector {
    #[instrument(skip(self), fields(table = %self.table_id))]
    async fn fetch_page(&self, view: Option<&str>, offset: Option<&str>) -> Result<Page> {
        let request = self.request(HttpMethod::Get, self.list_url(view, offset));

        let response = self
            .http_client
            .execute(request)
            .await
            .map_err(|e| AirtableError::NetworkError(e.to_string()))?;

        let body: ListRecordsResponse = match serde_json::from_slice(&response.body) {
            Ok(body) => body,
            Err(_) if !response.is_success() => {
                return Err(Self::error_from_response(&response).into())
            }
            Err(e) => return Err(AirtableError::ParseError(e.to_string()).into()),
        };

        if let Some(error) = body.error {
            warn!(status = response.status, error = %error.message(), "List request returned an error payload");
            return Err(AirtableError::Api {
                kind: error.kind(),
                message: error.message(),
            }
            .into());
        }

        if !response.is_success() {
            return Err(Self::error_from_response(&response).into());
        }

        debug!(
            rows = body.records.len(),
            has_more = body.offset.is_some(),
            "Fetched page"
        );

        Ok(Page {
            rows: body.records,
            offset: body.offset,
        })
    }

    #[instrument(skip(self, fields), fields(table = %self.table_id, field_count = fields.len()))]
    async fn create_row(&self, fields: Map<String, Value>) -> Result<String> {
        let request = self
            .request(HttpMethod::Post, self.table_endpoint())
            .json(&CreateRecordRequest {
                fields: &fields,
                typecast: true,
            })?;

        let response = self.execute_with_backoff("create row", request).await?;
        let created: CreatedRecord = response
            .json()
            .map_err(|e| AirtableError::ParseError(e.to_string()))?;

        info!(row_id = %created.id, "Created row");
        Ok(created.id)
    }

    #[instrument(skip(self))]
    async fn fetch_table_schema(&self, table_ref: &str) -> Result<Option<TableSchema>> {
        let url = format!("{}/tables", self.meta_endpoint());
        let request = self.request(HttpMethod::Get, url);

        let response = self.execute_with_backoff("fetch table schema", request).await?;
        let body: TablesResponse = response
            .json()
            .map_err(|e| AirtableError::ParseError(e.to_string()))?;

        let schema = body
            .tables
            .into_iter()
            .find(|table| table.id == table_ref || table.name == table_ref);

        match &schema {
            Some(table) => debug!(table_id = %table.id, fields = table.fields.len(), "Resolved table schema"),
            None => debug!("Table not present in base schema"),
        }

        Ok(schema)
    }
}
