//! Minimal BigQuery REST v2 client.
//!
//! Only the two read endpoints the source needs are covered: table metadata
//! (for the schema) and `tabledata.list` (for the rows).

use super::TableId;
use crate::config::BigQuerySettings;
use crate::error::{RunnerError, Result};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Table resource returned by `tables.get`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableMetadata {
    #[serde(default)]
    pub schema: Option<TableSchema>,
    #[serde(default)]
    pub num_rows: Option<String>,
    #[serde(default, rename = "type")]
    pub table_type: Option<String>,
}

/// Schema of a table.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TableSchema {
    #[serde(default)]
    pub fields: Vec<TableFieldSchema>,
}

/// One column (or nested field) of a table schema.
#[derive(Debug, Clone, Deserialize)]
pub struct TableFieldSchema {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: String,
    #[serde(default)]
    pub mode: Option<String>,
    #[serde(default)]
    pub fields: Vec<TableFieldSchema>,
}

impl TableFieldSchema {
    /// Returns true if the field is an array.
    pub fn is_repeated(&self) -> bool {
        self.mode
            .as_deref()
            .is_some_and(|m| m.eq_ignore_ascii_case("REPEATED"))
    }

    /// Returns true if the field must be non-null.
    pub fn is_required(&self) -> bool {
        self.mode
            .as_deref()
            .is_some_and(|m| m.eq_ignore_ascii_case("REQUIRED"))
    }
}

/// One page of `tabledata.list`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableDataPage {
    #[serde(default)]
    pub rows: Vec<TableRow>,
    #[serde(default)]
    pub page_token: Option<String>,
    #[serde(default)]
    pub total_rows: Option<String>,
}

/// A row as encoded by the REST API: `{"f": [{"v": ...}, ...]}`.
#[derive(Debug, Clone, Deserialize)]
pub struct TableRow {
    #[serde(default)]
    pub f: Vec<TableCell>,
}

/// A single cell: `{"v": ...}`.
#[derive(Debug, Clone, Deserialize)]
pub struct TableCell {
    #[serde(default)]
    pub v: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
}

/// BigQuery REST client.
#[derive(Debug, Clone)]
pub struct BigQueryClient {
    client: Client,
    endpoint: Url,
    access_token: Option<String>,
    page_size: u32,
}

impl BigQueryClient {
    /// Creates a new client from settings.
    pub fn new(settings: &BigQuerySettings) -> Result<Self> {
        let endpoint = settings.endpoint_url()?;
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| RunnerError::internal(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint,
            access_token: settings.access_token.clone(),
            page_size: settings.page_size,
        })
    }

    /// Builds `{endpoint}/bigquery/v2/projects/{p}/datasets/{d}/tables/{t}[/data]`.
    fn table_url(&self, id: &TableId, data: bool) -> Result<Url> {
        let mut url = self.endpoint.clone();
        {
            let mut segments = url.path_segments_mut().map_err(|_| {
                RunnerError::config(format!("Invalid BigQuery endpoint '{}'", self.endpoint))
            })?;
            segments.pop_if_empty().extend([
                "bigquery",
                "v2",
                "projects",
                id.project.as_str(),
                "datasets",
                id.dataset.as_str(),
                "tables",
                id.table.as_str(),
            ]);
            if data {
                segments.push("data");
            }
        }
        Ok(url)
    }

    /// Fetches table metadata, including the schema.
    pub async fn get_table(&self, id: &TableId) -> Result<TableMetadata> {
        let url = self.table_url(id, false)?;
        self.get_json(id, url, &[]).await
    }

    /// Fetches one page of rows. Pass the previous page's token to continue.
    pub async fn list_rows(&self, id: &TableId, page_token: Option<&str>) -> Result<TableDataPage> {
        let url = self.table_url(id, true)?;
        let page_size = self.page_size.to_string();
        let mut query = vec![
            ("formatOptions.useInt64Timestamp", "true"),
            ("maxResults", page_size.as_str()),
        ];
        if let Some(token) = page_token {
            query.push(("pageToken", token));
        }
        self.get_json(id, url, &query).await
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        id: &TableId,
        url: Url,
        query: &[(&str, &str)],
    ) -> Result<T> {
        debug!("GET {}", url);

        let mut request = self.client.get(url).query(query);
        if let Some(token) = &self.access_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                RunnerError::data_source(format!("Request for BigQuery table {id} timed out"))
            } else if e.is_connect() {
                RunnerError::data_source(format!("Failed to connect to BigQuery API: {e}"))
            } else {
                RunnerError::data_source(format!("BigQuery request failed: {e}"))
            }
        })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| RunnerError::data_source(format!("Failed to read response: {e}")))?;

        if !status.is_success() {
            return Err(Self::parse_error(id, status, &body));
        }

        serde_json::from_str(&body).map_err(|e| {
            RunnerError::data_source(format!(
                "Failed to parse BigQuery response for {id}: {e}"
            ))
        })
    }

    /// Turns an error response into a data source error.
    fn parse_error(id: &TableId, status: reqwest::StatusCode, body: &str) -> RunnerError {
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return RunnerError::data_source(
                "BigQuery authentication failed. Check BIGQUERY_ACCESS_TOKEN.",
            );
        }

        if let Ok(error_response) = serde_json::from_str::<ErrorResponse>(body) {
            return RunnerError::data_source(format!(
                "BigQuery API error for {id} ({status}): {}",
                error_response.error.message
            ));
        }

        RunnerError::data_source(format!("BigQuery API error for {id} ({status}): {body}"))
    }
}
