//! BigQuery table source.
//!
//! Reads a whole table over the BigQuery REST API and keeps it in memory for
//! the lifetime of the session.

mod client;
mod convert;
mod table_id;

pub use client::{BigQueryClient, TableDataPage, TableFieldSchema, TableMetadata};
pub use convert::{ColumnKind, RowConverter};
pub use table_id::TableId;

use super::{DataSource, ReaderOptions, SourceFormat};
use crate::config::BigQuerySettings;
use crate::error::{RunnerError, Result};
use async_trait::async_trait;
use datafusion::dataframe::DataFrame;
use datafusion::datasource::MemTable;
use datafusion::execution::context::SessionContext;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Reader option naming the table to read.
pub const OPTION_TABLE: &str = "table";

/// Reader option carrying the record format hint.
pub const OPTION_READ_DATA_FORMAT: &str = "readDataFormat";

/// Record formats a BigQuery read session can deliver.
///
/// Rows always arrive as `tabledata.list` JSON pages and are decoded into
/// Arrow batches locally, so either format yields the same table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReadDataFormat {
    #[default]
    Arrow,
    Avro,
}

impl ReadDataFormat {
    /// Returns the canonical upper-case name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Arrow => "ARROW",
            Self::Avro => "AVRO",
        }
    }

    /// Parses a format name, ignoring case.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "ARROW" => Some(Self::Arrow),
            "AVRO" => Some(Self::Avro),
            _ => None,
        }
    }

    /// Parses a format name, naming the accepted values on failure.
    pub fn parse_hint(s: &str) -> std::result::Result<Self, String> {
        Self::parse(s).ok_or_else(|| {
            format!("Unsupported BigQuery record format '{s}'. Expected ARROW or AVRO")
        })
    }
}

impl std::fmt::Display for ReadDataFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Loads BigQuery tables.
#[derive(Debug, Clone, Default)]
pub struct BigQuerySource {
    settings: BigQuerySettings,
}

impl BigQuerySource {
    /// Creates a source using the given transport settings.
    pub fn new(settings: BigQuerySettings) -> Self {
        Self { settings }
    }
}

#[async_trait]
impl DataSource for BigQuerySource {
    fn format(&self) -> SourceFormat {
        SourceFormat::BigQuery
    }

    async fn load(&self, ctx: &SessionContext, options: &ReaderOptions) -> Result<DataFrame> {
        for key in options.keys() {
            if key != OPTION_TABLE && key != OPTION_READ_DATA_FORMAT {
                warn!("Ignoring unknown bigquery option '{}'", key);
            }
        }

        let table = options.require(SourceFormat::BigQuery, OPTION_TABLE)?;
        let read_data_format = options
            .get(OPTION_READ_DATA_FORMAT)
            .map(ReadDataFormat::parse_hint)
            .transpose()
            .map_err(RunnerError::data_source)?
            .unwrap_or_default();
        let id = TableId::parse(table, self.settings.project.as_deref())?;
        let client = BigQueryClient::new(&self.settings)?;

        let metadata = client.get_table(&id).await?;
        if let Some(table_type) = metadata.table_type.as_deref() {
            if !matches!(table_type, "TABLE" | "SNAPSHOT") {
                return Err(RunnerError::data_source(format!(
                    "{id} is a {table_type}; only tables can be read"
                )));
            }
        }

        let fields = metadata.schema.map(|s| s.fields).unwrap_or_default();
        let converter = RowConverter::try_new(&fields)?;

        info!(
            "Reading BigQuery table {} ({} rows, read data format: {})",
            id,
            metadata.num_rows.as_deref().unwrap_or("unknown"),
            read_data_format
        );

        let mut batches = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let page = client.list_rows(&id, page_token.as_deref()).await?;
            debug!("Fetched {} rows from {}", page.rows.len(), id);

            if !page.rows.is_empty() {
                batches.push(converter.convert(&page.rows)?);
            }

            match page.page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        let rows: usize = batches.iter().map(|b| b.num_rows()).sum();
        debug!("Loaded {} rows from {}", rows, id);

        let table = MemTable::try_new(converter.schema(), vec![batches]).map_err(|e| {
            RunnerError::internal(format!("Failed to build in-memory table for {id}: {e}"))
        })?;

        ctx.read_table(Arc::new(table)).map_err(|e| {
            RunnerError::data_source(format!("Failed to load BigQuery table {id}: {e}"))
        })
    }
}
