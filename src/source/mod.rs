//! Data source layer for sql-runner.
//!
//! A [`DataFrameReader`] is configured with a source format name and
//! key/value options, then loaded into a lazy DataFusion `DataFrame`. Each
//! format is served by a [`DataSource`] implementation registered with the
//! session.

pub mod bigquery;
pub mod parquet;

pub use bigquery::BigQuerySource;
pub use parquet::ParquetSource;

use crate::error::{RunnerError, Result};
use crate::session::Session;
use async_trait::async_trait;
use datafusion::dataframe::DataFrame;
use datafusion::execution::context::SessionContext;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

/// Supported source formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceFormat {
    /// Directory of Parquet files.
    Parquet,
    /// BigQuery table read over the REST API.
    BigQuery,
}

impl SourceFormat {
    /// Returns the format name used by readers.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Parquet => "parquet",
            Self::BigQuery => "bigquery",
        }
    }

    /// Parses a format name.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "parquet" => Some(Self::Parquet),
            "bigquery" => Some(Self::BigQuery),
            _ => None,
        }
    }
}

impl fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Key/value options handed to a [`DataSource`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReaderOptions(BTreeMap<String, String>);

impl ReaderOptions {
    /// Sets an option, replacing any earlier value.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    /// Returns an option value.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Returns an option value or a data source error naming the missing key.
    pub fn require(&self, format: SourceFormat, key: &str) -> Result<&str> {
        self.get(key).ok_or_else(|| {
            RunnerError::data_source(format!("Option '{key}' is required for {format} sources"))
        })
    }

    /// Iterates over option keys in sorted order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

/// Trait for loaders that turn reader options into a tabular reference.
#[async_trait]
pub trait DataSource: Send + Sync {
    /// The format this source serves.
    fn format(&self) -> SourceFormat;

    /// Loads the data described by `options` as a lazy DataFrame.
    async fn load(&self, ctx: &SessionContext, options: &ReaderOptions) -> Result<DataFrame>;
}

impl fmt::Debug for dyn DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DataSource({})", self.format())
    }
}

/// The data sources available to a session, one per format.
#[derive(Clone, Default)]
pub struct SourceRegistry {
    sources: HashMap<SourceFormat, Arc<dyn DataSource>>,
}

impl SourceRegistry {
    /// Registers a source, replacing any earlier source for the same format.
    pub fn register(&mut self, source: Arc<dyn DataSource>) {
        self.sources.insert(source.format(), source);
    }

    /// Returns the source for a format.
    pub fn get(&self, format: SourceFormat) -> Result<&Arc<dyn DataSource>> {
        self.sources.get(&format).ok_or_else(|| {
            RunnerError::data_source(format!("No data source registered for format '{format}'"))
        })
    }
}

impl fmt::Debug for SourceRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut formats: Vec<_> = self.sources.keys().map(SourceFormat::as_str).collect();
        formats.sort_unstable();
        f.debug_struct("SourceRegistry")
            .field("formats", &formats)
            .finish()
    }
}

/// Builder-style reader bound to a session.
pub struct DataFrameReader<'a> {
    session: &'a Session,
    format: Option<String>,
    options: ReaderOptions,
}

impl<'a> DataFrameReader<'a> {
    pub(crate) fn new(session: &'a Session) -> Self {
        Self {
            session,
            format: None,
            options: ReaderOptions::default(),
        }
    }

    /// Sets the source format by name.
    pub fn format(mut self, name: impl Into<String>) -> Self {
        self.format = Some(name.into());
        self
    }

    /// Sets a reader option.
    pub fn option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.set(key, value);
        self
    }

    /// Loads the configured source.
    pub async fn load(self) -> Result<DataFrame> {
        let name = self
            .format
            .ok_or_else(|| RunnerError::data_source("No source format set on reader"))?;
        let format = SourceFormat::parse(&name)
            .ok_or_else(|| RunnerError::data_source(format!("Unknown source format '{name}'")))?;

        let source = self.session.sources().get(format)?;
        source.load(self.session.context(), &self.options).await
    }

    /// Loads the source at `path`, setting the `path` option.
    pub async fn load_path(self, path: impl Into<String>) -> Result<DataFrame> {
        self.option("path", path).load().await
    }
}

/// Derives a view name from a table identifier: its final `.` component.
pub fn table_view_name(table: &str) -> &str {
    table.rsplit('.').next().unwrap_or(table)
}

/// Derives a view name from a directory: its final path segment.
///
/// Trailing slashes are ignored so `gs://bucket/sales/` names `sales`.
pub fn directory_view_name(dir: &str) -> &str {
    let trimmed = dir.trim_end_matches('/');
    trimmed.rsplit('/').next().unwrap_or(trimmed)
}
