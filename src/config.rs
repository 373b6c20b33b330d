//! Configuration management for sql-runner.
//!
//! Two layers live here: the per-invocation [`RunConfig`] produced by the CLI,
//! and the [`Settings`] loaded from an optional TOML file and environment
//! variables that tune the engine session and the BigQuery transport.

use crate::error::{RunnerError, Result};
use crate::source::bigquery::ReadDataFormat;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

/// Default BigQuery REST endpoint.
pub const DEFAULT_BIGQUERY_ENDPOINT: &str = "https://bigquery.googleapis.com";

/// Environment variable overriding the BigQuery endpoint (e.g. an emulator).
pub const ENV_BIGQUERY_ENDPOINT: &str = "BIGQUERY_API_ENDPOINT";

/// Environment variable holding the default project for two-part table ids.
pub const ENV_DEFAULT_PROJECT: &str = "GOOGLE_CLOUD_PROJECT";

/// Environment variable holding an OAuth2 access token for BigQuery.
pub const ENV_ACCESS_TOKEN: &str = "BIGQUERY_ACCESS_TOKEN";

/// Everything one invocation needs to know about what to run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunConfig {
    /// Local path of the file holding the query statement.
    pub query_path: PathBuf,

    /// Fully qualified BigQuery table identifiers, in command-line order.
    pub bigquery_tables: Vec<String>,

    /// Directories of Parquet files, in command-line order.
    pub hcfs_dirs: Vec<String>,

    /// Record format hint forwarded to the BigQuery reader.
    pub bigquery_record_format: Option<String>,
}

impl RunConfig {
    /// Creates a config that runs `query_path` without any data sources.
    pub fn new(query_path: impl Into<PathBuf>) -> Self {
        Self {
            query_path: query_path.into(),
            ..Default::default()
        }
    }

    /// Sets the BigQuery tables to register.
    pub fn with_bigquery_tables<I, S>(mut self, tables: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.bigquery_tables = tables.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the Parquet directories to register.
    pub fn with_hcfs_dirs<I, S>(mut self, dirs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.hcfs_dirs = dirs.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the BigQuery record format hint.
    pub fn with_bigquery_record_format(mut self, format: impl Into<String>) -> Self {
        self.bigquery_record_format = Some(format.into());
        self
    }

    /// Checks that at most one kind of data source is configured and that
    /// the record format hint names a known format.
    ///
    /// The CLI enforces exclusivity at parse time; this guards configs built
    /// in code.
    pub fn validate(&self) -> Result<()> {
        if !self.bigquery_tables.is_empty() && !self.hcfs_dirs.is_empty() {
            return Err(RunnerError::config(
                "BigQuery tables and HCFS directories are mutually exclusive",
            ));
        }
        if let Some(format) = &self.bigquery_record_format {
            ReadDataFormat::parse_hint(format).map_err(RunnerError::config)?;
        }
        Ok(())
    }
}

/// Settings loaded from the config file and environment.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Settings {
    /// Engine session settings.
    #[serde(default)]
    pub session: SessionSettings,

    /// BigQuery transport settings.
    #[serde(default)]
    pub bigquery: BigQuerySettings,
}

/// Engine session settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionSettings {
    /// Application name attached to the session (shows up in logs).
    #[serde(default = "default_app_name")]
    pub app_name: String,

    /// Target number of rows per record batch.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Number of partitions the engine plans for. Defaults to the CPU count.
    #[serde(default)]
    pub target_partitions: Option<usize>,
}

fn default_app_name() -> String {
    "Spark SQL Query".to_string()
}

fn default_batch_size() -> usize {
    8192
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            app_name: default_app_name(),
            batch_size: default_batch_size(),
            target_partitions: None,
        }
    }
}

/// BigQuery REST transport settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BigQuerySettings {
    /// Base URL of the BigQuery API.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Project used for `dataset.table` identifiers.
    #[serde(default)]
    pub project: Option<String>,

    /// OAuth2 bearer token (prefer the environment variable).
    #[serde(default)]
    pub access_token: Option<String>,

    /// Rows requested per page.
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_endpoint() -> String {
    DEFAULT_BIGQUERY_ENDPOINT.to_string()
}

fn default_page_size() -> u32 {
    10_000
}

fn default_timeout_secs() -> u64 {
    60
}

impl Default for BigQuerySettings {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            project: None,
            access_token: None,
            page_size: default_page_size(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl BigQuerySettings {
    /// Parses the endpoint, rejecting anything that is not an http(s) URL.
    pub fn endpoint_url(&self) -> Result<Url> {
        let url = Url::parse(&self.endpoint).map_err(|e| {
            RunnerError::config(format!("Invalid BigQuery endpoint '{}': {e}", self.endpoint))
        })?;

        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(RunnerError::config(format!(
                "Invalid scheme '{}' for BigQuery endpoint. Expected 'http' or 'https'",
                url.scheme()
            )));
        }

        Ok(url)
    }

    /// Applies environment overrides using the given lookup function.
    pub fn apply_env_with<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(endpoint) = lookup(ENV_BIGQUERY_ENDPOINT) {
            self.endpoint = endpoint;
        }
        if let Some(project) = lookup(ENV_DEFAULT_PROJECT) {
            self.project = Some(project);
        }
        if let Some(token) = lookup(ENV_ACCESS_TOKEN) {
            self.access_token = Some(token);
        }
    }
}

impl Settings {
    /// Returns the default settings file path for the current platform.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("sql-runner")
            .join("config.toml")
    }

    /// Loads settings from a TOML file. A missing file yields the defaults.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| RunnerError::config(format!("Failed to read config file: {e}")))?;

        Self::parse_toml(&content, path)
    }

    /// Parses settings from a TOML string.
    fn parse_toml(content: &str, path: &Path) -> Result<Self> {
        toml::from_str(content).map_err(|e| {
            RunnerError::config(format!(
                "Configuration error in {}:\n  {}",
                path.display(),
                e
            ))
        })
    }

    /// Applies process environment variables on top of the file settings.
    pub fn apply_env(&mut self) {
        self.bigquery.apply_env_with(|key| std::env::var(key).ok());
    }

    /// Checks values the engine and HTTP client would otherwise reject late.
    pub fn validate(&self) -> Result<()> {
        if self.session.batch_size == 0 {
            return Err(RunnerError::config("session.batch_size must be positive"));
        }
        if self.session.target_partitions == Some(0) {
            return Err(RunnerError::config(
                "session.target_partitions must be positive",
            ));
        }
        if self.bigquery.page_size == 0 {
            return Err(RunnerError::config("bigquery.page_size must be positive"));
        }
        self.bigquery.endpoint_url()?;
        Ok(())
    }
}
