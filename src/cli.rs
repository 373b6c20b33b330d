//! Command-line argument parsing for sql-runner.
//!
//! Uses clap to parse the query file path and the data source options.
//! The two data source lists are mutually exclusive and are rejected by clap
//! before any engine session exists.

use crate::config::{RunConfig, Settings};
use clap::Parser;
use std::path::PathBuf;

/// A comma separated list, split verbatim.
///
/// Entries are neither trimmed nor filtered: `"a,,b"` yields three entries and
/// an empty argument yields one empty entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommaSeparatedList(pub Vec<String>);

impl CommaSeparatedList {
    /// Consumes the list, returning its entries.
    pub fn into_inner(self) -> Vec<String> {
        self.0
    }
}

/// Splits an option value on `,`.
pub fn parse_comma_separated_list(s: &str) -> Result<CommaSeparatedList, String> {
    Ok(CommaSeparatedList(s.split(',').map(String::from).collect()))
}

/// Runs a SQL query with BigQuery tables or Parquet directories preloaded as views.
#[derive(Parser, Debug)]
#[command(name = "sql-runner")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// The local path to the SQL file to run
    #[arg(value_name = "SQL_SCRIPT")]
    pub sql_script: PathBuf,

    /// Comma separated list of fully qualified BigQuery tables. Views will share the name of the tables.
    #[arg(
        long,
        value_name = "TABLES",
        value_parser = parse_comma_separated_list,
        conflicts_with = "hcfs_dirs"
    )]
    pub bigquery_tables: Option<CommaSeparatedList>,

    /// Data format for reading from BigQuery Storage
    #[arg(long, value_name = "FORMAT")]
    pub bigquery_record_format: Option<String>,

    /// Comma separated list of HCFS directories containing parquet tables. Views will be named the basename of the directories.
    #[arg(long, value_name = "DIRS", value_parser = parse_comma_separated_list)]
    pub hcfs_dirs: Option<CommaSeparatedList>,

    /// Config file path
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Log filter (e.g. "debug", "sql_runner=trace"); overrides RUST_LOG
    #[arg(long, value_name = "LEVEL")]
    pub log_level: Option<String>,
}

impl Cli {
    /// Parses command-line arguments, exiting with a usage error on failure.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Converts the parsed arguments into a run configuration.
    pub fn to_run_config(&self) -> RunConfig {
        RunConfig {
            query_path: self.sql_script.clone(),
            bigquery_tables: self
                .bigquery_tables
                .clone()
                .map(CommaSeparatedList::into_inner)
                .unwrap_or_default(),
            hcfs_dirs: self
                .hcfs_dirs
                .clone()
                .map(CommaSeparatedList::into_inner)
                .unwrap_or_default(),
            bigquery_record_format: self.bigquery_record_format.clone(),
        }
    }

    /// Returns the settings file path to use.
    ///
    /// Uses the --config argument if provided, otherwise the default path.
    pub fn config_path(&self) -> PathBuf {
        self.config.clone().unwrap_or_else(Settings::default_path)
    }
}
