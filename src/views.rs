//! View registration.
//!
//! Binds every configured data source to a view named after it, BigQuery
//! tables first and then Parquet directories, each group in command-line
//! order. When two sources derive the same name the later one wins.

use crate::config::RunConfig;
use crate::error::Result;
use crate::session::Session;
use crate::source::bigquery::{OPTION_READ_DATA_FORMAT, OPTION_TABLE};
use crate::source::{directory_view_name, table_view_name, SourceFormat};
use std::fmt;
use tracing::{info, warn};

/// Where a view's data comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceRef {
    /// A BigQuery table identifier.
    RemoteTable(String),
    /// A directory of Parquet files.
    Directory(String),
}

impl fmt::Display for SourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RemoteTable(table) => write!(f, "bigquery table {table}"),
            Self::Directory(dir) => write!(f, "parquet directory {dir}"),
        }
    }
}

/// A view registered on the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewBinding {
    /// Name the view is visible under.
    pub name: String,
    /// Source backing the view.
    pub source: SourceRef,
    /// True if this binding replaced an earlier one with the same name.
    pub replaced: bool,
}

/// Registers every data source in `config` as a view on `session`.
///
/// Returns the bindings in registration order. The first load or bind
/// failure aborts registration.
pub async fn register_views(session: &Session, config: &RunConfig) -> Result<Vec<ViewBinding>> {
    let mut bindings = Vec::with_capacity(config.bigquery_tables.len() + config.hcfs_dirs.len());

    for table in &config.bigquery_tables {
        let name = table_view_name(table);
        info!("Loading {}", table);

        let mut reader = session
            .read()
            .format(SourceFormat::BigQuery.as_str())
            .option(OPTION_TABLE, table.as_str());
        if let Some(format) = &config.bigquery_record_format {
            reader = reader.option(OPTION_READ_DATA_FORMAT, format.as_str());
        }
        let df = reader.load().await?;

        bindings.push(bind(session, name, SourceRef::RemoteTable(table.clone()), df)?);
    }

    for dir in &config.hcfs_dirs {
        let name = directory_view_name(dir);
        info!("Loading {}", dir);

        let df = session
            .read()
            .format(SourceFormat::Parquet.as_str())
            .load_path(dir.as_str())
            .await?;

        bindings.push(bind(session, name, SourceRef::Directory(dir.clone()), df)?);
    }

    Ok(bindings)
}

fn bind(
    session: &Session,
    name: &str,
    source: SourceRef,
    df: datafusion::dataframe::DataFrame,
) -> Result<ViewBinding> {
    let replaced = session.create_view(name, df)?;
    if replaced {
        warn!("View '{}' replaced by {}", name, source);
    }

    Ok(ViewBinding {
        name: name.to_string(),
        source,
        replaced,
    })
}
