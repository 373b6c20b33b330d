//! Query loading and execution.

use crate::error::{RunnerError, Result};
use crate::session::Session;
use datafusion::dataframe::DataFrame;
use std::path::Path;
use std::time::Instant;
use tracing::debug;

/// Reads the whole query file as one opaque statement.
pub fn read_query_file(path: &Path) -> Result<String> {
    std::fs::read_to_string(path)
        .map_err(|e| RunnerError::io(format!("Failed to read {}: {e}", path.display())))
}

/// Plans `sql` against the session's views, returning a lazy result.
///
/// Nothing is evaluated until the returned DataFrame is consumed.
pub async fn execute(session: &Session, sql: &str) -> Result<DataFrame> {
    let start = Instant::now();
    let df = session.sql(sql).await?;
    debug!("Planned query in {:?}", start.elapsed());
    Ok(df)
}
