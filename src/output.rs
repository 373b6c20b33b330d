//! Result display.
//!
//! Renders a result as one ASCII table. The CLI always displays with
//! [`RowLimit::Unbounded`]; any limiting belongs in the query text.

use crate::error::{RunnerError, Result};
use datafusion::arrow::record_batch::RecordBatch;
use datafusion::arrow::util::pretty::pretty_format_batches;
use datafusion::dataframe::DataFrame;
use futures::StreamExt;
use std::io::Write;
use std::sync::Arc;
use tracing::debug;

/// Maximum number of rows to display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RowLimit {
    /// Display every row.
    #[default]
    Unbounded,
    /// Display at most this many rows.
    AtMost(usize),
}

/// Evaluates `df` and writes its rows to `out`, returning the row count.
///
/// Batches are pulled from the engine as a stream but held until the last one
/// arrives: column widths depend on every row, so nothing is written before
/// the whole result is known. The header is written even when the result is
/// empty.
pub async fn show<W: Write>(df: DataFrame, limit: RowLimit, out: &mut W) -> Result<usize> {
    let schema = Arc::clone(df.schema().inner());
    let df = match limit {
        RowLimit::Unbounded => df,
        RowLimit::AtMost(n) => df
            .limit(0, Some(n))
            .map_err(|e| RunnerError::execution(e.to_string()))?,
    };

    let mut stream = df
        .execute_stream()
        .await
        .map_err(|e| RunnerError::execution(e.to_string()))?;

    let mut batches = Vec::new();
    let mut rows = 0;
    while let Some(batch) = stream.next().await {
        let batch = batch.map_err(|e| RunnerError::execution(e.to_string()))?;
        if batch.num_rows() > 0 {
            rows += batch.num_rows();
            batches.push(batch);
        }
    }
    debug!("Query produced {} rows in {} batches", rows, batches.len());

    if batches.is_empty() {
        batches.push(RecordBatch::new_empty(schema));
    }

    let table = pretty_format_batches(&batches)
        .map_err(|e| RunnerError::internal(format!("Failed to format results: {e}")))?;

    writeln!(out, "{table}").map_err(|e| RunnerError::io(format!("Failed to write results: {e}")))?;
    out.flush()
        .map_err(|e| RunnerError::io(format!("Failed to write results: {e}")))?;

    Ok(rows)
}
