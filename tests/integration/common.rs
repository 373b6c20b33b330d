//! Shared fixtures for integration tests.

use sql_runner::config::{RunConfig, Settings};
use sql_runner::error::Result;
use sql_runner::runner::{QueryRunner, RunSummary};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use datafusion::arrow::array::{Int64Array, StringArray};
use datafusion::arrow::datatypes::{DataType, Field, Schema};
use datafusion::arrow::record_batch::RecordBatch;
use datafusion::parquet::arrow::ArrowWriter;

/// Encodes `ids` and `labels` as one Parquet file.
pub fn parquet_bytes(ids: &[i64], labels: &[&str]) -> Vec<u8> {
    let schema = Arc::new(Schema::new(vec![
        Field::new("id", DataType::Int64, false),
        Field::new("label", DataType::Utf8, true),
    ]));
    let batch = RecordBatch::try_new(
        Arc::clone(&schema),
        vec![
            Arc::new(Int64Array::from(ids.to_vec())),
            Arc::new(StringArray::from(labels.to_vec())),
        ],
    )
    .unwrap();

    let mut writer = ArrowWriter::try_new(Vec::new(), schema, None).unwrap();
    writer.write(&batch).unwrap();
    writer.into_inner().unwrap()
}

/// Writes `ids` and `labels` as `<dir>/part-0.parquet`, creating `dir`.
pub fn write_parquet(dir: &Path, ids: &[i64], labels: &[&str]) -> PathBuf {
    std::fs::create_dir_all(dir).unwrap();
    std::fs::write(dir.join("part-0.parquet"), parquet_bytes(ids, labels)).unwrap();
    dir.to_path_buf()
}

/// Writes a query file and returns its path.
pub fn write_query(dir: &Path, sql: &str) -> PathBuf {
    let path = dir.join("query.sql");
    std::fs::write(&path, sql).unwrap();
    path
}

/// Runs `config` with `settings`, returning the summary and printed output.
pub async fn run(config: RunConfig, settings: Settings) -> Result<(RunSummary, String)> {
    let mut out = Vec::new();
    let summary = QueryRunner::new(config, settings).run(&mut out).await?;
    Ok((summary, String::from_utf8(out).unwrap()))
}

/// Parses the data rows out of a rendered table.
///
/// The first `|` line is the header and is skipped.
pub fn data_rows(table: &str) -> Vec<Vec<String>> {
    table
        .lines()
        .filter(|line| line.starts_with('|'))
        .skip(1)
        .map(|line| {
            line.trim_matches('|')
                .split('|')
                .map(|cell| cell.trim().to_string())
                .collect()
        })
        .collect()
}

/// Converts a slice of string slices into owned rows for comparisons.
pub fn rows(expected: &[&[&str]]) -> Vec<Vec<String>> {
    expected
        .iter()
        .map(|row| row.iter().map(|cell| cell.to_string()).collect())
        .collect()
}
