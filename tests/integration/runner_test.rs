//! Query runner integration tests.
//!
//! Covers runs without data sources and the error paths of each step.

use super::common::{data_rows, run, rows, write_query};
use pretty_assertions::assert_eq;
use sql_runner::config::{RunConfig, Settings};

#[tokio::test]
async fn test_select_one_without_sources() {
    let dir = tempfile::tempdir().unwrap();
    let query = write_query(dir.path(), "SELECT 1");

    let (summary, output) = run(RunConfig::new(query), Settings::default())
        .await
        .unwrap();

    assert!(summary.views.is_empty());
    assert_eq!(summary.rows, 1);
    assert_eq!(data_rows(&output), rows(&[&["1"]]));
}

#[tokio::test]
async fn test_query_file_with_trailing_semicolon_and_comments() {
    let dir = tempfile::tempdir().unwrap();
    let query = write_query(
        dir.path(),
        "-- nightly check\nSELECT 'ok' AS status;\n",
    );

    let (_, output) = run(RunConfig::new(query), Settings::default())
        .await
        .unwrap();

    assert!(output.contains("| status |"));
    assert_eq!(data_rows(&output), rows(&[&["ok"]]));
}

#[tokio::test]
async fn test_missing_query_file() {
    let err = run(
        RunConfig::new("/nonexistent/sql-runner/query.sql"),
        Settings::default(),
    )
    .await
    .unwrap_err();

    assert_eq!(err.category(), "I/O Error");
}

#[tokio::test]
async fn test_invalid_sql() {
    let dir = tempfile::tempdir().unwrap();
    let query = write_query(dir.path(), "SELEC 1 FROM");

    let err = run(RunConfig::new(query), Settings::default())
        .await
        .unwrap_err();

    assert_eq!(err.category(), "Execution Error");
}

#[tokio::test]
async fn test_unknown_view() {
    let dir = tempfile::tempdir().unwrap();
    let query = write_query(dir.path(), "SELECT * FROM lineitem");

    let err = run(RunConfig::new(query), Settings::default())
        .await
        .unwrap_err();

    assert_eq!(err.category(), "Execution Error");
    assert!(err.to_string().contains("lineitem"));
}

#[tokio::test]
async fn test_both_source_kinds_rejected_before_loading() {
    let dir = tempfile::tempdir().unwrap();
    let query = write_query(dir.path(), "SELECT 1");
    let config = RunConfig::new(query)
        .with_bigquery_tables(["p.d.t"])
        .with_hcfs_dirs(["/data/t"]);

    let err = run(config, Settings::default()).await.unwrap_err();

    assert_eq!(err.category(), "Configuration Error");
}

#[tokio::test]
async fn test_invalid_settings_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let query = write_query(dir.path(), "SELECT 1");
    let mut settings = Settings::default();
    settings.bigquery.endpoint = "not a url".to_string();

    let err = run(RunConfig::new(query), settings).await.unwrap_err();

    assert_eq!(err.category(), "Configuration Error");
}

#[tokio::test]
async fn test_large_result_is_not_truncated() {
    let dir = tempfile::tempdir().unwrap();
    let query = write_query(
        dir.path(),
        "SELECT n FROM (SELECT unnest(range(0, 75)) AS n) ORDER BY n",
    );

    let (summary, output) = run(RunConfig::new(query), Settings::default())
        .await
        .unwrap();

    assert_eq!(summary.rows, 75);
    let printed = data_rows(&output);
    assert_eq!(printed.len(), 75);
    assert_eq!(printed[0], vec!["0".to_string()]);
    assert_eq!(printed[74], vec!["74".to_string()]);
}
