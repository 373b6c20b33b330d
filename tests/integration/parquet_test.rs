//! Parquet directory integration tests.

use super::common::{data_rows, parquet_bytes, run, rows, write_parquet, write_query};
use object_store::memory::InMemory;
use object_store::path::Path as ObjectPath;
use object_store::ObjectStore;
use pretty_assertions::assert_eq;
use sql_runner::config::{RunConfig, Settings};
use sql_runner::output::{self, RowLimit};
use sql_runner::session::Session;
use sql_runner::views::{self, SourceRef};
use std::sync::Arc;
use url::Url;

#[tokio::test]
async fn test_single_directory_view() {
    let dir = tempfile::tempdir().unwrap();
    let events = write_parquet(&dir.path().join("events"), &[1, 2, 3], &["a", "b", "c"]);
    let query = write_query(dir.path(), "SELECT id, label FROM events ORDER BY id");

    let config = RunConfig::new(query).with_hcfs_dirs([events.to_string_lossy()]);
    let (summary, output) = run(config, Settings::default()).await.unwrap();

    assert_eq!(summary.views.len(), 1);
    assert_eq!(summary.views[0].name, "events");
    assert_eq!(
        summary.views[0].source,
        SourceRef::Directory(events.to_string_lossy().into_owned())
    );
    assert!(!summary.views[0].replaced);
    assert!(output.contains("| id | label |"));
    assert_eq!(
        data_rows(&output),
        rows(&[&["1", "a"], &["2", "b"], &["3", "c"]])
    );
}

#[tokio::test]
async fn test_join_across_directories() {
    let dir = tempfile::tempdir().unwrap();
    let orders = write_parquet(&dir.path().join("orders"), &[1, 2], &["widget", "gadget"]);
    let customers = write_parquet(&dir.path().join("customers"), &[1, 2], &["ann", "bob"]);
    let query = write_query(
        dir.path(),
        "SELECT c.label AS customer, o.label AS item \
         FROM orders o JOIN customers c ON o.id = c.id \
         ORDER BY customer",
    );

    let config = RunConfig::new(query)
        .with_hcfs_dirs([orders.to_string_lossy(), customers.to_string_lossy()]);
    let (summary, output) = run(config, Settings::default()).await.unwrap();

    let names: Vec<_> = summary.views.iter().map(|v| v.name.as_str()).collect();
    assert_eq!(names, vec!["orders", "customers"]);
    assert_eq!(
        data_rows(&output),
        rows(&[&["ann", "widget"], &["bob", "gadget"]])
    );
}

#[tokio::test]
async fn test_trailing_slash_directory() {
    let dir = tempfile::tempdir().unwrap();
    let sales = write_parquet(&dir.path().join("sales"), &[7], &["x"]);
    let query = write_query(dir.path(), "SELECT id FROM sales");

    let with_slash = format!("{}/", sales.to_string_lossy());
    let config = RunConfig::new(query).with_hcfs_dirs([with_slash]);
    let (summary, output) = run(config, Settings::default()).await.unwrap();

    assert_eq!(summary.views[0].name, "sales");
    assert_eq!(data_rows(&output), rows(&[&["7"]]));
}

#[tokio::test]
async fn test_name_collision_later_directory_wins() {
    let dir = tempfile::tempdir().unwrap();
    let first = write_parquet(&dir.path().join("a").join("sales"), &[1], &["first"]);
    let second = write_parquet(&dir.path().join("b").join("sales"), &[2], &["second"]);
    let query = write_query(dir.path(), "SELECT id, label FROM sales");

    let config =
        RunConfig::new(query).with_hcfs_dirs([first.to_string_lossy(), second.to_string_lossy()]);
    let (summary, output) = run(config, Settings::default()).await.unwrap();

    assert_eq!(summary.views.len(), 2);
    assert!(!summary.views[0].replaced);
    assert!(summary.views[1].replaced);
    assert_eq!(data_rows(&output), rows(&[&["2", "second"]]));
}

#[tokio::test]
async fn test_all_rows_printed() {
    let dir = tempfile::tempdir().unwrap();
    let ids: Vec<i64> = (0..60).collect();
    let labels: Vec<String> = ids.iter().map(|i| format!("row-{i}")).collect();
    let label_refs: Vec<&str> = labels.iter().map(String::as_str).collect();
    let big = write_parquet(&dir.path().join("big"), &ids, &label_refs);
    let query = write_query(dir.path(), "SELECT id FROM big ORDER BY id");

    let config = RunConfig::new(query).with_hcfs_dirs([big.to_string_lossy()]);
    let (summary, output) = run(config, Settings::default()).await.unwrap();

    assert_eq!(summary.rows, 60);
    let printed = data_rows(&output);
    assert_eq!(printed.len(), 60);
    assert_eq!(printed[59], vec!["59".to_string()]);
}

#[tokio::test]
async fn test_empty_directory_entry() {
    let dir = tempfile::tempdir().unwrap();
    let query = write_query(dir.path(), "SELECT 1");

    let config = RunConfig::new(query).with_hcfs_dirs([""]);
    let err = run(config, Settings::default()).await.unwrap_err();

    assert_eq!(err.category(), "Data Source Error");
}

#[tokio::test]
async fn test_missing_directory() {
    let dir = tempfile::tempdir().unwrap();
    let query = write_query(dir.path(), "SELECT 1");

    let missing = dir.path().join("nope");
    let config = RunConfig::new(query).with_hcfs_dirs([missing.to_string_lossy()]);
    let err = run(config, Settings::default()).await.unwrap_err();

    assert_eq!(err.category(), "Data Source Error");
    assert!(err.to_string().contains("does not exist"));
}

#[tokio::test]
async fn test_hive_partitions_become_columns() {
    let dir = tempfile::tempdir().unwrap();
    let sales = dir.path().join("sales");
    write_parquet(&sales.join("year=2020"), &[1, 2], &["a", "b"]);
    write_parquet(&sales.join("year=2021"), &[3], &["c"]);
    let query = write_query(dir.path(), "SELECT year, id FROM sales ORDER BY year, id");

    let config = RunConfig::new(query).with_hcfs_dirs([sales.to_string_lossy()]);
    let (summary, output) = run(config, Settings::default()).await.unwrap();

    assert_eq!(summary.rows, 3);
    assert!(output.contains("| year | id |"));
    assert_eq!(
        data_rows(&output),
        rows(&[&["2020", "1"], &["2020", "2"], &["2021", "3"]])
    );
}

#[tokio::test]
async fn test_partition_filter() {
    let dir = tempfile::tempdir().unwrap();
    let sales = dir.path().join("sales");
    write_parquet(&sales.join("year=2020"), &[1, 2], &["a", "b"]);
    write_parquet(&sales.join("year=2021"), &[3], &["c"]);
    let query = write_query(dir.path(), "SELECT label FROM sales WHERE year = '2021'");

    let config = RunConfig::new(query).with_hcfs_dirs([sales.to_string_lossy()]);
    let (_, output) = run(config, Settings::default()).await.unwrap();

    assert_eq!(data_rows(&output), rows(&[&["c"]]));
}

#[tokio::test]
async fn test_object_store_directory() {
    let store = Arc::new(InMemory::new());
    for (file, ids, labels) in [
        ("tpch/lineitem/part-0.parquet", &[1_i64, 2][..], &["x", "y"][..]),
        ("tpch/lineitem/part-1.parquet", &[3][..], &["z"][..]),
    ] {
        store
            .put(&ObjectPath::from(file), parquet_bytes(ids, labels).into())
            .await
            .unwrap();
    }

    let session = Session::builder()
        .with_object_store(Url::parse("memory://bucket").unwrap(), store)
        .build()
        .unwrap();
    let config = RunConfig::new("query.sql").with_hcfs_dirs(["memory://bucket/tpch/lineitem"]);

    let bindings = views::register_views(&session, &config).await.unwrap();
    assert_eq!(bindings[0].name, "lineitem");

    let df = session
        .sql("SELECT id, label FROM lineitem ORDER BY id")
        .await
        .unwrap();
    let mut out = Vec::new();
    let count = output::show(df, RowLimit::Unbounded, &mut out).await.unwrap();

    assert_eq!(count, 3);
    assert_eq!(
        data_rows(&String::from_utf8(out).unwrap()),
        rows(&[&["1", "x"], &["2", "y"], &["3", "z"]])
    );
}

#[tokio::test]
async fn test_object_store_scheme_without_store() {
    let dir = tempfile::tempdir().unwrap();
    let query = write_query(dir.path(), "SELECT 1");

    let config = RunConfig::new(query).with_hcfs_dirs(["hdfs://namenode/warehouse/sales"]);
    let err = run(config, Settings::default()).await.unwrap_err();

    assert_eq!(err.category(), "Data Source Error");
    assert!(err.to_string().contains("hdfs"));
}
