//! Parquet directory source.
//!
//! Every `*.parquet` file below the directory becomes part of one logical
//! table whose schema is inferred by the engine. Hive-style `key=value`
//! directories below the root become string partition columns.

use super::{DataSource, ReaderOptions, SourceFormat};
use crate::error::{RunnerError, Result};
use async_trait::async_trait;
use datafusion::arrow::datatypes::DataType;
use datafusion::dataframe::DataFrame;
use datafusion::datasource::file_format::parquet::ParquetFormat;
use datafusion::datasource::listing::{
    ListingOptions, ListingTable, ListingTableConfig, ListingTableUrl,
};
use datafusion::error::DataFusionError;
use datafusion::execution::context::SessionContext;
use datafusion::execution::object_store::ObjectStoreUrl;
use object_store::aws::AmazonS3Builder;
use object_store::gcp::GoogleCloudStorageBuilder;
use object_store::ObjectStore;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};
use url::Url;

const PARQUET_EXTENSION: &str = ".parquet";

/// Loads directories of Parquet files.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParquetSource;

impl ParquetSource {
    /// Creates a new Parquet source.
    pub fn new() -> Self {
        Self
    }
}

/// Where a Parquet location lives.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Location {
    /// A local filesystem path.
    Local(PathBuf),
    /// An object store URL (`gs://bucket/dir/`), normalized to a directory
    /// unless it names a single file.
    Remote(Url),
}

impl Location {
    fn parse(location: &str) -> Result<Self> {
        match Url::parse(location) {
            Ok(url) if url.scheme() == "file" => url
                .to_file_path()
                .map(Self::Local)
                .map_err(|_| RunnerError::data_source(format!("Invalid file URL: {location}"))),
            // Single letters are Windows drive prefixes, not schemes.
            Ok(mut url) if url.scheme().len() > 1 => {
                if url.host_str().map_or(true, str::is_empty) {
                    return Err(RunnerError::data_source(format!(
                        "Missing bucket in {location}"
                    )));
                }
                // Object stores have no directories, only prefixes.
                let path = url.path().to_string();
                if !path.ends_with('/') && !path.ends_with(PARQUET_EXTENSION) {
                    url.set_path(&format!("{path}/"));
                }
                Ok(Self::Remote(url))
            }
            _ => Ok(Self::Local(Path::new(location).to_path_buf())),
        }
    }
}

/// Returns the `scheme://bucket` root a store is registered under.
fn store_root(url: &Url) -> Result<Url> {
    let root = format!("{}://{}", url.scheme(), url.authority());
    Url::parse(&root)
        .map_err(|e| RunnerError::data_source(format!("Invalid store URL {root}: {e}")))
}

/// Builds a store for a cloud bucket, configured from `GOOGLE_*` or `AWS_*`
/// environment variables.
fn cloud_store(root: &Url) -> Result<Arc<dyn ObjectStore>> {
    let store_error =
        |e: object_store::Error| RunnerError::data_source(format!("Failed to open {root}: {e}"));

    match root.scheme() {
        "gs" => {
            let store = GoogleCloudStorageBuilder::from_env()
                .with_url(root.as_str())
                .build()
                .map_err(store_error)?;
            Ok(Arc::new(store))
        }
        "s3" | "s3a" => {
            let store = AmazonS3Builder::from_env()
                .with_url(root.as_str())
                .build()
                .map_err(store_error)?;
            Ok(Arc::new(store))
        }
        other => Err(RunnerError::data_source(format!(
            "No object store available for scheme '{other}'"
        ))),
    }
}

/// Makes sure the session can resolve `url`, connecting to its bucket if no
/// store was registered for it.
fn ensure_object_store(ctx: &SessionContext, url: &Url) -> Result<()> {
    let root = store_root(url)?;
    let key = ObjectStoreUrl::parse(root.as_str())
        .map_err(|e| RunnerError::data_source(format!("Invalid store URL {root}: {e}")))?;
    if ctx.runtime_env().object_store(&key).is_ok() {
        return Ok(());
    }

    info!("Connecting to {}", root);
    ctx.register_object_store(&root, cloud_store(&root)?);
    Ok(())
}

fn load_error(location: &str) -> impl Fn(DataFusionError) -> RunnerError + '_ {
    move |e| RunnerError::data_source(format!("Failed to load parquet from {location}: {e}"))
}

#[async_trait]
impl DataSource for ParquetSource {
    fn format(&self) -> SourceFormat {
        SourceFormat::Parquet
    }

    async fn load(&self, ctx: &SessionContext, options: &ReaderOptions) -> Result<DataFrame> {
        let location = options.require(SourceFormat::Parquet, "path")?;
        if location.is_empty() {
            return Err(RunnerError::data_source("Parquet path must not be empty"));
        }

        let table_path = match Location::parse(location)? {
            Location::Local(path) => {
                // The engine treats a missing local path as an empty listing,
                // which would silently produce a table without columns.
                if !path.exists() {
                    return Err(RunnerError::data_source(format!(
                        "Path does not exist: {location}"
                    )));
                }
                ListingTableUrl::parse(path.to_string_lossy())
            }
            Location::Remote(url) => {
                ensure_object_store(ctx, &url)?;
                ListingTableUrl::parse(url.as_str())
            }
        }
        .map_err(load_error(location))?;

        debug!("Reading parquet files under {}", table_path);

        let state = ctx.state();
        let listing = ListingOptions::new(Arc::new(ParquetFormat::default()))
            .with_file_extension(PARQUET_EXTENSION)
            .with_target_partitions(state.config().target_partitions());

        // `ListingOptions::infer_partitions` is crate-private upstream; the
        // public config wrapper runs the same inference, we keep the names.
        let partitions: Vec<String> = ListingTableConfig::new(table_path.clone())
            .with_listing_options(listing.clone())
            .infer_partitions_from_path(&state)
            .await
            .map_err(load_error(location))?
            .options
            .map(|options| {
                options
                    .table_partition_cols
                    .into_iter()
                    .map(|(column, _)| column)
                    .collect()
            })
            .unwrap_or_default();
        if !partitions.is_empty() {
            debug!("Partition columns for {}: {:?}", location, partitions);
        }
        let listing = listing.with_table_partition_cols(
            partitions
                .into_iter()
                .map(|column| (column, DataType::Utf8))
                .collect(),
        );

        let schema = listing
            .infer_schema(&state, &table_path)
            .await
            .map_err(load_error(location))?;
        let config = ListingTableConfig::new(table_path)
            .with_listing_options(listing)
            .with_schema(schema);
        let table = ListingTable::try_new(config).map_err(load_error(location))?;

        ctx.read_table(Arc::new(table)).map_err(load_error(location))
    }
}
