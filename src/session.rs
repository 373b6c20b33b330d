//! Engine session for sql-runner.
//!
//! A [`Session`] wraps a DataFusion `SessionContext` together with the data
//! sources its readers can load from. Views registered on a session are
//! visible to every query later run on it, and vanish with it.

use crate::config::Settings;
use crate::error::{RunnerError, Result};
use crate::source::{BigQuerySource, DataFrameReader, DataSource, ParquetSource, SourceRegistry};
use datafusion::common::TableReference;
use datafusion::dataframe::DataFrame;
use datafusion::error::DataFusionError;
use datafusion::execution::context::SessionContext;
use datafusion::prelude::SessionConfig;
use object_store::ObjectStore;
use std::sync::Arc;
use tracing::{debug, info};
use url::Url;

/// Builder for [`Session`].
#[derive(Debug, Default)]
pub struct SessionBuilder {
    app_name: Option<String>,
    settings: Settings,
    sources: Vec<Arc<dyn DataSource>>,
    object_stores: Vec<(Url, Arc<dyn ObjectStore>)>,
}

impl SessionBuilder {
    /// Sets the application name. Defaults to `session.app_name` from settings.
    pub fn app_name(mut self, name: impl Into<String>) -> Self {
        self.app_name = Some(name.into());
        self
    }

    /// Sets the settings the session and its sources are built from.
    pub fn settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    /// Adds a data source, replacing the built-in one for its format.
    pub fn with_source(mut self, source: Arc<dyn DataSource>) -> Self {
        self.sources.push(source);
        self
    }

    /// Serves every location under `url` (`scheme://bucket`) from `store`.
    ///
    /// `gs://` and `s3://` buckets without a registered store are connected
    /// on first use from the environment's credentials.
    pub fn with_object_store(mut self, url: Url, store: Arc<dyn ObjectStore>) -> Self {
        self.object_stores.push((url, store));
        self
    }

    /// Creates the session.
    pub fn build(self) -> Result<Session> {
        let session_settings = &self.settings.session;
        if session_settings.batch_size == 0 {
            return Err(RunnerError::config("session.batch_size must be positive"));
        }

        let mut config = SessionConfig::new()
            .with_batch_size(session_settings.batch_size)
            .with_information_schema(true);
        if let Some(partitions) = session_settings.target_partitions {
            config = config.with_target_partitions(partitions);
        }

        let mut sources = SourceRegistry::default();
        sources.register(Arc::new(ParquetSource::new()));
        sources.register(Arc::new(BigQuerySource::new(self.settings.bigquery.clone())));
        for source in self.sources {
            sources.register(source);
        }

        let app_name = self
            .app_name
            .unwrap_or_else(|| session_settings.app_name.clone());
        info!("Starting session '{}'", app_name);

        let ctx = SessionContext::new_with_config(config);
        for (url, store) in self.object_stores {
            debug!("Registering object store for {}", url);
            ctx.register_object_store(&url, store);
        }

        Ok(Session {
            ctx,
            app_name,
            sources,
        })
    }
}

/// One logical application run: a view namespace plus query execution.
pub struct Session {
    ctx: SessionContext,
    app_name: String,
    sources: SourceRegistry,
}

impl Session {
    /// Returns a builder for a new session.
    pub fn builder() -> SessionBuilder {
        SessionBuilder::default()
    }

    /// Returns the application name.
    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    /// Returns the underlying engine context.
    pub fn context(&self) -> &SessionContext {
        &self.ctx
    }

    /// Returns the data sources readers can load from.
    pub fn sources(&self) -> &SourceRegistry {
        &self.sources
    }

    /// Starts configuring a read.
    pub fn read(&self) -> DataFrameReader<'_> {
        DataFrameReader::new(self)
    }

    /// Binds a loaded DataFrame to a view name.
    ///
    /// Names are case-normalized the way unquoted SQL identifiers are, so
    /// `Sales` is queried as `sales`. Returns true if an earlier view with the
    /// same name was replaced.
    pub fn create_view(&self, name: &str, df: DataFrame) -> Result<bool> {
        let reference = TableReference::bare(name.to_lowercase());
        let register_error = |e: DataFusionError| {
            RunnerError::data_source(format!("Failed to register view '{name}': {e}"))
        };

        // Registering over an existing name is an error in the engine.
        let replaced = self
            .ctx
            .table_exist(reference.clone())
            .map_err(register_error)?;
        if replaced {
            self.ctx
                .deregister_table(reference.clone())
                .map_err(register_error)?;
        }

        self.ctx
            .register_table(reference, df.into_view())
            .map_err(register_error)?;

        debug!("Registered view '{}'", name);
        Ok(replaced)
    }

    /// Plans a single SQL statement against the registered views.
    pub async fn sql(&self, sql: &str) -> Result<DataFrame> {
        self.ctx
            .sql(sql)
            .await
            .map_err(|e| RunnerError::execution(e.to_string()))
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("app_name", &self.app_name)
            .field("session_id", &self.ctx.session_id())
            .field("sources", &self.sources)
            .finish()
    }
}
