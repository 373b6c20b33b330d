//! The query runner: session, views, query, output.

use crate::config::{RunConfig, Settings};
use crate::error::Result;
use crate::output::{self, RowLimit};
use crate::query;
use crate::session::Session;
use crate::views::{self, ViewBinding};
use std::io::Write;
use std::time::{Duration, Instant};
use tracing::info;

/// What a completed run did.
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// Views registered before the query ran, in registration order.
    pub views: Vec<ViewBinding>,
    /// Number of rows printed.
    pub rows: usize,
    /// Wall time from session creation to the last row written.
    pub elapsed: Duration,
}

/// Runs one query file against freshly registered views.
#[derive(Debug, Clone)]
pub struct QueryRunner {
    config: RunConfig,
    settings: Settings,
}

impl QueryRunner {
    /// Creates a runner for the given invocation and settings.
    pub fn new(config: RunConfig, settings: Settings) -> Self {
        Self { config, settings }
    }

    /// Executes the run, writing every result row to `out`.
    pub async fn run<W: Write>(&self, out: &mut W) -> Result<RunSummary> {
        self.config.validate()?;
        self.settings.validate()?;

        let start = Instant::now();
        let session = Session::builder()
            .settings(self.settings.clone())
            .build()?;

        let views = views::register_views(&session, &self.config).await?;

        info!("Running {}", self.config.query_path.display());
        let sql = query::read_query_file(&self.config.query_path)?;
        let df = query::execute(&session, &sql).await?;
        let rows = output::show(df, RowLimit::Unbounded, out).await?;

        Ok(RunSummary {
            views,
            rows,
            elapsed: start.elapsed(),
        })
    }
}
