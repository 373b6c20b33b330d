//! sql-runner - Runs a SQL query with preloaded views.

use sql_runner::cli::Cli;
use sql_runner::config::Settings;
use sql_runner::error::Result;
use sql_runner::logging;
use sql_runner::runner::QueryRunner;
use std::io::BufWriter;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    // Parse first: usage errors exit before any session exists.
    let cli = Cli::parse_args();

    // .env may set RUST_LOG, so load it before logging starts.
    dotenvy::dotenv().ok();
    logging::init_stderr_logging(cli.log_level.as_deref());

    if let Err(e) = run(cli).await {
        error!("{}: {}", e.category(), e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config_path();
    info!("Loading config from: {}", config_path.display());
    let mut settings = Settings::load_from_file(&config_path)?;
    settings.apply_env();

    let runner = QueryRunner::new(cli.to_run_config(), settings);

    let stdout = std::io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    let summary = runner.run(&mut out).await?;

    info!(
        "Printed {} rows from {} views in {:?}",
        summary.rows,
        summary.views.len(),
        summary.elapsed
    );
    Ok(())
}
