//! sql-runner - Runs a SQL query with preloaded views.
//!
//! Views can be BigQuery tables or directories containing Parquet files.
//! This library exposes the core modules for use in integration tests.

pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod output;
pub mod query;
pub mod runner;
pub mod session;
pub mod source;
pub mod views;
