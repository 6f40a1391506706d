//! High-level runner API for the SALT loader.
//!
//! This module provides a simplified public interface over the orchestrator,
//! the store and the Parquet reader. It is the primary API for external users
//! and for the CLI.

use anyhow::{Context, Result};
use std::path::PathBuf;

use crate::config::{
    DEFAULT_BATCH_SIZE, DEFAULT_DATABASE_PATH, DEFAULT_SOURCE_DIR, LOG_FILTER, QUIET_LOG_FILTER,
};
use crate::coordination::{LoadConfigBuilder, Orchestrator, SourcePaths};

pub use crate::coordination::{LoadReport, TableReport};
pub use crate::error::LoadError;

/// Arguments for running a load
#[derive(Debug, Clone)]
pub struct LoadArgs {
    // Source configuration
    pub source_dir: PathBuf,
    pub addresses: Option<PathBuf>,
    pub customers: Option<PathBuf>,
    pub sales_documents: Option<PathBuf>,
    pub sales_document_items: Option<PathBuf>,

    // Target configuration
    pub database: PathBuf,

    // Performance tuning
    pub batch_size: usize,

    // Options
    pub quiet: bool,
}

impl Default for LoadArgs {
    fn default() -> Self {
        Self {
            source_dir: PathBuf::from(DEFAULT_SOURCE_DIR),
            addresses: None,
            customers: None,
            sales_documents: None,
            sales_document_items: None,
            database: PathBuf::from(DEFAULT_DATABASE_PATH),
            batch_size: DEFAULT_BATCH_SIZE,
            quiet: false,
        }
    }
}

impl LoadArgs {
    /// Default file names in `source_dir`, replaced by any explicit override
    fn source_paths(&self) -> SourcePaths {
        let defaults = SourcePaths::in_dir(&self.source_dir);
        SourcePaths {
            addresses: self.addresses.clone().unwrap_or(defaults.addresses),
            customers: self.customers.clone().unwrap_or(defaults.customers),
            sales_documents: self
                .sales_documents
                .clone()
                .unwrap_or(defaults.sales_documents),
            sales_document_items: self
                .sales_document_items
                .clone()
                .unwrap_or(defaults.sales_document_items),
        }
    }
}

/// Install the global tracing subscriber
///
/// Logs go to stderr so they never interleave with the status lines on stdout.
pub fn init_tracing(quiet: bool) {
    use tracing_subscriber::{EnvFilter, FmtSubscriber};
    let filter = if quiet {
        EnvFilter::new(QUIET_LOG_FILTER)
    } else {
        EnvFilter::new(LOG_FILTER)
    };
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

/// Load the four SALT Parquet sources into a freshly recreated SQLite database
///
/// Tables are dropped and recreated, then filled in dependency order: addresses,
/// customers, sales documents, sales document items. Each table is loaded in a
/// single transaction. The first failure stops the run; tables loaded before it
/// keep their rows.
///
/// # Example
///
/// ```no_run
/// use salt_loader::runner::{LoadArgs, run_load};
///
/// # async fn example() -> anyhow::Result<()> {
/// let args = LoadArgs {
///     source_dir: "parquet_files".into(),
///     database: "salt_data.sqlite".into(),
///     quiet: true,
///     ..Default::default()
/// };
///
/// let report = run_load(args).await?;
/// for table in &report.tables {
///     println!("{}", table.summary());
/// }
/// # Ok(())
/// # }
/// ```
pub async fn run_load(args: LoadArgs) -> Result<LoadReport> {
    let config = LoadConfigBuilder::default()
        .sources(args.source_paths())
        .database_path(args.database.clone())
        .batch_size(args.batch_size)
        .quiet(args.quiet)
        .build()
        .context("Invalid load configuration")?;

    let report = Orchestrator::new(config)
        .run_load()
        .await
        .with_context(|| format!("Failed to load SALT tables into {}", args.database.display()))?;

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrides_replace_single_files() {
        let args = LoadArgs {
            source_dir: PathBuf::from("data"),
            customers: Some(PathBuf::from("/elsewhere/customers.parquet")),
            ..Default::default()
        };

        let sources = args.source_paths();
        assert_eq!(
            sources.addresses,
            PathBuf::from("data/I_AddrOrgNamePostalAddress.parquet")
        );
        assert_eq!(
            sources.customers,
            PathBuf::from("/elsewhere/customers.parquet")
        );
        assert_eq!(
            sources.sales_document_items,
            PathBuf::from("data/I_SalesDocumentItem_train.parquet")
        );
    }
}
