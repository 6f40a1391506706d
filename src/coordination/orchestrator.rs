use derive_builder::Builder;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

use super::loader::ChunkedLoader;
use crate::config::{DEFAULT_BATCH_SIZE, DEFAULT_DATABASE_PATH, DEFAULT_SOURCE_DIR};
use crate::db::schema::{ADDRESSES, CUSTOMERS, SALES_DOCUMENT_ITEMS, SALES_DOCUMENTS};
use crate::db::{LOAD_ORDER, Store, TableDef, recreate_tables};
use crate::error::{LoadError, Result};
use crate::formats::{ParquetSourceReader, Projection};
use crate::telemetry::{ProgressStats, TelemetryEvent};

/// Location of each SALT source file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourcePaths {
    pub addresses: PathBuf,
    pub customers: PathBuf,
    pub sales_documents: PathBuf,
    pub sales_document_items: PathBuf,
}

impl SourcePaths {
    /// The default file names inside `dir`
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            addresses: dir.join(ADDRESSES.source_file),
            customers: dir.join(CUSTOMERS.source_file),
            sales_documents: dir.join(SALES_DOCUMENTS.source_file),
            sales_document_items: dir.join(SALES_DOCUMENT_ITEMS.source_file),
        }
    }

    /// Source file feeding `table`
    pub fn path_for(&self, table: &TableDef) -> Result<&Path> {
        let path = match table.name {
            name if name == ADDRESSES.name => &self.addresses,
            name if name == CUSTOMERS.name => &self.customers,
            name if name == SALES_DOCUMENTS.name => &self.sales_documents,
            name if name == SALES_DOCUMENT_ITEMS.name => &self.sales_document_items,
            other => {
                return Err(LoadError::SchemaDefinition {
                    message: format!("no source file configured for table '{}'", other),
                });
            }
        };
        Ok(path)
    }
}

impl Default for SourcePaths {
    fn default() -> Self {
        Self::in_dir(DEFAULT_SOURCE_DIR)
    }
}

/// Configuration for a load run
///
/// `build()` rejects a zero batch size, so a bad configuration never reaches
/// the database.
#[derive(Debug, Clone, Builder)]
#[builder(setter(into), build_fn(validate = "Self::validate", error = "LoadError"))]
pub struct LoadConfig {
    #[builder(default)]
    pub sources: SourcePaths,
    #[builder(default = "PathBuf::from(DEFAULT_DATABASE_PATH)")]
    pub database_path: PathBuf,
    #[builder(default = "DEFAULT_BATCH_SIZE")]
    pub batch_size: usize,
    /// Suppress status lines and progress bars
    #[builder(default)]
    pub quiet: bool,
}

impl LoadConfigBuilder {
    fn validate(&self) -> Result<()> {
        if self.batch_size == Some(0) {
            return Err(LoadError::InvalidBatchSize);
        }
        Ok(())
    }
}

/// Outcome of loading one table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableReport {
    pub table: String,
    /// Rows read from the source file
    pub rows_read: u64,
    pub rows_submitted: u64,
    /// Rows the store actually wrote; lower when duplicate keys were skipped
    pub rows_persisted: u64,
    pub flushes: usize,
    pub flush_p50_ms: Option<u64>,
    pub flush_p90_ms: Option<u64>,
    pub flush_p99_ms: Option<u64>,
}

impl TableReport {
    fn from_stats(table: &TableDef, rows_submitted: u64, stats: &ProgressStats) -> Self {
        let (p50, p90, p99) = stats.get_percentiles();
        Self {
            table: table.name.to_string(),
            rows_read: stats.rows_read,
            rows_submitted,
            rows_persisted: stats.rows_written,
            flushes: stats.flushes,
            flush_p50_ms: p50,
            flush_p90_ms: p90,
            flush_p99_ms: p99,
        }
    }

    /// The status line printed after the table is loaded
    pub fn summary(&self) -> String {
        format!("Inserted {} rows into {}.", self.rows_submitted, self.table)
    }
}

/// Result of a completed load run
#[derive(Debug)]
pub struct LoadReport {
    pub run_id: String,
    pub database_path: PathBuf,
    /// One entry per table, in load order
    pub tables: Vec<TableReport>,
    pub duration: Duration,
}

impl LoadReport {
    pub fn table(&self, name: &str) -> Option<&TableReport> {
        self.tables.iter().find(|t| t.table == name)
    }
}

/// Loads the four SALT sources into a fresh set of tables in dependency order
pub struct Orchestrator {
    config: LoadConfig,
    status_out: Mutex<Box<dyn Write + Send>>,
}

impl Orchestrator {
    pub fn new(config: LoadConfig) -> Self {
        Self {
            config,
            status_out: Mutex::new(Box::new(std::io::stdout())),
        }
    }

    /// Write status lines to `out` instead of stdout
    pub fn with_status_writer(mut self, out: impl Write + Send + 'static) -> Self {
        self.status_out = Mutex::new(Box::new(out));
        self
    }

    /// Run the complete load
    ///
    /// 1. Check the batch size and generate a run id
    /// 2. Open the store
    /// 3. Drop and recreate the tables
    /// 4. Read and load each source in load order, stopping at the first error
    /// 5. Close the store, whether or not the load succeeded
    pub async fn run_load(&self) -> Result<LoadReport> {
        let start_time = Instant::now();

        // Checked before the store is opened; a rejected config leaves the database untouched
        if self.config.batch_size == 0 {
            return Err(LoadError::InvalidBatchSize);
        }

        let run_id = Uuid::new_v4().to_string();
        info!(run_id = %run_id, "Starting load run");

        let mut store = Store::open(&self.config.database_path).await?;
        let loaded = self.load_all(&mut store, &run_id).await;
        let closed = store.close().await;

        let tables = match loaded {
            Ok(tables) => tables,
            Err(e) => {
                warn!(run_id = %run_id, "Load run failed: {:#}", e);
                return Err(e);
            }
        };
        closed?;

        let duration = start_time.elapsed();
        info!(
            run_id = %run_id,
            tables = tables.len(),
            "Load complete in {:.2}s",
            duration.as_secs_f64()
        );
        self.status(&format!(
            "Done! The SALT tables have been saved into {}",
            self.config.database_path.display()
        ));

        Ok(LoadReport {
            run_id,
            database_path: self.config.database_path.clone(),
            tables,
            duration,
        })
    }

    async fn load_all(&self, store: &mut Store, run_id: &str) -> Result<Vec<TableReport>> {
        recreate_tables(store, &LOAD_ORDER).await?;

        let mut reports = Vec::with_capacity(LOAD_ORDER.len());
        for table in LOAD_ORDER {
            reports.push(self.load_table(store, table, run_id).await?);
        }
        Ok(reports)
    }

    async fn load_table(
        &self,
        store: &mut Store,
        table: &TableDef,
        run_id: &str,
    ) -> Result<TableReport> {
        let path = self.config.sources.path_for(table)?;
        self.status(&format!("Reading {}...", path.display()));

        let buffer = ParquetSourceReader::new(path)
            .read(Projection {
                columns: table.columns,
                temporal_columns: table.temporal_columns,
            })
            .await?;
        info!(
            run_id,
            table = table.name,
            rows = buffer.num_rows(),
            "Source read"
        );

        let (telemetry_tx, mut telemetry_rx) = mpsc::unbounded_channel::<TelemetryEvent>();
        let progress = self.progress_bar(table);
        let loader = ChunkedLoader::new(self.config.batch_size).with_telemetry(telemetry_tx);
        let template = table.insert_template();

        // The loader owns the only sender, so tracking ends when the load does
        let load = async move { loader.load(store, &buffer, &template).await };
        let track = async {
            let mut stats = ProgressStats::new();
            while let Some(event) = telemetry_rx.recv().await {
                match &event {
                    TelemetryEvent::TableStarted { rows } => progress.set_length(*rows),
                    TelemetryEvent::BatchFlushed { rows_submitted, .. } => {
                        progress.inc(*rows_submitted)
                    }
                }
                stats.update(&event);
            }
            stats
        };
        let (loaded, stats) = tokio::join!(load, track);

        let rows_submitted = match loaded {
            Ok(rows) => {
                progress.finish_and_clear();
                rows
            }
            Err(e) => {
                progress.abandon();
                return Err(e);
            }
        };

        if stats.rows_skipped() > 0 {
            warn!(
                run_id,
                table = table.name,
                "Skipped {} rows whose primary key already existed",
                stats.rows_skipped()
            );
        }

        let report = TableReport::from_stats(table, rows_submitted, &stats);
        info!(
            run_id,
            table = table.name,
            rows_read = report.rows_read,
            rows_submitted = report.rows_submitted,
            rows_persisted = report.rows_persisted,
            flushes = report.flushes,
            "Table loaded"
        );
        self.status(&report.summary());

        Ok(report)
    }

    fn status(&self, line: &str) {
        if self.config.quiet {
            return;
        }
        if let Ok(mut out) = self.status_out.lock() {
            let _ = writeln!(out, "{}", line);
        }
    }

    /// Bar length is set once the loader reports the table's row count
    fn progress_bar(&self, table: &TableDef) -> ProgressBar {
        if self.config.quiet {
            return ProgressBar::hidden();
        }

        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("[{elapsed_precise}] {msg}: [{bar:30.green/blue}] {human_pos}/{human_len} ({percent}%) | {per_sec}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=>-"),
        );
        bar.set_message(table.name);
        bar
    }
}
