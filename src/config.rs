//! Configuration constants for the SALT loader
//!
//! This module centralizes all tunable parameters and defaults used throughout
//! the application.

// ============================================================================
// Load Configuration
// ============================================================================

/// Number of rows accumulated before a batch is flushed to the store
///
/// Each flush is one batched insert inside the table's transaction. 10,000
/// rows keeps statement overhead low while bounding the memory held per flush
/// to a few megabytes for the widest table.
pub const DEFAULT_BATCH_SIZE: usize = 10_000;

/// Rows decoded per Arrow record batch when reading a Parquet file
pub const READ_BATCH_SIZE: usize = 8192;

// ============================================================================
// Store Configuration
// ============================================================================

/// Upper bound on bound parameters in a single SQLite statement
///
/// SQLite >= 3.32 defaults `SQLITE_MAX_VARIABLE_NUMBER` to 32766. A flush
/// wider than this is split into several multi-row statements inside the
/// same transaction.
pub const MAX_BIND_PARAMETERS: usize = 32_766;

// ============================================================================
// Path Defaults
// ============================================================================

/// Directory holding the four Parquet sources
pub const DEFAULT_SOURCE_DIR: &str = "parquet_files";

/// SQLite database written by a run
pub const DEFAULT_DATABASE_PATH: &str = "salt_data.sqlite";

// ============================================================================
// Logging
// ============================================================================

pub const LOG_FILTER: &str = "salt_loader=info,sqlx=off";

pub const QUIET_LOG_FILTER: &str = "salt_loader=warn,sqlx=off";
