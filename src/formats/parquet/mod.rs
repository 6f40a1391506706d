//! Parquet source support.
//!
//! Reads a projected set of columns from a local Parquet file and hands them
//! to the loader as text. Temporal columns are rendered with fixed formats:
//! - dates as `YYYY-MM-DD`
//! - times of day as `HH:MM:SS`, or `HH:MM:SS.ffffff` when the fraction is non-zero
//! - timestamps as `YYYY-MM-DD HH:MM:SS`, or as plain dates when every value
//!   in the column falls on midnight

mod conversion;
mod reader;

pub use reader::{ParquetSourceReader, Projection};
