//! Source file readers and the in-memory text buffer they produce

pub mod buffer;
pub mod parquet;

pub use buffer::{Row, TableBuffer};
pub use parquet::{ParquetSourceReader, Projection};
