//! Parquet source reader.

use arrow::array::{Array, StringArray};
use arrow::record_batch::RecordBatch;
use futures::StreamExt;
use parquet::arrow::ProjectionMask;
use parquet::arrow::async_reader::ParquetRecordBatchStreamBuilder;
use std::path::{Path, PathBuf};

use super::conversion::{normalize_temporal, to_text};
use crate::config::READ_BATCH_SIZE;
use crate::error::{LoadError, Result};
use crate::formats::buffer::{TableBuffer, TextBatch};

/// Which columns to read from a source file and how to treat them
#[derive(Debug, Clone, Copy)]
pub struct Projection<'a> {
    /// Columns in output order
    pub columns: &'a [&'a str],
    /// Subset of `columns` holding dates or times of day
    pub temporal_columns: &'a [&'a str],
}

/// Reads one Parquet file into a text [`TableBuffer`]
pub struct ParquetSourceReader {
    path: PathBuf,
    batch_size: usize,
}

impl ParquetSourceReader {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            batch_size: READ_BATCH_SIZE,
        }
    }

    /// Rows decoded per record batch
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Read the projected columns of the whole file
    ///
    /// The result holds exactly `projection.columns`, in that order, one row
    /// per source record in source order. Temporal columns are normalized to
    /// canonical text; all other columns are coerced to text.
    pub async fn read(&self, projection: Projection<'_>) -> Result<TableBuffer> {
        let file = tokio::fs::File::open(&self.path)
            .await
            .map_err(|e| LoadError::source_unavailable(&self.path, e))?;

        // Read Parquet metadata from footer
        let builder = ParquetRecordBatchStreamBuilder::new(file)
            .await
            .map_err(|e| LoadError::source_unavailable(&self.path, e))?;

        let file_schema = builder.schema().clone();
        let mut root_indices = Vec::with_capacity(projection.columns.len());
        for column in projection.columns {
            let idx = file_schema.index_of(column).map_err(|_| {
                LoadError::schema_mismatch(
                    &self.path,
                    format!("column '{}' not found in source file", column),
                )
            })?;
            root_indices.push(idx);
        }

        let mask = ProjectionMask::roots(builder.parquet_schema(), root_indices);
        let mut stream = builder
            .with_projection(mask)
            .with_batch_size(self.batch_size)
            .build()
            .map_err(|e| LoadError::source_unavailable(&self.path, e))?;

        let mut batches = Vec::new();
        while let Some(batch_result) = stream.next().await {
            let batch = batch_result.map_err(|e| LoadError::source_unavailable(&self.path, e))?;
            if batch.num_rows() == 0 {
                continue;
            }
            batches.push(self.to_text_batch(&batch, projection)?);
        }

        let buffer = TableBuffer::new(
            projection.columns.iter().map(|c| c.to_string()).collect(),
            batches,
        );

        tracing::debug!(
            path = %self.path.display(),
            rows = buffer.num_rows(),
            columns = projection.columns.len(),
            "source file read"
        );

        Ok(buffer)
    }

    /// Reorder the projected batch into projection order and convert to text
    ///
    /// The projection mask yields columns in file order, not request order.
    fn to_text_batch(&self, batch: &RecordBatch, projection: Projection<'_>) -> Result<TextBatch> {
        let mut columns: Vec<StringArray> = Vec::with_capacity(projection.columns.len());

        for name in projection.columns {
            let array = batch.column_by_name(name).ok_or_else(|| {
                LoadError::schema_mismatch(
                    &self.path,
                    format!("column '{}' missing from decoded batch", name),
                )
            })?;

            let converted = if projection.temporal_columns.contains(name) {
                normalize_temporal(array.as_ref())
            } else {
                to_text(array.as_ref())
            }
            .map_err(|e| {
                LoadError::schema_mismatch(&self.path, format!("column '{}': {:#}", name, e))
            })?;

            columns.push(converted);
        }

        Ok(TextBatch::new(columns))
    }
}
