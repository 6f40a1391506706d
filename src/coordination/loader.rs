use std::time::Instant;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::db::{InsertTemplate, TableWriter};
use crate::error::{LoadError, Result};
use crate::formats::{Row, TableBuffer};
use crate::telemetry::TelemetryEvent;

/// Writes a table buffer to the store in fixed-size batches inside one
/// transaction
pub struct ChunkedLoader {
    pub batch_size: usize,
    telemetry_tx: Option<mpsc::UnboundedSender<TelemetryEvent>>,
}

impl ChunkedLoader {
    pub fn new(batch_size: usize) -> Self {
        Self {
            batch_size,
            telemetry_tx: None,
        }
    }

    /// Report table and batch events on `telemetry_tx`
    pub fn with_telemetry(mut self, telemetry_tx: mpsc::UnboundedSender<TelemetryEvent>) -> Self {
        self.telemetry_tx = Some(telemetry_tx);
        self
    }

    fn send_telemetry(&self, event: TelemetryEvent) {
        if let Some(tx) = &self.telemetry_tx {
            let _ = tx.send(event);
        }
    }

    /// Load every row of `buffer` into the template's table
    ///
    /// All flushes share one transaction: either every batch is committed or
    /// the table is left as it was before the call. Returns the number of rows
    /// submitted, which includes rows the store skipped as duplicates.
    pub async fn load<W>(
        &self,
        writer: &mut W,
        buffer: &TableBuffer,
        template: &InsertTemplate,
    ) -> Result<u64>
    where
        W: TableWriter + ?Sized,
    {
        if self.batch_size == 0 {
            return Err(LoadError::InvalidBatchSize);
        }

        writer.begin().await?;
        self.send_telemetry(TelemetryEvent::TableStarted {
            rows: buffer.num_rows() as u64,
        });

        let rows_submitted = match self.load_rows(writer, buffer, template).await {
            Ok(rows) => rows,
            Err(e) => {
                Self::rollback(writer, &template.table).await;
                return Err(e);
            }
        };

        if let Err(e) = writer.commit().await {
            Self::rollback(writer, &template.table).await;
            return Err(e);
        }

        Ok(rows_submitted)
    }

    async fn load_rows<W>(
        &self,
        writer: &mut W,
        buffer: &TableBuffer,
        template: &InsertTemplate,
    ) -> Result<u64>
    where
        W: TableWriter + ?Sized,
    {
        let mut batch: Vec<Row<'_>> = Vec::with_capacity(self.batch_size.min(buffer.num_rows()));
        let mut rows_submitted = 0u64;

        for row in buffer.rows() {
            if row.len() != template.arity() {
                return Err(LoadError::ArityMismatch {
                    table: template.table.clone(),
                    expected: template.arity(),
                    found: row.len(),
                });
            }

            batch.push(row);
            if batch.len() == self.batch_size {
                rows_submitted += self.flush(writer, template, &batch).await?;
                batch.clear();
            }
        }

        if !batch.is_empty() {
            rows_submitted += self.flush(writer, template, &batch).await?;
        }

        Ok(rows_submitted)
    }

    /// Write one batch, returning the number of rows submitted
    async fn flush<W>(
        &self,
        writer: &mut W,
        template: &InsertTemplate,
        batch: &[Row<'_>],
    ) -> Result<u64>
    where
        W: TableWriter + ?Sized,
    {
        let start = Instant::now();
        let rows_written = writer.insert_batch(template, batch).await?;
        let duration_ms = start.elapsed().as_millis() as u64;

        debug!(
            table = %template.table,
            rows = batch.len(),
            rows_written,
            duration_ms,
            "batch flushed"
        );

        self.send_telemetry(TelemetryEvent::BatchFlushed {
            rows_submitted: batch.len() as u64,
            rows_written,
            duration_ms,
        });

        Ok(batch.len() as u64)
    }

    async fn rollback<W>(writer: &mut W, table: &str)
    where
        W: TableWriter + ?Sized,
    {
        if let Err(e) = writer.rollback().await {
            warn!("Rollback of {} failed: {:#}", table, e);
        }
    }
}
