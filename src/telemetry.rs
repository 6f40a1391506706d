/// Telemetry events sent from the loader to the orchestrator for progress tracking
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TelemetryEvent {
    /// Loader opened the transaction for a table holding `rows` rows
    TableStarted { rows: u64 },
    /// One batch was written to the store
    BatchFlushed {
        rows_submitted: u64,
        rows_written: u64,
        duration_ms: u64,
    },
}

/// Statistics aggregated from telemetry events for one table
#[derive(Debug, Default, Clone)]
pub struct ProgressStats {
    /// Rows in the buffer handed to the loader
    pub rows_read: u64,
    pub flushes: usize,
    pub rows_submitted: u64,
    pub rows_written: u64,
    pub batch_durations_ms: Vec<u64>,
}

impl ProgressStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Update stats with a telemetry event
    pub fn update(&mut self, event: &TelemetryEvent) {
        match event {
            TelemetryEvent::TableStarted { rows } => {
                self.rows_read += rows;
            }
            TelemetryEvent::BatchFlushed {
                rows_submitted,
                rows_written,
                duration_ms,
            } => {
                self.flushes += 1;
                self.rows_submitted += rows_submitted;
                self.rows_written += rows_written;
                self.batch_durations_ms.push(*duration_ms);
            }
        }
    }

    /// Rows dropped by the store because their key already existed
    pub fn rows_skipped(&self) -> u64 {
        self.rows_submitted.saturating_sub(self.rows_written)
    }

    /// Calculate percentile from batch durations
    pub fn percentile(&self, p: f64) -> Option<u64> {
        if self.batch_durations_ms.is_empty() {
            return None;
        }

        let mut sorted = self.batch_durations_ms.clone();
        sorted.sort_unstable();

        let index = ((p / 100.0) * sorted.len() as f64).ceil() as usize;
        let index = index.saturating_sub(1).min(sorted.len() - 1);

        Some(sorted[index])
    }

    /// Get p50, p90, p99 percentiles
    pub fn get_percentiles(&self) -> (Option<u64>, Option<u64>, Option<u64>) {
        (
            self.percentile(50.0),
            self.percentile(90.0),
            self.percentile(99.0),
        )
    }
}
