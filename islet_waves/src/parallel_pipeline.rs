// THEORY:
// The labeling pass is inherently sequential: frame t depends on the labels of
// frame t-1. Everything after it is not. Once the canonical label matrix and the
// retained events are known, each event's raster records and its contribution to
// the per-cell statistics depend only on that event's own labels.
//
// `WorkerPool` exploits this. The retained events are dealt into one batch per
// worker, every batch runs on Tokio's blocking pool against a shared, read-only
// label matrix, and the partial results are joined back in event order. Records
// are concatenated batch by batch and the integer per-cell accumulators are
// summed, so the result is identical to the sequential path regardless of
// scheduling.

use crate::core_modules::activity::LabelMatrix;
use crate::core_modules::cell_statistics::{CellAccumulator, CellWaveSummary};
use crate::core_modules::wave_characterizer::WaveEvent;
use crate::core_modules::wave_raster::{RasterClock, WaveRecord, event_records};
use crate::error::{Result, WaveError};
use futures::future::try_join_all;
use std::sync::Arc;
use tracing::debug;

/// Partial result of one batch of events.
struct BatchOutput {
    records: Vec<WaveRecord>,
    accumulator: CellAccumulator,
}

pub struct WorkerPool {
    workers: usize,
}

impl Default for WorkerPool {
    fn default() -> Self {
        Self::new()
    }
}

impl WorkerPool {
    /// One worker per logical CPU.
    pub fn new() -> Self {
        Self::with_workers(num_cpus::get())
    }

    pub fn with_workers(workers: usize) -> Self {
        Self {
            workers: workers.max(1),
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Builds the raster and the per-cell statistics of `events` in parallel.
    pub async fn analyze_events(
        &self,
        labels: LabelMatrix,
        events: Vec<WaveEvent>,
        cells: usize,
        clock: RasterClock,
        percent: f64,
    ) -> Result<(Vec<WaveRecord>, Vec<CellWaveSummary>)> {
        let event_count = events.len();
        let labels = Arc::new(labels);
        let batch_size = event_count.div_ceil(self.workers).max(1);

        let tasks = events.chunks(batch_size).map(|batch| {
            let labels = Arc::clone(&labels);
            let batch = batch.to_vec();
            async move {
                tokio::task::spawn_blocking(move || run_batch(&labels, &batch, cells, clock, percent))
                    .await
                    .map_err(|e| WaveError::Worker(e.to_string()))
            }
        });
        let outputs = try_join_all(tasks).await?;
        debug!(batches = outputs.len(), workers = self.workers, "event batches joined");

        // --- Merge in event order ---
        let mut raster = Vec::new();
        let mut totals = CellAccumulator::new(cells, percent);
        for output in outputs {
            raster.extend(output.records);
            totals.merge(&output.accumulator);
        }
        Ok((raster, totals.finish(event_count)))
    }
}

fn run_batch(
    labels: &LabelMatrix,
    events: &[WaveEvent],
    cells: usize,
    clock: RasterClock,
    percent: f64,
) -> BatchOutput {
    let mut records = Vec::new();
    let mut accumulator = CellAccumulator::new(cells, percent);
    for event in events {
        let event_raster = event_records(labels, event, clock);
        accumulator.add_event(&event_raster);
        records.extend(event_raster);
    }
    BatchOutput {
        records,
        accumulator,
    }
}
