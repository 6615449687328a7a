// THEORY:
// `cell_statistics` folds the wave raster back onto individual cells. For every
// cell it answers three questions across all retained waves:
// - how often does it take part (relative participation),
// - how early does it usually join (mean activation rank),
// - how often is it among the first to fire (initiator score).
//
// A cell is an *initiator* of an event when its rank is at or below the chosen
// percentile (10th by default) of that event's rank distribution. The initiator
// score is reported both as a raw count and normalized by the number of events;
// the persisted table keeps the raw count.
//
// The accumulation is split from the final division so that disjoint batches of
// events can be accumulated independently and merged. Every accumulated value is
// an integer, so merging in any order gives identical results.

use crate::core_modules::wave_raster::WaveRecord;
use std::collections::BTreeMap;

pub const DEFAULT_INITIATOR_PERCENTILE: f64 = 10.0;

/// Per-cell wave participation summary.
#[derive(Debug, Clone, PartialEq)]
pub struct CellWaveSummary {
    pub cell: usize,
    /// Fraction of retained events the cell took part in. NaN with no events.
    pub relative_participation: f64,
    /// Mean activation rank. NaN if the cell never took part.
    pub mean_rank: f64,
    /// Number of events in which the cell was an initiator.
    pub initiator_count: usize,
    /// `initiator_count` divided by the number of events. NaN with no events.
    pub initiator_frequency: f64,
}

/// Percentile of `values` with linear interpolation between closest ranks.
/// Returns `None` for an empty slice.
pub fn percentile(values: &[f64], percent: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let position = percent.clamp(0.0, 100.0) / 100.0 * (sorted.len() - 1) as f64;
    let low = position.floor() as usize;
    let high = position.ceil() as usize;
    let fraction = position - low as f64;
    Some(sorted[low] + (sorted[high] - sorted[low]) * fraction)
}

/// Cells of one event whose rank is at or below the event's rank percentile.
pub fn event_initiators(records: &[WaveRecord], percent: f64) -> Vec<usize> {
    let ranks: Vec<f64> = records.iter().map(|r| r.rank as f64).collect();
    let Some(cutoff) = percentile(&ranks, percent) else {
        return Vec::new();
    };
    records
        .iter()
        .filter(|r| r.rank as f64 <= cutoff)
        .map(|r| r.cell)
        .collect()
}

/// Running per-cell totals over a set of events.
#[derive(Debug, Clone, PartialEq)]
pub struct CellAccumulator {
    percent: f64,
    appearances: Vec<usize>,
    rank_sums: Vec<usize>,
    initiator_counts: Vec<usize>,
}

impl CellAccumulator {
    pub fn new(cells: usize, percent: f64) -> Self {
        Self {
            percent,
            appearances: vec![0; cells],
            rank_sums: vec![0; cells],
            initiator_counts: vec![0; cells],
        }
    }

    /// Adds the records of exactly one event.
    pub fn add_event(&mut self, records: &[WaveRecord]) {
        for record in records {
            self.appearances[record.cell] += 1;
            self.rank_sums[record.cell] += record.rank;
        }
        for cell in event_initiators(records, self.percent) {
            self.initiator_counts[cell] += 1;
        }
    }

    /// Adds a raster holding any number of events.
    pub fn add_raster(&mut self, raster: &[WaveRecord]) {
        let mut by_event: BTreeMap<u32, Vec<WaveRecord>> = BTreeMap::new();
        for record in raster {
            by_event.entry(record.event_id).or_default().push(record.clone());
        }
        for records in by_event.values() {
            self.add_event(records);
        }
    }

    pub fn merge(&mut self, other: &CellAccumulator) {
        let pairs = [
            (&mut self.appearances, &other.appearances),
            (&mut self.rank_sums, &other.rank_sums),
            (&mut self.initiator_counts, &other.initiator_counts),
        ];
        for (mine, theirs) in pairs {
            for (a, b) in mine.iter_mut().zip(theirs) {
                *a += b;
            }
        }
    }

    /// Divides the totals by `event_count`.
    pub fn finish(&self, event_count: usize) -> Vec<CellWaveSummary> {
        let per_event = |value: usize| {
            if event_count == 0 {
                f64::NAN
            } else {
                value as f64 / event_count as f64
            }
        };
        (0..self.appearances.len())
            .map(|cell| {
                let appearances = self.appearances[cell];
                CellWaveSummary {
                    cell,
                    relative_participation: per_event(appearances),
                    mean_rank: if appearances == 0 {
                        f64::NAN
                    } else {
                        self.rank_sums[cell] as f64 / appearances as f64
                    },
                    initiator_count: self.initiator_counts[cell],
                    initiator_frequency: per_event(self.initiator_counts[cell]),
                }
            })
            .collect()
    }
}

/// Per-cell statistics of a raster covering `event_count` retained events.
pub fn cell_wave_statistics(
    raster: &[WaveRecord],
    cells: usize,
    event_count: usize,
    percent: f64,
) -> Vec<CellWaveSummary> {
    let mut accumulator = CellAccumulator::new(cells, percent);
    accumulator.add_raster(raster);
    accumulator.finish(event_count)
}
