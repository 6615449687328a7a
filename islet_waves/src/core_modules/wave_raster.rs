// THEORY:
// The `wave_raster` module reconstructs, for every retained wave, the order in
// which cells joined it. It is the narrative layer of the engine: where the
// characterizer says *that* a wave happened, the raster says *how* it spread.
//
// Key principles:
// 1.  **First activation only**: a cell may carry the same event id in many
//     frames; only the first frame counts as its activation.
// 2.  **"Min" ranking**: cells are ranked by activation delay. Cells activating
//     in the same frame share the rank of the first of them, and the next later
//     cell skips past the whole tie group (1, 1, 3, ...).
// 3.  **Flat output**: the result is one `WaveRecord` per (event, cell) pair, in
//     event order, then activation frame, then cell index. This table feeds the
//     per-cell statistics and the raster plot.
//
// The label matrix may cover only a slice of the recording. Frames in a record
// index that matrix, while `time` is measured from the start of the recording
// through `RasterClock::first_frame`.

use crate::core_modules::activity::LabelMatrix;
use crate::core_modules::wave_characterizer::WaveEvent;

/// One cell's activation inside one retained wave.
#[derive(Debug, Clone, PartialEq)]
pub struct WaveRecord {
    /// Frame of the activation, as a row of the label matrix.
    pub frame: usize,
    /// Activation time in seconds since the start of the recording.
    pub time: f64,
    /// Seconds since the event's start frame.
    pub delay: f64,
    /// Activation rank within the event, starting at 1.
    pub rank: usize,
    pub cell: usize,
    pub event_id: u32,
    /// Relative size of the event this record belongs to.
    pub relative_size: f64,
}

/// Maps label matrix rows to recording time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RasterClock {
    /// Sampling frequency in Hz.
    pub sampling: f64,
    /// Recording frame of the label matrix's first row.
    pub first_frame: usize,
}

impl RasterClock {
    /// A clock for a label matrix that starts at the first recorded frame.
    pub fn new(sampling: f64) -> Self {
        Self {
            sampling,
            first_frame: 0,
        }
    }

    pub fn starting_at(self, first_frame: usize) -> Self {
        Self { first_frame, ..self }
    }

    fn time(&self, frame: usize) -> f64 {
        (self.first_frame + frame) as f64 / self.sampling
    }
}

/// Activation records of a single event.
pub fn event_records(labels: &LabelMatrix, event: &WaveEvent, clock: RasterClock) -> Vec<WaveRecord> {
    let cells = labels.ncols();
    let mut seen = vec![false; cells];
    let mut activations: Vec<(usize, usize)> = Vec::with_capacity(event.active_cells);

    // --- 1. Collect first activations ---
    for frame in event.start_frame..=event.end_frame {
        for cell in 0..cells {
            if labels[[frame, cell]] == event.id && !seen[cell] {
                seen[cell] = true;
                activations.push((frame, cell));
            }
        }
    }

    // --- 2. Rank ---
    // Activations are already in ascending frame order.
    let mut records = Vec::with_capacity(activations.len());
    let mut group_frame = usize::MAX;
    let mut group_rank = 0;
    for (position, &(frame, cell)) in activations.iter().enumerate() {
        if frame != group_frame {
            group_frame = frame;
            group_rank = position + 1;
        }
        records.push(WaveRecord {
            frame,
            time: clock.time(frame),
            delay: (frame - event.start_frame) as f64 / clock.sampling,
            rank: group_rank,
            cell,
            event_id: event.id,
            relative_size: event.relative_size,
        });
    }
    records
}

/// Raster of every retained event, in the order the events are given.
pub fn build_raster(labels: &LabelMatrix, events: &[WaveEvent], clock: RasterClock) -> Vec<WaveRecord> {
    events
        .iter()
        .flat_map(|event| event_records(labels, event, clock))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::wave_characterizer::characterize_all;
    use approx::assert_relative_eq;
    use ndarray::array;

    fn labels() -> LabelMatrix {
        array![
            [0, 0, 0, 0, 2],
            [1, 1, 0, 0, 2],
            [1, 1, 1, 0, 0],
            [0, 1, 1, 1, 0],
        ]
    }

    #[test]
    fn ranks_use_min_semantics() {
        let labels = labels();
        let events = characterize_all(&labels);
        let records = event_records(&labels, &events[0], RasterClock::new(1.0));
        let summary: Vec<(usize, usize)> = records.iter().map(|r| (r.cell, r.rank)).collect();
        assert_eq!(summary, vec![(0, 1), (1, 1), (2, 3), (3, 4)]);
    }

    #[test]
    fn ranks_are_well_formed() {
        let labels = labels();
        let events = characterize_all(&labels);
        for event in &events {
            let records = event_records(&labels, event, RasterClock::new(4.0));
            assert_eq!(records.len(), event.active_cells);
            assert_eq!(records[0].rank, 1);
            for pair in records.windows(2) {
                assert!(pair[0].rank <= pair[1].rank);
                assert!(pair[1].rank <= records.len());
            }
        }
    }

    #[test]
    fn times_and_delays_in_seconds() {
        let labels = labels();
        let events = characterize_all(&labels);
        let records = event_records(&labels, &events[0], RasterClock::new(2.0));
        let last = records.last().unwrap();
        assert_eq!(last.frame, 3);
        assert_relative_eq!(last.time, 1.5);
        assert_relative_eq!(last.delay, 1.0);
        assert_relative_eq!(last.relative_size, 0.8);
    }

    #[test]
    fn times_count_from_recording_start() {
        let labels = labels();
        let events = characterize_all(&labels);
        let clock = RasterClock::new(2.0).starting_at(10);
        let records = event_records(&labels, &events[0], clock);
        let last = records.last().unwrap();
        assert_eq!(last.frame, 3);
        assert_relative_eq!(last.time, 6.5);
        assert_relative_eq!(last.delay, 1.0);
        assert_relative_eq!(records[0].time, 5.5);
    }

    #[test]
    fn raster_follows_event_order() {
        let labels = labels();
        let events = characterize_all(&labels);
        let raster = build_raster(&labels, &events, RasterClock::new(1.0));
        assert_eq!(raster.len(), 5);
        assert!(raster[..4].iter().all(|r| r.event_id == 1));
        assert_eq!(raster[4].event_id, 2);
        assert_eq!((raster[4].cell, raster[4].rank, raster[4].frame), (4, 1, 0));
        assert!(build_raster(&labels, &[], RasterClock::new(1.0)).is_empty());
    }
}
