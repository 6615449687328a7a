// THEORY:
// The `wave_characterizer` turns a canonical label matrix into a list of
// `WaveEvent` summaries: when a wave started, when it ended, and how much of the
// islet it reached. It then applies the production filter: a wave that reached
// no more than `rel_size_threshold` of the cells is treated as local activity,
// not a collective event, and is dropped.
//
// The summary is computed once from the frozen matrix in a single scan.

use crate::core_modules::activity::LabelMatrix;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{info, warn};

/// Frozen attributes of one wave event.
#[derive(Debug, Clone, PartialEq)]
pub struct WaveEvent {
    /// Canonical event id.
    pub id: u32,
    /// First frame in which the event id occurs.
    pub start_frame: usize,
    /// Last frame in which the event id occurs.
    pub end_frame: usize,
    /// `end_frame - start_frame`, in frames.
    pub duration: usize,
    /// Number of distinct cells carrying the id.
    pub active_cells: usize,
    /// `active_cells / N`.
    pub relative_size: f64,
}

impl WaveEvent {
    pub fn duration_seconds(&self, sampling: f64) -> f64 {
        self.duration as f64 / sampling
    }
}

struct EventSpan {
    start: usize,
    end: usize,
    cells: BTreeSet<usize>,
}

/// Summarizes every event present in `labels`, ordered by ascending id.
pub fn characterize_all(labels: &LabelMatrix) -> Vec<WaveEvent> {
    let cell_count = labels.ncols();
    let mut spans: BTreeMap<u32, EventSpan> = BTreeMap::new();

    for ((frame, cell), &label) in labels.indexed_iter() {
        if label == 0 {
            continue;
        }
        let span = spans.entry(label).or_insert_with(|| EventSpan {
            start: frame,
            end: frame,
            cells: BTreeSet::new(),
        });
        // Rows are visited in order, so only the end can move.
        span.end = frame;
        span.cells.insert(cell);
    }

    spans
        .into_iter()
        .map(|(id, span)| WaveEvent {
            id,
            start_frame: span.start,
            end_frame: span.end,
            duration: span.end - span.start,
            active_cells: span.cells.len(),
            relative_size: span.cells.len() as f64 / cell_count as f64,
        })
        .collect()
}

/// Keeps events whose relative size is strictly above `rel_size_threshold`.
pub fn retain_by_size(events: Vec<WaveEvent>, rel_size_threshold: f64) -> Vec<WaveEvent> {
    events
        .into_iter()
        .filter(|event| event.relative_size > rel_size_threshold)
        .collect()
}

/// Outcome of characterization: how many events the labeling found and which
/// of them survived the size filter.
#[derive(Debug, Clone, PartialEq)]
pub struct CharacterizedWaves {
    pub detected: usize,
    pub retained: Vec<WaveEvent>,
}

/// Characterizes all events and applies the size filter.
pub fn characterize_waves(labels: &LabelMatrix, rel_size_threshold: f64) -> CharacterizedWaves {
    let all = characterize_all(labels);
    let detected = all.len();
    let retained = retain_by_size(all, rel_size_threshold);
    info!(
        detected,
        retained = retained.len(),
        rel_size_threshold,
        "wave characterization finished"
    );
    if retained.is_empty() && detected > 0 {
        warn!(detected, rel_size_threshold, "no event exceeded the relative size threshold");
    }
    CharacterizedWaves { detected, retained }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    fn sample_labels() -> LabelMatrix {
        array![
            [0, 1, 0, 0],
            [1, 1, 0, 2],
            [1, 0, 0, 0],
            [0, 3, 3, 3],
        ]
    }

    #[test]
    fn computes_span_and_size() {
        let events = characterize_all(&sample_labels());
        assert_eq!(events.len(), 3);

        let first = &events[0];
        assert_eq!((first.id, first.start_frame, first.end_frame), (1, 0, 2));
        assert_eq!(first.duration, 2);
        assert_eq!(first.active_cells, 2);
        assert_relative_eq!(first.relative_size, 0.5);

        let second = &events[1];
        assert_eq!((second.start_frame, second.end_frame, second.duration), (1, 1, 0));
        assert_relative_eq!(second.relative_size, 0.25);

        assert_eq!(events[2].active_cells, 3);
        assert_relative_eq!(events[2].duration_seconds(2.0), 0.0);
    }

    #[test]
    fn filter_is_strict() {
        let waves = characterize_waves(&sample_labels(), 0.5);
        assert_eq!(waves.detected, 3);
        let ids: Vec<u32> = waves.retained.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![3]);
    }

    #[test]
    fn raising_threshold_never_adds_events() {
        let labels = sample_labels();
        let mut previous = usize::MAX;
        for step in 1..10 {
            let threshold = step as f64 / 10.0;
            let kept = characterize_waves(&labels, threshold).retained.len();
            assert!(kept <= previous);
            previous = kept;
        }
    }

    #[test]
    fn empty_matrix_has_no_events() {
        assert!(characterize_all(&LabelMatrix::zeros((5, 3))).is_empty());
        let waves = characterize_waves(&LabelMatrix::zeros((0, 0)), 0.1);
        assert_eq!(waves.detected, 0);
        assert!(waves.retained.is_empty());
    }
}
