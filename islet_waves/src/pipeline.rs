// THEORY:
// The `pipeline` module is the top-level API of the wave engine. It wires every
// stage together in the one order that makes sense and hands back a single
// `WaveReport`:
//
//   activity + positions
//     -> neighbor sets          (spatial layer)
//     -> raw labels             (labeling pass, strictly in time order)
//     -> canonical labels       (dense ids)
//     -> retained events        (size filter)
//     -> raster                 (activation order per event)
//     -> per-cell statistics    (participation, rank, initiators)
//
// Preconditions (configuration, shapes) are checked before the labeling pass.
// Everything after that is infallible: an islet without waves produces an empty
// report, not an error.

use crate::config::WaveConfig;
use crate::core_modules::activity::{ActivityMatrix, LabelMatrix, Positions};
use crate::core_modules::cell_statistics::{CellWaveSummary, cell_wave_statistics};
use crate::core_modules::event_labeler::label_events;
use crate::core_modules::label_canonicalizer::canonicalize;
use crate::core_modules::neighbor_graph::{NeighborSets, neighbor_sets};
use crate::core_modules::wave_characterizer::{WaveEvent, characterize_waves};
use crate::core_modules::wave_raster::{RasterClock, WaveRecord, build_raster};
use crate::error::{Result, WaveError};
use crate::io::raster_image::save_raster_plot;
use crate::io::text::{self, WaveSummary};
use crate::parallel_pipeline::WorkerPool;
use std::path::Path;
use tracing::{debug, info};

/// Everything one analysis run produces.
#[derive(Debug, Clone)]
pub struct WaveReport {
    /// Neighbor sets used for labeling.
    pub neighbors: NeighborSets,
    /// Canonical label matrix (frames of the analysed interval × cells).
    pub labels: LabelMatrix,
    /// Number of events before the size filter.
    pub detected_events: usize,
    /// Events that survived the size filter, by ascending id.
    pub events: Vec<WaveEvent>,
    pub raster: Vec<WaveRecord>,
    pub cell_summary: Vec<CellWaveSummary>,
    pub wave_summary: WaveSummary,
}

/// Output of the sequential front half of the pipeline.
struct LabeledRecording {
    neighbors: NeighborSets,
    labels: LabelMatrix,
    /// Maps label rows back to recording time.
    clock: RasterClock,
    detected_events: usize,
    events: Vec<WaveEvent>,
}

/// The main entry point of the engine.
pub struct WavePipeline {
    config: WaveConfig,
}

impl WavePipeline {
    /// Validates `config` and builds a pipeline.
    pub fn new(config: WaveConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &WaveConfig {
        &self.config
    }

    /// Runs every stage sequentially.
    pub fn analyze(&self, activity: &ActivityMatrix, positions: &Positions) -> Result<WaveReport> {
        let labeled = self.label(activity, positions)?;
        let raster = build_raster(&labeled.labels, &labeled.events, labeled.clock);
        let cell_summary = cell_wave_statistics(
            &raster,
            activity.cells(),
            labeled.events.len(),
            self.config.initiator_percentile,
        );
        Ok(self.finish(labeled, raster, cell_summary))
    }

    /// Runs the labeling pass sequentially and fans the per-event stages out over `pool`.
    /// The report is identical to the one `analyze` returns.
    pub async fn analyze_parallel(
        &self,
        activity: &ActivityMatrix,
        positions: &Positions,
        pool: &WorkerPool,
    ) -> Result<WaveReport> {
        let labeled = self.label(activity, positions)?;
        let (raster, cell_summary) = pool
            .analyze_events(
                labeled.labels.clone(),
                labeled.events.clone(),
                activity.cells(),
                labeled.clock,
                self.config.initiator_percentile,
            )
            .await?;
        Ok(self.finish(labeled, raster, cell_summary))
    }

    fn label(&self, activity: &ActivityMatrix, positions: &Positions) -> Result<LabeledRecording> {
        // --- 1. Preconditions ---
        if positions.len() != activity.cells() {
            return Err(WaveError::ShapeMismatch {
                what: "positions rows vs activity columns",
                expected: activity.cells(),
                found: positions.len(),
            });
        }
        let interval = self.config.frame_interval(activity.frames());
        let activity = activity.slice_frames(interval.clone());
        info!(
            frames = activity.frames(),
            cells = activity.cells(),
            first_frame = interval.start,
            frame_threshold = self.config.frame_threshold(),
            "wave detection started"
        );
        let silent_cells = activity
            .active_frames_per_cell()
            .iter()
            .filter(|&&frames| frames == 0)
            .count();
        if silent_cells > 0 {
            debug!(silent_cells, "cells never active in the analysed interval");
        }

        // --- 2. Spatial layer ---
        let positions = positions.scaled(self.config.coordinate_transform);
        let neighbors = neighbor_sets(&positions, self.config.distance_threshold);
        info!(average_degree = neighbors.average_degree(), "neighbor sets built");

        // --- 3. Labeling ---
        let raw = label_events(&activity, &neighbors, self.config.frame_threshold())?;
        let labels = canonicalize(&raw);

        // --- 4. Characterization ---
        let waves = characterize_waves(&labels, self.config.rel_size_threshold);

        Ok(LabeledRecording {
            neighbors,
            labels,
            clock: RasterClock::new(self.config.sampling).starting_at(interval.start),
            detected_events: waves.detected,
            events: waves.retained,
        })
    }

    fn finish(
        &self,
        labeled: LabeledRecording,
        raster: Vec<WaveRecord>,
        cell_summary: Vec<CellWaveSummary>,
    ) -> WaveReport {
        let wave_summary = summarize(&labeled.events, labeled.detected_events, self.config.sampling);
        info!(records = raster.len(), "wave analysis finished");
        WaveReport {
            neighbors: labeled.neighbors,
            labels: labeled.labels,
            detected_events: labeled.detected_events,
            events: labeled.events,
            raster,
            cell_summary,
            wave_summary,
        }
    }
}

fn mean_and_std(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (f64::NAN, f64::NAN);
    }
    let count = values.len() as f64;
    let mean = values.iter().sum::<f64>() / count;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / count;
    (mean, variance.sqrt())
}

/// Islet-level averages over the retained events.
pub fn summarize(events: &[WaveEvent], detected_events: usize, sampling: f64) -> WaveSummary {
    let durations: Vec<f64> = events.iter().map(|e| e.duration_seconds(sampling)).collect();
    let sizes: Vec<f64> = events.iter().map(|e| e.relative_size).collect();
    let (mean_duration, std_duration) = mean_and_std(&durations);
    let (mean_relative_size, std_relative_size) = mean_and_std(&sizes);
    WaveSummary {
        detected_events,
        retained_events: events.len(),
        mean_duration,
        std_duration,
        mean_relative_size,
        std_relative_size,
    }
}

impl WaveReport {
    /// Writes every table into `dir`, and the raster plot when `plot_size` is given.
    pub fn save(&self, dir: impl AsRef<Path>, plot_size: Option<(u32, u32)>) -> Result<()> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir).map_err(|e| WaveError::io(dir, e))?;
        text::write_label_matrix(dir.join(text::LABELS_FILE), &self.labels)?;
        text::write_events(dir.join(text::EVENTS_FILE), &self.events)?;
        text::write_raster(dir.join(text::RASTER_FILE), &self.raster)?;
        text::write_cell_summary(dir.join(text::CELL_SUMMARY_FILE), &self.cell_summary)?;
        text::write_wave_summary(dir.join(text::WAVE_SUMMARY_FILE), &self.wave_summary)?;
        if let Some((width, height)) = plot_size {
            save_raster_plot(
                dir.join("raster_plot.png"),
                &self.raster,
                self.labels.ncols(),
                width,
                height,
            )?;
        }
        info!(dir = %dir.display(), "wave results saved");
        Ok(())
    }
}
