// THEORY:
// The `EventLabeler` is the engine of the wave-detection layer. It does two jobs
// in one pass: it groups spatially adjacent active cells within a frame (spatial
// cohesion) and it carries a cell's wave membership from one frame to the next
// (persistence).
//
// The pass walks the frames strictly in time order. For every frame:
// 1.  **Seeding**: an active cell that was labeled in the previous frame
//     *continues* and keeps its label. Every other active cell is *new* and is
//     handed a brand-new label from the `LabelForest`.
// 2.  **Cohesion**: new cells that neighbor each other are the same wave. Their
//     labels are unioned; the smallest fresh label becomes the group's id.
// 3.  **Recruitment**: a continuing cell pulls neighboring new cells into its wave,
//     but only while it is *recruiting*: its activity summed over the trailing
//     `frame_threshold + 1` frames must not exceed `frame_threshold`. A cell that
//     has been lit for longer than the window is a stale front and cannot extend
//     its wave. A group of new cells touching several recruiters joins the oldest
//     (smallest) of their waves.
// 4.  **Write-back**: resolved labels are stored in the label matrix row, which is
//     what the next frame reads to decide continuity.
//
// Two continuing waves that touch are never fused. Old labels are always roots
// of the forest, so a label written into an earlier row never changes meaning.
// Fresh labels absorbed by a merge are simply never written, which leaves gaps
// in the numbering; the canonicalizer closes them.

use crate::core_modules::activity::{ActivityMatrix, LabelMatrix};
use crate::core_modules::label_forest::LabelForest;
use crate::core_modules::neighbor_graph::NeighborSets;
use crate::error::{Result, WaveError};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// The role an active cell plays in the frame currently being labeled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CellRole {
    Inactive,
    /// Active in the previous frame; keeps `label`.
    Continuing { label: u32, recruiting: bool },
    /// Freshly active; holds a fresh label until merges resolve it.
    New { label: u32 },
}

/// Streams an activity matrix frame by frame into a raw label matrix.
pub struct EventLabeler<'a> {
    activity: &'a ActivityMatrix,
    neighbors: &'a NeighborSets,
    /// Continuity window in frames.
    frame_threshold: usize,
    labels: LabelMatrix,
    forest: LabelForest,
    /// Per-cell scratch buffer, reset after every frame.
    roles: Vec<CellRole>,
    labeled_frames: usize,
}

impl<'a> EventLabeler<'a> {
    pub fn new(
        activity: &'a ActivityMatrix,
        neighbors: &'a NeighborSets,
        frame_threshold: usize,
    ) -> Result<Self> {
        if neighbors.cells() != activity.cells() {
            return Err(WaveError::ShapeMismatch {
                what: "neighbor sets vs activity columns",
                expected: activity.cells(),
                found: neighbors.cells(),
            });
        }
        Ok(Self {
            activity,
            neighbors,
            frame_threshold,
            labels: LabelMatrix::zeros((activity.frames(), activity.cells())),
            forest: LabelForest::new(),
            roles: vec![CellRole::Inactive; activity.cells()],
            labeled_frames: 0,
        })
    }

    /// Runs the full forward pass and returns the raw label matrix.
    pub fn run(mut self) -> LabelMatrix {
        for frame in 0..self.activity.frames() {
            self.update(frame);
        }
        info!(
            frames = self.activity.frames(),
            active_frames = self.labeled_frames,
            labels_issued = self.forest.issued(),
            "event labeling finished"
        );
        self.labels
    }

    /// Labels a single frame. Frames must be fed in increasing order.
    fn update(&mut self, frame: usize) {
        let active = self.activity.active_cells(frame);
        if active.is_empty() {
            return;
        }
        self.labeled_frames += 1;

        // --- 1. Seeding ---
        let mut new_cells = 0usize;
        for &cell in &active {
            let carried = if frame > 0 { self.labels[[frame - 1, cell]] } else { 0 };
            self.roles[cell] = if carried > 0 {
                let recent = self
                    .activity
                    .trailing_activity(cell, frame, self.frame_threshold);
                CellRole::Continuing {
                    label: carried,
                    recruiting: recent <= self.frame_threshold,
                }
            } else {
                new_cells += 1;
                CellRole::New {
                    label: self.forest.fresh(),
                }
            };
        }

        // --- 2. Cohesion among new cells ---
        for &cell in &active {
            let CellRole::New { label } = self.roles[cell] else {
                continue;
            };
            for &other in self.neighbors.of(cell) {
                if let CellRole::New { label: other_label } = self.roles[other] {
                    self.forest.union(label, other_label);
                }
            }
        }

        // --- 3. Recruitment by continuing cells ---
        // group root -> oldest recruiting wave touching the group
        let mut adopted: BTreeMap<u32, u32> = BTreeMap::new();
        for &cell in &active {
            let CellRole::New { label } = self.roles[cell] else {
                continue;
            };
            let root = self.forest.find(label);
            for &other in self.neighbors.of(cell) {
                if let CellRole::Continuing {
                    label: wave,
                    recruiting: true,
                } = self.roles[other]
                {
                    adopted
                        .entry(root)
                        .and_modify(|current| *current = (*current).min(wave))
                        .or_insert(wave);
                }
            }
        }
        let recruited_groups = adopted.len();
        for (root, wave) in adopted {
            self.forest.union(root, wave);
        }

        // --- 4. Write-back ---
        for &cell in &active {
            let label = match self.roles[cell] {
                CellRole::Continuing { label, .. } => label,
                CellRole::New { label } => self.forest.find(label),
                CellRole::Inactive => continue,
            };
            self.labels[[frame, cell]] = label;
            self.roles[cell] = CellRole::Inactive;
        }

        debug!(
            frame,
            active = active.len(),
            new_cells,
            recruited_groups,
            "labeled frame"
        );
    }
}

/// Convenience wrapper: labels `activity` in one call.
pub fn label_events(
    activity: &ActivityMatrix,
    neighbors: &NeighborSets,
    frame_threshold: usize,
) -> Result<LabelMatrix> {
    Ok(EventLabeler::new(activity, neighbors, frame_threshold)?.run())
}
