// THEORY:
// The `activity` module holds the "dumb" data containers that every other stage
// reads: the binarized activity matrix (frames × cells), the cell coordinates,
// and the label matrix the labeler writes. These types know how to validate and
// summarize themselves but know nothing about waves.
//
// Key principles:
// 1.  **Validated at construction**: an `ActivityMatrix` can only hold 0s and 1s
//     and a `Positions` table is always N×2. Downstream code never re-checks.
// 2.  **Row = frame, column = cell**: the layout of the binarization stage's text
//     output is kept as-is, so indexing reads `[[frame, cell]]` everywhere.

use crate::error::{Result, WaveError};
use ndarray::{Array2, ArrayView1, Axis, s};

/// T×N matrix of event labels. 0 means "not part of any wave".
pub type LabelMatrix = Array2<u32>;

/// A binarized frames × cells activity matrix. Entries are exactly 0 or 1.
#[derive(Debug, Clone, PartialEq)]
pub struct ActivityMatrix {
    data: Array2<u8>,
}

impl ActivityMatrix {
    /// Wraps a matrix, rejecting any entry that is not 0 or 1.
    pub fn new(data: Array2<u8>) -> Result<Self> {
        if let Some(((frame, cell), &value)) = data.indexed_iter().find(|(_, v)| **v > 1) {
            return Err(WaveError::NonBinaryActivity {
                frame,
                cell,
                value: value as i64,
            });
        }
        Ok(Self { data })
    }

    /// Builds a matrix from signed integer rows, as read from text.
    pub fn from_rows(rows: &[Vec<i64>]) -> Result<Self> {
        let frames = rows.len();
        let cells = rows.first().map_or(0, Vec::len);
        let mut data = Array2::<u8>::zeros((frames, cells));
        for (frame, row) in rows.iter().enumerate() {
            if row.len() != cells {
                return Err(WaveError::ShapeMismatch {
                    what: "activity row length",
                    expected: cells,
                    found: row.len(),
                });
            }
            for (cell, &value) in row.iter().enumerate() {
                match value {
                    0 | 1 => data[[frame, cell]] = value as u8,
                    _ => return Err(WaveError::NonBinaryActivity { frame, cell, value }),
                }
            }
        }
        Ok(Self { data })
    }

    pub fn frames(&self) -> usize {
        self.data.nrows()
    }

    pub fn cells(&self) -> usize {
        self.data.ncols()
    }

    pub fn is_active(&self, frame: usize, cell: usize) -> bool {
        self.data[[frame, cell]] == 1
    }

    /// The active cells of one frame, in ascending index order.
    pub fn active_cells(&self, frame: usize) -> Vec<usize> {
        self.data
            .row(frame)
            .iter()
            .enumerate()
            .filter_map(|(cell, &v)| (v == 1).then_some(cell))
            .collect()
    }

    /// Sum of a cell's activity over the `window + 1` frames ending at `frame`,
    /// clamped at the first frame.
    pub fn trailing_activity(&self, cell: usize, frame: usize, window: usize) -> usize {
        let start = frame.saturating_sub(window);
        self.data
            .slice(s![start..=frame, cell])
            .iter()
            .map(|&v| v as usize)
            .sum()
    }

    /// Restricts the matrix to a contiguous range of frames.
    pub fn slice_frames(&self, range: std::ops::Range<usize>) -> Self {
        Self {
            data: self.data.slice(s![range, ..]).to_owned(),
        }
    }

    /// Number of active frames per cell.
    pub fn active_frames_per_cell(&self) -> Vec<usize> {
        self.data
            .axis_iter(Axis(1))
            .map(|column: ArrayView1<u8>| column.iter().map(|&v| v as usize).sum())
            .collect()
    }
}

/// N×2 cell coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct Positions {
    data: Array2<f64>,
}

impl Positions {
    pub fn new(data: Array2<f64>) -> Result<Self> {
        if data.ncols() != 2 {
            return Err(WaveError::ShapeMismatch {
                what: "position columns",
                expected: 2,
                found: data.ncols(),
            });
        }
        Ok(Self { data })
    }

    pub fn from_points(points: &[(f64, f64)]) -> Self {
        let mut data = Array2::<f64>::zeros((points.len(), 2));
        for (i, &(x, y)) in points.iter().enumerate() {
            data[[i, 0]] = x;
            data[[i, 1]] = y;
        }
        Self { data }
    }

    pub fn len(&self) -> usize {
        self.data.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.data.nrows() == 0
    }

    pub fn point(&self, cell: usize) -> (f64, f64) {
        (self.data[[cell, 0]], self.data[[cell, 1]])
    }

    /// Returns a copy with every coordinate multiplied by `factor`.
    pub fn scaled(&self, factor: f64) -> Self {
        Self {
            data: &self.data * factor,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn rejects_non_binary_values() {
        let err = ActivityMatrix::new(array![[0, 1], [2, 0]]).unwrap_err();
        assert!(matches!(
            err,
            WaveError::NonBinaryActivity { frame: 1, cell: 0, value: 2 }
        ));
        let err = ActivityMatrix::from_rows(&[vec![0, -1]]).unwrap_err();
        assert!(matches!(err, WaveError::NonBinaryActivity { value: -1, .. }));
    }

    #[test]
    fn rejects_ragged_rows() {
        let err = ActivityMatrix::from_rows(&[vec![0, 1, 0], vec![1, 0]]).unwrap_err();
        assert!(matches!(err, WaveError::ShapeMismatch { expected: 3, found: 2, .. }));
    }

    #[test]
    fn trailing_activity_clamps_at_first_frame() {
        let activity = ActivityMatrix::new(array![[1], [1], [0], [1]]).unwrap();
        assert_eq!(activity.trailing_activity(0, 0, 3), 1);
        assert_eq!(activity.trailing_activity(0, 1, 3), 2);
        assert_eq!(activity.trailing_activity(0, 3, 1), 1);
        assert_eq!(activity.trailing_activity(0, 3, 3), 3);
    }

    #[test]
    fn active_cells_are_sorted() {
        let activity = ActivityMatrix::new(array![[1, 0, 1, 1], [0, 0, 0, 0]]).unwrap();
        assert_eq!(activity.active_cells(0), vec![0, 2, 3]);
        assert!(activity.active_cells(1).is_empty());
        assert_eq!(activity.active_frames_per_cell(), vec![1, 0, 1, 1]);
    }

    #[test]
    fn slicing_keeps_all_cells() {
        let activity = ActivityMatrix::new(array![[1, 0], [0, 1], [1, 1]]).unwrap();
        let sliced = activity.slice_frames(1..3);
        assert_eq!(sliced.frames(), 2);
        assert_eq!(sliced.cells(), 2);
        assert!(sliced.is_active(0, 1));
    }

    #[test]
    fn positions_must_be_two_dimensional() {
        assert!(Positions::new(Array2::zeros((4, 3))).is_err());
        let positions = Positions::from_points(&[(1.0, 2.0), (3.0, 4.0)]).scaled(2.0);
        assert_eq!(positions.point(1), (6.0, 8.0));
    }
}
