// THEORY:
// All interchange with the rest of the analysis toolchain is row-oriented,
// whitespace-delimited text: one record per line, values in a fixed column
// order, an optional header line. This module reads the two inputs (binarized
// activity, cell positions) and writes every table the engine produces.
//
// Readers skip blank lines and lines starting with `#`. Writers print NaN as
// `nan` so that the tables load back with the usual numeric text loaders.

use crate::core_modules::activity::{ActivityMatrix, LabelMatrix, Positions};
use crate::core_modules::cell_statistics::CellWaveSummary;
use crate::core_modules::wave_characterizer::WaveEvent;
use crate::core_modules::wave_raster::WaveRecord;
use crate::error::{Result, WaveError};
use ndarray::Array2;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

pub const LABELS_FILE: &str = "act_sig.txt";
pub const EVENTS_FILE: &str = "events_parameters.txt";
pub const RASTER_FILE: &str = "raster_plot.txt";
pub const CELL_SUMMARY_FILE: &str = "cell_wave_parameters.txt";
pub const WAVE_SUMMARY_FILE: &str = "wave_summary.txt";

pub const EVENTS_HEADER: &str = "start_frame end_frame duration event_number act_cell_num rel_act_cell_num";
pub const RASTER_HEADER: &str = "start_time act_delay act_rank cell event_num rel_event_size";
pub const CELL_SUMMARY_HEADER: &str = "AvgRank InitParameter RelParticipation";
pub const WAVE_SUMMARY_HEADER: &str =
    "DetectedEvents RetainedEvents AvgDuration AvgDurationSD AvgRelSize AvgRelSizeSD";

/// Islet-level averages over the retained waves.
#[derive(Debug, Clone, PartialEq)]
pub struct WaveSummary {
    pub detected_events: usize,
    pub retained_events: usize,
    /// Mean retained wave duration in seconds.
    pub mean_duration: f64,
    pub std_duration: f64,
    pub mean_relative_size: f64,
    pub std_relative_size: f64,
}

/// One data row of a table together with its 1-based line in the file.
struct NumberedRow {
    line: usize,
    values: Vec<f64>,
}

fn read_numbered_table(path: &Path) -> Result<Vec<NumberedRow>> {
    let text = std::fs::read_to_string(path).map_err(|e| WaveError::io(path, e))?;
    let mut rows: Vec<NumberedRow> = Vec::new();

    for (index, line) in text.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let values = trimmed
            .split_whitespace()
            .map(|token| {
                token.parse::<f64>().map_err(|e| WaveError::Parse {
                    path: path.to_path_buf(),
                    line: index + 1,
                    message: format!("{token:?}: {e}"),
                })
            })
            .collect::<Result<Vec<f64>>>()?;
        if let Some(first) = rows.first() {
            if first.values.len() != values.len() {
                return Err(WaveError::Parse {
                    path: path.to_path_buf(),
                    line: index + 1,
                    message: format!("expected {} columns, found {}", first.values.len(), values.len()),
                });
            }
        }
        rows.push(NumberedRow {
            line: index + 1,
            values,
        });
    }
    Ok(rows)
}

/// Parses a numeric table. Every data row must have the same number of columns.
pub fn read_table(path: impl AsRef<Path>) -> Result<Vec<Vec<f64>>> {
    let rows = read_numbered_table(path.as_ref())?;
    Ok(rows.into_iter().map(|row| row.values).collect())
}

/// Reads a binarized activity matrix (frames × cells).
pub fn read_activity(path: impl AsRef<Path>) -> Result<ActivityMatrix> {
    let path = path.as_ref();
    let table = read_numbered_table(path)?;
    let mut rows = Vec::with_capacity(table.len());
    for row in &table {
        let mut ints = Vec::with_capacity(row.values.len());
        for &value in &row.values {
            if value.fract() != 0.0 {
                return Err(WaveError::Parse {
                    path: path.to_path_buf(),
                    line: row.line,
                    message: format!("activity value {value} is not an integer"),
                });
            }
            ints.push(value as i64);
        }
        rows.push(ints);
    }
    ActivityMatrix::from_rows(&rows)
}

/// Reads cell coordinates (N rows × 2 columns).
pub fn read_positions(path: impl AsRef<Path>) -> Result<Positions> {
    let table = read_table(path)?;
    let columns = table.first().map_or(2, Vec::len);
    let mut data = Array2::<f64>::zeros((table.len(), columns));
    for (i, row) in table.iter().enumerate() {
        for (j, &value) in row.iter().enumerate() {
            data[[i, j]] = value;
        }
    }
    Positions::new(data)
}

fn create(path: &Path) -> Result<BufWriter<File>> {
    File::create(path)
        .map(BufWriter::new)
        .map_err(|e| WaveError::io(path, e))
}

fn float(value: f64) -> String {
    if value.is_nan() {
        "nan".to_string()
    } else {
        value.to_string()
    }
}

fn fixed(value: f64) -> String {
    if value.is_nan() {
        "nan".to_string()
    } else {
        format!("{value:.3}")
    }
}

/// Writes `rows` through `write_row`, then flushes, mapping errors to `path`.
fn write_lines<T>(
    path: &Path,
    header: Option<&str>,
    rows: &[T],
    write_row: impl Fn(&mut BufWriter<File>, &T) -> std::io::Result<()>,
) -> Result<()> {
    let mut out = create(path)?;
    let result = (|| {
        if let Some(header) = header {
            writeln!(out, "{header}")?;
        }
        for row in rows {
            write_row(&mut out, row)?;
        }
        out.flush()
    })();
    result.map_err(|e| WaveError::io(path, e))
}

/// Label matrix as an integer grid, one frame per line.
pub fn write_label_matrix(path: impl AsRef<Path>, labels: &LabelMatrix) -> Result<()> {
    let rows: Vec<String> = labels
        .rows()
        .into_iter()
        .map(|row| {
            row.iter()
                .map(u32::to_string)
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect();
    write_lines(path.as_ref(), None, &rows, |out, row| writeln!(out, "{row}"))
}

pub fn write_events(path: impl AsRef<Path>, events: &[WaveEvent]) -> Result<()> {
    write_lines(path.as_ref(), Some(EVENTS_HEADER), events, |out, e| {
        writeln!(
            out,
            "{} {} {} {} {} {}",
            e.start_frame,
            e.end_frame,
            e.duration,
            e.id,
            e.active_cells,
            float(e.relative_size)
        )
    })
}

pub fn write_raster(path: impl AsRef<Path>, raster: &[WaveRecord]) -> Result<()> {
    write_lines(path.as_ref(), Some(RASTER_HEADER), raster, |out, r| {
        writeln!(
            out,
            "{} {} {} {} {} {}",
            float(r.time),
            float(r.delay),
            r.rank,
            r.cell,
            r.event_id,
            float(r.relative_size)
        )
    })
}

pub fn write_cell_summary(path: impl AsRef<Path>, summary: &[CellWaveSummary]) -> Result<()> {
    write_lines(path.as_ref(), Some(CELL_SUMMARY_HEADER), summary, |out, s| {
        writeln!(
            out,
            "{} {} {}",
            fixed(s.mean_rank),
            s.initiator_count,
            fixed(s.relative_participation)
        )
    })
}

pub fn write_wave_summary(path: impl AsRef<Path>, summary: &WaveSummary) -> Result<()> {
    write_lines(
        path.as_ref(),
        Some(WAVE_SUMMARY_HEADER),
        std::slice::from_ref(summary),
        |out, s| {
            writeln!(
                out,
                "{} {} {} {} {} {}",
                s.detected_events,
                s.retained_events,
                fixed(s.mean_duration),
                fixed(s.std_duration),
                fixed(s.mean_relative_size),
                fixed(s.std_relative_size)
            )
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn write(dir: &tempfile::TempDir, name: &str, text: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, text).unwrap();
        path
    }

    #[test]
    fn reads_activity_with_comments_and_floats() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "bin.txt", "# binarized\n0 1 0\n\n1.0 1 0.0\n");
        let activity = read_activity(&path).unwrap();
        assert_eq!((activity.frames(), activity.cells()), (2, 3));
        assert!(activity.is_active(1, 0));
        assert!(!activity.is_active(1, 2));
    }

    #[test]
    fn rejects_bad_activity_tokens() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "bad.txt", "0 1\n0 x\n");
        assert!(matches!(read_activity(&path), Err(WaveError::Parse { line: 2, .. })));

        let path = write(&dir, "ragged.txt", "0 1\n0\n");
        assert!(matches!(read_activity(&path), Err(WaveError::Parse { .. })));

        let path = write(&dir, "fraction.txt", "0 0.5\n");
        assert!(read_activity(&path).is_err());

        let path = write(&dir, "commented.txt", "# cell activity\n# 0/1\n\n0 0.5\n");
        assert!(matches!(read_activity(&path), Err(WaveError::Parse { line: 4, .. })));

        let path = write(&dir, "three.txt", "0 3\n");
        assert!(matches!(read_activity(&path), Err(WaveError::NonBinaryActivity { .. })));
    }

    #[test]
    fn reads_positions() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "pos.txt", "1.5 2\n-3 4e1\n");
        let positions = read_positions(&path).unwrap();
        assert_eq!(positions.len(), 2);
        assert_eq!(positions.point(1), (-3.0, 40.0));

        let path = write(&dir, "pos3.txt", "1 2 3\n");
        assert!(matches!(read_positions(&path), Err(WaveError::ShapeMismatch { .. })));
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_table(dir.path().join("absent.txt")).unwrap_err();
        assert!(matches!(err, WaveError::Io { .. }));
    }

    #[test]
    fn writes_label_grid_and_tables() {
        let dir = tempfile::tempdir().unwrap();
        let labels: LabelMatrix = array![[0, 1], [2, 1]];
        let path = dir.path().join(LABELS_FILE);
        write_label_matrix(&path, &labels).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "0 1\n2 1\n");

        let events = vec![WaveEvent {
            id: 1,
            start_frame: 0,
            end_frame: 1,
            duration: 1,
            active_cells: 1,
            relative_size: 0.5,
        }];
        let path = dir.path().join(EVENTS_FILE);
        write_events(&path, &events).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, format!("{EVENTS_HEADER}\n0 1 1 1 1 0.5\n"));

        let summary = vec![CellWaveSummary {
            cell: 0,
            relative_participation: f64::NAN,
            mean_rank: f64::NAN,
            initiator_count: 0,
            initiator_frequency: f64::NAN,
        }];
        let path = dir.path().join(CELL_SUMMARY_FILE);
        write_cell_summary(&path, &summary).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, format!("{CELL_SUMMARY_HEADER}\nnan 0 nan\n"));
    }

    #[test]
    fn empty_event_table_still_has_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(RASTER_FILE);
        write_raster(&path, &[]).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), format!("{RASTER_HEADER}\n"));
    }
}
