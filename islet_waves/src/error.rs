// THEORY:
// The `error` module defines the single failure taxonomy of the engine. Only
// precondition violations are errors: a bad configuration, inputs whose shapes
// disagree, or text that cannot be parsed. Degenerate *results* (no wave
// survives the size filter, a cell never takes part in a wave) are valid data
// and are expressed as empty lists or NaN values, never as an `Err`.

use std::path::PathBuf;
use thiserror::Error;

/// Errors produced by the wave engine.
#[derive(Debug, Error)]
pub enum WaveError {
    /// A configuration value is outside its allowed domain.
    #[error("invalid configuration: {field} = {value} ({reason})")]
    InvalidConfig {
        field: &'static str,
        value: String,
        reason: &'static str,
    },
    /// Two inputs that must agree in size do not.
    #[error("shape mismatch: {what} (expected {expected}, found {found})")]
    ShapeMismatch {
        what: &'static str,
        expected: usize,
        found: usize,
    },
    /// The activity matrix holds something other than 0 or 1.
    #[error("activity matrix is not binary: value {value} at frame {frame}, cell {cell}")]
    NonBinaryActivity { frame: usize, cell: usize, value: i64 },
    /// A delimited text table could not be parsed.
    #[error("parse error in {path:?} line {line}: {message}")]
    Parse {
        path: PathBuf,
        line: usize,
        message: String,
    },
    #[error("i/o error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("configuration json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("raster image error: {0}")]
    Image(#[from] image::ImageError),
    /// A background analysis worker failed to complete.
    #[error("analysis worker failed: {0}")]
    Worker(String),
}

impl WaveError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        WaveError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn invalid(field: &'static str, value: impl ToString, reason: &'static str) -> Self {
        WaveError::InvalidConfig {
            field,
            value: value.to_string(),
            reason,
        }
    }
}

pub type Result<T> = std::result::Result<T, WaveError>;
