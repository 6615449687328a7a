// THEORY:
// `WaveConfig` holds every tunable of the wave engine. It is a plain data struct
// handed to the top-level API once and validated up front, so that no stage has
// to second-guess its inputs.
//
// Key principles:
// 1.  **Physical units at the edge**: users think in seconds and in the units of
//     their coordinate files. Conversions to frames happen here and only here.
// 2.  **Fail before labeling**: `validate` rejects out-of-domain values instead of
//     clamping them, so a bad run stops before any table is written.
// 3.  **Serializable**: the config is stored next to the results as JSON so a run
//     can be reproduced exactly.

use crate::error::{Result, WaveError};
use serde::{Deserialize, Serialize};
use std::path::Path;

const DEFAULT_SAMPLING: f64 = 10.0;
const DEFAULT_TIME_THRESHOLD_SECONDS: f64 = 0.5;
const DEFAULT_DISTANCE_THRESHOLD: f64 = 12.0;
const DEFAULT_REL_SIZE_THRESHOLD: f64 = 0.1;
const DEFAULT_INITIATOR_PERCENTILE: f64 = 10.0;

fn default_coordinate_transform() -> f64 {
    1.0
}

fn default_initiator_percentile() -> f64 {
    DEFAULT_INITIATOR_PERCENTILE
}

/// Configuration of a single wave analysis run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaveConfig {
    /// Frames per second of the recording.
    pub sampling: f64,
    /// Longest span, in seconds, over which a continuing cell may still recruit
    /// freshly activated neighbors into its wave.
    pub time_threshold_seconds: f64,
    /// Cells closer than this (in transformed coordinate units) are neighbors.
    pub distance_threshold: f64,
    /// Waves covering a fraction of cells at or below this value are discarded.
    pub rel_size_threshold: f64,
    /// Scale factor applied to raw coordinates before adjacency is computed.
    #[serde(default = "default_coordinate_transform")]
    pub coordinate_transform: f64,
    /// Percentile of an event's rank distribution below which cells count as initiators.
    #[serde(default = "default_initiator_percentile")]
    pub initiator_percentile: f64,
    /// Optional start of the analysed interval, in seconds.
    #[serde(default)]
    pub interval_start_seconds: Option<f64>,
    /// Optional end of the analysed interval, in seconds.
    #[serde(default)]
    pub interval_end_seconds: Option<f64>,
}

impl Default for WaveConfig {
    fn default() -> Self {
        Self {
            sampling: DEFAULT_SAMPLING,
            time_threshold_seconds: DEFAULT_TIME_THRESHOLD_SECONDS,
            distance_threshold: DEFAULT_DISTANCE_THRESHOLD,
            rel_size_threshold: DEFAULT_REL_SIZE_THRESHOLD,
            coordinate_transform: default_coordinate_transform(),
            initiator_percentile: DEFAULT_INITIATOR_PERCENTILE,
            interval_start_seconds: None,
            interval_end_seconds: None,
        }
    }
}

impl WaveConfig {
    /// Loads a configuration from a JSON file and validates it.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| WaveError::io(path, e))?;
        let config: WaveConfig = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Writes the configuration as pretty JSON.
    pub fn save_json(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let text = serde_json::to_string_pretty(self)?;
        std::fs::write(path, text).map_err(|e| WaveError::io(path, e))
    }

    /// The continuity window in frames: seconds times sampling, truncated.
    pub fn frame_threshold(&self) -> usize {
        (self.time_threshold_seconds * self.sampling) as usize
    }

    /// Converts the optional analysis interval into a frame range clamped to `frames`.
    pub fn frame_interval(&self, frames: usize) -> std::ops::Range<usize> {
        let to_frame = |seconds: f64| ((seconds * self.sampling) as usize).min(frames);
        let start = self.interval_start_seconds.map_or(0, to_frame);
        let end = self.interval_end_seconds.map_or(frames, to_frame);
        start..end.max(start)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.sampling > 0.0) || !self.sampling.is_finite() {
            return Err(WaveError::invalid("sampling", self.sampling, "must be positive"));
        }
        if !(self.time_threshold_seconds >= 0.0) || !self.time_threshold_seconds.is_finite() {
            return Err(WaveError::invalid(
                "time_threshold_seconds",
                self.time_threshold_seconds,
                "must be non-negative",
            ));
        }
        if !(self.distance_threshold > 0.0) {
            return Err(WaveError::invalid(
                "distance_threshold",
                self.distance_threshold,
                "must be positive",
            ));
        }
        if !(self.rel_size_threshold > 0.0 && self.rel_size_threshold < 1.0) {
            return Err(WaveError::invalid(
                "rel_size_threshold",
                self.rel_size_threshold,
                "must lie in (0, 1)",
            ));
        }
        if !(self.coordinate_transform > 0.0) || !self.coordinate_transform.is_finite() {
            return Err(WaveError::invalid(
                "coordinate_transform",
                self.coordinate_transform,
                "must be positive",
            ));
        }
        if !(0.0..=100.0).contains(&self.initiator_percentile) {
            return Err(WaveError::invalid(
                "initiator_percentile",
                self.initiator_percentile,
                "must lie in [0, 100]",
            ));
        }
        if let Some(start) = self.interval_start_seconds {
            if !(start >= 0.0) || !start.is_finite() {
                return Err(WaveError::invalid("interval_start_seconds", start, "must be non-negative"));
            }
        }
        if let Some(end) = self.interval_end_seconds {
            // Without an explicit start the interval begins at 0 s.
            let start = self.interval_start_seconds.unwrap_or(0.0);
            if !end.is_finite() || !(end > start) {
                return Err(WaveError::invalid(
                    "interval_end_seconds",
                    end,
                    "must be finite and greater than the interval start",
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = WaveConfig::default();
        config.validate().expect("default config must validate");
        assert_eq!(config.frame_threshold(), 5);
    }

    #[test]
    fn frame_threshold_truncates() {
        let config = WaveConfig {
            sampling: 3.0,
            time_threshold_seconds: 0.9,
            ..WaveConfig::default()
        };
        // 2.7 frames
        assert_eq!(config.frame_threshold(), 2);
    }

    #[test]
    fn rejects_non_positive_sampling() {
        let config = WaveConfig {
            sampling: 0.0,
            ..WaveConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(matches!(err, WaveError::InvalidConfig { field: "sampling", .. }));
    }

    #[test]
    fn rejects_size_threshold_outside_unit_interval() {
        for bad in [0.0, 1.0, -0.2, 1.5] {
            let config = WaveConfig {
                rel_size_threshold: bad,
                ..WaveConfig::default()
            };
            assert!(config.validate().is_err(), "threshold {bad} should be rejected");
        }
    }

    #[test]
    fn rejects_non_positive_distance() {
        let config = WaveConfig {
            distance_threshold: -1.0,
            ..WaveConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_inverted_interval() {
        let config = WaveConfig {
            interval_start_seconds: Some(10.0),
            interval_end_seconds: Some(5.0),
            ..WaveConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn interval_end_alone_is_checked_against_zero() {
        for bad in [-5.0, 0.0, f64::INFINITY, f64::NAN] {
            let config = WaveConfig {
                interval_end_seconds: Some(bad),
                ..WaveConfig::default()
            };
            let err = config.validate().unwrap_err();
            assert!(
                matches!(err, WaveError::InvalidConfig { field: "interval_end_seconds", .. }),
                "end {bad} should be rejected"
            );
        }
        let config = WaveConfig {
            interval_end_seconds: Some(2.5),
            ..WaveConfig::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn frame_interval_clamps_to_recording() {
        let config = WaveConfig {
            sampling: 2.0,
            interval_start_seconds: Some(1.0),
            interval_end_seconds: Some(100.0),
            ..WaveConfig::default()
        };
        assert_eq!(config.frame_interval(20), 2..20);
        assert_eq!(WaveConfig::default().frame_interval(7), 0..7);
    }

    #[test]
    fn json_fills_optional_fields() {
        let json = r#"{
            "sampling": 5.0,
            "time_threshold_seconds": 1.0,
            "distance_threshold": 20.0,
            "rel_size_threshold": 0.25
        }"#;
        let config: WaveConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.coordinate_transform, 1.0);
        assert_eq!(config.initiator_percentile, 10.0);
        assert_eq!(config.interval_start_seconds, None);
        assert_eq!(config.frame_threshold(), 5);
    }

    #[test]
    fn json_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("configurations.json");
        let config = WaveConfig {
            coordinate_transform: 0.5,
            ..WaveConfig::default()
        };
        config.save_json(&path).unwrap();
        assert_eq!(WaveConfig::from_json_file(&path).unwrap(), config);
    }
}
