// THEORY:
// This file is the main entry point for the `islet_waves` library crate. It
// defines the public API that external consumers (such as the `wave_runner`
// binary) build on.
//
// The primary interface is `WavePipeline` with its `WaveConfig` and the
// `WaveReport` it produces. The individual stages live in `core_modules` and stay
// public so that callers can run a single stage on its own (for example,
// re-deriving the raster from a stored label matrix). Text and image
// interchange lives in `io`.

pub mod config;
pub mod core_modules;
pub mod error;
pub mod io;
pub mod parallel_pipeline;
pub mod pipeline;

pub use config::WaveConfig;
pub use core_modules::activity::{ActivityMatrix, LabelMatrix, Positions};
pub use core_modules::cell_statistics::CellWaveSummary;
pub use core_modules::wave_characterizer::WaveEvent;
pub use core_modules::wave_raster::WaveRecord;
pub use error::{Result, WaveError};
pub use io::text::WaveSummary;
pub use parallel_pipeline::WorkerPool;
pub use pipeline::{WavePipeline, WaveReport};
