use anyhow::{Context, Result};
use clap::Parser;
use islet_waves::io::text;
use islet_waves::{WaveConfig, WavePipeline, WorkerPool};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Detects intercellular calcium waves in a binarized islet recording.
#[derive(Debug, Parser)]
#[command(name = "wave_runner", version, about)]
struct Args {
    /// Binarized activity table (frames × cells, values 0/1).
    activity: PathBuf,
    /// Cell coordinates (one "x y" row per cell).
    positions: PathBuf,
    /// Directory the result tables are written to.
    #[arg(short, long, default_value = "wave_results")]
    output: PathBuf,
    /// JSON configuration file. Flags below override its values.
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Sampling frequency in Hz.
    #[arg(long)]
    sampling: Option<f64>,
    /// Continuity window in seconds.
    #[arg(long)]
    time_threshold: Option<f64>,
    /// Neighbor distance threshold, in transformed coordinate units.
    #[arg(long)]
    distance_threshold: Option<f64>,
    /// Minimum relative event size (exclusive).
    #[arg(long)]
    rel_size_threshold: Option<f64>,
    /// Factor applied to every coordinate before neighbor detection.
    #[arg(long)]
    coordinate_transform: Option<f64>,
    /// Start of the analysed interval in seconds.
    #[arg(long)]
    start: Option<f64>,
    /// End of the analysed interval in seconds.
    #[arg(long)]
    end: Option<f64>,
    /// Also render the raster plot as PNG.
    #[arg(long)]
    plot: bool,
    /// Fan the per-event stages out over all CPUs.
    #[arg(long)]
    parallel: bool,
    /// Write the effective configuration next to the results.
    #[arg(long)]
    save_config: bool,
}

const PLOT_SIZE: (u32, u32) = (800, 400);

impl Args {
    fn wave_config(&self) -> Result<WaveConfig> {
        let mut config = match &self.config {
            Some(path) => WaveConfig::from_json_file(path)
                .with_context(|| format!("loading configuration from {}", path.display()))?,
            None => WaveConfig::default(),
        };
        let overrides = [
            (&mut config.sampling, self.sampling),
            (&mut config.time_threshold_seconds, self.time_threshold),
            (&mut config.distance_threshold, self.distance_threshold),
            (&mut config.rel_size_threshold, self.rel_size_threshold),
            (&mut config.coordinate_transform, self.coordinate_transform),
        ];
        for (field, value) in overrides {
            if let Some(value) = value {
                *field = value;
            }
        }
        if self.start.is_some() {
            config.interval_start_seconds = self.start;
        }
        if self.end.is_some() {
            config.interval_end_seconds = self.end;
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // --- 1. Configuration ---
    let args = Args::parse();
    let config = args.wave_config()?;
    let pipeline = WavePipeline::new(config.clone()).context("invalid wave configuration")?;

    // --- 2. Inputs ---
    let activity = text::read_activity(&args.activity)
        .with_context(|| format!("reading activity from {}", args.activity.display()))?;
    let positions = text::read_positions(&args.positions)
        .with_context(|| format!("reading positions from {}", args.positions.display()))?;
    info!(frames = activity.frames(), cells = activity.cells(), "inputs loaded");

    // --- 3. Analysis ---
    let report = if args.parallel {
        let pool = WorkerPool::new();
        info!(workers = pool.workers(), "running per-event stages in parallel");
        pipeline.analyze_parallel(&activity, &positions, &pool).await?
    } else {
        pipeline.analyze(&activity, &positions)?
    };

    // --- 4. Output ---
    report
        .save(&args.output, args.plot.then_some(PLOT_SIZE))
        .with_context(|| format!("writing results to {}", args.output.display()))?;
    if args.save_config {
        config.save_json(args.output.join("wave_config.json"))?;
    }

    let summary = &report.wave_summary;
    println!(
        "{} events detected, {} retained (mean duration {:.3} s, mean relative size {:.3})",
        summary.detected_events, summary.retained_events, summary.mean_duration, summary.mean_relative_size
    );
    Ok(())
}
