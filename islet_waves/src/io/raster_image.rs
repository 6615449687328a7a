// THEORY:
// The raster image is the visual hook of the wave raster: a scatter of
// activation time (x) against cell index (y), one dot per `WaveRecord`, coloured
// by event id on a reversed "jet" colour map so neighbouring events are easy to
// tell apart. It is a best-effort diagnostic, not part of the numerical output.
//
// The image is built as an RGBA buffer and encoded with the PNG encoder, the
// same way any other frame buffer of the engine would be saved.

use crate::core_modules::wave_raster::WaveRecord;
use crate::error::{Result, WaveError};
use image::{ImageEncoder, Rgba, RgbaImage};
use std::path::Path;

const MARGIN: u32 = 10;
const DOT_RADIUS: i64 = 1;
const BACKGROUND: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// Reversed jet colour map for `x` in [0, 1].
fn jet_r(x: f64) -> Rgba<u8> {
    let x = 1.0 - x.clamp(0.0, 1.0);
    let channel = |offset: f64| {
        let v = (1.5 - (4.0 * x - offset).abs()).clamp(0.0, 1.0);
        (v * 255.0).round() as u8
    };
    Rgba([channel(3.0), channel(2.0), channel(1.0), 255])
}

/// Renders the raster scatter into an image of the given plot area size.
pub fn render_raster(raster: &[WaveRecord], cells: usize, width: u32, height: u32) -> RgbaImage {
    let mut image = RgbaImage::from_pixel(width + 2 * MARGIN, height + 2 * MARGIN, BACKGROUND);
    if raster.is_empty() || width == 0 || height == 0 {
        return image;
    }

    let max_time = raster.iter().map(|r| r.time).fold(0.0_f64, f64::max);
    let (min_event, max_event) = raster.iter().fold((u32::MAX, 0), |(lo, hi), r| {
        (lo.min(r.event_id), hi.max(r.event_id))
    });
    let event_span = (max_event - min_event).max(1) as f64;
    let top_cell = cells.saturating_sub(1).max(1) as f64;

    for record in raster {
        let fx = if max_time > 0.0 { record.time / max_time } else { 0.0 };
        let fy = record.cell as f64 / top_cell;
        let x = MARGIN as i64 + (fx * (width - 1) as f64).round() as i64;
        // Cell 0 at the bottom
        let y = MARGIN as i64 + ((1.0 - fy) * (height - 1) as f64).round() as i64;
        let colour = jet_r((record.event_id - min_event) as f64 / event_span);

        for dy in -DOT_RADIUS..=DOT_RADIUS {
            for dx in -DOT_RADIUS..=DOT_RADIUS {
                let (px, py) = (x + dx, y + dy);
                if px >= 0 && py >= 0 && (px as u32) < image.width() && (py as u32) < image.height() {
                    image.put_pixel(px as u32, py as u32, colour);
                }
            }
        }
    }
    image
}

/// Saves an RGBA image as PNG.
pub fn save_png(path: impl AsRef<Path>, image: &RgbaImage) -> Result<()> {
    let path = path.as_ref();
    let output = std::fs::File::create(path).map_err(|e| WaveError::io(path, e))?;
    let encoder = image::codecs::png::PngEncoder::new(std::io::BufWriter::new(output));
    encoder.write_image(
        image.as_raw(),
        image.width(),
        image.height(),
        image::ExtendedColorType::Rgba8,
    )?;
    Ok(())
}

/// Renders and saves the raster plot.
pub fn save_raster_plot(
    path: impl AsRef<Path>,
    raster: &[WaveRecord],
    cells: usize,
    width: u32,
    height: u32,
) -> Result<()> {
    save_png(path, &render_raster(raster, cells, width, height))
}
