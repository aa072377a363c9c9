//! PNG export of render output.
//!
//! Tone mapping lives here, not in the integrators: colors are clamped and
//! gamma 2 corrected on the way to 8 bits.

use crate::{Color, RenderOutput};
use image::{ImageFormat, Rgb, RgbImage};
use log::debug;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while writing images.
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image encoding error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Render output has no pixels")]
    EmptyImage,
}

pub type ExportResult<T> = Result<T, ExportError>;

/// Apply gamma correction (gamma = 2.0).
#[inline]
pub fn linear_to_gamma(linear: f64) -> f64 {
    if linear > 0.0 {
        linear.sqrt()
    } else {
        0.0
    }
}

/// Gamma-corrected, clamped 8-bit color.
pub fn color_to_rgb(color: Color) -> [u8; 3] {
    let channel = |c: f64| (255.99 * linear_to_gamma(c).clamp(0.0, 1.0)).min(255.0) as u8;
    [channel(color.x), channel(color.y), channel(color.z)]
}

fn gray(value: f64) -> Rgb<u8> {
    let v = (value.clamp(0.0, 1.0) * 255.99).min(255.0) as u8;
    Rgb([v, v, v])
}

fn ensure_pixels(output: &RenderOutput) -> ExportResult<()> {
    if output.width == 0 || output.height == 0 || output.pixels.is_empty() {
        return Err(ExportError::EmptyImage);
    }
    Ok(())
}

pub fn color_image(output: &RenderOutput) -> ExportResult<RgbImage> {
    ensure_pixels(output)?;
    Ok(RgbImage::from_fn(output.width, output.height, |x, y| {
        Rgb(color_to_rgb(output.get(x, y).color))
    }))
}

/// Grayscale depth, black at the camera and white at the largest finite
/// depth in the image.
pub fn depth_image(output: &RenderOutput) -> ExportResult<RgbImage> {
    ensure_pixels(output)?;
    let max_depth = output
        .pixels
        .iter()
        .map(|p| p.depth)
        .filter(|d| d.is_finite())
        .fold(0.0_f64, f64::max);

    Ok(RgbImage::from_fn(output.width, output.height, |x, y| {
        let depth = output.get(x, y).depth;
        if max_depth > 0.0 && depth.is_finite() {
            gray(depth / max_depth)
        } else {
            gray(1.0)
        }
    }))
}

/// Lower and upper pixel time after dropping `outlier_percentage` percent of
/// the pixels at each end.
pub fn time_range(output: &RenderOutput, outlier_percentage: f64) -> ExportResult<(Duration, Duration)> {
    ensure_pixels(output)?;
    let mut times: Vec<Duration> = output.pixels.iter().map(|p| p.elapsed).collect();
    let n = times.len();
    let trimmed = (n as f64 * outlier_percentage.clamp(0.0, 50.0) / 100.0) as usize;

    let low_index = trimmed.min(n - 1);
    let high_index = n.saturating_sub(trimmed + 1).max(low_index);

    let low = *times.select_nth_unstable(low_index).1;
    let high = *times.select_nth_unstable(high_index).1;
    Ok((low, high))
}

/// Per-pixel render time heat map, black for the fastest pixels.
pub fn time_image(output: &RenderOutput, outlier_percentage: f64) -> ExportResult<RgbImage> {
    let (low, high) = time_range(output, outlier_percentage)?;
    let range = high.saturating_sub(low).as_secs_f64();
    debug!("time image: base {:?}, range {:?}", low, high.saturating_sub(low));

    Ok(RgbImage::from_fn(output.width, output.height, |x, y| {
        if range > 0.0 {
            let elapsed = output.get(x, y).elapsed.as_secs_f64();
            gray((elapsed - low.as_secs_f64()) / range)
        } else {
            gray(0.0)
        }
    }))
}

fn save(image: &RgbImage, path: &Path) -> ExportResult<()> {
    image.save_with_format(path, ImageFormat::Png)?;
    debug!("wrote {}", path.display());
    Ok(())
}

pub fn write_color_png(output: &RenderOutput, path: impl AsRef<Path>) -> ExportResult<()> {
    save(&color_image(output)?, path.as_ref())
}

pub fn write_depth_png(output: &RenderOutput, path: impl AsRef<Path>) -> ExportResult<()> {
    save(&depth_image(output)?, path.as_ref())
}

pub fn write_time_png(output: &RenderOutput, path: impl AsRef<Path>, outlier_percentage: f64) -> ExportResult<()> {
    save(&time_image(output, outlier_percentage)?, path.as_ref())
}
