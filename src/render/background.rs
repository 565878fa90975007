use std::path::{Path, PathBuf};

use image::{RgbImage, imageops::FilterType};

use crate::foundation::core::Canvas;
use crate::foundation::error::{ShortsError, ShortsResult};

/// Gaussian sigma applied to photo backgrounds so overlaid text stays readable.
pub const BACKGROUND_BLUR_SIGMA: f32 = 1.5;
/// Brightness multiplier applied to photo backgrounds.
pub const BACKGROUND_BRIGHTNESS: f32 = 0.8;

/// Where a worker gets its background pixels from.
///
/// Workers never share a decoded image: each one decodes its own copy from this source.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "path")]
pub enum BackgroundSource {
    /// An already prepared image (sized to the canvas). Resized again if it is not.
    Image(PathBuf),
    /// Synthesized vertical gradient.
    Gradient,
}

impl BackgroundSource {
    /// Decode the background for one worker.
    ///
    /// A missing or undecodable image degrades to the gradient with a warning.
    pub fn load(&self, canvas: Canvas) -> RgbImage {
        match self {
            Self::Gradient => gradient_background(canvas),
            Self::Image(path) => match decode_sized(path, canvas) {
                Ok(img) => img,
                Err(e) => {
                    tracing::warn!(error = %e, "background unavailable, using gradient");
                    gradient_background(canvas)
                }
            },
        }
    }
}

/// Blue-to-purple vertical gradient.
pub fn gradient_background(canvas: Canvas) -> RgbImage {
    let h = canvas.height.max(1) as f64;
    let mut img = RgbImage::new(canvas.width, canvas.height);
    for (_, y, px) in img.enumerate_pixels_mut() {
        let t = f64::from(y) / h;
        *px = image::Rgb([
            (25.0 + t * 40.0) as u8,
            (25.0 + t * 30.0) as u8,
            (50.0 + t * 150.0) as u8,
        ]);
    }
    img
}

/// Turn a user-supplied photo into a frame background: exact resize to the canvas, slight
/// blur, then darken.
pub fn prepare_photo(path: &Path, canvas: Canvas) -> ShortsResult<RgbImage> {
    let img = image::open(path).map_err(|e| {
        ShortsError::resource(format!("failed to open background '{}': {e}", path.display()))
    })?;
    let resized = img
        .resize_exact(canvas.width, canvas.height, FilterType::Lanczos3)
        .to_rgb8();
    let mut out = image::imageops::blur(&resized, BACKGROUND_BLUR_SIGMA);
    darken_in_place(&mut out, BACKGROUND_BRIGHTNESS);
    Ok(out)
}

/// Prepare the job background once and store it losslessly under `run_dir` so workers can
/// decode it independently.
///
/// Falls back to the gradient when no photo is given or it cannot be loaded.
pub fn stage_background(
    photo: Option<&Path>,
    canvas: Canvas,
    run_dir: &Path,
) -> ShortsResult<BackgroundSource> {
    let prepared = match photo {
        Some(path) => match prepare_photo(path, canvas) {
            Ok(img) => img,
            Err(e) => {
                tracing::warn!(error = %e, "falling back to gradient background");
                gradient_background(canvas)
            }
        },
        None => {
            tracing::info!("no background image given, using gradient");
            gradient_background(canvas)
        }
    };

    std::fs::create_dir_all(run_dir).map_err(|e| {
        ShortsError::Other(anyhow::anyhow!(
            "failed to create run directory '{}': {e}",
            run_dir.display()
        ))
    })?;
    let staged = run_dir.join("background.png");
    prepared.save(&staged).map_err(|e| {
        ShortsError::Other(anyhow::anyhow!(
            "failed to write background '{}': {e}",
            staged.display()
        ))
    })?;
    Ok(BackgroundSource::Image(staged))
}

fn decode_sized(path: &Path, canvas: Canvas) -> ShortsResult<RgbImage> {
    let img = image::open(path)
        .map_err(|e| {
            ShortsError::resource(format!("failed to decode '{}': {e}", path.display()))
        })?
        .to_rgb8();
    if img.width() == canvas.width && img.height() == canvas.height {
        return Ok(img);
    }
    Ok(image::imageops::resize(
        &img,
        canvas.width,
        canvas.height,
        FilterType::Lanczos3,
    ))
}

fn darken_in_place(img: &mut RgbImage, factor: f32) {
    for c in img.as_mut().iter_mut() {
        *c = (f32::from(*c) * factor).round().clamp(0.0, 255.0) as u8;
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/background.rs"]
mod tests;
