//! Image preparation ahead of recognition.
//!
//! A fixed enhancement chain: downscale to a bounded long edge, grayscale
//! contrast stretch, mild sharpening, brightness and contrast lift, then a
//! deterministic PNG encode. The same input bytes always produce the same
//! output bytes, so pipeline runs stay reproducible.

use crate::error::{KlartextError, Result};
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat};
use std::io::Cursor;

/// Images are downscaled so their longer edge does not exceed this.
/// Smaller images are left at native resolution; upscaling adds no
/// recognition signal.
pub const MAX_LONG_EDGE_PX: u32 = 2000;

const SHARPEN_SIGMA: f32 = 1.0;
const SHARPEN_THRESHOLD: i32 = 2;
const BRIGHTEN_DELTA: i32 = 25;
const CONTRAST_BOOST: f32 = 20.0;

/// Run the full enhancement chain and re-encode as PNG.
pub fn prepare(image_bytes: &[u8]) -> Result<Vec<u8>> {
    let decoded = image::load_from_memory(image_bytes).map_err(|e| {
        KlartextError::image_processing_with_source("failed to decode input image", e)
    })?;

    let resized = limit_long_edge(decoded);
    let normalized = DynamicImage::ImageLuma8(stretch_levels(resized.to_luma8()));
    let enhanced = normalized
        .unsharpen(SHARPEN_SIGMA, SHARPEN_THRESHOLD)
        .brighten(BRIGHTEN_DELTA)
        .adjust_contrast(CONTRAST_BOOST);

    let mut out = Cursor::new(Vec::new());
    enhanced.write_to(&mut out, ImageFormat::Png).map_err(|e| {
        KlartextError::image_processing_with_source("failed to encode prepared image", e)
    })?;
    Ok(out.into_inner())
}

/// Enhancement that never blocks recognition: on any failure the original
/// bytes pass through unchanged and the engines see the raw input.
pub fn prepare_or_passthrough(image_bytes: &[u8]) -> Vec<u8> {
    match prepare(image_bytes) {
        Ok(prepared) => prepared,
        Err(err) => {
            tracing::warn!(error = %err, "image preparation failed, passing raw bytes through");
            image_bytes.to_vec()
        }
    }
}

fn limit_long_edge(img: DynamicImage) -> DynamicImage {
    let long_edge = img.width().max(img.height());
    if long_edge <= MAX_LONG_EDGE_PX {
        return img;
    }
    let scale = MAX_LONG_EDGE_PX as f64 / long_edge as f64;
    let w = ((img.width() as f64 * scale).round() as u32).max(1);
    let h = ((img.height() as f64 * scale).round() as u32).max(1);
    img.resize_exact(w, h, FilterType::Lanczos3)
}

/// Min/max level stretch over the grayscale histogram. A flat image (all
/// pixels equal) is returned untouched.
fn stretch_levels(mut luma: image::GrayImage) -> image::GrayImage {
    let (mut min, mut max) = (u8::MAX, u8::MIN);
    for p in luma.pixels() {
        min = min.min(p.0[0]);
        max = max.max(p.0[0]);
    }
    if max <= min {
        return luma;
    }
    let range = (max - min) as f32;
    for p in luma.pixels_mut() {
        p.0[0] = (((p.0[0] - min) as f32 / range) * 255.0).round() as u8;
    }
    luma
}
