//! JPEG Transform Capability
//!
//! Decodes a source image, optionally resizes it and re-encodes it as JPEG.

use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{ColorType, DynamicImage, GenericImageView};

use crate::config::MAX_DIMENSION;
use crate::error::{CdnError, Result};
use crate::transform::TransformSpec;

/// Turns source bytes into rendition bytes.
///
/// Implementations are CPU-bound and are called from a blocking thread.
pub trait ImageTransformer: Send + Sync + 'static {
    fn transform(&self, source: &[u8], spec: &TransformSpec) -> Result<Vec<u8>>;
}

// == JPEG Transformer ==
/// Production transformer backed by the `image` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct JpegTransformer;

impl ImageTransformer for JpegTransformer {
    fn transform(&self, source: &[u8], spec: &TransformSpec) -> Result<Vec<u8>> {
        let img = image::load_from_memory(source)
            .map_err(|e| CdnError::Processing(format!("Failed to load image: {}", e)))?;

        let img = match plan(img.dimensions(), spec)? {
            Plan::Keep => img,
            Plan::Scale { width, height } => img.resize_exact(width, height, FilterType::Lanczos3),
            Plan::Fill { x, y, crop_width, crop_height, width, height } => img
                .crop_imm(x, y, crop_width, crop_height)
                .resize_exact(width, height, FilterType::Lanczos3),
        };
        encode_jpeg(&img, spec.quality)
    }
}

/// Output geometry for one source and spec.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Plan {
    Keep,
    Scale {
        width: u32,
        height: u32,
    },
    /// Crop the centred region matching the box aspect, then scale it
    Fill {
        x: u32,
        y: u32,
        crop_width: u32,
        crop_height: u32,
        width: u32,
        height: u32,
    },
}

/// Applies the resize policy:
/// - one dimension: the other follows the source aspect ratio
/// - both: fill the box, cropping the overflow around the centre
/// - neither: unchanged
///
/// No output side may exceed [`MAX_DIMENSION`]. An aspect-derived side
/// past the limit fails instead of allocating.
fn plan((src_w, src_h): (u32, u32), spec: &TransformSpec) -> Result<Plan> {
    match (spec.width, spec.height) {
        (Some(width), Some(height)) => {
            let (crop_width, crop_height) =
                if src_w as u64 * height as u64 > src_h as u64 * width as u64 {
                    (scale_dimension(src_h, width, height).min(src_w as u64) as u32, src_h)
                } else {
                    (src_w, scale_dimension(src_w, height, width).min(src_h as u64) as u32)
                };
            Ok(Plan::Fill {
                x: (src_w - crop_width) / 2,
                y: (src_h - crop_height) / 2,
                crop_width,
                crop_height,
                width,
                height,
            })
        }
        (Some(width), None) => {
            let height = bounded(scale_dimension(src_h, width, src_w), "height")?;
            Ok(Plan::Scale { width, height })
        }
        (None, Some(height)) => {
            let width = bounded(scale_dimension(src_w, height, src_h), "width")?;
            Ok(Plan::Scale { width, height })
        }
        (None, None) => Ok(Plan::Keep),
    }
}

/// Returns `other * target / basis`, rounded and at least 1.
fn scale_dimension(other: u32, target: u32, basis: u32) -> u64 {
    if basis == 0 {
        return 1;
    }
    let scaled = (other as f64 * target as f64 / basis as f64).round();
    (scaled as u64).max(1)
}

fn bounded(derived: u64, side: &str) -> Result<u32> {
    if derived > MAX_DIMENSION as u64 {
        return Err(CdnError::Processing(format!(
            "Derived {} of {}px exceeds the {}px limit",
            side, derived, MAX_DIMENSION
        )));
    }
    Ok(derived as u32)
}

fn encode_jpeg(img: &DynamicImage, quality: u8) -> Result<Vec<u8>> {
    // JPEG has no alpha channel
    let rgb = img.to_rgb8();
    let mut out = Cursor::new(Vec::new());

    JpegEncoder::new_with_quality(&mut out, quality)
        .encode(rgb.as_raw(), rgb.width(), rgb.height(), ColorType::Rgb8)
        .map_err(|e| CdnError::Processing(format!("Failed to encode JPEG: {}", e)))?;

    Ok(out.into_inner())
}
