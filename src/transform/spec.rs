//! Transform Parameters
//!
//! Normalizes raw request parameters into a [`TransformSpec`]. Bad input is
//! never rejected, it falls back to "absent" or the default quality.

use serde::Serialize;

use crate::config::{DEFAULT_QUALITY, MAX_DIMENSION, MAX_QUALITY, MIN_QUALITY};

// == Transform Spec ==
/// Normalized resize and re-encode parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct TransformSpec {
    /// Target width in pixels, `None` keeps the aspect-derived width
    pub width: Option<u32>,
    /// Target height in pixels, `None` keeps the aspect-derived height
    pub height: Option<u32>,
    /// JPEG quality in `[1, 100]`
    pub quality: u8,
}

impl TransformSpec {
    // == Constructor ==
    /// Builds a spec from raw query values, normalizing each field.
    pub fn normalize(width: Option<&str>, height: Option<&str>, quality: Option<&str>) -> Self {
        Self {
            width: width.and_then(parse_dimension),
            height: height.and_then(parse_dimension),
            quality: quality.and_then(parse_quality).unwrap_or(DEFAULT_QUALITY),
        }
    }
}

impl Default for TransformSpec {
    fn default() -> Self {
        Self {
            width: None,
            height: None,
            quality: DEFAULT_QUALITY,
        }
    }
}

/// Parses a finite number, range-checks it as given, then truncates any
/// fractional part. `"12.7"` is 12, `"5000.5"` is out of range.
fn parse_bounded(raw: &str, min: f64, max: f64) -> Option<u64> {
    let value: f64 = raw.trim().parse().ok()?;
    if !value.is_finite() || value < min || value > max {
        return None;
    }
    Some(value.trunc() as u64)
}

fn parse_dimension(raw: &str) -> Option<u32> {
    // (0, MAX_DIMENSION]; anything that truncates to zero is absent
    parse_bounded(raw, 0.0, MAX_DIMENSION as f64)
        .filter(|v| *v >= 1)
        .map(|v| v as u32)
}

fn parse_quality(raw: &str) -> Option<u8> {
    parse_bounded(raw, MIN_QUALITY as f64, MAX_QUALITY as f64).map(|v| v as u8)
}
