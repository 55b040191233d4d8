//! Cache Key Derivation
//!
//! Maps a source identity and a [`TransformSpec`] to a stable entry filename.

use std::fmt;

use sha2::{Digest, Sha256};

use crate::cache::OUTPUT_EXTENSION;
use crate::transform::TransformSpec;

// == Cache Key ==
/// Filename of a cached rendition: `<sha256 hex>.<ext>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    // == Derive ==
    /// Derives the key for `identity` transformed by `spec`.
    ///
    /// The canonical input is `{identity}_{w}x{h}_q{quality}` with `auto`
    /// standing in for an absent dimension.
    pub fn derive(identity: &str, spec: &TransformSpec) -> Self {
        let canonical = format!(
            "{}_{}x{}_q{}",
            identity,
            dimension_marker(spec.width),
            dimension_marker(spec.height),
            spec.quality
        );

        let digest = Sha256::digest(canonical.as_bytes());
        Self(format!("{}.{}", hex::encode(digest), OUTPUT_EXTENSION))
    }

    /// Returns the key as the entry's filename.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the public URL path serving this entry.
    pub fn url(&self) -> String {
        format!("/cdn/{}", self.0)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

fn dimension_marker(value: Option<u32>) -> String {
    value.map_or_else(|| "auto".to_string(), |v| v.to_string())
}
