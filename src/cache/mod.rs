//! Cache Module
//!
//! Disk-backed rendition cache: key derivation, path confinement, storage
//! and counters.

mod guard;
mod key;
mod stats;
mod store;


// Re-export public types
pub use guard::PathGuard;
pub use key::CacheKey;
pub use stats::{CacheStats, StatsSnapshot};
pub use store::CacheStore;

// == Public Constants ==
/// Extension of every cached rendition
pub const OUTPUT_EXTENSION: &str = "jpg";

/// Content type served for cached renditions
pub const OUTPUT_CONTENT_TYPE: &str = "image/jpeg";
