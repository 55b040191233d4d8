//! Image CDN - An HTTP image transformation cache
//!
//! Transforms uploaded images on first request, serves repeats from a
//! disk cache keyed by a deterministic fingerprint, and evicts stale entries.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod staging;
pub mod tasks;
pub mod transform;

pub use api::AppState;
pub use config::Config;
pub use tasks::EvictionSweeper;
