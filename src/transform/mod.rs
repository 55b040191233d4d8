//! Transform Module
//!
//! Parameter normalization, the image transform capability, and the
//! orchestration between a cache miss and a cache entry.

mod jpeg;
mod orchestrator;
mod spec;

pub use jpeg::{ImageTransformer, JpegTransformer};
pub use orchestrator::{Orchestrator, Rendition};
pub use spec::TransformSpec;
