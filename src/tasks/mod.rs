//! Background Tasks Module
//!
//! Contains background tasks that run periodically during server operation.
//!
//! # Tasks
//! - Eviction Sweep: Deletes cache entries past the retention window

mod eviction;

pub use eviction::{EvictionSweeper, SweepReport, SweeperHandle};
