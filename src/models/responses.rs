//! Response DTOs for the image CDN API
//!
//! Defines the structure of outgoing HTTP response bodies.

use serde::Serialize;

use crate::cache::StatsSnapshot;
use crate::transform::Rendition;

/// Response body for the upload operation (POST /upload)
#[derive(Debug, Clone, Serialize)]
pub struct UploadResponse {
    pub success: bool,
    /// Path the rendition is served under
    pub url: String,
    /// Cache entry filename
    pub key: String,
    /// True when the rendition was already cached
    pub cached: bool,
}

impl From<Rendition> for UploadResponse {
    fn from(rendition: Rendition) -> Self {
        Self {
            success: true,
            url: rendition.key.url(),
            key: rendition.key.to_string(),
            cached: rendition.cached,
        }
    }
}

/// Response body for the stats endpoint (GET /stats)
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    /// Number of cache hits
    pub hits: u64,
    /// Number of cache misses
    pub misses: u64,
    /// Number of transforms performed
    pub transforms: u64,
    /// Number of entries evicted by the sweeper
    pub evictions: u64,
    /// Hit rate (hits / (hits + misses))
    pub hit_rate: f64,
}

impl From<StatsSnapshot> for StatsResponse {
    fn from(stats: StatsSnapshot) -> Self {
        Self {
            hits: stats.hits,
            misses: stats.misses,
            transforms: stats.transforms,
            evictions: stats.evictions,
            hit_rate: stats.hit_rate(),
        }
    }
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}
