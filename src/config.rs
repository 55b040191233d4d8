//! Configuration Module
//!
//! Handles loading and managing server configuration from environment variables.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

// == Fixed Limits ==
/// Source extensions accepted at intake (lowercased, with the leading dot)
pub const ALLOWED_EXTENSIONS: [&str; 3] = [".jpg", ".jpeg", ".png"];

/// Upper bound for a requested width or height
pub const MAX_DIMENSION: u32 = 5000;

/// Inclusive bounds for the encoder quality
pub const MIN_QUALITY: u8 = 1;
pub const MAX_QUALITY: u8 = 100;

/// Quality used when the request gives none or an invalid one
pub const DEFAULT_QUALITY: u8 = 80;

/// Server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port
    pub server_port: u16,
    /// Directory holding uploads while a request is processed
    pub upload_dir: PathBuf,
    /// Directory holding transformed renditions
    pub cache_dir: PathBuf,
    /// Maximum age of a cache entry before the sweeper deletes it
    pub retention: Duration,
    /// Time between eviction sweeps
    pub sweep_interval: Duration,
    /// Largest accepted upload in bytes
    pub max_upload_bytes: usize,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// A `.env` file in the working directory is read first if present.
    ///
    /// # Environment Variables
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `UPLOAD_DIR` - Staging directory (default: uploads)
    /// - `CACHE_DIR` - Cache directory (default: cache)
    /// - `CACHE_RETENTION_SECS` - Entry retention in seconds (default: 7 days)
    /// - `SWEEP_INTERVAL_SECS` - Sweep frequency in seconds (default: 24 hours)
    /// - `MAX_UPLOAD_BYTES` - Upload size limit (default: 5 MB)
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();
        let defaults = Self::default();

        Self {
            server_port: parse_var("SERVER_PORT").unwrap_or(defaults.server_port),
            upload_dir: env::var("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.upload_dir),
            cache_dir: env::var("CACHE_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.cache_dir),
            retention: parse_var("CACHE_RETENTION_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.retention),
            sweep_interval: parse_var("SWEEP_INTERVAL_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.sweep_interval),
            max_upload_bytes: parse_var("MAX_UPLOAD_BYTES").unwrap_or(defaults.max_upload_bytes),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_port: 3000,
            upload_dir: PathBuf::from("uploads"),
            cache_dir: PathBuf::from("cache"),
            retention: Duration::from_secs(7 * 24 * 60 * 60),
            sweep_interval: Duration::from_secs(24 * 60 * 60),
            max_upload_bytes: 5 * 1024 * 1024,
        }
    }
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.server_port, 3000);
        assert_eq!(config.upload_dir, PathBuf::from("uploads"));
        assert_eq!(config.cache_dir, PathBuf::from("cache"));
        assert_eq!(config.retention, Duration::from_secs(604_800));
        assert_eq!(config.sweep_interval, Duration::from_secs(86_400));
        assert_eq!(config.max_upload_bytes, 5_242_880);
    }

    #[test]
    fn test_config_from_env_overrides() {
        env::set_var("CACHE_RETENTION_SECS", "60");
        env::set_var("MAX_UPLOAD_BYTES", "not-a-number");

        let config = Config::from_env();
        assert_eq!(config.retention, Duration::from_secs(60));
        assert_eq!(config.max_upload_bytes, 5_242_880);

        env::remove_var("CACHE_RETENTION_SECS");
        env::remove_var("MAX_UPLOAD_BYTES");
    }
}
