//! Eviction Sweeper
//!
//! Background task that periodically deletes cache entries older than the
//! retention window, judged by file modification time.

use std::sync::Arc;
use std::time::{Duration, SystemTime};

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cache::CacheStore;

/// Counts from one sweep run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Entries examined
    pub scanned: usize,
    /// Entries deleted
    pub removed: usize,
    /// Entries skipped because of an error
    pub failed: usize,
}

// == Eviction Sweeper ==
#[derive(Debug, Clone)]
pub struct EvictionSweeper {
    store: Arc<CacheStore>,
    retention: Duration,
}

impl EvictionSweeper {
    pub fn new(store: Arc<CacheStore>, retention: Duration) -> Self {
        Self { store, retention }
    }

    // == Sweep ==
    /// Runs one pass over the cache root.
    ///
    /// A failing entry is logged and counted, the pass carries on.
    pub async fn sweep_once(&self) -> SweepReport {
        match self.store.list().await {
            Ok(names) => self.sweep_entries(names).await,
            Err(e) => {
                warn!("Cache sweep could not list {}: {}", self.store.root().display(), e);
                SweepReport::default()
            }
        }
    }

    async fn sweep_entries(&self, names: Vec<String>) -> SweepReport {
        let mut report = SweepReport::default();
        let now = SystemTime::now();
        for name in names {
            report.scanned += 1;

            let modified = match self.store.modified(&name).await {
                Ok(Some(modified)) => modified,
                Ok(None) => {
                    debug!("Cache sweep skipped {}: removed since listing", name);
                    continue;
                }
                Err(e) => {
                    warn!("Cache sweep skipped {}: {}", name, e);
                    report.failed += 1;
                    continue;
                }
            };

            // A future mtime counts as age zero
            let age = now.duration_since(modified).unwrap_or_default();
            if age <= self.retention {
                continue;
            }

            match self.store.remove(&name).await {
                Ok(true) => {
                    info!("Deleted old cache file: {}", name);
                    report.removed += 1;
                }
                Ok(false) => {}
                Err(e) => {
                    warn!("Cache sweep failed to delete {}: {}", name, e);
                    report.failed += 1;
                }
            }
        }

        self.store.stats().record_evictions(report.removed as u64);
        report
    }

    // == Spawn ==
    /// Starts sweeping every `interval`, first run one interval from now.
    ///
    /// # Returns
    /// A [`SweeperHandle`] used to stop the task during graceful shutdown.
    ///
    /// # Example
    /// ```ignore
    /// let sweeper = EvictionSweeper::new(store, Duration::from_secs(7 * 86_400));
    /// let handle = sweeper.spawn(Duration::from_secs(86_400));
    /// // Later, during shutdown:
    /// handle.shutdown().await;
    /// ```
    pub fn spawn(self, interval: Duration) -> SweeperHandle {
        // tokio intervals panic on a zero period
        let interval = interval.max(Duration::from_millis(1));
        let (stop_tx, mut stop_rx) = watch::channel(false);

        let task = tokio::spawn(async move {
            info!(
                "Starting cache sweeper with interval of {}s and retention of {}s",
                interval.as_secs(),
                self.retention.as_secs()
            );

            let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + interval, interval);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        info!("Running cache cleanup...");
                        let report = self.sweep_once().await;
                        info!(
                            "Cache cleanup completed: scanned={}, removed={}, failed={}",
                            report.scanned, report.removed, report.failed
                        );
                    }
                    changed = stop_rx.changed() => {
                        if changed.is_err() || *stop_rx.borrow() {
                            debug!("Cache sweeper stopping");
                            break;
                        }
                    }
                }
            }
        });

        SweeperHandle { stop_tx, task }
    }
}

// == Sweeper Handle ==
/// Owns the running sweeper task.
#[derive(Debug)]
pub struct SweeperHandle {
    stop_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SweeperHandle {
    /// Signals the sweeper to stop and waits for it. A sweep in progress
    /// finishes first.
    pub async fn shutdown(self) {
        let _ = self.stop_tx.send(true);
        if let Err(e) = self.task.await {
            warn!("Cache sweeper ended abnormally: {}", e);
        }
    }
}
