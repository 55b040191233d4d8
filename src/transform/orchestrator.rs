//! Transform Orchestrator
//!
//! Connects a staged upload to its cache entry: derive the key, probe the
//! store, and on a miss transform and persist. Concurrent misses for the
//! same key may both transform; the writes carry identical bytes.

use std::sync::Arc;

use tracing::{debug, info};

use crate::cache::{CacheKey, CacheStore};
use crate::error::{CdnError, Result};
use crate::staging::StagedAsset;
use crate::transform::{ImageTransformer, TransformSpec};

// == Rendition ==
/// Outcome of a submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendition {
    pub key: CacheKey,
    /// True when the entry already existed and no transform ran
    pub cached: bool,
}

// == Orchestrator ==
#[derive(Clone)]
pub struct Orchestrator {
    store: Arc<CacheStore>,
    transformer: Arc<dyn ImageTransformer>,
}

impl Orchestrator {
    pub fn new(store: Arc<CacheStore>, transformer: Arc<dyn ImageTransformer>) -> Self {
        Self { store, transformer }
    }

    pub fn store(&self) -> &Arc<CacheStore> {
        &self.store
    }

    // == Process ==
    /// Produces the rendition for `asset` under `spec`.
    ///
    /// The staged asset is consumed and deleted on every exit path; if this
    /// future is dropped mid-way the asset's drop guard deletes it instead.
    pub async fn process(&self, asset: StagedAsset, spec: TransformSpec) -> Result<Rendition> {
        let outcome = self.render(&asset, spec).await;
        asset.discard().await;
        outcome
    }

    async fn render(&self, asset: &StagedAsset, spec: TransformSpec) -> Result<Rendition> {
        let key = CacheKey::derive(asset.identity(), &spec);

        if self.store.exists(key.as_str()).await? {
            self.store.stats().record_hit();
            info!("Serving from cache: {}", key);
            return Ok(Rendition { key, cached: true });
        }

        self.store.stats().record_miss();
        debug!(
            "Cache miss for {} ({} bytes, {}), transforming",
            key,
            asset.size(),
            asset.content_type()
        );

        let source = asset.read().await?;
        let transformer = Arc::clone(&self.transformer);
        let bytes = tokio::task::spawn_blocking(move || transformer.transform(&source, &spec))
            .await
            .map_err(|e| CdnError::Processing(format!("Transform task failed: {}", e)))??;
        self.store.stats().record_transform();

        self.store.write(key.as_str(), &bytes).await?;
        info!("Cached new rendition {} ({} bytes)", key, bytes.len());

        Ok(Rendition { key, cached: false })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::staging::StagingArea;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Returns the source bytes with the quality appended, counting calls.
    #[derive(Default)]
    struct CountingTransformer {
        calls: AtomicUsize,
    }

    impl ImageTransformer for CountingTransformer {
        fn transform(&self, source: &[u8], spec: &TransformSpec) -> Result<Vec<u8>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut out = source.to_vec();
            out.push(spec.quality);
            Ok(out)
        }
    }

    struct FailingTransformer;

    impl ImageTransformer for FailingTransformer {
        fn transform(&self, _source: &[u8], _spec: &TransformSpec) -> Result<Vec<u8>> {
            Err(CdnError::Processing("corrupt".to_string()))
        }
    }

    struct Fixture {
        _dirs: (tempfile::TempDir, tempfile::TempDir),
        staging: StagingArea,
        store: Arc<CacheStore>,
    }

    impl Fixture {
        async fn new() -> Self {
            let staging_dir = tempfile::tempdir().unwrap();
            let cache_dir = tempfile::tempdir().unwrap();
            let staging = StagingArea::open(staging_dir.path(), 1024).await.unwrap();
            let store = Arc::new(CacheStore::open(cache_dir.path()).await.unwrap());
            Self {
                _dirs: (staging_dir, cache_dir),
                staging,
                store,
            }
        }

        async fn stage(&self, bytes: &[u8]) -> StagedAsset {
            self.staging.stage("image/png", bytes).await.unwrap()
        }

        fn staged_count(&self) -> usize {
            std::fs::read_dir(self.staging.dir()).unwrap().count()
        }
    }

    #[tokio::test]
    async fn test_miss_then_hit() {
        let fx = Fixture::new().await;
        let counter = Arc::new(CountingTransformer::default());
        let orchestrator = Orchestrator::new(fx.store.clone(), counter.clone());
        let spec = TransformSpec::default();

        let first = orchestrator.process(fx.stage(b"src").await, spec).await.unwrap();
        assert!(!first.cached);
        assert_eq!(counter.calls.load(Ordering::SeqCst), 1);

        let second = orchestrator.process(fx.stage(b"src").await, spec).await.unwrap();
        assert!(second.cached);
        assert_eq!(second.key, first.key);
        assert_eq!(counter.calls.load(Ordering::SeqCst), 1);

        let stats = fx.store.stats().snapshot();
        assert_eq!((stats.hits, stats.misses, stats.transforms), (1, 1, 1));
    }

    #[tokio::test]
    async fn test_written_bytes_readable() {
        let fx = Fixture::new().await;
        let orchestrator =
            Orchestrator::new(fx.store.clone(), Arc::new(CountingTransformer::default()));

        let spec = TransformSpec {
            quality: 42,
            ..TransformSpec::default()
        };
        let rendition = orchestrator.process(fx.stage(b"abc").await, spec).await.unwrap();

        let stored = fx.store.read(rendition.key.as_str()).await.unwrap().unwrap();
        assert_eq!(stored, b"abc*");
    }

    #[tokio::test]
    async fn test_different_spec_transforms_again() {
        let fx = Fixture::new().await;
        let counter = Arc::new(CountingTransformer::default());
        let orchestrator = Orchestrator::new(fx.store.clone(), counter.clone());

        let a = orchestrator
            .process(fx.stage(b"src").await, TransformSpec::default())
            .await
            .unwrap();
        let b = orchestrator
            .process(
                fx.stage(b"src").await,
                TransformSpec {
                    width: Some(10),
                    ..TransformSpec::default()
                },
            )
            .await
            .unwrap();

        assert_ne!(a.key, b.key);
        assert_eq!(counter.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_staged_asset_removed_on_success() {
        let fx = Fixture::new().await;
        let orchestrator =
            Orchestrator::new(fx.store.clone(), Arc::new(CountingTransformer::default()));

        orchestrator
            .process(fx.stage(b"src").await, TransformSpec::default())
            .await
            .unwrap();

        assert_eq!(fx.staged_count(), 0);
    }

    #[tokio::test]
    async fn test_processing_failure_propagates_and_cleans_up() {
        let fx = Fixture::new().await;
        let orchestrator = Orchestrator::new(fx.store.clone(), Arc::new(FailingTransformer));

        let result = orchestrator
            .process(fx.stage(b"src").await, TransformSpec::default())
            .await;

        assert!(matches!(result, Err(CdnError::Processing(_))));
        assert_eq!(fx.staged_count(), 0);
        assert!(fx.store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_misses_converge_on_one_entry() {
        let fx = Fixture::new().await;
        let orchestrator =
            Orchestrator::new(fx.store.clone(), Arc::new(CountingTransformer::default()));

        let a = fx.stage(b"same").await;
        let b = fx.stage(b"same").await;
        let spec = TransformSpec::default();
        let (ra, rb) = tokio::join!(orchestrator.process(a, spec), orchestrator.process(b, spec));

        assert_eq!(ra.unwrap().key, rb.unwrap().key);
        assert_eq!(fx.store.list().await.unwrap().len(), 1);
        assert_eq!(fx.staged_count(), 0);
    }
}
