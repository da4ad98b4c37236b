//! Public entry point for rendering code.
//!
//! Callers ask for an image by locator and get back either a decoded bitmap
//! or nothing. Failures are logged here and never surfaced, so a failed image
//! renders as a placeholder. Use [`ImageService::load`] when the typed error
//! matters.

use std::sync::Arc;
use std::time::Duration;

use color_eyre::eyre::{Result, WrapErr};
use tracing::{debug, info, warn};
use url::Url;

use crate::domain::entities::{CacheKey, LoadedImage};
use crate::domain::errors::{FetchError, FetchResult};
use crate::infrastructure::config::AppConfig;
use crate::infrastructure::image::{
    CacheStats, DEFAULT_RETENTION, DiskImageCache, FetchPipeline, HttpTransport,
    MemoryImageCache, TokioDelay,
};

/// Tuning for the facade's maintenance operations.
#[derive(Debug, Clone)]
pub struct ImageServiceOptions {
    /// Prefix for locators that are not absolute http(s) URLs.
    pub base_url: Option<Url>,
    /// Memory count limit above which `cleanup_if_needed` shrinks the tier.
    pub memory_count_ceiling: usize,
    /// Disk records older than this are pruned.
    pub retention: Duration,
}

impl Default for ImageServiceOptions {
    fn default() -> Self {
        Self {
            base_url: None,
            memory_count_ceiling: crate::infrastructure::image::memory_cache::DEFAULT_COUNT_LIMIT,
            retention: DEFAULT_RETENTION,
        }
    }
}

/// Resolves images for rendering and manages both cache tiers.
#[derive(Debug)]
pub struct ImageService {
    pipeline: Arc<FetchPipeline>,
    options: ImageServiceOptions,
}

impl ImageService {
    /// Creates a service over an existing pipeline.
    #[must_use]
    pub fn new(pipeline: Arc<FetchPipeline>, options: ImageServiceOptions) -> Self {
        Self { pipeline, options }
    }

    /// Builds the stores, transport, and pipeline described by the config.
    /// Stale disk records are pruned before the service is returned.
    ///
    /// # Errors
    /// Returns an error if the cache directory or HTTP client cannot be created.
    pub async fn from_config(config: &AppConfig) -> Result<Self> {
        let cache_dir = config.effective_cache_dir();
        let disk = DiskImageCache::new(cache_dir.clone())
            .await
            .wrap_err_with(|| format!("Failed to open image cache at {}", cache_dir.display()))?;
        let removed = disk.prune_older_than(config.cache.retention()).await;
        if removed > 0 {
            info!(removed, "Pruned stale disk cache records at startup");
        }
        let memory = MemoryImageCache::new(config.cache.memory_limits());
        let transport = HttpTransport::new(config.cache.request_timeout())
            .wrap_err("Failed to create HTTP transport")?;

        let pipeline = FetchPipeline::new(
            Arc::new(memory),
            Arc::new(disk),
            Arc::new(transport),
            Arc::new(TokioDelay),
            config.cache.retry_policy(),
        );

        let options = ImageServiceOptions {
            base_url: config.base_url.clone(),
            memory_count_ceiling: config.cache.memory_count_ceiling,
            retention: config.cache.retention(),
        };

        info!(path = %cache_dir.display(), "Image service initialized");
        Ok(Self::new(Arc::new(pipeline), options))
    }

    /// Returns the underlying pipeline.
    #[must_use]
    pub fn pipeline(&self) -> &Arc<FetchPipeline> {
        &self.pipeline
    }

    /// Returns the memory tier.
    #[must_use]
    pub fn memory(&self) -> &Arc<MemoryImageCache> {
        self.pipeline.memory()
    }

    /// Returns the disk tier.
    #[must_use]
    pub fn disk(&self) -> &Arc<DiskImageCache> {
        self.pipeline.disk()
    }

    /// Turns a raw locator into a cache key, applying the base URL to
    /// relative paths.
    ///
    /// # Errors
    /// Returns `InvalidLocator` when a base URL is configured and the locator
    /// is neither an http(s) URL nor a plain path.
    pub fn key_for(&self, locator: &str) -> FetchResult<CacheKey> {
        let locator = locator.trim();
        let is_absolute = locator.starts_with("http://") || locator.starts_with("https://");

        let Some(base) = self.options.base_url.as_ref().filter(|_| !is_absolute) else {
            return Ok(CacheKey::new(locator));
        };

        if locator.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(FetchError::invalid_locator(locator, "not a path"));
        }
        if Url::parse(locator).is_ok() {
            return Err(FetchError::invalid_locator(locator, "unsupported scheme"));
        }

        let base = base.as_str().trim_end_matches('/');
        let joined = if locator.starts_with('/') {
            format!("{base}{locator}")
        } else {
            format!("{base}/{locator}")
        };
        Ok(CacheKey::new(joined))
    }

    /// Returns the image for a locator, or `None` if it is missing, empty,
    /// or cannot be resolved.
    pub async fn image_for(&self, locator: Option<&str>) -> Option<Arc<image::DynamicImage>> {
        let locator = locator.map(str::trim).filter(|l| !l.is_empty())?;

        match self.load(locator).await {
            Ok(loaded) => Some(loaded.image),
            Err(e) => {
                warn!(locator = %locator, error = %e, "Image unavailable");
                None
            }
        }
    }

    /// Resolves a locator, keeping the typed error.
    ///
    /// # Errors
    /// Propagates the pipeline's `FetchError`.
    pub async fn load(&self, locator: &str) -> FetchResult<LoadedImage> {
        let key = self.key_for(locator)?;
        let loaded = self.pipeline.resolve(&key).await?;
        debug!(key = %key, source = %loaded.source, "Image resolved");
        Ok(loaded)
    }

    /// Clears both tiers.
    pub async fn clear(&self) {
        self.memory().remove_all();
        self.disk().remove_all().await;
        info!("Cleared all image caches");
    }

    /// Shrinks the memory tier if its count limit exceeds the ceiling, then
    /// prunes stale disk records.
    pub async fn cleanup_if_needed(&self) {
        let limits = self.memory().limits();
        if limits.max_count > self.options.memory_count_ceiling {
            self.memory().shrink(2);
            info!(
                previous_count_limit = limits.max_count,
                ceiling = self.options.memory_count_ceiling,
                "Memory cache over ceiling, shrunk"
            );
        }

        let removed = self.disk().prune_older_than(self.options.retention).await;
        if removed > 0 {
            info!(removed, "Pruned stale disk cache records");
        }
    }

    /// Returns memory tier statistics.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        self.memory().stats()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::ImageSource;
    use crate::domain::ports::ImageCachePort;
    use crate::domain::ports::mocks::{RecordingDelay, ScriptedTransport, jpeg_bytes, ok_jpeg, status};
    use crate::infrastructure::image::{MemoryLimits, RetryPolicy};
    use tempfile::TempDir;

    const URL: &str = "https://cdn.example/img1.jpg";

    struct Harness {
        service: ImageService,
        transport: Arc<ScriptedTransport>,
        _temp: TempDir,
    }

    async fn harness_with(
        transport: ScriptedTransport,
        limits: MemoryLimits,
        options: ImageServiceOptions,
    ) -> Harness {
        let temp = TempDir::new().unwrap();
        let disk = DiskImageCache::new(temp.path().join("images")).await.unwrap();
        let transport = Arc::new(transport);
        let pipeline = FetchPipeline::new(
            Arc::new(MemoryImageCache::new(limits)),
            Arc::new(disk),
            transport.clone(),
            Arc::new(RecordingDelay::new()),
            RetryPolicy::default(),
        );
        Harness {
            service: ImageService::new(Arc::new(pipeline), options),
            transport,
            _temp: temp,
        }
    }

    async fn harness(transport: ScriptedTransport) -> Harness {
        harness_with(transport, MemoryLimits::default(), ImageServiceOptions::default()).await
    }

    #[tokio::test]
    async fn test_second_request_is_served_from_memory() {
        let h = harness(ScriptedTransport::with_script([ok_jpeg(8, 8)])).await;

        let first = h.service.image_for(Some(URL)).await.unwrap();
        let second = h.service.image_for(Some(URL)).await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(h.transport.calls(), 1);
    }

    #[tokio::test]
    async fn test_disk_record_served_without_network() {
        let h = harness(ScriptedTransport::new()).await;
        h.service
            .disk()
            .write(&CacheKey::new(URL), &jpeg_bytes(12, 7))
            .await;

        let image = h.service.image_for(Some(URL)).await.unwrap();

        assert_eq!((image.width(), image.height()), (12, 7));
        assert_eq!(h.transport.calls(), 0);
    }

    #[tokio::test]
    async fn test_missing_or_empty_locator_short_circuits() {
        let h = harness(ScriptedTransport::new()).await;

        assert!(h.service.image_for(None).await.is_none());
        assert!(h.service.image_for(Some("")).await.is_none());
        assert!(h.service.image_for(Some("   ")).await.is_none());
        assert_eq!(h.transport.calls(), 0);
    }

    #[tokio::test]
    async fn test_malformed_locator_returns_none_without_network() {
        let h = harness(ScriptedTransport::new()).await;

        assert!(h.service.image_for(Some("not a uri")).await.is_none());
        assert_eq!(h.transport.calls(), 0);

        let err = h.service.load("not a uri").await.unwrap_err();
        assert!(matches!(err, FetchError::InvalidLocator { .. }));
    }

    #[tokio::test]
    async fn test_flaky_origin_recovers_on_third_attempt() {
        let h = harness(ScriptedTransport::with_script([
            status(500),
            status(500),
            ok_jpeg(20, 10),
        ]))
        .await;
        let key = CacheKey::new(URL);

        let image = h.service.image_for(Some(URL)).await;

        assert!(image.is_some());
        assert_eq!(h.transport.calls(), 3);
        assert_eq!(h.service.disk().len().await, 1);
        assert!(h.service.disk().contains(&key).await);
        assert_eq!(h.service.memory().len(), 1);
        assert!(h.service.memory().get(&key).unwrap().cost > 0);
    }

    #[tokio::test]
    async fn test_exhausted_retries_collapse_to_none() {
        let h = harness(ScriptedTransport::with_script([status(500), status(502), status(503)])).await;

        assert!(h.service.image_for(Some(URL)).await.is_none());
        assert_eq!(h.transport.calls(), 3);
    }

    #[tokio::test]
    async fn test_relative_locator_uses_base_url() {
        let options = ImageServiceOptions {
            base_url: Some(Url::parse("https://foursoftware.com.tr/fourkampus").unwrap()),
            ..ImageServiceOptions::default()
        };
        let h = harness_with(
            ScriptedTransport::with_script([ok_jpeg(2, 2), ok_jpeg(2, 2)]),
            MemoryLimits::default(),
            options,
        )
        .await;

        assert_eq!(
            h.service.key_for("/uploads/a.png").unwrap().as_str(),
            "https://foursoftware.com.tr/fourkampus/uploads/a.png"
        );
        assert_eq!(
            h.service.key_for("uploads/b.png").unwrap().as_str(),
            "https://foursoftware.com.tr/fourkampus/uploads/b.png"
        );
        assert_eq!(h.service.key_for(URL).unwrap().as_str(), URL);

        let loaded = h.service.load("/uploads/a.png").await.unwrap();
        assert_eq!(loaded.source, ImageSource::Network);
        assert_eq!(
            h.transport.requested()[0].as_str(),
            "https://foursoftware.com.tr/fourkampus/uploads/a.png"
        );
    }

    #[tokio::test]
    async fn test_malformed_locator_with_base_url_never_reaches_network() {
        let options = ImageServiceOptions {
            base_url: Some(Url::parse("https://foursoftware.com.tr/fourkampus").unwrap()),
            ..ImageServiceOptions::default()
        };
        let h = harness_with(ScriptedTransport::new(), MemoryLimits::default(), options).await;

        assert!(h.service.image_for(Some("not a uri")).await.is_none());
        assert!(h.service.image_for(Some("ftp://cdn.example/a.png")).await.is_none());
        assert!(h.service.image_for(Some("uploads/a\tb.png")).await.is_none());
        assert_eq!(h.transport.calls(), 0);

        let err = h.service.load("not a uri").await.unwrap_err();
        assert!(matches!(err, FetchError::InvalidLocator { .. }));
    }

    #[tokio::test]
    async fn test_from_config_prunes_stale_records_at_startup() {
        let temp = TempDir::new().unwrap();
        let cache_dir = temp.path().join("images");
        std::fs::create_dir_all(&cache_dir).unwrap();
        let stale = CacheKey::new("https://cdn.example/old.jpg");
        let fresh = CacheKey::new("https://cdn.example/new.jpg");
        let stale_path = cache_dir.join(stale.disk_filename());
        std::fs::write(&stale_path, b"old").unwrap();
        std::fs::write(cache_dir.join(fresh.disk_filename()), b"new").unwrap();
        let old = std::time::SystemTime::now() - Duration::from_secs(31 * 24 * 60 * 60);
        std::fs::File::options()
            .write(true)
            .open(&stale_path)
            .unwrap()
            .set_modified(old)
            .unwrap();
        let config = AppConfig {
            cache_dir: Some(cache_dir),
            ..AppConfig::default()
        };

        let service = ImageService::from_config(&config).await.unwrap();

        assert!(!service.disk().contains(&stale).await);
        assert!(service.disk().contains(&fresh).await);
    }

    #[tokio::test]
    async fn test_clear_empties_both_tiers() {
        let h = harness(ScriptedTransport::with_script([ok_jpeg(4, 4), ok_jpeg(4, 4)])).await;
        h.service.image_for(Some(URL)).await.unwrap();

        h.service.clear().await;

        assert!(h.service.memory().is_empty());
        assert!(h.service.disk().is_empty().await);

        h.service.image_for(Some(URL)).await.unwrap();
        assert_eq!(h.transport.calls(), 2);
    }

    #[tokio::test]
    async fn test_cleanup_shrinks_only_above_ceiling() {
        let options = ImageServiceOptions {
            memory_count_ceiling: 150,
            ..ImageServiceOptions::default()
        };
        let h = harness_with(
            ScriptedTransport::new(),
            MemoryLimits::new(300, 200 * 1024 * 1024),
            options,
        )
        .await;

        h.service.cleanup_if_needed().await;
        assert_eq!(h.service.memory().limits(), MemoryLimits::new(150, 100 * 1024 * 1024));

        h.service.cleanup_if_needed().await;
        assert_eq!(h.service.memory().limits(), MemoryLimits::new(150, 100 * 1024 * 1024));
    }

    #[tokio::test]
    async fn test_cleanup_prunes_stale_disk_records() {
        let h = harness(ScriptedTransport::new()).await;
        let stale = CacheKey::new("https://cdn.example/old.jpg");
        let fresh = CacheKey::new("https://cdn.example/new.jpg");
        h.service.disk().write(&stale, b"old").await;
        h.service.disk().write(&fresh, b"new").await;
        let old = std::time::SystemTime::now() - Duration::from_secs(31 * 24 * 60 * 60);
        std::fs::File::options()
            .write(true)
            .open(h.service.disk().path_for(&stale))
            .unwrap()
            .set_modified(old)
            .unwrap();

        h.service.cleanup_if_needed().await;

        assert!(!h.service.disk().contains(&stale).await);
        assert!(h.service.disk().contains(&fresh).await);
    }

    #[tokio::test]
    async fn test_concurrent_requests_for_same_locator() {
        let h = harness(ScriptedTransport::with_script([ok_jpeg(4, 4), ok_jpeg(4, 4)])).await;
        let service = Arc::new(h.service);

        let (a, b) = tokio::join!(
            service.image_for(Some(URL)),
            service.image_for(Some(URL))
        );

        assert!(a.is_some());
        assert!(b.is_some());
        assert!((1..=2).contains(&h.transport.calls()));
        assert_eq!(service.memory().len(), 1);
        assert_eq!(service.disk().len().await, 1);
    }
}
