//! Image resolution pipeline.
//!
//! Resolves a key through three tiers: Memory -> Disk -> Network. Network
//! fetches are retried with exponential backoff and populate both stores.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tracing::{debug, error, warn};
use url::Url;

use crate::domain::entities::{CacheKey, ImageSource, LoadedImage};
use crate::domain::errors::{FetchError, FetchResult};
use crate::domain::ports::{DelayPort, ImageCachePort, ImageTransport};

use super::disk_cache::DiskImageCache;
use super::memory_cache::MemoryImageCache;

/// Bounded retry schedule for network fetches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Delay after the first failed attempt; doubles after each further one.
    pub base_delay: Duration,
}

impl RetryPolicy {
    /// Creates a policy.
    #[must_use]
    pub const fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
        }
    }

    /// Delay to wait after the given 1-indexed attempt fails.
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_delay.saturating_mul(factor)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(1))
    }
}

/// Resolves keys to decoded images, populating both cache tiers.
///
/// No lock is held across network I/O or backoff; only the store calls
/// themselves synchronize. Dropping the returned future cancels the fetch,
/// and the stores are only written once a complete payload has decoded.
pub struct FetchPipeline {
    memory: Arc<MemoryImageCache>,
    disk: Arc<DiskImageCache>,
    transport: Arc<dyn ImageTransport>,
    delay: Arc<dyn DelayPort>,
    policy: RetryPolicy,
}

impl std::fmt::Debug for FetchPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchPipeline")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl FetchPipeline {
    /// Creates a pipeline over the given stores and collaborators.
    #[must_use]
    pub fn new(
        memory: Arc<MemoryImageCache>,
        disk: Arc<DiskImageCache>,
        transport: Arc<dyn ImageTransport>,
        delay: Arc<dyn DelayPort>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            memory,
            disk,
            transport,
            delay,
            policy,
        }
    }

    /// Returns the memory tier.
    #[must_use]
    pub fn memory(&self) -> &Arc<MemoryImageCache> {
        &self.memory
    }

    /// Returns the disk tier.
    #[must_use]
    pub fn disk(&self) -> &Arc<DiskImageCache> {
        &self.disk
    }

    /// Returns the transport.
    #[must_use]
    pub fn transport(&self) -> &Arc<dyn ImageTransport> {
        &self.transport
    }

    /// Returns the retry policy.
    #[must_use]
    pub const fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Resolves an image for the key.
    ///
    /// # Errors
    /// Returns `InvalidLocator` for keys that are not fetchable http(s) URLs,
    /// or `ExhaustedRetries` wrapping the last failure once every attempt has
    /// failed.
    pub async fn resolve(&self, key: &CacheKey) -> FetchResult<LoadedImage> {
        if let Some(hit) = self.memory.get(key) {
            return Ok(hit);
        }

        if let Some(loaded) = self.load_from_disk(key).await {
            return Ok(loaded);
        }

        let url = parse_locator(key)?;
        self.fetch_with_retry(key, &url).await
    }

    async fn load_from_disk(&self, key: &CacheKey) -> Option<LoadedImage> {
        let bytes = self.disk.read(key).await?;
        match decode(Bytes::from(bytes)).await {
            Ok(image) => {
                let loaded = LoadedImage::decoded(key.clone(), image, ImageSource::DiskCache);
                self.memory
                    .put(key.clone(), loaded.image.clone(), loaded.cost);
                debug!(key = %key, "Decoded image from disk cache");
                Some(loaded)
            }
            Err(e) => {
                warn!(key = %key, error = %e, "Failed to decode cached image");
                None
            }
        }
    }

    async fn fetch_with_retry(&self, key: &CacheKey, url: &Url) -> FetchResult<LoadedImage> {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            debug!(key = %key, attempt, max_attempts, "Downloading image from network");

            match self.fetch_once(url).await {
                Ok((image, body)) => {
                    self.disk.write(key, &body).await;

                    let loaded = LoadedImage::decoded(key.clone(), image, ImageSource::Network);
                    self.memory
                        .put(key.clone(), loaded.image.clone(), loaded.cost);

                    debug!(key = %key, attempt, cost = loaded.cost, "Image loaded from network");
                    return Ok(loaded);
                }
                Err(err) if !err.is_retryable() => return Err(err),
                Err(err) => {
                    warn!(key = %key, attempt, max_attempts, error = %err, "Image fetch attempt failed");

                    if attempt >= max_attempts {
                        error!(key = %key, attempts = attempt, "All image fetch attempts failed");
                        return Err(FetchError::exhausted(attempt, err));
                    }

                    self.delay.sleep(self.policy.delay_for(attempt)).await;
                    attempt += 1;
                }
            }
        }
    }

    /// Performs one request and decodes the body.
    async fn fetch_once(&self, url: &Url) -> FetchResult<(image::DynamicImage, Bytes)> {
        let response = self.transport.fetch(url).await?;

        if !response.is_success() {
            return Err(FetchError::HttpStatus {
                status: response.status,
            });
        }

        let image = decode(response.body.clone()).await?;
        Ok((image, response.body))
    }
}

/// Checks that a key is a fetchable http(s) URL.
///
/// # Errors
/// Returns `InvalidLocator` otherwise.
pub fn parse_locator(key: &CacheKey) -> FetchResult<Url> {
    let url = Url::parse(key.as_str())
        .map_err(|e| FetchError::invalid_locator(key.as_str(), e.to_string()))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(FetchError::invalid_locator(
            key.as_str(),
            format!("unsupported scheme {}", url.scheme()),
        ));
    }
    if url.host_str().is_none_or(str::is_empty) {
        return Err(FetchError::invalid_locator(key.as_str(), "missing host"));
    }

    Ok(url)
}

/// Decodes image bytes on the blocking pool.
async fn decode(bytes: Bytes) -> FetchResult<image::DynamicImage> {
    tokio::task::spawn_blocking(move || image::load_from_memory(&bytes))
        .await
        .map_err(|e| FetchError::decode(format!("Decode task panicked: {e}")))?
        .map_err(|e| FetchError::decode(format!("Failed to decode image: {e}")))
}
