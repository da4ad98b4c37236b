//! Port definition for the in-memory image tier.

use std::sync::Arc;

use crate::domain::entities::{CacheKey, LoadedImage};

/// Result type for cache operations.
pub type CacheResult<T> = std::result::Result<T, CacheError>;

/// Errors that can occur while setting up a cache tier.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CacheError {
    /// I/O error during cache operation.
    #[error("IO error: {0}")]
    IoError(String),
}

/// Port for the decoded-image tier.
/// Implementations must be thread-safe and must not block on I/O.
pub trait ImageCachePort: Send + Sync {
    /// Looks up an image, marking it as recently used.
    fn get(&self, key: &CacheKey) -> Option<LoadedImage>;

    /// Stores a decoded image with its byte cost.
    fn put(&self, key: CacheKey, image: Arc<image::DynamicImage>, cost: usize);

    /// Returns the current number of cached images.
    fn len(&self) -> usize;

    /// Returns true if the cache is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
