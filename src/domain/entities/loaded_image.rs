//! Decoded image types shared across the cache tiers.

use std::sync::Arc;

use super::CacheKey;

/// Where an image was loaded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageSource {
    /// Served from the in-memory LRU cache.
    MemoryCache,
    /// Decoded from a disk record.
    DiskCache,
    /// Downloaded from the network.
    Network,
}

impl std::fmt::Display for ImageSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MemoryCache => write!(f, "memory"),
            Self::DiskCache => write!(f, "disk"),
            Self::Network => write!(f, "network"),
        }
    }
}

/// A decoded image together with its cache bookkeeping.
#[derive(Debug, Clone)]
pub struct LoadedImage {
    /// The key the image was resolved for.
    pub key: CacheKey,
    /// The decoded bitmap.
    pub image: Arc<image::DynamicImage>,
    /// Approximate decoded size in bytes.
    pub cost: usize,
    /// Tier that produced the image.
    pub source: ImageSource,
}

impl LoadedImage {
    /// Wraps a freshly decoded image, computing its cost.
    #[must_use]
    pub fn decoded(key: CacheKey, image: image::DynamicImage, source: ImageSource) -> Self {
        let cost = decoded_cost(&image);
        Self {
            key,
            image: Arc::new(image),
            cost,
            source,
        }
    }
}

/// Size of the decoded pixel buffer.
#[must_use]
pub fn decoded_cost(image: &image::DynamicImage) -> usize {
    image.as_bytes().len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decoded_cost_matches_pixel_buffer() {
        let img = image::DynamicImage::new_rgb8(10, 20);
        assert_eq!(decoded_cost(&img), 10 * 20 * 3);

        let rgba = image::DynamicImage::new_rgba8(4, 4);
        assert_eq!(decoded_cost(&rgba), 64);
    }

    #[test]
    fn test_decoded_records_cost_and_source() {
        let loaded = LoadedImage::decoded(
            CacheKey::new("k"),
            image::DynamicImage::new_rgb8(2, 2),
            ImageSource::Network,
        );
        assert_eq!(loaded.cost, 12);
        assert_eq!(loaded.source, ImageSource::Network);
        assert_eq!(loaded.key.as_str(), "k");
    }
}
