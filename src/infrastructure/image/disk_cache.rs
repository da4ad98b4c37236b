//! Disk-based image cache for persistence across sessions.

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, trace, warn};

use crate::domain::entities::CacheKey;
use crate::domain::ports::{CacheError, CacheResult};

/// Default retention window for disk records (30 days).
pub const DEFAULT_RETENTION: Duration = Duration::from_secs(30 * 24 * 60 * 60);

/// Prefix for in-progress writes; never a valid encoded key.
const TEMP_PREFIX: &str = ".partial-";

/// Disk-based image cache that persists raw encoded bytes.
///
/// Owns its directory exclusively. Every I/O failure after construction is
/// logged and treated as a miss or a no-op.
#[derive(Debug)]
pub struct DiskImageCache {
    cache_dir: PathBuf,
}

impl DiskImageCache {
    /// Creates a new disk cache in the specified directory.
    ///
    /// # Errors
    /// Returns error if cache directory cannot be created.
    pub async fn new(cache_dir: PathBuf) -> CacheResult<Self> {
        fs::create_dir_all(&cache_dir)
            .await
            .map_err(|e| CacheError::IoError(format!("Failed to create cache dir: {e}")))?;
        debug!(path = %cache_dir.display(), "Disk image cache ready");
        Ok(Self { cache_dir })
    }

    /// Returns the cache directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Returns the path for a cached record.
    #[must_use]
    pub fn path_for(&self, key: &CacheKey) -> PathBuf {
        self.cache_dir.join(key.disk_filename())
    }

    /// Reads raw bytes for a key.
    pub async fn read(&self, key: &CacheKey) -> Option<Vec<u8>> {
        let path = self.path_for(key);
        match fs::read(&path).await {
            Ok(bytes) => {
                trace!(key = %key, path = %path.display(), "Disk cache hit");
                Some(bytes)
            }
            Err(e) => {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!(key = %key, error = %e, "Failed to read disk cache record");
                }
                trace!(key = %key, "Disk cache miss");
                None
            }
        }
    }

    /// Stores raw bytes for a key.
    ///
    /// The bytes are written to a temporary file and renamed into place, so a
    /// reader never observes a partial record.
    pub async fn write(&self, key: &CacheKey, bytes: &[u8]) {
        if let Err(e) = self.try_write(key, bytes).await {
            warn!(key = %key, error = %e, "Failed to write disk cache record");
        }
    }

    async fn try_write(&self, key: &CacheKey, bytes: &[u8]) -> std::io::Result<()> {
        let path = self.path_for(key);
        let temp_path = self
            .cache_dir
            .join(format!("{TEMP_PREFIX}{}", uuid::Uuid::new_v4().simple()));

        let result = async {
            let mut file = fs::File::create(&temp_path).await?;
            file.write_all(bytes).await?;
            file.flush().await?;
            drop(file);
            fs::rename(&temp_path, &path).await
        }
        .await;

        if result.is_err() {
            let _ = fs::remove_file(&temp_path).await;
        } else {
            debug!(key = %key, path = %path.display(), size = bytes.len(), "Stored image in disk cache");
        }
        result
    }

    /// Returns true if a record exists for the key.
    pub async fn contains(&self, key: &CacheKey) -> bool {
        fs::try_exists(self.path_for(key)).await.unwrap_or(false)
    }

    /// Deletes the cache directory and recreates it empty.
    pub async fn remove_all(&self) {
        if let Err(e) = fs::remove_dir_all(&self.cache_dir).await
            && e.kind() != std::io::ErrorKind::NotFound
        {
            warn!(path = %self.cache_dir.display(), error = %e, "Failed to remove disk cache");
        }
        if let Err(e) = fs::create_dir_all(&self.cache_dir).await {
            warn!(path = %self.cache_dir.display(), error = %e, "Failed to recreate disk cache");
            return;
        }
        debug!("Cleared disk cache");
    }

    /// Deletes records last modified more than `max_age` ago, along with any
    /// leftover partial writes regardless of age.
    ///
    /// Entries that cannot be inspected or removed are skipped. Returns the
    /// number of records removed; partial writes are not counted.
    pub async fn prune_older_than(&self, max_age: Duration) -> usize {
        let cutoff = SystemTime::now()
            .checked_sub(max_age)
            .unwrap_or(SystemTime::UNIX_EPOCH);

        let mut entries = match fs::read_dir(&self.cache_dir).await {
            Ok(entries) => entries,
            Err(e) => {
                warn!(path = %self.cache_dir.display(), error = %e, "Failed to scan disk cache");
                return 0;
            }
        };

        let mut removed = 0usize;
        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    warn!(error = %e, "Failed to read disk cache entry");
                    break;
                }
            };

            let Ok(meta) = entry.metadata().await else {
                continue;
            };
            if !meta.is_file() {
                continue;
            }
            let partial = entry.file_name().to_string_lossy().starts_with(TEMP_PREFIX);
            if !partial {
                let Ok(modified) = meta.modified() else {
                    continue;
                };
                if modified >= cutoff {
                    continue;
                }
            }

            let path = entry.path();
            match fs::remove_file(&path).await {
                Ok(()) if partial => {
                    trace!(path = %path.display(), "Removed abandoned partial write");
                }
                Ok(()) => {
                    trace!(path = %path.display(), "Pruned stale cache record");
                    removed += 1;
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Failed to prune cache record");
                }
            }
        }

        if removed > 0 {
            debug!(removed, max_age_secs = max_age.as_secs(), "Pruned stale disk cache records");
        }
        removed
    }

    /// Returns the number of complete records on disk.
    pub async fn len(&self) -> usize {
        let Ok(mut entries) = fs::read_dir(&self.cache_dir).await else {
            return 0;
        };
        let mut count = 0;
        while let Ok(Some(entry)) = entries.next_entry().await {
            let is_record = !entry.file_name().to_string_lossy().starts_with(TEMP_PREFIX);
            if is_record && entry.file_type().await.is_ok_and(|t| t.is_file()) {
                count += 1;
            }
        }
        count
    }

    /// Returns true if no records are on disk.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

/// Returns the default cache directory path.
#[must_use]
pub fn default_cache_dir() -> PathBuf {
    directories::ProjectDirs::from("com", "fourkampus", "kampus-image-cache").map_or_else(
        || {
            std::env::temp_dir()
                .join("kampus-image-cache")
                .join("cache")
                .join("images")
        },
        |dirs| dirs.cache_dir().join("images"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tempfile::TempDir;

    async fn create_test_cache() -> (DiskImageCache, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let cache = DiskImageCache::new(temp_dir.path().join("images"))
            .await
            .unwrap();
        (cache, temp_dir)
    }

    fn set_mtime(path: &Path, time: SystemTime) {
        let file = std::fs::File::options().write(true).open(path).unwrap();
        file.set_modified(time).unwrap();
    }

    #[tokio::test]
    async fn test_new_is_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path().join("nested").join("images");

        DiskImageCache::new(dir.clone()).await.unwrap();
        let cache = DiskImageCache::new(dir.clone()).await.unwrap();

        assert!(dir.is_dir());
        assert_eq!(cache.dir(), dir.as_path());
    }

    #[tokio::test]
    async fn test_write_and_read() {
        let (cache, _temp) = create_test_cache().await;
        let key = CacheKey::new("https://cdn.example/img1.jpg");

        cache.write(&key, b"test image data").await;

        assert_eq!(cache.read(&key).await.unwrap(), b"test image data");
        assert!(cache.path_for(&key).ends_with(key.disk_filename()));
    }

    #[tokio::test]
    async fn test_cache_miss() {
        let (cache, _temp) = create_test_cache().await;
        assert!(cache.read(&CacheKey::new("nonexistent")).await.is_none());
    }

    #[tokio::test]
    async fn test_overwrite_replaces_record() {
        let (cache, _temp) = create_test_cache().await;
        let key = CacheKey::new("k");

        cache.write(&key, b"first").await;
        cache.write(&key, b"second").await;

        assert_eq!(cache.read(&key).await.unwrap(), b"second");
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_remove_all_leaves_empty_directory() {
        let (cache, _temp) = create_test_cache().await;
        cache.write(&CacheKey::new("a"), b"data1").await;
        cache.write(&CacheKey::new("b"), b"data2").await;
        assert_eq!(cache.len().await, 2);

        cache.remove_all().await;

        assert!(cache.dir().is_dir());
        assert!(cache.is_empty().await);
        assert!(cache.read(&CacheKey::new("a")).await.is_none());
    }

    #[tokio::test]
    async fn test_write_after_external_removal_is_swallowed() {
        let (cache, _temp) = create_test_cache().await;
        std::fs::remove_dir_all(cache.dir()).unwrap();

        cache.write(&CacheKey::new("a"), b"data").await;

        assert!(cache.read(&CacheKey::new("a")).await.is_none());
    }

    #[tokio::test]
    async fn test_prune_removes_only_stale_records() {
        let (cache, _temp) = create_test_cache().await;
        let stale = CacheKey::new("https://cdn.example/old.jpg");
        let fresh = CacheKey::new("https://cdn.example/new.jpg");
        cache.write(&stale, b"old").await;
        cache.write(&fresh, b"new").await;

        let forty_days_ago = SystemTime::now() - Duration::from_secs(40 * 24 * 60 * 60);
        set_mtime(&cache.path_for(&stale), forty_days_ago);

        let removed = cache.prune_older_than(DEFAULT_RETENTION).await;

        assert_eq!(removed, 1);
        assert!(!cache.contains(&stale).await);
        assert!(cache.contains(&fresh).await);
    }

    #[tokio::test]
    async fn test_prune_removes_abandoned_partial_writes() {
        let (cache, _temp) = create_test_cache().await;
        let partial = cache.dir().join(format!("{TEMP_PREFIX}0123abcd"));
        std::fs::write(&partial, b"half a jpeg").unwrap();
        let fresh = CacheKey::new("https://cdn.example/new.jpg");
        cache.write(&fresh, b"new").await;

        let removed = cache.prune_older_than(DEFAULT_RETENTION).await;

        assert_eq!(removed, 0);
        assert!(!partial.exists());
        assert!(cache.contains(&fresh).await);
    }

    #[tokio::test]
    async fn test_prune_skips_directories() {
        let (cache, _temp) = create_test_cache().await;
        let sub = cache.dir().join("subdir");
        std::fs::create_dir(&sub).unwrap();

        let removed = cache.prune_older_than(Duration::ZERO).await;

        assert_eq!(removed, 0);
        assert!(sub.is_dir());
    }

    #[tokio::test]
    async fn test_prune_on_missing_directory_returns_zero() {
        let (cache, _temp) = create_test_cache().await;
        std::fs::remove_dir_all(cache.dir()).unwrap();

        assert_eq!(cache.prune_older_than(Duration::ZERO).await, 0);
    }

    #[tokio::test]
    async fn test_clear_racing_writes_does_not_panic() {
        let (cache, _temp) = create_test_cache().await;
        let cache = Arc::new(cache);

        let writers: Vec<_> = (0..16)
            .map(|i| {
                let cache = cache.clone();
                tokio::spawn(async move {
                    cache
                        .write(&CacheKey::new(format!("https://cdn.example/{i}.jpg")), b"bytes")
                        .await;
                })
            })
            .collect();
        let clearer = {
            let cache = cache.clone();
            tokio::spawn(async move { cache.remove_all().await })
        };

        for writer in writers {
            writer.await.unwrap();
        }
        clearer.await.unwrap();

        assert!(cache.dir().is_dir());
        assert!(cache.len().await <= 16);
        for i in 0..16 {
            let key = CacheKey::new(format!("https://cdn.example/{i}.jpg"));
            if let Some(bytes) = cache.read(&key).await {
                assert_eq!(bytes, b"bytes");
            }
        }
    }
}
