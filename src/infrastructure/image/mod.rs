//! Image caching infrastructure.
//!
//! This module provides:
//! - Memory caching with cost-aware LRU eviction
//! - Disk caching for persistence
//! - The fetch pipeline (memory -> disk -> network with retries)
//! - An HTTP transport backed by `reqwest`

pub mod delay;
pub mod disk_cache;
pub mod http_transport;
pub mod memory_cache;
pub mod pipeline;

pub use delay::TokioDelay;
pub use disk_cache::{DEFAULT_RETENTION, DiskImageCache, default_cache_dir};
pub use http_transport::HttpTransport;
pub use memory_cache::{CacheStats, MemoryImageCache, MemoryLimits};
pub use pipeline::{FetchPipeline, RetryPolicy, parse_locator};
