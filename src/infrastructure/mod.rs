//! Infrastructure layer with external service adapters.

/// Application configuration.
pub mod config;
/// Image handling (caching, fetching, transport).
pub mod image;
/// Process memory sampling.
pub mod system;

pub use config::{AppConfig, CliArgs, LogLevel, StorageManager};
pub use image::{CacheStats, DiskImageCache, FetchPipeline, HttpTransport, MemoryImageCache};
pub use system::SysinfoMemoryProbe;
