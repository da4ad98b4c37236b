//! Domain layer with cache entities, errors, and port definitions.

/// Entity definitions.
pub mod entities;
/// Error types.
pub mod errors;
/// Port definitions.
pub mod ports;

pub use entities::{CacheKey, ImageSource, LoadedImage, PressureLevel, PressureSignal};
pub use errors::{FetchError, FetchResult, TransportError};
pub use ports::{CacheError, CacheResult, DelayPort, ImageCachePort, ImageTransport, MemoryProbe};
