mod delay_port;
mod image_cache_port;
mod memory_probe_port;
mod transport_port;

pub use delay_port::DelayPort;
pub use image_cache_port::{CacheError, CacheResult, ImageCachePort};
pub use memory_probe_port::{MemoryProbe, usage_percent};
pub use transport_port::{ImageTransport, TransportResponse, TrustAll, TrustPolicy};

#[cfg(test)]
pub mod mocks {
    pub use super::delay_port::mock::RecordingDelay;
    pub use super::memory_probe_port::MockMemoryProbe;
    pub use super::transport_port::mock::{ScriptedTransport, jpeg_bytes, ok_jpeg, status};
}
