//! Operating system integrations.

pub mod memory_probe;

pub use memory_probe::SysinfoMemoryProbe;
