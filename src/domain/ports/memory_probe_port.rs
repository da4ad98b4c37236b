//! Port for sampling process memory usage.

/// Reports resident and total memory in bytes.
#[cfg_attr(test, mockall::automock)]
pub trait MemoryProbe: Send + Sync {
    /// Resident memory of the current process.
    fn resident_bytes(&self) -> u64;

    /// Total physical memory of the device.
    fn total_bytes(&self) -> u64;
}

/// Resident memory as a percentage of total memory.
#[allow(clippy::cast_precision_loss)]
pub fn usage_percent(probe: &dyn MemoryProbe) -> f64 {
    let total = probe.total_bytes();
    if total == 0 {
        return 0.0;
    }
    (probe.resident_bytes() as f64 / total as f64) * 100.0
}
