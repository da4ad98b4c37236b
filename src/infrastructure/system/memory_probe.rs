//! Process memory sampling backed by `sysinfo`.

use parking_lot::Mutex;
use sysinfo::{MemoryRefreshKind, Pid, Process, ProcessRefreshKind, ProcessesToUpdate, RefreshKind, System};
use tracing::debug;

use crate::domain::ports::MemoryProbe;

/// Reads resident and total memory from the operating system.
pub struct SysinfoMemoryProbe {
    system: Mutex<System>,
    pid: Option<Pid>,
}

impl SysinfoMemoryProbe {
    /// Creates a probe for the current process.
    #[must_use]
    pub fn new() -> Self {
        let pid = sysinfo::get_current_pid()
            .inspect_err(|e| debug!(error = %e, "Current pid unavailable; resident memory reads as 0"))
            .ok();
        Self {
            system: Mutex::new(System::new_with_specifics(RefreshKind::nothing())),
            pid,
        }
    }
}

impl Default for SysinfoMemoryProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SysinfoMemoryProbe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SysinfoMemoryProbe")
            .field("pid", &self.pid)
            .finish_non_exhaustive()
    }
}

impl MemoryProbe for SysinfoMemoryProbe {
    fn resident_bytes(&self) -> u64 {
        let Some(pid) = self.pid else {
            return 0;
        };
        let mut system = self.system.lock();
        system.refresh_processes_specifics(
            ProcessesToUpdate::Some(&[pid]),
            false,
            ProcessRefreshKind::nothing().with_memory(),
        );
        system.process(pid).map_or(0, Process::memory)
    }

    fn total_bytes(&self) -> u64 {
        let mut system = self.system.lock();
        system.refresh_memory_specifics(MemoryRefreshKind::nothing().with_ram());
        system.total_memory()
    }
}
