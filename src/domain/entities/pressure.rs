//! Memory pressure levels and the signals that drive them.

use serde::{Deserialize, Serialize};

/// How hard the cache should shed memory.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
    clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum PressureLevel {
    /// Opportunistic cleanup only.
    #[default]
    Low,
    /// Flush transport caches and prune stale disk records.
    Moderate,
    /// Drop everything that can be dropped.
    Critical,
}

impl PressureLevel {
    /// Classifies a resident-to-total memory ratio given in percent.
    #[must_use]
    pub fn from_usage_percent(percent: f64, moderate: f64, critical: f64) -> Self {
        if percent > critical {
            Self::Critical
        } else if percent > moderate {
            Self::Moderate
        } else {
            Self::Low
        }
    }
}

impl std::fmt::Display for PressureLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Moderate => write!(f, "moderate"),
            Self::Critical => write!(f, "critical"),
        }
    }
}

/// External events pushed into the pressure coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PressureSignal {
    /// The platform reported a low-memory warning.
    MemoryWarning,
    /// The host application moved to the background.
    EnteredBackground,
    /// Periodic self-check; the level is sampled from the memory probe.
    Tick,
    /// An explicit level chosen by the driver.
    Level(PressureLevel),
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(10.0, PressureLevel::Low ; "idle")]
    #[test_case(60.0, PressureLevel::Low ; "moderate_boundary_is_exclusive")]
    #[test_case(60.5, PressureLevel::Moderate ; "moderate")]
    #[test_case(80.0, PressureLevel::Moderate ; "critical_boundary_is_exclusive")]
    #[test_case(93.0, PressureLevel::Critical ; "critical")]
    fn test_from_usage_percent(percent: f64, expected: PressureLevel) {
        assert_eq!(
            PressureLevel::from_usage_percent(percent, 60.0, 80.0),
            expected
        );
    }

    #[test]
    fn test_levels_are_ordered() {
        assert!(PressureLevel::Low < PressureLevel::Moderate);
        assert!(PressureLevel::Moderate < PressureLevel::Critical);
    }
}
