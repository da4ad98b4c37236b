//! Application configuration.

use std::path::PathBuf;
use std::time::Duration;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::infrastructure::image::{MemoryLimits, RetryPolicy};

const APP_NAME: &str = "kampus-image-cache";
const APP_QUALIFIER: &str = "com";
const APP_ORGANIZATION: &str = "fourkampus";

/// Log level configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Trace level.
    Trace,
    /// Debug level.
    Debug,
    /// Info level.
    #[default]
    Info,
    /// Warning level.
    Warn,
    /// Error level.
    Error,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Trace => write!(f, "trace"),
            Self::Debug => write!(f, "debug"),
            Self::Info => write!(f, "info"),
            Self::Warn => write!(f, "warn"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Application configuration.
#[derive(Debug, Serialize, Deserialize)]
pub struct AppConfig {
    /// Log file path.
    #[serde(default)]
    pub log_path: Option<PathBuf>,

    /// Log verbosity level.
    #[serde(default)]
    pub log_level: LogLevel,

    /// Disk cache directory. Defaults to the platform cache directory.
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,

    /// Base URL prepended to relative image paths.
    #[serde(default)]
    pub base_url: Option<Url>,

    /// Cache tier configuration.
    #[serde(default)]
    pub cache: CacheConfig,

    /// Memory pressure configuration.
    #[serde(default)]
    pub pressure: PressureConfig,
}

/// Cache tier configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum number of decoded images kept in memory.
    pub memory_count_limit: usize,

    /// Maximum total decoded size kept in memory, in bytes.
    pub memory_cost_limit: usize,

    /// Count limit above which `cleanup_if_needed` shrinks the memory tier.
    pub memory_count_ceiling: usize,

    /// Age after which disk records are pruned.
    pub disk_retention_days: u64,

    /// Network attempts per image, including the first.
    pub max_attempts: u32,

    /// Delay after the first failed attempt; doubles each retry.
    pub backoff_base_ms: u64,

    /// Per-request transport timeout.
    pub request_timeout_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            memory_count_limit: 150,
            memory_cost_limit: 100 * 1024 * 1024,
            memory_count_ceiling: 150,
            disk_retention_days: 30,
            max_attempts: 3,
            backoff_base_ms: 1000,
            request_timeout_secs: 10,
        }
    }
}

impl CacheConfig {
    /// Memory tier limits.
    #[must_use]
    pub const fn memory_limits(&self) -> MemoryLimits {
        MemoryLimits::new(self.memory_count_limit, self.memory_cost_limit)
    }

    /// Retry schedule for network fetches.
    #[must_use]
    pub const fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_attempts, Duration::from_millis(self.backoff_base_ms))
    }

    /// Disk retention window.
    #[must_use]
    pub const fn retention(&self) -> Duration {
        Duration::from_secs(self.disk_retention_days * 24 * 60 * 60)
    }

    /// Transport timeout.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Memory pressure configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PressureConfig {
    /// Interval between self-checks of process memory. Zero disables them.
    pub check_interval_secs: u64,

    /// Minimum interval between opportunistic disk prunes at low pressure.
    pub cleanup_interval_secs: u64,

    /// Resident memory percentage above which pressure is moderate.
    pub moderate_percent: f64,

    /// Resident memory percentage above which pressure is critical.
    pub critical_percent: f64,
}

impl Default for PressureConfig {
    fn default() -> Self {
        Self {
            check_interval_secs: 60,
            cleanup_interval_secs: 60 * 60,
            moderate_percent: 60.0,
            critical_percent: 80.0,
        }
    }
}

impl PressureConfig {
    /// Self-check interval, if enabled.
    #[must_use]
    pub const fn check_interval(&self) -> Option<Duration> {
        if self.check_interval_secs == 0 {
            None
        } else {
            Some(Duration::from_secs(self.check_interval_secs))
        }
    }

    /// Minimum interval between low-pressure prunes.
    #[must_use]
    pub const fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_secs)
    }
}

use super::args::CliArgs;

impl AppConfig {
    /// Merges CLI arguments into the configuration.
    pub fn merge_with_args(&mut self, args: &CliArgs) {
        if let Some(log_path) = &args.log_path {
            self.log_path = Some(log_path.clone());
        }
        if let Some(log_level) = args.log_level {
            self.log_level = log_level;
        }
        if let Some(cache_dir) = &args.cache_dir {
            self.cache_dir = Some(cache_dir.clone());
        }
        if let Some(base_url) = &args.base_url {
            self.base_url = Some(base_url.clone());
        }
    }

    /// Returns default config file path.
    #[must_use]
    pub fn default_config_path() -> Option<PathBuf> {
        ProjectDirs::from(APP_QUALIFIER, APP_ORGANIZATION, APP_NAME)
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Returns default log file path.
    #[must_use]
    pub fn default_log_path() -> Option<PathBuf> {
        ProjectDirs::from(APP_QUALIFIER, APP_ORGANIZATION, APP_NAME)
            .map(|dirs| dirs.data_dir().join("kampus-image-cache.log"))
    }

    /// Returns effective log path.
    #[must_use]
    pub fn effective_log_path(&self) -> Option<PathBuf> {
        self.log_path.clone().or_else(Self::default_log_path)
    }

    /// Returns the disk cache directory.
    #[must_use]
    pub fn effective_cache_dir(&self) -> PathBuf {
        self.cache_dir
            .clone()
            .unwrap_or_else(crate::infrastructure::image::default_cache_dir)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_path: None,
            log_level: LogLevel::Info,
            cache_dir: None,
            base_url: None,
            cache: CacheConfig::default(),
            pressure: PressureConfig::default(),
        }
    }
}
