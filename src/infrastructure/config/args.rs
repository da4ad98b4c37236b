use super::app_config::LogLevel;
use crate::domain::entities::PressureLevel;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use url::Url;

#[derive(Debug, Parser)]
#[command(
    name = "kampus-image-cache",
    version,
    about = "Two-tier network image cache",
    long_about = None
)]
pub struct CliArgs {
    /// Configuration file path.
    #[arg(short, long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Log file path.
    #[arg(long, value_name = "PATH", global = true)]
    pub log_path: Option<PathBuf>,

    /// Log verbosity level.
    #[arg(long, value_enum, global = true)]
    pub log_level: Option<LogLevel>,

    /// Disk cache directory.
    #[arg(long, value_name = "DIR", env = "KAMPUS_IMAGE_CACHE_DIR", global = true)]
    pub cache_dir: Option<PathBuf>,

    /// Base URL for relative image paths.
    #[arg(long, value_name = "URL", global = true)]
    pub base_url: Option<Url>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Resolve images through the cache and report where each came from.
    Fetch {
        /// Image locators (absolute URLs or paths relative to the base URL).
        #[arg(required = true)]
        locators: Vec<String>,
    },
    /// Remove every cached image from memory and disk.
    Clear,
    /// Shrink the memory tier if oversized and prune stale disk records.
    Cleanup,
    /// Apply a memory pressure level.
    Pressure {
        /// Level to apply.
        #[arg(value_enum)]
        level: PressureLevel,
    },
    /// Print cache statistics.
    Stats,
}
