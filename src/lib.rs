//! Kampus image cache - a two-tier network image cache.
//!
//! Decoded images are kept in a bounded in-memory LRU, encoded bytes in a
//! per-user disk directory, and misses are fetched over HTTP with bounded
//! exponential backoff. A pressure coordinator sheds both tiers when the
//! process runs low on memory.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

/// Application layer containing the request facade and pressure coordinator.
pub mod application;
/// Domain layer containing entities, errors, and port definitions.
pub mod domain;
/// Infrastructure layer containing adapters for external services.
pub mod infrastructure;

/// Current version of the application.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name.
pub const NAME: &str = "kampus-image-cache";
