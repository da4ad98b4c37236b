//! Application layer with the request facade and pressure handling.

/// Application services.
pub mod services;

pub use services::{ImageService, ImageServiceOptions, PressureCoordinator, PressureSettings};
