pub mod image_service;
pub mod pressure_coordinator;

pub use image_service::{ImageService, ImageServiceOptions};
pub use pressure_coordinator::{PressureCoordinator, PressureSettings};
