//! Domain entities for the image cache.

mod cache_key;
mod loaded_image;
mod pressure;

pub use cache_key::CacheKey;
pub use loaded_image::{ImageSource, LoadedImage, decoded_cost};
pub use pressure::{PressureLevel, PressureSignal};
