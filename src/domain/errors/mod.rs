//! Domain error types.

mod fetch_error;
mod transport_error;

pub use fetch_error::{FetchError, FetchResult};
pub use transport_error::TransportError;
