//! Network transport error types.

use thiserror::Error;

/// Transport-level failures, before any HTTP status is known.
#[derive(Debug, Clone, Error)]
#[allow(missing_docs)]
pub enum TransportError {
    #[error("request failed: {message}")]
    Request { message: String },

    #[error("failed to read body: {message}")]
    Body { message: String },

    #[error("host {host} rejected by trust policy")]
    Untrusted { host: String },

    #[error("failed to build HTTP client: {message}")]
    Client { message: String },
}

impl TransportError {
    /// Creates request error.
    #[must_use]
    pub fn request(message: impl Into<String>) -> Self {
        Self::Request {
            message: message.into(),
        }
    }

    /// Creates body read error.
    #[must_use]
    pub fn body(message: impl Into<String>) -> Self {
        Self::Body {
            message: message.into(),
        }
    }
}
