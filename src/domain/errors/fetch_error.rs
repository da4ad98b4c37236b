//! Fetch pipeline error types.

use thiserror::Error;

use super::TransportError;

/// Result type for fetch pipeline operations.
pub type FetchResult<T> = Result<T, FetchError>;

/// Why an image could not be resolved.
#[derive(Debug, Clone, Error)]
#[allow(missing_docs)]
pub enum FetchError {
    #[error("invalid locator {locator:?}: {reason}")]
    InvalidLocator { locator: String, reason: String },

    #[error("unexpected HTTP status {status}")]
    HttpStatus { status: u16 },

    #[error("network failure: {message}")]
    NetworkFailure { message: String },

    #[error("payload is not a decodable image: {message}")]
    DecodeFailure { message: String },

    #[error("gave up after {attempts} attempts: {last}")]
    ExhaustedRetries {
        attempts: u32,
        #[source]
        last: Box<FetchError>,
    },
}

impl FetchError {
    /// Creates invalid locator error.
    #[must_use]
    pub fn invalid_locator(locator: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidLocator {
            locator: locator.into(),
            reason: reason.into(),
        }
    }

    /// Creates network failure error.
    #[must_use]
    pub fn network(message: impl Into<String>) -> Self {
        Self::NetworkFailure {
            message: message.into(),
        }
    }

    /// Creates decode failure error.
    #[must_use]
    pub fn decode(message: impl Into<String>) -> Self {
        Self::DecodeFailure {
            message: message.into(),
        }
    }

    /// Wraps the last attempt's error once retries run out.
    #[must_use]
    pub fn exhausted(attempts: u32, last: Self) -> Self {
        Self::ExhaustedRetries {
            attempts,
            last: Box::new(last),
        }
    }

    /// Returns whether another attempt could succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::HttpStatus { .. } | Self::NetworkFailure { .. } | Self::DecodeFailure { .. }
        )
    }

    /// Returns the HTTP status behind this error, looking through retries.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::HttpStatus { status } => Some(*status),
            Self::ExhaustedRetries { last, .. } => last.status(),
            _ => None,
        }
    }
}

impl From<TransportError> for FetchError {
    fn from(err: TransportError) -> Self {
        Self::network(err.to_string())
    }
}
