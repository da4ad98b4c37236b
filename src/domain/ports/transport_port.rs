//! Port definitions for fetching image bytes over the network.

use async_trait::async_trait;
use bytes::Bytes;
use url::Url;

use crate::domain::errors::TransportError;

/// Raw outcome of a single request.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response body.
    pub body: Bytes,
}

impl TransportResponse {
    /// Creates a response.
    #[must_use]
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Returns true for 2xx statuses.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }
}

/// Port for the network transport.
///
/// Timeouts and TLS validation belong to the implementation. Callers apply
/// their own retry policy on top.
#[async_trait]
pub trait ImageTransport: Send + Sync {
    /// Issues a GET for the given URL.
    async fn fetch(&self, url: &Url) -> Result<TransportResponse, TransportError>;

    /// Drops any response cache the transport keeps.
    fn flush_response_cache(&self) {}
}

/// Trust decision consulted before a request goes out.
pub trait TrustPolicy: Send + Sync {
    /// Returns true if requests to this URL may proceed.
    fn is_trusted(&self, url: &Url) -> bool;
}

/// Trusts every URL.
#[derive(Debug, Clone, Copy, Default)]
pub struct TrustAll;

impl TrustPolicy for TrustAll {
    fn is_trusted(&self, _url: &Url) -> bool {
        true
    }
}
