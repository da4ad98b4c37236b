//! `reqwest`-backed network transport.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};
use url::Url;

use crate::domain::errors::TransportError;
use crate::domain::ports::{ImageTransport, TransportResponse, TrustAll, TrustPolicy};

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP transport that consults a trust policy before each request.
pub struct HttpTransport {
    client: reqwest::Client,
    trust: Arc<dyn TrustPolicy>,
}

impl std::fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTransport").finish_non_exhaustive()
    }
}

impl HttpTransport {
    /// Creates a transport with the given per-request timeout.
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be created.
    pub fn new(timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| TransportError::Client {
                message: e.to_string(),
            })?;

        Ok(Self {
            client,
            trust: Arc::new(TrustAll),
        })
    }

    /// Replaces the trust policy.
    #[must_use]
    pub fn with_trust_policy(mut self, trust: Arc<dyn TrustPolicy>) -> Self {
        self.trust = trust;
        self
    }
}

#[async_trait]
impl ImageTransport for HttpTransport {
    async fn fetch(&self, url: &Url) -> Result<TransportResponse, TransportError> {
        if !self.trust.is_trusted(url) {
            let host = url.host_str().unwrap_or_default().to_string();
            warn!(host = %host, "Refusing request to untrusted host");
            return Err(TransportError::Untrusted { host });
        }

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| TransportError::request(e.to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|e| TransportError::body(e.to_string()))?;

        debug!(url = %url, status, size = body.len(), "HTTP response received");
        Ok(TransportResponse { status, body })
    }
}
