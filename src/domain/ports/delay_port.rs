//! Port for waiting between retries.

use std::time::Duration;

use async_trait::async_trait;

/// Suspends the current task for a duration.
#[async_trait]
pub trait DelayPort: Send + Sync {
    /// Waits for `duration`.
    async fn sleep(&self, duration: Duration);
}
