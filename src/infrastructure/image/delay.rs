//! Timer-backed delay used between fetch attempts.

use std::time::Duration;

use async_trait::async_trait;

use crate::domain::ports::DelayPort;

/// Sleeps on the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioDelay;

#[async_trait]
impl DelayPort for TokioDelay {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}
