//! Wall-clock timing of assistant replies

use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

use crate::error::BenchResult;
use crate::retry::poll_until;

/// Measures the time between submitting a query and the loading
/// indicator clearing.
#[derive(Debug, Clone)]
pub struct ResponseTimer {
    poll_interval: Duration,
    max_wait: Duration,
}

impl ResponseTimer {
    pub fn new(poll_interval: Duration, max_wait: Duration) -> Self {
        Self {
            poll_interval,
            max_wait,
        }
    }

    pub fn max_wait(&self) -> Duration {
        self.max_wait
    }

    /// Start the clock, run `trigger`, then poll `is_complete` until it
    /// reports `true`. Returns elapsed seconds.
    ///
    /// Fails with `Timeout` when the completion signal never arrives within
    /// the configured bound.
    pub async fn measure<T, C, Fut>(&self, trigger: T, is_complete: C) -> BenchResult<f64>
    where
        T: Future<Output = BenchResult<()>>,
        C: FnMut() -> Fut,
        Fut: Future<Output = BenchResult<bool>>,
    {
        let start = Instant::now();
        trigger.await?;

        poll_until("assistant reply", self.poll_interval, self.max_wait, is_complete).await?;

        let elapsed = start.elapsed().as_secs_f64();
        debug!("Reply completed in {:.2}s", elapsed);
        Ok(round_seconds(elapsed))
    }
}

/// Round to millisecond precision so the sink does not carry float noise.
pub(crate) fn round_seconds(secs: f64) -> f64 {
    (secs * 1000.0).round() / 1000.0
}
