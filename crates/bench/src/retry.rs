//! Bounded polling and retry for eventually-consistent UI state

use std::future::Future;
use std::time::Duration;
use serde::{Deserialize, Serialize};
use tokio::time::{sleep, Instant};
use tracing::{debug, warn};

use crate::error::{BenchError, BenchResult};

/// Fixed-backoff retry policy with an explicit give-up point
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts including the first one
    pub max_attempts: usize,

    /// Delay between attempts in milliseconds
    pub backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_ms: 2000,
        }
    }
}

impl RetryPolicy {
    pub fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }

    /// Run `op` until it succeeds or the attempt budget is spent.
    ///
    /// The closure receives the 1-based attempt number so callers can do
    /// recovery work (e.g. a page reload) before every attempt after the first.
    pub async fn run<T, F, Fut>(&self, what: &str, mut op: F) -> BenchResult<T>
    where
        F: FnMut(usize) -> Fut,
        Fut: Future<Output = BenchResult<T>>,
    {
        let attempts = self.max_attempts.max(1);
        let mut last_error = String::new();

        for attempt in 1..=attempts {
            match op(attempt).await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!("{} succeeded on attempt {}", what, attempt);
                    }
                    return Ok(value);
                }
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    warn!("{} failed on attempt {}/{}: {}", what, attempt, attempts, e);
                    last_error = e.to_string();
                }
            }

            if attempt < attempts {
                sleep(self.backoff()).await;
            }
        }

        Err(BenchError::RetriesExhausted {
            what: what.to_string(),
            attempts,
            last_error,
        })
    }
}

/// Poll `probe` every `interval` until it reports `true`.
///
/// Returns the time spent waiting, or `Timeout` once `max_wait` has elapsed
/// without the probe completing. Probe errors are propagated immediately.
pub async fn poll_until<F, Fut>(
    what: &str,
    interval: Duration,
    max_wait: Duration,
    mut probe: F,
) -> BenchResult<Duration>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = BenchResult<bool>>,
{
    let start = Instant::now();

    loop {
        if probe().await? {
            return Ok(start.elapsed());
        }

        if start.elapsed() >= max_wait {
            return Err(BenchError::timeout(what, max_wait));
        }

        sleep(interval).await;
    }
}
