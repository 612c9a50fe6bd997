//! Bounded retry with exponential backoff and jitter.
//!
//! Wraps calls to external providers so a flaky connection gets a couple of
//! quick second chances without turning into a retry storm. Only transient
//! transport failures are retried.

use std::future::Future;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::error::ServiceError;

#[derive(Debug, Clone)]
pub struct Backoff {
    max: Duration,
    current: Duration,
    jitter_ratio: f64,
}

impl Backoff {
    pub fn new(base: Duration, max: Duration) -> Self {
        let base = base.max(Duration::from_millis(1));
        let max = max.max(base);
        Self {
            max,
            current: base,
            jitter_ratio: 0.2,
        }
    }

    /// Delay before the next attempt; doubles on every call up to `max`.
    pub fn fail(&mut self) -> Duration {
        let delay = add_jitter(self.current, self.jitter_ratio);
        self.current = self.current.saturating_mul(2).min(self.max);
        delay
    }
}

fn add_jitter(delay: Duration, ratio: f64) -> Duration {
    if !(0.0..=1.0).contains(&ratio) {
        return delay;
    }

    let delay_ms = delay.as_millis();
    if delay_ms == 0 {
        return delay;
    }

    let jitter_ms_max = ((delay_ms as f64) * ratio) as u128;
    if jitter_ms_max == 0 {
        return delay;
    }

    let now_nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.subsec_nanos() as u64)
        .unwrap_or(0);
    let jitter_ms = (now_nanos as u128) % (jitter_ms_max + 1);
    delay + Duration::from_millis(jitter_ms as u64)
}

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Run `op`, retrying transient failures up to `max_retries` times.
    pub async fn run<T, F, Fut>(&self, service: &str, mut op: F) -> Result<T, ServiceError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ServiceError>>,
    {
        let mut backoff = Backoff::new(self.base_delay, self.max_delay);
        let mut attempt = 0u32;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_transient() && attempt < self.max_retries => {
                    attempt += 1;
                    let delay = backoff.fail();
                    tracing::warn!(
                        service,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "Transient {} failure, retrying: {}",
                        service,
                        err
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(err) => {
                    if attempt > 0 {
                        tracing::error!("{} still failing after {} retries: {}", service, attempt, err);
                    }
                    return Err(err);
                }
            }
        }
    }
}
