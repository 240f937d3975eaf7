//! Outbound pacing for platforms with rate limits.
//!
//! The exporter never sleeps directly; it awaits a [`Pacer`], so tests can plug in
//! [`NoDelay`] while production uses a [`TokenBucket`].

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};

#[async_trait]
pub trait Pacer: Send + Sync {
    /// Wait until the next operation is allowed to run.
    async fn pace(&self);
}

/// Pacer that never waits.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoDelay;

#[async_trait]
impl Pacer for NoDelay {
    async fn pace(&self) {}
}

#[derive(Clone, Debug)]
struct Bucket {
    tokens: f64,
    last_update: Instant,
}

/// Token bucket: `capacity` operations may burst, then one token refills every
/// `window / capacity`.
#[derive(Debug)]
pub struct TokenBucket {
    max_tokens: f64,
    refill_per_sec: f64,
    bucket: Mutex<Bucket>,
}

impl TokenBucket {
    pub fn new(capacity: u32, window: Duration) -> Self {
        let max_tokens = f64::from(capacity.max(1));
        let window_secs = window.as_secs_f64().max(1e-9);

        Self {
            max_tokens,
            refill_per_sec: max_tokens / window_secs,
            bucket: Mutex::new(Bucket {
                tokens: max_tokens,
                last_update: Instant::now(),
            }),
        }
    }

    /// One operation per `interval`, no burst.
    pub fn every(interval: Duration) -> Self {
        Self::new(1, interval)
    }

    /// Take a token at `now`, or report how long until one is available.
    pub async fn try_acquire_at(&self, now: Instant) -> Result<(), Duration> {
        let mut bucket = self.bucket.lock().await;

        let elapsed = now.saturating_duration_since(bucket.last_update).as_secs_f64();
        bucket.tokens = (bucket.tokens + elapsed * self.refill_per_sec).min(self.max_tokens);
        bucket.last_update = now;

        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            return Ok(());
        }

        let secs = (1.0 - bucket.tokens) / self.refill_per_sec;
        Err(Duration::from_secs_f64(secs.max(0.0)))
    }
}

#[async_trait]
impl Pacer for TokenBucket {
    async fn pace(&self) {
        loop {
            match self.try_acquire_at(Instant::now()).await {
                Ok(()) => return,
                Err(wait) => sleep(wait).await,
            }
        }
    }
}
