//! Three-bucket rate limiter facade
//!
//! One [`RateLimiter`] guards all upstream traffic. An acquire consumes one
//! token from each of the `per_second`, `per_minute`, and `per_hour`
//! buckets; the request is admitted only when every bucket yields.
//!
//! ## Partial consumption
//!
//! The three checks run sequentially with no rollback: when an earlier
//! bucket grants a token but a later one denies, the granted tokens stay
//! consumed. The drained bucket simply refills a little later and overall
//! admission remains bounded by the strictest bucket. Checking the
//! most-restrictive bucket first (`per_second`) keeps the hazard small.
//!
//! ## Failure policy
//!
//! If the bucket store is unreachable during an acquire, the limiter fails
//! open: the request is admitted, a warning is logged, and the `fail_open`
//! counter is incremented so operators can see that admission is running
//! unbounded. This trades strictness for pipeline liveness on store blips.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use fundsight_core::config::{BucketSettings, RateLimitsConfig};
use rand::Rng;
use tracing::{debug, warn};

use crate::bucket::{Admission, BucketState};
use crate::store::BucketStore;
use crate::LimiterError;

/// Default deadline for [`RateLimiter::wait_for_token`]
pub const DEFAULT_WAIT_DEADLINE: Duration = Duration::from_secs(300);

/// Upper bound of the random jitter added to each denial wait
const WAIT_JITTER_MS: u64 = 50;

/// Admission counters, readable without touching the store
#[derive(Debug, Default)]
pub struct LimiterStats {
    allowed: AtomicU64,
    denied: AtomicU64,
    fail_open: AtomicU64,
}

/// Point-in-time copy of [`LimiterStats`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub allowed: u64,
    pub denied: u64,
    pub fail_open: u64,
}

impl LimiterStats {
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            allowed: self.allowed.load(Ordering::Relaxed),
            denied: self.denied.load(Ordering::Relaxed),
            fail_open: self.fail_open.load(Ordering::Relaxed),
        }
    }
}

/// Peek view of one bucket for the status/health endpoints
#[derive(Debug, Clone, PartialEq)]
pub struct BucketSnapshot {
    pub name: &'static str,
    pub tokens: f64,
    pub last_refill_ms: i64,
}

/// Distributed three-bucket token-bucket rate limiter
///
/// Shared across workers via `Arc`; all mutable state lives in the store.
pub struct RateLimiter {
    store: Arc<dyn BucketStore>,
    /// Buckets in check order: most restrictive first
    buckets: [(&'static str, BucketSettings); 3],
    key_prefix: String,
    stats: LimiterStats,
}

impl RateLimiter {
    /// Create a limiter over `store` with the configured bucket parameters
    pub fn new(store: Arc<dyn BucketStore>, config: &RateLimitsConfig) -> Self {
        Self {
            store,
            buckets: [
                ("per_second", config.per_second),
                ("per_minute", config.per_minute),
                ("per_hour", config.per_hour),
            ],
            key_prefix: config.key_prefix.clone(),
            stats: LimiterStats::default(),
        }
    }

    fn key(&self, bucket: &str) -> String {
        format!("{}:{}", self.key_prefix, bucket)
    }

    fn now_ms() -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as i64)
            .unwrap_or(0)
    }

    /// Attempt to take one token from every bucket
    ///
    /// All three buckets are always visited so a denial reports the maximum
    /// per-bucket wait; tokens granted by earlier buckets are not returned.
    pub async fn acquire(&self) -> Admission {
        let now_ms = Self::now_ms();
        let mut allowed = true;
        let mut max_wait_ms: u64 = 0;

        for (name, settings) in &self.buckets {
            match self.store.consume(&self.key(name), settings, now_ms).await {
                Ok(outcome) => {
                    if !outcome.allowed {
                        allowed = false;
                        max_wait_ms = max_wait_ms.max(outcome.wait_ms);
                        debug!(
                            bucket = name,
                            tokens = outcome.tokens,
                            wait_ms = outcome.wait_ms,
                            "Bucket denied token"
                        );
                    }
                }
                Err(e) => {
                    // Fail open: keep the pipeline alive on store blips.
                    warn!(bucket = name, error = %e, "Bucket store unreachable, failing open");
                    self.stats.fail_open.fetch_add(1, Ordering::Relaxed);
                }
            }
        }

        if allowed {
            self.stats.allowed.fetch_add(1, Ordering::Relaxed);
            Admission::allowed()
        } else {
            self.stats.denied.fetch_add(1, Ordering::Relaxed);
            Admission::denied(max_wait_ms)
        }
    }

    /// Block until a token is available or the deadline expires
    ///
    /// Loops `acquire`, sleeping the reported wait plus up to 50 ms of
    /// jitter between attempts. `deadline` defaults to
    /// [`DEFAULT_WAIT_DEADLINE`] (300 s).
    pub async fn wait_for_token(&self, deadline: Option<Duration>) -> Result<(), LimiterError> {
        let deadline = deadline.unwrap_or(DEFAULT_WAIT_DEADLINE);
        let start = tokio::time::Instant::now();

        loop {
            let admission = self.acquire().await;
            if admission.allowed {
                return Ok(());
            }

            let elapsed = start.elapsed();
            if elapsed >= deadline {
                return Err(LimiterError::DeadlineExceeded(deadline));
            }

            let jitter = Duration::from_millis(rand::thread_rng().gen_range(0..=WAIT_JITTER_MS));
            let sleep = (admission.wait + jitter).min(deadline - elapsed);
            debug!(wait_ms = sleep.as_millis() as u64, "Waiting for rate-limit token");
            tokio::time::sleep(sleep).await;
        }
    }

    /// Per-bucket `{tokens, last_refill}` without consuming
    ///
    /// Used by the health and sync-status endpoints.
    pub async fn status(&self) -> Result<Vec<BucketSnapshot>, LimiterError> {
        let now_ms = Self::now_ms();
        let mut snapshots = Vec::with_capacity(self.buckets.len());
        for (name, settings) in &self.buckets {
            let state: BucketState = self.store.peek(&self.key(name), settings, now_ms).await?;
            snapshots.push(BucketSnapshot {
                name,
                tokens: state.tokens,
                last_refill_ms: state.last_refill_ms,
            });
        }
        Ok(snapshots)
    }

    /// Admission counters since process start
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }
}
