//! Bucket store capability trait and the in-process backend
//!
//! The limiter is polymorphic over where bucket state lives. The capability
//! it needs is small: execute the read-refill-consume-write step atomically
//! for one key, and read a bucket without consuming. The Redis backend
//! satisfies atomicity with a server-side script; the in-process backend
//! holds a mutex across the step (single-process deployments and tests).

use std::collections::HashMap;
use std::sync::Mutex;

use fundsight_core::config::BucketSettings;

use crate::bucket::BucketState;
use crate::LimiterError;

/// Result of one atomic consume step against a bucket
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConsumeOutcome {
    /// Whether a token was taken
    pub allowed: bool,
    /// Tokens remaining after the step
    pub tokens: f64,
    /// On denial, milliseconds until one token is available
    pub wait_ms: u64,
}

/// Storage backend for rate-limiter buckets
///
/// `now_ms` is supplied by the caller so that all three buckets of one
/// acquire share a single timestamp and tests can pin the clock.
#[async_trait::async_trait]
pub trait BucketStore: Send + Sync {
    /// Atomically refill the bucket at `key` and try to consume one token
    ///
    /// A missing bucket initializes full. The refilled (and possibly
    /// decremented) state is written back and its expiry refreshed.
    async fn consume(
        &self,
        key: &str,
        settings: &BucketSettings,
        now_ms: i64,
    ) -> Result<ConsumeOutcome, LimiterError>;

    /// Read the bucket at `key` as of `now_ms` without consuming
    async fn peek(
        &self,
        key: &str,
        settings: &BucketSettings,
        now_ms: i64,
    ) -> Result<BucketState, LimiterError>;
}

/// In-process bucket store
///
/// A mutex-guarded map. Atomicity of the consume step follows from holding
/// the lock across it. State is lost on restart, which is acceptable for
/// the single-process deployments and tests this backend serves.
#[derive(Debug, Default)]
pub struct MemoryBucketStore {
    buckets: Mutex<HashMap<String, BucketState>>,
}

impl MemoryBucketStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl BucketStore for MemoryBucketStore {
    async fn consume(
        &self,
        key: &str,
        settings: &BucketSettings,
        now_ms: i64,
    ) -> Result<ConsumeOutcome, LimiterError> {
        let mut buckets = self
            .buckets
            .lock()
            .map_err(|e| LimiterError::Store(format!("bucket map poisoned: {e}")))?;

        let state = buckets
            .entry(key.to_string())
            .or_insert_with(|| BucketState::full(settings, now_ms));

        state.refill(settings, now_ms);
        if state.try_consume() {
            Ok(ConsumeOutcome {
                allowed: true,
                tokens: state.tokens,
                wait_ms: 0,
            })
        } else {
            Ok(ConsumeOutcome {
                allowed: false,
                tokens: state.tokens,
                wait_ms: state.wait_ms(settings),
            })
        }
    }

    async fn peek(
        &self,
        key: &str,
        settings: &BucketSettings,
        now_ms: i64,
    ) -> Result<BucketState, LimiterError> {
        let buckets = self
            .buckets
            .lock()
            .map_err(|e| LimiterError::Store(format!("bucket map poisoned: {e}")))?;

        let mut state = buckets
            .get(key)
            .copied()
            .unwrap_or_else(|| BucketState::full(settings, now_ms));
        state.refill(settings, now_ms);
        Ok(state)
    }
}
