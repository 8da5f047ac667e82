//! Fundsight Limiter - distributed upstream admission control
//!
//! The upstream NAV API enforces per-second, per-minute, and per-hour
//! request quotas. This crate keeps every worker under those quotas with a
//! three-bucket token bucket whose state lives in a shared key-value store,
//! so admission is bounded across processes, not just within one.
//!
//! ## Architecture
//!
//! - [`bucket`] - pure token-bucket arithmetic shared by every backend
//! - [`store`] - the [`BucketStore`](store::BucketStore) capability trait and
//!   an in-process backend
//! - [`redis_store`] - Redis backend running the read-refill-consume-write
//!   step as one server-side Lua script
//! - [`limiter`] - the [`RateLimiter`](limiter::RateLimiter) facade:
//!   `acquire`, `wait_for_token`, `status`
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use fundsight_core::config::RateLimitsConfig;
//! use fundsight_limiter::{MemoryBucketStore, RateLimiter};
//!
//! # async fn example() -> Result<(), fundsight_limiter::LimiterError> {
//! let store = Arc::new(MemoryBucketStore::new());
//! let limiter = RateLimiter::new(store, &RateLimitsConfig::default());
//! limiter.wait_for_token(None).await?;
//! // ... issue the upstream request ...
//! # Ok(())
//! # }
//! ```

pub mod bucket;
pub mod limiter;
pub mod redis_store;
pub mod store;

use std::time::Duration;

use thiserror::Error;

pub use bucket::{Admission, BucketState};
pub use limiter::{BucketSnapshot, LimiterStats, RateLimiter, StatsSnapshot};
pub use redis_store::RedisBucketStore;
pub use store::{BucketStore, ConsumeOutcome, MemoryBucketStore};

/// Errors produced by the rate limiter
#[derive(Debug, Error)]
pub enum LimiterError {
    /// The shared bucket store could not be reached or misbehaved
    #[error("bucket store error: {0}")]
    Store(String),

    /// `wait_for_token` gave up before a token became available
    #[error("no rate-limit token within {0:?}")]
    DeadlineExceeded(Duration),
}
