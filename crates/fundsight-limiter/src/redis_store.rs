//! Redis bucket store
//!
//! Runs the read-refill-consume-write step as one Lua script invocation, so
//! concurrent workers can never overshoot a bucket's capacity: Redis
//! executes scripts serially. Bucket state is a hash of `tokens` (float) and
//! `last_refill` (epoch milliseconds) under the configured key prefix, with
//! a two-hour expiry refreshed on every touch.
//!
//! Script-cache misses (`NOSCRIPT`, e.g. after a server restart or failover)
//! are recovered by the client: `redis::Script` re-loads the script body and
//! retries the call once, so a reload never drops a refill.

use fundsight_core::config::BucketSettings;
use redis::aio::ConnectionManager;
use redis::Script;

use crate::bucket::BucketState;
use crate::store::{BucketStore, ConsumeOutcome};
use crate::LimiterError;

/// Bucket expiry: long enough to survive idle periods between hourly
/// refills, short enough to garbage-collect abandoned prefixes.
const BUCKET_TTL_MS: i64 = 2 * 60 * 60 * 1000;

/// The atomic consume step. Mirrors [`BucketState`](crate::bucket::BucketState)
/// exactly; any change there must be reflected here.
///
/// Returns `{allowed, tokens, wait_ms}` with `tokens` as a string because
/// Lua-to-Redis number conversion truncates to integer.
const CONSUME_SCRIPT: &str = r#"
local key = KEYS[1]
local capacity = tonumber(ARGV[1])
local refill_rate = tonumber(ARGV[2])
local interval_ms = tonumber(ARGV[3])
local now = tonumber(ARGV[4])
local ttl_ms = tonumber(ARGV[5])

local bucket = redis.call('HMGET', key, 'tokens', 'last_refill')
local tokens = tonumber(bucket[1])
local last_refill = tonumber(bucket[2])

if not tokens then
    tokens = capacity
    last_refill = now
end

local elapsed = now - last_refill
if elapsed < 0 then
    elapsed = 0
end
local added = math.floor(elapsed / interval_ms * refill_rate)
if added > 0 then
    tokens = math.min(capacity, tokens + added)
    last_refill = now
end

local allowed = 0
local wait_ms = 0
if tokens >= 1 then
    tokens = tokens - 1
    allowed = 1
else
    wait_ms = math.ceil((1 - tokens) / refill_rate * interval_ms)
end

redis.call('HMSET', key, 'tokens', tokens, 'last_refill', last_refill)
redis.call('PEXPIRE', key, ttl_ms)

return {allowed, tostring(tokens), wait_ms}
"#;

/// Redis-backed [`BucketStore`]
///
/// Holds a [`ConnectionManager`], which multiplexes one connection and
/// reconnects on failure; callers share the store via `Arc`.
pub struct RedisBucketStore {
    conn: ConnectionManager,
    script: Script,
}

impl RedisBucketStore {
    /// Connect to Redis at `url` (e.g. `redis://127.0.0.1:6379/`)
    pub async fn connect(url: &str) -> Result<Self, LimiterError> {
        let client = redis::Client::open(url)
            .map_err(|e| LimiterError::Store(format!("invalid redis url: {e}")))?;
        let conn = ConnectionManager::new(client)
            .await
            .map_err(|e| LimiterError::Store(format!("redis connect failed: {e}")))?;
        Ok(Self::with_connection(conn))
    }

    /// Build from an existing connection manager
    #[must_use]
    pub fn with_connection(conn: ConnectionManager) -> Self {
        Self {
            conn,
            script: Script::new(CONSUME_SCRIPT),
        }
    }
}

#[async_trait::async_trait]
impl BucketStore for RedisBucketStore {
    async fn consume(
        &self,
        key: &str,
        settings: &BucketSettings,
        now_ms: i64,
    ) -> Result<ConsumeOutcome, LimiterError> {
        let mut conn = self.conn.clone();
        let (allowed, tokens, wait_ms): (i64, String, i64) = self
            .script
            .key(key)
            .arg(settings.capacity)
            .arg(settings.refill_rate)
            .arg(settings.interval_ms)
            .arg(now_ms)
            .arg(BUCKET_TTL_MS)
            .invoke_async(&mut conn)
            .await
            .map_err(|e| LimiterError::Store(format!("consume script failed: {e}")))?;

        let tokens: f64 = tokens
            .parse()
            .map_err(|e| LimiterError::Store(format!("bad tokens value '{tokens}': {e}")))?;

        Ok(ConsumeOutcome {
            allowed: allowed == 1,
            tokens,
            wait_ms: wait_ms.max(0) as u64,
        })
    }

    async fn peek(
        &self,
        key: &str,
        settings: &BucketSettings,
        now_ms: i64,
    ) -> Result<BucketState, LimiterError> {
        let mut conn = self.conn.clone();
        let (tokens, last_refill): (Option<f64>, Option<i64>) = redis::cmd("HMGET")
            .arg(key)
            .arg("tokens")
            .arg("last_refill")
            .query_async(&mut conn)
            .await
            .map_err(|e| LimiterError::Store(format!("peek failed: {e}")))?;

        let mut state = match (tokens, last_refill) {
            (Some(tokens), Some(last_refill_ms)) => BucketState {
                tokens,
                last_refill_ms,
            },
            _ => BucketState::full(settings, now_ms),
        };
        // Readers see the refilled view without writing it back
        state.refill(settings, now_ms);
        Ok(state)
    }
}
