//! Token-bucket arithmetic
//!
//! Pure state-transition functions shared by every store backend. The Redis
//! backend mirrors exactly this logic in its Lua script; keeping the Rust
//! copy authoritative lets the in-process backend and the tests exercise the
//! same semantics without a server.

use std::time::Duration;

use fundsight_core::config::BucketSettings;

/// Persisted state of a single bucket
///
/// `tokens` is real-valued: refills add whole tokens but the field mirrors
/// the store representation, which is a float hash field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BucketState {
    /// Currently available tokens
    pub tokens: f64,
    /// Epoch milliseconds of the last refill that actually added tokens
    pub last_refill_ms: i64,
}

impl BucketState {
    /// A freshly initialized bucket: full, refill clock starting now
    #[must_use]
    pub fn full(settings: &BucketSettings, now_ms: i64) -> Self {
        Self {
            tokens: f64::from(settings.capacity),
            last_refill_ms: now_ms,
        }
    }

    /// Apply the refill rule at time `now_ms`
    ///
    /// `tokens_to_add = floor(elapsed / interval_ms × refill_rate)`, capped
    /// at capacity. `last_refill_ms` only advances when tokens were actually
    /// added, so fractional progress toward the next token is never lost.
    pub fn refill(&mut self, settings: &BucketSettings, now_ms: i64) {
        let elapsed = (now_ms - self.last_refill_ms).max(0);
        let added =
            (elapsed as f64 / settings.interval_ms as f64 * settings.refill_rate).floor();
        if added > 0.0 {
            self.tokens = (self.tokens + added).min(f64::from(settings.capacity));
            self.last_refill_ms = now_ms;
        }
    }

    /// Try to take one token; returns whether it was taken
    pub fn try_consume(&mut self) -> bool {
        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// Milliseconds until one token is available at the bucket's refill rate
    ///
    /// `ceil((1 − tokens) / refill_rate × interval_ms)`; zero when a token
    /// is already available.
    #[must_use]
    pub fn wait_ms(&self, settings: &BucketSettings) -> u64 {
        if self.tokens >= 1.0 {
            return 0;
        }
        let deficit = 1.0 - self.tokens;
        (deficit / settings.refill_rate * settings.interval_ms as f64).ceil() as u64
    }
}

/// Verdict of a three-bucket acquire attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Admission {
    /// Whether every bucket yielded a token
    pub allowed: bool,
    /// On denial, the maximum per-bucket wait; zero when allowed
    pub wait: Duration,
}

impl Admission {
    pub(crate) fn allowed() -> Self {
        Self {
            allowed: true,
            wait: Duration::ZERO,
        }
    }

    pub(crate) fn denied(wait_ms: u64) -> Self {
        Self {
            allowed: false,
            wait: Duration::from_millis(wait_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn per_second() -> BucketSettings {
        BucketSettings {
            capacity: 2,
            refill_rate: 2.0,
            interval_ms: 1_000,
        }
    }

    fn per_hour() -> BucketSettings {
        BucketSettings {
            capacity: 300,
            refill_rate: 300.0,
            interval_ms: 3_600_000,
        }
    }

    #[test]
    fn fresh_bucket_is_full() {
        let state = BucketState::full(&per_second(), 1_000);
        assert_eq!(state.tokens, 2.0);
        assert_eq!(state.last_refill_ms, 1_000);
    }

    #[test]
    fn consume_decrements_until_empty() {
        let mut state = BucketState::full(&per_second(), 0);
        assert!(state.try_consume());
        assert!(state.try_consume());
        assert!(!state.try_consume());
        assert_eq!(state.tokens, 0.0);
    }

    #[test]
    fn refill_adds_floor_of_elapsed_fraction() {
        let settings = per_second();
        let mut state = BucketState::full(&settings, 0);
        state.try_consume();
        state.try_consume();

        // 400 ms at 2 tokens/sec = 0.8 tokens -> floor = 0, clock untouched
        state.refill(&settings, 400);
        assert_eq!(state.tokens, 0.0);
        assert_eq!(state.last_refill_ms, 0);

        // 600 ms = 1.2 tokens -> floor = 1, clock advances
        state.refill(&settings, 600);
        assert_eq!(state.tokens, 1.0);
        assert_eq!(state.last_refill_ms, 600);
    }

    #[test]
    fn refill_caps_at_capacity() {
        let settings = per_second();
        let mut state = BucketState::full(&settings, 0);
        state.try_consume();

        // A long silence refills far more than one token; cap applies
        state.refill(&settings, 60_000);
        assert_eq!(state.tokens, 2.0);
    }

    #[test]
    fn drained_bucket_accepts_capacity_after_full_interval() {
        let settings = per_second();
        let mut state = BucketState::full(&settings, 0);
        assert!(state.try_consume());
        assert!(state.try_consume());
        assert!(!state.try_consume());

        state.refill(&settings, settings.interval_ms as i64);
        assert!(state.try_consume());
        assert!(state.try_consume());
        assert!(!state.try_consume());
    }

    #[test]
    fn wait_is_half_interval_for_two_per_second() {
        let settings = per_second();
        let mut state = BucketState::full(&settings, 0);
        state.try_consume();
        state.try_consume();
        assert_eq!(state.wait_ms(&settings), 500);
    }

    #[test]
    fn wait_is_zero_when_token_available() {
        let settings = per_second();
        let state = BucketState::full(&settings, 0);
        assert_eq!(state.wait_ms(&settings), 0);
    }

    #[test]
    fn hourly_bucket_wait_is_twelve_seconds() {
        let settings = per_hour();
        let mut state = BucketState::full(&settings, 0);
        for _ in 0..300 {
            assert!(state.try_consume());
        }
        // 1 token / (300 per 3 600 000 ms) = 12 000 ms
        assert_eq!(state.wait_ms(&settings), 12_000);
    }

    #[test]
    fn clock_skew_does_not_refill() {
        let settings = per_second();
        let mut state = BucketState::full(&settings, 1_000);
        state.try_consume();
        // now earlier than last_refill: elapsed clamps to zero
        state.refill(&settings, 500);
        assert_eq!(state.tokens, 1.0);
        assert_eq!(state.last_refill_ms, 1_000);
    }
}
