//! Token bucket arithmetic.

use std::time::Duration;

use crowdprice_primitives::Timestamp;

/// Absorbs float error so that `C/r` seconds of refill always yields `C` tokens.
const EPSILON: f64 = 1e-9;

/// Cost of one vote.
const VOTE_COST: f64 = 1.0;

/// Capacity and refill rate shared by every bucket of one kind.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BucketParams {
    /// Maximum tokens held.
    pub capacity: f64,
    /// Tokens added per second.
    pub refill_rate: f64,
}

impl BucketParams {
    pub fn new(capacity: f64, refill_rate: f64) -> Self {
        Self {
            capacity,
            refill_rate,
        }
    }
}

/// A single token bucket.
///
/// `tokens` always stays within `[0, capacity]` and `last_refill` never moves
/// backwards, so a clock anomaly can neither drain nor double-fill a bucket.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TokenBucket {
    tokens: f64,
    last_refill: Timestamp,
}

impl TokenBucket {
    /// A bucket holding its full capacity.
    pub fn full(params: &BucketParams, now: Timestamp) -> Self {
        Self {
            tokens: params.capacity,
            last_refill: now,
        }
    }

    pub fn tokens(&self) -> f64 {
        self.tokens
    }

    pub fn last_refill(&self) -> Timestamp {
        self.last_refill
    }

    /// Add `rate * elapsed` tokens, up to capacity.
    pub fn refill(&mut self, params: &BucketParams, now: Timestamp) {
        let elapsed = now.saturating_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + params.refill_rate * elapsed).min(params.capacity);
        self.last_refill = self.last_refill.max(now);
    }

    /// Refill, then take one token. On failure returns how long until one
    /// token is available.
    pub fn try_consume(&mut self, params: &BucketParams, now: Timestamp) -> Result<(), Duration> {
        self.refill(params, now);

        if self.tokens + EPSILON >= VOTE_COST {
            self.tokens = (self.tokens - VOTE_COST).max(0.0);
            Ok(())
        } else {
            Err(self.time_until_available(params))
        }
    }

    /// Give back a token taken by [`Self::try_consume`].
    pub fn refund(&mut self, params: &BucketParams) {
        self.tokens = (self.tokens + VOTE_COST).min(params.capacity);
    }

    fn time_until_available(&self, params: &BucketParams) -> Duration {
        let missing = (VOTE_COST - self.tokens).max(0.0);
        Duration::try_from_secs_f64(missing / params.refill_rate).unwrap_or(Duration::MAX)
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn params() -> BucketParams {
        BucketParams::new(3.0, 1.0)
    }

    #[test]
    fn test_new_bucket_is_full() {
        let bucket = TokenBucket::full(&params(), Timestamp::from_secs(5));
        assert_eq!(bucket.tokens(), 3.0);
    }

    #[test]
    fn test_refill_caps_at_capacity() {
        let mut bucket = TokenBucket::full(&params(), Timestamp::ZERO);
        bucket.try_consume(&params(), Timestamp::ZERO).unwrap();
        bucket.refill(&params(), Timestamp::from_secs(3600));
        assert_eq!(bucket.tokens(), 3.0);
    }

    #[test]
    fn test_retry_after_reflects_deficit() {
        let params = BucketParams::new(1.0, 0.5);
        let mut bucket = TokenBucket::full(&params, Timestamp::ZERO);
        bucket.try_consume(&params, Timestamp::ZERO).unwrap();

        let retry_after = bucket
            .try_consume(&params, Timestamp::from_millis(1000))
            .unwrap_err();
        // 0.5 tokens refilled, 0.5 missing at 0.5 tokens/s.
        assert_eq!(retry_after, Duration::from_secs(1));
    }

    #[test]
    fn test_backward_clock_does_not_drain_or_refill() {
        let mut bucket = TokenBucket::full(&params(), Timestamp::from_secs(10));
        bucket.try_consume(&params(), Timestamp::from_secs(10)).unwrap();

        bucket.refill(&params(), Timestamp::from_secs(4));
        assert_eq!(bucket.tokens(), 2.0);
        assert_eq!(bucket.last_refill(), Timestamp::from_secs(10));

        // Time between 4s and 10s must not be credited twice.
        bucket.refill(&params(), Timestamp::from_secs(11));
        assert_eq!(bucket.tokens(), 3.0);
    }

    #[test]
    fn test_refund_restores_token() {
        let mut bucket = TokenBucket::full(&params(), Timestamp::ZERO);
        bucket.try_consume(&params(), Timestamp::ZERO).unwrap();
        bucket.refund(&params());
        assert_eq!(bucket.tokens(), 3.0);
    }

    proptest! {
        #[test]
        fn proptest_tokens_stay_in_range(
            capacity in 1.0f64..50.0,
            rate in 0.01f64..20.0,
            steps in prop::collection::vec(-5_000i64..5_000, 1..200),
        ) {
            let params = BucketParams::new(capacity, rate);
            let mut now: u64 = 1_000_000;
            let mut bucket = TokenBucket::full(&params, Timestamp::from_millis(now));

            for step in steps {
                now = now.saturating_add_signed(step);
                let _ = bucket.try_consume(&params, Timestamp::from_millis(now));
                prop_assert!(bucket.tokens() >= 0.0);
                prop_assert!(bucket.tokens() <= capacity);
            }
        }
    }
}
