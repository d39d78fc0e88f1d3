//! Default constants for every configuration field.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

// Price
pub(crate) const DEFAULT_INITIAL_PRICE: Decimal = dec!(1000);
pub(crate) const DEFAULT_MIN_PRICE: Decimal = dec!(1);
pub(crate) const DEFAULT_MAX_PRICE: Decimal = dec!(1000000);
pub(crate) const DEFAULT_STEP_SIZE: Decimal = dec!(10);
pub(crate) const DEFAULT_MAX_SINGLE_STEP_DELTA: Decimal = dec!(100);

// Rate limiting (tokens, tokens per second)
pub(crate) const DEFAULT_PER_USER_CAPACITY: f64 = 10.0;
pub(crate) const DEFAULT_PER_USER_REFILL_RATE: f64 = 1.0;
pub(crate) const DEFAULT_GLOBAL_CAPACITY: f64 = 200.0;
pub(crate) const DEFAULT_GLOBAL_REFILL_RATE: f64 = 50.0;

// Weighting
pub(crate) const DEFAULT_BASE_MULTIPLIER: f64 = 1.0;
pub(crate) const DEFAULT_REPUTATION_FACTOR: f64 = 0.5;
pub(crate) const DEFAULT_MIN_MULTIPLIER: f64 = 0.1;
pub(crate) const DEFAULT_MAX_MULTIPLIER: f64 = 2.0;
pub(crate) const DEFAULT_FLAGGED_DAMPENING: f64 = 0.5;
/// Lifetime score counts for a third, session score for two thirds.
pub(crate) const DEFAULT_LIFETIME_SHARE: f64 = 1.0 / 3.0;
pub(crate) const DEFAULT_SATURATION_HALF_POINT: f64 = 25.0;

// Reputation
pub(crate) const DEFAULT_SCORE_REWARD: f64 = 1.0;
pub(crate) const DEFAULT_MIN_SCORE: f64 = -1_000.0;
pub(crate) const DEFAULT_MAX_SCORE: f64 = 10_000.0;
pub(crate) const DEFAULT_TRUSTED_THRESHOLD: f64 = 500.0;
pub(crate) const DEFAULT_FLAGGED_THRESHOLD: f64 = -20.0;
pub(crate) const DEFAULT_FLAGGED_PENALTY_COUNT: u32 = 5;

// Input validation
pub(crate) const DEFAULT_MAX_USER_ID_LEN: usize = 50;
pub(crate) const DEFAULT_MAX_FUTURE_SKEW_MS: u64 = 60_000;
pub(crate) const DEFAULT_MAX_SET_VALUE: Decimal = dec!(1000000);

// Persistence retry
pub(crate) const DEFAULT_MAX_RETRIES: u32 = 3;
pub(crate) const DEFAULT_BACKOFF_MIN_MS: u64 = 1_000;
pub(crate) const DEFAULT_BACKOFF_MAX_MS: u64 = 10_000;
pub(crate) const DEFAULT_BACKOFF_MULTIPLIER: f64 = 2.0;

// Classifier boundary
pub(crate) const DEFAULT_MAX_MESSAGE_LEN: usize = 500;
pub(crate) const DEFAULT_IGNORE_INCREMENT: f64 = 0.33;
pub(crate) const DEFAULT_IGNORE_CAPACITY: usize = 1_024;

// Events
pub(crate) const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 256;

// Logging
pub(crate) const DEFAULT_LOG_MAX_FILE_SIZE_MB: u64 = 10;
pub(crate) const DEFAULT_LOG_MAX_FILES: usize = 5;
