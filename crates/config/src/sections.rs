//! Configuration sections, one per engine component.

use std::path::PathBuf;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::constants::*;
use crate::error::ConfigError;

/// Price bounds and movement granularity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PriceConfig {
    /// Price at session start and after every session reset.
    pub initial_price: Decimal,
    pub min_price: Decimal,
    pub max_price: Decimal,
    /// Price change for a vote of multiplier 1.
    pub step_size: Decimal,
    /// Largest jump a single SET vote may cause.
    pub max_single_step_delta: Decimal,
}

impl Default for PriceConfig {
    fn default() -> Self {
        Self {
            initial_price: DEFAULT_INITIAL_PRICE,
            min_price: DEFAULT_MIN_PRICE,
            max_price: DEFAULT_MAX_PRICE,
            step_size: DEFAULT_STEP_SIZE,
            max_single_step_delta: DEFAULT_MAX_SINGLE_STEP_DELTA,
        }
    }
}

impl PriceConfig {
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.min_price > self.max_price {
            return Err(ConfigError::InvalidPriceBounds {
                min: self.min_price,
                max: self.max_price,
            });
        }
        if self.initial_price < self.min_price || self.initial_price > self.max_price {
            return Err(ConfigError::InitialPriceOutOfBounds {
                initial: self.initial_price,
                min: self.min_price,
                max: self.max_price,
            });
        }
        positive_decimal("price.step_size", self.step_size)?;
        positive_decimal("price.max_single_step_delta", self.max_single_step_delta)
    }
}

/// Token bucket parameters. Capacities are in tokens, rates in tokens per second.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    pub per_user_capacity: f64,
    pub per_user_refill_rate: f64,
    pub global_capacity: f64,
    pub global_refill_rate: f64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            per_user_capacity: DEFAULT_PER_USER_CAPACITY,
            per_user_refill_rate: DEFAULT_PER_USER_REFILL_RATE,
            global_capacity: DEFAULT_GLOBAL_CAPACITY,
            global_refill_rate: DEFAULT_GLOBAL_REFILL_RATE,
        }
    }
}

impl RateLimitConfig {
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        // A bucket smaller than one token could never admit a vote.
        in_range("rate_limit.per_user_capacity", self.per_user_capacity, 1.0, f64::MAX)?;
        positive("rate_limit.per_user_refill_rate", self.per_user_refill_rate)?;
        in_range("rate_limit.global_capacity", self.global_capacity, 1.0, f64::MAX)?;
        positive("rate_limit.global_refill_rate", self.global_refill_rate)
    }
}

/// Shape of the curve mapping a raw reputation score into `[-1, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum SaturationCurve {
    /// `score / (|score| + half_point)`: reaches 0.5 at `half_point`.
    Rational { half_point: f64 },
    /// `tanh(score / scale)`.
    Tanh { scale: f64 },
    /// `clamp(score / full_at, -1, 1)`.
    Linear { full_at: f64 },
}

impl Default for SaturationCurve {
    fn default() -> Self {
        Self::Rational {
            half_point: DEFAULT_SATURATION_HALF_POINT,
        }
    }
}

impl SaturationCurve {
    fn validate(&self) -> Result<(), ConfigError> {
        match *self {
            Self::Rational { half_point } => positive("weight.saturation.half_point", half_point),
            Self::Tanh { scale } => positive("weight.saturation.scale", scale),
            Self::Linear { full_at } => positive("weight.saturation.full_at", full_at),
        }
    }
}

/// Reputation-to-multiplier mapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeightConfig {
    pub base_multiplier: f64,
    pub reputation_factor: f64,
    pub min_multiplier: f64,
    pub max_multiplier: f64,
    /// Fixed multiplier for FLAGGED users.
    pub flagged_dampening: f64,
    /// Share of the lifetime score in the blended reputation; the session
    /// score receives the remainder.
    pub lifetime_share: f64,
    pub saturation: SaturationCurve,
}

/// The default `reputation_factor` of 0.5 rewards voting history from the
/// second vote on: with step 5 and the default curve a user's votes move the
/// price by 5, 5.096 and 5.185. Set the factor to 0 for flat steps.
impl Default for WeightConfig {
    fn default() -> Self {
        Self {
            base_multiplier: DEFAULT_BASE_MULTIPLIER,
            reputation_factor: DEFAULT_REPUTATION_FACTOR,
            min_multiplier: DEFAULT_MIN_MULTIPLIER,
            max_multiplier: DEFAULT_MAX_MULTIPLIER,
            flagged_dampening: DEFAULT_FLAGGED_DAMPENING,
            lifetime_share: DEFAULT_LIFETIME_SHARE,
            saturation: SaturationCurve::default(),
        }
    }
}

impl WeightConfig {
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        finite("weight.base_multiplier", self.base_multiplier)?;
        in_range("weight.reputation_factor", self.reputation_factor, 0.0, f64::MAX)?;
        in_range("weight.min_multiplier", self.min_multiplier, 0.0, f64::MAX)?;
        finite("weight.max_multiplier", self.max_multiplier)?;
        ordered(
            ("weight.min_multiplier", self.min_multiplier),
            ("weight.max_multiplier", self.max_multiplier),
        )?;
        in_range(
            "weight.flagged_dampening",
            self.flagged_dampening,
            0.0,
            self.max_multiplier,
        )?;
        in_range("weight.lifetime_share", self.lifetime_share, 0.0, 1.0)?;
        self.saturation.validate()
    }
}

/// Score bounds, rewards and status thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReputationConfig {
    pub score_reward_per_accepted_vote: f64,
    pub min_score: f64,
    pub max_score: f64,
    /// Lifetime score at or above which a user is TRUSTED.
    pub trusted_threshold: f64,
    /// Lifetime score at or below which a user is FLAGGED.
    pub flagged_threshold: f64,
    /// Session penalties after which a user is FLAGGED regardless of score.
    pub flagged_penalty_count: u32,
}

impl Default for ReputationConfig {
    fn default() -> Self {
        Self {
            score_reward_per_accepted_vote: DEFAULT_SCORE_REWARD,
            min_score: DEFAULT_MIN_SCORE,
            max_score: DEFAULT_MAX_SCORE,
            trusted_threshold: DEFAULT_TRUSTED_THRESHOLD,
            flagged_threshold: DEFAULT_FLAGGED_THRESHOLD,
            flagged_penalty_count: DEFAULT_FLAGGED_PENALTY_COUNT,
        }
    }
}

impl ReputationConfig {
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        in_range(
            "reputation.score_reward_per_accepted_vote",
            self.score_reward_per_accepted_vote,
            0.0,
            f64::MAX,
        )?;
        finite("reputation.min_score", self.min_score)?;
        finite("reputation.max_score", self.max_score)?;
        ordered(
            ("reputation.min_score", self.min_score),
            ("reputation.max_score", self.max_score),
        )?;
        finite("reputation.trusted_threshold", self.trusted_threshold)?;
        finite("reputation.flagged_threshold", self.flagged_threshold)?;
        ordered(
            ("reputation.flagged_threshold", self.flagged_threshold),
            ("reputation.trusted_threshold", self.trusted_threshold),
        )?;
        if self.flagged_penalty_count == 0 {
            return Err(ConfigError::NotPositive {
                field: "reputation.flagged_penalty_count",
                value: "0".to_string(),
            });
        }
        Ok(())
    }
}

/// Structural checks applied to every vote intent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    pub max_user_id_len: usize,
    /// How far ahead of the engine clock an intent timestamp may be.
    pub max_future_skew_ms: u64,
    /// Largest target a SET vote may name.
    pub max_set_value: Decimal,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            max_user_id_len: DEFAULT_MAX_USER_ID_LEN,
            max_future_skew_ms: DEFAULT_MAX_FUTURE_SKEW_MS,
            max_set_value: DEFAULT_MAX_SET_VALUE,
        }
    }
}

impl ValidationConfig {
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.max_user_id_len == 0 {
            return Err(ConfigError::NotPositive {
                field: "validation.max_user_id_len",
                value: "0".to_string(),
            });
        }
        positive_decimal("validation.max_set_value", self.max_set_value)
    }
}

/// Retry policy of the persistence worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistenceConfig {
    pub max_retries: u32,
    pub backoff_min_ms: u64,
    pub backoff_max_ms: u64,
    pub backoff_multiplier: f64,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            backoff_min_ms: DEFAULT_BACKOFF_MIN_MS,
            backoff_max_ms: DEFAULT_BACKOFF_MAX_MS,
            backoff_multiplier: DEFAULT_BACKOFF_MULTIPLIER,
        }
    }
}

impl PersistenceConfig {
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        ordered(
            ("persistence.backoff_min_ms", self.backoff_min_ms as f64),
            ("persistence.backoff_max_ms", self.backoff_max_ms as f64),
        )?;
        in_range(
            "persistence.backoff_multiplier",
            self.backoff_multiplier,
            1.0,
            f64::MAX,
        )
    }
}

/// Boundary with the external message classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    pub max_message_len: usize,
    /// Ignore probability added each time the same message fails to classify.
    pub ignore_increment: f64,
    /// Distinct messages tracked on the ignore list; the least recently
    /// seen are forgotten first.
    pub ignore_capacity: usize,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            max_message_len: DEFAULT_MAX_MESSAGE_LEN,
            ignore_increment: DEFAULT_IGNORE_INCREMENT,
            ignore_capacity: DEFAULT_IGNORE_CAPACITY,
        }
    }
}

impl ClassifierConfig {
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.max_message_len == 0 {
            return Err(ConfigError::NotPositive {
                field: "classifier.max_message_len",
                value: "0".to_string(),
            });
        }
        if self.ignore_capacity == 0 {
            return Err(ConfigError::NotPositive {
                field: "classifier.ignore_capacity",
                value: "0".to_string(),
            });
        }
        in_range("classifier.ignore_increment", self.ignore_increment, 0.0, 1.0)
    }
}

/// Outbound effects channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventsConfig {
    pub channel_capacity: usize,
    /// Emit a notice when a vote is denied by the rate limiter.
    pub emit_denied_notices: bool,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            channel_capacity: DEFAULT_EVENT_CHANNEL_CAPACITY,
            emit_denied_notices: true,
        }
    }
}

impl EventsConfig {
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.channel_capacity == 0 {
            return Err(ConfigError::NotPositive {
                field: "events.channel_capacity",
                value: "0".to_string(),
            });
        }
        Ok(())
    }
}

/// Log verbosity.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

/// Logging output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: LogLevel,
    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
    /// Also write to a size-rotated file in this directory.
    pub log_dir: Option<PathBuf>,
    pub max_file_size_mb: u64,
    pub max_files: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::default(),
            json: false,
            log_dir: None,
            max_file_size_mb: DEFAULT_LOG_MAX_FILE_SIZE_MB,
            max_files: DEFAULT_LOG_MAX_FILES,
        }
    }
}

fn finite(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::NotFinite { field })
    }
}

fn positive(field: &'static str, value: f64) -> Result<(), ConfigError> {
    finite(field, value)?;
    if value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::NotPositive {
            field,
            value: value.to_string(),
        })
    }
}

fn positive_decimal(field: &'static str, value: Decimal) -> Result<(), ConfigError> {
    if value > Decimal::ZERO {
        Ok(())
    } else {
        Err(ConfigError::NotPositive {
            field,
            value: value.to_string(),
        })
    }
}

fn in_range(field: &'static str, value: f64, min: f64, max: f64) -> Result<(), ConfigError> {
    finite(field, value)?;
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            field,
            value,
            min,
            max,
        })
    }
}

fn ordered(lower: (&'static str, f64), upper: (&'static str, f64)) -> Result<(), ConfigError> {
    if lower.1 <= upper.1 {
        Ok(())
    } else {
        Err(ConfigError::InvertedRange {
            lower: lower.0,
            lower_value: lower.1,
            upper: upper.0,
            upper_value: upper.1,
        })
    }
}
