//! Structural checks on incoming intents.

use crowdprice_config::ValidationConfig;
use crowdprice_primitives::{Timestamp, VoteIntent, VoteKind};
use rust_decimal::Decimal;

use crate::InvalidInput;

/// Check `intent` against `config` as seen at `now`.
pub(crate) fn validate_intent(
    intent: &VoteIntent,
    config: &ValidationConfig,
    now: Timestamp,
) -> Result<(), InvalidInput> {
    if intent.user.is_empty() {
        return Err(InvalidInput::EmptyUserId);
    }

    let len = intent.user.char_len();
    if len > config.max_user_id_len {
        return Err(InvalidInput::UserIdTooLong {
            len,
            max: config.max_user_id_len,
        });
    }

    if !intent.confidence.is_finite() {
        return Err(InvalidInput::NonFiniteConfidence);
    }

    if let VoteKind::Set(value) = intent.kind
        && (value < Decimal::ZERO || value > config.max_set_value)
    {
        return Err(InvalidInput::SetValueOutOfRange {
            value,
            max: config.max_set_value,
        });
    }

    let ahead = intent.timestamp.saturating_since(now);
    if ahead.as_millis() > u128::from(config.max_future_skew_ms) {
        return Err(InvalidInput::TimestampInFuture { ahead });
    }

    Ok(())
}
