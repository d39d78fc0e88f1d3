use crowdprice_primitives::Direction;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Signed, reputation-scaled effect of one vote.
///
/// Transient: produced by the calculator and consumed by the price state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum VoteWeight {
    /// Move by `direction * magnitude * step_size`.
    Step {
        direction: Direction,
        magnitude: Decimal,
    },
    /// Move towards `price`, by at most `max_step`.
    Target { price: Decimal, max_step: Decimal },
}

impl VoteWeight {
    /// A weight that leaves the price where it is.
    pub const NEUTRAL: Self = Self::Step {
        direction: Direction::Neutral,
        magnitude: Decimal::ZERO,
    };

    /// Delta this weight asks for, before bounds clamping.
    pub fn requested_delta(&self, current: Decimal, step_size: Decimal) -> Decimal {
        match *self {
            Self::Step {
                direction,
                magnitude,
            } => magnitude.saturating_mul(step_size) * direction.as_decimal(),
            Self::Target { price, max_step } => {
                let max_step = max_step.abs();
                price.saturating_sub(current).clamp(-max_step, max_step)
            }
        }
    }

    /// Multiplier applied by a step weight; `None` for targets.
    pub fn magnitude(&self) -> Option<Decimal> {
        match self {
            Self::Step { magnitude, .. } => Some(*magnitude),
            Self::Target { .. } => None,
        }
    }
}
