use crowdprice_primitives::{Direction, Timestamp, UserId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One applied vote.
///
/// Recorded for every vote that reached the price state, including those the
/// bounds absorbed completely.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Position in the total order of applies. Strictly increasing for the
    /// lifetime of a [`crate::PriceState`], across session resets.
    pub seq: u64,
    pub timestamp: Timestamp,
    /// Delta the weight asked for.
    pub requested_delta: Decimal,
    /// Delta actually applied after clamping.
    pub applied_delta: Decimal,
    pub resulting_price: Decimal,
    pub voter: UserId,
}

impl HistoryEntry {
    pub fn previous_price(&self) -> Decimal {
        self.resulting_price - self.applied_delta
    }

    pub fn direction(&self) -> Direction {
        Direction::of(self.applied_delta)
    }

    /// Whether the bounds cut the requested movement short.
    pub fn was_clamped(&self) -> bool {
        self.requested_delta != self.applied_delta
    }
}
