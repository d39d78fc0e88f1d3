//! Vote pipeline metrics.

use metrics::{Counter, Gauge};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

use crate::VoteRejection;

/// Vote pipeline metrics. No-ops until a recorder is installed.
#[derive(Clone, Debug)]
pub(crate) struct VoteMetrics {
    /// Votes that moved through the price state
    pub(crate) accepted: Counter,
    /// NONE intents and skipped messages
    pub(crate) ignored: Counter,
    /// Current price
    pub(crate) price: Gauge,
    /// Records the persistence worker gave up on
    pub(crate) persistence_failed: Counter,
    /// Records the store already held at the same or a newer version
    pub(crate) persistence_stale: Counter,
}

impl Default for VoteMetrics {
    fn default() -> Self {
        Self {
            accepted: metrics::counter!("crowdprice.votes.accepted"),
            ignored: metrics::counter!("crowdprice.votes.ignored"),
            price: metrics::gauge!("crowdprice.price.current"),
            persistence_failed: metrics::counter!("crowdprice.persistence.failed"),
            persistence_stale: metrics::counter!("crowdprice.persistence.stale"),
        }
    }
}

impl VoteMetrics {
    pub(crate) fn record_accepted(&self, price: Decimal) {
        self.accepted.increment(1);
        self.set_price(price);
    }

    pub(crate) fn record_rejected(&self, rejection: &VoteRejection) {
        metrics::counter!("crowdprice.votes.rejected", "reason" => rejection.reason()).increment(1);
    }

    pub(crate) fn record_ignored(&self) {
        self.ignored.increment(1);
    }

    pub(crate) fn set_price(&self, price: Decimal) {
        self.price.set(price.to_f64().unwrap_or(0.0));
    }
}
