//! Outbound engine events and non-blocking broadcast emitter.

use std::time::Duration;

use crowdprice_primitives::{Timestamp, UserId, VoteKind};
use crowdprice_ratelimiter::RateLimitDenied;
use rust_decimal::Decimal;
use serde::Serialize;
use tokio::sync::broadcast;

/// Events for the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EngineEvent {
    /// A vote moved through the price state.
    VoteApplied {
        seq: u64,
        user: UserId,
        kind: VoteKind,
        previous_price: Decimal,
        resulting_price: Decimal,
        delta: Decimal,
        timestamp: Timestamp,
    },
    /// A vote was refused by the rate limiter.
    VoteDenied {
        user: UserId,
        kind: VoteKind,
        #[serde(skip)]
        reason: RateLimitDenied,
        retry_after: Duration,
        timestamp: Timestamp,
    },
    /// The session restarted from the initial price.
    SessionReset { price: Decimal, timestamp: Timestamp },
}

impl EngineEvent {
    pub fn user(&self) -> Option<&UserId> {
        match self {
            Self::VoteApplied { user, .. } | Self::VoteDenied { user, .. } => Some(user),
            Self::SessionReset { .. } => None,
        }
    }

    pub fn timestamp(&self) -> Timestamp {
        match self {
            Self::VoteApplied { timestamp, .. }
            | Self::VoteDenied { timestamp, .. }
            | Self::SessionReset { timestamp, .. } => *timestamp,
        }
    }
}

/// Non-blocking broadcast emitter. Slow subscribers drop events independently.
#[derive(Debug, Clone)]
pub struct EventEmitter {
    tx: broadcast::Sender<EngineEvent>,
}

impl EventEmitter {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Send to every current subscriber. Having none is not an error.
    pub fn emit(&self, event: EngineEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}
