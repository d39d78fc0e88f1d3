//! The bounded, serialised price.

use crowdprice_config::PriceConfig;
use crowdprice_primitives::{Timestamp, UserId};
use crowdprice_weight::VoteWeight;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::HistoryEntry;

/// Copy of the price state at one instant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceSnapshot {
    pub current: Decimal,
    pub min_price: Decimal,
    pub max_price: Decimal,
    pub history: Vec<HistoryEntry>,
}

#[derive(Debug)]
struct Inner {
    current: Decimal,
    history: Vec<HistoryEntry>,
    next_seq: u64,
}

/// Current price plus its append-only history, for one session.
///
/// `current` and `history` sit behind a single lock: an apply reads, clamps,
/// writes and records without any other apply interleaving, and every
/// reader sees either all of an apply or none of it.
#[derive(Debug)]
pub struct PriceState {
    config: PriceConfig,
    inner: Mutex<Inner>,
}

impl PriceState {
    /// Start a session at the configured initial price.
    ///
    /// The configuration is expected to be validated, so the initial price
    /// lies within the bounds.
    pub fn new(config: PriceConfig) -> Self {
        let current = bound(config.initial_price, &config);
        Self {
            config,
            inner: Mutex::new(Inner {
                current,
                history: Vec::new(),
                next_seq: 1,
            }),
        }
    }

    pub fn config(&self) -> &PriceConfig {
        &self.config
    }

    pub fn current(&self) -> Decimal {
        self.inner.lock().current
    }

    pub fn min_price(&self) -> Decimal {
        self.config.min_price
    }

    pub fn max_price(&self) -> Decimal {
        self.config.max_price
    }

    /// Apply `weight` on behalf of `voter` and record it.
    pub fn apply(&self, weight: &VoteWeight, voter: &UserId, now: Timestamp) -> HistoryEntry {
        self.apply_with(weight, voter, now, |_| ()).0
    }

    /// Apply `weight` and run `commit` before releasing the lock.
    ///
    /// Whatever `commit` does is ordered exactly like the history: if entry
    /// `a` precedes entry `b`, `commit` for `a` finished before `commit` for
    /// `b` started. `commit` must not call back into this state.
    pub fn apply_with<R>(
        &self,
        weight: &VoteWeight,
        voter: &UserId,
        now: Timestamp,
        commit: impl FnOnce(&HistoryEntry) -> R,
    ) -> (HistoryEntry, R) {
        let mut inner = self.inner.lock();

        let previous = inner.current;
        let requested_delta = weight.requested_delta(previous, self.config.step_size);
        let resulting_price = self.clamp(previous, requested_delta);

        let entry = HistoryEntry {
            seq: inner.next_seq,
            timestamp: now,
            requested_delta,
            applied_delta: resulting_price - previous,
            resulting_price,
            voter: voter.clone(),
        };

        inner.current = resulting_price;
        inner.next_seq += 1;
        inner.history.push(entry.clone());

        trace!(
            seq = entry.seq,
            %voter,
            %previous,
            price = %resulting_price,
            "price applied"
        );

        let committed = commit(&entry);
        (entry, committed)
    }

    fn clamp(&self, current: Decimal, delta: Decimal) -> Decimal {
        bound(current.saturating_add(delta), &self.config)
    }

    /// Entries in application order.
    pub fn history(&self) -> Vec<HistoryEntry> {
        self.inner.lock().history.clone()
    }

    /// Entries with `seq` greater than `seq`.
    pub fn history_since(&self, seq: u64) -> Vec<HistoryEntry> {
        let inner = self.inner.lock();
        let start = inner.history.partition_point(|entry| entry.seq <= seq);
        inner.history.get(start..).map(<[_]>::to_vec).unwrap_or_default()
    }

    pub fn history_len(&self) -> usize {
        self.inner.lock().history.len()
    }

    /// Sequence number the next apply will receive.
    pub fn next_seq(&self) -> u64 {
        self.inner.lock().next_seq
    }

    /// Continue numbering after `seq`, e.g. after a restart, so new entries
    /// are never mistaken for ones already persisted.
    pub fn resume_after(&self, seq: u64) {
        let mut inner = self.inner.lock();
        inner.next_seq = inner.next_seq.max(seq.saturating_add(1));
    }

    pub fn snapshot(&self) -> PriceSnapshot {
        let inner = self.inner.lock();
        PriceSnapshot {
            current: inner.current,
            min_price: self.config.min_price,
            max_price: self.config.max_price,
            history: inner.history.clone(),
        }
    }

    /// Session boundary: back to the initial price with an empty history.
    /// Sequence numbers keep increasing.
    pub fn reset(&self) -> Decimal {
        self.reset_with(|price| price)
    }

    /// Reset and run `f` with the new price before releasing the lock, so no
    /// apply can interleave with whatever else the session boundary resets.
    pub fn reset_with<R>(&self, f: impl FnOnce(Decimal) -> R) -> R {
        let mut inner = self.inner.lock();
        inner.current = bound(self.config.initial_price, &self.config);
        inner.history.clear();
        debug!(price = %inner.current, next_seq = inner.next_seq, "price state reset");
        f(inner.current)
    }
}

fn bound(price: Decimal, config: &PriceConfig) -> Decimal {
    price.max(config.min_price).min(config.max_price)
}
