//! The vote pipeline.
//!
//! ```text
//! Received -> Validated -> RateChecked -> Weighted -> Applied -> Recorded
//!     \            \             \
//!      `------------`-------------`--> Rejected(reason)
//! ```
//!
//! Rejection is only possible before `Applied`. From `Applied` on, the
//! reputation update, the effects event and the persistence records all
//! happen inside the price critical section, so they share the history's
//! total order and cannot be abandoned half way.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crowdprice_config::{ConfigError, EngineConfig};
use crowdprice_price::{HistoryEntry, PriceState};
use crowdprice_primitives::{Timestamp, UserId, VoteIntent};
use crowdprice_ratelimiter::{Admission, RateLimiter};
use crowdprice_reputation::{ReputationChange, ReputationStore, UserReputation};
use crowdprice_weight::{VoteWeight, WeightCalculator};
use tracing::{debug, trace};

use crate::events::{EngineEvent, EventEmitter};
use crate::metrics::VoteMetrics;
use crate::persistence::{PersistenceHandle, PersistenceRecord};
use crate::validate::validate_intent;
use crate::VoteRejection;

/// Result of a vote that made it through the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct VoteReceipt {
    /// History entry recorded for the vote.
    pub entry: HistoryEntry,
    pub weight: VoteWeight,
    /// Voter reputation after the reward.
    pub reputation: UserReputation,
}

/// Non-error outcomes of [`VoteProcessor::process`].
#[derive(Debug, Clone, PartialEq)]
pub enum VoteOutcome {
    Applied(VoteReceipt),
    /// A NONE intent: dropped silently, nothing consumed.
    Ignored,
}

impl VoteOutcome {
    pub fn receipt(&self) -> Option<&VoteReceipt> {
        match self {
            Self::Applied(receipt) => Some(receipt),
            Self::Ignored => None,
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct Counters {
    pub(crate) accepted: AtomicU64,
    pub(crate) rejected: AtomicU64,
    pub(crate) ignored: AtomicU64,
}

/// Orchestrates validation, rate limiting, weighting and price application.
///
/// Safe to share between threads; [`Self::process`] may be called
/// concurrently.
#[derive(Debug)]
pub struct VoteProcessor {
    config: Arc<EngineConfig>,
    limiter: RateLimiter,
    reputation: ReputationStore,
    calculator: WeightCalculator,
    price: PriceState,
    events: EventEmitter,
    persistence: Option<PersistenceHandle>,
    metrics: VoteMetrics,
    counters: Counters,
}

impl VoteProcessor {
    /// Validate `config` and build a fresh session from it.
    pub fn new(config: EngineConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let processor = Self {
            limiter: RateLimiter::new(&config.rate_limit),
            reputation: ReputationStore::new(config.reputation.clone()),
            calculator: WeightCalculator::new(
                config.weight.clone(),
                config.price.max_single_step_delta,
            ),
            price: PriceState::new(config.price.clone()),
            events: EventEmitter::new(config.events.channel_capacity),
            persistence: None,
            metrics: VoteMetrics::default(),
            counters: Counters::default(),
            config: Arc::new(config),
        };
        processor.metrics.set_price(processor.price.current());

        Ok(processor)
    }

    /// Mirror every reputation and history change to `handle`.
    pub fn with_persistence(mut self, handle: PersistenceHandle) -> Self {
        self.persistence = Some(handle);
        self
    }

    /// Run `intent` through the pipeline at engine time `now`.
    pub fn process(&self, intent: &VoteIntent, now: Timestamp) -> Result<VoteOutcome, VoteRejection> {
        let user = &intent.user;

        if !intent.kind.is_vote() {
            self.counters.ignored.fetch_add(1, Ordering::Relaxed);
            self.metrics.record_ignored();
            trace!(%user, "ignoring non-vote intent");
            return Ok(VoteOutcome::Ignored);
        }

        // Received -> Validated
        if let Err(invalid) = validate_intent(intent, &self.config.validation, now) {
            return Err(self.reject(user, invalid.into()));
        }

        // Validated -> RateChecked
        if let Admission::Denied(denied) = self.limiter.check(user, now) {
            if self.config.events.emit_denied_notices {
                self.events.emit(EngineEvent::VoteDenied {
                    user: user.clone(),
                    kind: intent.kind,
                    reason: denied,
                    retry_after: denied.retry_after(),
                    timestamp: now,
                });
            }
            return Err(self.reject(user, denied.into()));
        }

        // RateChecked -> Weighted
        let reputation = self.reputation.read(user);
        let weight = self.calculator.compute(intent, &reputation);

        // Weighted -> Applied -> Recorded
        let (entry, reputation) = self
            .price
            .apply_with(&weight, user, now, |entry| self.record(intent, entry, now));

        self.counters.accepted.fetch_add(1, Ordering::Relaxed);
        self.metrics.record_accepted(entry.resulting_price);
        trace!(%user, kind = intent.kind.name(), price = %entry.resulting_price, "vote accepted");

        Ok(VoteOutcome::Applied(VoteReceipt {
            entry,
            weight,
            reputation,
        }))
    }

    /// Runs inside the price critical section.
    fn record(&self, intent: &VoteIntent, entry: &HistoryEntry, now: Timestamp) -> UserReputation {
        let reputation = self
            .reputation
            .update(&intent.user, ReputationChange::AcceptedVote, now);

        self.events.emit(EngineEvent::VoteApplied {
            seq: entry.seq,
            user: intent.user.clone(),
            kind: intent.kind,
            previous_price: entry.previous_price(),
            resulting_price: entry.resulting_price,
            delta: entry.applied_delta,
            timestamp: entry.timestamp,
        });

        self.persist(PersistenceRecord::PriceHistory(vec![entry.clone()]));
        self.persist(PersistenceRecord::Reputation(reputation.clone()));

        reputation
    }

    fn reject(&self, user: &UserId, rejection: VoteRejection) -> VoteRejection {
        self.counters.rejected.fetch_add(1, Ordering::Relaxed);
        self.metrics.record_rejected(&rejection);
        debug!(%user, %rejection, "vote rejected");
        rejection
    }

    /// Apply a moderation penalty to `user`.
    pub fn penalize(&self, user: &UserId, amount: f64, now: Timestamp) -> UserReputation {
        let reputation = self
            .reputation
            .update(user, ReputationChange::Penalty { amount }, now);
        debug!(%user, amount, status = %reputation.status, "user penalised");
        self.persist(PersistenceRecord::Reputation(reputation.clone()));
        reputation
    }

    /// Start a new session: initial price, empty history, cleared session
    /// reputation and rate buckets. Lifetime reputation is kept.
    pub fn reset_session(&self, now: Timestamp) {
        self.price.reset_with(|price| {
            self.reputation.reset_session();
            self.limiter.reset(now);
            self.metrics.set_price(price);
            self.events.emit(EngineEvent::SessionReset {
                price,
                timestamp: now,
            });
        });

        if self.persistence.is_some() {
            for reputation in self.reputation.snapshot() {
                self.persist(PersistenceRecord::Reputation(reputation));
            }
        }
    }

    fn persist(&self, record: PersistenceRecord) {
        if let Some(handle) = &self.persistence {
            // Failures are logged by the handle and must not affect the vote.
            let _ = handle.enqueue(record);
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn price(&self) -> &PriceState {
        &self.price
    }

    pub fn reputation(&self) -> &ReputationStore {
        &self.reputation
    }

    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    pub fn events(&self) -> &EventEmitter {
        &self.events
    }

    pub fn persistence(&self) -> Option<&PersistenceHandle> {
        self.persistence.as_ref()
    }

    pub(crate) fn counters(&self) -> &Counters {
        &self.counters
    }

    pub(crate) fn metrics(&self) -> &VoteMetrics {
        &self.metrics
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use crowdprice_primitives::VoteKind;
    use crowdprice_ratelimiter::RateLimitDenied;
    use rust_decimal_macros::dec;

    use super::*;
    use crate::InvalidInput;

    fn config() -> EngineConfig {
        let mut config = EngineConfig::default();
        config.price.initial_price = dec!(100);
        config.price.min_price = dec!(50);
        config.price.max_price = dec!(150);
        config.price.step_size = dec!(5);
        config.price.max_single_step_delta = dec!(20);
        config.rate_limit.per_user_capacity = 3.0;
        config.weight.reputation_factor = 0.0;
        config
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let mut config = config();
        config.price.min_price = dec!(200);
        assert_matches!(
            VoteProcessor::new(config),
            Err(ConfigError::InvalidPriceBounds { .. })
        );
    }

    #[test]
    fn test_none_intent_is_ignored_without_consuming_tokens() {
        let processor = VoteProcessor::new(config()).unwrap();
        let now = Timestamp::from_secs(1);
        let intent = VoteIntent::new("alice", VoteKind::None, now);

        assert_eq!(processor.process(&intent, now), Ok(VoteOutcome::Ignored));
        assert_eq!(processor.rate_limiter().tracked_users(), 0);
        assert!(processor.reputation().is_empty());
        assert_eq!(processor.counters().ignored.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_receipt_carries_reputation_after_reward() {
        let processor = VoteProcessor::new(config()).unwrap();
        let now = Timestamp::from_secs(1);

        let outcome = processor.process(&VoteIntent::up("alice", now), now).unwrap();
        let receipt = outcome.receipt().unwrap();
        assert_eq!(receipt.entry.resulting_price, dec!(105));
        assert_eq!(receipt.reputation.session_score, 1.0);
        assert_eq!(receipt.reputation.vote_count, 1);
    }

    #[test]
    fn test_invalid_input_does_not_touch_limiter() {
        let processor = VoteProcessor::new(config()).unwrap();
        let now = Timestamp::from_secs(1);

        assert_eq!(
            processor.process(&VoteIntent::up("", now), now),
            Err(VoteRejection::InvalidInput(InvalidInput::EmptyUserId))
        );
        assert_eq!(processor.rate_limiter().tracked_users(), 0);
        assert_eq!(processor.counters().rejected.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn test_denied_vote_emits_notice() {
        let processor = VoteProcessor::new(config()).unwrap();
        let mut events = processor.events().subscribe();
        let now = Timestamp::from_secs(1);

        for _ in 0..3 {
            processor.process(&VoteIntent::down("bob", now), now).unwrap();
        }
        assert_matches!(
            processor.process(&VoteIntent::down("bob", now), now),
            Err(VoteRejection::RateLimited(RateLimitDenied::UserLimited { .. }))
        );

        for _ in 0..3 {
            assert_matches!(events.recv().await.unwrap(), EngineEvent::VoteApplied { .. });
        }
        assert_matches!(
            events.recv().await.unwrap(),
            EngineEvent::VoteDenied { user, kind: VoteKind::Down, .. } if user == UserId::from("bob")
        );
    }

    #[test]
    fn test_denied_notices_can_be_disabled() {
        let mut config = config();
        config.events.emit_denied_notices = false;
        config.rate_limit.per_user_capacity = 1.0;
        let processor = VoteProcessor::new(config).unwrap();
        let mut events = processor.events().subscribe();
        let now = Timestamp::from_secs(1);

        processor.process(&VoteIntent::up("carol", now), now).unwrap();
        processor.process(&VoteIntent::up("carol", now), now).unwrap_err();

        assert_matches!(events.try_recv(), Ok(EngineEvent::VoteApplied { .. }));
        assert!(events.try_recv().is_err());
    }

    #[test]
    fn test_penalty_flags_and_dampens() {
        let mut config = config();
        config.reputation.flagged_penalty_count = 2;
        config.weight.flagged_dampening = 0.5;
        let processor = VoteProcessor::new(config).unwrap();
        let now = Timestamp::from_secs(1);
        let dave = UserId::from("dave");

        processor.penalize(&dave, 1.0, now);
        let reputation = processor.penalize(&dave, 1.0, now);
        assert!(reputation.status.is_flagged());
        assert_eq!(reputation.vote_count, 0);

        let outcome = processor.process(&VoteIntent::up("dave", now), now).unwrap();
        assert_eq!(outcome.receipt().unwrap().entry.applied_delta, dec!(2.5));
    }
}
