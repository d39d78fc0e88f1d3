//! Session-level facade over the vote pipeline.

use std::sync::Arc;
use std::sync::atomic::Ordering;

use crowdprice_config::{ConfigError, EngineConfig};
use crowdprice_price::PriceSnapshot;
use crowdprice_primitives::{Clock, Decimal, SystemClock, Timestamp, UserId, VoteIntent, VoteKind};
use crowdprice_reputation::UserReputation;
use crowdprice_store::{SnapshotStore, StoreError};
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{info, warn};

use crate::classifier::{ChatMessage, Classifier, ClassifierGate};
use crate::events::EngineEvent;
use crate::persistence::PersistenceHandle;
use crate::processor::{VoteOutcome, VoteProcessor};
use crate::VoteRejection;

/// Point-in-time counters for one engine.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EngineStats {
    pub tracked_users: usize,
    pub accepted: u64,
    pub rejected: u64,
    pub ignored: u64,
    pub current_price: Decimal,
    pub history_len: usize,
    /// Records the persistence worker dropped. Zero without persistence.
    pub persistence_failed: u64,
    /// Records the store refused because it already held newer data.
    pub persistence_stale: u64,
}

/// One voting session: the pipeline plus its clock, classifier and lifecycle.
///
/// Share it behind an `Arc`; every method takes `&self`.
pub struct VoteEngine {
    processor: VoteProcessor,
    clock: Arc<dyn Clock>,
    gate: Option<ClassifierGate>,
}

impl std::fmt::Debug for VoteEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VoteEngine")
            .field("processor", &self.processor)
            .field("now", &self.clock.now())
            .field("gate", &self.gate)
            .finish()
    }
}

impl VoteEngine {
    /// Build an engine on the wall clock. Fails on invalid configuration.
    pub fn new(config: EngineConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            processor: VoteProcessor::new(config)?,
            clock: Arc::new(SystemClock),
            gate: None,
        })
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Route chat messages through `classifier`.
    pub fn with_classifier(mut self, classifier: Arc<dyn Classifier>) -> Self {
        let config = self.processor.config().classifier.clone();
        self.gate = Some(ClassifierGate::new(classifier, config));
        self
    }

    /// Like [`Self::with_classifier`] with deterministic ignore-list skips.
    pub fn with_seeded_classifier(mut self, classifier: Arc<dyn Classifier>, seed: u64) -> Self {
        let config = self.processor.config().classifier.clone();
        self.gate = Some(ClassifierGate::seeded(classifier, config, seed));
        self
    }

    /// Mirror accepted changes through `handle`.
    ///
    /// The store behind `handle` must be empty or already loaded with
    /// [`Self::warm_start`]; otherwise its newer versions win and every
    /// record is counted in [`EngineStats::persistence_stale`] instead of
    /// written. [`Self::with_resumed_persistence`] does both steps.
    pub fn with_persistence(mut self, handle: PersistenceHandle) -> Self {
        self.processor = self.processor.with_persistence(handle);
        self
    }

    /// Warm-start from `store`, then mirror accepted changes through
    /// `handle`, which should write to the same store.
    pub fn with_resumed_persistence<S: SnapshotStore>(
        self,
        store: &S,
        handle: PersistenceHandle,
    ) -> Result<Self, StoreError> {
        self.warm_start(store)?;
        Ok(self.with_persistence(handle))
    }

    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    /// Process an already classified intent at the current engine time.
    pub fn submit(&self, intent: &VoteIntent) -> Result<VoteOutcome, VoteRejection> {
        self.processor.process(intent, self.clock.now())
    }

    /// Classify a raw chat message and process the result.
    ///
    /// Classification happens before any engine state is touched. Without a
    /// configured classifier every message is ignored.
    pub async fn submit_message(&self, message: &ChatMessage) -> Result<VoteOutcome, VoteRejection> {
        let Some(gate) = &self.gate else {
            warn!(user = %message.user, "no classifier configured, ignoring chat message");
            return self.submit(&VoteIntent::new(message.user.clone(), VoteKind::None, message.timestamp));
        };

        match gate.classify(message).await {
            Ok(intent) => self.submit(&intent),
            Err(invalid) => {
                let rejection = VoteRejection::from(invalid);
                self.processor.counters().rejected.fetch_add(1, Ordering::Relaxed);
                self.processor.metrics().record_rejected(&rejection);
                Err(rejection)
            }
        }
    }

    /// Apply a moderation penalty.
    pub fn penalize(&self, user: &UserId, amount: f64) -> UserReputation {
        self.processor.penalize(user, amount, self.clock.now())
    }

    /// Start a new session. Lifetime reputation survives.
    pub fn reset_session(&self) {
        let now = self.clock.now();
        self.processor.reset_session(now);
        if let Some(gate) = &self.gate {
            gate.clear_ignored();
        }
        info!(price = %self.processor.price().current(), "session reset");
    }

    /// Restore reputation and history sequencing from `store`.
    ///
    /// Returns the number of reputation records restored. The price itself
    /// always starts at the configured initial price. Calling this after
    /// votes were taken merges stored lifetime data into the live entries
    /// and keeps the session.
    pub fn warm_start<S: SnapshotStore>(&self, store: &S) -> Result<usize, StoreError> {
        let restored = self.processor.reputation().restore(store.load_reputation()?);
        let last_seq = store.last_history_seq()?;
        self.processor.price().resume_after(last_seq);
        info!(restored, last_seq, "warm start complete");
        Ok(restored)
    }

    /// Subscribe to applied, denied and session events.
    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.processor.events().subscribe()
    }

    pub fn stats(&self) -> EngineStats {
        let counters = self.processor.counters();
        EngineStats {
            tracked_users: self.processor.reputation().len(),
            accepted: counters.accepted.load(Ordering::Relaxed),
            rejected: counters.rejected.load(Ordering::Relaxed),
            ignored: counters.ignored.load(Ordering::Relaxed),
            current_price: self.processor.price().current(),
            history_len: self.processor.price().history_len(),
            persistence_failed: self
                .processor
                .persistence()
                .map(PersistenceHandle::failed_count)
                .unwrap_or(0),
            persistence_stale: self
                .processor
                .persistence()
                .map(PersistenceHandle::stale_count)
                .unwrap_or(0),
        }
    }

    pub fn current_price(&self) -> Decimal {
        self.processor.price().current()
    }

    pub fn price_snapshot(&self) -> PriceSnapshot {
        self.processor.price().snapshot()
    }

    pub fn reputation(&self, user: &UserId) -> Option<UserReputation> {
        self.processor.reputation().get(user)
    }

    pub fn top_voters(&self, limit: usize) -> Vec<UserReputation> {
        self.processor.reputation().top_voters(limit)
    }

    pub fn recently_active(&self, limit: usize) -> Vec<UserReputation> {
        self.processor.reputation().recently_active(limit)
    }

    /// Tokens `user` has left right now, without consuming one.
    pub fn remaining_votes(&self, user: &UserId) -> f64 {
        self.processor.rate_limiter().remaining(user, self.clock.now())
    }

    pub fn classifier(&self) -> Option<&ClassifierGate> {
        self.gate.as_ref()
    }

    pub fn processor(&self) -> &VoteProcessor {
        &self.processor
    }

    pub fn config(&self) -> &EngineConfig {
        self.processor.config()
    }
}
