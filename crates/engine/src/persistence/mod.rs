//! Asynchronous, best-effort persistence of reputation and price history.
//!
//! The vote path only enqueues; a [`PersistenceService`] task drains the queue
//! into a [`crowdprice_store::SnapshotStore`], retrying failed writes with
//! exponential backoff.

mod backoff;
mod handle;
mod service;

use std::sync::Arc;
use std::sync::atomic::AtomicU64;

use crowdprice_config::PersistenceConfig;
use crowdprice_price::HistoryEntry;
use crowdprice_reputation::UserReputation;
use crowdprice_store::SnapshotStore;
use tokio::sync::mpsc;

pub use backoff::Backoff;
pub use handle::PersistenceHandle;
pub use service::{PersistenceCommand, PersistenceService};

/// A unit of work for the durable store.
#[derive(Debug, Clone, PartialEq)]
pub enum PersistenceRecord {
    Reputation(UserReputation),
    PriceHistory(Vec<HistoryEntry>),
}

impl PersistenceRecord {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Reputation(_) => "reputation",
            Self::PriceHistory(_) => "price_history",
        }
    }
}

/// Outcome counters shared by the service and every handle.
#[derive(Debug, Default)]
pub(crate) struct PersistenceCounters {
    /// Records dropped after exhausting retries or because the service stopped.
    pub(crate) failed: AtomicU64,
    /// Records the store already held at the same or a newer version.
    pub(crate) stale: AtomicU64,
}

/// Create a persistence actor (service and handle pair).
///
/// Spawn [`PersistenceService::run`] on a tokio runtime; the service stops once
/// every handle is dropped and the queue is drained.
pub fn create_persistence_actor<S: SnapshotStore + 'static>(
    store: Arc<S>,
    config: PersistenceConfig,
) -> (PersistenceService<S>, PersistenceHandle) {
    let (command_tx, command_rx) = mpsc::unbounded_channel();
    let counters = Arc::new(PersistenceCounters::default());

    let service = PersistenceService::new(
        command_rx,
        store,
        Backoff::from_config(&config),
        Arc::clone(&counters),
    );
    let handle = PersistenceHandle::new(command_tx, counters);

    (service, handle)
}
