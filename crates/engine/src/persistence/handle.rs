//! Cloneable handle for feeding the persistence service.

use std::sync::Arc;
use std::sync::atomic::Ordering;

use tokio::sync::{mpsc, oneshot};
use tracing::warn;

use crate::PersistenceError;
use crate::persistence::{PersistenceCommand, PersistenceCounters, PersistenceRecord};

/// Cloneable, non-blocking handle to the persistence service.
#[derive(Debug, Clone)]
pub struct PersistenceHandle {
    command_tx: mpsc::UnboundedSender<PersistenceCommand>,
    counters: Arc<PersistenceCounters>,
}

impl PersistenceHandle {
    pub(crate) fn new(
        command_tx: mpsc::UnboundedSender<PersistenceCommand>,
        counters: Arc<PersistenceCounters>,
    ) -> Self {
        Self { command_tx, counters }
    }

    /// Queue `record` without waiting. Failure to queue is logged and
    /// reported, never retried here.
    pub fn enqueue(&self, record: PersistenceRecord) -> Result<(), PersistenceError> {
        let kind = record.kind();
        self.command_tx
            .send(PersistenceCommand::Record(record))
            .map_err(|_| {
                self.counters.failed.fetch_add(1, Ordering::Relaxed);
                warn!(kind, "persistence service stopped, dropping record");
                PersistenceError::ServiceStopped
            })
    }

    /// Wait until everything queued before this call has been handled, then
    /// flush the store.
    pub async fn flush(&self) -> Result<(), PersistenceError> {
        let (tx, rx) = oneshot::channel();

        self.command_tx
            .send(PersistenceCommand::Flush { response_tx: tx })
            .map_err(|_| PersistenceError::ServiceStopped)?;

        rx.await.map_err(|_| PersistenceError::ServiceStopped)?
    }

    /// Records dropped after exhausting retries, or because the service had
    /// stopped.
    pub fn failed_count(&self) -> u64 {
        self.counters.failed.load(Ordering::Relaxed)
    }

    /// Records the store refused because it already held them at the same
    /// or a newer version. Steady growth means the engine was not resumed
    /// from the store it writes to.
    pub fn stale_count(&self) -> u64 {
        self.counters.stale.load(Ordering::Relaxed)
    }

    pub fn is_closed(&self) -> bool {
        self.command_tx.is_closed()
    }
}
