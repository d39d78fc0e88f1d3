//! Persistence service actor (runs in its own tokio task).

use std::sync::Arc;
use std::sync::atomic::Ordering;

use crowdprice_store::{SnapshotStore, StoreError};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, trace, warn};

use crate::PersistenceError;
use crate::metrics::VoteMetrics;
use crate::persistence::{Backoff, PersistenceCounters, PersistenceRecord};

/// Commands from the handle to the service.
#[derive(Debug)]
pub enum PersistenceCommand {
    /// Write a record to the store.
    Record(PersistenceRecord),
    /// Flush the store once every earlier command is handled.
    Flush {
        response_tx: oneshot::Sender<Result<(), PersistenceError>>,
    },
}

/// Drains queued records into a [`SnapshotStore`].
///
/// Store calls may block on disk, so each one runs on tokio's blocking pool.
#[derive(Debug)]
pub struct PersistenceService<S> {
    command_rx: mpsc::UnboundedReceiver<PersistenceCommand>,
    store: Arc<S>,
    backoff: Backoff,
    counters: Arc<PersistenceCounters>,
    metrics: VoteMetrics,
}

impl<S: SnapshotStore + 'static> PersistenceService<S> {
    pub(crate) fn new(
        command_rx: mpsc::UnboundedReceiver<PersistenceCommand>,
        store: Arc<S>,
        backoff: Backoff,
        counters: Arc<PersistenceCounters>,
    ) -> Self {
        Self {
            command_rx,
            store,
            backoff,
            counters,
            metrics: VoteMetrics::default(),
        }
    }

    /// Run until every handle is dropped, then flush once more.
    pub async fn run(mut self) {
        while let Some(command) = self.command_rx.recv().await {
            self.handle_command(command).await;
        }

        if let Err(error) = self.flush().await {
            warn!(%error, "final snapshot store flush failed");
        }
        debug!("persistence service shutting down");
    }

    async fn handle_command(&mut self, command: PersistenceCommand) {
        match command {
            PersistenceCommand::Record(record) => {
                if let Err(error) = self.persist(&record).await {
                    self.counters.failed.fetch_add(1, Ordering::Relaxed);
                    self.metrics.persistence_failed.increment(1);
                    warn!(kind = record.kind(), %error, "dropping record");
                }
            }
            PersistenceCommand::Flush { response_tx } => {
                let result = self.flush().await.map_err(PersistenceError::from);
                let _ = response_tx.send(result);
            }
        }
    }

    async fn persist(&self, record: &PersistenceRecord) -> Result<(), PersistenceError> {
        let mut retry = 0;
        loop {
            match self.write(record.clone()).await {
                Ok(stale) => {
                    if stale > 0 {
                        self.counters.stale.fetch_add(stale, Ordering::Relaxed);
                        self.metrics.persistence_stale.increment(stale);
                        warn!(
                            kind = record.kind(),
                            stale,
                            "store already holds newer data, record ignored; was the engine warm-started from this store?"
                        );
                    }
                    return Ok(());
                }
                Err(error) if retry < self.backoff.max_retries => {
                    let delay = self.backoff.delay(retry);
                    debug!(kind = record.kind(), %error, ?delay, retry, "store write failed, retrying");
                    tokio::time::sleep(delay).await;
                    retry += 1;
                }
                Err(source) => {
                    return Err(PersistenceError::RetriesExhausted {
                        attempts: retry + 1,
                        source,
                    });
                }
            }
        }
    }

    /// Write one record and return how many of its items the store refused
    /// as stale.
    async fn write(&self, record: PersistenceRecord) -> Result<u64, StoreError> {
        let store = Arc::clone(&self.store);
        blocking(move || match &record {
            PersistenceRecord::Reputation(reputation) => {
                let saved = store.save_reputation(reputation)?;
                trace!(user = %reputation.user, version = reputation.version, saved, "reputation persisted");
                Ok(u64::from(!saved))
            }
            PersistenceRecord::PriceHistory(entries) => {
                let appended = store.append_history(entries)?;
                trace!(appended, "price history persisted");
                Ok(entries.len().saturating_sub(appended) as u64)
            }
        })
        .await
    }

    async fn flush(&self) -> Result<(), StoreError> {
        let store = Arc::clone(&self.store);
        blocking(move || store.flush()).await
    }
}

async fn blocking<T: Send + 'static>(
    f: impl FnOnce() -> Result<T, StoreError> + Send + 'static,
) -> Result<T, StoreError> {
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|error| StoreError::Storage(format!("store task failed: {error}")))?
}
