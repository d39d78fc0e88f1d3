//! Durable mirrors of engine state.
//!
//! The engine's in-memory state is authoritative; a [`SnapshotStore`] is an
//! eventually consistent copy fed by the persistence worker. Every store is
//! idempotent: replaying a record it has already seen changes nothing.

mod file;
mod memory;
mod tables;

use auto_impl::auto_impl;
use crowdprice_price::HistoryEntry;
use crowdprice_reputation::UserReputation;
use thiserror::Error;

pub use file::FileSnapshotStore;
pub use memory::MemorySnapshotStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("Storage error: {0}")]
    Storage(String),
}

/// Durable storage for reputation snapshots and price history.
#[auto_impl(&, Box, Arc)]
pub trait SnapshotStore: Send + Sync {
    /// Store `record` unless a record with the same or a newer version is
    /// already stored. Returns whether anything changed.
    fn save_reputation(&self, record: &UserReputation) -> Result<bool, StoreError>;

    fn save_reputation_batch(&self, records: &[UserReputation]) -> Result<usize, StoreError> {
        let mut saved = 0;
        for record in records {
            if self.save_reputation(record)? {
                saved += 1;
            }
        }
        Ok(saved)
    }

    /// Append the entries whose `seq` is past the last stored one. Returns the
    /// number appended.
    fn append_history(&self, entries: &[HistoryEntry]) -> Result<usize, StoreError>;

    fn load_reputation(&self) -> Result<Vec<UserReputation>, StoreError>;

    fn load_history(&self) -> Result<Vec<HistoryEntry>, StoreError>;

    /// Highest stored history sequence number, 0 when empty.
    fn last_history_seq(&self) -> Result<u64, StoreError>;

    fn flush(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
