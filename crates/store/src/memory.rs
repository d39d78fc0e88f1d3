//! In-memory snapshot store (does not persist across restarts).

use crowdprice_price::HistoryEntry;
use crowdprice_reputation::UserReputation;
use parking_lot::RwLock;

use crate::tables::SnapshotTables;
use crate::{SnapshotStore, StoreError};

/// In-memory snapshot store, for tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemorySnapshotStore {
    tables: RwLock<SnapshotTables>,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SnapshotStore for MemorySnapshotStore {
    fn save_reputation(&self, record: &UserReputation) -> Result<bool, StoreError> {
        Ok(self.tables.write().save_reputation(record))
    }

    fn append_history(&self, entries: &[HistoryEntry]) -> Result<usize, StoreError> {
        Ok(self.tables.write().append_history(entries))
    }

    fn load_reputation(&self) -> Result<Vec<UserReputation>, StoreError> {
        Ok(self.tables.read().reputation())
    }

    fn load_history(&self) -> Result<Vec<HistoryEntry>, StoreError> {
        Ok(self.tables.read().history())
    }

    fn last_history_seq(&self) -> Result<u64, StoreError> {
        Ok(self.tables.read().last_history_seq())
    }
}
