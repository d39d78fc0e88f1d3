//! Idempotent in-memory tables shared by every store implementation.

use std::collections::HashMap;

use crowdprice_price::HistoryEntry;
use crowdprice_primitives::UserId;
use crowdprice_reputation::UserReputation;
use serde::{Deserialize, Serialize};
use tracing::trace;

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub(crate) struct SnapshotTables {
    #[serde(default)]
    reputation: HashMap<UserId, UserReputation>,
    #[serde(default)]
    history: Vec<HistoryEntry>,
}

impl SnapshotTables {
    pub(crate) fn save_reputation(&mut self, record: &UserReputation) -> bool {
        match self.reputation.get(&record.user) {
            Some(stored) if stored.version >= record.version => {
                trace!(user = %record.user, version = record.version, "reputation snapshot already stored");
                false
            }
            _ => {
                self.reputation.insert(record.user.clone(), record.clone());
                true
            }
        }
    }

    pub(crate) fn append_history(&mut self, entries: &[HistoryEntry]) -> usize {
        let mut last = self.last_history_seq();
        let mut appended = 0;
        for entry in entries {
            if entry.seq > last {
                last = entry.seq;
                self.history.push(entry.clone());
                appended += 1;
            }
        }
        appended
    }

    pub(crate) fn reputation(&self) -> Vec<UserReputation> {
        let mut records: Vec<_> = self.reputation.values().cloned().collect();
        records.sort_by(|a, b| a.user.cmp(&b.user));
        records
    }

    pub(crate) fn history(&self) -> Vec<HistoryEntry> {
        self.history.clone()
    }

    pub(crate) fn last_history_seq(&self) -> u64 {
        self.history.last().map_or(0, |entry| entry.seq)
    }
}
