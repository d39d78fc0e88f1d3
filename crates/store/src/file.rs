//! JSON file snapshot store with atomic writes.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use crowdprice_price::HistoryEntry;
use crowdprice_reputation::UserReputation;
use parking_lot::{Mutex, RwLock};
use tracing::{debug, warn};

use crate::tables::SnapshotTables;
use crate::{SnapshotStore, StoreError};

/// JSON file store. Loaded to memory on open, written back on flush.
#[derive(Debug)]
pub struct FileSnapshotStore {
    path: PathBuf,
    tables: RwLock<SnapshotTables>,
    dirty: Mutex<bool>,
}

impl FileSnapshotStore {
    /// Load an existing file or start empty.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let tables = if path.exists() {
            Self::load_from_file(&path)?
        } else {
            SnapshotTables::default()
        };

        Ok(Self {
            path,
            tables: RwLock::new(tables),
            dirty: Mutex::new(false),
        })
    }

    /// Open, creating parent directories if needed.
    pub fn open_with_create_dir(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        Self::open(path)
    }

    fn load_from_file(path: &Path) -> Result<SnapshotTables, StoreError> {
        let reader = BufReader::new(File::open(path)?);
        let tables = serde_json::from_reader(reader)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        debug!(path = %path.display(), "snapshot store loaded");
        Ok(tables)
    }

    fn save_to_file(&self) -> Result<(), StoreError> {
        let tables = self.tables.read();

        // Write to temp file first, then rename
        let tmp_path = self.path.with_extension("json.tmp");
        {
            let writer = BufWriter::new(File::create(&tmp_path)?);
            serde_json::to_writer_pretty(writer, &*tables)
                .map_err(|e| StoreError::Serialization(e.to_string()))?;
        }

        fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }

    fn mark_dirty(&self) {
        *self.dirty.lock() = true;
    }

    pub fn is_dirty(&self) -> bool {
        *self.dirty.lock()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SnapshotStore for FileSnapshotStore {
    fn save_reputation(&self, record: &UserReputation) -> Result<bool, StoreError> {
        let saved = self.tables.write().save_reputation(record);
        if saved {
            self.mark_dirty();
        }
        Ok(saved)
    }

    fn save_reputation_batch(&self, records: &[UserReputation]) -> Result<usize, StoreError> {
        let mut tables = self.tables.write();
        let saved = records
            .iter()
            .filter(|record| tables.save_reputation(record))
            .count();
        drop(tables);

        if saved > 0 {
            self.mark_dirty();
        }
        Ok(saved)
    }

    fn append_history(&self, entries: &[HistoryEntry]) -> Result<usize, StoreError> {
        let appended = self.tables.write().append_history(entries);
        if appended > 0 {
            self.mark_dirty();
        }
        Ok(appended)
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

    fn flush(&self) -> Result<(), StoreError> {
        if self.is_dirty() {
            self.save_to_file()?;
            *self.dirty.lock() = false;
        }
        Ok(())
    }
}

impl Drop for FileSnapshotStore {
    fn drop(&mut self) {
        if self.is_dirty()
            && let Err(error) = self.save_to_file()
        {
            warn!(path = %self.path.display(), %error, "failed to flush snapshot store on drop");
        }
    }
}
