//! In-memory backup store.
//!
//! A mutex-guarded map shared between request handlers and the expiry sweep.
//! Entries do not survive a process restart — after a cold start only the
//! file-backed store is consulted.

use anyhow::Result;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Mutex;

use super::{BackupRecord, BackupStore};

#[derive(Default)]
pub struct MemoryBackupStore {
    entries: Mutex<HashMap<String, BackupRecord>>,
}

impl MemoryBackupStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BackupStore for MemoryBackupStore {
    fn put(&self, record: BackupRecord) -> Result<()> {
        let mut entries = self.entries.lock().expect("backup map poisoned");
        entries.insert(record.vector_id.clone(), record);
        Ok(())
    }

    fn get(&self, id: &str) -> Result<Option<BackupRecord>> {
        let entries = self.entries.lock().expect("backup map poisoned");
        Ok(entries.get(id).cloned())
    }

    fn remove(&self, id: &str) -> Result<bool> {
        let mut entries = self.entries.lock().expect("backup map poisoned");
        Ok(entries.remove(id).is_some())
    }

    fn purge_expired(&self, now: DateTime<Utc>) -> Result<Vec<String>> {
        let mut entries = self.entries.lock().expect("backup map poisoned");
        let expired: Vec<String> = entries
            .iter()
            .filter(|(_, record)| record.is_expired(now))
            .map(|(id, _)| id.clone())
            .collect();
        for id in &expired {
            entries.remove(id);
        }
        Ok(expired)
    }
}
