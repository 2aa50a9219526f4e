//! Pre-delete vector snapshots with a bounded restore window.
//!
//! Before any vector is deleted, its values and metadata are snapshotted to
//! one of two interchangeable [`BackupStore`] strategies (in-memory map or
//! per-id file). Snapshots expire after the configured retention window.
//! Expiry is enforced twice: a background sweep purges proactively, and
//! [`BackupManager::restore`] re-checks at read time, which also covers
//! file-backed snapshots found after a restart.

pub mod file;
pub mod memory;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::index::{VectorEntry, VectorIndex};
use crate::record::Namespace;

pub use file::FileBackupStore;
pub use memory::MemoryBackupStore;

/// Which store a snapshot goes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackupMethod {
    Memory,
    File,
}

impl std::str::FromStr for BackupMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "memory" => Ok(Self::Memory),
            "file" => Ok(Self::File),
            _ => Err(format!("unknown backup method: {s}")),
        }
    }
}

/// A snapshot of a deleted vector, restorable until `expires_at`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupRecord {
    pub vector_id: String,
    pub namespace: Namespace,
    pub entry: VectorEntry,
    pub deleted_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl BackupRecord {
    /// A record is restorable through `expires_at` inclusive.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

/// Storage strategy for backup records.
///
/// Implementations are called from async contexts but never across an await;
/// the in-memory variant must tolerate concurrent access from request
/// handlers and the expiry sweep.
pub trait BackupStore: Send + Sync {
    fn put(&self, record: BackupRecord) -> Result<()>;
    fn get(&self, id: &str) -> Result<Option<BackupRecord>>;
    /// Remove an entry; `false` when it was already gone (a no-op, not an error).
    fn remove(&self, id: &str) -> Result<bool>;
    /// Remove all entries expired as of `now`, returning their ids.
    fn purge_expired(&self, now: DateTime<Utc>) -> Result<Vec<String>>;
}

/// Outcome of a restore attempt, shaped for the application layer.
#[derive(Debug, Serialize)]
pub struct RestoreOutcome {
    pub restored: bool,
    pub message: String,
}

/// Owns both backup stores, the retention policy, and the expiry sweep task.
///
/// Construct once per process and call [`shutdown`](Self::shutdown) on
/// teardown to cancel the sweep.
pub struct BackupManager {
    memory: Arc<MemoryBackupStore>,
    file: Arc<FileBackupStore>,
    retention: chrono::Duration,
    sweeper: Mutex<Option<JoinHandle<()>>>,
}

impl BackupManager {
    pub fn new(backup_dir: impl AsRef<Path>, retention: chrono::Duration) -> Result<Self> {
        Ok(Self {
            memory: Arc::new(MemoryBackupStore::new()),
            file: Arc::new(FileBackupStore::new(backup_dir)?),
            retention,
            sweeper: Mutex::new(None),
        })
    }

    /// Start the background sweep that purges expired snapshots.
    ///
    /// One scheduled task covers all entries; individual snapshots carry
    /// their own `expires_at`, so a sweep that fires late only delays purge,
    /// never extends restorability (restore re-checks expiry itself).
    pub fn start_sweeper(&self, interval: Duration) {
        let memory = Arc::clone(&self.memory);
        let file = Arc::clone(&self.file);
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let now = Utc::now();
                for (label, purged) in [
                    ("memory", memory.purge_expired(now)),
                    ("file", file.purge_expired(now)),
                ] {
                    match purged {
                        Ok(ids) if !ids.is_empty() => {
                            debug!(store = label, count = ids.len(), "purged expired backups")
                        }
                        Ok(_) => {}
                        Err(err) => warn!(store = label, error = %err, "backup sweep failed"),
                    }
                }
            }
        });
        let mut guard = self.sweeper.lock().expect("sweeper handle poisoned");
        if let Some(old) = guard.replace(handle) {
            old.abort();
        }
    }

    /// Cancel the sweep task. Safe to call more than once.
    pub fn shutdown(&self) {
        if let Some(handle) = self.sweeper.lock().expect("sweeper handle poisoned").take() {
            handle.abort();
        }
    }

    /// Snapshot a vector before deletion.
    ///
    /// A failed write is logged and swallowed — the delete it protects must
    /// proceed either way — and `false` signals that no safety net exists.
    pub fn backup(&self, namespace: Namespace, entry: VectorEntry, method: BackupMethod) -> bool {
        let now = Utc::now();
        let record = BackupRecord {
            vector_id: entry.id.clone(),
            namespace,
            entry,
            deleted_at: now,
            expires_at: now + self.retention,
        };
        let id = record.vector_id.clone();
        let result = match method {
            BackupMethod::Memory => self.memory.put(record),
            BackupMethod::File => self.file.put(record),
        };
        match result {
            Ok(()) => {
                debug!(id = %id, ?method, "vector snapshotted before delete");
                true
            }
            Err(err) => {
                warn!(id = %id, ?method, error = %err, "backup write failed; delete proceeds without a safety net");
                false
            }
        }
    }

    /// Restore a deleted vector within the retention window.
    ///
    /// The memory store is checked before the file store. Expired entries
    /// are purged and reported; absent entries report not-found.
    pub async fn restore(&self, id: &str, index: &Arc<dyn VectorIndex>) -> RestoreOutcome {
        let (record, store): (BackupRecord, &dyn BackupStore) =
            match self.lookup(id) {
                Ok(Some(found)) => found,
                Ok(None) => {
                    return RestoreOutcome {
                        restored: false,
                        message: format!("no backup found for {id}"),
                    }
                }
                Err(err) => {
                    warn!(id, error = %err, "backup lookup failed");
                    return RestoreOutcome {
                        restored: false,
                        message: format!("backup lookup failed for {id}"),
                    };
                }
            };

        let now = Utc::now();
        if record.is_expired(now) {
            if let Err(err) = store.remove(id) {
                warn!(id, error = %err, "failed to purge expired backup");
            }
            return RestoreOutcome {
                restored: false,
                message: format!("backup for {id} expired at {}", record.expires_at),
            };
        }

        if let Err(err) = index
            .upsert(record.namespace, record.entry.clone())
            .await
        {
            warn!(id, error = %err, "restore upsert failed; backup retained");
            return RestoreOutcome {
                restored: false,
                message: format!("restore of {id} failed; backup retained for retry"),
            };
        }

        // The entry may have been swept while the upsert was in flight;
        // removal of a missing key is a no-op.
        if let Err(err) = store.remove(id) {
            warn!(id, error = %err, "failed to remove consumed backup");
        }
        info!(id, namespace = %record.namespace, "vector restored from backup");
        RestoreOutcome {
            restored: true,
            message: format!("restored {id} to namespace {}", record.namespace),
        }
    }

    fn lookup(&self, id: &str) -> Result<Option<(BackupRecord, &dyn BackupStore)>> {
        if let Some(record) = self.memory.get(id)? {
            return Ok(Some((record, self.memory.as_ref())));
        }
        if let Some(record) = self.file.get(id)? {
            return Ok(Some((record, self.file.as_ref())));
        }
        Ok(None)
    }
}

impl Drop for BackupManager {
    fn drop(&mut self) {
        self.shutdown();
    }
}
