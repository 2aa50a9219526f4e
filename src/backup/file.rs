//! File-backed backup store.
//!
//! One bincode-encoded file per vector id under the configured backup
//! directory. Unlike the in-memory store these snapshots survive a process
//! restart; the read-time expiry check in restore covers timers that did not.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

use super::{BackupRecord, BackupStore};
use crate::index::VectorEntry;
use crate::record::Namespace;

/// On-disk shape of a snapshot. Metadata crosses the boundary as a JSON
/// string: bincode's serde mode cannot decode dynamic `serde_json::Value`s
/// (`deserialize_any` is unsupported).
#[derive(Serialize, Deserialize)]
struct StoredRecord {
    vector_id: String,
    namespace: Namespace,
    entry_id: String,
    values: Vec<f32>,
    metadata: String,
    deleted_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

impl StoredRecord {
    fn from_record(record: &BackupRecord) -> Result<Self> {
        Ok(Self {
            vector_id: record.vector_id.clone(),
            namespace: record.namespace,
            entry_id: record.entry.id.clone(),
            values: record.entry.values.clone(),
            metadata: serde_json::to_string(&record.entry.metadata)
                .context("failed to serialize backup metadata")?,
            deleted_at: record.deleted_at,
            expires_at: record.expires_at,
        })
    }

    fn into_record(self) -> Result<BackupRecord> {
        let metadata = serde_json::from_str(&self.metadata)
            .context("failed to parse backup metadata")?;
        Ok(BackupRecord {
            vector_id: self.vector_id,
            namespace: self.namespace,
            entry: VectorEntry {
                id: self.entry_id,
                values: self.values,
                metadata,
            },
            deleted_at: self.deleted_at,
            expires_at: self.expires_at,
        })
    }
}

pub struct FileBackupStore {
    dir: PathBuf,
}

impl FileBackupStore {
    /// Open (and create if needed) the backup directory.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create backup dir {}", dir.display()))?;
        Ok(Self { dir })
    }

    fn path_for(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{id}.bak"))
    }

    fn decode(path: &Path) -> Result<BackupRecord> {
        let bytes = fs::read(path)
            .with_context(|| format!("failed to read backup file {}", path.display()))?;
        let (stored, _): (StoredRecord, usize) =
            bincode::serde::decode_from_slice(&bytes, bincode::config::standard())
                .with_context(|| format!("failed to decode backup file {}", path.display()))?;
        stored.into_record()
    }
}

impl BackupStore for FileBackupStore {
    fn put(&self, record: BackupRecord) -> Result<()> {
        let path = self.path_for(&record.vector_id);
        let stored = StoredRecord::from_record(&record)?;
        let bytes = bincode::serde::encode_to_vec(&stored, bincode::config::standard())
            .context("failed to encode backup record")?;
        fs::write(&path, bytes)
            .with_context(|| format!("failed to write backup file {}", path.display()))?;
        Ok(())
    }

    fn get(&self, id: &str) -> Result<Option<BackupRecord>> {
        let path = self.path_for(id);
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(Self::decode(&path)?))
    }

    fn remove(&self, id: &str) -> Result<bool> {
        let path = self.path_for(id);
        if !path.exists() {
            return Ok(false);
        }
        fs::remove_file(&path)
            .with_context(|| format!("failed to remove backup file {}", path.display()))?;
        Ok(true)
    }

    fn purge_expired(&self, now: DateTime<Utc>) -> Result<Vec<String>> {
        let mut purged = Vec::new();
        for dir_entry in fs::read_dir(&self.dir)? {
            let path = dir_entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("bak") {
                continue;
            }
            let record = match Self::decode(&path) {
                Ok(record) => record,
                Err(err) => {
                    // An unreadable snapshot is no safety net; drop it.
                    warn!(path = %path.display(), error = %err, "removing corrupt backup file");
                    let _ = fs::remove_file(&path);
                    continue;
                }
            };
            if record.is_expired(now) {
                fs::remove_file(&path)?;
                purged.push(record.vector_id);
            }
        }
        Ok(purged)
    }
}
