use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::RecError;

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct BadgeRecConfig {
    pub server: ServerConfig,
    pub index: IndexConfig,
    pub embedding: EmbeddingConfig,
    pub generation: GenerationConfig,
    pub retrieval: RetrievalConfig,
    pub backup: BackupConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub log_level: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct IndexConfig {
    /// Name of the managed vector index.
    pub name: String,
    /// Cloud provider passed to index creation.
    pub cloud: String,
    /// Region passed to index creation.
    pub region: String,
    /// Seconds to sleep between readiness polls during index creation.
    pub ready_poll_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub provider: String,
    pub model: String,
    /// Vector dimensionality produced by `model`.
    pub dimensions: usize,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct GenerationConfig {
    pub provider: String,
    pub model: String,
    pub temperature: f64,
    pub max_tokens: u32,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Candidate badges fetched per recommendation request.
    pub candidate_top_k: usize,
    /// Recommendations requested from the generative step by default.
    pub default_count: usize,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct BackupConfig {
    /// Directory for file-backed vector snapshots.
    pub dir: String,
    /// Minutes a deleted vector remains restorable.
    pub retention_minutes: i64,
    /// Seconds between background expiry sweeps.
    pub sweep_interval_secs: u64,
}

impl Default for BadgeRecConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            index: IndexConfig::default(),
            embedding: EmbeddingConfig::default(),
            generation: GenerationConfig::default(),
            retrieval: RetrievalConfig::default(),
            backup: BackupConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            log_level: "info".into(),
        }
    }
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            name: "openbadges".into(),
            cloud: "aws".into(),
            region: "us-east-1".into(),
            ready_poll_secs: 1,
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "pinecone".into(),
            model: "multilingual-e5-large".into(),
            dimensions: 1024,
        }
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            provider: "anthropic".into(),
            model: "claude-3-7-sonnet-20250219".into(),
            temperature: 0.7,
            max_tokens: 4096,
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            candidate_top_k: 5,
            default_count: 3,
        }
    }
}

impl Default for BackupConfig {
    fn default() -> Self {
        let dir = default_badgerec_dir()
            .join("backups")
            .to_string_lossy()
            .into_owned();
        Self {
            dir,
            retention_minutes: 30,
            sweep_interval_secs: 60,
        }
    }
}

/// Returns `~/.badgerec/`
pub fn default_badgerec_dir() -> PathBuf {
    dirs::home_dir()
        .expect("home directory must exist")
        .join(".badgerec")
}

/// Returns the default config file path: `~/.badgerec/config.toml`
pub fn default_config_path() -> PathBuf {
    default_badgerec_dir().join("config.toml")
}

impl BadgeRecConfig {
    /// Load config from TOML file (if it exists) then apply env var overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(default_config_path())
    }

    /// Load from a specific path, then apply env var overrides.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let contents =
                std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str(&contents).context("failed to parse config TOML")?
        } else {
            info!("no config file at {}, using defaults", path.display());
            BadgeRecConfig::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides (BADGEREC_INDEX, BADGEREC_BACKUP_DIR,
    /// BADGEREC_LOG_LEVEL).
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("BADGEREC_INDEX") {
            self.index.name = val;
        }
        if let Ok(val) = std::env::var("BADGEREC_BACKUP_DIR") {
            self.backup.dir = val;
        }
        if let Ok(val) = std::env::var("BADGEREC_LOG_LEVEL") {
            self.server.log_level = val;
        }
    }

    /// Resolve the backup directory path, expanding `~` if needed.
    pub fn resolved_backup_dir(&self) -> PathBuf {
        expand_tilde(&self.backup.dir)
    }

    /// Backup retention window as a `chrono::Duration`.
    pub fn retention(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.backup.retention_minutes)
    }
}

/// API credentials for the external capability services.
///
/// Secrets are never read from the config file — environment only. A missing
/// key aborts startup with [`RecError::ConfigurationMissing`].
#[derive(Debug, Clone)]
pub struct Credentials {
    pub pinecone_api_key: String,
    pub anthropic_api_key: String,
}

impl Credentials {
    pub fn from_env() -> Result<Self, RecError> {
        Ok(Self {
            pinecone_api_key: require_env("PINECONE_API_KEY")?,
            anthropic_api_key: require_env("ANTHROPIC_API_KEY")?,
        })
    }
}

fn require_env(name: &str) -> Result<String, RecError> {
    match std::env::var(name) {
        Ok(val) if !val.trim().is_empty() => Ok(val),
        _ => Err(RecError::ConfigurationMissing(name.to_string())),
    }
}

pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        dirs::home_dir()
            .expect("home directory must exist")
            .join(rest)
    } else {
        PathBuf::from(path)
    }
}
