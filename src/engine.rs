//! Application facade wiring the capabilities together.
//!
//! [`RecommendEngine`] owns the embedding provider, the managed vector index,
//! the generative model, and the backup stores, and exposes the operations
//! the CLI surfaces: ingest, recommend, profile and similarity lookups, and
//! delete/restore with a bounded undo window.

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::backup::{BackupManager, BackupMethod, RestoreOutcome};
use crate::config::{BadgeRecConfig, Credentials};
use crate::embedding::{self, EmbeddingProvider};
use crate::index::manager::IndexManager;
use crate::index::{pinecone::PineconeIndex, QueryMatch, VectorEntry, VectorIndex};
use crate::llm::{self, GenerativeModel};
use crate::recommend::{RecommendationResponse, Recommender};
use crate::record::{detect, parse_id_list, preprocessor_for, Namespace, UserProfile};
use crate::retrieve::Retriever;

/// Outcome of a guarded delete.
#[derive(Debug, Serialize)]
pub struct DeleteOutcome {
    pub deleted: bool,
    /// Whether a restorable snapshot was written before the delete.
    pub backed_up: bool,
    pub message: String,
}

/// Counts reported after an ingest run.
#[derive(Debug, Default, Serialize)]
pub struct IngestReport {
    pub ingested: usize,
    pub skipped: usize,
}

pub struct RecommendEngine {
    retriever: Arc<Retriever>,
    recommender: Recommender,
    embedding: Arc<dyn EmbeddingProvider>,
    index: Arc<IndexManager>,
    backups: BackupManager,
    default_count: usize,
}

impl RecommendEngine {
    /// Wire the engine against the real remote services.
    ///
    /// Credentials come from the environment only; a missing key fails here
    /// rather than on the first request.
    pub fn new(config: &BadgeRecConfig) -> Result<Self> {
        let credentials = Credentials::from_env()?;
        let embedding: Arc<dyn EmbeddingProvider> =
            embedding::create_provider(&config.embedding, &credentials.pinecone_api_key)?.into();
        let index: Arc<dyn VectorIndex> =
            Arc::new(PineconeIndex::new(&config.index, &credentials.pinecone_api_key));
        let model: Arc<dyn GenerativeModel> =
            llm::create_model(&config.generation, &credentials.anthropic_api_key)?.into();
        Self::from_parts(embedding, index, model, config)
    }

    /// Wire the engine from already-built capabilities.
    pub fn from_parts(
        embedding: Arc<dyn EmbeddingProvider>,
        index: Arc<dyn VectorIndex>,
        model: Arc<dyn GenerativeModel>,
        config: &BadgeRecConfig,
    ) -> Result<Self> {
        let manager = Arc::new(IndexManager::new(
            index,
            embedding.dimensions(),
            Duration::from_secs(config.index.ready_poll_secs),
        ));
        let retriever = Arc::new(Retriever::new(Arc::clone(&embedding), Arc::clone(&manager)));
        let recommender = Recommender::new(
            Arc::clone(&retriever),
            model,
            config.retrieval.candidate_top_k,
        );
        let backups = BackupManager::new(config.resolved_backup_dir(), config.retention())?;
        backups.start_sweeper(Duration::from_secs(config.backup.sweep_interval_secs));
        Ok(Self {
            retriever,
            recommender,
            embedding,
            index: manager,
            backups,
            default_count: config.retrieval.default_count,
        })
    }

    /// Cancel background work. Safe to call more than once.
    pub fn shutdown(&self) {
        self.backups.shutdown();
    }

    /// Generate badge recommendations for a user.
    ///
    /// `count` falls back to the configured default and is clamped to 1..=10.
    /// The response is empty when the user is unknown or the pipeline cannot
    /// be served.
    pub async fn recommend(&self, user_id: &str, count: Option<usize>) -> RecommendationResponse {
        let count = count.unwrap_or(self.default_count).clamp(1, 10);
        self.recommender.recommend(user_id, count).await
    }

    /// Look up a user's stored profile projection.
    pub async fn user_profile(&self, user_id: &str) -> Result<Option<UserProfile>> {
        let matches = self
            .retriever
            .lookup_exact(user_id, Namespace::User, 1)
            .await?;
        Ok(matches.into_iter().next().map(|m| profile_from_match(&m)))
    }

    /// Badges similar to a user's profile, acquired badges excluded.
    pub async fn similar_badges(&self, user_id: &str, top_k: usize) -> Result<Vec<QueryMatch>> {
        self.retriever
            .recommend_candidates_for_user(user_id, top_k)
            .await
    }

    /// Delete a vector after snapshotting it to the chosen backup store.
    ///
    /// The namespace is derived from the id prefix. A missing vector is
    /// reported, not treated as an error. If the snapshot write fails the
    /// delete still proceeds and the outcome says so.
    pub async fn delete_with_backup(
        &self,
        id: &str,
        method: BackupMethod,
    ) -> Result<DeleteOutcome> {
        let namespace = Namespace::from_id(id)?;
        let handle = self.index.get_handle().await?;

        let Some(entry) = handle.fetch(namespace, id).await? else {
            return Ok(DeleteOutcome {
                deleted: false,
                backed_up: false,
                message: format!("no vector found for {id}"),
            });
        };

        let backed_up = self.backups.backup(namespace, entry, method);
        handle.delete(namespace, id).await?;
        info!(id, namespace = %namespace, backed_up, "vector deleted");
        Ok(DeleteOutcome {
            deleted: true,
            backed_up,
            message: format!("deleted {id} from namespace {namespace}"),
        })
    }

    /// Restore a previously deleted vector within the retention window.
    pub async fn restore(&self, id: &str) -> Result<RestoreOutcome> {
        let handle = self.index.get_handle().await?;
        Ok(self.backups.restore(id, &handle).await)
    }

    /// Ingest every `.json` file under `dir`: detect each record's kind
    /// (unless `kind` forces one), preprocess, embed, and upsert.
    ///
    /// Bad records are skipped and counted; infrastructure failures abort
    /// the run.
    pub async fn ingest(&self, dir: &Path, kind: Option<Namespace>) -> Result<IngestReport> {
        let mut paths: Vec<_> = std::fs::read_dir(dir)
            .with_context(|| format!("failed to read ingest dir {}", dir.display()))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.extension().and_then(|e| e.to_str()) == Some("json"))
            .collect();
        paths.sort();

        let mut report = IngestReport::default();
        for path in paths {
            let contents = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            let parsed: Value = match serde_json::from_str(&contents) {
                Ok(value) => value,
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "skipping unparseable file");
                    report.skipped += 1;
                    continue;
                }
            };
            let file_hint = path.file_name().and_then(|n| n.to_str()).map(str::to_string);

            let records = match parsed {
                Value::Array(items) => items,
                single => vec![single],
            };
            for record in &records {
                match self.ingest_record(record, kind, file_hint.as_deref()).await {
                    Ok(true) => report.ingested += 1,
                    Ok(false) => report.skipped += 1,
                    Err(err) => return Err(err),
                }
            }
        }
        info!(
            ingested = report.ingested,
            skipped = report.skipped,
            "ingest run finished"
        );
        Ok(report)
    }

    /// Ingest one record. `Ok(false)` means the record was skipped.
    async fn ingest_record(
        &self,
        record: &Value,
        kind: Option<Namespace>,
        file_hint: Option<&str>,
    ) -> Result<bool> {
        let namespace = match kind {
            Some(forced) => forced,
            None => match detect(record, file_hint) {
                Ok(detected) => detected,
                Err(err) => {
                    warn!(?file_hint, error = %err, "skipping undetectable record");
                    return Ok(false);
                }
            },
        };

        let processed = match preprocessor_for(namespace).preprocess(record) {
            Ok(processed) => processed,
            Err(err) => {
                warn!(namespace = %namespace, error = %err, "skipping record without id");
                return Ok(false);
            }
        };

        let values = self.embedding.embed(&processed.text).await?;
        let handle = self.index.get_handle().await?;
        handle
            .upsert(
                namespace,
                VectorEntry {
                    id: processed.id.clone(),
                    values,
                    metadata: processed.metadata,
                },
            )
            .await?;
        info!(id = %processed.id, namespace = %namespace, "record ingested");
        Ok(true)
    }
}

fn profile_from_match(m: &QueryMatch) -> UserProfile {
    let text = |key: &str| {
        m.metadata
            .get(key)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };
    UserProfile {
        user_id: m.id.clone(),
        name: text("name"),
        goal: text("goal"),
        skills: m
            .metadata
            .get("skills")
            .map(parse_id_list)
            .unwrap_or_default(),
        competency_level: text("competency_level"),
        education_level: text("education_level"),
        acquired_badges: m
            .metadata
            .get("acquired_badges")
            .map(parse_id_list)
            .unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn profile_projection_from_match() {
        let m = QueryMatch {
            id: "U00113".into(),
            score: 1.0,
            metadata: json!({
                "name": "Jordan",
                "goal": "become a data analyst",
                "skills": ["sql", "excel"],
                "competency_level": "intermediate",
                "education_level": "bachelor",
                "acquired_badges": "['B001']",
            }),
        };
        let profile = profile_from_match(&m);
        assert_eq!(profile.user_id, "U00113");
        assert_eq!(profile.skills, vec!["sql", "excel"]);
        assert_eq!(profile.acquired_badges, vec!["B001"]);
    }

    #[test]
    fn profile_tolerates_sparse_metadata() {
        let m = QueryMatch {
            id: "U00114".into(),
            score: 1.0,
            metadata: json!({"name": "Sam"}),
        };
        let profile = profile_from_match(&m);
        assert_eq!(profile.name, "Sam");
        assert!(profile.goal.is_empty());
        assert!(profile.acquired_badges.is_empty());
    }
}
