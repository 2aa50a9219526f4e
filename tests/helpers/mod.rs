#![allow(dead_code)]

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use badgerec::config::BadgeRecConfig;
use badgerec::embedding::EmbeddingProvider;
use badgerec::engine::RecommendEngine;
use badgerec::index::{MetadataFilter, QueryMatch, VectorEntry, VectorIndex};
use badgerec::llm::GenerativeModel;
use badgerec::record::Namespace;

pub const DIMS: usize = 8;

/// Deterministic embedding provider: each input byte bumps one dimension, so
/// identical text embeds identically and overlapping text embeds similarly.
pub struct MockEmbedding;

#[async_trait]
impl EmbeddingProvider for MockEmbedding {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut v = vec![0.0f32; DIMS];
        for b in text.bytes() {
            v[b as usize % DIMS] += 1.0;
        }
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in &mut v {
                *x /= norm;
            }
        }
        Ok(v)
    }

    fn dimensions(&self) -> usize {
        DIMS
    }
}

/// In-memory vector index with cosine scoring and `$nin` filter support,
/// namespaced like the real backend.
#[derive(Default)]
pub struct MemoryIndex {
    entries: Mutex<HashMap<&'static str, HashMap<String, VectorEntry>>>,
}

impl MemoryIndex {
    pub fn contains(&self, namespace: Namespace, id: &str) -> bool {
        self.entries
            .lock()
            .unwrap()
            .get(namespace.as_str())
            .is_some_and(|m| m.contains_key(id))
    }

    pub fn len(&self, namespace: Namespace) -> usize {
        self.entries
            .lock()
            .unwrap()
            .get(namespace.as_str())
            .map_or(0, HashMap::len)
    }

    fn matches_filter(entry: &VectorEntry, filter: &MetadataFilter) -> bool {
        let Some(map) = filter.as_value().as_object() else {
            return true;
        };
        for (field, condition) in map {
            let excluded = condition
                .get("$nin")
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default();
            let actual = entry.metadata.get(field).and_then(Value::as_str);
            if let Some(actual) = actual {
                if excluded.iter().any(|v| v.as_str() == Some(actual)) {
                    return false;
                }
            }
        }
        true
    }

    fn rank(
        &self,
        namespace: Namespace,
        vector: &[f32],
        top_k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Vec<QueryMatch> {
        let entries = self.entries.lock().unwrap();
        let Some(space) = entries.get(namespace.as_str()) else {
            return Vec::new();
        };
        let mut matches: Vec<QueryMatch> = space
            .values()
            .filter(|e| filter.is_none_or(|f| Self::matches_filter(e, f)))
            .map(|e| QueryMatch {
                id: e.id.clone(),
                score: cosine(vector, &e.values),
                metadata: e.metadata.clone(),
            })
            .collect();
        matches.sort_by(|a, b| b.score.total_cmp(&a.score));
        matches.truncate(top_k);
        matches
    }
}

#[async_trait]
impl VectorIndex for MemoryIndex {
    async fn upsert(&self, namespace: Namespace, entry: VectorEntry) -> Result<()> {
        self.entries
            .lock()
            .unwrap()
            .entry(namespace.as_str())
            .or_default()
            .insert(entry.id.clone(), entry);
        Ok(())
    }

    async fn delete(&self, namespace: Namespace, id: &str) -> Result<()> {
        if let Some(space) = self.entries.lock().unwrap().get_mut(namespace.as_str()) {
            space.remove(id);
        }
        Ok(())
    }

    async fn fetch(&self, namespace: Namespace, id: &str) -> Result<Option<VectorEntry>> {
        Ok(self
            .entries
            .lock()
            .unwrap()
            .get(namespace.as_str())
            .and_then(|m| m.get(id))
            .cloned())
    }

    async fn query_by_vector(
        &self,
        namespace: Namespace,
        vector: &[f32],
        top_k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<QueryMatch>> {
        Ok(self.rank(namespace, vector, top_k, filter))
    }

    async fn query_by_id(
        &self,
        namespace: Namespace,
        id: &str,
        top_k: usize,
    ) -> Result<Vec<QueryMatch>> {
        let vector = match self.fetch(namespace, id).await? {
            Some(entry) => entry.values,
            None => return Ok(Vec::new()),
        };
        Ok(self.rank(namespace, &vector, top_k, None))
    }

    async fn index_exists(&self) -> Result<bool> {
        Ok(true)
    }

    async fn create_index(&self, _dimensions: usize) -> Result<()> {
        Ok(())
    }

    async fn index_ready(&self) -> Result<bool> {
        Ok(true)
    }
}

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let na: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let nb: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if na == 0.0 || nb == 0.0 {
        0.0
    } else {
        dot / (na * nb)
    }
}

/// Generative model stub returning a canned response, counting calls, and
/// keeping the last prompts it was handed.
pub struct ScriptedModel {
    pub response: String,
    pub calls: AtomicUsize,
    pub last_user_prompt: Mutex<Option<String>>,
}

impl ScriptedModel {
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            response: response.into(),
            calls: AtomicUsize::new(0),
            last_user_prompt: Mutex::new(None),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_user_prompt(&self) -> Option<String> {
        self.last_user_prompt.lock().unwrap().clone()
    }
}

#[async_trait]
impl GenerativeModel for ScriptedModel {
    async fn complete(&self, _system_prompt: &str, user_prompt: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_user_prompt.lock().unwrap() = Some(user_prompt.to_string());
        Ok(self.response.clone())
    }
}

/// Build an engine over the in-memory stubs, with file backups rooted in a
/// temp dir. Must run inside a tokio runtime (the backup sweeper spawns).
pub fn test_engine(
    index: Arc<MemoryIndex>,
    model: Arc<ScriptedModel>,
    backup_dir: &std::path::Path,
    retention_minutes: i64,
) -> RecommendEngine {
    let mut config = BadgeRecConfig::default();
    config.backup.dir = backup_dir.to_string_lossy().into_owned();
    config.backup.retention_minutes = retention_minutes;
    // Keep the sweeper effectively idle so tests control expiry themselves.
    config.backup.sweep_interval_secs = 3600;
    RecommendEngine::from_parts(Arc::new(MockEmbedding), index, model, &config).unwrap()
}

pub fn badge_record(id: &str, name: &str, skills: &[&str]) -> Value {
    json!({
        "badge_id": id,
        "name": name,
        "issuer": "Open Credentials Board",
        "description": format!("Demonstrates {name}"),
        "criteria": "Pass the assessment",
        "skillsValidated": skills,
        "competency": "intermediate",
        "related_badges": []
    })
}

pub fn user_record(id: &str, goal: &str, acquired: &[&str]) -> Value {
    json!({
        "user_id": id,
        "name": "Jordan",
        "goal": goal,
        "skills": ["sql", "excel"],
        "competency_level": "intermediate",
        "learning_history": "online courses",
        "education_level": "bachelor",
        "acquired_badges": acquired
    })
}

/// A model response naming one badge, valid against the output schema.
pub fn valid_model_response(badge_id: &str) -> String {
    json!({
        "recommendations": [{
            "badge_id": badge_id,
            "name": "Advanced SQL",
            "issuer": "Open Credentials Board",
            "skills": ["sql"],
            "competency": "intermediate",
            "similarity_score": 0.91,
            "recommendation_reason": "Builds directly on current skills",
            "preparation_steps": "Review window functions",
            "expected_benefits": "Unlocks analyst roles"
        }]
    })
    .to_string()
}
