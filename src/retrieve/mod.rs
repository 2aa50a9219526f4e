//! Semantic and exact-id retrieval against the vector index.
//!
//! The [`Retriever`] embeds query text and issues namespaced similarity
//! queries, or bypasses embedding entirely for exact-id lookups. Ordering
//! authority rests with the backend's similarity scores; nothing here
//! re-sorts.

use anyhow::Result;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::embedding::EmbeddingProvider;
use crate::index::manager::IndexManager;
use crate::index::{MetadataFilter, QueryMatch};
use crate::record::{parse_id_list, Namespace};

pub struct Retriever {
    embedding: Arc<dyn EmbeddingProvider>,
    index: Arc<IndexManager>,
}

impl Retriever {
    pub fn new(embedding: Arc<dyn EmbeddingProvider>, index: Arc<IndexManager>) -> Self {
        Self { embedding, index }
    }

    /// Embed `query` and run a similarity search in the kind's namespace.
    ///
    /// Matches come back in the backend's descending-score order.
    pub async fn search(
        &self,
        query: &str,
        namespace: Namespace,
        top_k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<QueryMatch>> {
        let vector = self.embedding.embed(query).await?;
        let handle = self.index.get_handle().await?;
        let matches = handle
            .query_by_vector(namespace, &vector, top_k, filter)
            .await?;
        debug!(namespace = %namespace, top_k, found = matches.len(), "semantic search");
        Ok(matches)
    }

    /// Query by exact identifier, bypassing embedding.
    ///
    /// This is a best-effort call path: an empty or non-ASCII id is rejected
    /// with a warning and an empty result, and an upstream failure degrades
    /// the same way rather than propagating.
    pub async fn lookup_exact(
        &self,
        id: &str,
        namespace: Namespace,
        top_k: usize,
    ) -> Result<Vec<QueryMatch>> {
        let clean = id.trim();
        if clean.is_empty() || !clean.is_ascii() {
            warn!(id, "rejecting id not representable in the index");
            return Ok(Vec::new());
        }

        let handle = self.index.get_handle().await?;
        match handle.query_by_id(namespace, clean, top_k).await {
            Ok(matches) => Ok(matches),
            Err(err) => {
                warn!(id = clean, error = %err, "exact-id query failed");
                Ok(Vec::new())
            }
        }
    }

    /// Derive candidate badges for a user: exact profile lookup, semantic
    /// query from goal/skills/competency, exclusion of acquired badges.
    ///
    /// A missing user yields an empty list — absence is a valid, common
    /// outcome for speculative lookups, not an error.
    pub async fn recommend_candidates_for_user(
        &self,
        user_id: &str,
        top_k: usize,
    ) -> Result<Vec<QueryMatch>> {
        let mut users = self.lookup_exact(user_id, Namespace::User, 1).await?;
        let Some(user) = users.drain(..).next() else {
            debug!(user_id, "no user vector found");
            return Ok(Vec::new());
        };

        let query = build_user_query(&user.metadata);
        let acquired = acquired_badges(&user.metadata);
        let filter = if acquired.is_empty() {
            None
        } else {
            Some(MetadataFilter::not_in("id", &acquired))
        };

        self.search(&query, Namespace::Badge, top_k, filter.as_ref())
            .await
    }
}

/// Render the semantic badge query from a user's metadata projection.
///
/// The template is fixed; changing it changes every embedding comparison.
pub fn build_user_query(metadata: &Value) -> String {
    format!(
        "Goal: {}\nSkills: {}\nCompetency level: {}\n",
        metadata_text(metadata, "goal"),
        metadata_text(metadata, "skills"),
        metadata_text(metadata, "competency_level"),
    )
}

/// Acquired badge ids from user metadata, tolerating the serialized-string
/// form written by older ingestion tooling.
pub fn acquired_badges(metadata: &Value) -> Vec<String> {
    metadata
        .get("acquired_badges")
        .map(parse_id_list)
        .unwrap_or_default()
}

fn metadata_text(metadata: &Value, key: &str) -> String {
    match metadata.get(key) {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Array(items)) => items
            .iter()
            .map(|v| match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect::<Vec<_>>()
            .join(", "),
        Some(other) => other.to_string(),
    }
}
