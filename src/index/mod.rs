//! Vector index capability.
//!
//! Defines the [`VectorIndex`] trait consumed by the retrieval and ingestion
//! paths, the wire-level types ([`VectorEntry`], [`QueryMatch`],
//! [`MetadataFilter`]), and two submodules: [`manager`] owns the one-time
//! index lifecycle, [`pinecone`] is the remote implementation.

pub mod manager;
pub mod pinecone;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::record::Namespace;

/// A stored vector: id, values, and the projected metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorEntry {
    pub id: String,
    pub values: Vec<f32>,
    #[serde(default)]
    pub metadata: Value,
}

/// One similarity match, in the backend's descending-score order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryMatch {
    pub id: String,
    /// Cosine similarity — higher is more relevant.
    pub score: f32,
    #[serde(default)]
    pub metadata: Value,
}

/// Metadata filter expression in the index's query language.
#[derive(Debug, Clone)]
pub struct MetadataFilter(Value);

impl MetadataFilter {
    /// Exclude entries whose `field` is any of `values`
    /// (`{"field": {"$nin": [...]}}`).
    pub fn not_in<S: AsRef<str>>(field: &str, values: &[S]) -> Self {
        let values: Vec<&str> = values.iter().map(AsRef::as_ref).collect();
        Self(json!({ field: { "$nin": values } }))
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }
}

/// The external vector index, partitioned into badge and user namespaces.
///
/// Query results come back pre-sorted by descending similarity; callers do
/// not re-sort. All methods are slow network operations.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Insert or update a vector entry by id.
    async fn upsert(&self, namespace: Namespace, entry: VectorEntry) -> Result<()>;

    /// Delete a vector by id. Deleting an absent id is not an error.
    async fn delete(&self, namespace: Namespace, id: &str) -> Result<()>;

    /// Fetch a single entry by id, `None` when absent.
    async fn fetch(&self, namespace: Namespace, id: &str) -> Result<Option<VectorEntry>>;

    /// Similarity query by embedding vector with an optional metadata filter.
    async fn query_by_vector(
        &self,
        namespace: Namespace,
        vector: &[f32],
        top_k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<QueryMatch>>;

    /// Query using a stored entry's own vector, addressed by id.
    async fn query_by_id(
        &self,
        namespace: Namespace,
        id: &str,
        top_k: usize,
    ) -> Result<Vec<QueryMatch>>;

    /// Whether the named index exists at the service.
    async fn index_exists(&self) -> Result<bool>;

    /// Create the index with the given dimensionality and cosine metric.
    async fn create_index(&self, dimensions: usize) -> Result<()>;

    /// Whether the index reports itself ready to serve.
    async fn index_ready(&self) -> Result<bool>;
}
