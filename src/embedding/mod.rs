//! Text-to-vector embedding capability.
//!
//! Provides the [`EmbeddingProvider`] trait and a remote implementation
//! backed by the Pinecone inference API. The provider is created via
//! [`create_provider`] from configuration.

pub mod pinecone;

use anyhow::Result;
use async_trait::async_trait;

/// Trait for embedding text into vectors.
///
/// Implementations produce vectors of exactly [`dimensions`](Self::dimensions)
/// length, compared downstream by cosine similarity. Calls are network
/// operations and must not be made while holding a lock.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a single text string into a vector.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Number of dimensions this provider produces. The index is created
    /// with this dimensionality.
    fn dimensions(&self) -> usize;
}

/// Create an embedding provider from config.
///
/// Currently only `"pinecone"` is supported.
pub fn create_provider(
    config: &crate::config::EmbeddingConfig,
    api_key: &str,
) -> Result<Box<dyn EmbeddingProvider>> {
    match config.provider.as_str() {
        "pinecone" => {
            let provider = pinecone::PineconeEmbeddings::new(config, api_key);
            Ok(Box::new(provider))
        }
        other => anyhow::bail!("unknown embedding provider: {other}. Supported: pinecone"),
    }
}
