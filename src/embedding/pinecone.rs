//! Pinecone inference API embedding provider.

use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use super::EmbeddingProvider;
use crate::config::EmbeddingConfig;
use crate::error::RecError;

const INFERENCE_URL: &str = "https://api.pinecone.io/embed";
const API_VERSION: &str = "2025-01";

/// Remote embedding provider using Pinecone-hosted models
/// (default `multilingual-e5-large`, 1024 dimensions).
pub struct PineconeEmbeddings {
    client: reqwest::Client,
    api_key: String,
    model: String,
    dimensions: usize,
}

#[derive(Deserialize)]
struct EmbedResponse {
    data: Vec<EmbedData>,
}

#[derive(Deserialize)]
struct EmbedData {
    values: Vec<f32>,
}

impl PineconeEmbeddings {
    pub fn new(config: &EmbeddingConfig, api_key: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.to_string(),
            model: config.model.clone(),
            dimensions: config.dimensions,
        }
    }
}

#[async_trait]
impl EmbeddingProvider for PineconeEmbeddings {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let body = json!({
            "model": self.model,
            "parameters": { "input_type": "query", "truncate": "END" },
            "inputs": [ { "text": text } ],
        });

        let response = self
            .client
            .post(INFERENCE_URL)
            .header("Api-Key", &self.api_key)
            .header("X-Pinecone-API-Version", API_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|e| RecError::upstream("embedding", e))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(RecError::upstream("embedding", format!("{status}: {detail}")).into());
        }

        let parsed: EmbedResponse = response
            .json()
            .await
            .map_err(|e| RecError::upstream("embedding", e))?;

        let values = parsed
            .data
            .into_iter()
            .next()
            .map(|d| d.values)
            .ok_or_else(|| RecError::upstream("embedding", "empty data array"))?;

        if values.len() != self.dimensions {
            return Err(RecError::upstream(
                "embedding",
                format!(
                    "expected {} dimensions, got {}",
                    self.dimensions,
                    values.len()
                ),
            )
            .into());
        }

        debug!(model = %self.model, len = text.len(), "embedded query text");
        Ok(values)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}
