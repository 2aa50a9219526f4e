//! Pinecone REST implementation of [`VectorIndex`].
//!
//! Index lifecycle goes through the control plane (`api.pinecone.io`); vector
//! operations go through the index's own data-plane host, which is resolved
//! from the describe-index response and cached for the process lifetime.

use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::OnceCell;
use tracing::debug;

use super::{MetadataFilter, QueryMatch, VectorEntry, VectorIndex};
use crate::config::IndexConfig;
use crate::error::RecError;
use crate::record::Namespace;

const CONTROL_PLANE: &str = "https://api.pinecone.io";
const API_VERSION: &str = "2025-01";

pub struct PineconeIndex {
    client: reqwest::Client,
    api_key: String,
    index_name: String,
    cloud: String,
    region: String,
    host: OnceCell<String>,
}

#[derive(Deserialize)]
struct DescribeIndexResponse {
    host: String,
    status: IndexStatus,
}

#[derive(Deserialize)]
struct IndexStatus {
    ready: bool,
}

#[derive(Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<QueryMatch>,
}

#[derive(Deserialize)]
struct FetchResponse {
    #[serde(default)]
    vectors: std::collections::HashMap<String, VectorEntry>,
}

impl PineconeIndex {
    pub fn new(config: &IndexConfig, api_key: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.to_string(),
            index_name: config.name.clone(),
            cloud: config.cloud.clone(),
            region: config.region.clone(),
            host: OnceCell::new(),
        }
    }

    fn request(&self, method: reqwest::Method, url: String) -> reqwest::RequestBuilder {
        self.client
            .request(method, url)
            .header("Api-Key", &self.api_key)
            .header("X-Pinecone-API-Version", API_VERSION)
    }

    async fn describe(&self) -> Result<DescribeIndexResponse> {
        let url = format!("{CONTROL_PLANE}/indexes/{}", self.index_name);
        let response = self
            .request(reqwest::Method::GET, url)
            .send()
            .await
            .map_err(|e| RecError::upstream("index", e))?;
        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(RecError::upstream("index", format!("{status}: {detail}")).into());
        }
        Ok(response
            .json()
            .await
            .map_err(|e| RecError::upstream("index", e))?)
    }

    /// Resolve and cache the data-plane host for this index.
    async fn data_url(&self, path: &str) -> Result<String> {
        let host = self
            .host
            .get_or_try_init(|| async {
                let described = self.describe().await?;
                Ok::<String, anyhow::Error>(described.host)
            })
            .await?;
        Ok(format!("https://{host}{path}"))
    }

    async fn data_post(&self, path: &str, body: Value) -> Result<reqwest::Response> {
        let url = self.data_url(path).await?;
        let response = self
            .request(reqwest::Method::POST, url)
            .json(&body)
            .send()
            .await
            .map_err(|e| RecError::upstream("index", e))?;
        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(RecError::upstream("index", format!("{status}: {detail}")).into());
        }
        Ok(response)
    }

    async fn run_query(&self, mut body: Value, namespace: Namespace) -> Result<Vec<QueryMatch>> {
        body["namespace"] = json!(namespace.as_str());
        body["includeMetadata"] = json!(true);
        let response = self.data_post("/query", body).await?;
        let parsed: QueryResponse = response
            .json()
            .await
            .map_err(|e| RecError::upstream("index", e))?;
        Ok(parsed.matches)
    }
}

#[async_trait]
impl VectorIndex for PineconeIndex {
    async fn upsert(&self, namespace: Namespace, entry: VectorEntry) -> Result<()> {
        let body = json!({
            "namespace": namespace.as_str(),
            "vectors": [ {
                "id": entry.id,
                "values": entry.values,
                "metadata": entry.metadata,
            } ],
        });
        self.data_post("/vectors/upsert", body).await?;
        Ok(())
    }

    async fn delete(&self, namespace: Namespace, id: &str) -> Result<()> {
        let body = json!({
            "namespace": namespace.as_str(),
            "ids": [id],
        });
        self.data_post("/vectors/delete", body).await?;
        Ok(())
    }

    async fn fetch(&self, namespace: Namespace, id: &str) -> Result<Option<VectorEntry>> {
        let url = self
            .data_url(&format!(
                "/vectors/fetch?ids={}&namespace={}",
                id,
                namespace.as_str()
            ))
            .await?;
        let response = self
            .request(reqwest::Method::GET, url)
            .send()
            .await
            .map_err(|e| RecError::upstream("index", e))?;
        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(RecError::upstream("index", format!("{status}: {detail}")).into());
        }
        let mut parsed: FetchResponse = response
            .json()
            .await
            .map_err(|e| RecError::upstream("index", e))?;
        Ok(parsed.vectors.remove(id))
    }

    async fn query_by_vector(
        &self,
        namespace: Namespace,
        vector: &[f32],
        top_k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<QueryMatch>> {
        let mut body = json!({
            "vector": vector,
            "topK": top_k,
        });
        if let Some(filter) = filter {
            body["filter"] = filter.as_value().clone();
        }
        debug!(namespace = %namespace, top_k, "vector similarity query");
        self.run_query(body, namespace).await
    }

    async fn query_by_id(
        &self,
        namespace: Namespace,
        id: &str,
        top_k: usize,
    ) -> Result<Vec<QueryMatch>> {
        let body = json!({
            "id": id,
            "topK": top_k,
        });
        debug!(namespace = %namespace, id, "exact-id query");
        self.run_query(body, namespace).await
    }

    async fn index_exists(&self) -> Result<bool> {
        let url = format!("{CONTROL_PLANE}/indexes/{}", self.index_name);
        let response = self
            .request(reqwest::Method::GET, url)
            .send()
            .await
            .map_err(|e| RecError::upstream("index", e))?;
        match response.status() {
            reqwest::StatusCode::NOT_FOUND => Ok(false),
            status if status.is_success() => Ok(true),
            status => {
                let detail = response.text().await.unwrap_or_default();
                Err(RecError::upstream("index", format!("{status}: {detail}")).into())
            }
        }
    }

    async fn create_index(&self, dimensions: usize) -> Result<()> {
        let body = json!({
            "name": self.index_name,
            "dimension": dimensions,
            "metric": "cosine",
            "spec": {
                "serverless": { "cloud": self.cloud, "region": self.region }
            },
        });
        let url = format!("{CONTROL_PLANE}/indexes");
        let response = self
            .request(reqwest::Method::POST, url)
            .json(&body)
            .send()
            .await
            .map_err(|e| RecError::upstream("index", e))?;
        let status = response.status();
        // 409 means another caller created it first — the operation is idempotent.
        if !status.is_success() && status != reqwest::StatusCode::CONFLICT {
            let detail = response.text().await.unwrap_or_default();
            return Err(RecError::upstream("index", format!("{status}: {detail}")).into());
        }
        Ok(())
    }

    async fn index_ready(&self) -> Result<bool> {
        Ok(self.describe().await?.status.ready)
    }
}
