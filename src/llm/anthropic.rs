//! Anthropic messages API implementation of [`GenerativeModel`].

use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use super::GenerativeModel;
use crate::config::GenerationConfig;
use crate::error::RecError;

const MESSAGES_URL: &str = "https://api.anthropic.com/v1/messages";
const API_VERSION: &str = "2023-06-01";

pub struct AnthropicModel {
    client: reqwest::Client,
    api_key: String,
    model: String,
    temperature: f64,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: String,
}

impl AnthropicModel {
    pub fn new(config: &GenerationConfig, api_key: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.to_string(),
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        }
    }
}

#[async_trait]
impl GenerativeModel for AnthropicModel {
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String> {
        let body = json!({
            "model": self.model,
            "max_tokens": self.max_tokens,
            "temperature": self.temperature,
            "system": system_prompt,
            "messages": [ { "role": "user", "content": user_prompt } ],
        });

        let response = self
            .client
            .post(MESSAGES_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|e| RecError::upstream("generation", e))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(RecError::upstream("generation", format!("{status}: {detail}")).into());
        }

        let parsed: MessagesResponse = response
            .json()
            .await
            .map_err(|e| RecError::upstream("generation", e))?;

        let text: String = parsed
            .content
            .into_iter()
            .map(|block| block.text)
            .collect();
        debug!(model = %self.model, chars = text.len(), "model completion received");
        Ok(text)
    }
}
