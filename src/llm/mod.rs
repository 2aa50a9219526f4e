//! Generative-model capability.
//!
//! The recommender consumes a chat model through [`GenerativeModel`] with an
//! enforced JSON-only output contract; [`anthropic`] is the remote
//! implementation. Created via [`create_model`] from configuration.

pub mod anthropic;

use anyhow::Result;
use async_trait::async_trait;

/// A single-turn completion capability.
#[async_trait]
pub trait GenerativeModel: Send + Sync {
    /// Complete one system + user turn, returning the raw model text.
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String>;
}

/// Create a generative model from config.
///
/// Currently only `"anthropic"` is supported.
pub fn create_model(
    config: &crate::config::GenerationConfig,
    api_key: &str,
) -> Result<Box<dyn GenerativeModel>> {
    match config.provider.as_str() {
        "anthropic" => {
            let model = anthropic::AnthropicModel::new(config, api_key);
            Ok(Box::new(model))
        }
        other => anyhow::bail!("unknown generation provider: {other}. Supported: anthropic"),
    }
}
