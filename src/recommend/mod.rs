//! Recommendation orchestration.
//!
//! Per request: fetch the user by exact id, retrieve candidate badges,
//! render profile and candidates into fixed textual blocks, ask the
//! generative model for a ranked justification under a strict JSON schema,
//! and parse the output. Every failure along the way is absorbed into an
//! empty recommendation set — the caller never sees raw model text or a
//! propagated upstream error.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::index::QueryMatch;
use crate::llm::GenerativeModel;
use crate::record::Namespace;
use crate::retrieve::{acquired_badges, Retriever};

/// One ranked, justified badge recommendation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recommendation {
    pub badge_id: String,
    pub name: String,
    pub issuer: String,
    pub skills: Vec<String>,
    pub competency: String,
    pub similarity_score: f64,
    pub recommendation_reason: String,
    pub preparation_steps: String,
    pub expected_benefits: String,
}

/// The response shape exposed at the application boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationResponse {
    pub recommendations: Vec<Recommendation>,
}

impl RecommendationResponse {
    pub fn empty() -> Self {
        Self {
            recommendations: Vec::new(),
        }
    }
}

const SYSTEM_PROMPT: &str = "\
You are an open badge recommendation expert. Analyze the user's profile and \
the retrieved badge candidates, then recommend the most suitable badges.

For each recommended badge explain why it suits the user, what preparation \
is needed to earn it, and what benefits earning it brings.

Respond with JSON only, no prose and no markdown, matching exactly this schema:
{\"recommendations\": [{\"badge_id\": string, \"name\": string, \"issuer\": string, \
\"skills\": [string], \"competency\": string, \"similarity_score\": number, \
\"recommendation_reason\": string, \"preparation_steps\": string, \
\"expected_benefits\": string}]}

Only recommend badges from the provided candidates. Copy badge_id, name, \
issuer, skills, competency, and similarity_score verbatim from the candidate \
block.";

pub struct Recommender {
    retriever: Arc<Retriever>,
    model: Arc<dyn GenerativeModel>,
    /// Candidate badges retrieved per request.
    candidate_top_k: usize,
}

impl Recommender {
    pub fn new(
        retriever: Arc<Retriever>,
        model: Arc<dyn GenerativeModel>,
        candidate_top_k: usize,
    ) -> Self {
        Self {
            retriever,
            model,
            candidate_top_k,
        }
    }

    /// Produce up to `count` recommendations for a user.
    ///
    /// Never fails: an unservable request (missing user, upstream failure,
    /// unparseable model output) yields an empty response plus a log trail.
    pub async fn recommend(&self, user_id: &str, count: usize) -> RecommendationResponse {
        match self.run(user_id, count).await {
            Ok(response) => response,
            Err(err) => {
                warn!(user_id, error = %err, "recommendation request failed");
                RecommendationResponse::empty()
            }
        }
    }

    async fn run(&self, user_id: &str, count: usize) -> Result<RecommendationResponse> {
        let clean = user_id.trim();
        if clean.is_empty() {
            debug!("empty user id; skipping generation");
            return Ok(RecommendationResponse::empty());
        }

        let mut users = self
            .retriever
            .lookup_exact(clean, Namespace::User, 1)
            .await?;
        let Some(user) = users.drain(..).next() else {
            debug!(user_id = clean, "user not indexed; skipping generation");
            return Ok(RecommendationResponse::empty());
        };

        let candidates = self
            .retriever
            .recommend_candidates_for_user(clean, self.candidate_top_k)
            .await?;
        if candidates.is_empty() {
            debug!(user_id = clean, "no candidate badges; skipping generation");
            return Ok(RecommendationResponse::empty());
        }

        let profile = format_user_profile(&user.metadata);
        let candidate_block = format_candidates(&candidates);
        let user_prompt = format!(
            "User profile:\n{profile}\n\
             Candidate badges:\n{candidate_block}\n\
             Recommend exactly {count} badges from the candidates above, or \
             fewer if fewer qualify.",
        );

        let raw = self.model.complete(SYSTEM_PROMPT, &user_prompt).await?;
        Ok(parse_model_output(&raw, count))
    }
}

/// Render the user profile block the model is conditioned on.
///
/// Field order and presence are fixed so model behavior stays reproducible.
pub fn format_user_profile(metadata: &Value) -> String {
    format!(
        "Name: {}\n\
         Goal: {}\n\
         Skills: {}\n\
         Competency level: {}\n\
         Education level: {}\n\
         Acquired badges: {}\n",
        metadata_text(metadata, "name"),
        metadata_text(metadata, "goal"),
        metadata_text(metadata, "skills"),
        metadata_text(metadata, "competency_level"),
        metadata_text(metadata, "education_level"),
        acquired_badges(metadata).join(", "),
    )
}

/// Render retrieved candidates into the fixed-schema textual block.
///
/// Similarity scores are printed to 4 decimal places.
pub fn format_candidates(matches: &[QueryMatch]) -> String {
    let mut block = String::new();
    for m in matches {
        block.push_str(&format!(
            "Badge ID: {}\n\
             Name: {}\n\
             Issuer: {}\n\
             Skills: {}\n\
             Competency: {}\n\
             Similarity score: {:.4}\n\n",
            m.id,
            metadata_text(&m.metadata, "name"),
            metadata_text(&m.metadata, "issuer"),
            metadata_text(&m.metadata, "skills"),
            metadata_text(&m.metadata, "competency"),
            m.score,
        ));
    }
    block
}

/// Parse the model's response strictly against the recommendation schema.
///
/// A surrounding markdown code fence is tolerated; anything else that fails
/// to parse yields an empty response. The result never exceeds `count`.
pub fn parse_model_output(raw: &str, count: usize) -> RecommendationResponse {
    let stripped = strip_code_fence(raw.trim());
    match serde_json::from_str::<RecommendationResponse>(stripped) {
        Ok(mut response) => {
            response.recommendations.truncate(count);
            response
        }
        Err(err) => {
            warn!(error = %err, "model output failed schema parse");
            RecommendationResponse::empty()
        }
    }
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    // Drop the info string ("json") on the opening fence line.
    let body = match rest.split_once('\n') {
        Some((_, body)) => body,
        None => rest,
    };
    body.strip_suffix("```").unwrap_or(body).trim()
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
