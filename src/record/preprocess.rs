//! Record preprocessing — (id, text, metadata) triples for embedding.
//!
//! Each record kind supplies four things through the [`Preprocessor`] trait:
//! its required-field set (used by the detector), a deterministic labeled
//! text template, a metadata projection, and an id extractor. The kind set is
//! closed — badge and user — so callers select an implementation with
//! [`preprocessor_for`] and never match on the kind themselves.

use anyhow::Result;
use serde_json::{json, Value};

use crate::error::RecError;
use crate::record::types::{parse_id_list, Namespace};

/// A record reduced to what the index needs.
#[derive(Debug, Clone)]
pub struct ProcessedRecord {
    pub id: String,
    /// Text blob fed to the embedding provider. Byte-stable for identical
    /// input, since embeddings are compared by cosine similarity.
    pub text: String,
    /// Fixed metadata projection stored alongside the vector.
    pub metadata: Value,
}

/// Per-kind preprocessing capability.
pub trait Preprocessor: Send + Sync {
    /// Field names that identify this kind, used for detection scoring.
    fn required_fields(&self) -> &'static [&'static str];

    /// Render the record into a labeled text blob. Missing fields render as
    /// empty strings, never as errors.
    fn build_text(&self, record: &Value) -> String;

    /// Project the metadata subset needed for filtering and display.
    fn build_metadata(&self, record: &Value) -> Value;

    /// Extract the record identifier.
    fn record_id(&self, record: &Value) -> Option<String>;

    /// Run the full preprocessing contract.
    fn preprocess(&self, record: &Value) -> Result<ProcessedRecord> {
        let id = self
            .record_id(record)
            .ok_or_else(|| RecError::InvalidIdentifier(String::new()))?;
        Ok(ProcessedRecord {
            id,
            text: self.build_text(record),
            metadata: self.build_metadata(record),
        })
    }
}

/// Select the preprocessor for a record kind.
pub fn preprocessor_for(namespace: Namespace) -> &'static dyn Preprocessor {
    match namespace {
        Namespace::Badge => &BadgePreprocessor,
        Namespace::User => &UserPreprocessor,
    }
}

pub struct BadgePreprocessor;

impl Preprocessor for BadgePreprocessor {
    fn required_fields(&self) -> &'static [&'static str] {
        &[
            "badge_id",
            "name",
            "issuer",
            "description",
            "criteria",
            "skillsValidated",
            "competency",
            "related_badges",
        ]
    }

    fn build_text(&self, record: &Value) -> String {
        format!(
            "Badge name: {}\n\
             Issuer: {}\n\
             Description: {}\n\
             Criteria: {}\n\
             Alignment: {}\n\
             Employment outcome: {}\n\
             Skills validated: {}\n\
             Competency: {}\n\
             Learning opportunity: {}\n",
            field_text(record, "name"),
            field_text(record, "issuer"),
            field_text(record, "description"),
            field_text(record, "criteria"),
            field_text(record, "alignment"),
            field_text(record, "employmentOutcome"),
            field_text(record, "skillsValidated"),
            field_text(record, "competency"),
            field_text(record, "learningOpportunity"),
        )
    }

    fn build_metadata(&self, record: &Value) -> Value {
        // The id is duplicated into metadata so exclusion filters can
        // reference it.
        json!({
            "id": field_text(record, "badge_id"),
            "name": field_text(record, "name"),
            "issuer": field_text(record, "issuer"),
            "skills": string_list(record, "skillsValidated"),
            "competency": field_text(record, "competency"),
            "related_badges": string_list(record, "related_badges"),
        })
    }

    fn record_id(&self, record: &Value) -> Option<String> {
        record
            .get("badge_id")
            .and_then(Value::as_str)
            .map(str::to_string)
    }
}

pub struct UserPreprocessor;

impl Preprocessor for UserPreprocessor {
    fn required_fields(&self) -> &'static [&'static str] {
        &[
            "user_id",
            "name",
            "goal",
            "skills",
            "competency_level",
            "learning_history",
            "education_level",
            "acquired_badges",
        ]
    }

    fn build_text(&self, record: &Value) -> String {
        format!(
            "Name: {}\n\
             Goal: {}\n\
             Skills: {}\n\
             Competency level: {}\n\
             Learning history: {}\n\
             Employment history: {}\n\
             Education level: {}\n\
             Engagement metrics: {}\n",
            field_text(record, "name"),
            field_text(record, "goal"),
            field_text(record, "skills"),
            field_text(record, "competency_level"),
            field_text(record, "learning_history"),
            field_text(record, "employment_history"),
            field_text(record, "education_level"),
            field_text(record, "engagement_metrics"),
        )
    }

    fn build_metadata(&self, record: &Value) -> Value {
        // acquired_badges is normalized to a genuine list at write time, even
        // when the source serialized it as a string.
        let acquired = record
            .get("acquired_badges")
            .map(parse_id_list)
            .unwrap_or_default();
        json!({
            "name": field_text(record, "name"),
            "goal": field_text(record, "goal"),
            "skills": string_list(record, "skills"),
            "competency_level": field_text(record, "competency_level"),
            "acquired_badges": acquired,
            "education_level": field_text(record, "education_level"),
        })
    }

    fn record_id(&self, record: &Value) -> Option<String> {
        record
            .get("user_id")
            .and_then(Value::as_str)
            .map(str::to_string)
    }
}

/// Render a field as display text: strings pass through, lists join with
/// ", ", scalars use their JSON form, missing/null render empty.
fn field_text(record: &Value, key: &str) -> String {
    match record.get(key) {
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

/// Read a field as a list of strings, empty when missing or mistyped.
fn string_list(record: &Value, key: &str) -> Vec<String> {
    record.get(key).map(parse_id_list).unwrap_or_default()
}
