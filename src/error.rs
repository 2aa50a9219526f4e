//! Domain error types.
//!
//! Absence of a user, badge, or backup is never an error here — those
//! outcomes are modeled as empty collections or `Option` at the call sites.

use thiserror::Error;

/// Typed failures surfaced by the recommendation pipeline.
#[derive(Error, Debug)]
pub enum RecError {
    /// A required credential or setting is absent. Fatal at startup.
    #[error("required configuration missing: {0}")]
    ConfigurationMissing(String),

    /// The record-kind detector could not classify an input record.
    #[error("cannot classify record as badge or user{}", hint_suffix(.file_hint))]
    AmbiguousType {
        /// Optional filename the detector fell back to.
        file_hint: Option<String>,
    },

    /// An identifier that cannot determine a namespace or be sent to the index.
    #[error("invalid identifier: {0:?}")]
    InvalidIdentifier(String),

    /// An external capability call failed or returned an unusable response.
    #[error("upstream {service} call failed: {message}")]
    Upstream { service: String, message: String },
}

impl RecError {
    /// Shorthand for an [`RecError::Upstream`] failure.
    pub fn upstream(service: &str, message: impl ToString) -> Self {
        Self::Upstream {
            service: service.to_string(),
            message: message.to_string(),
        }
    }
}

fn hint_suffix(file_hint: &Option<String>) -> String {
    match file_hint {
        Some(hint) => format!(" (file hint: {hint:?})"),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ambiguous_type_mentions_hint() {
        let with_hint = RecError::AmbiguousType {
            file_hint: Some("data_42.json".into()),
        };
        assert!(with_hint.to_string().contains("data_42.json"));

        let without = RecError::AmbiguousType { file_hint: None };
        assert!(!without.to_string().contains("file hint"));
    }

    #[test]
    fn upstream_shorthand() {
        let err = RecError::upstream("pinecone", "connection refused");
        assert!(err.to_string().contains("pinecone"));
        assert!(err.to_string().contains("connection refused"));
    }
}
