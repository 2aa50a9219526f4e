//! Core record type definitions.
//!
//! Defines [`Namespace`] (the two logical partitions of the vector index),
//! the [`Badge`] and [`User`] record shapes, and the [`UserProfile`]
//! projection returned to the application layer.

use serde::{Deserialize, Serialize};

use crate::error::RecError;

/// The two record kinds, doubling as index namespaces.
///
/// An identifier's namespace is fully determined by its first character:
/// `B` → badge, `U` → user (case-insensitive).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Namespace {
    Badge,
    User,
}

impl Namespace {
    /// Namespace string sent to the vector index.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Badge => "badge",
            Self::User => "user",
        }
    }

    /// Derive the namespace from an identifier's prefix character.
    ///
    /// Any other prefix (or an empty id) is an [`RecError::InvalidIdentifier`];
    /// lookups and deletes must use the matching namespace or fail.
    pub fn from_id(id: &str) -> Result<Self, RecError> {
        match id.chars().next() {
            Some('B') | Some('b') => Ok(Self::Badge),
            Some('U') | Some('u') => Ok(Self::User),
            _ => Err(RecError::InvalidIdentifier(id.to_string())),
        }
    }
}

impl std::fmt::Display for Namespace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Namespace {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "badge" => Ok(Self::Badge),
            "user" => Ok(Self::User),
            _ => Err(format!("unknown namespace: {s}")),
        }
    }
}

/// A badge record as ingested from JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Badge {
    /// Identifier with prefix `B`.
    pub badge_id: String,
    pub name: String,
    pub issuer: String,
    pub description: String,
    /// Criteria text for earning the badge.
    pub criteria: String,
    #[serde(default)]
    pub alignment: Option<String>,
    #[serde(rename = "employmentOutcome", default)]
    pub employment_outcome: Option<String>,
    #[serde(rename = "skillsValidated", default)]
    pub skills_validated: Vec<String>,
    pub competency: String,
    #[serde(rename = "learningOpportunity", default)]
    pub learning_opportunity: Option<String>,
    #[serde(default)]
    pub related_badges: Vec<String>,
}

/// A user record as ingested from JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Identifier with prefix `U`.
    pub user_id: String,
    pub name: String,
    pub goal: String,
    #[serde(default)]
    pub skills: Vec<String>,
    pub competency_level: String,
    #[serde(default)]
    pub learning_history: Option<String>,
    #[serde(default)]
    pub employment_history: Option<String>,
    pub education_level: String,
    #[serde(default)]
    pub engagement_metrics: Option<String>,
    /// May arrive as a genuine list or a serialized list string; see
    /// [`parse_id_list`].
    #[serde(default)]
    pub acquired_badges: Vec<String>,
    #[serde(default)]
    pub past_recommendations: Vec<String>,
}

/// The user projection exposed to the application layer.
#[derive(Debug, Clone, Serialize)]
pub struct UserProfile {
    pub user_id: String,
    pub name: String,
    pub goal: String,
    pub skills: Vec<String>,
    pub competency_level: String,
    pub education_level: String,
    pub acquired_badges: Vec<String>,
}

/// Parse a value that is either a JSON array of strings or a serialized list
/// string (`"['B001', 'B002']"`, single or double quotes).
///
/// Anything unparseable yields an empty list — this is a best-effort read of
/// an upstream data-contract inconsistency, not a validation gate.
pub fn parse_id_list(value: &serde_json::Value) -> Vec<String> {
    match value {
        serde_json::Value::Array(items) => items
            .iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect(),
        serde_json::Value::String(s) => {
            let cleaned = s.trim().replace('\'', "\"");
            match serde_json::from_str::<Vec<String>>(&cleaned) {
                Ok(list) => list,
                Err(_) => Vec::new(),
            }
        }
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn namespace_from_id_prefix() {
        assert_eq!(Namespace::from_id("B00042").unwrap(), Namespace::Badge);
        assert_eq!(Namespace::from_id("b00042").unwrap(), Namespace::Badge);
        assert_eq!(Namespace::from_id("U00113").unwrap(), Namespace::User);
        assert_eq!(Namespace::from_id("u00113").unwrap(), Namespace::User);
    }

    #[test]
    fn namespace_rejects_other_prefixes() {
        for bad in ["X123", "123", "", " U1"] {
            let err = Namespace::from_id(bad).unwrap_err();
            assert!(matches!(err, RecError::InvalidIdentifier(_)), "{bad:?}");
        }
    }

    #[test]
    fn namespace_round_trips_strings() {
        assert_eq!("badge".parse::<Namespace>().unwrap(), Namespace::Badge);
        assert_eq!("user".parse::<Namespace>().unwrap(), Namespace::User);
        assert_eq!(Namespace::Badge.to_string(), "badge");
        assert!("vector".parse::<Namespace>().is_err());
    }

    #[test]
    fn parse_id_list_from_array() {
        let v = json!(["B001", "B002"]);
        assert_eq!(parse_id_list(&v), vec!["B001", "B002"]);
    }

    #[test]
    fn parse_id_list_from_serialized_string() {
        let single = json!("['B001', 'B002']");
        assert_eq!(parse_id_list(&single), vec!["B001", "B002"]);

        let double = json!(r#"["B003"]"#);
        assert_eq!(parse_id_list(&double), vec!["B003"]);
    }

    #[test]
    fn parse_id_list_garbage_is_empty() {
        assert!(parse_id_list(&json!("not a list")).is_empty());
        assert!(parse_id_list(&json!(42)).is_empty());
        assert!(parse_id_list(&json!(null)).is_empty());
    }

    #[test]
    fn badge_deserializes_with_optional_fields_absent() {
        let badge: Badge = serde_json::from_value(json!({
            "badge_id": "B00001",
            "name": "Data Analysis Fundamentals",
            "issuer": "Open Data Institute",
            "description": "Intro to data analysis",
            "criteria": "Complete the capstone project",
            "competency": "beginner"
        }))
        .unwrap();
        assert_eq!(badge.badge_id, "B00001");
        assert!(badge.skills_validated.is_empty());
        assert!(badge.alignment.is_none());
    }
}
