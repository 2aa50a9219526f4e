//! Record-kind detection via field-overlap scoring.
//!
//! Content signal wins: the kind whose required-field set has the strictly
//! larger intersection with the record's fields is chosen. Only on an exact
//! tie does the optional filename hint break it — filenames are untrusted.

use serde_json::Value;
use tracing::debug;

use crate::error::RecError;
use crate::record::preprocess::preprocessor_for;
use crate::record::types::Namespace;

/// Classify a raw record as badge or user.
///
/// Returns [`RecError::AmbiguousType`] when field overlap ties and the file
/// hint (if any) does not name exactly one kind.
pub fn detect(record: &Value, file_hint: Option<&str>) -> Result<Namespace, RecError> {
    let badge_score = overlap(record, Namespace::Badge);
    let user_score = overlap(record, Namespace::User);
    debug!(badge_score, user_score, ?file_hint, "detecting record kind");

    if badge_score > user_score {
        return Ok(Namespace::Badge);
    }
    if user_score > badge_score {
        return Ok(Namespace::User);
    }

    // Exact tie: fall back to the filename, requiring it to name one kind only.
    if let Some(hint) = file_hint {
        let lower = hint.to_lowercase();
        match (lower.contains("badge"), lower.contains("user")) {
            (true, false) => return Ok(Namespace::Badge),
            (false, true) => return Ok(Namespace::User),
            _ => {}
        }
    }

    Err(RecError::AmbiguousType {
        file_hint: file_hint.map(str::to_string),
    })
}

/// Count how many of the kind's required fields appear in the record.
fn overlap(record: &Value, namespace: Namespace) -> usize {
    let Some(map) = record.as_object() else {
        return 0;
    };
    preprocessor_for(namespace)
        .required_fields()
        .iter()
        .filter(|field| map.contains_key(**field))
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn detects_badge_from_fields() {
        let record = json!({
            "badge_id": "B001",
            "name": "x",
            "issuer": "y",
            "criteria": "z",
            "skillsValidated": []
        });
        assert_eq!(detect(&record, None).unwrap(), Namespace::Badge);
    }

    #[test]
    fn detects_user_from_fields() {
        let record = json!({
            "user_id": "U001",
            "goal": "learn",
            "competency_level": "novice",
            "learning_history": "none"
        });
        assert_eq!(detect(&record, None).unwrap(), Namespace::User);
    }

    #[test]
    fn empty_record_falls_back_to_filename() {
        let record = json!({});
        assert_eq!(
            detect(&record, Some("badge_007.json")).unwrap(),
            Namespace::Badge
        );
        assert_eq!(
            detect(&record, Some("user_113.json")).unwrap(),
            Namespace::User
        );
    }

    #[test]
    fn content_signal_beats_filename() {
        // A badge record in a file named like a user dump still detects as badge.
        let record = json!({
            "badge_id": "B001",
            "issuer": "y",
            "criteria": "z"
        });
        assert_eq!(
            detect(&record, Some("user_export.json")).unwrap(),
            Namespace::Badge
        );
    }

    #[test]
    fn tie_without_hint_is_ambiguous() {
        let record = json!({"name": "shared field only"});
        let err = detect(&record, None).unwrap_err();
        assert!(matches!(err, RecError::AmbiguousType { .. }));
    }

    #[test]
    fn hint_naming_both_kinds_is_ambiguous() {
        let record = json!({});
        let err = detect(&record, Some("user_badge_mix.json")).unwrap_err();
        assert!(matches!(err, RecError::AmbiguousType { .. }));
    }

    #[test]
    fn non_object_record_is_ambiguous() {
        let err = detect(&json!("just a string"), None).unwrap_err();
        assert!(matches!(err, RecError::AmbiguousType { .. }));
    }
}
