//! Wire types for the grading endpoint's import call

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::core::coordinator::ImportError;
use crate::core::parser::parse_number_prefix;
use crate::core::session::CsvSnapshot;

/// Max grade used when the caller supplies nothing usable
pub const DEFAULT_MAX_GRADE: f64 = 1.0;

/// Body of the import POST
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportRequest {
    /// The raw CSV text, verbatim. The endpoint parses it on its own.
    pub csv_content: String,
    pub max_grade: f64,
    pub target_block: String,
}

impl ImportRequest {
    /// Check the local preconditions and build the request.
    ///
    /// Fails with `NoFileSelected` when there is no snapshot, its text is
    /// empty, or it produced no records; then with `NoTargetSelected` when
    /// the target is missing or blank.
    pub fn prepare(
        snapshot: Option<&CsvSnapshot>,
        max_grade: Option<&str>,
        target: Option<&str>,
    ) -> Result<Self, ImportError> {
        let snapshot = snapshot
            .filter(|s| !s.raw().is_empty() && s.has_rows())
            .ok_or(ImportError::NoFileSelected)?;

        let target_block = target
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(ImportError::NoTargetSelected)?;

        Ok(Self {
            csv_content: snapshot.raw().to_string(),
            max_grade: resolve_max_grade(max_grade),
            target_block: target_block.to_string(),
        })
    }
}

/// Resolve the user-supplied max grade from its leading number, falling back
/// to `1.0` when the value is missing or has no finite numeric prefix
pub fn resolve_max_grade(value: Option<&str>) -> f64 {
    value
        .and_then(parse_number_prefix)
        .unwrap_or(DEFAULT_MAX_GRADE)
}

/// What the endpoint did with one row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Created,
    Updated,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Created => write!(f, "created"),
            Action::Updated => write!(f, "updated"),
        }
    }
}

/// Per-row success reported by the endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportOutcome {
    pub username: String,
    pub grade: f64,
    pub action: Action,
}

/// Response body of the import call.
///
/// Success bodies carry `summary`, `results` and optionally `errors`;
/// failure bodies carry an optional `error`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ImportResponse {
    #[serde(default)]
    pub success: bool,

    #[serde(default)]
    pub summary: Option<String>,

    #[serde(default)]
    pub results: Option<Vec<ImportOutcome>>,

    /// Row-level failures; informational only
    #[serde(default)]
    pub errors: Option<Vec<String>>,

    #[serde(default)]
    pub error: Option<String>,

    /// Server-side counts; take precedence over counting `results`
    #[serde(default)]
    pub created: Option<u64>,

    #[serde(default)]
    pub updated: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_max_grade() {
        assert_eq!(resolve_max_grade(Some("2.5")), 2.5);
        assert_eq!(resolve_max_grade(Some(" 10 ")), 10.0);
        assert_eq!(resolve_max_grade(Some("0")), 0.0);
        assert_eq!(resolve_max_grade(Some("")), DEFAULT_MAX_GRADE);
        assert_eq!(resolve_max_grade(Some("abc")), DEFAULT_MAX_GRADE);
        assert_eq!(resolve_max_grade(Some("NaN")), DEFAULT_MAX_GRADE);
        assert_eq!(resolve_max_grade(Some("inf")), DEFAULT_MAX_GRADE);
        assert_eq!(resolve_max_grade(None), DEFAULT_MAX_GRADE);
    }

    #[test]
    fn test_resolve_max_grade_reads_leading_number() {
        assert_eq!(resolve_max_grade(Some("10 points")), 10.0);
        assert_eq!(resolve_max_grade(Some("85%")), 85.0);
        assert_eq!(resolve_max_grade(Some(".5")), 0.5);
        assert_eq!(resolve_max_grade(Some("points: 10")), DEFAULT_MAX_GRADE);
    }

    #[test]
    fn test_prepare_requires_file() {
        let err = ImportRequest::prepare(None, None, Some("block-1")).unwrap_err();
        assert!(matches!(err, ImportError::NoFileSelected));

        let empty = CsvSnapshot::new(String::new(), None);
        let err = ImportRequest::prepare(Some(&empty), None, Some("block-1")).unwrap_err();
        assert!(matches!(err, ImportError::NoFileSelected));

        let no_rows = CsvSnapshot::new("just_a_name\n\n".to_string(), None);
        let err = ImportRequest::prepare(Some(&no_rows), None, Some("block-1")).unwrap_err();
        assert!(matches!(err, ImportError::NoFileSelected));
    }

    #[test]
    fn test_prepare_requires_target() {
        let snapshot = CsvSnapshot::new("alice,1".to_string(), None);
        for target in [None, Some(""), Some("   ")] {
            let err = ImportRequest::prepare(Some(&snapshot), None, target).unwrap_err();
            assert!(matches!(err, ImportError::NoTargetSelected));
        }
    }

    #[test]
    fn test_prepare_sends_raw_text_verbatim() {
        let raw = "alice,1\n\nbob,abc,extra\nlonely\n".to_string();
        let snapshot = CsvSnapshot::new(raw.clone(), None);
        let request =
            ImportRequest::prepare(Some(&snapshot), Some("bogus"), Some(" block-v1:x ")).unwrap();

        assert_eq!(request.csv_content, raw);
        assert_eq!(request.max_grade, DEFAULT_MAX_GRADE);
        assert_eq!(request.target_block, "block-v1:x");
    }

    #[test]
    fn test_request_json_shape() {
        let request = ImportRequest {
            csv_content: "a,1".to_string(),
            max_grade: 2.0,
            target_block: "t".to_string(),
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"csv_content": "a,1", "max_grade": 2.0, "target_block": "t"})
        );
    }

    #[test]
    fn test_response_success_body() {
        let body = r#"{
            "success": true,
            "summary": "2 imported",
            "results": [
                {"username": "a", "grade": 1, "action": "created"},
                {"username": "b", "grade": 0.5, "action": "updated"}
            ],
            "errors": ["bad_user: not found"]
        }"#;
        let response: ImportResponse = serde_json::from_str(body).unwrap();
        assert!(response.success);
        assert_eq!(response.summary.as_deref(), Some("2 imported"));

        let results = response.results.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].action, Action::Created);
        assert_eq!(results[1].grade, 0.5);
        assert_eq!(response.errors.unwrap(), vec!["bad_user: not found"]);
    }

    #[test]
    fn test_response_without_success_field_is_a_failure() {
        let response: ImportResponse =
            serde_json::from_str(r#"{"summary": "ignored"}"#).unwrap();
        assert!(!response.success);
        assert!(response.error.is_none());
    }

    #[test]
    fn test_response_failure_body_without_message() {
        let response: ImportResponse = serde_json::from_str(r#"{"success": false}"#).unwrap();
        assert!(!response.success);
        assert!(response.error.is_none());
        assert!(response.results.is_none());
    }
}
