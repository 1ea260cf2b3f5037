use serde::{Deserialize, Serialize};

/// A code-review request: the snippet, its language, and optionally the
/// submitting user (anonymous submissions are analyzed but never cached).
#[derive(Debug, Clone, Deserialize)]
pub struct Submission {
    pub language: String,
    pub code: String,
    #[serde(default)]
    pub user_id: Option<i64>,
}

/// Severity of a single finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    High,
    Medium,
    Low,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::High => "high",
            Severity::Medium => "medium",
            Severity::Low => "low",
        }
    }

    /// Parse a severity label, treating anything unrecognized as `Medium`.
    ///
    /// The labels come from an unverified text-generation service, so this
    /// never fails.
    pub fn parse_lenient(value: &str) -> Self {
        match value {
            "high" => Severity::High,
            "low" => Severity::Low,
            _ => Severity::Medium,
        }
    }

    /// Score penalty charged for a finding of this severity.
    pub fn penalty(self) -> i64 {
        match self {
            Severity::High => 10,
            Severity::Medium => 5,
            Severity::Low => 2,
        }
    }
}

/// One finding tied to a review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bug {
    pub id: i64,
    pub line: i64,
    pub severity: Severity,
    pub message: String,
    pub suggestion: String,
}

/// The completed assessment returned to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub quality_score: i64,
    pub bugs: Vec<Bug>,
    pub suggestions: Vec<String>,
}

/// Request to rewrite code given a previously reported bug list.
#[derive(Debug, Clone, Deserialize)]
pub struct BugFixRequest {
    pub code: String,
    pub bugs: Vec<Bug>,
    pub language: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BugFixResponse {
    pub fixed_code: String,
    pub explanation: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&Severity::High).expect("should serialize"),
            "\"high\""
        );
        let parsed: Severity =
            serde_json::from_str("\"low\"").expect("should deserialize");
        assert_eq!(parsed, Severity::Low);
    }

    #[test]
    fn parse_lenient_defaults_to_medium() {
        assert_eq!(Severity::parse_lenient("high"), Severity::High);
        assert_eq!(Severity::parse_lenient("medium"), Severity::Medium);
        assert_eq!(Severity::parse_lenient("low"), Severity::Low);
        assert_eq!(Severity::parse_lenient("critical"), Severity::Medium);
        assert_eq!(Severity::parse_lenient(""), Severity::Medium);
    }

    #[test]
    fn submission_user_id_is_optional() {
        let submission: Submission =
            serde_json::from_str(r#"{"language": "python", "code": "x=1"}"#)
                .expect("should deserialize");
        assert_eq!(submission.user_id, None);
    }
}
