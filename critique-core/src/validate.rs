//! Normalization of untrusted analysis payloads.
//!
//! The reasoning service replies with free-form JSON. Everything downstream
//! (persistence, scoring, the HTTP response) assumes a fully-populated
//! [`AnalysisResult`], so this module is the trust boundary: missing or
//! ill-typed fields are replaced with defaults rather than rejected.

use serde_json::Value;

use crate::model::{AnalysisResult, Bug, Severity};

pub const DEFAULT_QUALITY_SCORE: i64 = 70;
pub const DEFAULT_LINE: i64 = 1;
pub const DEFAULT_MESSAGE: &str = "Issue detected";
pub const DEFAULT_SUGGESTION: &str = "Consider reviewing this code";

/// Repair a decoded analysis payload into a guaranteed-complete result.
///
/// Bug ids are reassigned 1-based in sequence regardless of any id claimed
/// by the payload, and the quality score is clamped into [0, 100].
pub fn normalize_analysis(raw: &Value) -> AnalysisResult {
    let quality_score = raw
        .get("quality_score")
        .and_then(Value::as_i64)
        .unwrap_or(DEFAULT_QUALITY_SCORE)
        .clamp(0, 100);

    let bugs = raw
        .get("bugs")
        .and_then(Value::as_array)
        .map(|entries| {
            entries
                .iter()
                .enumerate()
                .map(|(i, entry)| normalize_bug(i, entry))
                .collect()
        })
        .unwrap_or_default();

    let suggestions = raw
        .get("suggestions")
        .and_then(Value::as_array)
        .map(|entries| {
            entries
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    AnalysisResult {
        quality_score,
        bugs,
        suggestions,
    }
}

fn normalize_bug(index: usize, raw: &Value) -> Bug {
    let line = raw
        .get("line")
        .and_then(Value::as_i64)
        .unwrap_or(DEFAULT_LINE)
        .max(1);

    let severity = raw
        .get("severity")
        .and_then(Value::as_str)
        .map(Severity::parse_lenient)
        .unwrap_or(Severity::Medium);

    let message = raw
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or(DEFAULT_MESSAGE)
        .to_string();

    let suggestion = raw
        .get("suggestion")
        .and_then(Value::as_str)
        .unwrap_or(DEFAULT_SUGGESTION)
        .to_string();

    Bug {
        id: index as i64 + 1,
        line,
        severity,
        message,
        suggestion,
    }
}
