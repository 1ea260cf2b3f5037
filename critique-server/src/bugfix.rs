//! The bug-fix pipeline.
//!
//! Stateless: nothing is persisted. On any service or decode failure the
//! caller gets their code back unchanged with an explanation, never an
//! error.

use serde_json::Value;
use tracing::warn;

use critique_core::model::{BugFixRequest, BugFixResponse};
use critique_core::service::{request_fix, InvokeError, ReasoningService};

const DEFAULT_EXPLANATION: &str = "No explanation provided.";
const MALFORMED_EXPLANATION: &str =
    "The AI was unable to fix the bugs. Please try again or fix them manually.";

/// Ask the reasoning service to rewrite the submitted code given its known
/// bug list. Always produces a response.
pub async fn fix_bugs(service: &dyn ReasoningService, request: &BugFixRequest) -> BugFixResponse {
    match request_fix(service, &request.language, &request.code, &request.bugs).await {
        Ok(raw) => BugFixResponse {
            fixed_code: raw
                .get("fixed_code")
                .and_then(Value::as_str)
                .unwrap_or(&request.code)
                .to_string(),
            explanation: raw
                .get("explanation")
                .and_then(Value::as_str)
                .unwrap_or(DEFAULT_EXPLANATION)
                .to_string(),
        },
        Err(err @ InvokeError::MalformedResponse(_)) => {
            warn!("Returning code unchanged: {err}");
            BugFixResponse {
                fixed_code: request.code.clone(),
                explanation: MALFORMED_EXPLANATION.to_string(),
            }
        }
        Err(InvokeError::ServiceUnavailable(detail)) => {
            warn!("Returning code unchanged: reasoning service unavailable: {detail}");
            BugFixResponse {
                fixed_code: request.code.clone(),
                explanation: format!("An error occurred: {detail}"),
            }
        }
    }
}
