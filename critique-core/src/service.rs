//! The reasoning-service boundary.
//!
//! The service is an external text generator: it can be down, rate-limited,
//! or reply with something that is not the JSON it was asked for. Callers
//! branch on [`InvokeError`] instead of propagating failures, so a broken
//! service never breaks a request.

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::model::Bug;
use crate::prompt;

/// Synchronous completion contract for the external reasoning service.
///
/// Implemented by [`crate::openai::OpenAiClient`] in production and by stubs
/// in tests.
#[async_trait]
pub trait ReasoningService: Send + Sync {
    /// Send one instruction/content pair and return the raw textual reply.
    async fn complete(&self, system_instruction: &str, user_content: &str) -> Result<String>;
}

/// Why an invocation produced no usable payload.
///
/// Both variants select the fallback path; they are never surfaced to the
/// end user as a request failure.
#[derive(Debug, Error)]
pub enum InvokeError {
    /// Transport, auth, or quota failure: the service never replied usefully.
    #[error("reasoning service unavailable: {0}")]
    ServiceUnavailable(String),
    /// The service replied, but the payload did not decode to a JSON object.
    #[error("malformed reasoning response: {0}")]
    MalformedResponse(String),
}

/// Ask the service to review a code body. Returns the decoded (but still
/// untrusted) reply object; shape repair is the validator's job.
pub async fn request_analysis(
    service: &dyn ReasoningService,
    language: &str,
    code: &str,
) -> Result<Value, InvokeError> {
    let instruction = prompt::analysis_instruction(language);
    let reply = service
        .complete(&instruction, code)
        .await
        .map_err(|e| InvokeError::ServiceUnavailable(e.to_string()))?;
    decode_reply(&reply)
}

/// Ask the service to rewrite a code body given its known bug list.
pub async fn request_fix(
    service: &dyn ReasoningService,
    language: &str,
    code: &str,
    bugs: &[Bug],
) -> Result<Value, InvokeError> {
    let instruction = prompt::fix_instruction(language, bugs);
    let reply = service
        .complete(&instruction, code)
        .await
        .map_err(|e| InvokeError::ServiceUnavailable(e.to_string()))?;
    decode_reply(&reply)
}

fn decode_reply(reply: &str) -> Result<Value, InvokeError> {
    let value: Value = serde_json::from_str(reply)
        .map_err(|e| InvokeError::MalformedResponse(e.to_string()))?;
    if !value.is_object() {
        return Err(InvokeError::MalformedResponse(
            "expected a JSON object".to_string(),
        ));
    }
    Ok(value)
}
