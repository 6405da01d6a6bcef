//! Feedback pipeline: prompt → model → interpreter.

use thiserror::Error;

use crate::interpret::{self, InterpretError};
use crate::llm::{LlmError, ModelBackend};
use crate::models::{AnalysisReport, FeedbackRequest, ReviewRecord, StructuredFeedback};
use crate::prompt;
use crate::sections;

pub const NO_DATA_SUMMARY: &str = "No data to analyze.";
pub const NO_DATA_ACTIONS: &str = "No actions needed.";

/// Shown to end users in place of any pipeline failure.
pub const GENERIC_FAILURE_MESSAGE: &str =
    "Sorry, we couldn't generate a response right now. Your feedback still matters to us.";

#[derive(Error, Debug)]
pub enum FeedbackError {
    #[error("Model invocation failed: {0}")]
    Model(#[from] LlmError),

    #[error("Could not interpret model output: {0}")]
    Interpret(#[from] InterpretError),
}

impl FeedbackError {
    pub fn user_message(&self) -> &'static str {
        GENERIC_FAILURE_MESSAGE
    }
}

/// Generate the structured reply for one submission.
pub async fn generate_feedback(
    backend: &dyn ModelBackend,
    request: &FeedbackRequest,
    max_new_tokens: u32,
) -> Result<StructuredFeedback, FeedbackError> {
    let prompt = prompt::build_prompt(i64::from(request.rating), &request.review);
    let raw = backend.complete(&prompt, max_new_tokens).await?;

    match interpret::parse_and_normalize(&raw) {
        Ok(feedback) => {
            tracing::debug!(backend = backend.name(), raw = %raw, "Model output interpreted");
            Ok(feedback)
        }
        Err(e) => {
            tracing::warn!(backend = backend.name(), error = %e, raw = %raw, "Unusable model output");
            Err(e.into())
        }
    }
}

/// Plain-text reply for one submission, without the JSON contract.
///
/// A blank completion falls back to the default user response.
pub async fn generate_reply(
    backend: &dyn ModelBackend,
    request: &FeedbackRequest,
    max_new_tokens: u32,
) -> Result<String, FeedbackError> {
    let prompt = prompt::build_reply_prompt(i64::from(request.rating), &request.review);
    let raw = backend.complete(&prompt, max_new_tokens).await?;
    let reply = raw.trim();

    if reply.is_empty() {
        tracing::warn!(backend = backend.name(), "Empty reply from model");
        return Ok(interpret::DEFAULT_USER_RESPONSE.to_string());
    }
    Ok(reply.to_string())
}

/// Summarise stored reviews into a section-mode report.
///
/// An empty slice short-circuits without calling the model.
pub async fn analyze_reviews(
    backend: &dyn ModelBackend,
    records: &[ReviewRecord],
    max_new_tokens: u32,
) -> Result<AnalysisReport, FeedbackError> {
    if records.is_empty() {
        return Ok(AnalysisReport {
            summary: NO_DATA_SUMMARY.to_string(),
            actions: NO_DATA_ACTIONS.to_string(),
        });
    }

    let prompt = prompt::build_analysis_prompt(records);
    let raw = backend.complete(&prompt, max_new_tokens).await?;
    tracing::debug!(backend = backend.name(), reviews = records.len(), "Analysis received");

    Ok(sections::parse_sections(&raw))
}
