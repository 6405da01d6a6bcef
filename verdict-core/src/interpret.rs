//! Strict-mode interpreter: model completion → [`StructuredFeedback`].
//!
//! Two stages. [`extract_json_object`] finds and parses the JSON object and is
//! the only place that can fail. [`normalize`] never fails: missing or
//! mistyped fields are replaced by defaults or coerced.

use serde_json::{Map, Value};
use thiserror::Error;

use crate::models::StructuredFeedback;

pub const DEFAULT_USER_RESPONSE: &str = "Thank you for your feedback!";
pub const DEFAULT_SUMMARY: &str = "Customer left feedback.";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InterpretError {
    #[error("No JSON object found in model output")]
    NoJsonFound,

    #[error("Failed to parse JSON: {detail}")]
    MalformedJson { detail: String },
}

/// Locate the candidate span and parse it as a JSON object.
///
/// The span runs from the first `{` to the last `}` inclusive. It is greedy,
/// not brace-matched. When there is no `}` at all the tail from the first `{`
/// is treated as a truncated object and handed to the parser, which reports it
/// as malformed.
pub fn extract_json_object(raw_text: &str) -> Result<Map<String, Value>, InterpretError> {
    let start = raw_text.find('{').ok_or(InterpretError::NoJsonFound)?;

    let candidate = match raw_text.rfind('}') {
        Some(end) if end > start => &raw_text[start..=end],
        Some(_) => return Err(InterpretError::NoJsonFound),
        None => &raw_text[start..],
    };

    match serde_json::from_str::<Value>(candidate) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(InterpretError::MalformedJson {
            detail: format!("expected a JSON object, got {}", other),
        }),
        Err(e) => Err(InterpretError::MalformedJson {
            detail: e.to_string(),
        }),
    }
}

/// Fill in a [`StructuredFeedback`] from an arbitrary object.
pub fn normalize(data: &Map<String, Value>) -> StructuredFeedback {
    let user_response = data
        .get("user_response")
        .map(value_text)
        .unwrap_or_else(|| DEFAULT_USER_RESPONSE.to_string());

    let summary = data
        .get("summary")
        .map(value_text)
        .unwrap_or_else(|| DEFAULT_SUMMARY.to_string());

    let actions = match data.get("actions") {
        None => Vec::new(),
        Some(Value::Array(items)) => items.iter().map(value_text).collect(),
        // Models often return a single action as a bare string.
        Some(other) => vec![value_text(other)],
    };

    StructuredFeedback {
        user_response,
        summary,
        actions,
    }
}

/// [`extract_json_object`] followed by [`normalize`].
pub fn parse_and_normalize(raw_text: &str) -> Result<StructuredFeedback, InterpretError> {
    let data = extract_json_object(raw_text)?;
    Ok(normalize(&data))
}

/// Strings verbatim, everything else as compact JSON text.
fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
