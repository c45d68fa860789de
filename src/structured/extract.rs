//! Turning a provider answer into a validated JSON value.

use serde_json::Value;
use tracing::warn;

use crate::error::Failure;
use crate::response::{Completion, strip_reasoning};

use super::OutputSchema;

/// Markers assumed around visible reasoning when the record declares none.
pub const DEFAULT_REASONING_MARKUP: (&str, &str) = ("<think>", "</think>");

/// Extracts, parses and validates structured output from `completion`.
///
/// Forced tool arguments take precedence over text. Text has a leading reasoning block
/// and a surrounding Markdown code fence removed before parsing.
///
/// # Errors
///
/// * [`Failure::EmptyResponse`] when nothing is left to parse.
/// * [`Failure::MalformedJson`] when the remaining text is not JSON.
/// * [`Failure::SchemaViolation`] when the value does not satisfy `schema`.
pub fn extract_structured(
    completion: &Completion,
    schema: &OutputSchema,
    markup: Option<(&str, &str)>,
) -> Result<Value, Failure> {
    let value = match &completion.tool_arguments {
        Some(Value::String(raw)) => parse_text(raw, markup)?,
        Some(Value::Null) | None => match completion.text.as_deref() {
            Some(text) => parse_text(text, markup)?,
            None => return Err(empty()),
        },
        Some(arguments) => arguments.clone(),
    };

    if let Err(errors) = schema.validate(&value) {
        warn!(
            schema = schema.name(),
            violations = errors.len(),
            "structured output failed schema validation"
        );
        return Err(Failure::SchemaViolation { errors, value });
    }
    Ok(value)
}

fn parse_text(text: &str, markup: Option<(&str, &str)>) -> Result<Value, Failure> {
    let stripped = strip_reasoning(text, Some(markup.unwrap_or(DEFAULT_REASONING_MARKUP)));
    let candidate = strip_code_fence(stripped);
    if candidate.is_empty() {
        return Err(empty());
    }
    serde_json::from_str(candidate).map_err(|err| {
        warn!(error = %err, "structured output is not valid JSON");
        Failure::MalformedJson {
            message: err.to_string(),
            raw: candidate.to_owned(),
        }
    })
}

/// Removes a Markdown code fence (with optional language tag) wrapping the whole text.
pub fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let Some(body) = rest.strip_suffix("```") else {
        return trimmed;
    };
    let body = match body.find('\n') {
        Some(newline)
            if body[..newline]
                .trim()
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') =>
        {
            &body[newline + 1..]
        }
        _ => body,
    };
    body.trim()
}

fn empty() -> Failure {
    warn!("structured output request returned no content");
    Failure::empty("provider returned no content to parse")
}
