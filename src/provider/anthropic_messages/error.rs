use std::time::Duration;

use serde::Deserialize;

use crate::error::{LLMError, extract_model_identifier, looks_like_token_limit_error};

/// Parses error responses returned by the Anthropic Messages API.
///
/// The body looks like `{"type": "error", "error": {"type": "...", "message": "..."}}`;
/// the inner `type` doubles as the error code.
pub(crate) fn parse_anthropic_error(
    status: u16,
    body: &str,
    retry_after: Option<Duration>,
) -> LLMError {
    #[derive(Deserialize)]
    struct ErrorBody {
        error: Option<InnerError>,
    }

    #[derive(Deserialize)]
    struct InnerError {
        message: Option<String>,
        r#type: Option<String>,
    }

    let Some(error) = serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|parsed| parsed.error)
    else {
        return LLMError::provider("claude", format!("status {status}: {body}"));
    };

    let mut message = error.message.unwrap_or_else(|| "unknown error".to_string());
    if let Some(kind) = &error.r#type {
        message = format!("{message} ({kind})");
    }
    let kind = error.r#type.as_deref();

    if looks_like_token_limit_error(None, &message) {
        return LLMError::TokenLimitExceeded { message };
    }
    if status == 404 || kind == Some("not_found_error") {
        return LLMError::ModelNotFound {
            model: extract_model_identifier(&message),
            message,
        };
    }
    match (status, kind) {
        (401 | 403, _) | (_, Some("authentication_error" | "permission_error")) => {
            LLMError::Auth { message }
        }
        (429, _) | (_, Some("rate_limit_error")) => LLMError::RateLimit {
            message,
            retry_after,
        },
        (400 | 413, _) => LLMError::Validation { message },
        _ => LLMError::provider("claude", message),
    }
}
