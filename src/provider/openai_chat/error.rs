use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;

use crate::error::{LLMError, extract_model_identifier, looks_like_token_limit_error};

/// Parses error bodies of the Chat Completions family.
///
/// OpenAI and Groq nest the details under `error`; Mistral answers with a flat
/// `{"object": "error", "message": ...}` object.
pub(crate) fn parse_openai_error(
    provider: &'static str,
    status: u16,
    body: &str,
    retry_after: Option<Duration>,
) -> LLMError {
    #[derive(Deserialize)]
    struct ErrorBody {
        error: Option<InnerError>,
        message: Option<Value>,
        code: Option<Value>,
    }
    #[derive(Deserialize)]
    struct InnerError {
        message: Option<String>,
        code: Option<Value>,
    }

    let Ok(parsed) = serde_json::from_str::<ErrorBody>(body) else {
        return LLMError::provider(provider, format!("status {status}: {body}"));
    };
    let (message, code) = match (parsed.error, parsed.message) {
        (Some(inner), _) => (inner.message, inner.code),
        (None, Some(Value::String(message))) => (Some(message), parsed.code),
        (None, Some(other)) => (Some(other.to_string()), parsed.code),
        (None, None) => return LLMError::provider(provider, format!("status {status}: {body}")),
    };

    let mut message = message.unwrap_or_else(|| "unknown error".to_string());
    let code = code.and_then(|code| match code {
        Value::String(code) => Some(code),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    });
    if let Some(code) = &code {
        message = format!("{message} ({code})");
    }
    let code_hint = code.as_deref();

    if looks_like_token_limit_error(code_hint, &message) {
        return LLMError::TokenLimitExceeded { message };
    }
    if status == 404 || matches!(code_hint, Some("model_not_found")) {
        return LLMError::ModelNotFound {
            model: extract_model_identifier(&message),
            message,
        };
    }
    match status {
        401 | 403 => LLMError::Auth { message },
        429 => LLMError::RateLimit {
            message,
            retry_after,
        },
        400 | 422 => LLMError::Validation { message },
        _ => LLMError::Provider { provider, message },
    }
}
