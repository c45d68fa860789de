use std::time::Duration;

use serde::Deserialize;

use crate::error::{LLMError, extract_model_identifier, looks_like_token_limit_error};

const PROVIDER: &str = "gemini";

#[derive(Deserialize)]
struct ErrorBody {
    error: Option<InnerError>,
}

#[derive(Deserialize)]
struct InnerError {
    message: Option<String>,
    status: Option<String>,
}

/// Parses error responses returned by Google Gemini.
///
/// Streaming endpoints wrap the body in a one-element array.
pub(crate) fn parse_gemini_error(
    status: u16,
    body: &str,
    retry_after: Option<Duration>,
) -> LLMError {
    let parsed = serde_json::from_str::<ErrorBody>(body).ok().or_else(|| {
        serde_json::from_str::<Vec<ErrorBody>>(body)
            .ok()
            .and_then(|bodies| bodies.into_iter().next())
    });
    let Some(error) = parsed.and_then(|parsed| parsed.error) else {
        return LLMError::provider(PROVIDER, format!("status {status}: {body}"));
    };

    let mut message = error.message.unwrap_or_else(|| "unknown error".to_string());
    let status_hint = error.status.as_deref().filter(|text| !text.is_empty());
    if let Some(status_text) = status_hint {
        message = format!("{message} ({status_text})");
    }

    if looks_like_token_limit_error(status_hint, &message) {
        return LLMError::TokenLimitExceeded { message };
    }
    if status == 404 || status_hint == Some("NOT_FOUND") {
        return LLMError::ModelNotFound {
            model: extract_model_identifier(&message),
            message,
        };
    }
    match (status, status_hint) {
        (401 | 403, _) | (_, Some("UNAUTHENTICATED" | "PERMISSION_DENIED")) => {
            LLMError::Auth { message }
        }
        (429, _) | (_, Some("RESOURCE_EXHAUSTED")) => LLMError::RateLimit {
            message,
            retry_after,
        },
        (400, _) | (_, Some("INVALID_ARGUMENT" | "FAILED_PRECONDITION")) => {
            LLMError::Validation { message }
        }
        _ => LLMError::provider(PROVIDER, message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_auth_and_rate_limit_errors() {
        let body = r#"{
  "error": {
    "code": 401,
    "message": "API key not valid",
    "status": "UNAUTHENTICATED"
  }
}"#;
        match parse_gemini_error(401, body, None) {
            LLMError::Auth { message } => {
                assert!(message.contains("API key not valid"));
                assert!(message.contains("UNAUTHENTICATED"));
            }
            other => panic!("expected Auth error, got {other:?}"),
        }

        let body = r#"{
  "error": {
    "code": 429,
    "message": "quota exhausted",
    "status": "RESOURCE_EXHAUSTED"
  }
}"#;
        match parse_gemini_error(429, body, Some(Duration::from_secs(5))) {
            LLMError::RateLimit {
                message,
                retry_after,
            } => {
                assert!(message.contains("quota exhausted"));
                assert_eq!(retry_after, Some(Duration::from_secs(5)));
            }
            other => panic!("expected RateLimit error, got {other:?}"),
        }
    }

    #[test]
    fn parse_validation_and_provider_errors() {
        let body = r#"{"error": {"code": 400, "message": "Invalid argument: contents", "status": "INVALID_ARGUMENT"}}"#;
        match parse_gemini_error(400, body, None) {
            LLMError::Validation { message } => {
                assert!(message.contains("Invalid argument"));
                assert!(message.contains("INVALID_ARGUMENT"));
            }
            other => panic!("expected Validation error, got {other:?}"),
        }

        match parse_gemini_error(500, "not a json", None) {
            LLMError::Provider { provider, message } => {
                assert_eq!(provider, "gemini");
                assert_eq!(message, "status 500: not a json");
            }
            other => panic!("expected Provider fallback error, got {other:?}"),
        }
    }

    #[test]
    fn array_wrapped_bodies_are_understood() {
        let body = r#"[{"error": {"code": 403, "message": "Permission denied", "status": "PERMISSION_DENIED"}}]"#;
        assert!(matches!(
            parse_gemini_error(403, body, None),
            LLMError::Auth { .. }
        ));
    }

    #[test]
    fn parse_gemini_token_limit_and_model_errors() {
        let body = r#"{"error": {"code": 400, "message": "The prompt tokens exceeded the allowed context window.", "status": "INVALID_ARGUMENT"}}"#;
        assert!(matches!(
            parse_gemini_error(400, body, None),
            LLMError::TokenLimitExceeded { .. }
        ));

        let body = r#"{"error": {"code": 404, "message": "Model `gemini-pro-oops` not found.", "status": "NOT_FOUND"}}"#;
        match parse_gemini_error(404, body, None) {
            LLMError::ModelNotFound { model, .. } => {
                assert_eq!(model.as_deref(), Some("gemini-pro-oops"));
            }
            other => panic!("expected ModelNotFound, got {other:?}"),
        }
    }
}
