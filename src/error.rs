use std::fmt;
use std::time::Duration;

use serde_json::Value;
use thiserror::Error;

/// Failures raised below the normalization engine: transport, provider HTTP errors and
/// client configuration.
///
/// Provider-side variants reach callers wrapped in [`Failure::Transport`]; configuration
/// variants are returned directly by [`crate::client::ClientBuilder::build`].
#[derive(Debug, Error)]
pub enum LLMError {
    /// Represents transport-layer or networking failures.
    #[error("transport error: {message}")]
    Transport { message: String },
    /// Reports invalid or missing credentials.
    #[error("auth failure: {message}")]
    Auth { message: String },
    /// Indicates that the provider throttled the request.
    #[error("rate limited: {message}")]
    RateLimit {
        /// Raw message returned by the upstream provider.
        message: String,
        /// Optional wait duration suggested by the provider before retrying.
        retry_after: Option<Duration>,
    },
    /// Indicates that the prompt or expected completion exceeds the allowed token budget.
    #[error("token limit exceeded: {message}")]
    TokenLimitExceeded {
        /// Raw message returned by the provider, kept verbatim for debugging.
        message: String,
    },
    /// Signals validation failures in the request payload.
    #[error("invalid request: {message}")]
    Validation { message: String },
    /// Indicates that a requested model could not be resolved.
    #[error("model not found: {message}")]
    ModelNotFound {
        /// Model identifier extracted from the error payload when available.
        model: Option<String>,
        /// Full error message for debugging.
        message: String,
    },
    /// Raised when building or validating configuration fails.
    #[error("invalid configuration for {field}: {reason}")]
    InvalidConfig {
        /// Name of the configuration field that failed validation.
        field: String,
        /// Additional context explaining why the field is invalid.
        reason: String,
    },
    /// Signals that a streaming channel reported an error or closed abnormally.
    #[error("stream closed unexpectedly: {message}")]
    StreamClosed { message: String },
    /// Wraps provider-defined errors that cannot be normalized.
    #[error("provider {provider} error: {message}")]
    Provider {
        /// Name of the provider, such as `openai`.
        provider: &'static str,
        /// Human-readable error message returned by the provider.
        message: String,
    },
}

impl LLMError {
    /// Creates an [`LLMError::Transport`] from a textual description.
    ///
    /// # Examples
    ///
    /// ```
    /// use parley_llm::error::LLMError;
    ///
    /// let err = LLMError::transport("dns lookup failed");
    /// assert!(matches!(err, LLMError::Transport { .. }));
    /// ```
    pub fn transport<T: Into<String>>(message: T) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Creates an [`LLMError::Provider`] with the given provider name and message.
    ///
    /// # Examples
    ///
    /// ```
    /// use parley_llm::error::LLMError;
    ///
    /// let err = LLMError::provider("openai", "bad JSON payload");
    /// assert!(matches!(err, LLMError::Provider { provider: "openai", .. }));
    /// ```
    pub fn provider<T: Into<String>>(provider: &'static str, message: T) -> Self {
        Self::Provider {
            provider,
            message: message.into(),
        }
    }

    pub(crate) fn invalid_config(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Coarse classification of a [`Failure`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// The provider call itself was rejected (network, auth, rate limit, server error).
    Transport,
    /// The provider answered but returned no usable content.
    EmptyResponse,
    /// Content came back but was not parseable JSON.
    MalformedJson,
    /// Parsed JSON did not satisfy the caller's schema.
    SchemaViolation,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FailureKind::Transport => "transport",
            FailureKind::EmptyResponse => "empty_response",
            FailureKind::MalformedJson => "malformed_json",
            FailureKind::SchemaViolation => "schema_violation",
        })
    }
}

/// Uniform failure channel of [`crate::client::Client`].
///
/// `ask` and `ask_json` return it as the `Err` side of their result; `stream` yields it as
/// the final item of the sequence.
#[derive(Debug, Error)]
pub enum Failure {
    /// Underlying call failed; the original error is preserved verbatim.
    #[error(transparent)]
    Transport(#[from] LLMError),
    /// Nothing usable came back.
    #[error("empty response: {message}")]
    EmptyResponse { message: String },
    /// Content was present but could not be parsed as JSON.
    #[error("malformed JSON: {message}")]
    MalformedJson {
        message: String,
        /// The text that failed to parse, after markup stripping.
        raw: String,
    },
    /// Parsed JSON failed schema validation.
    #[error("schema validation failed: {}", errors.join("; "))]
    SchemaViolation {
        /// One entry per violation, prefixed with its JSON pointer.
        errors: Vec<String>,
        /// The parsed value that was rejected.
        value: Value,
    },
}

impl Failure {
    /// Returns the coarse kind of this failure.
    ///
    /// # Examples
    ///
    /// ```
    /// use parley_llm::error::{Failure, FailureKind, LLMError};
    ///
    /// let failure = Failure::from(LLMError::transport("connection reset"));
    /// assert_eq!(failure.kind(), FailureKind::Transport);
    /// ```
    pub fn kind(&self) -> FailureKind {
        match self {
            Failure::Transport(_) => FailureKind::Transport,
            Failure::EmptyResponse { .. } => FailureKind::EmptyResponse,
            Failure::MalformedJson { .. } => FailureKind::MalformedJson,
            Failure::SchemaViolation { .. } => FailureKind::SchemaViolation,
        }
    }

    pub(crate) fn empty(message: impl Into<String>) -> Self {
        Self::EmptyResponse {
            message: message.into(),
        }
    }
}

/// Returns `true` when an error code or message suggests a context/window overflow.
pub(crate) fn looks_like_token_limit_error(code_hint: Option<&str>, message: &str) -> bool {
    if let Some(code) = code_hint {
        let lower = code.to_ascii_lowercase();
        if matches!(
            lower.as_str(),
            "context_length_exceeded"
                | "max_context_length_exceeded"
                | "prompt_tokens_exceeded"
                | "context_window_exceeded"
        ) || lower.contains("token")
        {
            return true;
        }
    }

    let lower_message = message.to_ascii_lowercase();
    const HINTS: [&str; 6] = [
        "context length",
        "context window",
        "token limit",
        "maximum output tokens",
        "max output tokens",
        "prompt is too long",
    ];
    HINTS.iter().any(|needle| lower_message.contains(needle))
}

/// Attempts to extract a model identifier from an error payload.
pub(crate) fn extract_model_identifier(message: &str) -> Option<String> {
    for delimiter in ['`', '"', '\''] {
        if let Some(value) = between_delimiters(message, delimiter) {
            if !value.trim().is_empty() {
                return Some(value.trim().to_string());
            }
        }
    }
    None
}

fn between_delimiters(message: &str, delimiter: char) -> Option<String> {
    let start = message.find(delimiter)? + delimiter.len_utf8();
    let rest = message.get(start..)?;
    let end = rest.find(delimiter)?;
    Some(rest[..end].to_string())
}
