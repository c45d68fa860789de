//! Provider-agnostic data structures shared by every stage of the engine.
//!
//! Callers build a [`RequestOptions`] (the generic request) and a conversation of
//! [`Message`] values; the normalizer and translator turn them into provider shapes.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::LLMError;

/// Chat role of a conversation entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
    Function,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Tool => "tool",
            Role::Function => "function",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single conversation entry.
///
/// # Examples
///
/// ```
/// use parley_llm::types::{Message, Role};
///
/// let msg = Message::user("What is the capital of France?");
/// assert_eq!(msg.role, Role::User);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// Provider-agnostic reasoning effort.
///
/// The ordering is meaningful: `Off < Low < Medium < High`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThinkingLevel {
    Off,
    Low,
    Medium,
    High,
}

impl ThinkingLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ThinkingLevel::Off => "off",
            ThinkingLevel::Low => "low",
            ThinkingLevel::Medium => "medium",
            ThinkingLevel::High => "high",
        }
    }
}

impl fmt::Display for ThinkingLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ThinkingLevel {
    type Err = LLMError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "off" | "none" => Ok(ThinkingLevel::Off),
            "low" => Ok(ThinkingLevel::Low),
            "medium" => Ok(ThinkingLevel::Medium),
            "high" => Ok(ThinkingLevel::High),
            other => Err(LLMError::Validation {
                message: format!("unknown thinking level: {other}"),
            }),
        }
    }
}

/// Generic request knobs accepted by every call on [`crate::client::Client`].
///
/// Every field is optional. Fields a provider or model cannot honour are dropped
/// silently; numeric values are forwarded unclamped.
///
/// # Examples
///
/// ```
/// use parley_llm::types::{Message, RequestOptions, ThinkingLevel};
///
/// let options = RequestOptions {
///     messages: vec![Message::assistant("Hi, how can I help?")],
///     temperature: Some(0.2),
///     thinking: Some(ThinkingLevel::Low),
///     ..RequestOptions::default()
/// };
/// assert_eq!(options.messages.len(), 1);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestOptions {
    /// Prior conversation; the call's input is appended as the final user message.
    #[serde(default)]
    pub messages: Vec<Message>,
    /// System directive; overrides the client default for this call.
    #[serde(default)]
    pub instructions: Option<String>,
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
    #[serde(default)]
    pub top_p: Option<f64>,
    #[serde(default)]
    pub top_k: Option<u32>,
    #[serde(default)]
    pub presence_penalty: Option<f64>,
    #[serde(default)]
    pub frequency_penalty: Option<f64>,
    /// Reasoning effort; falls back to the client default when absent.
    #[serde(default)]
    pub thinking: Option<ThinkingLevel>,
    /// End-user identifier forwarded to providers that accept one.
    #[serde(default)]
    pub user: Option<String>,
}
