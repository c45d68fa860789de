use serde::Deserialize;
use serde_json::Value;

/// Non-streaming Messages API response, reduced to its content blocks.
#[derive(Debug, Deserialize)]
pub(crate) struct MessageResponse {
    #[serde(default)]
    pub(crate) content: Vec<ContentBlock>,
}

/// One content block: `text`, `thinking`, `redacted_thinking` or `tool_use`.
#[derive(Debug, Deserialize)]
pub(crate) struct ContentBlock {
    #[serde(rename = "type")]
    pub(crate) kind: String,
    #[serde(default)]
    pub(crate) text: Option<String>,
    #[serde(default)]
    pub(crate) input: Option<Value>,
}

/// Streaming event envelope; only the fields the engine reads.
#[derive(Debug, Deserialize)]
pub(crate) struct StreamEventPayload {
    #[serde(rename = "type")]
    pub(crate) kind: String,
    #[serde(default)]
    pub(crate) delta: Option<StreamEventDelta>,
    #[serde(default)]
    pub(crate) error: Option<StreamEventError>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StreamEventDelta {
    #[serde(rename = "type", default)]
    pub(crate) kind: Option<String>,
    #[serde(default)]
    pub(crate) text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StreamEventError {
    #[serde(rename = "type", default)]
    pub(crate) kind: Option<String>,
    #[serde(default)]
    pub(crate) message: Option<String>,
}
