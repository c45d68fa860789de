use serde::Deserialize;
use serde_json::Value;

/// Subset of a Chat Completions response the engine reads.
#[derive(Debug, Deserialize)]
pub(crate) struct ChatCompletion {
    #[serde(default)]
    pub(crate) choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatChoice {
    #[serde(default)]
    pub(crate) message: Option<ChatMessage>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatMessage {
    #[serde(default)]
    pub(crate) content: Option<ChatContent>,
    #[serde(default)]
    pub(crate) tool_calls: Option<Vec<ChatToolCall>>,
}

/// Plain string, or typed parts (Mistral's reasoning models answer with parts).
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum ChatContent {
    Text(String),
    Parts(Vec<ChatContentPart>),
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatContentPart {
    #[serde(rename = "type")]
    pub(crate) kind: String,
    #[serde(default)]
    pub(crate) text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatToolCall {
    #[serde(default)]
    pub(crate) function: Option<ChatToolFunction>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatToolFunction {
    #[serde(default)]
    pub(crate) arguments: Option<Value>,
}

/// One `data:` payload of a streamed completion.
#[derive(Debug, Deserialize)]
pub(crate) struct ChatStreamChunk {
    #[serde(default)]
    pub(crate) choices: Vec<ChatStreamChoice>,
    /// Groq and Mistral report mid-stream failures inline.
    #[serde(default)]
    pub(crate) error: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatStreamChoice {
    #[serde(default)]
    pub(crate) delta: Option<ChatStreamDelta>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatStreamDelta {
    #[serde(default)]
    pub(crate) content: Option<ChatContent>,
}
