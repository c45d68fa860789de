use crate::error::LLMError;
use crate::provider::join_text;
use crate::response::{Completion, StreamDelta};

use super::types::{MessageResponse, StreamEventPayload};

const PROVIDER: &str = "claude";

pub(crate) fn parse_completion(body: &str) -> Result<Completion, LLMError> {
    let parsed: MessageResponse = serde_json::from_str(body).map_err(|err| {
        LLMError::provider(PROVIDER, format!("failed to parse Anthropic response: {err}"))
    })?;

    let text = join_text(
        parsed
            .content
            .iter()
            .filter(|block| block.kind == "text")
            .filter_map(|block| block.text.as_deref()),
    );
    let tool_arguments = parsed
        .content
        .into_iter()
        .find(|block| block.kind == "tool_use")
        .and_then(|block| block.input);

    Ok(Completion {
        text,
        tool_arguments,
    })
}

/// Maps one Messages SSE event; `message_stop` ends the answer.
pub(crate) fn parse_stream_event(data: &str) -> Result<StreamDelta, LLMError> {
    let event: StreamEventPayload = serde_json::from_str(data).map_err(|err| {
        LLMError::provider(PROVIDER, format!("failed to parse stream event: {err}"))
    })?;
    match event.kind.as_str() {
        "content_block_delta" => Ok(event
            .delta
            .filter(|delta| delta.kind.as_deref() == Some("text_delta"))
            .and_then(|delta| delta.text)
            .map_or(StreamDelta::Skip, StreamDelta::Text)),
        "message_stop" => Ok(StreamDelta::End),
        "error" => {
            let (kind, message) = event
                .error
                .map(|error| (error.kind, error.message))
                .unwrap_or_default();
            let message = message.unwrap_or_else(|| "stream reported an error".to_string());
            Err(match kind.as_deref() {
                Some("rate_limit_error") => LLMError::RateLimit {
                    message,
                    retry_after: None,
                },
                Some(kind) => LLMError::StreamClosed {
                    message: format!("{message} ({kind})"),
                },
                None => LLMError::StreamClosed { message },
            })
        }
        _ => Ok(StreamDelta::Skip),
    }
}
