use tracing::warn;

use crate::error::LLMError;
use crate::provider::join_text;
use crate::response::{Completion, StreamDelta};

use super::types::GenerateContentResponse;

const PROVIDER: &str = "gemini";

fn decode(body: &str) -> Result<GenerateContentResponse, LLMError> {
    serde_json::from_str(body).map_err(|err| {
        LLMError::provider(PROVIDER, format!("failed to parse Gemini response: {err}"))
    })
}

/// Reads the first candidate, skipping `thought` parts.
///
/// A prompt blocked by safety filters has no candidates and yields an empty completion.
pub(crate) fn parse_completion(body: &str) -> Result<Completion, LLMError> {
    let parsed = decode(body)?;
    if let Some(reason) = parsed
        .prompt_feedback
        .as_ref()
        .and_then(|feedback| feedback.block_reason.as_deref())
    {
        warn!(reason, "gemini blocked the prompt");
    }
    let Some(parts) = parsed
        .candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content)
        .map(|content| content.parts)
    else {
        return Ok(Completion::default());
    };

    let text = join_text(
        parts
            .iter()
            .filter(|part| !part.thought)
            .filter_map(|part| part.text.as_deref()),
    );
    let tool_arguments = parts
        .into_iter()
        .find_map(|part| part.function_call)
        .and_then(|call| call.args);

    Ok(Completion {
        text,
        tool_arguments,
    })
}

/// Each SSE event carries a full `GenerateContentResponse` chunk.
pub(crate) fn parse_stream_event(data: &str) -> Result<StreamDelta, LLMError> {
    let chunk = decode(data)?;
    if let Some(error) = chunk.error {
        let message = error
            .message
            .unwrap_or_else(|| "stream reported an error".to_string());
        return Err(LLMError::StreamClosed {
            message: match error.status {
                Some(status) => format!("{message} ({status})"),
                None => message,
            },
        });
    }
    let text = chunk
        .candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content)
        .and_then(|content| {
            join_text(
                content
                    .parts
                    .iter()
                    .filter(|part| !part.thought)
                    .filter_map(|part| part.text.as_deref()),
            )
        });
    Ok(text.map_or(StreamDelta::Skip, StreamDelta::Text))
}
