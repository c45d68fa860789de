use serde_json::Value;

use crate::error::LLMError;
use crate::provider::join_text;
use crate::response::{Completion, StreamDelta};

use super::types::{ChatCompletion, ChatContent, ChatStreamChunk};

pub(crate) fn parse_completion(body: &str, provider: &'static str) -> Result<Completion, LLMError> {
    let parsed: ChatCompletion = serde_json::from_str(body).map_err(|err| {
        LLMError::provider(provider, format!("failed to parse chat completion: {err}"))
    })?;
    let Some(message) = parsed.choices.into_iter().next().and_then(|c| c.message) else {
        return Ok(Completion::default());
    };

    let tool_arguments = message
        .tool_calls
        .unwrap_or_default()
        .into_iter()
        .find_map(|call| call.function.and_then(|f| f.arguments))
        .map(decode_arguments);

    Ok(Completion {
        text: message.content.as_ref().and_then(content_text),
        tool_arguments,
    })
}

pub(crate) fn parse_stream_event(data: &str, provider: &'static str) -> Result<StreamDelta, LLMError> {
    let chunk: ChatStreamChunk = serde_json::from_str(data).map_err(|err| {
        LLMError::provider(provider, format!("failed to parse stream chunk: {err}"))
    })?;
    if let Some(error) = chunk.error {
        return Err(LLMError::StreamClosed {
            message: error
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_owned)
                .unwrap_or_else(|| error.to_string()),
        });
    }
    let text = chunk
        .choices
        .first()
        .and_then(|choice| choice.delta.as_ref())
        .and_then(|delta| delta.content.as_ref())
        .and_then(content_text);
    Ok(text.map_or(StreamDelta::Skip, StreamDelta::Text))
}

fn content_text(content: &ChatContent) -> Option<String> {
    match content {
        ChatContent::Text(text) => Some(text.clone()),
        ChatContent::Parts(parts) => join_text(
            parts
                .iter()
                .filter(|part| part.kind == "text")
                .filter_map(|part| part.text.as_deref()),
        ),
    }
}

/// Tool arguments arrive as a JSON-encoded string; keep the raw string if it does not parse.
fn decode_arguments(arguments: Value) -> Value {
    match arguments {
        Value::String(raw) => serde_json::from_str(&raw).unwrap_or(Value::String(raw)),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn text_comes_from_the_first_choice() {
        let body = r#"{
  "id": "chatcmpl-1",
  "object": "chat.completion",
  "model": "gpt-4o",
  "choices": [
    {"index": 0, "message": {"role": "assistant", "content": "Paris"}, "finish_reason": "stop"},
    {"index": 1, "message": {"role": "assistant", "content": "Lyon"}, "finish_reason": "stop"}
  ]
}"#;
        let completion = parse_completion(body, "openai").unwrap();
        assert_eq!(completion.text.as_deref(), Some("Paris"));
        assert_eq!(completion.tool_arguments, None);
    }

    #[test]
    fn null_content_is_absent() {
        let body = r#"{"choices": [{"message": {"role": "assistant", "content": null}}]}"#;
        assert_eq!(parse_completion(body, "openai").unwrap(), Completion::default());
        assert_eq!(
            parse_completion(r#"{"choices": []}"#, "openai").unwrap(),
            Completion::default()
        );
    }

    #[test]
    fn tool_arguments_are_decoded() {
        let body = r#"{"choices": [{"message": {"role": "assistant", "content": null, "tool_calls": [
            {"id": "call_1", "type": "function", "function": {"name": "json_response", "arguments": "{\"greeting\":\"Hi\"}"}}
        ]}}]}"#;
        let completion = parse_completion(body, "mistral").unwrap();
        assert_eq!(completion.tool_arguments, Some(json!({"greeting": "Hi"})));

        let body = r#"{"choices": [{"message": {"tool_calls": [
            {"type": "function", "function": {"name": "json_response", "arguments": "{broken"}}
        ]}}]}"#;
        let completion = parse_completion(body, "openai").unwrap();
        assert_eq!(completion.tool_arguments, Some(json!("{broken")));
    }

    #[test]
    fn reasoning_parts_are_not_text() {
        let body = r#"{"choices": [{"message": {"role": "assistant", "content": [
            {"type": "thinking", "thinking": [{"type": "text", "text": "hmm"}]},
            {"type": "text", "text": "42"}
        ]}}]}"#;
        let completion = parse_completion(body, "mistral").unwrap();
        assert_eq!(completion.text.as_deref(), Some("42"));
    }

    #[test]
    fn malformed_bodies_are_provider_errors() {
        match parse_completion("<html>", "groq") {
            Err(LLMError::Provider { provider, .. }) => assert_eq!(provider, "groq"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn stream_chunks_map_to_deltas() {
        assert_eq!(
            parse_stream_event(r#"{"choices":[{"index":0,"delta":{"content":"1\n"}}]}"#, "openai")
                .unwrap(),
            StreamDelta::Text("1\n".into())
        );
        assert_eq!(
            parse_stream_event(r#"{"choices":[{"index":0,"delta":{"role":"assistant"}}]}"#, "openai")
                .unwrap(),
            StreamDelta::Skip
        );
        assert_eq!(
            parse_stream_event(r#"{"choices":[],"usage":{"total_tokens":3}}"#, "openai").unwrap(),
            StreamDelta::Skip
        );
        let err = parse_stream_event(r#"{"error":{"message":"model overloaded"}}"#, "groq")
            .unwrap_err();
        assert!(matches!(err, LLMError::StreamClosed { message } if message == "model overloaded"));
    }
}
