use serde_json::{Map, Value, json};
use tracing::debug;

use crate::capability::ThinkingToken;
use crate::provider::PreparedCall;
use crate::structured::{RESPONSE_TOOL_NAME, StructuredDirective};

/// Used only if the call reaches the wire without a limit; the API requires one.
const FALLBACK_MAX_TOKENS: u32 = 4096;

/// Builds a Messages API request body.
///
/// The system directive travels in the top-level `system` field.
pub(crate) fn build_body(model: &str, call: &PreparedCall, stream: bool) -> Value {
    let params = &call.params;
    let mut body = Map::new();
    body.insert("model".to_string(), Value::String(model.to_string()));
    body.insert(
        "max_tokens".to_string(),
        Value::from(params.max_tokens.unwrap_or(FALLBACK_MAX_TOKENS)),
    );
    if let Some(system) = &call.messages.system {
        body.insert("system".to_string(), Value::String(system.clone()));
    }
    body.insert(
        "messages".to_string(),
        Value::Array(
            call.messages
                .messages
                .iter()
                .map(|message| json!({"role": message.role.as_str(), "content": message.content}))
                .collect(),
        ),
    );

    if let Some(temperature) = params.temperature {
        body.insert("temperature".to_string(), Value::from(temperature));
    }
    if let Some(top_p) = params.top_p {
        body.insert("top_p".to_string(), Value::from(top_p));
    }
    if let Some(top_k) = params.top_k {
        body.insert("top_k".to_string(), Value::from(top_k));
    }
    if let Some(user) = &params.user {
        body.insert("metadata".to_string(), json!({"user_id": user}));
    }
    match params.active_thinking() {
        Some(ThinkingToken::Budget(budget)) => {
            body.insert(
                "thinking".to_string(),
                json!({"type": "enabled", "budget_tokens": budget}),
            );
        }
        Some(ThinkingToken::Effort(effort)) => {
            debug!(effort, "messages API expects a thinking budget, omitting effort");
        }
        None => {}
    }

    match &call.structured {
        // No native schema mode on this wire: a native directive is served by the tool route.
        Some(StructuredDirective::NativeSchema { schema, .. }) => {
            insert_tool(
                &mut body,
                RESPONSE_TOOL_NAME,
                schema.description().unwrap_or(schema.name()),
                schema.portable(),
            );
        }
        Some(StructuredDirective::ForcedTool {
            name,
            description,
            schema,
        }) => insert_tool(&mut body, name, description, schema.portable()),
        Some(StructuredDirective::JsonObject | StructuredDirective::PromptOnly) | None => {}
    }

    if stream {
        body.insert("stream".to_string(), Value::Bool(true));
    }
    Value::Object(body)
}

fn insert_tool(body: &mut Map<String, Value>, name: &str, description: &str, schema: Value) {
    body.insert(
        "tools".to_string(),
        json!([{
            "name": name,
            "description": description,
            "input_schema": schema,
        }]),
    );
    body.insert(
        "tool_choice".to_string(),
        json!({"type": "tool", "name": name}),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::Provider;
    use crate::provider::test_support::{greeting_schema, prepared};
    use crate::types::{Message, RequestOptions, Role, ThinkingLevel};

    #[test]
    fn system_goes_to_the_side_channel() {
        let options = RequestOptions {
            messages: vec![
                Message::system("A"),
                Message::assistant("Earlier answer"),
                Message::new(Role::Function, "result"),
            ],
            instructions: Some("B".into()),
            ..RequestOptions::default()
        };
        let call = prepared(Provider::Claude, "claude-3-5-haiku-latest", &options, None);
        let body = build_body("claude-3-5-haiku-latest", &call, false);
        assert_eq!(body["system"], "A\n\nB");
        assert_eq!(
            body["messages"],
            json!([
                {"role": "assistant", "content": "Earlier answer"},
                {"role": "user", "content": "result"},
                {"role": "user", "content": "hello"}
            ])
        );
        assert_eq!(body["max_tokens"], 4096);
    }

    #[test]
    fn thinking_budget_is_rendered_and_sampling_dropped() {
        let options = RequestOptions {
            temperature: Some(0.9),
            top_k: Some(5),
            thinking: Some(ThinkingLevel::High),
            user: Some("user-7".into()),
            ..RequestOptions::default()
        };
        let call = prepared(Provider::Claude, "claude-sonnet-4-0", &options, None);
        let body = build_body("claude-sonnet-4-0", &call, true);
        assert_eq!(
            body["thinking"],
            json!({"type": "enabled", "budget_tokens": 16384})
        );
        assert_eq!(body["max_tokens"], 4096 + 16384);
        assert_eq!(body["metadata"], json!({"user_id": "user-7"}));
        assert_eq!(body["stream"], true);
        assert!(body.get("temperature").is_none());
        assert!(body.get("top_k").is_none());
    }

    #[test]
    fn budget_never_reaches_caller_max_tokens() {
        let options = RequestOptions {
            max_tokens: Some(1000),
            thinking: Some(ThinkingLevel::Low),
            ..RequestOptions::default()
        };
        let call = prepared(Provider::Claude, "claude-sonnet-4-0", &options, None);
        let body = build_body("claude-sonnet-4-0", &call, false);
        assert_eq!(body["max_tokens"], 1000);
        assert!(body.get("thinking").is_none());

        let options = RequestOptions {
            max_tokens: Some(6000),
            thinking: Some(ThinkingLevel::High),
            ..RequestOptions::default()
        };
        let call = prepared(Provider::Claude, "claude-sonnet-4-0", &options, None);
        let body = build_body("claude-sonnet-4-0", &call, false);
        assert_eq!(
            body["thinking"],
            json!({"type": "enabled", "budget_tokens": 5999})
        );
    }

    #[test]
    fn forced_tool_drops_thinking() {
        let schema = greeting_schema();
        let options = RequestOptions {
            thinking: Some(ThinkingLevel::Medium),
            ..RequestOptions::default()
        };
        let call = prepared(Provider::Claude, "claude-sonnet-4-0", &options, Some(&schema));
        let body = build_body("claude-sonnet-4-0", &call, false);
        assert_eq!(body["tools"][0]["name"], RESPONSE_TOOL_NAME);
        assert_eq!(
            body["tools"][0]["input_schema"]["properties"]["greeting"],
            json!({"type": "string"})
        );
        assert_eq!(
            body["tool_choice"],
            json!({"type": "tool", "name": RESPONSE_TOOL_NAME})
        );
        assert!(body.get("thinking").is_none());
        assert_eq!(body["max_tokens"], 4096);
    }
}
