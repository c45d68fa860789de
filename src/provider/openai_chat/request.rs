use serde_json::{Map, Value, json};
use tracing::debug;

use crate::capability::ThinkingToken;
use crate::params::SamplingParams;
use crate::provider::PreparedCall;
use crate::structured::StructuredDirective;
use crate::types::Message;

/// Builds a Chat Completions request body.
pub(crate) fn build_body(
    model: &str,
    max_tokens_field: &str,
    call: &PreparedCall,
    stream: bool,
) -> Value {
    let mut body = Map::new();
    body.insert("model".to_string(), Value::String(model.to_string()));
    body.insert(
        "messages".to_string(),
        Value::Array(call.messages.messages.iter().map(convert_message).collect()),
    );
    insert_sampling(&mut body, max_tokens_field, &call.params);
    if let Some(directive) = &call.structured {
        insert_structured(&mut body, directive);
    }
    if let Some(format) = call.reasoning_format {
        body.insert(
            "reasoning_format".to_string(),
            Value::String(format.to_string()),
        );
    }
    if stream {
        body.insert("stream".to_string(), Value::Bool(true));
    }
    Value::Object(body)
}

fn convert_message(message: &Message) -> Value {
    json!({
        "role": message.role.as_str(),
        "content": message.content,
    })
}

fn insert_sampling(body: &mut Map<String, Value>, max_tokens_field: &str, params: &SamplingParams) {
    if let Some(temperature) = params.temperature {
        body.insert("temperature".to_string(), Value::from(temperature));
    }
    if let Some(top_p) = params.top_p {
        body.insert("top_p".to_string(), Value::from(top_p));
    }
    if let Some(max_tokens) = params.max_tokens {
        body.insert(max_tokens_field.to_string(), Value::from(max_tokens));
    }
    if let Some(penalty) = params.presence_penalty {
        body.insert("presence_penalty".to_string(), Value::from(penalty));
    }
    if let Some(penalty) = params.frequency_penalty {
        body.insert("frequency_penalty".to_string(), Value::from(penalty));
    }
    if let Some(user) = &params.user {
        body.insert("user".to_string(), Value::String(user.clone()));
    }
    match params.thinking {
        Some(ThinkingToken::Effort(effort)) => {
            body.insert(
                "reasoning_effort".to_string(),
                Value::String(effort.to_string()),
            );
        }
        Some(ThinkingToken::Budget(budget)) => {
            debug!(budget, "chat completions has no thinking budget field, omitting");
        }
        None => {}
    }
}

fn insert_structured(body: &mut Map<String, Value>, directive: &StructuredDirective) {
    match directive {
        StructuredDirective::NativeSchema { schema, strict } => {
            let mut json_schema = Map::new();
            json_schema.insert("name".to_string(), Value::String(schema.name().to_string()));
            if let Some(description) = schema.description() {
                json_schema.insert(
                    "description".to_string(),
                    Value::String(description.to_string()),
                );
            }
            match schema.strict_schema().filter(|_| *strict) {
                Some(closed) => {
                    json_schema.insert("schema".to_string(), closed);
                    json_schema.insert("strict".to_string(), Value::Bool(true));
                }
                None => {
                    json_schema.insert("schema".to_string(), schema.portable());
                }
            }
            body.insert(
                "response_format".to_string(),
                json!({"type": "json_schema", "json_schema": json_schema}),
            );
        }
        StructuredDirective::ForcedTool {
            name,
            description,
            schema,
        } => {
            body.insert(
                "tools".to_string(),
                json!([{
                    "type": "function",
                    "function": {
                        "name": name,
                        "description": description,
                        "parameters": schema.portable(),
                    }
                }]),
            );
            body.insert(
                "tool_choice".to_string(),
                json!({"type": "function", "function": {"name": name}}),
            );
        }
        StructuredDirective::JsonObject => {
            body.insert(
                "response_format".to_string(),
                json!({"type": "json_object"}),
            );
        }
        StructuredDirective::PromptOnly => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::Provider;
    use crate::provider::test_support::{greeting_schema, prepared};
    use crate::structured::{OutputSchema, RESPONSE_TOOL_NAME, StructuredStrategy, apply_strategy};
    use crate::types::{RequestOptions, Role, ThinkingLevel};

    #[test]
    fn system_text_leads_the_message_list() {
        let options = RequestOptions {
            messages: vec![Message::system("A"), Message::new(Role::Tool, "42")],
            instructions: Some("B".into()),
            ..RequestOptions::default()
        };
        let call = prepared(Provider::OpenAi, "gpt-4o", &options, None);
        let body = build_body("gpt-4o", "max_completion_tokens", &call, false);
        assert_eq!(
            body["messages"],
            json!([
                {"role": "system", "content": "A\n\nB"},
                {"role": "user", "content": "42"},
                {"role": "user", "content": "hello"}
            ])
        );
        assert!(body.get("stream").is_none());
    }

    #[test]
    fn reasoning_models_get_effort_and_no_sampling() {
        let options = RequestOptions {
            temperature: Some(0.3),
            top_p: Some(0.5),
            thinking: Some(ThinkingLevel::Medium),
            user: Some("u-1".into()),
            ..RequestOptions::default()
        };
        let call = prepared(Provider::OpenAi, "o3-mini", &options, None);
        let body = build_body("o3-mini", "max_completion_tokens", &call, false);
        assert_eq!(body["reasoning_effort"], "medium");
        assert_eq!(body["user"], "u-1");
        assert!(body.get("temperature").is_none());
        assert!(body.get("top_p").is_none());
    }

    #[test]
    fn native_schema_uses_response_format() {
        let schema = greeting_schema();
        let call = prepared(Provider::OpenAi, "gpt-4o", &RequestOptions::default(), Some(&schema));
        let body = build_body("gpt-4o", "max_completion_tokens", &call, false);
        assert_eq!(body["response_format"]["type"], "json_schema");
        assert_eq!(body["response_format"]["json_schema"]["name"], "greeting");
        assert_eq!(
            body["response_format"]["json_schema"]["schema"]["required"],
            json!(["greeting", "language"])
        );
        assert_eq!(body["response_format"]["json_schema"]["strict"], json!(true));
        assert!(body.get("tools").is_none());
    }

    #[test]
    fn strict_schema_is_closed_before_sending() {
        let schema = OutputSchema::new(
            "city",
            json!({
                "type": "object",
                "properties": {"name": {"type": "string"}},
                "required": ["name"]
            }),
        )
        .unwrap();
        let call = prepared(
            Provider::Mistral,
            "mistral-large-latest",
            &RequestOptions::default(),
            Some(&schema),
        );
        let body = build_body("mistral-large-latest", "max_tokens", &call, false);
        let json_schema = &body["response_format"]["json_schema"];
        assert_eq!(json_schema["strict"], json!(true));
        assert_eq!(json_schema["schema"]["additionalProperties"], json!(false));
    }

    #[test]
    fn groq_schema_models_without_strict_mode_send_best_effort_schema() {
        let schema = greeting_schema();
        let model = "moonshotai/kimi-k2-instruct";
        let call = prepared(Provider::Groq, model, &RequestOptions::default(), Some(&schema));
        let body = build_body(model, "max_completion_tokens", &call, false);
        assert_eq!(body["response_format"]["type"], "json_schema");
        assert!(body["response_format"]["json_schema"].get("strict").is_none());
    }

    #[test]
    fn forced_tool_names_the_response_tool() {
        let schema: OutputSchema = greeting_schema().with_description("A greeting");
        let call = PreparedCall {
            structured: Some(
                apply_strategy(
                    StructuredStrategy::ForcedToolCall,
                    &schema,
                    None,
                    &crate::capability::capabilities(Provider::Mistral, "mistral-small-latest"),
                )
                .1,
            ),
            ..prepared(Provider::Mistral, "mistral-small-latest", &RequestOptions::default(), None)
        };
        let body = build_body("mistral-small-latest", "max_tokens", &call, false);
        assert_eq!(body["tools"][0]["function"]["name"], RESPONSE_TOOL_NAME);
        assert_eq!(body["tools"][0]["function"]["description"], "A greeting");
        assert_eq!(
            body["tool_choice"],
            json!({"type": "function", "function": {"name": RESPONSE_TOOL_NAME}})
        );
    }

    #[test]
    fn prompt_injection_on_groq_uses_json_object_mode() {
        let schema = greeting_schema();
        let call = prepared(
            Provider::Groq,
            "llama-3.3-70b-versatile",
            &RequestOptions::default(),
            Some(&schema),
        );
        let body = build_body("llama-3.3-70b-versatile", "max_completion_tokens", &call, false);
        assert_eq!(body["response_format"], json!({"type": "json_object"}));
        let system = body["messages"][0]["content"].as_str().unwrap();
        assert!(system.starts_with("Respond with JSON only, no prose."));
        assert_eq!(body["messages"][0]["role"], "system");
    }

    #[test]
    fn groq_qwen_off_sends_none() {
        let options = RequestOptions {
            thinking: Some(ThinkingLevel::Off),
            ..RequestOptions::default()
        };
        let call = prepared(Provider::Groq, "qwen/qwen3-32b", &options, None);
        let body = build_body("qwen/qwen3-32b", "max_completion_tokens", &call, false);
        assert_eq!(body["reasoning_effort"], "none");
        assert!(body.get("reasoning_format").is_none());
    }

    #[test]
    fn groq_reasoning_moves_out_of_json_answers() {
        let schema = greeting_schema();
        let call = prepared(Provider::Groq, "qwen/qwen3-32b", &RequestOptions::default(), Some(&schema));
        let body = build_body("qwen/qwen3-32b", "max_completion_tokens", &call, false);
        assert_eq!(body["response_format"], json!({"type": "json_object"}));
        assert_eq!(body["reasoning_format"], "parsed");

        let call = prepared(
            Provider::Groq,
            "llama-3.3-70b-versatile",
            &RequestOptions::default(),
            Some(&schema),
        );
        let body = build_body("llama-3.3-70b-versatile", "max_completion_tokens", &call, false);
        assert!(body.get("reasoning_format").is_none());
    }
}
