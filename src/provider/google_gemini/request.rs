use serde_json::{Map, Value, json};
use tracing::debug;

use crate::capability::ThinkingToken;
use crate::provider::PreparedCall;
use crate::structured::StructuredDirective;
use crate::types::Role;

/// Builds a `generateContent` request body.
///
/// The model is part of the URL, so it never appears here.
pub(crate) fn build_body(call: &PreparedCall) -> Value {
    let mut body = Map::new();
    body.insert(
        "contents".to_string(),
        Value::Array(
            call.messages
                .messages
                .iter()
                .map(|message| {
                    let role = match message.role {
                        Role::Assistant => "model",
                        _ => "user",
                    };
                    json!({"role": role, "parts": [{"text": message.content}]})
                })
                .collect(),
        ),
    );
    if let Some(system) = &call.messages.system {
        body.insert(
            "system_instruction".to_string(),
            json!({"parts": [{"text": system}]}),
        );
    }

    let mut config = generation_config(call);
    match &call.structured {
        Some(StructuredDirective::NativeSchema { schema, .. }) => {
            config.insert(
                "responseMimeType".to_string(),
                Value::String("application/json".to_string()),
            );
            config.insert("responseSchema".to_string(), schema.openapi_subset());
        }
        Some(StructuredDirective::JsonObject) => {
            config.insert(
                "responseMimeType".to_string(),
                Value::String("application/json".to_string()),
            );
        }
        Some(StructuredDirective::ForcedTool {
            name,
            description,
            schema,
        }) => {
            body.insert(
                "tools".to_string(),
                json!([{
                    "functionDeclarations": [{
                        "name": name,
                        "description": description,
                        "parameters": schema.openapi_subset(),
                    }]
                }]),
            );
            body.insert(
                "toolConfig".to_string(),
                json!({
                    "functionCallingConfig": {
                        "mode": "ANY",
                        "allowedFunctionNames": [name],
                    }
                }),
            );
        }
        Some(StructuredDirective::PromptOnly) | None => {}
    }
    if !config.is_empty() {
        body.insert("generationConfig".to_string(), Value::Object(config));
    }

    Value::Object(body)
}

fn generation_config(call: &PreparedCall) -> Map<String, Value> {
    let params = &call.params;
    let mut config = Map::new();
    if let Some(temperature) = params.temperature {
        config.insert("temperature".to_string(), Value::from(temperature));
    }
    if let Some(top_p) = params.top_p {
        config.insert("topP".to_string(), Value::from(top_p));
    }
    if let Some(top_k) = params.top_k {
        config.insert("topK".to_string(), Value::from(top_k));
    }
    if let Some(max_tokens) = params.max_tokens {
        config.insert("maxOutputTokens".to_string(), Value::from(max_tokens));
    }
    if let Some(presence) = params.presence_penalty {
        config.insert("presencePenalty".to_string(), Value::from(presence));
    }
    if let Some(frequency) = params.frequency_penalty {
        config.insert("frequencyPenalty".to_string(), Value::from(frequency));
    }
    // A zero budget is sent as-is: it is how thinking gets switched off.
    match params.thinking {
        Some(ThinkingToken::Budget(budget)) => {
            config.insert(
                "thinkingConfig".to_string(),
                json!({"thinkingBudget": budget}),
            );
        }
        Some(ThinkingToken::Effort(effort)) => {
            debug!(effort, "gemini expects a thinking budget, omitting effort");
        }
        None => {}
    }
    config
}
