//! Structured output: choosing a technique per provider and shaping the request for it.
//!
//! Three interchangeable techniques exist. Native schema enforcement is preferred, a
//! forced call to a single tool whose parameters are the schema comes next, and
//! prompt injection (optionally backed by a schema-less JSON mode) is the fallback.
//! Whatever the technique, the answer goes through [`extract`] afterwards.

pub mod extract;
pub mod schema;

pub use schema::OutputSchema;

use tracing::debug;

use crate::capability::CapabilityRecord;
use crate::normalize::SYSTEM_SEPARATOR;

/// Name of the synthetic tool used by [`StructuredStrategy::ForcedToolCall`].
pub const RESPONSE_TOOL_NAME: &str = "json_response";

const RESPONSE_TOOL_DESCRIPTION: &str = "Return the final answer as JSON matching the parameters schema.";

/// Technique used to obtain schema-conformant output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StructuredStrategy {
    /// Provider enforces the schema during generation.
    NativeSchema,
    /// Provider is forced to call one tool whose parameters are the schema.
    ForcedToolCall,
    /// Schema is described in the instructions.
    PromptInjection,
}

/// Request-side effect of a strategy, rendered by every wire adapter.
#[derive(Debug, Clone)]
pub enum StructuredDirective {
    /// `strict` asks the provider to enforce the closed form of the schema.
    NativeSchema { schema: OutputSchema, strict: bool },
    ForcedTool {
        name: &'static str,
        description: String,
        schema: OutputSchema,
    },
    /// Schema-less JSON response mode; the schema travels in the instructions.
    JsonObject,
    /// Instructions alone carry the schema.
    PromptOnly,
}

impl StructuredDirective {
    pub fn is_forced_tool(&self) -> bool {
        matches!(self, StructuredDirective::ForcedTool { .. })
    }
}

/// Applies `strategy` for `schema`, returning the instructions to send and the directive.
///
/// Only prompt injection rewrites the instructions; the other strategies return them
/// untouched. When the record enforces native schemas only in strict mode and `schema`
/// cannot be made strict, a forced tool call (or prompt injection) is used instead.
///
/// # Examples
///
/// ```
/// use parley_llm::capability::{capabilities, Provider};
/// use parley_llm::structured::{apply_strategy, OutputSchema, StructuredDirective, StructuredStrategy};
/// use serde_json::json;
///
/// let record = capabilities(Provider::Groq, "llama-3.3-70b-versatile");
/// let schema = OutputSchema::new("answer", json!({"type": "object"})).unwrap();
/// let (instructions, directive) =
///     apply_strategy(StructuredStrategy::PromptInjection, &schema, Some("Be terse."), &record);
///
/// assert!(instructions.unwrap().starts_with("Be terse.\n\nRespond with JSON only"));
/// assert!(matches!(directive, StructuredDirective::JsonObject));
/// ```
pub fn apply_strategy(
    strategy: StructuredStrategy,
    schema: &OutputSchema,
    instructions: Option<&str>,
    record: &CapabilityRecord,
) -> (Option<String>, StructuredDirective) {
    let strategy = match strategy {
        StructuredStrategy::NativeSchema
            if record.strict_native_schema && schema.strict_schema().is_none() =>
        {
            let fallback = if record.forced_tool_call {
                StructuredStrategy::ForcedToolCall
            } else {
                StructuredStrategy::PromptInjection
            };
            debug!(
                schema = schema.name(),
                ?fallback,
                "schema cannot be enforced strictly, not using native mode"
            );
            fallback
        }
        other => other,
    };
    debug!(?strategy, schema = schema.name(), "applying structured output strategy");
    let instructions = instructions.map(str::to_owned);
    match strategy {
        StructuredStrategy::NativeSchema => (
            instructions,
            StructuredDirective::NativeSchema {
                schema: schema.clone(),
                strict: record.strict_native_schema,
            },
        ),
        StructuredStrategy::ForcedToolCall => (
            instructions,
            StructuredDirective::ForcedTool {
                name: RESPONSE_TOOL_NAME,
                description: schema
                    .description()
                    .unwrap_or(RESPONSE_TOOL_DESCRIPTION)
                    .to_owned(),
                schema: schema.clone(),
            },
        ),
        StructuredStrategy::PromptInjection => {
            let directive = if record.json_object_mode {
                StructuredDirective::JsonObject
            } else {
                StructuredDirective::PromptOnly
            };
            (Some(inject_schema(instructions, schema)), directive)
        }
    }
}

/// Appends the JSON-only directive and the pretty-printed schema to `instructions`.
pub fn inject_schema(instructions: Option<String>, schema: &OutputSchema) -> String {
    let rendered = serde_json::to_string_pretty(&schema.portable())
        .unwrap_or_else(|_| schema.portable().to_string());
    let directive = format!(
        "Respond with JSON only, no prose. The JSON must conform to this JSON Schema:\n{rendered}"
    );
    match instructions.filter(|text| !text.trim().is_empty()) {
        Some(existing) => format!("{existing}{SYSTEM_SEPARATOR}{directive}"),
        None => directive,
    }
}
