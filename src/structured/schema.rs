//! Schema descriptors for structured output.

use std::fmt;
use std::sync::Arc;

use jsonschema::{Draft, JSONSchema};
use serde_json::{Map, Value};

use crate::error::LLMError;

const MAX_REF_DEPTH: usize = 32;

/// Keywords Gemini's OpenAPI subset understands.
const OPENAPI_KEYWORDS: &[&str] = &[
    "type",
    "format",
    "description",
    "nullable",
    "enum",
    "properties",
    "required",
    "items",
    "minItems",
    "maxItems",
    "minimum",
    "maximum",
    "anyOf",
    "propertyOrdering",
];

/// Caller-supplied output schema plus its compiled validator.
///
/// # Examples
///
/// ```
/// use parley_llm::structured::OutputSchema;
/// use serde_json::json;
///
/// let schema = OutputSchema::new(
///     "greeting",
///     json!({
///         "type": "object",
///         "properties": {
///             "greeting": {"type": "string"},
///             "language": {"type": "string"}
///         },
///         "required": ["greeting", "language"]
///     }),
/// )
/// .unwrap();
///
/// assert!(schema.validate(&json!({"greeting": "Hello", "language": "English"})).is_ok());
/// assert!(schema.validate(&json!({"greeting": 1})).is_err());
/// ```
#[derive(Clone)]
pub struct OutputSchema {
    name: String,
    description: Option<String>,
    document: Value,
    validator: Arc<JSONSchema>,
}

impl OutputSchema {
    /// Compiles `document` under `name`.
    ///
    /// # Errors
    ///
    /// Returns [`LLMError::Validation`] when the name is not a valid identifier or the
    /// document is not a valid JSON Schema.
    pub fn new(name: impl Into<String>, document: Value) -> Result<Self, LLMError> {
        let name = name.into();
        if name.is_empty()
            || !name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(LLMError::Validation {
                message: format!(
                    "schema name `{name}` must be non-empty and use only letters, digits, `_` or `-`"
                ),
            });
        }
        let validator = JSONSchema::options()
            .with_draft(Draft::Draft7)
            .compile(&document)
            .map_err(|err| LLMError::Validation {
                message: format!("invalid JSON schema: {err}"),
            })?;
        Ok(Self {
            name,
            description: None,
            document,
            validator: Arc::new(validator),
        })
    }

    /// Derives the schema from a Rust type.
    pub fn of<T: schemars::JsonSchema>() -> Result<Self, LLMError> {
        let root = schemars::schema_for!(T);
        let document = serde_json::to_value(&root).map_err(|err| LLMError::Validation {
            message: format!("failed to serialize derived schema: {err}"),
        })?;
        let name: String = T::schema_name()
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
            .collect();
        Self::new(name, document)
    }

    /// Attaches a human-readable description used by tool-based strategies.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// The schema exactly as supplied.
    pub fn document(&self) -> &Value {
        &self.document
    }

    /// Self-contained JSON Schema: local `$ref`s inlined, meta keywords removed.
    pub fn portable(&self) -> Value {
        let definitions = collect_definitions(&self.document);
        let mut value = inline_refs(&self.document, &definitions, 0);
        if let Value::Object(map) = &mut value {
            map.remove("$schema");
            map.remove("definitions");
            map.remove("$defs");
            map.remove("title");
        }
        value
    }

    /// Portable schema reduced to the OpenAPI subset accepted by Gemini.
    pub fn openapi_subset(&self) -> Value {
        to_openapi(&self.portable())
    }

    /// Portable schema closed for strict enforcement, or `None` when it cannot be.
    ///
    /// Strict mode needs an object root and, on every object, all properties listed in
    /// `required` and `additionalProperties: false`. A missing `additionalProperties` is
    /// closed here; open objects and optional properties make the schema ineligible.
    pub fn strict_schema(&self) -> Option<Value> {
        let mut value = self.portable();
        if value.get("type").and_then(Value::as_str) != Some("object") {
            return None;
        }
        close_objects(&mut value).then_some(value)
    }

    /// Validates `value`, returning one message per violation.
    pub fn validate(&self, value: &Value) -> Result<(), Vec<String>> {
        self.validator.validate(value).map_err(|errors| {
            errors
                .map(|err| {
                    let path = err.instance_path.to_string();
                    if path.is_empty() {
                        err.to_string()
                    } else {
                        format!("{path}: {err}")
                    }
                })
                .collect()
        })
    }
}

impl fmt::Debug for OutputSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutputSchema")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("document", &self.document)
            .finish_non_exhaustive()
    }
}

fn collect_definitions(document: &Value) -> Map<String, Value> {
    let mut definitions = Map::new();
    for key in ["definitions", "$defs"] {
        if let Some(Value::Object(map)) = document.get(key) {
            for (name, schema) in map {
                definitions.insert(format!("#/{key}/{name}"), schema.clone());
            }
        }
    }
    definitions
}

fn inline_refs(value: &Value, definitions: &Map<String, Value>, depth: usize) -> Value {
    match value {
        Value::Object(map) => {
            if let Some(Value::String(reference)) = map.get("$ref") {
                if depth < MAX_REF_DEPTH {
                    if let Some(target) = definitions.get(reference) {
                        let mut resolved = inline_refs(target, definitions, depth + 1);
                        if let Value::Object(resolved_map) = &mut resolved {
                            for (key, sibling) in map.iter().filter(|(key, _)| *key != "$ref") {
                                resolved_map
                                    .entry(key.clone())
                                    .or_insert_with(|| inline_refs(sibling, definitions, depth));
                            }
                        }
                        return resolved;
                    }
                }
            }
            Value::Object(
                map.iter()
                    .map(|(key, child)| (key.clone(), inline_refs(child, definitions, depth)))
                    .collect(),
            )
        }
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|item| inline_refs(item, definitions, depth))
                .collect(),
        ),
        other => other.clone(),
    }
}

fn close_objects(value: &mut Value) -> bool {
    match value {
        Value::Object(map) => {
            if is_object_schema(map) && !close_object(map) {
                return false;
            }
            map.iter_mut()
                .filter(|(key, _)| {
                    matches!(
                        key.as_str(),
                        "properties" | "items" | "anyOf" | "oneOf" | "allOf" | "prefixItems"
                    )
                })
                .all(|(key, child)| match (key.as_str(), child) {
                    ("properties", Value::Object(properties)) => {
                        properties.values_mut().all(close_objects)
                    }
                    (_, child) => close_objects(child),
                })
        }
        Value::Array(items) => items.iter_mut().all(close_objects),
        _ => true,
    }
}

fn is_object_schema(map: &Map<String, Value>) -> bool {
    map.contains_key("properties")
        || match map.get("type") {
            Some(Value::String(kind)) => kind == "object",
            Some(Value::Array(kinds)) => kinds.iter().any(|kind| kind == "object"),
            _ => false,
        }
}

fn close_object(map: &mut Map<String, Value>) -> bool {
    let Some(Value::Object(properties)) = map.get("properties") else {
        return false;
    };
    let required: Vec<&str> = match map.get("required") {
        Some(Value::Array(names)) => names.iter().filter_map(Value::as_str).collect(),
        _ => Vec::new(),
    };
    if !properties.keys().all(|name| required.contains(&name.as_str())) {
        return false;
    }
    match map.get("additionalProperties") {
        None => {
            map.insert("additionalProperties".into(), Value::Bool(false));
            true
        }
        Some(Value::Bool(false)) => true,
        Some(_) => false,
    }
}

fn to_openapi(value: &Value) -> Value {
    let Value::Object(map) = value else {
        return value.clone();
    };
    let mut out = Map::new();
    for (key, child) in map {
        match key.as_str() {
            "type" => match child {
                Value::Array(types) => {
                    let concrete: Vec<&Value> =
                        types.iter().filter(|t| t.as_str() != Some("null")).collect();
                    if concrete.len() < types.len() {
                        out.insert("nullable".into(), Value::Bool(true));
                    }
                    if let Some(first) = concrete.first() {
                        out.insert("type".into(), (*first).clone());
                    }
                }
                other => {
                    out.insert("type".into(), other.clone());
                }
            },
            "format" => {
                if matches!(child.as_str(), Some("enum" | "date-time")) {
                    out.insert(key.clone(), child.clone());
                }
            }
            "properties" => {
                if let Value::Object(properties) = child {
                    out.insert(
                        key.clone(),
                        Value::Object(
                            properties
                                .iter()
                                .map(|(name, schema)| (name.clone(), to_openapi(schema)))
                                .collect(),
                        ),
                    );
                }
            }
            "items" => {
                out.insert(key.clone(), to_openapi(child));
            }
            "anyOf" | "oneOf" => {
                if let Value::Array(variants) = child {
                    out.insert(
                        "anyOf".into(),
                        Value::Array(variants.iter().map(to_openapi).collect()),
                    );
                }
            }
            other if OPENAPI_KEYWORDS.contains(&other) => {
                out.insert(key.clone(), child.clone());
            }
            _ => {}
        }
    }
    Value::Object(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[allow(dead_code)]
    #[derive(Deserialize, schemars::JsonSchema)]
    struct Address {
        city: String,
    }

    #[allow(dead_code)]
    #[derive(Deserialize, schemars::JsonSchema)]
    struct Person {
        name: String,
        nickname: Option<String>,
        address: Address,
    }

    #[test]
    fn invalid_schema_is_rejected() {
        let err = OutputSchema::new("broken", json!({"type": 12})).unwrap_err();
        assert!(matches!(err, LLMError::Validation { .. }));
    }

    #[test]
    fn invalid_name_is_rejected() {
        assert!(OutputSchema::new("has space", json!({"type": "object"})).is_err());
    }

    #[test]
    fn derived_schema_validates_values() {
        let schema = OutputSchema::of::<Person>().expect("derived schema");
        assert_eq!(schema.name(), "Person");
        assert!(
            schema
                .validate(&json!({"name": "Ada", "nickname": null, "address": {"city": "London"}}))
                .is_ok()
        );
        let errors = schema
            .validate(&json!({"name": "Ada", "address": {"city": 3}}))
            .unwrap_err();
        assert!(errors.iter().any(|e| e.starts_with("/address/city")), "{errors:?}");
    }

    #[test]
    fn portable_schema_inlines_definitions() {
        let schema = OutputSchema::of::<Person>().expect("derived schema");
        let portable = schema.portable();
        assert!(portable.get("$schema").is_none());
        assert!(portable.get("definitions").is_none());
        assert_eq!(
            portable["properties"]["address"]["properties"]["city"]["type"],
            json!("string")
        );
        assert!(!portable.to_string().contains("$ref"));
    }

    #[test]
    fn openapi_subset_converts_nullable_and_drops_unknown_keywords() {
        let schema = OutputSchema::new(
            "item",
            json!({
                "type": "object",
                "additionalProperties": false,
                "properties": {
                    "label": {"type": ["string", "null"], "default": "x"},
                    "count": {"type": "integer", "format": "uint32", "minimum": 0}
                },
                "required": ["count"]
            }),
        )
        .unwrap();
        let converted = schema.openapi_subset();
        assert!(converted.get("additionalProperties").is_none());
        assert_eq!(
            converted["properties"]["label"],
            json!({"type": "string", "nullable": true})
        );
        assert_eq!(
            converted["properties"]["count"],
            json!({"type": "integer", "minimum": 0})
        );
        assert_eq!(converted["required"], json!(["count"]));
    }

    #[test]
    fn strict_schema_closes_every_object() {
        let schema = OutputSchema::new(
            "order",
            json!({
                "type": "object",
                "properties": {
                    "id": {"type": "string"},
                    "lines": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "properties": {"sku": {"type": "string"}},
                            "required": ["sku"]
                        }
                    }
                },
                "required": ["id", "lines"]
            }),
        )
        .unwrap();
        let strict = schema.strict_schema().expect("closable schema");
        assert_eq!(strict["additionalProperties"], json!(false));
        assert_eq!(
            strict["properties"]["lines"]["items"]["additionalProperties"],
            json!(false)
        );
        assert!(schema.document().get("additionalProperties").is_none());
    }

    #[test]
    fn optional_or_open_objects_cannot_be_strict() {
        let derived = OutputSchema::of::<Person>().expect("derived schema");
        assert_eq!(derived.strict_schema(), None);

        let open = OutputSchema::new(
            "bag",
            json!({
                "type": "object",
                "properties": {"name": {"type": "string"}},
                "required": ["name"],
                "additionalProperties": true
            }),
        )
        .unwrap();
        assert_eq!(open.strict_schema(), None);

        let free_form = OutputSchema::new("anything", json!({"type": "object"})).unwrap();
        assert_eq!(free_form.strict_schema(), None);

        let scalar = OutputSchema::new("count", json!({"type": "integer"})).unwrap();
        assert_eq!(scalar.strict_schema(), None);
    }
}
