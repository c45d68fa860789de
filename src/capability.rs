//! Static per-provider and per-model capability facts.
//!
//! Everything that differs between providers and models lives in the tables below as
//! plain data. The normalizer, the parameter translator and the structured output
//! strategy read a [`CapabilityRecord`] and never branch on the provider themselves.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::LLMError;
use crate::structured::StructuredStrategy;
use crate::types::{Role, ThinkingLevel};

/// Supported providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    #[serde(alias = "open_ai")]
    OpenAi,
    #[serde(alias = "anthropic")]
    Claude,
    #[serde(alias = "google")]
    Gemini,
    Groq,
    Mistral,
}

impl Provider {
    pub const ALL: [Provider; 5] = [
        Provider::OpenAi,
        Provider::Claude,
        Provider::Gemini,
        Provider::Groq,
        Provider::Mistral,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::OpenAi => "openai",
            Provider::Claude => "claude",
            Provider::Gemini => "gemini",
            Provider::Groq => "groq",
            Provider::Mistral => "mistral",
        }
    }

    /// Wire protocol family spoken by the provider.
    pub fn wire(&self) -> WireFamily {
        match self {
            Provider::OpenAi | Provider::Groq | Provider::Mistral => WireFamily::OpenAiChat,
            Provider::Claude => WireFamily::AnthropicMessages,
            Provider::Gemini => WireFamily::GoogleGemini,
        }
    }

    /// Restrictive record used for models missing from the table.
    fn baseline(&self) -> CapabilityRecord {
        match self {
            Provider::OpenAi => OPENAI_BASELINE,
            Provider::Claude => CLAUDE_BASELINE,
            Provider::Gemini => GEMINI_BASELINE,
            Provider::Groq => GROQ_BASELINE,
            Provider::Mistral => MISTRAL_BASELINE,
        }
    }

    fn models(&self) -> &'static [(&'static str, CapabilityRecord)] {
        match self {
            Provider::OpenAi => OPENAI_MODELS,
            Provider::Claude => CLAUDE_MODELS,
            Provider::Gemini => GEMINI_MODELS,
            Provider::Groq => GROQ_MODELS,
            Provider::Mistral => MISTRAL_MODELS,
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = LLMError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "openai" | "open_ai" => Ok(Provider::OpenAi),
            "claude" | "anthropic" => Ok(Provider::Claude),
            "gemini" | "google" => Ok(Provider::Gemini),
            "groq" => Ok(Provider::Groq),
            "mistral" => Ok(Provider::Mistral),
            other => Err(LLMError::invalid_config(
                "provider",
                format!("unknown provider `{other}`"),
            )),
        }
    }
}

/// Wire protocol families; several providers share the OpenAI chat shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WireFamily {
    OpenAiChat,
    AnthropicMessages,
    GoogleGemini,
}

/// Where the effective system directive travels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SystemChannel {
    /// A leading `system` entry in the message list.
    Message,
    /// A dedicated request field outside the message list.
    SideChannel,
}

/// Provider-specific rendering of a thinking level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ThinkingToken {
    /// Named effort, e.g. `reasoning_effort: "high"`.
    Effort(&'static str),
    /// Token budget, e.g. `thinking.budget_tokens`.
    Budget(u32),
}

impl ThinkingToken {
    /// Returns `false` for tokens that switch reasoning off.
    pub fn is_active(&self) -> bool {
        !matches!(self, ThinkingToken::Budget(0) | ThinkingToken::Effort("none"))
    }

    pub fn budget(&self) -> Option<u32> {
        match self {
            ThinkingToken::Budget(budget) => Some(*budget),
            ThinkingToken::Effort(_) => None,
        }
    }
}

/// Mapping from [`ThinkingLevel`] to a provider token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ThinkingVocabulary {
    /// Token that explicitly disables thinking; `None` means "omit the field".
    pub off: Option<ThinkingToken>,
    pub low: ThinkingToken,
    pub medium: ThinkingToken,
    pub high: ThinkingToken,
}

impl ThinkingVocabulary {
    pub fn token(&self, level: ThinkingLevel) -> Option<ThinkingToken> {
        match level {
            ThinkingLevel::Off => self.off,
            ThinkingLevel::Low => Some(self.low),
            ThinkingLevel::Medium => Some(self.medium),
            ThinkingLevel::High => Some(self.high),
        }
    }
}

/// Immutable description of what a provider/model accepts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CapabilityRecord {
    /// Provider enforces a JSON schema during generation.
    pub native_json_schema: bool,
    /// Provider offers a schema-less "JSON object" response mode.
    pub json_object_mode: bool,
    /// Provider can be forced to call one specific tool.
    pub forced_tool_call: bool,
    /// Thinking vocabulary; `None` when the model has no reasoning control.
    pub thinking: Option<ThinkingVocabulary>,
    /// Model cannot run with thinking disabled.
    pub thinking_required: bool,
    /// Model only accepts default sampling and rejects explicit values.
    pub temperature_locked: bool,
    pub top_p_exclusive_with_temperature: bool,
    /// `top_p` the provider insists on for zero-temperature requests.
    pub greedy_top_p: Option<f64>,
    pub accepts_top_k: bool,
    pub accepts_penalties: bool,
    pub accepts_user: bool,
    /// Sampling knobs are rejected while extended thinking is active.
    pub sampling_locked_while_thinking: bool,
    /// Output token limit the provider requires when the caller gives none.
    pub default_max_tokens: Option<u32>,
    /// Smallest thinking budget the provider takes; the budget must also stay below
    /// `max_tokens`.
    pub min_thinking_budget: Option<u32>,
    /// Native schema mode is only enforced with `strict: true`, which needs closed,
    /// fully required objects.
    pub strict_native_schema: bool,
    /// `reasoning_format` to send on structured calls; raw reasoning is rejected beside
    /// JSON mode and tools.
    pub structured_reasoning_format: Option<&'static str>,
    pub system_channel: SystemChannel,
    /// Roles accepted natively in the message list.
    pub role_support: &'static [Role],
    /// Start/end markers of visible reasoning emitted inside the answer text.
    pub reasoning_markup: Option<(&'static str, &'static str)>,
}

impl CapabilityRecord {
    pub fn supports_thinking(&self) -> bool {
        self.thinking.is_some()
    }

    pub fn supports_role(&self, role: Role) -> bool {
        self.role_support.contains(&role)
    }

    /// Structured output technique for this record.
    pub fn structured_strategy(&self) -> StructuredStrategy {
        if self.native_json_schema {
            StructuredStrategy::NativeSchema
        } else if self.forced_tool_call {
            StructuredStrategy::ForcedToolCall
        } else {
            StructuredStrategy::PromptInjection
        }
    }
}

/// Resolves the capability record of `model` on `provider`.
///
/// Exact ids and dated/suffixed variants of a known family (`gpt-4o-2024-08-06`,
/// `claude-3-5-sonnet-latest`) resolve to that family; anything else gets the
/// provider's restrictive record.
///
/// # Examples
///
/// ```
/// use parley_llm::capability::{capabilities, Provider};
///
/// let record = capabilities(Provider::OpenAi, "o3-mini");
/// assert!(record.temperature_locked);
///
/// let unknown = capabilities(Provider::OpenAi, "some-future-model");
/// assert!(!unknown.native_json_schema);
/// assert!(unknown.thinking.is_none());
/// ```
pub fn capabilities(provider: Provider, model: &str) -> CapabilityRecord {
    find_entry(provider, model)
        .map(|(_, record)| record)
        .unwrap_or_else(|| provider.baseline())
}

/// Returns `true` when `model` belongs to a family listed for `provider`.
pub fn is_known_model(provider: Provider, model: &str) -> bool {
    find_entry(provider, model).is_some()
}

/// Model families listed for `provider`.
pub fn known_models(provider: Provider) -> Vec<&'static str> {
    provider.models().iter().map(|(id, _)| *id).collect()
}

fn find_entry(provider: Provider, model: &str) -> Option<(&'static str, CapabilityRecord)> {
    let model = model.trim();
    let model = model.strip_prefix("models/").unwrap_or(model);
    provider
        .models()
        .iter()
        .filter(|(id, _)| {
            model == *id
                || model
                    .strip_prefix(*id)
                    .is_some_and(|rest| rest.starts_with('-'))
        })
        .max_by_key(|(id, _)| id.len())
        .copied()
}

const MESSAGE_ROLES: &[Role] = &[Role::System, Role::User, Role::Assistant];
const CONVERSATION_ROLES: &[Role] = &[Role::User, Role::Assistant];
const THINK_TAGS: (&str, &str) = ("<think>", "</think>");

const EFFORT_LOW_MEDIUM_HIGH: ThinkingVocabulary = ThinkingVocabulary {
    off: None,
    low: ThinkingToken::Effort("low"),
    medium: ThinkingToken::Effort("medium"),
    high: ThinkingToken::Effort("high"),
};

// OpenAI

const OPENAI_BASELINE: CapabilityRecord = CapabilityRecord {
    native_json_schema: false,
    json_object_mode: true,
    forced_tool_call: true,
    thinking: None,
    thinking_required: false,
    temperature_locked: false,
    top_p_exclusive_with_temperature: false,
    greedy_top_p: None,
    accepts_top_k: false,
    accepts_penalties: true,
    accepts_user: true,
    sampling_locked_while_thinking: false,
    default_max_tokens: None,
    min_thinking_budget: None,
    strict_native_schema: true,
    structured_reasoning_format: None,
    system_channel: SystemChannel::Message,
    role_support: MESSAGE_ROLES,
    reasoning_markup: None,
};

const OPENAI_LEGACY: CapabilityRecord = CapabilityRecord {
    top_p_exclusive_with_temperature: true,
    ..OPENAI_BASELINE
};

const OPENAI_CHAT: CapabilityRecord = CapabilityRecord {
    native_json_schema: true,
    ..OPENAI_LEGACY
};

const OPENAI_REASONING: CapabilityRecord = CapabilityRecord {
    thinking: Some(EFFORT_LOW_MEDIUM_HIGH),
    thinking_required: true,
    temperature_locked: true,
    ..OPENAI_CHAT
};

static OPENAI_MODELS: &[(&str, CapabilityRecord)] = &[
    ("gpt-3.5-turbo", OPENAI_LEGACY),
    ("gpt-4-turbo", OPENAI_LEGACY),
    ("gpt-4o", OPENAI_CHAT),
    ("gpt-4o-mini", OPENAI_CHAT),
    ("gpt-4.1", OPENAI_CHAT),
    ("gpt-4.1-mini", OPENAI_CHAT),
    ("gpt-4.1-nano", OPENAI_CHAT),
    ("o1", OPENAI_REASONING),
    ("o3", OPENAI_REASONING),
    ("o3-mini", OPENAI_REASONING),
    ("o4-mini", OPENAI_REASONING),
    ("gpt-5", OPENAI_REASONING),
    ("gpt-5-mini", OPENAI_REASONING),
    ("gpt-5-nano", OPENAI_REASONING),
];

// Anthropic Claude

const CLAUDE_BASELINE: CapabilityRecord = CapabilityRecord {
    native_json_schema: false,
    json_object_mode: false,
    forced_tool_call: true,
    thinking: None,
    thinking_required: false,
    temperature_locked: false,
    top_p_exclusive_with_temperature: false,
    greedy_top_p: None,
    accepts_top_k: true,
    accepts_penalties: false,
    accepts_user: true,
    sampling_locked_while_thinking: true,
    default_max_tokens: Some(4096),
    min_thinking_budget: Some(1024),
    strict_native_schema: false,
    structured_reasoning_format: None,
    system_channel: SystemChannel::SideChannel,
    role_support: CONVERSATION_ROLES,
    reasoning_markup: None,
};

const CLAUDE: CapabilityRecord = CapabilityRecord {
    top_p_exclusive_with_temperature: true,
    ..CLAUDE_BASELINE
};

const CLAUDE_THINKING: CapabilityRecord = CapabilityRecord {
    thinking: Some(ThinkingVocabulary {
        off: None,
        low: ThinkingToken::Budget(2048),
        medium: ThinkingToken::Budget(8192),
        high: ThinkingToken::Budget(16384),
    }),
    ..CLAUDE
};

static CLAUDE_MODELS: &[(&str, CapabilityRecord)] = &[
    ("claude-3-haiku", CLAUDE),
    ("claude-3-opus", CLAUDE),
    ("claude-3-5-haiku", CLAUDE),
    ("claude-3-5-sonnet", CLAUDE),
    ("claude-3-7-sonnet", CLAUDE_THINKING),
    ("claude-sonnet-4", CLAUDE_THINKING),
    ("claude-opus-4", CLAUDE_THINKING),
    ("claude-opus-4-1", CLAUDE_THINKING),
    ("claude-sonnet-4-5", CLAUDE_THINKING),
    ("claude-haiku-4-5", CLAUDE_THINKING),
];

// Google Gemini

const GEMINI_BASELINE: CapabilityRecord = CapabilityRecord {
    native_json_schema: false,
    json_object_mode: true,
    forced_tool_call: true,
    thinking: None,
    thinking_required: false,
    temperature_locked: false,
    top_p_exclusive_with_temperature: false,
    greedy_top_p: None,
    accepts_top_k: true,
    accepts_penalties: true,
    accepts_user: false,
    sampling_locked_while_thinking: false,
    default_max_tokens: None,
    min_thinking_budget: None,
    strict_native_schema: false,
    structured_reasoning_format: None,
    system_channel: SystemChannel::SideChannel,
    role_support: CONVERSATION_ROLES,
    reasoning_markup: None,
};

const GEMINI: CapabilityRecord = CapabilityRecord {
    native_json_schema: true,
    ..GEMINI_BASELINE
};

const GEMINI_BUDGETS: ThinkingVocabulary = ThinkingVocabulary {
    off: Some(ThinkingToken::Budget(0)),
    low: ThinkingToken::Budget(1024),
    medium: ThinkingToken::Budget(8192),
    high: ThinkingToken::Budget(24576),
};

const GEMINI_THINKING: CapabilityRecord = CapabilityRecord {
    thinking: Some(GEMINI_BUDGETS),
    ..GEMINI
};

const GEMINI_THINKING_ONLY: CapabilityRecord = CapabilityRecord {
    thinking_required: true,
    ..GEMINI_THINKING
};

static GEMINI_MODELS: &[(&str, CapabilityRecord)] = &[
    ("gemini-1.5-flash", GEMINI),
    ("gemini-1.5-pro", GEMINI),
    ("gemini-2.0-flash", GEMINI),
    ("gemini-2.0-flash-lite", GEMINI),
    ("gemini-2.5-flash", GEMINI_THINKING),
    ("gemini-2.5-flash-lite", GEMINI_THINKING),
    ("gemini-2.5-pro", GEMINI_THINKING_ONLY),
];

// Groq

const GROQ_BASELINE: CapabilityRecord = CapabilityRecord {
    native_json_schema: false,
    json_object_mode: true,
    forced_tool_call: false,
    thinking: None,
    thinking_required: false,
    temperature_locked: false,
    top_p_exclusive_with_temperature: false,
    greedy_top_p: None,
    accepts_top_k: false,
    accepts_penalties: false,
    accepts_user: true,
    sampling_locked_while_thinking: false,
    default_max_tokens: None,
    min_thinking_budget: None,
    strict_native_schema: false,
    structured_reasoning_format: None,
    system_channel: SystemChannel::Message,
    role_support: MESSAGE_ROLES,
    reasoning_markup: Some(THINK_TAGS),
};

const GROQ: CapabilityRecord = CapabilityRecord {
    top_p_exclusive_with_temperature: true,
    ..GROQ_BASELINE
};

const GROQ_SCHEMA: CapabilityRecord = CapabilityRecord {
    native_json_schema: true,
    ..GROQ
};

const GROQ_QWEN: CapabilityRecord = CapabilityRecord {
    thinking: Some(ThinkingVocabulary {
        off: Some(ThinkingToken::Effort("none")),
        low: ThinkingToken::Effort("default"),
        medium: ThinkingToken::Effort("default"),
        high: ThinkingToken::Effort("default"),
    }),
    structured_reasoning_format: Some("parsed"),
    ..GROQ
};

const GROQ_GPT_OSS: CapabilityRecord = CapabilityRecord {
    thinking: Some(EFFORT_LOW_MEDIUM_HIGH),
    thinking_required: true,
    strict_native_schema: true,
    ..GROQ_SCHEMA
};

const GROQ_R1: CapabilityRecord = CapabilityRecord {
    structured_reasoning_format: Some("parsed"),
    ..GROQ
};

static GROQ_MODELS: &[(&str, CapabilityRecord)] = &[
    ("llama-3.1-8b-instant", GROQ),
    ("llama-3.3-70b-versatile", GROQ),
    ("gemma2-9b-it", GROQ),
    ("deepseek-r1-distill-llama-70b", GROQ_R1),
    ("meta-llama/llama-4-scout-17b-16e-instruct", GROQ_SCHEMA),
    ("meta-llama/llama-4-maverick-17b-128e-instruct", GROQ_SCHEMA),
    ("moonshotai/kimi-k2-instruct", GROQ_SCHEMA),
    ("openai/gpt-oss-20b", GROQ_GPT_OSS),
    ("openai/gpt-oss-120b", GROQ_GPT_OSS),
    ("qwen/qwen3-32b", GROQ_QWEN),
];

// Mistral

const MISTRAL_BASELINE: CapabilityRecord = CapabilityRecord {
    native_json_schema: false,
    json_object_mode: true,
    forced_tool_call: true,
    thinking: None,
    thinking_required: false,
    temperature_locked: false,
    top_p_exclusive_with_temperature: false,
    greedy_top_p: Some(1.0),
    accepts_top_k: false,
    accepts_penalties: true,
    accepts_user: false,
    sampling_locked_while_thinking: false,
    default_max_tokens: None,
    min_thinking_budget: None,
    strict_native_schema: true,
    structured_reasoning_format: None,
    system_channel: SystemChannel::Message,
    role_support: MESSAGE_ROLES,
    reasoning_markup: None,
};

const MISTRAL: CapabilityRecord = CapabilityRecord {
    native_json_schema: true,
    top_p_exclusive_with_temperature: true,
    ..MISTRAL_BASELINE
};

const MAGISTRAL: CapabilityRecord = CapabilityRecord {
    reasoning_markup: Some(THINK_TAGS),
    ..MISTRAL
};

static MISTRAL_MODELS: &[(&str, CapabilityRecord)] = &[
    ("mistral-large", MISTRAL),
    ("mistral-medium", MISTRAL),
    ("mistral-small", MISTRAL),
    ("ministral-3b", MISTRAL),
    ("ministral-8b", MISTRAL),
    ("open-mistral-nemo", MISTRAL),
    ("codestral", MISTRAL),
    ("pixtral-large", MISTRAL),
    ("magistral-small", MAGISTRAL),
    ("magistral-medium", MAGISTRAL),
];
