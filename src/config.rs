use serde::{Deserialize, Serialize};

use crate::capability::Provider;
use crate::error::LLMError;
use crate::types::ThinkingLevel;

/// Serializable description of one [`crate::client::Client`].
///
/// # Examples
///
/// ```
/// use parley_llm::config::{ClientConfig, Credential};
/// use parley_llm::Provider;
///
/// let config: ClientConfig = serde_json::from_str(
///     r#"{
///         "provider": "anthropic",
///         "model": "claude-sonnet-4-0",
///         "credential": {"type": "env", "var": "ANTHROPIC_API_KEY"},
///         "thinking": "low"
///     }"#,
/// )
/// .unwrap();
/// assert_eq!(config.provider, Provider::Claude);
/// assert!(matches!(config.credential, Credential::Env { .. }));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    pub provider: Provider,
    pub model: String,
    pub credential: Credential,
    #[serde(default)]
    pub base_url: Option<String>,
    /// Default system directive for every call.
    #[serde(default)]
    pub instructions: Option<String>,
    #[serde(default)]
    pub thinking: Option<ThinkingLevel>,
    #[serde(default)]
    pub allow_unlisted_model: bool,
}

impl ClientConfig {
    pub fn new(provider: Provider, model: impl Into<String>, credential: Credential) -> Self {
        Self {
            provider,
            model: model.into(),
            credential,
            base_url: None,
            instructions: None,
            thinking: None,
            allow_unlisted_model: false,
        }
    }

    /// Reads the provider's conventional API key variable and optional base URL override.
    ///
    /// The key itself is not copied into the config; it is read again when the client is
    /// built.
    ///
    /// # Errors
    ///
    /// Returns [`LLMError::InvalidConfig`] when the API key variable is unset or empty.
    pub fn from_env(provider: Provider, model: impl Into<String>) -> Result<Self, LLMError> {
        let credential = Credential::Env {
            var: api_key_env_var(provider).to_string(),
        };
        credential.resolve()?;

        let mut config = Self::new(provider, model, credential);
        config.base_url = std::env::var(base_url_env_var(provider))
            .ok()
            .filter(|url| !url.trim().is_empty());
        Ok(config)
    }
}

/// Where the API key comes from.
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Credential {
    ApiKey { key: String },
    /// Name of an environment variable holding the key.
    Env { var: String },
}

impl Credential {
    /// Returns the API key.
    ///
    /// # Errors
    ///
    /// Returns [`LLMError::InvalidConfig`] for an empty key or an unset variable.
    pub fn resolve(&self) -> Result<String, LLMError> {
        let key = match self {
            Credential::ApiKey { key } => key.clone(),
            Credential::Env { var } => std::env::var(var).map_err(|_| {
                LLMError::invalid_config("api_key", format!("environment variable `{var}` is not set"))
            })?,
        };
        if key.trim().is_empty() {
            return Err(LLMError::invalid_config("api_key", "API key is empty"));
        }
        Ok(key)
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Credential::ApiKey { .. } => f
                .debug_struct("ApiKey")
                .field("key", &"<redacted>")
                .finish(),
            Credential::Env { var } => f.debug_struct("Env").field("var", var).finish(),
        }
    }
}

/// Conventional API key variable of `provider`.
pub fn api_key_env_var(provider: Provider) -> &'static str {
    match provider {
        Provider::OpenAi => "OPENAI_API_KEY",
        Provider::Claude => "ANTHROPIC_API_KEY",
        Provider::Gemini => "GEMINI_API_KEY",
        Provider::Groq => "GROQ_API_KEY",
        Provider::Mistral => "MISTRAL_API_KEY",
    }
}

/// Base URL override variable of `provider`, e.g. `OPENAI_BASE_URL`.
pub fn base_url_env_var(provider: Provider) -> &'static str {
    match provider {
        Provider::OpenAi => "OPENAI_BASE_URL",
        Provider::Claude => "ANTHROPIC_BASE_URL",
        Provider::Gemini => "GEMINI_BASE_URL",
        Provider::Groq => "GROQ_BASE_URL",
        Provider::Mistral => "MISTRAL_BASE_URL",
    }
}
