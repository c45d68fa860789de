//! Wire adapters: the only place that knows provider field names, endpoints and headers.
//!
//! The provider is matched once, when the client is built, to pick a [`WireAdapter`];
//! after that every call goes through the same four operations regardless of provider.

use std::collections::HashMap;

use crate::capability::{Provider, WireFamily};
use crate::error::LLMError;
use crate::http::HttpRequest;
use crate::normalize::NormalizedMessages;
use crate::params::SamplingParams;
use crate::response::{Completion, StreamDelta};
use crate::structured::StructuredDirective;

pub(crate) mod anthropic_messages;
pub(crate) mod google_gemini;
pub(crate) mod openai_chat;
mod retry;

use anthropic_messages::AnthropicMessagesWire;
use google_gemini::GoogleGeminiWire;
use openai_chat::OpenAiChatWire;

/// Provider-neutral description of one call, ready to be rendered by a wire adapter.
#[derive(Debug, Clone)]
pub(crate) struct PreparedCall {
    pub(crate) messages: NormalizedMessages,
    pub(crate) params: SamplingParams,
    pub(crate) structured: Option<StructuredDirective>,
    /// Where the provider should put reasoning text, when it must be told.
    pub(crate) reasoning_format: Option<&'static str>,
}

/// Connection facts shared by every wire family.
#[derive(Debug, Clone)]
pub(crate) struct Endpoint {
    pub(crate) provider: Provider,
    pub(crate) model: String,
    pub(crate) api_key: String,
    pub(crate) base_url: String,
}

impl Endpoint {
    /// Joins `path` to the base URL, tolerating bases that already end in `/v1`.
    pub(crate) fn url(&self, versioned_path: &str) -> String {
        let base = self.base_url.trim_end_matches('/');
        match versioned_path.strip_prefix("/v1") {
            Some(rest) if base.ends_with("/v1") => format!("{base}{rest}"),
            _ => format!("{base}{versioned_path}"),
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) enum WireAdapter {
    OpenAiChat(OpenAiChatWire),
    AnthropicMessages(AnthropicMessagesWire),
    GoogleGemini(GoogleGeminiWire),
}

impl WireAdapter {
    pub(crate) fn new(
        provider: Provider,
        model: impl Into<String>,
        api_key: impl Into<String>,
        base_url: Option<String>,
    ) -> Self {
        let endpoint = Endpoint {
            provider,
            model: model.into(),
            api_key: api_key.into(),
            base_url: base_url.unwrap_or_else(|| default_base_url(provider).to_string()),
        };
        match provider.wire() {
            WireFamily::OpenAiChat => WireAdapter::OpenAiChat(OpenAiChatWire::new(endpoint)),
            WireFamily::AnthropicMessages => {
                WireAdapter::AnthropicMessages(AnthropicMessagesWire::new(endpoint))
            }
            WireFamily::GoogleGemini => WireAdapter::GoogleGemini(GoogleGeminiWire::new(endpoint)),
        }
    }

    /// Renders `call` into the provider's HTTP request.
    pub(crate) fn build_http_request(
        &self,
        call: &PreparedCall,
        stream: bool,
    ) -> Result<HttpRequest, LLMError> {
        match self {
            WireAdapter::OpenAiChat(wire) => wire.build_http_request(call, stream),
            WireAdapter::AnthropicMessages(wire) => wire.build_http_request(call, stream),
            WireAdapter::GoogleGemini(wire) => wire.build_http_request(call, stream),
        }
    }

    /// Reads the first candidate of a successful non-streaming answer.
    pub(crate) fn parse_completion(&self, body: &str) -> Result<Completion, LLMError> {
        match self {
            WireAdapter::OpenAiChat(wire) => wire.parse_completion(body),
            WireAdapter::AnthropicMessages(wire) => wire.parse_completion(body),
            WireAdapter::GoogleGemini(wire) => wire.parse_completion(body),
        }
    }

    /// Interprets the data payload of one SSE event.
    pub(crate) fn parse_stream_event(&self, data: &str) -> Result<StreamDelta, LLMError> {
        match self {
            WireAdapter::OpenAiChat(wire) => wire.parse_stream_event(data),
            WireAdapter::AnthropicMessages(wire) => wire.parse_stream_event(data),
            WireAdapter::GoogleGemini(wire) => wire.parse_stream_event(data),
        }
    }

    /// Maps a non-2xx response onto [`LLMError`].
    pub(crate) fn parse_error(
        &self,
        status: u16,
        body: &str,
        headers: &HashMap<String, String>,
    ) -> LLMError {
        let retry_after = retry::retry_after_from_headers(headers);
        match self {
            WireAdapter::OpenAiChat(wire) => wire.parse_error(status, body, retry_after),
            WireAdapter::AnthropicMessages(_) => {
                anthropic_messages::error::parse_anthropic_error(status, body, retry_after)
            }
            WireAdapter::GoogleGemini(_) => {
                google_gemini::error::parse_gemini_error(status, body, retry_after)
            }
        }
    }
}

/// Base URL used when the caller does not override it.
pub fn default_base_url(provider: Provider) -> &'static str {
    match provider {
        Provider::OpenAi => "https://api.openai.com",
        Provider::Claude => "https://api.anthropic.com",
        Provider::Gemini => "https://generativelanguage.googleapis.com",
        Provider::Groq => "https://api.groq.com/openai/v1",
        Provider::Mistral => "https://api.mistral.ai/v1",
    }
}

/// Concatenates text parts, returning `None` when there were none.
pub(crate) fn join_text<'a>(parts: impl IntoIterator<Item = &'a str>) -> Option<String> {
    let mut joined: Option<String> = None;
    for part in parts {
        joined.get_or_insert_with(String::new).push_str(part);
    }
    joined
}
