//! OpenAI Chat Completions wire, shared by OpenAI, Groq and Mistral.

use std::time::Duration;

use crate::capability::Provider;
use crate::error::LLMError;
use crate::http::HttpRequest;
use crate::response::{Completion, StreamDelta};

use super::{Endpoint, PreparedCall};

pub(crate) mod error;
pub(crate) mod request;
pub(crate) mod response;
mod types;

const CHAT_COMPLETIONS_PATH: &str = "/v1/chat/completions";

#[derive(Debug, Clone)]
pub(crate) struct OpenAiChatWire {
    endpoint: Endpoint,
}

impl OpenAiChatWire {
    pub(crate) fn new(endpoint: Endpoint) -> Self {
        Self { endpoint }
    }

    fn provider(&self) -> &'static str {
        self.endpoint.provider.as_str()
    }

    /// Field carrying the output token limit; Mistral kept the legacy name.
    fn max_tokens_field(&self) -> &'static str {
        match self.endpoint.provider {
            Provider::Mistral => "max_tokens",
            _ => "max_completion_tokens",
        }
    }

    pub(crate) fn build_http_request(
        &self,
        call: &PreparedCall,
        stream: bool,
    ) -> Result<HttpRequest, LLMError> {
        let body = request::build_body(&self.endpoint.model, self.max_tokens_field(), call, stream);
        Ok(
            HttpRequest::post_json(self.endpoint.url(CHAT_COMPLETIONS_PATH), &body)?
                .with_header("Authorization", format!("Bearer {}", self.endpoint.api_key))
                .with_header(
                    "Accept",
                    if stream {
                        "text/event-stream"
                    } else {
                        "application/json"
                    },
                ),
        )
    }

    pub(crate) fn parse_completion(&self, body: &str) -> Result<Completion, LLMError> {
        response::parse_completion(body, self.provider())
    }

    pub(crate) fn parse_stream_event(&self, data: &str) -> Result<StreamDelta, LLMError> {
        response::parse_stream_event(data, self.provider())
    }

    pub(crate) fn parse_error(
        &self,
        status: u16,
        body: &str,
        retry_after: Option<Duration>,
    ) -> LLMError {
        error::parse_openai_error(self.provider(), status, body, retry_after)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::test_support::{endpoint, prepared};
    use crate::types::RequestOptions;

    #[test]
    fn http_request_targets_chat_completions_with_bearer_auth() {
        let wire = OpenAiChatWire::new(endpoint(Provider::Groq, "llama-3.3-70b-versatile"));
        let call = prepared(
            Provider::Groq,
            "llama-3.3-70b-versatile",
            &RequestOptions::default(),
            None,
        );
        let request = wire.build_http_request(&call, true).unwrap();
        assert_eq!(request.url, "https://api.groq.com/openai/v1/chat/completions");
        assert_eq!(
            request.headers.get("Authorization").map(String::as_str),
            Some("Bearer test-key")
        );
        assert_eq!(
            request.headers.get("Accept").map(String::as_str),
            Some("text/event-stream")
        );
        assert_eq!(request.json_body().unwrap()["stream"], true);
    }

    #[test]
    fn mistral_uses_max_tokens() {
        let options = RequestOptions {
            max_tokens: Some(64),
            ..RequestOptions::default()
        };
        let mistral = OpenAiChatWire::new(endpoint(Provider::Mistral, "mistral-small-latest"));
        let call = prepared(Provider::Mistral, "mistral-small-latest", &options, None);
        let body = mistral.build_http_request(&call, false).unwrap().json_body().unwrap();
        assert_eq!(body["max_tokens"], 64);
        assert!(body.get("max_completion_tokens").is_none());

        let openai = OpenAiChatWire::new(endpoint(Provider::OpenAi, "gpt-4o"));
        let call = prepared(Provider::OpenAi, "gpt-4o", &options, None);
        let body = openai.build_http_request(&call, false).unwrap().json_body().unwrap();
        assert_eq!(body["max_completion_tokens"], 64);
    }
}
