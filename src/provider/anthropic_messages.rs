//! Anthropic Messages wire (Claude).

use crate::error::LLMError;
use crate::http::HttpRequest;
use crate::response::{Completion, StreamDelta};

use super::{Endpoint, PreparedCall};

pub(crate) mod error;
pub(crate) mod request;
pub(crate) mod response;
mod types;

const MESSAGES_PATH: &str = "/v1/messages";
const API_VERSION: &str = "2023-06-01";

#[derive(Debug, Clone)]
pub(crate) struct AnthropicMessagesWire {
    endpoint: Endpoint,
}

impl AnthropicMessagesWire {
    pub(crate) fn new(endpoint: Endpoint) -> Self {
        Self { endpoint }
    }

    pub(crate) fn build_http_request(
        &self,
        call: &PreparedCall,
        stream: bool,
    ) -> Result<HttpRequest, LLMError> {
        let body = request::build_body(&self.endpoint.model, call, stream);
        Ok(
            HttpRequest::post_json(self.endpoint.url(MESSAGES_PATH), &body)?
                .with_header("x-api-key", self.endpoint.api_key.clone())
                .with_header("anthropic-version", API_VERSION)
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
        response::parse_completion(body)
    }

    pub(crate) fn parse_stream_event(&self, data: &str) -> Result<StreamDelta, LLMError> {
        response::parse_stream_event(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::Provider;
    use crate::provider::test_support::{endpoint, prepared};
    use crate::types::RequestOptions;

    #[test]
    fn http_request_carries_version_and_key_headers() {
        let wire = AnthropicMessagesWire::new(endpoint(Provider::Claude, "claude-sonnet-4-0"));
        let call = prepared(
            Provider::Claude,
            "claude-sonnet-4-0",
            &RequestOptions::default(),
            None,
        );
        let request = wire.build_http_request(&call, false).unwrap();
        assert_eq!(request.url, "https://api.anthropic.com/v1/messages");
        assert_eq!(
            request.headers.get("x-api-key").map(String::as_str),
            Some("test-key")
        );
        assert_eq!(
            request.headers.get("anthropic-version").map(String::as_str),
            Some(API_VERSION)
        );
        assert!(!request.headers.contains_key("Authorization"));
    }
}
