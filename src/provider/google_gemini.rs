//! Google Gemini `generateContent` wire.

use crate::error::LLMError;
use crate::http::HttpRequest;
use crate::response::{Completion, StreamDelta};

use super::{Endpoint, PreparedCall};

pub(crate) mod error;
pub(crate) mod request;
pub(crate) mod response;
mod types;

#[derive(Debug, Clone)]
pub(crate) struct GoogleGeminiWire {
    endpoint: Endpoint,
}

impl GoogleGeminiWire {
    pub(crate) fn new(endpoint: Endpoint) -> Self {
        Self { endpoint }
    }

    /// The model travels in the path; `models/` prefixes are tolerated.
    fn url(&self, stream: bool) -> String {
        let model = self.endpoint.model.trim();
        let model = model.strip_prefix("models/").unwrap_or(model);
        let method = if stream {
            "streamGenerateContent?alt=sse"
        } else {
            "generateContent"
        };
        let base = self.endpoint.base_url.trim_end_matches('/');
        let base = base.strip_suffix("/v1beta").unwrap_or(base);
        format!("{base}/v1beta/models/{model}:{method}")
    }

    pub(crate) fn build_http_request(
        &self,
        call: &PreparedCall,
        stream: bool,
    ) -> Result<HttpRequest, LLMError> {
        let body = request::build_body(call);
        Ok(HttpRequest::post_json(self.url(stream), &body)?
            .with_header("x-goog-api-key", self.endpoint.api_key.clone()))
    }

    pub(crate) fn parse_completion(&self, body: &str) -> Result<Completion, LLMError> {
        response::parse_completion(body)
    }

    pub(crate) fn parse_stream_event(&self, data: &str) -> Result<StreamDelta, LLMError> {
        response::parse_stream_event(data)
    }
}
