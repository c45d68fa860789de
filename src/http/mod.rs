//! Thin HTTP seam between the engine and the network.
//!
//! Every provider call is a JSON `POST`; the engine builds an [`HttpRequest`] and hands
//! it to an [`HttpTransport`]. Retries, timeouts and connection policy belong to the
//! transport implementation, not to the engine.

use std::collections::HashMap;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use futures_core::Stream;
use serde::Serialize;

use crate::error::LLMError;

pub mod reqwest;

pub use self::reqwest::{ReqwestTransport, default_transport};

/// JSON `POST` request produced by a wire adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub url: String,
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

impl HttpRequest {
    /// Serializes `body` and sets the JSON content type.
    ///
    /// # Examples
    ///
    /// ```
    /// use parley_llm::http::HttpRequest;
    /// use serde_json::json;
    ///
    /// let request = HttpRequest::post_json("https://example.com", &json!({"ping": true})).unwrap();
    /// assert_eq!(request.headers.get("Content-Type").map(String::as_str), Some("application/json"));
    /// assert_eq!(request.body, br#"{"ping":true}"#.to_vec());
    /// ```
    ///
    /// # Errors
    ///
    /// Returns [`LLMError::Validation`] when the body cannot be serialized.
    pub fn post_json<T: Serialize + ?Sized>(
        url: impl Into<String>,
        body: &T,
    ) -> Result<Self, LLMError> {
        let body = serde_json::to_vec(body).map_err(|err| LLMError::Validation {
            message: format!("failed to serialize request: {err}"),
        })?;
        Ok(Self {
            url: url.into(),
            headers: HashMap::from([("Content-Type".to_string(), "application/json".to_string())]),
            body,
        })
    }

    /// Adds one header, replacing an existing value under the same name.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Parses the body back into JSON; handy for inspecting requests in tests.
    pub fn json_body(&self) -> Result<serde_json::Value, LLMError> {
        serde_json::from_slice(&self.body).map_err(|err| LLMError::Validation {
            message: format!("request body is not JSON: {err}"),
        })
    }
}

/// Fully buffered response.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Converts the body into a UTF-8 string.
    ///
    /// # Errors
    ///
    /// Returns [`LLMError::Transport`] when the body is not valid UTF-8.
    pub fn into_string(self) -> Result<String, LLMError> {
        String::from_utf8(self.body).map_err(|err| LLMError::transport(err.to_string()))
    }
}

/// Response whose body arrives incrementally.
pub struct HttpStreamResponse {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: HttpBodyStream,
}

impl HttpStreamResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Body stream returned by [`HttpTransport::send_stream`].
pub type HttpBodyStream = Pin<Box<dyn Stream<Item = Result<Vec<u8>, LLMError>> + Send>>;

/// Transport abstraction so the engine never depends on a concrete HTTP client.
///
/// # Examples
///
/// ```
/// # use async_trait::async_trait;
/// # use futures_util::stream;
/// # use parley_llm::error::LLMError;
/// # use parley_llm::http::{HttpRequest, HttpResponse, HttpStreamResponse, HttpTransport};
/// struct MemoryTransport;
///
/// #[async_trait]
/// impl HttpTransport for MemoryTransport {
///     async fn send(&self, request: HttpRequest) -> Result<HttpResponse, LLMError> {
///         Ok(HttpResponse { status: 200, headers: request.headers, body: b"ok".to_vec() })
///     }
///     async fn send_stream(&self, request: HttpRequest) -> Result<HttpStreamResponse, LLMError> {
///         Ok(HttpStreamResponse { status: 200, headers: request.headers, body: Box::pin(stream::empty()) })
///     }
/// }
///
/// # tokio::runtime::Runtime::new().unwrap().block_on(async {
/// let request = HttpRequest::post_json("https://example.com", &serde_json::json!({})).unwrap();
/// let response = MemoryTransport.send(request).await.unwrap();
/// assert_eq!(response.status, 200);
/// # });
/// ```
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Sends a request and resolves once the whole body is available.
    ///
    /// # Errors
    ///
    /// Implementations map network failures to [`LLMError::Transport`]. Non-2xx statuses
    /// are not errors at this level.
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, LLMError>;

    /// Sends a request and returns as soon as the response headers arrive.
    ///
    /// # Errors
    ///
    /// Same contract as [`HttpTransport::send`].
    async fn send_stream(&self, request: HttpRequest) -> Result<HttpStreamResponse, LLMError>;
}

/// Shared handle to a transport implementation.
pub type DynHttpTransport = Arc<dyn HttpTransport>;
