use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::Client;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};

use crate::error::LLMError;

use super::{
    DynHttpTransport, HttpBodyStream, HttpRequest, HttpResponse, HttpStreamResponse,
    HttpTransport,
};

/// Default [`HttpTransport`] backed by `reqwest` with rustls.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Wraps a preconfigured `reqwest::Client` (proxies, timeouts, pools).
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Builds a transport with reqwest's default settings.
    pub fn default_client() -> Result<Self, LLMError> {
        Client::builder()
            .build()
            .map(Self::new)
            .map_err(|err| LLMError::transport(format!("failed to create reqwest client: {err}")))
    }

    /// Converts an engine request into a reqwest `POST`.
    fn build_request(&self, request: HttpRequest) -> Result<reqwest::RequestBuilder, LLMError> {
        let headers = request
            .headers
            .into_iter()
            .map(|(name, value)| {
                let name = HeaderName::from_bytes(name.as_bytes())
                    .map_err(|err| LLMError::transport(format!("invalid header name: {err}")))?;
                let value = HeaderValue::from_str(&value).map_err(|err| {
                    LLMError::transport(format!("invalid header value for {name}: {err}"))
                })?;
                Ok((name, value))
            })
            .collect::<Result<HeaderMap, LLMError>>()?;
        Ok(self.client.post(request.url).headers(headers).body(request.body))
    }

    /// Sends `request` and splits off the status line and headers.
    async fn dispatch(
        &self,
        request: HttpRequest,
    ) -> Result<(u16, HashMap<String, String>, reqwest::Response), LLMError> {
        let response = self
            .build_request(request)?
            .send()
            .await
            .map_err(transport_error)?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| Some((name.to_string(), value.to_str().ok()?.to_string())))
            .collect();
        Ok((status, headers, response))
    }
}

/// Maps a reqwest failure to [`LLMError::Transport`], naming timeouts and connect errors.
fn transport_error(err: reqwest::Error) -> LLMError {
    if err.is_timeout() {
        LLMError::transport(format!("request timed out: {err}"))
    } else if err.is_connect() {
        LLMError::transport(format!("connection failed: {err}"))
    } else {
        LLMError::transport(err.to_string())
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, LLMError> {
        let (status, headers, response) = self.dispatch(request).await?;
        let body = response.bytes().await.map_err(transport_error)?.to_vec();
        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }

    async fn send_stream(&self, request: HttpRequest) -> Result<HttpStreamResponse, LLMError> {
        let (status, headers, response) = self.dispatch(request).await?;
        let body: HttpBodyStream = response
            .bytes_stream()
            .map(|chunk| chunk.map(|bytes| bytes.to_vec()).map_err(transport_error))
            .boxed();
        Ok(HttpStreamResponse {
            status,
            headers,
            body,
        })
    }
}

/// Shared reqwest-backed transport used when the caller supplies none.
pub fn default_transport() -> Result<DynHttpTransport, LLMError> {
    Ok(Arc::new(ReqwestTransport::default_client()?))
}
