//! Server-Sent Events decoding shared by every wire family.

use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures_core::Stream;
use futures_util::StreamExt;

use crate::error::LLMError;
use crate::http::HttpBodyStream;

const DONE_SENTINEL: &str = "[DONE]";

/// One decoded SSE event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// Joined `data:` payload of one event.
    Data(String),
    /// The OpenAI-style `[DONE]` sentinel.
    Done,
}

/// Splits a byte stream into SSE events.
///
/// Only `data:` fields matter to the engine; `event:`, `id:`, `retry:` and comment
/// lines are ignored. Multi-line data fields are joined with `\n`. Nothing is emitted
/// after `[DONE]` or an error.
pub struct StreamDecoder {
    body: HttpBodyStream,
    provider: &'static str,
    /// Bytes of the current, not yet terminated line.
    partial: Vec<u8>,
    /// Data of the event being assembled.
    data: Option<String>,
    ready: VecDeque<Result<StreamEvent, LLMError>>,
    closed: bool,
}

impl StreamDecoder {
    pub fn new(body: HttpBodyStream, provider: &'static str) -> Self {
        Self {
            body,
            provider,
            partial: Vec::new(),
            data: None,
            ready: VecDeque::new(),
            closed: false,
        }
    }

    fn feed(&mut self, bytes: &[u8]) {
        let mut buffer = std::mem::take(&mut self.partial);
        buffer.extend_from_slice(bytes);
        let mut consumed = 0;
        while let Some(offset) = buffer[consumed..].iter().position(|b| *b == b'\n') {
            let line = &buffer[consumed..consumed + offset];
            self.on_line(line.strip_suffix(b"\r").unwrap_or(line));
            consumed += offset + 1;
        }
        buffer.drain(..consumed);
        self.partial = buffer;
    }

    fn on_line(&mut self, line: &[u8]) {
        if self.closed {
            return;
        }
        if line.is_empty() {
            self.dispatch();
            return;
        }
        let Some(value) = line.strip_prefix(b"data:") else {
            return;
        };
        let value = value.strip_prefix(b" ").unwrap_or(value);
        match std::str::from_utf8(value) {
            Ok(text) => match &mut self.data {
                Some(data) => {
                    data.push('\n');
                    data.push_str(text);
                }
                None => self.data = Some(text.to_owned()),
            },
            Err(err) => self.fail(LLMError::Provider {
                provider: self.provider,
                message: format!("invalid UTF-8 in stream chunk: {err}"),
            }),
        }
    }

    /// Emits the assembled event, if any.
    fn dispatch(&mut self) {
        let Some(data) = self.data.take().filter(|data| !data.is_empty()) else {
            return;
        };
        if data.trim() == DONE_SENTINEL {
            self.ready.push_back(Ok(StreamEvent::Done));
            self.closed = true;
        } else {
            self.ready.push_back(Ok(StreamEvent::Data(data)));
        }
    }

    fn fail(&mut self, err: LLMError) {
        self.data = None;
        self.ready.push_back(Err(err));
        self.closed = true;
    }

    /// Handles a body that ended without a trailing blank line.
    fn finish(&mut self) {
        let rest = std::mem::take(&mut self.partial);
        if !rest.is_empty() {
            self.on_line(rest.strip_suffix(b"\r").unwrap_or(&rest));
        }
        if !self.closed {
            self.dispatch();
        }
        self.closed = true;
    }
}

impl Stream for StreamDecoder {
    type Item = Result<StreamEvent, LLMError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        loop {
            if let Some(event) = this.ready.pop_front() {
                return Poll::Ready(Some(event));
            }
            if this.closed {
                return Poll::Ready(None);
            }
            match this.body.as_mut().poll_next(cx) {
                Poll::Ready(Some(Ok(bytes))) => this.feed(&bytes),
                Poll::Ready(Some(Err(err))) => this.fail(err),
                Poll::Ready(None) => this.finish(),
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

/// Drains a streaming body into a string, used for error payloads.
pub(crate) async fn collect_body_text(
    mut body: HttpBodyStream,
    provider: &'static str,
) -> Result<String, LLMError> {
    let mut bytes = Vec::new();
    while let Some(chunk) = body.next().await {
        bytes.extend_from_slice(&chunk?);
    }
    String::from_utf8(bytes).map_err(|err| LLMError::Provider {
        provider,
        message: format!("failed to decode stream error body: {err}"),
    })
}
