//! Uniform results out of provider payloads.
//!
//! Wire adapters reduce every provider answer to a [`Completion`] or, when streaming,
//! to one [`StreamDelta`] per SSE event. The functions here turn those into the three
//! shapes callers see: text, validated JSON and a fragment stream.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures_core::Stream;
use futures_core::stream::{BoxStream, FusedStream};
use serde_json::Value;

use crate::error::{Failure, LLMError};
use crate::stream::{StreamDecoder, StreamEvent};
use crate::structured::OutputSchema;
use crate::structured::extract::extract_structured;

/// Lazy, finite, single-pass sequence of text fragments.
///
/// An `Err` item is always the last one.
pub type TextStream = BoxStream<'static, Result<String, Failure>>;

/// Content of the first candidate of a non-streaming answer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Completion {
    /// Concatenated answer text, reasoning parts excluded.
    pub text: Option<String>,
    /// Arguments of the first tool call, when the model made one.
    pub tool_arguments: Option<Value>,
}

/// Outcome of parsing a single stream event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamDelta {
    Text(String),
    /// Event without answer text (role headers, reasoning, usage, pings).
    Skip,
    /// Provider-specific end of answer.
    End,
}

/// Plain-text view of `completion`; absent text becomes `""`.
///
/// # Examples
///
/// ```
/// use parley_llm::response::{unify_text, Completion};
///
/// assert_eq!(unify_text(Completion::default(), None), "");
///
/// let completion = Completion { text: Some("<think>hm</think>Paris".into()), tool_arguments: None };
/// assert_eq!(unify_text(completion, Some(("<think>", "</think>"))), "Paris");
/// ```
pub fn unify_text(completion: Completion, markup: Option<(&str, &str)>) -> String {
    match completion.text {
        Some(text) if markup.is_some() => strip_reasoning(&text, markup).to_owned(),
        Some(text) => text,
        None => String::new(),
    }
}

/// Validated JSON view of `completion`.
pub fn unify_structured(
    completion: &Completion,
    schema: &OutputSchema,
    markup: Option<(&str, &str)>,
) -> Result<Value, Failure> {
    extract_structured(completion, schema, markup)
}

/// Drops a reasoning block that opens the text; an unterminated block swallows everything.
pub(crate) fn strip_reasoning<'a>(text: &'a str, markup: Option<(&str, &str)>) -> &'a str {
    let Some((open, close)) = markup else {
        return text;
    };
    let trimmed = text.trim_start();
    let Some(inner) = trimmed.strip_prefix(open) else {
        return text;
    };
    match inner.find(close) {
        Some(end) => inner[end + close.len()..].trim_start(),
        None => "",
    }
}

/// Text fragments of an SSE body, in arrival order.
///
/// Ends after the provider's end signal, the end of the body or the first error.
pub struct FragmentStream<F> {
    decoder: StreamDecoder,
    parse: F,
    finished: bool,
}

impl<F> FragmentStream<F>
where
    F: FnMut(&str) -> Result<StreamDelta, LLMError>,
{
    pub fn new(decoder: StreamDecoder, parse: F) -> Self {
        Self {
            decoder,
            parse,
            finished: false,
        }
    }
}

impl<F> Stream for FragmentStream<F>
where
    F: FnMut(&str) -> Result<StreamDelta, LLMError> + Unpin,
{
    type Item = Result<String, Failure>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        loop {
            if this.finished {
                return Poll::Ready(None);
            }
            let event = match Pin::new(&mut this.decoder).poll_next(cx) {
                Poll::Ready(event) => event,
                Poll::Pending => return Poll::Pending,
            };
            match event {
                None | Some(Ok(StreamEvent::Done)) => {
                    this.finished = true;
                }
                Some(Err(err)) => {
                    this.finished = true;
                    return Poll::Ready(Some(Err(Failure::from(err))));
                }
                Some(Ok(StreamEvent::Data(data))) => match (this.parse)(&data) {
                    Ok(StreamDelta::Text(text)) if !text.is_empty() => {
                        return Poll::Ready(Some(Ok(text)));
                    }
                    Ok(StreamDelta::Text(_)) | Ok(StreamDelta::Skip) => {}
                    Ok(StreamDelta::End) => {
                        this.finished = true;
                    }
                    Err(err) => {
                        this.finished = true;
                        return Poll::Ready(Some(Err(Failure::from(err))));
                    }
                },
            }
        }
    }
}

impl<F> FusedStream for FragmentStream<F>
where
    F: FnMut(&str) -> Result<StreamDelta, LLMError> + Unpin,
{
    fn is_terminated(&self) -> bool {
        self.finished
    }
}

#[cfg(test)]
mod tests {
    use futures_util::StreamExt;
    use futures_util::stream;

    use super::*;
    use crate::error::FailureKind;
    use crate::http::HttpBodyStream;

    fn decoder(chunks: Vec<Result<Vec<u8>, LLMError>>) -> StreamDecoder {
        let body: HttpBodyStream = Box::pin(stream::iter(chunks));
        StreamDecoder::new(body, "test")
    }

    fn passthrough(data: &str) -> Result<StreamDelta, LLMError> {
        match data {
            "skip" => Ok(StreamDelta::Skip),
            "end" => Ok(StreamDelta::End),
            "boom" => Err(LLMError::StreamClosed {
                message: "overloaded".into(),
            }),
            other => Ok(StreamDelta::Text(other.to_owned())),
        }
    }

    #[test]
    fn reasoning_block_is_stripped_only_when_leading() {
        let markup = Some(("<think>", "</think>"));
        assert_eq!(strip_reasoning("<think>a</think>\nanswer", markup), "answer");
        assert_eq!(strip_reasoning("answer <think>a</think>", markup), "answer <think>a</think>");
        assert_eq!(strip_reasoning("<think>never closed", markup), "");
        assert_eq!(strip_reasoning("<think>a</think>x", None), "<think>a</think>x");
    }

    #[tokio::test]
    async fn fragments_arrive_in_order_and_skip_non_text() {
        let chunks = vec![
            Ok(b"data: 1\n\ndata: skip\n\n".to_vec()),
            Ok(b"data: 2\n\ndata: 3\n\n".to_vec()),
            Ok(b"data: [DONE]\n\ndata: late\n\n".to_vec()),
        ];
        let fragments: Vec<_> = FragmentStream::new(decoder(chunks), passthrough)
            .map(|item| item.expect("fragment"))
            .collect()
            .await;
        assert_eq!(fragments, vec!["1", "2", "3"]);
    }

    #[tokio::test]
    async fn provider_end_signal_terminates() {
        let chunks = vec![Ok(b"data: a\n\ndata: end\n\ndata: b\n\n".to_vec())];
        let mut stream = FragmentStream::new(decoder(chunks), passthrough);
        assert_eq!(stream.next().await.unwrap().unwrap(), "a");
        assert!(stream.next().await.is_none());
        assert!(stream.is_terminated());
    }

    #[tokio::test]
    async fn error_is_the_last_item() {
        let chunks = vec![Ok(b"data: a\n\ndata: boom\n\ndata: b\n\n".to_vec())];
        let items: Vec<_> = FragmentStream::new(decoder(chunks), passthrough)
            .collect()
            .await;
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].as_deref().unwrap(), "a");
        assert_eq!(
            items[1].as_ref().unwrap_err().kind(),
            FailureKind::Transport
        );
    }

    #[tokio::test]
    async fn body_errors_surface_as_failures() {
        let chunks = vec![
            Ok(b"data: a\n\n".to_vec()),
            Err(LLMError::transport("connection reset")),
        ];
        let items: Vec<_> = FragmentStream::new(decoder(chunks), passthrough)
            .collect()
            .await;
        assert_eq!(items.len(), 2);
        assert!(items[1].is_err());
    }
}
