//! Client façade: the single entry point for `ask`, `ask_json` and `stream`.

use std::fmt;

use futures_util::{StreamExt, stream};
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::capability::{CapabilityRecord, Provider, capabilities, is_known_model};
use crate::config::ClientConfig;
use crate::error::{Failure, LLMError};
use crate::http::{DynHttpTransport, default_transport};
use crate::normalize::normalize_messages;
use crate::params::translate;
use crate::provider::{PreparedCall, WireAdapter};
use crate::response::{Completion, FragmentStream, TextStream, unify_structured, unify_text};
use crate::stream::{StreamDecoder, collect_body_text};
use crate::structured::{OutputSchema, apply_strategy};
use crate::types::{Message, RequestOptions, ThinkingLevel};

/// Conversational client bound to one provider and model.
///
/// Cheap to clone; clones share the transport and nothing else.
///
/// # Examples
///
/// ```no_run
/// use parley_llm::{Client, Provider, RequestOptions};
///
/// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
/// let client = Client::builder(Provider::OpenAi, "gpt-4o-mini")
///     .api_key(std::env::var("OPENAI_API_KEY")?)
///     .instructions("Answer in one sentence.")
///     .build()?;
///
/// let answer = client.ask("What is the capital of France?", &RequestOptions::default()).await?;
/// println!("{answer}");
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Client {
    provider: Provider,
    model: String,
    record: CapabilityRecord,
    instructions: Option<String>,
    thinking: Option<ThinkingLevel>,
    adapter: WireAdapter,
    transport: DynHttpTransport,
}

impl Client {
    pub fn builder(provider: Provider, model: impl Into<String>) -> ClientBuilder {
        ClientBuilder {
            provider,
            model: model.into(),
            api_key: None,
            base_url: None,
            instructions: None,
            thinking: None,
            transport: None,
            allow_unlisted_model: false,
        }
    }

    /// Builds a client from a [`ClientConfig`] using the default reqwest transport.
    pub fn from_config(config: &ClientConfig) -> Result<Self, LLMError> {
        Self::config_builder(config)?.build()
    }

    pub fn from_config_with_transport(
        config: &ClientConfig,
        transport: DynHttpTransport,
    ) -> Result<Self, LLMError> {
        Self::config_builder(config)?.transport(transport).build()
    }

    fn config_builder(config: &ClientConfig) -> Result<ClientBuilder, LLMError> {
        let mut builder = Client::builder(config.provider, config.model.clone())
            .api_key(config.credential.resolve()?)
            .allow_unlisted_model(config.allow_unlisted_model);
        if let Some(base_url) = &config.base_url {
            builder = builder.base_url(base_url.clone());
        }
        if let Some(instructions) = &config.instructions {
            builder = builder.instructions(instructions.clone());
        }
        if let Some(thinking) = config.thinking {
            builder = builder.thinking(thinking);
        }
        Ok(builder)
    }

    pub fn provider(&self) -> Provider {
        self.provider
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Capability record resolved when the client was built.
    pub fn capabilities(&self) -> CapabilityRecord {
        self.record
    }

    /// Sends `input` and returns the answer text.
    ///
    /// An answer without text yields `""`; a leading reasoning block is removed.
    pub async fn ask(&self, input: &str, options: &RequestOptions) -> Result<String, Failure> {
        let call = self.prepare(input, options, None);
        let completion = self.complete(&call).await?;
        Ok(unify_text(completion, self.record.reasoning_markup))
    }

    /// Sends `input` and returns JSON validated against `schema`.
    ///
    /// The structured output technique is chosen from the model's capabilities.
    pub async fn ask_json(
        &self,
        input: &str,
        options: &RequestOptions,
        schema: &OutputSchema,
    ) -> Result<Value, Failure> {
        let call = self.prepare(input, options, Some(schema));
        let completion = self.complete(&call).await?;
        unify_structured(&completion, schema, self.record.reasoning_markup)
    }

    /// Like [`Client::ask_json`], with the schema derived from `T`.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use parley_llm::{Client, RequestOptions};
    /// use schemars::JsonSchema;
    /// use serde::Deserialize;
    ///
    /// #[derive(Deserialize, JsonSchema)]
    /// struct Greeting {
    ///     greeting: String,
    ///     language: String,
    /// }
    ///
    /// # async fn run(client: Client) -> Result<(), parley_llm::Failure> {
    /// let reply: Greeting = client.ask_json_as("Say hi in Italian", &RequestOptions::default()).await?;
    /// assert_eq!(reply.language, "Italian");
    /// # Ok(())
    /// # }
    /// ```
    pub async fn ask_json_as<T>(&self, input: &str, options: &RequestOptions) -> Result<T, Failure>
    where
        T: DeserializeOwned + JsonSchema,
    {
        let schema = OutputSchema::of::<T>()?;
        let value = self.ask_json(input, options, &schema).await?;
        serde_json::from_value(value.clone()).map_err(|err| Failure::SchemaViolation {
            errors: vec![err.to_string()],
            value,
        })
    }

    /// Streams the answer text fragment by fragment.
    ///
    /// Nothing is sent until the stream is first polled. A failure, before or during the
    /// answer, is the last item.
    pub fn stream(&self, input: &str, options: &RequestOptions) -> TextStream {
        let call = self.prepare(input, options, None);
        let client = self.clone();
        stream::once(async move { client.open_stream(call).await })
            .flat_map(|opened| match opened {
                Ok(fragments) => fragments,
                Err(err) => stream::iter([Err(Failure::from(err))]).boxed(),
            })
            .boxed()
    }

    /// Builds the provider-neutral description of a call.
    pub(crate) fn prepare(
        &self,
        input: &str,
        options: &RequestOptions,
        schema: Option<&OutputSchema>,
    ) -> PreparedCall {
        prepare_call(
            &self.record,
            self.instructions.as_deref(),
            self.thinking,
            input,
            options,
            schema,
        )
    }

    async fn complete(&self, call: &PreparedCall) -> Result<Completion, LLMError> {
        let request = self.adapter.build_http_request(call, false)?;
        debug!(provider = %self.provider, model = %self.model, url = %request.url, "sending request");
        let mut response = self.transport.send(request).await?;
        if !response.is_success() {
            let status = response.status;
            let headers = std::mem::take(&mut response.headers);
            let body = response.into_string()?;
            return Err(self.adapter.parse_error(status, &body, &headers));
        }
        self.adapter.parse_completion(&response.into_string()?)
    }

    async fn open_stream(self, call: PreparedCall) -> Result<TextStream, LLMError> {
        let request = self.adapter.build_http_request(&call, true)?;
        debug!(provider = %self.provider, model = %self.model, url = %request.url, "opening stream");
        let response = self.transport.send_stream(request).await?;
        let provider = self.provider.as_str();
        if !response.is_success() {
            let body = collect_body_text(response.body, provider).await?;
            return Err(self
                .adapter
                .parse_error(response.status, &body, &response.headers));
        }

        let adapter = self.adapter;
        let decoder = StreamDecoder::new(response.body, provider);
        Ok(FragmentStream::new(decoder, move |data: &str| adapter.parse_stream_event(data)).boxed())
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("instructions", &self.instructions)
            .field("thinking", &self.thinking)
            .finish_non_exhaustive()
    }
}

/// Builder for [`Client`]; validation happens in [`ClientBuilder::build`].
pub struct ClientBuilder {
    provider: Provider,
    model: String,
    api_key: Option<String>,
    base_url: Option<String>,
    instructions: Option<String>,
    thinking: Option<ThinkingLevel>,
    transport: Option<DynHttpTransport>,
    allow_unlisted_model: bool,
}

impl ClientBuilder {
    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Overrides the provider's default base URL, e.g. for a proxy.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Default system directive, appended after any system messages of a call.
    pub fn instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = Some(instructions.into());
        self
    }

    /// Default thinking level for calls that do not set one.
    pub fn thinking(mut self, thinking: ThinkingLevel) -> Self {
        self.thinking = Some(thinking);
        self
    }

    pub fn transport(mut self, transport: DynHttpTransport) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Accepts model ids missing from the capability table; they get the provider's
    /// restrictive record.
    pub fn allow_unlisted_model(mut self, allow: bool) -> Self {
        self.allow_unlisted_model = allow;
        self
    }

    /// Validates the settings and resolves the model's capabilities.
    ///
    /// # Errors
    ///
    /// * [`LLMError::InvalidConfig`] for a missing API key, a blank model or a base URL
    ///   that is not http(s).
    /// * [`LLMError::ModelNotFound`] for an unlisted model unless
    ///   [`ClientBuilder::allow_unlisted_model`] is set.
    pub fn build(self) -> Result<Client, LLMError> {
        let api_key = self
            .api_key
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty())
            .ok_or_else(|| LLMError::invalid_config("api_key", "an API key is required"))?;

        let model = self.model.trim().to_string();
        if model.is_empty() {
            return Err(LLMError::invalid_config("model", "model must not be empty"));
        }

        if let Some(base_url) = &self.base_url {
            if !(base_url.starts_with("https://") || base_url.starts_with("http://")) {
                return Err(LLMError::invalid_config(
                    "base_url",
                    format!("`{base_url}` is not an http(s) URL"),
                ));
            }
        }

        if !self.allow_unlisted_model && !is_known_model(self.provider, &model) {
            return Err(LLMError::ModelNotFound {
                message: format!("`{model}` is not a known {} model", self.provider),
                model: Some(model),
            });
        }

        let record = capabilities(self.provider, &model);
        let transport = match self.transport {
            Some(transport) => transport,
            None => default_transport()?,
        };
        debug!(
            provider = %self.provider,
            model = %model,
            strategy = ?record.structured_strategy(),
            "client built"
        );

        Ok(Client {
            provider: self.provider,
            adapter: WireAdapter::new(self.provider, model.clone(), api_key, self.base_url),
            model,
            record,
            instructions: self.instructions,
            thinking: self.thinking,
            transport,
        })
    }
}

/// Normalizes, translates and applies the structured output strategy for one call.
///
/// Per-call instructions replace the client default. A forced tool call runs with
/// thinking off, since providers reject a forced tool choice while thinking.
pub(crate) fn prepare_call(
    record: &CapabilityRecord,
    instructions: Option<&str>,
    default_thinking: Option<ThinkingLevel>,
    input: &str,
    options: &RequestOptions,
    schema: Option<&OutputSchema>,
) -> PreparedCall {
    let instructions = options.instructions.as_deref().or(instructions);
    let (instructions, structured) = match schema {
        Some(schema) => {
            let (instructions, directive) =
                apply_strategy(record.structured_strategy(), schema, instructions, record);
            (instructions, Some(directive))
        }
        None => (instructions.map(str::to_owned), None),
    };

    let mut conversation = Vec::with_capacity(options.messages.len() + 1);
    conversation.extend(options.messages.iter().cloned());
    conversation.push(Message::user(input));
    let messages = normalize_messages(&conversation, instructions.as_deref(), record);

    let params = if structured.as_ref().is_some_and(|d| d.is_forced_tool()) {
        let request = RequestOptions {
            thinking: Some(ThinkingLevel::Off),
            ..options.clone()
        };
        translate(&request, None, record)
    } else {
        translate(options, default_thinking, record)
    };

    let reasoning_format = structured
        .as_ref()
        .and(record.structured_reasoning_format);

    PreparedCall {
        messages,
        params,
        structured,
        reasoning_format,
    }
}
