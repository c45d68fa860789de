//! One conversational interface (`ask`, `ask_json`, `stream`) over OpenAI, Anthropic
//! Claude, Google Gemini, Groq and Mistral.
//!
//! A generic request is normalized per provider from static capability data:
//! system messages are merged, unsupported roles and parameters are degraded
//! silently, and structured output is obtained with whichever technique the model
//! supports, then validated against the caller's JSON Schema.

pub mod capability;
pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod normalize;
pub mod params;
mod provider;
pub mod response;
pub mod stream;
pub mod structured;
pub mod types;

pub use capability::{CapabilityRecord, Provider, capabilities};
pub use client::{Client, ClientBuilder};
pub use config::{ClientConfig, Credential};
pub use error::{Failure, FailureKind, LLMError};
pub use provider::default_base_url;
pub use response::TextStream;
pub use structured::{OutputSchema, StructuredStrategy};
pub use types::{Message, RequestOptions, Role, ThinkingLevel};
