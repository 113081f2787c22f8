//! Embedding and generation adapter.
//!
//! [`ModelProvider`] implements the `LanguageModel` port over either a hosted
//! OpenAI-compatible API ([`OpenAiClient`]) or local backends from
//! `ragdesk-embed`. Hosted calls are wrapped in the configured
//! `RetryPolicy`; only transient failures are retried.

pub mod client;
pub mod prompt;
pub mod provider;

pub use client::OpenAiClient;
pub use prompt::build_prompt;
pub use provider::{EmbeddingSource, GenerationSource, ModelProvider, NO_ANSWER};
