//! Domain types, capability ports and shared policies for the RAG pipeline.
//!
//! `config` loads typed settings with Figment (`config.toml` +
//! `config.<env>.toml` + `APP_*` env vars); `chunker` is the pure text
//! windowing used during ingestion; `retry` is the backoff policy adapters wrap
//! around network calls.

pub mod chunker;
pub mod config;
pub mod error;
pub mod retry;
pub mod traits;
pub mod types;

pub use error::{Error, ExtractError, ModelError, Result, StoreError};
pub use traits::{LanguageModel, TextExtractor, VectorStore};
pub use types::{DocumentChunk, LlmResponse, Metadata, SearchQuery, SearchResult};
