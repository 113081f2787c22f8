//! Capability ports consumed by the orchestrator.
//!
//! Adapters own their synchronization and connection handling; every port is
//! shared as `Arc<dyn Port>` across concurrent requests.

use async_trait::async_trait;

use crate::error::{ExtractError, ModelError, StoreError};
use crate::types::{DocumentChunk, SearchQuery, SearchResult};

#[async_trait]
pub trait TextExtractor: Send + Sync {
    /// Map raw bytes to plain text, using `filename` as the format hint.
    async fn extract_text(&self, content: &[u8], filename: &str) -> Result<String, ExtractError>;
}

/// Embedding and answer generation.
///
/// Implementations retry transient failures themselves and return the last
/// error once their retry budget is spent.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ModelError>;
    async fn generate(&self, question: &str, context: &[DocumentChunk]) -> Result<String, ModelError>;
}

#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Insert or replace every chunk by id. The whole batch is applied or none of it is.
    async fn upsert(&self, chunks: &[DocumentChunk]) -> Result<(), StoreError>;
    /// Best-first results, at most `query.top_k`.
    async fn search(&self, query: &SearchQuery) -> Result<Vec<SearchResult>, StoreError>;
    /// Unknown ids are ignored.
    async fn delete(&self, ids: &[String]) -> Result<(), StoreError>;
    async fn clear_all(&self) -> Result<(), StoreError>;
}
