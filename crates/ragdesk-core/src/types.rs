//! Domain types shared by the ingestion and query pipelines.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

pub type ChunkId = String;
pub type Metadata = BTreeMap<String, Value>;

/// Default number of candidates fetched for a query.
pub const DEFAULT_TOP_K: usize = 5;

/// A chunk of a source document that is independently indexed.
///
/// - `id`: globally unique chunk identifier; upserts and deletes address it
/// - `content`: the text payload of the chunk
/// - `metadata`: scalar values passed through to storage (source file,
///   chunk index, section tag, ...) and usable as search filters
/// - `embedding`: populated by ingestion; its length is fixed per index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentChunk {
    pub id: ChunkId,
    pub content: String,
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
}

impl DocumentChunk {
    pub fn new(id: impl Into<ChunkId>, content: impl Into<String>) -> Self {
        Self { id: id.into(), content: content.into(), metadata: Metadata::new(), embedding: None }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = Some(embedding);
        self
    }

    /// True when every `filters` entry is present in the metadata with an equal value.
    pub fn matches(&self, filters: &Metadata) -> bool {
        filters.iter().all(|(k, v)| self.metadata.get(k) == Some(v))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchQuery {
    pub query: String,
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filters: Option<Metadata>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
}

fn default_top_k() -> usize {
    DEFAULT_TOP_K
}

impl SearchQuery {
    pub fn new(query: impl Into<String>) -> Self {
        Self { query: query.into(), top_k: DEFAULT_TOP_K, filters: None, embedding: None }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = Some(embedding);
        self
    }

    pub fn with_filter(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.get_or_insert_with(Metadata::new).insert(key.into(), value.into());
        self
    }
}

/// A matched chunk and its score.
///
/// Whether a higher or lower score is better is a property of the store that
/// produced it; see the store adapter's documentation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub chunk: DocumentChunk,
    pub score: f32,
}

/// Final answer plus the chunks that were handed to generation, in order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmResponse {
    pub answer: String,
    pub sources: Vec<DocumentChunk>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn chunk_deserializes_without_optional_fields() {
        let chunk: DocumentChunk = serde_json::from_value(json!({ "id": "hr_policy_1", "content": "Remote work is allowed." }))
            .expect("valid chunk");
        assert!(chunk.metadata.is_empty());
        assert!(chunk.embedding.is_none());
    }

    #[test]
    fn filters_require_equal_values() {
        let chunk = DocumentChunk::new("1", "text").with_metadata("source", "a.txt").with_metadata("chunk_index", 0);
        let mut filters = Metadata::new();
        filters.insert("source".into(), json!("a.txt"));
        assert!(chunk.matches(&filters));
        filters.insert("chunk_index".into(), json!(1));
        assert!(!chunk.matches(&filters));
    }

    #[test]
    fn search_query_defaults_top_k() {
        let q: SearchQuery = serde_json::from_value(json!({ "query": "policy" })).expect("valid query");
        assert_eq!(q.top_k, DEFAULT_TOP_K);
        assert_eq!(SearchQuery::new("x").with_filter("source", "a").filters.map(|f| f.len()), Some(1));
    }
}
