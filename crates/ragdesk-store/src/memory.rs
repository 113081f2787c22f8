//! Brute-force in-process vector store.

use async_trait::async_trait;
use ragdesk_core::{DocumentChunk, SearchQuery, SearchResult, StoreError, VectorStore};
use ragdesk_embed::Embedder;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

#[derive(Default)]
struct Inner {
    chunks: BTreeMap<String, DocumentChunk>,
    dim: Option<usize>,
}

/// [`VectorStore`] keeping every chunk in memory.
///
/// Scores are cosine similarity, higher is better; ties are broken by id so
/// results are deterministic. The vector width is fixed by the first vector
/// stored. With a fallback embedder, text-only queries and chunks without an
/// embedding are embedded by the store itself.
#[derive(Default, Clone)]
pub struct MemoryStore {
    inner: Arc<RwLock<Inner>>,
    embedder: Option<Arc<dyn Embedder>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_embedder(embedder: Arc<dyn Embedder>) -> Self {
        Self { inner: Arc::default(), embedder: Some(embedder) }
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.chunks.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn get(&self, id: &str) -> Option<DocumentChunk> {
        self.inner.read().await.chunks.get(id).cloned()
    }

    /// The fallback embedder may be a local model, so it runs on the blocking pool.
    async fn vector_for(&self, id: &str, embedding: Option<&Vec<f32>>, text: &str) -> Result<Vec<f32>, StoreError> {
        match (embedding, &self.embedder) {
            (Some(v), _) => Ok(v.clone()),
            (None, Some(embedder)) => {
                let embedder = Arc::clone(embedder);
                let text = text.to_string();
                tokio::task::spawn_blocking(move || embedder.embed_text(&text))
                    .await
                    .map_err(StoreError::backend)?
                    .map_err(|e| StoreError::Backend(format!("{e:#}")))
            }
            (None, None) => Err(StoreError::MissingEmbedding(id.to_string())),
        }
    }
}

fn check_dim(expected: Option<usize>, actual: usize) -> Result<(), StoreError> {
    match expected {
        Some(expected) if expected != actual => Err(StoreError::DimensionMismatch { expected, actual }),
        _ => Ok(()),
    }
}

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let na = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let nb = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if na == 0.0 || nb == 0.0 {
        0.0
    } else {
        dot / (na * nb)
    }
}

#[async_trait]
impl VectorStore for MemoryStore {
    async fn upsert(&self, chunks: &[DocumentChunk]) -> Result<(), StoreError> {
        // Resolve and validate every vector before taking the write lock.
        let mut prepared = Vec::with_capacity(chunks.len());
        let mut batch_dim = None;
        for chunk in chunks {
            let vector = self.vector_for(&chunk.id, chunk.embedding.as_ref(), &chunk.content).await?;
            check_dim(batch_dim, vector.len())?;
            batch_dim = Some(vector.len());
            prepared.push(DocumentChunk { embedding: Some(vector), ..chunk.clone() });
        }

        let mut inner = self.inner.write().await;
        if let Some(dim) = batch_dim {
            check_dim(inner.dim, dim)?;
            inner.dim = Some(dim);
        }
        for chunk in prepared {
            inner.chunks.insert(chunk.id.clone(), chunk);
        }
        debug!(count = chunks.len(), total = inner.chunks.len(), "memory_store_upsert");
        Ok(())
    }

    async fn search(&self, query: &SearchQuery) -> Result<Vec<SearchResult>, StoreError> {
        let vector = self.vector_for("query", query.embedding.as_ref(), &query.query).await?;
        let inner = self.inner.read().await;
        if inner.chunks.is_empty() {
            return Ok(Vec::new());
        }
        check_dim(inner.dim, vector.len())?;

        let mut results: Vec<SearchResult> = inner
            .chunks
            .values()
            .filter(|c| query.filters.as_ref().map_or(true, |f| c.matches(f)))
            .filter_map(|c| {
                let score = cosine_similarity(&vector, c.embedding.as_deref()?);
                Some(SearchResult { chunk: c.clone(), score })
            })
            .collect();
        results.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.chunk.id.cmp(&b.chunk.id)));
        results.truncate(query.top_k);
        Ok(results)
    }

    async fn delete(&self, ids: &[String]) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        for id in ids {
            inner.chunks.remove(id);
        }
        Ok(())
    }

    async fn clear_all(&self) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        inner.chunks.clear();
        inner.dim = None;
        Ok(())
    }
}
