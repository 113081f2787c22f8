//! Retrieval-augmented generation orchestrator.
//!
//! [`RagService`] composes the chunker with the three capability ports:
//! uploads are extracted, chunked, embedded and upserted; questions are
//! embedded, matched against the store and answered from the retrieved
//! context. The service never retries; adapter failures are wrapped into
//! [`Error::DependencyFailure`] with the original error kept as the source.

use std::sync::Arc;

use ragdesk_core::chunker::ChunkingConfig;
use ragdesk_core::types::DEFAULT_TOP_K;
use ragdesk_core::{
    DocumentChunk, Error, LanguageModel, LlmResponse, Result, SearchQuery, TextExtractor, VectorStore,
};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

#[derive(Clone)]
pub struct RagService {
    store: Arc<dyn VectorStore>,
    model: Arc<dyn LanguageModel>,
    extractor: Arc<dyn TextExtractor>,
    chunking: ChunkingConfig,
    top_k: usize,
}

impl RagService {
    pub fn new(store: Arc<dyn VectorStore>, model: Arc<dyn LanguageModel>, extractor: Arc<dyn TextExtractor>) -> Self {
        Self { store, model, extractor, chunking: ChunkingConfig::default(), top_k: DEFAULT_TOP_K }
    }

    pub fn with_chunking(mut self, chunking: ChunkingConfig) -> Result<Self> {
        chunking.validate()?;
        self.chunking = chunking;
        Ok(self)
    }

    pub fn with_top_k(mut self, top_k: usize) -> Result<Self> {
        if top_k == 0 {
            return Err(Error::InvalidConfig("top_k must be greater than 0".into()));
        }
        self.top_k = top_k;
        Ok(self)
    }

    /// Extract, chunk and ingest an uploaded file. Returns the number of chunks stored.
    pub async fn process_file_upload(&self, content: &[u8], filename: &str) -> Result<usize> {
        info!(filename, bytes = content.len(), "processing_file_upload");
        let text = self
            .extractor
            .extract_text(content, filename)
            .await
            .map_err(|e| Error::InputFormat { filename: filename.to_string(), reason: e.to_string() })?;

        let windows = self.chunking.chunk(&text)?;
        // One random tag per upload keeps re-uploads of the same file distinct.
        let upload_tag: String = Uuid::new_v4().simple().to_string().chars().take(8).collect();
        let mut chunks: Vec<DocumentChunk> = windows
            .into_iter()
            .enumerate()
            .map(|(i, window)| {
                DocumentChunk::new(format!("{filename}_{upload_tag}_{i}"), window)
                    .with_metadata("source", filename)
                    .with_metadata("chunk_index", i)
            })
            .collect();

        self.ingest_documents(&mut chunks).await?;
        Ok(chunks.len())
    }

    /// Ingest raw text as if it were an uploaded file named `filename`.
    pub async fn ingest_text(&self, text: &str, filename: &str) -> Result<usize> {
        self.process_file_upload(text.as_bytes(), filename).await
    }

    /// Embed every chunk that has no embedding yet, then upsert the batch.
    /// An empty vector counts as no embedding.
    ///
    /// Embeddings are written back into `chunks`. Any failure aborts before
    /// the store is touched.
    pub async fn ingest_documents(&self, chunks: &mut [DocumentChunk]) -> Result<()> {
        if let Some(bad) = chunks.iter().find(|c| c.id.trim().is_empty() || c.content.is_empty()) {
            let what = if bad.id.trim().is_empty() { "chunk id" } else { "chunk content" };
            return Err(Error::InvalidInput(format!("{what} must not be empty (id: '{}')", bad.id)));
        }
        if chunks.is_empty() {
            debug!("ingesting_documents_skipped_empty");
            return Ok(());
        }
        info!(count = chunks.len(), "ingesting_documents_started");

        for chunk in chunks.iter_mut() {
            if chunk.embedding.as_ref().map_or(true, Vec::is_empty) {
                let embedding = self.model.embed(&chunk.content).await.map_err(|e| {
                    error!(error = %e, chunk_id = %chunk.id, "ingestion_failed");
                    Error::dependency("Failed to ingest documents", e)
                })?;
                chunk.embedding = Some(embedding);
            }
        }
        self.store.upsert(chunks).await.map_err(|e| {
            error!(error = %e, "ingestion_failed");
            Error::dependency("Failed to ingest documents", e)
        })?;

        info!(count = chunks.len(), "ingesting_documents_completed");
        Ok(())
    }

    /// Retrieve context for `question` and generate a grounded answer.
    pub async fn answer_query(&self, question: &str) -> Result<LlmResponse> {
        info!(query = question, "answering_query_started");
        debug!("generating_query_embedding");
        let embedding = self.model.embed(question).await.map_err(query_failure)?;

        debug!(top_k = self.top_k, "searching_vector_storage");
        let query = SearchQuery::new(question).with_top_k(self.top_k).with_embedding(embedding);
        let results = self.store.search(&query).await.map_err(query_failure)?;
        if results.is_empty() {
            warn!(query = question, "no_relevant_context_found");
        }
        let context: Vec<DocumentChunk> = results.into_iter().map(|r| r.chunk).collect();

        debug!(sources = context.len(), "generating_final_answer");
        let answer = self.model.generate(question, &context).await.map_err(query_failure)?;

        info!(status = "success", sources = context.len(), "answering_query_completed");
        Ok(LlmResponse { answer, sources: context })
    }

    pub async fn delete_documents(&self, ids: &[String]) -> Result<()> {
        info!(count = ids.len(), "deleting_documents_started");
        self.store.delete(ids).await.map_err(|e| {
            error!(error = %e, "deletion_failed");
            Error::dependency("Failed to delete documents", e)
        })?;
        info!(count = ids.len(), "deleting_documents_completed");
        Ok(())
    }

    pub async fn clear_all_documents(&self) -> Result<()> {
        info!("clearing_all_documents_started");
        self.store.clear_all().await.map_err(|e| {
            error!(error = %e, "clearing_all_failed");
            Error::dependency("Failed to clear documents", e)
        })?;
        info!("clearing_all_documents_completed");
        Ok(())
    }
}

fn query_failure<E>(e: E) -> Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    error!(error = %e, "rag_flow_failed");
    Error::dependency("Failed to process RAG query", e)
}
