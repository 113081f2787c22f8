use async_trait::async_trait;
use ragdesk_core::config::{EmbeddingBackend, GenerationBackend, ModelSettings};
use ragdesk_core::retry::RetryPolicy;
use ragdesk_core::{DocumentChunk, LanguageModel, ModelError};
use ragdesk_embed::{Embedder, HashEmbedder};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::client::OpenAiClient;
use crate::prompt::build_prompt;

pub const NO_ANSWER: &str = "I don't know based on the provided documents.";

#[derive(Clone)]
pub enum EmbeddingSource {
    Remote(OpenAiClient),
    Local(Arc<dyn Embedder>),
}

#[derive(Clone)]
pub enum GenerationSource {
    Remote(OpenAiClient),
    /// Answers by quoting the best-ranked source.
    Extractive,
}

/// [`LanguageModel`] adapter combining an embedding source and a generation
/// source behind one retry policy.
#[derive(Clone)]
pub struct ModelProvider {
    embedding: EmbeddingSource,
    generation: GenerationSource,
    retry: RetryPolicy,
}

impl ModelProvider {
    pub fn new(embedding: EmbeddingSource, generation: GenerationSource, retry: RetryPolicy) -> Self {
        Self { embedding, generation, retry }
    }

    /// Fully offline provider: hashed embeddings and extractive answers.
    pub fn offline(dim: usize) -> Self {
        Self::new(EmbeddingSource::Local(Arc::new(HashEmbedder::new(dim))), GenerationSource::Extractive, RetryPolicy::none())
    }

    pub fn from_settings(settings: &ModelSettings, retry: RetryPolicy) -> Result<Self, ModelError> {
        let hosted = settings.embedding == EmbeddingBackend::Openai || settings.generation == GenerationBackend::Openai;
        let client = if hosted {
            let api_key = settings
                .api_key
                .clone()
                .filter(|k| !k.is_empty())
                .ok_or_else(|| ModelError::Inference("missing API key for the openai backend".into()))?;
            Some(OpenAiClient::new(
                &settings.base_url,
                api_key,
                &settings.chat_model,
                &settings.embedding_model,
                settings.temperature,
                Duration::from_secs(settings.timeout_secs),
            )?)
        } else {
            None
        };

        let embedding = match (settings.embedding, &client) {
            (EmbeddingBackend::Openai, Some(c)) => EmbeddingSource::Remote(c.clone()),
            (EmbeddingBackend::Local, _) => {
                let dir = settings.model_dir.as_deref().map(ragdesk_core::config::expand_path);
                let embedder = ragdesk_embed::get_default_embedder(dir.as_deref())
                    .map_err(|e| ModelError::Inference(format!("{e:#}")))?;
                EmbeddingSource::Local(embedder)
            }
            _ => EmbeddingSource::Local(Arc::new(HashEmbedder::default())),
        };
        let generation = match (settings.generation, client) {
            (GenerationBackend::Openai, Some(c)) => GenerationSource::Remote(c),
            _ => GenerationSource::Extractive,
        };
        info!(embedding = ?settings.embedding, generation = ?settings.generation, "model_provider_ready");
        Ok(Self::new(embedding, generation, retry))
    }
}

#[async_trait]
impl LanguageModel for ModelProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ModelError> {
        match &self.embedding {
            EmbeddingSource::Remote(client) => {
                self.retry.run("embed", ModelError::is_transient, || client.embeddings(text)).await
            }
            EmbeddingSource::Local(embedder) => {
                let embedder = Arc::clone(embedder);
                let text = text.to_string();
                tokio::task::spawn_blocking(move || embedder.embed_text(&text))
                    .await
                    .map_err(|e| ModelError::Inference(e.to_string()))?
                    .map_err(|e| ModelError::Inference(format!("{e:#}")))
            }
        }
    }

    async fn generate(&self, question: &str, context: &[DocumentChunk]) -> Result<String, ModelError> {
        match &self.generation {
            GenerationSource::Remote(client) => {
                let prompt = build_prompt(question, context);
                self.retry.run("generate", ModelError::is_transient, || client.chat(&prompt)).await
            }
            GenerationSource::Extractive => Ok(extractive_answer(context)),
        }
    }
}

pub fn extractive_answer(context: &[DocumentChunk]) -> String {
    match context.first() {
        Some(top) => format!("Based on the provided documents: {}", top.content.trim()),
        None => NO_ANSWER.to_string(),
    }
}
