//! Builds the adapters once and wires them into a [`RagService`].

use ragdesk_core::config::{Settings, StoreBackend};
use ragdesk_core::{Error, Result, VectorStore};
use ragdesk_extract::FileTextExtractor;
use ragdesk_llm::ModelProvider;
use ragdesk_service::RagService;
use ragdesk_store::{LanceStore, MemoryStore};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

pub async fn build_store(settings: &Settings, base: &Path) -> Result<Arc<dyn VectorStore>> {
    match settings.store.backend {
        StoreBackend::Memory => {
            warn!("memory_store_not_persistent: chunks are lost when this process exits");
            Ok(Arc::new(MemoryStore::new()))
        }
        StoreBackend::Lancedb => {
            let path = settings.store_path(base);
            std::fs::create_dir_all(&path)
                .map_err(|e| Error::InvalidConfig(format!("cannot create store directory {}: {e}", path.display())))?;
            let store = LanceStore::open(&path.to_string_lossy(), &settings.store.table)
                .await
                .map_err(|e| Error::dependency("Failed to open vector store", e))?;
            Ok(Arc::new(store))
        }
    }
}

/// Composition root: every adapter is built here and nowhere else.
pub async fn build_service(settings: &Settings, base: &Path) -> Result<RagService> {
    let store = build_store(settings, base).await?;
    let model = ModelProvider::from_settings(&settings.model, settings.retry)
        .map_err(|e| Error::InvalidConfig(e.to_string()))?;
    info!(store = ?settings.store.backend, table = %settings.store.table, "service_composed");
    RagService::new(store, Arc::new(model), Arc::new(FileTextExtractor::new()))
        .with_chunking(settings.chunking)?
        .with_top_k(settings.retrieval.top_k)
}
