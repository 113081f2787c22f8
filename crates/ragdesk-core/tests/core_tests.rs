use std::fs;

use figment::providers::{Format, Toml};
use tempfile::TempDir;

use ragdesk_core::chunker::ChunkingConfig;
use ragdesk_core::config::{resolve_with_base, EmbeddingBackend, GenerationBackend, Settings, StoreBackend};
use ragdesk_core::Error;

const OFFLINE: &str = r#"
[model]
embedding = "hash"
generation = "extractive"
"#;

#[test]
fn env_file_overrides_base_file() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("config.toml"), OFFLINE).unwrap();
    fs::write(tmp.path().join("config.test.toml"), "[chunking]\nsize = 500\noverlap = 50\n[store]\nbackend = \"memory\"\n").unwrap();

    let settings = Settings::from_figment(Settings::figment(tmp.path(), "test")).expect("settings");

    assert_eq!(settings.env, "test");
    assert_eq!(settings.chunking, ChunkingConfig { size: 500, overlap: 50 });
    assert_eq!(settings.store.backend, StoreBackend::Memory);
    assert_eq!(settings.model.embedding, EmbeddingBackend::Hash);
    assert_eq!(settings.model.generation, GenerationBackend::Extractive);
    assert_eq!(settings.retrieval.top_k, 5);
    assert_eq!(settings.retry.max_attempts, 3);
}

#[test]
fn missing_files_fall_back_to_defaults() {
    let tmp = TempDir::new().unwrap();
    let figment = Settings::figment(tmp.path(), "dev").merge(Toml::string(OFFLINE));

    let settings = Settings::from_figment(figment).expect("settings");

    assert_eq!(settings.chunking, ChunkingConfig::default());
    assert_eq!(settings.store.table, "knowledge_base");
    assert_eq!(settings.model.chat_model, "gpt-4o");
    assert!(!settings.is_prod());
}

#[test]
fn rejects_overlap_not_smaller_than_size() {
    let tmp = TempDir::new().unwrap();
    let figment = Settings::figment(tmp.path(), "dev")
        .merge(Toml::string(OFFLINE))
        .merge(Toml::string("[chunking]\nsize = 100\noverlap = 100\n"));

    let err = Settings::from_figment(figment).unwrap_err();
    assert!(matches!(err, Error::InvalidConfig(_)), "got {err:?}");
}

#[test]
fn hosted_backend_requires_api_key() {
    let mut settings = Settings::default();
    settings.model.api_key = None;
    assert!(matches!(settings.validate(), Err(Error::InvalidConfig(_))));

    settings.model.api_key = Some("sk-test".into());
    assert!(settings.validate().is_ok());
}

#[test]
fn relative_store_path_resolves_against_base() {
    let tmp = TempDir::new().unwrap();
    assert_eq!(resolve_with_base(tmp.path(), "data/lance"), tmp.path().join("data/lance"));
    assert_eq!(resolve_with_base(tmp.path(), "/var/lance"), std::path::PathBuf::from("/var/lance"));
}
