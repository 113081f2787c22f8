use ragdesk_cli::{build_service, run, Command};
use ragdesk_core::config::{EmbeddingBackend, GenerationBackend, Settings, StoreBackend};
use ragdesk_core::Error;
use std::fs;

fn offline_settings(backend: StoreBackend) -> Settings {
    let mut settings = Settings::default();
    settings.model.embedding = EmbeddingBackend::Hash;
    settings.model.generation = GenerationBackend::Extractive;
    settings.store.backend = backend;
    settings.store.path = "store".into();
    settings.chunking.size = 50;
    settings.chunking.overlap = 10;
    settings
}

#[tokio::test]
async fn upload_ask_delete_clear_against_lancedb() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let service = build_service(&offline_settings(StoreBackend::Lancedb), tmp.path()).await?;
    assert!(tmp.path().join("store").is_dir());

    let doc = tmp.path().join("handbook.txt");
    fs::write(&doc, "Employees may work remotely two days per week. Expense reports are due at month end.")?;
    let body = run(&service, Command::Upload { file: doc }).await?;
    assert_eq!(body["status"], "success");
    assert_eq!(body["filename"], "handbook.txt");
    assert!(body["chunks_ingested"].as_u64().is_some_and(|n| n >= 2));

    let body = run(&service, Command::Ask { question: "work remotely".into() }).await?;
    let sources = body["sources"].as_array().cloned().unwrap_or_default();
    assert!(!sources.is_empty());
    assert_eq!(sources[0]["metadata"]["source"], "handbook.txt");

    let id = sources[0]["id"].as_str().unwrap_or_default().to_string();
    let body = run(&service, Command::Delete { ids: vec![id] }).await?;
    assert_eq!(body["message"], "Deleted 1 chunks");

    run(&service, Command::Clear).await?;
    let body = run(&service, Command::Ask { question: "work remotely".into() }).await?;
    assert_eq!(body["sources"].as_array().map(Vec::len), Some(0));
    Ok(())
}

#[tokio::test]
async fn ingest_json_and_directory() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let service = build_service(&offline_settings(StoreBackend::Memory), tmp.path()).await?;

    let chunks = tmp.path().join("chunks.json");
    fs::write(&chunks, r#"{"chunks":[{"id":"hr_policy_1","content":"Remote work is allowed.","metadata":{"dept":"hr"}}]}"#)?;
    let body = run(&service, Command::Ingest { chunks }).await?;
    assert_eq!(body["message"], "Ingested 1 chunks");

    let docs = tmp.path().join("docs");
    fs::create_dir_all(docs.join("nested"))?;
    fs::write(docs.join("a.txt"), "Alpha document text.")?;
    fs::write(docs.join("nested").join("b.TXT"), "Beta document text.")?;
    fs::write(docs.join("skip.png"), [0u8, 1, 2])?;
    fs::write(docs.join("broken.pdf"), "not really a pdf")?;
    let body = run(&service, Command::IngestDir { dir: docs }).await?;
    assert_eq!(body["files_ingested"], 2);
    assert_eq!(body["failed"].as_array().map(Vec::len), Some(1));
    Ok(())
}

#[tokio::test]
async fn client_errors_are_classified() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let service = build_service(&offline_settings(StoreBackend::Memory), tmp.path()).await?;

    let err = run(&service, Command::IngestText { filename: "notes.docx".into(), text: "hello".into() })
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InputFormat { .. }));
    assert!(err.is_client_error());
    assert_eq!(err.envelope()["error"]["code"], "UNSUPPORTED_FORMAT");

    let err = run(&service, Command::Upload { file: tmp.path().join("missing.txt") }).await.unwrap_err();
    assert!(matches!(err, Error::InvalidInput(_)));
    Ok(())
}

#[tokio::test]
async fn memory_backend_starts_empty_for_every_build() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let settings = offline_settings(StoreBackend::Memory);

    let first = build_service(&settings, tmp.path()).await?;
    run(&first, Command::IngestText { filename: "a.txt".into(), text: "Alpha document text.".into() }).await?;
    let body = run(&first, Command::Ask { question: "alpha".into() }).await?;
    assert_eq!(body["sources"].as_array().map(Vec::len), Some(1));

    // A second invocation composes a fresh store.
    let second = build_service(&settings, tmp.path()).await?;
    let body = run(&second, Command::Ask { question: "alpha".into() }).await?;
    assert_eq!(body["sources"].as_array().map(Vec::len), Some(0));
    assert!(!tmp.path().join("store").exists());
    Ok(())
}
