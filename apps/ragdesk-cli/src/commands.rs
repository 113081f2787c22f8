use anyhow::Context;
use clap::Subcommand;
use indicatif::{ProgressBar, ProgressStyle};
use ragdesk_core::{DocumentChunk, Error, Result};
use ragdesk_service::RagService;
use serde::Deserialize;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use tracing::warn;
use walkdir::WalkDir;

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Extract, chunk and index a .txt or .pdf file
    Upload { file: PathBuf },

    /// Index raw text under a file name
    IngestText {
        #[arg(short, long)]
        filename: String,
        text: String,
    },

    /// Index pre-built chunks from a JSON file
    Ingest { chunks: PathBuf },

    /// Upload every .txt and .pdf file below a directory
    IngestDir { dir: PathBuf },

    /// Answer a question from the indexed documents
    Ask { question: String },

    /// Delete chunks by id
    Delete {
        #[arg(required = true)]
        ids: Vec<String>,
    },

    /// Remove every indexed chunk
    Clear,

    /// Report liveness
    Health,
}

/// Accepts a bare array of chunks or `{"chunks": [...]}`.
#[derive(Deserialize)]
#[serde(untagged)]
enum ChunkPayload {
    Bare(Vec<DocumentChunk>),
    Wrapped { chunks: Vec<DocumentChunk> },
}

pub fn parse_chunks(raw: &str) -> Result<Vec<DocumentChunk>> {
    let payload: ChunkPayload =
        serde_json::from_str(raw).map_err(|e| Error::InvalidInput(format!("malformed chunk payload: {e}")))?;
    Ok(match payload {
        ChunkPayload::Bare(chunks) | ChunkPayload::Wrapped { chunks } => chunks,
    })
}

fn read(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path)
        .with_context(|| format!("reading {}", path.display()))
        .map_err(|e| Error::InvalidInput(format!("{e:#}")))
}

fn file_name(path: &Path) -> String {
    path.file_name().map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned())
}

fn is_ingestible(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("txt") || e.eq_ignore_ascii_case("pdf"))
}

/// Run one command and return its JSON success body.
pub async fn run(service: &RagService, command: Command) -> Result<Value> {
    match command {
        Command::Upload { file } => {
            let bytes = read(&file)?;
            let filename = file_name(&file);
            let count = service.process_file_upload(&bytes, &filename).await?;
            Ok(json!({ "status": "success", "filename": filename, "chunks_ingested": count }))
        }
        Command::IngestText { filename, text } => {
            let count = service.ingest_text(&text, &filename).await?;
            Ok(json!({ "status": "success", "filename": filename, "chunks_ingested": count }))
        }
        Command::Ingest { chunks } => {
            let raw = String::from_utf8(read(&chunks)?).map_err(|e| Error::InvalidInput(e.to_string()))?;
            let mut chunks = parse_chunks(&raw)?;
            service.ingest_documents(&mut chunks).await?;
            Ok(json!({ "status": "success", "message": format!("Ingested {} chunks", chunks.len()) }))
        }
        Command::IngestDir { dir } => ingest_dir(service, &dir).await,
        Command::Ask { question } => {
            let mut response = service.answer_query(&question).await?;
            for source in &mut response.sources {
                source.embedding = None;
            }
            serde_json::to_value(&response).map_err(|e| Error::dependency("Failed to process RAG query", e))
        }
        Command::Delete { ids } => {
            service.delete_documents(&ids).await?;
            Ok(json!({ "status": "success", "message": format!("Deleted {} chunks", ids.len()) }))
        }
        Command::Clear => {
            service.clear_all_documents().await?;
            Ok(json!({ "status": "success", "message": "All documents cleared" }))
        }
        Command::Health => Ok(health()),
    }
}

pub fn health() -> Value {
    json!({ "status": "healthy" })
}

async fn ingest_dir(service: &RagService, dir: &Path) -> Result<Value> {
    if !dir.is_dir() {
        return Err(Error::InvalidInput(format!("{} is not a directory", dir.display())));
    }
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .into_iter()
        .filter_map(std::result::Result::ok)
        .filter(|e| e.file_type().is_file() && is_ingestible(e.path()))
        .map(walkdir::DirEntry::into_path)
        .collect();
    files.sort();

    let pb = ProgressBar::new(files.len() as u64);
    if let Ok(style) = ProgressStyle::default_bar().template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files {msg}") {
        pb.set_style(style.progress_chars("#>-"));
    }

    let mut total_chunks = 0usize;
    let mut failed = Vec::new();
    for path in &files {
        let name = file_name(path);
        pb.set_message(name.clone());
        let outcome = match read(path) {
            Ok(bytes) => service.process_file_upload(&bytes, &name).await,
            Err(e) => Err(e),
        };
        match outcome {
            Ok(count) => total_chunks += count,
            // Dependency failures abort the run; a bad file only skips itself.
            Err(e) if e.is_client_error() => {
                warn!(file = %path.display(), error = %e, "ingest_file_skipped");
                failed.push(json!({ "file": path.display().to_string(), "error": e.to_string() }));
            }
            Err(e) => {
                pb.abandon();
                return Err(e);
            }
        }
        pb.inc(1);
    }
    pb.finish_with_message("done");

    Ok(json!({
        "status": "success",
        "files_ingested": files.len() - failed.len(),
        "chunks_ingested": total_chunks,
        "failed": failed,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_bare_and_wrapped_chunk_lists() {
        let bare = parse_chunks(r#"[{"id":"hr_policy_1","content":"Remote work is allowed."}]"#).unwrap();
        assert_eq!(bare[0].id, "hr_policy_1");
        let wrapped = parse_chunks(r#"{"chunks":[{"id":"a","content":"x","metadata":{"source":"a.txt"}}]}"#).unwrap();
        assert_eq!(wrapped[0].metadata["source"], "a.txt");
        assert!(matches!(parse_chunks("{\"nope\": 1}"), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn only_text_and_pdf_files_are_walked() {
        assert!(is_ingestible(Path::new("a/b/Policy.PDF")));
        assert!(is_ingestible(Path::new("notes.txt")));
        assert!(!is_ingestible(Path::new("image.png")));
        assert!(!is_ingestible(Path::new("Makefile")));
    }
}
