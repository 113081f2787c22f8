use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::chunker::ChunkingConfig;
use crate::error::{Error, Result};
use crate::retry::RetryPolicy;
use crate::types::DEFAULT_TOP_K;

/// Typed process settings.
///
/// Loaded from `config.toml`, then `config.<env>.toml`, then `APP_*`
/// environment variables (`__` separates nested keys, e.g.
/// `APP_STORE__BACKEND=memory`), then `OPENAI_API_KEY`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub env: String,
    pub log_level: String,
    pub chunking: ChunkingConfig,
    pub retrieval: RetrievalSettings,
    pub model: ModelSettings,
    pub retry: RetryPolicy,
    pub store: StoreSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            env: "dev".into(),
            log_level: "info".into(),
            chunking: ChunkingConfig::default(),
            retrieval: RetrievalSettings::default(),
            model: ModelSettings::default(),
            retry: RetryPolicy::default(),
            store: StoreSettings::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSettings {
    pub top_k: usize,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self { top_k: DEFAULT_TOP_K }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingBackend {
    /// Hosted OpenAI-compatible `/embeddings` endpoint.
    Openai,
    /// Local BGE-M3 model loaded with candle.
    Local,
    /// Deterministic token hashing, no model.
    Hash,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationBackend {
    Openai,
    /// Offline answers quoted from the best source.
    Extractive,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSettings {
    pub embedding: EmbeddingBackend,
    pub generation: GenerationBackend,
    pub api_key: Option<String>,
    pub base_url: String,
    pub chat_model: String,
    pub embedding_model: String,
    pub temperature: f32,
    pub timeout_secs: u64,
    pub model_dir: Option<String>,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            embedding: EmbeddingBackend::Openai,
            generation: GenerationBackend::Openai,
            api_key: None,
            base_url: "https://api.openai.com/v1".into(),
            chat_model: "gpt-4o".into(),
            embedding_model: "text-embedding-3-small".into(),
            temperature: 0.0,
            timeout_secs: 60,
            model_dir: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Lancedb,
    /// Process-local; nothing survives between CLI invocations.
    Memory,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    pub backend: StoreBackend,
    pub path: String,
    pub table: String,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self { backend: StoreBackend::Lancedb, path: "./lancedb_data".into(), table: "knowledge_base".into() }
    }
}

impl Settings {
    /// Load settings for the environment named by `RUST_ENV` (default `dev`).
    pub fn load() -> Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());
        Self::from_figment(Self::figment(Path::new("."), &env_name))
    }

    pub fn figment(base_dir: &Path, env_name: &str) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Settings::default())).merge(Toml::file(base_dir.join("config.toml")));
        match env_name {
            "dev" | "development" => figment = figment.merge(Toml::file(base_dir.join("config.dev.toml"))),
            "prod" | "production" => figment = figment.merge(Toml::file(base_dir.join("config.prod.toml"))),
            "test" | "testing" => figment = figment.merge(Toml::file(base_dir.join("config.test.toml"))),
            _ => {}
        }
        figment
            .merge(Serialized::default("env", normalize_env(env_name)))
            .merge(Env::prefixed("APP_").split("__"))
            .merge(Env::raw().only(&["OPENAI_API_KEY"]).map(|_| "model.api_key".into()))
    }

    pub fn from_figment(figment: Figment) -> Result<Self> {
        let settings: Settings = figment.extract().map_err(|e| Error::InvalidConfig(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn is_prod(&self) -> bool {
        self.env == "prod"
    }

    pub fn validate(&self) -> Result<()> {
        self.chunking.validate()?;
        if self.retrieval.top_k == 0 {
            return Err(Error::InvalidConfig("retrieval.top_k must be greater than 0".into()));
        }
        if self.retry.max_attempts == 0 {
            return Err(Error::InvalidConfig("retry.max_attempts must be at least 1".into()));
        }
        let hosted = self.model.embedding == EmbeddingBackend::Openai || self.model.generation == GenerationBackend::Openai;
        if hosted && self.model.api_key.as_deref().map_or(true, str::is_empty) {
            return Err(Error::InvalidConfig("model.api_key (or OPENAI_API_KEY) is required for the openai backend".into()));
        }
        Ok(())
    }

    /// Resolved on-disk location of the vector store.
    pub fn store_path(&self, base: &Path) -> PathBuf {
        resolve_with_base(base, &self.store.path)
    }
}

fn normalize_env(env_name: &str) -> &str {
    match env_name {
        "development" => "dev",
        "production" => "prod",
        "testing" => "test",
        other => other,
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

/// Resolve a possibly relative path against a given base directory after expansion.
/// If `p` is absolute, it's returned as-is; otherwise `base.join(p)` is returned.
pub fn resolve_with_base<S: AsRef<str>>(base: &Path, p: S) -> PathBuf {
    let p = expand_path(p);
    if p.is_absolute() { p } else { base.join(p) }
}
