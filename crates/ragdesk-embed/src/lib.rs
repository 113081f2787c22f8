//! Local text embedding backends.
//!
//! [`EmbeddingModel`] runs BGE-M3 (XLM-RoBERTa) with candle and returns
//! mean-pooled, L2-normalized 1024-d vectors. [`HashEmbedder`] hashes tokens
//! into a vector of the same width; it needs no model files and is used for
//! offline runs and tests.

use anyhow::{anyhow, Context, Result};
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::xlm_roberta::{Config as XLMRobertaConfig, XLMRobertaModel};
use tokenizers::Tokenizer;
use tracing::{debug, info, warn};
use twox_hash::XxHash64;

pub mod device;
pub mod pool;
pub mod tokenize;

pub use pool::masked_mean_l2;

/// Output width of BGE-M3.
pub const BGE_M3_DIM: usize = 1024;
const MAX_TOKENS: usize = 256;

pub trait Embedder: Send + Sync {
    fn dim(&self) -> usize;
    fn embed_text(&self, text: &str) -> Result<Vec<f32>>;

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        texts.iter().map(|t| self.embed_text(t)).collect()
    }
}

pub struct EmbeddingModel {
    model: XLMRobertaModel,
    tokenizer: Tokenizer,
    device: Device,
}

impl EmbeddingModel {
    /// Load tokenizer, config and weights from `model_dir`, or from the first
    /// default location that exists.
    pub fn load(model_dir: Option<&Path>) -> Result<Self> {
        let device = device::select_device();
        let model_dir = match model_dir {
            Some(dir) => dir.to_path_buf(),
            None => resolve_model_dir()?,
        };
        info!(model_dir = %model_dir.display(), "loading_embedding_model");

        let tokenizer_path = model_dir.join("tokenizer.json");
        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow!("Failed to load tokenizer from {}: {}", tokenizer_path.display(), e))?;
        let config_path = model_dir.join("config.json");
        let config: XLMRobertaConfig = serde_json::from_str(
            &std::fs::read_to_string(&config_path).with_context(|| format!("reading {}", config_path.display()))?,
        )?;
        let weights_path = model_dir.join("pytorch_model.bin");
        let weights = candle_core::pickle::read_all(&weights_path)?;
        let weights_map: HashMap<String, Tensor> = weights.into_iter().collect();
        let vb = VarBuilder::from_tensors(weights_map, DType::F32, &device);
        let model = XLMRobertaModel::new(&config, vb)?;
        info!("embedding_model_loaded");
        Ok(Self { model, tokenizer, device })
    }

    fn forward(&self, text: &str) -> Result<Vec<f32>> {
        let start = Instant::now();
        let (input_ids, attention_mask) = tokenize::tokenize_on_device(&self.tokenizer, text, MAX_TOKENS, &self.device)?;
        let token_type_ids = Tensor::zeros((1, MAX_TOKENS), DType::I64, &self.device)?;
        let hidden = self.model.forward(&input_ids, &attention_mask, &token_type_ids, None, None, None)?;
        let pooled = masked_mean_l2(&hidden, &attention_mask)?;
        let emb: Vec<f32> = pooled.to_device(&Device::Cpu)?.squeeze(0)?.to_vec1()?;
        if emb.len() != BGE_M3_DIM {
            return Err(anyhow!("unexpected embedding width {} (expected {})", emb.len(), BGE_M3_DIM));
        }
        let elapsed_ms = start.elapsed().as_millis() as u64;
        if elapsed_ms > 100 {
            warn!(elapsed_ms, "slow_embedding");
        } else {
            debug!(elapsed_ms, "embedded_text");
        }
        Ok(emb)
    }
}

impl Embedder for EmbeddingModel {
    fn dim(&self) -> usize {
        BGE_M3_DIM
    }

    fn embed_text(&self, text: &str) -> Result<Vec<f32>> {
        self.forward(text)
    }
}

/// Deterministic bag-of-tokens embedder.
///
/// Each whitespace token is hashed with xxHash64 into one of `dim` buckets;
/// the result is L2-normalized, so identical texts give identical vectors and
/// texts sharing tokens score closer under cosine similarity.
#[derive(Debug, Clone)]
pub struct HashEmbedder {
    dim: usize,
}

impl HashEmbedder {
    pub fn new(dim: usize) -> Self {
        Self { dim: dim.max(1) }
    }
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self::new(BGE_M3_DIM)
    }
}

impl Embedder for HashEmbedder {
    fn dim(&self) -> usize {
        self.dim
    }

    fn embed_text(&self, text: &str) -> Result<Vec<f32>> {
        let mut v = vec![0f32; self.dim];
        for (i, token) in text.split_whitespace().enumerate() {
            let mut hasher = XxHash64::with_seed(0);
            token.to_lowercase().hash(&mut hasher);
            let h = hasher.finish();
            let idx = (h % self.dim as u64) as usize;
            let val = ((h >> 32) as u32) as f32 / u32::MAX as f32;
            v[idx] += val + (i as f32 % 3.0) * 0.01;
        }
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt().max(1e-6);
        for x in &mut v {
            *x /= norm;
        }
        Ok(v)
    }
}

/// Load the local model, or the hash embedder when `APP_USE_FAKE_EMBEDDINGS` is set.
pub fn get_default_embedder(model_dir: Option<&Path>) -> Result<Arc<dyn Embedder>> {
    let use_fake = std::env::var("APP_USE_FAKE_EMBEDDINGS")
        .ok()
        .is_some_and(|v| v == "1" || v.eq_ignore_ascii_case("true"));
    if use_fake {
        info!("using_hash_embedder");
        return Ok(Arc::new(HashEmbedder::default()));
    }
    Ok(Arc::new(EmbeddingModel::load(model_dir)?))
}

fn resolve_model_dir() -> Result<PathBuf> {
    for var in ["APP_MODEL_DIR", "MODEL_DIR"] {
        if let Ok(dir) = std::env::var(var) {
            let p = PathBuf::from(&dir);
            if p.exists() {
                return Ok(p);
            }
        }
    }
    ["../models/bge-m3", "models/bge-m3"]
        .iter()
        .map(PathBuf::from)
        .find(|p| p.exists())
        .ok_or_else(|| anyhow!("Could not locate BGE-M3 model directory"))
}
