//! Embedding backends for the regdoc pipeline.
//!
//! - [`EmbeddingModel`]: local XLM-RoBERTa encoder (BGE-M3 by default) run with candle
//! - [`HashEmbedder`]: deterministic token hashing, no model files needed
//! - [`RetryingEmbedder`]: bounded retries with exponential backoff around any backend

pub mod device;
pub mod pool;
pub mod retry;
pub mod tokenize;

use anyhow::{anyhow, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::xlm_roberta::{Config as XLMRobertaConfig, XLMRobertaModel};
use tokenizers::Tokenizer;
use tracing::{debug, info, warn};

use regdoc_core::config::{resolve_with_base, EmbeddingSettings};
use regdoc_core::traits::Embedder;

pub use device::select_device;
pub use pool::masked_mean_l2;
pub use retry::{RetryPolicy, RetryingEmbedder};
pub use tokenize::tokenize_on_device;

pub struct EmbeddingModel {
    name: String,
    model: XLMRobertaModel,
    tokenizer: Tokenizer,
    device: Device,
    dim: usize,
    max_len: usize,
    pad_id: u32,
}

impl EmbeddingModel {
    /// Load tokenizer, config and `pytorch_model.bin` weights from `model_dir`.
    pub fn load(model_dir: &Path, max_len: usize) -> Result<Self> {
        let device = select_device();
        info!(dir = %model_dir.display(), "loading embedding model");

        let tokenizer_path = model_dir.join("tokenizer.json");
        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow!("Failed to load tokenizer from {}: {}", tokenizer_path.display(), e))?;
        let pad_id = tokenizer.token_to_id("<pad>").unwrap_or(1);

        let config_path = model_dir.join("config.json");
        let raw: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&config_path)?)?;
        let dim = raw
            .get("hidden_size")
            .and_then(|v| v.as_u64())
            .ok_or_else(|| anyhow!("{} has no hidden_size", config_path.display()))? as usize;
        let config: XLMRobertaConfig = serde_json::from_value(raw)?;

        let weights_path = model_dir.join("pytorch_model.bin");
        let weights = candle_core::pickle::read_all(&weights_path)?;
        let weights_map: std::collections::HashMap<String, Tensor> = weights.into_iter().collect();
        let vb = VarBuilder::from_tensors(weights_map, DType::F32, &device);
        let model = XLMRobertaModel::new(&config, vb)?;

        let name = format!(
            "xlm-roberta:{}",
            model_dir.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_default()
        );
        info!(model = %name, dim, "embedding model loaded");
        Ok(Self { name, model, tokenizer, device, dim, max_len, pad_id })
    }

    fn embed_chunk(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let start = Instant::now();
        let mut ids = Vec::with_capacity(texts.len());
        let mut masks = Vec::with_capacity(texts.len());
        for text in texts {
            let (i, m) = tokenize_on_device(&self.tokenizer, text, self.max_len, self.pad_id, &self.device)?;
            ids.push(i);
            masks.push(m);
        }
        let input_ids = Tensor::cat(&ids, 0)?;
        let attention_mask = Tensor::cat(&masks, 0)?;
        let token_type_ids = input_ids.zeros_like()?;
        let hidden = self.model.forward(&input_ids, &attention_mask, &token_type_ids, None, None, None)?;
        let pooled = masked_mean_l2(&hidden, &attention_mask)?;
        let out: Vec<Vec<f32>> = pooled.to_device(&Device::Cpu)?.to_vec2()?;
        let elapsed = start.elapsed();
        if elapsed.as_millis() > 100 * texts.len() as u128 {
            warn!(texts = texts.len(), ?elapsed, "slow embedding batch");
        } else {
            debug!(texts = texts.len(), ?elapsed, "embedded batch");
        }
        Ok(out)
    }
}

impl Embedder for EmbeddingModel {
    fn name(&self) -> &str {
        &self.name
    }

    fn dim(&self) -> usize {
        self.dim
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        self.embed_chunk(texts)
    }
}

/// Deterministic bag-of-tokens embedder. Each whitespace token is hashed into
/// one of `dim` buckets; the result is L2-normalized.
pub struct HashEmbedder {
    name: String,
    dim: usize,
}

impl HashEmbedder {
    pub fn new(dim: usize) -> Result<Self> {
        if dim == 0 {
            return Err(anyhow!("hash embedder dimension must be > 0"));
        }
        Ok(Self { name: format!("hash-{}", dim), dim })
    }

    fn embed_text(&self, text: &str) -> Vec<f32> {
        use std::hash::{Hash, Hasher};
        use twox_hash::XxHash64;
        let mut v = vec![0f32; self.dim];
        for (i, token) in text.split_whitespace().enumerate() {
            let token = token.to_lowercase();
            let mut hasher = XxHash64::with_seed(0);
            token.hash(&mut hasher);
            let h = hasher.finish();
            let idx = (h as usize) % self.dim;
            let val = (((h >> 32) as u32) as f32) / (u32::MAX as f32);
            v[idx] += val + (i as f32 % 3.0) * 0.01;
        }
        let norm = (v.iter().map(|x| x * x).sum::<f32>()).sqrt().max(1e-6);
        for x in &mut v {
            *x /= norm;
        }
        v
    }
}

impl Embedder for HashEmbedder {
    fn name(&self) -> &str {
        &self.name
    }

    fn dim(&self) -> usize {
        self.dim
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_text(t)).collect())
    }
}

pub fn use_fake_embeddings() -> bool {
    std::env::var("APP_USE_FAKE_EMBEDDINGS")
        .ok()
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

/// Backend chosen by `embedding.backend`, wrapped in the retry policy from the same section.
/// `APP_USE_FAKE_EMBEDDINGS=1` forces the hashing backend.
pub fn get_default_embedder(settings: &EmbeddingSettings, base: &Path) -> Result<Arc<dyn Embedder>> {
    let policy = RetryPolicy::from_settings(settings);
    if use_fake_embeddings() || settings.backend == "hash" {
        info!(dim = settings.hash_dim, "using hashing embedder");
        return Ok(Arc::new(RetryingEmbedder::new(HashEmbedder::new(settings.hash_dim)?, policy)));
    }
    match settings.backend.as_str() {
        "xlm-roberta" => {
            let dir = resolve_model_dir(settings, base)?;
            let model = EmbeddingModel::load(&dir, settings.max_len)?;
            Ok(Arc::new(RetryingEmbedder::new(model, policy)))
        }
        other => Err(anyhow!("unknown embedding.backend '{}'", other)),
    }
}

fn resolve_model_dir(settings: &EmbeddingSettings, base: &Path) -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("APP_MODEL_DIR") {
        let p = PathBuf::from(&dir);
        if p.exists() {
            return Ok(p);
        }
    }
    let p = resolve_with_base(base, &settings.model_dir);
    if p.exists() {
        return Ok(p);
    }
    Err(anyhow!("Could not locate embedding model directory {}", p.display()))
}
