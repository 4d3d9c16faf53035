//! Lightweight configuration loader and path helpers.
//!
//! Uses Figment to merge `config.toml` + `config.<env>.toml` + `APP_*` env vars.
//! Nested keys in env vars are split on `__` (`APP_RETRIEVAL__K=4`).
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

pub struct Config {
    figment: Figment,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(Path::new("."))
    }

    /// Same as [`Config::load`] but looks for the TOML files in `dir`.
    pub fn load_from(dir: &Path) -> anyhow::Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::new().merge(Toml::file(dir.join("config.toml")));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file(dir.join("config.dev.toml"))),
            "prod" | "production" => figment = figment.merge(Toml::file(dir.join("config.prod.toml"))),
            "test" | "testing" => figment = figment.merge(Toml::file(dir.join("config.test.toml"))),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        let config = Self { figment };
        config.validate_for_env(&env_name)?;
        Ok(config)
    }

    /// Wrap an already assembled figment (tests, embedding in other tools).
    pub fn from_figment(figment: Figment) -> Self {
        Self { figment }
    }

    pub fn get<T>(&self, key: &str) -> anyhow::Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| anyhow::anyhow!("Failed to get '{}': {}", key, e))
    }

    /// Typed view over the whole tree; missing sections fall back to defaults.
    pub fn settings(&self) -> anyhow::Result<Settings> {
        let settings: Settings = self
            .figment
            .extract()
            .map_err(|e| anyhow::anyhow!("Failed to read settings: {}", e))?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate_for_env(&self, env: &str) -> anyhow::Result<()> {
        if matches!(env, "prod" | "production") {
            let backend: Option<String> = self.figment.extract_inner("embedding.backend").ok();
            if backend.as_deref() == Some("hash") {
                anyhow::bail!("embedding.backend = \"hash\" is a test backend and not allowed in production");
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub corpus: CorpusSettings,
    pub chunking: ChunkingSettings,
    pub retrieval: RetrievalSettings,
    pub embedding: EmbeddingSettings,
    pub llm: LlmSettings,
    pub prompt: PromptSettings,
    pub index: IndexSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CorpusSettings {
    pub dir: String,
}

impl Default for CorpusSettings {
    fn default() -> Self {
        Self { dir: "./documents".to_string() }
    }
}

/// Bounds are measured in characters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingSettings {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

impl Default for ChunkingSettings {
    fn default() -> Self {
        Self { chunk_size: 1200, chunk_overlap: 300 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSettings {
    pub k: usize,
    pub fetch_k: usize,
    pub lambda: f32,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self { k: 6, fetch_k: 20, lambda: 0.7 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    /// `xlm-roberta` (local model under `model_dir`) or `hash`.
    pub backend: String,
    pub model_dir: String,
    pub max_len: usize,
    pub batch_size: usize,
    pub hash_dim: usize,
    pub max_retries: u32,
    pub retry_base_delay_ms: u64,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            backend: "xlm-roberta".to_string(),
            model_dir: "./models/bge-m3".to_string(),
            max_len: 256,
            batch_size: 32,
            hash_dim: 384,
            max_retries: 3,
            retry_base_delay_ms: 200,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub top_p: f32,
    pub repeat_penalty: f32,
    /// Tokens the model accepts for prompt plus completion.
    pub context_window: usize,
    pub request_timeout_ms: u64,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            model: "llama3.1".to_string(),
            temperature: 0.2,
            top_p: 0.9,
            repeat_penalty: 1.1,
            context_window: 4096,
            request_timeout_ms: 120_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptSettings {
    pub reserved_output_tokens: usize,
    pub annotate_sources: bool,
    pub template_file: Option<String>,
}

impl Default for PromptSettings {
    fn default() -> Self {
        Self { reserved_output_tokens: 1024, annotate_sources: true, template_file: None }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexSettings {
    pub persist_dir: Option<String>,
    pub table: String,
}

impl Default for IndexSettings {
    fn default() -> Self {
        Self { persist_dir: None, table: "chunks".to_string() }
    }
}

impl Settings {
    pub fn validate(&self) -> Result<()> {
        let c = &self.chunking;
        if c.chunk_size == 0 {
            return Err(Error::InvalidConfig("chunking.chunk_size must be > 0".into()));
        }
        if c.chunk_overlap >= c.chunk_size {
            return Err(Error::InvalidConfig(format!(
                "chunking.chunk_overlap ({}) must be smaller than chunking.chunk_size ({})",
                c.chunk_overlap, c.chunk_size
            )));
        }
        let r = &self.retrieval;
        if r.k == 0 {
            return Err(Error::InvalidConfig("retrieval.k must be > 0".into()));
        }
        if r.k > r.fetch_k {
            return Err(Error::InvalidConfig(format!(
                "retrieval.k ({}) must not exceed retrieval.fetch_k ({})",
                r.k, r.fetch_k
            )));
        }
        if !(0.0..=1.0).contains(&r.lambda) {
            return Err(Error::InvalidConfig(format!("retrieval.lambda ({}) must be within [0, 1]", r.lambda)));
        }
        if self.llm.context_window <= self.prompt.reserved_output_tokens {
            return Err(Error::InvalidConfig(format!(
                "llm.context_window ({}) must exceed prompt.reserved_output_tokens ({})",
                self.llm.context_window, self.prompt.reserved_output_tokens
            )));
        }
        if self.embedding.batch_size == 0 {
            return Err(Error::InvalidConfig("embedding.batch_size must be > 0".into()));
        }
        if self.embedding.hash_dim == 0 {
            return Err(Error::InvalidConfig("embedding.hash_dim must be > 0".into()));
        }
        Ok(())
    }

    pub fn corpus_dir(&self, base: &Path) -> PathBuf {
        resolve_with_base(base, &self.corpus.dir)
    }

    pub fn persist_dir(&self, base: &Path) -> Option<PathBuf> {
        self.index.persist_dir.as_ref().map(|p| resolve_with_base(base, p))
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
pub fn resolve_with_base<S: AsRef<str>>(base: &Path, p: S) -> PathBuf {
    let p = expand_path(p);
    if p.is_absolute() { p } else { base.join(p) }
}
