//! In-memory embedding index.
//!
//! Built once from chunks, read-only afterwards. Search is an exact scan,
//! which is plenty for a single institution's regulations.
use anyhow::{bail, Result};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use regdoc_core::traits::Embedder;
use regdoc_core::types::Chunk;

use crate::similarity::{cosine_with_magnitude, magnitude};

#[derive(Debug, Clone)]
pub struct IndexEntry {
    pub chunk: Chunk,
    pub vector: Vec<f32>,
}

/// One hit of [`EmbeddingIndex::search`].
#[derive(Debug, Clone, Copy)]
pub struct Neighbor<'a> {
    pub entry: &'a IndexEntry,
    /// Position of the entry in the index; ties are broken on it.
    pub position: usize,
    pub similarity: f32,
}

#[derive(Debug, Clone)]
pub struct EmbeddingIndex {
    embedder: String,
    dim: usize,
    entries: Vec<IndexEntry>,
}

impl EmbeddingIndex {
    /// Embed every chunk in batches of `batch_size` and keep the pairs in chunk order.
    pub fn build(chunks: Vec<Chunk>, embedder: &dyn Embedder, batch_size: usize) -> Result<Self> {
        let dim = embedder.dim();
        let batch_size = batch_size.max(1);
        info!(chunks = chunks.len(), embedder = embedder.name(), dim, "embedding chunks");

        let pb = ProgressBar::new(chunks.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} chunks ({percent}%) {msg}")?
                .progress_chars("#>-"),
        );

        let mut entries = Vec::with_capacity(chunks.len());
        let mut pending = chunks.into_iter().peekable();
        while pending.peek().is_some() {
            let batch: Vec<Chunk> = pending.by_ref().take(batch_size).collect();
            let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
            let vectors = embedder.embed_batch(&texts)?;
            if vectors.len() != batch.len() {
                bail!("embedder returned {} vectors for {} texts", vectors.len(), batch.len());
            }
            for (chunk, vector) in batch.into_iter().zip(vectors) {
                if vector.len() != dim {
                    bail!("embedding for {} has dimension {}, expected {}", chunk.id, vector.len(), dim);
                }
                entries.push(IndexEntry { chunk, vector });
            }
            pb.set_position(entries.len() as u64);
        }
        pb.finish_with_message("embedded");

        Ok(Self { embedder: embedder.name().to_string(), dim, entries })
    }

    /// Reassemble an index from stored entries (snapshot loading).
    pub fn from_entries(embedder: impl Into<String>, dim: usize, entries: Vec<IndexEntry>) -> Result<Self> {
        if let Some(bad) = entries.iter().find(|e| e.vector.len() != dim) {
            bail!("entry {} has dimension {}, expected {}", bad.chunk.id, bad.vector.len(), dim);
        }
        Ok(Self { embedder: embedder.into(), dim, entries })
    }

    pub fn embedder(&self) -> &str {
        &self.embedder
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    /// Up to `n` entries by descending cosine similarity; equal scores keep index order.
    pub fn search(&self, query: &[f32], n: usize) -> Vec<Neighbor<'_>> {
        let q_mag = magnitude(query);
        let mut hits: Vec<Neighbor<'_>> = self
            .entries
            .iter()
            .enumerate()
            .map(|(position, entry)| Neighbor {
                entry,
                position,
                similarity: cosine_with_magnitude(query, q_mag, &entry.vector),
            })
            .collect();
        hits.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
        hits.truncate(n);
        hits
    }

    /// Content fingerprint over chunk ids and texts, stable across rebuilds of the same corpus.
    pub fn fingerprint(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        for e in &self.entries {
            hasher.update(e.chunk.id.as_bytes());
            hasher.update(&[0]);
            hasher.update(e.chunk.text.as_bytes());
            hasher.update(&[0]);
        }
        hasher.finalize().to_hex().to_string()
    }
}
