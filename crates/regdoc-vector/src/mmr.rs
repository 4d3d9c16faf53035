//! Maximal Marginal Relevance selection.
//!
//! MMR = λ × sim(query, c) - (1-λ) × max(sim(c, s) for s in selected)
//!
//! λ = 1.0: pure relevance, λ = 0.0: pure diversity. The candidate pool is the
//! `fetch_k` nearest entries; ties prefer higher query similarity, then pool order.

use tracing::debug;

use regdoc_core::types::RetrievedChunk;

use crate::index::{EmbeddingIndex, Neighbor};
use crate::similarity::cosine_similarity;

#[derive(Debug, Clone, Copy)]
pub struct MmrParams {
    pub k: usize,
    pub fetch_k: usize,
    pub lambda: f32,
}

impl MmrParams {
    pub fn new(k: usize, fetch_k: usize, lambda: f32) -> Self {
        Self { k, fetch_k: fetch_k.max(k), lambda: lambda.clamp(0.0, 1.0) }
    }
}

/// Select `min(k, |pool|)` chunks from the index for `query`, in selection order.
pub fn select(index: &EmbeddingIndex, query: &[f32], params: MmrParams) -> Vec<RetrievedChunk> {
    let pool = index.search(query, params.fetch_k);
    let picked = rerank(&pool, params.k, params.lambda);
    debug!(
        pool = pool.len(),
        selected = ?picked.iter().map(|(i, _)| pool[*i].entry.chunk.id.as_str()).collect::<Vec<_>>(),
        "mmr selection"
    );
    picked
        .into_iter()
        .map(|(i, score)| RetrievedChunk {
            chunk: pool[i].entry.chunk.clone(),
            similarity: pool[i].similarity,
            mmr_score: score,
        })
        .collect()
}

/// Indices into `pool` with their MMR score at selection time.
pub fn rerank(pool: &[Neighbor<'_>], k: usize, lambda: f32) -> Vec<(usize, f32)> {
    let k = k.min(pool.len());
    let mut selected: Vec<(usize, f32)> = Vec::with_capacity(k);
    let mut remaining: Vec<usize> = (0..pool.len()).collect();
    // Highest similarity of each pool entry to anything selected so far.
    let mut max_sim = vec![f32::NEG_INFINITY; pool.len()];

    while selected.len() < k && !remaining.is_empty() {
        let mut best: Option<(usize, f32)> = None;
        for (slot, &idx) in remaining.iter().enumerate() {
            let redundancy = if selected.is_empty() { 0.0 } else { max_sim[idx] };
            let score = lambda * pool[idx].similarity - (1.0 - lambda) * redundancy;
            let better = match best {
                None => true,
                Some((best_slot, best_score)) => {
                    let best_rel = pool[remaining[best_slot]].similarity;
                    score > best_score || (score == best_score && pool[idx].similarity > best_rel)
                }
            };
            if better {
                best = Some((slot, score));
            }
        }
        let Some((slot, score)) = best else { break };
        let chosen = remaining.remove(slot);
        for &idx in &remaining {
            let s = cosine_similarity(&pool[idx].entry.vector, &pool[chosen].entry.vector);
            if s > max_sim[idx] {
                max_sim[idx] = s;
            }
        }
        selected.push((chosen, score));
    }
    selected
}
