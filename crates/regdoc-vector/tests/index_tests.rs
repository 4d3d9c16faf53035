use regdoc_core::traits::Embedder;
use regdoc_core::types::{Chunk, Document};
use regdoc_embed::HashEmbedder;
use regdoc_vector::EmbeddingIndex;

fn chunks(texts: &[&str]) -> Vec<Chunk> {
    texts
        .iter()
        .enumerate()
        .map(|(i, t)| {
            let doc = Document { text: t.to_string(), source: format!("doc{i}.txt"), page: None };
            Chunk::new(&doc, t.to_string(), 0)
        })
        .collect()
}

#[test]
fn build_keeps_one_entry_per_chunk_in_order() {
    let e = HashEmbedder::new(64).unwrap();
    let texts = ["enrollment rules", "grading scale", "thesis defense", "tuition refunds", "leave of absence"];
    let idx = EmbeddingIndex::build(chunks(&texts), &e, 2).unwrap();
    assert_eq!(idx.len(), 5);
    assert_eq!(idx.dim(), 64);
    assert_eq!(idx.embedder(), "hash-64");
    let stored: Vec<&str> = idx.entries().iter().map(|e| e.chunk.text.as_str()).collect();
    assert_eq!(stored, texts.to_vec());
}

#[test]
fn search_ranks_by_descending_similarity() {
    let e = HashEmbedder::new(128).unwrap();
    let idx = EmbeddingIndex::build(chunks(&["grading scale policy", "parking permits", "grading appeals"]), &e, 8).unwrap();
    let q = e.embed_one("grading scale policy").unwrap();
    let hits = idx.search(&q, 10);
    assert_eq!(hits.len(), 3);
    assert_eq!(hits[0].entry.chunk.text, "grading scale policy");
    assert!((hits[0].similarity - 1.0).abs() < 1e-4);
    assert!(hits.windows(2).all(|w| w[0].similarity >= w[1].similarity));

    assert_eq!(idx.search(&q, 1).len(), 1);
}

struct WrongDim;

impl Embedder for WrongDim {
    fn name(&self) -> &str {
        "wrong"
    }
    fn dim(&self) -> usize {
        4
    }
    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|_| vec![1.0; 3]).collect())
    }
}

#[test]
fn build_rejects_vectors_of_wrong_dimension() {
    let err = EmbeddingIndex::build(chunks(&["a"]), &WrongDim, 4).unwrap_err();
    assert!(err.to_string().contains("dimension"));
}

#[test]
fn fingerprint_depends_only_on_content() {
    let texts = ["alpha", "beta"];
    let a = EmbeddingIndex::build(chunks(&texts), &HashEmbedder::new(16).unwrap(), 1).unwrap();
    let b = EmbeddingIndex::build(chunks(&texts), &HashEmbedder::new(32).unwrap(), 5).unwrap();
    let c = EmbeddingIndex::build(chunks(&["alpha", "gamma"]), &HashEmbedder::new(16).unwrap(), 1).unwrap();
    assert_eq!(a.fingerprint(), b.fingerprint());
    assert_ne!(a.fingerprint(), c.fingerprint());
}
