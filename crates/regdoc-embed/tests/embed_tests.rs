use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use regdoc_core::config::EmbeddingSettings;
use regdoc_core::traits::Embedder;
use regdoc_embed::{get_default_embedder, HashEmbedder, RetryPolicy, RetryingEmbedder};

#[test]
fn fake_embedder_shapes_and_determinism() {
    // Force fake embedder to avoid loading large model
    std::env::set_var("APP_USE_FAKE_EMBEDDINGS", "1");

    let settings = EmbeddingSettings { hash_dim: 256, ..Default::default() };
    let embedder = get_default_embedder(&settings, std::path::Path::new(".")).expect("embedder");
    let texts = vec!["hello world".to_string(), "hello world".to_string()];
    let embs = embedder.embed_batch(&texts).expect("embed_batch");
    let v1 = &embs[0];
    let v2 = &embs[1];

    assert_eq!(v1.len(), 256);
    assert_eq!(embedder.dim(), 256);
    assert_eq!(embedder.name(), "hash-256");

    let norm: f32 = v1.iter().map(|x| x * x).sum::<f32>().sqrt();
    assert!((norm - 1.0).abs() <= 1e-3, "vector is L2-normalized (norm={norm})");

    for (a, b) in v1.iter().zip(v2.iter()) {
        assert!((a - b).abs() <= 1e-6);
    }
}

#[test]
fn hash_embedder_separates_unrelated_texts() {
    let e = HashEmbedder::new(384).unwrap();
    let v = e
        .embed_batch(&[
            "academic probation rules".to_string(),
            "Academic probation rules".to_string(),
            "parking permits for staff".to_string(),
        ])
        .unwrap();
    let dot = |a: &[f32], b: &[f32]| a.iter().zip(b).map(|(x, y)| x * y).sum::<f32>();
    assert!(dot(&v[0], &v[1]) > 0.999, "case-insensitive tokens");
    assert!(dot(&v[0], &v[2]) < dot(&v[0], &v[1]));
}

#[test]
fn empty_text_embeds_to_zero_vector_of_right_dim() {
    let v = HashEmbedder::new(16).unwrap().embed_one("").unwrap();
    assert_eq!(v.len(), 16);
    assert!(v.iter().all(|x| *x == 0.0));
}

struct Flaky {
    fail_first: usize,
    calls: AtomicUsize,
}

impl Embedder for Flaky {
    fn name(&self) -> &str {
        "flaky"
    }
    fn dim(&self) -> usize {
        2
    }
    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        if n < self.fail_first {
            anyhow::bail!("connection reset");
        }
        Ok(texts.iter().map(|_| vec![1.0, 0.0]).collect())
    }
}

#[test]
fn retrying_embedder_recovers_from_transient_failures() {
    let e = RetryingEmbedder::new(
        Flaky { fail_first: 2, calls: AtomicUsize::new(0) },
        RetryPolicy::new(3, Duration::from_millis(1)),
    );
    let v = e.embed_batch(&["x".to_string()]).unwrap();
    assert_eq!(v, vec![vec![1.0, 0.0]]);
    assert_eq!(e.inner().calls.load(Ordering::SeqCst), 3);
}

#[test]
fn retrying_embedder_gives_up_after_budget() {
    let e = RetryingEmbedder::new(
        Flaky { fail_first: 10, calls: AtomicUsize::new(0) },
        RetryPolicy::new(2, Duration::from_millis(1)),
    );
    let err = e.embed_batch(&["x".to_string()]).unwrap_err();
    assert_eq!(e.inner().calls.load(Ordering::SeqCst), 3);
    assert!(format!("{:#}", err).contains("connection reset"));
}

#[test]
fn backoff_grows_and_is_capped() {
    let p = RetryPolicy::new(10, Duration::from_millis(200));
    assert_eq!(p.delay_for(0), Duration::from_millis(200));
    assert_eq!(p.delay_for(1), Duration::from_millis(300));
    assert_eq!(p.delay_for(2), Duration::from_millis(450));
    assert_eq!(p.delay_for(20), Duration::from_secs(5));
}

#[test]
fn zero_dimension_hash_embedder_is_refused() {
    assert!(HashEmbedder::new(0).is_err());

    let settings = EmbeddingSettings { backend: "hash".into(), hash_dim: 0, ..Default::default() };
    let err = get_default_embedder(&settings, std::path::Path::new(".")).err().unwrap();
    assert!(err.to_string().contains("dimension"));
}
