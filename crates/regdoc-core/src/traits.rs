use std::path::Path;

/// Text to fixed-dimension vector. Implementations must be deterministic for a
/// given model so query and chunk vectors stay comparable.
pub trait Embedder: Send + Sync {
    /// Stable identifier recorded alongside persisted snapshots.
    fn name(&self) -> &str;
    fn dim(&self) -> usize;
    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>>;

    fn embed_one(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        self.embed_batch(&[text.to_string()])?
            .pop()
            .ok_or_else(|| anyhow::anyhow!("embedder returned no vector"))
    }
}

/// One file format. Returns `(text, page)` pairs; `page` is 1-based and
/// `None` for formats without pagination.
pub trait DocumentParser: Send + Sync {
    /// Lowercase extensions without the leading dot.
    fn extensions(&self) -> &[&'static str];
    fn parse(&self, path: &Path) -> anyhow::Result<Vec<(String, Option<usize>)>>;
}

impl<T: Embedder + ?Sized> Embedder for std::sync::Arc<T> {
    fn name(&self) -> &str {
        (**self).name()
    }
    fn dim(&self) -> usize {
        (**self).dim()
    }
    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        (**self).embed_batch(texts)
    }
}
