//! Load, chunk and embed a corpus into an [`EmbeddingIndex`].
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::info;

use regdoc_core::chunker::Chunker;
use regdoc_core::config::Settings;
use regdoc_core::error::{Error, Result, Stage};
use regdoc_core::loader::DocumentLoader;
use regdoc_core::traits::Embedder;
use regdoc_core::types::LoadFailure;
use regdoc_vector::{EmbeddingIndex, SnapshotInfo};

/// What a build saw and produced.
#[derive(Debug, Clone, Default)]
pub struct BuildReport {
    pub files_seen: usize,
    pub documents: usize,
    pub chunks: usize,
    pub skipped_unsupported: usize,
    pub failures: Vec<LoadFailure>,
    pub elapsed: Duration,
    /// Set when the index was written to `index.persist_dir`.
    pub snapshot: Option<SnapshotInfo>,
    /// Snapshot write failure; the in-memory index is still usable.
    pub persist_error: Option<String>,
}

/// Runs on the calling thread; all three stages block.
pub fn build_index(
    settings: &Settings,
    base: &Path,
    loader: &DocumentLoader,
    embedder: &dyn Embedder,
) -> Result<(EmbeddingIndex, BuildReport)> {
    let started = Instant::now();
    let corpus = settings.corpus_dir(base);
    info!(corpus = %corpus.display(), "loading corpus");
    let loaded = loader.load(&corpus)?;

    let chunker = Chunker::new(settings.chunking.chunk_size, settings.chunking.chunk_overlap)?;
    let chunks = chunker.split_documents(&loaded.documents);
    info!(
        documents = loaded.documents.len(),
        chunks = chunks.len(),
        chunk_size = chunker.chunk_size(),
        overlap = chunker.chunk_overlap(),
        "corpus chunked"
    );
    let chunk_count = chunks.len();

    let index = EmbeddingIndex::build(chunks, embedder, settings.embedding.batch_size)
        .map_err(|e| Error::external(Stage::Embedding, e))?;

    let report = BuildReport {
        files_seen: loaded.files_seen,
        documents: loaded.documents.len(),
        chunks: chunk_count,
        skipped_unsupported: loaded.skipped_unsupported,
        failures: loaded.failures,
        elapsed: started.elapsed(),
        snapshot: None,
        persist_error: None,
    };
    info!(entries = index.len(), elapsed = ?report.elapsed, "index built");
    Ok((index, report))
}
