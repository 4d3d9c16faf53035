//! Domain types shared by the loader, chunker, index and orchestrator.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

pub type ChunkId = String;

/// One loaded unit of text: a whole plain-text file or one page of a paged file.
///
/// `page` is 1-based and only present for paged formats.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub text: String,
    pub source: String,
    pub page: Option<usize>,
}

/// A contiguous fragment of exactly one [`Document`].
///
/// - `id`: `<source>#p<page>@<start_offset>` (page segment omitted for whole files)
/// - `start_offset`: character offset of `text` within the originating document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub id: ChunkId,
    pub text: String,
    pub source: String,
    pub page: Option<usize>,
    pub start_offset: usize,
}

impl Chunk {
    pub fn new(doc: &Document, text: String, start_offset: usize) -> Self {
        let id = match doc.page {
            Some(page) => format!("{}#p{}@{}", doc.source, page, start_offset),
            None => format!("{}@{}", doc.source, start_offset),
        };
        Self { id, text, source: doc.source.clone(), page: doc.page, start_offset }
    }
}

/// A file that could not be turned into documents. Recorded, never fatal on its own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadFailure {
    pub path: PathBuf,
    pub reason: String,
}

impl fmt::Display for LoadFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path.display(), self.reason)
    }
}

/// Outcome of scanning a corpus directory.
#[derive(Debug, Clone, Default)]
pub struct LoadReport {
    pub documents: Vec<Document>,
    pub failures: Vec<LoadFailure>,
    pub files_seen: usize,
    pub skipped_unsupported: usize,
}

/// A chunk chosen by the retriever, in selection order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedChunk {
    pub chunk: Chunk,
    /// Cosine similarity between the query and this chunk.
    pub similarity: f32,
    /// Marginal relevance score at the moment the chunk was picked.
    pub mmr_score: f32,
}

pub type RetrievalResult = Vec<RetrievedChunk>;

/// How the question reached the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryMode {
    Plain,
    CaseAnalysis,
}

/// Qualitative relevance label attached to each consulted source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Relevance {
    High,
    Medium,
    Low,
}

impl Relevance {
    pub fn from_similarity(similarity: f32) -> Self {
        if similarity >= 0.75 {
            Relevance::High
        } else if similarity >= 0.5 {
            Relevance::Medium
        } else {
            Relevance::Low
        }
    }
}

impl fmt::Display for Relevance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Relevance::High => "High",
            Relevance::Medium => "Medium",
            Relevance::Low => "Low",
        };
        f.write_str(label)
    }
}

/// Attribution for one chunk that was placed in the prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceRef {
    pub document: String,
    pub page: Option<usize>,
    pub start_offset: usize,
    pub excerpt: String,
    pub similarity: f32,
    pub relevance: Relevance,
}

impl From<&RetrievedChunk> for SourceRef {
    fn from(r: &RetrievedChunk) -> Self {
        Self {
            document: r.chunk.source.clone(),
            page: r.chunk.page,
            start_offset: r.chunk.start_offset,
            excerpt: r.chunk.text.clone(),
            similarity: r.similarity,
            relevance: Relevance::from_similarity(r.similarity),
        }
    }
}

/// Context had to be cut to fit the model's window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptOverflow {
    pub dropped_chunks: usize,
}

/// A synthesized answer with the sources that grounded it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Answer {
    pub text: String,
    pub sources: Vec<SourceRef>,
    pub source_count: usize,
    pub mode: QueryMode,
    pub truncation: Option<PromptOverflow>,
}

/// Named fields of a structured case description. Absent or blank fields
/// are replaced by placeholders when the question is composed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseFields {
    pub context: Option<String>,
    pub actors: Option<String>,
    pub situation: Option<String>,
    pub specific_question: Option<String>,
    pub additional_aspects: Option<String>,
}
