//! Recursive character splitter.
//!
//! Greedily takes up to `chunk_size` characters, then backs off to the last
//! occurrence of the highest-priority separator inside that window. The next
//! chunk starts `chunk_overlap` characters before the previous cut. Offsets
//! and bounds are counted in `char`s, never bytes.

use crate::error::{Error, Result};
use crate::types::{Chunk, Document};

/// Section breaks, paragraphs, lines, sentences, words. Anything else is a hard cut.
pub const DEFAULT_SEPARATORS: &[&str] = &["\n\n\n", "\n\n", "\n", ".", " "];

#[derive(Debug, Clone)]
pub struct Chunker {
    chunk_size: usize,
    chunk_overlap: usize,
    separators: Vec<Vec<char>>,
}

impl Chunker {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        Self::with_separators(chunk_size, chunk_overlap, DEFAULT_SEPARATORS)
    }

    pub fn with_separators(chunk_size: usize, chunk_overlap: usize, separators: &[&str]) -> Result<Self> {
        if chunk_size == 0 {
            return Err(Error::InvalidConfig("chunking.chunk_size must be > 0".into()));
        }
        if chunk_overlap >= chunk_size {
            return Err(Error::InvalidConfig(format!(
                "chunking.chunk_overlap ({}) must be smaller than chunking.chunk_size ({})",
                chunk_overlap, chunk_size
            )));
        }
        let separators = separators
            .iter()
            .filter(|s| !s.is_empty())
            .map(|s| s.chars().collect())
            .collect();
        Ok(Self { chunk_size, chunk_overlap, separators })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    pub fn split_documents(&self, docs: &[Document]) -> Vec<Chunk> {
        docs.iter().flat_map(|d| self.split_document(d)).collect()
    }

    pub fn split_document(&self, doc: &Document) -> Vec<Chunk> {
        self.spans(&doc.text)
            .into_iter()
            .map(|(start, text)| Chunk::new(doc, text, start))
            .collect()
    }

    /// `(start_offset, text)` for every chunk of `text`.
    pub fn spans(&self, text: &str) -> Vec<(usize, String)> {
        let chars: Vec<char> = text.chars().collect();
        let len = chars.len();
        let mut out = Vec::new();
        let mut start = 0;

        while start < len {
            let limit = (start + self.chunk_size).min(len);
            if limit == len {
                out.push((start, chars[start..].iter().collect()));
                break;
            }
            let cut = self.find_cut(&chars, start, limit);
            out.push((start, chars[start..cut].iter().collect()));
            start = cut - self.chunk_overlap;
        }
        out
    }

    /// Cut position in `(start + overlap, limit]`, right after a separator when one exists.
    /// Keeping the cut past `start + overlap` guarantees forward progress.
    fn find_cut(&self, chars: &[char], start: usize, limit: usize) -> usize {
        let min_cut = start + self.chunk_overlap + 1;
        for sep in &self.separators {
            let n = sep.len();
            let found = (min_cut..=limit)
                .rev()
                .find(|&cut| cut >= start + n && chars[cut - n..cut] == sep[..]);
            if let Some(cut) = found {
                return cut;
            }
        }
        limit
    }
}
