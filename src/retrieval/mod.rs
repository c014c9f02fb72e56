//! Hybrid retrieval and ranking
//!
//! A query is answered by fetching semantic candidates from the similarity
//! index, adding a capped keyword boost for literal term overlap, stable
//! sorting by the fused score, and deduplicating by source.

mod boost;
mod dedup;
mod hybrid;

pub use boost::KeywordBooster;
pub use dedup::select_diverse;
pub use hybrid::HybridRetriever;

use crate::index::ChunkRecord;
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RetrieveError {
    /// Empty or malformed query text, rejected before any I/O
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// Embedding provider unreachable, timed out, or returned malformed output
    #[error("Embedding failed: {0}")]
    EmbeddingFailure(String),

    /// Similarity index unreachable or not yet built
    #[error("Similarity index unavailable: {0}")]
    IndexUnavailable(String),
}

/// A chunk annotated with scores during retrieval
#[derive(Debug, Clone)]
pub struct ScoredCandidate {
    pub chunk_id: u64,
    pub record: ChunkRecord,

    /// Position in the semantic candidate list, used as the stable tie-break
    pub semantic_rank: usize,

    pub semantic_score: f32,
    pub keyword_boost: f32,

    /// `semantic_score + keyword_boost`; determines rank order
    pub final_score: f32,
}

/// One entry of a retrieval result
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetrievedChunk {
    pub text: String,
    pub source_id: String,
    pub score: f32,
}

/// Final answer to a query: at most `k` chunks in descending score order
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RetrievalResult {
    pub entries: Vec<RetrievedChunk>,
}

impl RetrievalResult {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Render the entries as context for a downstream generator
    pub fn format_context(&self) -> String {
        if self.entries.is_empty() {
            return "No relevant documentation found.".to_string();
        }

        self.entries
            .iter()
            .map(|entry| format!("[Source: {}]\n{}", entry.source_id, entry.text))
            .collect::<Vec<_>>()
            .join("\n\n---\n\n")
    }
}
