//! Similarity index and corpus indexing
//!
//! The similarity index is an external capability from the retriever's point
//! of view: vectors go in with a [`ChunkRecord`] attached, nearest-neighbor
//! queries come out. [`HnswIndex`] is the shipped in-memory implementation.
//! [`Indexer`] drives the build: chunk, embed, stage, swap.

mod hnsw;
mod indexer;

pub use hnsw::HnswIndex;
pub use indexer::{IndexError, IndexFailure, IndexReport, Indexer};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Metadata stored alongside each chunk vector.
///
/// A record is written and read whole; concurrent readers never observe a
/// partially-written mix of fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkRecord {
    /// Stable identifier of the source document
    pub source_id: String,

    /// Chunk text, including its overlap prefix
    pub text: String,

    /// Position of the chunk within its document
    pub chunk_index: usize,
}

/// One nearest-neighbor match
#[derive(Debug, Clone)]
pub struct IndexHit {
    /// Chunk id the vector was stored under
    pub chunk_id: u64,

    /// Similarity score, higher is more similar
    pub score: f32,

    /// The stored record
    pub record: ChunkRecord,
}

#[derive(Error, Debug)]
pub enum SimilarityIndexError {
    #[error("Invalid dimension: expected {expected}, got {actual}")]
    InvalidDimension { expected: usize, actual: usize },

    #[error("Insert failed: {0}")]
    InsertError(String),

    #[error("Search failed: {0}")]
    SearchError(String),

    #[error("Index unavailable: {0}")]
    Unavailable(String),

    #[error("Snapshot error: {0}")]
    SnapshotError(String),
}

/// Vector store contract: upsert chunk vectors with metadata, answer
/// nearest-neighbor queries, clear for a rebuild.
///
/// The similarity metric is an implementation constant, fixed for the
/// lifetime of the corpus. Query results are ordered by descending
/// similarity.
#[async_trait]
pub trait SimilarityIndex: Send + Sync {
    /// Insert or replace the vector and record stored under `chunk_id`
    async fn upsert(
        &self,
        chunk_id: u64,
        vector: &[f32],
        record: ChunkRecord,
    ) -> Result<(), SimilarityIndexError>;

    /// Return the `top_n` nearest neighbors of `vector`, most similar first
    async fn query(&self, vector: &[f32], top_n: usize)
        -> Result<Vec<IndexHit>, SimilarityIndexError>;

    /// Remove all vectors and records
    async fn clear(&self) -> Result<(), SimilarityIndexError>;

    /// Number of records currently stored
    async fn len(&self) -> u64;

    /// Vector dimension this index accepts
    fn dimension(&self) -> usize;
}
