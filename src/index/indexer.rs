/// Corpus indexing pipeline: chunk, embed, stage, swap
use super::{ChunkRecord, SimilarityIndex};
use crate::chunker::Chunker;
use crate::corpus::{Document, DocumentSource};
use crate::embedding::EmbeddingProvider;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::{info, warn};

#[derive(Error, Debug)]
pub enum IndexError {
    #[error("A rebuild is already in progress")]
    RebuildInProgress,

    #[error("Similarity index unavailable: {0}")]
    IndexUnavailable(String),

    #[error("Corpus enumeration failed: {0}")]
    Corpus(String),
}

/// One document that could not be indexed
#[derive(Debug, Clone, Serialize)]
pub struct IndexFailure {
    pub source_id: String,
    pub reason: String,
}

/// Outcome of a rebuild
#[derive(Debug, Serialize)]
pub struct IndexReport {
    /// Documents whose chunks all made it into the index
    pub documents_indexed: usize,

    /// Total chunks upserted
    pub chunks_indexed: usize,

    /// Documents skipped, with the reason each failed
    pub failures: Vec<IndexFailure>,

    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
}

impl IndexReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Orchestrates Chunker + Embedding Provider + Similarity Index to build the
/// corpus's searchable representation
///
/// A rebuild is a single-writer batch operation guarded by a rebuild lock;
/// a concurrent attempt fails fast rather than interleaving writes. Every
/// chunk record is staged before the live index is touched, so the previous
/// generation stays fully queryable through the expensive embedding phase.
pub struct Indexer {
    chunker: Chunker,
    provider: Arc<dyn EmbeddingProvider>,
    index: Arc<dyn SimilarityIndex>,
    batch_size: usize,
    embed_timeout: Duration,
    rebuild_lock: Mutex<()>,
}

impl Indexer {
    pub fn new(
        chunker: Chunker,
        provider: Arc<dyn EmbeddingProvider>,
        index: Arc<dyn SimilarityIndex>,
        batch_size: usize,
        embed_timeout: Duration,
    ) -> Self {
        Self {
            chunker,
            provider,
            index,
            batch_size: batch_size.max(1),
            embed_timeout,
            rebuild_lock: Mutex::new(()),
        }
    }

    /// Rebuild the index from the given documents.
    ///
    /// Best-effort batch semantics: a document whose embedding fails is
    /// recorded in the report and skipped, and the run continues. Documents
    /// that produce no chunks (empty text) are excluded without error.
    pub async fn build_index(&self, documents: &[Document]) -> Result<IndexReport, IndexError> {
        let _guard = self
            .rebuild_lock
            .try_lock()
            .map_err(|_| IndexError::RebuildInProgress)?;

        let started_at = Utc::now();
        let start = Instant::now();

        info!(documents = documents.len(), "starting index rebuild");

        let mut staged: Vec<(u64, Vec<f32>, ChunkRecord)> = Vec::new();
        let mut failures = Vec::new();
        let mut documents_indexed = 0usize;
        let mut next_id: u64 = 0;

        for document in documents {
            let chunks = self.chunker.chunk_document(document);
            if chunks.is_empty() {
                tracing::debug!(source = %document.source_id, "document produced no chunks, skipping");
                continue;
            }

            let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
            match self.embed_texts(&texts).await {
                Ok(vectors) => {
                    for (chunk, vector) in chunks.into_iter().zip(vectors) {
                        staged.push((
                            next_id,
                            vector,
                            ChunkRecord {
                                source_id: chunk.source_id,
                                text: chunk.text,
                                chunk_index: chunk.chunk_index,
                            },
                        ));
                        next_id += 1;
                    }
                    documents_indexed += 1;
                }
                Err(reason) => {
                    warn!(source = %document.source_id, %reason, "skipping document");
                    failures.push(IndexFailure {
                        source_id: document.source_id.clone(),
                        reason,
                    });
                }
            }
        }

        // Swap in the new generation. Readers may observe the old or the new
        // generation during the swap, never a torn chunk record.
        self.index
            .clear()
            .await
            .map_err(|e| IndexError::IndexUnavailable(e.to_string()))?;

        let chunks_indexed = staged.len();
        for (chunk_id, vector, record) in staged {
            self.index
                .upsert(chunk_id, &vector, record)
                .await
                .map_err(|e| IndexError::IndexUnavailable(e.to_string()))?;
        }

        let duration_ms = start.elapsed().as_millis() as u64;
        info!(
            documents_indexed,
            chunks_indexed,
            failed = failures.len(),
            duration_ms,
            "index rebuild complete"
        );

        Ok(IndexReport {
            documents_indexed,
            chunks_indexed,
            failures,
            started_at,
            duration_ms,
        })
    }

    /// Enumerate a document source and rebuild from it
    pub async fn build_from_source(
        &self,
        source: &dyn DocumentSource,
    ) -> Result<IndexReport, IndexError> {
        let documents = source
            .enumerate()
            .map_err(|e| IndexError::Corpus(e.to_string()))?;
        self.build_index(&documents).await
    }

    /// Embed chunk texts in `batch_size` batches under the embed timeout
    async fn embed_texts(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, String> {
        let mut vectors = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size) {
            let embedded = timeout(self.embed_timeout, self.provider.embed_batch(batch))
                .await
                .map_err(|_| {
                    format!(
                        "embedding timed out after {}ms",
                        self.embed_timeout.as_millis()
                    )
                })?
                .map_err(|e| e.to_string())?;

            if embedded.len() != batch.len() {
                return Err(format!(
                    "embedding count mismatch: expected {}, got {}",
                    batch.len(),
                    embedded.len()
                ));
            }
            vectors.extend(embedded);
        }
        Ok(vectors)
    }
}
