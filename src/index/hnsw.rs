/// In-memory HNSW similarity index with cosine distance
use super::{ChunkRecord, IndexHit, SimilarityIndex, SimilarityIndexError};
use ahash::AHashMap;
use async_trait::async_trait;
use hnsw_rs::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::RwLock;

/// Stored vector plus record, kept so the index can be snapshotted
struct StoredEntry {
    vector: Vec<f32>,
    record: ChunkRecord,
}

struct Inner {
    hnsw: Hnsw<'static, f32, DistCosine>,
    entries: AHashMap<u64, StoredEntry>,
}

/// HNSW vector index
///
/// Approximate nearest-neighbor search over cosine distance. The searchable
/// graph cannot remove points, so `upsert` of an existing id supersedes the
/// old point through the record map and `clear` rebuilds the graph from
/// scratch.
pub struct HnswIndex {
    inner: RwLock<Inner>,
    dimension: usize,
    ef_construction: usize,
    m: usize,
    ef_search: usize,
}

/// One persisted index entry
#[derive(Serialize, Deserialize)]
struct SnapshotEntry {
    id: u64,
    vector: Vec<f32>,
    record: ChunkRecord,
}

impl HnswIndex {
    /// Create an empty index
    ///
    /// # Arguments
    /// * `dimension` - vector dimension (must match the embedding dimension)
    /// * `ef_construction` - HNSW construction parameter (higher = better recall, slower build)
    /// * `m` - HNSW M parameter (number of connections per layer)
    /// * `ef_search` - HNSW search parameter (higher = better recall, slower search)
    pub fn new(dimension: usize, ef_construction: usize, m: usize, ef_search: usize) -> Self {
        Self {
            inner: RwLock::new(Inner {
                hnsw: Self::fresh_graph(dimension, ef_construction, m),
                entries: AHashMap::new(),
            }),
            dimension,
            ef_construction,
            m,
            ef_search,
        }
    }

    fn fresh_graph(
        dimension: usize,
        ef_construction: usize,
        m: usize,
    ) -> Hnsw<'static, f32, DistCosine> {
        Hnsw::<f32, DistCosine>::new(
            m,
            dimension,
            ef_construction,
            200, // max_nb_connection
            DistCosine,
        )
    }

    /// Write all entries to a JSON snapshot so a later process can reload the
    /// index built here
    pub fn save(&self, path: &Path) -> Result<(), SimilarityIndexError> {
        let inner = self
            .inner
            .read()
            .map_err(|_| SimilarityIndexError::Unavailable("index lock poisoned".to_string()))?;

        let snapshot: Vec<SnapshotEntry> = inner
            .entries
            .iter()
            .map(|(id, entry)| SnapshotEntry {
                id: *id,
                vector: entry.vector.clone(),
                record: entry.record.clone(),
            })
            .collect();

        let bytes = serde_json::to_vec(&snapshot)
            .map_err(|e| SimilarityIndexError::SnapshotError(e.to_string()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| SimilarityIndexError::SnapshotError(e.to_string()))?;
        }
        std::fs::write(path, bytes)
            .map_err(|e| SimilarityIndexError::SnapshotError(e.to_string()))?;

        tracing::info!(path = %path.display(), entries = snapshot.len(), "saved index snapshot");
        Ok(())
    }

    /// Rebuild an index from a snapshot written by [`HnswIndex::save`]
    pub fn load(
        path: &Path,
        dimension: usize,
        ef_construction: usize,
        m: usize,
        ef_search: usize,
    ) -> Result<Self, SimilarityIndexError> {
        let bytes = std::fs::read(path).map_err(|e| {
            SimilarityIndexError::Unavailable(format!("snapshot {:?}: {}", path, e))
        })?;
        let snapshot: Vec<SnapshotEntry> = serde_json::from_slice(&bytes)
            .map_err(|e| SimilarityIndexError::SnapshotError(e.to_string()))?;

        let index = Self::new(dimension, ef_construction, m, ef_search);
        {
            let mut inner = index
                .inner
                .write()
                .map_err(|_| SimilarityIndexError::Unavailable("index lock poisoned".to_string()))?;
            for entry in snapshot {
                if entry.vector.len() != dimension {
                    return Err(SimilarityIndexError::InvalidDimension {
                        expected: dimension,
                        actual: entry.vector.len(),
                    });
                }
                inner.hnsw.insert((&entry.vector, entry.id as usize));
                inner.entries.insert(
                    entry.id,
                    StoredEntry {
                        vector: entry.vector,
                        record: entry.record,
                    },
                );
            }
        }

        tracing::info!(path = %path.display(), "loaded index snapshot");
        Ok(index)
    }
}

#[async_trait]
impl SimilarityIndex for HnswIndex {
    async fn upsert(
        &self,
        chunk_id: u64,
        vector: &[f32],
        record: ChunkRecord,
    ) -> Result<(), SimilarityIndexError> {
        if vector.len() != self.dimension {
            return Err(SimilarityIndexError::InvalidDimension {
                expected: self.dimension,
                actual: vector.len(),
            });
        }

        let data = vector.to_vec();
        let mut inner = self
            .inner
            .write()
            .map_err(|_| SimilarityIndexError::InsertError("index lock poisoned".to_string()))?;
        inner.hnsw.insert((&data, chunk_id as usize));
        inner.entries.insert(
            chunk_id,
            StoredEntry {
                vector: data,
                record,
            },
        );

        Ok(())
    }

    async fn query(
        &self,
        vector: &[f32],
        top_n: usize,
    ) -> Result<Vec<IndexHit>, SimilarityIndexError> {
        if vector.len() != self.dimension {
            return Err(SimilarityIndexError::InvalidDimension {
                expected: self.dimension,
                actual: vector.len(),
            });
        }

        let inner = self
            .inner
            .read()
            .map_err(|_| SimilarityIndexError::SearchError("index lock poisoned".to_string()))?;

        if inner.entries.is_empty() || top_n == 0 {
            return Ok(Vec::new());
        }

        let neighbours = inner.hnsw.search(vector, top_n, self.ef_search);

        // A superseded id can surface more than once; keep the best score.
        let mut best: AHashMap<u64, f32> = AHashMap::new();
        for neighbour in neighbours {
            let id = neighbour.d_id as u64;
            if !inner.entries.contains_key(&id) {
                continue;
            }
            let score = 1.0 - neighbour.distance;
            let slot = best.entry(id).or_insert(score);
            if score > *slot {
                *slot = score;
            }
        }

        let mut hits: Vec<IndexHit> = best
            .into_iter()
            .map(|(chunk_id, score)| IndexHit {
                chunk_id,
                score,
                record: inner.entries[&chunk_id].record.clone(),
            })
            .collect();

        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        hits.truncate(top_n);

        Ok(hits)
    }

    async fn clear(&self) -> Result<(), SimilarityIndexError> {
        let mut inner = self
            .inner
            .write()
            .map_err(|_| SimilarityIndexError::Unavailable("index lock poisoned".to_string()))?;
        inner.hnsw = Self::fresh_graph(self.dimension, self.ef_construction, self.m);
        inner.entries.clear();
        Ok(())
    }

    async fn len(&self) -> u64 {
        self.inner.read().map_or(0, |inner| inner.entries.len() as u64)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}
