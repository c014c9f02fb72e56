//! Hybrid retriever combining semantic similarity and keyword evidence

use crate::config::RetrievalConfig;
use crate::embedding::EmbeddingProvider;
use crate::index::SimilarityIndex;
use crate::retrieval::{
    select_diverse, KeywordBooster, RetrievalResult, RetrieveError, RetrievedChunk,
    ScoredCandidate,
};
use std::cmp::Ordering;
use std::sync::Arc;
use tokio::time::timeout;

/// Hybrid retriever over a stable index generation
///
/// Holds no mutable state: `retrieve` is `&self` and any number of calls may
/// run concurrently. The embed and index-query calls are the only suspension
/// points; both run under the configured request timeout and an in-flight
/// call is abandoned by dropping the future.
pub struct HybridRetriever {
    provider: Arc<dyn EmbeddingProvider>,
    index: Arc<dyn SimilarityIndex>,
    booster: KeywordBooster,
    config: RetrievalConfig,
}

impl HybridRetriever {
    pub fn new(
        provider: Arc<dyn EmbeddingProvider>,
        index: Arc<dyn SimilarityIndex>,
        config: RetrievalConfig,
    ) -> Self {
        let booster = KeywordBooster::new(config.boost.clone());
        Self {
            provider,
            index,
            booster,
            config,
        }
    }

    /// Retrieve the `k` most relevant chunks for a query.
    ///
    /// Failures of the embedding provider or the similarity index are fatal
    /// for the call; there is no fallback to a stale or empty result.
    pub async fn retrieve(
        &self,
        query_text: &str,
        k: usize,
    ) -> Result<RetrievalResult, RetrieveError> {
        if query_text.trim().is_empty() {
            return Err(RetrieveError::InvalidQuery(
                "query text is empty".to_string(),
            ));
        }
        if k == 0 {
            return Ok(RetrievalResult::default());
        }

        let request_timeout = self.config.request_timeout();

        // Step 1: embed the query
        let query_vector = timeout(request_timeout, self.provider.embed(query_text))
            .await
            .map_err(|_| {
                RetrieveError::EmbeddingFailure(format!(
                    "embedding timed out after {}ms",
                    request_timeout.as_millis()
                ))
            })?
            .map_err(|e| RetrieveError::EmbeddingFailure(e.to_string()))?;

        // Step 2: semantic candidates, over-fetched so the keyword boost has
        // room to re-rank
        if self.index.len().await == 0 {
            return Err(RetrieveError::IndexUnavailable(
                "index is empty; run `quarry index` first".to_string(),
            ));
        }

        let top_n = k.max(self.config.min_candidates);
        let hits = timeout(request_timeout, self.index.query(&query_vector, top_n))
            .await
            .map_err(|_| {
                RetrieveError::IndexUnavailable(format!(
                    "index query timed out after {}ms",
                    request_timeout.as_millis()
                ))
            })?
            .map_err(|e| RetrieveError::IndexUnavailable(e.to_string()))?;

        // Step 3: score fusion
        let mut candidates: Vec<ScoredCandidate> = hits
            .into_iter()
            .enumerate()
            .map(|(semantic_rank, hit)| {
                let keyword_boost = self.booster.boost(query_text, &hit.record.text);
                ScoredCandidate {
                    chunk_id: hit.chunk_id,
                    semantic_rank,
                    semantic_score: hit.score,
                    keyword_boost,
                    final_score: hit.score + keyword_boost,
                    record: hit.record,
                }
            })
            .collect();

        // Step 4: stable sort, so exact ties keep their semantic order
        candidates.sort_by(|a, b| {
            b.final_score
                .partial_cmp(&a.final_score)
                .unwrap_or(Ordering::Equal)
        });

        // Step 5: deduplicate by source and truncate to k
        let selected = select_diverse(candidates, k);

        tracing::debug!(
            query_len = query_text.len(),
            results = selected.len(),
            "retrieval complete"
        );

        Ok(RetrievalResult {
            entries: selected
                .into_iter()
                .map(|candidate| RetrievedChunk {
                    text: candidate.record.text,
                    source_id: candidate.record.source_id,
                    score: candidate.final_score,
                })
                .collect(),
        })
    }
}
