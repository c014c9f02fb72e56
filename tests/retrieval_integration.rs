/// Retrieval Integration Test
///
/// Exercises the hybrid retriever end to end: score fusion, stable ordering,
/// source deduplication, and the error taxonomy. Uses deterministic test
/// doubles so no model download is needed.
use async_trait::async_trait;
use quarry::chunker::Chunker;
use quarry::config::{BoostConfig, RetrievalConfig};
use quarry::corpus::Document;
use quarry::embedding::{EmbeddingError, EmbeddingProvider};
use quarry::index::{
    ChunkRecord, HnswIndex, IndexHit, Indexer, SimilarityIndex, SimilarityIndexError,
};
use quarry::retrieval::{HybridRetriever, RetrieveError};
use std::sync::Arc;
use std::time::Duration;

const DIM: usize = 16;

fn mock_vector(text: &str) -> Vec<f32> {
    let mut v = vec![0.0f32; DIM];
    for b in text.bytes().filter(|b| b.is_ascii_alphanumeric()) {
        v[(b.to_ascii_lowercase() as usize) % DIM] += 1.0;
    }
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in &mut v {
            *x /= norm;
        }
    }
    v
}

struct MockProvider;

#[async_trait]
impl EmbeddingProvider for MockProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        Ok(mock_vector(text))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Ok(texts.iter().map(|t| mock_vector(t)).collect())
    }

    fn dimension(&self) -> usize {
        DIM
    }

    fn model_name(&self) -> &str {
        "mock"
    }
}

struct FailingProvider;

#[async_trait]
impl EmbeddingProvider for FailingProvider {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>, EmbeddingError> {
        Err(EmbeddingError::GenerationError("model offline".to_string()))
    }

    async fn embed_batch(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Err(EmbeddingError::GenerationError("model offline".to_string()))
    }

    fn dimension(&self) -> usize {
        DIM
    }

    fn model_name(&self) -> &str {
        "failing-mock"
    }
}

/// Serves a fixed candidate list so ranking behavior can be asserted exactly.
struct StaticIndex {
    hits: Vec<IndexHit>,
}

#[async_trait]
impl SimilarityIndex for StaticIndex {
    async fn upsert(
        &self,
        _chunk_id: u64,
        _vector: &[f32],
        _record: ChunkRecord,
    ) -> Result<(), SimilarityIndexError> {
        Ok(())
    }

    async fn query(
        &self,
        _vector: &[f32],
        top_n: usize,
    ) -> Result<Vec<IndexHit>, SimilarityIndexError> {
        Ok(self.hits.iter().take(top_n).cloned().collect())
    }

    async fn clear(&self) -> Result<(), SimilarityIndexError> {
        Ok(())
    }

    async fn len(&self) -> u64 {
        self.hits.len() as u64
    }

    fn dimension(&self) -> usize {
        DIM
    }
}

/// Reports a populated index but fails every query.
struct BrokenIndex;

#[async_trait]
impl SimilarityIndex for BrokenIndex {
    async fn upsert(
        &self,
        _chunk_id: u64,
        _vector: &[f32],
        _record: ChunkRecord,
    ) -> Result<(), SimilarityIndexError> {
        Ok(())
    }

    async fn query(
        &self,
        _vector: &[f32],
        _top_n: usize,
    ) -> Result<Vec<IndexHit>, SimilarityIndexError> {
        Err(SimilarityIndexError::Unavailable("index offline".to_string()))
    }

    async fn clear(&self) -> Result<(), SimilarityIndexError> {
        Ok(())
    }

    async fn len(&self) -> u64 {
        1
    }

    fn dimension(&self) -> usize {
        DIM
    }
}

fn hit(chunk_id: u64, source: &str, chunk_index: usize, score: f32, text: &str) -> IndexHit {
    IndexHit {
        chunk_id,
        score,
        record: ChunkRecord {
            source_id: source.to_string(),
            text: text.to_string(),
            chunk_index,
        },
    }
}

fn retrieval_config() -> RetrievalConfig {
    RetrievalConfig {
        top_k: 5,
        min_candidates: 10,
        request_timeout_secs: 5,
        boost: BoostConfig {
            important_terms: vec!["liquid glass".to_string()],
            ..BoostConfig::default()
        },
    }
}

fn retriever_over(hits: Vec<IndexHit>) -> HybridRetriever {
    HybridRetriever::new(
        Arc::new(MockProvider),
        Arc::new(StaticIndex { hits }),
        retrieval_config(),
    )
}

#[tokio::test]
async fn test_empty_query_rejected_before_io() {
    // The provider would fail loudly, so an InvalidQuery error proves the
    // query was rejected before any embedding happened.
    let retriever = HybridRetriever::new(
        Arc::new(FailingProvider),
        Arc::new(StaticIndex { hits: vec![] }),
        retrieval_config(),
    );

    for query in ["", "   ", "\n\t"] {
        let result = retriever.retrieve(query, 5).await;
        assert!(matches!(result, Err(RetrieveError::InvalidQuery(_))));
    }
}

#[tokio::test]
async fn test_empty_index_is_unavailable() {
    let retriever = retriever_over(vec![]);
    let result = retriever.retrieve("window tiling", 5).await;
    assert!(matches!(result, Err(RetrieveError::IndexUnavailable(_))));
}

#[tokio::test]
async fn test_embedding_failure_is_fatal() {
    let retriever = HybridRetriever::new(
        Arc::new(FailingProvider),
        Arc::new(StaticIndex {
            hits: vec![hit(1, "a.txt", 0, 0.9, "some text")],
        }),
        retrieval_config(),
    );

    let result = retriever.retrieve("window tiling", 5).await;
    assert!(matches!(result, Err(RetrieveError::EmbeddingFailure(_))));
}

#[tokio::test]
async fn test_index_failure_is_fatal() {
    let retriever = HybridRetriever::new(
        Arc::new(MockProvider),
        Arc::new(BrokenIndex),
        retrieval_config(),
    );

    let result = retriever.retrieve("window tiling", 5).await;
    assert!(matches!(result, Err(RetrieveError::IndexUnavailable(_))));
}

#[tokio::test]
async fn test_keyword_boost_reranks_close_candidates() {
    // Candidate 2 trails semantically but mentions the query terms and the
    // "liquid glass" important term: 0.78 + 0.25 > 0.80.
    let retriever = retriever_over(vec![
        hit(1, "compatibility.txt", 0, 0.80, "Supported hardware list."),
        hit(
            2,
            "whats-new.txt",
            0,
            0.78,
            "Liquid Glass is the new design language.",
        ),
    ]);

    let result = retriever.retrieve("liquid glass design", 2).await.unwrap();

    assert_eq!(result.entries[0].source_id, "whats-new.txt");
    assert!((result.entries[0].score - 1.03).abs() < 1e-5);
    assert_eq!(result.entries[1].source_id, "compatibility.txt");
    assert!((result.entries[1].score - 0.80).abs() < 1e-5);
}

#[tokio::test]
async fn test_boost_cannot_overcome_large_semantic_gap() {
    let retriever = retriever_over(vec![
        hit(1, "a.txt", 0, 0.95, "Nothing relevant here."),
        hit(2, "b.txt", 0, 0.50, "liquid glass design everywhere"),
    ]);

    let result = retriever.retrieve("liquid glass design", 2).await.unwrap();

    // 0.50 + 0.25 boost = 0.75 < 0.95.
    assert_eq!(result.entries[0].source_id, "a.txt");
}

#[tokio::test]
async fn test_exact_ties_keep_semantic_order() {
    let retriever = retriever_over(vec![
        hit(1, "a.txt", 0, 0.70, "no match one"),
        hit(2, "b.txt", 0, 0.70, "no match two"),
        hit(3, "c.txt", 0, 0.70, "no match three"),
    ]);

    let result = retriever.retrieve("zzz", 3).await.unwrap();

    let sources: Vec<&str> = result.entries.iter().map(|e| e.source_id.as_str()).collect();
    assert_eq!(sources, vec!["a.txt", "b.txt", "c.txt"]);
}

#[tokio::test]
async fn test_results_sorted_descending() {
    let retriever = retriever_over(vec![
        hit(1, "a.txt", 0, 0.61, "tiling"),
        hit(2, "b.txt", 0, 0.60, "nothing"),
        hit(3, "c.txt", 0, 0.59, "tiling windows"),
        hit(4, "d.txt", 0, 0.58, "nothing again"),
    ]);

    let result = retriever.retrieve("tiling windows", 4).await.unwrap();

    for pair in result.entries.windows(2) {
        assert!(pair[0].score >= pair[1].score);
    }
}

#[tokio::test]
async fn test_dedup_prefers_distinct_sources() {
    let retriever = retriever_over(vec![
        hit(1, "a.txt", 0, 0.90, "one"),
        hit(2, "a.txt", 1, 0.89, "two"),
        hit(3, "a.txt", 2, 0.88, "three"),
        hit(4, "b.txt", 0, 0.70, "four"),
        hit(5, "c.txt", 0, 0.60, "five"),
    ]);

    let result = retriever.retrieve("anything at all", 3).await.unwrap();

    let mut sources: Vec<&str> = result.entries.iter().map(|e| e.source_id.as_str()).collect();
    sources.sort();
    sources.dedup();
    assert_eq!(sources.len(), 3, "three distinct sources expected");
}

#[tokio::test]
async fn test_dedup_backfills_from_seen_sources() {
    let retriever = retriever_over(vec![
        hit(1, "a.txt", 0, 0.90, "one"),
        hit(2, "a.txt", 1, 0.89, "two"),
        hit(3, "b.txt", 0, 0.70, "three"),
    ]);

    // Only two distinct sources exist; k=3 backfills with the second a.txt
    // chunk rather than returning fewer results.
    let result = retriever.retrieve("anything at all", 3).await.unwrap();

    assert_eq!(result.len(), 3);
    for pair in result.entries.windows(2) {
        assert!(pair[0].score >= pair[1].score);
    }
}

#[tokio::test]
async fn test_truncates_to_k() {
    let hits: Vec<IndexHit> = (0..10)
        .map(|i| {
            hit(
                i,
                &format!("doc{i}.txt"),
                0,
                0.9 - i as f32 * 0.01,
                "text",
            )
        })
        .collect();
    let retriever = retriever_over(hits);

    let result = retriever.retrieve("anything", 4).await.unwrap();
    assert_eq!(result.len(), 4);
}

#[tokio::test]
async fn test_k_zero_returns_empty() {
    let retriever = retriever_over(vec![hit(1, "a.txt", 0, 0.9, "text")]);
    let result = retriever.retrieve("anything", 0).await.unwrap();
    assert!(result.is_empty());
}

#[tokio::test]
async fn test_retrieval_is_deterministic() {
    let retriever = retriever_over(vec![
        hit(1, "a.txt", 0, 0.80, "Liquid Glass rollout notes"),
        hit(2, "b.txt", 0, 0.79, "window tiling shortcuts"),
        hit(3, "c.txt", 0, 0.78, "display flicker fix"),
    ]);

    let first = retriever.retrieve("liquid glass design", 3).await.unwrap();
    let second = retriever.retrieve("liquid glass design", 3).await.unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_end_to_end_index_then_retrieve() {
    let documents = vec![
        Document::new(
            "whats-new.txt",
            "Liquid Glass is the new design language, a translucent material \
             applied across windows, menus and controls. "
                .repeat(5),
        ),
        Document::new(
            "compatibility.txt",
            "Supported hardware includes recent laptops and desktops. Older \
             machines stay on the previous release. "
                .repeat(5),
        ),
        Document::new(
            "release-notes.txt",
            "Resolved an issue where external displays could flicker after \
             waking from sleep. "
                .repeat(5),
        ),
    ];

    let index = Arc::new(HnswIndex::new(DIM, 200, 16, 50));
    let provider = Arc::new(MockProvider);
    let indexer = Indexer::new(
        Chunker::new(200, 50),
        provider.clone(),
        index.clone() as Arc<dyn SimilarityIndex>,
        32,
        Duration::from_secs(5),
    );

    let report = indexer.build_index(&documents).await.unwrap();
    assert!(report.is_clean());

    let retriever = HybridRetriever::new(provider, index, retrieval_config());

    let result = retriever.retrieve("liquid glass design", 3).await.unwrap();

    assert!(!result.is_empty());
    assert!(result.len() <= 3);
    for pair in result.entries.windows(2) {
        assert!(pair[0].score >= pair[1].score);
    }

    // Distinct sources preferred: three documents exist, so no duplicates.
    let mut sources: Vec<&str> = result.entries.iter().map(|e| e.source_id.as_str()).collect();
    let before = sources.len();
    sources.sort();
    sources.dedup();
    assert_eq!(sources.len(), before);

    // Same generation, same query, same result.
    let again = retriever.retrieve("liquid glass design", 3).await.unwrap();
    assert_eq!(result, again);
}
