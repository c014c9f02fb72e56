//! Result deduplication by source
//!
//! The sorted candidate list usually contains several chunks from the same
//! document. Results prefer source diversity: the first (highest-scoring)
//! chunk per source wins, and chunks from already-seen sources are used only
//! to backfill when fewer than `k` distinct sources exist among the
//! candidates.

use crate::retrieval::ScoredCandidate;
use ahash::AHashSet;

/// Select up to `k` candidates from a score-sorted list, preferring distinct
/// sources and backfilling from already-seen sources in score order.
///
/// The input order (descending final score) is preserved in the output.
pub fn select_diverse(candidates: Vec<ScoredCandidate>, k: usize) -> Vec<ScoredCandidate> {
    let mut picked = vec![false; candidates.len()];
    let mut seen_sources: AHashSet<&str> = AHashSet::new();
    let mut count = 0usize;

    // First pass: one chunk per source.
    for (i, candidate) in candidates.iter().enumerate() {
        if count == k {
            break;
        }
        if seen_sources.insert(candidate.record.source_id.as_str()) {
            picked[i] = true;
            count += 1;
        }
    }

    // Backfill: take skipped chunks in score order until k results or the
    // candidates run out.
    if count < k {
        for slot in picked.iter_mut() {
            if count == k {
                break;
            }
            if !*slot {
                *slot = true;
                count += 1;
            }
        }
    }

    candidates
        .into_iter()
        .zip(picked)
        .filter_map(|(candidate, keep)| keep.then_some(candidate))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::ChunkRecord;

    fn candidate(chunk_id: u64, source: &str, rank: usize, score: f32) -> ScoredCandidate {
        ScoredCandidate {
            chunk_id,
            record: ChunkRecord {
                source_id: source.to_string(),
                text: format!("{source} chunk {chunk_id}"),
                chunk_index: 0,
            },
            semantic_rank: rank,
            semantic_score: score,
            keyword_boost: 0.0,
            final_score: score,
        }
    }

    #[test]
    fn test_prefers_distinct_sources() {
        let sorted = vec![
            candidate(1, "a.txt", 0, 0.9),
            candidate(2, "a.txt", 1, 0.8),
            candidate(3, "b.txt", 2, 0.7),
            candidate(4, "c.txt", 3, 0.6),
        ];

        let selected = select_diverse(sorted, 3);

        let sources: Vec<&str> = selected.iter().map(|c| c.record.source_id.as_str()).collect();
        assert_eq!(sources, vec!["a.txt", "b.txt", "c.txt"]);
        assert_eq!(selected[0].chunk_id, 1); // highest-scoring a.txt chunk
    }

    #[test]
    fn test_backfills_when_sources_run_out() {
        let sorted = vec![
            candidate(1, "a.txt", 0, 0.9),
            candidate(2, "a.txt", 1, 0.8),
            candidate(3, "b.txt", 2, 0.7),
            candidate(4, "b.txt", 3, 0.6),
        ];

        let selected = select_diverse(sorted, 3);

        assert_eq!(selected.len(), 3);
        // Two distinct sources first, then the best skipped chunk.
        assert_eq!(selected[0].chunk_id, 1);
        assert_eq!(selected[1].chunk_id, 2);
        assert_eq!(selected[2].chunk_id, 3);
    }

    #[test]
    fn test_output_preserves_descending_order() {
        let sorted = vec![
            candidate(1, "a.txt", 0, 0.9),
            candidate(2, "b.txt", 1, 0.8),
            candidate(3, "a.txt", 2, 0.7),
            candidate(4, "c.txt", 3, 0.6),
            candidate(5, "b.txt", 4, 0.5),
        ];

        let selected = select_diverse(sorted, 4);

        for pair in selected.windows(2) {
            assert!(pair[0].final_score >= pair[1].final_score);
        }
    }

    #[test]
    fn test_fewer_candidates_than_k() {
        let sorted = vec![candidate(1, "a.txt", 0, 0.9)];
        let selected = select_diverse(sorted, 5);
        assert_eq!(selected.len(), 1);
    }

    #[test]
    fn test_k_zero() {
        let sorted = vec![candidate(1, "a.txt", 0, 0.9)];
        assert!(select_diverse(sorted, 0).is_empty());
    }
}
