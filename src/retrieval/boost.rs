//! Keyword boost scoring
//!
//! Literal keyword evidence is an additive bonus on top of the semantic
//! score: a small amount per query word found in the chunk, more per curated
//! important term, clamped so the boost can reorder close semantic
//! candidates but never drown the semantic signal.

use crate::config::BoostConfig;
use ahash::AHashSet;
use regex::Regex;

/// Computes the keyword boost for query/chunk pairs
///
/// Stateless across calls; a single booster serves concurrent queries.
pub struct KeywordBooster {
    word_pattern: Regex,
    terms_lower: Vec<String>,
    config: BoostConfig,
}

impl KeywordBooster {
    pub fn new(config: BoostConfig) -> Self {
        let terms_lower = config
            .important_terms
            .iter()
            .map(|t| t.trim().to_lowercase())
            .filter(|t| !t.is_empty())
            .collect();

        Self {
            word_pattern: Regex::new(r"[a-z0-9]+").expect("hard-coded word pattern is valid"),
            terms_lower,
            config,
        }
    }

    /// Compute the boost for one candidate chunk.
    ///
    /// The query is tokenized into lowercase alphanumeric words; each
    /// distinct word found in the lowercased chunk text adds
    /// `per_word_boost`, each important term found adds `per_term_boost`,
    /// and the total is clamped to `[0, boost_cap]`.
    pub fn boost(&self, query: &str, chunk_text: &str) -> f32 {
        let haystack = chunk_text.to_lowercase();
        let query_lower = query.to_lowercase();

        let mut total = 0.0f32;

        let mut seen: AHashSet<&str> = AHashSet::new();
        for word_match in self.word_pattern.find_iter(&query_lower) {
            let word = word_match.as_str();
            if !seen.insert(word) {
                continue;
            }
            if haystack.contains(word) {
                total += self.config.per_word_boost;
            }
        }

        for term in &self.terms_lower {
            if haystack.contains(term.as_str()) {
                total += self.config.per_term_boost;
            }
        }

        total.clamp(0.0, self.config.boost_cap)
    }
}
