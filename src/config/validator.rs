use crate::config::Config;
use crate::error::{QuarryError, Result, ValidationError};

/// Configuration validator
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the configuration
    pub fn validate(config: &Config) -> Result<()> {
        let mut errors = Vec::new();

        Self::validate_schema_version(config, &mut errors);
        Self::validate_corpus(config, &mut errors);
        Self::validate_chunking(config, &mut errors);
        Self::validate_embedding(config, &mut errors);
        Self::validate_indexing(config, &mut errors);
        Self::validate_retrieval(config, &mut errors);

        if errors.is_empty() {
            Ok(())
        } else {
            Err(QuarryError::ConfigValidation { errors })
        }
    }

    fn validate_schema_version(config: &Config, errors: &mut Vec<ValidationError>) {
        let version = &config.meta.schema_version;
        if version != "1.0.0" {
            errors.push(ValidationError::new(
                "_meta.schema_version",
                format!("Unsupported schema version: {}", version),
            ));
        }
    }

    fn validate_corpus(config: &Config, errors: &mut Vec<ValidationError>) {
        // Existence is not checked here; the directory may be created after
        // `quarry config init` and is validated when enumeration runs.
        if config.corpus.docs_dir.as_os_str().is_empty() {
            errors.push(ValidationError::new(
                "corpus.docs_dir",
                "Corpus directory path cannot be empty",
            ));
        }

        if config.storage.data_dir.as_os_str().is_empty() {
            errors.push(ValidationError::new(
                "storage.data_dir",
                "Data directory path cannot be empty",
            ));
        }
    }

    fn validate_chunking(config: &Config, errors: &mut Vec<ValidationError>) {
        if config.chunking.max_length == 0 {
            errors.push(ValidationError::new(
                "chunking.max_length",
                "Maximum chunk length must be greater than 0",
            ));
        }

        if config.chunking.overlap >= config.chunking.max_length {
            errors.push(ValidationError::new(
                "chunking.overlap",
                format!(
                    "Overlap ({}) must be smaller than max_length ({})",
                    config.chunking.overlap, config.chunking.max_length
                ),
            ));
        }
    }

    fn validate_embedding(config: &Config, errors: &mut Vec<ValidationError>) {
        if config.embedding.model.is_empty() {
            errors.push(ValidationError::new(
                "embedding.model",
                "Model name cannot be empty",
            ));
        }

        if config.embedding.batch_size == 0 {
            errors.push(ValidationError::new(
                "embedding.batch_size",
                "Batch size must be greater than 0",
            ));
        }

        if config.embedding.timeout_secs == 0 {
            errors.push(ValidationError::new(
                "embedding.timeout_secs",
                "Embedding timeout must be greater than 0",
            ));
        }
    }

    fn validate_indexing(config: &Config, errors: &mut Vec<ValidationError>) {
        if config.indexing.vector_dim == 0 {
            errors.push(ValidationError::new(
                "indexing.vector_dim",
                "Vector dimension must be greater than 0",
            ));
        }

        if config.indexing.hnsw_ef_construction == 0 {
            errors.push(ValidationError::new(
                "indexing.hnsw_ef_construction",
                "HNSW ef_construction must be greater than 0",
            ));
        }

        if config.indexing.hnsw_m == 0 {
            errors.push(ValidationError::new(
                "indexing.hnsw_m",
                "HNSW M must be greater than 0",
            ));
        }

        if config.indexing.hnsw_ef_search == 0 {
            errors.push(ValidationError::new(
                "indexing.hnsw_ef_search",
                "HNSW ef_search must be greater than 0",
            ));
        }
    }

    fn validate_retrieval(config: &Config, errors: &mut Vec<ValidationError>) {
        let retrieval = &config.retrieval;

        if retrieval.top_k == 0 {
            errors.push(ValidationError::new(
                "retrieval.top_k",
                "top_k must be greater than 0",
            ));
        }

        if retrieval.min_candidates == 0 {
            errors.push(ValidationError::new(
                "retrieval.min_candidates",
                "min_candidates must be greater than 0",
            ));
        }

        if retrieval.request_timeout_secs == 0 {
            errors.push(ValidationError::new(
                "retrieval.request_timeout_secs",
                "Request timeout must be greater than 0",
            ));
        }

        let boost = &retrieval.boost;
        if boost.per_word_boost < 0.0 {
            errors.push(ValidationError::new(
                "retrieval.boost.per_word_boost",
                "Per-word boost cannot be negative",
            ));
        }

        if boost.per_term_boost < 0.0 {
            errors.push(ValidationError::new(
                "retrieval.boost.per_term_boost",
                "Per-term boost cannot be negative",
            ));
        }

        if boost.boost_cap < 0.0 {
            errors.push(ValidationError::new(
                "retrieval.boost.boost_cap",
                "Boost cap cannot be negative",
            ));
        }

        for (i, term) in boost.important_terms.iter().enumerate() {
            if term.trim().is_empty() {
                errors.push(ValidationError::new(
                    format!("retrieval.boost.important_terms[{}]", i),
                    "Important term cannot be empty",
                ));
            }
        }
    }
}
