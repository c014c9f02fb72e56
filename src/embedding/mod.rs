//! Embedding generation
//!
//! Text is mapped to fixed-dimension vectors through the [`EmbeddingProvider`]
//! trait; [`FastEmbedProvider`] is the shipped local implementation
//! (all-MiniLM-L6-v2, 384 dimensions, no network calls at query time).

mod provider;

pub use provider::{EmbeddingError, EmbeddingProvider, FastEmbedProvider};
