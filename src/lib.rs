//! Quarry - Hybrid Document Retrieval
//!
//! Quarry splits a corpus of plain-text documents into overlapping chunks,
//! embeds them with a local sentence-embedding model, and answers queries by
//! fusing approximate semantic similarity with exact keyword evidence, so a
//! downstream generator can answer grounded questions over the corpus.

pub mod chunker;
pub mod cli;
pub mod config;
pub mod corpus;
pub mod embedding;
pub mod error;
pub mod index;
pub mod retrieval;

pub use error::{QuarryError, Result};
