//! Overlap-preserving document chunking
//!
//! Splits raw document text into bounded-length segments by recursively
//! trying a priority-ordered list of separators, then greedily merging the
//! resulting pieces. Each chunk after the first is prefixed with the trailing
//! `overlap` characters of the text covered so far, so consecutive chunks
//! share exactly `overlap` characters whenever the document is long enough.
//! Lengths are counted in characters, never bytes.

use crate::corpus::Document;

/// Default maximum chunk length in characters
pub const DEFAULT_MAX_LENGTH: usize = 1000;

/// Default overlap between consecutive chunks in characters
pub const DEFAULT_OVERLAP: usize = 200;

/// Separator priority: paragraph break, line break, sentence end, word break.
/// Character-level splitting is the fallback when all of these are exhausted.
const SEPARATORS: [&str; 6] = ["\n\n", "\n", ". ", "! ", "? ", " "];

/// A bounded contiguous slice of a document, the unit indexed and retrieved
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    /// Parent document id
    pub source_id: String,

    /// Position of this chunk within the document's chunk sequence
    pub chunk_index: usize,

    /// Chunk text, including the overlap prefix for chunks after the first
    pub text: String,
}

impl Chunk {
    /// Length of the chunk text in characters
    pub fn char_length(&self) -> usize {
        self.text.chars().count()
    }
}

/// Splits document text into overlapping bounded-length chunks
#[derive(Debug, Clone)]
pub struct Chunker {
    max_length: usize,
    overlap: usize,
}

impl Default for Chunker {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_LENGTH, DEFAULT_OVERLAP)
    }
}

impl Chunker {
    /// Create a chunker. `overlap` must be smaller than `max_length`; the
    /// config validator enforces this before a chunker is ever built.
    pub fn new(max_length: usize, overlap: usize) -> Self {
        debug_assert!(overlap < max_length, "overlap must be < max_length");
        Self {
            max_length,
            overlap,
        }
    }

    /// Split raw text into an ordered sequence of chunk texts.
    ///
    /// Documents no longer than `max_length` produce exactly one chunk with
    /// no overlap; empty or whitespace-only documents produce zero chunks.
    /// Identical input always yields an identical chunk sequence.
    pub fn split(&self, text: &str) -> Vec<String> {
        if text.trim().is_empty() {
            return Vec::new();
        }
        if char_len(text) <= self.max_length {
            return vec![text.to_string()];
        }

        // Spans after the first must leave room for the overlap prefix so no
        // chunk exceeds max_length.
        let span_budget = self.max_length.saturating_sub(self.overlap).max(1);
        let pieces = split_pieces(text, &SEPARATORS, span_budget);

        // Greedy merge: adjacent pieces accumulate until the next one would
        // overflow the span budget. The first span may use the full
        // max_length since it carries no prefix.
        let mut spans: Vec<String> = Vec::new();
        let mut current = String::new();
        let mut current_len = 0usize;
        for piece in pieces {
            let piece_len = char_len(&piece);
            let budget = if spans.is_empty() {
                self.max_length
            } else {
                span_budget
            };
            if current_len > 0 && current_len + piece_len > budget {
                spans.push(std::mem::take(&mut current));
                current_len = 0;
            }
            current.push_str(&piece);
            current_len += piece_len;
        }
        if !current.is_empty() {
            spans.push(current);
        }

        // Prefix every span after the first with the trailing `overlap`
        // characters of the text covered so far.
        let mut chunks = Vec::with_capacity(spans.len());
        let mut covered = 0usize;
        for (i, span) in spans.into_iter().enumerate() {
            let span_len = char_len(&span);
            if i == 0 {
                chunks.push(span);
            } else {
                let take = self.overlap.min(covered);
                let start = byte_offset(text, covered - take);
                let end = byte_offset(text, covered);
                let mut chunk = String::with_capacity(text[start..end].len() + span.len());
                chunk.push_str(&text[start..end]);
                chunk.push_str(&span);
                chunks.push(chunk);
            }
            covered += span_len;
        }
        chunks
    }

    /// Split a document into [`Chunk`]s carrying the source id and position
    pub fn chunk_document(&self, document: &Document) -> Vec<Chunk> {
        self.split(&document.text)
            .into_iter()
            .enumerate()
            .map(|(chunk_index, text)| Chunk {
                source_id: document.source_id.clone(),
                chunk_index,
                text,
            })
            .collect()
    }

    pub fn max_length(&self) -> usize {
        self.max_length
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }
}

/// Recursively split `text` into pieces of at most `budget` characters,
/// preferring the earliest separator in `separators` that applies. Separators
/// stay attached to the preceding piece, so concatenating the pieces
/// reconstructs `text` exactly.
fn split_pieces(text: &str, separators: &[&str], budget: usize) -> Vec<String> {
    if char_len(text) <= budget {
        return vec![text.to_string()];
    }

    let Some((separator, rest)) = separators.split_first() else {
        return split_every(text, budget);
    };

    let segments = split_keeping_separator(text, separator);
    if segments.len() == 1 {
        // Separator absent; try the next one down.
        return split_pieces(text, rest, budget);
    }

    let mut pieces = Vec::new();
    for segment in segments {
        if char_len(segment) <= budget {
            pieces.push(segment.to_string());
        } else {
            pieces.extend(split_pieces(segment, rest, budget));
        }
    }
    pieces
}

/// Split at every occurrence of `separator`, keeping the separator attached
/// to the preceding segment
fn split_keeping_separator<'a>(text: &'a str, separator: &str) -> Vec<&'a str> {
    let mut segments = Vec::new();
    let mut start = 0;

    while let Some(pos) = text[start..].find(separator) {
        let end = start + pos + separator.len();
        segments.push(&text[start..end]);
        start = end;
    }

    if start < text.len() {
        segments.push(&text[start..]);
    }

    segments
}

/// Character-level fallback: fixed windows of `budget` characters
fn split_every(text: &str, budget: usize) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut rest = text;
    while char_len(rest) > budget {
        let cut = byte_offset(rest, budget);
        pieces.push(rest[..cut].to_string());
        rest = &rest[cut..];
    }
    if !rest.is_empty() {
        pieces.push(rest.to_string());
    }
    pieces
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Byte offset of the `chars`-th character boundary
fn byte_offset(s: &str, chars: usize) -> usize {
    s.char_indices().nth(chars).map_or(s.len(), |(b, _)| b)
}
