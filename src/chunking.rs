//! Document chunking.
//!
//! This module provides the [`Chunker`] trait and [`RecursiveChunker`],
//! which splits hierarchically by paragraphs, sentences, then words, and
//! falls back to character windows with overlap for unbreakable runs.

use crate::document::{DocumentSegment, NewChunk};

/// Separator hierarchy tried in order: paragraphs, sentence ends, words.
const SEPARATORS: [&str; 5] = ["\n\n", ". ", "! ", "? ", " "];

/// A strategy for splitting loaded document segments into chunks.
///
/// Implementations produce [`NewChunk`]s with text, inherited metadata, and
/// a document-wide contiguous `chunk_index`, but no embeddings — those are
/// attached later by the ingestion coordinator. Chunking is deterministic:
/// the same segments and configuration always yield the same sequence.
pub trait Chunker: Send + Sync {
    /// Split a document's segments into ordered chunks.
    ///
    /// Returns an empty `Vec` when every segment is blank. Each returned
    /// chunk has an empty embedding vector.
    fn chunk(&self, segments: &[DocumentSegment]) -> Vec<NewChunk>;
}

/// Splits text hierarchically: paragraphs → sentences → words.
///
/// Segments are merged up to `chunk_size` characters; a segment that still
/// exceeds the bound at the last level is cut into character windows with
/// `chunk_overlap` characters of overlap. Sizes are measured in characters,
/// so multi-byte text never splits inside a code point.
///
/// # Example
///
/// ```rust,ignore
/// use docrag::RecursiveChunker;
///
/// let chunker = RecursiveChunker::new(1000, 200);
/// let chunks = chunker.chunk(&segments);
/// ```
#[derive(Debug, Clone)]
pub struct RecursiveChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl RecursiveChunker {
    /// Create a new `RecursiveChunker`.
    ///
    /// # Arguments
    ///
    /// * `chunk_size` — maximum number of characters per chunk
    /// * `chunk_overlap` — number of overlapping characters between
    ///   consecutive character-window chunks
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self { chunk_size, chunk_overlap }
    }
}

impl Chunker for RecursiveChunker {
    fn chunk(&self, segments: &[DocumentSegment]) -> Vec<NewChunk> {
        let mut chunks = Vec::new();
        let mut chunk_index = 0i64;

        for segment in segments {
            if segment.text.trim().is_empty() {
                continue;
            }
            for text in
                split_and_merge(&segment.text, self.chunk_size, self.chunk_overlap, &SEPARATORS)
            {
                chunks.push(NewChunk {
                    text,
                    metadata: segment.metadata.clone(),
                    chunk_index,
                    embedding: Vec::new(),
                });
                chunk_index += 1;
            }
        }

        chunks
    }
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Split text by a separator, then merge pieces into chunks that respect
/// `chunk_size`. A piece that exceeds `chunk_size` is split further using
/// the next-level separator.
fn split_and_merge(
    text: &str,
    chunk_size: usize,
    chunk_overlap: usize,
    separators: &[&str],
) -> Vec<String> {
    if char_len(text) <= chunk_size || separators.is_empty() {
        return split_by_size(text, chunk_size, chunk_overlap);
    }

    let separator = separators[0];
    let remaining_separators = &separators[1..];

    let pieces: Vec<&str> = if separator == " " {
        text.split_inclusive(' ').collect()
    } else {
        split_keeping_separator(text, separator)
    };

    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;

    let flush = |current: &mut String, chunks: &mut Vec<String>| {
        if char_len(current) > chunk_size {
            chunks.extend(split_and_merge(current, chunk_size, chunk_overlap, remaining_separators));
        } else if !current.is_empty() {
            chunks.push(std::mem::take(current));
        }
        current.clear();
    };

    for piece in pieces {
        let piece_len = char_len(piece);
        if current.is_empty() {
            current.push_str(piece);
            current_len = piece_len;
        } else if current_len + piece_len <= chunk_size {
            current.push_str(piece);
            current_len += piece_len;
        } else {
            flush(&mut current, &mut chunks);
            current.push_str(piece);
            current_len = piece_len;
        }
    }
    flush(&mut current, &mut chunks);

    chunks
}

/// Split text at a separator while keeping the separator attached to the
/// preceding piece.
fn split_keeping_separator<'a>(text: &'a str, separator: &str) -> Vec<&'a str> {
    let mut result = Vec::new();
    let mut start = 0;

    while let Some(pos) = text[start..].find(separator) {
        let end = start + pos + separator.len();
        result.push(&text[start..end]);
        start = end;
    }

    if start < text.len() {
        result.push(&text[start..]);
    }

    result
}

/// Character-window splitting with overlap; the last resort for text with
/// no usable separators. Window arithmetic is done in characters and mapped
/// back to byte offsets, so slicing always lands on a char boundary.
fn split_by_size(text: &str, chunk_size: usize, chunk_overlap: usize) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }

    let boundaries: Vec<usize> = text.char_indices().map(|(i, _)| i).collect();
    let total_chars = boundaries.len();

    let mut chunks = Vec::new();
    let mut start = 0;

    while start < total_chars {
        let end = (start + chunk_size).min(total_chars);
        let byte_start = boundaries[start];
        let byte_end = if end == total_chars { text.len() } else { boundaries[end] };
        chunks.push(text[byte_start..byte_end].to_string());

        let step = chunk_size.saturating_sub(chunk_overlap);
        if step == 0 {
            break;
        }
        start += step;
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Metadata;
    use serde_json::json;

    fn segment(text: &str) -> DocumentSegment {
        DocumentSegment::new(text)
    }

    #[test]
    fn short_text_yields_single_chunk() {
        let chunker = RecursiveChunker::new(100, 20);
        let chunks = chunker.chunk(&[segment("a short paragraph")]);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "a short paragraph");
        assert_eq!(chunks[0].chunk_index, 0);
        assert!(chunks[0].embedding.is_empty());
    }

    #[test]
    fn blank_segments_produce_no_chunks() {
        let chunker = RecursiveChunker::new(100, 20);
        assert!(chunker.chunk(&[segment("   \n\n  ")]).is_empty());
        assert!(chunker.chunk(&[]).is_empty());
    }

    #[test]
    fn every_chunk_respects_the_size_bound() {
        let chunker = RecursiveChunker::new(50, 10);
        let text = "The quick brown fox jumps over the lazy dog. ".repeat(20);
        let chunks = chunker.chunk(&[segment(&text)]);
        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.text.chars().count() <= 50, "oversized chunk: {:?}", chunk.text);
        }
    }

    #[test]
    fn paragraphs_are_preferred_split_points() {
        let chunker = RecursiveChunker::new(30, 5);
        let chunks = chunker.chunk(&[segment("first paragraph here\n\nsecond paragraph here")]);
        assert_eq!(chunks.len(), 2);
        assert!(chunks[0].text.starts_with("first paragraph"));
        assert!(chunks[1].text.starts_with("second paragraph"));
    }

    #[test]
    fn chunk_indices_are_contiguous_across_segments() {
        let chunker = RecursiveChunker::new(25, 5);
        let chunks = chunker.chunk(&[
            segment("sentence one goes here. sentence two goes here."),
            segment("sentence three goes here. sentence four goes here."),
        ]);
        let indices: Vec<i64> = chunks.iter().map(|c| c.chunk_index).collect();
        assert_eq!(indices, (0..chunks.len() as i64).collect::<Vec<_>>());
    }

    #[test]
    fn chunks_inherit_segment_metadata() {
        let mut metadata = Metadata::new();
        metadata.insert("page".to_string(), json!(4));
        let chunker = RecursiveChunker::new(100, 20);
        let chunks =
            chunker.chunk(&[DocumentSegment { text: "page body".to_string(), metadata }]);
        assert_eq!(chunks[0].metadata.get("page"), Some(&json!(4)));
    }

    #[test]
    fn character_windows_overlap() {
        let text: String = ('a'..='z').cycle().take(100).collect();
        let chunks = split_by_size(&text, 40, 10);
        assert!(chunks.len() > 1);
        for window in chunks.windows(2) {
            let tail: String = window[0].chars().rev().take(10).collect::<Vec<_>>()
                .into_iter().rev().collect();
            assert!(window[1].starts_with(&tail));
        }
    }

    #[test]
    fn multibyte_text_never_splits_inside_a_code_point() {
        let text = "日本語のテキスト。".repeat(40);
        let chunker = RecursiveChunker::new(30, 5);
        // Panics on a byte-offset slice if boundaries are wrong.
        let chunks = chunker.chunk(&[segment(&text)]);
        assert!(!chunks.is_empty());
        for chunk in &chunks {
            assert!(chunk.text.chars().count() <= 30);
        }
    }

    #[test]
    fn chunking_is_deterministic() {
        let chunker = RecursiveChunker::new(50, 10);
        let text = "Sentences repeat. ".repeat(30);
        let first = chunker.chunk(&[segment(&text)]);
        let second = chunker.chunk(&[segment(&text)]);
        assert_eq!(first, second);
    }
}
