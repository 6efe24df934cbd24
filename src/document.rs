//! Data types for documents, chunks, scored candidates, and answers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Structured chunk metadata: arbitrary key/value pairs inherited from the
/// document loader (e.g. `page`, `created_at`).
pub type Metadata = Map<String, Value>;

/// A stored document record.
///
/// A document is created atomically together with all of its chunks, or not
/// at all, and is immutable afterwards except for deletion (which cascades
/// to its chunks).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    /// Store-assigned identifier.
    pub id: i64,
    /// Human-readable title supplied at ingestion time.
    pub title: String,
    /// Path of the source file the document was ingested from.
    pub filepath: String,
    /// When the document was ingested.
    pub uploaded_at: DateTime<Utc>,
}

/// A segment of extracted document text as produced by the loader.
///
/// Page-aware formats produce one segment per page with a `page` metadata
/// entry; flat formats produce a single segment with empty metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentSegment {
    /// The extracted text.
    pub text: String,
    /// Provenance metadata inherited by every chunk cut from this segment.
    pub metadata: Metadata,
}

impl DocumentSegment {
    /// Create a segment with empty metadata.
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into(), metadata: Metadata::new() }
    }
}

/// A chunk prepared for persistence: text, metadata, ordinal position, and
/// (once the embedding provider has run) the embedding vector.
///
/// The chunker produces these with an empty embedding; the ingestion
/// coordinator attaches embeddings batch by batch before writing.
#[derive(Debug, Clone, PartialEq)]
pub struct NewChunk {
    /// The chunk text.
    pub text: String,
    /// Metadata inherited from the source segment.
    pub metadata: Metadata,
    /// Zero-based position within the document; contiguous and strictly
    /// increasing in original document order.
    pub chunk_index: i64,
    /// The embedding vector; empty until the coordinator attaches it.
    pub embedding: Vec<f32>,
}

/// A stored chunk as returned by retrieval.
///
/// Embeddings are write-only: they are persisted and searched against, but
/// never materialized back into read-side values.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chunk {
    /// Store-assigned identifier.
    pub id: i64,
    /// The owning document.
    pub document_id: i64,
    /// The chunk text.
    pub text: String,
    /// Structured metadata. A missing or malformed stored value always
    /// deserializes to an empty map — see [`metadata_from_value`].
    pub metadata: Metadata,
    /// Zero-based position within the owning document.
    pub chunk_index: i64,
}

impl Chunk {
    /// The page number recorded by the loader, if any.
    ///
    /// Absence is explicit: a chunk from a format without page provenance
    /// returns `None` rather than a default page.
    pub fn page(&self) -> Option<f64> {
        self.metadata.get("page").and_then(Value::as_f64)
    }

    /// The creation timestamp recorded in metadata, in milliseconds since
    /// the Unix epoch, if any.
    ///
    /// Accepts either an RFC 3339 string or a numeric epoch-millisecond
    /// value; anything else is treated as absent.
    pub fn created_at_millis(&self) -> Option<i64> {
        match self.metadata.get("created_at") {
            Some(Value::String(s)) => {
                DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.timestamp_millis())
            }
            Some(value) => value.as_i64(),
            None => None,
        }
    }
}

/// Convert a raw stored metadata value into a [`Metadata`] map.
///
/// This is a documented contract, not an incidental fallback: a missing
/// value, a non-object value, or a malformed JSON blob all yield an empty
/// map deterministically, so metadata problems never fail a read path.
pub fn metadata_from_value(value: Option<Value>) -> Metadata {
    match value {
        Some(Value::Object(map)) => map,
        Some(Value::String(raw)) => match serde_json::from_str::<Value>(&raw) {
            Ok(Value::Object(map)) => map,
            _ => Metadata::new(),
        },
        _ => Metadata::new(),
    }
}

/// The per-signal score breakdown attached to a re-ranked chunk.
///
/// Every component is in `[0, 1]` before weighting; the composite score is
/// their convex combination.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ScoreBreakdown {
    /// Raw cosine-derived similarity from retrieval.
    pub semantic: f32,
    /// Earlier chunks in a document score higher.
    pub position: f32,
    /// Earlier pages score higher; 0 when page metadata is absent.
    pub page: f32,
    /// Newer chunks score higher; 0 when timestamp metadata is absent.
    pub recency: f32,
    /// Triangular preference for medium-length chunks.
    pub length: f32,
    /// Fraction of query terms literally present in the chunk text.
    pub query_term_match: f32,
}

/// A retrieved [`Chunk`] paired with relevance scores.
///
/// After retrieval `score` equals `similarity` (the raw cosine-derived
/// signal). After re-ranking `score` is the composite and `breakdown`
/// carries the contributing signal values; `similarity` always preserves
/// the raw semantic score for observability.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoredChunk {
    /// The retrieved chunk.
    pub chunk: Chunk,
    /// The score downstream ordering uses (higher is more relevant).
    pub score: f32,
    /// The raw semantic similarity from retrieval, in `[0, 1]`.
    pub similarity: f32,
    /// Per-signal breakdown; present only after re-ranking.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub breakdown: Option<ScoreBreakdown>,
}

impl ScoredChunk {
    /// Wrap a freshly retrieved chunk with its raw similarity score.
    pub fn retrieved(chunk: Chunk, similarity: f32) -> Self {
        Self { chunk, score: similarity, similarity, breakdown: None }
    }
}

/// The final output of a query: the synthesized answer plus provenance.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnswerResult {
    /// The generated answer text, verbatim from the provider (or the fixed
    /// fallback when no chunks matched).
    pub answer: String,
    /// Ids of the chunks actually included in the generation prompt.
    pub used_chunks: Vec<i64>,
    /// The full ranked candidate list, for UI and debugging transparency.
    pub all_chunks: Vec<ScoredChunk>,
}

/// The result of a successful ingestion.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct IngestReceipt {
    /// The id of the newly created document.
    pub document_id: i64,
    /// How many chunks were persisted for it.
    pub chunk_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn chunk_with_metadata(metadata: Metadata) -> Chunk {
        Chunk { id: 1, document_id: 1, text: "text".to_string(), metadata, chunk_index: 0 }
    }

    #[test]
    fn malformed_metadata_falls_back_to_empty_map() {
        assert!(metadata_from_value(None).is_empty());
        assert!(metadata_from_value(Some(json!("not json at all"))).is_empty());
        assert!(metadata_from_value(Some(json!([1, 2, 3]))).is_empty());
        assert!(metadata_from_value(Some(json!(42))).is_empty());
    }

    #[test]
    fn stringified_object_metadata_is_parsed() {
        let map = metadata_from_value(Some(json!(r#"{"page": 3}"#)));
        assert_eq!(map.get("page"), Some(&json!(3)));
    }

    #[test]
    fn page_is_absent_without_metadata() {
        let chunk = chunk_with_metadata(Metadata::new());
        assert_eq!(chunk.page(), None);
    }

    #[test]
    fn created_at_accepts_rfc3339_and_epoch_millis() {
        let mut metadata = Metadata::new();
        metadata.insert("created_at".to_string(), json!("2024-03-01T00:00:00Z"));
        let chunk = chunk_with_metadata(metadata);
        assert_eq!(chunk.created_at_millis(), Some(1_709_251_200_000));

        let mut metadata = Metadata::new();
        metadata.insert("created_at".to_string(), json!(1_709_251_200_000i64));
        let chunk = chunk_with_metadata(metadata);
        assert_eq!(chunk.created_at_millis(), Some(1_709_251_200_000));
    }

    #[test]
    fn retrieved_chunk_starts_with_similarity_as_score() {
        let scored = ScoredChunk::retrieved(chunk_with_metadata(Metadata::new()), 0.75);
        assert_eq!(scored.score, 0.75);
        assert_eq!(scored.similarity, 0.75);
        assert!(scored.breakdown.is_none());
    }
}
