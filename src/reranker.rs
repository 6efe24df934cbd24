//! Multi-signal re-ranking of retrieved chunks.
//!
//! Retrieval orders candidates by raw cosine similarity alone. The
//! [`WeightedReranker`] recombines that signal with five cheap structural
//! signals — position in the document, page number, metadata recency, text
//! length, and literal query-term overlap — into a composite score.

use async_trait::async_trait;
use tracing::debug;

use crate::document::{ScoreBreakdown, ScoredChunk};
use crate::error::Result;

/// A reranker that re-scores and reorders retrieval candidates.
///
/// Implementations must be pure functions of `(query, candidates)`:
/// identical inputs produce identical ordering and scores.
#[async_trait]
pub trait Reranker: Send + Sync {
    /// Rerank candidates given the original query.
    ///
    /// Returns the same number of results, ordered by descending composite
    /// score, with the raw similarity preserved on each candidate.
    async fn rerank(&self, query: &str, candidates: Vec<ScoredChunk>) -> Result<Vec<ScoredChunk>>;
}

/// Weights of the six signals. They sum to 1.0, so the composite score is a
/// convex combination of components each in `[0, 1]`.
const SEMANTIC_WEIGHT: f64 = 0.50;
const POSITION_WEIGHT: f64 = 0.15;
const PAGE_WEIGHT: f64 = 0.10;
const RECENCY_WEIGHT: f64 = 0.10;
const LENGTH_WEIGHT: f64 = 0.05;
const QUERY_TERM_MATCH_WEIGHT: f64 = 0.10;

/// The six-signal weighted reranker.
///
/// Stateless and deterministic. Ties in the composite score keep the
/// original candidate order (stable sort), so equal-scoring chunks stay in
/// descending raw-similarity order as retrieval returned them.
#[derive(Debug, Clone, Copy, Default)]
pub struct WeightedReranker;

/// Min-max normalize into `[0, 1]`; a degenerate set (`min == max`) pins
/// every value at 0.5 instead of dividing by zero.
fn normalize(value: f64, min: f64, max: f64) -> f64 {
    if min == max { 0.5 } else { (value - min) / (max - min) }
}

fn min_max(values: impl Iterator<Item = f64>) -> (f64, f64) {
    values.fold((f64::INFINITY, f64::NEG_INFINITY), |(min, max), v| (min.min(v), max.max(v)))
}

/// Lower-cased query terms split on non-word characters, keeping only terms
/// longer than two characters.
fn query_terms(query: &str) -> Vec<String> {
    query
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric() && c != '_')
        .filter(|term| term.chars().count() > 2)
        .map(str::to_string)
        .collect()
}

#[async_trait]
impl Reranker for WeightedReranker {
    async fn rerank(&self, query: &str, candidates: Vec<ScoredChunk>) -> Result<Vec<ScoredChunk>> {
        Ok(rerank_candidates(query, candidates))
    }
}

fn rerank_candidates(query: &str, candidates: Vec<ScoredChunk>) -> Vec<ScoredChunk> {
    if candidates.is_empty() {
        return candidates;
    }

    let terms = query_terms(query);

    // Candidate-set statistics for the normalized signals. Absent pages and
    // timestamps participate as 0, matching how their own scores treat
    // absence.
    let max_chunk_index =
        candidates.iter().map(|c| c.chunk.chunk_index).max().unwrap_or(0).max(0);
    let (page_min, page_max) =
        min_max(candidates.iter().map(|c| c.chunk.page().unwrap_or(0.0)));
    let (date_min, date_max) = min_max(
        candidates.iter().map(|c| c.chunk.created_at_millis().unwrap_or(0) as f64),
    );
    let (len_min, len_max) =
        min_max(candidates.iter().map(|c| c.chunk.text.chars().count() as f64));

    let mut reranked: Vec<ScoredChunk> = candidates
        .into_iter()
        .map(|candidate| {
            let semantic = candidate.similarity as f64;

            // Earlier chunks often carry introductions and summaries.
            let position_denominator = if max_chunk_index == 0 { 1 } else { max_chunk_index };
            let position =
                1.0 - candidate.chunk.chunk_index as f64 / position_denominator as f64;

            let page = match candidate.chunk.page() {
                Some(p) if p != 0.0 => 1.0 - normalize(p, page_min, page_max),
                _ => 0.0,
            };

            let recency = match candidate.chunk.created_at_millis() {
                Some(ts) => normalize(ts as f64, date_min, date_max),
                None => 0.0,
            };

            // Triangular preference: medium-length chunks over very short
            // or very long ones.
            let normalized_length =
                normalize(candidate.chunk.text.chars().count() as f64, len_min, len_max);
            let length = if normalized_length > 0.5 {
                1.0 - (normalized_length - 0.5) * 2.0
            } else {
                normalized_length * 2.0
            };

            let query_term_match = if terms.is_empty() {
                0.0
            } else {
                let text = candidate.chunk.text.to_lowercase();
                let matched = terms.iter().filter(|term| text.contains(term.as_str())).count();
                matched as f64 / terms.len() as f64
            };

            let composite = semantic * SEMANTIC_WEIGHT
                + position * POSITION_WEIGHT
                + page * PAGE_WEIGHT
                + recency * RECENCY_WEIGHT
                + length * LENGTH_WEIGHT
                + query_term_match * QUERY_TERM_MATCH_WEIGHT;

            ScoredChunk {
                score: composite as f32,
                similarity: candidate.similarity,
                breakdown: Some(ScoreBreakdown {
                    semantic: semantic as f32,
                    position: position as f32,
                    page: page as f32,
                    recency: recency as f32,
                    length: length as f32,
                    query_term_match: query_term_match as f32,
                }),
                chunk: candidate.chunk,
            }
        })
        .collect();

    // Stable sort: exact composite ties preserve original candidate order.
    reranked.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));

    debug!(candidate_count = reranked.len(), "reranked candidates");
    reranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Chunk, Metadata};
    use serde_json::json;

    fn candidate(id: i64, chunk_index: i64, text: &str, similarity: f32) -> ScoredChunk {
        ScoredChunk::retrieved(
            Chunk {
                id,
                document_id: 1,
                text: text.to_string(),
                metadata: Metadata::new(),
                chunk_index,
            },
            similarity,
        )
    }

    fn with_metadata(mut scored: ScoredChunk, key: &str, value: serde_json::Value) -> ScoredChunk {
        scored.chunk.metadata.insert(key.to_string(), value);
        scored
    }

    fn breakdown(scored: &ScoredChunk) -> ScoreBreakdown {
        scored.breakdown.expect("rerank must attach a breakdown")
    }

    #[test]
    fn output_length_equals_input_length() {
        let candidates = vec![
            candidate(1, 0, "alpha", 0.9),
            candidate(2, 1, "beta", 0.8),
            candidate(3, 2, "gamma", 0.7),
        ];
        let reranked = rerank_candidates("question", candidates);
        assert_eq!(reranked.len(), 3);
    }

    #[test]
    fn position_scores_for_indices_zero_five_ten() {
        let candidates = vec![
            candidate(1, 0, "aaa", 0.5),
            candidate(2, 5, "bbb", 0.5),
            candidate(3, 10, "ccc", 0.5),
        ];
        let reranked = rerank_candidates("", candidates);
        let by_id = |id: i64| {
            reranked.iter().find(|c| c.chunk.id == id).map(|c| breakdown(c).position).unwrap()
        };
        assert!((by_id(1) - 1.0).abs() < 1e-6);
        assert!((by_id(2) - 0.5).abs() < 1e-6);
        assert!((by_id(3) - 0.0).abs() < 1e-6);
    }

    #[test]
    fn single_chunk_at_index_zero_scores_full_position() {
        let reranked = rerank_candidates("", vec![candidate(1, 0, "only", 0.5)]);
        assert!((breakdown(&reranked[0]).position - 1.0).abs() < 1e-6);
    }

    #[test]
    fn query_term_match_counts_half_for_one_of_two_terms() {
        let reranked =
            rerank_candidates("invoice total", vec![candidate(1, 0, "Total amount due", 0.5)]);
        assert!((breakdown(&reranked[0]).query_term_match - 0.5).abs() < 1e-6);
    }

    #[test]
    fn short_query_terms_are_ignored() {
        // "is" and "of" are <= 2 chars; only "total" counts.
        let reranked =
            rerank_candidates("is of total", vec![candidate(1, 0, "the total sum", 0.5)]);
        assert!((breakdown(&reranked[0]).query_term_match - 1.0).abs() < 1e-6);
    }

    #[test]
    fn degenerate_min_max_pins_page_normalization_at_half() {
        // All candidates on the same nonzero page: normalize() returns 0.5,
        // so the page score is 1 - 0.5 for every candidate.
        let candidates = vec![
            with_metadata(candidate(1, 0, "aaa", 0.5), "page", json!(7)),
            with_metadata(candidate(2, 1, "bbb", 0.5), "page", json!(7)),
        ];
        let reranked = rerank_candidates("", candidates);
        for scored in &reranked {
            assert!((breakdown(scored).page - 0.5).abs() < 1e-6);
        }
    }

    #[test]
    fn absent_page_and_recency_score_zero() {
        let reranked = rerank_candidates("", vec![candidate(1, 0, "aaa", 0.5)]);
        let components = breakdown(&reranked[0]);
        assert_eq!(components.page, 0.0);
        assert_eq!(components.recency, 0.0);
    }

    #[test]
    fn newer_chunks_score_higher_on_recency() {
        let candidates = vec![
            with_metadata(candidate(1, 0, "old", 0.5), "created_at", json!("2023-01-01T00:00:00Z")),
            with_metadata(candidate(2, 1, "new", 0.5), "created_at", json!("2025-01-01T00:00:00Z")),
        ];
        let reranked = rerank_candidates("", candidates);
        let old = reranked.iter().find(|c| c.chunk.id == 1).unwrap();
        let new = reranked.iter().find(|c| c.chunk.id == 2).unwrap();
        assert!((breakdown(old).recency - 0.0).abs() < 1e-6);
        assert!((breakdown(new).recency - 1.0).abs() < 1e-6);
    }

    #[test]
    fn length_preference_peaks_at_the_middle() {
        let candidates = vec![
            candidate(1, 0, &"x".repeat(10), 0.5),
            candidate(2, 1, &"x".repeat(55), 0.5),
            candidate(3, 2, &"x".repeat(100), 0.5),
        ];
        let reranked = rerank_candidates("", candidates);
        let length_of = |id: i64| {
            reranked.iter().find(|c| c.chunk.id == id).map(|c| breakdown(c).length).unwrap()
        };
        assert!(length_of(2) > length_of(1));
        assert!(length_of(2) > length_of(3));
        // Extremes of the candidate set score exactly zero.
        assert!((length_of(1) - 0.0).abs() < 1e-6);
        assert!((length_of(3) - 0.0).abs() < 1e-6);
    }

    #[test]
    fn composite_is_the_weighted_sum_of_components() {
        let candidates = vec![
            with_metadata(candidate(1, 0, "total amount due", 0.9), "page", json!(2)),
            with_metadata(candidate(2, 3, "unrelated text body", 0.4), "page", json!(5)),
        ];
        let reranked = rerank_candidates("total", candidates);
        for scored in &reranked {
            let c = breakdown(scored);
            for component in
                [c.semantic, c.position, c.page, c.recency, c.length, c.query_term_match]
            {
                assert!((0.0..=1.0).contains(&component), "component out of range: {component}");
            }
            let expected = c.semantic * 0.50
                + c.position * 0.15
                + c.page * 0.10
                + c.recency * 0.10
                + c.length * 0.05
                + c.query_term_match * 0.10;
            assert!((scored.score - expected).abs() < 1e-5);
        }
    }

    #[test]
    fn ordering_is_descending_by_composite() {
        let candidates = vec![
            candidate(1, 9, "zzz", 0.2),
            candidate(2, 0, "total figure", 0.9),
            candidate(3, 4, "middling", 0.5),
        ];
        let reranked = rerank_candidates("total", candidates);
        for window in reranked.windows(2) {
            assert!(window[0].score >= window[1].score);
        }
        assert_eq!(reranked[0].chunk.id, 2);
    }

    #[test]
    fn exact_ties_preserve_original_candidate_order() {
        // Identical chunks at the same index produce identical composites;
        // the stable sort must keep retrieval order.
        let candidates = vec![
            candidate(10, 0, "same text", 0.5),
            candidate(20, 0, "same text", 0.5),
            candidate(30, 0, "same text", 0.5),
        ];
        let reranked = rerank_candidates("query", candidates);
        let ids: Vec<i64> = reranked.iter().map(|c| c.chunk.id).collect();
        assert_eq!(ids, vec![10, 20, 30]);
    }

    #[test]
    fn reranking_is_deterministic() {
        let build = || {
            vec![
                with_metadata(candidate(1, 2, "alpha beta", 0.7), "page", json!(1)),
                candidate(2, 0, "gamma delta", 0.6),
                with_metadata(
                    candidate(3, 5, "epsilon total", 0.5),
                    "created_at",
                    json!("2024-06-01T00:00:00Z"),
                ),
            ]
        };
        let first = rerank_candidates("total figures", build());
        let second = rerank_candidates("total figures", build());
        assert_eq!(first, second);
    }

    #[test]
    fn raw_similarity_is_preserved_for_observability() {
        let reranked = rerank_candidates("q", vec![candidate(1, 0, "text", 0.42)]);
        assert_eq!(reranked[0].similarity, 0.42);
        assert_eq!(breakdown(&reranked[0]).semantic, 0.42);
    }

    #[test]
    fn empty_candidates_yield_empty_output() {
        assert!(rerank_candidates("query", Vec::new()).is_empty());
    }
}
