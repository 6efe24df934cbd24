//! Configuration for the RAG pipeline.

use serde::{Deserialize, Serialize};

use crate::error::{RagError, Result};

/// Configuration parameters for the RAG pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RagConfig {
    /// Maximum chunk size in characters.
    pub chunk_size: usize,
    /// Number of overlapping characters between consecutive chunks.
    pub chunk_overlap: usize,
    /// Number of chunks embedded per provider round trip during ingestion.
    ///
    /// Each batch issues exactly one embedding request; this is the
    /// rate-limiting knob for the embedding provider.
    pub embed_batch_size: usize,
    /// Number of nearest-neighbor candidates fetched per query.
    pub retrieve_limit: usize,
    /// Maximum number of re-ranked chunks included in the generation prompt.
    pub context_chunks: usize,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
            embed_batch_size: 50,
            retrieve_limit: 15,
            context_chunks: 5,
        }
    }
}

impl RagConfig {
    /// Create a new builder for constructing a [`RagConfig`].
    pub fn builder() -> RagConfigBuilder {
        RagConfigBuilder::default()
    }
}

/// Builder for constructing a validated [`RagConfig`].
#[derive(Debug, Clone, Default)]
pub struct RagConfigBuilder {
    config: RagConfig,
}

impl RagConfigBuilder {
    /// Set the maximum chunk size in characters.
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.config.chunk_size = size;
        self
    }

    /// Set the overlap between consecutive chunks in characters.
    pub fn chunk_overlap(mut self, overlap: usize) -> Self {
        self.config.chunk_overlap = overlap;
        self
    }

    /// Set the number of chunks embedded per provider round trip.
    pub fn embed_batch_size(mut self, size: usize) -> Self {
        self.config.embed_batch_size = size;
        self
    }

    /// Set the number of nearest-neighbor candidates fetched per query.
    pub fn retrieve_limit(mut self, limit: usize) -> Self {
        self.config.retrieve_limit = limit;
        self
    }

    /// Set the maximum number of chunks included in the generation prompt.
    pub fn context_chunks(mut self, count: usize) -> Self {
        self.config.context_chunks = count;
        self
    }

    /// Build the [`RagConfig`], validating that parameters are consistent.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Config`] if:
    /// - `chunk_overlap >= chunk_size`
    /// - `embed_batch_size == 0`
    /// - `retrieve_limit == 0`
    /// - `context_chunks == 0`
    pub fn build(self) -> Result<RagConfig> {
        if self.config.chunk_overlap >= self.config.chunk_size {
            return Err(RagError::Config(format!(
                "chunk_overlap ({}) must be less than chunk_size ({})",
                self.config.chunk_overlap, self.config.chunk_size
            )));
        }
        if self.config.embed_batch_size == 0 {
            return Err(RagError::Config("embed_batch_size must be greater than zero".to_string()));
        }
        if self.config.retrieve_limit == 0 {
            return Err(RagError::Config("retrieve_limit must be greater than zero".to_string()));
        }
        if self.config.context_chunks == 0 {
            return Err(RagError::Config("context_chunks must be greater than zero".to_string()));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_ingestion_defaults() {
        let config = RagConfig::default();
        assert_eq!(config.chunk_size, 1000);
        assert_eq!(config.chunk_overlap, 200);
        assert_eq!(config.embed_batch_size, 50);
        assert_eq!(config.retrieve_limit, 15);
        assert_eq!(config.context_chunks, 5);
    }

    #[test]
    fn builder_rejects_overlap_at_least_chunk_size() {
        let result = RagConfig::builder().chunk_size(100).chunk_overlap(100).build();
        assert!(matches!(result, Err(RagError::Config(_))));
    }

    #[test]
    fn builder_rejects_zero_batch_size() {
        let result = RagConfig::builder().embed_batch_size(0).build();
        assert!(matches!(result, Err(RagError::Config(_))));
    }

    #[test]
    fn builder_accepts_valid_overrides() {
        let config = RagConfig::builder()
            .chunk_size(400)
            .chunk_overlap(50)
            .embed_batch_size(10)
            .retrieve_limit(8)
            .context_chunks(3)
            .build()
            .unwrap();
        assert_eq!(config.chunk_size, 400);
        assert_eq!(config.retrieve_limit, 8);
    }
}
