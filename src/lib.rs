//! # docrag
//!
//! Retrieval-augmented question answering over private document corpora.
//!
//! ## Overview
//!
//! `docrag` ingests documents into searchable chunks with vector
//! embeddings, and at query time retrieves, re-ranks, and synthesizes a
//! grounded answer from the most relevant chunks:
//!
//! - **Ingestion** — load a file (txt/md/pdf/docx), split it into
//!   overlapping chunks, embed the chunks in rate-limited batches, and
//!   persist document + chunks as one atomic unit of work. A failed
//!   ingestion leaves no trace: partial documents are never visible to
//!   queries.
//! - **Query** — embed the question, fetch the nearest chunks by cosine
//!   similarity, recombine six relevance signals into a composite ranking,
//!   and ask a generation model to answer strictly from the top chunks.
//!
//! All external collaborators sit behind traits — [`EmbeddingProvider`],
//! [`GenerationProvider`], [`VectorStore`], [`Chunker`], [`Reranker`] — so
//! every component can be substituted with fakes in tests. Batteries
//! included: an OpenAI embeddings client, an Anthropic generation client, a
//! Postgres/pgvector store, and an in-memory store for development.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use docrag::{
//!     AnthropicGenerationProvider, OpenAiEmbeddingProvider, PgVectorStore, RagConfig,
//!     RagPipeline,
//! };
//!
//! let embedder = Arc::new(OpenAiEmbeddingProvider::from_env()?);
//! let generator = Arc::new(AnthropicGenerationProvider::from_env()?);
//! let store = Arc::new(PgVectorStore::connect(&database_url, embedder.dimensions()).await?);
//! store.initialize().await?;
//!
//! let pipeline = RagPipeline::builder()
//!     .config(RagConfig::default())
//!     .embedding_provider(embedder)
//!     .generation_provider(generator)
//!     .vector_store(store)
//!     .build()?;
//!
//! let receipt = pipeline.ingest("handbook.pdf", "Employee handbook").await?;
//! let result = pipeline.query("How many vacation days do we get?", None).await?;
//! println!("{}", result.answer);
//! ```

pub mod anthropic;
pub mod chunking;
pub mod config;
pub mod document;
pub mod embedding;
pub mod error;
pub mod generation;
pub mod inmemory;
pub mod loader;
pub mod openai;
pub mod pgvector;
pub mod pipeline;
pub mod reranker;
pub mod synthesizer;
pub mod vectorstore;

pub use anthropic::AnthropicGenerationProvider;
pub use chunking::{Chunker, RecursiveChunker};
pub use config::{RagConfig, RagConfigBuilder};
pub use document::{
    AnswerResult, Chunk, Document, DocumentSegment, IngestReceipt, Metadata, NewChunk,
    ScoreBreakdown, ScoredChunk,
};
pub use embedding::EmbeddingProvider;
pub use error::{RagError, Result};
pub use generation::GenerationProvider;
pub use inmemory::InMemoryVectorStore;
pub use loader::load_document;
pub use openai::OpenAiEmbeddingProvider;
pub use pgvector::PgVectorStore;
pub use pipeline::{RagPipeline, RagPipelineBuilder};
pub use reranker::{Reranker, WeightedReranker};
pub use synthesizer::{AnswerSynthesizer, NO_CONTEXT_ANSWER};
pub use vectorstore::{IngestSession, VectorStore};
