//! RAG pipeline orchestrator.
//!
//! The [`RagPipeline`] coordinates the full ingest-and-query workflow by
//! composing an [`EmbeddingProvider`], a [`GenerationProvider`], a
//! [`VectorStore`], a [`Chunker`], and a [`Reranker`].
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use docrag::{RagPipeline, RagConfig, InMemoryVectorStore};
//!
//! let pipeline = RagPipeline::builder()
//!     .config(RagConfig::default())
//!     .embedding_provider(Arc::new(my_embedder))
//!     .generation_provider(Arc::new(my_generator))
//!     .vector_store(Arc::new(InMemoryVectorStore::new()))
//!     .build()?;
//!
//! let receipt = pipeline.ingest("report.pdf", "Quarterly report").await?;
//! let result = pipeline.query("What was the total revenue?", None).await?;
//! ```

use std::path::Path;
use std::sync::Arc;

use futures::future::try_join_all;
use tracing::{debug, error, info};

use crate::chunking::{Chunker, RecursiveChunker};
use crate::config::RagConfig;
use crate::document::{AnswerResult, Document, IngestReceipt, NewChunk, ScoredChunk};
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::generation::GenerationProvider;
use crate::loader;
use crate::reranker::{Reranker, WeightedReranker};
use crate::synthesizer::AnswerSynthesizer;
use crate::vectorstore::{IngestSession, VectorStore};

/// The RAG pipeline orchestrator.
///
/// Coordinates document ingestion (load → chunk → batch-embed → persist,
/// one atomic unit of work per document) and query answering (embed →
/// search → rerank → synthesize). Construct one via
/// [`RagPipeline::builder()`].
///
/// Pipeline methods take `&self` and share no mutable state across calls,
/// so a pipeline wrapped in an `Arc` is safe under arbitrary concurrent
/// invocation.
pub struct RagPipeline {
    config: RagConfig,
    embedding_provider: Arc<dyn EmbeddingProvider>,
    vector_store: Arc<dyn VectorStore>,
    chunker: Arc<dyn Chunker>,
    reranker: Arc<dyn Reranker>,
    synthesizer: AnswerSynthesizer,
}

impl RagPipeline {
    /// Create a new [`RagPipelineBuilder`].
    pub fn builder() -> RagPipelineBuilder {
        RagPipelineBuilder::default()
    }

    /// Return a reference to the pipeline configuration.
    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    /// Ingest a document file: load → chunk → batch-embed → persist.
    ///
    /// The whole operation is one atomic unit of work: either the document
    /// record and every chunk (with its embedding) become visible together,
    /// or nothing does. Chunks are embedded in batches of
    /// `embed_batch_size` — one provider round trip per batch, which bounds
    /// the provider call rate — and each batch's writes are issued
    /// concurrently and awaited before the next batch starts.
    ///
    /// # Errors
    ///
    /// [`RagError::UnsupportedFormat`] or [`RagError::Load`] from the
    /// loader, [`RagError::Embedding`] or [`RagError::Store`] from the
    /// later stages; any of them leaves the store untouched.
    pub async fn ingest(&self, path: impl AsRef<Path>, title: &str) -> Result<IngestReceipt> {
        let path = path.as_ref();

        let segments = loader::load_document(path)
            .inspect_err(|e| error!(path = %path.display(), error = %e, "document load failed"))?;
        let chunks = self.chunker.chunk(&segments);
        info!(title, chunk_count = chunks.len(), "document chunked");

        let session = self
            .vector_store
            .begin_ingest()
            .await
            .inspect_err(|e| error!(error = %e, "failed to open ingest session"))?;
        match self.ingest_chunks(session.as_ref(), path, title, chunks).await {
            Ok(receipt) => {
                session.commit().await.inspect_err(|e| error!(error = %e, "commit failed"))?;
                info!(
                    document_id = receipt.document_id,
                    chunk_count = receipt.chunk_count,
                    "ingested document"
                );
                Ok(receipt)
            }
            Err(e) => {
                error!(title, error = %e, "ingestion failed; rolling back");
                if let Err(rollback_err) = session.rollback().await {
                    error!(error = %rollback_err, "rollback failed");
                }
                Err(e)
            }
        }
    }

    /// The transactional part of ingestion: document record plus all chunk
    /// batches, written through one session.
    async fn ingest_chunks(
        &self,
        session: &dyn IngestSession,
        path: &Path,
        title: &str,
        mut chunks: Vec<NewChunk>,
    ) -> Result<IngestReceipt> {
        let document_id =
            session.create_document(title, &path.display().to_string()).await?;
        let chunk_count = chunks.len();

        for batch in chunks.chunks_mut(self.config.embed_batch_size) {
            // One embedding round trip for the whole batch.
            let texts: Vec<&str> = batch.iter().map(|c| c.text.as_str()).collect();
            let embeddings = self.embedding_provider.embed_batch(&texts).await?;
            if embeddings.len() != batch.len() {
                return Err(RagError::Embedding {
                    provider: "batch".into(),
                    message: format!(
                        "expected {} embeddings, provider returned {}",
                        batch.len(),
                        embeddings.len()
                    ),
                });
            }
            for (chunk, embedding) in batch.iter_mut().zip(embeddings) {
                chunk.embedding = embedding;
            }

            // Issue the batch's writes concurrently and await them together
            // before moving to the next batch.
            try_join_all(batch.iter().map(|chunk| session.insert_chunk(document_id, chunk)))
                .await?;
            debug!(document_id, batch_size = batch.len(), "persisted chunk batch");
        }

        Ok(IngestReceipt { document_id, chunk_count })
    }

    /// Retrieve the `limit` chunks most similar to `query`, optionally
    /// restricted to one document, ordered descending by raw similarity.
    ///
    /// An empty store or an unmatched filter yields an empty `Vec`, which
    /// is a success, not an error.
    pub async fn retrieve(
        &self,
        query: &str,
        document_id: Option<i64>,
        limit: usize,
    ) -> Result<Vec<ScoredChunk>> {
        let query_embedding = self.embedding_provider.embed(query).await.map_err(|e| {
            error!(error = %e, "query embedding failed");
            e
        })?;

        self.vector_store.nearest_chunks(&query_embedding, document_id, limit).await
    }

    /// Answer a question from the corpus: retrieve → rerank → synthesize.
    ///
    /// When no chunks match, returns the fixed fallback answer instead of
    /// failing.
    ///
    /// # Errors
    ///
    /// [`RagError::EmptyQuery`] when `text` is blank; provider and store
    /// errors abort the whole query.
    pub async fn query(&self, text: &str, document_id: Option<i64>) -> Result<AnswerResult> {
        if text.trim().is_empty() {
            return Err(RagError::EmptyQuery);
        }

        info!(document_id, "processing query");
        let candidates = self.retrieve(text, document_id, self.config.retrieve_limit).await?;

        if candidates.is_empty() {
            info!("no relevant chunks found");
            return self.synthesizer.synthesize(text, candidates).await;
        }

        let ranked = self.reranker.rerank(text, candidates).await?;
        self.synthesizer.synthesize(text, ranked).await
    }

    /// List all documents, newest upload first.
    pub async fn list_documents(&self) -> Result<Vec<Document>> {
        self.vector_store.list_documents().await
    }

    /// Fetch a document by id; `None` when it does not exist.
    pub async fn get_document(&self, id: i64) -> Result<Option<Document>> {
        self.vector_store.get_document(id).await
    }

    /// Delete a document and all of its chunks. Idempotent.
    pub async fn delete_document(&self, id: i64) -> Result<()> {
        self.vector_store.delete_document(id).await?;
        info!(document_id = id, "deleted document");
        Ok(())
    }
}

/// Builder for constructing a [`RagPipeline`].
///
/// `embedding_provider`, `generation_provider`, and `vector_store` are
/// required. `config` defaults to [`RagConfig::default()`]; the chunker
/// defaults to a [`RecursiveChunker`] sized from the config and the
/// reranker to the six-signal [`WeightedReranker`].
#[derive(Default)]
pub struct RagPipelineBuilder {
    config: Option<RagConfig>,
    embedding_provider: Option<Arc<dyn EmbeddingProvider>>,
    generation_provider: Option<Arc<dyn GenerationProvider>>,
    vector_store: Option<Arc<dyn VectorStore>>,
    chunker: Option<Arc<dyn Chunker>>,
    reranker: Option<Arc<dyn Reranker>>,
}

impl RagPipelineBuilder {
    /// Set the pipeline configuration.
    pub fn config(mut self, config: RagConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the embedding provider.
    pub fn embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedding_provider = Some(provider);
        self
    }

    /// Set the generation provider.
    pub fn generation_provider(mut self, provider: Arc<dyn GenerationProvider>) -> Self {
        self.generation_provider = Some(provider);
        self
    }

    /// Set the vector store backend.
    pub fn vector_store(mut self, store: Arc<dyn VectorStore>) -> Self {
        self.vector_store = Some(store);
        self
    }

    /// Override the document chunker.
    pub fn chunker(mut self, chunker: Arc<dyn Chunker>) -> Self {
        self.chunker = Some(chunker);
        self
    }

    /// Override the reranker.
    pub fn reranker(mut self, reranker: Arc<dyn Reranker>) -> Self {
        self.reranker = Some(reranker);
        self
    }

    /// Build the [`RagPipeline`], validating that all required fields are
    /// set.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Config`] if a required field is missing.
    pub fn build(self) -> Result<RagPipeline> {
        let config = self.config.unwrap_or_default();
        let embedding_provider = self
            .embedding_provider
            .ok_or_else(|| RagError::Config("embedding_provider is required".to_string()))?;
        let generation_provider = self
            .generation_provider
            .ok_or_else(|| RagError::Config("generation_provider is required".to_string()))?;
        let vector_store = self
            .vector_store
            .ok_or_else(|| RagError::Config("vector_store is required".to_string()))?;
        let chunker = self
            .chunker
            .unwrap_or_else(|| Arc::new(RecursiveChunker::new(config.chunk_size, config.chunk_overlap)));
        let reranker = self.reranker.unwrap_or_else(|| Arc::new(WeightedReranker));
        let synthesizer = AnswerSynthesizer::new(generation_provider, config.context_chunks);

        Ok(RagPipeline {
            config,
            embedding_provider,
            vector_store,
            chunker,
            reranker,
            synthesizer,
        })
    }
}
