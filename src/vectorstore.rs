//! Vector store traits: persisted documents/chunks with nearest-neighbor
//! search, and the transactional ingest session.

use async_trait::async_trait;

use crate::document::{Document, NewChunk, ScoredChunk};
use crate::error::Result;

/// A storage backend for documents and their embedded chunks.
///
/// Backends persist two related record kinds — documents and chunks, where
/// chunks are exclusively owned by one document and deleted with it — and
/// answer nearest-neighbor queries by cosine similarity.
///
/// Writes go through an [`IngestSession`] so that a document and all of its
/// chunks become visible atomically or not at all.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Open a transactional ingest session.
    ///
    /// The session holds a single store connection for its whole lifetime.
    /// Nothing written through it is visible to reads until
    /// [`IngestSession::commit`]; dropping the session without committing
    /// discards everything it wrote.
    async fn begin_ingest(&self) -> Result<Box<dyn IngestSession>>;

    /// Return the `limit` chunks nearest to `embedding` by cosine
    /// similarity, ordered descending by similarity (`1 − cosine
    /// distance`), optionally restricted to a single document.
    ///
    /// An empty store or a filter with no matches yields an empty `Vec`,
    /// not an error.
    async fn nearest_chunks(
        &self,
        embedding: &[f32],
        document_id: Option<i64>,
        limit: usize,
    ) -> Result<Vec<ScoredChunk>>;

    /// Fetch a document by id; absence is `None`, not an error.
    async fn get_document(&self, id: i64) -> Result<Option<Document>>;

    /// List all documents, newest upload first.
    async fn list_documents(&self) -> Result<Vec<Document>>;

    /// Delete a document and, by cascade, all of its chunks.
    ///
    /// Idempotent: deleting an absent id succeeds.
    async fn delete_document(&self, id: i64) -> Result<()>;
}

/// One atomic unit of work for ingesting a single document.
///
/// The ingestion coordinator creates the document record, inserts chunks in
/// batches (issuing the writes of one batch concurrently — implementations
/// must serialize them internally if their connection requires it), and
/// commits only when everything succeeded. On any failure the coordinator
/// rolls back; a session dropped without commit must also leave no trace.
#[async_trait]
pub trait IngestSession: Send + Sync {
    /// Create the document record and return its store-assigned id.
    ///
    /// The id is final but invisible to readers until commit.
    async fn create_document(&self, title: &str, filepath: &str) -> Result<i64>;

    /// Persist one chunk (text, metadata, embedding, ordinal position) for
    /// the given document.
    async fn insert_chunk(&self, document_id: i64, chunk: &NewChunk) -> Result<()>;

    /// Make everything written through this session visible atomically.
    async fn commit(self: Box<Self>) -> Result<()>;

    /// Discard everything written through this session.
    async fn rollback(self: Box<Self>) -> Result<()>;
}
