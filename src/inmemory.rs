//! In-memory store using cosine similarity.
//!
//! This module provides [`InMemoryVectorStore`], a zero-dependency store
//! backed by maps behind a `tokio::sync::RwLock`. It implements the same
//! transactional ingest contract as the pgvector backend (sessions stage
//! their writes and publish them atomically on commit), which makes it
//! suitable for development and for exercising ingestion atomicity in
//! tests.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{Mutex, RwLock};

use crate::document::{Chunk, Document, NewChunk, ScoredChunk};
use crate::error::Result;
use crate::vectorstore::{IngestSession, VectorStore};

#[derive(Debug, Default)]
struct Tables {
    documents: BTreeMap<i64, Document>,
    chunks: BTreeMap<i64, StoredChunk>,
}

#[derive(Debug, Clone)]
struct StoredChunk {
    chunk: Chunk,
    embedding: Vec<f32>,
}

#[derive(Debug, Default)]
struct Shared {
    tables: RwLock<Tables>,
    next_document_id: AtomicI64,
    next_chunk_id: AtomicI64,
}

/// An in-memory [`VectorStore`] using cosine similarity for search.
///
/// Ids are assigned sequentially, mirroring the serial ids of the Postgres
/// backend. Sessions allocate ids eagerly (so the coordinator can hand the
/// document id back to the caller) but stage all records privately until
/// commit; a session dropped or rolled back publishes nothing.
///
/// # Example
///
/// ```rust,ignore
/// use docrag::{InMemoryVectorStore, VectorStore};
///
/// let store = InMemoryVectorStore::new();
/// let session = store.begin_ingest().await?;
/// ```
#[derive(Debug, Default)]
pub struct InMemoryVectorStore {
    shared: Arc<Shared>,
}

impl InMemoryVectorStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }
}

/// Compute cosine similarity between two vectors.
///
/// Returns 0.0 if either vector has zero magnitude.
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn begin_ingest(&self) -> Result<Box<dyn IngestSession>> {
        Ok(Box::new(InMemoryIngestSession {
            shared: Arc::clone(&self.shared),
            staged: Mutex::new(Tables::default()),
        }))
    }

    async fn nearest_chunks(
        &self,
        embedding: &[f32],
        document_id: Option<i64>,
        limit: usize,
    ) -> Result<Vec<ScoredChunk>> {
        let tables = self.shared.tables.read().await;

        let mut scored: Vec<ScoredChunk> = tables
            .chunks
            .values()
            .filter(|stored| document_id.is_none_or(|id| stored.chunk.document_id == id))
            .map(|stored| {
                let similarity = cosine_similarity(&stored.embedding, embedding);
                ScoredChunk::retrieved(stored.chunk.clone(), similarity)
            })
            .collect();

        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(limit);
        Ok(scored)
    }

    async fn get_document(&self, id: i64) -> Result<Option<Document>> {
        let tables = self.shared.tables.read().await;
        Ok(tables.documents.get(&id).cloned())
    }

    async fn list_documents(&self) -> Result<Vec<Document>> {
        let tables = self.shared.tables.read().await;
        let mut documents: Vec<Document> = tables.documents.values().cloned().collect();
        // Newest upload first; id breaks ties from same-instant uploads.
        documents.sort_by(|a, b| (b.uploaded_at, b.id).cmp(&(a.uploaded_at, a.id)));
        Ok(documents)
    }

    async fn delete_document(&self, id: i64) -> Result<()> {
        let mut tables = self.shared.tables.write().await;
        tables.documents.remove(&id);
        tables.chunks.retain(|_, stored| stored.chunk.document_id != id);
        Ok(())
    }
}

/// A staged unit of work against an [`InMemoryVectorStore`].
struct InMemoryIngestSession {
    shared: Arc<Shared>,
    staged: Mutex<Tables>,
}

#[async_trait]
impl IngestSession for InMemoryIngestSession {
    async fn create_document(&self, title: &str, filepath: &str) -> Result<i64> {
        let id = self.shared.next_document_id.fetch_add(1, Ordering::Relaxed) + 1;
        let document = Document {
            id,
            title: title.to_string(),
            filepath: filepath.to_string(),
            uploaded_at: Utc::now(),
        };
        self.staged.lock().await.documents.insert(id, document);
        Ok(id)
    }

    async fn insert_chunk(&self, document_id: i64, chunk: &NewChunk) -> Result<()> {
        let id = self.shared.next_chunk_id.fetch_add(1, Ordering::Relaxed) + 1;
        let stored = StoredChunk {
            chunk: Chunk {
                id,
                document_id,
                text: chunk.text.clone(),
                metadata: chunk.metadata.clone(),
                chunk_index: chunk.chunk_index,
            },
            embedding: chunk.embedding.clone(),
        };
        self.staged.lock().await.chunks.insert(id, stored);
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let staged = self.staged.into_inner();
        let mut tables = self.shared.tables.write().await;
        tables.documents.extend(staged.documents);
        tables.chunks.extend(staged.chunks);
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        // Staged records are simply dropped; nothing was published.
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cosine_similarity_of_identical_vectors_is_one() {
        let v = [0.6f32, 0.8];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_similarity_of_orthogonal_vectors_is_zero() {
        assert!((cosine_similarity(&[1.0, 0.0], &[0.0, 1.0])).abs() < 1e-6);
    }

    #[test]
    fn cosine_similarity_of_zero_vector_is_zero() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
    }
}
