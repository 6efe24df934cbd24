//! Error types for the `docrag` crate.

use thiserror::Error;

/// Errors that can occur in document ingestion and query answering.
#[derive(Debug, Error)]
pub enum RagError {
    /// A document file has an extension the loader does not support.
    #[error("Unsupported document format: '{0}'")]
    UnsupportedFormat(String),

    /// The query text was empty or contained only whitespace.
    #[error("Query text must not be empty")]
    EmptyQuery,

    /// A document file could not be read or its text could not be extracted.
    #[error("Failed to load document '{path}': {message}")]
    Load {
        /// The path of the file that failed to load.
        path: String,
        /// A description of the failure.
        message: String,
    },

    /// An error occurred during embedding generation.
    #[error("Embedding error ({provider}): {message}")]
    Embedding {
        /// The embedding provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// An error occurred during answer generation.
    #[error("Generation error ({provider}): {message}")]
    Generation {
        /// The generation provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// An error occurred in the vector store backend.
    #[error("Vector store error ({backend}): {message}")]
    Store {
        /// The vector store backend that produced the error.
        backend: String,
        /// A description of the failure.
        message: String,
    },

    /// An error occurred during document chunking.
    #[error("Chunking error: {0}")]
    Chunking(String),

    /// A configuration validation error.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// A convenience result type for RAG operations.
pub type Result<T> = std::result::Result<T, RagError>;
