//! Error types for the `docqa` crate.

use thiserror::Error;

/// Errors that can occur while ingesting documents or answering questions.
///
/// Chunk- and document-granularity faults (`UnsupportedFormat`, `Extraction`,
/// `EmbeddingValidation`, `EmbeddingService`) are recovered by the upsert
/// coordinator and aggregated into an [`IngestReport`](crate::IngestReport);
/// the remaining variants fail the enclosing request.
#[derive(Debug, Error)]
pub enum DocqaError {
    /// The document declared a content type no extractor handles.
    #[error("unsupported document type '{mime_type}'")]
    UnsupportedFormat {
        /// The declared MIME type of the rejected document.
        mime_type: String,
    },

    /// A supported document could not be parsed into text.
    #[error("extraction failed ({format}): {message}")]
    Extraction {
        /// The document format whose extractor failed.
        format: &'static str,
        /// A description of the failure.
        message: String,
    },

    /// The embedding service could not be reached or returned a fault.
    #[error("embedding service error ({provider}): {message}")]
    EmbeddingService {
        /// The embedding provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// The embedding service answered, but the vector is not usable.
    #[error("invalid embedding: {message}")]
    EmbeddingValidation {
        /// What made the vector invalid (length mismatch, non-finite value).
        message: String,
    },

    /// An error occurred in the vector index service.
    #[error("vector index error ({backend}): {message}")]
    IndexService {
        /// The index backend that produced the error.
        backend: String,
        /// A description of the failure.
        message: String,
    },

    /// The index did not become ready within the configured poll bound.
    #[error("index '{index}' not ready after {attempts} readiness checks")]
    IndexNotReady {
        /// Name of the index being provisioned.
        index: String,
        /// How many readiness checks were made before giving up.
        attempts: u32,
    },

    /// A collection or index name is already taken by this user.
    #[error("{kind} name '{name}' is already in use")]
    DuplicateName {
        /// Which namespace clashed: `"collection"` or `"index"`.
        kind: &'static str,
        /// The rejected name.
        name: String,
    },

    /// A query named a collection the user does not have.
    #[error("no collection named '{name}'")]
    CollectionNotFound {
        /// The unresolvable collection name.
        name: String,
    },

    /// The collection registry could not be read or written.
    #[error("registry error: {0}")]
    Registry(String),

    /// The language model call failed.
    #[error("language model error ({provider}): {message}")]
    Llm {
        /// The chat model that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// A configuration validation error.
    #[error("configuration error: {0}")]
    Config(String),

    /// An error in pipeline orchestration.
    #[error("pipeline error: {0}")]
    Pipeline(String),
}

/// A convenience result type for docqa operations.
pub type Result<T> = std::result::Result<T, DocqaError>;
