//! Embedding generation and validation.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::document::{VectorRecord, content_id};
use crate::error::{DocqaError, Result};

/// A service that turns text into a fixed-dimension embedding vector.
///
/// The provider's dimension is fixed for the process lifetime, and the same
/// provider instance must serve both the ingest and the query path —
/// mismatched embedding models silently degrade retrieval quality, so the
/// pipeline builder checks [`dimensions`](EmbeddingProvider::dimensions)
/// against its configuration.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate an embedding vector for a single text input.
    ///
    /// # Errors
    ///
    /// Returns [`DocqaError::EmbeddingService`] on network or service faults.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// The dimensionality of embeddings produced by this provider.
    fn dimensions(&self) -> usize;
}

/// Content-addressed embedder: computes a chunk's stable id, requests its
/// embedding, and validates the response before it can reach an index.
pub struct RecordEmbedder {
    provider: Arc<dyn EmbeddingProvider>,
    dimension: usize,
}

impl RecordEmbedder {
    /// Create an embedder expecting vectors of `dimension` values.
    pub fn new(provider: Arc<dyn EmbeddingProvider>, dimension: usize) -> Self {
        Self { provider, dimension }
    }

    /// Embed one chunk of text into a validated [`VectorRecord`].
    ///
    /// The record id is the content hash of `chunk_text`, so identical text
    /// always produces the same id regardless of source document.
    ///
    /// # Errors
    ///
    /// Returns [`DocqaError::EmbeddingService`] if the provider fails, or
    /// [`DocqaError::EmbeddingValidation`] if the returned vector has the
    /// wrong length or contains a non-finite value. Both are per-chunk
    /// faults: the coordinator skips the chunk and continues.
    pub async fn embed_record(&self, chunk_text: &str) -> Result<VectorRecord> {
        let id = content_id(chunk_text);
        let values = self.provider.embed(chunk_text).await?;

        if values.len() != self.dimension {
            return Err(DocqaError::EmbeddingValidation {
                message: format!("expected {} values, got {}", self.dimension, values.len()),
            });
        }
        if let Some(position) = values.iter().position(|v| !v.is_finite()) {
            return Err(DocqaError::EmbeddingValidation {
                message: format!("non-finite value at position {position}"),
            });
        }

        debug!(id = %id, text_len = chunk_text.len(), "embedded chunk");
        Ok(VectorRecord { id, values, text: chunk_text.to_string() })
    }
}
