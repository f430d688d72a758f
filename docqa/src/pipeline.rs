//! Pipeline orchestrator: collection creation, question answering, feedback.
//!
//! [`QaPipeline`] composes the registry, the index service, the embedding
//! provider, and the chat model. It holds collaborators only — request state
//! (user, collection) is passed into every call, never kept ambiently.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use docqa::{Document, PipelineConfig, QaPipeline};
//!
//! let pipeline = QaPipeline::builder()
//!     .config(PipelineConfig::default())
//!     .registry(Arc::new(registry))
//!     .index_provider(Arc::new(index_service))
//!     .embedding_provider(Arc::new(embedder))
//!     .chat_model(Arc::new(chat))
//!     .build()?;
//!
//! let report = pipeline.create_collection("ada", "specs", "specs-idx", documents).await?;
//! let answer = pipeline.answer("ada", "specs", "what changed in Q3?").await?;
//! ```

use std::sync::Arc;

use tracing::{info, warn};

use crate::chunking::{Chunker, FixedWindowChunker};
use crate::config::PipelineConfig;
use crate::document::{Document, ScoredChunk};
use crate::embedding::{EmbeddingProvider, RecordEmbedder};
use crate::error::{DocqaError, Result};
use crate::index::IndexProvider;
use crate::ingest::{IngestReport, Ingestor};
use crate::lifecycle::IndexLifecycle;
use crate::llm::{ChatModel, stuff_prompt};
use crate::registry::{CollectionRecord, CollectionRegistry};

/// An answer with the retrieved context that produced it.
#[derive(Debug, Clone)]
pub struct Answer {
    /// The chat model's answer text.
    pub text: String,
    /// The chunks retrieved for the question, verbatim, best match first.
    pub sources: Vec<ScoredChunk>,
}

/// The ingestion-and-retrieval pipeline.
///
/// Construct one via [`QaPipeline::builder()`].
pub struct QaPipeline {
    config: PipelineConfig,
    registry: Arc<dyn CollectionRegistry>,
    embedding_provider: Arc<dyn EmbeddingProvider>,
    chat_model: Arc<dyn ChatModel>,
    lifecycle: IndexLifecycle,
    ingestor: Ingestor,
}

impl QaPipeline {
    /// Create a new [`QaPipelineBuilder`].
    pub fn builder() -> QaPipelineBuilder {
        QaPipelineBuilder::default()
    }

    /// Return a reference to the pipeline configuration.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Create a collection by ingesting its initial document batch.
    ///
    /// Rejects duplicate collection or index names before any network call.
    /// The collection record is committed to the registry only after every
    /// requested document has been attempted; per-unit skips are tolerated
    /// and returned in the report, but an index-provisioning or registry
    /// failure fails the whole call.
    ///
    /// # Errors
    ///
    /// [`DocqaError::DuplicateName`], [`DocqaError::IndexNotReady`],
    /// [`DocqaError::IndexService`], or [`DocqaError::Registry`].
    pub async fn create_collection(
        &self,
        user: &str,
        name: &str,
        index_name: &str,
        documents: Vec<Document>,
    ) -> Result<IngestReport> {
        for existing in self.registry.collections(user).await? {
            if existing.name == name {
                return Err(DocqaError::DuplicateName {
                    kind: "collection",
                    name: name.to_string(),
                });
            }
            if existing.index_name == index_name {
                return Err(DocqaError::DuplicateName {
                    kind: "index",
                    name: index_name.to_string(),
                });
            }
        }

        let filenames: Vec<String> = documents.iter().map(|d| d.name.clone()).collect();

        let handle = self.lifecycle.ensure_ready(index_name).await?;
        let report = self.ingestor.ingest_documents(&handle, documents).await?;

        self.registry
            .append_collection(
                user,
                CollectionRecord { name: name.to_string(), index_name: index_name.to_string() },
                &filenames,
            )
            .await?;

        info!(
            user,
            collection = name,
            index = index_name,
            upserted = report.upserted,
            skipped = report.skips.len(),
            "collection created"
        );
        Ok(report)
    }

    /// Answer a question against one of the user's collections.
    ///
    /// Retrieves the top-k most similar chunks with the same embedding model
    /// used at ingestion, stuffs them into a single prompt, and delegates to
    /// the chat model. Returns `None` when nothing is retrieved or the model
    /// produces no text — the caller renders "no relevant information
    /// found", it is not an error.
    ///
    /// # Errors
    ///
    /// [`DocqaError::CollectionNotFound`] if the user has no such
    /// collection, plus any hard index, embedding, or chat-model fault.
    pub async fn answer(&self, user: &str, collection: &str, question: &str) -> Result<Option<Answer>> {
        let index_name = self
            .registry
            .index_name(user, collection)
            .await?
            .ok_or_else(|| DocqaError::CollectionNotFound { name: collection.to_string() })?;

        let handle = self.lifecycle.ensure_ready(&index_name).await?;

        let query_vector = self.embedding_provider.embed(question).await?;
        if query_vector.len() != self.config.dimension {
            return Err(DocqaError::EmbeddingValidation {
                message: format!(
                    "query embedding has {} values, expected {}",
                    query_vector.len(),
                    self.config.dimension
                ),
            });
        }

        let sources = handle.query(&query_vector, self.config.top_k).await?;
        if sources.is_empty() {
            info!(user, collection, "no chunks retrieved");
            return Ok(None);
        }

        let prompt = stuff_prompt(question, &sources);
        let text = self.chat_model.complete(&prompt).await?;
        if text.trim().is_empty() {
            warn!(user, collection, "chat model produced no answer");
            return Ok(None);
        }

        info!(user, collection, retrieved = sources.len(), "answered question");
        Ok(Some(Answer { text, sources }))
    }

    /// Feed a confirmed-good question/answer pair back into the collection.
    ///
    /// The pair is blended into a single sentence and routed through the
    /// identical chunk → embed → upsert path as document ingestion.
    ///
    /// # Errors
    ///
    /// [`DocqaError::CollectionNotFound`] if the user has no such
    /// collection, plus any hard index fault.
    pub async fn record_feedback(
        &self,
        user: &str,
        collection: &str,
        question: &str,
        answer: &str,
    ) -> Result<IngestReport> {
        let index_name = self
            .registry
            .index_name(user, collection)
            .await?
            .ok_or_else(|| DocqaError::CollectionNotFound { name: collection.to_string() })?;

        let handle = self.lifecycle.ensure_ready(&index_name).await?;

        let blended =
            format!("The user asked: '{question}' and the answer provided was: '{answer}'.");
        let report = self.ingestor.ingest_text(&handle, "feedback", &blended).await?;

        info!(user, collection, upserted = report.upserted, "feedback recorded");
        Ok(report)
    }
}

/// Builder for constructing a [`QaPipeline`].
///
/// All fields except `config` and `chunker` are required; `config` defaults
/// to [`PipelineConfig::default()`] and `chunker` to a
/// [`FixedWindowChunker`] over the configured chunk length.
#[derive(Default)]
pub struct QaPipelineBuilder {
    config: Option<PipelineConfig>,
    registry: Option<Arc<dyn CollectionRegistry>>,
    index_provider: Option<Arc<dyn IndexProvider>>,
    embedding_provider: Option<Arc<dyn EmbeddingProvider>>,
    chat_model: Option<Arc<dyn ChatModel>>,
    chunker: Option<Arc<dyn Chunker>>,
}

impl QaPipelineBuilder {
    /// Set the pipeline configuration.
    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the collection registry.
    pub fn registry(mut self, registry: Arc<dyn CollectionRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Set the vector index service.
    pub fn index_provider(mut self, provider: Arc<dyn IndexProvider>) -> Self {
        self.index_provider = Some(provider);
        self
    }

    /// Set the embedding provider used by both ingest and query paths.
    pub fn embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedding_provider = Some(provider);
        self
    }

    /// Set the chat model used for answer assembly.
    pub fn chat_model(mut self, model: Arc<dyn ChatModel>) -> Self {
        self.chat_model = Some(model);
        self
    }

    /// Override the default fixed-window chunker.
    pub fn chunker(mut self, chunker: Arc<dyn Chunker>) -> Self {
        self.chunker = Some(chunker);
        self
    }

    /// Build the [`QaPipeline`], validating required fields and the
    /// embedding-dimension invariant.
    ///
    /// # Errors
    ///
    /// Returns [`DocqaError::Config`] if a required collaborator is missing,
    /// or if the embedding provider's dimension disagrees with
    /// `config.dimension` — the same model must serve ingestion and queries.
    pub fn build(self) -> Result<QaPipeline> {
        let config = self.config.unwrap_or_default();
        let registry = self
            .registry
            .ok_or_else(|| DocqaError::Config("registry is required".to_string()))?;
        let index_provider = self
            .index_provider
            .ok_or_else(|| DocqaError::Config("index_provider is required".to_string()))?;
        let embedding_provider = self
            .embedding_provider
            .ok_or_else(|| DocqaError::Config("embedding_provider is required".to_string()))?;
        let chat_model = self
            .chat_model
            .ok_or_else(|| DocqaError::Config("chat_model is required".to_string()))?;

        if embedding_provider.dimensions() != config.dimension {
            return Err(DocqaError::Config(format!(
                "embedding provider produces {}-dimension vectors but the pipeline is configured for {}",
                embedding_provider.dimensions(),
                config.dimension
            )));
        }

        let chunker = self
            .chunker
            .unwrap_or_else(|| Arc::new(FixedWindowChunker::new(config.chunk_len)));
        let lifecycle = IndexLifecycle::new(Arc::clone(&index_provider), &config);
        let embedder = RecordEmbedder::new(Arc::clone(&embedding_provider), config.dimension);
        let ingestor = Ingestor::new(chunker, embedder, config.embed_concurrency);

        Ok(QaPipeline { config, registry, embedding_provider, chat_model, lifecycle, ingestor })
    }
}
