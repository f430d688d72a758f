//! Per-user document collections with retrieval-augmented question answering.
//!
//! This crate implements the ingestion-and-retrieval pipeline behind a
//! document QA service:
//!
//! - **Extraction** — plain text, PDF, CSV, and slide-deck documents to text
//! - **Chunking** — fixed character windows with normalized newlines
//! - **Content-addressed embedding** — SHA-256 chunk ids, validated vectors
//! - **Index lifecycle** — create-if-absent with a bounded readiness poll
//! - **Idempotent upsert** — one record per unique chunk, batch faults
//!   isolated per chunk and aggregated into a report
//! - **Retrieval & answering** — top-k similarity search stuffed into a
//!   single chat-model prompt, returning the retrieved chunks as sources
//! - **Feedback** — confirmed question/answer pairs re-ingested through the
//!   same path
//!
//! [`QaPipeline`] ties these together over pluggable backends: any
//! [`CollectionRegistry`], [`IndexProvider`], [`EmbeddingProvider`], and
//! [`ChatModel`]. Production backends for OpenAI and Pinecone serverless are
//! provided, along with an in-memory index service for development and
//! tests.

pub mod chunking;
pub mod config;
pub mod document;
pub mod embedding;
pub mod error;
pub mod extract;
pub mod index;
pub mod ingest;
pub mod lifecycle;
pub mod llm;
pub mod memory;
pub mod openai;
pub mod pinecone;
pub mod pipeline;
pub mod registry;

pub use chunking::{Chunker, FixedWindowChunker};
pub use config::{DEFAULT_CHUNK_LEN, DEFAULT_DIMENSION, PipelineConfig, PipelineConfigBuilder};
pub use document::{ContentType, Document, ScoredChunk, VectorRecord, content_id};
pub use embedding::{EmbeddingProvider, RecordEmbedder};
pub use error::{DocqaError, Result};
pub use index::{IndexHandle, IndexProvider, IndexStatus, Metric, RegionSpec};
pub use ingest::{IngestReport, Ingestor, Skip, SkipReason};
pub use lifecycle::IndexLifecycle;
pub use llm::{ChatModel, OpenAiChatModel};
pub use memory::InMemoryIndexService;
pub use openai::OpenAiEmbedding;
pub use pinecone::PineconeIndexService;
pub use pipeline::{Answer, QaPipeline, QaPipelineBuilder};
pub use registry::{CollectionRecord, CollectionRegistry, JsonFileRegistry};
