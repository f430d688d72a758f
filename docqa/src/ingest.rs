//! The upsert coordinator: extract → chunk → embed → upsert, with per-unit
//! failure isolation.
//!
//! One bad chunk or document never aborts a batch. Every chunk-granularity
//! fault is recovered locally and aggregated into an [`IngestReport`];
//! chunk-level embedding and upsert work runs across a bounded concurrent
//! pool, which is safe because record identity is content-addressed rather
//! than position-addressed.

use std::fmt;
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tracing::{info, warn};

use crate::chunking::Chunker;
use crate::document::Document;
use crate::embedding::RecordEmbedder;
use crate::error::{DocqaError, Result};
use crate::extract;
use crate::index::IndexHandle;

/// Why a document or chunk was skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The document declared a content type no extractor handles.
    UnsupportedFormat {
        /// The declared MIME type.
        mime_type: String,
    },
    /// The document could not be parsed into text.
    Extraction {
        /// The extractor's failure description.
        message: String,
    },
    /// The embedding response failed validation; the chunk is dropped, not
    /// retried.
    InvalidEmbedding {
        /// What made the vector invalid.
        message: String,
    },
    /// The embedding service faulted for this chunk.
    EmbeddingService {
        /// The service failure description.
        message: String,
    },
    /// The index rejected the upsert for this chunk.
    Upsert {
        /// The index failure description.
        message: String,
    },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedFormat { mime_type } => {
                write!(f, "unsupported document type '{mime_type}'")
            }
            Self::Extraction { message } => write!(f, "extraction failed: {message}"),
            Self::InvalidEmbedding { message } => write!(f, "invalid embedding: {message}"),
            Self::EmbeddingService { message } => {
                write!(f, "embedding service error: {message}")
            }
            Self::Upsert { message } => write!(f, "upsert failed: {message}"),
        }
    }
}

/// One skipped document or chunk, with the document it belonged to.
#[derive(Debug, Clone)]
pub struct Skip {
    /// Name of the document the skipped unit came from.
    pub document: String,
    /// Why it was skipped.
    pub reason: SkipReason,
}

/// Outcome of an ingestion batch: what was stored, what was skipped and why.
///
/// A report with skips is still a successful batch; callers surface the
/// skips to the user as a partial-upload notice.
#[derive(Debug, Default)]
pub struct IngestReport {
    /// Number of records upserted into the index.
    pub upserted: usize,
    /// Skipped documents and chunks, in no particular order.
    pub skips: Vec<Skip>,
}

impl IngestReport {
    /// True when nothing was skipped.
    pub fn is_clean(&self) -> bool {
        self.skips.is_empty()
    }

    fn merge(&mut self, other: IngestReport) {
        self.upserted += other.upserted;
        self.skips.extend(other.skips);
    }
}

/// Coordinates chunking, embedding, and idempotent upserts for a batch.
pub struct Ingestor {
    chunker: Arc<dyn Chunker>,
    embedder: RecordEmbedder,
    concurrency: usize,
}

impl Ingestor {
    /// Create a coordinator processing at most `concurrency` chunks at once.
    pub fn new(chunker: Arc<dyn Chunker>, embedder: RecordEmbedder, concurrency: usize) -> Self {
        Self { chunker, embedder, concurrency }
    }

    /// Ingest a batch of documents into an index.
    ///
    /// Every document is attempted; unsupported or unparseable documents
    /// contribute a warning and a skip entry, not a failure. Returns `Err`
    /// only for faults of the pipeline itself, never for per-unit faults.
    pub async fn ingest_documents(
        &self,
        index: &Arc<dyn IndexHandle>,
        documents: Vec<Document>,
    ) -> Result<IngestReport> {
        let mut report = IngestReport::default();
        for document in documents {
            let name = document.name.clone();
            // Extraction parses arbitrary user bytes; keep it off the runtime.
            let extracted = tokio::task::spawn_blocking(move || extract::extract(&document))
                .await
                .map_err(|e| DocqaError::Pipeline(format!("extraction task failed: {e}")))?;

            let units = match extracted {
                Ok(units) => units,
                Err(DocqaError::UnsupportedFormat { mime_type }) => {
                    warn!(document = %name, %mime_type, "unsupported document type, skipping");
                    report.skips.push(Skip {
                        document: name,
                        reason: SkipReason::UnsupportedFormat { mime_type },
                    });
                    continue;
                }
                Err(DocqaError::Extraction { format, message }) => {
                    warn!(document = %name, format, error = %message, "extraction failed, skipping");
                    report
                        .skips
                        .push(Skip { document: name, reason: SkipReason::Extraction { message } });
                    continue;
                }
                Err(other) => return Err(other),
            };

            let chunks: Vec<String> =
                units.iter().flat_map(|unit| self.chunker.chunk(unit)).collect();
            if chunks.is_empty() {
                info!(document = %name, "document produced no chunks");
                continue;
            }

            let document_report = self.ingest_chunks(index, &name, chunks).await;
            report.merge(document_report);
        }
        Ok(report)
    }

    /// Route a single piece of text through the same chunk → embed → upsert
    /// path as document ingestion.
    pub async fn ingest_text(
        &self,
        index: &Arc<dyn IndexHandle>,
        source: &str,
        text: &str,
    ) -> Result<IngestReport> {
        let chunks = self.chunker.chunk(text);
        Ok(self.ingest_chunks(index, source, chunks).await)
    }

    async fn ingest_chunks(
        &self,
        index: &Arc<dyn IndexHandle>,
        source: &str,
        chunks: Vec<String>,
    ) -> IngestReport {
        let embedder = &self.embedder;
        let outcomes: Vec<std::result::Result<(), SkipReason>> = stream::iter(chunks)
            .map(|text| {
                let index = Arc::clone(index);
                async move {
                    let record = match embedder.embed_record(&text).await {
                        Ok(record) => record,
                        Err(DocqaError::EmbeddingValidation { message }) => {
                            return Err(SkipReason::InvalidEmbedding { message });
                        }
                        Err(DocqaError::EmbeddingService { provider, message }) => {
                            return Err(SkipReason::EmbeddingService {
                                message: format!("{provider}: {message}"),
                            });
                        }
                        Err(other) => {
                            return Err(SkipReason::EmbeddingService { message: other.to_string() });
                        }
                    };
                    index
                        .upsert(std::slice::from_ref(&record))
                        .await
                        .map_err(|e| SkipReason::Upsert { message: e.to_string() })
                }
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        let mut report = IngestReport::default();
        for outcome in outcomes {
            match outcome {
                Ok(()) => report.upserted += 1,
                Err(reason) => {
                    warn!(document = source, %reason, "chunk skipped");
                    report.skips.push(Skip { document: source.to_string(), reason });
                }
            }
        }
        info!(
            document = source,
            upserted = report.upserted,
            skipped = report.skips.len(),
            "ingested document chunks"
        );
        report
    }
}
