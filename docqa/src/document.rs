//! Data types for documents, vector records, and retrieval results.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// The document formats the ingestion pipeline can extract text from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentType {
    /// UTF-8 plain text.
    PlainText,
    /// PDF documents, extracted page by page.
    Pdf,
    /// Tabular data; each row becomes one logical unit of text.
    Csv,
    /// Slide-deck presentations (PPTX).
    SlideDeck,
}

impl ContentType {
    /// Map a declared MIME type onto a supported format.
    ///
    /// Parameters after `;` (e.g. `text/plain; charset=utf-8`) are ignored.
    /// Returns `None` for anything the pipeline cannot extract.
    pub fn from_mime(mime_type: &str) -> Option<Self> {
        let essence = mime_type.split(';').next().unwrap_or_default().trim();
        match essence {
            "text/plain" => Some(Self::PlainText),
            "application/pdf" => Some(Self::Pdf),
            "text/csv" => Some(Self::Csv),
            "application/vnd.openxmlformats-officedocument.presentationml.presentation" => {
                Some(Self::SlideDeck)
            }
            _ => None,
        }
    }

    /// The canonical MIME type for this format.
    pub fn as_mime(self) -> &'static str {
        match self {
            Self::PlainText => "text/plain",
            Self::Pdf => "application/pdf",
            Self::Csv => "text/csv",
            Self::SlideDeck => {
                "application/vnd.openxmlformats-officedocument.presentationml.presentation"
            }
        }
    }
}

/// A named byte stream with a declared content type.
///
/// Documents are ephemeral: they exist for the duration of one ingestion
/// call and are consumed by extraction.
#[derive(Debug, Clone)]
pub struct Document {
    /// The uploaded filename.
    pub name: String,
    /// The declared MIME type. May be unsupported; the pipeline then skips
    /// the document with a warning instead of failing the batch.
    pub mime_type: String,
    /// The raw document bytes.
    pub bytes: Vec<u8>,
}

impl Document {
    /// Create a new document from a filename, declared MIME type, and bytes.
    pub fn new(
        name: impl Into<String>,
        mime_type: impl Into<String>,
        bytes: impl Into<Vec<u8>>,
    ) -> Self {
        Self { name: name.into(), mime_type: mime_type.into(), bytes: bytes.into() }
    }

    /// The supported format this document declares, if any.
    pub fn content_type(&self) -> Option<ContentType> {
        ContentType::from_mime(&self.mime_type)
    }
}

/// A validated embedding record, keyed by the content hash of its text.
///
/// Once upserted the record is owned by the vector index; upserting the same
/// id again overwrites in place, so re-ingesting identical content never
/// grows the index.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VectorRecord {
    /// Content-addressed id: SHA-256 of the normalized chunk text.
    pub id: String,
    /// The embedding vector, validated against the configured dimension.
    pub values: Vec<f32>,
    /// The chunk text the vector was computed from.
    pub text: String,
}

/// A retrieved chunk paired with its similarity score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredChunk {
    /// The content-addressed id of the stored record.
    pub id: String,
    /// The stored chunk text.
    pub text: String,
    /// Similarity score (higher is more relevant).
    pub score: f32,
}

/// Compute the content-addressed id for a chunk of text.
///
/// The id is the lowercase hex SHA-256 of the text. Identical text always
/// yields the same id, regardless of source document or upload time; this is
/// the deduplication key for the whole store.
pub fn content_id(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}
