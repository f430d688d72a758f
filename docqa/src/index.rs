//! Vector index service traits.
//!
//! The pipeline talks to its vector store through two seams:
//! [`IndexProvider`] for index lifecycle (list, create, describe, open) and
//! [`IndexHandle`] for data-plane access (upsert, similarity query). The
//! split mirrors the external service: index creation is a slow control-plane
//! operation with its own readiness protocol, while upserts and queries go to
//! a per-index endpoint.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::document::{ScoredChunk, VectorRecord};
use crate::error::Result;

/// The similarity metric an index is created with.
///
/// Fixed for the lifetime of the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    /// Cosine similarity (the default throughout the system).
    Cosine,
    /// Euclidean distance.
    Euclidean,
    /// Dot product.
    DotProduct,
}

impl Metric {
    /// The wire name of the metric.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cosine => "cosine",
            Self::Euclidean => "euclidean",
            Self::DotProduct => "dotproduct",
        }
    }
}

/// Serverless placement for newly created indexes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionSpec {
    /// Cloud provider identifier, e.g. `aws`.
    pub cloud: String,
    /// Region identifier, e.g. `us-east-1`.
    pub region: String,
}

impl Default for RegionSpec {
    fn default() -> Self {
        Self { cloud: "aws".to_string(), region: "us-east-1".to_string() }
    }
}

/// Readiness of a described index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexStatus {
    /// Whether the index accepts upserts and queries.
    pub ready: bool,
}

/// Control-plane access to a vector index service.
#[async_trait]
pub trait IndexProvider: Send + Sync {
    /// List the names of all indexes known to the service.
    async fn list_index_names(&self) -> Result<Vec<String>>;

    /// Create an index with a fixed dimension, metric, and placement.
    ///
    /// Creation is asynchronous on the service side; callers must poll
    /// [`describe_index`](IndexProvider::describe_index) until the index
    /// reports ready. Creating an index that already exists is a no-op.
    async fn create_index(
        &self,
        name: &str,
        dimension: usize,
        metric: Metric,
        region: &RegionSpec,
    ) -> Result<()>;

    /// Report the readiness of a named index.
    async fn describe_index(&self, name: &str) -> Result<IndexStatus>;

    /// Open a data-plane handle to a named index.
    async fn index(&self, name: &str) -> Result<Arc<dyn IndexHandle>>;
}

/// Data-plane access to one vector index.
#[async_trait]
pub trait IndexHandle: Send + Sync + std::fmt::Debug {
    /// Insert-or-overwrite records keyed by their content-addressed ids.
    ///
    /// Upserting an id that is already stored replaces the record in place;
    /// the index never grows beyond one record per unique chunk.
    async fn upsert(&self, records: &[VectorRecord]) -> Result<()>;

    /// Return the `top_k` stored chunks most similar to `vector`,
    /// ordered by descending score.
    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<ScoredChunk>>;
}
