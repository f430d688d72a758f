//! Serverless vector index backend over the Pinecone REST API.
//!
//! The control plane (list, create, describe) lives at a global endpoint;
//! each index exposes its own data-plane host for upserts and queries, which
//! the provider resolves when a handle is opened.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::document::{ScoredChunk, VectorRecord};
use crate::error::{DocqaError, Result};
use crate::index::{IndexHandle, IndexProvider, IndexStatus, Metric, RegionSpec};

const CONTROL_PLANE_URL: &str = "https://api.pinecone.io";
const API_VERSION: &str = "2025-01";

/// An [`IndexProvider`] backed by Pinecone serverless indexes.
pub struct PineconeIndexService {
    client: reqwest::Client,
    api_key: String,
    control_plane: String,
}

impl PineconeIndexService {
    /// Create a service with the given API key.
    ///
    /// # Errors
    ///
    /// Returns [`DocqaError::Config`] if the key is empty.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(DocqaError::Config("Pinecone API key must not be empty".to_string()));
        }
        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            control_plane: CONTROL_PLANE_URL.to_string(),
        })
    }

    /// Create a service from the `PINECONE_API_KEY` environment variable.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("PINECONE_API_KEY").map_err(|_| {
            DocqaError::Config("PINECONE_API_KEY environment variable not set".to_string())
        })?;
        Self::new(api_key)
    }

    /// Point the control plane at a different base URL.
    pub fn with_control_plane(mut self, url: impl Into<String>) -> Self {
        self.control_plane = url.into();
        self
    }

    fn request(&self, method: reqwest::Method, url: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, url)
            .header("Api-Key", &self.api_key)
            .header("X-Pinecone-API-Version", API_VERSION)
    }

    async fn describe(&self, name: &str) -> Result<IndexDescription> {
        let url = format!("{}/indexes/{name}", self.control_plane);
        let response =
            self.request(reqwest::Method::GET, &url).send().await.map_err(map_transport)?;
        let response = check_status(response, "describe index").await?;
        response
            .json()
            .await
            .map_err(|e| service_err(format!("failed to parse describe response: {e}")))
    }
}

fn service_err(message: String) -> DocqaError {
    DocqaError::IndexService { backend: "pinecone".to_string(), message }
}

fn map_transport(e: reqwest::Error) -> DocqaError {
    error!(error = %e, "pinecone request failed");
    service_err(format!("request failed: {e}"))
}

async fn check_status(response: reqwest::Response, operation: &str) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    error!(%status, operation, "pinecone API error");
    Err(service_err(format!("{operation} returned {status}: {body}")))
}

// ── Wire types ─────────────────────────────────────────────────────

#[derive(Deserialize)]
struct IndexList {
    indexes: Vec<IndexDescription>,
}

#[derive(Deserialize)]
struct IndexDescription {
    name: String,
    host: String,
    status: IndexStatusWire,
}

#[derive(Deserialize)]
struct IndexStatusWire {
    ready: bool,
}

#[derive(Serialize)]
struct CreateIndexRequest<'a> {
    name: &'a str,
    dimension: usize,
    metric: &'a str,
    spec: IndexSpec<'a>,
}

#[derive(Serialize)]
struct IndexSpec<'a> {
    serverless: ServerlessSpec<'a>,
}

#[derive(Serialize)]
struct ServerlessSpec<'a> {
    cloud: &'a str,
    region: &'a str,
}

#[derive(Serialize)]
struct UpsertRequest<'a> {
    vectors: Vec<VectorWire<'a>>,
}

#[derive(Serialize)]
struct VectorWire<'a> {
    id: &'a str,
    values: &'a [f32],
    metadata: MetadataWire<'a>,
}

#[derive(Serialize)]
struct MetadataWire<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    vector: &'a [f32],
    top_k: usize,
    include_metadata: bool,
}

#[derive(Deserialize)]
struct QueryResponse {
    matches: Vec<MatchWire>,
}

#[derive(Deserialize)]
struct MatchWire {
    id: String,
    score: f32,
    metadata: Option<MatchMetadata>,
}

#[derive(Deserialize)]
struct MatchMetadata {
    text: Option<String>,
}

// ── Trait implementations ──────────────────────────────────────────

#[async_trait]
impl IndexProvider for PineconeIndexService {
    async fn list_index_names(&self) -> Result<Vec<String>> {
        let url = format!("{}/indexes", self.control_plane);
        let response =
            self.request(reqwest::Method::GET, &url).send().await.map_err(map_transport)?;
        let response = check_status(response, "list indexes").await?;
        let list: IndexList = response
            .json()
            .await
            .map_err(|e| service_err(format!("failed to parse index list: {e}")))?;
        Ok(list.indexes.into_iter().map(|i| i.name).collect())
    }

    async fn create_index(
        &self,
        name: &str,
        dimension: usize,
        metric: Metric,
        region: &RegionSpec,
    ) -> Result<()> {
        let url = format!("{}/indexes", self.control_plane);
        let body = CreateIndexRequest {
            name,
            dimension,
            metric: metric.as_str(),
            spec: IndexSpec {
                serverless: ServerlessSpec { cloud: &region.cloud, region: &region.region },
            },
        };
        let response = self
            .request(reqwest::Method::POST, &url)
            .json(&body)
            .send()
            .await
            .map_err(map_transport)?;

        // Racing creators are fine: the index exists either way.
        if response.status() == reqwest::StatusCode::CONFLICT {
            debug!(index = name, "index already exists");
            return Ok(());
        }
        check_status(response, "create index").await?;
        debug!(index = name, dimension, metric = metric.as_str(), "created index");
        Ok(())
    }

    async fn describe_index(&self, name: &str) -> Result<IndexStatus> {
        let description = self.describe(name).await?;
        Ok(IndexStatus { ready: description.status.ready })
    }

    async fn index(&self, name: &str) -> Result<Arc<dyn IndexHandle>> {
        let description = self.describe(name).await?;
        Ok(Arc::new(PineconeIndexHandle {
            client: self.client.clone(),
            api_key: self.api_key.clone(),
            base_url: format!("https://{}", description.host),
        }))
    }
}

/// Data-plane handle bound to one index's host.
pub struct PineconeIndexHandle {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl std::fmt::Debug for PineconeIndexHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PineconeIndexHandle").field("base_url", &self.base_url).finish_non_exhaustive()
    }
}

impl PineconeIndexHandle {
    fn request(&self, url: &str) -> reqwest::RequestBuilder {
        self.client
            .post(url)
            .header("Api-Key", &self.api_key)
            .header("X-Pinecone-API-Version", API_VERSION)
    }
}

#[async_trait]
impl IndexHandle for PineconeIndexHandle {
    async fn upsert(&self, records: &[VectorRecord]) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }
        let body = UpsertRequest {
            vectors: records
                .iter()
                .map(|r| VectorWire {
                    id: &r.id,
                    values: &r.values,
                    metadata: MetadataWire { text: &r.text },
                })
                .collect(),
        };
        let url = format!("{}/vectors/upsert", self.base_url);
        let response = self.request(&url).json(&body).send().await.map_err(map_transport)?;
        check_status(response, "upsert").await?;
        debug!(count = records.len(), "upserted records");
        Ok(())
    }

    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<ScoredChunk>> {
        let body = QueryRequest { vector, top_k, include_metadata: true };
        let url = format!("{}/query", self.base_url);
        let response = self.request(&url).json(&body).send().await.map_err(map_transport)?;
        let response = check_status(response, "query").await?;
        let parsed: QueryResponse = response
            .json()
            .await
            .map_err(|e| service_err(format!("failed to parse query response: {e}")))?;

        Ok(parsed
            .matches
            .into_iter()
            .map(|m| ScoredChunk {
                id: m.id,
                text: m.metadata.and_then(|md| md.text).unwrap_or_default(),
                score: m.score,
            })
            .collect())
    }
}
