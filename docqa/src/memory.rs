//! In-memory vector index service using cosine similarity.
//!
//! [`InMemoryIndexService`] implements both [`IndexProvider`] and the handles
//! it hands out, backed by a `HashMap` behind a `tokio::sync::RwLock`. It is
//! suitable for development and testing; readiness can be simulated so the
//! lifecycle manager's polling is testable without a real service.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::document::{ScoredChunk, VectorRecord};
use crate::error::{DocqaError, Result};
use crate::index::{IndexHandle, IndexProvider, IndexStatus, Metric, RegionSpec};

struct IndexEntry {
    dimension: usize,
    /// Remaining `describe_index` calls that will report not-ready.
    pending_describes: u32,
    records: HashMap<String, VectorRecord>,
}

type SharedState = Arc<RwLock<HashMap<String, IndexEntry>>>;

/// An in-memory [`IndexProvider`] with cosine-similarity search.
#[derive(Default)]
pub struct InMemoryIndexService {
    state: SharedState,
    not_ready_describes: u32,
}

impl InMemoryIndexService {
    /// Create an empty service whose indexes are ready immediately.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a service whose newly created indexes report not-ready for the
    /// first `n` describe calls, simulating slow provisioning.
    pub fn with_not_ready_describes(n: u32) -> Self {
        Self { state: SharedState::default(), not_ready_describes: n }
    }

    /// The number of records stored in `index`, if it exists.
    pub async fn record_count(&self, index: &str) -> Option<usize> {
        self.state.read().await.get(index).map(|e| e.records.len())
    }

    /// The stored record ids of `index`, if it exists.
    pub async fn record_ids(&self, index: &str) -> Option<Vec<String>> {
        self.state
            .read()
            .await
            .get(index)
            .map(|e| e.records.keys().cloned().collect())
    }

    fn missing(name: &str) -> DocqaError {
        DocqaError::IndexService {
            backend: "memory".to_string(),
            message: format!("index '{name}' does not exist"),
        }
    }
}

#[async_trait]
impl IndexProvider for InMemoryIndexService {
    async fn list_index_names(&self) -> Result<Vec<String>> {
        Ok(self.state.read().await.keys().cloned().collect())
    }

    async fn create_index(
        &self,
        name: &str,
        dimension: usize,
        _metric: Metric,
        _region: &RegionSpec,
    ) -> Result<()> {
        let mut state = self.state.write().await;
        state.entry(name.to_string()).or_insert_with(|| IndexEntry {
            dimension,
            pending_describes: self.not_ready_describes,
            records: HashMap::new(),
        });
        Ok(())
    }

    async fn describe_index(&self, name: &str) -> Result<IndexStatus> {
        let mut state = self.state.write().await;
        let entry = state.get_mut(name).ok_or_else(|| Self::missing(name))?;
        if entry.pending_describes > 0 {
            entry.pending_describes -= 1;
            return Ok(IndexStatus { ready: false });
        }
        Ok(IndexStatus { ready: true })
    }

    async fn index(&self, name: &str) -> Result<Arc<dyn IndexHandle>> {
        let state = self.state.read().await;
        if !state.contains_key(name) {
            return Err(Self::missing(name));
        }
        Ok(Arc::new(InMemoryIndexHandle {
            name: name.to_string(),
            state: Arc::clone(&self.state),
        }))
    }
}

/// Data-plane handle to one in-memory index.
pub struct InMemoryIndexHandle {
    name: String,
    state: SharedState,
}

impl std::fmt::Debug for InMemoryIndexHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryIndexHandle").field("name", &self.name).finish_non_exhaustive()
    }
}

#[async_trait]
impl IndexHandle for InMemoryIndexHandle {
    async fn upsert(&self, records: &[VectorRecord]) -> Result<()> {
        let mut state = self.state.write().await;
        let entry = state.get_mut(&self.name).ok_or_else(|| InMemoryIndexService::missing(&self.name))?;
        for record in records {
            if record.values.len() != entry.dimension {
                return Err(DocqaError::IndexService {
                    backend: "memory".to_string(),
                    message: format!(
                        "record '{}' has {} values, index '{}' expects {}",
                        record.id,
                        record.values.len(),
                        self.name,
                        entry.dimension
                    ),
                });
            }
            entry.records.insert(record.id.clone(), record.clone());
        }
        Ok(())
    }

    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<ScoredChunk>> {
        let state = self.state.read().await;
        let entry = state.get(&self.name).ok_or_else(|| InMemoryIndexService::missing(&self.name))?;

        let mut scored: Vec<ScoredChunk> = entry
            .records
            .values()
            .map(|record| ScoredChunk {
                id: record.id.clone(),
                text: record.text.clone(),
                score: cosine_similarity(&record.values, vector),
            })
            .collect();

        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(top_k);
        Ok(scored)
    }
}

/// Cosine similarity of two vectors; 0.0 if either has zero magnitude.
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}
