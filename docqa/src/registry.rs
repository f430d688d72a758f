//! Account & collection registry access.
//!
//! The registry is an external collaborator: a durable store of each user's
//! collections and uploaded filenames. The pipeline only ever touches it
//! through [`CollectionRegistry`]; [`JsonFileRegistry`] is the default
//! implementation, persisting a pretty-printed JSON document that survives
//! process restarts.

use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::info;

use crate::error::{DocqaError, Result};

/// A user's collection: a human label paired with the physical index name.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CollectionRecord {
    /// Human-facing collection label, unique per user.
    pub name: String,
    /// Physical vector index name, unique per user.
    pub index_name: String,
}

/// Synchronous-feeling key-value access to the collection registry.
///
/// A collection record must only be appended after its initial ingestion
/// reports success, so a collection is never partially visible.
#[async_trait]
pub trait CollectionRegistry: Send + Sync {
    /// All collections belonging to `user`.
    async fn collections(&self, user: &str) -> Result<Vec<CollectionRecord>>;

    /// Resolve a collection name to its index name, if the user has it.
    async fn index_name(&self, user: &str, collection: &str) -> Result<Option<String>> {
        Ok(self
            .collections(user)
            .await?
            .into_iter()
            .find(|c| c.name == collection)
            .map(|c| c.index_name))
    }

    /// Durably append a collection record and its uploaded filenames.
    async fn append_collection(
        &self,
        user: &str,
        record: CollectionRecord,
        filenames: &[String],
    ) -> Result<()>;

    /// The filenames recorded for a user's collection.
    async fn uploaded_files(&self, user: &str, collection: &str) -> Result<Vec<String>>;
}

/// On-disk layout of the registry document.
///
/// Unknown top-level keys (e.g. account material managed elsewhere) are
/// ignored on load and not rewritten.
#[derive(Debug, Default, Serialize, Deserialize)]
struct RegistryDocument {
    #[serde(default)]
    collections: HashMap<String, Vec<CollectionRecord>>,
    #[serde(default)]
    uploaded_files: HashMap<String, HashMap<String, Vec<String>>>,
}

/// A [`CollectionRegistry`] persisted as a single JSON file.
pub struct JsonFileRegistry {
    path: PathBuf,
    state: RwLock<RegistryDocument>,
}

impl JsonFileRegistry {
    /// Open the registry at `path`, loading it if the file exists.
    ///
    /// # Errors
    ///
    /// Returns [`DocqaError::Registry`] if an existing file cannot be read
    /// or parsed.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let document = if path.exists() {
            let raw = std::fs::read_to_string(&path)
                .map_err(|e| DocqaError::Registry(format!("failed to read {path:?}: {e}")))?;
            serde_json::from_str(&raw)
                .map_err(|e| DocqaError::Registry(format!("failed to parse {path:?}: {e}")))?
        } else {
            RegistryDocument::default()
        };
        Ok(Self { path, state: RwLock::new(document) })
    }

    async fn persist(&self, document: &RegistryDocument) -> Result<()> {
        let raw = serde_json::to_string_pretty(document)
            .map_err(|e| DocqaError::Registry(format!("failed to serialize registry: {e}")))?;
        tokio::fs::write(&self.path, raw)
            .await
            .map_err(|e| DocqaError::Registry(format!("failed to write {:?}: {e}", self.path)))
    }
}

#[async_trait]
impl CollectionRegistry for JsonFileRegistry {
    async fn collections(&self, user: &str) -> Result<Vec<CollectionRecord>> {
        Ok(self.state.read().await.collections.get(user).cloned().unwrap_or_default())
    }

    async fn append_collection(
        &self,
        user: &str,
        record: CollectionRecord,
        filenames: &[String],
    ) -> Result<()> {
        let mut state = self.state.write().await;
        state
            .uploaded_files
            .entry(user.to_string())
            .or_default()
            .insert(record.name.clone(), filenames.to_vec());
        state.collections.entry(user.to_string()).or_default().push(record.clone());
        self.persist(&state).await?;
        info!(user, collection = %record.name, index = %record.index_name, "collection recorded");
        Ok(())
    }

    async fn uploaded_files(&self, user: &str, collection: &str) -> Result<Vec<String>> {
        Ok(self
            .state
            .read()
            .await
            .uploaded_files
            .get(user)
            .and_then(|c| c.get(collection))
            .cloned()
            .unwrap_or_default())
    }
}
