//! Configuration for the ingestion-and-retrieval pipeline.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{DocqaError, Result};
use crate::index::{Metric, RegionSpec};

/// The default maximum chunk length, in characters.
pub const DEFAULT_CHUNK_LEN: usize = 2000;

/// The default embedding dimension (`text-embedding-ada-002`).
pub const DEFAULT_DIMENSION: usize = 1536;

/// Configuration parameters shared by the ingest and query paths.
///
/// `dimension` is validated against the embedding provider when the pipeline
/// is built and is used when new indexes are created, so the ingest and query
/// paths can never disagree about the embedding model's output size.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PipelineConfig {
    /// Maximum chunk length in characters.
    pub chunk_len: usize,
    /// Embedding dimension; must match the embedding provider.
    pub dimension: usize,
    /// Similarity metric used when creating indexes.
    pub metric: Metric,
    /// Serverless placement used when creating indexes.
    pub region: RegionSpec,
    /// Number of chunks retrieved per question.
    pub top_k: usize,
    /// Interval between index readiness checks.
    pub poll_interval: Duration,
    /// Maximum readiness checks before provisioning is declared failed.
    pub max_poll_attempts: u32,
    /// Maximum chunks embedded and upserted concurrently.
    pub embed_concurrency: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            chunk_len: DEFAULT_CHUNK_LEN,
            dimension: DEFAULT_DIMENSION,
            metric: Metric::Cosine,
            region: RegionSpec::default(),
            top_k: 4,
            poll_interval: Duration::from_secs(1),
            max_poll_attempts: 60,
            embed_concurrency: 8,
        }
    }
}

impl PipelineConfig {
    /// Create a new builder for constructing a [`PipelineConfig`].
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder::default()
    }
}

/// Builder for constructing a validated [`PipelineConfig`].
#[derive(Debug, Clone, Default)]
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    /// Set the maximum chunk length in characters.
    pub fn chunk_len(mut self, len: usize) -> Self {
        self.config.chunk_len = len;
        self
    }

    /// Set the embedding dimension.
    pub fn dimension(mut self, dimension: usize) -> Self {
        self.config.dimension = dimension;
        self
    }

    /// Set the similarity metric for new indexes.
    pub fn metric(mut self, metric: Metric) -> Self {
        self.config.metric = metric;
        self
    }

    /// Set the serverless placement for new indexes.
    pub fn region(mut self, region: RegionSpec) -> Self {
        self.config.region = region;
        self
    }

    /// Set the number of chunks retrieved per question.
    pub fn top_k(mut self, k: usize) -> Self {
        self.config.top_k = k;
        self
    }

    /// Set the interval between index readiness checks.
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.config.poll_interval = interval;
        self
    }

    /// Set the maximum number of readiness checks.
    pub fn max_poll_attempts(mut self, attempts: u32) -> Self {
        self.config.max_poll_attempts = attempts;
        self
    }

    /// Set the maximum number of chunks processed concurrently.
    pub fn embed_concurrency(mut self, concurrency: usize) -> Self {
        self.config.embed_concurrency = concurrency;
        self
    }

    /// Build the [`PipelineConfig`], validating that parameters are usable.
    ///
    /// # Errors
    ///
    /// Returns [`DocqaError::Config`] if any of `chunk_len`, `dimension`,
    /// `top_k`, `max_poll_attempts`, or `embed_concurrency` is zero.
    pub fn build(self) -> Result<PipelineConfig> {
        let c = &self.config;
        if c.chunk_len == 0 {
            return Err(DocqaError::Config("chunk_len must be greater than zero".to_string()));
        }
        if c.dimension == 0 {
            return Err(DocqaError::Config("dimension must be greater than zero".to_string()));
        }
        if c.top_k == 0 {
            return Err(DocqaError::Config("top_k must be greater than zero".to_string()));
        }
        if c.max_poll_attempts == 0 {
            return Err(DocqaError::Config(
                "max_poll_attempts must be greater than zero".to_string(),
            ));
        }
        if c.embed_concurrency == 0 {
            return Err(DocqaError::Config(
                "embed_concurrency must be greater than zero".to_string(),
            ));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_passes_validation() {
        let config = PipelineConfig::builder().build().unwrap();
        assert_eq!(config, PipelineConfig::default());
        assert_eq!(config.chunk_len, 2000);
        assert_eq!(config.dimension, 1536);
        assert_eq!(config.top_k, 4);
    }

    #[test]
    fn zero_values_are_rejected() {
        assert!(PipelineConfig::builder().chunk_len(0).build().is_err());
        assert!(PipelineConfig::builder().dimension(0).build().is_err());
        assert!(PipelineConfig::builder().top_k(0).build().is_err());
        assert!(PipelineConfig::builder().max_poll_attempts(0).build().is_err());
        assert!(PipelineConfig::builder().embed_concurrency(0).build().is_err());
    }
}
