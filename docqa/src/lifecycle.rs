//! Index lifecycle management: create-if-absent, then wait for readiness.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::config::PipelineConfig;
use crate::error::{DocqaError, Result};
use crate::index::{IndexHandle, IndexProvider, Metric, RegionSpec};

/// States of one `ensure_ready` run.
///
/// `Creating` is entered only when the index is absent from the service;
/// `Polling` repeats up to the configured attempt bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ProvisionState {
    Creating,
    Polling { attempt: u32 },
    Ready,
    TimedOut,
}

/// Ensures a named index exists and is ready before any upsert or query.
///
/// This is the single blocking wait in the ingestion path. The wait is
/// bounded: at most `max_poll_attempts` readiness checks, `poll_interval`
/// apart. The poll runs inline in the calling future, so dropping the call
/// (e.g. from a timeout or a select) cancels it cleanly; an aborted
/// ingestion leaves already-upserted chunks in place, which is harmless
/// because record ids are content-addressed.
pub struct IndexLifecycle {
    provider: Arc<dyn IndexProvider>,
    dimension: usize,
    metric: Metric,
    region: RegionSpec,
    poll_interval: Duration,
    max_poll_attempts: u32,
}

impl IndexLifecycle {
    /// Create a lifecycle manager over `provider` with the config's
    /// dimension, metric, placement, and poll bounds.
    pub fn new(provider: Arc<dyn IndexProvider>, config: &PipelineConfig) -> Self {
        Self {
            provider,
            dimension: config.dimension,
            metric: config.metric,
            region: config.region.clone(),
            poll_interval: config.poll_interval,
            max_poll_attempts: config.max_poll_attempts,
        }
    }

    /// Ensure `index_name` exists and is ready, returning its handle.
    ///
    /// # Errors
    ///
    /// Returns [`DocqaError::IndexNotReady`] when the readiness bound is
    /// exhausted, or [`DocqaError::IndexService`] if the service itself
    /// fails. Both are hard failures of the enclosing request.
    pub async fn ensure_ready(&self, index_name: &str) -> Result<Arc<dyn IndexHandle>> {
        let known = self.provider.list_index_names().await?;
        let mut state = if known.iter().any(|n| n == index_name) {
            ProvisionState::Polling { attempt: 0 }
        } else {
            ProvisionState::Creating
        };

        loop {
            state = match state {
                ProvisionState::Creating => {
                    info!(
                        index = index_name,
                        dimension = self.dimension,
                        metric = self.metric.as_str(),
                        cloud = %self.region.cloud,
                        region = %self.region.region,
                        "creating vector index"
                    );
                    self.provider
                        .create_index(index_name, self.dimension, self.metric, &self.region)
                        .await?;
                    ProvisionState::Polling { attempt: 0 }
                }
                ProvisionState::Polling { attempt } => {
                    let status = self.provider.describe_index(index_name).await?;
                    if status.ready {
                        ProvisionState::Ready
                    } else if attempt + 1 >= self.max_poll_attempts {
                        ProvisionState::TimedOut
                    } else {
                        debug!(index = index_name, attempt, "index not ready, polling");
                        tokio::time::sleep(self.poll_interval).await;
                        ProvisionState::Polling { attempt: attempt + 1 }
                    }
                }
                ProvisionState::Ready => {
                    debug!(index = index_name, "index ready");
                    return self.provider.index(index_name).await;
                }
                ProvisionState::TimedOut => {
                    warn!(
                        index = index_name,
                        attempts = self.max_poll_attempts,
                        "index readiness poll exhausted"
                    );
                    return Err(DocqaError::IndexNotReady {
                        index: index_name.to_string(),
                        attempts: self.max_poll_attempts,
                    });
                }
            };
        }
    }
}
