//! Shared handles every service holds.

use std::sync::Arc;

use subhub_core::clock::Clock;
use subhub_core::types::Timestamp;
use subhub_db::{Store, StoreTx};
use subhub_events::{EventBus, JobQueue, Outbox};

use crate::config::PipelineConfig;
use crate::error::PipelineResult;

/// Storage, time, and the post-commit sinks.
#[derive(Clone)]
pub struct ServiceContext {
    pub store: Arc<dyn Store>,
    pub clock: Arc<dyn Clock>,
    pub events: Arc<EventBus>,
    pub jobs: JobQueue,
    pub config: Arc<PipelineConfig>,
}

impl ServiceContext {
    pub fn new(
        store: Arc<dyn Store>,
        clock: Arc<dyn Clock>,
        events: Arc<EventBus>,
        jobs: JobQueue,
        config: PipelineConfig,
    ) -> Self {
        Self {
            store,
            clock,
            events,
            jobs,
            config: Arc::new(config),
        }
    }

    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    pub async fn begin(&self) -> PipelineResult<Box<dyn StoreTx>> {
        Ok(self.store.begin().await?)
    }

    /// Commit on success and release the outbox; roll back on failure.
    ///
    /// The outbox is dropped unflushed whenever the commit does not happen.
    pub async fn finish<T>(
        &self,
        tx: Box<dyn StoreTx>,
        outbox: Outbox,
        result: PipelineResult<T>,
    ) -> PipelineResult<T> {
        match result {
            Ok(value) => {
                tx.commit().await?;
                outbox.flush(&self.events, &self.jobs);
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback().await {
                    tracing::warn!(error = %rollback_err, "Rollback failed");
                }
                Err(err)
            }
        }
    }
}
