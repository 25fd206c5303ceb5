//! Background job bodies owned by the server process.
//!
//! The pipeline enqueues notification fan-out and search re-indexing by
//! name. Delivery and indexing live outside this service, so the handlers
//! here record what would be sent and hand off nothing else.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use subhub_events::jobs::{JOB_NOTIFY, JOB_REINDEX_VIDEO};
use subhub_events::{Job, JobError, JobHandler, JobRunner};
use subhub_pipeline::Services;

/// Logs each workflow notification with its team and video.
#[derive(Default)]
pub struct NotifyJobHandler {
    sent: AtomicU64,
}

impl NotifyJobHandler {
    pub fn sent(&self) -> u64 {
        self.sent.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl JobHandler for NotifyJobHandler {
    async fn handle(&self, job: &Job) -> Result<(), JobError> {
        let notification = job
            .payload
            .get("notification")
            .ok_or_else(|| JobError::Payload("missing 'notification'".into()))?;
        tracing::info!(
            team = %job.payload["team"],
            video_id = %job.payload["video_id"],
            notification = %notification,
            "Notification dispatched",
        );
        self.sent.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

/// Records that a video's search projection must be rebuilt.
#[derive(Default)]
pub struct ReindexJobHandler {
    reindexed: AtomicU64,
}

impl ReindexJobHandler {
    pub fn reindexed(&self) -> u64 {
        self.reindexed.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl JobHandler for ReindexJobHandler {
    async fn handle(&self, job: &Job) -> Result<(), JobError> {
        let video_id = job.payload["video_id"]
            .as_str()
            .ok_or_else(|| JobError::Payload("missing 'video_id'".into()))?;
        tracing::debug!(video_id, "Video re-index requested");
        self.reindexed.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

/// Register every job this process runs: the pipeline's own handlers plus
/// notification and re-index.
pub fn register_jobs(services: &Services, runner: JobRunner) -> JobRunner {
    services
        .register_jobs(runner)
        .register(JOB_NOTIFY, Arc::new(NotifyJobHandler::default()))
        .register(JOB_REINDEX_VIDEO, Arc::new(ReindexJobHandler::default()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;

    #[tokio::test]
    async fn notify_requires_a_notification() {
        let handler = NotifyJobHandler::default();
        let result = handler
            .handle(&Job::new(JOB_NOTIFY, json!({ "team": "t" })))
            .await;
        assert_matches!(result, Err(JobError::Payload(_)));

        handler
            .handle(&Job::new(
                JOB_NOTIFY,
                json!({ "team": "t", "video_id": "abc", "notification": "task-assigned" }),
            ))
            .await
            .unwrap();
        assert_eq!(handler.sent(), 1);
    }

    #[tokio::test]
    async fn reindex_counts_videos() {
        let handler = ReindexJobHandler::default();
        handler
            .handle(&Job::new(JOB_REINDEX_VIDEO, json!({ "video_id": "abc" })))
            .await
            .unwrap();
        assert_eq!(handler.reindexed(), 1);
    }
}
