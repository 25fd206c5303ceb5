//! Outbound pushes of a language tip to external hosting sites.
//!
//! A push job is queued after every commit that produces a new public tip.
//! The job re-checks the gate against committed state, prepares the
//! payload and hands it to each registered [`SyncTarget`]. Push failures
//! are logged and counted; nothing is rolled back.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::json;
use subhub_core::error::CoreError;
use subhub_core::external_sync::{
    check_sync, prepare_payload, CreditSettings, SyncBlocked, SyncPayload,
};
use subhub_core::subtitles::SubtitleFormat;
use subhub_core::visibility::public_tip;
use subhub_db::StoreTx;
use subhub_events::jobs::JOB_EXTERNAL_SYNC;
use subhub_events::{Job, JobError, JobHandler, Outbox};

use crate::context::ServiceContext;
use crate::error::PipelineResult;

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("Target rejected the push: {0}")]
    Rejected(String),

    #[error("Target unreachable: {0}")]
    Unavailable(String),
}

/// An external site that accepts subtitle pushes.
#[async_trait]
pub trait SyncTarget: Send + Sync {
    fn name(&self) -> &str;

    async fn push(&self, payload: &SyncPayload) -> Result<(), SyncError>;
}

/// Logs every payload instead of sending it anywhere. Used when no real
/// adapter is configured.
pub struct LogSyncTarget;

#[async_trait]
impl SyncTarget for LogSyncTarget {
    fn name(&self) -> &str {
        "log"
    }

    async fn push(&self, payload: &SyncPayload) -> Result<(), SyncError> {
        tracing::info!(
            video_id = %payload.video_id,
            language = %payload.language_code,
            version = payload.version_number,
            bytes = payload.body.len(),
            "External sync payload prepared",
        );
        Ok(())
    }
}

/// Result of one gate evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SyncOutcome {
    Pushed { version_number: i32, targets: usize },
    Blocked { reason: SyncBlocked },
    /// The language has no public version to push.
    NothingPublic,
}

pub struct ExternalSyncGate {
    ctx: ServiceContext,
    targets: Vec<Arc<dyn SyncTarget>>,
    pushes: AtomicU64,
    failures: AtomicU64,
}

impl ExternalSyncGate {
    pub fn new(ctx: ServiceContext, targets: Vec<Arc<dyn SyncTarget>>) -> Self {
        Self {
            ctx,
            targets,
            pushes: AtomicU64::new(0),
            failures: AtomicU64::new(0),
        }
    }

    pub fn push_count(&self) -> u64 {
        self.pushes.load(Ordering::Relaxed)
    }

    pub fn failure_count(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }

    /// Evaluate the gate and build the payload for the public tip.
    pub async fn prepare(
        &self,
        video_id: &str,
        language_code: &str,
    ) -> PipelineResult<Result<SyncPayload, SyncOutcome>> {
        let mut tx = self.ctx.begin().await?;
        let result = self.prepare_in(tx.as_mut(), video_id, language_code).await;
        self.ctx.finish(tx, Outbox::new(), result).await
    }

    async fn prepare_in(
        &self,
        tx: &mut dyn StoreTx,
        video_id: &str,
        language_code: &str,
    ) -> PipelineResult<Result<SyncPayload, SyncOutcome>> {
        let video = tx
            .get_video(video_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Video", video_id))?;
        let language = tx
            .get_language(video_id, language_code)
            .await?
            .ok_or_else(|| CoreError::not_found("SubtitleLanguage", language_code))?;
        let versions = tx.list_versions(language.id).await?;
        let Some(version) = public_tip(&versions) else {
            return Ok(Err(SyncOutcome::NothingPublic));
        };

        let sync_disabled = match tx.get_team_video_by_video(video_id).await? {
            Some(tv) => tx.get_team(tv.team_id).await?.is_some_and(|t| t.sync_disabled),
            None => false,
        };
        let duration_ms = match check_sync(version.subtitle_set(), sync_disabled, video.duration_ms) {
            Ok(duration) => duration,
            Err(reason) => return Ok(Err(SyncOutcome::Blocked { reason })),
        };

        let credit = CreditSettings {
            text: &self.ctx.config.sync_credit_text,
            window_ms: self.ctx.config.sync_credit_window_ms,
            format: SubtitleFormat::Srt,
        };
        let payload = prepare_payload(
            video_id,
            language_code,
            version.version_number,
            version.subtitle_set(),
            duration_ms,
            &credit,
        )?;
        Ok(Ok(payload))
    }

    /// Prepare and push to every target.
    pub async fn push(&self, video_id: &str, language_code: &str) -> PipelineResult<SyncOutcome> {
        let payload = match self.prepare(video_id, language_code).await? {
            Ok(payload) => payload,
            Err(outcome) => {
                tracing::debug!(video_id, language = language_code, ?outcome, "External sync skipped");
                return Ok(outcome);
            }
        };

        let mut delivered = 0;
        for target in &self.targets {
            match target.push(&payload).await {
                Ok(()) => {
                    delivered += 1;
                    self.pushes.fetch_add(1, Ordering::Relaxed);
                }
                Err(e) => {
                    let failures = self.failures.fetch_add(1, Ordering::Relaxed) + 1;
                    tracing::error!(
                        sync_target = target.name(),
                        video_id,
                        language = language_code,
                        failures,
                        error = %e,
                        "External sync push failed",
                    );
                }
            }
        }
        Ok(SyncOutcome::Pushed {
            version_number: payload.version_number,
            targets: delivered,
        })
    }
}

/// Queue a push for `(video_id, language_code)` unless one is already
/// queued in this outbox.
pub(crate) fn enqueue_sync(outbox: &mut Outbox, video_id: &str, language_code: &str) {
    let queued = outbox.jobs().iter().any(|job| {
        job.name == JOB_EXTERNAL_SYNC
            && job.payload["video_id"] == video_id
            && job.payload["language_code"] == language_code
    });
    if !queued {
        outbox.job(Job::new(
            JOB_EXTERNAL_SYNC,
            json!({ "video_id": video_id, "language_code": language_code }),
        ));
    }
}

// ---------------------------------------------------------------------------
// Job handler
// ---------------------------------------------------------------------------

pub struct SyncJobHandler {
    gate: Arc<ExternalSyncGate>,
}

impl SyncJobHandler {
    pub fn new(gate: Arc<ExternalSyncGate>) -> Self {
        Self { gate }
    }
}

#[async_trait]
impl JobHandler for SyncJobHandler {
    async fn handle(&self, job: &Job) -> Result<(), JobError> {
        let field = |name: &str| {
            job.payload[name]
                .as_str()
                .map(str::to_string)
                .ok_or_else(|| JobError::Payload(format!("missing '{name}'")))
        };
        let video_id = field("video_id")?;
        let language_code = field("language_code")?;
        self.gate
            .push(&video_id, &language_code)
            .await
            .map(|_| ())
            .map_err(|e| JobError::Failed(e.to_string()))
    }
}
