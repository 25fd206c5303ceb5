//! Shared fixtures for service-level tests.
//!
//! Everything runs against `MemoryStore` with a `ManualClock`, so no
//! database is needed and time only moves when a test says so.

#![allow(dead_code)]

use std::sync::Arc;

use subhub_core::clock::ManualClock;
use subhub_core::roles::TeamRole;
use subhub_core::subtitles::SubtitleSet;
use subhub_core::types::DbId;
use subhub_core::workflow::{ApproveAllowed, ReviewAllowed, WorkflowSettings};
use subhub_db::models::team::{NewTeam, Team};
use subhub_db::models::version::SubtitleVersion;
use subhub_db::{MemoryStore, Store};
use subhub_events::{EventBus, Job, JobQueue};
use subhub_pipeline::pipeline::AddSubtitlesOptions;
use subhub_pipeline::teams::{UpdateTeam, WorkflowScope};
use subhub_pipeline::videos::CreateVideo;
use subhub_pipeline::workflow::TeamScope;
use subhub_pipeline::{PipelineConfig, ServiceContext, Services};
use tokio::sync::mpsc::UnboundedReceiver;

pub struct Harness {
    pub services: Services,
    pub store: Arc<MemoryStore>,
    pub clock: Arc<ManualClock>,
    pub events: Arc<EventBus>,
    pub jobs: UnboundedReceiver<Job>,
    urls: std::sync::atomic::AtomicUsize,
}

impl Harness {
    pub fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::default());
        let events = Arc::new(EventBus::new(256));
        let (queue, jobs) = JobQueue::channel();
        let ctx = ServiceContext::new(
            store.clone(),
            clock.clone(),
            Arc::clone(&events),
            queue,
            PipelineConfig::default(),
        );
        Self {
            services: Services::new(ctx, Vec::new()),
            store,
            clock,
            events,
            jobs,
            urls: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    /// Names of the jobs enqueued since the last drain.
    pub fn drain_jobs(&mut self) -> Vec<String> {
        let mut names = Vec::new();
        while let Ok(job) = self.jobs.try_recv() {
            names.push(job.name);
        }
        names
    }

    pub async fn user(&self, username: &str) -> DbId {
        let mut tx = self.store.begin().await.unwrap();
        let user = tx.create_user(username).await.unwrap();
        tx.commit().await.unwrap();
        user.id
    }

    /// A video with English audio and a known duration.
    pub async fn video(&self, actor: DbId, team: Option<&str>) -> String {
        let n = self.urls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        self.services
            .videos
            .create_video(
                Some(actor),
                CreateVideo {
                    url: format!("https://videos.example.com/watch/{n}"),
                    primary_audio_language_code: Some("en".to_string()),
                    title: format!("Video {n}"),
                    duration_ms: Some(60_000),
                    team: team.map(str::to_string),
                    ..CreateVideo::default()
                },
            )
            .await
            .unwrap()
            .video
            .id
    }

    /// A team owned by `owner`, with `settings` as its team-level workflow.
    pub async fn team(&self, owner: DbId, slug: &str, settings: Option<WorkflowSettings>) -> Team {
        let teams = &self.services.teams;
        let team = teams
            .create_team(
                Some(owner),
                NewTeam {
                    slug: slug.to_string(),
                    name: slug.to_uppercase(),
                    description: String::new(),
                    workflow_enabled: settings.is_some(),
                    task_expiration_days: None,
                    max_tasks_per_member: None,
                    subtitle_policy: "anyone".to_string(),
                    translate_policy: "anyone".to_string(),
                    sync_disabled: false,
                },
            )
            .await
            .unwrap();
        if let Some(settings) = settings {
            teams
                .set_workflow(slug, Some(owner), WorkflowScope::default(), settings)
                .await
                .unwrap();
        }
        team
    }

    pub async fn update_team(&self, slug: &str, owner: DbId, update: UpdateTeam) -> Team {
        self.services
            .teams
            .update_team(slug, Some(owner), update)
            .await
            .unwrap()
    }

    /// Invite `user` as `role` and accept on their behalf.
    pub async fn join(&self, slug: &str, inviter: DbId, username: &str, user: DbId, role: TeamRole) {
        let teams = &self.services.teams;
        let invitation = teams
            .add_member(slug, Some(inviter), username, role, "")
            .await
            .unwrap();
        teams
            .answer_invitation(invitation.id, Some(user), true)
            .await
            .unwrap();
    }

    pub async fn add(
        &self,
        video_id: &str,
        lc: &str,
        triples: &[(i64, i64, &str)],
        options: AddSubtitlesOptions,
    ) -> SubtitleVersion {
        self.services
            .pipeline
            .add_subtitles(video_id, lc, SubtitleSet::from_timed(triples), options)
            .await
            .unwrap()
    }

    pub async fn scope(&self, video_id: &str) -> TeamScope {
        let mut tx = self.store.begin().await.unwrap();
        let scope = self
            .services
            .workflow
            .scope_for_video(tx.as_mut(), video_id)
            .await
            .unwrap()
            .unwrap();
        tx.rollback().await.unwrap();
        scope
    }

    pub async fn version(&self, video_id: &str, lc: &str, n: i32) -> SubtitleVersion {
        let mut tx = self.store.begin().await.unwrap();
        let version = tx
            .get_version_by_number(video_id, lc, n)
            .await
            .unwrap()
            .unwrap();
        tx.rollback().await.unwrap();
        version
    }
}

pub fn by(author: DbId) -> AddSubtitlesOptions {
    AddSubtitlesOptions {
        author: Some(author),
        ..AddSubtitlesOptions::default()
    }
}

pub fn moderated(review: ReviewAllowed, approve: ApproveAllowed) -> WorkflowSettings {
    WorkflowSettings {
        autocreate_subtitle: false,
        autocreate_translate: false,
        review_allowed: review,
        approve_allowed: approve,
    }
}
