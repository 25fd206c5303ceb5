//! Service rules around the pipeline: tasks, membership, URLs, history
//! visibility, signoffs and the external sync gate.

mod common;

use std::sync::{Arc, Mutex};

use assert_matches::assert_matches;
use async_trait::async_trait;
use common::{by, moderated, Harness};
use subhub_core::error::CoreError;
use subhub_core::external_sync::{SyncBlocked, SyncPayload};
use subhub_core::roles::TeamRole;
use subhub_core::subtitles::{SubtitleItem, SubtitleSet};
use subhub_core::tasks::{TaskFilter, TaskType};
use subhub_core::workflow::{ApproveAllowed, ReviewAllowed, WorkflowAction};
use subhub_pipeline::collaborators::SaveSignoff;
use subhub_pipeline::external_sync::{ExternalSyncGate, SyncError, SyncOutcome, SyncTarget};
use subhub_pipeline::pipeline::AddSubtitlesOptions;
use subhub_pipeline::tasks::CreateTask;
use subhub_pipeline::teams::UpdateTeam;
use subhub_pipeline::videos::CreateVideo;

fn translate(video_id: &str, language: &str, assignee: Option<&str>) -> CreateTask {
    CreateTask {
        video_id: video_id.to_string(),
        task_type: TaskType::Translate,
        language: language.to_string(),
        assignee: assignee.map(str::to_string),
        priority: 0,
    }
}

// ---------------------------------------------------------------------------
// Tasks
// ---------------------------------------------------------------------------

#[tokio::test]
async fn assignment_respects_member_capacity() {
    let h = Harness::new();
    let owner = h.user("owner").await;
    let member = h.user("member").await;
    h.team(owner, "crew", None).await;
    h.join("crew", owner, "member", member, TeamRole::Contributor).await;
    h.update_team(
        "crew",
        owner,
        UpdateTeam {
            max_tasks_per_member: Some(1),
            ..UpdateTeam::default()
        },
    )
    .await;
    let video = h.video(owner, Some("crew")).await;
    let tasks = &h.services.tasks;

    let first = tasks
        .create("crew", Some(owner), translate(&video, "fr", Some("member")))
        .await
        .unwrap();
    assert_eq!(first.assignee_id, Some(member));

    let err = tasks
        .create("crew", Some(owner), translate(&video, "de", Some("member")))
        .await
        .unwrap_err();
    assert_matches!(err.into_core(), CoreError::Validation(msg) if msg.contains("limit 1"));

    let err = tasks
        .create("crew", Some(owner), translate(&video, "de", Some("stranger")))
        .await
        .unwrap_err();
    assert_matches!(err.into_core(), CoreError::NotFound { entity: "User", .. });

    let mine = tasks
        .list(
            "crew",
            Some(member),
            TaskFilter {
                assignee_id: Some(member),
                ..TaskFilter::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0].id, first.id);
}

#[tokio::test]
async fn contributors_cannot_create_tasks_but_may_take_them() {
    let h = Harness::new();
    let owner = h.user("owner").await;
    let member = h.user("member").await;
    h.team(owner, "crew", None).await;
    h.join("crew", owner, "member", member, TeamRole::Contributor).await;
    let video = h.video(owner, Some("crew")).await;
    let tasks = &h.services.tasks;

    let err = tasks
        .create("crew", Some(member), translate(&video, "fr", None))
        .await
        .unwrap_err();
    assert_matches!(err.into_core(), CoreError::Forbidden(_));

    let task = tasks
        .create("crew", Some(owner), translate(&video, "fr", None))
        .await
        .unwrap();
    let taken = tasks
        .assign("crew", task.id, Some(member), Some("member"))
        .await
        .unwrap();
    assert_eq!(taken.assignee_id, Some(member));
}

#[tokio::test]
async fn authoring_task_needs_a_language_unless_subtitle() {
    let h = Harness::new();
    let owner = h.user("owner").await;
    h.team(owner, "crew", None).await;
    let video = h.video(owner, Some("crew")).await;

    let err = h
        .services
        .tasks
        .create("crew", Some(owner), translate(&video, "", None))
        .await
        .unwrap_err();
    assert_matches!(err.into_core(), CoreError::Validation(_));

    let subtitle = h
        .services
        .tasks
        .create(
            "crew",
            Some(owner),
            CreateTask {
                task_type: TaskType::Subtitle,
                ..translate(&video, "", None)
            },
        )
        .await
        .unwrap();
    assert!(subtitle.language_code.is_empty());
}

#[tokio::test]
async fn completed_tasks_are_kept_and_open_ones_deleted() {
    let h = Harness::new();
    let owner = h.user("owner").await;
    h.team(owner, "crew", None).await;
    let video = h.video(owner, Some("crew")).await;
    let tasks = &h.services.tasks;

    let fr = tasks
        .create("crew", Some(owner), translate(&video, "fr", None))
        .await
        .unwrap();
    let de = tasks
        .create("crew", Some(owner), translate(&video, "de", None))
        .await
        .unwrap();

    h.add(
        &video,
        "fr",
        &[(0, 1000, "bonjour")],
        AddSubtitlesOptions {
            action: Some(WorkflowAction::Complete),
            ..by(owner)
        },
    )
    .await;
    let fr = tasks.get("crew", fr.id, Some(owner)).await.unwrap();
    assert!(fr.completed_at.is_some());
    assert!(fr.subtitle_version_id.is_some());

    let err = tasks.delete("crew", fr.id, Some(owner)).await.unwrap_err();
    assert_matches!(err.into_core(), CoreError::Validation(msg) if msg.contains("cannot be deleted"));

    tasks.delete("crew", de.id, Some(owner)).await.unwrap();
    let err = tasks.get("crew", de.id, Some(owner)).await.unwrap_err();
    assert_matches!(err.into_core(), CoreError::NotFound { entity: "Task", .. });

    let open = tasks
        .list(
            "crew",
            Some(owner),
            TaskFilter {
                open: Some(true),
                ..TaskFilter::default()
            },
        )
        .await
        .unwrap();
    assert!(open.is_empty());
}

// ---------------------------------------------------------------------------
// Membership
// ---------------------------------------------------------------------------

#[tokio::test]
async fn invitation_becomes_membership_on_accept() {
    let h = Harness::new();
    let owner = h.user("owner").await;
    let guest = h.user("guest").await;
    let other = h.user("other").await;
    h.team(owner, "crew", None).await;
    let teams = &h.services.teams;

    let invitation = teams
        .add_member("crew", Some(owner), "guest", TeamRole::Manager, "welcome")
        .await
        .unwrap();
    let members = teams.list_members("crew", Some(owner)).await.unwrap();
    assert_eq!(members.len(), 1);

    let err = teams
        .answer_invitation(invitation.id, Some(other), true)
        .await
        .unwrap_err();
    assert_matches!(err.into_core(), CoreError::Forbidden(_));

    teams
        .answer_invitation(invitation.id, Some(guest), true)
        .await
        .unwrap();
    let members = teams.list_members("crew", Some(guest)).await.unwrap();
    let joined = members.iter().find(|m| m.username == "guest").unwrap();
    assert_eq!(joined.role, TeamRole::Manager);

    assert!(teams
        .answer_invitation(invitation.id, Some(guest), false)
        .await
        .is_err());
    let err = teams
        .add_member("crew", Some(owner), "guest", TeamRole::Contributor, "")
        .await
        .unwrap_err();
    assert_matches!(err.into_core(), CoreError::Conflict(_));
}

#[tokio::test]
async fn blacklisted_language_refuses_new_versions() {
    let h = Harness::new();
    let owner = h.user("owner").await;
    h.team(owner, "crew", None).await;
    h.services
        .language_prefs
        .set_blacklisted("crew", Some(owner), vec!["de".to_string()])
        .await
        .unwrap();
    let video = h.video(owner, Some("crew")).await;

    let err = h
        .services
        .pipeline
        .add_subtitles(&video, "de", SubtitleSet::new(), by(owner))
        .await
        .unwrap_err();
    assert_matches!(err.into_core(), CoreError::Validation(msg) if msg.contains("'de'"));
    h.add(&video, "fr", &[(0, 10, "ok")], by(owner)).await;
}

// ---------------------------------------------------------------------------
// Videos and URLs
// ---------------------------------------------------------------------------

#[tokio::test]
async fn primary_url_must_be_replaced_before_deletion() {
    let h = Harness::new();
    let owner = h.user("owner").await;
    let video = h.video(owner, None).await;
    let videos = &h.services.videos;

    let original = videos.list_urls(&video).await.unwrap().remove(0);
    assert!(original.is_primary);
    assert!(original.original);

    let err = videos
        .create_video(
            Some(owner),
            CreateVideo {
                url: original.url.clone(),
                ..CreateVideo::default()
            },
        )
        .await
        .unwrap_err();
    assert_matches!(err.into_core(), CoreError::Validation(msg) if msg.starts_with("video-exists"));

    let mirror = videos
        .add_url(&video, Some(owner), "https://mirror.example.com/v/1", false)
        .await
        .unwrap();
    assert!(!mirror.is_primary);

    let err = videos
        .delete_url(&video, original.id, Some(owner))
        .await
        .unwrap_err();
    assert_matches!(err.into_core(), CoreError::Validation(_));

    videos.make_primary(&video, mirror.id, Some(owner)).await.unwrap();
    videos.delete_url(&video, original.id, Some(owner)).await.unwrap();
    let urls = videos.list_urls(&video).await.unwrap();
    assert_eq!(urls.len(), 1);
    assert!(urls[0].is_primary);
}

#[tokio::test]
async fn project_without_team_is_rejected() {
    let h = Harness::new();
    let owner = h.user("owner").await;
    let err = h
        .services
        .videos
        .create_video(
            Some(owner),
            CreateVideo {
                url: "https://videos.example.com/orphan".to_string(),
                project: Some("docs".to_string()),
                ..CreateVideo::default()
            },
        )
        .await
        .unwrap_err();
    assert_matches!(err.into_core(), CoreError::Validation(msg) if msg.starts_with("unknown-project"));
}

#[tokio::test]
async fn private_history_is_hidden_from_outsiders() {
    let h = Harness::new();
    let owner = h.user("owner").await;
    let writer = h.user("writer").await;
    let outsider = h.user("outsider").await;
    h.team(
        owner,
        "crew",
        Some(moderated(ReviewAllowed::Manager, ApproveAllowed::None)),
    )
    .await;
    let video = h.video(owner, Some("crew")).await;
    h.add(&video, "en", &[(0, 1000, "draft")], by(writer)).await;

    let videos = &h.services.videos;
    assert_eq!(videos.list_versions(&video, "en", Some(owner)).await.unwrap().len(), 1);
    assert_eq!(videos.list_versions(&video, "en", Some(writer)).await.unwrap().len(), 1);
    assert!(videos.list_versions(&video, "en", Some(outsider)).await.unwrap().is_empty());

    let err = videos
        .get_subtitles(&video, "en", None, None)
        .await
        .unwrap_err();
    assert_matches!(err.into_core(), CoreError::NotFound { .. });
    let tip = videos
        .get_subtitles(&video, "en", None, Some(owner))
        .await
        .unwrap();
    assert_eq!(tip.version_number, 1);
}

#[tokio::test]
async fn diff_reports_changed_items() {
    let h = Harness::new();
    let u1 = h.user("alice").await;
    let video = h.video(u1, None).await;
    h.add(&video, "en", &[(0, 100, "a"), (100, 200, "b")], by(u1)).await;
    h.add(&video, "en", &[(0, 100, "a"), (100, 200, "B")], by(u1)).await;

    let videos = &h.services.videos;
    let diff = videos.diff_versions(&video, "en", 1, 2, None).await.unwrap();
    assert!(diff.is_changed());
    let same = videos.diff_versions(&video, "en", 2, 2, None).await.unwrap();
    assert!(!same.is_changed());

    let err = videos.diff_versions(&video, "en", 1, 7, None).await.unwrap_err();
    assert_matches!(err.into_core(), CoreError::Validation(_));
}

#[tokio::test]
async fn notes_need_a_signed_in_author() {
    let h = Harness::new();
    let u1 = h.user("alice").await;
    let video = h.video(u1, None).await;
    let videos = &h.services.videos;

    let err = videos.add_note(&video, "en", None, "hi").await.unwrap_err();
    assert_matches!(err.into_core(), CoreError::Unauthorized(_));
    let err = videos.add_note(&video, "en", Some(u1), "  ").await.unwrap_err();
    assert_matches!(err.into_core(), CoreError::Validation(_));

    videos
        .add_note(&video, "en", Some(u1), " timing is off at 0:42 ")
        .await
        .unwrap();
    let notes = videos.list_notes(&video, "en", None).await.unwrap();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].body, "timing is off at 0:42");
}

// ---------------------------------------------------------------------------
// Signoffs
// ---------------------------------------------------------------------------

#[tokio::test]
async fn collaborator_signoffs_update_language_counters() {
    let h = Harness::new();
    let u1 = h.user("alice").await;
    let u2 = h.user("bruno").await;
    let video = h.video(u1, None).await;
    h.add(&video, "en", &[(0, 100, "a")], by(u1)).await;
    let collaborators = &h.services.collaborators;

    collaborators
        .save_collaborator(
            &video,
            "en",
            SaveSignoff {
                user_id: u1,
                signoff: true,
                signoff_is_official: true,
                ..SaveSignoff::default()
            },
        )
        .await
        .unwrap();
    collaborators
        .save_collaborator(
            &video,
            "en",
            SaveSignoff {
                user_id: u2,
                ..SaveSignoff::default()
            },
        )
        .await
        .unwrap();
    // Saving the same user again replaces the earlier row.
    collaborators
        .save_collaborator(
            &video,
            "en",
            SaveSignoff {
                user_id: u2,
                signoff: true,
                signoff_is_official: true,
                ..SaveSignoff::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(collaborators.list(&video, "en").await.unwrap().len(), 2);
    let languages = h.services.videos.list_languages(&video, None).await.unwrap();
    assert_eq!(languages[0].official_signoff_count, 2);
}

// ---------------------------------------------------------------------------
// External sync
// ---------------------------------------------------------------------------

#[derive(Default)]
struct RecordingTarget {
    pushed: Mutex<Vec<SyncPayload>>,
}

#[async_trait]
impl SyncTarget for RecordingTarget {
    fn name(&self) -> &str {
        "recording"
    }

    async fn push(&self, payload: &SyncPayload) -> Result<(), SyncError> {
        self.pushed.lock().unwrap().push(payload.clone());
        Ok(())
    }
}

struct DownTarget;

#[async_trait]
impl SyncTarget for DownTarget {
    fn name(&self) -> &str {
        "down"
    }

    async fn push(&self, _payload: &SyncPayload) -> Result<(), SyncError> {
        Err(SyncError::Unavailable("connection refused".to_string()))
    }
}

#[tokio::test]
async fn public_synced_tip_is_pushed_with_credit() {
    let mut h = Harness::new();
    let u1 = h.user("alice").await;
    let video = h.video(u1, None).await;
    h.add(&video, "en", &[(0, 1000, "hello")], by(u1)).await;
    assert!(h.drain_jobs().iter().any(|j| j == "external_sync.push"));

    let recorder = Arc::new(RecordingTarget::default());
    let targets = vec![
        Arc::clone(&recorder) as Arc<dyn SyncTarget>,
        Arc::new(DownTarget) as Arc<dyn SyncTarget>,
    ];
    let gate = ExternalSyncGate::new(h.services.ctx.clone(), targets);
    let outcome = gate.push(&video, "en").await.unwrap();
    assert_eq!(
        outcome,
        SyncOutcome::Pushed {
            version_number: 1,
            targets: 1
        }
    );
    assert_eq!(gate.push_count(), 1);
    assert_eq!(gate.failure_count(), 1);

    let pushed = recorder.pushed.lock().unwrap();
    assert_eq!(pushed.len(), 1);
    assert!(pushed[0].body.contains("hello"));
    assert!(pushed[0].body.contains(&h.services.ctx.config.sync_credit_text));
}

#[tokio::test]
async fn unsynced_or_disabled_languages_are_blocked() {
    let h = Harness::new();
    let owner = h.user("owner").await;
    let video = h.video(owner, None).await;
    let gate = ExternalSyncGate::new(h.services.ctx.clone(), Vec::new());

    h.services
        .pipeline
        .add_subtitles(
            &video,
            "en",
            SubtitleSet::from_items(vec![SubtitleItem::new(None, None, "untimed")]),
            by(owner),
        )
        .await
        .unwrap();
    assert_eq!(
        gate.push(&video, "en").await.unwrap(),
        SyncOutcome::Blocked {
            reason: SyncBlocked::NotFullySynced
        }
    );

    h.team(owner, "quiet", None).await;
    h.update_team(
        "quiet",
        owner,
        UpdateTeam {
            sync_disabled: Some(true),
            ..UpdateTeam::default()
        },
    )
    .await;
    let team_video = h.video(owner, Some("quiet")).await;
    h.add(&team_video, "en", &[(0, 1000, "hi")], by(owner)).await;
    assert_eq!(
        gate.push(&team_video, "en").await.unwrap(),
        SyncOutcome::Blocked {
            reason: SyncBlocked::TeamSyncDisabled
        }
    );
}
