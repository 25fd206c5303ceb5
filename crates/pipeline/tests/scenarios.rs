//! End-to-end behaviour of the pipeline, workflow engine and write-locks.
//!
//! Each test drives the public services the way the API does and checks
//! the resulting history, visibility and task rows.

mod common;

use assert_matches::assert_matches;
use common::{by, moderated, Harness};
use subhub_core::error::CoreError;
use subhub_core::roles::TeamRole;
use subhub_core::tasks::{TaskApproval, TaskFilter, TaskType};
use subhub_core::version_graph::{validate_contiguous, ParentRef, ParentSpec};
use subhub_core::visibility::{VersionVisibility, Visibility};
use subhub_core::workflow::{ApproveAllowed, ReviewAllowed, WorkflowAction, WorkflowSettings};
use subhub_core::writelock::WRITELOCK_EXPIRATION_SECS;
use subhub_pipeline::pipeline::AddSubtitlesOptions;
use subhub_pipeline::tasks::CreateTask;

// ---------------------------------------------------------------------------
// History and lineage
// ---------------------------------------------------------------------------

#[tokio::test]
async fn linear_history_builds_lineage_from_previous_tip() {
    let h = Harness::new();
    let u1 = h.user("alice").await;
    let video = h.video(u1, None).await;

    h.add(&video, "en", &[], by(u1)).await;
    h.add(&video, "en", &[(100, 200, "a")], by(u1)).await;
    let v3 = h
        .add(&video, "en", &[(100, 200, "a"), (300, 400, "b")], by(u1))
        .await;

    assert_eq!(v3.version_number, 3);
    assert_eq!(v3.parents.0, vec![ParentRef::new("en", 2)]);
    assert_eq!(v3.lineage.0.get("en"), Some(2));
    assert_eq!(v3.lineage.0.len(), 1);

    let ancestors = h.services.pipeline.ancestors(&video, "en", 3).await.unwrap();
    assert_eq!(ancestors, vec![ParentRef::new("en", 1), ParentRef::new("en", 2)]);
}

#[tokio::test]
async fn source_edit_after_translation_flags_it_stale() {
    let h = Harness::new();
    let u1 = h.user("alice").await;
    let u2 = h.user("bruno").await;
    let video = h.video(u1, None).await;

    h.add(&video, "en", &[], by(u1)).await;
    h.add(&video, "en", &[(100, 200, "a")], by(u1)).await;
    let v3 = h
        .add(&video, "en", &[(100, 200, "a"), (300, 400, "b")], by(u1))
        .await;

    let fr1 = h
        .add(
            &video,
            "fr",
            &[(100, 200, "aa")],
            AddSubtitlesOptions {
                parents: vec![ParentSpec::from(&v3)],
                ..by(u2)
            },
        )
        .await;
    assert_eq!(fr1.version_number, 1);
    assert_eq!(fr1.lineage.0.get("en"), Some(3));
    assert_eq!(fr1.lineage.0.get("fr"), None);

    let videos = &h.services.videos;
    let status = videos.translation_status(&video, "fr").await.unwrap().unwrap();
    assert!(!status.is_stale);

    h.add(&video, "en", &[(100, 250, "a"), (300, 400, "b")], by(u1))
        .await;
    let status = videos.translation_status(&video, "fr").await.unwrap().unwrap();
    assert_eq!(status.source_language, "en");
    assert_eq!(status.seen_source_version, 3);
    assert_eq!(status.source_tip_version, 4);
    assert!(status.is_stale);

    // Forking ends the source relationship; the report goes away.
    videos.fork_language(&video, "fr", Some(u2)).await.unwrap();
    assert!(videos.translation_status(&video, "fr").await.unwrap().is_none());
}

#[tokio::test]
async fn locked_before_first_save_still_tracks_its_source() {
    let h = Harness::new();
    let u1 = h.user("alice").await;
    let u2 = h.user("bruno").await;
    let video = h.video(u1, None).await;
    let en1 = h.add(&video, "en", &[(0, 1000, "hello")], by(u1)).await;

    // The editor locks the language before anything is saved, which
    // creates the row with no source.
    h.services
        .writelocks
        .writelock(&video, "fr", Some(u2), "s2")
        .await
        .unwrap();

    let fr1 = h
        .add(
            &video,
            "fr",
            &[(0, 1000, "bonjour")],
            AddSubtitlesOptions {
                parents: vec![ParentSpec::from(&en1)],
                action: Some(WorkflowAction::SaveDraft),
                ..by(u2)
            },
        )
        .await;
    assert_eq!(fr1.lineage.0.get("en"), Some(1));

    h.add(&video, "en", &[(0, 1200, "hello")], by(u1)).await;
    let status = h
        .services
        .videos
        .translation_status(&video, "fr")
        .await
        .unwrap()
        .expect("fr translates en");
    assert_eq!(status.source_language, "en");
    assert_eq!(status.seen_source_version, 1);
    assert_eq!(status.source_tip_version, 2);
    assert!(status.is_stale);
}

#[tokio::test]
async fn parent_from_another_video_is_rejected() {
    let h = Harness::new();
    let u1 = h.user("alice").await;
    let first = h.video(u1, None).await;
    let second = h.video(u1, None).await;
    let foreign = h.add(&first, "en", &[(0, 10, "x")], by(u1)).await;

    let err = h
        .services
        .pipeline
        .add_subtitles(
            &second,
            "fr",
            Default::default(),
            AddSubtitlesOptions {
                parents: vec![ParentSpec::from(&foreign)],
                ..by(u1)
            },
        )
        .await
        .unwrap_err();
    assert_matches!(err.into_core(), CoreError::VersionNotInVideo(_));

    // Nothing was created for the failed call.
    let languages = h.services.videos.list_languages(&second, Some(u1)).await.unwrap();
    assert!(languages.is_empty());
}

#[tokio::test]
async fn version_race_is_retried_once() {
    let h = Harness::new();
    let u1 = h.user("alice").await;
    let video = h.video(u1, None).await;

    h.store.fail_next_version_inserts(1);
    let v1 = h.add(&video, "en", &[(0, 10, "x")], by(u1)).await;
    assert_eq!(v1.version_number, 1);

    h.store.fail_next_version_inserts(2);
    let err = h
        .services
        .pipeline
        .add_subtitles(&video, "en", Default::default(), by(u1))
        .await
        .unwrap_err();
    assert!(err.is_version_conflict());
    assert_matches!(err.into_core(), CoreError::Conflict(_));

    // The failed call left no gap behind.
    let v2 = h.add(&video, "en", &[(0, 10, "y")], by(u1)).await;
    assert_eq!(v2.version_number, 2);
    let numbers: Vec<i32> = h
        .services
        .videos
        .list_versions(&video, "en", Some(u1))
        .await
        .unwrap()
        .iter()
        .map(|v| v.version_number)
        .collect();
    validate_contiguous(numbers).unwrap();
}

// ---------------------------------------------------------------------------
// Rollback
// ---------------------------------------------------------------------------

#[tokio::test]
async fn rollback_is_public_when_any_sibling_was_published() {
    let h = Harness::new();
    let owner = h.user("owner").await;
    let writer = h.user("writer").await;
    h.team(
        owner,
        "captioners",
        Some(moderated(ReviewAllowed::Manager, ApproveAllowed::Admin)),
    )
    .await;
    let video = h.video(owner, Some("captioners")).await;

    let v1 = h
        .add(
            &video,
            "en",
            &[(0, 1000, "hello")],
            AddSubtitlesOptions {
                title: Some("First".to_string()),
                action: Some(WorkflowAction::Complete),
                ..by(writer)
            },
        )
        .await;
    assert_eq!(v1.effective_visibility(), Visibility::Private);

    // Review, then approval, publishes v1.
    let pipeline = &h.services.pipeline;
    pipeline
        .perform_action(&video, "en", Some(owner), WorkflowAction::Approve)
        .await
        .unwrap();
    assert!(!h.version(&video, "en", 1).await.is_public());
    pipeline
        .perform_action(&video, "en", Some(owner), WorkflowAction::Approve)
        .await
        .unwrap();
    assert!(h.version(&video, "en", 1).await.is_public());

    let v2 = h.add(&video, "en", &[(0, 1000, "bye")], by(writer)).await;
    assert_eq!(v2.effective_visibility(), Visibility::Private);

    let v3 = pipeline.rollback_to(&video, "en", 1, Some(owner)).await.unwrap();
    assert_eq!(v3.version_number, 3);
    assert_eq!(v3.rollback_of_version_number, Some(1));
    assert_eq!(v3.subtitle_set(), v1.subtitle_set());
    assert_eq!(v3.title, "First");
    assert_eq!(v3.effective_visibility(), Visibility::Public);
    assert_eq!(v3.parents.0, vec![ParentRef::new("en", 2)]);

    let err = pipeline.rollback_to(&video, "en", 9, Some(owner)).await.unwrap_err();
    assert_matches!(err.into_core(), CoreError::Validation(msg) if msg.contains("invalid version number"));
}

#[tokio::test]
async fn rollback_stays_private_without_public_history() {
    let h = Harness::new();
    let owner = h.user("owner").await;
    h.team(
        owner,
        "captioners",
        Some(moderated(ReviewAllowed::Manager, ApproveAllowed::None)),
    )
    .await;
    let video = h.video(owner, Some("captioners")).await;
    h.add(&video, "en", &[(0, 10, "a")], by(owner)).await;
    h.add(&video, "en", &[(0, 10, "b")], by(owner)).await;

    let v3 = h
        .services
        .pipeline
        .rollback_to(&video, "en", 1, Some(owner))
        .await
        .unwrap();
    assert_eq!(v3.effective_visibility(), Visibility::Private);
}

// ---------------------------------------------------------------------------
// Workflow
// ---------------------------------------------------------------------------

#[tokio::test]
async fn rejected_review_reopens_translation_for_its_author() {
    let mut h = Harness::new();
    let admin = h.user("admin").await;
    let translator = h.user("translator").await;
    h.team(
        admin,
        "captioners",
        Some(moderated(ReviewAllowed::Admin, ApproveAllowed::Admin)),
    )
    .await;
    h.join("captioners", admin, "translator", translator, TeamRole::Contributor)
        .await;
    let video = h.video(admin, Some("captioners")).await;

    let tasks = h.services.tasks.clone();
    let translate = tasks
        .create(
            "captioners",
            Some(admin),
            CreateTask {
                video_id: video.clone(),
                task_type: TaskType::Translate,
                language: "fr".to_string(),
                assignee: Some("translator".to_string()),
                priority: 0,
            },
        )
        .await
        .unwrap();
    assert_eq!(translate.assignee_id, Some(translator));

    let v1 = h
        .add(
            &video,
            "fr",
            &[(0, 1000, "bonjour")],
            AddSubtitlesOptions {
                action: Some(WorkflowAction::Complete),
                ..by(translator)
            },
        )
        .await;
    assert!(!v1.is_public());

    let open_review = TaskFilter {
        task_type: Some(TaskType::Review),
        open: Some(true),
        ..TaskFilter::default()
    };
    let reviews = tasks
        .list("captioners", Some(admin), open_review)
        .await
        .unwrap();
    assert_eq!(reviews.len(), 1);
    assert_eq!(reviews[0].subtitle_version_id, Some(v1.id));
    h.drain_jobs();

    let rejected = tasks
        .decide("captioners", reviews[0].id, Some(admin), false, Some("retry".to_string()))
        .await
        .unwrap();
    assert_eq!(rejected.body, "retry");
    assert_eq!(rejected.approval(), Some(TaskApproval::Rejected));
    assert!(rejected.completed_at.is_some());

    let reopened = tasks
        .list(
            "captioners",
            Some(admin),
            TaskFilter {
                task_type: Some(TaskType::Translate),
                open: Some(true),
                ..TaskFilter::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(reopened.len(), 1);
    assert_eq!(reopened[0].language_code, "fr");
    assert_eq!(reopened[0].assignee_id, Some(translator));
    assert_ne!(reopened[0].id, translate.id);

    let v1 = h.version(&video, "fr", 1).await;
    assert_eq!(v1.effective_visibility(), Visibility::Private);
    assert_eq!(v1.visibility_override(), Some(Visibility::Private));
    assert!(h.drain_jobs().iter().any(|j| j == "notifications.send"));
}

#[tokio::test]
async fn resubmission_moves_the_open_review_forward() {
    let h = Harness::new();
    let owner = h.user("owner").await;
    let writer = h.user("writer").await;
    h.team(
        owner,
        "captioners",
        Some(moderated(ReviewAllowed::Manager, ApproveAllowed::None)),
    )
    .await;
    let video = h.video(owner, Some("captioners")).await;
    let complete = || AddSubtitlesOptions {
        action: Some(WorkflowAction::Complete),
        ..by(writer)
    };

    h.add(&video, "en", &[(0, 1000, "draft")], complete()).await;
    let v2 = h.add(&video, "en", &[(0, 1000, "final")], complete()).await;

    let tasks = &h.services.tasks;
    let open_review = || TaskFilter {
        task_type: Some(TaskType::Review),
        open: Some(true),
        ..TaskFilter::default()
    };
    let reviews = tasks
        .list("captioners", Some(owner), open_review())
        .await
        .unwrap();
    assert_eq!(reviews.len(), 1);
    assert_eq!(reviews[0].subtitle_version_id, Some(v2.id));

    h.services
        .pipeline
        .perform_action(&video, "en", Some(owner), WorkflowAction::Approve)
        .await
        .unwrap();
    assert!(h.version(&video, "en", 2).await.is_public());
    assert!(tasks
        .list("captioners", Some(owner), open_review())
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn rejected_approval_reopens_subtitling_for_its_author() {
    let h = Harness::new();
    let admin = h.user("admin").await;
    let writer = h.user("writer").await;
    h.team(
        admin,
        "captioners",
        Some(moderated(ReviewAllowed::None, ApproveAllowed::Admin)),
    )
    .await;
    h.join("captioners", admin, "writer", writer, TeamRole::Contributor)
        .await;
    let video = h.video(admin, Some("captioners")).await;

    let v1 = h
        .add(
            &video,
            "en",
            &[(0, 1000, "hello")],
            AddSubtitlesOptions {
                action: Some(WorkflowAction::Complete),
                ..by(writer)
            },
        )
        .await;
    assert!(!v1.is_public());

    let tasks = &h.services.tasks;
    let approvals = tasks
        .list(
            "captioners",
            Some(admin),
            TaskFilter {
                task_type: Some(TaskType::Approve),
                open: Some(true),
                ..TaskFilter::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(approvals.len(), 1);
    assert_eq!(approvals[0].subtitle_version_id, Some(v1.id));

    let rejected = tasks
        .decide("captioners", approvals[0].id, Some(admin), false, None)
        .await
        .unwrap();
    assert_eq!(rejected.approval(), Some(TaskApproval::Rejected));

    let v1 = h.version(&video, "en", 1).await;
    assert_eq!(v1.visibility_override(), Some(Visibility::Private));
    assert_eq!(v1.effective_visibility(), Visibility::Private);

    let reopened = tasks
        .list(
            "captioners",
            Some(admin),
            TaskFilter {
                task_type: Some(TaskType::Subtitle),
                open: Some(true),
                ..TaskFilter::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(reopened.len(), 1);
    assert_eq!(reopened[0].language_code, "en");
    assert_eq!(reopened[0].assignee_id, Some(writer));
}

#[tokio::test]
async fn publication_autocreates_translations_once() {
    let h = Harness::new();
    let owner = h.user("owner").await;
    h.team(
        owner,
        "captioners",
        Some(WorkflowSettings {
            autocreate_subtitle: true,
            autocreate_translate: true,
            review_allowed: ReviewAllowed::None,
            approve_allowed: ApproveAllowed::None,
        }),
    )
    .await;
    h.services
        .language_prefs
        .set_preferred("captioners", Some(owner), vec!["fr".into(), "de".into()])
        .await
        .unwrap();
    let video = h.video(owner, Some("captioners")).await;

    let tasks = &h.services.tasks;
    let subtitle_tasks = tasks
        .list(
            "captioners",
            Some(owner),
            TaskFilter {
                task_type: Some(TaskType::Subtitle),
                ..TaskFilter::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(subtitle_tasks.len(), 1);
    assert!(subtitle_tasks[0].language_code.is_empty());

    let v1 = h
        .add(
            &video,
            "en",
            &[(0, 1000, "hello")],
            AddSubtitlesOptions {
                action: Some(WorkflowAction::Complete),
                ..by(owner)
            },
        )
        .await;
    assert!(v1.is_public());

    let open_translate = || TaskFilter {
        task_type: Some(TaskType::Translate),
        open: Some(true),
        ..TaskFilter::default()
    };
    let mut languages: Vec<String> = tasks
        .list("captioners", Some(owner), open_translate())
        .await
        .unwrap()
        .into_iter()
        .map(|t| t.language_code)
        .collect();
    languages.sort();
    assert_eq!(languages, vec!["de", "fr"]);

    let created = h
        .services
        .workflow
        .retrigger_translations(&video, "en", Some(owner))
        .await
        .unwrap();
    assert!(created.is_empty());
    let again = tasks
        .list("captioners", Some(owner), open_translate())
        .await
        .unwrap();
    assert_eq!(again.len(), 2);

    let details = h.services.videos.get_video(&video, None).await.unwrap();
    assert!(details.video.complete_date.is_some());
}

#[tokio::test]
async fn approve_without_open_task_is_an_action_error() {
    let h = Harness::new();
    let owner = h.user("owner").await;
    h.team(
        owner,
        "captioners",
        Some(moderated(ReviewAllowed::Manager, ApproveAllowed::None)),
    )
    .await;
    let video = h.video(owner, Some("captioners")).await;

    let err = h
        .services
        .pipeline
        .add_subtitles(
            &video,
            "en",
            Default::default(),
            AddSubtitlesOptions {
                action: Some(WorkflowAction::Approve),
                ..by(owner)
            },
        )
        .await
        .unwrap_err();
    assert_matches!(err.into_core(), CoreError::ActionError(_));
    assert!(h.scope(&video).await.settings.requires_moderation());
}

// ---------------------------------------------------------------------------
// Write-locks
// ---------------------------------------------------------------------------

#[tokio::test]
async fn expired_lock_passes_to_next_session() {
    let h = Harness::new();
    let u1 = h.user("alice").await;
    let u2 = h.user("bruno").await;
    let video = h.video(u1, None).await;
    let locks = &h.services.writelocks;

    let grant = locks.writelock(&video, "en", Some(u1), "s1").await.unwrap();
    assert_eq!(
        (grant.expires_at - grant.locked_at).num_seconds(),
        WRITELOCK_EXPIRATION_SECS
    );
    assert!(!locks.can_writelock(&video, "en", "s2").await.unwrap());

    h.clock.advance_secs(WRITELOCK_EXPIRATION_SECS + 1);
    assert!(locks.can_writelock(&video, "en", "s2").await.unwrap());
    locks.writelock(&video, "en", Some(u2), "s2").await.unwrap();

    let err = locks.writelock(&video, "en", Some(u1), "s1").await.unwrap_err();
    assert_matches!(err.into_core(), CoreError::WriteLocked { holder } if holder == "bruno");

    let err = h
        .services
        .pipeline
        .add_subtitles(
            &video,
            "en",
            Default::default(),
            AddSubtitlesOptions {
                action: Some(WorkflowAction::SaveDraft),
                ..by(u1)
            },
        )
        .await
        .unwrap_err();
    assert_matches!(err.into_core(), CoreError::WriteLocked { .. });

    // The holder itself may keep saving.
    h.add(
        &video,
        "en",
        &[(0, 10, "ok")],
        AddSubtitlesOptions {
            action: Some(WorkflowAction::SaveDraft),
            ..by(u2)
        },
    )
    .await;
}
