//! Workflow resolution and the task state machine.
//!
//! Transitions come from the dispatch table in
//! [`subhub_core::tasks::transition`]; this module loads the state a
//! transition needs, writes the task rows, and applies the resulting
//! [`TaskEffect`]s inside the caller's transaction. Notifications and
//! publication signals go to the caller's [`Outbox`].

use std::collections::{BTreeSet, HashMap};
use std::sync::{Mutex, MutexGuard};

use serde_json::json;
use subhub_core::error::CoreError;
use subhub_core::permissions::{
    can_approve, can_review, has_permission, Membership, Permission, PermissionTarget,
};
use subhub_core::tasks::{
    assignment_expiration, initial_tasks, is_task_expired, transition,
    translation_languages_to_create, TaskApproval, TaskEffect, TaskEvent, TaskType,
    TransitionContext,
};
use subhub_core::types::DbId;
use subhub_core::visibility::{tip, ModerationStatus};
use subhub_core::workflow::{resolve_workflow, WorkflowAction, WorkflowSettings, WorkflowTarget};
use subhub_db::models::language::SubtitleLanguage;
use subhub_db::models::task::{NewTask, Task};
use subhub_db::models::team::{Team, TeamVideo};
use subhub_db::models::version::SubtitleVersion;
use subhub_db::StoreTx;
use subhub_events::bus::{SUBTITLES_PUBLISHED, TASK_COMPLETED, TASK_CREATED, TASK_SENT_BACK};
use subhub_events::jobs::JOB_NOTIFY;
use subhub_events::{DomainEvent, Job, Outbox};

use crate::context::ServiceContext;
use crate::error::PipelineResult;
use crate::external_sync::enqueue_sync;
use crate::language_prefs::LanguagePreferenceService;
use crate::permissions::PermissionService;

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

/// A team video together with its team and resolved workflow.
#[derive(Debug, Clone)]
pub struct TeamScope {
    pub team: Team,
    pub team_video: TeamVideo,
    pub settings: WorkflowSettings,
}

impl TeamScope {
    pub fn video_id(&self) -> &str {
        &self.team_video.video_id
    }

    /// Permission target for work on one language of this video.
    pub fn target(&self, language_code: &str) -> PermissionTarget {
        PermissionTarget::language(self.team_video.project_id, language_code)
    }

    pub fn project_target(&self) -> PermissionTarget {
        PermissionTarget::project(self.team_video.project_id)
    }
}

/// A committed-in-this-transaction version carrying a workflow action.
#[derive(Debug, Clone, Copy)]
pub struct Submission<'a> {
    pub language: &'a SubtitleLanguage,
    pub version: &'a SubtitleVersion,
    pub actor: Option<DbId>,
    pub action: WorkflowAction,
}

/// A reviewer's or approver's verdict.
#[derive(Debug, Clone)]
pub struct Decision {
    pub approve: bool,
    /// The version the verdict applies to.
    pub version_id: DbId,
    /// Reviewer note stored on the task.
    pub body: Option<String>,
}

/// A task the engine is about to open.
#[derive(Debug, Clone)]
pub struct TaskSpec {
    pub task_type: TaskType,
    pub language_code: String,
    pub assignee: Option<DbId>,
    pub version_id: Option<DbId>,
    pub priority: i32,
}

impl TaskSpec {
    pub fn new(task_type: TaskType, language_code: impl Into<String>) -> Self {
        Self {
            task_type,
            language_code: language_code.into(),
            assignee: None,
            version_id: None,
            priority: 0,
        }
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

pub struct WorkflowEngine {
    ctx: ServiceContext,
    /// Resolved settings per team video.
    resolved: Mutex<HashMap<DbId, WorkflowSettings>>,
}

impl WorkflowEngine {
    pub fn new(ctx: ServiceContext) -> Self {
        Self {
            ctx,
            resolved: Mutex::new(HashMap::new()),
        }
    }

    fn cache(&self) -> MutexGuard<'_, HashMap<DbId, WorkflowSettings>> {
        self.resolved.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Drop every cached resolution. Called after a workflow, project or
    /// team switch changes.
    pub fn invalidate(&self) {
        self.cache().clear();
        tracing::debug!("Workflow resolution cache cleared");
    }

    /// The most specific enabled workflow for `team_video`.
    pub async fn settings_for(
        &self,
        tx: &mut dyn StoreTx,
        team: &Team,
        team_video: &TeamVideo,
    ) -> PipelineResult<WorkflowSettings> {
        if let Some(settings) = self.cache().get(&team_video.id).copied() {
            return Ok(settings);
        }

        let project_enabled = match team_video.project_id {
            Some(project_id) => tx
                .get_project(project_id)
                .await?
                .is_some_and(|p| p.workflow_enabled),
            None => false,
        };
        let candidates: Vec<_> = tx
            .list_workflows(team.id)
            .await?
            .iter()
            .filter_map(|w| match w.target() {
                WorkflowTarget::Team(_) => Some(w.candidate(team.workflow_enabled)),
                WorkflowTarget::Project(id) if Some(id) == team_video.project_id => {
                    Some(w.candidate(project_enabled))
                }
                WorkflowTarget::TeamVideo(id) if id == team_video.id => {
                    Some(w.candidate(team.workflow_enabled))
                }
                _ => None,
            })
            .collect();
        let settings = resolve_workflow(&candidates);

        self.cache().insert(team_video.id, settings);
        Ok(settings)
    }

    /// Team context for `video_id`, or `None` for a video outside any team.
    pub async fn scope_for_video(
        &self,
        tx: &mut dyn StoreTx,
        video_id: &str,
    ) -> PipelineResult<Option<TeamScope>> {
        let Some(team_video) = tx.get_team_video_by_video(video_id).await? else {
            return Ok(None);
        };
        let team = tx
            .get_team(team_video.team_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Team", team_video.team_id))?;
        let settings = self.settings_for(tx, &team, &team_video).await?;
        Ok(Some(TeamScope {
            team,
            team_video,
            settings,
        }))
    }

    // -----------------------------------------------------------------------
    // Entry points
    // -----------------------------------------------------------------------

    /// Open the tasks a video gets when it joins a team.
    pub async fn video_added(
        &self,
        tx: &mut dyn StoreTx,
        scope: &TeamScope,
        actor: Option<DbId>,
        outbox: &mut Outbox,
    ) -> PipelineResult<Vec<Task>> {
        self.apply_effects(tx, scope, initial_tasks(&scope.settings), actor, outbox)
            .await
    }

    /// Run the task transitions a submission's action asks for.
    pub async fn handle_action(
        &self,
        tx: &mut dyn StoreTx,
        scope: Option<&TeamScope>,
        submission: Submission<'_>,
        outbox: &mut Outbox,
    ) -> PipelineResult<()> {
        let lc = submission.language.language_code.as_str();
        match submission.action {
            WorkflowAction::SaveDraft => Ok(()),
            WorkflowAction::Complete => match scope {
                Some(scope) => self
                    .complete_authoring(tx, scope, submission, None, outbox)
                    .await
                    .map(|_| ()),
                None => Ok(()),
            },
            WorkflowAction::Approve | WorkflowAction::Reject => {
                let scope = scope.ok_or_else(|| {
                    CoreError::ActionError("This video is not under a team workflow".to_string())
                })?;
                let task = self
                    .open_moderation_task(tx, scope, lc)
                    .await?
                    .ok_or_else(|| {
                        CoreError::ActionError(format!(
                            "There is no open review or approval task for '{lc}'"
                        ))
                    })?;
                let decision = Decision {
                    approve: submission.action == WorkflowAction::Approve,
                    version_id: submission.version.id,
                    body: None,
                };
                self.decide(tx, scope, task, submission.actor, decision, outbox)
                    .await
                    .map(|_| ())
            }
            WorkflowAction::Publish => match scope {
                Some(scope) => self.publish(tx, scope, submission, outbox).await,
                None => Ok(()),
            },
        }
    }

    /// Finish the open Subtitle/Translate task for the submitted language
    /// (or `task`, when the caller already picked one) and advance the
    /// workflow.
    pub async fn complete_authoring(
        &self,
        tx: &mut dyn StoreTx,
        scope: &TeamScope,
        submission: Submission<'_>,
        task: Option<Task>,
        outbox: &mut Outbox,
    ) -> PipelineResult<Option<Task>> {
        let lc = submission.language.language_code.as_str();
        let now = self.ctx.now();
        let task = match task {
            Some(task) => Some(task),
            None => {
                let tasks = tx.list_video_tasks(scope.team_video.id).await?;
                find_open_authoring(tasks, lc)
            }
        };

        let (completed, authoring_type) = match task {
            Some(mut task) => {
                let authoring_type = task.task_type();
                if let Some(assignee) = task.assignee_id {
                    if Some(assignee) != submission.actor
                        && !is_task_expired(task.expiration_date, now)
                    {
                        return Err(CoreError::Forbidden(format!(
                            "Task {} is assigned to another member",
                            task.id
                        ))
                        .into());
                    }
                }
                task.assignee_id = submission.actor.or(task.assignee_id);
                task.language_code = lc.to_string();
                task.subtitle_version_id = Some(submission.version.id);
                task.completed_at = Some(now);
                let task = tx.update_task(&task).await?;
                outbox.event(task_event(TASK_COMPLETED, &task, submission.actor));
                tracing::info!(
                    task_id = task.id,
                    task_type = %authoring_type,
                    language = lc,
                    "Task completed",
                );
                (Some(task), authoring_type)
            }
            None => {
                // Nothing to close and nothing to moderate: only the
                // translation fan-out still applies.
                if !scope.settings.requires_moderation() {
                    if scope.settings.autocreate_translate {
                        self.autocreate_translations(tx, scope, lc, outbox).await?;
                    }
                    return Ok(None);
                }
                (None, default_authoring_type(submission.language))
            }
        };

        let ctx = TransitionContext {
            workflow: &scope.settings,
            language_code: lc,
            version_id: submission.version.id,
            version_author: submission.version.author_id,
            authoring_type,
        };
        let effects = transition(authoring_type, TaskEvent::Completed, &ctx)?;
        self.apply_effects(tx, scope, effects, submission.actor, outbox)
            .await?;
        Ok(completed)
    }

    /// Approve or reject an open Review/Approve task.
    pub async fn decide(
        &self,
        tx: &mut dyn StoreTx,
        scope: &TeamScope,
        mut task: Task,
        actor: Option<DbId>,
        decision: Decision,
        outbox: &mut Outbox,
    ) -> PipelineResult<Task> {
        let task_type = task.task_type();
        if !task.is_open() || task_type.is_authoring() {
            return Err(CoreError::ActionError(format!(
                "Task {} is not an open review or approval task",
                task.id
            ))
            .into());
        }
        let now = self.ctx.now();
        let membership = PermissionService::membership(tx, scope.team.id, actor).await?;
        let target = scope.target(&task.language_code);
        if !may_judge(scope, task_type, membership.as_ref(), &target) {
            tracing::warn!(
                task_id = task.id,
                user_id = ?actor,
                task_type = %task_type,
                "Moderation refused",
            );
            return Err(CoreError::Forbidden(format!(
                "Not allowed to act on this {task_type} task"
            ))
            .into());
        }
        if let Some(assignee) = task.assignee_id {
            if Some(assignee) != actor
                && !is_task_expired(task.expiration_date, now)
                && !has_permission(membership.as_ref(), Permission::AssignTasks, &target)
            {
                return Err(CoreError::Forbidden(format!(
                    "Task {} is assigned to another member",
                    task.id
                ))
                .into());
            }
        }

        let version = tx
            .get_version(decision.version_id)
            .await?
            .ok_or_else(|| CoreError::not_found("SubtitleVersion", decision.version_id))?;
        if version.video_id != task.video_id {
            return Err(CoreError::VersionNotInVideo(version.parent_ref().to_string()).into());
        }
        let reviewed_author = match task.subtitle_version_id {
            Some(id) => tx.get_version(id).await?.and_then(|v| v.author_id),
            None => None,
        };

        let event = if decision.approve {
            TaskEvent::Approved
        } else {
            TaskEvent::Rejected
        };
        task.assignee_id = actor.or(task.assignee_id);
        task.approved = event.approval().map(|a| a.as_str().to_string());
        task.completed_at = Some(now);
        task.subtitle_version_id = Some(version.id);
        if let Some(body) = decision.body {
            task.body = body;
        }
        let task = tx.update_task(&task).await?;
        let kind = if decision.approve {
            TASK_COMPLETED
        } else {
            TASK_SENT_BACK
        };
        outbox.event(task_event(kind, &task, actor));
        tracing::info!(
            task_id = task.id,
            task_type = %task_type,
            approved = decision.approve,
            language = %task.language_code,
            "Task decided",
        );

        let tasks = tx.list_video_tasks(scope.team_video.id).await?;
        let language = tx.get_language(scope.video_id(), &task.language_code).await?;
        let authoring_type = previous_authoring_type(&tasks, &task.language_code, language.as_ref());
        let ctx = TransitionContext {
            workflow: &scope.settings,
            language_code: &task.language_code,
            version_id: version.id,
            version_author: reviewed_author.or(version.author_id),
            authoring_type,
        };
        let effects = transition(task_type, event, &ctx)?;
        self.apply_effects(tx, scope, effects, actor, outbox).await?;
        Ok(task)
    }

    /// Publish directly, closing every open task for the language.
    async fn publish(
        &self,
        tx: &mut dyn StoreTx,
        scope: &TeamScope,
        submission: Submission<'_>,
        outbox: &mut Outbox,
    ) -> PipelineResult<()> {
        let lc = submission.language.language_code.as_str();
        if scope.settings.requires_moderation() {
            PermissionService::require(
                tx,
                scope.team.id,
                submission.actor,
                Permission::PublishSubtitles,
                &scope.target(lc),
            )
            .await?;
        }

        let now = self.ctx.now();
        let open: Vec<Task> = tx
            .list_video_tasks(scope.team_video.id)
            .await?
            .into_iter()
            .filter(|t| t.is_open() && covers_language(t, lc))
            .collect();
        for mut task in open {
            task.completed_at = Some(now);
            task.assignee_id = task.assignee_id.or(submission.actor);
            task.language_code = lc.to_string();
            task.subtitle_version_id = Some(submission.version.id);
            if !task.task_type().is_authoring() {
                task.approved = Some(TaskApproval::Approved.as_str().to_string());
            }
            let task = tx.update_task(&task).await?;
            outbox.event(task_event(TASK_COMPLETED, &task, submission.actor));
        }

        // Publishing is the approve-stage outcome, reached from anywhere.
        let ctx = TransitionContext {
            workflow: &scope.settings,
            language_code: lc,
            version_id: submission.version.id,
            version_author: submission.version.author_id,
            authoring_type: default_authoring_type(submission.language),
        };
        let effects = transition(TaskType::Approve, TaskEvent::Approved, &ctx)?;
        self.apply_effects(tx, scope, effects, submission.actor, outbox)
            .await?;
        Ok(())
    }

    /// Actions `actor` may attach to a submission on this language.
    pub async fn available_actions(
        &self,
        tx: &mut dyn StoreTx,
        scope: Option<&TeamScope>,
        language_code: &str,
        actor: Option<DbId>,
    ) -> PipelineResult<Vec<WorkflowAction>> {
        let mut actions = vec![WorkflowAction::SaveDraft, WorkflowAction::Complete];
        let Some(scope) = scope else {
            return Ok(actions);
        };
        let membership = PermissionService::membership(tx, scope.team.id, actor).await?;
        let target = scope.target(language_code);
        if let Some(task) = self.open_moderation_task(tx, scope, language_code).await? {
            if may_judge(scope, task.task_type(), membership.as_ref(), &target) {
                actions.push(WorkflowAction::Approve);
                actions.push(WorkflowAction::Reject);
            }
        }
        if !scope.settings.requires_moderation()
            || has_permission(membership.as_ref(), Permission::PublishSubtitles, &target)
        {
            actions.push(WorkflowAction::Publish);
        }
        Ok(actions)
    }

    /// Re-run translation auto-creation for a video outside the normal
    /// publication path.
    pub async fn retrigger_translations(
        &self,
        video_id: &str,
        source_language: &str,
        actor: Option<DbId>,
    ) -> PipelineResult<Vec<Task>> {
        let mut tx = self.ctx.begin().await?;
        let mut outbox = Outbox::new();
        let result = self
            .retrigger_in(tx.as_mut(), video_id, source_language, actor, &mut outbox)
            .await;
        self.ctx.finish(tx, outbox, result).await
    }

    async fn retrigger_in(
        &self,
        tx: &mut dyn StoreTx,
        video_id: &str,
        source_language: &str,
        actor: Option<DbId>,
        outbox: &mut Outbox,
    ) -> PipelineResult<Vec<Task>> {
        let scope = self
            .scope_for_video(tx, video_id)
            .await?
            .ok_or_else(|| CoreError::not_found("TeamVideo", video_id))?;
        PermissionService::require(
            tx,
            scope.team.id,
            actor,
            Permission::CreateTasks,
            &scope.project_target(),
        )
        .await?;
        self.autocreate_translations(tx, &scope, source_language, outbox)
            .await
    }

    // -----------------------------------------------------------------------
    // Effects
    // -----------------------------------------------------------------------

    /// Apply transition effects in order, returning the tasks opened.
    pub async fn apply_effects(
        &self,
        tx: &mut dyn StoreTx,
        scope: &TeamScope,
        effects: Vec<TaskEffect>,
        actor: Option<DbId>,
        outbox: &mut Outbox,
    ) -> PipelineResult<Vec<Task>> {
        let mut opened = Vec::new();
        for effect in effects {
            match effect {
                TaskEffect::OpenTask {
                    task_type,
                    language_code,
                    assignee,
                    version_id,
                } => {
                    // One open moderation task per language; a newer
                    // submission moves it rather than queueing another.
                    if !task_type.is_authoring() {
                        if let Some(task) =
                            self.open_moderation_task(tx, scope, &language_code).await?
                        {
                            self.retarget(tx, task, version_id).await?;
                            continue;
                        }
                    }
                    let spec = TaskSpec {
                        task_type,
                        language_code,
                        assignee,
                        version_id,
                        priority: 0,
                    };
                    opened.push(self.open_task(tx, scope, spec, actor, outbox).await?);
                }
                TaskEffect::Publish { version_id } => {
                    let (visibility, override_) = ModerationStatus::Approved.version_flags();
                    let version = tx
                        .update_version_visibility(version_id, visibility, override_)
                        .await?;
                    tracing::info!(
                        video_id = %version.video_id,
                        language = %version.language_code,
                        version = version.version_number,
                        "Version published",
                    );
                    outbox.event(
                        DomainEvent::new(SUBTITLES_PUBLISHED)
                            .with_video(&version.video_id)
                            .with_language(&version.language_code)
                            .with_actor(actor)
                            .with_payload(json!({ "version_number": version.version_number })),
                    );
                    enqueue_sync(outbox, &version.video_id, &version.language_code);
                }
                TaskEffect::HideVersion { version_id } => {
                    let (visibility, override_) = ModerationStatus::Rejected.version_flags();
                    tx.update_version_visibility(version_id, visibility, override_)
                        .await?;
                }
                TaskEffect::MarkLanguageComplete { language_code } => {
                    if let Some(mut language) = tx
                        .get_language_for_update(scope.video_id(), &language_code)
                        .await?
                    {
                        if !language.subtitles_complete {
                            language.subtitles_complete = true;
                            tx.update_language(&language).await?;
                        }
                    }
                }
                TaskEffect::AutocreateTranslations { source_language } => {
                    let created = self
                        .autocreate_translations(tx, scope, &source_language, outbox)
                        .await?;
                    opened.extend(created);
                }
                TaskEffect::Notify(notification) => {
                    outbox.job(Job::new(
                        JOB_NOTIFY,
                        json!({
                            "team": scope.team.slug,
                            "video_id": scope.video_id(),
                            "notification": notification,
                        }),
                    ));
                }
            }
        }
        Ok(opened)
    }

    /// Insert one task row, stamping the expiration when it is assigned.
    pub async fn open_task(
        &self,
        tx: &mut dyn StoreTx,
        scope: &TeamScope,
        spec: TaskSpec,
        actor: Option<DbId>,
        outbox: &mut Outbox,
    ) -> PipelineResult<Task> {
        let now = self.ctx.now();
        let expiration_date = spec
            .assignee
            .and_then(|_| assignment_expiration(now, scope.team.task_expiration_days));
        let task = tx
            .insert_task(&NewTask {
                team_id: scope.team.id,
                team_video_id: scope.team_video.id,
                video_id: scope.team_video.video_id.clone(),
                task_type: spec.task_type,
                language_code: spec.language_code,
                assignee_id: spec.assignee,
                subtitle_version_id: spec.version_id,
                priority: spec.priority,
                expiration_date,
            })
            .await?;
        tracing::info!(
            task_id = task.id,
            task_type = %spec.task_type,
            language = %task.language_code,
            video_id = %task.video_id,
            "Task opened",
        );
        outbox.event(task_event(TASK_CREATED, &task, actor));
        Ok(task)
    }

    async fn retarget(
        &self,
        tx: &mut dyn StoreTx,
        mut task: Task,
        version_id: Option<DbId>,
    ) -> PipelineResult<()> {
        if version_id.is_none() || task.subtitle_version_id == version_id {
            return Ok(());
        }
        task.subtitle_version_id = version_id;
        let task = tx.update_task(&task).await?;
        tracing::info!(
            task_id = task.id,
            task_type = %task.task_type(),
            language = %task.language_code,
            version_id = ?version_id,
            "Open moderation task moved to newer version",
        );
        Ok(())
    }

    /// Open Translate tasks for preferred languages that lack both a
    /// complete synced track and an open Translate task.
    pub async fn autocreate_translations(
        &self,
        tx: &mut dyn StoreTx,
        scope: &TeamScope,
        source_language: &str,
        outbox: &mut Outbox,
    ) -> PipelineResult<Vec<Task>> {
        let sets = LanguagePreferenceService::sets_in(tx, scope.team.id).await?;
        if sets.preferred.is_empty() {
            return Ok(Vec::new());
        }

        let mut complete = BTreeSet::new();
        for language in tx.list_languages(scope.video_id()).await? {
            if !language.subtitles_complete || language.subtitle_count == 0 {
                continue;
            }
            let versions = tx.list_versions(language.id).await?;
            if tip(&versions).is_some_and(|v| v.subtitle_set().is_fully_synced()) {
                complete.insert(language.language_code);
            }
        }
        let open_translate: BTreeSet<String> = tx
            .list_video_tasks(scope.team_video.id)
            .await?
            .into_iter()
            .filter(|t| t.is_open() && t.task_type() == TaskType::Translate)
            .map(|t| t.language_code)
            .collect();

        let mut opened = Vec::new();
        for language_code in
            translation_languages_to_create(&sets.preferred, source_language, &complete, &open_translate)
        {
            let spec = TaskSpec::new(TaskType::Translate, language_code);
            opened.push(self.open_task(tx, scope, spec, None, outbox).await?);
        }
        if !opened.is_empty() {
            tracing::info!(
                video_id = %scope.video_id(),
                source_language,
                created = opened.len(),
                "Translation tasks auto-created",
            );
        }
        Ok(opened)
    }

    /// The open Review or Approve task for a language, oldest first.
    pub async fn open_moderation_task(
        &self,
        tx: &mut dyn StoreTx,
        scope: &TeamScope,
        language_code: &str,
    ) -> PipelineResult<Option<Task>> {
        Ok(tx
            .list_video_tasks(scope.team_video.id)
            .await?
            .into_iter()
            .find(|t| {
                t.is_open() && !t.task_type().is_authoring() && t.language_code == language_code
            }))
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn may_judge(
    scope: &TeamScope,
    task_type: TaskType,
    membership: Option<&Membership>,
    target: &PermissionTarget,
) -> bool {
    match task_type {
        TaskType::Review => can_review(scope.settings.review_allowed, membership, target),
        TaskType::Approve => can_approve(scope.settings.approve_allowed, membership, target),
        TaskType::Subtitle | TaskType::Translate => false,
    }
}

/// Whether a task is work on `language_code`. Video-wide Subtitle tasks
/// carry an empty language until they are completed.
fn covers_language(task: &Task, language_code: &str) -> bool {
    task.language_code == language_code
        || (task.language_code.is_empty() && task.task_type() == TaskType::Subtitle)
}

/// Prefer a task already bound to the language over a video-wide one.
fn find_open_authoring(tasks: Vec<Task>, language_code: &str) -> Option<Task> {
    let mut candidates: Vec<Task> = tasks
        .into_iter()
        .filter(|t| t.is_open() && t.task_type().is_authoring() && covers_language(t, language_code))
        .collect();
    candidates.sort_by_key(|t| (t.language_code.is_empty(), t.created_at, t.id));
    candidates.into_iter().next()
}

fn default_authoring_type(language: &SubtitleLanguage) -> TaskType {
    if language.source_language().is_some() {
        TaskType::Translate
    } else {
        TaskType::Subtitle
    }
}

/// The type of the last authoring task completed on a language, used to
/// reopen the same kind of work on send-back.
fn previous_authoring_type(
    tasks: &[Task],
    language_code: &str,
    language: Option<&SubtitleLanguage>,
) -> TaskType {
    tasks
        .iter()
        .filter(|t| t.task_type().is_authoring() && t.language_code == language_code)
        .filter_map(|t| t.completed_at.map(|at| (at, t.id, t.task_type())))
        .max()
        .map(|(_, _, task_type)| task_type)
        .or_else(|| language.map(default_authoring_type))
        .unwrap_or(TaskType::Subtitle)
}

pub(crate) fn task_event(kind: &str, task: &Task, actor: Option<DbId>) -> DomainEvent {
    DomainEvent::new(kind)
        .with_video(&task.video_id)
        .with_language(&task.language_code)
        .with_actor(actor)
        .with_payload(json!({
            "task_id": task.id,
            "task_type": task.task_type().as_str(),
            "assignee_id": task.assignee_id,
        }))
}
