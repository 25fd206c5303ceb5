//! Task creation, assignment, completion and queries.
//!
//! State transitions go through [`WorkflowEngine`]; this service adds the
//! permission checks, assignment rules and team scoping around them.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use subhub_core::error::CoreError;
use subhub_core::languages::validate_language_code;
use subhub_core::permissions::{has_permission, Permission, PermissionTarget};
use subhub_core::tasks::{
    assignment_expiration, check_assignment_capacity, ensure_cancellable, latest_signoff,
    TaskApproval, TaskFilter, TaskType,
};
use subhub_core::types::DbId;
use subhub_core::visibility::tip;
use subhub_core::workflow::WorkflowAction;
use subhub_db::models::task::Task;
use subhub_db::models::team::Team;
use subhub_db::models::version::SubtitleVersion;
use subhub_db::StoreTx;
use subhub_events::Outbox;

use crate::context::ServiceContext;
use crate::error::PipelineResult;
use crate::metadata::MetadataUpdater;
use crate::permissions::PermissionService;
use crate::teams::load_team;
use crate::workflow::{Decision, Submission, TaskSpec, TeamScope, WorkflowEngine};

#[derive(Debug, Clone, Deserialize)]
pub struct CreateTask {
    pub video_id: String,
    #[serde(rename = "type")]
    pub task_type: TaskType,
    #[serde(default)]
    pub language: String,
    /// Username of the assignee.
    pub assignee: Option<String>,
    #[serde(default)]
    pub priority: i32,
}

/// Partial task update. Completion and approval run the workflow.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateTask {
    pub priority: Option<i32>,
    /// Username; an empty string unassigns.
    pub assignee: Option<String>,
    pub body: Option<String>,
    pub completed: Option<bool>,
    pub approved: Option<TaskApproval>,
}

/// Who reviewed and approved one version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VersionSignoffs {
    pub version_number: i32,
    pub reviewed_by: Option<DbId>,
    pub approved_by: Option<DbId>,
}

pub struct TaskService {
    ctx: ServiceContext,
    workflow: Arc<WorkflowEngine>,
}

impl TaskService {
    pub fn new(ctx: ServiceContext, workflow: Arc<WorkflowEngine>) -> Self {
        Self { ctx, workflow }
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub async fn list(
        &self,
        slug: &str,
        actor: Option<DbId>,
        filter: TaskFilter,
    ) -> PipelineResult<Vec<Task>> {
        let mut tx = self.ctx.begin().await?;
        let result = Self::list_in(tx.as_mut(), slug, actor, &filter).await;
        self.ctx.finish(tx, Outbox::new(), result).await
    }

    async fn list_in(
        tx: &mut dyn StoreTx,
        slug: &str,
        actor: Option<DbId>,
        filter: &TaskFilter,
    ) -> PipelineResult<Vec<Task>> {
        let team = load_team(tx, slug).await?;
        PermissionService::require_member(tx, team.id, actor).await?;
        Ok(tx.list_tasks(team.id, filter).await?)
    }

    pub async fn get(&self, slug: &str, task_id: DbId, actor: Option<DbId>) -> PipelineResult<Task> {
        let mut tx = self.ctx.begin().await?;
        let result = Self::get_in(tx.as_mut(), slug, task_id, actor).await;
        self.ctx.finish(tx, Outbox::new(), result).await
    }

    async fn get_in(
        tx: &mut dyn StoreTx,
        slug: &str,
        task_id: DbId,
        actor: Option<DbId>,
    ) -> PipelineResult<Task> {
        let team = load_team(tx, slug).await?;
        PermissionService::require_member(tx, team.id, actor).await?;
        load_task(tx, &team, task_id).await
    }

    /// Reviewer and approver of every version of a language.
    pub async fn signoffs(
        &self,
        video_id: &str,
        language_code: &str,
    ) -> PipelineResult<Vec<VersionSignoffs>> {
        let mut tx = self.ctx.begin().await?;
        let result = self.signoffs_in(tx.as_mut(), video_id, language_code).await;
        self.ctx.finish(tx, Outbox::new(), result).await
    }

    async fn signoffs_in(
        &self,
        tx: &mut dyn StoreTx,
        video_id: &str,
        language_code: &str,
    ) -> PipelineResult<Vec<VersionSignoffs>> {
        let language = tx
            .get_language(video_id, language_code)
            .await?
            .ok_or_else(|| CoreError::not_found("SubtitleLanguage", language_code))?;
        let versions = tx.list_versions(language.id).await?;
        let tasks = match tx.get_team_video_by_video(video_id).await? {
            Some(tv) => tx.list_video_tasks(tv.id).await?,
            None => Vec::new(),
        };
        Ok(versions
            .iter()
            .map(|v| VersionSignoffs {
                version_number: v.version_number,
                reviewed_by: latest_signoff(tasks.iter().map(Task::facts), v.id, TaskType::Review),
                approved_by: latest_signoff(tasks.iter().map(Task::facts), v.id, TaskType::Approve),
            })
            .collect())
    }

    // -----------------------------------------------------------------------
    // Creation and assignment
    // -----------------------------------------------------------------------

    pub async fn create(
        &self,
        slug: &str,
        actor: Option<DbId>,
        input: CreateTask,
    ) -> PipelineResult<Task> {
        let mut tx = self.ctx.begin().await?;
        let mut outbox = Outbox::new();
        let result = self
            .create_in(tx.as_mut(), slug, actor, input, &mut outbox)
            .await;
        self.ctx.finish(tx, outbox, result).await
    }

    async fn create_in(
        &self,
        tx: &mut dyn StoreTx,
        slug: &str,
        actor: Option<DbId>,
        input: CreateTask,
        outbox: &mut Outbox,
    ) -> PipelineResult<Task> {
        let team = load_team(tx, slug).await?;
        let scope = self.team_scope(tx, &team, &input.video_id).await?;
        let language_code = if input.language.is_empty() {
            if input.task_type != TaskType::Subtitle {
                return Err(CoreError::Validation(format!(
                    "A {} task needs a language",
                    input.task_type
                ))
                .into());
            }
            String::new()
        } else {
            validate_language_code(&input.language)?
        };
        PermissionService::require(
            tx,
            team.id,
            actor,
            Permission::CreateTasks,
            &scope.target(&language_code),
        )
        .await?;

        let version_id = if input.task_type.is_authoring() {
            None
        } else {
            Some(tip_of(tx, &input.video_id, &language_code).await?.id)
        };
        let assignee = match input.assignee.as_deref().filter(|u| !u.is_empty()) {
            Some(username) => Some(self.check_assignee(tx, &team, username).await?),
            None => None,
        };

        let spec = TaskSpec {
            task_type: input.task_type,
            language_code,
            assignee,
            version_id,
            priority: input.priority,
        };
        self.workflow.open_task(tx, &scope, spec, actor, outbox).await
    }

    /// Assign a task to `assignee` (a username), or unassign it.
    ///
    /// Taking a task yourself needs the accept-assignment permission;
    /// assigning anyone else needs assign-tasks.
    pub async fn assign(
        &self,
        slug: &str,
        task_id: DbId,
        actor: Option<DbId>,
        assignee: Option<&str>,
    ) -> PipelineResult<Task> {
        let mut tx = self.ctx.begin().await?;
        let result = self.assign_in(tx.as_mut(), slug, task_id, actor, assignee).await;
        self.ctx.finish(tx, Outbox::new(), result).await
    }

    async fn assign_in(
        &self,
        tx: &mut dyn StoreTx,
        slug: &str,
        task_id: DbId,
        actor: Option<DbId>,
        assignee: Option<&str>,
    ) -> PipelineResult<Task> {
        let team = load_team(tx, slug).await?;
        let mut task = load_task(tx, &team, task_id).await?;
        self.apply_assignment(tx, &team, &mut task, actor, assignee)
            .await?;
        Ok(tx.update_task(&task).await?)
    }

    async fn apply_assignment(
        &self,
        tx: &mut dyn StoreTx,
        team: &Team,
        task: &mut Task,
        actor: Option<DbId>,
        assignee: Option<&str>,
    ) -> PipelineResult<()> {
        if !task.is_open() {
            return Err(CoreError::Validation(format!("Task {} is closed", task.id)).into());
        }
        let target = task_target(tx, task).await?;
        let assignee_id = match assignee.filter(|u| !u.is_empty()) {
            Some(username) => Some(self.check_assignee(tx, team, username).await?),
            None => None,
        };
        let permission = if assignee_id.is_some() && assignee_id == actor {
            Permission::AcceptAssignment
        } else {
            Permission::AssignTasks
        };
        PermissionService::require(tx, team.id, actor, permission, &target).await?;

        task.assignee_id = assignee_id;
        task.expiration_date = assignee_id
            .and_then(|_| assignment_expiration(self.ctx.now(), team.task_expiration_days));
        tracing::info!(
            task_id = task.id,
            assignee_id = ?assignee_id,
            user_id = ?actor,
            "Task assigned",
        );
        Ok(())
    }

    /// Resolve `username` to a member with spare capacity.
    async fn check_assignee(
        &self,
        tx: &mut dyn StoreTx,
        team: &Team,
        username: &str,
    ) -> PipelineResult<DbId> {
        let user = tx
            .find_user_by_username(username)
            .await?
            .ok_or_else(|| CoreError::not_found("User", username))?;
        if tx.get_member(team.id, user.id).await?.is_none() {
            return Err(CoreError::Validation(format!("{username} is not a team member")).into());
        }
        let open = tx.count_open_assigned(team.id, user.id).await?;
        check_assignment_capacity(open, team.max_tasks_per_member)?;
        Ok(user.id)
    }

    // -----------------------------------------------------------------------
    // Updates
    // -----------------------------------------------------------------------

    /// Apply a partial update. `approved` decides a review or approval
    /// task; `completed = true` completes an authoring task.
    pub async fn update(
        &self,
        slug: &str,
        task_id: DbId,
        actor: Option<DbId>,
        update: UpdateTask,
    ) -> PipelineResult<Task> {
        let mut tx = self.ctx.begin().await?;
        let mut outbox = Outbox::new();
        let result = self
            .update_in(tx.as_mut(), slug, task_id, actor, update, &mut outbox)
            .await;
        self.ctx.finish(tx, outbox, result).await
    }

    async fn update_in(
        &self,
        tx: &mut dyn StoreTx,
        slug: &str,
        task_id: DbId,
        actor: Option<DbId>,
        update: UpdateTask,
        outbox: &mut Outbox,
    ) -> PipelineResult<Task> {
        let team = load_team(tx, slug).await?;
        let mut task = load_task(tx, &team, task_id).await?;

        if update.priority.is_some() || update.body.is_some() {
            let target = task_target(tx, &task).await?;
            let membership = PermissionService::membership(tx, team.id, actor).await?;
            let own = actor.is_some() && task.assignee_id == actor;
            let may_edit = own
                || has_permission(membership.as_ref(), Permission::AssignTasks, &target);
            if !may_edit {
                return Err(CoreError::Forbidden(format!("Cannot edit task {task_id}")).into());
            }
        }
        if let Some(priority) = update.priority {
            task.priority = priority;
        }
        if let Some(body) = update.body.clone() {
            task.body = body;
        }
        if let Some(assignee) = update.assignee.as_deref() {
            self.apply_assignment(tx, &team, &mut task, actor, Some(assignee))
                .await?;
        }
        let task = tx.update_task(&task).await?;

        match (update.approved, update.completed) {
            (Some(TaskApproval::Approved), _) => {
                self.decide_in(tx, &team, task, actor, true, update.body, outbox)
                    .await
            }
            (Some(TaskApproval::Rejected), _) => {
                self.decide_in(tx, &team, task, actor, false, update.body, outbox)
                    .await
            }
            (_, Some(true)) => self.complete_in(tx, &team, task, actor, outbox).await,
            _ => Ok(task),
        }
    }

    /// Complete an authoring task against the language's tip.
    pub async fn complete(
        &self,
        slug: &str,
        task_id: DbId,
        actor: Option<DbId>,
    ) -> PipelineResult<Task> {
        let mut tx = self.ctx.begin().await?;
        let mut outbox = Outbox::new();
        let result = self
            .complete_task_in(tx.as_mut(), slug, task_id, actor, &mut outbox)
            .await;
        self.ctx.finish(tx, outbox, result).await
    }

    async fn complete_task_in(
        &self,
        tx: &mut dyn StoreTx,
        slug: &str,
        task_id: DbId,
        actor: Option<DbId>,
        outbox: &mut Outbox,
    ) -> PipelineResult<Task> {
        let team = load_team(tx, slug).await?;
        let task = load_task(tx, &team, task_id).await?;
        self.complete_in(tx, &team, task, actor, outbox).await
    }

    async fn complete_in(
        &self,
        tx: &mut dyn StoreTx,
        team: &Team,
        task: Task,
        actor: Option<DbId>,
        outbox: &mut Outbox,
    ) -> PipelineResult<Task> {
        if !task.task_type().is_authoring() {
            return Err(CoreError::ActionError(format!(
                "A {} task is completed by approving or rejecting it",
                task.task_type()
            ))
            .into());
        }
        if !task.is_open() {
            return Err(CoreError::ActionError(format!("Task {} is closed", task.id)).into());
        }
        if task.language_code.is_empty() {
            return Err(CoreError::ActionError(
                "Submit subtitles in a language before completing this task".to_string(),
            )
            .into());
        }
        let scope = self.team_scope(tx, team, &task.video_id).await?;
        let mut language = tx
            .get_language_for_update(&task.video_id, &task.language_code)
            .await?
            .ok_or_else(|| CoreError::not_found("SubtitleLanguage", &task.language_code))?;
        let version = tip_of(tx, &task.video_id, &task.language_code).await?;
        if !language.subtitles_complete {
            language.subtitles_complete = true;
            language = tx.update_language(&language).await?;
        }

        let submission = Submission {
            language: &language,
            version: &version,
            actor,
            action: WorkflowAction::Complete,
        };
        let completed = self
            .workflow
            .complete_authoring(tx, &scope, submission, Some(task.clone()), outbox)
            .await?
            .unwrap_or(task);
        self.refresh(tx, &completed, outbox).await?;
        Ok(completed)
    }

    /// Approve or reject a review or approval task.
    pub async fn decide(
        &self,
        slug: &str,
        task_id: DbId,
        actor: Option<DbId>,
        approve: bool,
        body: Option<String>,
    ) -> PipelineResult<Task> {
        let mut tx = self.ctx.begin().await?;
        let mut outbox = Outbox::new();
        let result = self
            .decide_task_in(tx.as_mut(), slug, task_id, actor, approve, body, &mut outbox)
            .await;
        self.ctx.finish(tx, outbox, result).await
    }

    #[allow(clippy::too_many_arguments)]
    async fn decide_task_in(
        &self,
        tx: &mut dyn StoreTx,
        slug: &str,
        task_id: DbId,
        actor: Option<DbId>,
        approve: bool,
        body: Option<String>,
        outbox: &mut Outbox,
    ) -> PipelineResult<Task> {
        let team = load_team(tx, slug).await?;
        let task = load_task(tx, &team, task_id).await?;
        self.decide_in(tx, &team, task, actor, approve, body, outbox)
            .await
    }

    #[allow(clippy::too_many_arguments)]
    async fn decide_in(
        &self,
        tx: &mut dyn StoreTx,
        team: &Team,
        task: Task,
        actor: Option<DbId>,
        approve: bool,
        body: Option<String>,
        outbox: &mut Outbox,
    ) -> PipelineResult<Task> {
        let scope = self.team_scope(tx, team, &task.video_id).await?;
        let version_id = match task.subtitle_version_id {
            Some(id) => id,
            None => tip_of(tx, &task.video_id, &task.language_code).await?.id,
        };
        let decision = Decision {
            approve,
            version_id,
            body,
        };
        let decided = self
            .workflow
            .decide(tx, &scope, task, actor, decision, outbox)
            .await?;
        self.refresh(tx, &decided, outbox).await?;
        Ok(decided)
    }

    /// Cancel an open task. Completed tasks are kept.
    pub async fn delete(&self, slug: &str, task_id: DbId, actor: Option<DbId>) -> PipelineResult<()> {
        let mut tx = self.ctx.begin().await?;
        let result = Self::delete_in(tx.as_mut(), slug, task_id, actor).await;
        self.ctx.finish(tx, Outbox::new(), result).await
    }

    async fn delete_in(
        tx: &mut dyn StoreTx,
        slug: &str,
        task_id: DbId,
        actor: Option<DbId>,
    ) -> PipelineResult<()> {
        let team = load_team(tx, slug).await?;
        let mut task = load_task(tx, &team, task_id).await?;
        ensure_cancellable(task.completed_at.is_some())?;
        let target = task_target(tx, &task).await?;
        PermissionService::require(tx, team.id, actor, Permission::DeleteTasks, &target).await?;
        task.deleted = true;
        tx.update_task(&task).await?;
        tracing::info!(task_id, user_id = ?actor, "Task deleted");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    async fn team_scope(
        &self,
        tx: &mut dyn StoreTx,
        team: &Team,
        video_id: &str,
    ) -> PipelineResult<TeamScope> {
        match self.workflow.scope_for_video(tx, video_id).await? {
            Some(scope) if scope.team.id == team.id => Ok(scope),
            _ => Err(CoreError::not_found("TeamVideo", video_id).into()),
        }
    }

    async fn refresh(
        &self,
        tx: &mut dyn StoreTx,
        task: &Task,
        outbox: &mut Outbox,
    ) -> PipelineResult<()> {
        if !task.language_code.is_empty() {
            MetadataUpdater::refresh_language(tx, &task.video_id, &task.language_code).await?;
        }
        MetadataUpdater::refresh_video(tx, &task.video_id, self.ctx.now(), outbox).await?;
        Ok(())
    }
}

async fn load_task(tx: &mut dyn StoreTx, team: &Team, task_id: DbId) -> PipelineResult<Task> {
    Ok(tx
        .get_task(task_id)
        .await?
        .filter(|t| t.team_id == team.id && !t.deleted)
        .ok_or_else(|| CoreError::not_found("Task", task_id))?)
}

/// Permission target for work on a task's language within its project.
async fn task_target(tx: &mut dyn StoreTx, task: &Task) -> PipelineResult<PermissionTarget> {
    let project_id = tx
        .get_team_video(task.team_video_id)
        .await?
        .and_then(|tv| tv.project_id);
    Ok(if task.language_code.is_empty() {
        PermissionTarget::project(project_id)
    } else {
        PermissionTarget::language(project_id, task.language_code.clone())
    })
}

async fn tip_of(
    tx: &mut dyn StoreTx,
    video_id: &str,
    language_code: &str,
) -> PipelineResult<SubtitleVersion> {
    let language = tx
        .get_language(video_id, language_code)
        .await?
        .ok_or_else(|| {
            CoreError::ActionError(format!("'{language_code}' has no subtitles yet"))
        })?;
    let versions = tx.list_versions(language.id).await?;
    Ok(tip(&versions).cloned().ok_or_else(|| {
        CoreError::ActionError(format!("'{language_code}' has no subtitles yet"))
    })?)
}
