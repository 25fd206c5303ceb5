//! Teams and everything hanging off them: team videos, members,
//! invitations, applications, projects and workflow records.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use subhub_core::error::CoreError;
use subhub_core::permissions::{
    can_assign_role, Narrowing, Permission, PermissionTarget, SubtitlePolicy,
};
use subhub_core::roles::TeamRole;
use subhub_core::team::{validate_slug, ApplicationStatus, InvitationStatus};
use subhub_core::types::DbId;
use subhub_core::workflow::WorkflowSettings;
use subhub_db::models::team::{
    Application, Invitation, MembershipNarrowing, NewInvitation, NewProject, NewTeam,
    NewWorkflow, Project, Team, TeamMember, TeamVideo, Workflow,
};
use subhub_db::StoreTx;
use subhub_events::Outbox;

use crate::context::ServiceContext;
use crate::error::PipelineResult;
use crate::permissions::PermissionService;
use crate::workflow::WorkflowEngine;

/// Load a team by slug.
pub(crate) async fn load_team(tx: &mut dyn StoreTx, slug: &str) -> PipelineResult<Team> {
    Ok(tx
        .get_team_by_slug(slug)
        .await?
        .ok_or_else(|| CoreError::not_found("Team", slug))?)
}

/// Load a project of `team_id` by slug; unknown slugs are a validation
/// error rather than a missing resource.
pub(crate) async fn load_project(
    tx: &mut dyn StoreTx,
    team_id: DbId,
    slug: &str,
) -> PipelineResult<Project> {
    Ok(tx
        .get_project_by_slug(team_id, slug)
        .await?
        .ok_or_else(|| CoreError::Validation(format!("unknown-project: '{slug}'")))?)
}

fn require_actor(actor: Option<DbId>) -> PipelineResult<DbId> {
    Ok(actor.ok_or_else(|| CoreError::Unauthorized("Sign in required".to_string()))?)
}

// ---------------------------------------------------------------------------
// Inputs and views
// ---------------------------------------------------------------------------

/// Partial team update. Absent fields are left alone.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateTeam {
    pub name: Option<String>,
    pub description: Option<String>,
    pub workflow_enabled: Option<bool>,
    pub task_expiration_days: Option<i32>,
    pub max_tasks_per_member: Option<i32>,
    pub subtitle_policy: Option<String>,
    pub translate_policy: Option<String>,
    pub sync_disabled: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProjectInput {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub guidelines: Option<String>,
    pub workflow_enabled: Option<bool>,
}

/// A member with the user's display name resolved.
#[derive(Debug, Clone, Serialize)]
pub struct MemberInfo {
    pub user_id: DbId,
    pub username: String,
    pub role: TeamRole,
    pub narrowings: Vec<Narrowing>,
}

/// Where a workflow record attaches.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WorkflowScope {
    pub project: Option<String>,
    pub video_id: Option<String>,
}

// ---------------------------------------------------------------------------
// Service
// ---------------------------------------------------------------------------

pub struct TeamService {
    ctx: ServiceContext,
    workflow: Arc<WorkflowEngine>,
}

impl TeamService {
    pub fn new(ctx: ServiceContext, workflow: Arc<WorkflowEngine>) -> Self {
        Self { ctx, workflow }
    }

    // -----------------------------------------------------------------------
    // Teams
    // -----------------------------------------------------------------------

    /// Create a team with `actor` as its owner.
    pub async fn create_team(&self, actor: Option<DbId>, input: NewTeam) -> PipelineResult<Team> {
        let mut tx = self.ctx.begin().await?;
        let result = Self::create_team_in(tx.as_mut(), actor, input).await;
        self.ctx.finish(tx, Outbox::new(), result).await
    }

    async fn create_team_in(
        tx: &mut dyn StoreTx,
        actor: Option<DbId>,
        input: NewTeam,
    ) -> PipelineResult<Team> {
        let owner = require_actor(actor)?;
        validate_slug(&input.slug)?;
        input.subtitle_policy.parse::<SubtitlePolicy>()?;
        input.translate_policy.parse::<SubtitlePolicy>()?;
        if tx.get_team_by_slug(&input.slug).await?.is_some() {
            return Err(CoreError::Conflict(format!("Team '{}' already exists", input.slug)).into());
        }
        let team = tx.insert_team(&input).await?;
        tx.insert_member(team.id, owner, TeamRole::Owner).await?;
        tracing::info!(team = %team.slug, owner_id = owner, "Team created");
        Ok(team)
    }

    pub async fn get_team(&self, slug: &str) -> PipelineResult<Team> {
        let mut tx = self.ctx.begin().await?;
        let result = load_team(tx.as_mut(), slug).await;
        self.ctx.finish(tx, Outbox::new(), result).await
    }

    pub async fn update_team(
        &self,
        slug: &str,
        actor: Option<DbId>,
        update: UpdateTeam,
    ) -> PipelineResult<Team> {
        let mut tx = self.ctx.begin().await?;
        let result = Self::update_team_in(tx.as_mut(), slug, actor, update).await;
        let team = self.ctx.finish(tx, Outbox::new(), result).await?;
        self.workflow.invalidate();
        Ok(team)
    }

    async fn update_team_in(
        tx: &mut dyn StoreTx,
        slug: &str,
        actor: Option<DbId>,
        update: UpdateTeam,
    ) -> PipelineResult<Team> {
        let mut team = load_team(tx, slug).await?;
        let target = PermissionTarget::team();
        if let Some(name) = update.name {
            PermissionService::require(tx, team.id, actor, Permission::RenameTeam, &target).await?;
            if name.trim().is_empty() {
                return Err(CoreError::Validation("Team name must not be empty".to_string()).into());
            }
            team.name = name;
        }
        let settings_changed = update.description.is_some()
            || update.workflow_enabled.is_some()
            || update.task_expiration_days.is_some()
            || update.max_tasks_per_member.is_some()
            || update.subtitle_policy.is_some()
            || update.translate_policy.is_some()
            || update.sync_disabled.is_some();
        if settings_changed {
            PermissionService::require(tx, team.id, actor, Permission::EditTeamSettings, &target)
                .await?;
        }
        if let Some(description) = update.description {
            team.description = description;
        }
        if let Some(enabled) = update.workflow_enabled {
            team.workflow_enabled = enabled;
        }
        if let Some(days) = update.task_expiration_days {
            team.task_expiration_days = (days > 0).then_some(days);
        }
        if let Some(max) = update.max_tasks_per_member {
            team.max_tasks_per_member = (max > 0).then_some(max);
        }
        if let Some(policy) = update.subtitle_policy {
            team.subtitle_policy = policy.parse::<SubtitlePolicy>()?.as_str().to_string();
        }
        if let Some(policy) = update.translate_policy {
            team.translate_policy = policy.parse::<SubtitlePolicy>()?.as_str().to_string();
        }
        if let Some(disabled) = update.sync_disabled {
            team.sync_disabled = disabled;
        }
        let team = tx.update_team(&team).await?;
        tracing::info!(team = %team.slug, user_id = ?actor, "Team updated");
        Ok(team)
    }

    // -----------------------------------------------------------------------
    // Team videos
    // -----------------------------------------------------------------------

    pub async fn list_videos(&self, slug: &str) -> PipelineResult<Vec<TeamVideo>> {
        let mut tx = self.ctx.begin().await?;
        let result = Self::list_videos_in(tx.as_mut(), slug).await;
        self.ctx.finish(tx, Outbox::new(), result).await
    }

    async fn list_videos_in(tx: &mut dyn StoreTx, slug: &str) -> PipelineResult<Vec<TeamVideo>> {
        let team = load_team(tx, slug).await?;
        Ok(tx.list_team_videos(team.id).await?)
    }

    /// Move an existing video into the team, opening its initial tasks.
    pub async fn add_video(
        &self,
        slug: &str,
        video_id: &str,
        project: Option<&str>,
        actor: Option<DbId>,
    ) -> PipelineResult<TeamVideo> {
        let mut tx = self.ctx.begin().await?;
        let mut outbox = Outbox::new();
        let result = self
            .add_video_in(tx.as_mut(), slug, video_id, project, actor, &mut outbox)
            .await;
        self.ctx.finish(tx, outbox, result).await
    }

    async fn add_video_in(
        &self,
        tx: &mut dyn StoreTx,
        slug: &str,
        video_id: &str,
        project: Option<&str>,
        actor: Option<DbId>,
        outbox: &mut Outbox,
    ) -> PipelineResult<TeamVideo> {
        let team = load_team(tx, slug).await?;
        let project_id = match project {
            Some(p) => Some(load_project(tx, team.id, p).await?.id),
            None => None,
        };
        if tx.get_video(video_id).await?.is_none() {
            return Err(CoreError::not_found("Video", video_id).into());
        }
        self.attach_video(tx, &team, video_id, project_id, actor, outbox)
            .await
    }

    /// Put `video_id` under `team`. Fails if the video already belongs to
    /// any team.
    pub(crate) async fn attach_video(
        &self,
        tx: &mut dyn StoreTx,
        team: &Team,
        video_id: &str,
        project_id: Option<DbId>,
        actor: Option<DbId>,
        outbox: &mut Outbox,
    ) -> PipelineResult<TeamVideo> {
        PermissionService::require(
            tx,
            team.id,
            actor,
            Permission::AddVideo,
            &PermissionTarget::project(project_id),
        )
        .await?;
        if tx.get_team_video_by_video(video_id).await?.is_some() {
            return Err(CoreError::Conflict(format!(
                "Video {video_id} already belongs to a team"
            ))
            .into());
        }
        let team_video = tx
            .insert_team_video(team.id, video_id, project_id, actor)
            .await?;

        if let Some(scope) = self.workflow.scope_for_video(tx, video_id).await? {
            self.workflow.video_added(tx, &scope, actor, outbox).await?;
        }
        tracing::info!(team = %team.slug, video_id, project_id = ?project_id, "Video added to team");
        Ok(team_video)
    }

    pub async fn remove_video(
        &self,
        slug: &str,
        video_id: &str,
        actor: Option<DbId>,
    ) -> PipelineResult<()> {
        let mut tx = self.ctx.begin().await?;
        let result = Self::remove_video_in(tx.as_mut(), slug, video_id, actor).await;
        self.ctx.finish(tx, Outbox::new(), result).await?;
        self.workflow.invalidate();
        Ok(())
    }

    async fn remove_video_in(
        tx: &mut dyn StoreTx,
        slug: &str,
        video_id: &str,
        actor: Option<DbId>,
    ) -> PipelineResult<()> {
        let team = load_team(tx, slug).await?;
        let team_video = team_video_of(tx, &team, video_id).await?;
        PermissionService::require(
            tx,
            team.id,
            actor,
            Permission::RemoveVideo,
            &PermissionTarget::project(team_video.project_id),
        )
        .await?;
        tx.delete_team_video(team_video.id).await?;
        tracing::info!(team = %team.slug, video_id, "Video removed from team");
        Ok(())
    }

    /// Move a team video to another project, or out of any project.
    pub async fn move_video(
        &self,
        slug: &str,
        video_id: &str,
        project: Option<&str>,
        actor: Option<DbId>,
    ) -> PipelineResult<TeamVideo> {
        let mut tx = self.ctx.begin().await?;
        let result = Self::move_video_in(tx.as_mut(), slug, video_id, project, actor).await;
        let moved = self.ctx.finish(tx, Outbox::new(), result).await?;
        self.workflow.invalidate();
        Ok(moved)
    }

    async fn move_video_in(
        tx: &mut dyn StoreTx,
        slug: &str,
        video_id: &str,
        project: Option<&str>,
        actor: Option<DbId>,
    ) -> PipelineResult<TeamVideo> {
        let team = load_team(tx, slug).await?;
        let team_video = team_video_of(tx, &team, video_id).await?;
        let project_id = match project {
            Some(p) => Some(load_project(tx, team.id, p).await?.id),
            None => None,
        };
        for target in [team_video.project_id, project_id] {
            PermissionService::require(
                tx,
                team.id,
                actor,
                Permission::EditVideo,
                &PermissionTarget::project(target),
            )
            .await?;
        }
        Ok(tx.set_team_video_project(team_video.id, project_id).await?)
    }

    // -----------------------------------------------------------------------
    // Members
    // -----------------------------------------------------------------------

    pub async fn list_members(
        &self,
        slug: &str,
        actor: Option<DbId>,
    ) -> PipelineResult<Vec<MemberInfo>> {
        let mut tx = self.ctx.begin().await?;
        let result = Self::list_members_in(tx.as_mut(), slug, actor).await;
        self.ctx.finish(tx, Outbox::new(), result).await
    }

    async fn list_members_in(
        tx: &mut dyn StoreTx,
        slug: &str,
        actor: Option<DbId>,
    ) -> PipelineResult<Vec<MemberInfo>> {
        let team = load_team(tx, slug).await?;
        PermissionService::require_member(tx, team.id, actor).await?;
        let mut out = Vec::new();
        for member in tx.list_members(team.id).await? {
            out.push(member_info(tx, &member).await?);
        }
        Ok(out)
    }

    /// Invite `username` with `role`. Membership starts when the
    /// invitation is accepted.
    pub async fn add_member(
        &self,
        slug: &str,
        actor: Option<DbId>,
        username: &str,
        role: TeamRole,
        note: &str,
    ) -> PipelineResult<Invitation> {
        let mut tx = self.ctx.begin().await?;
        let result = Self::add_member_in(tx.as_mut(), slug, actor, username, role, note).await;
        self.ctx.finish(tx, Outbox::new(), result).await
    }

    async fn add_member_in(
        tx: &mut dyn StoreTx,
        slug: &str,
        actor: Option<DbId>,
        username: &str,
        role: TeamRole,
        note: &str,
    ) -> PipelineResult<Invitation> {
        let team = load_team(tx, slug).await?;
        let inviter = PermissionService::require(
            tx,
            team.id,
            actor,
            Permission::InviteMembers,
            &PermissionTarget::team(),
        )
        .await?;
        if !can_assign_role(&inviter, None, role) {
            return Err(CoreError::Forbidden(format!("Cannot invite members as {role}")).into());
        }
        let user = tx
            .find_user_by_username(username)
            .await?
            .ok_or_else(|| CoreError::not_found("User", username))?;
        if tx.get_member(team.id, user.id).await?.is_some() {
            return Err(CoreError::Conflict(format!("{username} is already a member")).into());
        }
        let invitation = tx
            .insert_invitation(&NewInvitation {
                team_id: team.id,
                user_id: user.id,
                author_id: actor,
                role,
                note: note.to_string(),
            })
            .await?;
        tracing::info!(team = %team.slug, username, role = %role, "Member invited");
        Ok(invitation)
    }

    /// Accept or decline an invitation addressed to `actor`.
    pub async fn answer_invitation(
        &self,
        invitation_id: DbId,
        actor: Option<DbId>,
        accept: bool,
    ) -> PipelineResult<Invitation> {
        let mut tx = self.ctx.begin().await?;
        let result = Self::answer_invitation_in(tx.as_mut(), invitation_id, actor, accept).await;
        self.ctx.finish(tx, Outbox::new(), result).await
    }

    async fn answer_invitation_in(
        tx: &mut dyn StoreTx,
        invitation_id: DbId,
        actor: Option<DbId>,
        accept: bool,
    ) -> PipelineResult<Invitation> {
        let user_id = require_actor(actor)?;
        let invitation = tx
            .get_invitation(invitation_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Invitation", invitation_id))?;
        if invitation.user_id != user_id {
            return Err(CoreError::Forbidden("Invitation is addressed to another user".to_string()).into());
        }
        invitation.status().ensure_pending()?;

        let status = if accept {
            InvitationStatus::Accepted
        } else {
            InvitationStatus::Declined
        };
        let invitation = tx.update_invitation_status(invitation.id, status).await?;
        if accept && tx.get_member(invitation.team_id, user_id).await?.is_none() {
            tx.insert_member(invitation.team_id, user_id, invitation.role())
                .await?;
        }
        tracing::info!(invitation_id, user_id, accepted = accept, "Invitation answered");
        Ok(invitation)
    }

    pub async fn update_member(
        &self,
        slug: &str,
        actor: Option<DbId>,
        username: &str,
        role: TeamRole,
    ) -> PipelineResult<MemberInfo> {
        let mut tx = self.ctx.begin().await?;
        let result = Self::update_member_in(tx.as_mut(), slug, actor, username, role).await;
        self.ctx.finish(tx, Outbox::new(), result).await
    }

    async fn update_member_in(
        tx: &mut dyn StoreTx,
        slug: &str,
        actor: Option<DbId>,
        username: &str,
        role: TeamRole,
    ) -> PipelineResult<MemberInfo> {
        let team = load_team(tx, slug).await?;
        let manager = PermissionService::require_member(tx, team.id, actor).await?;
        let member = member_by_username(tx, &team, username).await?;
        if !can_assign_role(&manager, Some(member.role()), role) {
            tracing::warn!(team = %team.slug, username, role = %role, "Role change refused");
            return Err(CoreError::Forbidden(format!("Cannot make {username} {role}")).into());
        }
        let member = tx.update_member_role(member.id, role).await?;
        member_info(tx, &member).await
    }

    /// Remove a member. Members may always remove themselves, except the
    /// last owner.
    pub async fn remove_member(
        &self,
        slug: &str,
        actor: Option<DbId>,
        username: &str,
    ) -> PipelineResult<()> {
        let mut tx = self.ctx.begin().await?;
        let result = Self::remove_member_in(tx.as_mut(), slug, actor, username).await;
        self.ctx.finish(tx, Outbox::new(), result).await
    }

    async fn remove_member_in(
        tx: &mut dyn StoreTx,
        slug: &str,
        actor: Option<DbId>,
        username: &str,
    ) -> PipelineResult<()> {
        let team = load_team(tx, slug).await?;
        let acting = PermissionService::require_member(tx, team.id, actor).await?;
        let member = member_by_username(tx, &team, username).await?;
        let leaving = member.user_id == acting.user_id;

        if leaving {
            if member.role() == TeamRole::Owner {
                let owners = tx
                    .list_members(team.id)
                    .await?
                    .iter()
                    .filter(|m| m.role() == TeamRole::Owner)
                    .count();
                if owners <= 1 {
                    return Err(CoreError::Validation(
                        "The last owner cannot leave the team".to_string(),
                    )
                    .into());
                }
            }
        } else if !can_assign_role(&acting, Some(member.role()), member.role()) {
            return Err(CoreError::Forbidden(format!("Cannot remove {username}")).into());
        }

        tx.delete_member(member.id).await?;
        let next = if leaving {
            ApplicationStatus::MemberLeft
        } else {
            ApplicationStatus::MemberRemoved
        };
        for application in tx.list_applications(team.id).await? {
            if application.user_id == member.user_id
                && application.status() == ApplicationStatus::Approved
            {
                tx.update_application_status(application.id, next).await?;
            }
        }
        tracing::info!(team = %team.slug, username, left = leaving, "Member removed");
        Ok(())
    }

    /// Restrict a member to one project or one language.
    pub async fn narrow_member(
        &self,
        slug: &str,
        actor: Option<DbId>,
        username: &str,
        narrowing: Narrowing,
    ) -> PipelineResult<MembershipNarrowing> {
        let mut tx = self.ctx.begin().await?;
        let result = Self::narrow_member_in(tx.as_mut(), slug, actor, username, narrowing).await;
        self.ctx.finish(tx, Outbox::new(), result).await
    }

    async fn narrow_member_in(
        tx: &mut dyn StoreTx,
        slug: &str,
        actor: Option<DbId>,
        username: &str,
        narrowing: Narrowing,
    ) -> PipelineResult<MembershipNarrowing> {
        let team = load_team(tx, slug).await?;
        let acting = PermissionService::require_member(tx, team.id, actor).await?;
        let member = member_by_username(tx, &team, username).await?;
        if member.role() == TeamRole::Owner {
            return Err(CoreError::Validation("Owners cannot be narrowed".to_string()).into());
        }
        if !can_assign_role(&acting, Some(member.role()), member.role()) {
            return Err(CoreError::Forbidden(format!("Cannot narrow {username}")).into());
        }
        if let Narrowing::Project(project_id) = narrowing {
            let belongs = tx
                .get_project(project_id)
                .await?
                .is_some_and(|p| p.team_id == team.id);
            if !belongs {
                return Err(CoreError::Validation(format!("unknown-project: {project_id}")).into());
            }
        }
        Ok(tx.insert_narrowing(member.id, &narrowing, actor).await?)
    }

    // -----------------------------------------------------------------------
    // Applications
    // -----------------------------------------------------------------------

    pub async fn apply(
        &self,
        slug: &str,
        actor: Option<DbId>,
        note: &str,
    ) -> PipelineResult<Application> {
        let mut tx = self.ctx.begin().await?;
        let result = Self::apply_in(tx.as_mut(), slug, actor, note).await;
        self.ctx.finish(tx, Outbox::new(), result).await
    }

    async fn apply_in(
        tx: &mut dyn StoreTx,
        slug: &str,
        actor: Option<DbId>,
        note: &str,
    ) -> PipelineResult<Application> {
        let user_id = require_actor(actor)?;
        let team = load_team(tx, slug).await?;
        if tx.get_member(team.id, user_id).await?.is_some() {
            return Err(CoreError::Conflict("Already a member of this team".to_string()).into());
        }
        let existing = tx
            .list_applications(team.id)
            .await?
            .into_iter()
            .find(|a| a.user_id == user_id);
        match existing {
            Some(app) if app.status() == ApplicationStatus::Pending => {
                Err(CoreError::Conflict("An application is already pending".to_string()).into())
            }
            Some(app) => {
                app.status().validate_transition(ApplicationStatus::Pending)?;
                Ok(tx
                    .update_application_status(app.id, ApplicationStatus::Pending)
                    .await?)
            }
            None => Ok(tx.insert_application(team.id, user_id, note).await?),
        }
    }

    pub async fn list_applications(
        &self,
        slug: &str,
        actor: Option<DbId>,
    ) -> PipelineResult<Vec<Application>> {
        let mut tx = self.ctx.begin().await?;
        let result = Self::list_applications_in(tx.as_mut(), slug, actor).await;
        self.ctx.finish(tx, Outbox::new(), result).await
    }

    async fn list_applications_in(
        tx: &mut dyn StoreTx,
        slug: &str,
        actor: Option<DbId>,
    ) -> PipelineResult<Vec<Application>> {
        let team = load_team(tx, slug).await?;
        PermissionService::require(
            tx,
            team.id,
            actor,
            Permission::InviteMembers,
            &PermissionTarget::team(),
        )
        .await?;
        Ok(tx.list_applications(team.id).await?)
    }

    /// Move an application along its lifecycle. Approval creates the
    /// contributor membership.
    pub async fn update_application(
        &self,
        slug: &str,
        actor: Option<DbId>,
        application_id: DbId,
        status: ApplicationStatus,
    ) -> PipelineResult<Application> {
        let mut tx = self.ctx.begin().await?;
        let result =
            Self::update_application_in(tx.as_mut(), slug, actor, application_id, status).await;
        self.ctx.finish(tx, Outbox::new(), result).await
    }

    async fn update_application_in(
        tx: &mut dyn StoreTx,
        slug: &str,
        actor: Option<DbId>,
        application_id: DbId,
        status: ApplicationStatus,
    ) -> PipelineResult<Application> {
        let team = load_team(tx, slug).await?;
        PermissionService::require(
            tx,
            team.id,
            actor,
            Permission::InviteMembers,
            &PermissionTarget::team(),
        )
        .await?;
        let application = tx
            .get_application(application_id)
            .await?
            .filter(|a| a.team_id == team.id)
            .ok_or_else(|| CoreError::not_found("Application", application_id))?;
        application.status().validate_transition(status)?;

        let application = tx.update_application_status(application.id, status).await?;
        if status == ApplicationStatus::Approved
            && tx.get_member(team.id, application.user_id).await?.is_none()
        {
            tx.insert_member(team.id, application.user_id, TeamRole::Contributor)
                .await?;
        }
        tracing::info!(
            team = %team.slug,
            application_id,
            status = %status,
            "Application updated",
        );
        Ok(application)
    }

    // -----------------------------------------------------------------------
    // Projects
    // -----------------------------------------------------------------------

    pub async fn list_projects(&self, slug: &str) -> PipelineResult<Vec<Project>> {
        let mut tx = self.ctx.begin().await?;
        let result = Self::list_projects_in(tx.as_mut(), slug).await;
        self.ctx.finish(tx, Outbox::new(), result).await
    }

    async fn list_projects_in(tx: &mut dyn StoreTx, slug: &str) -> PipelineResult<Vec<Project>> {
        let team = load_team(tx, slug).await?;
        Ok(tx.list_projects(team.id).await?)
    }

    pub async fn get_project(&self, slug: &str, project_slug: &str) -> PipelineResult<Project> {
        let mut tx = self.ctx.begin().await?;
        let result = Self::get_project_in(tx.as_mut(), slug, project_slug).await;
        self.ctx.finish(tx, Outbox::new(), result).await
    }

    async fn get_project_in(
        tx: &mut dyn StoreTx,
        slug: &str,
        project_slug: &str,
    ) -> PipelineResult<Project> {
        let team = load_team(tx, slug).await?;
        Ok(tx
            .get_project_by_slug(team.id, project_slug)
            .await?
            .ok_or_else(|| CoreError::not_found("Project", project_slug))?)
    }

    pub async fn create_project(
        &self,
        slug: &str,
        actor: Option<DbId>,
        input: ProjectInput,
    ) -> PipelineResult<Project> {
        let mut tx = self.ctx.begin().await?;
        let result = Self::create_project_in(tx.as_mut(), slug, actor, input).await;
        self.ctx.finish(tx, Outbox::new(), result).await
    }

    async fn create_project_in(
        tx: &mut dyn StoreTx,
        slug: &str,
        actor: Option<DbId>,
        input: ProjectInput,
    ) -> PipelineResult<Project> {
        let team = load_team(tx, slug).await?;
        PermissionService::require(
            tx,
            team.id,
            actor,
            Permission::ManageProjects,
            &PermissionTarget::team(),
        )
        .await?;
        let name = input
            .name
            .filter(|n| !n.trim().is_empty())
            .ok_or_else(|| CoreError::Validation("Project name is required".to_string()))?;
        let project_slug = input
            .slug
            .ok_or_else(|| CoreError::Validation("Project slug is required".to_string()))?;
        validate_slug(&project_slug)?;

        let project = tx
            .insert_project(&NewProject {
                team_id: team.id,
                name,
                slug: project_slug,
                description: input.description.unwrap_or_default(),
                guidelines: input.guidelines.unwrap_or_default(),
                workflow_enabled: input.workflow_enabled.unwrap_or(false),
            })
            .await?;
        tracing::info!(team = %team.slug, project = %project.slug, "Project created");
        Ok(project)
    }

    pub async fn update_project(
        &self,
        slug: &str,
        project_slug: &str,
        actor: Option<DbId>,
        input: ProjectInput,
    ) -> PipelineResult<Project> {
        let mut tx = self.ctx.begin().await?;
        let result = Self::update_project_in(tx.as_mut(), slug, project_slug, actor, input).await;
        let project = self.ctx.finish(tx, Outbox::new(), result).await?;
        self.workflow.invalidate();
        Ok(project)
    }

    async fn update_project_in(
        tx: &mut dyn StoreTx,
        slug: &str,
        project_slug: &str,
        actor: Option<DbId>,
        input: ProjectInput,
    ) -> PipelineResult<Project> {
        let team = load_team(tx, slug).await?;
        let mut project = tx
            .get_project_by_slug(team.id, project_slug)
            .await?
            .ok_or_else(|| CoreError::not_found("Project", project_slug))?;
        PermissionService::require(
            tx,
            team.id,
            actor,
            Permission::ManageProjects,
            &PermissionTarget::project(Some(project.id)),
        )
        .await?;
        if let Some(name) = input.name {
            project.name = name;
        }
        if let Some(new_slug) = input.slug {
            validate_slug(&new_slug)?;
            project.slug = new_slug;
        }
        if let Some(description) = input.description {
            project.description = description;
        }
        if let Some(guidelines) = input.guidelines {
            project.guidelines = guidelines;
        }
        if let Some(enabled) = input.workflow_enabled {
            project.workflow_enabled = enabled;
        }
        Ok(tx.update_project(&project).await?)
    }

    /// Delete a project. Its videos stay in the team without a project.
    pub async fn delete_project(
        &self,
        slug: &str,
        project_slug: &str,
        actor: Option<DbId>,
    ) -> PipelineResult<()> {
        let mut tx = self.ctx.begin().await?;
        let result = Self::delete_project_in(tx.as_mut(), slug, project_slug, actor).await;
        self.ctx.finish(tx, Outbox::new(), result).await?;
        self.workflow.invalidate();
        Ok(())
    }

    async fn delete_project_in(
        tx: &mut dyn StoreTx,
        slug: &str,
        project_slug: &str,
        actor: Option<DbId>,
    ) -> PipelineResult<()> {
        let team = load_team(tx, slug).await?;
        let project = tx
            .get_project_by_slug(team.id, project_slug)
            .await?
            .ok_or_else(|| CoreError::not_found("Project", project_slug))?;
        PermissionService::require(
            tx,
            team.id,
            actor,
            Permission::ManageProjects,
            &PermissionTarget::project(Some(project.id)),
        )
        .await?;
        for team_video in tx.list_team_videos(team.id).await? {
            if team_video.project_id == Some(project.id) {
                tx.set_team_video_project(team_video.id, None).await?;
            }
        }
        tx.delete_project(project.id).await?;
        tracing::info!(team = %team.slug, project = %project.slug, "Project deleted");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Workflows
    // -----------------------------------------------------------------------

    pub async fn list_workflows(
        &self,
        slug: &str,
        actor: Option<DbId>,
    ) -> PipelineResult<Vec<Workflow>> {
        let mut tx = self.ctx.begin().await?;
        let result = Self::list_workflows_in(tx.as_mut(), slug, actor).await;
        self.ctx.finish(tx, Outbox::new(), result).await
    }

    async fn list_workflows_in(
        tx: &mut dyn StoreTx,
        slug: &str,
        actor: Option<DbId>,
    ) -> PipelineResult<Vec<Workflow>> {
        let team = load_team(tx, slug).await?;
        PermissionService::require_member(tx, team.id, actor).await?;
        Ok(tx.list_workflows(team.id).await?)
    }

    /// Create or replace the workflow record at `scope`.
    pub async fn set_workflow(
        &self,
        slug: &str,
        actor: Option<DbId>,
        scope: WorkflowScope,
        settings: WorkflowSettings,
    ) -> PipelineResult<Workflow> {
        let mut tx = self.ctx.begin().await?;
        let result = Self::set_workflow_in(tx.as_mut(), slug, actor, scope, settings).await;
        let workflow = self.ctx.finish(tx, Outbox::new(), result).await?;
        self.workflow.invalidate();
        Ok(workflow)
    }

    async fn set_workflow_in(
        tx: &mut dyn StoreTx,
        slug: &str,
        actor: Option<DbId>,
        scope: WorkflowScope,
        settings: WorkflowSettings,
    ) -> PipelineResult<Workflow> {
        let team = load_team(tx, slug).await?;
        let project_id = match scope.project.as_deref() {
            Some(p) => Some(load_project(tx, team.id, p).await?.id),
            None => None,
        };
        let team_video = match scope.video_id.as_deref() {
            Some(video_id) => Some(team_video_of(tx, &team, video_id).await?),
            None => None,
        };
        let team_video_id = team_video.as_ref().map(|tv| tv.id);
        let target = match (&team_video, project_id) {
            (Some(tv), _) => PermissionTarget::project(tv.project_id),
            (None, Some(_)) => PermissionTarget::project(project_id),
            (None, None) => PermissionTarget::team(),
        };
        PermissionService::require(tx, team.id, actor, Permission::ManageWorkflows, &target).await?;

        let workflow = tx
            .upsert_workflow(&NewWorkflow {
                team_id: team.id,
                project_id: if team_video_id.is_some() { None } else { project_id },
                team_video_id,
                settings,
            })
            .await?;
        tracing::info!(
            team = %team.slug,
            project_id = ?project_id,
            team_video_id = ?team_video_id,
            "Workflow saved",
        );
        Ok(workflow)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn team_video_of(
    tx: &mut dyn StoreTx,
    team: &Team,
    video_id: &str,
) -> PipelineResult<TeamVideo> {
    Ok(tx
        .get_team_video_by_video(video_id)
        .await?
        .filter(|tv| tv.team_id == team.id)
        .ok_or_else(|| CoreError::not_found("TeamVideo", video_id))?)
}

async fn member_by_username(
    tx: &mut dyn StoreTx,
    team: &Team,
    username: &str,
) -> PipelineResult<TeamMember> {
    let user = tx
        .find_user_by_username(username)
        .await?
        .ok_or_else(|| CoreError::not_found("User", username))?;
    Ok(tx
        .get_member(team.id, user.id)
        .await?
        .ok_or_else(|| CoreError::not_found("TeamMember", username))?)
}

async fn member_info(tx: &mut dyn StoreTx, member: &TeamMember) -> PipelineResult<MemberInfo> {
    let username = tx
        .get_user(member.user_id)
        .await?
        .map(|u| u.username)
        .unwrap_or_default();
    let narrowings = tx.list_narrowings(member.id).await?;
    let membership = member.membership(&narrowings);
    Ok(MemberInfo {
        user_id: member.user_id,
        username,
        role: membership.role,
        narrowings: membership.narrowings,
    })
}
