//! Permission lookups against storage.
//!
//! The rules live in [`subhub_core::permissions`]; this module only loads
//! the membership (role plus narrowings) an evaluation needs.

use subhub_core::error::CoreError;
use subhub_core::permissions::{
    check_permission, check_subtitle_policy, Membership, Permission, PermissionTarget,
};
use subhub_core::types::DbId;
use subhub_db::models::team::Team;
use subhub_db::StoreTx;

use crate::error::PipelineResult;

pub struct PermissionService;

impl PermissionService {
    /// The actor's membership in `team_id`, narrowings included.
    pub async fn membership(
        tx: &mut dyn StoreTx,
        team_id: DbId,
        user_id: Option<DbId>,
    ) -> PipelineResult<Option<Membership>> {
        let Some(user_id) = user_id else {
            return Ok(None);
        };
        let Some(member) = tx.get_member(team_id, user_id).await? else {
            return Ok(None);
        };
        let narrowings = tx.list_narrowings(member.id).await?;
        Ok(Some(member.membership(&narrowings)))
    }

    /// Require `permission` on `target`, returning the membership that
    /// granted it.
    pub async fn require(
        tx: &mut dyn StoreTx,
        team_id: DbId,
        actor: Option<DbId>,
        permission: Permission,
        target: &PermissionTarget,
    ) -> PipelineResult<Membership> {
        let membership = Self::membership(tx, team_id, actor).await?;
        if let Err(e) = check_permission(membership.as_ref(), permission, target) {
            tracing::warn!(
                team_id,
                user_id = ?actor,
                permission = %permission,
                "Permission denied",
            );
            return Err(e.into());
        }
        membership
            .ok_or_else(|| CoreError::Forbidden(format!("Permission denied: {permission}")).into())
    }

    /// Require any membership at all.
    pub async fn require_member(
        tx: &mut dyn StoreTx,
        team_id: DbId,
        actor: Option<DbId>,
    ) -> PipelineResult<Membership> {
        Self::membership(tx, team_id, actor)
            .await?
            .ok_or_else(|| CoreError::Forbidden("Team members only".to_string()).into())
    }

    /// Apply the team's subtitle or translation policy.
    pub fn check_subtitle_edit(
        team: &Team,
        membership: Option<&Membership>,
        target: &PermissionTarget,
        is_translation: bool,
    ) -> PipelineResult<()> {
        let policy = if is_translation {
            team.translate_policy()
        } else {
            team.subtitle_policy()
        };
        check_subtitle_policy(policy, membership, target)?;
        Ok(())
    }
}
