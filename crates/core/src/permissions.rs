//! Permission evaluation: role x narrowing x team policy.
//!
//! Evaluation order:
//!
//! 1. No membership rejects (except for "Anyone" subtitle policies).
//! 2. Owners always pass.
//! 3. The role must reach the permission's minimum for the targeted level
//!    (team, project or language).
//! 4. A narrowed member needs a narrowing that matches the target.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::roles::TeamRole;
use crate::types::DbId;
use crate::workflow::{ApproveAllowed, ReviewAllowed};

/// Named permissions gated by the evaluator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    RenameTeam,
    EditTeamSettings,
    AddVideo,
    RemoveVideo,
    EditVideo,
    ChangeVideoSettings,
    CreateTasks,
    AssignTasks,
    DeleteTasks,
    PerformManagerReview,
    PerformPeerReview,
    AcceptAssignment,
    InviteMembers,
    ManageProjects,
    ManageWorkflows,
    ManageLanguagePreferences,
    RollbackSubtitles,
    PublishSubtitles,
}

impl Permission {
    pub fn as_str(self) -> &'static str {
        match self {
            Permission::RenameTeam => "rename_team",
            Permission::EditTeamSettings => "edit_team_settings",
            Permission::AddVideo => "add_video",
            Permission::RemoveVideo => "remove_video",
            Permission::EditVideo => "edit_video",
            Permission::ChangeVideoSettings => "change_video_settings",
            Permission::CreateTasks => "create_tasks",
            Permission::AssignTasks => "assign_tasks",
            Permission::DeleteTasks => "delete_tasks",
            Permission::PerformManagerReview => "perform_manager_review",
            Permission::PerformPeerReview => "perform_peer_review",
            Permission::AcceptAssignment => "accept_assignment",
            Permission::InviteMembers => "invite_members",
            Permission::ManageProjects => "manage_projects",
            Permission::ManageWorkflows => "manage_workflows",
            Permission::ManageLanguagePreferences => "manage_language_preferences",
            Permission::RollbackSubtitles => "rollback_subtitles",
            Permission::PublishSubtitles => "publish_subtitles",
        }
    }

    /// Minimum role that grants this permission at `level`, or `None` when
    /// the permission does not apply to that level at all.
    pub fn minimum_role(self, level: ScopeLevel) -> Option<TeamRole> {
        use Permission::*;
        use ScopeLevel::*;
        match (self, level) {
            (RenameTeam | EditTeamSettings | ManageWorkflows | ManageLanguagePreferences, Team) => {
                Some(TeamRole::Admin)
            }
            (ManageWorkflows, Project) => Some(TeamRole::Admin),
            (ManageProjects, Team | Project) => Some(TeamRole::Admin),
            (InviteMembers, Team) => Some(TeamRole::Manager),
            (AddVideo | RemoveVideo, Team | Project) => Some(TeamRole::Manager),
            (EditVideo | ChangeVideoSettings, Team | Project) => Some(TeamRole::Manager),
            (CreateTasks | AssignTasks | DeleteTasks, _) => Some(TeamRole::Manager),
            (PerformManagerReview, _) => Some(TeamRole::Manager),
            (PerformPeerReview | AcceptAssignment, _) => Some(TeamRole::Contributor),
            (RollbackSubtitles | PublishSubtitles, _) => Some(TeamRole::Manager),
            _ => None,
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The model a permission check is aimed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScopeLevel {
    Team,
    Project,
    Language,
}

/// What the actor is trying to act upon.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PermissionTarget {
    pub project_id: Option<DbId>,
    pub language_code: Option<String>,
}

impl PermissionTarget {
    pub fn team() -> Self {
        Self::default()
    }

    pub fn project(project_id: Option<DbId>) -> Self {
        Self {
            project_id,
            language_code: None,
        }
    }

    pub fn language(project_id: Option<DbId>, language_code: impl Into<String>) -> Self {
        Self {
            project_id,
            language_code: Some(language_code.into()),
        }
    }

    pub fn level(&self) -> ScopeLevel {
        if self.language_code.is_some() {
            ScopeLevel::Language
        } else if self.project_id.is_some() {
            ScopeLevel::Project
        } else {
            ScopeLevel::Team
        }
    }
}

/// A per-member restriction to one project or one language.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Narrowing {
    Project(DbId),
    Language(String),
}

impl Narrowing {
    /// Build from the two nullable columns; exactly one must be set.
    pub fn from_columns(
        project_id: Option<DbId>,
        language_code: Option<String>,
    ) -> Result<Self, CoreError> {
        match (project_id, language_code) {
            (Some(p), None) => Ok(Narrowing::Project(p)),
            (None, Some(lc)) => Ok(Narrowing::Language(lc)),
            _ => Err(CoreError::Validation(
                "A narrowing restricts to either a project or a language, not both".to_string(),
            )),
        }
    }

    pub fn matches(&self, target: &PermissionTarget) -> bool {
        match self {
            Narrowing::Project(p) => target.project_id == Some(*p),
            Narrowing::Language(lc) => target.language_code.as_deref() == Some(lc.as_str()),
        }
    }
}

/// A member's role and narrowings within one team.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Membership {
    pub user_id: DbId,
    pub role: TeamRole,
    pub narrowings: Vec<Narrowing>,
}

impl Membership {
    pub fn new(user_id: DbId, role: TeamRole) -> Self {
        Self {
            user_id,
            role,
            narrowings: Vec::new(),
        }
    }

    /// Owners are never narrowed; their narrowings are ignored.
    pub fn is_narrowed(&self) -> bool {
        self.role != TeamRole::Owner && !self.narrowings.is_empty()
    }

    /// Whether the narrowings (if any) admit `target`.
    pub fn admits(&self, target: &PermissionTarget) -> bool {
        !self.is_narrowed() || self.narrowings.iter().any(|n| n.matches(target))
    }
}

fn forbidden(permission: impl fmt::Display) -> CoreError {
    CoreError::Forbidden(format!("Permission denied: {permission}"))
}

/// Evaluate `permission` for `membership` against `target`.
pub fn check_permission(
    membership: Option<&Membership>,
    permission: Permission,
    target: &PermissionTarget,
) -> Result<(), CoreError> {
    let member = membership.ok_or_else(|| forbidden(permission))?;
    if member.role == TeamRole::Owner {
        return Ok(());
    }
    let minimum = permission
        .minimum_role(target.level())
        .ok_or_else(|| forbidden(permission))?;
    if !member.role.is_at_least(minimum) {
        return Err(forbidden(permission));
    }
    if !member.admits(target) {
        return Err(forbidden(permission));
    }
    Ok(())
}

pub fn has_permission(
    membership: Option<&Membership>,
    permission: Permission,
    target: &PermissionTarget,
) -> bool {
    check_permission(membership, permission, target).is_ok()
}

/// Team policy for who may create and edit subtitles or translations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SubtitlePolicy {
    Anyone,
    AnyTeamMember,
    ManagersAndAdmins,
    AdminsOnly,
}

impl SubtitlePolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            SubtitlePolicy::Anyone => "anyone",
            SubtitlePolicy::AnyTeamMember => "members",
            SubtitlePolicy::ManagersAndAdmins => "managers",
            SubtitlePolicy::AdminsOnly => "admins",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SubtitlePolicy::Anyone => "Anyone",
            SubtitlePolicy::AnyTeamMember => "Any team member",
            SubtitlePolicy::ManagersAndAdmins => "Only managers and admins",
            SubtitlePolicy::AdminsOnly => "Only admins",
        }
    }

    /// Minimum team role, or `None` for [`SubtitlePolicy::Anyone`].
    pub fn minimum_role(self) -> Option<TeamRole> {
        match self {
            SubtitlePolicy::Anyone => None,
            SubtitlePolicy::AnyTeamMember => Some(TeamRole::Contributor),
            SubtitlePolicy::ManagersAndAdmins => Some(TeamRole::Manager),
            SubtitlePolicy::AdminsOnly => Some(TeamRole::Admin),
        }
    }
}

impl FromStr for SubtitlePolicy {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "anyone" => Ok(SubtitlePolicy::Anyone),
            "members" => Ok(SubtitlePolicy::AnyTeamMember),
            "managers" => Ok(SubtitlePolicy::ManagersAndAdmins),
            "admins" => Ok(SubtitlePolicy::AdminsOnly),
            other => Err(CoreError::Validation(format!(
                "Invalid policy '{other}'. Must be one of: anyone, members, managers, admins"
            ))),
        }
    }
}

/// Whether an actor may create or edit subtitles under `policy`.
///
/// Under [`SubtitlePolicy::Anyone`] non-members pass; members are still
/// held to their narrowings.
pub fn check_subtitle_policy(
    policy: SubtitlePolicy,
    membership: Option<&Membership>,
    target: &PermissionTarget,
) -> Result<(), CoreError> {
    let denied = || CoreError::Forbidden(format!("Subtitle policy: {}", policy.label()));
    let Some(minimum) = policy.minimum_role() else {
        return match membership {
            Some(m) if !m.admits(target) => Err(denied()),
            _ => Ok(()),
        };
    };
    let member = membership.ok_or_else(denied)?;
    if member.role == TeamRole::Owner {
        return Ok(());
    }
    if !member.role.is_at_least(minimum) || !member.admits(target) {
        return Err(denied());
    }
    Ok(())
}

/// Whether a member may review under the workflow's `review_allowed`.
pub fn can_review(
    review_allowed: ReviewAllowed,
    membership: Option<&Membership>,
    target: &PermissionTarget,
) -> bool {
    let Some(minimum) = review_allowed.required_role() else {
        return false;
    };
    membership.is_some_and(|m| {
        m.role == TeamRole::Owner || (m.role.is_at_least(minimum) && m.admits(target))
    })
}

/// Whether a member may approve under the workflow's `approve_allowed`.
pub fn can_approve(
    approve_allowed: ApproveAllowed,
    membership: Option<&Membership>,
    target: &PermissionTarget,
) -> bool {
    let Some(minimum) = approve_allowed.required_role() else {
        return false;
    };
    membership.is_some_and(|m| {
        m.role == TeamRole::Owner || (m.role.is_at_least(minimum) && m.admits(target))
    })
}

/// Whether `actor` may give `target_role` to somebody currently holding
/// `current_role` (`None` for a new member).
pub fn can_assign_role(
    actor: &Membership,
    current_role: Option<TeamRole>,
    target_role: TeamRole,
) -> bool {
    if actor.is_narrowed() {
        return false;
    }
    let assignable = actor.role.assignable_roles();
    let current_ok = current_role.map_or(true, |r| actor.role == TeamRole::Owner || r < actor.role);
    assignable.contains(&target_role) && current_ok
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn member(role: TeamRole) -> Membership {
        Membership::new(1, role)
    }

    #[test]
    fn outsiders_are_rejected() {
        assert_matches!(
            check_permission(None, Permission::AddVideo, &PermissionTarget::team()),
            Err(CoreError::Forbidden(_))
        );
    }

    #[test]
    fn owners_always_pass() {
        let mut owner = member(TeamRole::Owner);
        owner.narrowings.push(Narrowing::Language("fr".into()));
        assert!(has_permission(
            Some(&owner),
            Permission::RenameTeam,
            &PermissionTarget::team()
        ));
    }

    #[test]
    fn role_minimum_per_level() {
        let manager = member(TeamRole::Manager);
        assert!(has_permission(
            Some(&manager),
            Permission::AddVideo,
            &PermissionTarget::team()
        ));
        assert!(!has_permission(
            Some(&manager),
            Permission::RenameTeam,
            &PermissionTarget::team()
        ));
        // Renaming is a team-level permission only.
        let admin = member(TeamRole::Admin);
        assert!(!has_permission(
            Some(&admin),
            Permission::RenameTeam,
            &PermissionTarget::project(Some(3))
        ));
    }

    #[test]
    fn project_narrowing_restricts_scope() {
        let mut manager = member(TeamRole::Manager);
        manager.narrowings.push(Narrowing::Project(7));
        assert!(has_permission(
            Some(&manager),
            Permission::AssignTasks,
            &PermissionTarget::project(Some(7))
        ));
        assert!(!has_permission(
            Some(&manager),
            Permission::AssignTasks,
            &PermissionTarget::project(Some(8))
        ));
        assert!(!has_permission(
            Some(&manager),
            Permission::AssignTasks,
            &PermissionTarget::team()
        ));
    }

    #[test]
    fn language_narrowing_restricts_scope() {
        let mut manager = member(TeamRole::Manager);
        manager.narrowings.push(Narrowing::Language("fr".into()));
        assert!(has_permission(
            Some(&manager),
            Permission::PerformManagerReview,
            &PermissionTarget::language(None, "fr")
        ));
        assert!(!has_permission(
            Some(&manager),
            Permission::PerformManagerReview,
            &PermissionTarget::language(None, "de")
        ));
    }

    #[test]
    fn narrowing_needs_exactly_one_column() {
        assert!(Narrowing::from_columns(Some(1), Some("fr".into())).is_err());
        assert!(Narrowing::from_columns(None, None).is_err());
        assert_eq!(
            Narrowing::from_columns(None, Some("fr".into())).unwrap(),
            Narrowing::Language("fr".into())
        );
    }

    #[test]
    fn subtitle_policy_gating() {
        let target = PermissionTarget::language(None, "en");
        assert!(check_subtitle_policy(SubtitlePolicy::Anyone, None, &target).is_ok());
        assert!(check_subtitle_policy(SubtitlePolicy::AnyTeamMember, None, &target).is_err());
        let contributor = member(TeamRole::Contributor);
        assert!(
            check_subtitle_policy(SubtitlePolicy::AnyTeamMember, Some(&contributor), &target)
                .is_ok()
        );
        assert!(check_subtitle_policy(
            SubtitlePolicy::ManagersAndAdmins,
            Some(&contributor),
            &target
        )
        .is_err());
        let admin = member(TeamRole::Admin);
        assert!(check_subtitle_policy(SubtitlePolicy::AdminsOnly, Some(&admin), &target).is_ok());
    }

    #[test]
    fn anyone_policy_still_honours_member_narrowings() {
        let mut contributor = member(TeamRole::Contributor);
        contributor.narrowings.push(Narrowing::Language("fr".into()));
        let target = PermissionTarget::language(None, "de");
        assert!(
            check_subtitle_policy(SubtitlePolicy::Anyone, Some(&contributor), &target).is_err()
        );
    }

    #[test]
    fn review_and_approve_follow_workflow_roles() {
        let target = PermissionTarget::language(None, "en");
        let contributor = member(TeamRole::Contributor);
        let manager = member(TeamRole::Manager);
        assert!(can_review(ReviewAllowed::Peer, Some(&contributor), &target));
        assert!(!can_review(ReviewAllowed::Manager, Some(&contributor), &target));
        assert!(!can_review(ReviewAllowed::None, Some(&manager), &target));
        assert!(can_approve(ApproveAllowed::Manager, Some(&manager), &target));
        assert!(!can_approve(ApproveAllowed::Admin, Some(&manager), &target));
        assert!(!can_approve(ApproveAllowed::Manager, None, &target));
    }

    #[test]
    fn role_assignment_rules() {
        let admin = member(TeamRole::Admin);
        assert!(can_assign_role(&admin, None, TeamRole::Manager));
        assert!(!can_assign_role(&admin, None, TeamRole::Admin));
        assert!(!can_assign_role(&admin, Some(TeamRole::Admin), TeamRole::Contributor));
        let owner = member(TeamRole::Owner);
        assert!(can_assign_role(&owner, Some(TeamRole::Admin), TeamRole::Owner));
    }
}
