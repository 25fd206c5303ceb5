//! Team, project, membership and workflow models.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use subhub_core::language_prefs::LanguagePreference;
use subhub_core::permissions::{Membership, Narrowing, SubtitlePolicy};
use subhub_core::roles::TeamRole;
use subhub_core::team::{ApplicationStatus, InvitationStatus};
use subhub_core::types::{DbId, Timestamp, VideoId};
use subhub_core::workflow::{
    ApproveAllowed, ReviewAllowed, WorkflowCandidate, WorkflowSettings, WorkflowTarget,
};

// ---------------------------------------------------------------------------
// Team
// ---------------------------------------------------------------------------

/// A row from the `teams` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Team {
    pub id: DbId,
    pub slug: String,
    pub name: String,
    pub description: String,
    pub workflow_enabled: bool,
    pub task_expiration_days: Option<i32>,
    pub max_tasks_per_member: Option<i32>,
    pub subtitle_policy: String,
    pub translate_policy: String,
    pub sync_disabled: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Team {
    /// Unknown stored values fall back to the most restrictive policy.
    pub fn subtitle_policy(&self) -> SubtitlePolicy {
        self.subtitle_policy
            .parse()
            .unwrap_or(SubtitlePolicy::AdminsOnly)
    }

    pub fn translate_policy(&self) -> SubtitlePolicy {
        self.translate_policy
            .parse()
            .unwrap_or(SubtitlePolicy::AdminsOnly)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewTeam {
    pub slug: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub workflow_enabled: bool,
    pub task_expiration_days: Option<i32>,
    pub max_tasks_per_member: Option<i32>,
    #[serde(default = "default_policy")]
    pub subtitle_policy: String,
    #[serde(default = "default_policy")]
    pub translate_policy: String,
    #[serde(default)]
    pub sync_disabled: bool,
}

fn default_policy() -> String {
    SubtitlePolicy::Anyone.as_str().to_string()
}

// ---------------------------------------------------------------------------
// Project
// ---------------------------------------------------------------------------

/// A row from the `projects` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Project {
    pub id: DbId,
    pub team_id: DbId,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub guidelines: String,
    pub workflow_enabled: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

#[derive(Debug, Clone)]
pub struct NewProject {
    pub team_id: DbId,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub guidelines: String,
    pub workflow_enabled: bool,
}

// ---------------------------------------------------------------------------
// TeamVideo
// ---------------------------------------------------------------------------

/// A row from the `team_videos` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct TeamVideo {
    pub id: DbId,
    pub team_id: DbId,
    pub video_id: VideoId,
    pub project_id: Option<DbId>,
    pub added_by_id: Option<DbId>,
    pub created_at: Timestamp,
}

// ---------------------------------------------------------------------------
// Membership
// ---------------------------------------------------------------------------

/// A row from the `team_members` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct TeamMember {
    pub id: DbId,
    pub team_id: DbId,
    pub user_id: DbId,
    pub role: String,
    pub created_at: Timestamp,
}

impl TeamMember {
    /// Unknown stored roles degrade to contributor.
    pub fn role(&self) -> TeamRole {
        self.role.parse().unwrap_or(TeamRole::Contributor)
    }

    pub fn membership(&self, narrowings: &[MembershipNarrowing]) -> Membership {
        Membership {
            user_id: self.user_id,
            role: self.role(),
            narrowings: narrowings
                .iter()
                .filter(|n| n.member_id == self.id)
                .filter_map(MembershipNarrowing::narrowing)
                .collect(),
        }
    }
}

/// A row from the `membership_narrowings` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct MembershipNarrowing {
    pub id: DbId,
    pub member_id: DbId,
    pub project_id: Option<DbId>,
    pub language_code: Option<String>,
    pub added_by_id: Option<DbId>,
    pub created_at: Timestamp,
}

impl MembershipNarrowing {
    pub fn narrowing(&self) -> Option<Narrowing> {
        Narrowing::from_columns(self.project_id, self.language_code.clone()).ok()
    }
}

// ---------------------------------------------------------------------------
// Workflow
// ---------------------------------------------------------------------------

/// A row from the `workflows` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Workflow {
    pub id: DbId,
    pub team_id: DbId,
    pub project_id: Option<DbId>,
    pub team_video_id: Option<DbId>,
    pub autocreate_subtitle: bool,
    pub autocreate_translate: bool,
    pub review_allowed: String,
    pub approve_allowed: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Workflow {
    pub fn target(&self) -> WorkflowTarget {
        match (self.team_video_id, self.project_id) {
            (Some(tv), _) => WorkflowTarget::TeamVideo(tv),
            (None, Some(p)) => WorkflowTarget::Project(p),
            (None, None) => WorkflowTarget::Team(self.team_id),
        }
    }

    pub fn settings(&self) -> WorkflowSettings {
        WorkflowSettings {
            autocreate_subtitle: self.autocreate_subtitle,
            autocreate_translate: self.autocreate_translate,
            review_allowed: self.review_allowed.parse().unwrap_or(ReviewAllowed::None),
            approve_allowed: self.approve_allowed.parse().unwrap_or(ApproveAllowed::None),
        }
    }

    pub fn candidate(&self, enabled: bool) -> WorkflowCandidate {
        WorkflowCandidate {
            target: self.target(),
            enabled,
            settings: self.settings(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewWorkflow {
    pub team_id: DbId,
    pub project_id: Option<DbId>,
    pub team_video_id: Option<DbId>,
    pub settings: WorkflowSettings,
}

// ---------------------------------------------------------------------------
// Language preferences
// ---------------------------------------------------------------------------

/// A row from the `team_language_preferences` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct TeamLanguagePreference {
    pub id: DbId,
    pub team_id: DbId,
    pub language_code: String,
    pub preferred: bool,
    pub allow_reads: bool,
    pub allow_writes: bool,
}

impl TeamLanguagePreference {
    pub fn preference(&self) -> LanguagePreference {
        LanguagePreference {
            language_code: self.language_code.clone(),
            preferred: self.preferred,
            allow_reads: self.allow_reads,
            allow_writes: self.allow_writes,
        }
    }
}

// ---------------------------------------------------------------------------
// Applications and invitations
// ---------------------------------------------------------------------------

/// A row from the `applications` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Application {
    pub id: DbId,
    pub team_id: DbId,
    pub user_id: DbId,
    pub note: String,
    pub status: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Application {
    pub fn status(&self) -> ApplicationStatus {
        self.status.parse().unwrap_or(ApplicationStatus::Pending)
    }
}

/// A row from the `invitations` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Invitation {
    pub id: DbId,
    pub team_id: DbId,
    pub user_id: DbId,
    pub author_id: Option<DbId>,
    pub role: String,
    pub note: String,
    pub status: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Invitation {
    pub fn status(&self) -> InvitationStatus {
        InvitationStatus::from_db(&self.status)
    }

    pub fn role(&self) -> TeamRole {
        self.role.parse().unwrap_or(TeamRole::Contributor)
    }
}

#[derive(Debug, Clone)]
pub struct NewInvitation {
    pub team_id: DbId,
    pub user_id: DbId,
    pub author_id: Option<DbId>,
    pub role: TeamRole,
    pub note: String,
}
