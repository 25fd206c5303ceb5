//! Team workflow configuration and resolution.
//!
//! A workflow may be attached to a team, a project, or a single team video.
//! Resolution picks the most specific record whose level is enabled; a
//! disabled level falls through to the next broader one.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::roles::TeamRole;
use crate::types::DbId;

/// Who may review subtitles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewAllowed {
    None,
    Peer,
    Manager,
    Admin,
}

impl ReviewAllowed {
    pub fn as_str(self) -> &'static str {
        match self {
            ReviewAllowed::None => "none",
            ReviewAllowed::Peer => "peer",
            ReviewAllowed::Manager => "manager",
            ReviewAllowed::Admin => "admin",
        }
    }

    pub fn is_enabled(self) -> bool {
        self != ReviewAllowed::None
    }

    /// Minimum role required to perform a review, if reviews are enabled.
    pub fn required_role(self) -> Option<TeamRole> {
        match self {
            ReviewAllowed::None => None,
            ReviewAllowed::Peer => Some(TeamRole::Contributor),
            ReviewAllowed::Manager => Some(TeamRole::Manager),
            ReviewAllowed::Admin => Some(TeamRole::Admin),
        }
    }
}

impl FromStr for ReviewAllowed {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(ReviewAllowed::None),
            "peer" => Ok(ReviewAllowed::Peer),
            "manager" => Ok(ReviewAllowed::Manager),
            "admin" => Ok(ReviewAllowed::Admin),
            other => Err(CoreError::Validation(format!(
                "Invalid review_allowed '{other}'. Must be one of: none, peer, manager, admin"
            ))),
        }
    }
}

/// Who may approve subtitles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApproveAllowed {
    None,
    Manager,
    Admin,
}

impl ApproveAllowed {
    pub fn as_str(self) -> &'static str {
        match self {
            ApproveAllowed::None => "none",
            ApproveAllowed::Manager => "manager",
            ApproveAllowed::Admin => "admin",
        }
    }

    pub fn is_enabled(self) -> bool {
        self != ApproveAllowed::None
    }

    pub fn required_role(self) -> Option<TeamRole> {
        match self {
            ApproveAllowed::None => None,
            ApproveAllowed::Manager => Some(TeamRole::Manager),
            ApproveAllowed::Admin => Some(TeamRole::Admin),
        }
    }
}

impl FromStr for ApproveAllowed {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(ApproveAllowed::None),
            "manager" => Ok(ApproveAllowed::Manager),
            "admin" => Ok(ApproveAllowed::Admin),
            other => Err(CoreError::Validation(format!(
                "Invalid approve_allowed '{other}'. Must be one of: none, manager, admin"
            ))),
        }
    }
}

/// The level a workflow record is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "level", content = "id", rename_all = "snake_case")]
pub enum WorkflowTarget {
    Team(DbId),
    Project(DbId),
    TeamVideo(DbId),
}

impl WorkflowTarget {
    /// Higher is more specific.
    pub fn specificity(self) -> u8 {
        match self {
            WorkflowTarget::Team(_) => 0,
            WorkflowTarget::Project(_) => 1,
            WorkflowTarget::TeamVideo(_) => 2,
        }
    }
}

impl fmt::Display for WorkflowTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkflowTarget::Team(id) => write!(f, "team {id}"),
            WorkflowTarget::Project(id) => write!(f, "project {id}"),
            WorkflowTarget::TeamVideo(id) => write!(f, "team video {id}"),
        }
    }
}

/// The effective workflow switches for a team video.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowSettings {
    pub autocreate_subtitle: bool,
    pub autocreate_translate: bool,
    pub review_allowed: ReviewAllowed,
    pub approve_allowed: ApproveAllowed,
}

impl WorkflowSettings {
    /// Settings in force when no workflow applies: no tasks, no moderation.
    pub const DISABLED: WorkflowSettings = WorkflowSettings {
        autocreate_subtitle: false,
        autocreate_translate: false,
        review_allowed: ReviewAllowed::None,
        approve_allowed: ApproveAllowed::None,
    };

    /// New versions stay private until a reviewer or approver signs off.
    pub fn requires_moderation(&self) -> bool {
        self.review_allowed.is_enabled() || self.approve_allowed.is_enabled()
    }
}

impl Default for WorkflowSettings {
    fn default() -> Self {
        Self::DISABLED
    }
}

/// A stored workflow plus whether its level is switched on.
#[derive(Debug, Clone, Copy)]
pub struct WorkflowCandidate {
    pub target: WorkflowTarget,
    pub enabled: bool,
    pub settings: WorkflowSettings,
}

/// Pick the most specific enabled workflow, or [`WorkflowSettings::DISABLED`].
pub fn resolve_workflow(candidates: &[WorkflowCandidate]) -> WorkflowSettings {
    candidates
        .iter()
        .filter(|c| c.enabled)
        .max_by_key(|c| c.target.specificity())
        .map(|c| c.settings)
        .unwrap_or_default()
}

/// Actions an editor or reviewer can attach to a subtitle submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WorkflowAction {
    /// Keep working; no task changes.
    SaveDraft,
    /// Finish the open subtitle/translate task.
    Complete,
    /// Approve the open review/approve task.
    Approve,
    /// Send the work back to its author.
    Reject,
    /// Publish directly, closing every open task for the language.
    Publish,
}

impl WorkflowAction {
    pub const ALL: [WorkflowAction; 5] = [
        WorkflowAction::SaveDraft,
        WorkflowAction::Complete,
        WorkflowAction::Approve,
        WorkflowAction::Reject,
        WorkflowAction::Publish,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            WorkflowAction::SaveDraft => "save-draft",
            WorkflowAction::Complete => "complete",
            WorkflowAction::Approve => "approve",
            WorkflowAction::Reject => "reject",
            WorkflowAction::Publish => "publish",
        }
    }

    /// The `complete` flag an action implies; it supersedes the caller's.
    pub fn subtitles_complete(self) -> Option<bool> {
        match self {
            WorkflowAction::SaveDraft => Some(false),
            WorkflowAction::Complete | WorkflowAction::Approve | WorkflowAction::Publish => {
                Some(true)
            }
            WorkflowAction::Reject => None,
        }
    }
}

impl fmt::Display for WorkflowAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WorkflowAction {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        WorkflowAction::ALL
            .into_iter()
            .find(|a| a.as_str() == s)
            .ok_or_else(|| CoreError::ActionError(format!("Unknown action '{s}'")))
    }
}
