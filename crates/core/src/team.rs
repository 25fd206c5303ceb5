//! Team-level rules: slugs, applications, invitations.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

static SLUG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9][a-z0-9_-]{0,49}$").expect("valid regex"));

/// Slugs are lower-case, start with a letter or digit, and are at most 50
/// characters long.
pub fn validate_slug(slug: &str) -> Result<(), CoreError> {
    if !SLUG_RE.is_match(slug) {
        return Err(CoreError::Validation(format!(
            "Invalid slug '{slug}': use lower-case letters, digits, '-' or '_'"
        )));
    }
    Ok(())
}

/// Lifecycle of a request to join a team.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ApplicationStatus {
    #[serde(rename = "Pending")]
    Pending,
    #[serde(rename = "Approved")]
    Approved,
    #[serde(rename = "Denied")]
    Denied,
    #[serde(rename = "Member Removed")]
    MemberRemoved,
    #[serde(rename = "Member Left")]
    MemberLeft,
}

impl ApplicationStatus {
    pub const ALL: [ApplicationStatus; 5] = [
        ApplicationStatus::Pending,
        ApplicationStatus::Approved,
        ApplicationStatus::Denied,
        ApplicationStatus::MemberRemoved,
        ApplicationStatus::MemberLeft,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ApplicationStatus::Pending => "Pending",
            ApplicationStatus::Approved => "Approved",
            ApplicationStatus::Denied => "Denied",
            ApplicationStatus::MemberRemoved => "Member Removed",
            ApplicationStatus::MemberLeft => "Member Left",
        }
    }

    /// Allowed next states.
    pub fn valid_transitions(self) -> &'static [ApplicationStatus] {
        match self {
            ApplicationStatus::Pending => &[ApplicationStatus::Approved, ApplicationStatus::Denied],
            ApplicationStatus::Approved => {
                &[ApplicationStatus::MemberRemoved, ApplicationStatus::MemberLeft]
            }
            ApplicationStatus::Denied => &[],
            ApplicationStatus::MemberRemoved | ApplicationStatus::MemberLeft => {
                &[ApplicationStatus::Pending]
            }
        }
    }

    pub fn validate_transition(self, to: ApplicationStatus) -> Result<(), CoreError> {
        if self.valid_transitions().contains(&to) {
            Ok(())
        } else {
            Err(CoreError::Validation(format!(
                "Cannot move an application from '{self}' to '{to}'"
            )))
        }
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ApplicationStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ApplicationStatus::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| CoreError::Validation(format!("Unknown application status '{s}'")))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvitationStatus {
    Pending,
    Accepted,
    Declined,
}

impl InvitationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            InvitationStatus::Pending => "pending",
            InvitationStatus::Accepted => "accepted",
            InvitationStatus::Declined => "declined",
        }
    }

    pub fn from_db(value: &str) -> Self {
        match value {
            "accepted" => InvitationStatus::Accepted,
            "declined" => InvitationStatus::Declined,
            _ => InvitationStatus::Pending,
        }
    }

    /// Only pending invitations can be answered.
    pub fn ensure_pending(self) -> Result<(), CoreError> {
        if self != InvitationStatus::Pending {
            return Err(CoreError::Conflict(format!(
                "Invitation was already {}",
                self.as_str()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slug_rules() {
        assert!(validate_slug("subtitle-team_2").is_ok());
        assert!(validate_slug("-leading").is_err());
        assert!(validate_slug("Upper").is_err());
        assert!(validate_slug("").is_err());
        assert!(validate_slug(&"a".repeat(51)).is_err());
    }

    #[test]
    fn application_transitions() {
        use ApplicationStatus::*;
        assert!(Pending.validate_transition(Approved).is_ok());
        assert!(Pending.validate_transition(MemberLeft).is_err());
        assert!(Approved.validate_transition(MemberRemoved).is_ok());
        assert!(Denied.validate_transition(Approved).is_err());
        assert!(MemberLeft.validate_transition(Pending).is_ok());
    }

    #[test]
    fn application_status_names() {
        assert_eq!(
            "member removed".parse::<ApplicationStatus>().unwrap(),
            ApplicationStatus::MemberRemoved
        );
        assert_eq!(
            serde_json::to_string(&ApplicationStatus::MemberLeft).unwrap(),
            "\"Member Left\""
        );
    }

    #[test]
    fn answered_invitations_are_final() {
        assert!(InvitationStatus::Pending.ensure_pending().is_ok());
        assert!(InvitationStatus::Accepted.ensure_pending().is_err());
    }
}
