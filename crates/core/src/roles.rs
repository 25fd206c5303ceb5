//! Team membership roles.
//!
//! Roles form a total order `contributor < manager < admin < owner`; policy
//! gating is expressed with the "equal or greater" / "equal or lower" helpers.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

pub const ROLE_OWNER: &str = "owner";
pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_MANAGER: &str = "manager";
pub const ROLE_CONTRIBUTOR: &str = "contributor";

/// All valid role names, lowest first.
pub const VALID_ROLES: &[&str] = &[ROLE_CONTRIBUTOR, ROLE_MANAGER, ROLE_ADMIN, ROLE_OWNER];

/// A member's role within a team. Variant order is the privilege order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TeamRole {
    Contributor,
    Manager,
    Admin,
    Owner,
}

impl TeamRole {
    pub const ALL: [TeamRole; 4] = [
        TeamRole::Contributor,
        TeamRole::Manager,
        TeamRole::Admin,
        TeamRole::Owner,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TeamRole::Contributor => ROLE_CONTRIBUTOR,
            TeamRole::Manager => ROLE_MANAGER,
            TeamRole::Admin => ROLE_ADMIN,
            TeamRole::Owner => ROLE_OWNER,
        }
    }

    /// Roles at or above this one.
    pub fn equal_or_greater(self) -> Vec<TeamRole> {
        Self::ALL.into_iter().filter(|r| *r >= self).collect()
    }

    /// Roles at or below this one.
    pub fn equal_or_lower(self) -> Vec<TeamRole> {
        Self::ALL.into_iter().filter(|r| *r <= self).collect()
    }

    pub fn is_at_least(self, other: TeamRole) -> bool {
        self >= other
    }

    /// Roles this role may hand out to other members.
    ///
    /// Owners may assign any role; admins may assign roles strictly below
    /// admin; everybody else assigns nothing.
    pub fn assignable_roles(self) -> Vec<TeamRole> {
        match self {
            TeamRole::Owner => Self::ALL.to_vec(),
            TeamRole::Admin => vec![TeamRole::Contributor, TeamRole::Manager],
            TeamRole::Manager | TeamRole::Contributor => Vec::new(),
        }
    }
}

impl fmt::Display for TeamRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TeamRole {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            ROLE_OWNER => Ok(TeamRole::Owner),
            ROLE_ADMIN => Ok(TeamRole::Admin),
            ROLE_MANAGER => Ok(TeamRole::Manager),
            ROLE_CONTRIBUTOR => Ok(TeamRole::Contributor),
            other => Err(CoreError::Validation(format!(
                "Invalid role '{other}'. Must be one of: {}",
                VALID_ROLES.join(", ")
            ))),
        }
    }
}
