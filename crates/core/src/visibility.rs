//! Version visibility and moderation mapping.
//!
//! A version's *effective* visibility is its override when one is set,
//! otherwise its base visibility. The public tip of a language is the
//! highest-numbered version whose effective visibility is public.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

pub const VISIBILITY_PUBLIC: &str = "public";
pub const VISIBILITY_PRIVATE: &str = "private";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    Private,
}

impl Visibility {
    pub fn as_str(self) -> &'static str {
        match self {
            Visibility::Public => VISIBILITY_PUBLIC,
            Visibility::Private => VISIBILITY_PRIVATE,
        }
    }

    pub fn is_public(self) -> bool {
        self == Visibility::Public
    }

    /// Parse a stored column value. Unknown values are treated as private so
    /// a corrupt row never leaks content.
    pub fn from_db(value: &str) -> Self {
        value.parse().unwrap_or(Visibility::Private)
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Visibility {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            VISIBILITY_PUBLIC => Ok(Visibility::Public),
            VISIBILITY_PRIVATE => Ok(Visibility::Private),
            other => Err(CoreError::Validation(format!(
                "Invalid visibility '{other}'. Must be one of: public, private"
            ))),
        }
    }
}

/// Effective visibility: the override wins when set.
pub fn effective_visibility(visibility: Visibility, override_: Option<Visibility>) -> Visibility {
    override_.unwrap_or(visibility)
}

/// Anything that carries a version number and visibility flags.
pub trait VersionVisibility {
    fn version_number(&self) -> i32;
    fn visibility(&self) -> Visibility;
    fn visibility_override(&self) -> Option<Visibility>;

    fn effective_visibility(&self) -> Visibility {
        effective_visibility(self.visibility(), self.visibility_override())
    }

    fn is_public(&self) -> bool {
        self.effective_visibility().is_public()
    }
}

/// Highest-numbered version regardless of visibility.
pub fn tip<'a, V: VersionVisibility>(versions: impl IntoIterator<Item = &'a V>) -> Option<&'a V>
where
    V: 'a,
{
    versions.into_iter().max_by_key(|v| v.version_number())
}

/// Highest-numbered version whose effective visibility is public.
pub fn public_tip<'a, V: VersionVisibility>(
    versions: impl IntoIterator<Item = &'a V>,
) -> Option<&'a V>
where
    V: 'a,
{
    versions
        .into_iter()
        .filter(|v| v.is_public())
        .max_by_key(|v| v.version_number())
}

/// Whether any version in a language's history is effectively public.
pub fn any_public<'a, V: VersionVisibility + 'a>(versions: impl IntoIterator<Item = &'a V>) -> bool {
    versions.into_iter().any(|v| v.is_public())
}

/// Moderation states exposed by the moderation surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModerationStatus {
    Approved,
    Rejected,
    WaitingModeration,
    Unmoderated,
}

impl ModerationStatus {
    /// The `(visibility, visibility_override)` pair a version takes when it
    /// enters this moderation state. `None` for the override means "leave
    /// it unset".
    pub fn version_flags(self) -> (Visibility, Option<Visibility>) {
        match self {
            ModerationStatus::Approved => (Visibility::Public, None),
            ModerationStatus::Rejected => (Visibility::Private, Some(Visibility::Private)),
            ModerationStatus::WaitingModeration => (Visibility::Private, None),
            ModerationStatus::Unmoderated => (Visibility::Public, None),
        }
    }

    /// Derive the moderation state from stored flags.
    pub fn from_flags(visibility: Visibility, override_: Option<Visibility>) -> Self {
        match (visibility, override_) {
            (_, Some(Visibility::Private)) => ModerationStatus::Rejected,
            (_, Some(Visibility::Public)) | (Visibility::Public, None) => {
                ModerationStatus::Approved
            }
            (Visibility::Private, None) => ModerationStatus::WaitingModeration,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct V(i32, Visibility, Option<Visibility>);

    impl VersionVisibility for V {
        fn version_number(&self) -> i32 {
            self.0
        }
        fn visibility(&self) -> Visibility {
            self.1
        }
        fn visibility_override(&self) -> Option<Visibility> {
            self.2
        }
    }

    #[test]
    fn override_wins_when_set() {
        assert_eq!(
            effective_visibility(Visibility::Public, Some(Visibility::Private)),
            Visibility::Private
        );
        assert_eq!(
            effective_visibility(Visibility::Private, Some(Visibility::Public)),
            Visibility::Public
        );
        assert_eq!(effective_visibility(Visibility::Private, None), Visibility::Private);
    }

    #[test]
    fn public_tip_skips_private_and_overridden_versions() {
        let versions = vec![
            V(1, Visibility::Public, None),
            V(2, Visibility::Public, Some(Visibility::Private)),
            V(3, Visibility::Private, None),
        ];
        assert_eq!(public_tip(&versions).map(|v| v.0), Some(1));
        assert_eq!(tip(&versions).map(|v| v.0), Some(3));
    }

    #[test]
    fn public_tip_honours_public_override() {
        let versions = vec![
            V(1, Visibility::Public, None),
            V(2, Visibility::Private, Some(Visibility::Public)),
        ];
        assert_eq!(public_tip(&versions).map(|v| v.0), Some(2));
    }

    #[test]
    fn empty_history_has_no_tips() {
        let versions: Vec<V> = Vec::new();
        assert!(tip(&versions).is_none());
        assert!(public_tip(&versions).is_none());
        assert!(!any_public(&versions));
    }

    #[test]
    fn unknown_stored_visibility_is_private() {
        assert_eq!(Visibility::from_db("garbage"), Visibility::Private);
        assert_eq!(Visibility::from_db("public"), Visibility::Public);
    }

    #[test]
    fn moderation_flags_match_states() {
        assert_eq!(
            ModerationStatus::Approved.version_flags(),
            (Visibility::Public, None)
        );
        assert_eq!(
            ModerationStatus::from_flags(Visibility::Public, Some(Visibility::Private)),
            ModerationStatus::Rejected
        );
        assert_eq!(
            ModerationStatus::from_flags(Visibility::Private, None),
            ModerationStatus::WaitingModeration
        );
        let (vis, ov) = ModerationStatus::WaitingModeration.version_flags();
        assert_eq!(effective_visibility(vis, ov), Visibility::Private);
    }
}
