//! Cooperative single-writer locks on languages and videos.
//!
//! A lock is held by a user (or an anonymous session) identified by an
//! opaque session key. It expires after [`WRITELOCK_EXPIRATION_SECS`] of
//! inactivity; expiry is evaluated lazily on every check.

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::{DbId, Timestamp};

/// Seconds of inactivity after which a write-lock lapses.
pub const WRITELOCK_EXPIRATION_SECS: i64 = 30;

/// Display name used for anonymous lock holders.
pub const ANONYMOUS_HOLDER: &str = "anonymous user";

/// Who holds a lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "user_id", rename_all = "lowercase")]
pub enum LockOwner {
    User(DbId),
    Anonymous,
}

impl LockOwner {
    pub fn from_user(user_id: Option<DbId>) -> Self {
        user_id.map_or(LockOwner::Anonymous, LockOwner::User)
    }

    pub fn user_id(self) -> Option<DbId> {
        match self {
            LockOwner::User(id) => Some(id),
            LockOwner::Anonymous => None,
        }
    }
}

/// The lock columns of a language or video row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteLockState {
    pub owner: Option<LockOwner>,
    pub session_key: Option<String>,
    pub locked_at: Option<Timestamp>,
}

impl WriteLockState {
    /// Rebuild the state from the stored columns.
    pub fn from_columns(
        owner_id: Option<DbId>,
        anonymous: bool,
        session_key: Option<String>,
        locked_at: Option<Timestamp>,
    ) -> Self {
        let owner = match (owner_id, anonymous) {
            (Some(id), _) => Some(LockOwner::User(id)),
            (None, true) => Some(LockOwner::Anonymous),
            (None, false) => None,
        };
        Self {
            owner,
            session_key,
            locked_at,
        }
    }

    /// Decompose back into `(owner_id, anonymous, session_key, locked_at)`.
    pub fn into_columns(self) -> (Option<DbId>, bool, Option<String>, Option<Timestamp>) {
        let (owner_id, anonymous) = match self.owner {
            Some(LockOwner::User(id)) => (Some(id), false),
            Some(LockOwner::Anonymous) => (None, true),
            None => (None, false),
        };
        (owner_id, anonymous, self.session_key, self.locked_at)
    }

    pub fn is_expired(&self, now: Timestamp) -> bool {
        match self.locked_at {
            Some(at) => now - at > Duration::seconds(WRITELOCK_EXPIRATION_SECS),
            None => true,
        }
    }

    /// A live lock exists: someone holds it and it has not lapsed.
    pub fn is_held(&self, now: Timestamp) -> bool {
        self.owner.is_some() && !self.is_expired(now)
    }

    /// True iff no lock exists, the lock expired, or `session_key` holds it.
    pub fn can_writelock(&self, session_key: &str, now: Timestamp) -> bool {
        !self.is_held(now) || self.session_key.as_deref() == Some(session_key)
    }

    /// Take (or refresh) the lock for `owner` under `session_key`.
    pub fn acquire(
        &mut self,
        owner: LockOwner,
        session_key: &str,
        now: Timestamp,
        holder_name: impl FnOnce() -> String,
    ) -> Result<(), CoreError> {
        if !self.can_writelock(session_key, now) {
            return Err(CoreError::WriteLocked {
                holder: holder_name(),
            });
        }
        self.owner = Some(owner);
        self.session_key = Some(session_key.to_string());
        self.locked_at = Some(now);
        Ok(())
    }

    pub fn release(&mut self) {
        *self = Self::default();
    }

    /// Whether a live lock is held by somebody other than `author`.
    ///
    /// Anonymous holders never match an author.
    pub fn held_by_other(&self, author: Option<DbId>, now: Timestamp) -> bool {
        if !self.is_held(now) {
            return false;
        }
        match (self.owner, author) {
            (Some(LockOwner::User(holder)), Some(author)) => holder != author,
            _ => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn name() -> String {
        "alice".to_string()
    }

    #[test]
    fn unlocked_language_can_be_locked() {
        let state = WriteLockState::default();
        assert!(state.can_writelock("s1", Utc::now()));
    }

    #[test]
    fn holder_session_may_relock() {
        let now = Utc::now();
        let mut state = WriteLockState::default();
        state.acquire(LockOwner::User(1), "s1", now, name).unwrap();
        assert!(state.can_writelock("s1", now + Duration::seconds(5)));
        assert!(!state.can_writelock("s2", now + Duration::seconds(5)));
    }

    #[test]
    fn lock_lapses_after_thirty_seconds() {
        let now = Utc::now();
        let mut state = WriteLockState::default();
        state.acquire(LockOwner::User(1), "s1", now, name).unwrap();
        assert!(!state.can_writelock("s2", now + Duration::seconds(30)));
        assert!(state.can_writelock("s2", now + Duration::seconds(31)));
    }

    #[test]
    fn conflicting_acquire_names_holder() {
        let now = Utc::now();
        let mut state = WriteLockState::default();
        state.acquire(LockOwner::User(1), "s1", now, name).unwrap();
        let err = state
            .acquire(LockOwner::User(2), "s2", now, || "alice".into())
            .unwrap_err();
        assert!(matches!(err, CoreError::WriteLocked { ref holder } if holder == "alice"));
    }

    #[test]
    fn release_clears_everything() {
        let now = Utc::now();
        let mut state = WriteLockState::default();
        state.acquire(LockOwner::Anonymous, "s1", now, name).unwrap();
        state.release();
        assert_eq!(state, WriteLockState::default());
        assert!(!state.is_held(now));
    }

    #[test]
    fn held_by_other_distinguishes_authors() {
        let now = Utc::now();
        let mut state = WriteLockState::default();
        state.acquire(LockOwner::User(7), "s1", now, name).unwrap();
        assert!(!state.held_by_other(Some(7), now));
        assert!(state.held_by_other(Some(8), now));
        assert!(state.held_by_other(None, now));
        assert!(!state.held_by_other(Some(8), now + Duration::seconds(31)));
    }

    #[test]
    fn columns_round_trip() {
        let now = Utc::now();
        let state = WriteLockState::from_columns(None, true, Some("k".into()), Some(now));
        assert_eq!(state.owner, Some(LockOwner::Anonymous));
        assert_eq!(state.clone().into_columns(), (None, true, Some("k".into()), Some(now)));
    }
}
