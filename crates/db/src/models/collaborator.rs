use serde::Serialize;
use sqlx::FromRow;
use subhub_core::metadata::SignoffState;
use subhub_core::types::{DbId, Timestamp};

/// A row from the `collaborators` table: one user's signoff on a language.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Collaborator {
    pub id: DbId,
    pub subtitle_language_id: DbId,
    pub user_id: DbId,
    pub signoff: bool,
    pub signoff_is_official: bool,
    pub expired: bool,
    pub expiration_start: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Collaborator {
    pub fn signoff_state(&self) -> SignoffState {
        SignoffState {
            signoff: self.signoff,
            signoff_is_official: self.signoff_is_official,
            expired: self.expired,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SaveCollaborator {
    pub subtitle_language_id: DbId,
    pub user_id: DbId,
    pub signoff: bool,
    pub signoff_is_official: bool,
    pub expired: bool,
    pub expiration_start: Option<Timestamp>,
}
