pub mod applications;
pub mod collaborators;
pub mod language_prefs;
pub mod languages;
pub mod members;
pub mod notes;
pub mod projects;
pub mod subtitles;
pub mod tasks;
pub mod teams;
pub mod urls;
pub mod users;
pub mod videos;
pub mod workflows;
pub mod writelock;

use subhub_core::error::CoreError;
use subhub_core::types::DbId;

use crate::error::AppResult;
use crate::state::AppState;

/// Look up a user id by username in a throwaway read transaction.
pub(crate) async fn resolve_username(state: &AppState, username: &str) -> AppResult<DbId> {
    let mut tx = state.services.ctx.begin().await?;
    let user = tx.find_user_by_username(username).await;
    tx.rollback().await?;
    user?
        .map(|u| u.id)
        .ok_or_else(|| CoreError::not_found("User", username).into())
}
