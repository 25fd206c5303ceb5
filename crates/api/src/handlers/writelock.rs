//! Handlers for the cooperative write-locks on languages and videos.
//!
//! A client names its editing session with `session_key`; when it sends
//! none, a fresh key is minted and returned so the client can refresh the
//! lock with it.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use subhub_pipeline::writelock::LockGrant;
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct LockRequest {
    pub session_key: Option<String>,
}

impl LockRequest {
    fn session_key(self) -> String {
        self.session_key
            .filter(|key| !key.is_empty())
            .unwrap_or_else(|| Uuid::new_v4().simple().to_string())
    }
}

/// POST /api/v1/videos/{id}/languages/{lc}/writelock
pub async fn acquire(
    State(state): State<AppState>,
    user: AuthUser,
    Path((id, lc)): Path<(String, String)>,
    Json(input): Json<LockRequest>,
) -> AppResult<Json<DataResponse<LockGrant>>> {
    let session_key = input.session_key();
    let grant = state
        .services
        .writelocks
        .writelock(&id, &lc, user.actor(), &session_key)
        .await?;
    Ok(Json(DataResponse { data: grant }))
}

/// DELETE /api/v1/videos/{id}/languages/{lc}/writelock
pub async fn release(
    State(state): State<AppState>,
    _user: AuthUser,
    Path((id, lc)): Path<(String, String)>,
) -> AppResult<StatusCode> {
    state.services.writelocks.release(&id, &lc).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/videos/{id}/writelock
pub async fn acquire_video(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    Json(input): Json<LockRequest>,
) -> AppResult<Json<DataResponse<LockGrant>>> {
    let session_key = input.session_key();
    let grant = state
        .services
        .writelocks
        .writelock_video(&id, user.actor(), &session_key)
        .await?;
    Ok(Json(DataResponse { data: grant }))
}

/// DELETE /api/v1/videos/{id}/writelock
pub async fn release_video(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    state.services.writelocks.release_video(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}
