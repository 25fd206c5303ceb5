//! Handlers for language collaborators and per-version signoffs.

use axum::extract::{Path, State};
use axum::Json;
use subhub_db::models::collaborator::Collaborator;
use subhub_pipeline::collaborators::SaveSignoff;
use subhub_pipeline::tasks::VersionSignoffs;

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/videos/{id}/languages/{lc}/collaborators
pub async fn list(
    State(state): State<AppState>,
    Path((id, lc)): Path<(String, String)>,
) -> AppResult<Json<DataResponse<Vec<Collaborator>>>> {
    let collaborators = state.services.collaborators.list(&id, &lc).await?;
    Ok(Json(DataResponse {
        data: collaborators,
    }))
}

/// POST /api/v1/videos/{id}/languages/{lc}/collaborators
///
/// Records a signoff and refreshes the language's signoff counters.
pub async fn save(
    State(state): State<AppState>,
    user: AuthUser,
    Path((id, lc)): Path<(String, String)>,
    Json(input): Json<SaveSignoff>,
) -> AppResult<Json<DataResponse<Collaborator>>> {
    tracing::debug!(
        video_id = %id,
        language = %lc,
        by = user.user_id,
        collaborator = input.user_id,
        "Saving signoff",
    );
    let collaborator = state
        .services
        .collaborators
        .save_collaborator(&id, &lc, input)
        .await?;
    Ok(Json(DataResponse { data: collaborator }))
}

/// GET /api/v1/videos/{id}/languages/{lc}/signoffs
pub async fn signoffs(
    State(state): State<AppState>,
    Path((id, lc)): Path<(String, String)>,
) -> AppResult<Json<DataResponse<Vec<VersionSignoffs>>>> {
    let signoffs = state.services.tasks.signoffs(&id, &lc).await?;
    Ok(Json(DataResponse { data: signoffs }))
}
