//! Handlers for `/teams/{slug}/applications`.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use subhub_core::team::ApplicationStatus;
use subhub_core::types::DbId;
use subhub_db::models::team::Application;

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ApplyRequest {
    #[serde(default)]
    pub note: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateApplicationRequest {
    pub status: ApplicationStatus,
}

/// GET /api/v1/teams/{slug}/applications
pub async fn list(
    State(state): State<AppState>,
    user: AuthUser,
    Path(slug): Path<String>,
) -> AppResult<Json<DataResponse<Vec<Application>>>> {
    let applications = state
        .services
        .teams
        .list_applications(&slug, user.actor())
        .await?;
    Ok(Json(DataResponse { data: applications }))
}

/// POST /api/v1/teams/{slug}/applications
pub async fn apply(
    State(state): State<AppState>,
    user: AuthUser,
    Path(slug): Path<String>,
    Json(input): Json<ApplyRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<Application>>)> {
    let application = state
        .services
        .teams
        .apply(&slug, user.actor(), &input.note)
        .await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: application })))
}

/// PUT /api/v1/teams/{slug}/applications/{id}
///
/// Approving creates the membership.
pub async fn update(
    State(state): State<AppState>,
    user: AuthUser,
    Path((slug, id)): Path<(String, DbId)>,
    Json(input): Json<UpdateApplicationRequest>,
) -> AppResult<Json<DataResponse<Application>>> {
    let application = state
        .services
        .teams
        .update_application(&slug, user.actor(), id, input.status)
        .await?;
    Ok(Json(DataResponse { data: application }))
}
