//! Handlers for `/teams/{slug}/projects`.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use subhub_db::models::team::Project;
use subhub_pipeline::teams::ProjectInput;

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/teams/{slug}/projects
pub async fn list(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> AppResult<Json<DataResponse<Vec<Project>>>> {
    let projects = state.services.teams.list_projects(&slug).await?;
    Ok(Json(DataResponse { data: projects }))
}

/// GET /api/v1/teams/{slug}/projects/{project}
pub async fn get_by_slug(
    State(state): State<AppState>,
    Path((slug, project)): Path<(String, String)>,
) -> AppResult<Json<DataResponse<Project>>> {
    let project = state.services.teams.get_project(&slug, &project).await?;
    Ok(Json(DataResponse { data: project }))
}

/// POST /api/v1/teams/{slug}/projects
pub async fn create(
    State(state): State<AppState>,
    user: AuthUser,
    Path(slug): Path<String>,
    Json(input): Json<ProjectInput>,
) -> AppResult<(StatusCode, Json<DataResponse<Project>>)> {
    let project = state
        .services
        .teams
        .create_project(&slug, user.actor(), input)
        .await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: project })))
}

/// PUT /api/v1/teams/{slug}/projects/{project}
pub async fn update(
    State(state): State<AppState>,
    user: AuthUser,
    Path((slug, project)): Path<(String, String)>,
    Json(input): Json<ProjectInput>,
) -> AppResult<Json<DataResponse<Project>>> {
    let project = state
        .services
        .teams
        .update_project(&slug, &project, user.actor(), input)
        .await?;
    Ok(Json(DataResponse { data: project }))
}

/// DELETE /api/v1/teams/{slug}/projects/{project}
pub async fn delete(
    State(state): State<AppState>,
    user: AuthUser,
    Path((slug, project)): Path<(String, String)>,
) -> AppResult<StatusCode> {
    state
        .services
        .teams
        .delete_project(&slug, &project, user.actor())
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
