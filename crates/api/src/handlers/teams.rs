//! Handlers for the `/teams` resource and its video list.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use subhub_db::models::team::{NewTeam, Team, TeamVideo};
use subhub_pipeline::teams::UpdateTeam;

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct AddVideoRequest {
    pub video_id: String,
    pub project: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct MoveVideoRequest {
    pub project: Option<String>,
}

// ---------------------------------------------------------------------------
// Teams
// ---------------------------------------------------------------------------

/// POST /api/v1/teams
///
/// The creator becomes the team's owner.
pub async fn create(
    State(state): State<AppState>,
    user: AuthUser,
    Json(input): Json<NewTeam>,
) -> AppResult<(StatusCode, Json<DataResponse<Team>>)> {
    let team = state.services.teams.create_team(user.actor(), input).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: team })))
}

/// GET /api/v1/teams/{slug}
pub async fn get_by_slug(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> AppResult<Json<DataResponse<Team>>> {
    let team = state.services.teams.get_team(&slug).await?;
    Ok(Json(DataResponse { data: team }))
}

/// PUT /api/v1/teams/{slug}
pub async fn update(
    State(state): State<AppState>,
    user: AuthUser,
    Path(slug): Path<String>,
    Json(input): Json<UpdateTeam>,
) -> AppResult<Json<DataResponse<Team>>> {
    let team = state
        .services
        .teams
        .update_team(&slug, user.actor(), input)
        .await?;
    Ok(Json(DataResponse { data: team }))
}

// ---------------------------------------------------------------------------
// Team videos
// ---------------------------------------------------------------------------

/// GET /api/v1/teams/{slug}/videos
pub async fn list_videos(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> AppResult<Json<DataResponse<Vec<TeamVideo>>>> {
    let videos = state.services.teams.list_videos(&slug).await?;
    Ok(Json(DataResponse { data: videos }))
}

/// POST /api/v1/teams/{slug}/videos
pub async fn add_video(
    State(state): State<AppState>,
    user: AuthUser,
    Path(slug): Path<String>,
    Json(input): Json<AddVideoRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<TeamVideo>>)> {
    let team_video = state
        .services
        .teams
        .add_video(&slug, &input.video_id, input.project.as_deref(), user.actor())
        .await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: team_video })))
}

/// PUT /api/v1/teams/{slug}/videos/{video_id}
///
/// Moves the video to another project of the same team (null for none).
pub async fn move_video(
    State(state): State<AppState>,
    user: AuthUser,
    Path((slug, video_id)): Path<(String, String)>,
    Json(input): Json<MoveVideoRequest>,
) -> AppResult<Json<DataResponse<TeamVideo>>> {
    let team_video = state
        .services
        .teams
        .move_video(&slug, &video_id, input.project.as_deref(), user.actor())
        .await?;
    Ok(Json(DataResponse { data: team_video }))
}

/// DELETE /api/v1/teams/{slug}/videos/{video_id}
pub async fn remove_video(
    State(state): State<AppState>,
    user: AuthUser,
    Path((slug, video_id)): Path<(String, String)>,
) -> AppResult<StatusCode> {
    state
        .services
        .teams
        .remove_video(&slug, &video_id, user.actor())
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
