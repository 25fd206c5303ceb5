//! Handlers for the `/videos` resource.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use subhub_db::models::video::UpdateVideo;
use subhub_pipeline::videos::{CreateVideo, VideoDetails};

use crate::error::AppResult;
use crate::middleware::auth::{AuthUser, MaybeAuthUser};
use crate::response::DataResponse;
use crate::state::AppState;

/// POST /api/v1/videos
pub async fn create(
    State(state): State<AppState>,
    user: AuthUser,
    Json(input): Json<CreateVideo>,
) -> AppResult<(StatusCode, Json<DataResponse<VideoDetails>>)> {
    let details = state.services.videos.create_video(user.actor(), input).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: details })))
}

/// GET /api/v1/videos/{id}
pub async fn get_by_id(
    State(state): State<AppState>,
    viewer: MaybeAuthUser,
    Path(id): Path<String>,
) -> AppResult<Json<DataResponse<VideoDetails>>> {
    let details = state.services.videos.get_video(&id, viewer.actor()).await?;
    Ok(Json(DataResponse { data: details }))
}

/// PUT /api/v1/videos/{id}
pub async fn update(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    Json(input): Json<UpdateVideo>,
) -> AppResult<Json<DataResponse<VideoDetails>>> {
    let details = state
        .services
        .videos
        .update_video(&id, user.actor(), input)
        .await?;
    Ok(Json(DataResponse { data: details }))
}
