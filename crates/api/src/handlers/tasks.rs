//! Handlers for `/teams/{slug}/tasks`.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use subhub_core::types::DbId;
use subhub_db::models::task::Task;
use subhub_pipeline::tasks::{CreateTask, UpdateTask};

use crate::error::AppResult;
use crate::handlers::resolve_username;
use crate::middleware::auth::{AuthUser, MaybeAuthUser};
use crate::query::TaskQuery;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/teams/{slug}/tasks
///
/// Filters: `assignee`, `priority`, `type`, `language`, `video_id`,
/// `completed`, `completed-before`, `completed-after`, `open`, `order_by`.
pub async fn list(
    State(state): State<AppState>,
    viewer: MaybeAuthUser,
    Path(slug): Path<String>,
    Query(query): Query<TaskQuery>,
) -> AppResult<Json<DataResponse<Vec<Task>>>> {
    let assignee_id = match query.assignee.as_deref() {
        Some(username) => Some(resolve_username(&state, username).await?),
        None => None,
    };
    let filter = query.into_filter(assignee_id)?;
    let tasks = state
        .services
        .tasks
        .list(&slug, viewer.actor(), filter)
        .await?;
    Ok(Json(DataResponse { data: tasks }))
}

/// GET /api/v1/teams/{slug}/tasks/{id}
pub async fn get_by_id(
    State(state): State<AppState>,
    viewer: MaybeAuthUser,
    Path((slug, id)): Path<(String, DbId)>,
) -> AppResult<Json<DataResponse<Task>>> {
    let task = state.services.tasks.get(&slug, id, viewer.actor()).await?;
    Ok(Json(DataResponse { data: task }))
}

/// POST /api/v1/teams/{slug}/tasks
pub async fn create(
    State(state): State<AppState>,
    user: AuthUser,
    Path(slug): Path<String>,
    Json(input): Json<CreateTask>,
) -> AppResult<(StatusCode, Json<DataResponse<Task>>)> {
    let task = state.services.tasks.create(&slug, user.actor(), input).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: task })))
}

/// PUT /api/v1/teams/{slug}/tasks/{id}
///
/// `completed: true` completes an authoring task; `approved` decides a
/// review or approve task. Both run the workflow transitions.
pub async fn update(
    State(state): State<AppState>,
    user: AuthUser,
    Path((slug, id)): Path<(String, DbId)>,
    Json(input): Json<UpdateTask>,
) -> AppResult<Json<DataResponse<Task>>> {
    let task = state
        .services
        .tasks
        .update(&slug, id, user.actor(), input)
        .await?;
    Ok(Json(DataResponse { data: task }))
}

/// DELETE /api/v1/teams/{slug}/tasks/{id}
pub async fn delete(
    State(state): State<AppState>,
    user: AuthUser,
    Path((slug, id)): Path<(String, DbId)>,
) -> AppResult<StatusCode> {
    state.services.tasks.delete(&slug, id, user.actor()).await?;
    Ok(StatusCode::NO_CONTENT)
}
