//! Handlers for `/teams/{slug}/workflows`.

use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;
use subhub_core::workflow::WorkflowSettings;
use subhub_db::models::team::Workflow;
use subhub_pipeline::teams::WorkflowScope;

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// Settings plus where they attach. With neither `project` nor `video_id`
/// the record is the team-level workflow.
#[derive(Debug, Deserialize)]
pub struct UpsertWorkflowRequest {
    #[serde(flatten)]
    pub scope: WorkflowScope,
    #[serde(flatten)]
    pub settings: WorkflowSettings,
}

/// GET /api/v1/teams/{slug}/workflows
pub async fn list(
    State(state): State<AppState>,
    user: AuthUser,
    Path(slug): Path<String>,
) -> AppResult<Json<DataResponse<Vec<Workflow>>>> {
    let workflows = state
        .services
        .teams
        .list_workflows(&slug, user.actor())
        .await?;
    Ok(Json(DataResponse { data: workflows }))
}

/// PUT /api/v1/teams/{slug}/workflows
pub async fn upsert(
    State(state): State<AppState>,
    user: AuthUser,
    Path(slug): Path<String>,
    Json(input): Json<UpsertWorkflowRequest>,
) -> AppResult<Json<DataResponse<Workflow>>> {
    let workflow = state
        .services
        .teams
        .set_workflow(&slug, user.actor(), input.scope, input.settings)
        .await?;
    Ok(Json(DataResponse { data: workflow }))
}
