//! Handlers for team membership and invitations.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use subhub_core::permissions::Narrowing;
use subhub_core::roles::TeamRole;
use subhub_core::types::DbId;
use subhub_db::models::team::{Invitation, MembershipNarrowing};
use subhub_pipeline::teams::MemberInfo;

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct InviteRequest {
    pub username: String,
    pub role: TeamRole,
    #[serde(default)]
    pub note: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateMemberRequest {
    pub role: TeamRole,
}

#[derive(Debug, Deserialize)]
pub struct AnswerInvitationRequest {
    pub accept: bool,
}

/// GET /api/v1/teams/{slug}/members
pub async fn list(
    State(state): State<AppState>,
    user: AuthUser,
    Path(slug): Path<String>,
) -> AppResult<Json<DataResponse<Vec<MemberInfo>>>> {
    let members = state.services.teams.list_members(&slug, user.actor()).await?;
    Ok(Json(DataResponse { data: members }))
}

/// POST /api/v1/teams/{slug}/members
///
/// Creates an invitation rather than a member row, hence 202.
pub async fn invite(
    State(state): State<AppState>,
    user: AuthUser,
    Path(slug): Path<String>,
    Json(input): Json<InviteRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<Invitation>>)> {
    let invitation = state
        .services
        .teams
        .add_member(&slug, user.actor(), &input.username, input.role, &input.note)
        .await?;
    Ok((StatusCode::ACCEPTED, Json(DataResponse { data: invitation })))
}

/// PUT /api/v1/teams/{slug}/members/{username}
pub async fn update(
    State(state): State<AppState>,
    user: AuthUser,
    Path((slug, username)): Path<(String, String)>,
    Json(input): Json<UpdateMemberRequest>,
) -> AppResult<Json<DataResponse<MemberInfo>>> {
    let member = state
        .services
        .teams
        .update_member(&slug, user.actor(), &username, input.role)
        .await?;
    Ok(Json(DataResponse { data: member }))
}

/// DELETE /api/v1/teams/{slug}/members/{username}
pub async fn remove(
    State(state): State<AppState>,
    user: AuthUser,
    Path((slug, username)): Path<(String, String)>,
) -> AppResult<StatusCode> {
    state
        .services
        .teams
        .remove_member(&slug, user.actor(), &username)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/teams/{slug}/members/{username}/narrowings
///
/// Body: `{"kind": "project", "value": 12}` or `{"kind": "language", "value": "fr"}`.
pub async fn narrow(
    State(state): State<AppState>,
    user: AuthUser,
    Path((slug, username)): Path<(String, String)>,
    Json(narrowing): Json<Narrowing>,
) -> AppResult<(StatusCode, Json<DataResponse<MembershipNarrowing>>)> {
    let row = state
        .services
        .teams
        .narrow_member(&slug, user.actor(), &username, narrowing)
        .await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: row })))
}

/// PUT /api/v1/invitations/{id}
pub async fn answer_invitation(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<DbId>,
    Json(input): Json<AnswerInvitationRequest>,
) -> AppResult<Json<DataResponse<Invitation>>> {
    let invitation = state
        .services
        .teams
        .answer_invitation(id, user.actor(), input.accept)
        .await?;
    Ok(Json(DataResponse { data: invitation }))
}
