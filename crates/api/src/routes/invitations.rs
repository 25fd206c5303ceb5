//! Route definitions for team invitations.
//!
//! ```text
//! PUT /{id}       answer_invitation
//! ```

use axum::routing::put;
use axum::Router;

use crate::handlers::members;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/{id}", put(members::answer_invitation))
}
