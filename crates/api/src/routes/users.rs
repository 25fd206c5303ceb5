//! Route definitions for local user accounts.
//!
//! ```text
//! POST /          create_user
//! ```

use axum::routing::post;
use axum::Router;

use crate::handlers::users;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/", post(users::create_user))
}
