//! Route definitions for teams and everything scoped to one.
//!
//! Mounted at `/teams`; every nested path is keyed by the team slug.

use axum::routing::{get, post, put};
use axum::Router;

use crate::handlers::{applications, language_prefs, members, projects, tasks, teams, workflows};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(teams::create))
        .route("/{slug}", get(teams::get_by_slug).put(teams::update))
        // Team videos
        .route("/{slug}/videos", get(teams::list_videos).post(teams::add_video))
        .route(
            "/{slug}/videos/{video_id}",
            put(teams::move_video).delete(teams::remove_video),
        )
        // Members
        .route("/{slug}/members", get(members::list).post(members::invite))
        .route(
            "/{slug}/members/{username}",
            put(members::update).delete(members::remove),
        )
        .route(
            "/{slug}/members/{username}/narrowings",
            post(members::narrow),
        )
        // Projects
        .route("/{slug}/projects", get(projects::list).post(projects::create))
        .route(
            "/{slug}/projects/{project}",
            get(projects::get_by_slug)
                .put(projects::update)
                .delete(projects::delete),
        )
        // Tasks
        .route("/{slug}/tasks", get(tasks::list).post(tasks::create))
        .route(
            "/{slug}/tasks/{id}",
            get(tasks::get_by_id).put(tasks::update).delete(tasks::delete),
        )
        // Applications
        .route(
            "/{slug}/applications",
            get(applications::list).post(applications::apply),
        )
        .route("/{slug}/applications/{id}", put(applications::update))
        // Language preferences
        .route(
            "/{slug}/languages/preferred",
            get(language_prefs::get_preferred).put(language_prefs::set_preferred),
        )
        .route(
            "/{slug}/languages/blacklisted",
            get(language_prefs::get_blacklisted).put(language_prefs::set_blacklisted),
        )
        // Workflows
        .route("/{slug}/workflows", get(workflows::list).put(workflows::upsert))
}
