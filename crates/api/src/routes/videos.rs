//! Route definitions for videos, their URLs, languages and subtitles.
//!
//! Mounted at `/videos`. Language routes are keyed by language code.

use axum::routing::{get, post, put};
use axum::Router;

use crate::handlers::{collaborators, languages, notes, subtitles, urls, videos, writelock};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(videos::create))
        .route("/{id}", get(videos::get_by_id).put(videos::update))
        .route(
            "/{id}/writelock",
            post(writelock::acquire_video).delete(writelock::release_video),
        )
        // URLs
        .route("/{id}/urls", get(urls::list).post(urls::add))
        .route(
            "/{id}/urls/{url_id}",
            put(urls::make_primary).delete(urls::delete),
        )
        // Languages
        .route("/{id}/languages", get(languages::list).post(languages::create))
        .route("/{id}/languages/{lc}/fork", post(languages::fork))
        .route("/{id}/languages/{lc}/status", get(languages::status))
        .route(
            "/{id}/languages/{lc}/writelock",
            post(writelock::acquire).delete(writelock::release),
        )
        .route(
            "/{id}/languages/{lc}/collaborators",
            get(collaborators::list).post(collaborators::save),
        )
        .route("/{id}/languages/{lc}/signoffs", get(collaborators::signoffs))
        // Subtitles
        .route(
            "/{id}/languages/{lc}/subtitles",
            get(subtitles::get_subtitles).post(subtitles::add_subtitles),
        )
        .route(
            "/{id}/languages/{lc}/subtitles/versions",
            get(subtitles::list_versions),
        )
        .route("/{id}/languages/{lc}/subtitles/diff", get(subtitles::diff))
        .route(
            "/{id}/languages/{lc}/subtitles/rollback",
            post(subtitles::rollback),
        )
        .route(
            "/{id}/languages/{lc}/subtitles/actions",
            get(subtitles::list_actions).post(subtitles::perform_action),
        )
        .route(
            "/{id}/languages/{lc}/subtitles/notes",
            get(notes::list).post(notes::add),
        )
}
