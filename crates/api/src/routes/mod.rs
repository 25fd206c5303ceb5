pub mod health;
pub mod invitations;
pub mod teams;
pub mod users;
pub mod videos;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /users                                              create user + token
///
/// /videos                                             create
/// /videos/{id}                                        get, update
/// /videos/{id}/writelock                              acquire, release
/// /videos/{id}/urls                                   list, add
/// /videos/{id}/urls/{url_id}                          make primary, delete
/// /videos/{id}/languages                              list, create
/// /videos/{id}/languages/{lc}/fork                    fork (POST)
/// /videos/{id}/languages/{lc}/status                  translation staleness
/// /videos/{id}/languages/{lc}/writelock               acquire, release
/// /videos/{id}/languages/{lc}/collaborators           list, save signoff
/// /videos/{id}/languages/{lc}/signoffs                reviewer/approver per version
/// /videos/{id}/languages/{lc}/subtitles               get, add version
/// /videos/{id}/languages/{lc}/subtitles/versions      history
/// /videos/{id}/languages/{lc}/subtitles/diff          diff two versions
/// /videos/{id}/languages/{lc}/subtitles/rollback      rollback (POST)
/// /videos/{id}/languages/{lc}/subtitles/actions       list, perform
/// /videos/{id}/languages/{lc}/subtitles/notes         list, add
///
/// /teams                                              create
/// /teams/{slug}                                       get, update
/// /teams/{slug}/videos                                list, add
/// /teams/{slug}/videos/{video_id}                     move, remove
/// /teams/{slug}/members                               list, invite (202)
/// /teams/{slug}/members/{username}                    change role, remove
/// /teams/{slug}/members/{username}/narrowings         narrow (POST)
/// /teams/{slug}/projects                              list, create
/// /teams/{slug}/projects/{project}                    get, update, delete
/// /teams/{slug}/tasks                                 list (filtered), create
/// /teams/{slug}/tasks/{id}                            get, update, delete
/// /teams/{slug}/applications                          list, apply
/// /teams/{slug}/applications/{id}                     update status
/// /teams/{slug}/languages/preferred                   get, replace
/// /teams/{slug}/languages/blacklisted                 get, replace
/// /teams/{slug}/workflows                             list, upsert
///
/// /invitations/{id}                                   accept or decline
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/users", users::router())
        .nest("/videos", videos::router())
        .nest("/teams", teams::router())
        .nest("/invitations", invitations::router())
}
