//! HTTP-level integration tests for teams, membership, language
//! preferences, and tasks.

mod common;

use axum::http::StatusCode;
use common::{body_json, get, get_auth, post_json_auth, put_json_auth, sign_up};
use serde_json::json;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Create team `slug` owned by the caller.
async fn create_team(app: axum::Router, token: &str, slug: &str) {
    let response = post_json_auth(
        app,
        "/api/v1/teams",
        json!({ "slug": slug, "name": "Documentary Club" }),
        token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
}

/// Invite `username` as a contributor and have them accept.
async fn join(app: axum::Router, owner: &str, member: &str, slug: &str, username: &str) {
    let response = post_json_auth(
        app.clone(),
        &format!("/api/v1/teams/{slug}/members"),
        json!({ "username": username, "role": "contributor" }),
        owner,
    )
    .await;
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let invitation = body_json(response).await;
    let id = invitation["data"]["id"].as_i64().unwrap();

    let response = put_json_auth(
        app,
        &format!("/api/v1/invitations/{id}"),
        json!({ "accept": true }),
        member,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
}

// ---------------------------------------------------------------------------
// Teams and membership
// ---------------------------------------------------------------------------

#[tokio::test]
async fn team_is_created_and_readable() {
    let app = common::build_test_app();
    let (token, _) = sign_up(app.clone(), "alice").await;
    create_team(app.clone(), &token, "docs").await;

    let response = get(app, "/api/v1/teams/docs").await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["slug"], "docs");
    assert_eq!(json["data"]["name"], "Documentary Club");
}

#[tokio::test]
async fn duplicate_team_slug_is_a_conflict() {
    let app = common::build_test_app();
    let (token, _) = sign_up(app.clone(), "alice").await;
    create_team(app.clone(), &token, "docs").await;

    let response = post_json_auth(
        app,
        "/api/v1/teams",
        json!({ "slug": "docs", "name": "Again" }),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn invitation_must_be_accepted_before_membership() {
    let app = common::build_test_app();
    let (alice, _) = sign_up(app.clone(), "alice").await;
    let (bob, _) = sign_up(app.clone(), "bob").await;
    create_team(app.clone(), &alice, "docs").await;

    let response = post_json_auth(
        app.clone(),
        "/api/v1/teams/docs/members",
        json!({ "username": "bob", "role": "contributor", "note": "welcome" }),
        &alice,
    )
    .await;
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let invitation = body_json(response).await;
    assert_eq!(invitation["data"]["status"], "pending");
    let id = invitation["data"]["id"].as_i64().unwrap();

    // Not a member yet.
    let response = get_auth(app.clone(), "/api/v1/teams/docs/members", &bob).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // Only the invitee may answer.
    let response = put_json_auth(
        app.clone(),
        &format!("/api/v1/invitations/{id}"),
        json!({ "accept": true }),
        &alice,
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = put_json_auth(
        app.clone(),
        &format!("/api/v1/invitations/{id}"),
        json!({ "accept": true }),
        &bob,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["status"], "accepted");

    let response = get_auth(app, "/api/v1/teams/docs/members", &bob).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    let mut members: Vec<(String, String)> = json["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| {
            (
                m["username"].as_str().unwrap().to_string(),
                m["role"].as_str().unwrap().to_string(),
            )
        })
        .collect();
    members.sort();
    assert_eq!(
        members,
        vec![
            ("alice".to_string(), "owner".to_string()),
            ("bob".to_string(), "contributor".to_string()),
        ]
    );
}

#[tokio::test]
async fn contributors_cannot_invite() {
    let app = common::build_test_app();
    let (alice, _) = sign_up(app.clone(), "alice").await;
    let (bob, _) = sign_up(app.clone(), "bob").await;
    sign_up(app.clone(), "carol").await;
    create_team(app.clone(), &alice, "docs").await;
    join(app.clone(), &alice, &bob, "docs", "bob").await;

    let response = post_json_auth(
        app,
        "/api/v1/teams/docs/members",
        json!({ "username": "carol", "role": "contributor" }),
        &bob,
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

// ---------------------------------------------------------------------------
// Language preferences
// ---------------------------------------------------------------------------

#[tokio::test]
async fn preferred_and_blacklisted_lists_round_trip() {
    let app = common::build_test_app();
    let (token, _) = sign_up(app.clone(), "alice").await;
    create_team(app.clone(), &token, "docs").await;

    let response = put_json_auth(
        app.clone(),
        "/api/v1/teams/docs/languages/preferred",
        json!(["fr", "DE"]),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"], json!(["de", "fr"]));

    let response = put_json_auth(
        app.clone(),
        "/api/v1/teams/docs/languages/blacklisted",
        json!(["ja"]),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = get(app.clone(), "/api/v1/teams/docs/languages/preferred").await;
    let json = body_json(response).await;
    assert_eq!(json["data"], json!(["de", "fr"]));

    let response = get(app.clone(), "/api/v1/teams/docs/languages/blacklisted").await;
    let json = body_json(response).await;
    assert_eq!(json["data"], json!(["ja"]));

    // A language cannot be on both lists.
    let response = put_json_auth(
        app,
        "/api/v1/teams/docs/languages/blacklisted",
        json!(["fr"]),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ---------------------------------------------------------------------------
// Tasks
// ---------------------------------------------------------------------------

#[tokio::test]
async fn tasks_are_created_and_filtered() {
    let app = common::build_test_app();
    let (alice, _) = sign_up(app.clone(), "alice").await;
    let (bob, bob_id) = sign_up(app.clone(), "bob").await;
    create_team(app.clone(), &alice, "docs").await;
    join(app.clone(), &alice, &bob, "docs", "bob").await;

    let response = post_json_auth(
        app.clone(),
        "/api/v1/videos",
        json!({ "url": "http://example.com/team.mp4", "team": "docs" }),
        &alice,
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let video = body_json(response).await;
    assert_eq!(video["data"]["team"], "docs");
    let video_id = video["data"]["id"].as_str().unwrap().to_string();

    let response = get(app.clone(), "/api/v1/teams/docs/videos").await;
    let json = body_json(response).await;
    assert_eq!(json["data"].as_array().unwrap().len(), 1);

    let response = post_json_auth(
        app.clone(),
        "/api/v1/teams/docs/tasks",
        json!({
            "video_id": video_id,
            "type": "Subtitle",
            "language": "fr",
            "assignee": "bob",
            "priority": 3,
        }),
        &alice,
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let task = body_json(response).await;
    assert_eq!(task["data"]["assignee_id"], bob_id);
    assert_eq!(task["data"]["language_code"], "fr");
    let task_id = task["data"]["id"].as_i64().unwrap();

    let response = get_auth(
        app.clone(),
        "/api/v1/teams/docs/tasks?assignee=bob&language=fr",
        &bob,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    let ids: Vec<i64> = json["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["id"].as_i64().unwrap())
        .collect();
    assert_eq!(ids, vec![task_id]);

    let response = get_auth(app.clone(), "/api/v1/teams/docs/tasks?language=de", &bob).await;
    let json = body_json(response).await;
    assert_eq!(json["data"], json!([]));

    let response = get_auth(app.clone(), "/api/v1/teams/docs/tasks?assignee=ghost", &bob).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = get_auth(app, "/api/v1/teams/docs/tasks?order_by=sideways", &bob).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn task_on_video_outside_team_is_404() {
    let app = common::build_test_app();
    let (alice, _) = sign_up(app.clone(), "alice").await;
    create_team(app.clone(), &alice, "docs").await;
    let video_id = common::create_video(app.clone(), &alice, "http://example.com/loose.mp4").await;

    let response = post_json_auth(
        app,
        "/api/v1/teams/docs/tasks",
        json!({ "video_id": video_id, "type": "Subtitle", "language": "fr" }),
        &alice,
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
