//! HTTP-level integration tests for videos, their URLs, and languages.

mod common;

use axum::http::StatusCode;
use common::{
    body_json, create_video, delete_auth, get, post_json, post_json_auth, put_json_auth, sign_up,
};
use serde_json::json;

// ---------------------------------------------------------------------------
// Videos
// ---------------------------------------------------------------------------

#[tokio::test]
async fn create_video_requires_a_token() {
    let app = common::build_test_app();
    let response = post_json(
        app,
        "/api/v1/videos",
        json!({ "url": "http://example.com/anon.mp4" }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let json = body_json(response).await;
    assert_eq!(json["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn created_video_is_readable_anonymously() {
    let app = common::build_test_app();
    let (token, _) = sign_up(app.clone(), "alice").await;
    let video_id = create_video(app.clone(), &token, "http://example.com/lecture.mp4").await;

    let response = get(app, &format!("/api/v1/videos/{video_id}")).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["data"]["id"], video_id.as_str());
    assert_eq!(json["data"]["title"], "Lecture");
    assert_eq!(json["data"]["all_urls"], json!(["http://example.com/lecture.mp4"]));
    assert!(json["data"]["team"].is_null());
    assert_eq!(json["data"]["languages"], json!([]));
}

#[tokio::test]
async fn invalid_url_is_rejected() {
    let app = common::build_test_app();
    let (token, _) = sign_up(app.clone(), "alice").await;

    let response = post_json_auth(app, "/api/v1/videos", json!({ "url": "not a url" }), &token).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert!(json["error"].as_str().unwrap().starts_with("invalid-url"));
}

#[tokio::test]
async fn same_url_cannot_make_two_videos() {
    let app = common::build_test_app();
    let (token, _) = sign_up(app.clone(), "alice").await;
    create_video(app.clone(), &token, "http://example.com/once.mp4").await;

    let response = post_json_auth(
        app,
        "/api/v1/videos",
        json!({ "url": "http://example.com/once.mp4" }),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert!(json["error"].as_str().unwrap().starts_with("video-exists"));
}

#[tokio::test]
async fn unknown_video_is_404() {
    let app = common::build_test_app();
    let response = get(app, "/api/v1/videos/doesnotexist").await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = body_json(response).await;
    assert_eq!(json["code"], "NOT_FOUND");
}

#[tokio::test]
async fn video_metadata_can_be_updated() {
    let app = common::build_test_app();
    let (token, _) = sign_up(app.clone(), "alice").await;
    let video_id = create_video(app.clone(), &token, "http://example.com/rename.mp4").await;

    let response = put_json_auth(
        app,
        &format!("/api/v1/videos/{video_id}"),
        json!({ "title": "Renamed" }),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["title"], "Renamed");
}

// ---------------------------------------------------------------------------
// URLs
// ---------------------------------------------------------------------------

#[tokio::test]
async fn primary_url_cannot_be_deleted() {
    let app = common::build_test_app();
    let (token, _) = sign_up(app.clone(), "alice").await;
    let video_id = create_video(app.clone(), &token, "http://example.com/main.mp4").await;

    let response = post_json_auth(
        app.clone(),
        &format!("/api/v1/videos/{video_id}/urls"),
        json!({ "url": "http://mirror.example.com/main.mp4" }),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let mirror = body_json(response).await;
    assert_eq!(mirror["data"]["primary"], false);
    let mirror_id = mirror["data"]["id"].as_i64().unwrap();

    let response = common::get(app.clone(), &format!("/api/v1/videos/{video_id}/urls")).await;
    let urls = body_json(response).await;
    let primary_id = urls["data"]
        .as_array()
        .unwrap()
        .iter()
        .find(|u| u["primary"] == true)
        .map(|u| u["id"].as_i64().unwrap())
        .unwrap();

    let response = delete_auth(
        app.clone(),
        &format!("/api/v1/videos/{video_id}/urls/{primary_id}"),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = delete_auth(
        app,
        &format!("/api/v1/videos/{video_id}/urls/{mirror_id}"),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn empty_url_fails_field_validation() {
    let app = common::build_test_app();
    let (token, _) = sign_up(app.clone(), "alice").await;
    let video_id = create_video(app.clone(), &token, "http://example.com/v.mp4").await;

    let response = post_json_auth(
        app,
        &format!("/api/v1/videos/{video_id}/urls"),
        json!({ "url": "" }),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["code"], "VALIDATION_ERROR");
}

// ---------------------------------------------------------------------------
// Languages
// ---------------------------------------------------------------------------

#[tokio::test]
async fn duplicate_language_is_rejected() {
    let app = common::build_test_app();
    let (token, _) = sign_up(app.clone(), "alice").await;
    let video_id = create_video(app.clone(), &token, "http://example.com/langs.mp4").await;
    let uri = format!("/api/v1/videos/{video_id}/languages");

    let response = post_json_auth(app.clone(), &uri, json!({ "language_code": "fr" }), &token).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    assert_eq!(json["data"]["language_code"], "fr");

    let response = post_json_auth(app.clone(), &uri, json!({ "language_code": "fr" }), &token).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["code"], "LANGUAGE_EXISTS");

    let response = get(app, &uri).await;
    let json = body_json(response).await;
    assert_eq!(json["data"].as_array().unwrap().len(), 1);
}
