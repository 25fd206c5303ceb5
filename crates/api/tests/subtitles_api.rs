//! HTTP-level integration tests for subtitle versions, write-locks, and
//! workflow actions on videos outside any team.

mod common;

use axum::http::StatusCode;
use common::{body_json, create_video, delete_auth, get, post_json_auth, sign_up};
use serde_json::json;

const SRT: &str = "1\n00:00:01,000 --> 00:00:02,500\nHello\n\n2\n00:00:03,000 --> 00:00:04,000\nWorld\n";

/// Post `srt` as a new version of `lc` and return the response body.
async fn post_srt(app: axum::Router, token: &str, video_id: &str, lc: &str, srt: &str) -> serde_json::Value {
    let response = post_json_auth(
        app,
        &format!("/api/v1/videos/{video_id}/languages/{lc}/subtitles"),
        json!({ "subtitles": srt, "sub_format": "srt" }),
        token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    body_json(response).await
}

// ---------------------------------------------------------------------------
// Versions
// ---------------------------------------------------------------------------

#[tokio::test]
async fn srt_upload_reads_back_as_native_json() {
    let app = common::build_test_app();
    let (token, user_id) = sign_up(app.clone(), "alice").await;
    let video_id = create_video(app.clone(), &token, "http://example.com/a.mp4").await;

    let created = post_srt(app.clone(), &token, &video_id, "en", SRT).await;
    assert_eq!(created["data"]["version_number"], 1);
    assert_eq!(created["data"]["sub_format"], "srt");
    assert_eq!(created["data"]["author_id"], user_id);
    assert_eq!(created["data"]["origin"], "api");

    let response = get(
        app,
        &format!("/api/v1/videos/{video_id}/languages/en/subtitles"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["sub_format"], "json");
    assert_eq!(json["data"]["subtitle_count"], 2);
    assert_eq!(json["data"]["subtitles"][0][0], 1000);
    assert_eq!(json["data"]["subtitles"][0][1], 2500);
    assert_eq!(json["data"]["subtitles"][0][2], "Hello");
    assert_eq!(json["data"]["subtitles"][1][2], "World");
}

#[tokio::test]
async fn native_item_list_is_accepted_without_a_format() {
    let app = common::build_test_app();
    let (token, _) = sign_up(app.clone(), "alice").await;
    let video_id = create_video(app.clone(), &token, "http://example.com/b.mp4").await;

    let response = post_json_auth(
        app,
        &format!("/api/v1/videos/{video_id}/languages/en/subtitles"),
        json!({
            "subtitles": [{ "start_ms": 0, "end_ms": 1000, "text": "Hi" }],
            "from_editor": true,
        }),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    assert_eq!(json["data"]["origin"], "editor");
    assert_eq!(json["data"]["subtitles"][0][2], "Hi");
}

#[tokio::test]
async fn unknown_format_is_rejected() {
    let app = common::build_test_app();
    let (token, _) = sign_up(app.clone(), "alice").await;
    let video_id = create_video(app.clone(), &token, "http://example.com/c.mp4").await;

    let response = post_json_auth(
        app,
        &format!("/api/v1/videos/{video_id}/languages/en/subtitles"),
        json!({ "subtitles": "whatever", "sub_format": "docx" }),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn version_list_is_newest_first_and_rollback_appends() {
    let app = common::build_test_app();
    let (token, _) = sign_up(app.clone(), "alice").await;
    let video_id = create_video(app.clone(), &token, "http://example.com/d.mp4").await;
    let base = format!("/api/v1/videos/{video_id}/languages/en/subtitles");

    post_srt(app.clone(), &token, &video_id, "en", SRT).await;
    post_srt(
        app.clone(),
        &token,
        &video_id,
        "en",
        "1\n00:00:01,000 --> 00:00:02,000\nOnly one\n",
    )
    .await;

    let response = get(app.clone(), &format!("{base}/versions")).await;
    let json = body_json(response).await;
    let numbers: Vec<i64> = json["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v["version_number"].as_i64().unwrap())
        .collect();
    assert_eq!(numbers, vec![2, 1]);
    assert!(json["data"][0]["subtitles"].is_null());

    let response = post_json_auth(
        app.clone(),
        &format!("{base}/rollback"),
        json!({ "version": 1 }),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    assert_eq!(json["data"]["version_number"], 3);
    assert_eq!(json["data"]["rollback_of_version_number"], 1);
    assert_eq!(json["data"]["subtitle_count"], 2);

    let response = get(app, &format!("{base}?version=2&sub_format=srt")).await;
    let json = body_json(response).await;
    assert!(json["data"]["subtitles"].as_str().unwrap().contains("Only one"));
}

#[tokio::test]
async fn rollback_to_unknown_version_is_rejected() {
    let app = common::build_test_app();
    let (token, _) = sign_up(app.clone(), "alice").await;
    let video_id = create_video(app.clone(), &token, "http://example.com/e.mp4").await;
    post_srt(app.clone(), &token, &video_id, "en", SRT).await;

    let response = post_json_auth(
        app,
        &format!("/api/v1/videos/{video_id}/languages/en/subtitles/rollback"),
        json!({ "version": 7 }),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["error"], "invalid version number: 7");
}

#[tokio::test]
async fn diff_reports_changed_lines() {
    let app = common::build_test_app();
    let (token, _) = sign_up(app.clone(), "alice").await;
    let video_id = create_video(app.clone(), &token, "http://example.com/f.mp4").await;
    post_srt(app.clone(), &token, &video_id, "en", SRT).await;
    post_srt(
        app.clone(),
        &token,
        &video_id,
        "en",
        "1\n00:00:01,000 --> 00:00:02,500\nHello\n\n2\n00:00:03,000 --> 00:00:04,000\nEveryone\n",
    )
    .await;

    let response = get(
        app,
        &format!("/api/v1/videos/{video_id}/languages/en/subtitles/diff?from=1&to=2"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["changes"].as_array().unwrap().len(), 2);
    assert!(json["data"]["text_changed"].as_f64().unwrap() > 0.0);
}

// ---------------------------------------------------------------------------
// Write-locks
// ---------------------------------------------------------------------------

#[tokio::test]
async fn writelock_blocks_other_editors_until_released() {
    let app = common::build_test_app();
    let (alice, _) = sign_up(app.clone(), "alice").await;
    let (bob, _) = sign_up(app.clone(), "bob").await;
    let video_id = create_video(app.clone(), &alice, "http://example.com/g.mp4").await;
    post_srt(app.clone(), &alice, &video_id, "en", SRT).await;
    let lock_uri = format!("/api/v1/videos/{video_id}/languages/en/writelock");

    let response = post_json_auth(app.clone(), &lock_uri, json!({}), &alice).await;
    assert_eq!(response.status(), StatusCode::OK);
    let grant = body_json(response).await;
    assert!(!grant["data"]["session_key"].as_str().unwrap().is_empty());

    // Bob cannot take the lock...
    let response = post_json_auth(app.clone(), &lock_uri, json!({}), &bob).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["code"], "WRITE_LOCKED");
    assert!(json["error"].as_str().unwrap().contains("alice"));

    // ...nor submit with a workflow action while Alice holds it.
    let response = post_json_auth(
        app.clone(),
        &format!("/api/v1/videos/{video_id}/languages/en/subtitles"),
        json!({ "subtitles": SRT, "sub_format": "srt", "action": "save-draft" }),
        &bob,
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["code"], "WRITE_LOCKED");

    let response = delete_auth(app.clone(), &lock_uri, &alice).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = post_json_auth(app, &lock_uri, json!({}), &bob).await;
    assert_eq!(response.status(), StatusCode::OK);
}

// ---------------------------------------------------------------------------
// Workflow actions
// ---------------------------------------------------------------------------

#[tokio::test]
async fn video_outside_a_team_offers_only_authoring_actions() {
    let app = common::build_test_app();
    let (token, _) = sign_up(app.clone(), "alice").await;
    let video_id = create_video(app.clone(), &token, "http://example.com/h.mp4").await;
    post_srt(app.clone(), &token, &video_id, "en", SRT).await;
    let actions = format!("/api/v1/videos/{video_id}/languages/en/subtitles/actions");

    let response = get(app.clone(), &actions).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"], json!(["save-draft", "complete"]));

    let response = post_json_auth(app.clone(), &actions, json!({ "action": "approve" }), &token).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["code"], "ACTION_ERROR");

    let response = post_json_auth(app, &actions, json!({ "action": "complete" }), &token).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["version_number"], 1);
}
