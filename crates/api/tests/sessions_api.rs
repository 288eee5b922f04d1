//! Integration tests for the session endpoints.

mod common;

use std::sync::atomic::Ordering;
use std::time::Duration;

use axum::http::StatusCode;
use common::*;
use tryon_api::background::session_sweeper;
use tryon_client::messages::{ServiceError, StatusResponse, SubmitRequest};
use tryon_core::category::Category;
use tryon_core::polling::PollPolicy;

fn session_uri(id: &str, rest: &str) -> String {
    format!("/api/v1/sessions/{id}{rest}")
}

// ---------------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------------

#[tokio::test]
async fn create_session_returns_idle_view() {
    let app = build_test_app(FakeService::new(Vec::new()));

    let response = post(&app.router, "/api/v1/sessions").await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let json = body_json(response).await;
    let data = &json["data"];
    assert!(data["id"].is_string());
    assert_eq!(data["category"], "tops");
    assert_eq!(data["phase"]["state"], "idle");
    assert_eq!(data["loading"], false);
    assert!(data["result_url"].is_null());
    assert!(data["model"].is_null());
}

#[tokio::test]
async fn unknown_session_returns_404() {
    let app = build_test_app(FakeService::new(Vec::new()));

    let response = get(
        &app.router,
        "/api/v1/sessions/00000000-0000-0000-0000-000000000000",
    )
    .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["code"], "NOT_FOUND");
}

// ---------------------------------------------------------------------------
// Selection and category
// ---------------------------------------------------------------------------

#[tokio::test]
async fn selecting_an_image_exposes_its_preview() {
    let app = build_test_app(FakeService::new(Vec::new()));
    let id = create_session(&app.router).await;

    let response = put_file(
        &app.router,
        &session_uri(&id, "/images/model"),
        "model.png",
        "application/octet-stream",
        PNG,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    let model = &json["data"]["model"];
    assert_eq!(model["file_name"], "model.png");
    assert_eq!(model["content_type"], "image/png");
    assert_eq!(model["size"], PNG.len());

    let preview = get(&app.router, model["preview_url"].as_str().unwrap()).await;
    assert_eq!(preview.status(), StatusCode::OK);
    assert_eq!(preview.headers()["content-type"], "image/png");
    assert_eq!(body_bytes(preview).await, PNG);
}

#[tokio::test]
async fn reselecting_an_image_releases_the_old_preview() {
    let app = build_test_app(FakeService::new(Vec::new()));
    let id = create_session(&app.router).await;
    let uri = session_uri(&id, "/images/garment");

    let first = body_json(put_file(&app.router, &uri, "a.png", "image/png", PNG).await).await;
    let second = body_json(put_file(&app.router, &uri, "b.jpg", "image/jpeg", JPEG).await).await;

    let old_url = first["data"]["garment"]["preview_url"].as_str().unwrap();
    let new_url = second["data"]["garment"]["preview_url"].as_str().unwrap();
    assert_ne!(old_url, new_url);

    assert_eq!(get(&app.router, old_url).await.status(), StatusCode::NOT_FOUND);
    assert_eq!(get(&app.router, new_url).await.status(), StatusCode::OK);
    assert_eq!(app.state.previews.len(), 1);
}

#[tokio::test]
async fn non_image_upload_is_rejected() {
    let app = build_test_app(FakeService::new(Vec::new()));
    let id = create_session(&app.router).await;

    let response = put_file(
        &app.router,
        &session_uri(&id, "/images/model"),
        "notes.txt",
        "text/plain",
        b"definitely not an image",
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn unknown_image_role_is_rejected() {
    let app = build_test_app(FakeService::new(Vec::new()));
    let id = create_session(&app.router).await;

    let response = put_file(
        &app.router,
        &session_uri(&id, "/images/hat"),
        "hat.png",
        "image/png",
        PNG,
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn category_can_be_changed_and_is_validated() {
    let app = build_test_app(FakeService::new(Vec::new()));
    let id = create_session(&app.router).await;
    let uri = session_uri(&id, "/category");

    let response = put_json(&app.router, &uri, serde_json::json!({ "category": "one-pieces" })).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["category"], "one-pieces");

    let response = put_json(&app.router, &uri, serde_json::json!({ "category": "hats" })).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(
        json["error"],
        "Invalid category 'hats'. Must be one of: tops, bottoms, one-pieces"
    );
}

// ---------------------------------------------------------------------------
// Try-on attempts
// ---------------------------------------------------------------------------

#[tokio::test]
async fn try_on_without_garment_is_rejected_without_network_calls() {
    let app = build_test_app(FakeService::new(Vec::new()));
    let id = create_session(&app.router).await;
    put_file(
        &app.router,
        &session_uri(&id, "/images/model"),
        "model.png",
        "image/png",
        PNG,
    )
    .await;

    let response = post(&app.router, &session_uri(&id, "/try-on")).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["error"], "Please upload both images.");
    assert_eq!(json["code"], "VALIDATION_ERROR");

    assert_eq!(app.host.uploads.load(Ordering::SeqCst), 0);
    assert!(app.service.submitted().is_empty());

    let view = body_json(get(&app.router, &session_uri(&id, "")).await).await;
    assert_eq!(view["data"]["loading"], false);
}

#[tokio::test]
async fn successful_try_on_displays_first_output() {
    let app = build_test_app(FakeService::new(vec![
        status("in_queue"),
        completed("https://result/img.png"),
    ]));
    let id = create_session(&app.router).await;
    select_both(&app.router, &id).await;

    let response = post(&app.router, &session_uri(&id, "/try-on")).await;
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    assert_eq!(body_json(response).await["data"]["loading"], true);

    let view = wait_until_idle(&app.router, &id).await;
    assert_eq!(view["result_url"], "https://result/img.png");
    assert_eq!(view["phase"]["state"], "completed");
    assert!(view["error"].is_null());

    assert_eq!(
        app.service.submitted(),
        vec![SubmitRequest {
            model_image: MODEL_URL.into(),
            garment_image: GARMENT_URL.into(),
            category: Category::Tops,
        }]
    );
    assert_eq!(app.service.status_calls(), 2);
    assert_eq!(app.host.uploads.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn selected_category_is_submitted() {
    let app = build_test_app(FakeService::new(vec![completed("https://result/b.png")]));
    let id = create_session(&app.router).await;
    select_both(&app.router, &id).await;
    put_json(
        &app.router,
        &session_uri(&id, "/category"),
        serde_json::json!({ "category": "bottoms" }),
    )
    .await;

    post(&app.router, &session_uri(&id, "/try-on")).await;
    wait_until_idle(&app.router, &id).await;

    assert_eq!(app.service.submitted()[0].category, Category::Bottoms);
}

#[tokio::test]
async fn missing_job_id_surfaces_error_and_clears_loading() {
    let app = build_test_app(FakeService::without_job_id());
    let id = create_session(&app.router).await;
    select_both(&app.router, &id).await;

    post(&app.router, &session_uri(&id, "/try-on")).await;
    let view = wait_until_idle(&app.router, &id).await;

    assert_eq!(view["error"], "Failed to start the try-on process");
    assert!(view["result_url"].is_null());
    assert_eq!(view["phase"]["state"], "failed");
    assert_eq!(app.service.status_calls(), 0);
}

#[tokio::test]
async fn failed_job_is_surfaced_without_result() {
    let failed = StatusResponse {
        error: Some(ServiceError::Message("Pose not detected".into())),
        ..status("failed")
    };
    let app = build_test_app(FakeService::new(vec![status("processing"), failed]));
    let id = create_session(&app.router).await;
    select_both(&app.router, &id).await;

    post(&app.router, &session_uri(&id, "/try-on")).await;
    let view = wait_until_idle(&app.router, &id).await;

    assert_eq!(view["error"], "Prediction failed: Pose not detected");
    assert!(view["result_url"].is_null());
}

#[tokio::test]
async fn exhausted_polling_ends_the_attempt() {
    let app = build_test_app_with_policy(
        FakeService::new(Vec::new()),
        PollPolicy::fixed(Duration::from_millis(2), 3),
    );
    let id = create_session(&app.router).await;
    select_both(&app.router, &id).await;

    post(&app.router, &session_uri(&id, "/try-on")).await;
    let view = wait_until_idle(&app.router, &id).await;

    assert_eq!(view["error"], "Prediction still pending after 3 status checks");
    assert_eq!(app.service.status_calls(), 3);
}

#[tokio::test]
async fn second_try_on_while_loading_conflicts() {
    let app = build_test_app_with_policy(
        FakeService::new(Vec::new()),
        PollPolicy::fixed(Duration::from_millis(50), 1_000),
    );
    let id = create_session(&app.router).await;
    select_both(&app.router, &id).await;

    let first = post(&app.router, &session_uri(&id, "/try-on")).await;
    assert_eq!(first.status(), StatusCode::ACCEPTED);

    let second = post(&app.router, &session_uri(&id, "/try-on")).await;
    assert_eq!(second.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(second).await["code"], "CONFLICT");

    // Only the first attempt reached the service.
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(app.service.submitted().len() <= 1);

    delete(&app.router, &session_uri(&id, "")).await;
}

// ---------------------------------------------------------------------------
// Deletion
// ---------------------------------------------------------------------------

#[tokio::test]
async fn deleting_a_session_stops_polling_and_releases_previews() {
    let app = build_test_app_with_policy(
        FakeService::new(Vec::new()),
        PollPolicy::fixed(Duration::from_millis(10), 1_000),
    );
    let id = create_session(&app.router).await;
    select_both(&app.router, &id).await;
    assert_eq!(app.state.previews.len(), 2);

    post(&app.router, &session_uri(&id, "/try-on")).await;
    // Let a few status checks happen.
    tokio::time::sleep(Duration::from_millis(60)).await;

    let response = delete(&app.router, &session_uri(&id, "")).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(app.state.previews.is_empty());

    let calls_at_delete = app.service.status_calls();
    tokio::time::sleep(Duration::from_millis(60)).await;
    assert!(app.service.status_calls() <= calls_at_delete + 1);

    let response = get(&app.router, &session_uri(&id, "")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn deleting_unknown_session_returns_404() {
    let app = build_test_app(FakeService::new(Vec::new()));

    let response = delete(
        &app.router,
        "/api/v1/sessions/00000000-0000-0000-0000-000000000000",
    )
    .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ---------------------------------------------------------------------------
// Idle sweep
// ---------------------------------------------------------------------------

#[tokio::test]
async fn abandoned_sessions_are_swept_with_their_previews() {
    let app = build_test_app(FakeService::new(Vec::new()));
    for _ in 0..3 {
        let id = create_session(&app.router).await;
        select_both(&app.router, &id).await;
    }
    assert_eq!(app.state.sessions.len().await, 3);
    assert_eq!(app.state.previews.len(), 6);

    tokio::spawn(session_sweeper::run(
        app.state.sessions.clone(),
        Duration::from_millis(50),
        Duration::from_millis(10),
        app.state.cancel.clone(),
    ));
    tokio::time::sleep(Duration::from_millis(200)).await;

    assert!(app.state.sessions.is_empty().await);
    assert!(app.state.previews.is_empty());
    app.state.cancel.cancel();
}
