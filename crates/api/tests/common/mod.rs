#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request};
use axum::response::Response;
use axum::Router;
use http_body_util::BodyExt;
use tower::ServiceExt;

use tryon_api::config::ServerConfig;
use tryon_api::router::build_app_router;
use tryon_api::sessions::run_event_listener;
use tryon_api::state::AppState;
use tryon_client::api::{TryOnApiError, TryOnService};
use tryon_client::messages::{StatusResponse, SubmitRequest};
use tryon_client::upload::{ImageHost, UploadApiError};
use tryon_client::workflow::TryOnWorkflow;
use tryon_core::job_status::JobStatus;
use tryon_core::polling::PollPolicy;
use tryon_core::selection::{ImageRole, SelectedImage};
use tryon_core::types::JobId;

pub const MODEL_URL: &str = "https://cdn.test/urlA";
pub const GARMENT_URL: &str = "https://cdn.test/urlB";

/// Minimal PNG header; enough for format sniffing.
pub const PNG: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 13];

/// Minimal JPEG header.
pub const JPEG: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0, 16, b'J', b'F', b'I', b'F'];

// ---------------------------------------------------------------------------
// Fake collaborators
// ---------------------------------------------------------------------------

/// Image host that returns a fixed URL per role.
#[derive(Default)]
pub struct FakeHost {
    pub uploads: AtomicU32,
}

#[async_trait]
impl ImageHost for FakeHost {
    async fn upload(&self, image: &SelectedImage) -> Result<String, UploadApiError> {
        self.uploads.fetch_add(1, Ordering::SeqCst);
        Ok(match image.role {
            ImageRole::Model => MODEL_URL.to_string(),
            ImageRole::Garment => GARMENT_URL.to_string(),
        })
    }
}

/// Try-on service driven by a scripted list of statuses.
///
/// Once the script runs out every status check reports `in_queue`.
pub struct FakeService {
    /// `None` makes submission succeed without a job id.
    pub job_id: Option<String>,
    pub statuses: Mutex<VecDeque<StatusResponse>>,
    pub submits: Mutex<Vec<SubmitRequest>>,
    pub status_calls: AtomicU32,
}

impl FakeService {
    pub fn new(statuses: Vec<StatusResponse>) -> Self {
        Self {
            job_id: Some("J1".to_string()),
            statuses: Mutex::new(statuses.into()),
            submits: Mutex::new(Vec::new()),
            status_calls: AtomicU32::new(0),
        }
    }

    pub fn without_job_id() -> Self {
        Self {
            job_id: None,
            ..Self::new(Vec::new())
        }
    }

    pub fn submitted(&self) -> Vec<SubmitRequest> {
        self.submits.lock().unwrap().clone()
    }

    pub fn status_calls(&self) -> u32 {
        self.status_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TryOnService for FakeService {
    async fn submit(&self, request: &SubmitRequest) -> Result<JobId, TryOnApiError> {
        self.submits.lock().unwrap().push(request.clone());
        self.job_id
            .clone()
            .map(JobId::new)
            .ok_or(TryOnApiError::MissingJobId)
    }

    async fn status(&self, _job_id: &JobId) -> Result<StatusResponse, TryOnApiError> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        let next = self.statuses.lock().unwrap().pop_front();
        Ok(next.unwrap_or_else(|| status("in_queue")))
    }
}

pub fn status(s: &str) -> StatusResponse {
    StatusResponse {
        id: Some("J1".into()),
        status: JobStatus::from(s),
        output: None,
        error: None,
    }
}

pub fn completed(url: &str) -> StatusResponse {
    StatusResponse {
        output: Some(vec![url.to_string()]),
        ..status("completed")
    }
}

// ---------------------------------------------------------------------------
// App construction
// ---------------------------------------------------------------------------

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        session_idle_ttl_secs: 1800,
    }
}

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub host: Arc<FakeHost>,
    pub service: Arc<FakeService>,
}

/// Build the full router over fake collaborators with a fast poll policy.
pub fn build_test_app(service: FakeService) -> TestApp {
    build_test_app_with_policy(service, PollPolicy::fixed(Duration::from_millis(5), 50))
}

pub fn build_test_app_with_policy(service: FakeService, policy: PollPolicy) -> TestApp {
    let config = test_config();
    let host = Arc::new(FakeHost::default());
    let service = Arc::new(service);
    let workflow = TryOnWorkflow::new(host.clone(), service.clone(), policy);
    let state = AppState::new(config.clone(), workflow);

    tokio::spawn(run_event_listener(
        state.sessions.clone(),
        state.workflow.subscribe(),
        state.cancel.clone(),
    ));

    TestApp {
        router: build_app_router(state.clone(), &config),
        state,
        host,
        service,
    }
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

pub async fn send(app: &Router, request: Request<Body>) -> Response {
    app.clone().oneshot(request).await.unwrap()
}

pub async fn get(app: &Router, uri: &str) -> Response {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    send(app, request).await
}

pub async fn post(app: &Router, uri: &str) -> Response {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

pub async fn delete(app: &Router, uri: &str) -> Response {
    let request = Request::builder()
        .method(Method::DELETE)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

pub async fn put_json(app: &Router, uri: &str, body: serde_json::Value) -> Response {
    let request = Request::builder()
        .method(Method::PUT)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

/// PUT a single `file` field as `multipart/form-data`.
pub async fn put_file(
    app: &Router,
    uri: &str,
    file_name: &str,
    content_type: &str,
    bytes: &[u8],
) -> Response {
    let boundary = "tryon-test-boundary";
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\n\
             Content-Type: {content_type}\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

    let request = Request::builder()
        .method(Method::PUT)
        .uri(uri)
        .header(
            "content-type",
            format!("multipart/form-data; boundary={boundary}"),
        )
        .body(Body::from(body))
        .unwrap();
    send(app, request).await
}

pub async fn body_bytes(response: Response) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .unwrap()
        .to_bytes()
        .to_vec()
}

pub async fn body_json(response: Response) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

// ---------------------------------------------------------------------------
// Session helpers
// ---------------------------------------------------------------------------

/// Create a session and return its id.
pub async fn create_session(app: &Router) -> String {
    let response = post(app, "/api/v1/sessions").await;
    body_json(response).await["data"]["id"]
        .as_str()
        .unwrap()
        .to_string()
}

/// Select both images for `session_id`.
pub async fn select_both(app: &Router, session_id: &str) {
    put_file(
        app,
        &format!("/api/v1/sessions/{session_id}/images/model"),
        "model.png",
        "image/png",
        PNG,
    )
    .await;
    put_file(
        app,
        &format!("/api/v1/sessions/{session_id}/images/garment"),
        "garment.jpg",
        "image/jpeg",
        JPEG,
    )
    .await;
}

/// Poll the session until its attempt has finished and return the view.
pub async fn wait_until_idle(app: &Router, session_id: &str) -> serde_json::Value {
    for _ in 0..500 {
        let view = body_json(get(app, &format!("/api/v1/sessions/{session_id}")).await).await;
        if view["data"]["loading"] == false {
            return view["data"].clone();
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("session {session_id} never finished its attempt");
}
