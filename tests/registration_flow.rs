//! Integration tests for the registration REST surface.
//!
//! Each test builds the real router over an in-memory dashboard and drives
//! it with `tower::ServiceExt::oneshot`, exercising the HTTP contract pages
//! rely on.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use serde_json::{Value, json};
use tower::ServiceExt;

use registration_progress::error::SourceError;
use registration_progress::registration::{
    Dashboard, ProgressSource, ServerProgress, UserType, registration_routes,
};
use registration_progress::store::{LibSqlCache, LocalCache, MemoryCache};

/// Stub progress source returning a fixed answer.
enum StubSource {
    Progress(Option<ServerProgress>),
    Unauthorized,
}

#[async_trait]
impl ProgressSource for StubSource {
    async fn fetch(&self, _user_type: UserType) -> Result<Option<ServerProgress>, SourceError> {
        match self {
            Self::Progress(p) => Ok(p.clone()),
            Self::Unauthorized => Err(SourceError::AuthRequired),
        }
    }
}

async fn app_with(source: StubSource) -> Router {
    let durable: Arc<dyn LocalCache> = Arc::new(LibSqlCache::new_memory().await.unwrap());
    let session: Arc<dyn LocalCache> = Arc::new(MemoryCache::new());
    let dashboard = Dashboard::new(
        Arc::new(source),
        durable,
        session,
        Duration::from_millis(1000),
    );
    registration_routes(Arc::new(dashboard))
}

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    send(app, Method::GET, uri, None).await
}

async fn post(app: &Router, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    send(app, Method::POST, uri, body).await
}

#[tokio::test]
async fn unknown_user_type_is_bad_request() {
    let app = app_with(StubSource::Progress(None)).await;
    let (status, body) = post(&app, "/api/registration/courier/initialize", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("courier"));
}

#[tokio::test]
async fn operations_before_initialize_conflict() {
    let app = app_with(StubSource::Progress(None)).await;

    let (status, body) = get(&app, "/api/registration/state").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["snapshot"].is_null());
    assert_eq!(body["isLoading"], false);

    let (status, _) = post(&app, "/api/registration/stages/1", Some(json!({"name": "Jane"}))).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn driver_walks_through_stages() {
    let app = app_with(StubSource::Progress(None)).await;

    let (status, body) = post(&app, "/api/registration/driver/initialize", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["userType"], "driver");
    assert_eq!(body["snapshot"]["currentStage"], 1);
    assert_eq!(body["snapshot"]["totalStages"], 5);
    assert_eq!(body["snapshot"]["percentage"], 0);

    let (_, decision) = get(&app, "/api/registration/stages/3/authorize").await;
    assert_eq!(decision, json!({"decision": "redirect_to", "stage_id": 1}));

    let submitted = Some(json!({"name": "Jane"}));
    let (status, body) = post(&app, "/api/registration/stages/1", submitted).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["snapshot"]["currentStage"], 2);
    assert_eq!(body["snapshot"]["percentage"], 20);
    assert_eq!(body["snapshot"]["stages"]["1"]["completed"], true);
    assert_eq!(body["snapshot"]["userData"]["1"]["name"], "Jane");

    let (_, decision) = get(&app, "/api/registration/stages/2/authorize").await;
    assert_eq!(decision["decision"], "allow");

    let (status, body) = post(&app, "/api/registration/stages/1/goto", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["snapshot"]["currentStage"], 1);
    assert_eq!(body["snapshot"]["completedStages"], 1);
}

#[tokio::test]
async fn invalid_and_locked_stages_are_refused() {
    let app = app_with(StubSource::Progress(None)).await;
    post(&app, "/api/registration/restaurant/initialize", None).await;

    let (status, _) = post(&app, "/api/registration/stages/9", Some(json!({}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = post(&app, "/api/registration/stages/4", Some(json!({}))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body["error"].as_str().unwrap().contains("locked"));

    let (_, decision) = get(&app, "/api/registration/stages/9/authorize").await;
    assert_eq!(decision["decision"], "reject");
}

#[tokio::test]
async fn server_progress_is_resumed() {
    let app = app_with(StubSource::Progress(Some(ServerProgress {
        registration_stage: Some(3),
        ..Default::default()
    }))).await;

    let (_, body) = post(&app, "/api/registration/driver/initialize", None).await;
    assert_eq!(body["snapshot"]["currentStage"], 3);
    assert_eq!(body["snapshot"]["completedStages"], 2);
    assert_eq!(body["snapshot"]["percentage"], 40);
    assert_eq!(body["snapshot"]["stale"], false);
}

#[tokio::test]
async fn expired_session_is_unauthorized() {
    let app = app_with(StubSource::Unauthorized).await;
    let (status, body) = post(&app, "/api/registration/driver/initialize", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn draft_autosave_round_trip() {
    let app = app_with(StubSource::Progress(None)).await;
    post(&app, "/api/registration/driver/initialize", None).await;

    let (status, _) = get(&app, "/api/registration/stages/1/draft").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &app,
        Method::PUT,
        "/api/registration/stages/1/draft",
        Some(json!({"name": "Ja"})),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);

    tokio::time::sleep(Duration::from_millis(1200)).await;
    let (status, draft) = get(&app, "/api/registration/stages/1/draft").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(draft["stageId"], 1);
    assert_eq!(draft["data"]["name"], "Ja");

    post(&app, "/api/registration/stages/1", Some(json!({"name": "Jane"}))).await;
    let (status, _) = get(&app, "/api/registration/stages/1/draft").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn drafts_do_not_follow_a_user_type_switch() {
    let app = app_with(StubSource::Progress(None)).await;
    post(&app, "/api/registration/driver/initialize", None).await;

    let (status, _) = send(
        &app,
        Method::PUT,
        "/api/registration/stages/1/draft",
        Some(json!({"vehicle": "scooter"})),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    tokio::time::sleep(Duration::from_millis(1200)).await;
    let (status, _) = get(&app, "/api/registration/stages/1/draft").await;
    assert_eq!(status, StatusCode::OK);

    post(&app, "/api/registration/restaurant/initialize", None).await;
    let (status, _) = get(&app, "/api/registration/stages/1/draft").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
