//! Integration tests for the API server.

use std::sync::Arc;
use std::sync::OnceLock;

use api::config::Config;
use api::routes::issues::AppState;
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use event_store::{
    EventEnvelope, EventStore, EventStoreError, ExpectedVersion, InMemoryEventStore, NewEvent,
    StreamName, Version,
};
use metrics_exporter_prometheus::PrometheusHandle;
use tower::ServiceExt;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn get_metrics_handle() -> PrometheusHandle {
    METRICS_HANDLE
        .get_or_init(|| {
            let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
            let handle = builder
                .install_recorder()
                .expect("failed to install Prometheus recorder");
            api::routes::metrics::describe();
            handle
        })
        .clone()
}

fn setup() -> axum::Router {
    setup_with_state().0
}

fn setup_with_state() -> (axum::Router, Arc<AppState<InMemoryEventStore>>) {
    let state = api::create_default_state(InMemoryEventStore::new(), &Config::default());
    let app = api::create_app(state.clone(), get_metrics_handle());
    (app, state)
}

fn post(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn send(app: &axum::Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if body.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&body).unwrap()
    };
    (status, json)
}

#[tokio::test]
async fn test_health_check() {
    let app = setup();

    let (status, json) = send(&app, get("/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let app = setup();
    send(&app, post("/issues/metrics-1/open", "")).await;

    let response = app.oneshot(get("/metrics")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(text.contains("commands_handled_total"));
}

#[tokio::test]
async fn test_open_issue() {
    let app = setup();

    let (status, json) = send(&app, post("/issues/1/open", "")).await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["issue_id"], "1");
    assert_eq!(json["state"], "Open");
    assert_eq!(json["version"], 0);
}

#[tokio::test]
async fn test_lifecycle_and_get() {
    let app = setup();

    send(&app, post("/issues/2/create", "")).await;
    let (status, json) = send(&app, post("/issues/2/start", "")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["state"], "InProgress");
    assert_eq!(json["version"], 1);

    let (status, json) = send(&app, get("/issues/2")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["state"], "InProgress");
    assert_eq!(json["version"], 1);
    assert_eq!(
        json["available_operations"],
        serde_json::json!(["stop", "resolve", "close"])
    );
}

#[tokio::test]
async fn test_get_nonexistent_issue() {
    let app = setup();

    let (status, json) = send(&app, get("/issues/nope")).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["kind"], "not_found");
}

#[tokio::test]
async fn test_invalid_transition() {
    let (app, state) = setup_with_state();

    send(&app, post("/issues/3/open", "")).await;
    send(&app, post("/issues/3/close", "")).await;
    let (status, json) = send(&app, post("/issues/3/start", "")).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json["kind"], "invalid_transition");
    assert_eq!(state.event_store.event_count().await, 2);
}

#[tokio::test]
async fn test_unknown_command() {
    let (app, state) = setup_with_state();

    let (status, json) = send(&app, post("/issues/4/archive", "")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["kind"], "unknown_command");
    assert_eq!(state.event_store.event_count().await, 0);
}

#[tokio::test]
async fn test_payload_is_recorded() {
    let app = setup();

    let (status, _) = send(
        &app,
        post("/issues/5/open", r#"{"title": "Crash on save"}"#),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, json) = send(&app, get("/issues/5/events")).await;

    assert_eq!(status, StatusCode::OK);
    let events = json.as_array().unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0]["event_type"], "IssueOpened");
    assert_eq!(events[0]["stream"], "Issue$5");
    assert_eq!(events[0]["version"], 0);
    assert_eq!(events[0]["payload"]["data"]["payload"]["title"], "Crash on save");
}

#[tokio::test]
async fn test_non_object_payload_is_rejected() {
    let (app, state) = setup_with_state();

    let (status, json) = send(&app, post("/issues/6/open", "[1, 2, 3]")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["kind"], "bad_request");
    assert_eq!(state.event_store.event_count().await, 0);
}

#[tokio::test]
async fn test_events_of_unknown_issue_is_empty() {
    let app = setup();

    let (status, json) = send(&app, get("/issues/7/events")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, serde_json::json!([]));
}

#[tokio::test]
async fn test_corrupt_history() {
    let (app, state) = setup_with_state();
    let stream = StreamName::from_raw("Issue$8");
    state
        .event_store
        .append(
            &stream,
            vec![
                NewEvent::builder()
                    .event_type("IssueArchived")
                    .payload_raw(serde_json::json!({"type": "IssueArchived"}))
                    .build(),
            ],
            ExpectedVersion::NoStream,
        )
        .await
        .unwrap();

    let (status, json) = send(&app, post("/issues/8/close", "")).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["kind"], "corrupt_history");
}

/// Store whose backend is down.
#[derive(Clone)]
struct UnavailableStore;

#[async_trait]
impl EventStore for UnavailableStore {
    async fn read_stream(&self, _stream: &StreamName) -> event_store::Result<Vec<EventEnvelope>> {
        Err(EventStoreError::Unavailable("connection refused".to_string()))
    }

    async fn append(
        &self,
        _stream: &StreamName,
        _events: Vec<NewEvent>,
        _expected: ExpectedVersion,
    ) -> event_store::Result<Version> {
        Err(EventStoreError::Unavailable("connection refused".to_string()))
    }

    async fn stream_version(&self, _stream: &StreamName) -> event_store::Result<Option<Version>> {
        Err(EventStoreError::Unavailable("connection refused".to_string()))
    }
}

#[tokio::test]
async fn test_log_unavailable() {
    let state = api::create_default_state(UnavailableStore, &Config::default());
    let app = api::create_app(state, get_metrics_handle());

    let (status, json) = send(&app, post("/issues/9/open", "")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json["kind"], "log_unavailable");

    let (status, _) = send(&app, get("/issues/9/events")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}
