//! Integration tests for the ort-server HTTP API
//!
//! Uses tower::ServiceExt::oneshot to test routes directly without binding a port.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use axum::body::Body;
use http_body_util::BodyExt;
use hyper::Request;
use ort_core::value::tree_from_json;
use ort_core::{EngineConfig, TelemetrySource, TelemetryTree};
use ort_server::{api::create_router, poller, state::AppState};
use serde_json::json;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tower::ServiceExt;

/// Source that serves whatever tree the test puts in it
struct ScriptedSource {
    tree: Mutex<Option<TelemetryTree>>,
    connected: bool,
    failing: bool,
}

impl ScriptedSource {
    fn with_tree(data: serde_json::Value) -> Self {
        Self {
            tree: Mutex::new(Some(tree_from_json(data).unwrap())),
            connected: true,
            failing: false,
        }
    }

    fn failing() -> Self {
        Self {
            tree: Mutex::new(None),
            connected: false,
            failing: true,
        }
    }

    fn set(&self, data: serde_json::Value) {
        *self.tree.lock().unwrap() = Some(tree_from_json(data).unwrap());
    }
}

#[async_trait]
impl TelemetrySource for ScriptedSource {
    fn name(&self) -> &str {
        "Scripted"
    }

    async fn fetch_tree(&self) -> Result<Option<TelemetryTree>> {
        if self.failing {
            return Err(anyhow!("connection refused"));
        }
        Ok(self.tree.lock().unwrap().clone())
    }

    async fn status(&self) -> Result<bool> {
        if self.failing {
            return Err(anyhow!("connection refused"));
        }
        Ok(self.connected)
    }
}

fn robot_data() -> serde_json::Value {
    json!({
        "Field": {
            ".type": "Field2d",
            "Robot": [3.0, 2.0, 0.5],
            "trajectory": [[1, 1], [2, 1.5], [3, 2]]
        },
        "Drive": {
            "speed": 2.5,
            "enabled": true,
            "FLModule": { "angle": 0.2 }
        },
        "PathPlanner": { "activePath": "Lap" },
        "matchTime": 93
    })
}

/// Helper: build a router with fresh AppState (demo source, nothing polled yet)
fn app() -> axum::Router {
    create_router(AppState::default())
}

/// Helper: build a router over a scripted source, with the state for further manipulation
fn app_with_source(source: ScriptedSource) -> (axum::Router, AppState, Arc<ScriptedSource>) {
    let source = Arc::new(source);
    let state = AppState::new(EngineConfig::default(), source.clone());
    let router = create_router(state.clone());
    (router, state, source)
}

/// Helper: router whose state has already ingested `robot_data()`
async fn polled_app() -> (axum::Router, AppState) {
    let (router, state, _) = app_with_source(ScriptedSource::with_tree(robot_data()));
    poller::poll_once(&state).await;
    poller::status_once(&state).await;
    (router, state)
}

/// Helper: collect response body into bytes
async fn body_bytes(body: Body) -> Vec<u8> {
    let collected = body.collect().await.unwrap();
    collected.to_bytes().to_vec()
}

/// Helper: collect response body into string
async fn body_string(body: Body) -> String {
    String::from_utf8(body_bytes(body).await).unwrap()
}

async fn get(app: &axum::Router, uri: &str) -> (u16, String) {
    let response = app
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status().as_u16();
    (status, body_string(response.into_body()).await)
}

async fn get_json(app: &axum::Router, uri: &str) -> serde_json::Value {
    let (status, body) = get(app, uri).await;
    assert_eq!(status, 200, "GET {} failed: {}", uri, body);
    serde_json::from_str(&body).unwrap()
}

// ==================== GET / ====================

#[tokio::test]
async fn test_get_root_returns_200_with_html() {
    let app = app();

    let response = app
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), 200);

    let content_type = response
        .headers()
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap();
    assert!(
        content_type.contains("text/html"),
        "Expected text/html content-type, got: {}",
        content_type
    );

    let body = body_string(response.into_body()).await;
    assert!(body.contains("<!DOCTYPE html>"));
    assert!(body.contains("Disconnected"));
}

#[tokio::test]
async fn test_root_renders_categories_and_field_svg() {
    let (app, _) = polled_app().await;
    let (status, body) = get(&app, "/").await;

    assert_eq!(status, 200);
    assert!(body.contains("<h2>Field</h2>"));
    assert!(body.contains("<h2>Drive</h2>"));
    assert!(body.contains("<svg"), "field card should embed an SVG map");
    assert!(!body.contains("PathPlanner"));
    assert!(!body.contains("FLModule"));
}

// ==================== GET /api/robot-data ====================

#[tokio::test]
async fn test_robot_data_empty_before_first_poll() {
    let parsed = get_json(&app(), "/api/robot-data").await;
    assert_eq!(parsed, json!({}));
}

#[tokio::test]
async fn test_robot_data_is_sanitized() {
    let (app, _) = polled_app().await;
    let parsed = get_json(&app, "/api/robot-data").await;

    assert_eq!(parsed["Drive"]["speed"], 2.5);
    assert_eq!(parsed["matchTime"], 93.0);
    assert!(parsed.get("PathPlanner").is_none());
    assert!(parsed["Drive"].get("FLModule").is_none());
}

// ==================== GET /api/status ====================

#[tokio::test]
async fn test_status_reports_connection_and_updates() {
    let (app, _) = polled_app().await;
    let parsed = get_json(&app, "/api/status").await;

    assert_eq!(parsed["connected"], true);
    assert_eq!(parsed["source"], "Scripted");
    assert_eq!(parsed["updates"], 1);
    assert!(parsed["last_update"].is_string());
}

#[tokio::test]
async fn test_unchanged_poll_is_not_an_update() {
    let (app, state) = polled_app().await;
    poller::poll_once(&state).await;
    poller::poll_once(&state).await;

    let parsed = get_json(&app, "/api/status").await;
    assert_eq!(parsed["updates"], 1);
}

#[tokio::test]
async fn test_transport_failure_keeps_last_tree() {
    let (app, state) = polled_app().await;

    // Swap in a failing source over the same engine
    let failing = AppState {
        source: Arc::new(ScriptedSource::failing()),
        ..state.clone()
    };
    poller::poll_once(&failing).await;

    let status = get_json(&app, "/api/status").await;
    assert_eq!(status["connected"], false);

    let data = get_json(&app, "/api/robot-data").await;
    assert_eq!(data["Drive"]["speed"], 2.5);
}

#[tokio::test]
async fn test_status_failure_marks_disconnected() {
    let (app, state, _) = app_with_source(ScriptedSource::failing());
    state.set_connected(true).await;
    poller::status_once(&state).await;

    let status = get_json(&app, "/api/status").await;
    assert_eq!(status["connected"], false);
}

// ==================== GET /api/dashboard ====================

#[tokio::test]
async fn test_dashboard_view_groups_widgets() {
    let (app, _) = polled_app().await;
    let parsed = get_json(&app, "/api/dashboard").await;

    let categories = parsed["categories"].as_array().unwrap();
    assert_eq!(categories.len(), 2);
    assert_eq!(categories[0]["name"], "Field");
    assert_eq!(categories[0]["kind"], "field");
    assert_eq!(categories[0]["scene"]["robots"].as_array().unwrap().len(), 1);

    assert_eq!(categories[1]["name"], "Drive");
    assert_eq!(categories[1]["kind"], "section");
    let section = &categories[1]["section"];
    assert_eq!(section["gauges"][0]["key"], "speed");
    assert_eq!(section["indicators"][0]["on"], true);

    assert_eq!(parsed["ungrouped"]["gauges"].as_array().unwrap().len(), 0);
    assert_eq!(parsed["ungrouped"]["rows"][0]["key"], "matchTime");
}

// ==================== GET /api/history ====================

#[tokio::test]
async fn test_history_for_numeric_path() {
    let (app, state, source) = app_with_source(ScriptedSource::with_tree(robot_data()));
    poller::poll_once(&state).await;
    let mut next = robot_data();
    next["Drive"]["speed"] = json!(3.0);
    source.set(next);
    poller::poll_once(&state).await;

    let parsed = get_json(&app, "/api/history?path=Drive.speed").await;
    assert_eq!(parsed["capacity"], 100);
    let values: Vec<f64> = parsed["points"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["value"].as_f64().unwrap())
        .collect();
    assert_eq!(values, vec![2.5, 3.0]);
}

#[tokio::test]
async fn test_history_unknown_path_returns_404() {
    let (app, _) = polled_app().await;
    let (status, _) = get(&app, "/api/history?path=Drive.enabled").await;
    assert_eq!(status, 404);
}

// ==================== GET /api/field/:category ====================

#[tokio::test]
async fn test_field_draw_list_sized_to_container() {
    let (app, _) = polled_app().await;
    let parsed = get_json(&app, "/api/field/Field?width=800&dpr=2").await;

    assert_eq!(parsed["category"], "Field");
    assert_eq!(parsed["size"]["width"], 800.0);
    assert_eq!(parsed["size"]["pixel_ratio"], 2.0);
    let height = parsed["size"]["height"].as_f64().unwrap();
    assert!((height - 800.0 * 8.001 / 16.5354).abs() < 1e-6);

    let commands = parsed["commands"]["commands"].as_array().unwrap();
    assert_eq!(commands[0]["op"], "begin_frame");
    let layers: Vec<&str> = commands
        .iter()
        .filter(|c| c["op"] == "begin_group")
        .map(|c| c["layer"].as_str().unwrap())
        .collect();
    assert_eq!(layers.last(), Some(&"robots"));
}

#[tokio::test]
async fn test_field_height_capped() {
    let (app, _) = polled_app().await;
    let parsed = get_json(&app, "/api/field/Field?width=4000").await;
    assert_eq!(parsed["size"]["height"], 600.0);
}

#[tokio::test]
async fn test_field_for_non_field_category_returns_404() {
    let (app, _) = polled_app().await;
    let (status, _) = get(&app, "/api/field/Drive").await;
    assert_eq!(status, 404);
    let (status, _) = get(&app, "/api/field/Missing").await;
    assert_eq!(status, 404);
}

#[tokio::test]
async fn test_field_svg() {
    let (app, _) = polled_app().await;
    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/field/Field/svg?width=640")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    let content_type = response.headers().get("content-type").unwrap().to_str().unwrap();
    assert_eq!(content_type, "image/svg+xml");

    let body = body_string(response.into_body()).await;
    assert!(body.starts_with("<svg"));
    assert!(body.ends_with("</svg>"));
}

// ==================== GET /api/stream ====================

#[tokio::test]
async fn test_stream_returns_sse_content_type() {
    let response = app()
        .oneshot(Request::builder().uri("/api/stream").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    let content_type = response.headers().get("content-type").unwrap().to_str().unwrap();
    assert!(
        content_type.contains("text/event-stream"),
        "SSE endpoint should return text/event-stream, got: {}",
        content_type
    );
}

#[tokio::test]
async fn test_stream_receives_accepted_update() {
    let (app, state, _) = app_with_source(ScriptedSource::with_tree(robot_data()));

    // Poll shortly after the stream connects
    let poll_state = state.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        poller::poll_once(&poll_state).await;
    });

    let response = app
        .oneshot(Request::builder().uri("/api/stream").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let body = response.into_body();
    let result = tokio::time::timeout(Duration::from_secs(3), async {
        let mut stream = body.into_data_stream();
        use futures::StreamExt;
        if let Some(Ok(chunk)) = stream.next().await {
            return Some(String::from_utf8(chunk.to_vec()).unwrap());
        }
        None
    })
    .await;

    let text = result
        .expect("Timed out waiting for SSE event")
        .expect("Stream ended without an event");
    assert!(text.contains("event: update"), "Unexpected SSE chunk: {}", text);
    assert!(text.contains("\"sequence\":1"));
    assert!(text.contains("\"speed\":2.5"));
}

// ==================== Poll loop ====================

#[tokio::test]
async fn test_poll_loop_runs_until_cancelled() {
    let (app, state, _) = app_with_source(ScriptedSource::with_tree(robot_data()));
    poller::spawn(state.clone(), Duration::from_millis(10), Duration::from_millis(10));

    tokio::time::sleep(Duration::from_millis(200)).await;
    state.shutdown.cancel();

    let status = get_json(&app, "/api/status").await;
    assert_eq!(status["connected"], true);
    assert_eq!(status["updates"], 1);
}
