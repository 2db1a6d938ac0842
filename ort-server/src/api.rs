//! REST API and SSE routes

use crate::html;
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        Html, IntoResponse,
    },
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use futures::stream::{Stream, StreamExt as FuturesStreamExt};
use ort_core::canvas::{CanvasSize, DrawList, SvgCanvas};
use ort_core::field::FieldView;
use ort_core::history::HistoryPoint;
use ort_core::tree::DashboardView;
use ort_core::value::tree_to_json;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::convert::Infallible;
use tokio_stream::wrappers::BroadcastStream;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;

/// Container width used when the client doesn't say
pub const DEFAULT_FIELD_WIDTH: f64 = 960.0;

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(dashboard_page))
        .route("/api/robot-data", get(robot_data))
        .route("/api/status", get(status))
        .route("/api/dashboard", get(dashboard))
        .route("/api/history", get(history))
        .route("/api/field/:category", get(field_draw_list))
        .route("/api/field/:category/svg", get(field_svg))
        .route("/api/stream", get(telemetry_stream))
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Lay out a copy of `view` for `width` and draw it as SVG
fn render_svg(view: &FieldView, width: f64) -> String {
    let mut view = view.clone();
    view.resize(width, 1.0);
    let mut canvas = SvgCanvas::new();
    view.redraw(&mut canvas);
    canvas.finish()
}

// === Dashboard Page ===

async fn dashboard_page(State(state): State<AppState>) -> Html<String> {
    let engine = state.engine.read().await;
    let view = engine.render();
    let field_svgs: HashMap<String, String> = engine
        .field_categories()
        .into_iter()
        .filter_map(|name| {
            let view = engine.field_view(name)?;
            Some((name.to_string(), render_svg(view, DEFAULT_FIELD_WIDTH)))
        })
        .collect();

    Html(html::render_page(
        &view,
        &field_svgs,
        engine.is_connected(),
        state.source.name(),
    ))
}

// === Telemetry Endpoints ===

async fn robot_data(State(state): State<AppState>) -> Json<serde_json::Value> {
    let engine = state.engine.read().await;
    Json(tree_to_json(engine.tree()))
}

#[derive(Serialize)]
struct StatusInfo {
    connected: bool,
    source: String,
    last_update: Option<DateTime<Utc>>,
    updates: u64,
}

async fn status(State(state): State<AppState>) -> Json<StatusInfo> {
    let engine = state.engine.read().await;
    Json(StatusInfo {
        connected: engine.is_connected(),
        source: state.source.name().to_string(),
        last_update: engine.last_update(),
        updates: engine.updates(),
    })
}

async fn dashboard(State(state): State<AppState>) -> Json<DashboardView> {
    let engine = state.engine.read().await;
    Json(engine.render())
}

#[derive(Deserialize)]
struct HistoryQuery {
    path: String,
}

#[derive(Serialize)]
struct HistoryResponse {
    path: String,
    capacity: usize,
    points: Vec<HistoryPoint>,
}

async fn history(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<HistoryResponse>, (StatusCode, String)> {
    let engine = state.engine.read().await;
    let series = engine.history().series(&query.path).ok_or((
        StatusCode::NOT_FOUND,
        format!("No history for '{}'", query.path),
    ))?;

    Ok(Json(HistoryResponse {
        capacity: engine.history().capacity(),
        points: series.iter().cloned().collect(),
        path: query.path,
    }))
}

// === Field Map Endpoints ===

#[derive(Deserialize)]
struct FieldQuery {
    width: Option<f64>,
    dpr: Option<f64>,
}

#[derive(Serialize)]
struct FieldDrawing {
    category: String,
    size: CanvasSize,
    commands: DrawList,
}

fn missing_field(category: &str) -> (StatusCode, String) {
    tracing::warn!(category, "field map requested for a category without a field");
    (
        StatusCode::NOT_FOUND,
        format!("No field map for category '{}'", category),
    )
}

/// Resize the category's view to the client's container and return the draw list
async fn field_draw_list(
    State(state): State<AppState>,
    Path(category): Path<String>,
    Query(query): Query<FieldQuery>,
) -> Result<Json<FieldDrawing>, (StatusCode, String)> {
    let mut engine = state.engine.write().await;
    let view = engine
        .field_view_mut(&category)
        .ok_or_else(|| missing_field(&category))?;

    let size = view.resize(
        query.width.unwrap_or(DEFAULT_FIELD_WIDTH),
        query.dpr.unwrap_or(1.0),
    );
    let mut commands = DrawList::new();
    view.redraw(&mut commands);

    Ok(Json(FieldDrawing {
        category,
        size,
        commands,
    }))
}

async fn field_svg(
    State(state): State<AppState>,
    Path(category): Path<String>,
    Query(query): Query<FieldQuery>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let engine = state.engine.read().await;
    let view = engine
        .field_view(&category)
        .ok_or_else(|| missing_field(&category))?;

    let svg = render_svg(view, query.width.unwrap_or(DEFAULT_FIELD_WIDTH));
    Ok(([(header::CONTENT_TYPE, "image/svg+xml")], svg))
}

// === Telemetry Stream Endpoint ===

async fn telemetry_stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.subscribe();

    let stream = BroadcastStream::new(rx).filter_map(|result| async move {
        match result {
            Ok(update) => match serde_json::to_string(&update) {
                Ok(json) => Some(Ok(Event::default().event("update").data(json))),
                Err(e) => {
                    tracing::error!("Failed to serialize update: {}", e);
                    None
                }
            },
            Err(e) => {
                tracing::warn!("Broadcast stream error: {}", e);
                None
            }
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}
