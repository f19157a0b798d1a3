//! HTTP shell for the quaketiles view.
//!
//! Exposes the two control inputs (window selection, manual refresh) and
//! read-only views of the store to a browser-side map widget:
//! - Axum for the HTTP server
//! - SSE (Server-Sent Events) pushing the store status on every change
//! - JSON marker snapshots the map draws from

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{
        IntoResponse, Response,
        sse::{Event, KeepAlive, Sse},
    },
    routing::{get, post},
};
use serde::Serialize;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::WatchStream;

use crate::classify::Tier;
use crate::client::{FeedSource, TimeWindow};
use crate::controller::RefreshController;
use crate::render::{Marker, markers};
use crate::store::StoreStatus;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
    /// Periodic refresh of the selected window, if any.
    pub auto_refresh: Option<Duration>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            host: "127.0.0.1".to_string(),
            auto_refresh: None,
        }
    }
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    controller: RefreshController<dyn FeedSource>,
}

impl AppState {
    #[must_use]
    pub fn new(controller: RefreshController<dyn FeedSource>) -> Self {
        Self { controller }
    }
}

/// One legend row.
#[derive(Debug, Serialize)]
struct LegendEntry {
    tier: Tier,
    color: &'static str,
    label: &'static str,
}

/// Create the Axum router with all routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/markers", get(markers_handler))
        .route("/status", get(status_handler))
        .route("/legend", get(legend_handler))
        .route("/stream", get(sse_handler))
        .route("/window/{window}", post(window_handler))
        .route("/refresh", post(refresh_handler))
        .route("/health", get(health_handler))
        .with_state(state)
}

/// Start the web server.
///
/// # Errors
///
/// Returns an error if the listener cannot be bound or the server fails.
pub async fn run_server(
    config: ServerConfig,
    controller: RefreshController<dyn FeedSource>,
) -> anyhow::Result<()> {
    // Initial load of the selected window
    controller.start();

    let _auto_refresh = config
        .auto_refresh
        .map(|interval| controller.run_auto_refresh(interval));

    let app = create_router(AppState::new(controller));

    let addr = format!("{}:{}", config.host, config.port);
    tracing::info!("quaketiles listening at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ============================================================================
// Route Handlers
// ============================================================================

/// Current marker snapshot.
async fn markers_handler(State(state): State<AppState>) -> Json<Vec<Marker>> {
    let events = state.controller.store().current_events();
    Json(markers(&events))
}

async fn status_handler(State(state): State<AppState>) -> Json<StoreStatus> {
    Json(state.controller.store().status())
}

async fn legend_handler() -> Json<Vec<LegendEntry>> {
    Json(
        Tier::ALL
            .iter()
            .map(|&tier| LegendEntry {
                tier,
                color: tier.color(),
                label: tier.legend_label(),
            })
            .collect(),
    )
}

/// SSE stream of store status, one event per change.
async fn sse_handler(
    State(state): State<AppState>,
) -> Sse<impl tokio_stream::Stream<Item = Result<Event, Infallible>>> {
    let store = Arc::clone(state.controller.store());
    let stream = WatchStream::new(store.subscribe()).filter_map(move |_| {
        Event::default()
            .event("status")
            .json_data(store.status())
            .ok()
            .map(Ok)
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}

/// Window selection.
async fn window_handler(State(state): State<AppState>, Path(window): Path<String>) -> Response {
    let window: TimeWindow = match window.parse() {
        Ok(w) => w,
        Err(e) => return (StatusCode::BAD_REQUEST, e).into_response(),
    };

    if state.controller.on_window_change(window).is_none() {
        return (StatusCode::OK, Json(state.controller.store().status())).into_response();
    }
    (StatusCode::ACCEPTED, Json(state.controller.store().status())).into_response()
}

/// Manual refresh.
async fn refresh_handler(State(state): State<AppState>) -> impl IntoResponse {
    state.controller.on_manual_refresh();
    (StatusCode::ACCEPTED, Json(state.controller.store().status()))
}

/// Health check endpoint.
async fn health_handler() -> &'static str {
    "OK"
}
