//! HTTP rendering of monitor state
//!
//! [`HealthEndpoint`] is a listener that keeps the latest published state,
//! and [`health_routes`] serves it as JSON.

use crate::error::MonitorError;
use crate::listener::{MonitorEvent, MonitorListener};
use crate::monitor::MonitorState;
use crate::status::StatusLevel;
use arc_swap::ArcSwapOption;
use axum::{
    extract::{Path, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, error};

/// Maps a status to the HTTP status code of a health response.
pub type ResponseCoder = fn(StatusLevel) -> StatusCode;

/// `Good` is 200, `Warn` is 429, `Bad` is 500.
pub fn default_response_coder(status: StatusLevel) -> StatusCode {
    match status {
        StatusLevel::Good => StatusCode::OK,
        StatusLevel::Warn => StatusCode::TOO_MANY_REQUESTS,
        StatusLevel::Bad => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

#[derive(Clone)]
pub struct HealthEndpoint {
    state: Arc<ArcSwapOption<MonitorState>>,
    coder: ResponseCoder,
}

impl HealthEndpoint {
    pub fn new() -> Self {
        Self::with_coder(default_response_coder)
    }

    pub fn with_coder(coder: ResponseCoder) -> Self {
        Self {
            state: Arc::new(ArcSwapOption::empty()),
            coder,
        }
    }

    /// The last state received, if the endpoint is registered with a monitor.
    pub fn state(&self) -> Option<Arc<MonitorState>> {
        self.state.load_full()
    }

    pub fn routes(&self) -> Router {
        health_routes(self.clone())
    }
}

impl Default for HealthEndpoint {
    fn default() -> Self {
        Self::new()
    }
}

impl MonitorListener for HealthEndpoint {
    fn on_monitor_event(&self, event: &MonitorEvent<'_>) {
        self.state.store(Some(Arc::new(event.to_state())));
    }
}

impl std::fmt::Debug for HealthEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HealthEndpoint")
            .field("status", &self.state().map(|s| s.status))
            .finish()
    }
}

/// `GET /health` serves the whole state, `GET /health/:name` one subsystem.
pub fn health_routes(endpoint: HealthEndpoint) -> Router {
    Router::new()
        .route("/health", get(handle_health))
        .route("/health/:name", get(handle_subsystem))
        .with_state(endpoint)
}

async fn handle_health(State(endpoint): State<HealthEndpoint>) -> Response {
    let Some(state) = endpoint.state() else {
        return not_ready();
    };

    debug!(status = %state.status, "GET /health");
    render(&*state, (endpoint.coder)(state.status), state.last_update)
}

async fn handle_subsystem(
    State(endpoint): State<HealthEndpoint>,
    Path(name): Path<String>,
) -> Response {
    let Some(state) = endpoint.state() else {
        return not_ready();
    };

    match state.subsystem(&name) {
        Some(subsystem) => {
            debug!(subsystem = %name, status = %subsystem.status, "GET /health/:name");
            render(subsystem, (endpoint.coder)(subsystem.status), subsystem.last_update)
        }
        None => MonitorError::SubsystemNotFound(name).into_response(),
    }
}

fn render<T: Serialize>(body: &T, status: StatusCode, last_modified: DateTime<Utc>) -> Response {
    let body = match serde_json::to_vec(body) {
        Ok(body) => body,
        Err(e) => {
            error!("Failed to encode health state: {}", e);
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let mut response = (status, body).into_response();
    let headers = response.headers_mut();
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
    if let Ok(value) = HeaderValue::from_str(&http_date(last_modified)) {
        headers.insert(header::LAST_MODIFIED, value);
    }
    response
}

fn not_ready() -> Response {
    let status = StatusCode::SERVICE_UNAVAILABLE;
    let body = axum::Json(json!({
        "error": "No health state has been published",
        "status": status.as_u16(),
    }));
    (status, body).into_response()
}

fn http_date(ts: DateTime<Utc>) -> String {
    ts.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}
