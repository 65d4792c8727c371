use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::http::StatusCode;
use axum::routing::{get, post};
use tower_http::timeout::TimeoutLayer;

use warelay_provider::MessagingProvider;

use crate::handlers;
use crate::lifecycle::LifecycleHandle;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub lifecycle: LifecycleHandle,
    pub provider: Arc<dyn MessagingProvider>,
    /// Substituted when outbound text trims to empty.
    pub default_message: String,
    pub started_at: std::time::Instant,
}

impl AppState {
    /// Seconds since the process started serving.
    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}

pub fn build_app(state: AppState, request_timeout_secs: u64) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/ping", get(handlers::ping))
        .route("/status", get(handlers::status))
        .route("/qr", get(handlers::qr_page))
        .route("/send-message", post(handlers::send_message))
        .with_state(state)
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(request_timeout_secs),
        ))
}
