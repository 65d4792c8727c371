//! Liveness and info endpoints.

use axum::Json;
use axum::extract::State;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::server::AppState;

#[derive(Serialize)]
pub struct PingResponse {
    pong: bool,
    timestamp: DateTime<Utc>,
}

/// GET /ping
pub async fn ping() -> Json<PingResponse> {
    Json(PingResponse {
        pong: true,
        timestamp: Utc::now(),
    })
}

#[derive(Serialize)]
pub struct IndexResponse {
    message: &'static str,
    status: String,
    connected: bool,
    qr_available: bool,
    qr_endpoint: &'static str,
    send_endpoint: &'static str,
    timestamp: DateTime<Utc>,
}

/// GET /
pub async fn index(State(state): State<AppState>) -> Json<IndexResponse> {
    let snapshot = state.lifecycle.snapshot();
    Json(IndexResponse {
        message: "Warelay is running",
        status: snapshot.state.to_string(),
        connected: snapshot.is_connected(),
        qr_available: snapshot.pairing_code.is_some(),
        qr_endpoint: "/qr",
        send_endpoint: "/send-message",
        timestamp: Utc::now(),
    })
}
