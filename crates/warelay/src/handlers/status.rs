//! Connection status endpoint.

use axum::Json;
use axum::extract::State;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::lifecycle::ConnectionState;
use crate::server::AppState;

#[derive(Serialize)]
pub struct StatusResponse {
    status: &'static str,
    whatsapp_connected: bool,
    connection_state: ConnectionState,
    bot_number: Option<String>,
    qr_available: bool,
    timestamp: DateTime<Utc>,
    /// Seconds since process start.
    uptime: u64,
}

/// GET /status — read-only snapshot of the lifecycle controller's state.
pub async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    let snapshot = state.lifecycle.snapshot();
    Json(StatusResponse {
        status: "running",
        whatsapp_connected: snapshot.is_connected(),
        connection_state: snapshot.state,
        bot_number: snapshot.bot_jid,
        qr_available: snapshot.pairing_code.is_some(),
        timestamp: Utc::now(),
        uptime: state.uptime_seconds(),
    })
}
