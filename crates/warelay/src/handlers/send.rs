//! Outbound message dispatch handler.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use warelay_provider::ProviderError;

use crate::dispatch::{self, TARGET_ALIASES, TEXT_ALIASES};
use crate::response;
use crate::server::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Serialize)]
pub struct SendMessageResponse {
    status: &'static str,
    to: String,
    #[serde(rename = "messageLength")]
    message_length: usize,
    timestamp: DateTime<Utc>,
}

/// 400 body carrying enough diagnostics for the automation side to fix its
/// request without reading this source.
#[derive(Serialize)]
struct ValidationErrorBody {
    status: &'static str,
    message: String,
    accepted_fields: &'static [&'static str],
    received_fields: Vec<String>,
}

fn validation_error(
    message: String,
    accepted_fields: &'static [&'static str],
    received_fields: Vec<String>,
) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ValidationErrorBody {
            status: "error",
            message,
            accepted_fields,
            received_fields,
        }),
    )
        .into_response()
}

#[derive(Serialize)]
struct NotReadyBody {
    status: &'static str,
    message: &'static str,
    connection_state: crate::lifecycle::ConnectionState,
}

// ============================================================================
// Handler
// ============================================================================

/// POST /send-message
///
/// Accepts the target under any of `to`/`jid`/`phone` and the text under
/// any of `message`/`text`/`msg`, normalizes the target into `digits@domain`
/// form, and dispatches through the provider. Requires a live session.
pub async fn send_message(State(state): State<AppState>, Json(body): Json<Value>) -> Response {
    let Some(body) = body.as_object() else {
        return response::bad_request("request body must be a JSON object").into_response();
    };
    let received_fields = || body.keys().cloned().collect::<Vec<_>>();

    let raw_target = match dispatch::resolve_target(body) {
        Ok(target) => target,
        Err(e) => return validation_error(e.to_string(), &TARGET_ALIASES, received_fields()),
    };
    let target = match dispatch::normalize_jid(&raw_target) {
        Ok(jid) => jid,
        Err(e) => return validation_error(e.to_string(), &TARGET_ALIASES, received_fields()),
    };
    let text = match dispatch::resolve_text(body, &state.default_message) {
        Ok(text) => text,
        Err(e) => return validation_error(e.to_string(), &TEXT_ALIASES, received_fields()),
    };

    // Readiness gate. Read-once: a disconnect may still race the dispatch
    // below, in which case the provider call itself fails safely.
    let snapshot = state.lifecycle.snapshot();
    if !snapshot.is_connected() {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(NotReadyBody {
                status: "error",
                message: "WhatsApp not connected",
                connection_state: snapshot.state,
            }),
        )
            .into_response();
    }

    let delivered_to = match state.provider.send(&target, &text).await {
        Ok(_) => target,
        Err(ProviderError::Decode(detail)) => {
            // Some provider builds only accept the other domain convention.
            // One retry, then surface the original decode failure.
            let Some(alternate) = dispatch::alternate_domain(&target) else {
                return response::internal_error(format!("provider decode error: {detail}"))
                    .into_response();
            };
            warn!(target = %target, alternate = %alternate, "decode error; retrying with alternate domain");
            match state.provider.send(&alternate, &text).await {
                Ok(_) => alternate,
                Err(e) => return provider_error_response(e),
            }
        }
        Err(e) => return provider_error_response(e),
    };

    info!(to = %delivered_to, length = text.chars().count(), "outbound message dispatched");
    (
        StatusCode::OK,
        Json(SendMessageResponse {
            status: "success",
            to: delivered_to,
            message_length: text.chars().count(),
            timestamp: Utc::now(),
        }),
    )
        .into_response()
}

fn provider_error_response(error: ProviderError) -> Response {
    match error {
        ProviderError::NotConnected => {
            response::service_unavailable("WhatsApp not connected").into_response()
        }
        other => response::internal_error(other.to_string()).into_response(),
    }
}
