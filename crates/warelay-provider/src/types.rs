//! Event, command and message types shared by all providers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Well-known disconnect status codes, as reported by the WhatsApp
/// multi-device servers. Providers map their library's close reason onto
/// these where possible; anything else travels as an opaque code.
pub mod disconnect_codes {
    /// The account was unlinked from the phone. Terminal: re-pairing is
    /// required before the session can be used again.
    pub const LOGGED_OUT: u16 = 401;
    /// Server-side unavailability; safe to reconnect.
    pub const SERVICE_UNAVAILABLE: u16 = 503;
    /// Stream error after pairing; the server expects a fresh connect.
    pub const RESTART_REQUIRED: u16 = 515;
}

/// Why a connection closed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloseReason {
    /// Status code, when the provider could extract one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<u16>,
    /// Human-readable detail for the logs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl CloseReason {
    /// A close that invalidated the session. The lifecycle controller
    /// treats this as terminal (no automatic reconnect).
    pub fn is_logged_out(&self) -> bool {
        self.code == Some(disconnect_codes::LOGGED_OUT)
    }
}

impl std::fmt::Display for CloseReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (&self.code, &self.detail) {
            (Some(code), Some(detail)) => write!(f, "{code}: {detail}"),
            (Some(code), None) => write!(f, "code {code}"),
            (None, Some(detail)) => write!(f, "{detail}"),
            (None, None) => write!(f, "unknown"),
        }
    }
}

/// Delivery class of an inbound event, mirroring the provider's notion of
/// live messages versus history backfill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageClass {
    /// A live message that should be relayed.
    Notify,
    /// History sync / backfill; ignored by the relay.
    Append,
    /// Anything else the provider surfaces (receipts, protocol messages).
    Other,
}

/// An inbound chat message, immutable once constructed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundMessage {
    /// JID of the originating chat.
    pub from: String,
    /// Extracted text content; empty when the message carried none.
    pub text: String,
    /// Provider-assigned message id.
    pub id: String,
    /// When the provider surfaced the message.
    pub timestamp: DateTime<Utc>,
    /// True when the message was authored by the bot's own account.
    #[serde(default)]
    pub from_me: bool,
    /// Delivery class; only `notify` messages are relayed.
    pub class: MessageClass,
}

/// Acknowledgement returned by a successful send.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendReceipt {
    pub message_id: String,
    pub timestamp: DateTime<Utc>,
}

/// Events a provider emits toward the core.
///
/// This is the single-consumer queue the lifecycle controller drains, and
/// the stdout wire format of external providers (one JSON object per line).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProviderEvent {
    /// A connection attempt is underway.
    Connecting,
    /// A pairing challenge to display; supersedes any earlier one.
    PairingCode { code: String },
    /// The session is open. `jid` is the bot's own address.
    Open { jid: String },
    /// The connection closed.
    Close { reason: CloseReason },
    /// An inbound chat message.
    Message { message: InboundMessage },
    /// Reply to a `Send` command (external providers only); correlated by
    /// `id`. `error`/`code` are set on failure, `code` being one of
    /// [`error_codes`](crate::error_codes).
    SendResult {
        id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message_id: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        code: Option<String>,
    },
}

/// Commands the core writes toward an external provider's stdin.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProviderCommand {
    Connect,
    Send { id: String, to: String, text: String },
    Disconnect,
    Logout,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_wire_tags() {
        assert_eq!(
            serde_json::to_string(&ProviderEvent::Connecting).unwrap(),
            r#"{"type":"connecting"}"#
        );
        assert_eq!(
            serde_json::to_string(&ProviderEvent::PairingCode {
                code: "2@abc".to_string()
            })
            .unwrap(),
            r#"{"type":"pairing_code","code":"2@abc"}"#
        );
        assert_eq!(
            serde_json::to_string(&ProviderEvent::Open {
                jid: "628123@s.whatsapp.net".to_string()
            })
            .unwrap(),
            r#"{"type":"open","jid":"628123@s.whatsapp.net"}"#
        );
    }

    #[test]
    fn close_event_parses_without_optional_fields() {
        let event: ProviderEvent = serde_json::from_str(r#"{"type":"close","reason":{}}"#).unwrap();
        let ProviderEvent::Close { reason } = event else {
            panic!("expected close event");
        };
        assert_eq!(reason.code, None);
        assert!(!reason.is_logged_out());
    }

    #[test]
    fn logged_out_close_reason() {
        let reason = CloseReason {
            code: Some(disconnect_codes::LOGGED_OUT),
            detail: Some("device_removed".to_string()),
        };
        assert!(reason.is_logged_out());
        assert_eq!(reason.to_string(), "401: device_removed");

        let restart = CloseReason {
            code: Some(disconnect_codes::RESTART_REQUIRED),
            detail: None,
        };
        assert!(!restart.is_logged_out());
    }

    #[test]
    fn send_command_wire_shape() {
        let cmd = ProviderCommand::Send {
            id: "req-1".to_string(),
            to: "628123@s.whatsapp.net".to_string(),
            text: "hi".to_string(),
        };
        assert_eq!(
            serde_json::to_string(&cmd).unwrap(),
            r#"{"type":"send","id":"req-1","to":"628123@s.whatsapp.net","text":"hi"}"#
        );
    }

    #[test]
    fn inbound_message_defaults_from_me() {
        let message: InboundMessage = serde_json::from_str(
            r#"{"from":"628123@s.whatsapp.net","text":"hello","id":"ABC",
                "timestamp":"2026-01-01T00:00:00Z","class":"notify"}"#,
        )
        .unwrap();
        assert!(!message.from_me);
        assert_eq!(message.class, MessageClass::Notify);
    }
}
