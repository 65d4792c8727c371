//! Connection state types exposed to the rest of the service.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Process-wide connection state. Exactly one value is live at a time;
/// transitions happen only inside the lifecycle controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    WaitingForScan,
    Connected,
    Error,
    ShuttingDown,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::WaitingForScan => "waiting_for_scan",
            ConnectionState::Connected => "connected",
            ConnectionState::Error => "error",
            ConnectionState::ShuttingDown => "shutting_down",
        };
        f.write_str(s)
    }
}

/// The latest pairing challenge. At most one is live; a newer code
/// supersedes the old one, and connecting or disconnecting clears it.
#[derive(Debug, Clone, Serialize)]
pub struct PairingCode {
    pub code: String,
    pub issued_at: DateTime<Utc>,
}

impl PairingCode {
    pub fn new(code: String) -> Self {
        Self {
            code,
            issued_at: Utc::now(),
        }
    }
}

/// Read-only view of the controller's state, published after every
/// transition.
#[derive(Debug, Clone, Serialize)]
pub struct StatusSnapshot {
    pub state: ConnectionState,
    pub bot_jid: Option<String>,
    pub pairing_code: Option<PairingCode>,
    /// Set when the account was explicitly logged out; reconnection then
    /// requires operator action (re-pairing), not a retry.
    pub logged_out: bool,
}

impl StatusSnapshot {
    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }
}

impl Default for StatusSnapshot {
    fn default() -> Self {
        Self {
            state: ConnectionState::Disconnected,
            bot_jid: None,
            pairing_code: None,
            logged_out: false,
        }
    }
}
