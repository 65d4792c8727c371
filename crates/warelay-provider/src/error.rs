//! Provider error taxonomy.

use thiserror::Error;

/// Stable string codes for errors crossing the subprocess wire.
pub mod error_codes {
    pub const NOT_CONNECTED: &str = "not_connected";
    pub const DECODE_FAILED: &str = "decode_failed";
    pub const TRANSPORT: &str = "transport";
}

/// Errors a provider can surface to the core.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// No live session; the caller should have gated on connection state.
    #[error("provider is not connected")]
    NotConnected,

    /// The provider could not decode/resolve the target or payload. For
    /// sends this triggers the one-shot alternate-domain retry.
    #[error("provider decode error: {0}")]
    Decode(String),

    /// Network or protocol failure talking to the remote end.
    #[error("provider transport error: {0}")]
    Transport(String),

    /// The provider process or channel is gone.
    #[error("provider is closed")]
    Closed,
}

impl ProviderError {
    /// Reconstruct an error from its wire code, for subprocess providers.
    pub fn from_wire(code: Option<&str>, message: String) -> Self {
        match code {
            Some(error_codes::NOT_CONNECTED) => ProviderError::NotConnected,
            Some(error_codes::DECODE_FAILED) => ProviderError::Decode(message),
            _ => ProviderError::Transport(message),
        }
    }

    /// The wire code for this error.
    pub fn wire_code(&self) -> &'static str {
        match self {
            ProviderError::NotConnected => error_codes::NOT_CONNECTED,
            ProviderError::Decode(_) => error_codes::DECODE_FAILED,
            ProviderError::Transport(_) | ProviderError::Closed => error_codes::TRANSPORT,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_round_trips_through_wire_code() {
        let err = ProviderError::Decode("bad jid".to_string());
        let back = ProviderError::from_wire(Some(err.wire_code()), "bad jid".to_string());
        assert!(matches!(back, ProviderError::Decode(m) if m == "bad jid"));
    }

    #[test]
    fn unknown_wire_code_maps_to_transport() {
        let err = ProviderError::from_wire(Some("mystery"), "boom".to_string());
        assert!(matches!(err, ProviderError::Transport(m) if m == "boom"));
        let err = ProviderError::from_wire(None, "boom".to_string());
        assert!(matches!(err, ProviderError::Transport(_)));
    }
}
