//! Provider protocol for Warelay.
//!
//! A *provider* is whatever actually speaks the WhatsApp multi-device
//! protocol — device linking, session encryption, message framing. Warelay
//! never reimplements any of that; it drives a provider through the
//! [`MessagingProvider`] trait and consumes the events the provider emits.
//!
//! Providers come in two flavors, both speaking the same protocol:
//!
//! - **In-process providers**: implement [`MessagingProvider`] directly and
//!   push [`ProviderEvent`]s into the channel they were given.
//! - **External providers**: subprocess sidecars exchanging
//!   [`ProviderCommand`] / [`ProviderEvent`] as JSON Lines over stdio.
//!
//! The serialized forms of [`ProviderCommand`] and [`ProviderEvent`] are the
//! wire format for external providers and are kept stable.

mod error;
mod types;

pub use error::{ProviderError, error_codes};
pub use types::{
    CloseReason, InboundMessage, MessageClass, ProviderCommand, ProviderEvent, SendReceipt,
    disconnect_codes,
};

use async_trait::async_trait;

/// Capability surface Warelay requires from a messaging provider.
///
/// Connection progress is not reported through return values: `connect`
/// initiates an attempt, and the provider reports what happened
/// (`Connecting`, `PairingCode`, `Open`, `Close`) through its event channel.
#[async_trait]
pub trait MessagingProvider: Send + Sync {
    /// Initiate a connection attempt. Idempotency across overlapping calls
    /// is the caller's concern; the provider may treat a redundant connect
    /// as a no-op or restart the attempt.
    async fn connect(&self) -> Result<(), ProviderError>;

    /// Send a text message to an already-normalized JID.
    async fn send(&self, to: &str, text: &str) -> Result<SendReceipt, ProviderError>;

    /// Drop the transport without invalidating credentials. Used to force a
    /// fresh pairing cycle; a `Close` event follows.
    async fn disconnect(&self) -> Result<(), ProviderError>;

    /// Invalidate the session with the remote end. After a logout the
    /// account must be re-paired before it can connect again.
    async fn logout(&self) -> Result<(), ProviderError>;
}
