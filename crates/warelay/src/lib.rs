//! Warelay - bridges a WhatsApp account to an n8n automation workflow.
//!
//! Inbound chat messages are forwarded to a configured webhook; the
//! automation system replies through `POST /send-message`. The WhatsApp
//! protocol itself lives behind the [`warelay_provider::MessagingProvider`]
//! trait.

pub mod config;
pub mod dispatch;
pub mod handlers;
pub mod lifecycle;
pub mod provider;
pub mod relay;
pub mod response;
pub mod server;
