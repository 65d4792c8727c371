//! Inbound message relay.
//!
//! Every live inbound message is POSTed to the configured webhook once.
//! Delivery is at-most-once by design: no queue, no retry. A failed POST is
//! logged and the message dropped — WhatsApp offers no synchronous ack path
//! back to the automation system, so nothing downstream can observe the
//! difference anyway.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use warelay_provider::{InboundMessage, MessageClass};

use crate::config::WebhookConfig;

/// Payload shape the automation workflow expects. Field names are part of
/// the webhook contract; `messageId` stays camelCase.
#[derive(Debug, Serialize)]
pub struct WebhookPayload<'a> {
    pub from: &'a str,
    pub message: &'a str,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "messageId")]
    pub message_id: &'a str,
}

impl<'a> WebhookPayload<'a> {
    pub fn from_message(message: &'a InboundMessage) -> Self {
        Self {
            from: &message.from,
            message: &message.text,
            timestamp: message.timestamp,
            message_id: &message.id,
        }
    }
}

/// Whether an inbound message should be relayed at all: live (`notify`)
/// messages not authored by the bot's own account.
pub fn should_forward(message: &InboundMessage) -> bool {
    !message.from_me && message.class == MessageClass::Notify
}

/// One reqwest client, one webhook URL, bounded per-request timeout.
#[derive(Clone)]
pub struct RelayForwarder {
    client: reqwest::Client,
    url: String,
}

impl RelayForwarder {
    /// Fails when the HTTP client cannot be built (TLS backend
    /// initialization).
    pub fn new(config: &WebhookConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;
        Ok(Self {
            client,
            url: config.url.clone(),
        })
    }

    /// Forward a single message. Terminal either way; the caller should
    /// spawn this and move on.
    pub async fn forward(self, message: InboundMessage) {
        let payload = WebhookPayload::from_message(&message);
        match self.client.post(&self.url).json(&payload).send().await {
            Ok(response) if response.status().is_success() => {
                info!(from = %message.from, status = %response.status(), "relayed message to webhook");
            }
            Ok(response) => {
                warn!(
                    from = %message.from,
                    status = %response.status(),
                    "webhook rejected relayed message; dropping"
                );
            }
            Err(e) => {
                warn!(from = %message.from, error = %e, "webhook relay failed; dropping message");
            }
        }
    }
}
