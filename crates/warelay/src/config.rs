use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tokio::fs;

use serde::Deserialize;
use thiserror::Error;

// ============================================================================
// Config (root)
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub webhook: WebhookConfig,
    #[serde(default)]
    pub lifecycle: LifecycleConfig,
    #[serde(default)]
    pub dispatch: DispatchConfig,
    #[serde(default)]
    pub provider: ProviderConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            webhook: WebhookConfig::default(),
            lifecycle: LifecycleConfig::default(),
            dispatch: DispatchConfig::default(),
            provider: ProviderConfig::default(),
        }
    }
}

impl Config {
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = match fs::read_to_string(path).await {
            Ok(c) => c,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(ConfigError::Io(e)),
        };
        Ok(serde_saphyr::from_str(&contents)?)
    }

    /// Apply environment overrides on top of whatever the file provided.
    /// `N8N_WEBHOOK_URL` and `PORT` win over the file, matching how the
    /// service has always been deployed.
    pub fn apply_env(&mut self) {
        if let Ok(url) = std::env::var("N8N_WEBHOOK_URL")
            && !url.is_empty()
        {
            self.webhook.url = url;
        }
        if let Ok(port) = std::env::var("PORT")
            && let Ok(port) = port.parse()
        {
            self.server.port = port;
        }
    }
}

// ============================================================================
// ServerConfig
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout_seconds: default_request_timeout(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_request_timeout() -> u64 {
    30
}

// ============================================================================
// WebhookConfig
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookConfig {
    /// Where inbound messages are relayed to.
    #[serde(default = "default_webhook_url")]
    pub url: String,
    /// Bound on each relay POST. Delivery is at-most-once: on timeout the
    /// message is dropped, not queued.
    #[serde(default = "default_webhook_timeout")]
    pub timeout_seconds: u64,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            url: default_webhook_url(),
            timeout_seconds: default_webhook_timeout(),
        }
    }
}

fn default_webhook_url() -> String {
    "https://your-n8n-webhook-url.com/webhook/whatsapp-task".to_string()
}

fn default_webhook_timeout() -> u64 {
    5
}

// ============================================================================
// LifecycleConfig
// ============================================================================

/// Reconnect/backoff policy. Delays are fixed, not exponential; explicit
/// logout is terminal and never retried.
#[derive(Debug, Clone, Deserialize)]
pub struct LifecycleConfig {
    /// Delay before reconnecting after a non-logout close.
    #[serde(default = "default_reconnect_delay")]
    pub reconnect_delay_seconds: u64,
    /// Delay before retrying after `connect()` itself failed.
    #[serde(default = "default_connect_retry_delay")]
    pub connect_retry_delay_seconds: u64,
    /// How long a pairing code may sit unscanned before the controller
    /// forces a fresh connect cycle (and with it a fresh code).
    #[serde(default = "default_pairing_expiry")]
    pub pairing_expiry_seconds: u64,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            reconnect_delay_seconds: default_reconnect_delay(),
            connect_retry_delay_seconds: default_connect_retry_delay(),
            pairing_expiry_seconds: default_pairing_expiry(),
        }
    }
}

fn default_reconnect_delay() -> u64 {
    5
}

fn default_connect_retry_delay() -> u64 {
    15
}

fn default_pairing_expiry() -> u64 {
    60
}

// ============================================================================
// DispatchConfig
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct DispatchConfig {
    /// Substituted when the resolved outbound text trims to empty.
    #[serde(default = "default_message")]
    pub default_message: String,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            default_message: default_message(),
        }
    }
}

fn default_message() -> String {
    "Task completed.".to_string()
}

// ============================================================================
// ProviderConfig
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
    /// Sidecar command speaking the provider protocol over stdio.
    #[serde(default = "default_provider_command")]
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    /// Where the sidecar persists session credentials. The format is the
    /// sidecar's own; this service never reads it.
    #[serde(default = "default_session_dir")]
    pub session_dir: PathBuf,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            command: default_provider_command(),
            args: Vec::new(),
            session_dir: default_session_dir(),
        }
    }
}

fn default_provider_command() -> String {
    "warelay-baileys".to_string()
}

fn default_session_dir() -> PathBuf {
    PathBuf::from("auth_info_baileys")
}

// ============================================================================
// ConfigError
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config file: {0}")]
    Yaml(#[from] serde_saphyr::Error),
}
