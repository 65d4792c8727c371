//! External provider running as a subprocess.
//!
//! The sidecar (typically a thin Baileys wrapper) owns device linking,
//! session encryption and credential persistence. This side writes
//! [`ProviderCommand`] JSON lines to its stdin and reads [`ProviderEvent`]
//! JSON lines from its stdout. Connection and message events are forwarded
//! to the lifecycle controller's channel; `send_result` events are
//! correlated back to in-flight [`MessagingProvider::send`] calls by
//! request id.
//!
//! A sidecar that exits (crash or otherwise) surfaces as a synthesized
//! `close` event, which feeds the controller's normal reconnect path and
//! makes `connect()` respawn the process.

use std::process::Stdio;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::Utc;
use dashmap::DashMap;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, Command};
use tokio::sync::{Mutex, mpsc, oneshot};
use tracing::{debug, error, info, warn};

use warelay_provider::{
    CloseReason, MessagingProvider, ProviderCommand, ProviderError, ProviderEvent, SendReceipt,
};

use crate::config::ProviderConfig;

/// How long a send waits for the sidecar's `send_result` before giving up.
const SEND_TIMEOUT: Duration = Duration::from_secs(20);

type SendWaiter = oneshot::Sender<Result<Option<String>, ProviderError>>;

struct ChildHandle {
    child: Child,
    stdin: ChildStdin,
}

pub struct SubprocessProvider {
    config: ProviderConfig,
    events: mpsc::Sender<ProviderEvent>,
    child: Arc<Mutex<Option<ChildHandle>>>,
    pending: Arc<DashMap<String, SendWaiter>>,
    next_id: AtomicU64,
}

impl SubprocessProvider {
    pub fn new(config: ProviderConfig, events: mpsc::Sender<ProviderEvent>) -> Self {
        Self {
            config,
            events,
            child: Arc::new(Mutex::new(None)),
            pending: Arc::new(DashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Spawn the sidecar if it is not already running. Holds the child lock.
    async fn ensure_spawned(
        &self,
        handle: &mut Option<ChildHandle>,
    ) -> Result<(), ProviderError> {
        if let Some(existing) = handle {
            match existing.child.try_wait() {
                Ok(None) => return Ok(()),
                Ok(Some(status)) => {
                    warn!(%status, "provider sidecar had exited; respawning");
                    *handle = None;
                }
                Err(e) => {
                    warn!(error = %e, "could not poll provider sidecar; respawning");
                    *handle = None;
                }
            }
        }

        info!(command = %self.config.command, "spawning provider sidecar");
        let mut child = Command::new(&self.config.command)
            .args(&self.config.args)
            .env("WARELAY_SESSION_DIR", &self.config.session_dir)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ProviderError::Transport(format!("failed to spawn sidecar: {e}")))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| ProviderError::Transport("sidecar stdin unavailable".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ProviderError::Transport("sidecar stdout unavailable".to_string()))?;

        tokio::spawn(read_events(
            stdout,
            self.events.clone(),
            self.pending.clone(),
            self.child.clone(),
        ));

        *handle = Some(ChildHandle { child, stdin });
        Ok(())
    }

    async fn write_command(
        &self,
        handle: &mut Option<ChildHandle>,
        command: &ProviderCommand,
    ) -> Result<(), ProviderError> {
        let Some(child) = handle.as_mut() else {
            return Err(ProviderError::NotConnected);
        };
        let mut line = serde_json::to_vec(command)
            .map_err(|e| ProviderError::Transport(format!("command serialization: {e}")))?;
        line.push(b'\n');
        child
            .stdin
            .write_all(&line)
            .await
            .map_err(|e| ProviderError::Transport(format!("sidecar stdin write: {e}")))?;
        child
            .stdin
            .flush()
            .await
            .map_err(|e| ProviderError::Transport(format!("sidecar stdin flush: {e}")))?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl MessagingProvider for SubprocessProvider {
    async fn connect(&self) -> Result<(), ProviderError> {
        let mut handle = self.child.lock().await;
        self.ensure_spawned(&mut handle).await?;
        self.write_command(&mut handle, &ProviderCommand::Connect)
            .await
    }

    async fn send(&self, to: &str, text: &str) -> Result<SendReceipt, ProviderError> {
        let id = format!("req-{}", self.next_id.fetch_add(1, Ordering::Relaxed));
        let (tx, rx) = oneshot::channel();
        self.pending.insert(id.clone(), tx);

        let command = ProviderCommand::Send {
            id: id.clone(),
            to: to.to_string(),
            text: text.to_string(),
        };
        {
            let mut handle = self.child.lock().await;
            if let Err(e) = self.write_command(&mut handle, &command).await {
                self.pending.remove(&id);
                return Err(e);
            }
        }

        match tokio::time::timeout(SEND_TIMEOUT, rx).await {
            Ok(Ok(Ok(message_id))) => Ok(SendReceipt {
                message_id: message_id.unwrap_or(id),
                timestamp: Utc::now(),
            }),
            Ok(Ok(Err(e))) => Err(e),
            Ok(Err(_)) => Err(ProviderError::Closed),
            Err(_) => {
                self.pending.remove(&id);
                Err(ProviderError::Transport("send timed out".to_string()))
            }
        }
    }

    async fn disconnect(&self) -> Result<(), ProviderError> {
        let mut handle = self.child.lock().await;
        self.write_command(&mut handle, &ProviderCommand::Disconnect)
            .await
    }

    async fn logout(&self) -> Result<(), ProviderError> {
        let mut handle = self.child.lock().await;
        self.write_command(&mut handle, &ProviderCommand::Logout)
            .await
    }
}

/// Read JSON-line events from the sidecar until EOF. Send results are
/// routed to their waiters; everything else goes to the controller.
async fn read_events(
    stdout: tokio::process::ChildStdout,
    events: mpsc::Sender<ProviderEvent>,
    pending: Arc<DashMap<String, SendWaiter>>,
    child: Arc<Mutex<Option<ChildHandle>>>,
) {
    let mut lines = BufReader::new(stdout).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                match serde_json::from_str::<ProviderEvent>(line) {
                    Ok(ProviderEvent::SendResult {
                        id,
                        message_id,
                        error,
                        code,
                    }) => {
                        let Some((_, waiter)) = pending.remove(&id) else {
                            debug!(id = %id, "send result with no waiter");
                            continue;
                        };
                        let result = match error {
                            None => Ok(message_id),
                            Some(message) => {
                                Err(ProviderError::from_wire(code.as_deref(), message))
                            }
                        };
                        let _ = waiter.send(result);
                    }
                    Ok(event) => {
                        if events.send(event).await.is_err() {
                            debug!("event channel closed; stopping sidecar reader");
                            return;
                        }
                    }
                    Err(e) => {
                        warn!(error = %e, line, "unparseable event from sidecar");
                    }
                }
            }
            Ok(None) => break,
            Err(e) => {
                error!(error = %e, "error reading from sidecar");
                break;
            }
        }
    }

    // EOF: the sidecar is gone. Fail in-flight sends and surface a close
    // so the controller schedules a reconnect (which respawns the child).
    child.lock().await.take();
    // Dropping the waiters resolves in-flight sends as Closed.
    pending.clear();
    let _ = events
        .send(ProviderEvent::Close {
            reason: CloseReason {
                code: None,
                detail: Some("provider sidecar exited".to_string()),
            },
        })
        .await;
    info!("provider sidecar reader finished");
}
