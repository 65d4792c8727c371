//! The lifecycle controller: a single task owning connection state, the
//! pairing code, and the one pending reconnect/retry/expiry timer.

use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::time::{Instant, Sleep, sleep};
use tracing::{debug, error, info, warn};

use warelay_provider::{MessagingProvider, ProviderEvent};

use crate::config::LifecycleConfig;
use crate::relay::RelayForwarder;

use super::state::{ConnectionState, PairingCode, StatusSnapshot};

// ============================================================================
// Policy
// ============================================================================

/// Fixed-delay reconnect policy. Deliberately not exponential: the provider
/// side rate-limits pairing on its own, and a flat delay keeps recovery
/// time predictable for operators watching the logs.
#[derive(Debug, Clone, Copy)]
pub struct LifecyclePolicy {
    pub reconnect_delay: Duration,
    pub connect_retry_delay: Duration,
    pub pairing_expiry: Duration,
}

impl From<&LifecycleConfig> for LifecyclePolicy {
    fn from(config: &LifecycleConfig) -> Self {
        Self {
            reconnect_delay: Duration::from_secs(config.reconnect_delay_seconds),
            connect_retry_delay: Duration::from_secs(config.connect_retry_delay_seconds),
            pairing_expiry: Duration::from_secs(config.pairing_expiry_seconds),
        }
    }
}

// ============================================================================
// Machine (pure transitions)
// ============================================================================

/// What a pending timer will do when it fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TimerKind {
    /// Reconnect after a non-logout close.
    Reconnect,
    /// Retry after `connect()` itself failed.
    ConnectRetry,
    /// Pairing code sat unscanned too long; force a fresh connect cycle.
    PairingExpiry,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct PendingTimer {
    pub kind: TimerKind,
    pub delay: Duration,
    /// Monotonic arming sequence so the runner knows when to re-arm its
    /// sleep. Bumped every time a timer is (re)scheduled.
    pub seq: u64,
}

/// Pure transition core, separated from the async runner so the reconnect
/// policy is testable without a clock. Holding the pending timer in an
/// `Option` is what makes "at most one outstanding timer" structural:
/// scheduling replaces, it can never accumulate.
pub(crate) struct Machine {
    state: ConnectionState,
    pairing: Option<PairingCode>,
    bot_jid: Option<String>,
    logged_out: bool,
    pending: Option<PendingTimer>,
    next_seq: u64,
    policy: LifecyclePolicy,
}

impl Machine {
    pub(crate) fn new(policy: LifecyclePolicy) -> Self {
        Self {
            state: ConnectionState::Disconnected,
            pairing: None,
            bot_jid: None,
            logged_out: false,
            pending: None,
            next_seq: 0,
            policy,
        }
    }

    pub(crate) fn state(&self) -> ConnectionState {
        self.state
    }

    pub(crate) fn pending(&self) -> Option<&PendingTimer> {
        self.pending.as_ref()
    }

    pub(crate) fn snapshot(&self) -> StatusSnapshot {
        StatusSnapshot {
            state: self.state,
            bot_jid: self.bot_jid.clone(),
            pairing_code: self.pairing.clone(),
            logged_out: self.logged_out,
        }
    }

    fn schedule(&mut self, kind: TimerKind) {
        let delay = match kind {
            TimerKind::Reconnect => self.policy.reconnect_delay,
            TimerKind::ConnectRetry => self.policy.connect_retry_delay,
            TimerKind::PairingExpiry => self.policy.pairing_expiry,
        };
        self.next_seq += 1;
        self.pending = Some(PendingTimer {
            kind,
            delay,
            seq: self.next_seq,
        });
    }

    /// Begin a connect attempt. Returns false when the call is a redundant
    /// no-op: an attempt is already in flight, we are shutting down, or the
    /// account was logged out and needs a manual re-pair first.
    pub(crate) fn request_connect(&mut self) -> bool {
        if self.logged_out {
            return false;
        }
        match self.state {
            ConnectionState::Connecting
            | ConnectionState::WaitingForScan
            | ConnectionState::ShuttingDown => false,
            _ => {
                self.state = ConnectionState::Connecting;
                self.pending = None;
                true
            }
        }
    }

    /// The connect attempt itself blew up before the provider could report
    /// anything. Retry later, with the longer delay.
    pub(crate) fn on_connect_error(&mut self) {
        if self.state == ConnectionState::ShuttingDown {
            return;
        }
        self.state = ConnectionState::Error;
        self.pairing = None;
        self.schedule(TimerKind::ConnectRetry);
    }

    /// Apply a provider connection event. Message/send events are routed
    /// elsewhere; passing them here is a no-op.
    pub(crate) fn on_provider_event(&mut self, event: &ProviderEvent) {
        if self.state == ConnectionState::ShuttingDown {
            return;
        }
        match event {
            ProviderEvent::Connecting => {
                self.state = ConnectionState::Connecting;
                // A fresh attempt invalidates any displayed code and its
                // expiry timer.
                self.pairing = None;
                self.pending = None;
            }
            ProviderEvent::PairingCode { code } => {
                self.state = ConnectionState::WaitingForScan;
                // Newer code supersedes; so does its expiry timer.
                self.pairing = Some(PairingCode::new(code.clone()));
                self.schedule(TimerKind::PairingExpiry);
            }
            ProviderEvent::Open { jid } => {
                self.state = ConnectionState::Connected;
                self.bot_jid = Some(jid.clone());
                self.pairing = None;
                self.pending = None;
                self.logged_out = false;
            }
            ProviderEvent::Close { reason } => {
                self.state = ConnectionState::Disconnected;
                self.pairing = None;
                self.pending = None;
                if reason.is_logged_out() {
                    // Terminal: the account must be re-paired.
                    self.logged_out = true;
                } else if !self.logged_out {
                    // A logged-out session stays down even when the sidecar
                    // later reports an ordinary close (e.g. process exit).
                    self.schedule(TimerKind::Reconnect);
                }
            }
            ProviderEvent::Message { .. } | ProviderEvent::SendResult { .. } => {}
        }
    }

    /// Consume the pending timer when its sleep completes.
    pub(crate) fn take_fired(&mut self) -> Option<TimerKind> {
        self.pending.take().map(|t| t.kind)
    }

    /// The pairing window elapsed without a scan. Drop the stale code and
    /// fall back to Disconnected so a fresh connect attempt is permitted.
    pub(crate) fn on_pairing_expired(&mut self) {
        if self.state == ConnectionState::ShuttingDown {
            return;
        }
        self.pairing = None;
        self.state = ConnectionState::Disconnected;
    }

    /// Enter shutdown: cancel everything. Returns whether a live session
    /// exists that deserves a graceful logout attempt.
    pub(crate) fn begin_shutdown(&mut self) -> bool {
        let was_connected = self.state == ConnectionState::Connected;
        self.state = ConnectionState::ShuttingDown;
        self.pairing = None;
        self.pending = None;
        was_connected
    }
}

// ============================================================================
// Controller (async runner)
// ============================================================================

/// External commands for the controller task.
#[derive(Debug)]
pub enum Command {
    Shutdown,
}

/// Cheap handle the HTTP layer holds: read-only snapshots plus the
/// shutdown command channel.
#[derive(Clone)]
pub struct LifecycleHandle {
    commands: mpsc::Sender<Command>,
    snapshot: watch::Receiver<StatusSnapshot>,
}

impl LifecycleHandle {
    pub fn snapshot(&self) -> StatusSnapshot {
        self.snapshot.borrow().clone()
    }

    pub async fn shutdown(&self) {
        let _ = self.commands.send(Command::Shutdown).await;
    }
}

pub struct LifecycleController {
    provider: Arc<dyn MessagingProvider>,
    events: mpsc::Receiver<ProviderEvent>,
    commands: mpsc::Receiver<Command>,
    snapshot_tx: watch::Sender<StatusSnapshot>,
    relay: RelayForwarder,
    machine: Machine,
}

impl LifecycleController {
    pub fn new(
        provider: Arc<dyn MessagingProvider>,
        events: mpsc::Receiver<ProviderEvent>,
        relay: RelayForwarder,
        policy: LifecyclePolicy,
    ) -> (Self, LifecycleHandle) {
        let (command_tx, command_rx) = mpsc::channel(8);
        let (snapshot_tx, snapshot_rx) = watch::channel(StatusSnapshot::default());
        let controller = Self {
            provider,
            events,
            commands: command_rx,
            snapshot_tx,
            relay,
            machine: Machine::new(policy),
        };
        let handle = LifecycleHandle {
            commands: command_tx,
            snapshot: snapshot_rx,
        };
        (controller, handle)
    }

    /// Run until shutdown. All state transitions happen on this task.
    pub async fn run(mut self) {
        self.try_connect().await;
        self.publish();

        // One sleep, re-armed whenever the machine schedules a new timer.
        let mut timer: Pin<Box<Sleep>> = Box::pin(sleep(Duration::from_secs(0)));
        let mut armed_seq: u64 = 0;

        loop {
            if let Some(pending) = self.machine.pending()
                && pending.seq != armed_seq
            {
                armed_seq = pending.seq;
                timer.as_mut().reset(Instant::now() + pending.delay);
            }
            let timer_armed = self.machine.pending().is_some();

            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(Command::Shutdown) | None => {
                        self.shutdown().await;
                        return;
                    }
                },
                event = self.events.recv() => match event {
                    Some(event) => self.handle_event(event).await,
                    None => {
                        // Every event sender is gone; nothing can ever
                        // reconnect us. Shut down rather than spin.
                        error!("provider event channel closed; shutting down");
                        self.shutdown().await;
                        return;
                    }
                },
                _ = timer.as_mut(), if timer_armed => self.on_timer().await,
            }

            self.publish();
        }
    }

    fn publish(&self) {
        self.snapshot_tx.send_replace(self.machine.snapshot());
    }

    async fn handle_event(&mut self, event: ProviderEvent) {
        match &event {
            ProviderEvent::Message { message } => {
                if crate::relay::should_forward(message) {
                    info!(from = %message.from, id = %message.id, "inbound message");
                    // Fire-and-forget: the relay logs its own failures.
                    tokio::spawn(self.relay.clone().forward(message.clone()));
                } else {
                    debug!(from = %message.from, "ignoring inbound event");
                }
                return;
            }
            ProviderEvent::SendResult { id, .. } => {
                // Subprocess providers consume these before forwarding;
                // anything that leaks through has no waiter.
                debug!(id = %id, "unmatched send result event");
                return;
            }
            ProviderEvent::PairingCode { code } => {
                info!("pairing code received; scan it from WhatsApp > Linked Devices");
                log_qr_terminal(code);
            }
            ProviderEvent::Open { jid } => {
                info!(bot = %jid, "WhatsApp connection open");
            }
            ProviderEvent::Close { reason } => {
                if reason.is_logged_out() {
                    warn!(%reason, "connection closed: logged out; re-pairing required");
                } else if self.machine.snapshot().logged_out {
                    warn!(%reason, "connection closed while logged out; staying down");
                } else {
                    warn!(%reason, "connection closed; reconnect scheduled");
                }
            }
            ProviderEvent::Connecting => {
                debug!("provider reports connecting");
            }
        }
        self.machine.on_provider_event(&event);
    }

    async fn on_timer(&mut self) {
        match self.machine.take_fired() {
            Some(TimerKind::Reconnect) | Some(TimerKind::ConnectRetry) => {
                self.try_connect().await;
            }
            Some(TimerKind::PairingExpiry) => {
                info!("pairing window expired; cycling connection for a fresh code");
                self.machine.on_pairing_expired();
                // Drop the transport so the provider abandons the stale
                // challenge, then start the next attempt. A close event may
                // still follow from the disconnect; it just schedules one
                // more reconnect pass.
                if let Err(e) = self.provider.disconnect().await {
                    warn!(error = %e, "disconnect for pairing refresh failed");
                }
                self.try_connect().await;
            }
            None => {}
        }
    }

    async fn try_connect(&mut self) {
        if !self.machine.request_connect() {
            debug!(state = %self.machine.state(), "connect request ignored");
            return;
        }
        self.publish();
        info!("starting WhatsApp connection");
        if let Err(e) = self.provider.connect().await {
            warn!(error = %e, "connect attempt failed");
            self.machine.on_connect_error();
        }
    }

    async fn shutdown(&mut self) {
        let had_session = self.machine.begin_shutdown();
        self.publish();
        info!("shutting down lifecycle controller");
        if had_session {
            // Best effort; a hung provider must not block process exit.
            match tokio::time::timeout(Duration::from_secs(5), self.provider.logout()).await {
                Ok(Ok(())) => info!("logged out cleanly"),
                Ok(Err(e)) => warn!(error = %e, "logout failed during shutdown"),
                Err(_) => warn!("logout timed out during shutdown"),
            }
        }
    }
}

/// Render the pairing payload as a scannable QR in the logs, the way the
/// original terminal flow worked. Falls back to the raw payload when the
/// payload does not fit a QR code.
fn log_qr_terminal(code: &str) {
    match qrcode::QrCode::new(code.as_bytes()) {
        Ok(qr) => {
            let rendered = qr
                .render::<qrcode::render::unicode::Dense1x2>()
                .quiet_zone(true)
                .build();
            info!("\n{rendered}");
        }
        Err(e) => {
            warn!(error = %e, "could not render QR code; raw payload follows");
            info!(payload = %code, "pairing payload");
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use warelay_provider::{CloseReason, disconnect_codes};

    fn test_policy() -> LifecyclePolicy {
        LifecyclePolicy {
            reconnect_delay: Duration::from_secs(5),
            connect_retry_delay: Duration::from_secs(15),
            pairing_expiry: Duration::from_secs(60),
        }
    }

    fn close(code: Option<u16>) -> ProviderEvent {
        ProviderEvent::Close {
            reason: CloseReason { code, detail: None },
        }
    }

    fn pairing(code: &str) -> ProviderEvent {
        ProviderEvent::PairingCode {
            code: code.to_string(),
        }
    }

    fn open() -> ProviderEvent {
        ProviderEvent::Open {
            jid: "628999@s.whatsapp.net".to_string(),
        }
    }

    #[test]
    fn connect_is_idempotent_while_in_flight() {
        let mut m = Machine::new(test_policy());
        assert!(m.request_connect());
        assert_eq!(m.state(), ConnectionState::Connecting);
        assert!(!m.request_connect());

        m.on_provider_event(&pairing("2@abc"));
        assert_eq!(m.state(), ConnectionState::WaitingForScan);
        assert!(!m.request_connect());
    }

    #[test]
    fn open_clears_pairing_code_and_timer() {
        let mut m = Machine::new(test_policy());
        m.request_connect();
        m.on_provider_event(&pairing("2@abc"));
        assert!(m.snapshot().pairing_code.is_some());
        assert!(m.pending().is_some());

        m.on_provider_event(&open());
        assert_eq!(m.state(), ConnectionState::Connected);
        assert!(m.snapshot().pairing_code.is_none());
        assert!(m.pending().is_none());
        assert_eq!(m.snapshot().bot_jid.as_deref(), Some("628999@s.whatsapp.net"));
    }

    #[test]
    fn logout_close_is_terminal_with_no_timer() {
        let mut m = Machine::new(test_policy());
        m.request_connect();
        m.on_provider_event(&open());

        m.on_provider_event(&close(Some(disconnect_codes::LOGGED_OUT)));
        assert_eq!(m.state(), ConnectionState::Disconnected);
        assert!(m.snapshot().logged_out);
        assert!(m.pending().is_none());
    }

    #[test]
    fn logout_terminality_survives_later_closes() {
        let mut m = Machine::new(test_policy());
        m.request_connect();
        m.on_provider_event(&open());
        m.on_provider_event(&close(Some(disconnect_codes::LOGGED_OUT)));

        // The sidecar exiting afterwards surfaces as a plain close. It must
        // not arm a reconnect, and connect requests stay refused.
        m.on_provider_event(&close(None));
        assert!(m.pending().is_none());
        assert!(!m.request_connect());
        assert_eq!(m.state(), ConnectionState::Disconnected);

        // Only a successful open (after manual re-pairing) clears the flag.
        m.on_provider_event(&open());
        assert!(!m.snapshot().logged_out);
        m.on_provider_event(&close(None));
        assert_eq!(m.pending().unwrap().kind, TimerKind::Reconnect);
    }

    #[test]
    fn connecting_drops_a_stale_pairing_code() {
        let mut m = Machine::new(test_policy());
        m.request_connect();
        m.on_provider_event(&pairing("2@stale"));
        assert!(m.snapshot().pairing_code.is_some());

        m.on_provider_event(&ProviderEvent::Connecting);
        assert_eq!(m.state(), ConnectionState::Connecting);
        assert!(m.snapshot().pairing_code.is_none());
        assert!(m.pending().is_none());
    }

    #[test]
    fn other_close_schedules_exactly_one_reconnect() {
        let mut m = Machine::new(test_policy());
        m.request_connect();
        m.on_provider_event(&open());

        m.on_provider_event(&close(Some(disconnect_codes::RESTART_REQUIRED)));
        assert_eq!(m.state(), ConnectionState::Disconnected);
        assert!(!m.snapshot().logged_out);
        let pending = m.pending().expect("reconnect timer");
        assert_eq!(pending.kind, TimerKind::Reconnect);
        assert_eq!(pending.delay, Duration::from_secs(5));

        // A close without any code behaves the same way.
        m.take_fired();
        m.request_connect();
        m.on_provider_event(&close(None));
        assert_eq!(m.pending().unwrap().kind, TimerKind::Reconnect);
    }

    #[test]
    fn connect_failure_schedules_longer_retry() {
        let mut m = Machine::new(test_policy());
        m.request_connect();
        m.on_connect_error();
        assert_eq!(m.state(), ConnectionState::Error);
        let pending = m.pending().expect("retry timer");
        assert_eq!(pending.kind, TimerKind::ConnectRetry);
        assert_eq!(pending.delay, Duration::from_secs(15));

        // The retry firing leads back into Connecting.
        assert_eq!(m.take_fired(), Some(TimerKind::ConnectRetry));
        assert!(m.request_connect());
        assert_eq!(m.state(), ConnectionState::Connecting);
    }

    #[test]
    fn consecutive_pairing_codes_supersede_the_expiry_timer() {
        let mut m = Machine::new(test_policy());
        m.request_connect();

        m.on_provider_event(&pairing("2@first"));
        let first_seq = m.pending().unwrap().seq;

        m.on_provider_event(&pairing("2@second"));
        let pending = m.pending().expect("one live expiry timer");
        assert_eq!(pending.kind, TimerKind::PairingExpiry);
        assert_ne!(pending.seq, first_seq);
        assert_eq!(m.snapshot().pairing_code.unwrap().code, "2@second");
    }

    #[test]
    fn pairing_expiry_permits_a_fresh_connect() {
        let mut m = Machine::new(test_policy());
        m.request_connect();
        m.on_provider_event(&pairing("2@stale"));

        assert_eq!(m.take_fired(), Some(TimerKind::PairingExpiry));
        m.on_pairing_expired();
        assert_eq!(m.state(), ConnectionState::Disconnected);
        assert!(m.snapshot().pairing_code.is_none());
        assert!(m.pending().is_none());
        assert!(m.request_connect());
    }

    #[test]
    fn shutdown_cancels_timers_and_reports_session() {
        let mut m = Machine::new(test_policy());
        m.request_connect();
        m.on_provider_event(&pairing("2@abc"));
        assert!(!m.begin_shutdown());
        assert!(m.pending().is_none());
        assert!(m.snapshot().pairing_code.is_none());

        let mut m = Machine::new(test_policy());
        m.request_connect();
        m.on_provider_event(&open());
        assert!(m.begin_shutdown());
        assert_eq!(m.state(), ConnectionState::ShuttingDown);

        // Late events are ignored once shutting down.
        m.on_provider_event(&close(None));
        assert_eq!(m.state(), ConnectionState::ShuttingDown);
        assert!(m.pending().is_none());
    }

    /// At most one timer is pending after any event sequence, and the
    /// pending timer is always consistent with the state that scheduled it.
    #[test]
    fn random_event_sequences_keep_at_most_one_timer() {
        use rand::Rng;

        let mut rng = rand::rng();
        for _ in 0..200 {
            let mut m = Machine::new(test_policy());
            for _ in 0..50 {
                match rng.random_range(0..8u8) {
                    0 => {
                        m.request_connect();
                    }
                    1 => m.on_provider_event(&ProviderEvent::Connecting),
                    2 => m.on_provider_event(&pairing("2@code")),
                    3 => m.on_provider_event(&open()),
                    4 => m.on_provider_event(&close(Some(disconnect_codes::LOGGED_OUT))),
                    5 => m.on_provider_event(&close(None)),
                    6 => m.on_connect_error(),
                    _ => {
                        if m.take_fired() == Some(TimerKind::PairingExpiry) {
                            m.on_pairing_expired();
                        }
                    }
                }

                // Structural: Option can hold at most one. Check the
                // cross-field invariants instead.
                match m.state() {
                    ConnectionState::Connected => assert!(m.pending().is_none()),
                    ConnectionState::WaitingForScan => {
                        let p = m.pending().expect("expiry timer while waiting for scan");
                        assert_eq!(p.kind, TimerKind::PairingExpiry);
                    }
                    _ => {}
                }
                if m.snapshot().logged_out && m.state() == ConnectionState::Disconnected {
                    // Terminal logout never has an automatic retry armed
                    // (unless a later successful open cleared the flag).
                    if let Some(p) = m.pending() {
                        assert_ne!(p.kind, TimerKind::Reconnect);
                    }
                }
                if m.snapshot().pairing_code.is_some() {
                    assert_eq!(m.state(), ConnectionState::WaitingForScan);
                }
            }
        }
    }

    // --- runner-level tests ---

    use async_trait::async_trait;
    use std::sync::Mutex;
    use warelay_provider::{ProviderError, SendReceipt};

    #[derive(Default)]
    struct ScriptedProvider {
        calls: Mutex<Vec<&'static str>>,
    }

    #[async_trait]
    impl MessagingProvider for ScriptedProvider {
        async fn connect(&self) -> Result<(), ProviderError> {
            self.calls.lock().unwrap().push("connect");
            Ok(())
        }
        async fn send(&self, _to: &str, _text: &str) -> Result<SendReceipt, ProviderError> {
            Err(ProviderError::NotConnected)
        }
        async fn disconnect(&self) -> Result<(), ProviderError> {
            self.calls.lock().unwrap().push("disconnect");
            Ok(())
        }
        async fn logout(&self) -> Result<(), ProviderError> {
            self.calls.lock().unwrap().push("logout");
            Ok(())
        }
    }

    fn test_relay() -> RelayForwarder {
        RelayForwarder::new(&crate::config::WebhookConfig {
            url: "http://127.0.0.1:9/webhook".to_string(),
            timeout_seconds: 1,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn controller_publishes_snapshots_and_logs_out_on_shutdown() {
        let provider = Arc::new(ScriptedProvider::default());
        let (event_tx, event_rx) = mpsc::channel(16);
        let (controller, handle) =
            LifecycleController::new(provider.clone(), event_rx, test_relay(), test_policy());
        let task = tokio::spawn(controller.run());

        event_tx
            .send(ProviderEvent::Open {
                jid: "628999@s.whatsapp.net".to_string(),
            })
            .await
            .unwrap();

        // Wait for the snapshot to reflect the open event.
        let rx = handle.clone();
        tokio::time::timeout(Duration::from_secs(2), async {
            loop {
                if rx.snapshot().is_connected() {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("snapshot should become connected");

        handle.shutdown().await;
        tokio::time::timeout(Duration::from_secs(2), task)
            .await
            .expect("controller should exit")
            .unwrap();

        let calls = provider.calls.lock().unwrap().clone();
        assert!(calls.contains(&"connect"));
        assert_eq!(calls.last(), Some(&"logout"));
        assert_eq!(handle.snapshot().state, ConnectionState::ShuttingDown);
    }

    #[tokio::test(start_paused = true)]
    async fn close_triggers_reconnect_after_fixed_delay() {
        let provider = Arc::new(ScriptedProvider::default());
        let (event_tx, event_rx) = mpsc::channel(16);
        let (controller, handle) =
            LifecycleController::new(provider.clone(), event_rx, test_relay(), test_policy());
        let task = tokio::spawn(controller.run());
        tokio::task::yield_now().await;

        event_tx
            .send(ProviderEvent::Open {
                jid: "628999@s.whatsapp.net".to_string(),
            })
            .await
            .unwrap();
        event_tx
            .send(ProviderEvent::Close {
                reason: CloseReason::default(),
            })
            .await
            .unwrap();

        // Paused clock: sleeps auto-advance once the runtime is otherwise
        // idle, so the reconnect timer fires without real waiting.
        tokio::time::timeout(Duration::from_secs(60), async {
            loop {
                if provider.calls.lock().unwrap().iter().filter(|c| **c == "connect").count() >= 2 {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
        })
        .await
        .expect("second connect attempt after reconnect delay");

        handle.shutdown().await;
        let _ = task.await;
    }
}
