use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use warelay::config::Config;
use warelay::lifecycle::{LifecycleController, LifecyclePolicy};
use warelay::provider::SubprocessProvider;
use warelay::relay::RelayForwarder;
use warelay::server::{AppState, build_app};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warelay=info,tower_http=warn"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config_path =
        std::env::var("WARELAY_CONFIG").unwrap_or_else(|_| "warelay.yaml".to_string());
    let mut config = Config::load(&config_path).await?;
    config.apply_env();

    let (event_tx, event_rx) = mpsc::channel(64);
    let provider = Arc::new(SubprocessProvider::new(config.provider.clone(), event_tx));
    let relay = RelayForwarder::new(&config.webhook)?;
    let policy = LifecyclePolicy::from(&config.lifecycle);
    let (controller, lifecycle) =
        LifecycleController::new(provider.clone(), event_rx, relay, policy);
    let controller_task = tokio::spawn(controller.run());

    let state = AppState {
        lifecycle: lifecycle.clone(),
        provider,
        default_message: config.dispatch.default_message.clone(),
        started_at: Instant::now(),
    };
    let app = build_app(state, config.server.request_timeout_seconds);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(%addr, webhook = %config.webhook.url, "warelay listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Server is down; close the WhatsApp side gracefully. A hung provider
    // must not keep the process alive.
    lifecycle.shutdown().await;
    if tokio::time::timeout(Duration::from_secs(10), controller_task)
        .await
        .is_err()
    {
        warn!("lifecycle controller did not stop in time");
    }

    info!("warelay stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to install ctrl-c handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received");
}
