use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use swarmon_alert::evaluator::{AlertEvaluator, EvaluatorSettings};
use swarmon_notify::manager::NotificationManager;
use swarmon_notify::plugin::ChannelRegistry;
use swarmon_server::app;
use swarmon_server::config::ServerConfig;
use swarmon_server::state::AppState;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|e| anyhow::anyhow!("Failed to install default CryptoProvider: {e:?}"))?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("swarmon=info".parse()?))
        .init();

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config/server.toml".to_string());
    run_server(&config_path).await
}

async fn run_server(config_path: &str) -> Result<()> {
    let config = ServerConfig::load(config_path)?;

    tracing::info!(
        http_port = config.http_port,
        inactivity_timeout_secs = config.inactivity_timeout_secs,
        average_window_secs = config.average_window_secs,
        alert_enabled = config.alert.enabled,
        alert_threshold = config.alert.threshold,
        "swarmon-server starting"
    );

    let registry = ChannelRegistry::default();
    let notifier = NotificationManager::from_specs(&registry, &config.notification.channels)
        .context("Failed to build notification channels")?;
    if notifier.channel_count() == 0 {
        tracing::warn!("No notification channels configured; alerts will only be logged");
    }

    let settings = EvaluatorSettings {
        tick: config.alert.tick(),
        window: config.alert.window(),
    };
    let http_port = config.http_port;
    let state = AppState::new(config);

    let evaluator = AlertEvaluator::new(
        state.store.clone(),
        state.alert_config.clone(),
        state.cooldown.clone(),
        Arc::new(notifier),
        settings,
    );
    let cancel = CancellationToken::new();
    let evaluator_token = cancel.clone();
    let evaluator_handle = tokio::spawn(async move { evaluator.run(evaluator_token).await });

    let http_addr: SocketAddr = format!("0.0.0.0:{http_port}").parse()?;
    let app = app::build_http_app(state);
    let http_listener = tokio::net::TcpListener::bind(http_addr)
        .await
        .with_context(|| format!("Failed to bind HTTP listener on {http_addr}"))?;
    tracing::info!(addr = %http_addr, "HTTP server listening");

    let served = axum::serve(http_listener, app)
        .with_graceful_shutdown(async {
            signal::ctrl_c().await.ok();
            tracing::info!("Shutdown signal received");
        })
        .await;
    if let Err(e) = &served {
        tracing::error!(error = %e, "HTTP server error");
    }

    cancel.cancel();
    if let Err(e) = evaluator_handle.await {
        tracing::error!(error = %e, "Alert evaluator task failed");
    }

    tracing::info!("swarmon-server stopped");
    served.map_err(Into::into)
}
