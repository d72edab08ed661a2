use crate::config::ServerConfig;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use swarmon_alert::config::{AlertConfig, SharedAlertConfig};
use swarmon_alert::cooldown::CooldownGate;
use swarmon_storage::TelemetryStore;

/// Handles shared by every request handler and the alert evaluator.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<TelemetryStore>,
    pub alert_config: Arc<SharedAlertConfig>,
    pub cooldown: Arc<CooldownGate>,
    pub start_time: DateTime<Utc>,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Self {
        let alert_config = AlertConfig {
            threshold: config.alert.threshold,
            enabled: config.alert.enabled,
        };
        Self {
            store: Arc::new(TelemetryStore::new()),
            alert_config: Arc::new(SharedAlertConfig::new(alert_config)),
            cooldown: Arc::new(CooldownGate::new(config.alert.cooldown())),
            start_time: Utc::now(),
            config: Arc::new(config),
        }
    }
}
