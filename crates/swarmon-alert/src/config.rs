use serde::{Deserialize, Serialize};
use std::sync::RwLock;

/// Process-wide alert settings, changed at runtime through the config
/// endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AlertConfig {
    /// Alert when the mean of per-device means falls below this value (°C).
    pub threshold: f64,
    pub enabled: bool,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            threshold: 0.0,
            enabled: false,
        }
    }
}

/// Shared holder for the current [`AlertConfig`].
///
/// The whole value is replaced under one write lock, so readers always see a
/// threshold and enabled flag that were set together.
#[derive(Debug, Default)]
pub struct SharedAlertConfig {
    current: RwLock<AlertConfig>,
}

impl SharedAlertConfig {
    pub fn new(config: AlertConfig) -> Self {
        Self {
            current: RwLock::new(config),
        }
    }

    pub fn get(&self) -> AlertConfig {
        *self
            .current
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Replaces the config and returns the previous value.
    pub fn set(&self, config: AlertConfig) -> AlertConfig {
        let mut current = self
            .current
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        std::mem::replace(&mut *current, config)
    }
}
