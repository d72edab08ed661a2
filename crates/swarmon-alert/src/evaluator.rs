use crate::config::SharedAlertConfig;
use crate::cooldown::CooldownGate;
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use swarmon_common::types::TemperatureAlert;
use swarmon_notify::manager::{DeliveryReport, NotificationManager};
use swarmon_storage::window::mean_of_means;
use swarmon_storage::TelemetryStore;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Fixed timing of the evaluator.
#[derive(Debug, Clone, Copy)]
pub struct EvaluatorSettings {
    pub tick: std::time::Duration,
    /// Trailing window the per-device means are computed over.
    pub window: Duration,
}

/// What a single evaluation decided.
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// Alerts are turned off; nothing was computed.
    Disabled,
    /// No device reported inside the window.
    NoData,
    /// The aggregate is at or above the threshold.
    AboveThreshold { mean: f64 },
    /// The condition holds but the previous dispatch is still cooling down.
    CoolingDown {
        mean: f64,
        last_sent: DateTime<Utc>,
    },
    /// A notification was dispatched; the report says how delivery went.
    Dispatched { mean: f64, report: DeliveryReport },
}

/// Periodically checks whether the mean of per-device window means has
/// dropped below the configured threshold and, subject to the cooldown,
/// sends a notification.
pub struct AlertEvaluator {
    store: Arc<TelemetryStore>,
    config: Arc<SharedAlertConfig>,
    gate: Arc<CooldownGate>,
    notifier: Arc<NotificationManager>,
    settings: EvaluatorSettings,
}

impl AlertEvaluator {
    pub fn new(
        store: Arc<TelemetryStore>,
        config: Arc<SharedAlertConfig>,
        gate: Arc<CooldownGate>,
        notifier: Arc<NotificationManager>,
        settings: EvaluatorSettings,
    ) -> Self {
        Self {
            store,
            config,
            gate,
            notifier,
            settings,
        }
    }

    /// Runs one evaluation at `now`.
    ///
    /// A failed delivery is reported in the outcome but the cooldown it
    /// claimed stays in force, so an unreachable sink is not retried every
    /// tick.
    pub async fn evaluate(&self, now: DateTime<Utc>) -> TickOutcome {
        let config = self.config.get();
        if !config.enabled {
            return TickOutcome::Disabled;
        }

        let devices = self.store.per_device_average(self.settings.window, now);
        let Some(mean) = mean_of_means(&devices) else {
            tracing::debug!("No device data in alert window, skipping");
            return TickOutcome::NoData;
        };

        tracing::debug!(
            mean,
            threshold = config.threshold,
            devices = devices.len(),
            "Alert condition evaluated"
        );

        if mean >= config.threshold {
            return TickOutcome::AboveThreshold { mean };
        }

        if let Err(last_sent) = self.gate.try_acquire(now) {
            tracing::debug!(mean, last_sent = %last_sent, "Alert suppressed (cooldown)");
            return TickOutcome::CoolingDown { mean, last_sent };
        }

        let alert = TemperatureAlert {
            threshold: config.threshold,
            mean_temperature: mean,
            devices,
            window_secs: self.settings.window.num_seconds().max(0) as u64,
            timestamp: now,
        };

        let report = self.notifier.dispatch(&alert).await;
        if report.is_success() {
            tracing::info!(
                mean,
                threshold = config.threshold,
                delivered = report.delivered(),
                "Temperature alert sent"
            );
        } else {
            tracing::error!(
                mean,
                threshold = config.threshold,
                delivered = report.delivered(),
                failed = report.failed(),
                "Temperature alert delivery failed"
            );
        }

        TickOutcome::Dispatched { mean, report }
    }

    /// Evaluates on every tick until `cancel` fires.
    ///
    /// Cancellation is only observed between ticks; a tick that has started
    /// runs to completion.
    pub async fn run(&self, cancel: CancellationToken) {
        tracing::info!(
            tick_secs = self.settings.tick.as_secs_f64(),
            window_secs = self.settings.window.num_seconds(),
            cooldown_secs = self.gate.cooldown().num_seconds(),
            "Alert evaluator started"
        );

        let mut tick = interval(self.settings.tick);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Alert evaluator stopping");
                    break;
                }
                _ = tick.tick() => {
                    let outcome = self.evaluate(Utc::now()).await;
                    tracing::trace!(?outcome, "Alert tick finished");
                }
            }
        }
    }
}
