use crate::plugin::ChannelRegistry;
use crate::NotificationChannel;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use swarmon_common::types::TemperatureAlert;

/// Declarative definition of one notification channel, as read from the
/// server configuration file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelSpec {
    pub name: String,
    pub channel_type: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub recipients: Vec<String>,
    #[serde(default)]
    pub config: Value,
}

fn default_enabled() -> bool {
    true
}

struct RegisteredChannel {
    name: String,
    channel: Box<dyn NotificationChannel>,
    recipients: Vec<String>,
}

/// Outcome of sending one alert through one channel.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChannelOutcome {
    pub name: String,
    pub channel_type: String,
    pub delivered: usize,
    pub failed: usize,
    /// Set when the channel could not attempt delivery at all.
    pub error: Option<String>,
}

/// Aggregated result of a dispatch across all channels.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DeliveryReport {
    pub channels: Vec<ChannelOutcome>,
}

impl DeliveryReport {
    pub fn delivered(&self) -> usize {
        self.channels.iter().map(|c| c.delivered).sum()
    }

    pub fn failed(&self) -> usize {
        self.channels
            .iter()
            .map(|c| c.failed + usize::from(c.error.is_some()))
            .sum()
    }

    /// At least one recipient was reached and nothing failed.
    pub fn is_success(&self) -> bool {
        self.delivered() > 0 && self.failed() == 0
    }
}

/// Fans alerts out to the configured channels.
///
/// Delivery problems never escape as errors: they are logged and returned in
/// the [`DeliveryReport`] so the caller decides how to report them.
#[derive(Default)]
pub struct NotificationManager {
    channels: Vec<RegisteredChannel>,
}

impl NotificationManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds every enabled channel in `specs` through the registry.
    pub fn from_specs(registry: &ChannelRegistry, specs: &[ChannelSpec]) -> Result<Self> {
        let mut manager = Self::new();
        for spec in specs {
            if !spec.enabled {
                tracing::info!(name = %spec.name, "Notification channel disabled, skipping");
                continue;
            }
            let channel = registry
                .build(&spec.channel_type, &spec.config, &spec.recipients)
                .with_context(|| format!("channel '{}'", spec.name))?;

            let redacted = registry
                .get_plugin(&spec.channel_type)
                .map(|p| p.redact_config(&spec.config))
                .unwrap_or(Value::Null);
            tracing::info!(
                name = %spec.name,
                channel_type = %spec.channel_type,
                recipients = spec.recipients.len(),
                config = %redacted,
                "Notification channel registered"
            );
            manager.add_channel(&spec.name, channel, spec.recipients.clone());
        }
        Ok(manager)
    }

    pub fn add_channel(
        &mut self,
        name: &str,
        channel: Box<dyn NotificationChannel>,
        recipients: Vec<String>,
    ) {
        self.channels.push(RegisteredChannel {
            name: name.to_string(),
            channel,
            recipients,
        });
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    pub async fn dispatch(&self, alert: &TemperatureAlert) -> DeliveryReport {
        let mut report = DeliveryReport::default();

        if self.channels.is_empty() {
            tracing::warn!("No notification channels configured, alert not delivered");
            return report;
        }

        for entry in &self.channels {
            let channel_type = entry.channel.channel_type().to_string();
            let outcome = match entry.channel.send(alert, &entry.recipients).await {
                Ok(resp) => ChannelOutcome {
                    name: entry.name.clone(),
                    channel_type,
                    delivered: resp.delivered(),
                    failed: resp.failed(),
                    error: None,
                },
                Err(e) => {
                    tracing::error!(
                        channel = %entry.name,
                        error = %e,
                        "Failed to send notification"
                    );
                    ChannelOutcome {
                        name: entry.name.clone(),
                        channel_type,
                        delivered: 0,
                        failed: 0,
                        error: Some(e.to_string()),
                    }
                }
            };
            report.channels.push(outcome);
        }

        report
    }
}
