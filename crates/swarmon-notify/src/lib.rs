//! Alert notification delivery with pluggable channel support.
//!
//! A [`manager::NotificationManager`] fans a [`TemperatureAlert`] out to every
//! configured [`NotificationChannel`] and reports per-channel outcomes back
//! to the caller. Built-in channels are email (SMTP) and webhook (HTTP POST).

pub mod channels;
pub mod error;
pub mod manager;
pub mod plugin;
pub mod utils;

#[cfg(test)]
mod tests;

use async_trait::async_trait;
use serde::Serialize;
use swarmon_common::types::TemperatureAlert;

/// Delivery result for a single recipient.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecipientResult {
    pub recipient: String,
    pub delivered: bool,
    pub error: Option<String>,
}

/// What a channel did with one alert.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SendResponse {
    /// Attempts beyond the first, summed over all recipients.
    pub retry_count: u32,
    pub recipient_results: Vec<RecipientResult>,
}

impl SendResponse {
    pub fn delivered(&self) -> usize {
        self.recipient_results.iter().filter(|r| r.delivered).count()
    }

    pub fn failed(&self) -> usize {
        self.recipient_results.iter().filter(|r| !r.delivered).count()
    }

    /// Adds the outcome for one recipient. `attempts` of zero means delivery
    /// was never tried.
    pub fn record(&mut self, recipient: &str, attempts: u32, error: Option<String>) {
        self.retry_count += attempts.saturating_sub(1);
        self.recipient_results.push(RecipientResult {
            recipient: recipient.to_string(),
            delivered: error.is_none(),
            error,
        });
    }
}

/// A notification delivery channel that sends alerts to an external service.
///
/// Implementations are created by the matching [`plugin::ChannelPlugin`].
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    /// Delivers the alert to every recipient.
    ///
    /// Per-recipient failures are reported in the [`SendResponse`]; an `Err`
    /// means the channel could not attempt delivery at all.
    async fn send(
        &self,
        alert: &TemperatureAlert,
        recipients: &[String],
    ) -> error::Result<SendResponse>;

    /// Returns the channel type name (e.g., `"email"`, `"webhook"`).
    fn channel_type(&self) -> &str;
}
