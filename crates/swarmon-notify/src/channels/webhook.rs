use crate::error::{NotifyError, Result};
use crate::plugin::ChannelPlugin;
use crate::utils::{truncate_string, with_retry, MAX_BODY_LENGTH};
use crate::{NotificationChannel, SendResponse};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use swarmon_common::types::TemperatureAlert;

/// Posts the alert as JSON to every recipient URL.
pub struct WebhookChannel {
    client: reqwest::Client,
}

impl WebhookChannel {
    pub fn new(timeout_secs: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;
        Ok(Self { client })
    }

    fn render_body(alert: &TemperatureAlert) -> Value {
        serde_json::json!({
            "subject": alert.subject(),
            "message": alert.body(),
            "threshold": alert.threshold,
            "mean_temperature": alert.mean_temperature,
            "window_secs": alert.window_secs,
            "timestamp": alert.timestamp.to_rfc3339(),
            "devices": alert.devices,
        })
    }

    async fn post_once(&self, url: &str, body: &Value) -> Result<()> {
        let resp = self.client.post(url).json(body).send().await?;
        let status = resp.status();
        if status.is_success() {
            return Ok(());
        }
        let text = resp.text().await.unwrap_or_default();
        Err(NotifyError::Api {
            service: url.to_string(),
            status: status.as_u16(),
            body: truncate_string(&text, MAX_BODY_LENGTH),
        })
    }
}

#[async_trait]
impl NotificationChannel for WebhookChannel {
    async fn send(&self, alert: &TemperatureAlert, recipients: &[String]) -> Result<SendResponse> {
        let body = Self::render_body(alert);
        let mut response = SendResponse::default();

        for url in recipients {
            let (attempts, err) = with_retry(url, || self.post_once(url, &body)).await;
            if let Some(e) = &err {
                tracing::error!(url = %url, error = %e, "Webhook delivery failed after retries");
            }
            response.record(url, attempts, err.map(|e| e.to_string()));
        }

        Ok(response)
    }

    fn channel_type(&self) -> &str {
        "webhook"
    }
}

// Plugin

#[derive(Deserialize)]
struct WebhookConfig {
    #[serde(default = "default_timeout_secs")]
    timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    10
}

pub struct WebhookPlugin;

impl ChannelPlugin for WebhookPlugin {
    fn name(&self) -> &str {
        "webhook"
    }

    fn validate_config(&self, config: &Value) -> anyhow::Result<()> {
        let cfg = parse_config(config)?;
        if cfg.timeout_secs == 0 {
            anyhow::bail!("Invalid webhook config: timeout_secs must be positive");
        }
        Ok(())
    }

    fn validate_recipient(&self, recipient: &str) -> anyhow::Result<()> {
        if recipient.starts_with("http://") || recipient.starts_with("https://") {
            Ok(())
        } else {
            anyhow::bail!("Invalid webhook recipient '{recipient}': expected an http(s) URL")
        }
    }

    fn create_channel(&self, config: &Value) -> anyhow::Result<Box<dyn NotificationChannel>> {
        let cfg = parse_config(config)?;
        Ok(Box::new(WebhookChannel::new(cfg.timeout_secs)?))
    }
}

// An absent config table means defaults.
fn parse_config(config: &Value) -> anyhow::Result<WebhookConfig> {
    let config = if config.is_null() {
        Value::Object(Default::default())
    } else {
        config.clone()
    };
    serde_json::from_value(config).map_err(|e| anyhow::anyhow!("Invalid webhook config: {e}"))
}
