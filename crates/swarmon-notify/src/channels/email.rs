use crate::error::{NotifyError, Result};
use crate::plugin::ChannelPlugin;
use crate::utils::with_retry;
use crate::{NotificationChannel, SendResponse};
use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use serde::Deserialize;
use serde_json::Value;
use swarmon_common::types::TemperatureAlert;

pub struct EmailChannel {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl EmailChannel {
    /// Builds an implicit-TLS SMTP transport (port 465 by default).
    pub fn new(
        smtp_host: &str,
        smtp_port: u16,
        username: Option<&str>,
        password: Option<&str>,
        from: &str,
    ) -> Result<Self> {
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::relay(smtp_host)
            .map_err(|e| NotifyError::Smtp(e.to_string()))?
            .port(smtp_port);

        if let (Some(user), Some(pass)) = (username, password) {
            builder = builder.credentials(Credentials::new(user.to_string(), pass.to_string()));
        }

        let from = from
            .parse::<Mailbox>()
            .map_err(|e| NotifyError::InvalidConfig(format!("invalid from address '{from}': {e}")))?;

        Ok(Self {
            transport: builder.build(),
            from,
        })
    }

    fn build_message(&self, alert: &TemperatureAlert, recipient: &str) -> Result<Message> {
        let to = recipient.parse::<Mailbox>().map_err(|e| {
            NotifyError::InvalidConfig(format!("invalid recipient '{recipient}': {e}"))
        })?;
        Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(alert.subject())
            .header(ContentType::TEXT_PLAIN)
            .body(alert.body())
            .map_err(|e| NotifyError::Smtp(e.to_string()))
    }
}

#[async_trait]
impl NotificationChannel for EmailChannel {
    async fn send(&self, alert: &TemperatureAlert, recipients: &[String]) -> Result<SendResponse> {
        let mut response = SendResponse::default();

        for recipient in recipients {
            let email = match self.build_message(alert, recipient) {
                Ok(email) => email,
                Err(e) => {
                    tracing::error!(recipient = %recipient, error = %e, "Failed to build alert email");
                    response.record(recipient, 0, Some(e.to_string()));
                    continue;
                }
            };

            let (attempts, err) = with_retry(recipient, || async {
                self.transport.send(email.clone()).await.map(|_| ())
            })
            .await;
            match &err {
                Some(e) => {
                    tracing::error!(recipient = %recipient, error = %e, "Email send failed after retries")
                }
                None => tracing::info!(recipient = %recipient, "Alert email sent"),
            }
            response.record(recipient, attempts, err.map(|e| e.to_string()));
        }

        Ok(response)
    }

    fn channel_type(&self) -> &str {
        "email"
    }
}

// Plugin

#[derive(Deserialize)]
struct EmailConfig {
    smtp_host: String,
    #[serde(default = "default_smtp_port")]
    smtp_port: u16,
    smtp_username: Option<String>,
    smtp_password: Option<String>,
    from: String,
}

fn default_smtp_port() -> u16 {
    465
}

pub struct EmailPlugin;

impl ChannelPlugin for EmailPlugin {
    fn name(&self) -> &str {
        "email"
    }

    fn validate_config(&self, config: &Value) -> anyhow::Result<()> {
        let cfg = serde_json::from_value::<EmailConfig>(config.clone())
            .map_err(|e| anyhow::anyhow!("Invalid email config: {e}"))?;
        cfg.from
            .parse::<Mailbox>()
            .map_err(|e| anyhow::anyhow!("Invalid email config: bad from address: {e}"))?;
        Ok(())
    }

    fn validate_recipient(&self, recipient: &str) -> anyhow::Result<()> {
        recipient
            .parse::<Mailbox>()
            .map_err(|e| anyhow::anyhow!("Invalid email recipient '{recipient}': {e}"))?;
        Ok(())
    }

    fn create_channel(&self, config: &Value) -> anyhow::Result<Box<dyn NotificationChannel>> {
        let cfg: EmailConfig = serde_json::from_value(config.clone())
            .map_err(|e| anyhow::anyhow!("Invalid email config: {e}"))?;
        let channel = EmailChannel::new(
            &cfg.smtp_host,
            cfg.smtp_port,
            cfg.smtp_username.as_deref(),
            cfg.smtp_password.as_deref(),
            &cfg.from,
        )?;
        Ok(Box::new(channel))
    }

    fn redact_config(&self, config: &Value) -> Value {
        let mut redacted = config.clone();
        if let Some(obj) = redacted.as_object_mut() {
            if obj.contains_key("smtp_password") {
                obj.insert(
                    "smtp_password".to_string(),
                    Value::String("***".to_string()),
                );
            }
        }
        redacted
    }
}
