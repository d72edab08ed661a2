use crate::error::{NotifyError, Result};
use crate::manager::{ChannelSpec, NotificationManager};
use crate::plugin::ChannelRegistry;
use crate::{NotificationChannel, RecipientResult, SendResponse};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use swarmon_common::types::{DeviceAverage, TemperatureAlert};

fn sample_alert() -> TemperatureAlert {
    TemperatureAlert {
        threshold: 10.0,
        mean_temperature: 8.25,
        devices: vec![
            DeviceAverage {
                device_id: "1001".into(),
                mean_temperature: 7.5,
                sample_count: 3,
            },
            DeviceAverage {
                device_id: "1002".into(),
                mean_temperature: 9.0,
                sample_count: 1,
            },
        ],
        window_secs: 900,
        timestamp: Utc::now(),
    }
}

struct FakeChannel {
    calls: Arc<AtomicUsize>,
    fail_recipients: bool,
    unavailable: bool,
}

#[async_trait]
impl NotificationChannel for FakeChannel {
    async fn send(&self, _alert: &TemperatureAlert, recipients: &[String]) -> Result<SendResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.unavailable {
            return Err(NotifyError::Smtp("connection refused".into()));
        }
        Ok(SendResponse {
            retry_count: 0,
            recipient_results: recipients
                .iter()
                .map(|r| RecipientResult {
                    recipient: r.clone(),
                    delivered: !self.fail_recipients,
                    error: self.fail_recipients.then(|| "rejected".to_string()),
                })
                .collect(),
        })
    }

    fn channel_type(&self) -> &str {
        "fake"
    }
}

fn fake(calls: &Arc<AtomicUsize>, fail_recipients: bool, unavailable: bool) -> Box<FakeChannel> {
    Box::new(FakeChannel {
        calls: calls.clone(),
        fail_recipients,
        unavailable,
    })
}

// ── Message format ──

#[test]
fn alert_body_lists_every_device() {
    let alert = sample_alert();
    assert_eq!(alert.subject(), "Temperature Alert");
    let body = alert.body();
    assert!(body.contains("Average Temperature: 8.25°C"));
    assert!(body.contains("Device ID: 1001, Average Temp: 7.50°C"));
    assert!(body.contains("Device ID: 1002, Average Temp: 9.00°C"));
}

// ── Manager ──

#[tokio::test]
async fn dispatch_reports_success_across_channels() {
    let calls = Arc::new(AtomicUsize::new(0));
    let mut manager = NotificationManager::new();
    manager.add_channel("a", fake(&calls, false, false), vec!["x".into(), "y".into()]);
    manager.add_channel("b", fake(&calls, false, false), vec!["z".into()]);

    let report = manager.dispatch(&sample_alert()).await;
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(report.delivered(), 3);
    assert_eq!(report.failed(), 0);
    assert!(report.is_success());
}

#[tokio::test]
async fn dispatch_collects_failures_without_erroring() {
    let calls = Arc::new(AtomicUsize::new(0));
    let mut manager = NotificationManager::new();
    manager.add_channel("down", fake(&calls, false, true), vec!["x".into()]);
    manager.add_channel("rejecting", fake(&calls, true, false), vec!["y".into()]);
    manager.add_channel("ok", fake(&calls, false, false), vec!["z".into()]);

    let report = manager.dispatch(&sample_alert()).await;
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert_eq!(report.delivered(), 1);
    assert_eq!(report.failed(), 2);
    assert!(!report.is_success());
    assert!(report.channels[0]
        .error
        .as_deref()
        .unwrap_or_default()
        .contains("connection refused"));
}

#[tokio::test]
async fn dispatch_without_channels_is_not_success() {
    let manager = NotificationManager::new();
    let report = manager.dispatch(&sample_alert()).await;
    assert!(report.channels.is_empty());
    assert!(!report.is_success());
}

#[test]
fn from_specs_skips_disabled_channels() {
    let registry = ChannelRegistry::default();
    let specs = vec![ChannelSpec {
        name: "ops-mail".into(),
        channel_type: "email".into(),
        enabled: false,
        recipients: vec!["ops@example.com".into()],
        config: serde_json::json!({}),
    }];
    let manager = NotificationManager::from_specs(&registry, &specs).unwrap();
    assert_eq!(manager.channel_count(), 0);
}

#[test]
fn from_specs_rejects_unknown_type_and_bad_recipient() {
    let registry = ChannelRegistry::default();
    let unknown = vec![ChannelSpec {
        name: "pager".into(),
        channel_type: "pager".into(),
        enabled: true,
        recipients: vec![],
        config: serde_json::Value::Null,
    }];
    let err = NotificationManager::from_specs(&registry, &unknown)
        .err()
        .expect("unknown type should fail");
    assert!(format!("{err:#}").contains("Unknown channel plugin type"));

    let bad_url = vec![ChannelSpec {
        name: "hook".into(),
        channel_type: "webhook".into(),
        enabled: true,
        recipients: vec!["ftp://example.com".into()],
        config: serde_json::Value::Null,
    }];
    assert!(NotificationManager::from_specs(&registry, &bad_url).is_err());
}

// ── Plugin registry ──

#[test]
fn registry_default_has_all_builtin_plugins() {
    let registry = ChannelRegistry::default();
    assert_eq!(registry.plugin_names(), vec!["email", "webhook"]);
    let err = registry.validate("sms", &serde_json::Value::Null, &[]).unwrap_err();
    assert!(err.to_string().contains("unknown channel type 'sms'"));
}

#[test]
fn email_plugin_validates_config() {
    let registry = ChannelRegistry::default();

    let valid = serde_json::json!({
        "smtp_host": "smtp.example.com",
        "smtp_port": 465,
        "smtp_username": "alerts@example.com",
        "smtp_password": "secret",
        "from": "alerts@example.com"
    });
    assert!(registry
        .validate("email", &valid, &["ops@example.com".to_string()])
        .is_ok());

    let missing_host = serde_json::json!({ "from": "alerts@example.com" });
    assert!(registry.validate("email", &missing_host, &[]).is_err());

    assert!(registry
        .validate("email", &valid, &["not an address".to_string()])
        .is_err());
}

#[test]
fn email_plugin_redacts_password() {
    let registry = ChannelRegistry::default();
    let plugin = registry.get_plugin("email").unwrap();
    let redacted = plugin.redact_config(&serde_json::json!({
        "smtp_host": "smtp.example.com",
        "smtp_password": "secret"
    }));
    assert_eq!(redacted["smtp_password"], "***");
    assert_eq!(redacted["smtp_host"], "smtp.example.com");
}

#[test]
fn webhook_plugin_accepts_missing_config() {
    let registry = ChannelRegistry::default();
    assert!(registry
        .validate(
            "webhook",
            &serde_json::Value::Null,
            &["https://hooks.example.com/alert".to_string()]
        )
        .is_ok());
    assert!(registry
        .validate("webhook", &serde_json::json!({ "timeout_secs": 0 }), &[])
        .is_err());
}
