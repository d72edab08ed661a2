use anyhow::Context;
use async_trait::async_trait;
use rand::Rng;
use serde::Serialize;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ChipId {
    Number(u64),
    Text(String),
}

impl From<&str> for ChipId {
    fn from(id: &str) -> Self {
        let id = id.trim();
        match id.parse::<u64>() {
            Ok(n) => ChipId::Number(n),
            Err(_) => ChipId::Text(id.to_string()),
        }
    }
}

/// Body of `POST /v1/sensor-data`.
#[derive(Debug, Clone, Serialize)]
pub struct SensorReport {
    #[serde(rename = "chipID")]
    pub chip_id: ChipId,
    pub temperature: f64,
    pub humidity: f64,
}

impl SensorReport {
    /// Simulated reading: temperature in [20, 30) °C, humidity in [40, 60) %.
    pub fn simulate(chip_id: ChipId) -> Self {
        let mut rng = rand::thread_rng();
        Self {
            chip_id,
            temperature: rng.gen_range(20.0..30.0),
            humidity: rng.gen_range(40.0..60.0),
        }
    }
}

pub struct Reporter {
    client: reqwest::Client,
    url: String,
}

impl Reporter {
    pub fn new(url: String, timeout_secs: u64) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { client, url })
    }
}

/// Destination for sensor reports.
#[async_trait]
pub trait ReportSink: Send + Sync {
    async fn send(&self, report: &SensorReport) -> anyhow::Result<()>;
}

#[async_trait]
impl ReportSink for Reporter {
    async fn send(&self, report: &SensorReport) -> anyhow::Result<()> {
        let resp = self
            .client
            .post(&self.url)
            .json(report)
            .send()
            .await
            .context("Request failed")?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("Server returned {status}: {body}");
        }
        Ok(())
    }
}
