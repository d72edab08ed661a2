use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct NodeConfig {
    /// Chip id reported as `chipID`. Purely numeric ids are sent as JSON
    /// numbers, like the ESP32 firmware does.
    pub device_id: String,
    /// Base URL of swarmon-server, e.g. `http://127.0.0.1:8001`
    pub server_endpoint: String,
    #[serde(default = "default_report_interval")]
    pub report_interval_secs: u64,
    #[serde(default = "default_buffer_max_size")]
    pub buffer_max_size: usize,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_report_interval() -> u64 {
    5
}

fn default_buffer_max_size() -> usize {
    1000
}

fn default_request_timeout() -> u64 {
    5
}

impl NodeConfig {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read node config '{path}'"))?;
        let config = Self::parse(&content)
            .with_context(|| format!("Failed to parse node config '{path}'"))?;
        Ok(config)
    }

    pub fn parse(content: &str) -> anyhow::Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.device_id.trim().is_empty() {
            anyhow::bail!("device_id must not be empty");
        }
        let endpoint = self.server_endpoint.trim();
        if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
            anyhow::bail!("server_endpoint must start with http:// or https://, got '{endpoint}'");
        }
        if self.report_interval_secs == 0 {
            anyhow::bail!("report_interval_secs must be greater than zero");
        }
        if self.buffer_max_size == 0 {
            anyhow::bail!("buffer_max_size must be greater than zero");
        }
        Ok(())
    }

    /// Full URL of the ingestion endpoint.
    pub fn report_url(&self) -> String {
        format!("{}/v1/sensor-data", self.server_endpoint.trim().trim_end_matches('/'))
    }
}
