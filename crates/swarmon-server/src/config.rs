use serde::{Deserialize, Serialize};
use swarmon_notify::manager::ChannelSpec;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config: failed to read '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("Config: failed to parse '{path}': {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },

    #[error("Config: invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_http_port")]
    pub http_port: u16,
    /// 设备超过该时长（秒）未上报即从当前状态中移除
    #[serde(default = "default_inactivity_timeout_secs")]
    pub inactivity_timeout_secs: u64,
    /// 仪表盘平均温度的统计窗口（秒）
    #[serde(default = "default_average_window_secs")]
    pub average_window_secs: u64,
    /// CORS 允许的 origins 列表，为空时允许所有来源
    #[serde(default)]
    pub cors_allowed_origins: Vec<String>,
    #[serde(default)]
    pub alert: AlertSettings,
    #[serde(default)]
    pub notification: NotificationConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_port: default_http_port(),
            inactivity_timeout_secs: default_inactivity_timeout_secs(),
            average_window_secs: default_average_window_secs(),
            cors_allowed_origins: Vec::new(),
            alert: AlertSettings::default(),
            notification: NotificationConfig::default(),
        }
    }
}

/// Startup values for the alert evaluator. `enabled` and `threshold` are
/// only the initial config; both can be changed at runtime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertSettings {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub threshold: f64,
    #[serde(default = "default_alert_tick_secs")]
    pub tick_secs: u64,
    /// 告警判定窗口（秒），独立于仪表盘平均温度窗口
    #[serde(default = "default_alert_window_secs")]
    pub window_secs: u64,
    /// 两次告警通知之间的最小间隔（秒）
    #[serde(default = "default_alert_cooldown_secs")]
    pub cooldown_secs: u64,
}

impl Default for AlertSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            threshold: 0.0,
            tick_secs: default_alert_tick_secs(),
            window_secs: default_alert_window_secs(),
            cooldown_secs: default_alert_cooldown_secs(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotificationConfig {
    #[serde(default)]
    pub channels: Vec<ChannelSpec>,
}

/// Upper bound for every duration setting (100 years).
pub const MAX_DURATION_SECS: u64 = 100 * 365 * 24 * 60 * 60;

fn default_http_port() -> u16 {
    8001
}

fn default_inactivity_timeout_secs() -> u64 {
    20
}

fn default_average_window_secs() -> u64 {
    120
}

fn default_alert_tick_secs() -> u64 {
    10
}

fn default_alert_window_secs() -> u64 {
    900
}

fn default_alert_cooldown_secs() -> u64 {
    120
}

impl ServerConfig {
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_string(),
            source,
        })?;
        let config = Self::parse(&content).map_err(|source| ConfigError::Parse {
            path: path.to_string(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("average_window_secs", self.average_window_secs),
            ("alert.tick_secs", self.alert.tick_secs),
            ("alert.window_secs", self.alert.window_secs),
        ];
        for (field, value) in positive {
            if value == 0 {
                return Err(ConfigError::Invalid {
                    field,
                    reason: "must be greater than zero".to_string(),
                });
            }
        }
        let bounded = [
            ("inactivity_timeout_secs", self.inactivity_timeout_secs),
            ("average_window_secs", self.average_window_secs),
            ("alert.tick_secs", self.alert.tick_secs),
            ("alert.window_secs", self.alert.window_secs),
            ("alert.cooldown_secs", self.alert.cooldown_secs),
        ];
        for (field, value) in bounded {
            if value > MAX_DURATION_SECS {
                return Err(ConfigError::Invalid {
                    field,
                    reason: format!("{value} exceeds the maximum of {MAX_DURATION_SECS} seconds"),
                });
            }
        }
        if !self.alert.threshold.is_finite() {
            return Err(ConfigError::Invalid {
                field: "alert.threshold",
                reason: format!("{} is not a finite number", self.alert.threshold),
            });
        }
        Ok(())
    }

    pub fn inactivity_timeout(&self) -> chrono::Duration {
        secs(self.inactivity_timeout_secs)
    }

    pub fn average_window(&self) -> chrono::Duration {
        secs(self.average_window_secs)
    }
}

impl AlertSettings {
    pub fn window(&self) -> chrono::Duration {
        secs(self.window_secs)
    }

    pub fn cooldown(&self) -> chrono::Duration {
        secs(self.cooldown_secs)
    }

    pub fn tick(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.tick_secs)
    }
}

fn secs(value: u64) -> chrono::Duration {
    let value = i64::try_from(value).unwrap_or(i64::MAX).min(i64::MAX / 1000);
    chrono::Duration::seconds(value)
}
