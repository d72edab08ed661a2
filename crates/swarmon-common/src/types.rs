use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One timestamped temperature/humidity observation from a device.
///
/// Readings are never mutated after they have been recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub device_id: String,
    pub temperature: f64,
    pub humidity: f64,
    pub timestamp: DateTime<Utc>,
}

impl Reading {
    pub fn new(
        device_id: impl Into<String>,
        temperature: f64,
        humidity: f64,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            device_id: device_id.into(),
            temperature,
            humidity,
            timestamp,
        }
    }
}

/// Current state of a device as held by the device store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceState {
    pub latest: Reading,
    pub last_seen: DateTime<Utc>,
}

/// Arithmetic mean of the temperatures in a window, with the number of
/// readings it was computed from. `sample_count` is always at least 1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindowAverage {
    pub mean: f64,
    pub sample_count: usize,
}

/// Mean temperature of a single device over the alert window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceAverage {
    pub device_id: String,
    pub mean_temperature: f64,
    pub sample_count: usize,
}

/// Payload handed to the notification layer when the alert condition holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemperatureAlert {
    /// Threshold in effect when the alert fired.
    pub threshold: f64,
    /// Mean of the per-device means.
    pub mean_temperature: f64,
    pub devices: Vec<DeviceAverage>,
    pub window_secs: u64,
    pub timestamp: DateTime<Utc>,
}

impl TemperatureAlert {
    pub fn subject(&self) -> &'static str {
        "Temperature Alert"
    }

    /// Plain-text body listing the aggregate and every contributing device.
    ///
    /// # Examples
    ///
    /// ```
    /// use chrono::Utc;
    /// use swarmon_common::types::{DeviceAverage, TemperatureAlert};
    ///
    /// let alert = TemperatureAlert {
    ///     threshold: 10.0,
    ///     mean_temperature: 7.5,
    ///     devices: vec![DeviceAverage {
    ///         device_id: "3412".to_string(),
    ///         mean_temperature: 7.5,
    ///         sample_count: 4,
    ///     }],
    ///     window_secs: 900,
    ///     timestamp: Utc::now(),
    /// };
    /// let body = alert.body();
    /// assert!(body.contains("dropped below 10.0°C"));
    /// assert!(body.contains("Device ID: 3412, Average Temp: 7.50°C"));
    /// ```
    pub fn body(&self) -> String {
        let mut body = format!(
            "Alert! The average temperature dropped below {:.1}°C.\n\nAverage Temperature: {:.2}°C\nWindow: {}s\nTime: {}\n\nSensor Details:\n",
            self.threshold,
            self.mean_temperature,
            self.window_secs,
            self.timestamp.to_rfc3339(),
        );
        for device in &self.devices {
            body.push_str(&format!(
                "Device ID: {}, Average Temp: {:.2}°C\n",
                device.device_id, device.mean_temperature
            ));
        }
        body
    }
}
