//! Trailing-window temperature aggregates over the history ledger.
//!
//! A window of length `w` evaluated at `now` covers every reading with
//! `now - w <= timestamp`, including readings stamped exactly `now`.
//! An empty window yields `None`; it never reports a mean of zero.
//! A window reaching past the earliest representable instant covers the
//! whole ledger.

use crate::history::HistoryLedger;
use chrono::{DateTime, Duration, Utc};
use swarmon_common::types::{DeviceAverage, WindowAverage};

/// Mean temperature of every reading, across all devices, inside the window.
pub fn global_average(
    ledger: &HistoryLedger,
    window: Duration,
    now: DateTime<Utc>,
) -> Option<WindowAverage> {
    let since = window_start(window, now);
    let (sum, count) = ledger
        .windowed_readings(|_| true, since)
        .fold((0.0_f64, 0_usize), |(sum, count), r| {
            (sum + r.temperature, count + 1)
        });

    (count > 0).then(|| WindowAverage {
        mean: sum / count as f64,
        sample_count: count,
    })
}

/// Mean temperature per device inside the window, in device id order.
///
/// Devices without a reading in the window are left out rather than
/// reported as zero.
pub fn per_device_average(
    ledger: &HistoryLedger,
    window: Duration,
    now: DateTime<Utc>,
) -> Vec<DeviceAverage> {
    let since = window_start(window, now);
    ledger
        .windowed_by_device(since)
        .map(|(device_id, readings)| {
            let sum: f64 = readings.iter().map(|r| r.temperature).sum();
            DeviceAverage {
                device_id: device_id.to_string(),
                mean_temperature: sum / readings.len() as f64,
                sample_count: readings.len(),
            }
        })
        .collect()
}

/// Lower bound of the window, saturating instead of overflowing.
pub fn window_start(window: Duration, now: DateTime<Utc>) -> DateTime<Utc> {
    now.checked_sub_signed(window)
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Unweighted mean of per-device means, so every device counts once no
/// matter how often it reported.
pub fn mean_of_means(devices: &[DeviceAverage]) -> Option<f64> {
    if devices.is_empty() {
        return None;
    }
    let sum: f64 = devices.iter().map(|d| d.mean_temperature).sum();
    Some(sum / devices.len() as f64)
}
