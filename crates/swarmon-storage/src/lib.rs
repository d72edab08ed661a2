//! In-memory telemetry storage: current device state plus the append-only
//! reading history, with trailing-window aggregation on top.
//!
//! [`TelemetryStore`] keeps the [`device::DeviceStore`] and the
//! [`history::HistoryLedger`] behind one lock so that a device visible in the
//! store always has its latest reading recorded in the ledger.

pub mod device;
pub mod history;
pub mod window;

#[cfg(test)]
mod tests;

use chrono::{DateTime, Duration, Utc};
use device::DeviceStore;
use history::HistoryLedger;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};
use swarmon_common::types::{DeviceAverage, Reading, WindowAverage};

#[derive(Debug, Default)]
struct Inner {
    devices: DeviceStore,
    ledger: HistoryLedger,
}

/// Thread-safe container shared by the HTTP handlers and the alert
/// evaluator.
///
/// Critical sections are short and never span an `.await`, so a plain
/// `std::sync::Mutex` is used.
#[derive(Debug, Default)]
pub struct TelemetryStore {
    inner: Mutex<Inner>,
}

impl TelemetryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Records a validated reading: appends it to the ledger and makes it the
    /// device's latest state with `last_seen = now`. Returns the reading as
    /// recorded.
    pub fn ingest(&self, reading: Reading, now: DateTime<Utc>) -> Reading {
        let mut inner = self.lock();
        let recorded = inner.ledger.append(reading);
        inner.devices.upsert(recorded.clone(), now);
        recorded
    }

    /// Latest reading per live device; evicts devices idle longer than
    /// `inactivity_timeout`.
    pub fn snapshot(
        &self,
        now: DateTime<Utc>,
        inactivity_timeout: Duration,
    ) -> BTreeMap<String, Reading> {
        self.lock().devices.snapshot(now, inactivity_timeout)
    }

    /// Readings with `timestamp >= since` from the devices accepted by
    /// `predicate`, grouped by device id.
    pub fn windowed_readings<P>(
        &self,
        predicate: P,
        since: DateTime<Utc>,
    ) -> BTreeMap<String, Vec<Reading>>
    where
        P: Fn(&str) -> bool,
    {
        let inner = self.lock();
        let mut grouped: BTreeMap<String, Vec<Reading>> = BTreeMap::new();
        for reading in inner.ledger.windowed_readings(predicate, since) {
            grouped
                .entry(reading.device_id.clone())
                .or_default()
                .push(reading.clone());
        }
        grouped
    }

    pub fn global_average(&self, window: Duration, now: DateTime<Utc>) -> Option<WindowAverage> {
        window::global_average(&self.lock().ledger, window, now)
    }

    pub fn per_device_average(&self, window: Duration, now: DateTime<Utc>) -> Vec<DeviceAverage> {
        window::per_device_average(&self.lock().ledger, window, now)
    }

    /// Number of devices currently held in the device store, stale ones
    /// included until the next snapshot evicts them.
    pub fn device_count(&self) -> usize {
        self.lock().devices.device_count()
    }

    pub fn reading_count(&self) -> usize {
        self.lock().ledger.reading_count()
    }
}
