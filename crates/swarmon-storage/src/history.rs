use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use swarmon_common::types::Reading;

/// Append-only, per-device log of readings ordered by timestamp.
///
/// Entries are never removed. Growth is unbounded; callers that need a
/// bounded footprint must restart the process.
#[derive(Debug, Default)]
pub struct HistoryLedger {
    entries: BTreeMap<String, Vec<Reading>>,
}

impl HistoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `reading` to its device's log and returns the recorded entry.
    ///
    /// A timestamp older than the device's last entry is raised to that
    /// entry's timestamp so each log stays non-decreasing.
    pub fn append(&mut self, mut reading: Reading) -> Reading {
        let log = self.entries.entry(reading.device_id.clone()).or_default();
        if let Some(last) = log.last() {
            if reading.timestamp < last.timestamp {
                tracing::debug!(
                    device_id = %reading.device_id,
                    timestamp = %reading.timestamp,
                    previous = %last.timestamp,
                    "Out-of-order reading clamped to previous timestamp"
                );
                reading.timestamp = last.timestamp;
            }
        }
        log.push(reading.clone());
        reading
    }

    /// Lazily yields every reading with `timestamp >= since` from devices
    /// accepted by `predicate`, device by device in id order.
    ///
    /// The iterator borrows the ledger, so it only ever sees the contents at
    /// the time of the call and can be recreated at will.
    pub fn windowed_readings<'a, P>(
        &'a self,
        predicate: P,
        since: DateTime<Utc>,
    ) -> impl Iterator<Item = &'a Reading> + 'a
    where
        P: Fn(&str) -> bool + 'a,
    {
        self.entries
            .iter()
            .filter(move |(device_id, _)| predicate(device_id.as_str()))
            .flat_map(move |(_, log)| Self::tail_since(log, since).iter())
    }

    /// Per-device view of the readings with `timestamp >= since`; devices
    /// without any such reading are skipped.
    pub fn windowed_by_device(
        &self,
        since: DateTime<Utc>,
    ) -> impl Iterator<Item = (&str, &[Reading])> + '_ {
        self.entries.iter().filter_map(move |(device_id, log)| {
            let tail = Self::tail_since(log, since);
            (!tail.is_empty()).then_some((device_id.as_str(), tail))
        })
    }

    pub fn device_history(&self, device_id: &str) -> Option<&[Reading]> {
        self.entries.get(device_id).map(Vec::as_slice)
    }

    /// Total number of recorded readings across all devices.
    pub fn reading_count(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    // Logs are sorted, so the window is always a suffix.
    fn tail_since(log: &[Reading], since: DateTime<Utc>) -> &[Reading] {
        let start = log.partition_point(|r| r.timestamp < since);
        &log[start..]
    }
}
