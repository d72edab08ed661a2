use chrono::{DateTime, Duration, Utc};
use std::collections::{BTreeMap, HashMap};
use swarmon_common::types::{DeviceState, Reading};

/// Latest reading and liveness timestamp for every currently known device.
///
/// Stale devices are evicted lazily: only [`DeviceStore::snapshot`] removes
/// them, there is no background sweep.
#[derive(Debug, Default)]
pub struct DeviceStore {
    devices: HashMap<String, DeviceState>,
}

impl DeviceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces the state for `reading.device_id`.
    pub fn upsert(&mut self, reading: Reading, now: DateTime<Utc>) {
        self.devices.insert(
            reading.device_id.clone(),
            DeviceState {
                latest: reading,
                last_seen: now,
            },
        );
    }

    /// Returns the latest reading of every device seen within
    /// `inactivity_timeout` of `now`, permanently dropping the rest.
    ///
    /// A device whose `now - last_seen` equals the timeout is still live.
    pub fn snapshot(
        &mut self,
        now: DateTime<Utc>,
        inactivity_timeout: Duration,
    ) -> BTreeMap<String, Reading> {
        let before = self.devices.len();
        self.devices
            .retain(|_, state| now - state.last_seen <= inactivity_timeout);

        let evicted = before - self.devices.len();
        if evicted > 0 {
            tracing::debug!(evicted, "Evicted inactive devices");
        }

        self.devices
            .iter()
            .map(|(id, state)| (id.clone(), state.latest.clone()))
            .collect()
    }

    /// Devices currently held, stale ones included until the next snapshot.
    pub fn device_count(&self) -> usize {
        self.devices.len()
    }

    #[cfg(test)]
    pub(crate) fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}
