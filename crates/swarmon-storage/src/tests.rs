use crate::device::DeviceStore;
use crate::history::HistoryLedger;
use crate::window::{global_average, mean_of_means, per_device_average};
use crate::TelemetryStore;
use chrono::{DateTime, Duration, TimeZone, Utc};
use swarmon_common::types::{DeviceAverage, Reading};

fn t(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
}

fn reading(device: &str, temperature: f64, secs: i64) -> Reading {
    Reading::new(device, temperature, 50.0, t(secs))
}

// ── Device store ──

#[test]
fn snapshot_holds_latest_reading_per_device() {
    let store = TelemetryStore::new();
    store.ingest(reading("a", 20.0, 0), t(0));
    store.ingest(reading("b", 21.0, 1), t(1));
    store.ingest(reading("a", 22.5, 2), t(2));

    let snap = store.snapshot(t(3), Duration::seconds(20));
    assert_eq!(snap.len(), 2);
    assert_eq!(snap["a"].temperature, 22.5);
    assert_eq!(snap["b"].temperature, 21.0);
}

#[test]
fn snapshot_evicts_idle_devices_permanently() {
    let store = TelemetryStore::new();
    store.ingest(reading("old", 20.0, 0), t(0));
    store.ingest(reading("fresh", 21.0, 25), t(25));

    let snap = store.snapshot(t(30), Duration::seconds(20));
    assert!(!snap.contains_key("old"));
    assert!(snap.contains_key("fresh"));
    assert_eq!(store.device_count(), 1);

    // A later read cannot bring it back without new ingestion.
    let snap = store.snapshot(t(31), Duration::seconds(20));
    assert!(!snap.contains_key("old"));

    store.ingest(reading("old", 19.0, 32), t(32));
    let snap = store.snapshot(t(33), Duration::seconds(20));
    assert_eq!(snap["old"].temperature, 19.0);
}

#[test]
fn snapshot_keeps_device_exactly_at_timeout() {
    let mut devices = DeviceStore::new();
    devices.upsert(reading("edge", 20.0, 0), t(0));
    assert!(devices.snapshot(t(20), Duration::seconds(20)).contains_key("edge"));
    assert!(!devices.snapshot(t(21), Duration::seconds(20)).contains_key("edge"));
    assert!(devices.is_empty());
}

#[test]
fn snapshot_is_idempotent_without_ingestion() {
    let store = TelemetryStore::new();
    store.ingest(reading("a", 20.0, 0), t(0));
    store.ingest(reading("b", 24.0, 0), t(0));

    let first = store.snapshot(t(5), Duration::seconds(20));
    let second = store.snapshot(t(5), Duration::seconds(20));
    assert_eq!(first, second);
}

#[test]
fn eviction_does_not_touch_history() {
    let store = TelemetryStore::new();
    store.ingest(reading("gone", 20.0, 0), t(0));
    let _ = store.snapshot(t(100), Duration::seconds(20));

    assert_eq!(store.device_count(), 0);
    assert_eq!(store.reading_count(), 1);
    let history = store.windowed_readings(|_| true, t(-1));
    assert_eq!(history["gone"].len(), 1);
}

// ── History ledger ──

#[test]
fn ledger_keeps_device_logs_ordered() {
    let mut ledger = HistoryLedger::new();
    ledger.append(reading("a", 20.0, 10));
    let recorded = ledger.append(reading("a", 21.0, 5));

    assert_eq!(recorded.timestamp, t(10));
    let log = ledger.device_history("a").unwrap();
    assert!(log.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
}

#[test]
fn ingest_records_same_reading_in_store_and_ledger() {
    let store = TelemetryStore::new();
    store.ingest(reading("a", 20.0, 10), t(10));
    let recorded = store.ingest(reading("a", 23.0, 4), t(11));

    let snap = store.snapshot(t(11), Duration::seconds(20));
    assert_eq!(snap["a"], recorded);
    let history = store.windowed_readings(|id| id == "a", t(0));
    assert_eq!(history["a"].last(), Some(&recorded));
}

#[test]
fn windowed_readings_filters_by_device_and_lower_bound() {
    let mut ledger = HistoryLedger::new();
    ledger.append(reading("a", 20.0, 0));
    ledger.append(reading("a", 21.0, 60));
    ledger.append(reading("b", 22.0, 60));
    ledger.append(reading("b", 23.0, 120));

    let temps: Vec<f64> = ledger
        .windowed_readings(|id| id == "b", t(60))
        .map(|r| r.temperature)
        .collect();
    assert_eq!(temps, vec![22.0, 23.0]);

    // Restartable: a second query sees the same contents.
    assert_eq!(ledger.windowed_readings(|_| true, t(60)).count(), 3);
    assert_eq!(ledger.windowed_readings(|_| true, t(60)).count(), 3);
    assert_eq!(ledger.windowed_readings(|_| true, t(121)).count(), 0);
}

// ── Window aggregation ──

#[test]
fn global_average_excludes_readings_before_window() {
    let mut ledger = HistoryLedger::new();
    ledger.append(reading("a", 20.0, 0));
    ledger.append(reading("a", 22.0, 90));
    ledger.append(reading("a", 24.0, 150));

    let avg = global_average(&ledger, Duration::seconds(120), t(150)).unwrap();
    assert!((avg.mean - 23.0).abs() < f64::EPSILON);
    assert_eq!(avg.sample_count, 2);
}

#[test]
fn global_average_window_bounds_are_inclusive() {
    let mut ledger = HistoryLedger::new();
    ledger.append(reading("a", 10.0, 30));
    ledger.append(reading("b", 30.0, 150));

    // Lower edge at t=30 and a reading exactly at "now" both count.
    let avg = global_average(&ledger, Duration::seconds(120), t(150)).unwrap();
    assert_eq!(avg.sample_count, 2);
    assert!((avg.mean - 20.0).abs() < f64::EPSILON);
}

#[test]
fn global_average_of_empty_window_is_none() {
    let mut ledger = HistoryLedger::new();
    assert!(global_average(&ledger, Duration::seconds(120), t(0)).is_none());

    ledger.append(reading("a", 0.0, 0));
    assert!(global_average(&ledger, Duration::seconds(2), t(10)).is_none());

    // A genuine zero mean is still reported.
    let avg = global_average(&ledger, Duration::seconds(20), t(10)).unwrap();
    assert_eq!(avg.mean, 0.0);
}

#[test]
fn per_device_average_skips_devices_without_window_data() {
    let store = TelemetryStore::new();
    store.ingest(reading("quiet", 5.0, 0), t(0));
    store.ingest(reading("busy", 10.0, 800), t(800));
    store.ingest(reading("busy", 14.0, 900), t(900));

    // "quiet" is still in the device store but has nothing in the window.
    assert!(store
        .snapshot(t(900), Duration::seconds(1000))
        .contains_key("quiet"));

    let averages = store.per_device_average(Duration::seconds(200), t(900));
    assert_eq!(
        averages,
        vec![DeviceAverage {
            device_id: "busy".to_string(),
            mean_temperature: 12.0,
            sample_count: 2,
        }]
    );
}

#[test]
fn mean_of_means_weights_devices_equally() {
    let mut ledger = HistoryLedger::new();
    for i in 0..9 {
        ledger.append(reading("chatty", 10.0, i));
    }
    ledger.append(reading("sparse", 20.0, 5));

    let per_device = per_device_average(&ledger, Duration::seconds(60), t(10));
    assert_eq!(mean_of_means(&per_device), Some(15.0));

    let raw = global_average(&ledger, Duration::seconds(60), t(10)).unwrap();
    assert!((raw.mean - 11.0).abs() < 1e-9);

    assert_eq!(mean_of_means(&[]), None);
}

#[test]
fn concurrent_ingest_keeps_every_reading() {
    use std::sync::Arc;

    let store = Arc::new(TelemetryStore::new());
    let handles: Vec<_> = (0..4)
        .map(|n| {
            let store = store.clone();
            std::thread::spawn(move || {
                for i in 0..250 {
                    store.ingest(reading(&format!("dev-{n}"), 20.0, i), t(i));
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(store.reading_count(), 1000);
    assert_eq!(store.snapshot(t(250), Duration::seconds(20)).len(), 4);
}

#[test]
fn window_longer_than_representable_time_covers_whole_ledger() {
    let store = TelemetryStore::new();
    store.ingest(reading("a", 10.0, 0), t(0));
    store.ingest(reading("b", 30.0, 5), t(5));

    let huge = Duration::seconds(i64::MAX / 1000);
    let average = store.global_average(huge, t(10)).unwrap();
    assert_eq!(average.sample_count, 2);
    assert!((average.mean - 20.0).abs() < 1e-9);

    let per_device = store.per_device_average(huge, t(10));
    assert_eq!(per_device.len(), 2);
    assert_eq!(crate::window::window_start(huge, t(10)), DateTime::<Utc>::MIN_UTC);
}
