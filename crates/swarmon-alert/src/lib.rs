//! Windowed temperature alerting.
//!
//! The [`evaluator::AlertEvaluator`] polls the telemetry store on a fixed
//! tick, averages each device's readings over the alert window, and takes
//! the unweighted mean of those per-device means. When that value is below
//! the threshold in [`config::AlertConfig`], a notification is dispatched,
//! rate limited by the [`cooldown::CooldownGate`].

pub mod config;
pub mod cooldown;
pub mod evaluator;
