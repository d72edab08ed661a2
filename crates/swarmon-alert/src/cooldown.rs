use chrono::{DateTime, Duration, Utc};
use std::sync::Mutex;

/// Rate limit for alert dispatches.
///
/// The decision to send and the update of `last_sent` happen in one critical
/// section, so two concurrent evaluations can never both pass the gate within
/// the same cooldown period. `last_sent` only ever moves forward.
#[derive(Debug)]
pub struct CooldownGate {
    cooldown: Duration,
    last_sent: Mutex<Option<DateTime<Utc>>>,
}

impl CooldownGate {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            last_sent: Mutex::new(None),
        }
    }

    /// Claims the right to dispatch at `now`.
    ///
    /// Succeeds when nothing was sent yet or more than the cooldown has
    /// elapsed since the last dispatch; `last_sent` is then set to `now`.
    /// Otherwise returns the time of the dispatch still cooling down.
    pub fn try_acquire(&self, now: DateTime<Utc>) -> Result<(), DateTime<Utc>> {
        let mut last_sent = self
            .last_sent
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        match *last_sent {
            Some(last) if now - last <= self.cooldown => Err(last),
            Some(last) => {
                *last_sent = Some(last.max(now));
                Ok(())
            }
            None => {
                *last_sent = Some(now);
                Ok(())
            }
        }
    }

    pub fn last_sent(&self) -> Option<DateTime<Utc>> {
        *self
            .last_sent
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }
}
