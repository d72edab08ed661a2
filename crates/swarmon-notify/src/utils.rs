//! Utility functions for notification channels

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

/// Delivery attempts per recipient, first try included
pub const MAX_ATTEMPTS: u32 = 3;

/// Maximum number of bytes of a remote response body kept in error messages
pub const MAX_BODY_LENGTH: usize = 500;

/// Truncate a string to at most `max_len` bytes without splitting a character
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        return s.to_string();
    }
    let mut end = max_len;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}... [truncated]", &s[..end])
}

/// Runs `attempt` up to [`MAX_ATTEMPTS`] times, sleeping 100ms, 200ms, ...
/// between failures. Returns the number of attempts made and the last error,
/// if every attempt failed.
pub async fn with_retry<F, Fut, E>(recipient: &str, mut attempt: F) -> (u32, Option<E>)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<(), E>>,
    E: Display,
{
    let mut last_err = None;
    for n in 0..MAX_ATTEMPTS {
        match attempt().await {
            Ok(()) => return (n + 1, None),
            Err(e) => {
                tracing::warn!(attempt = n + 1, recipient = %recipient, error = %e, "Delivery attempt failed");
                last_err = Some(e);
                if n + 1 < MAX_ATTEMPTS {
                    tokio::time::sleep(Duration::from_millis(100 * 2u64.pow(n))).await;
                }
            }
        }
    }
    (MAX_ATTEMPTS, last_err)
}
