use crate::buffer::ReadingBuffer;
use crate::report::{ReportSink, SensorReport};

/// Result of one report cycle.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct FlushOutcome {
    pub current_delivered: bool,
    /// Backlog readings delivered after the current one. The server stamps
    /// them with the delivery time, not the time they were measured.
    pub flushed: usize,
}

/// Sends the newest reading, then drains the backlog oldest first. Stops at
/// the first failure and keeps everything not yet delivered.
pub async fn report_and_flush<S: ReportSink + ?Sized>(
    sink: &S,
    buffer: &mut ReadingBuffer<SensorReport>,
    current: SensorReport,
) -> FlushOutcome {
    let mut outcome = FlushOutcome::default();

    if let Err(e) = sink.send(&current).await {
        let dropped = buffer.push(current);
        tracing::warn!(
            error = %e,
            buffered = buffer.len(),
            dropped,
            "Failed to report reading, buffering"
        );
        return outcome;
    }
    outcome.current_delivered = true;
    tracing::debug!(
        temperature = current.temperature,
        humidity = current.humidity,
        "Reading reported"
    );

    while let Some(pending) = buffer.pop_oldest() {
        if let Err(e) = sink.send(&pending).await {
            buffer.restore_oldest(pending);
            tracing::warn!(
                error = %e,
                flushed = outcome.flushed,
                remaining = buffer.len(),
                "Flush interrupted"
            );
            return outcome;
        }
        outcome.flushed += 1;
    }

    if outcome.flushed > 0 {
        tracing::info!(
            restamped = outcome.flushed,
            "Buffered readings delivered; the server stamps them with the delivery time"
        );
    }
    outcome
}
