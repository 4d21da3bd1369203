use std::time::Duration;

use tracing::{Span, field};

use super::TraceId;

/// Root span for a single monitor tick.
///
/// `entities` is recorded once the tick knows how many entities it polled.
pub fn tick_span(monitor: &str, trace_id: TraceId) -> Span {
    tracing::info_span!(
        "tick",
        monitor = %monitor,
        trace_id = %trace_id,
        entities = field::Empty
    )
}

/// Awaits `fut` and emits a warning when it took longer than `max`.
pub async fn warn_if_slow<F, T>(label: &'static str, max: Duration, fut: F) -> T
where
    F: std::future::Future<Output = T>,
{
    let start = std::time::Instant::now();
    let out = fut.await;
    let elapsed = start.elapsed();
    if elapsed > max {
        tracing::warn!(
            target: "performance",
            label = label,
            elapsed_ms = elapsed.as_millis() as u64,
            "slow operation detected"
        );
    }
    out
}
