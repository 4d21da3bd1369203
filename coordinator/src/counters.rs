use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Minimal counters for operational visibility.
///
/// Shared between the coordinator and its dispatcher task.
#[derive(Clone, Default)]
pub struct Counters {
    pub correlated_computed: Arc<AtomicU64>,

    // dispatch decisions
    pub alerts_dispatched: Arc<AtomicU64>,
    pub alerts_suppressed: Arc<AtomicU64>,

    // dispatcher side
    pub alerts_delivered: Arc<AtomicU64>,
    pub dispatch_failures: Arc<AtomicU64>,
}

impl Counters {
    pub(crate) fn incr(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn get(counter: &AtomicU64) -> u64 {
        counter.load(Ordering::Relaxed)
    }
}
