use serde::Serialize;

/// Point-in-time snapshot of the coordinator. Buffer figures only count
/// signals still inside the correlation window.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CoordinatorStatus {
    pub correlation_window_ms: u64,
    pub active_entities: usize,
    pub total_buffered_signals: usize,
    pub correlated_spikes_computed: u64,
    pub alerts_dispatched: u64,
    pub alerts_suppressed: u64,
    pub alerts_delivered: u64,
    pub dispatch_failures: u64,
    pub dedup_keys: usize,
}
