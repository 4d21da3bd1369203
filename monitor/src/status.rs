use serde::Serialize;

/// Read-only snapshot of one monitor, consumed by the outer status API.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitorStatus {
    pub name: String,
    pub running: bool,
    pub interval_ms: u64,
    pub threshold: f64,
    pub window_ms: u64,
    pub entities_tracked: usize,
    pub alerts_emitted: u64,
    /// `None` until the first tick completed.
    pub last_tick_ms: Option<u64>,
    /// Reason the loop last terminated on its own, if it did.
    pub last_error: Option<String>,
}
