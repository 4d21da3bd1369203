use std::time::Duration;

use thiserror::Error;

/// Failure to obtain a reading for one entity. Never fatal to the loop.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FetchError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("fetch timed out after {0:?}")]
    Timeout(Duration),

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MonitorError {
    // ---- construction ----
    #[error("fetch timeout {fetch_timeout:?} must be shorter than poll interval {interval:?}")]
    InvalidFetchTimeout {
        fetch_timeout: Duration,
        interval: Duration,
    },

    #[error("history capacity must be at least 2, got {0}")]
    InvalidCapacity(usize),

    #[error("threshold must be positive and finite, got {0}")]
    InvalidThreshold(f64),

    // ---- per-entity, contained within a tick ----
    #[error("fetch failed for {entity}: {source}")]
    Fetch {
        entity: String,
        #[source]
        source: FetchError,
    },

    #[error("insufficient data for {entity}: {have} reading(s)")]
    InsufficientData { entity: String, have: usize },

    #[error("reading for {entity} at {ts_ms} precedes last reading at {last_ms}")]
    OutOfOrder {
        entity: String,
        ts_ms: u64,
        last_ms: u64,
    },

    #[error("cannot compute change for {entity}: {reason}")]
    Compute { entity: String, reason: String },

    // ---- whole loop ----
    #[error("monitor loop terminated: {0}")]
    LoopFatal(String),
}

impl MonitorError {
    /// True for errors that are contained to one entity for one tick.
    pub fn is_entity_scoped(&self) -> bool {
        matches!(
            self,
            MonitorError::Fetch { .. }
                | MonitorError::InsufficientData { .. }
                | MonitorError::OutOfOrder { .. }
                | MonitorError::Compute { .. }
        )
    }
}
