use std::time::Duration;

use serde::Serialize;

use crate::error::MonitorError;

/// How readings are grouped into entities.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum CombineMode {
    /// Every watched entity is evaluated on its own.
    PerEntity,
    /// Per-entity evaluation, plus one synthetic entity whose reading is the
    /// sum of all successful readings of the tick, judged against its own threshold.
    WithAggregate { entity_id: String, threshold: f64 },
}

impl CombineMode {
    pub fn aggregate_entity(&self) -> Option<&str> {
        match self {
            CombineMode::PerEntity => None,
            CombineMode::WithAggregate { entity_id, .. } => Some(entity_id),
        }
    }
}

/// Construction-time settings of one spike monitor.
#[derive(Clone, Debug)]
pub struct MonitorConfig {
    /// Used in logs and status.
    pub name: String,

    /// Fixed delay between ticks.
    pub interval: Duration,

    /// Per-entity fetch deadline. Must be strictly shorter than `interval`
    /// so one slow provider cannot stretch a tick past the next one.
    pub fetch_timeout: Duration,

    /// Relative fraction (0.08 = 8%) or absolute magnitude, depending on the rule.
    pub threshold: f64,

    /// Lookback window used to pick the baseline reading.
    pub window: Duration,

    /// Maximum readings kept per entity.
    pub history_capacity: usize,

    /// Initial watchlist; replaceable at runtime.
    pub watchlist: Vec<String>,

    pub combine: CombineMode,
}

impl MonitorConfig {
    pub fn validate(&self) -> Result<(), MonitorError> {
        if self.fetch_timeout >= self.interval {
            return Err(MonitorError::InvalidFetchTimeout {
                fetch_timeout: self.fetch_timeout,
                interval: self.interval,
            });
        }

        if self.history_capacity < 2 {
            return Err(MonitorError::InvalidCapacity(self.history_capacity));
        }

        if !(self.threshold.is_finite() && self.threshold > 0.0) {
            return Err(MonitorError::InvalidThreshold(self.threshold));
        }

        if let CombineMode::WithAggregate { threshold, .. } = &self.combine {
            if !(threshold.is_finite() && *threshold > 0.0) {
                return Err(MonitorError::InvalidThreshold(*threshold));
            }
        }

        Ok(())
    }

    pub fn window_ms(&self) -> u64 {
        self.window.as_millis() as u64
    }
}

/// Deduplicates entity ids while keeping their first-seen order.
pub(crate) fn normalize_watchlist(ids: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    ids.into_iter()
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty() && seen.insert(id.clone()))
        .collect()
}
