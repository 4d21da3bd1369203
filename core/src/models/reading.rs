use serde::{Deserialize, Serialize};

/// Long/short breakdown of a two-sided volume reading (e.g. liquidations).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VolumeSplit {
    pub long: f64,
    pub short: f64,
}

impl VolumeSplit {
    pub fn new(long: f64, short: f64) -> Self {
        Self { long, short }
    }

    pub fn total(&self) -> f64 {
        self.long + self.short
    }

    /// Share of the total attributed to the long side, in `[0, 1]`.
    /// An empty split reports an even 0.5.
    pub fn long_share(&self) -> f64 {
        let total = self.total();
        if total > 0.0 { self.long / total } else { 0.5 }
    }

    pub fn is_long_dominant(&self) -> bool {
        self.long > self.short
    }
}

/// One polled value for one entity. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricReading {
    pub entity_id: String,
    pub timestamp_ms: u64,
    pub value: f64,
    /// Present only for two-sided metrics.
    pub split: Option<VolumeSplit>,
}

impl MetricReading {
    pub fn new(entity_id: impl Into<String>, timestamp_ms: u64, value: f64) -> Self {
        Self {
            entity_id: entity_id.into(),
            timestamp_ms,
            value,
            split: None,
        }
    }

    pub fn with_split(mut self, split: VolumeSplit) -> Self {
        self.split = Some(split);
        self
    }
}
