use std::fmt;

use serde::{Deserialize, Serialize};

use super::Direction;

/// Closed set of threshold-crossing kinds a monitor can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SignalType {
    PricePump,
    PriceDump,
    LiquidationLong,
    LiquidationShort,
    SocialSpike,
    VolumeSpike,
    WhaleAccumulation,
    WhaleDistribution,
}

impl SignalType {
    pub const ALL: [SignalType; 8] = [
        SignalType::PricePump,
        SignalType::PriceDump,
        SignalType::LiquidationLong,
        SignalType::LiquidationShort,
        SignalType::SocialSpike,
        SignalType::VolumeSpike,
        SignalType::WhaleAccumulation,
        SignalType::WhaleDistribution,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SignalType::PricePump => "PRICE_PUMP",
            SignalType::PriceDump => "PRICE_DUMP",
            SignalType::LiquidationLong => "LIQUIDATION_LONG",
            SignalType::LiquidationShort => "LIQUIDATION_SHORT",
            SignalType::SocialSpike => "SOCIAL_SPIKE",
            SignalType::VolumeSpike => "VOLUME_SPIKE",
            SignalType::WhaleAccumulation => "WHALE_ACCUMULATION",
            SignalType::WhaleDistribution => "WHALE_DISTRIBUTION",
        }
    }

    /// Market bias implied by this signal on its own.
    ///
    /// Liquidated shorts force buying, liquidated longs force selling.
    pub fn bias(&self) -> Direction {
        match self {
            SignalType::PricePump | SignalType::LiquidationShort | SignalType::WhaleAccumulation => {
                Direction::Bullish
            }
            SignalType::PriceDump | SignalType::LiquidationLong | SignalType::WhaleDistribution => {
                Direction::Bearish
            }
            SignalType::SocialSpike | SignalType::VolumeSpike => Direction::Neutral,
        }
    }
}

impl fmt::Display for SignalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Magnitude bucket of a social-volume move, relative to the monitor threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Elevated,
    High,
    Extreme,
}

impl Severity {
    /// Buckets `|change|` at 1x, 2x and 3x the threshold.
    pub fn classify(change: f64, threshold: f64) -> Self {
        let ratio = if threshold > 0.0 {
            change.abs() / threshold
        } else {
            f64::INFINITY
        };

        if ratio >= 3.0 {
            Severity::Extreme
        } else if ratio >= 2.0 {
            Severity::High
        } else {
            Severity::Elevated
        }
    }
}

/// Typed per-kind payload of a signal. Scoring never looks inside it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SignalDetail {
    PriceMove {
        baseline: f64,
        current: f64,
        change_pct: f64,
    },
    Liquidation {
        long_usd: f64,
        short_usd: f64,
        long_share: f64,
    },
    SocialVolume {
        baseline: f64,
        current: f64,
        change_pct: f64,
        severity: Severity,
    },
    /// Signals raised by producers outside the built-in monitors.
    External,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalMetadata {
    pub detail: SignalDetail,
    /// Free-form display text.
    pub note: String,
}

impl SignalMetadata {
    pub fn new(detail: SignalDetail, note: impl Into<String>) -> Self {
        Self {
            detail,
            note: note.into(),
        }
    }
}

/// A single threshold crossing for one entity at one instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpikeSignal {
    pub signal_type: SignalType,
    pub entity_id: String,
    /// Percent change for relative metrics, raw magnitude otherwise.
    pub value: f64,
    pub timestamp_ms: u64,
    pub metadata: SignalMetadata,
}

impl SpikeSignal {
    pub fn new(
        signal_type: SignalType,
        entity_id: impl Into<String>,
        value: f64,
        timestamp_ms: u64,
        metadata: SignalMetadata,
    ) -> Self {
        Self {
            signal_type,
            entity_id: entity_id.into(),
            value,
            timestamp_ms,
            metadata,
        }
    }

    /// Signal with no structured payload, for producers outside the built-in monitors.
    pub fn external(
        signal_type: SignalType,
        entity_id: impl Into<String>,
        value: f64,
        timestamp_ms: u64,
    ) -> Self {
        Self::new(
            signal_type,
            entity_id,
            value,
            timestamp_ms,
            SignalMetadata::new(SignalDetail::External, ""),
        )
    }
}
