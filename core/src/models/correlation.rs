use std::fmt;

use serde::{Deserialize, Serialize};

use super::SpikeSignal;

/// Categorical confidence, derived only from how many signals are buffered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Confidence {
    Medium,
    High,
    Extreme,
}

impl Confidence {
    pub fn from_signal_count(n: usize) -> Self {
        match n {
            0 | 1 => Confidence::Medium,
            2 => Confidence::High,
            _ => Confidence::Extreme,
        }
    }

    pub fn base_score(&self) -> u8 {
        match self {
            Confidence::Medium => 50,
            Confidence::High => 70,
            Confidence::Extreme => 90,
        }
    }

    /// Only HIGH and EXTREME correlations are worth an alert.
    pub fn is_alertable(&self) -> bool {
        matches!(self, Confidence::High | Confidence::Extreme)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Confidence::Medium => "MEDIUM",
            Confidence::High => "HIGH",
            Confidence::Extreme => "EXTREME",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Direction {
    Bullish,
    Bearish,
    Neutral,
    Mixed,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Bullish => "BULLISH",
            Direction::Bearish => "BEARISH",
            Direction::Neutral => "NEUTRAL",
            Direction::Mixed => "MIXED",
        }
    }
}

/// Outcome of correlating one freshly registered signal with its entity's buffer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelatedSpike {
    pub entity_id: String,
    pub primary: SpikeSignal,
    pub supporting: Vec<SpikeSignal>,
    pub confidence: Confidence,
    /// 0..=100. Independent of `confidence`, which is never re-derived from it.
    pub score: u8,
    pub direction: Direction,
    pub timestamp_ms: u64,
}

impl CorrelatedSpike {
    pub fn signal_count(&self) -> usize {
        1 + self.supporting.len()
    }

    pub fn signals(&self) -> impl Iterator<Item = &SpikeSignal> {
        std::iter::once(&self.primary).chain(self.supporting.iter())
    }
}

/// One-line summary, e.g.
/// `BTC HIGH score=90 BULLISH [PRICE_PUMP, LIQUIDATION_SHORT]`.
impl fmt::Display for CorrelatedSpike {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} score={} {} [",
            self.entity_id,
            self.confidence.as_str(),
            self.score,
            self.direction.as_str()
        )?;
        for (i, s) in self.signals().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            f.write_str(s.signal_type.as_str())?;
        }
        f.write_str("]")
    }
}
