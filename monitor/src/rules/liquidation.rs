//! Liquidation rule
//!
//! Magnitude rule over forced-liquidation volume (USD). The current reading's
//! summed long + short volume must be strictly above the threshold.
//!
//! Subtype comes from which side dominates:
//! - more longs liquidated  → LIQUIDATION_LONG (forced selling, bearish)
//! - more shorts liquidated → LIQUIDATION_SHORT (forced buying, bullish)
//!
//! Readings without a long/short split, or with both sides exactly equal,
//! cannot be classified and are dropped.
//! By default the monitor also evaluates a market-wide `MARKET` entity that
//! sums every watched entity's volume.

use std::time::Duration;

use corelib::{SignalDetail, SignalMetadata, SignalType, SpikeSignal};
use tracing::debug;

use super::{Measurement, SpikeRule, ThresholdMode};
use crate::config::{CombineMode, MonitorConfig};

pub const DEFAULT_THRESHOLD_USD: f64 = 20_000_000.0;
pub const DEFAULT_MARKET_THRESHOLD_USD: f64 = 100_000_000.0;
pub const MARKET_ENTITY: &str = "MARKET";

#[derive(Clone, Copy, Debug, Default)]
pub struct LiquidationRule;

impl LiquidationRule {
    pub fn default_config(watchlist: Vec<String>) -> MonitorConfig {
        MonitorConfig {
            name: "liquidation".into(),
            interval: Duration::from_secs(60),
            fetch_timeout: Duration::from_secs(10),
            threshold: DEFAULT_THRESHOLD_USD,
            window: Duration::from_secs(5 * 60),
            history_capacity: 30,
            watchlist,
            combine: CombineMode::WithAggregate {
                entity_id: MARKET_ENTITY.into(),
                threshold: DEFAULT_MARKET_THRESHOLD_USD,
            },
        }
    }
}

impl SpikeRule for LiquidationRule {
    fn mode(&self) -> ThresholdMode {
        ThresholdMode::Magnitude
    }

    fn classify(
        &mut self,
        entity_id: &str,
        measurement: &Measurement,
        _threshold: f64,
        now_ms: u64,
    ) -> Option<SpikeSignal> {
        let Measurement::Magnitude { total, split } = *measurement else {
            return None;
        };

        let Some(split) = split else {
            debug!(entity = %entity_id, total, "liquidation volume without side split; not classified");
            return None;
        };

        let signal_type = if split.is_long_dominant() {
            SignalType::LiquidationLong
        } else if split.short > split.long {
            SignalType::LiquidationShort
        } else {
            debug!(entity = %entity_id, total, "liquidation sides tied; not classified");
            return None;
        };

        Some(SpikeSignal::new(
            signal_type,
            entity_id,
            total,
            now_ms,
            SignalMetadata::new(
                SignalDetail::Liquidation {
                    long_usd: split.long,
                    short_usd: split.short,
                    long_share: split.long_share(),
                },
                format!(
                    "{entity_id} liquidations ${:.1}M (longs {:.0}%)",
                    total / 1_000_000.0,
                    split.long_share() * 100.0
                ),
            ),
        ))
    }
}
