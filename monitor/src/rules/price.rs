//! Price rule
//!
//! Relative move of the latest price against the oldest in-window price.
//!
//! ```text
//! change = (p_now - p_baseline) / p_baseline
//! ```
//!
//! `|change| >= threshold` qualifies; the sign picks PRICE_PUMP or PRICE_DUMP.
//! The signal value is the change in percent (`+9.0` for a 9% pump).
//!
//! No per-entity cooldown: repeated crossings are deduplicated downstream by
//! the coordinator's per-minute alert key.

use std::time::Duration;

use corelib::{SignalDetail, SignalMetadata, SignalType, SpikeSignal};

use super::{Measurement, SpikeRule, ThresholdMode};
use crate::config::{CombineMode, MonitorConfig};

pub const DEFAULT_THRESHOLD: f64 = 0.08;
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(60);
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(5 * 60);

#[derive(Clone, Copy, Debug, Default)]
pub struct PriceRule;

impl PriceRule {
    pub fn default_config(watchlist: Vec<String>) -> MonitorConfig {
        MonitorConfig {
            name: "price".into(),
            interval: DEFAULT_INTERVAL,
            fetch_timeout: Duration::from_secs(10),
            threshold: DEFAULT_THRESHOLD,
            window: DEFAULT_WINDOW,
            history_capacity: 60,
            watchlist,
            combine: CombineMode::PerEntity,
        }
    }
}

impl SpikeRule for PriceRule {
    fn mode(&self) -> ThresholdMode {
        ThresholdMode::Relative
    }

    fn classify(
        &mut self,
        entity_id: &str,
        measurement: &Measurement,
        _threshold: f64,
        now_ms: u64,
    ) -> Option<SpikeSignal> {
        let Measurement::Relative {
            baseline,
            current,
            change,
        } = *measurement
        else {
            return None;
        };

        let signal_type = if change >= 0.0 {
            SignalType::PricePump
        } else {
            SignalType::PriceDump
        };
        let change_pct = change * 100.0;

        Some(SpikeSignal::new(
            signal_type,
            entity_id,
            change_pct,
            now_ms,
            SignalMetadata::new(
                SignalDetail::PriceMove {
                    baseline,
                    current,
                    change_pct,
                },
                format!("{entity_id} price {change_pct:+.2}% ({baseline} -> {current})"),
            ),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rel(baseline: f64, current: f64) -> Measurement {
        Measurement::Relative {
            baseline,
            current,
            change: (current - baseline) / baseline,
        }
    }

    #[test]
    fn positive_change_is_pump_with_percent_value() {
        let s = PriceRule
            .classify("BTC", &rel(100.0, 109.0), DEFAULT_THRESHOLD, 42)
            .unwrap();

        assert_eq!(s.signal_type, SignalType::PricePump);
        assert!((s.value - 9.0).abs() < 1e-9);
        assert_eq!(s.timestamp_ms, 42);
        assert_eq!(s.entity_id, "BTC");
    }

    #[test]
    fn negative_change_is_dump() {
        let s = PriceRule
            .classify("ETH", &rel(100.0, 90.0), DEFAULT_THRESHOLD, 0)
            .unwrap();

        assert_eq!(s.signal_type, SignalType::PriceDump);
        assert!((s.value + 10.0).abs() < 1e-9);
        assert!(matches!(s.metadata.detail, SignalDetail::PriceMove { .. }));
    }

    #[test]
    fn ignores_magnitude_measurements() {
        let m = Measurement::Magnitude {
            total: 1.0,
            split: None,
        };
        assert!(PriceRule.classify("BTC", &m, DEFAULT_THRESHOLD, 0).is_none());
    }
}
