//! Social-volume rule
//!
//! Relative change of social-attention volume. Both directions qualify and
//! both map to SOCIAL_SPIKE; the signed percent is kept as the value.
//!
//! Unlike price and liquidation, this rule applies its own cooldown keyed by
//! (entity, severity): a crossing in the same severity bucket is suppressed
//! until `cooldown` has elapsed since the last emitted one. Moving into a
//! different bucket emits immediately.

use std::collections::HashMap;
use std::time::Duration;

use corelib::{Severity, SignalDetail, SignalMetadata, SignalType, SpikeSignal};
use tracing::debug;

use super::{Measurement, SpikeRule, ThresholdMode};
use crate::config::{CombineMode, MonitorConfig};

pub const DEFAULT_THRESHOLD: f64 = 1.0;
pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(30 * 60);

#[derive(Debug)]
pub struct SocialRule {
    cooldown_ms: u64,
    /// Last emission time per (entity, severity).
    last_emitted: HashMap<(String, Severity), u64>,
}

impl SocialRule {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown_ms: cooldown.as_millis() as u64,
            last_emitted: HashMap::new(),
        }
    }

    pub fn default_config(watchlist: Vec<String>) -> MonitorConfig {
        MonitorConfig {
            name: "social".into(),
            interval: Duration::from_secs(5 * 60),
            fetch_timeout: Duration::from_secs(30),
            threshold: DEFAULT_THRESHOLD,
            window: Duration::from_secs(60 * 60),
            history_capacity: 48,
            watchlist,
            combine: CombineMode::PerEntity,
        }
    }

    fn in_cooldown(&self, key: &(String, Severity), now_ms: u64) -> bool {
        self.last_emitted
            .get(key)
            .is_some_and(|last| now_ms.saturating_sub(*last) < self.cooldown_ms)
    }
}

impl Default for SocialRule {
    fn default() -> Self {
        Self::new(DEFAULT_COOLDOWN)
    }
}

impl SpikeRule for SocialRule {
    fn mode(&self) -> ThresholdMode {
        ThresholdMode::Relative
    }

    fn classify(
        &mut self,
        entity_id: &str,
        measurement: &Measurement,
        threshold: f64,
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

        let severity = Severity::classify(change, threshold);
        let key = (entity_id.to_string(), severity);

        if self.in_cooldown(&key, now_ms) {
            debug!(entity = %entity_id, ?severity, "social spike suppressed by cooldown");
            return None;
        }

        let cooldown_ms = self.cooldown_ms;
        self.last_emitted
            .retain(|_, last| now_ms.saturating_sub(*last) < cooldown_ms);
        self.last_emitted.insert(key, now_ms);

        let change_pct = change * 100.0;

        Some(SpikeSignal::new(
            SignalType::SocialSpike,
            entity_id,
            change_pct,
            now_ms,
            SignalMetadata::new(
                SignalDetail::SocialVolume {
                    baseline,
                    current,
                    change_pct,
                    severity,
                },
                format!("{entity_id} social volume {change_pct:+.0}% ({severity:?})"),
            ),
        ))
    }
}
