//! Per-kind threshold logic.
//!
//! The engine owns polling, history and qualification; a rule only decides
//! what a qualifying measurement *means* (signal type, payload, cooldowns).

pub mod liquidation;
pub mod price;
pub mod social;

use corelib::{SpikeSignal, VolumeSplit};

use crate::error::MonitorError;
use crate::history::EntityHistory;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ThresholdMode {
    /// `(current - baseline) / baseline`, qualifies in either direction.
    Relative,
    /// Raw value of the current reading, qualifies only above the threshold.
    Magnitude,
}

/// Change metric computed from an entity history.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Measurement {
    Relative {
        baseline: f64,
        current: f64,
        change: f64,
    },
    Magnitude {
        total: f64,
        split: Option<VolumeSplit>,
    },
}

impl Measurement {
    /// Computes the change metric for the latest reading in `history`.
    pub fn from_history(
        history: &EntityHistory,
        mode: ThresholdMode,
        window_ms: u64,
        now_ms: u64,
    ) -> Result<Self, MonitorError> {
        let (Some(current), Some(baseline)) =
            (history.latest(), history.baseline(window_ms, now_ms))
        else {
            return Err(MonitorError::InsufficientData {
                entity: history
                    .latest()
                    .map(|r| r.entity_id.clone())
                    .unwrap_or_default(),
                have: history.len(),
            });
        };

        match mode {
            ThresholdMode::Relative => {
                if baseline.value == 0.0 {
                    return Err(MonitorError::Compute {
                        entity: current.entity_id.clone(),
                        reason: "baseline is zero".into(),
                    });
                }

                let change = (current.value - baseline.value) / baseline.value;
                if !change.is_finite() {
                    return Err(MonitorError::Compute {
                        entity: current.entity_id.clone(),
                        reason: format!("non-finite change from {} to {}", baseline.value, current.value),
                    });
                }

                Ok(Measurement::Relative {
                    baseline: baseline.value,
                    current: current.value,
                    change,
                })
            }
            ThresholdMode::Magnitude => Ok(Measurement::Magnitude {
                total: current.value,
                split: current.split,
            }),
        }
    }

    /// The number compared against the threshold.
    pub fn metric(&self) -> f64 {
        match self {
            Measurement::Relative { change, .. } => *change,
            Measurement::Magnitude { total, .. } => *total,
        }
    }

    pub fn qualifies(&self, threshold: f64) -> bool {
        match self {
            Measurement::Relative { change, .. } => change.abs() >= threshold,
            Measurement::Magnitude { total, .. } => *total > threshold,
        }
    }
}

/// Turns a qualifying measurement into a signal.
///
/// `classify` is only called once the engine has established that
/// `measurement.qualifies(threshold)`. Returning `None` drops the crossing
/// (e.g. cooldown, or a subtype that cannot be determined).
pub trait SpikeRule: Send + 'static {
    fn mode(&self) -> ThresholdMode;

    fn classify(
        &mut self,
        entity_id: &str,
        measurement: &Measurement,
        threshold: f64,
        now_ms: u64,
    ) -> Option<SpikeSignal>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use corelib::MetricReading;

    fn history(points: &[(u64, f64)]) -> EntityHistory {
        let mut h = EntityHistory::new(16);
        for (ts, v) in points {
            h.push(MetricReading::new("BTC", *ts, *v)).unwrap();
        }
        h
    }

    #[test]
    fn relative_change_uses_oldest_in_window_baseline() {
        let h = history(&[(0, 100.0), (60_000, 104.0), (120_000, 109.0)]);
        let m = Measurement::from_history(&h, ThresholdMode::Relative, 300_000, 120_000).unwrap();

        match m {
            Measurement::Relative { baseline, change, .. } => {
                assert_eq!(baseline, 100.0);
                assert!((change - 0.09).abs() < 1e-12);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(m.qualifies(0.08));
        assert!(!m.qualifies(0.10));
    }

    #[test]
    fn relative_qualifies_in_both_directions() {
        let h = history(&[(0, 100.0), (1_000, 91.0)]);
        let m = Measurement::from_history(&h, ThresholdMode::Relative, 300_000, 1_000).unwrap();
        assert!((m.metric() + 0.09).abs() < 1e-12);
        assert!(m.qualifies(0.08));
    }

    #[test]
    fn threshold_is_inclusive_for_relative() {
        let h = history(&[(0, 100.0), (1_000, 150.0)]);
        let m = Measurement::from_history(&h, ThresholdMode::Relative, 300_000, 1_000).unwrap();
        assert_eq!(m.metric(), 0.5);
        assert!(m.qualifies(0.5));
    }

    #[test]
    fn magnitude_is_strictly_above_threshold() {
        let h = history(&[(0, 5.0), (1_000, 20.0)]);
        let m = Measurement::from_history(&h, ThresholdMode::Magnitude, 300_000, 1_000).unwrap();
        assert_eq!(m.metric(), 20.0);
        assert!(!m.qualifies(20.0));
        assert!(m.qualifies(19.9));
    }

    #[test]
    fn single_reading_is_insufficient() {
        let h = history(&[(0, 100.0)]);
        let err = Measurement::from_history(&h, ThresholdMode::Relative, 300_000, 0).unwrap_err();
        assert_eq!(
            err,
            MonitorError::InsufficientData {
                entity: "BTC".into(),
                have: 1
            }
        );
    }

    #[test]
    fn zero_baseline_is_a_compute_error() {
        let h = history(&[(0, 0.0), (1_000, 5.0)]);
        let err = Measurement::from_history(&h, ThresholdMode::Relative, 300_000, 1_000).unwrap_err();
        assert!(matches!(err, MonitorError::Compute { .. }));
    }
}
