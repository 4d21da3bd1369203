//! Spike coordinator.
//!
//! The single ingress for spike signals from all monitors. For each signal:
//! buffer it under its entity, prune the buffer to the correlation window,
//! score it against what remains, and for HIGH/EXTREME results dispatch at
//! most one alert per (entity, minute).
//!
//! Buffer mutation and scoring happen under one coordinator-wide lock. The
//! alert hand-off is a non-blocking channel send made after the lock is
//! released; delivery happens on the dispatcher task.

use common::time::{format_ms, now_ms};
use corelib::{CorrelatedSpike, SignalSink, SpikeSignal};
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::mpsc::Sender;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, error, info, instrument};

use crate::buffer::SignalBuffers;
use crate::config::CoordinatorConfig;
use crate::correlation::correlate;
use crate::counters::Counters;
use crate::dedup::AlertDedup;
use crate::dispatch::AlertEvent;
use crate::error::{CoordinatorError, DispatchError};
use crate::status::CoordinatorStatus;

#[derive(Debug, Default)]
struct CoordinatorState {
    buffers: SignalBuffers,
    dedup: AlertDedup,
}

/// What a sweep removed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub expired_signals: usize,
    pub dropped_entities: usize,
    pub evicted_keys: usize,
}

pub struct SpikeCoordinator {
    config: CoordinatorConfig,
    state: Mutex<CoordinatorState>,
    alerts: Sender<AlertEvent>,
    counters: Counters,
}

impl SpikeCoordinator {
    /// `alerts` feeds the dispatcher task; `counters` is shared with it.
    pub fn new(
        config: CoordinatorConfig,
        alerts: Sender<AlertEvent>,
        counters: Counters,
    ) -> Result<Self, CoordinatorError> {
        config.validate()?;
        Ok(Self {
            config,
            state: Mutex::new(CoordinatorState::default()),
            alerts,
            counters,
        })
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    pub fn counters(&self) -> &Counters {
        &self.counters
    }

    /// Registers `signal` as of `now_ms` and returns its correlation.
    #[instrument(
        level = "debug",
        skip(self, signal),
        fields(entity = %signal.entity_id, signal_type = %signal.signal_type)
    )]
    pub fn register_signal_at(&self, signal: SpikeSignal, now_ms: u64) -> CorrelatedSpike {
        let cutoff = now_ms.saturating_sub(self.config.window_ms());

        let (spike, accepted) = {
            let mut state = self.state.lock();

            let supporting = state.buffers.admit(signal.clone(), cutoff);
            let spike = correlate(signal, supporting, now_ms);

            let accepted = spike.confidence.is_alertable()
                && state.dedup.try_mark(&spike.entity_id, now_ms);

            (spike, accepted)
        };

        Counters::incr(&self.counters.correlated_computed);

        debug!(
            confidence = spike.confidence.as_str(),
            score = spike.score,
            direction = spike.direction.as_str(),
            signals = spike.signal_count(),
            "correlation computed"
        );

        if !spike.confidence.is_alertable() {
            return spike;
        }

        if !accepted {
            Counters::incr(&self.counters.alerts_suppressed);
            info!(
                entity = %spike.entity_id,
                score = spike.score,
                "duplicate alert suppressed for this minute"
            );
            return spike;
        }

        self.dispatch(&spike);
        spike
    }

    fn dispatch(&self, spike: &CorrelatedSpike) {
        let event = AlertEvent {
            alert: spike.clone(),
        };

        match self.alerts.try_send(event) {
            Ok(()) => {
                Counters::incr(&self.counters.alerts_dispatched);
                info!(
                    entity = %spike.entity_id,
                    confidence = spike.confidence.as_str(),
                    score = spike.score,
                    direction = spike.direction.as_str(),
                    at = %format_ms(spike.timestamp_ms),
                    "correlated spike alert dispatched"
                );
            }
            Err(e) => {
                Counters::incr(&self.counters.dispatch_failures);
                let entity = spike.entity_id.clone();
                let err = match e {
                    TrySendError::Full(_) => DispatchError::QueueFull { entity },
                    TrySendError::Closed(_) => DispatchError::QueueClosed { entity },
                };
                error!(error = %err, "alert hand-off failed; dedup key kept");
            }
        }
    }

    /// Drops expired buffer entries and empty buffers, and evicts dedup keys
    /// older than the retention.
    pub fn sweep(&self, now_ms: u64) -> SweepReport {
        let window_cutoff = now_ms.saturating_sub(self.config.window_ms());
        let dedup_cutoff = now_ms.saturating_sub(self.config.retention_ms());

        let report = {
            let mut state = self.state.lock();
            let (expired_signals, dropped_entities) = state.buffers.prune_all(window_cutoff);
            let evicted_keys = state.dedup.evict_before(dedup_cutoff);
            SweepReport {
                expired_signals,
                dropped_entities,
                evicted_keys,
            }
        };

        if report != SweepReport::default() {
            debug!(?report, "coordinator sweep");
        }
        report
    }

    pub fn status_at(&self, now_ms: u64) -> CoordinatorStatus {
        let cutoff = now_ms.saturating_sub(self.config.window_ms());

        let (active_entities, total_buffered_signals, dedup_keys) = {
            let state = self.state.lock();
            let (entities, total) = state.buffers.live_counts(cutoff);
            (entities, total, state.dedup.len())
        };

        CoordinatorStatus {
            correlation_window_ms: self.config.window_ms(),
            active_entities,
            total_buffered_signals,
            correlated_spikes_computed: Counters::get(&self.counters.correlated_computed),
            alerts_dispatched: Counters::get(&self.counters.alerts_dispatched),
            alerts_suppressed: Counters::get(&self.counters.alerts_suppressed),
            alerts_delivered: Counters::get(&self.counters.alerts_delivered),
            dispatch_failures: Counters::get(&self.counters.dispatch_failures),
            dedup_keys,
        }
    }

    pub fn status(&self) -> CoordinatorStatus {
        self.status_at(now_ms())
    }
}

impl SignalSink for SpikeCoordinator {
    fn register_signal(&self, signal: SpikeSignal) {
        self.register_signal_at(signal, now_ms());
    }
}
