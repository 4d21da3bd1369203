use std::collections::HashMap;

use corelib::SpikeSignal;

/// Recent signals per entity.
///
/// Invariant after any mutating call: no buffered entry is older than the
/// cutoff it was pruned with, and no entity maps to an empty list.
#[derive(Debug, Default)]
pub struct SignalBuffers {
    by_entity: HashMap<String, Vec<SpikeSignal>>,
}

impl SignalBuffers {
    /// Prunes `entity_id` to `cutoff_ms`, returns the surviving signals,
    /// then buffers `signal` if it is itself inside the window.
    pub fn admit(&mut self, signal: SpikeSignal, cutoff_ms: u64) -> Vec<SpikeSignal> {
        let entity_id = signal.entity_id.clone();
        let buffer = self.by_entity.entry(entity_id.clone()).or_default();

        buffer.retain(|s| s.timestamp_ms >= cutoff_ms);
        let supporting = buffer.clone();

        if signal.timestamp_ms >= cutoff_ms {
            buffer.push(signal);
        }
        if buffer.is_empty() {
            self.by_entity.remove(&entity_id);
        }

        supporting
    }

    /// Drops expired entries everywhere. Returns (signals, entities) removed.
    pub fn prune_all(&mut self, cutoff_ms: u64) -> (usize, usize) {
        let mut expired = 0;
        for buffer in self.by_entity.values_mut() {
            let before = buffer.len();
            buffer.retain(|s| s.timestamp_ms >= cutoff_ms);
            expired += before - buffer.len();
        }

        let before = self.by_entity.len();
        self.by_entity.retain(|_, b| !b.is_empty());
        (expired, before - self.by_entity.len())
    }

    /// In-window view without mutating: (entities with signals, total signals).
    pub fn live_counts(&self, cutoff_ms: u64) -> (usize, usize) {
        self.by_entity
            .values()
            .map(|b| b.iter().filter(|s| s.timestamp_ms >= cutoff_ms).count())
            .filter(|n| *n > 0)
            .fold((0, 0), |(entities, total), n| (entities + 1, total + n))
    }

    pub fn get(&self, entity_id: &str) -> Option<&[SpikeSignal]> {
        self.by_entity.get(entity_id).map(Vec::as_slice)
    }
}
