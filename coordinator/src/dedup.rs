use std::collections::HashSet;

use common::time::{MINUTE_MS, minute_bucket};

/// `(entity, minute bucket)` keys of alerts already dispatched.
#[derive(Debug, Default)]
pub struct AlertDedup {
    keys: HashSet<(String, u64)>,
}

impl AlertDedup {
    /// Marks the key for `now_ms`. Returns `false` if it was already marked.
    pub fn try_mark(&mut self, entity_id: &str, now_ms: u64) -> bool {
        self.keys.insert((entity_id.to_string(), minute_bucket(now_ms)))
    }

    /// Evicts keys whose bucket started before `cutoff_ms`.
    pub fn evict_before(&mut self, cutoff_ms: u64) -> usize {
        let before = self.keys.len();
        self.keys
            .retain(|(_, bucket)| bucket.saturating_mul(MINUTE_MS) >= cutoff_ms);
        before - self.keys.len()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}
