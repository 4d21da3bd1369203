use std::collections::VecDeque;

use corelib::MetricReading;

use crate::error::MonitorError;

/// Fixed-capacity, time-ordered readings for one entity of one monitor.
///
/// Invariants:
/// - timestamps are non-decreasing from front to back
/// - `len() <= capacity`; the oldest reading is evicted on overflow
#[derive(Debug, Clone)]
pub struct EntityHistory {
    readings: VecDeque<MetricReading>,
    capacity: usize,
}

impl EntityHistory {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(2);
        Self {
            readings: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Appends a reading, evicting the oldest one when full.
    /// Readings older than the latest stored one are rejected.
    pub fn push(&mut self, reading: MetricReading) -> Result<(), MonitorError> {
        if let Some(last) = self.readings.back() {
            if reading.timestamp_ms < last.timestamp_ms {
                return Err(MonitorError::OutOfOrder {
                    entity: reading.entity_id,
                    ts_ms: reading.timestamp_ms,
                    last_ms: last.timestamp_ms,
                });
            }
        }

        if self.readings.len() == self.capacity {
            self.readings.pop_front();
        }
        self.readings.push_back(reading);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn latest(&self) -> Option<&MetricReading> {
        self.readings.back()
    }

    pub fn oldest(&self) -> Option<&MetricReading> {
        self.readings.front()
    }

    pub fn iter(&self) -> impl Iterator<Item = &MetricReading> {
        self.readings.iter()
    }

    /// Reading the latest value is compared against.
    ///
    /// The oldest earlier reading still inside `[now - window, now]`. When no
    /// earlier reading is that recent, falls back to the oldest one held, so
    /// the first ticks after startup compare against whatever is available.
    /// `None` with fewer than two readings.
    pub fn baseline(&self, window_ms: u64, now_ms: u64) -> Option<&MetricReading> {
        if self.readings.len() < 2 {
            return None;
        }

        let cutoff = now_ms.saturating_sub(window_ms);
        self.readings
            .range(..self.readings.len() - 1)
            .find(|r| r.timestamp_ms >= cutoff)
            .or_else(|| self.readings.front())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn r(ts_ms: u64, value: f64) -> MetricReading {
        MetricReading::new("BTC", ts_ms, value)
    }

    #[test]
    fn evicts_oldest_on_overflow() {
        let mut h = EntityHistory::new(3);
        for i in 0..5 {
            h.push(r(i * 1_000, i as f64)).unwrap();
        }

        assert_eq!(h.len(), 3);
        assert_eq!(h.oldest().unwrap().value, 2.0);
        assert_eq!(h.latest().unwrap().value, 4.0);
    }

    #[test]
    fn rejects_out_of_order_reading() {
        let mut h = EntityHistory::new(4);
        h.push(r(2_000, 1.0)).unwrap();

        let err = h.push(r(1_000, 2.0)).unwrap_err();
        assert!(matches!(err, MonitorError::OutOfOrder { last_ms: 2_000, .. }));
        assert_eq!(h.len(), 1);
    }

    #[test]
    fn equal_timestamps_are_accepted() {
        let mut h = EntityHistory::new(4);
        h.push(r(1_000, 1.0)).unwrap();
        h.push(r(1_000, 2.0)).unwrap();
        assert_eq!(h.len(), 2);
    }

    #[test]
    fn baseline_requires_two_readings() {
        let mut h = EntityHistory::new(4);
        assert!(h.baseline(60_000, 0).is_none());
        h.push(r(0, 1.0)).unwrap();
        assert!(h.baseline(60_000, 0).is_none());
    }

    #[test]
    fn baseline_is_oldest_in_window_reading() {
        let mut h = EntityHistory::new(10);
        h.push(r(0, 90.0)).unwrap(); // outside window
        h.push(r(60_000, 100.0)).unwrap(); // oldest in window
        h.push(r(120_000, 105.0)).unwrap();
        h.push(r(300_000, 109.0)).unwrap(); // current

        let b = h.baseline(300_000, 300_000).unwrap();
        assert_eq!(b.value, 90.0, "reading at t=0 is exactly on the window edge");

        let b = h.baseline(240_000, 300_000).unwrap();
        assert_eq!(b.value, 100.0);
    }

    #[test]
    fn baseline_falls_back_to_oldest_when_nothing_recent() {
        let mut h = EntityHistory::new(10);
        h.push(r(0, 50.0)).unwrap();
        h.push(r(10_000, 60.0)).unwrap();
        h.push(r(900_000, 70.0)).unwrap(); // current, long gap

        let b = h.baseline(60_000, 900_000).unwrap();
        assert_eq!(b.value, 50.0);
    }

    #[test]
    fn baseline_never_returns_current_reading() {
        let mut h = EntityHistory::new(10);
        h.push(r(0, 1.0)).unwrap();
        h.push(r(1_000, 2.0)).unwrap();

        let b = h.baseline(60_000, 1_000).unwrap();
        assert_eq!(b.timestamp_ms, 0);
    }
}
