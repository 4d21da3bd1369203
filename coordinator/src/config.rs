use std::time::Duration;

use crate::error::CoordinatorError;

pub const DEFAULT_CORRELATION_WINDOW: Duration = Duration::from_secs(15 * 60);
pub const DEFAULT_QUEUE_CAPACITY: usize = 64;

#[derive(Clone, Debug)]
pub struct CoordinatorConfig {
    /// Signals for one entity older than this are no longer correlated.
    pub correlation_window: Duration,

    /// How long a dedup key survives a sweep.
    pub dedup_retention: Duration,

    /// Bounded hand-off between registration and the notifier task.
    pub queue_capacity: usize,
}

impl CoordinatorConfig {
    pub fn with_window(correlation_window: Duration) -> Self {
        Self {
            correlation_window,
            dedup_retention: correlation_window * 3,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }

    pub fn validate(&self) -> Result<(), CoordinatorError> {
        if self.correlation_window.is_zero() {
            return Err(CoordinatorError::ZeroWindow);
        }
        if self.dedup_retention < self.correlation_window {
            return Err(CoordinatorError::RetentionTooShort {
                retention: self.dedup_retention,
                window: self.correlation_window,
            });
        }
        if self.queue_capacity == 0 {
            return Err(CoordinatorError::ZeroQueueCapacity);
        }
        Ok(())
    }

    pub fn window_ms(&self) -> u64 {
        self.correlation_window.as_millis() as u64
    }

    pub fn retention_ms(&self) -> u64 {
        self.dedup_retention.as_millis() as u64
    }
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self::with_window(DEFAULT_CORRELATION_WINDOW)
    }
}
