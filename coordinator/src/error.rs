use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum CoordinatorError {
    #[error("correlation window must be positive")]
    ZeroWindow,

    #[error("dedup retention {retention:?} is shorter than the correlation window {window:?}")]
    RetentionTooShort { retention: Duration, window: Duration },

    #[error("dispatch queue capacity must be positive")]
    ZeroQueueCapacity,
}

/// Failure to hand an accepted alert to the notifier task, or of the
/// notifier itself. Logged and counted; never retried.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("alert queue full; alert for {entity} dropped")]
    QueueFull { entity: String },

    #[error("alert queue closed; alert for {entity} dropped")]
    QueueClosed { entity: String },

    #[error("notifier failed for {entity}")]
    Notifier {
        entity: String,
        #[source]
        source: anyhow::Error,
    },
}
