use std::sync::Arc;

use async_trait::async_trait;

use crate::status::MonitorStatus;

/// Type-erased control surface of a running monitor, so the application root
/// can hold price, liquidation and social monitors side by side.
#[async_trait]
pub trait MonitorHandle: Send + Sync + 'static {
    fn name(&self) -> &str;

    /// Spawns the polling loop. Returns `false` if it is already running.
    fn start(self: Arc<Self>) -> bool;

    /// Requests cancellation and waits for the in-flight tick to finish.
    async fn stop(&self);

    fn update_watchlist(&self, entity_ids: Vec<String>);

    fn status(&self) -> MonitorStatus;
}
