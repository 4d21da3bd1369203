//! Alert delivery.
//!
//! The coordinator never calls a notifier itself. Accepted alerts are queued
//! on a bounded channel and a single [`AlertDispatcher`] task drains it,
//! calling [`Notifier::send`] once per alert.

use std::sync::Arc;

use async_trait::async_trait;
use common::time::format_ms;
use corelib::CorrelatedSpike;
use tokio::sync::mpsc::{self, Receiver, Sender};
use tracing::{debug, error, info, warn};

use crate::counters::Counters;
use crate::error::DispatchError;

/// Delivery channel for rendered alert text. Best effort, one attempt.
#[async_trait]
pub trait Notifier: Send + Sync + 'static {
    async fn send(&self, message: &str) -> anyhow::Result<()>;
}

/// One accepted alert on its way to the notifier.
#[derive(Clone, Debug)]
pub struct AlertEvent {
    pub alert: CorrelatedSpike,
}

pub fn alert_channel(capacity: usize) -> (Sender<AlertEvent>, Receiver<AlertEvent>) {
    mpsc::channel(capacity.max(1))
}

/// One-line alert text.
pub fn render_alert(alert: &CorrelatedSpike) -> String {
    format!("spike alert {alert} at {}", format_ms(alert.timestamp_ms))
}

pub struct AlertDispatcher {
    notifier: Arc<dyn Notifier>,
    counters: Counters,
}

impl AlertDispatcher {
    pub fn new(notifier: Arc<dyn Notifier>, counters: Counters) -> Self {
        Self { notifier, counters }
    }

    /// Drains `rx` until every sender is gone.
    pub async fn run(self, mut rx: Receiver<AlertEvent>) {
        info!(component = "dispatcher", "alert dispatcher started");

        while let Some(event) = rx.recv().await {
            let entity = event.alert.entity_id.clone();
            let message = render_alert(&event.alert);

            match self.notifier.send(&message).await {
                Ok(()) => {
                    Counters::incr(&self.counters.alerts_delivered);
                    debug!(entity = %entity, "alert delivered");
                }
                Err(source) => {
                    Counters::incr(&self.counters.dispatch_failures);
                    let err = DispatchError::Notifier { entity, source };
                    error!(error = ?err, "notifier failed; alert dropped");
                }
            }
        }

        warn!(component = "dispatcher", "alert channel closed");
    }
}
