//! Application root.
//!
//! Owns every long-lived component and is the only place they are wired
//! together:
//!
//! sources → monitors → coordinator → alert queue → dispatcher → notifier
//!
//! Outer layers (binary, HTTP surface, tests) talk to an [`App`] only.

use std::sync::Arc;
use std::time::Duration;

use common::time::now_ms;
use coordinator::{
    AlertDispatcher, CoordinatorStatus, Counters, Notifier, SpikeCoordinator, alert_channel,
};
use corelib::SignalSink;
use futures::future::join_all;
use monitor::{
    LiquidationRule, MetricSource, MonitorHandle, MonitorStatus, PriceRule, SocialRule,
    SpikeMonitor,
};
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval, timeout};
use tracing::{Instrument, debug, info, info_span, warn};

use crate::config::AppConfig;
use crate::error::AppError;
use crate::notify::{LogNotifier, WebhookNotifier};
use crate::sources::HttpMetricSource;

const DISPATCH_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Clone, Debug, Serialize)]
pub struct AppStatus {
    pub coordinator: CoordinatorStatus,
    pub monitors: Vec<MonitorStatus>,
}

struct Background {
    stop_tx: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
}

pub struct App {
    coordinator: Arc<SpikeCoordinator>,
    monitors: Vec<Arc<dyn MonitorHandle>>,

    sweep_interval: Duration,
    status_log_interval: Duration,

    background: Mutex<Option<Background>>,
    dispatcher: JoinHandle<()>,
}

impl App {
    /// Production wiring: HTTP sources and the configured notifier.
    pub fn from_config(cfg: &AppConfig) -> Result<Self, AppError> {
        let price = Arc::new(HttpMetricSource::new(
            cfg.price.source_url.clone(),
            cfg.price.monitor.fetch_timeout,
        )?);
        let liquidation = Arc::new(HttpMetricSource::new(
            cfg.liquidation.source_url.clone(),
            cfg.liquidation.monitor.fetch_timeout,
        )?);
        let social = Arc::new(HttpMetricSource::new(
            cfg.social.source_url.clone(),
            cfg.social.monitor.fetch_timeout,
        )?);

        let notifier: Arc<dyn Notifier> = match &cfg.webhook_url {
            Some(url) => {
                info!(url = %url, "alerts go to webhook");
                Arc::new(WebhookNotifier::new(url.clone())?)
            }
            None => {
                info!("no webhook configured; alerts are logged only");
                Arc::new(LogNotifier)
            }
        };

        Self::assemble(cfg, price, liquidation, social, notifier)
    }

    /// Wires the components around the given sources and notifier.
    ///
    /// Spawns the dispatcher task, so it must run inside a tokio runtime.
    /// Monitors are created stopped.
    pub fn assemble<P, L, S>(
        cfg: &AppConfig,
        price: Arc<P>,
        liquidation: Arc<L>,
        social: Arc<S>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self, AppError>
    where
        P: MetricSource,
        L: MetricSource,
        S: MetricSource,
    {
        let counters = Counters::default();
        let (alert_tx, alert_rx) = alert_channel(cfg.coordinator.queue_capacity);

        let coordinator = Arc::new(SpikeCoordinator::new(
            cfg.coordinator.clone(),
            alert_tx,
            counters.clone(),
        )?);

        let dispatcher = tokio::spawn(
            AlertDispatcher::new(notifier, counters)
                .run(alert_rx)
                .instrument(info_span!("dispatcher")),
        );

        let sink: Arc<dyn SignalSink> = coordinator.clone();

        let price: Arc<dyn MonitorHandle> =
            SpikeMonitor::new(cfg.price.monitor.clone(), price, PriceRule, sink.clone())?;
        let liquidation: Arc<dyn MonitorHandle> = SpikeMonitor::new(
            cfg.liquidation.monitor.clone(),
            liquidation,
            LiquidationRule,
            sink.clone(),
        )?;
        let social: Arc<dyn MonitorHandle> = SpikeMonitor::new(
            cfg.social.monitor.clone(),
            social,
            SocialRule::new(cfg.social_cooldown),
            sink,
        )?;

        info!(
            watchlist = ?cfg.watchlist,
            correlation_window_s = cfg.coordinator.correlation_window.as_secs(),
            "application assembled"
        );

        Ok(Self {
            coordinator,
            monitors: vec![price, liquidation, social],
            sweep_interval: cfg.sweep_interval,
            status_log_interval: cfg.status_log_interval,
            background: Mutex::new(None),
            dispatcher,
        })
    }

    pub fn coordinator(&self) -> &Arc<SpikeCoordinator> {
        &self.coordinator
    }

    pub fn monitor(&self, name: &str) -> Option<&Arc<dyn MonitorHandle>> {
        self.monitors.iter().find(|m| m.name() == name)
    }

    // =========================
    // Control
    // =========================

    /// Starts every monitor that is not running, plus the sweep and status
    /// tasks. Safe to call again to restart monitors that terminated.
    pub fn start_all(&self) {
        for m in &self.monitors {
            if Arc::clone(m).start() {
                info!(monitor = m.name(), "monitor started");
            }
        }

        let mut background = self.background.lock();
        if background.is_some() {
            return;
        }

        let (stop_tx, stop_rx) = watch::channel(false);

        let coordinator = self.coordinator.clone();
        let sweeper = spawn_periodic("sweep", self.sweep_interval, stop_rx.clone(), move || {
            coordinator.sweep(now_ms());
        });

        let coordinator = self.coordinator.clone();
        let monitors = self.monitors.clone();
        let status_logger =
            spawn_periodic("status_log", self.status_log_interval, stop_rx, move || {
                log_status(&snapshot(&coordinator, &monitors));
            });

        *background = Some(Background {
            stop_tx,
            tasks: vec![sweeper, status_logger],
        });
    }

    /// Stops all monitors cooperatively, then the background tasks.
    pub async fn stop_all(&self) {
        join_all(self.monitors.iter().map(|m| m.stop())).await;

        let background = self.background.lock().take();
        if let Some(Background { stop_tx, tasks }) = background {
            let _ = stop_tx.send(true);
            for task in tasks {
                if let Err(e) = task.await {
                    warn!(error = %e, "background task ended abnormally");
                }
            }
        }

        info!("all monitors stopped");
    }

    /// Stops everything and gives queued alerts a bounded chance to go out.
    pub async fn shutdown(self) {
        self.stop_all().await;

        let Self {
            coordinator,
            monitors,
            dispatcher,
            ..
        } = self;

        // The dispatcher exits once the last alert sender, owned by the
        // coordinator, is gone.
        drop(monitors);
        drop(coordinator);

        match timeout(DISPATCH_DRAIN_TIMEOUT, dispatcher).await {
            Ok(Ok(())) => info!("alert queue drained"),
            Ok(Err(e)) => warn!(error = %e, "dispatcher task ended abnormally"),
            Err(_) => warn!("alert queue not drained before shutdown deadline"),
        }
    }

    pub fn update_watchlist(&self, entity_ids: Vec<String>) {
        for m in &self.monitors {
            m.update_watchlist(entity_ids.clone());
        }
    }

    pub fn status(&self) -> AppStatus {
        snapshot(&self.coordinator, &self.monitors)
    }
}

fn snapshot(coordinator: &SpikeCoordinator, monitors: &[Arc<dyn MonitorHandle>]) -> AppStatus {
    AppStatus {
        coordinator: coordinator.status(),
        monitors: monitors.iter().map(|m| m.status()).collect(),
    }
}

fn log_status(status: &AppStatus) {
    match serde_json::to_string(status) {
        Ok(json) => info!(status = %json, "status"),
        Err(e) => warn!(error = %e, "status serialization failed"),
    }
}

/// Runs `job` every `every` until `stop_rx` flips or its sender is dropped.
/// The first run happens one period after spawning.
fn spawn_periodic<F>(
    label: &'static str,
    every: Duration,
    mut stop_rx: watch::Receiver<bool>,
    mut job: F,
) -> JoinHandle<()>
where
    F: FnMut() + Send + 'static,
{
    tokio::spawn(
        async move {
            let mut ticker = interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            ticker.tick().await;

            loop {
                tokio::select! {
                    biased;
                    _ = stop_rx.changed() => break,
                    _ = ticker.tick() => job(),
                }
            }

            debug!("background task stopped");
        }
        .instrument(info_span!("background", task = label)),
    )
}
