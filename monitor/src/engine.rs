//! Spike monitor engine.
//!
//! One [`SpikeMonitor`] per metric kind. It:
//!   • polls its [`MetricSource`] for every watched entity on a fixed interval
//!   • keeps a bounded [`EntityHistory`] per entity
//!   • measures the change against a baseline and checks the threshold
//!   • lets its [`SpikeRule`] classify qualifying crossings
//!   • forwards the resulting signals to the [`SignalSink`]
//!
//! Per-entity failures (fetch error, timeout, insufficient data, bad values)
//! are logged and skip only that entity for the tick. A panic escaping a tick
//! terminates the loop; `status().running` turns false and the monitor must
//! be started again from outside.
//!
//! The monitor is an Arc-managed service so its loop task can own a handle
//! to it while the application root keeps another.

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use common::logger::{TraceId, tick_span, warn_if_slow};
use common::time::now_ms;
use corelib::{MetricReading, SignalSink, SpikeSignal, VolumeSplit};
use futures::FutureExt;
use futures::future::join_all;
use parking_lot::{Mutex, RwLock};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval, timeout};
use tracing::{Instrument, Span, debug, error, info, warn};

use crate::config::{CombineMode, MonitorConfig, normalize_watchlist};
use crate::control::MonitorHandle;
use crate::error::{FetchError, MonitorError};
use crate::history::EntityHistory;
use crate::rules::{Measurement, SpikeRule};
use crate::source::{MetricSource, Sample};
use crate::status::MonitorStatus;

/// Outcome of a single tick.
#[derive(Clone, Debug, Default)]
pub struct TickReport {
    /// Entities on the watchlist when the tick began.
    pub polled: usize,
    /// Successful readings appended to history.
    pub readings: usize,
    /// Entities whose fetch failed or timed out.
    pub failed: usize,
    /// Entities (including the aggregate) skipped for any other reason.
    pub skipped: usize,
    /// Signals forwarded to the sink.
    pub emitted: Vec<SpikeSignal>,
}

struct MonitorState<R> {
    histories: HashMap<String, EntityHistory>,
    rule: R,
}

struct LoopHandle {
    stop_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

pub struct SpikeMonitor<S, R> {
    config: MonitorConfig,
    source: Arc<S>,
    sink: Arc<dyn SignalSink>,

    /// Histories and rule state. Never held across an await.
    state: Mutex<MonitorState<R>>,
    watchlist: RwLock<Vec<String>>,

    running: AtomicBool,
    alerts_emitted: AtomicU64,
    last_tick_ms: Mutex<Option<u64>>,
    last_error: Mutex<Option<String>>,

    control: Mutex<Option<LoopHandle>>,
}

impl<S: MetricSource, R: SpikeRule> SpikeMonitor<S, R> {
    pub fn new(
        mut config: MonitorConfig,
        source: Arc<S>,
        rule: R,
        sink: Arc<dyn SignalSink>,
    ) -> Result<Arc<Self>, MonitorError> {
        config.validate()?;

        let watchlist = std::mem::take(&mut config.watchlist);
        let watchlist = Self::clean_watchlist(&config.combine, watchlist);

        Ok(Arc::new(Self {
            config,
            source,
            sink,
            state: Mutex::new(MonitorState {
                histories: HashMap::new(),
                rule,
            }),
            watchlist: RwLock::new(watchlist),
            running: AtomicBool::new(false),
            alerts_emitted: AtomicU64::new(0),
            last_tick_ms: Mutex::new(None),
            last_error: Mutex::new(None),
            control: Mutex::new(None),
        }))
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    pub fn watchlist(&self) -> Vec<String> {
        self.watchlist.read().clone()
    }

    /// Copy of the stored readings for one entity.
    pub fn history(&self, entity_id: &str) -> Option<Vec<MetricReading>> {
        self.state
            .lock()
            .histories
            .get(entity_id)
            .map(|h| h.iter().cloned().collect())
    }

    // =========================
    // Control
    // =========================

    /// Spawns the polling loop on the current runtime.
    ///
    /// Returns `false` when a loop is already running. A loop that ended on a
    /// fatal error can be started again.
    pub fn start(self: &Arc<Self>) -> bool {
        let mut control = self.control.lock();

        if self.running.load(Ordering::SeqCst) {
            debug!(monitor = %self.config.name, "start ignored; already running");
            return false;
        }

        let (stop_tx, stop_rx) = watch::channel(false);
        self.running.store(true, Ordering::SeqCst);
        *self.last_error.lock() = None;

        let span = tracing::info_span!("monitor_loop", monitor = %self.config.name);
        let task = tokio::spawn(Arc::clone(self).run(stop_rx).instrument(span));

        *control = Some(LoopHandle { stop_tx, task });
        true
    }

    /// Signals cancellation and waits until the loop has exited.
    /// An in-flight tick always completes first.
    pub async fn stop(&self) {
        let handle = self.control.lock().take();
        let Some(LoopHandle { stop_tx, task }) = handle else {
            return;
        };

        // Err only when the loop already exited on its own.
        let _ = stop_tx.send(true);

        if let Err(e) = task.await {
            warn!(monitor = %self.config.name, error = %e, "monitor task ended abnormally");
        }

        // A start() racing this stop owns the slot now; its flag stays set.
        let control = self.control.lock();
        if control.is_none() {
            self.running.store(false, Ordering::SeqCst);
        }
        drop(control);

        info!(monitor = %self.config.name, "monitor stopped");
    }

    /// Replaces the watchlist. Histories of entities no longer watched are
    /// dropped; the aggregate entity's history is kept.
    pub fn update_watchlist(&self, entity_ids: Vec<String>) {
        let list = Self::clean_watchlist(&self.config.combine, entity_ids);
        let entities = list.len();

        // evaluate() reads the list under the same lock.
        {
            let aggregate = self.config.combine.aggregate_entity();
            let mut state = self.state.lock();
            state
                .histories
                .retain(|id, _| list.contains(id) || Some(id.as_str()) == aggregate);
            *self.watchlist.write() = list;
        }

        info!(monitor = %self.config.name, entities, "watchlist updated");
    }

    pub fn status(&self) -> MonitorStatus {
        MonitorStatus {
            name: self.config.name.clone(),
            running: self.running.load(Ordering::SeqCst),
            interval_ms: self.config.interval.as_millis() as u64,
            threshold: self.config.threshold,
            window_ms: self.config.window_ms(),
            entities_tracked: self.state.lock().histories.len(),
            alerts_emitted: self.alerts_emitted.load(Ordering::Relaxed),
            last_tick_ms: *self.last_tick_ms.lock(),
            last_error: self.last_error.lock().clone(),
        }
    }

    // =========================
    // Loop
    // =========================

    async fn run(self: Arc<Self>, mut stop_rx: watch::Receiver<bool>) {
        let mut ticker = interval(self.config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            interval_ms = self.config.interval.as_millis() as u64,
            threshold = self.config.threshold,
            "monitor loop started"
        );

        loop {
            tokio::select! {
                biased;
                changed = stop_rx.changed() => {
                    if changed.is_err() || *stop_rx.borrow() {
                        break;
                    }
                    continue;
                }
                _ = ticker.tick() => {}
            }

            let tick = AssertUnwindSafe(self.tick_at(now_ms())).catch_unwind().await;

            if let Err(panic) = tick {
                let err = MonitorError::LoopFatal(panic_message(&*panic));
                error!(error = %err, "tick aborted; loop terminated, external restart required");
                *self.last_error.lock() = Some(err.to_string());
                break;
            }
        }

        self.running.store(false, Ordering::SeqCst);
        info!("monitor loop exited");
    }

    /// Runs one tick as of `now_ms`.
    ///
    /// The loop calls this with the wall clock; tests drive it directly.
    pub async fn tick_at(&self, now_ms: u64) -> TickReport {
        let span = tick_span(&self.config.name, TraceId::new());
        self.run_tick(now_ms).instrument(span).await
    }

    async fn run_tick(&self, now_ms: u64) -> TickReport {
        let entities = self.watchlist.read().clone();
        Span::current().record("entities", entities.len());

        // Fetches run concurrently; no lock is held while waiting on the source.
        let results = join_all(
            entities
                .iter()
                .map(|id| async move { (id.clone(), self.fetch_one(id).await) }),
        )
        .await;

        let mut report = TickReport {
            polled: entities.len(),
            ..TickReport::default()
        };

        let mut readings = Vec::with_capacity(results.len());
        for (entity, result) in results {
            match result {
                Ok(Some(sample)) if sample.value.is_finite() => {
                    readings.push(to_reading(entity, sample, now_ms));
                }
                Ok(Some(sample)) => {
                    report.skipped += 1;
                    self.log_entity_error(&MonitorError::Compute {
                        entity,
                        reason: format!("non-finite reading {}", sample.value),
                    });
                }
                Ok(None) => {
                    report.skipped += 1;
                    debug!(entity = %entity, "no data from source; skipped");
                }
                Err(source) => {
                    report.failed += 1;
                    self.log_entity_error(&MonitorError::Fetch { entity, source });
                }
            }
        }
        let emitted = self.evaluate(readings, now_ms, &mut report);

        for signal in &emitted {
            info!(
                entity = %signal.entity_id,
                signal_type = %signal.signal_type,
                value = signal.value,
                "spike detected"
            );
            self.sink.register_signal(signal.clone());
        }

        self.alerts_emitted
            .fetch_add(emitted.len() as u64, Ordering::Relaxed);
        *self.last_tick_ms.lock() = Some(now_ms);

        debug!(
            readings = report.readings,
            failed = report.failed,
            skipped = report.skipped,
            emitted = emitted.len(),
            "tick complete"
        );

        report.emitted = emitted;
        report
    }

    async fn fetch_one(&self, entity_id: &str) -> Result<Option<Sample>, FetchError> {
        let limit = self.config.fetch_timeout;
        let fetch = timeout(limit, self.source.fetch(entity_id));

        match warn_if_slow("metric_fetch", limit / 2, fetch).await {
            Ok(result) => result,
            Err(_) => Err(FetchError::Timeout(limit)),
        }
    }

    /// Appends readings and scores them under the state lock.
    /// Readings for entities unwatched since the tick began are discarded.
    fn evaluate(
        &self,
        readings: Vec<MetricReading>,
        now_ms: u64,
        report: &mut TickReport,
    ) -> Vec<SpikeSignal> {
        let mut state = self.state.lock();

        let readings: Vec<MetricReading> = {
            let watched = self.watchlist.read();
            readings
                .into_iter()
                .filter(|r| {
                    let keep = watched.contains(&r.entity_id);
                    if !keep {
                        report.skipped += 1;
                        debug!(entity = %r.entity_id, "entity unwatched during tick; reading dropped");
                    }
                    keep
                })
                .collect()
        };
        report.readings = readings.len();

        let aggregate = match &self.config.combine {
            CombineMode::WithAggregate {
                entity_id,
                threshold,
            } if !readings.is_empty() => {
                Some((aggregate_reading(entity_id, &readings, now_ms), *threshold))
            }
            _ => None,
        };

        let threshold = self.config.threshold;
        let mut signals = Vec::new();

        for (reading, threshold) in readings
            .into_iter()
            .map(|r| (r, threshold))
            .chain(aggregate)
        {
            match self.evaluate_reading(&mut state, reading, threshold, now_ms) {
                Ok(Some(signal)) => signals.push(signal),
                Ok(None) => {}
                Err(err) => {
                    report.skipped += 1;
                    self.log_entity_error(&err);
                }
            }
        }

        signals
    }

    fn evaluate_reading(
        &self,
        state: &mut MonitorState<R>,
        reading: MetricReading,
        threshold: f64,
        now_ms: u64,
    ) -> Result<Option<SpikeSignal>, MonitorError> {
        let entity = reading.entity_id.clone();
        let capacity = self.config.history_capacity;

        let history = state
            .histories
            .entry(entity.clone())
            .or_insert_with(|| EntityHistory::new(capacity));
        history.push(reading)?;

        let measurement = Measurement::from_history(
            history,
            state.rule.mode(),
            self.config.window_ms(),
            now_ms,
        )?;

        if !measurement.qualifies(threshold) {
            debug!(entity = %entity, metric = measurement.metric(), threshold, "below threshold");
            return Ok(None);
        }

        Ok(state.rule.classify(&entity, &measurement, threshold, now_ms))
    }

    fn log_entity_error(&self, err: &MonitorError) {
        match err {
            MonitorError::InsufficientData { entity, have } => {
                debug!(entity = %entity, have, "insufficient data; scoring skipped");
            }
            MonitorError::Fetch { entity, source } => {
                warn!(entity = %entity, error = %source, "fetch failed; entity skipped this tick");
            }
            other if other.is_entity_scoped() => {
                warn!(error = %other, "entity skipped this tick");
            }
            other => {
                error!(error = %other, "unexpected error while scoring entity");
            }
        }
    }

    fn clean_watchlist(combine: &CombineMode, ids: Vec<String>) -> Vec<String> {
        let aggregate = combine.aggregate_entity();
        normalize_watchlist(ids)
            .into_iter()
            .filter(|id| Some(id.as_str()) != aggregate)
            .collect()
    }
}

#[async_trait]
impl<S: MetricSource, R: SpikeRule> MonitorHandle for SpikeMonitor<S, R> {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn start(self: Arc<Self>) -> bool {
        SpikeMonitor::start(&self)
    }

    async fn stop(&self) {
        SpikeMonitor::stop(self).await
    }

    fn update_watchlist(&self, entity_ids: Vec<String>) {
        SpikeMonitor::update_watchlist(self, entity_ids)
    }

    fn status(&self) -> MonitorStatus {
        SpikeMonitor::status(self)
    }
}

fn to_reading(entity_id: String, sample: Sample, now_ms: u64) -> MetricReading {
    let reading = MetricReading::new(entity_id, now_ms, sample.value);
    match sample.split {
        Some(split) => reading.with_split(split),
        None => reading,
    }
}

/// Sums one tick's readings into the synthetic market-wide entity.
/// The side split is kept only when every contributing reading had one.
fn aggregate_reading(entity_id: &str, readings: &[MetricReading], now_ms: u64) -> MetricReading {
    let total: f64 = readings.iter().map(|r| r.value).sum();
    let reading = MetricReading::new(entity_id, now_ms, total);

    let splits: Vec<VolumeSplit> = readings.iter().filter_map(|r| r.split).collect();
    if splits.len() != readings.len() {
        return reading;
    }

    let long = splits.iter().map(|s| s.long).sum();
    let short = splits.iter().map(|s| s.short).sum();
    reading.with_split(VolumeSplit::new(long, short))
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use corelib::SignalType;
    use tracing_test::traced_test;

    use crate::rules::liquidation::LiquidationRule;
    use crate::rules::price::PriceRule;
    use crate::rules::social::SocialRule;

    const MIN: u64 = 60_000;

    /// Source answering from a mutable per-entity table.
    #[derive(Default)]
    struct TableSource {
        values: Mutex<HashMap<String, Result<Option<Sample>, FetchError>>>,
    }

    impl TableSource {
        fn set(&self, entity: &str, value: Result<Option<Sample>, FetchError>) {
            self.values.lock().insert(entity.to_string(), value);
        }
    }

    #[async_trait]
    impl MetricSource for TableSource {
        async fn fetch(&self, entity_id: &str) -> Result<Option<Sample>, FetchError> {
            self.values
                .lock()
                .get(entity_id)
                .cloned()
                .unwrap_or(Ok(None))
        }
    }

    #[derive(Default)]
    struct VecSink {
        signals: Mutex<Vec<SpikeSignal>>,
    }

    impl SignalSink for VecSink {
        fn register_signal(&self, signal: SpikeSignal) {
            self.signals.lock().push(signal);
        }
    }

    fn price_monitor(
        watch: &[&str],
    ) -> (
        Arc<SpikeMonitor<TableSource, PriceRule>>,
        Arc<TableSource>,
        Arc<VecSink>,
    ) {
        let source = Arc::new(TableSource::default());
        let sink = Arc::new(VecSink::default());
        let cfg = PriceRule::default_config(watch.iter().map(|s| s.to_string()).collect());
        let m = SpikeMonitor::new(cfg, source.clone(), PriceRule, sink.clone()).unwrap();
        (m, source, sink)
    }

    #[tokio::test]
    async fn emits_pump_when_change_crosses_threshold() {
        let (m, source, sink) = price_monitor(&["BTC"]);

        source.set("BTC", Ok(Some(Sample::value(100.0))));
        let r = m.tick_at(0).await;
        assert!(r.emitted.is_empty(), "first reading has no baseline");

        source.set("BTC", Ok(Some(Sample::value(104.0))));
        assert!(m.tick_at(MIN).await.emitted.is_empty());

        source.set("BTC", Ok(Some(Sample::value(109.0))));
        let r = m.tick_at(2 * MIN).await;

        assert_eq!(r.emitted.len(), 1);
        let s = &r.emitted[0];
        assert_eq!(s.signal_type, SignalType::PricePump);
        assert!((s.value - 9.0).abs() < 1e-9);
        assert_eq!(sink.signals.lock().len(), 1);
        assert_eq!(m.status().alerts_emitted, 1);
    }

    #[tokio::test]
    async fn emits_dump_on_large_drop() {
        let (m, source, _sink) = price_monitor(&["ETH"]);

        source.set("ETH", Ok(Some(Sample::value(200.0))));
        m.tick_at(0).await;
        source.set("ETH", Ok(Some(Sample::value(180.0))));
        let r = m.tick_at(MIN).await;

        assert_eq!(r.emitted[0].signal_type, SignalType::PriceDump);
    }

    #[tokio::test]
    async fn small_moves_emit_nothing() {
        let (m, source, sink) = price_monitor(&["BTC"]);

        for (i, p) in [100.0, 101.0, 99.0, 103.0].into_iter().enumerate() {
            source.set("BTC", Ok(Some(Sample::value(p))));
            m.tick_at(i as u64 * MIN).await;
        }

        assert!(sink.signals.lock().is_empty());
    }

    #[tokio::test]
    #[traced_test]
    async fn fetch_failure_skips_only_that_entity() {
        let (m, source, _sink) = price_monitor(&["BTC", "ETH"]);

        source.set("BTC", Ok(Some(Sample::value(100.0))));
        source.set("ETH", Err(FetchError::Transport("connection reset".into())));
        m.tick_at(0).await;

        source.set("BTC", Ok(Some(Sample::value(110.0))));
        let r = m.tick_at(MIN).await;

        assert_eq!(r.polled, 2);
        assert_eq!(r.failed, 1);
        assert_eq!(r.readings, 1);
        assert_eq!(r.emitted.len(), 1);
        assert!(m.history("ETH").is_none());
        assert!(logs_contain("fetch failed; entity skipped this tick"));
    }

    #[tokio::test]
    async fn no_data_is_skipped_without_failure() {
        let (m, source, _sink) = price_monitor(&["BTC"]);
        source.set("BTC", Ok(None));

        let r = m.tick_at(0).await;
        assert_eq!(r.failed, 0);
        assert_eq!(r.skipped, 1);
        assert_eq!(m.status().entities_tracked, 0);
    }

    #[tokio::test]
    async fn non_finite_reading_is_not_stored() {
        let (m, source, _sink) = price_monitor(&["BTC"]);
        source.set("BTC", Ok(Some(Sample::value(f64::NAN))));

        let r = m.tick_at(0).await;
        assert_eq!(r.skipped, 1);
        assert!(m.history("BTC").is_none());
    }

    #[tokio::test]
    async fn history_is_bounded_by_capacity() {
        let source = Arc::new(TableSource::default());
        let sink = Arc::new(VecSink::default());
        let mut cfg = PriceRule::default_config(vec!["BTC".into()]);
        cfg.history_capacity = 3;
        let m = SpikeMonitor::new(cfg, source.clone(), PriceRule, sink).unwrap();

        source.set("BTC", Ok(Some(Sample::value(100.0))));
        for i in 0..10 {
            m.tick_at(i * MIN).await;
        }

        let h = m.history("BTC").unwrap();
        assert_eq!(h.len(), 3);
        assert_eq!(h[0].timestamp_ms, 7 * MIN);
    }

    #[tokio::test]
    async fn watchlist_update_drops_stale_histories() {
        let (m, source, _sink) = price_monitor(&["BTC", "ETH"]);
        source.set("BTC", Ok(Some(Sample::value(1.0))));
        source.set("ETH", Ok(Some(Sample::value(1.0))));
        m.tick_at(0).await;
        assert_eq!(m.status().entities_tracked, 2);

        m.update_watchlist(vec!["ETH".into(), "SOL".into(), "ETH".into()]);

        assert_eq!(m.watchlist(), vec!["ETH", "SOL"]);
        assert_eq!(m.status().entities_tracked, 1);
        assert!(m.history("BTC").is_none());
    }

    /// Answers every fetch after a fixed delay.
    struct SlowSource(Duration);

    #[async_trait]
    impl MetricSource for SlowSource {
        async fn fetch(&self, _entity_id: &str) -> Result<Option<Sample>, FetchError> {
            tokio::time::sleep(self.0).await;
            Ok(Some(Sample::value(100.0)))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn watchlist_update_during_tick_keeps_history_dropped() {
        let sink = Arc::new(VecSink::default());
        let cfg = PriceRule::default_config(vec!["BTC".into()]);
        let source = Arc::new(SlowSource(Duration::from_millis(50)));
        let m = SpikeMonitor::new(cfg, source, PriceRule, sink).unwrap();

        let tick = tokio::spawn({
            let m = Arc::clone(&m);
            async move { m.tick_at(0).await }
        });

        tokio::time::sleep(Duration::from_millis(10)).await;
        m.update_watchlist(vec!["ETH".into()]);

        let report = tick.await.unwrap();
        assert_eq!(report.polled, 1);
        assert_eq!(report.readings, 0);
        assert_eq!(report.skipped, 1);

        assert!(m.history("BTC").is_none());
        assert_eq!(m.status().entities_tracked, 0);
    }

    #[tokio::test]
    async fn liquidation_aggregate_entity_is_evaluated() {
        let source = Arc::new(TableSource::default());
        let sink = Arc::new(VecSink::default());
        let cfg = LiquidationRule::default_config(vec!["BTC".into(), "ETH".into()]);
        let m = SpikeMonitor::new(cfg, source.clone(), LiquidationRule, sink.clone()).unwrap();

        // $15M each: below both the entity and the market threshold.
        source.set("BTC", Ok(Some(Sample::split(10e6, 5e6))));
        source.set("ETH", Ok(Some(Sample::split(10e6, 5e6))));
        m.tick_at(0).await;
        assert!(m.tick_at(MIN).await.emitted.is_empty());

        source.set("BTC", Ok(Some(Sample::split(70e6, 5e6))));
        source.set("ETH", Ok(Some(Sample::split(40e6, 1e6))));
        let r = m.tick_at(2 * MIN).await;

        let market: Vec<_> = r.emitted.iter().filter(|s| s.entity_id == "MARKET").collect();
        assert_eq!(market.len(), 1);
        assert_eq!(market[0].signal_type, SignalType::LiquidationLong);
        assert_eq!(market[0].value, 116e6);
        assert_eq!(r.emitted.len(), 3);
    }

    #[tokio::test]
    async fn aggregate_id_cannot_be_watched_directly() {
        let source = Arc::new(TableSource::default());
        let sink = Arc::new(VecSink::default());
        let cfg = LiquidationRule::default_config(vec!["BTC".into(), "MARKET".into()]);
        let m = SpikeMonitor::new(cfg, source, LiquidationRule, sink).unwrap();

        assert_eq!(m.watchlist(), vec!["BTC"]);
    }

    #[tokio::test]
    async fn social_cooldown_suppresses_repeat_signals() {
        let source = Arc::new(TableSource::default());
        let sink = Arc::new(VecSink::default());
        let cfg = SocialRule::default_config(vec!["DOGE".into()]);
        let m = SpikeMonitor::new(cfg, source.clone(), SocialRule::default(), sink.clone())
            .unwrap();

        source.set("DOGE", Ok(Some(Sample::value(1_000.0))));
        m.tick_at(0).await;
        source.set("DOGE", Ok(Some(Sample::value(2_500.0))));
        assert_eq!(m.tick_at(5 * MIN).await.emitted.len(), 1);

        source.set("DOGE", Ok(Some(Sample::value(2_600.0))));
        assert!(m.tick_at(10 * MIN).await.emitted.is_empty());
        assert_eq!(sink.signals.lock().len(), 1);
    }

    #[tokio::test]
    async fn invalid_config_is_rejected() {
        let mut cfg = PriceRule::default_config(vec![]);
        cfg.fetch_timeout = Duration::from_secs(120);

        let res = SpikeMonitor::new(
            cfg,
            Arc::new(TableSource::default()),
            PriceRule,
            Arc::new(VecSink::default()),
        );
        assert!(matches!(res, Err(MonitorError::InvalidFetchTimeout { .. })));
    }
}
