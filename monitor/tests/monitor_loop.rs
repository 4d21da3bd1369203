use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use corelib::{SignalDetail, SignalSink, SignalType, SpikeSignal};
use monitor::{
    FetchError, LiquidationMonitor, LiquidationRule, MetricSource, PriceMonitor, PriceRule, Sample,
    SocialMonitor, SocialRule,
};

// -----------------------
// Test doubles
// -----------------------

/// Returns the scripted samples in order, repeating the last one.
/// Can be told to stall or panic.
struct ScriptedSource {
    script: Mutex<Vec<Sample>>,
    calls: AtomicUsize,
    completed: AtomicUsize,
    delay: Duration,
    panic_on_fetch: AtomicBool,
    seen: Mutex<Vec<String>>,
}

impl ScriptedSource {
    fn new(script: Vec<Sample>) -> Self {
        Self {
            script: Mutex::new(script),
            calls: AtomicUsize::new(0),
            completed: AtomicUsize::new(0),
            delay: Duration::ZERO,
            panic_on_fetch: AtomicBool::new(false),
            seen: Mutex::new(Vec::new()),
        }
    }

    fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Entity ids fetched since the last call, in request order.
    fn take_seen(&self) -> Vec<String> {
        std::mem::take(&mut *self.seen.lock())
    }
}

#[async_trait]
impl MetricSource for ScriptedSource {
    async fn fetch(&self, entity_id: &str) -> Result<Option<Sample>, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().push(entity_id.to_string());

        if self.panic_on_fetch.load(Ordering::SeqCst) {
            panic!("provider returned garbage");
        }

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let next = {
            let mut script = self.script.lock();
            if script.len() > 1 {
                Some(script.remove(0))
            } else {
                script.first().copied()
            }
        };

        self.completed.fetch_add(1, Ordering::SeqCst);
        Ok(next)
    }
}

#[derive(Default)]
struct RecordingSink {
    signals: Mutex<Vec<SpikeSignal>>,
}

impl SignalSink for RecordingSink {
    fn register_signal(&self, signal: SpikeSignal) {
        self.signals.lock().push(signal);
    }
}

fn watch(ids: &[&str]) -> Vec<String> {
    ids.iter().map(|s| s.to_string()).collect()
}

async fn wait_until_stopped(handle: &dyn monitor::MonitorHandle) {
    for _ in 0..50 {
        if !handle.status().running {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

// -----------------------
// Loop lifecycle
// -----------------------

#[tokio::test(start_paused = true)]
async fn loop_polls_on_interval_until_stopped() {
    let source = Arc::new(ScriptedSource::new(vec![Sample::value(100.0)]));
    let sink = Arc::new(RecordingSink::default());
    let m = PriceMonitor::new(
        PriceRule::default_config(watch(&["BTC"])),
        source.clone(),
        PriceRule,
        sink,
    )
    .unwrap();

    assert!(PriceMonitor::start(&m));
    assert!(!PriceMonitor::start(&m), "second start is refused while running");
    assert!(m.status().running);

    // Ticks at 0s, 60s, 120s, 180s.
    tokio::time::sleep(Duration::from_secs(181)).await;
    m.stop().await;

    let calls = source.calls();
    assert_eq!(calls, 4);
    assert!(!m.status().running);
    assert!(m.status().last_tick_ms.is_some());

    tokio::time::sleep(Duration::from_secs(600)).await;
    assert_eq!(source.calls(), calls, "no ticks after stop");
}

#[tokio::test(start_paused = true)]
async fn stop_lets_in_flight_tick_finish() {
    let source = Arc::new(
        ScriptedSource::new(vec![Sample::value(100.0)]).with_delay(Duration::from_secs(5)),
    );
    let sink = Arc::new(RecordingSink::default());
    let m = PriceMonitor::new(
        PriceRule::default_config(watch(&["BTC"])),
        source.clone(),
        PriceRule,
        sink,
    )
    .unwrap();

    PriceMonitor::start(&m);
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(source.calls(), 1);
    assert_eq!(source.completed.load(Ordering::SeqCst), 0);

    m.stop().await;

    assert_eq!(source.completed.load(Ordering::SeqCst), 1);
    assert!(m.history("BTC").is_some());
}

#[tokio::test(start_paused = true)]
async fn stop_without_start_is_a_noop() {
    let m = PriceMonitor::new(
        PriceRule::default_config(watch(&["BTC"])),
        Arc::new(ScriptedSource::new(vec![])),
        PriceRule,
        Arc::new(RecordingSink::default()),
    )
    .unwrap();

    m.stop().await;
    assert!(!m.status().running);
}

#[tokio::test(start_paused = true)]
async fn restart_racing_stop_stays_running() {
    let m = PriceMonitor::new(
        PriceRule::default_config(watch(&["BTC"])),
        Arc::new(ScriptedSource::new(vec![Sample::value(100.0)])),
        PriceRule,
        Arc::new(RecordingSink::default()),
    )
    .unwrap();

    assert!(PriceMonitor::start(&m));
    tokio::task::yield_now().await;

    let stopper = tokio::spawn({
        let m = Arc::clone(&m);
        async move { m.stop().await }
    });

    // Start again as soon as the old loop has exited, while the stopper
    // may still be waiting on it.
    let mut restarted = false;
    for _ in 0..100 {
        if PriceMonitor::start(&m) {
            restarted = true;
            break;
        }
        tokio::task::yield_now().await;
    }
    assert!(restarted);

    stopper.await.unwrap();
    assert!(m.status().running, "new loop must still be reported");

    m.stop().await;
    assert!(!m.status().running);
}

#[tokio::test(start_paused = true)]
async fn running_loop_follows_watchlist_update() {
    let source = Arc::new(ScriptedSource::new(vec![Sample::value(100.0)]));
    let m = PriceMonitor::new(
        PriceRule::default_config(watch(&["BTC", "ETH"])),
        source.clone(),
        PriceRule,
        Arc::new(RecordingSink::default()),
    )
    .unwrap();

    PriceMonitor::start(&m);
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(source.take_seen(), watch(&["BTC", "ETH"]));

    m.update_watchlist(watch(&["ETH", "SOL"]));

    // Next tick at 60s polls only the new list.
    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(source.take_seen(), watch(&["ETH", "SOL"]));

    tokio::time::sleep(Duration::from_secs(60)).await;
    let seen = source.take_seen();
    assert!(!seen.contains(&"BTC".to_string()), "{seen:?}");

    m.stop().await;

    assert!(m.history("BTC").is_none());
    assert!(m.history("ETH").is_some());
    assert!(m.history("SOL").is_some());
}

#[tokio::test(start_paused = true)]
async fn panic_in_tick_terminates_loop_and_records_error() {
    let source = Arc::new(ScriptedSource::new(vec![Sample::value(100.0)]));
    source.panic_on_fetch.store(true, Ordering::SeqCst);

    let m = PriceMonitor::new(
        PriceRule::default_config(watch(&["BTC"])),
        source.clone(),
        PriceRule,
        Arc::new(RecordingSink::default()),
    )
    .unwrap();

    PriceMonitor::start(&m);
    wait_until_stopped(m.as_ref()).await;

    let status = m.status();
    assert!(!status.running);
    let err = status.last_error.unwrap();
    assert!(err.contains("provider returned garbage"), "{err}");

    // No further polling once terminated.
    tokio::time::sleep(Duration::from_secs(300)).await;
    assert_eq!(source.calls(), 1);

    // An external restart brings it back.
    source.panic_on_fetch.store(false, Ordering::SeqCst);
    assert!(PriceMonitor::start(&m));
    assert!(m.status().last_error.is_none());
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(source.calls(), 2);
    m.stop().await;
}

#[tokio::test(start_paused = true)]
async fn slow_fetch_times_out_as_failure() {
    let source = Arc::new(
        ScriptedSource::new(vec![Sample::value(100.0)]).with_delay(Duration::from_secs(30)),
    );
    let m = PriceMonitor::new(
        PriceRule::default_config(watch(&["BTC"])),
        source,
        PriceRule,
        Arc::new(RecordingSink::default()),
    )
    .unwrap();

    let report = m.tick_at(0).await;

    assert_eq!(report.failed, 1);
    assert_eq!(report.readings, 0);
    assert!(m.history("BTC").is_none());
}

#[tokio::test]
async fn handles_are_usable_as_trait_objects() {
    let sink: Arc<dyn SignalSink> = Arc::new(RecordingSink::default());
    let price: Arc<dyn monitor::MonitorHandle> = PriceMonitor::new(
        PriceRule::default_config(watch(&["BTC"])),
        Arc::new(ScriptedSource::new(vec![])),
        PriceRule,
        sink.clone(),
    )
    .unwrap();
    let social: Arc<dyn monitor::MonitorHandle> = SocialMonitor::new(
        SocialRule::default_config(watch(&["DOGE"])),
        Arc::new(ScriptedSource::new(vec![])),
        SocialRule::default(),
        sink,
    )
    .unwrap();

    let handles: Vec<Arc<dyn monitor::MonitorHandle>> = vec![price, social];
    let names: Vec<_> = handles.iter().map(|h| h.name().to_string()).collect();
    assert_eq!(names, vec!["price", "social"]);

    handles[0].update_watchlist(watch(&["ETH"]));
    assert_eq!(handles[0].status().name, "price");
}

// -----------------------
// End-to-end detections
// -----------------------

#[tokio::test]
async fn short_dominated_liquidations_emit_liquidation_short() {
    let source = Arc::new(ScriptedSource::new(vec![
        Sample::split(1e6, 1e6),
        Sample::split(5e6, 20e6),
    ]));
    let sink = Arc::new(RecordingSink::default());
    let m = LiquidationMonitor::new(
        LiquidationRule::default_config(watch(&["ETH"])),
        source,
        LiquidationRule,
        sink.clone(),
    )
    .unwrap();

    m.tick_at(0).await;
    m.tick_at(60_000).await;

    let signals = sink.signals.lock();
    assert_eq!(signals.len(), 1);
    let s = &signals[0];
    assert_eq!(s.signal_type, SignalType::LiquidationShort);
    assert_eq!(s.entity_id, "ETH");
    assert_eq!(s.value, 25e6);
    match &s.metadata.detail {
        SignalDetail::Liquidation { long_share, .. } => assert!((long_share - 0.2).abs() < 1e-9),
        other => panic!("unexpected detail {other:?}"),
    }
}

#[tokio::test]
async fn collapsing_social_volume_emits_negative_spike() {
    let source = Arc::new(ScriptedSource::new(vec![
        Sample::value(10_000.0),
        Sample::value(-2_000.0),
    ]));
    let sink = Arc::new(RecordingSink::default());
    let m = SocialMonitor::new(
        SocialRule::default_config(watch(&["PEPE"])),
        source,
        SocialRule::default(),
        sink.clone(),
    )
    .unwrap();

    m.tick_at(0).await;
    let report = m.tick_at(300_000).await;

    assert_eq!(report.emitted.len(), 1);
    let s = &report.emitted[0];
    assert_eq!(s.signal_type, SignalType::SocialSpike);
    assert!((s.value + 120.0).abs() < 1e-9);
    assert_eq!(sink.signals.lock().len(), 1);
}
