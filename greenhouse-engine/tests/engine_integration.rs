//! Engine driven by a scripted provider on paused time

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use greenhouse_connectors::{ConnectionStats, ConnectorError, DataProvider, EventSink, ProviderEvent};
use greenhouse_core::{Checkpoint, ConnectionState, MemoryStore, RecordStore, Sample};
use greenhouse_engine::{ChannelAlphas, Engine, EngineConfig, EngineError};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Replays `(delay, event)` steps, then idles until disconnected
struct ScriptedProvider {
    script: Vec<(Duration, ProviderEvent)>,
    refuse: bool,
    disconnected: Arc<AtomicBool>,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl ScriptedProvider {
    fn new(script: Vec<(Duration, ProviderEvent)>) -> Self {
        Self {
            script,
            refuse: false,
            disconnected: Arc::new(AtomicBool::new(false)),
            cancel: CancellationToken::new(),
            task: None,
        }
    }

    fn refusing() -> Self {
        Self {
            refuse: true,
            ..Self::new(Vec::new())
        }
    }
}

#[async_trait::async_trait]
impl DataProvider for ScriptedProvider {
    fn connect(&mut self, sink: EventSink) -> Result<(), ConnectorError> {
        if self.refuse {
            return Err(ConnectorError::InvalidUrl("scripted refusal".into()));
        }
        let script = std::mem::take(&mut self.script);
        let cancel = self.cancel.clone();
        self.task = Some(tokio::spawn(async move {
            for (delay, event) in script {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(delay) => {}
                }
                sink.send_event(event);
            }
            cancel.cancelled().await;
            sink.state(ConnectionState::Offline);
        }));
        Ok(())
    }

    fn disconnect(&mut self) {
        self.disconnected.store(true, Ordering::SeqCst);
        self.cancel.cancel();
    }

    async fn closed(&mut self) {
        if let Some(task) = self.task.take() {
            task.await.unwrap();
        }
    }

    fn name(&self) -> &'static str {
        "scripted"
    }

    fn stats(&self) -> ConnectionStats {
        ConnectionStats::default()
    }
}

trait SendEvent {
    fn send_event(&self, event: ProviderEvent);
}

impl SendEvent for EventSink {
    fn send_event(&self, event: ProviderEvent) {
        match event {
            ProviderEvent::Snapshot(samples) => self.snapshot(samples),
            ProviderEvent::Delta(samples) => self.delta(samples),
            ProviderEvent::State(state) => self.state(state),
        };
    }
}

/// Sends deltas back to back until disconnected
struct FloodingProvider {
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

#[async_trait::async_trait]
impl DataProvider for FloodingProvider {
    fn connect(&mut self, sink: EventSink) -> Result<(), ConnectorError> {
        let cancel = self.cancel.clone();
        self.task = Some(tokio::spawn(async move {
            let mut ts = 1_000;
            while !cancel.is_cancelled() {
                sink.delta(vec![at(ts)]);
                ts += 10;
                tokio::task::yield_now().await;
            }
        }));
        Ok(())
    }

    fn disconnect(&mut self) {
        self.cancel.cancel();
    }

    async fn closed(&mut self) {
        if let Some(task) = self.task.take() {
            task.await.unwrap();
        }
    }

    fn name(&self) -> &'static str {
        "flooding"
    }

    fn stats(&self) -> ConnectionStats {
        ConnectionStats::default()
    }
}

fn at(ts: u64) -> Sample {
    Sample::new(21.0, 55.0, 700.0, ts)
}

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

#[tokio::test(start_paused = true)]
async fn pipeline_end_to_end() {
    let provider = ScriptedProvider::new(vec![
        (ms(0), ProviderEvent::State(ConnectionState::Reconnecting)),
        (ms(50), ProviderEvent::State(ConnectionState::Live)),
        (ms(0), ProviderEvent::Snapshot(vec![at(1_000), at(1_100), at(1_200)])),
        (ms(250), ProviderEvent::Delta(vec![at(1_300).with_event("Vent opened")])),
    ]);
    let disconnected = Arc::clone(&provider.disconnected);

    let engine = Engine::spawn(EngineConfig::default(), provider, MemoryStore::new()).unwrap();
    let views = engine.view();

    // Before the first process tick nothing has been processed
    tokio::time::sleep(ms(500)).await;
    let view = views.borrow().clone();
    assert_eq!(view.connection_state, ConnectionState::Live);
    assert_eq!(view.reconnect_count, 1);
    assert_eq!(view.counters.processed, 0);
    assert_eq!(view.history.len(), 1);

    tokio::time::sleep(ms(1_000)).await;
    let view = views.borrow().clone();
    assert_eq!(view.counters.processed, 4);
    assert_eq!(view.checkpoint, Checkpoint::at(1_300));
    assert_eq!(view.latest, Some(at(1_300).with_event("Vent opened")));
    assert_eq!(view.coalesced_latest, view.latest);
    assert_eq!(view.device_events.len(), 1);
    assert_eq!(view.device_events[0].label, "Vent opened");

    let (final_view, store) = engine.shutdown().await.unwrap();
    assert!(disconnected.load(Ordering::SeqCst));
    assert_eq!(final_view.connection_state, ConnectionState::Offline);
    assert_eq!(store.len(), 4);
    let newest: Vec<_> = store.recent(2).unwrap().iter().map(|r| r.timestamp).collect();
    assert_eq!(newest, vec![1_300, 1_200]);
}

#[tokio::test(start_paused = true)]
async fn coalesced_view_lags_bursty_input() {
    let mut script = Vec::new();
    for i in 0..50u64 {
        script.push((ms(10), ProviderEvent::Delta(vec![at(1_000 + i * 10)])));
    }
    let engine = Engine::spawn(EngineConfig::default(), ScriptedProvider::new(script), MemoryStore::new())
        .unwrap();
    let mut views = engine.view();

    // First coalesce tick at 200 ms publishes the sample delivered at 200 ms
    // or just before, not the whole burst
    tokio::time::sleep(ms(205)).await;
    assert!(views.has_changed().unwrap());
    let coalesced = views.borrow_and_update().coalesced_latest.clone().unwrap();
    assert!(coalesced.timestamp >= 1_180 && coalesced.timestamp <= 1_190);

    // Nothing processed before the process tick
    assert_eq!(views.borrow().counters.processed, 0);

    tokio::time::sleep(ms(1_000)).await;
    let view = views.borrow().clone();
    assert_eq!(view.counters.processed, 50);
    assert_eq!(view.coalesced_latest.map(|s| s.timestamp), Some(1_490));

    engine.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn history_tick_appends_latest_reading() {
    let provider = ScriptedProvider::new(vec![
        (ms(10), ProviderEvent::Delta(vec![at(1_000)])),
        (ms(30_000), ProviderEvent::Delta(vec![Sample::new(23.5, 55.0, 700.0, 1_500)])),
    ]);
    let config = EngineConfig::default().max_gap_ms(60_000);
    let engine = Engine::spawn(config, provider, MemoryStore::new()).unwrap();
    let views = engine.view();

    tokio::time::sleep(ms(60_500)).await;
    let history = views.borrow().history.clone();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].timestamp, 1_000);
    assert_eq!(history[1].timestamp, 1_500);
    assert_eq!(history[1].value, 23.5);

    engine.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn gap_failure_is_counted_and_processing_continues() {
    let provider = ScriptedProvider::new(vec![
        (ms(10), ProviderEvent::Delta(vec![at(1_000), at(1_500)])),
        (ms(1_000), ProviderEvent::Delta(vec![at(9_000)])),
    ]);
    let engine = Engine::spawn(EngineConfig::default(), provider, MemoryStore::new()).unwrap();
    let views = engine.view();

    tokio::time::sleep(ms(2_500)).await;
    let view = views.borrow().clone();
    assert_eq!(view.counters.gap_count, 1);
    assert_eq!(view.counters.processed, 3);
    assert_eq!(view.checkpoint, Checkpoint::at(1_500));

    let (_, store) = engine.shutdown().await.unwrap();
    assert_eq!(store.len(), 3);
}

#[tokio::test(start_paused = true)]
async fn sustained_spike_reaches_event_list() {
    let mut samples: Vec<Sample> = (0..20)
        .map(|i| Sample::new(20.0 + 0.01 * (i % 2) as f64, 50.0, 800.0, 1_000 + i * 100))
        .collect();
    samples.push(Sample::new(35.0, 50.0, 800.0, 3_000));
    let provider = ScriptedProvider::new(vec![(ms(10), ProviderEvent::Snapshot(samples))]);
    let config = EngineConfig::default().alphas(ChannelAlphas::uniform(0.05));
    let engine = Engine::spawn(config, provider, MemoryStore::new()).unwrap();

    tokio::time::sleep(ms(1_100)).await;
    let view = engine.current();
    let newest = &view.events[0];
    assert_eq!(newest.timestamp, 3_000);
    assert!(newest.message.starts_with("Temperature anomaly: 28.0°C (z="));

    engine.shutdown().await.unwrap();
}

#[tokio::test]
async fn invalid_config_does_not_connect() {
    let provider = ScriptedProvider::new(Vec::new());
    let disconnected = Arc::clone(&provider.disconnected);
    let result = Engine::spawn(
        EngineConfig::default().process_interval_ms(0),
        provider,
        MemoryStore::new(),
    );
    assert!(matches!(result, Err(EngineError::Config(_))));
    assert!(!disconnected.load(Ordering::SeqCst));
}

#[tokio::test]
async fn connector_refusal_is_reported() {
    let result = Engine::spawn(EngineConfig::default(), ScriptedProvider::refusing(), MemoryStore::new());
    assert!(matches!(result, Err(EngineError::Connector(ConnectorError::InvalidUrl(_)))));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn ticks_keep_firing_under_a_flood() {
    let provider = FloodingProvider {
        cancel: CancellationToken::new(),
        task: None,
    };
    let config = EngineConfig::default()
        .process_interval_ms(100)
        .coalesce_interval_ms(20)
        .max_buffer(Some(100));
    let engine = Engine::spawn(config, provider, MemoryStore::new()).unwrap();

    tokio::time::sleep(ms(600)).await;
    let view = engine.current();
    assert!(view.counters.processed > 0);
    assert!(view.coalesced_latest.is_some());

    let (_, store) = engine.shutdown().await.unwrap();
    assert!(!store.is_empty());
}
