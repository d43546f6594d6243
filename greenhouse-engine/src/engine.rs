//! Engine task
//!
//! One tokio task owns the [`Scheduler`], the store and the provider's event
//! receiver, and drives the three timers:
//!
//! ```text
//!            ┌──────────── provider events ───────────┐
//!            ▼                                        │
//!   select! { cancel | process | coalesce | history | event }
//!            │
//!            └── publish DisplayView on watch channel
//! ```
//!
//! Every handler runs to completion before the next branch is polled, so
//! scheduler state is never touched concurrently. A due timer is served
//! before the next provider event, so a flooding provider cannot starve the
//! ticks. Timers first fire one full
//! period after start. On shutdown the provider is disconnected, its
//! remaining notifications are applied, and the timers are dropped with the
//! task.

use greenhouse_connectors::{DataProvider, EventSink};
use greenhouse_core::RecordStore;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Duration, Instant, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::scheduler::Scheduler;
use crate::view::DisplayView;

/// Entry point for running the pipeline
pub struct Engine;

impl Engine {
    /// Validate `config`, connect `provider` and start the engine task
    ///
    /// ## Errors
    ///
    /// [`EngineError::Config`] for an invalid configuration and
    /// [`EngineError::Connector`] when the provider refuses to connect. In
    /// both cases no task is started.
    pub fn spawn<P, S>(config: EngineConfig, mut provider: P, store: S) -> EngineResult<EngineHandle<S>>
    where
        P: DataProvider + 'static,
        S: RecordStore + Send + 'static,
    {
        let scheduler = Scheduler::new(config)?;
        let (sink, events) = EventSink::channel();
        provider.connect(sink)?;
        log::info!("engine started with {} provider", provider.name());

        let (view_tx, view_rx) = watch::channel(scheduler.view());
        let cancel = CancellationToken::new();
        let task = tokio::spawn(run(scheduler, provider, store, events, view_tx, cancel.clone()));

        Ok(EngineHandle {
            view: view_rx,
            cancel,
            task,
        })
    }
}

/// Handle to a running engine
pub struct EngineHandle<S> {
    view: watch::Receiver<DisplayView>,
    cancel: CancellationToken,
    task: JoinHandle<(DisplayView, S)>,
}

impl<S> EngineHandle<S> {
    /// Receiver for display updates
    pub fn view(&self) -> watch::Receiver<DisplayView> {
        self.view.clone()
    }

    /// Most recently published view
    pub fn current(&self) -> DisplayView {
        self.view.borrow().clone()
    }

    /// Stop the provider and all timers, returning the final view and store
    pub async fn shutdown(self) -> EngineResult<(DisplayView, S)> {
        self.cancel.cancel();
        self.task.await.map_err(|e| EngineError::Task(e.to_string()))
    }
}

fn timer(period: Duration) -> Interval {
    let mut timer = interval_at(Instant::now() + period, period);
    timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
    timer
}

async fn run<P, S>(
    mut scheduler: Scheduler,
    mut provider: P,
    mut store: S,
    mut events: tokio::sync::mpsc::UnboundedReceiver<greenhouse_connectors::ProviderEvent>,
    view: watch::Sender<DisplayView>,
    cancel: CancellationToken,
) -> (DisplayView, S)
where
    P: DataProvider,
    S: RecordStore,
{
    let config = scheduler.config().clone();
    let mut process = timer(config.process_interval);
    let mut coalesce = timer(config.coalesce_interval);
    let mut history = timer(config.history_interval);

    loop {
        let publish = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = process.tick() => scheduler.process_tick(&mut store).drained > 0,
            _ = coalesce.tick() => scheduler.coalesce_tick(),
            _ = history.tick() => scheduler.history_tick(),
            Some(event) = events.recv() => scheduler.ingest(event),
        };
        if publish {
            view.send_replace(scheduler.view());
        }
    }

    provider.disconnect();
    provider.closed().await;
    while let Ok(event) = events.try_recv() {
        scheduler.ingest(event);
    }

    let final_view = scheduler.view();
    view.send_replace(final_view.clone());
    log::info!(
        "engine stopped: {} samples processed, {} gaps, {} store failures",
        final_view.counters.processed,
        final_view.counters.gap_count,
        final_view.counters.store_failures
    );
    (final_view, store)
}
