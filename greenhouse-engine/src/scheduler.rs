//! Coalescing Scheduler
//!
//! ## Overview
//!
//! The scheduler owns every piece of pipeline state: the ingestion buffer,
//! the checkpoint, one rolling window and one detector per channel, the
//! history series and the event lists. It is a plain synchronous state
//! machine; [`crate::engine`] calls into it from a single task, so nothing
//! here needs a lock.
//!
//! ## Handlers
//!
//! | Handler                      | Trigger                 | Effect                                   |
//! |------------------------------|-------------------------|------------------------------------------|
//! | [`Scheduler::ingest`]        | provider notification   | buffer samples, update `latest`/state    |
//! | [`Scheduler::process_tick`]  | process interval        | sanitize → smooth → detect → store       |
//! | [`Scheduler::coalesce_tick`] | coalesce interval       | republish `latest` if it changed         |
//! | [`Scheduler::history_tick`]  | history interval        | append latest primary value to history   |
//!
//! ## Ordering
//!
//! Within one process tick the whole drained batch is sanitized before any
//! sample reaches a filter. Every channel then sees the same ordered
//! sequence.
//!
//! ## Backpressure
//!
//! With `max_buffer` set, a burst beyond the bound drops the oldest buffered
//! samples. Drops are counted and reported once per process tick.

use std::collections::VecDeque;

use greenhouse_connectors::ProviderEvent;
use greenhouse_core::{
    sanitize, AnomalyEvent, Channel, ChannelDetectors, Checkpoint, ConnectionState,
    HistorySeries, RecordStore, Sample, SampleWindow, SensorRecord,
};

use crate::config::EngineConfig;
use crate::error::ConfigError;
use crate::view::{Counters, DeviceEvent, DisplayView};

/// Outcome of one process tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickSummary {
    /// Samples drained from the buffer
    pub drained: usize,
    /// Samples that went through filter and detector
    pub processed: usize,
    /// Anomaly events emitted
    pub anomalies: usize,
    /// Whether the gap check passed
    pub gap_ok: bool,
    /// Whether the storage append succeeded
    pub stored: bool,
}

/// Pipeline state and tick handlers
pub struct Scheduler {
    config: EngineConfig,
    buffer: VecDeque<Sample>,
    checkpoint: Checkpoint,
    windows: [SampleWindow; 3],
    detectors: ChannelDetectors,
    latest: Option<Sample>,
    coalesced_latest: Option<Sample>,
    history: HistorySeries,
    events: VecDeque<AnomalyEvent>,
    device_events: VecDeque<DeviceEvent>,
    connection_state: ConnectionState,
    reconnect_count: u64,
    counters: Counters,
    dropped_since_tick: u64,
}

impl Scheduler {
    /// Create a scheduler in the first-load state
    pub fn new(config: EngineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let detectors = config.alphas.detectors()?;
        let history = HistorySeries::new(config.history_window_millis());

        Ok(Self {
            config,
            buffer: VecDeque::new(),
            checkpoint: Checkpoint::FIRST_LOAD,
            windows: [SampleWindow::new(), SampleWindow::new(), SampleWindow::new()],
            detectors,
            latest: None,
            coalesced_latest: None,
            history,
            events: VecDeque::new(),
            device_events: VecDeque::new(),
            connection_state: ConnectionState::Offline,
            reconnect_count: 0,
            counters: Counters::default(),
            dropped_since_tick: 0,
        })
    }

    /// Active configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Handle one provider notification without blocking
    ///
    /// Returns `true` when the display should be refreshed right away, which
    /// is only the case for connection state changes. Sample updates reach
    /// the display through the coalesce tick.
    pub fn ingest(&mut self, event: ProviderEvent) -> bool {
        match event {
            ProviderEvent::Delta(samples) => {
                for sample in &samples {
                    if sample.has_event() {
                        self.push_device_event(DeviceEvent {
                            label: sample.event_label.clone(),
                            timestamp: sample.timestamp,
                        });
                    }
                }
                self.accept(samples);
                false
            }
            ProviderEvent::Snapshot(samples) => {
                if samples.is_empty() {
                    log::debug!("ignoring empty snapshot");
                } else {
                    log::info!("received snapshot with {} samples", samples.len());
                    self.accept(samples);
                }
                false
            }
            ProviderEvent::State(state) => {
                if state == ConnectionState::Reconnecting {
                    self.reconnect_count += 1;
                }
                self.connection_state = state;
                true
            }
        }
    }

    fn accept(&mut self, samples: Vec<Sample>) {
        let Some(last) = samples.last() else {
            return;
        };
        self.latest = Some(last.clone());
        if self.history.is_empty() {
            self.history.push(last.timestamp, last.value(Channel::PRIMARY));
        }

        self.buffer.extend(samples);
        if let Some(max) = self.config.max_buffer {
            let excess = self.buffer.len().saturating_sub(max);
            if excess > 0 {
                self.buffer.drain(..excess);
                self.dropped_since_tick += excess as u64;
                self.counters.dropped_count += excess as u64;
            }
        }
    }

    /// Drain the buffer through sanitize, filter and detector
    ///
    /// Sanitized records go to `store`, which skips timestamps it already
    /// holds, so a replayed tail is processed again but stored once. A store
    /// failure is logged and counted and does not stop the tick. The checkpoint takes whatever the
    /// sanitizer returned, which on a gap failure is the previous one.
    pub fn process_tick<S>(&mut self, store: &mut S) -> TickSummary
    where
        S: RecordStore + ?Sized,
    {
        if self.dropped_since_tick > 0 {
            log::warn!(
                "ingestion buffer full: dropped {} oldest samples since last tick",
                self.dropped_since_tick
            );
            self.dropped_since_tick = 0;
        }

        let batch = std::mem::take(&mut self.buffer);
        let drained = batch.len();
        if drained == 0 {
            return TickSummary {
                gap_ok: true,
                stored: true,
                ..TickSummary::default()
            };
        }

        let result = sanitize(self.checkpoint, self.config.max_gap, batch);
        self.counters.stale_count += result.stale as u64;
        self.counters.duplicate_count += result.duplicates as u64;
        if let Some(gap) = result.gap {
            self.counters.gap_count += 1;
            log::warn!(
                "gap of {} ms between {} and {} exceeds {} ms; checkpoint held at {:?}",
                gap.length(),
                gap.from,
                gap.to,
                self.config.max_gap,
                self.checkpoint.timestamp()
            );
        }

        let stored = self.persist(store, &result.ordered);

        let mut anomalies = 0;
        for sample in &result.ordered {
            for channel in Channel::ALL {
                let smoothed = self.windows[channel.index()].push_and_smooth(sample.value(channel));
                let detection = self.detectors.update(channel, smoothed);
                if detection.is_anomaly {
                    let event = AnomalyEvent::new(channel, smoothed, detection.z_score, sample.timestamp);
                    log::warn!("{}", event.message);
                    self.push_event(event);
                    anomalies += 1;
                }
            }
        }

        let processed = result.ordered.len();
        self.counters.processed += processed as u64;
        self.checkpoint = result.checkpoint;

        log::debug!(
            "processed {} of {} samples ({} stale, {} duplicate, {} anomalies), checkpoint {:?}",
            processed,
            drained,
            result.stale,
            result.duplicates,
            anomalies,
            self.checkpoint.timestamp()
        );

        TickSummary {
            drained,
            processed,
            anomalies,
            gap_ok: result.gap_ok,
            stored,
        }
    }

    fn persist<S>(&mut self, store: &mut S, samples: &[Sample]) -> bool
    where
        S: RecordStore + ?Sized,
    {
        if samples.is_empty() {
            return true;
        }
        let records: Vec<SensorRecord> = samples.iter().map(SensorRecord::from).collect();
        match store.append(&records) {
            Ok(()) => true,
            Err(e) => {
                self.counters.store_failures += 1;
                log::error!("failed to store {} records: {}", records.len(), e);
                false
            }
        }
    }

    /// Republish `latest` if it differs from the coalesced value
    ///
    /// Returns whether anything changed.
    pub fn coalesce_tick(&mut self) -> bool {
        if self.latest == self.coalesced_latest {
            return false;
        }
        self.coalesced_latest = self.latest.clone();
        true
    }

    /// Append the latest primary-channel reading to the history
    ///
    /// Returns whether a point was added.
    pub fn history_tick(&mut self) -> bool {
        match &self.latest {
            Some(latest) => self
                .history
                .push(latest.timestamp, latest.value(Channel::PRIMARY)),
            None => false,
        }
    }

    fn push_event(&mut self, event: AnomalyEvent) {
        self.events.push_front(event);
        self.events.truncate(self.config.max_events);
    }

    fn push_device_event(&mut self, event: DeviceEvent) {
        self.device_events.push_front(event);
        self.device_events.truncate(self.config.max_events);
    }

    /// Samples waiting for the next process tick
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Current checkpoint
    pub fn checkpoint(&self) -> Checkpoint {
        self.checkpoint
    }

    /// Current connection state
    pub fn connection_state(&self) -> ConnectionState {
        self.connection_state
    }

    /// Pipeline counters
    pub fn counters(&self) -> Counters {
        self.counters
    }

    /// Snapshot of everything the display reads
    pub fn view(&self) -> DisplayView {
        DisplayView {
            latest: self.latest.clone(),
            coalesced_latest: self.coalesced_latest.clone(),
            events: self.events.iter().cloned().collect(),
            device_events: self.device_events.iter().cloned().collect(),
            connection_state: self.connection_state,
            reconnect_count: self.reconnect_count,
            history: self.history.to_vec(),
            counters: self.counters,
            checkpoint: self.checkpoint,
        }
    }
}
