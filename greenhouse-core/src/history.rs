//! Bounded trailing history for charting
//!
//! The history series holds `(timestamp, value)` points of the primary
//! channel, ordered by time and bounded to a trailing duration measured from
//! the newest point. Every append evicts what fell out of the window.

use alloc::collections::VecDeque;
use alloc::vec::Vec;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::constants::HISTORY_WINDOW_MS;
use crate::time::Timestamp;

/// One charted point
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct HistoryPoint {
    /// Sample timestamp
    pub timestamp: Timestamp,
    /// Primary-channel value
    pub value: f64,
}

/// Time-bounded series of history points
#[derive(Debug, Clone, PartialEq)]
pub struct HistorySeries {
    window_ms: u64,
    points: VecDeque<HistoryPoint>,
}

impl HistorySeries {
    /// Empty series keeping `window_ms` of trailing history
    pub fn new(window_ms: u64) -> Self {
        Self {
            window_ms,
            points: VecDeque::new(),
        }
    }

    /// Trailing duration kept
    pub fn window_ms(&self) -> u64 {
        self.window_ms
    }

    /// Append a point and evict everything older than the window
    ///
    /// Returns `false` (and leaves the series untouched) when `timestamp` is
    /// earlier than the newest point, which would break time ordering.
    pub fn push(&mut self, timestamp: Timestamp, value: f64) -> bool {
        if let Some(last) = self.points.back() {
            if timestamp < last.timestamp {
                log_debug!(
                    "history point at {} precedes newest point at {}; skipped",
                    timestamp,
                    last.timestamp
                );
                return false;
            }
        }

        self.points.push_back(HistoryPoint { timestamp, value });
        while let Some(front) = self.points.front() {
            if timestamp - front.timestamp > self.window_ms {
                self.points.pop_front();
            } else {
                break;
            }
        }
        true
    }

    /// Number of points
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether no point has been recorded
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Newest point
    pub fn last(&self) -> Option<&HistoryPoint> {
        self.points.back()
    }

    /// Points oldest to newest
    pub fn iter(&self) -> impl Iterator<Item = &HistoryPoint> {
        self.points.iter()
    }

    /// Owned copy for publishing
    pub fn to_vec(&self) -> Vec<HistoryPoint> {
        self.points.iter().copied().collect()
    }
}

impl Default for HistorySeries {
    fn default() -> Self {
        Self::new(HISTORY_WINDOW_MS)
    }
}
