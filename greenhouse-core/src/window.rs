//! Fixed-Size Rolling Window for Channel Smoothing
//!
//! ## Overview
//!
//! The smoothing filter needs the last few values of a channel, newest first.
//! This module provides a circular buffer sized at compile time through const
//! generics that keeps exactly that: pushing into a full window overwrites the
//! oldest value.
//!
//! ## Memory Layout
//!
//! ```text
//! SampleWindow<5> after pushing 10, 12, 14, 16, 18, 20:
//! ┌─────┬─────┬─────┬─────┬─────┐
//! │ 20  │ 12  │ 14  │ 16  │ 18  │  ← physical slots
//! └─────┴─────┴─────┴─────┴─────┘
//!          ↑
//!          write_pos = 1 (oldest value lives here when full)
//!
//! newest_first() = [20, 18, 16, 14, 12]
//! ```
//!
//! All operations are O(1) except the newest-first copy, which is O(N) into a
//! stack-allocated `heapless::Vec`. No heap allocation.
//!
//! ## Usage Example
//!
//! ```rust
//! use greenhouse_core::window::SampleWindow;
//!
//! let mut window: SampleWindow = SampleWindow::new();
//! for value in [10.0, 12.0, 14.0] {
//!     window.push(value);
//! }
//! assert_eq!(window.newest_first().as_slice(), &[14.0, 12.0, 10.0]);
//! assert!(window.smoothed().is_ok());
//! ```

use crate::constants::SMOOTHING_TAPS;
use crate::errors::FilterError;
use crate::filter::smooth;

/// Rolling window of the most recent `N` values of one channel
///
/// ## Internal Invariants
///
/// - `write_pos < N`
/// - `len <= N`
/// - when `len == N`, the oldest value is at `write_pos`
#[derive(Debug, Clone)]
pub struct SampleWindow<const N: usize = SMOOTHING_TAPS> {
    data: [f64; N],
    write_pos: usize,
    len: usize,
}

impl<const N: usize> SampleWindow<N> {
    /// Creates a new empty window
    pub const fn new() -> Self {
        Self {
            data: [0.0; N],
            write_pos: 0,
            len: 0,
        }
    }

    /// Adds a value, overwriting the oldest one when full
    pub fn push(&mut self, value: f64) {
        self.data[self.write_pos] = value;
        self.write_pos = (self.write_pos + 1) % N;

        if self.len < N {
            self.len += 1;
        }
    }

    /// Number of stored values
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether no value has been pushed yet
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Whether the window holds `N` values
    pub fn is_full(&self) -> bool {
        self.len == N
    }

    /// Most recent value
    pub fn newest(&self) -> Option<f64> {
        if self.is_empty() {
            return None;
        }
        let idx = if self.write_pos == 0 { N - 1 } else { self.write_pos - 1 };
        Some(self.data[idx])
    }

    /// Copy of the stored values, newest first
    pub fn newest_first(&self) -> heapless::Vec<f64, N> {
        let mut out = heapless::Vec::new();
        for lag in 0..self.len {
            // write_pos - 1 - lag, wrapped
            let idx = (self.write_pos + N - 1 - lag) % N;
            let _ = out.push(self.data[idx]);
        }
        out
    }

    /// Smoothed value of the current window
    ///
    /// ## Errors
    ///
    /// [`FilterError::InvalidInput`] while the window is empty.
    pub fn smoothed(&self) -> Result<f64, FilterError> {
        smooth(&self.newest_first())
    }

    /// Push a value and return the smoothed window
    pub fn push_and_smooth(&mut self, value: f64) -> f64 {
        self.push(value);
        // Never empty right after a push
        self.smoothed().unwrap_or(value)
    }

    /// Forget all values
    pub fn clear(&mut self) {
        self.write_pos = 0;
        self.len = 0;
    }
}

impl<const N: usize> Default for SampleWindow<N> {
    fn default() -> Self {
        Self::new()
    }
}
