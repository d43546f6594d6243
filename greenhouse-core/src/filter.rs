//! Fixed-kernel smoothing filter
//!
//! Computes a weighted rolling average over the most recent samples of one
//! channel:
//!
//! ```text
//! y[n] = 0.53125·x[n] + 0.25·x[n−1] + 0.125·x[n−2] + 0.0625·x[n−3] + 0.03125·x[n−4]
//! ```
//!
//! With fewer than five samples the leading weights are used and rescaled by
//! their own sum, so the applied weights always sum to 1.0. Samples beyond the
//! fifth are ignored. Keeping the newest-first window is the caller's job;
//! see [`SampleWindow`](crate::window::SampleWindow).

use crate::constants::{SMOOTHING_KERNEL, SMOOTHING_TAPS};
use crate::errors::FilterError;

/// Weights applied to a window of `len` samples
///
/// Returns the leading `min(len, 5)` kernel weights, rescaled to sum to 1.0
/// when the window is short.
pub fn weights(len: usize) -> heapless::Vec<f64, SMOOTHING_TAPS> {
    let used = len.min(SMOOTHING_TAPS);
    let selected = &SMOOTHING_KERNEL[..used];

    let mut out = heapless::Vec::new();
    if used < SMOOTHING_TAPS {
        let sum: f64 = selected.iter().sum();
        for w in selected {
            // Capacity is SMOOTHING_TAPS and used < SMOOTHING_TAPS
            let _ = out.push(w / sum);
        }
    } else {
        let _ = out.extend_from_slice(selected);
    }
    out
}

/// Smooth a newest-first window of samples
///
/// ## Errors
///
/// [`FilterError::InvalidInput`] when `samples` is empty.
pub fn smooth(samples: &[f64]) -> Result<f64, FilterError> {
    if samples.is_empty() {
        return Err(FilterError::InvalidInput);
    }

    let weights = weights(samples.len());
    Ok(weights
        .iter()
        .zip(samples.iter())
        .map(|(w, x)| w * x)
        .sum())
}
