//! Property tests for the pure pipeline stages
//!
//! Covers the invariants every downstream consumer relies on:
//! - sanitized output is strictly increasing and never older than the checkpoint
//! - the checkpoint never moves backwards
//! - smoothing weights always sum to one, so the filter preserves constants
//! - the rolling window reproduces the plain five-sample kernel

use greenhouse_core::{
    filter::{smooth, weights},
    sanitize, Checkpoint, Sample, SampleWindow,
};
use proptest::prelude::*;

fn batch_strategy() -> impl Strategy<Value = Vec<Sample>> {
    prop::collection::vec(0u64..20_000, 0..64).prop_map(|timestamps| {
        timestamps
            .into_iter()
            .map(|ts| Sample::new(20.0, 50.0, 800.0, ts))
            .collect()
    })
}

proptest! {
    #[test]
    fn sanitized_output_is_strictly_increasing(
        checkpoint in 0u64..10_000,
        max_gap in 1u64..5_000,
        batch in batch_strategy(),
    ) {
        let checkpoint = Checkpoint::from_raw(checkpoint);
        let result = sanitize(checkpoint, max_gap, batch);

        for pair in result.ordered.windows(2) {
            prop_assert!(pair[0].timestamp < pair[1].timestamp);
        }
        for sample in &result.ordered {
            prop_assert!(!checkpoint.is_stale(sample.timestamp));
        }
    }

    #[test]
    fn checkpoint_never_regresses(
        checkpoint in 0u64..10_000,
        max_gap in 1u64..5_000,
        batch in batch_strategy(),
    ) {
        let checkpoint = Checkpoint::from_raw(checkpoint);
        let result = sanitize(checkpoint, max_gap, batch);

        prop_assert!(result.checkpoint >= checkpoint);
        if !result.gap_ok {
            prop_assert_eq!(result.checkpoint, checkpoint);
        }
    }

    #[test]
    fn accounting_adds_up(
        checkpoint in 0u64..10_000,
        batch in batch_strategy(),
    ) {
        let total = batch.len();
        let result = sanitize(Checkpoint::from_raw(checkpoint), 1_000, batch);
        prop_assert_eq!(result.ordered.len() + result.stale + result.duplicates, total);
    }

    #[test]
    fn smoothing_preserves_constants(value in -1_000.0f64..1_000.0, len in 1usize..8) {
        let window = vec![value; len];
        let result = smooth(&window).unwrap();
        prop_assert!((result - value).abs() < 1e-9);

        let sum: f64 = weights(len).iter().sum();
        prop_assert!((sum - 1.0).abs() < 1e-12);
    }

    #[test]
    fn rolling_window_matches_slice_filter(values in prop::collection::vec(-50.0f64..50.0, 1..30)) {
        let mut window: SampleWindow = SampleWindow::new();
        for value in &values {
            window.push(*value);
        }

        let newest_first: Vec<f64> = values.iter().rev().copied().collect();
        let expected = smooth(&newest_first).unwrap();
        prop_assert_eq!(window.smoothed().unwrap(), expected);
    }
}

#[test]
fn reference_batches() {
    let at = |ts| Sample::new(20.0, 50.0, 800.0, ts);

    let result = sanitize(Checkpoint::at(1000), 1000, vec![at(2000), at(1500), at(2000), at(500)]);
    let ts: Vec<_> = result.ordered.iter().map(|s| s.timestamp).collect();
    assert_eq!(ts, vec![1500, 2000]);

    let result = sanitize(Checkpoint::at(1000), 1000, vec![at(1100), at(1500), at(1900)]);
    assert!(result.gap_ok);
    assert_eq!(result.checkpoint, Checkpoint::at(1900));

    let result = sanitize(Checkpoint::at(1000), 1000, vec![at(1100), at(2500)]);
    assert!(!result.gap_ok);
    assert_eq!(result.checkpoint, Checkpoint::at(1000));
}
