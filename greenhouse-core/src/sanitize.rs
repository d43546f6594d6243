//! Batch Sanitizer and Gap Detector
//!
//! ## Overview
//!
//! Transports deliver samples out of order, repeat them across snapshot and
//! delta batches, and occasionally lose a stretch of them. Before any value
//! is smoothed or checked for anomalies, each drained batch goes through
//! [`sanitize`]:
//!
//! 1. **Staleness**: samples older than the checkpoint were already processed
//!    and are discarded.
//! 2. **Deduplication**: samples are keyed by timestamp; the first occurrence
//!    in input order wins.
//! 3. **Ordering**: survivors are sorted ascending by timestamp.
//! 4. **Gap check**: the sorted survivors are walked starting from the
//!    checkpoint. A step larger than `max_gap` fails the pass.
//!
//! ```text
//! checkpoint = 1000, max_gap = 1000
//!
//! input:      [2000, 1500, 2000, 500]
//! stale:                         500
//! duplicate:              2000
//! ordered:    [1500, 2000]
//! walk:       1000 ─500─► 1500 ─500─► 2000      gap ok, checkpoint → 2000
//! ```
//!
//! ## Gap failure
//!
//! A failed gap check does not drop the ordered samples; it only refuses to
//! advance the checkpoint. The caller keeps the previous checkpoint and the
//! next pass resumes scanning from there.
//!
//! ## First load
//!
//! A [`Checkpoint::FIRST_LOAD`] checkpoint has no position to measure the
//! first step from, so the first step is never gap-checked. Every later step
//! in the same pass is.
//!
//! ## Properties
//!
//! For any checkpoint and batch the output is strictly increasing in
//! timestamp and never contains a sample older than the checkpoint. The
//! function is pure and reentrant.

use alloc::collections::btree_map::{BTreeMap, Entry};
use alloc::vec::Vec;

use crate::sample::Sample;
use crate::time::{Checkpoint, Timestamp};

/// Interval that broke the gap check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GapViolation {
    /// Walk position before the gap
    pub from: Timestamp,
    /// First sample after the gap
    pub to: Timestamp,
}

impl GapViolation {
    /// Length of the gap in milliseconds
    pub fn length(&self) -> u64 {
        self.to - self.from
    }
}

/// Result of one sanitize pass
#[derive(Debug, Clone, PartialEq)]
pub struct Sanitized {
    /// Deduplicated samples, strictly ascending by timestamp
    pub ordered: Vec<Sample>,
    /// Checkpoint to carry into the next pass
    pub checkpoint: Checkpoint,
    /// Whether every step stayed within `max_gap`
    pub gap_ok: bool,
    /// The offending interval when `gap_ok` is false
    pub gap: Option<GapViolation>,
    /// Samples discarded for being older than the checkpoint
    pub stale: usize,
    /// Samples collapsed onto an earlier sample with the same timestamp
    pub duplicates: usize,
}

/// Order, deduplicate and gap-check a batch against a checkpoint
///
/// Returns the ordered survivors, the checkpoint to use next, and whether
/// the gap check passed. On gap failure the returned checkpoint is the one
/// passed in.
pub fn sanitize<I>(checkpoint: Checkpoint, max_gap: u64, batch: I) -> Sanitized
where
    I: IntoIterator<Item = Sample>,
{
    let mut survivors: BTreeMap<Timestamp, Sample> = BTreeMap::new();
    let mut stale = 0;
    let mut duplicates = 0;

    for sample in batch {
        if checkpoint.is_stale(sample.timestamp) {
            stale += 1;
            continue;
        }
        match survivors.entry(sample.timestamp) {
            Entry::Vacant(slot) => {
                slot.insert(sample);
            }
            Entry::Occupied(_) => duplicates += 1,
        }
    }

    let ordered: Vec<Sample> = survivors.into_values().collect();

    let mut position = checkpoint.timestamp();
    let mut gap = None;
    for sample in &ordered {
        if let Some(from) = position {
            if sample.timestamp - from > max_gap {
                gap = Some(GapViolation {
                    from,
                    to: sample.timestamp,
                });
                break;
            }
        }
        position = Some(sample.timestamp);
    }

    let next = match (gap, position) {
        (Some(_), _) => checkpoint,
        (None, Some(ts)) => Checkpoint::at(ts),
        (None, None) => checkpoint,
    };

    Sanitized {
        ordered,
        checkpoint: next,
        gap_ok: gap.is_none(),
        gap,
        stale,
        duplicates,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(ts: Timestamp) -> Sample {
        Sample::new(20.0, 50.0, 800.0, ts)
    }

    fn timestamps(result: &Sanitized) -> Vec<Timestamp> {
        result.ordered.iter().map(|s| s.timestamp).collect()
    }

    #[test]
    fn sorts_dedupes_and_discards_stale() {
        let input = vec![at(2000), at(1500), at(2000), at(500)];
        let result = sanitize(Checkpoint::at(1000), 1000, input);

        assert_eq!(timestamps(&result), vec![1500, 2000]);
        assert_eq!(result.stale, 1);
        assert_eq!(result.duplicates, 1);
    }

    #[test]
    fn passes_when_gaps_within_tolerance() {
        let input = vec![at(1100), at(1500), at(1900)];
        let result = sanitize(Checkpoint::at(1000), 1000, input);

        assert!(result.gap_ok);
        assert_eq!(result.checkpoint, Checkpoint::at(1900));
        assert!(result.gap.is_none());
    }

    #[test]
    fn fails_and_resets_on_large_gap() {
        let input = vec![at(1100), at(2500)];
        let result = sanitize(Checkpoint::at(1000), 1000, input);

        assert!(!result.gap_ok);
        assert_eq!(result.checkpoint, Checkpoint::at(1000));
        assert_eq!(result.gap, Some(GapViolation { from: 1100, to: 2500 }));
        assert_eq!(result.gap.map(|g| g.length()), Some(1400));
        // Ordered samples are still returned
        assert_eq!(timestamps(&result), vec![1100, 2500]);
    }

    #[test]
    fn empty_input_keeps_checkpoint() {
        let result = sanitize(Checkpoint::at(1000), 1000, Vec::new());
        assert!(result.ordered.is_empty());
        assert!(result.gap_ok);
        assert_eq!(result.checkpoint, Checkpoint::at(1000));

        let result = sanitize(Checkpoint::FIRST_LOAD, 1000, Vec::new());
        assert_eq!(result.checkpoint, Checkpoint::FIRST_LOAD);
    }

    #[test]
    fn first_load_skips_first_step_only() {
        // First step from "nothing" is unchecked however far away it is
        let result = sanitize(Checkpoint::FIRST_LOAD, 1000, vec![at(1_700_000_000_000)]);
        assert!(result.gap_ok);
        assert_eq!(result.checkpoint, Checkpoint::at(1_700_000_000_000));

        // Later steps in the same pass are checked
        let result = sanitize(Checkpoint::FIRST_LOAD, 1000, vec![at(5000), at(9000)]);
        assert!(!result.gap_ok);
        assert_eq!(result.checkpoint, Checkpoint::FIRST_LOAD);
    }

    #[test]
    fn gap_exactly_at_tolerance_passes() {
        let result = sanitize(Checkpoint::at(1000), 1000, vec![at(2000), at(3000)]);
        assert!(result.gap_ok);
        assert_eq!(result.checkpoint, Checkpoint::at(3000));
    }

    #[test]
    fn first_occurrence_wins_on_duplicate() {
        let first = Sample::new(20.0, 50.0, 800.0, 1500);
        let second = Sample::new(99.0, 99.0, 999.0, 1500);
        let result = sanitize(Checkpoint::at(1000), 1000, vec![first.clone(), second]);

        assert_eq!(result.ordered, vec![first]);
    }

    #[test]
    fn sample_at_checkpoint_is_kept() {
        let result = sanitize(Checkpoint::at(1000), 1000, vec![at(1000)]);
        assert_eq!(timestamps(&result), vec![1000]);
        assert_eq!(result.checkpoint, Checkpoint::at(1000));
    }
}
