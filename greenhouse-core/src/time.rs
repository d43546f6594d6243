//! Time and checkpoint handling
//!
//! Timestamps are device-side milliseconds since the Unix epoch. They are the
//! ordering and deduplication key for the whole pipeline, so two samples with
//! equal timestamps are considered the same sample regardless of their values.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Timestamp in milliseconds since epoch
pub type Timestamp = u64;

/// Processing checkpoint
///
/// Marks "everything at or before this instant has been processed". A fresh
/// pipeline has no checkpoint at all, which is distinct from a checkpoint at
/// epoch zero: the first load skips the gap check for its first step.
///
/// Wire formats that use `0` for "not yet initialized" can go through
/// [`Checkpoint::from_raw`], which maps `0` to [`Checkpoint::FIRST_LOAD`].
/// That mapping only holds as long as real timestamps are strictly positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct Checkpoint(Option<Timestamp>);

impl Checkpoint {
    /// Nothing processed yet
    pub const FIRST_LOAD: Self = Self(None);

    /// Checkpoint at a concrete instant
    pub const fn at(timestamp: Timestamp) -> Self {
        Self(Some(timestamp))
    }

    /// Interpret a raw value where `0` means "first load"
    pub const fn from_raw(raw: Timestamp) -> Self {
        if raw == 0 {
            Self::FIRST_LOAD
        } else {
            Self(Some(raw))
        }
    }

    /// Raw value, `0` for first load
    pub const fn to_raw(self) -> Timestamp {
        match self.0 {
            Some(ts) => ts,
            None => 0,
        }
    }

    /// Concrete instant, if any
    pub const fn timestamp(self) -> Option<Timestamp> {
        self.0
    }

    /// Whether nothing has been processed yet
    pub const fn is_first_load(self) -> bool {
        self.0.is_none()
    }

    /// Whether a sample at `timestamp` is older than this checkpoint
    pub fn is_stale(self, timestamp: Timestamp) -> bool {
        matches!(self.0, Some(cp) if timestamp < cp)
    }
}

impl From<Timestamp> for Checkpoint {
    fn from(raw: Timestamp) -> Self {
        Self::from_raw(raw)
    }
}
