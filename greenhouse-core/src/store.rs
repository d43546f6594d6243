//! Storage collaborator
//!
//! The pipeline hands every sanitized batch to a [`RecordStore`] for durable
//! append. The scheduler calls [`RecordStore::append`] from inside its process
//! tick, so implementations must return promptly: a backend doing real I/O
//! should queue the batch and write it from its own task.
//!
//! Persistence is best effort. A failed append is logged by the caller and the
//! batch is not retried; samples of that tick may be lost.
//!
//! The read side, [`RecordStore::recent`], serves external consumers such as
//! an upload job. The pipeline itself never reads back.

use alloc::collections::BTreeMap;
use alloc::vec::Vec;

use crate::errors::StoreError;
use crate::sample::SensorRecord;
use crate::time::Timestamp;

/// Durable sink for sanitized records
pub trait RecordStore {
    /// Append a batch of records
    ///
    /// Records whose timestamp is already stored are skipped, like an
    /// insert-or-ignore on the primary key. A batch is otherwise
    /// all-or-nothing: on error the store is left unchanged.
    fn append(&mut self, records: &[SensorRecord]) -> Result<(), StoreError>;

    /// The `limit` most recent records, newest first
    fn recent(&self, limit: usize) -> Result<Vec<SensorRecord>, StoreError>;
}

/// In-memory store keyed by timestamp
///
/// Mirrors a table with `timestamp` as primary key. Already stored timestamps
/// are skipped and keep their first record; a batch that repeats a timestamp
/// within itself is rejected whole. An optional capacity evicts the oldest
/// records after each append.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    records: BTreeMap<Timestamp, SensorRecord>,
    capacity: Option<usize>,
}

impl MemoryStore {
    /// Unbounded store
    pub fn new() -> Self {
        Self::default()
    }

    /// Store keeping at most `capacity` records
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            records: BTreeMap::new(),
            capacity: Some(capacity),
        }
    }

    /// Number of stored records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the store is empty
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Newest stored record
    pub fn last(&self) -> Option<&SensorRecord> {
        self.records.values().next_back()
    }
}

impl RecordStore for MemoryStore {
    fn append(&mut self, records: &[SensorRecord]) -> Result<(), StoreError> {
        let mut batch: BTreeMap<Timestamp, SensorRecord> = BTreeMap::new();
        for record in records {
            if batch.insert(record.timestamp, *record).is_some() {
                return Err(StoreError::DuplicateTimestamp {
                    timestamp: record.timestamp,
                });
            }
        }
        batch.retain(|timestamp, _| !self.records.contains_key(timestamp));

        let inserted = batch.len();
        self.records.append(&mut batch);

        if let Some(capacity) = self.capacity {
            while self.records.len() > capacity {
                self.records.pop_first();
            }
        }

        log_debug!("stored {} records ({} total)", inserted, self.records.len());
        Ok(())
    }

    fn recent(&self, limit: usize) -> Result<Vec<SensorRecord>, StoreError> {
        Ok(self.records.values().rev().take(limit).copied().collect())
    }
}
