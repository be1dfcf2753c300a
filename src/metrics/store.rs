//=====================================================
// File: metrics/store.rs
//=====================================================
// Author: SolvraOS Contributors
// License: Duality Public License (DPL v1.0)
// Goal: Fixed-capacity per-method counters
// Objective: Allocation-free, lock-free updates from instrumented call sites
//=====================================================

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use serde::Serialize;

use crate::registry::Slot;

/// One of the four counters in a [`MetricsRecord`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Counter {
    Invocations,
    TotalTicks,
    MaxTicks,
    TotalMemory,
}

/// Live counters for one instrumented method.
///
/// Fields are only ever loaded and stored with relaxed ordering, never
/// read-modify-written: two threads running the same method can lose an
/// update. Readers may observe a record mid-update.
#[repr(C)]
#[derive(Default)]
pub struct MetricsRecord {
    invocations: AtomicU32,
    total_ticks: AtomicU32,
    max_ticks: AtomicU32,
    total_memory: AtomicU32,
}

impl MetricsRecord {
    fn cell(&self, counter: Counter) -> &AtomicU32 {
        match counter {
            Counter::Invocations => &self.invocations,
            Counter::TotalTicks => &self.total_ticks,
            Counter::MaxTicks => &self.max_ticks,
            Counter::TotalMemory => &self.total_memory,
        }
    }

    pub fn get(&self, counter: Counter) -> u32 {
        self.cell(counter).load(Ordering::Relaxed)
    }

    pub fn set(&self, counter: Counter, value: u32) {
        self.cell(counter).store(value, Ordering::Relaxed);
    }

    /// Wrapping add, done as a plain load followed by a plain store.
    pub fn add(&self, counter: Counter, value: u32) {
        let cell = self.cell(counter);
        cell.store(cell.load(Ordering::Relaxed).wrapping_add(value), Ordering::Relaxed);
    }

    pub fn invocations(&self) -> u32 {
        self.get(Counter::Invocations)
    }

    pub fn total_ticks(&self) -> u32 {
        self.get(Counter::TotalTicks)
    }

    pub fn max_ticks(&self) -> u32 {
        self.get(Counter::MaxTicks)
    }

    pub fn total_memory(&self) -> u32 {
        self.get(Counter::TotalMemory)
    }

    pub fn reset(&self) {
        for counter in [
            Counter::Invocations,
            Counter::TotalTicks,
            Counter::MaxTicks,
            Counter::TotalMemory,
        ] {
            self.set(counter, 0);
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            invocations: self.invocations(),
            total_ticks: self.total_ticks(),
            max_ticks: self.max_ticks(),
            total_memory: self.total_memory(),
        }
    }
}

impl fmt::Debug for MetricsRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.snapshot().fmt(f)
    }
}

/// Point-in-time copy of a [`MetricsRecord`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub invocations: u32,
    pub total_ticks: u32,
    pub max_ticks: u32,
    pub total_memory: u32,
}

impl MetricsSnapshot {
    pub fn avg_ticks(&self) -> u32 {
        self.total_ticks / self.invocations.max(1)
    }

    pub fn avg_memory(&self) -> u32 {
        self.total_memory / self.invocations.max(1)
    }
}

/// Contiguous array of records indexed by [`Slot`].
pub struct MetricsStore {
    records: Box<[MetricsRecord]>,
}

impl MetricsStore {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            records: (0..capacity).map(|_| MetricsRecord::default()).collect(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.records.len()
    }

    pub fn record(&self, slot: Slot) -> Option<&MetricsRecord> {
        self.records.get(slot.index())
    }

    pub fn reset(&self, slot: Slot) {
        if let Some(record) = self.record(slot) {
            record.reset();
        }
    }

    /// Zeroes the first `registered` records.
    pub fn reset_all(&self, registered: usize) {
        for record in self.records.iter().take(registered) {
            record.reset();
        }
    }
}

impl fmt::Debug for MetricsStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetricsStore")
            .field("capacity", &self.capacity())
            .finish()
    }
}

/// Direct reference to one record, embedded in rewritten bodies so the call
/// site never looks anything up.
#[derive(Clone)]
pub struct RecordRef {
    store: Arc<MetricsStore>,
    slot: Slot,
}

impl RecordRef {
    pub fn new(store: Arc<MetricsStore>, slot: Slot) -> Option<Self> {
        (slot.index() < store.capacity()).then_some(Self { store, slot })
    }

    pub fn slot(&self) -> Slot {
        self.slot
    }

    pub fn record(&self) -> &MetricsRecord {
        &self.store.records[self.slot.index()]
    }
}

impl PartialEq for RecordRef {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.store, &other.store) && self.slot == other.slot
    }
}

impl fmt::Debug for RecordRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RecordRef({})", self.slot.index())
    }
}


//=====================================================
// End of file
//=====================================================
