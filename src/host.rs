//=====================================================
// File: host.rs
//=====================================================
// Author: SolvraOS Contributors
// License: Duality Public License (DPL v1.0)
// Goal: Capabilities the profiler borrows from its host runtime
// Objective: Body patching, timer, heap gauge and accessor invocation
//            behind small traits, plus stock clock and heap implementations
//=====================================================

use std::collections::HashSet;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Instant;

use crate::ProfilerResult;
use crate::body::MethodBody;
use crate::reflect::MethodHandle;

/// Replaces executable method bodies at runtime.
pub trait MethodPatcher {
    /// Calls `rewrite` with the method's current body and installs the result.
    fn patch(
        &self,
        method: MethodHandle,
        rewrite: &mut dyn FnMut(&MethodBody) -> MethodBody,
    ) -> ProfilerResult<()>;

    /// Methods already modified by some other optimisation pass.
    fn previously_patched(&self) -> HashSet<MethodHandle>;
}

/// High-resolution monotonic timer, in ticks.
pub trait TickSource: Send + Sync {
    fn now_ticks(&self) -> i64;

    /// Waits until at least `ticks` have elapsed.
    fn spin(&self, ticks: u32) {
        let start = self.now_ticks();
        while self.now_ticks().wrapping_sub(start) < i64::from(ticks) {
            std::hint::spin_loop();
        }
    }
}

/// Bytes currently allocated on the managed heap.
pub trait HeapCounter: Send + Sync {
    fn used_bytes(&self) -> i64;
}

/// Runs a synthesised accessor body and returns the count it produced.
pub trait AccessorInvoker {
    fn invoke_accessor(&self, body: &MethodBody) -> ProfilerResult<i64>;
}

/// Wall-clock ticks of 100ns since construction.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub const NANOS_PER_TICK: u128 = 100;

    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl TickSource for MonotonicClock {
    fn now_ticks(&self) -> i64 {
        (self.origin.elapsed().as_nanos() / Self::NANOS_PER_TICK) as i64
    }
}

/// Clock that only moves when told to. `spin` advances it instantly.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, ticks: i64) {
        self.now.fetch_add(ticks, Ordering::Relaxed);
    }
}

impl TickSource for ManualClock {
    fn now_ticks(&self) -> i64 {
        self.now.load(Ordering::Relaxed)
    }

    fn spin(&self, ticks: u32) {
        self.advance(i64::from(ticks));
    }
}

/// Heap byte counter driven by the reference runtime.
#[derive(Debug, Default)]
pub struct HeapGauge {
    used: AtomicI64,
}

impl HeapGauge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allocate(&self, bytes: u32) {
        self.used.fetch_add(i64::from(bytes), Ordering::Relaxed);
    }

    /// Releases up to `bytes`; the gauge never drops below zero.
    pub fn collect(&self, bytes: u32) {
        let _ = self
            .used
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |used| {
                Some((used - i64::from(bytes)).max(0))
            });
    }
}

impl HeapCounter for HeapGauge {
    fn used_bytes(&self) -> i64 {
        self.used.load(Ordering::Relaxed)
    }
}


//=====================================================
// End of file
//=====================================================
