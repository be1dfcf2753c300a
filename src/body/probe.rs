//=====================================================
// File: body/probe.rs
//=====================================================
// Author: SolvraOS Contributors
// License: Duality Public License (DPL v1.0)
// Goal: Process-wide switch read by instrumented code
// Objective: Let operators suspend counter mutation without un-patching
//=====================================================

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Shared "profiler disabled" switch.
///
/// Rewritten bodies embed a clone of the flag and read it on entry and on
/// exit; flipping it takes effect on the next invocation.
#[derive(Clone, Default)]
pub struct DisabledFlag(Arc<AtomicBool>);

impl DisabledFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    pub fn set(&self, disabled: bool) {
        self.0.store(disabled, Ordering::Relaxed);
    }
}

impl PartialEq for DisabledFlag {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for DisabledFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DisabledFlag({})", self.is_set())
    }
}


//=====================================================
// End of file
//=====================================================
