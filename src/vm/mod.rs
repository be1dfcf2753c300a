//=====================================================
// File: vm/mod.rs
//=====================================================
// Author: SolvraOS Contributors
// License: Duality Public License (DPL v1.0)
// Goal: Reference host runtime for instrumented code
// Objective: Own live method bodies and static storage, execute bodies,
//            and expose patching, timing and heap capabilities
//=====================================================

mod interpreter;
pub mod optimize;
pub mod value;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use crate::body::MethodBody;
use crate::host::{
    AccessorInvoker, HeapCounter, HeapGauge, MethodPatcher, MonotonicClock, TickSource,
};
use crate::reflect::{Domain, FieldHandle, MethodHandle};
use crate::{ProfilerError, ProfilerResult};

pub use value::{ContainerValue, Value};

/// Nested call limit before execution is aborted.
pub const MAX_CALL_DEPTH: usize = 256;

/// Executes method bodies of a [`Domain`] and lets the profiler swap them.
///
/// Bodies are taken from the domain on first use and cached; patched bodies
/// replace the cached copy and are picked up by the next call.
pub struct Runtime {
    domain: Arc<Domain>,
    bodies: RwLock<HashMap<MethodHandle, Arc<MethodBody>>>,
    statics: RwLock<HashMap<FieldHandle, Value>>,
    optimized: RwLock<HashSet<MethodHandle>>,
    clock: Arc<dyn TickSource>,
    heap: Arc<HeapGauge>,
}

impl Runtime {
    pub fn new(domain: Arc<Domain>) -> Self {
        Self::with_clock(domain, Arc::new(MonotonicClock::new()))
    }

    pub fn with_clock(domain: Arc<Domain>, clock: Arc<dyn TickSource>) -> Self {
        Self {
            domain,
            bodies: RwLock::new(HashMap::new()),
            statics: RwLock::new(HashMap::new()),
            optimized: RwLock::new(HashSet::new()),
            clock,
            heap: Arc::new(HeapGauge::new()),
        }
    }

    pub fn domain(&self) -> &Arc<Domain> {
        &self.domain
    }

    pub fn clock(&self) -> &dyn TickSource {
        self.clock.as_ref()
    }

    pub fn heap(&self) -> &HeapGauge {
        &self.heap
    }

    /// Live body of `method`, loading it from the domain on first use.
    pub fn body(&self, method: MethodHandle) -> ProfilerResult<Arc<MethodBody>> {
        if let Some(body) = self.bodies.read().get(&method) {
            return Ok(body.clone());
        }
        if !self.domain.contains_method(method) {
            return Err(ProfilerError::UnknownMethod(format!("{method:?}")));
        }
        let view = self.domain.method(method);
        let body = view
            .body()
            .cloned()
            .ok_or_else(|| ProfilerError::MissingBody(view.display_name()))?;
        let mut bodies = self.bodies.write();
        Ok(bodies.entry(method).or_insert_with(|| Arc::new(body)).clone())
    }

    pub fn invoke(&self, method: MethodHandle, args: &[Value]) -> ProfilerResult<Value> {
        self.call(method, args, 0)
    }

    pub fn set_static(&self, field: FieldHandle, value: Value) -> ProfilerResult<()> {
        if !self.domain.contains_field(field) {
            return Err(ProfilerError::UnknownField(format!("{field:?}")));
        }
        self.statics.write().insert(field, value);
        Ok(())
    }

    pub fn load_static(&self, field: FieldHandle) -> Value {
        self.statics.read().get(&field).cloned().unwrap_or_default()
    }

    /// Runs the peephole pass over `method`. Touched methods are reported by
    /// [`MethodPatcher::previously_patched`].
    pub fn optimize(&self, method: MethodHandle) -> ProfilerResult<bool> {
        let mut body = (*self.body(method)?).clone();
        if !optimize::optimize(&mut body) {
            return Ok(false);
        }
        self.bodies.write().insert(method, Arc::new(body));
        self.optimized.write().insert(method);
        debug!(method = ?self.domain.method(method), "peephole pass rewrote body");
        Ok(true)
    }
}

impl MethodPatcher for Runtime {
    fn patch(
        &self,
        method: MethodHandle,
        rewrite: &mut dyn FnMut(&MethodBody) -> MethodBody,
    ) -> ProfilerResult<()> {
        let current = self.body(method)?;
        let patched = rewrite(current.as_ref());
        if let Some(label) = patched.dangling_target() {
            return Err(ProfilerError::UnknownLabel {
                method: self.domain.method(method).display_name(),
                label: label.0,
            });
        }
        self.bodies.write().insert(method, Arc::new(patched));
        Ok(())
    }

    fn previously_patched(&self) -> HashSet<MethodHandle> {
        self.optimized.read().clone()
    }
}

impl AccessorInvoker for Runtime {
    fn invoke_accessor(&self, body: &MethodBody) -> ProfilerResult<i64> {
        let value = self.run(body, &[], 0, None)?;
        value.as_int().ok_or_else(|| {
            ProfilerError::Vm(format!(
                "accessor returned {} instead of an integer",
                value.type_name()
            ))
        })
    }
}

impl std::fmt::Debug for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runtime")
            .field("loaded_bodies", &self.bodies.read().len())
            .field("statics", &self.statics.read().len())
            .field("heap_bytes", &self.heap.used_bytes())
            .finish()
    }
}

//=====================================================
// End of file
//=====================================================
