//=====================================================
// File: registry.rs
//=====================================================
// Author: SolvraOS Contributors
// License: Duality Public License (DPL v1.0)
// Goal: Stable slot and display name per instrumented method
// Objective: Thread-safe, append-only registration backed by the
//            metrics store
//=====================================================

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::RwLock;
use serde::Serialize;
use tracing::debug;

use crate::metrics::{MetricsStore, RecordRef};
use crate::reflect::{MethodHandle, MethodView};

/// Capacity used when the configuration does not override it.
pub const DEFAULT_MAX_SLOTS: usize = 8000;

/// Index of an instrumented method's record in the metrics store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Slot(u32);

impl Slot {
    pub fn new(index: u32) -> Self {
        Self(index)
    }

    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Default)]
struct Entries {
    by_method: HashMap<MethodHandle, Slot>,
    by_slot: HashMap<Slot, String>,
}

/// Assigns each instrumented method one slot, once.
#[derive(Debug)]
pub struct InstrumentationRegistry {
    count: AtomicUsize,
    entries: RwLock<Entries>,
    store: Arc<MetricsStore>,
}

impl Default for InstrumentationRegistry {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_MAX_SLOTS)
    }
}

impl InstrumentationRegistry {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            count: AtomicUsize::new(0),
            entries: RwLock::new(Entries::default()),
            store: Arc::new(MetricsStore::with_capacity(capacity)),
        }
    }

    pub fn capacity(&self) -> usize {
        self.store.capacity()
    }

    pub fn registered_count(&self) -> usize {
        self.count.load(Ordering::Acquire)
    }

    pub fn store(&self) -> &Arc<MetricsStore> {
        &self.store
    }

    /// Registers `method`, returning `false` when it already has a slot or
    /// capacity is exhausted. A rejected call leaves no trace.
    pub fn register(&self, method: &MethodView<'_>) -> bool {
        let name = method.display_name();
        let mut entries = self.entries.write();
        if entries.by_method.contains_key(&method.handle()) {
            return false;
        }
        let Some(slot) = self.allocate() else {
            debug!(method = %name, capacity = self.capacity(), "registry full");
            return false;
        };
        entries.by_method.insert(method.handle(), slot);
        entries.by_slot.insert(slot, name);
        true
    }

    /// Fetch-and-increment on the slot counter, refusing past capacity.
    fn allocate(&self) -> Option<Slot> {
        let capacity = self.capacity();
        self.count
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |count| {
                (count < capacity).then_some(count + 1)
            })
            .ok()
            .map(|index| Slot(index as u32))
    }

    pub fn slot_of(&self, method: MethodHandle) -> Option<Slot> {
        self.entries.read().by_method.get(&method).copied()
    }

    pub fn name_of(&self, slot: Slot) -> Option<String> {
        self.entries.read().by_slot.get(&slot).cloned()
    }

    pub fn record_ref(&self, slot: Slot) -> Option<RecordRef> {
        if slot.index() >= self.registered_count() {
            return None;
        }
        RecordRef::new(self.store.clone(), slot)
    }

    /// Registered slots in assignment order.
    pub fn slots(&self) -> impl Iterator<Item = Slot> {
        (0..self.registered_count() as u32).map(Slot)
    }

    pub fn reset(&self, slot: Slot) {
        if slot.index() < self.registered_count() {
            self.store.reset(slot);
        }
    }

    pub fn reset_all(&self) {
        self.store.reset_all(self.registered_count());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::{BodyBuilder, Opcode};
    use crate::reflect::{Domain, MethodInfo, TypeInfo};
    use std::thread;

    fn domain_with_methods(count: usize) -> (Domain, Vec<MethodHandle>) {
        let mut domain = Domain::new();
        let game = domain.add_module("Assembly-CSharp");
        let ty = domain.add_type(TypeInfo::new(game, Some("Game"), "Player"));
        let methods = (0..count)
            .map(|index| {
                let mut builder = BodyBuilder::new();
                builder.emit(Opcode::Return);
                domain.add_method(
                    ty,
                    MethodInfo::new(format!("Step{index}")).with_body(builder.finish()),
                )
            })
            .collect();
        (domain, methods)
    }

    #[test]
    fn slots_are_contiguous_in_registration_order() {
        let (domain, methods) = domain_with_methods(5);
        let registry = InstrumentationRegistry::with_capacity(16);
        for method in methods.iter().rev() {
            assert!(registry.register(&domain.method(*method)));
        }
        let slots: Vec<_> = methods
            .iter()
            .rev()
            .map(|method| registry.slot_of(*method).map(|slot| slot.index()))
            .collect();
        assert_eq!(slots, vec![Some(0), Some(1), Some(2), Some(3), Some(4)]);
        assert_eq!(registry.registered_count(), 5);
    }

    #[test]
    fn second_registration_is_rejected_without_consuming_a_slot() {
        let (domain, methods) = domain_with_methods(2);
        let registry = InstrumentationRegistry::with_capacity(16);
        assert!(registry.register(&domain.method(methods[0])));
        assert!(!registry.register(&domain.method(methods[0])));
        assert_eq!(registry.registered_count(), 1);
        assert!(registry.register(&domain.method(methods[1])));
        assert_eq!(registry.slot_of(methods[1]), Some(Slot(1)));
    }

    #[test]
    fn names_round_trip() {
        let (domain, methods) = domain_with_methods(3);
        let registry = InstrumentationRegistry::with_capacity(16);
        for method in &methods {
            registry.register(&domain.method(*method));
        }
        for (index, method) in methods.iter().enumerate() {
            let slot = registry.slot_of(*method).expect("registered");
            assert_eq!(registry.name_of(slot), Some(format!("Game.Player.Step{index}")));
        }
        assert_eq!(registry.name_of(Slot(3)), None);
    }

    #[test]
    fn capacity_exhaustion_leaves_no_partial_state() {
        let (domain, methods) = domain_with_methods(3);
        let registry = InstrumentationRegistry::with_capacity(2);
        assert!(registry.register(&domain.method(methods[0])));
        assert!(registry.register(&domain.method(methods[1])));
        assert!(!registry.register(&domain.method(methods[2])));
        assert_eq!(registry.registered_count(), 2);
        assert_eq!(registry.slot_of(methods[2]), None);
        assert_eq!(registry.name_of(Slot(2)), None);
    }

    #[test]
    fn concurrent_registration_assigns_unique_slots() {
        let (domain, methods) = domain_with_methods(64);
        let registry = InstrumentationRegistry::with_capacity(128);
        thread::scope(|scope| {
            for chunk in methods.chunks(16) {
                let registry = &registry;
                let domain = &domain;
                scope.spawn(move || {
                    for method in chunk {
                        assert!(registry.register(&domain.method(*method)));
                    }
                });
            }
        });
        let mut slots: Vec<_> = methods
            .iter()
            .filter_map(|method| registry.slot_of(*method))
            .collect();
        slots.sort();
        slots.dedup();
        assert_eq!(slots.len(), 64);
        assert_eq!(slots.last(), Some(&Slot(63)));
    }

    #[test]
    fn record_refs_exist_only_for_registered_slots() {
        let (domain, methods) = domain_with_methods(1);
        let registry = InstrumentationRegistry::with_capacity(4);
        assert!(registry.record_ref(Slot(0)).is_none());
        registry.register(&domain.method(methods[0]));
        assert!(registry.record_ref(Slot(0)).is_some());
    }
}

//=====================================================
// End of file
//=====================================================
