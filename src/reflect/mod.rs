//=====================================================
// File: reflect/mod.rs
//=====================================================
// Author: SolvraOS Contributors
// License: Duality Public License (DPL v1.0)
// Goal: Reflection surface consumed by the profiler
// Objective: Enumerate modules, types, nested types, methods and static
//            fields the way a managed host exposes them
//=====================================================

//! Arena-backed model of the host's loaded code.
//!
//! A [`Domain`] owns every module, type, method and field known to the host.
//! The profiler only ever holds handles into it; it never mutates metadata.

pub mod arena;
pub mod types;
pub mod view;

use std::collections::{HashSet, VecDeque};

pub use arena::{Arena, ArenaHandle};
pub use types::{
    FieldEntry, FieldInfo, GenericState, MethodEntry, MethodFlags, MethodInfo, TypeEntry,
    TypeInfo,
};
pub use view::MethodView;

pub type TypeHandle = ArenaHandle<TypeEntry>;
pub type MethodHandle = ArenaHandle<MethodEntry>;
pub type FieldHandle = ArenaHandle<FieldEntry>;

/// Identifies a loaded module (assembly).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModuleId(u32);

impl ModuleId {
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

/// Types every domain provides out of its core module.
#[derive(Debug, Clone, Copy)]
pub struct WellKnownTypes {
    pub object: TypeHandle,
    pub boolean: TypeHandle,
    pub int32: TypeHandle,
    pub single: TypeHandle,
    /// Non-generic sequence interface; methods returning it are never instrumented.
    pub enumerable: TypeHandle,
    /// Coroutine step interface used by the cooperative scheduler.
    pub coroutine: TypeHandle,
}

/// Every module, type, method and field loaded by the host.
#[derive(Debug)]
pub struct Domain {
    modules: Vec<String>,
    types: Arena<TypeEntry>,
    methods: Arena<MethodEntry>,
    fields: Arena<FieldEntry>,
    well_known: WellKnownTypes,
}

impl Default for Domain {
    fn default() -> Self {
        Self::new()
    }
}

impl Domain {
    pub const CORE_MODULE: ModuleId = ModuleId(0);

    pub fn new() -> Self {
        let mut types = Arena::new();
        let core = Self::CORE_MODULE;
        let mut add = |namespace: &str, name: &str, generic: GenericState| {
            types.allocate(TypeEntry::new(
                TypeInfo::new(core, Some(namespace), name).with_generic(generic),
                None,
            ))
        };
        let object = add("System", "Object", GenericState::NotGeneric);
        let boolean = add("System", "Boolean", GenericState::NotGeneric);
        let int32 = add("System", "Int32", GenericState::NotGeneric);
        let single = add("System", "Single", GenericState::NotGeneric);
        let enumerable = add("System.Collections", "IEnumerable", GenericState::NotGeneric);
        let coroutine = add(
            "System.Collections.Generic",
            "IEnumerator`1[System.Single]",
            GenericState::Constructed,
        );
        Self {
            modules: vec!["mscorlib".to_string()],
            types,
            methods: Arena::new(),
            fields: Arena::new(),
            well_known: WellKnownTypes {
                object,
                boolean,
                int32,
                single,
                enumerable,
                coroutine,
            },
        }
    }

    pub fn well_known(&self) -> &WellKnownTypes {
        &self.well_known
    }

    pub fn add_module(&mut self, name: impl Into<String>) -> ModuleId {
        self.modules.push(name.into());
        ModuleId((self.modules.len() - 1) as u32)
    }

    pub fn module_name(&self, module: ModuleId) -> Option<&str> {
        self.modules.get(module.index()).map(String::as_str)
    }

    pub fn module_by_name(&self, name: &str) -> Option<ModuleId> {
        self.modules
            .iter()
            .position(|module| module == name)
            .map(|index| ModuleId(index as u32))
    }

    pub fn add_type(&mut self, info: TypeInfo) -> TypeHandle {
        self.types.allocate(TypeEntry::new(info, None))
    }

    /// Registers `info` as a type nested inside `outer`.
    pub fn add_nested_type(&mut self, outer: TypeHandle, info: TypeInfo) -> TypeHandle {
        let handle = self.types.allocate(TypeEntry::new(info, Some(outer)));
        if let Some(entry) = self.types.get_mut(outer) {
            entry.nested.push(handle);
        }
        handle
    }

    /// Registers a constructed container type in the core module.
    pub fn add_container_type(&mut self, definition: &str) -> TypeHandle {
        let generic = if definition.contains('`') {
            GenericState::Constructed
        } else {
            GenericState::NotGeneric
        };
        let namespace = if generic.is_generic() {
            "System.Collections.Generic"
        } else {
            "System.Collections"
        };
        self.add_type(
            TypeInfo::new(Self::CORE_MODULE, Some(namespace), definition)
                .with_generic(generic)
                .implementing(self.well_known.enumerable)
                .as_container(definition),
        )
    }

    pub fn add_method(&mut self, declaring: TypeHandle, info: MethodInfo) -> MethodHandle {
        let handle = self.methods.allocate(MethodEntry { info, declaring });
        if let Some(entry) = self.types.get_mut(declaring) {
            entry.methods.push(handle);
        }
        handle
    }

    pub fn add_field(&mut self, declaring: TypeHandle, info: FieldInfo) -> FieldHandle {
        let handle = self.fields.allocate(FieldEntry { info, declaring });
        if let Some(entry) = self.types.get_mut(declaring) {
            entry.fields.push(handle);
        }
        handle
    }

    pub fn ty(&self, handle: TypeHandle) -> &TypeEntry {
        &self.types[handle]
    }

    pub fn field(&self, handle: FieldHandle) -> &FieldEntry {
        &self.fields[handle]
    }

    pub fn method(&self, handle: MethodHandle) -> MethodView<'_> {
        MethodView::new(self, handle)
    }

    pub(crate) fn method_entry(&self, handle: MethodHandle) -> &MethodEntry {
        &self.methods[handle]
    }

    pub fn contains_method(&self, handle: MethodHandle) -> bool {
        self.methods.get(handle).is_some()
    }

    pub fn contains_field(&self, handle: FieldHandle) -> bool {
        self.fields.get(handle).is_some()
    }

    pub fn methods(&self) -> impl Iterator<Item = MethodHandle> + '_ {
        self.methods.handles()
    }

    /// Namespace-qualified name; nested types are joined with `+`.
    pub fn full_name(&self, handle: TypeHandle) -> String {
        let mut segments = vec![self.ty(handle).info.name.as_str()];
        let mut current = handle;
        while let Some(outer) = self.ty(current).declaring {
            segments.push(self.ty(outer).info.name.as_str());
            current = outer;
        }
        segments.reverse();
        let joined = segments.join("+");
        match self.namespace(handle) {
            Some(namespace) => format!("{namespace}.{joined}"),
            None => joined,
        }
    }

    /// Namespace of `handle`, inherited from the outermost declaring type.
    pub fn namespace(&self, handle: TypeHandle) -> Option<&str> {
        let mut outermost = handle;
        while let Some(outer) = self.ty(outermost).declaring {
            outermost = outer;
        }
        self.ty(outermost).info.namespace.as_deref()
    }

    pub fn find_type(&self, full_name: &str) -> Option<TypeHandle> {
        self.types
            .handles()
            .find(|handle| self.full_name(*handle) == full_name)
    }

    /// Top-level types declared by `module`.
    pub fn module_types(&self, module: ModuleId) -> Vec<TypeHandle> {
        self.types
            .handles()
            .filter(|handle| {
                let entry = self.ty(*handle);
                entry.info.module == module && entry.declaring.is_none()
            })
            .collect()
    }

    /// Breadth-first expansion of `roots` through nested type declarations.
    pub fn including_nested(&self, roots: &[TypeHandle]) -> Vec<TypeHandle> {
        let mut seen = HashSet::new();
        let mut ordered = Vec::new();
        for root in roots {
            let mut queue = VecDeque::with_capacity(8);
            queue.push_back(*root);
            while let Some(current) = queue.pop_front() {
                if !seen.insert(current) {
                    continue;
                }
                ordered.push(current);
                queue.extend(self.ty(current).nested.iter().copied());
            }
        }
        ordered
    }

    /// `handle` followed by each of its base types.
    pub fn type_chain(&self, handle: TypeHandle) -> impl Iterator<Item = TypeHandle> + '_ {
        std::iter::successors(Some(handle), move |current| self.ty(*current).info.base)
    }

    /// Non-generic methods with a body, declared by `handle` or any base type.
    /// Open generic types yield nothing.
    pub fn fully_constructed_methods(&self, handle: TypeHandle) -> Vec<MethodHandle> {
        if self.ty(handle).info.generic.contains_generic_parameters() {
            return Vec::new();
        }
        self.type_chain(handle)
            .flat_map(|ty| self.ty(ty).methods.iter().copied())
            .filter(|method| {
                let info = &self.methods[*method].info;
                !info.flags.generic && info.body.is_some()
            })
            .collect()
    }

    /// Static fields declared by `handle` or any base type.
    /// Open generic types yield nothing.
    pub fn fully_constructed_static_fields(&self, handle: TypeHandle) -> Vec<FieldHandle> {
        if self.ty(handle).info.generic.contains_generic_parameters() {
            return Vec::new();
        }
        self.type_chain(handle)
            .flat_map(|ty| self.ty(ty).fields.iter().copied())
            .filter(|field| self.fields[*field].info.is_static)
            .collect()
    }

    /// True when a value of type `handle` can be stored in a `target` slot:
    /// identity, a base type, or any implemented interface.
    pub fn is_assignable_to(&self, handle: TypeHandle, target: TypeHandle) -> bool {
        let mut seen = HashSet::new();
        let mut queue = VecDeque::from([handle]);
        while let Some(current) = queue.pop_front() {
            if current == target {
                return true;
            }
            if !seen.insert(current) {
                continue;
            }
            let info = &self.ty(current).info;
            queue.extend(info.base);
            queue.extend(info.interfaces.iter().copied());
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::{BodyBuilder, Opcode};

    fn trivial_body() -> crate::body::MethodBody {
        let mut builder = BodyBuilder::new();
        builder.emit(Opcode::Return);
        builder.finish()
    }

    #[test]
    fn nested_names_use_plus_separator() {
        let mut domain = Domain::new();
        let game = domain.add_module("Assembly-CSharp");
        let outer = domain.add_type(TypeInfo::new(game, Some("Game"), "Player"));
        let inner = domain.add_nested_type(outer, TypeInfo::new(game, None, "<Move>d__4"));
        assert_eq!(domain.full_name(outer), "Game.Player");
        assert_eq!(domain.full_name(inner), "Game.Player+<Move>d__4");
        assert_eq!(domain.find_type("Game.Player+<Move>d__4"), Some(inner));
    }

    #[test]
    fn nested_types_are_expanded_breadth_first() {
        let mut domain = Domain::new();
        let game = domain.add_module("Assembly-CSharp");
        let a = domain.add_type(TypeInfo::new(game, Some("Game"), "A"));
        let b = domain.add_type(TypeInfo::new(game, Some("Game"), "B"));
        let a1 = domain.add_nested_type(a, TypeInfo::new(game, None, "A1"));
        let a2 = domain.add_nested_type(a, TypeInfo::new(game, None, "A2"));
        let a11 = domain.add_nested_type(a1, TypeInfo::new(game, None, "A11"));
        let roots = domain.module_types(game);
        assert_eq!(roots, vec![a, b]);
        assert_eq!(domain.including_nested(&roots), vec![a, a1, a2, a11, b]);
    }

    #[test]
    fn constructed_methods_walk_base_chain_and_skip_open_generics() {
        let mut domain = Domain::new();
        let game = domain.add_module("Assembly-CSharp");
        let base = domain.add_type(TypeInfo::new(game, Some("Game"), "Entity"));
        let derived = domain.add_type(TypeInfo::new(game, Some("Game"), "Player").deriving(base));
        let open = domain.add_type(
            TypeInfo::new(game, Some("Game"), "Pool`1").with_generic(GenericState::Open),
        );
        let tick = domain.add_method(base, MethodInfo::new("Tick").with_body(trivial_body()));
        let update = domain.add_method(derived, MethodInfo::new("Update").with_body(trivial_body()));
        domain.add_method(derived, MethodInfo::new("Map").as_generic().with_body(trivial_body()));
        domain.add_method(derived, MethodInfo::new("Extern"));
        domain.add_method(open, MethodInfo::new("Rent").with_body(trivial_body()));

        assert_eq!(domain.fully_constructed_methods(derived), vec![update, tick]);
        assert!(domain.fully_constructed_methods(open).is_empty());
    }

    #[test]
    fn assignability_follows_bases_and_interfaces() {
        let mut domain = Domain::new();
        let game = domain.add_module("Assembly-CSharp");
        let coroutine = domain.well_known().coroutine;
        let base = domain.add_type(TypeInfo::new(game, Some("Game"), "Routine").implementing(coroutine));
        let derived = domain.add_type(TypeInfo::new(game, Some("Game"), "Spawn").deriving(base));
        let list = domain.add_container_type("List`1");
        assert!(domain.is_assignable_to(derived, coroutine));
        assert!(domain.is_assignable_to(list, domain.well_known().enumerable));
        assert!(!domain.is_assignable_to(base, derived));
    }
}

//=====================================================
// End of file
//=====================================================
