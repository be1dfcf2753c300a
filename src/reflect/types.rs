//=====================================================
// File: reflect/types.rs
//=====================================================
// Author: SolvraOS Contributors
// License: Duality Public License (DPL v1.0)
// Goal: Metadata records describing loaded types, methods and fields
// Objective: Give the profiler the same static facts a host reflection
//            surface exposes, with builder-style construction for hosts
//=====================================================

use crate::body::MethodBody;

use super::{FieldHandle, MethodHandle, ModuleId, TypeHandle};

/// Generic-ness of a type definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GenericState {
    #[default]
    NotGeneric,
    /// Generic definition with unbound type parameters.
    Open,
    /// Generic type with every parameter bound.
    Constructed,
}

impl GenericState {
    pub fn is_generic(self) -> bool {
        !matches!(self, GenericState::NotGeneric)
    }

    pub fn contains_generic_parameters(self) -> bool {
        matches!(self, GenericState::Open)
    }
}

/// Description of a type as supplied by the host.
#[derive(Debug, Clone)]
pub struct TypeInfo {
    pub name: String,
    pub namespace: Option<String>,
    pub module: ModuleId,
    pub generic: GenericState,
    pub base: Option<TypeHandle>,
    pub interfaces: Vec<TypeHandle>,
    pub compiler_generated: bool,
    /// Generic definition name for container types (`List`1`, `ArrayList`, ...).
    pub container: Option<String>,
}

impl TypeInfo {
    pub fn new(module: ModuleId, namespace: Option<&str>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.map(str::to_string),
            module,
            generic: GenericState::NotGeneric,
            base: None,
            interfaces: Vec::new(),
            compiler_generated: false,
            container: None,
        }
    }

    pub fn with_generic(mut self, generic: GenericState) -> Self {
        self.generic = generic;
        self
    }

    pub fn deriving(mut self, base: TypeHandle) -> Self {
        self.base = Some(base);
        self
    }

    pub fn implementing(mut self, interface: TypeHandle) -> Self {
        self.interfaces.push(interface);
        self
    }

    pub fn as_compiler_generated(mut self) -> Self {
        self.compiler_generated = true;
        self
    }

    pub fn as_container(mut self, definition: impl Into<String>) -> Self {
        self.container = Some(definition.into());
        self
    }
}

/// Static facts about a method.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MethodFlags {
    pub is_static: bool,
    pub generic: bool,
    pub constructor: bool,
    pub is_abstract: bool,
    pub special_name: bool,
    pub compiler_generated: bool,
    pub runtime_initialize_on_load: bool,
}

/// Description of a method as supplied by the host.
#[derive(Debug, Clone)]
pub struct MethodInfo {
    pub name: String,
    pub parameters: u16,
    /// `None` for methods returning nothing.
    pub return_type: Option<TypeHandle>,
    pub flags: MethodFlags,
    /// Original executable body; `None` for native or extern stubs.
    pub body: Option<MethodBody>,
}

impl MethodInfo {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parameters: 0,
            return_type: None,
            flags: MethodFlags::default(),
            body: None,
        }
    }

    pub fn with_parameters(mut self, parameters: u16) -> Self {
        self.parameters = parameters;
        self
    }

    pub fn returning(mut self, ty: TypeHandle) -> Self {
        self.return_type = Some(ty);
        self
    }

    pub fn with_body(mut self, body: MethodBody) -> Self {
        self.body = Some(body);
        self
    }

    pub fn as_static(mut self) -> Self {
        self.flags.is_static = true;
        self
    }

    pub fn as_generic(mut self) -> Self {
        self.flags.generic = true;
        self
    }

    pub fn as_constructor(mut self) -> Self {
        self.flags.constructor = true;
        self.flags.special_name = true;
        self
    }

    pub fn as_abstract(mut self) -> Self {
        self.flags.is_abstract = true;
        self.body = None;
        self
    }

    pub fn with_special_name(mut self) -> Self {
        self.flags.special_name = true;
        self
    }

    pub fn as_compiler_generated(mut self) -> Self {
        self.flags.compiler_generated = true;
        self
    }

    pub fn initialize_on_load(mut self) -> Self {
        self.flags.runtime_initialize_on_load = true;
        self
    }
}

/// Description of a field as supplied by the host.
#[derive(Debug, Clone)]
pub struct FieldInfo {
    pub name: String,
    pub field_type: TypeHandle,
    pub is_static: bool,
}

impl FieldInfo {
    pub fn new_static(name: impl Into<String>, field_type: TypeHandle) -> Self {
        Self {
            name: name.into(),
            field_type,
            is_static: true,
        }
    }

    pub fn instance(name: impl Into<String>, field_type: TypeHandle) -> Self {
        Self {
            name: name.into(),
            field_type,
            is_static: false,
        }
    }
}

/// A type registered in a [`Domain`](super::Domain).
#[derive(Debug, Clone)]
pub struct TypeEntry {
    pub info: TypeInfo,
    pub(super) declaring: Option<TypeHandle>,
    pub(super) nested: Vec<TypeHandle>,
    pub(super) methods: Vec<MethodHandle>,
    pub(super) fields: Vec<FieldHandle>,
}

impl TypeEntry {
    pub(super) fn new(info: TypeInfo, declaring: Option<TypeHandle>) -> Self {
        Self {
            info,
            declaring,
            nested: Vec::new(),
            methods: Vec::new(),
            fields: Vec::new(),
        }
    }

    pub fn declaring_type(&self) -> Option<TypeHandle> {
        self.declaring
    }

    pub fn nested_types(&self) -> &[TypeHandle] {
        &self.nested
    }

    pub fn methods(&self) -> &[MethodHandle] {
        &self.methods
    }

    pub fn fields(&self) -> &[FieldHandle] {
        &self.fields
    }
}

/// A method registered in a [`Domain`](super::Domain).
#[derive(Debug, Clone)]
pub struct MethodEntry {
    pub info: MethodInfo,
    pub declaring: TypeHandle,
}

/// A field registered in a [`Domain`](super::Domain).
#[derive(Debug, Clone)]
pub struct FieldEntry {
    pub info: FieldInfo,
    pub declaring: TypeHandle,
}

//=====================================================
// End of file
//=====================================================
