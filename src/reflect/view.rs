//=====================================================
// File: reflect/view.rs
//=====================================================
// Author: SolvraOS Contributors
// License: Duality Public License (DPL v1.0)
// Goal: Borrowed view over a method's metadata
// Objective: Answer the shape questions the eligibility filter asks
//=====================================================

use std::fmt;

use crate::body::MethodBody;

use super::{Domain, MethodHandle, MethodInfo, ModuleId, TypeEntry, TypeHandle};

/// A method together with the domain it lives in.
#[derive(Clone, Copy)]
pub struct MethodView<'a> {
    domain: &'a Domain,
    handle: MethodHandle,
}

impl<'a> MethodView<'a> {
    pub(super) fn new(domain: &'a Domain, handle: MethodHandle) -> Self {
        Self { domain, handle }
    }

    pub fn handle(&self) -> MethodHandle {
        self.handle
    }

    pub fn domain(&self) -> &'a Domain {
        self.domain
    }

    pub fn info(&self) -> &'a MethodInfo {
        &self.domain.method_entry(self.handle).info
    }

    pub fn name(&self) -> &'a str {
        &self.info().name
    }

    pub fn declaring_type(&self) -> TypeHandle {
        self.domain.method_entry(self.handle).declaring
    }

    pub fn declaring(&self) -> &'a TypeEntry {
        self.domain.ty(self.declaring_type())
    }

    pub fn module(&self) -> ModuleId {
        self.declaring().info.module
    }

    pub fn body(&self) -> Option<&'a MethodBody> {
        self.info().body.as_ref()
    }

    pub fn has_body(&self) -> bool {
        self.body().is_some()
    }

    /// `"Namespace.Type.Method"`, the name reports are keyed by.
    pub fn display_name(&self) -> String {
        format!("{}.{}", self.domain.full_name(self.declaring_type()), self.name())
    }

    pub fn is_compiler_generated(&self) -> bool {
        self.info().flags.compiler_generated
    }

    pub fn is_runtime_initialize_on_load(&self) -> bool {
        self.info().flags.runtime_initialize_on_load
    }

    pub fn is_getter_setter(&self) -> bool {
        self.special_name_starts_with(&["get_", "set_"])
    }

    pub fn is_add_remove(&self) -> bool {
        self.special_name_starts_with(&["add_", "remove_"])
    }

    pub fn is_operator(&self) -> bool {
        self.special_name_starts_with(&["op_"])
    }

    /// `bool MoveNext()` of a scheduler coroutine state machine.
    pub fn is_coroutine_step(&self) -> bool {
        let info = self.info();
        let well_known = self.domain.well_known();
        info.name == "MoveNext"
            && info.return_type == Some(well_known.boolean)
            && info.parameters == 0
            && self
                .domain
                .is_assignable_to(self.declaring_type(), well_known.coroutine)
    }

    pub fn returns_enumerable(&self) -> bool {
        self.info().return_type.is_some_and(|ty| {
            self.domain
                .is_assignable_to(ty, self.domain.well_known().enumerable)
        })
    }

    fn special_name_starts_with(&self, prefixes: &[&str]) -> bool {
        let info = self.info();
        info.flags.special_name && prefixes.iter().any(|prefix| info.name.starts_with(prefix))
    }
}

impl fmt::Debug for MethodView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.domain.full_name(self.declaring_type()), self.name())
    }
}

//=====================================================
// End of file
//=====================================================
