//=====================================================
// File: collections.rs
//=====================================================
// Author: SolvraOS Contributors
// License: Duality Public License (DPL v1.0)
// Goal: Element counts for container-typed static fields
// Objective: Discover such fields, synthesise one cached count accessor per
//            field through a shape-keyed dispatch table, and invoke it
//=====================================================

use std::collections::HashMap;
use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use serde::Serialize;
use tracing::{debug, warn};

use crate::body::{BodyBuilder, MethodBody, Opcode};
use crate::host::AccessorInvoker;
use crate::reflect::{Domain, FieldHandle, ModuleId};
use crate::{ProfilerError, ProfilerResult};

/// Container families whose element count can be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum ContainerShape {
    List,
    Set,
    Map,
    DynamicArray,
    Stack,
    Queue,
    BitVector,
    LegacyList,
}

impl ContainerShape {
    /// Maps a generic type definition name to its shape.
    pub fn from_definition(definition: &str) -> Option<Self> {
        let shape = match definition {
            "List`1" => ContainerShape::List,
            "HashSet`1" => ContainerShape::Set,
            "Dictionary`2" => ContainerShape::Map,
            "Array" => ContainerShape::DynamicArray,
            "Stack`1" => ContainerShape::Stack,
            "Queue`1" => ContainerShape::Queue,
            "BitArray" => ContainerShape::BitVector,
            "ArrayList" => ContainerShape::LegacyList,
            _ => return None,
        };
        Some(shape)
    }
}

type Synthesizer = fn(FieldHandle, ContainerShape) -> MethodBody;

struct ShapeEntry {
    /// Member the accessor reads, for display.
    member: &'static str,
    synthesize: Synthesizer,
}

static SYNTHESIZERS: Lazy<HashMap<ContainerShape, ShapeEntry>> = Lazy::new(|| {
    use ContainerShape::*;
    let mut table = HashMap::new();
    for shape in [List, Set, Map, Stack, Queue, LegacyList] {
        table.insert(
            shape,
            ShapeEntry {
                member: "Count",
                synthesize: count_or_zero,
            },
        );
    }
    for shape in [DynamicArray, BitVector] {
        table.insert(
            shape,
            ShapeEntry {
                member: "Length",
                synthesize: count_or_zero,
            },
        );
    }
    table
});

/// `return field?.Count ?? 0;`
fn count_or_zero(field: FieldHandle, shape: ContainerShape) -> MethodBody {
    let mut builder = BodyBuilder::new();
    let present = builder.define_label();
    builder
        .emit(Opcode::LoadStatic(field))
        .emit(Opcode::Dup)
        .emit(Opcode::JumpIfTrue(present))
        .emit(Opcode::Pop)
        .emit(Opcode::PushInt(0))
        .emit(Opcode::Return);
    builder.mark_label(present);
    builder.emit(Opcode::Count(shape)).emit(Opcode::Return);
    builder.finish()
}

/// Synthesised reader for one field.
#[derive(Debug, Clone, PartialEq)]
pub struct CountAccessor {
    pub field: FieldHandle,
    /// `DeclaringType.Field`.
    pub name: String,
    pub shape: ContainerShape,
    pub member: &'static str,
    pub body: MethodBody,
}

impl CountAccessor {
    pub fn count(&self, invoker: &dyn AccessorInvoker) -> ProfilerResult<usize> {
        let count = invoker.invoke_accessor(&self.body)?;
        Ok(usize::try_from(count).unwrap_or(0))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldCount {
    pub field: String,
    pub shape: ContainerShape,
    pub count: usize,
}

/// Cache of count accessors keyed by field.
#[derive(Debug, Default)]
pub struct CollectionReaders {
    cache: RwLock<HashMap<FieldHandle, Arc<CountAccessor>>>,
}

impl CollectionReaders {
    pub fn new() -> Self {
        Self::default()
    }

    /// Discovers and caches every countable static field of `module`.
    /// Returns the number of fields now tracked.
    pub fn scan(&self, domain: &Domain, module: ModuleId) -> usize {
        let types = domain.including_nested(&domain.module_types(module));
        for ty in types {
            for field in domain.fully_constructed_static_fields(ty) {
                match self.process_field(domain, field) {
                    Ok(Some(_)) => {}
                    Ok(None) => debug!(field = %field_name(domain, field), "skipped"),
                    Err(ProfilerError::UnsupportedShape { .. }) => {}
                    Err(err) => warn!(field = %field_name(domain, field), "{err}"),
                }
            }
        }
        self.tracked()
    }

    /// Synthesises the accessor for `field` on first use.
    ///
    /// `Ok(None)` means the field is not tracked: it is an instance field or
    /// its declaring type is compiler generated.
    pub fn process_field(
        &self,
        domain: &Domain,
        field: FieldHandle,
    ) -> ProfilerResult<Option<Arc<CountAccessor>>> {
        if let Some(accessor) = self.cache.read().get(&field) {
            return Ok(Some(accessor.clone()));
        }
        if !domain.contains_field(field) {
            return Err(ProfilerError::UnknownField(format!("{field:?}")));
        }
        let entry = domain.field(field);
        let declaring = domain.ty(entry.declaring);
        if !entry.info.is_static || declaring.info.compiler_generated {
            return Ok(None);
        }

        let name = field_name(domain, field);
        let field_type = &domain.ty(entry.info.field_type).info;
        let shape = field_type
            .container
            .as_deref()
            .and_then(ContainerShape::from_definition);
        let Some((shape, synth)) = shape.and_then(|shape| Some((shape, SYNTHESIZERS.get(&shape)?)))
        else {
            return Err(ProfilerError::UnsupportedShape {
                field: name,
                type_name: field_type.name.clone(),
            });
        };

        let accessor = Arc::new(CountAccessor {
            field,
            name,
            shape,
            member: synth.member,
            body: (synth.synthesize)(field, shape),
        });
        let mut cache = self.cache.write();
        Ok(Some(cache.entry(field).or_insert(accessor).clone()))
    }

    /// Current element count of `field`; an unset field counts as zero.
    pub fn count_of(
        &self,
        domain: &Domain,
        field: FieldHandle,
        invoker: &dyn AccessorInvoker,
    ) -> ProfilerResult<usize> {
        match self.process_field(domain, field)? {
            Some(accessor) => accessor.count(invoker),
            None => Err(ProfilerError::UnknownField(field_name(domain, field))),
        }
    }

    /// Every tracked field with its current count, ordered by name. Fields
    /// whose accessor fails are logged and left out.
    pub fn counts(&self, invoker: &dyn AccessorInvoker) -> Vec<FieldCount> {
        let accessors: Vec<_> = self.cache.read().values().cloned().collect();
        let mut counts: Vec<_> = accessors
            .into_iter()
            .filter_map(|accessor| match accessor.count(invoker) {
                Ok(count) => Some(FieldCount {
                    field: accessor.name.clone(),
                    shape: accessor.shape,
                    count,
                }),
                Err(err) => {
                    warn!(field = %accessor.name, "{err}");
                    None
                }
            })
            .collect();
        counts.sort_by(|a, b| a.field.cmp(&b.field));
        counts
    }

    pub fn tracked(&self) -> usize {
        self.cache.read().len()
    }

    pub fn accessor(&self, field: FieldHandle) -> Option<Arc<CountAccessor>> {
        self.cache.read().get(&field).cloned()
    }
}

fn field_name(domain: &Domain, field: FieldHandle) -> String {
    let entry = domain.field(field);
    format!("{}.{}", domain.ty(entry.declaring).info.name, entry.info.name)
}


//=====================================================
// End of file
//=====================================================
