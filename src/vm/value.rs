//=====================================================
// File: vm/value.rs
//=====================================================
// Author: SolvraOS Contributors
// License: Duality Public License (DPL v1.0)
// Goal: Runtime values of the reference host
// Objective: Scalars plus shared container objects for static fields
//=====================================================

use std::fmt;
use std::sync::Arc;

use crate::collections::ContainerShape;

#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Container(Arc<ContainerValue>),
}

impl Value {
    pub fn container(shape: ContainerShape, items: impl IntoIterator<Item = Value>) -> Self {
        Value::Container(Arc::new(ContainerValue {
            shape,
            items: items.into_iter().collect(),
        }))
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(value) => *value,
            Value::Int(value) => *value != 0,
            Value::Container(_) => true,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(value) => Some(*value),
            Value::Bool(value) => Some(i64::from(*value)),
            _ => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Container(_) => "container",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(value) => write!(f, "{value}"),
            Value::Int(value) => write!(f, "{value}"),
            Value::Container(container) => {
                write!(f, "{:?}[{}]", container.shape, container.len())
            }
        }
    }
}

/// Object stored in a container-typed static field.
#[derive(Debug, Clone, PartialEq)]
pub struct ContainerValue {
    pub shape: ContainerShape,
    pub items: Vec<Value>,
}

impl ContainerValue {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

//=====================================================
// End of file
//=====================================================
