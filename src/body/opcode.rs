//=====================================================
// File: body/opcode.rs
//=====================================================
// Author: SolvraOS Contributors
// License: Duality Public License (DPL v1.0)
// Goal: Stack-machine opcodes for method bodies
// Objective: Cover ordinary method code plus the probe operations the
//            rewriter injects around it
//=====================================================

use crate::collections::ContainerShape;
use crate::metrics::{Counter, RecordRef};
use crate::reflect::{FieldHandle, MethodHandle};

use super::{DisabledFlag, Label};

#[derive(Debug, Clone, PartialEq)]
pub enum Opcode {
    Nop,
    PushNull,
    PushBool(bool),
    PushInt(i64),
    LoadArg(u16),
    LoadLocal(u16),
    StoreLocal(u16),
    LoadStatic(FieldHandle),
    StoreStatic(FieldHandle),
    Dup,
    Pop,
    Add,
    Sub,
    Mul,
    Less,
    Equal,
    Not,
    /// Keeps the low 32 bits of an integer, zero extended.
    TruncateU32,
    Jump(Label),
    JumpIfTrue(Label),
    JumpIfFalse(Label),
    Call {
        method: MethodHandle,
        args: u16,
    },
    Return,
    Throw,
    /// Pops a container and pushes its element count.
    Count(ContainerShape),
    /// Allocates `n` bytes on the managed heap.
    Allocate(u32),
    /// Releases `n` bytes from the managed heap, as a collection would.
    Collect(u32),
    /// Burns `n` ticks of the host timer.
    Spin(u32),
    // Probe operations.
    Timestamp,
    HeapBytes,
    LoadFlag(DisabledFlag),
    LoadCounter(RecordRef, Counter),
    StoreCounter(RecordRef, Counter),
    AddCounter(RecordRef, Counter),
}

impl Opcode {
    /// Opcodes after which control never falls through.
    pub fn is_terminator(&self) -> bool {
        matches!(self, Opcode::Jump(_) | Opcode::Return | Opcode::Throw)
    }

    pub fn is_branch(&self) -> bool {
        matches!(
            self,
            Opcode::Jump(_) | Opcode::JumpIfTrue(_) | Opcode::JumpIfFalse(_)
        )
    }

    pub fn branch_target(&self) -> Option<Label> {
        match self {
            Opcode::Jump(label) | Opcode::JumpIfTrue(label) | Opcode::JumpIfFalse(label) => {
                Some(*label)
            }
            _ => None,
        }
    }
}

//=====================================================
// End of file
//=====================================================
