//=====================================================
// File: body/mod.rs
//=====================================================
// Author: SolvraOS Contributors
// License: Duality Public License (DPL v1.0)
// Goal: Basic-block representation of executable method bodies
// Objective: Give the rewriter and the reference host one shared,
//            label-addressed control-flow graph format
//=====================================================

//! Method bodies as ordered basic blocks.
//!
//! Blocks run in order and fall through to their successor unless they end in
//! a terminator. Jumps address blocks by [`Label`]. The same format is used for
//! original bodies, rewritten bodies and synthesised accessors.

pub mod opcode;
pub mod probe;

use std::collections::HashMap;

pub use opcode::Opcode;
pub use probe::DisabledFlag;

/// Jump target naming a basic block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Label(pub u32);

#[derive(Debug, Clone, PartialEq)]
pub struct Instruction {
    pub opcode: Opcode,
    /// Source line of the original instruction, absent for injected code.
    pub debug: Option<u32>,
}

impl Instruction {
    pub fn new(opcode: Opcode, debug: Option<u32>) -> Self {
        Self { opcode, debug }
    }
}

impl From<Opcode> for Instruction {
    fn from(opcode: Opcode) -> Self {
        Self::new(opcode, None)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BasicBlock {
    pub label: Label,
    pub instructions: Vec<Instruction>,
}

impl BasicBlock {
    pub fn new(label: Label, opcodes: impl IntoIterator<Item = Opcode>) -> Self {
        Self {
            label,
            instructions: opcodes.into_iter().map(Instruction::from).collect(),
        }
    }

    pub fn opcodes(&self) -> impl Iterator<Item = &Opcode> {
        self.instructions.iter().map(|instruction| &instruction.opcode)
    }

    /// True when control can run off the end of this block into the next one.
    pub fn falls_through(&self) -> bool {
        self.instructions
            .last()
            .is_none_or(|instruction| !instruction.opcode.is_terminator())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MethodBody {
    pub locals: u16,
    pub blocks: Vec<BasicBlock>,
    next_label: u32,
}

impl MethodBody {
    pub fn new(locals: u16, blocks: Vec<BasicBlock>) -> Self {
        let next_label = blocks
            .iter()
            .map(|block| block.label.0 + 1)
            .max()
            .unwrap_or(0);
        Self {
            locals,
            blocks,
            next_label,
        }
    }

    pub fn entry_label(&self) -> Option<Label> {
        self.blocks.first().map(|block| block.label)
    }

    /// A label not used by any block of this body.
    pub fn fresh_label(&mut self) -> Label {
        let label = Label(self.next_label);
        self.next_label += 1;
        label
    }

    pub fn declare_local(&mut self) -> u16 {
        let index = self.locals;
        self.locals += 1;
        index
    }

    pub fn opcodes(&self) -> impl Iterator<Item = &Opcode> {
        self.blocks.iter().flat_map(BasicBlock::opcodes)
    }

    pub fn return_points(&self) -> usize {
        self.opcodes()
            .filter(|opcode| matches!(opcode, Opcode::Return))
            .count()
    }

    pub fn has_return(&self) -> bool {
        self.return_points() > 0
    }

    pub fn instruction_count(&self) -> usize {
        self.blocks.iter().map(|block| block.instructions.len()).sum()
    }

    /// Block index for every label in the body.
    pub fn label_table(&self) -> HashMap<Label, usize> {
        self.blocks
            .iter()
            .enumerate()
            .map(|(index, block)| (block.label, index))
            .collect()
    }

    /// First jump target that names no block, if any.
    pub fn dangling_target(&self) -> Option<Label> {
        let table = self.label_table();
        self.opcodes()
            .filter_map(Opcode::branch_target)
            .find(|label| !table.contains_key(label))
    }
}

/// Incremental body construction with define/mark label semantics.
#[derive(Debug)]
pub struct BodyBuilder {
    locals: u16,
    blocks: Vec<BasicBlock>,
    current: BasicBlock,
    current_marked: bool,
    next_label: u32,
    line: Option<u32>,
}

impl Default for BodyBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl BodyBuilder {
    pub fn new() -> Self {
        Self {
            locals: 0,
            blocks: Vec::new(),
            current: BasicBlock::new(Label(0), []),
            current_marked: true,
            next_label: 1,
            line: None,
        }
    }

    pub fn declare_local(&mut self) -> u16 {
        let index = self.locals;
        self.locals += 1;
        index
    }

    pub fn define_label(&mut self) -> Label {
        let label = Label(self.next_label);
        self.next_label += 1;
        label
    }

    /// Debug line attached to instructions emitted from now on.
    pub fn at_line(&mut self, line: u32) -> &mut Self {
        self.line = Some(line);
        self
    }

    /// Starts a new block addressed by `label`.
    pub fn mark_label(&mut self, label: Label) -> &mut Self {
        self.close(BasicBlock::new(label, []));
        self.current_marked = true;
        self
    }

    pub fn emit(&mut self, opcode: Opcode) -> &mut Self {
        let ends_block = opcode.is_branch() || opcode.is_terminator();
        self.current
            .instructions
            .push(Instruction::new(opcode, self.line));
        if ends_block {
            let label = self.define_label();
            self.close(BasicBlock::new(label, []));
            self.current_marked = false;
        }
        self
    }

    pub fn finish(mut self) -> MethodBody {
        if !self.current.instructions.is_empty() || self.current_marked {
            self.blocks.push(self.current);
        }
        let mut body = MethodBody::new(self.locals, self.blocks);
        body.next_label = body.next_label.max(self.next_label);
        body
    }

    fn close(&mut self, next: BasicBlock) {
        let finished = std::mem::replace(&mut self.current, next);
        if !finished.instructions.is_empty() || self.current_marked {
            self.blocks.push(finished);
        }
    }
}


//=====================================================
// End of file
//=====================================================
