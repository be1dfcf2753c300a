//=====================================================
// File: rewriter.rs
//=====================================================
// Author: SolvraOS Contributors
// License: Duality Public License (DPL v1.0)
// Goal: Wrap method bodies with timing and memory capture
// Objective: Pure block-to-block transformation that funnels every return
//            through one shared recording sequence
//=====================================================

//! Body rewriting.
//!
//! An instrumented body has this layout:
//!
//! ```text
//! guard:    armed = false; if disabled goto entry
//! capture:  start = now; memory = heap; armed = true
//! entry..:  original blocks, each `Return` replaced by `goto finish`
//! finish:   if !armed goto exit
//!           if disabled goto exit
//!           start = now - start; memory = heap - memory
//!           invocations += 1; total_ticks += start
//!           if max_ticks < start { max_ticks = start }
//!           if memory >= 0 { total_memory += memory }
//! exit:     return
//! ```
//!
//! Counters move only when the flag was clear both on entry and on exit;
//! `armed` carries the entry value.
//!
//! The return value, if any, stays on the operand stack across the finish
//! sequence; every injected operation is stack-balanced.

use tracing::debug;

use crate::body::{BasicBlock, DisabledFlag, MethodBody, Opcode};
use crate::metrics::{Counter, RecordRef};

/// Everything a rewritten body needs to reach at call time.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeSite {
    pub record: RecordRef,
    pub disabled: DisabledFlag,
}

impl ProbeSite {
    pub fn new(record: RecordRef, disabled: DisabledFlag) -> Self {
        Self { record, disabled }
    }

    fn load_flag(&self) -> Opcode {
        Opcode::LoadFlag(self.disabled.clone())
    }

    fn load(&self, counter: Counter) -> Opcode {
        Opcode::LoadCounter(self.record.clone(), counter)
    }

    fn store(&self, counter: Counter) -> Opcode {
        Opcode::StoreCounter(self.record.clone(), counter)
    }

    fn add(&self, counter: Counter) -> Opcode {
        Opcode::AddCounter(self.record.clone(), counter)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RewriteOutcome {
    Instrumented(MethodBody),
    /// The body never returns normally; it is handed back untouched.
    PassThrough(MethodBody),
}

impl RewriteOutcome {
    pub fn is_instrumented(&self) -> bool {
        matches!(self, RewriteOutcome::Instrumented(_))
    }

    pub fn into_body(self) -> MethodBody {
        match self {
            RewriteOutcome::Instrumented(body) | RewriteOutcome::PassThrough(body) => body,
        }
    }
}

pub fn rewrite(body: &MethodBody, probe: &ProbeSite) -> RewriteOutcome {
    let Some(entry) = body.entry_label() else {
        return RewriteOutcome::PassThrough(body.clone());
    };
    if !body.has_return() {
        debug!(slot = probe.record.slot().index(), "no return point, body left as is");
        return RewriteOutcome::PassThrough(body.clone());
    }

    let mut out = body.clone();
    let start = out.declare_local();
    let memory = out.declare_local();
    let armed = out.declare_local();

    let guard = out.fresh_label();
    let capture = out.fresh_label();
    let finish = out.fresh_label();
    let record = out.fresh_label();
    let raise_max = out.fresh_label();
    let memory_check = out.fresh_label();
    let add_memory = out.fresh_label();
    let exit = out.fresh_label();

    let original = std::mem::take(&mut out.blocks);
    let mut blocks = Vec::with_capacity(original.len() + 8);

    blocks.push(BasicBlock::new(
        guard,
        [
            Opcode::PushBool(false),
            Opcode::StoreLocal(armed),
            probe.load_flag(),
            Opcode::JumpIfTrue(entry),
        ],
    ));
    blocks.push(BasicBlock::new(
        capture,
        [
            Opcode::Timestamp,
            Opcode::StoreLocal(start),
            Opcode::HeapBytes,
            Opcode::StoreLocal(memory),
            Opcode::PushBool(true),
            Opcode::StoreLocal(armed),
        ],
    ));

    for mut block in original {
        for instruction in &mut block.instructions {
            if matches!(instruction.opcode, Opcode::Return) {
                instruction.opcode = Opcode::Jump(finish);
            }
        }
        blocks.push(block);
    }

    blocks.push(BasicBlock::new(
        finish,
        [
            Opcode::LoadLocal(armed),
            Opcode::JumpIfFalse(exit),
            probe.load_flag(),
            Opcode::JumpIfTrue(exit),
        ],
    ));
    blocks.push(BasicBlock::new(
        record,
        [
            Opcode::Timestamp,
            Opcode::LoadLocal(start),
            Opcode::Sub,
            Opcode::StoreLocal(start),
            Opcode::HeapBytes,
            Opcode::LoadLocal(memory),
            Opcode::Sub,
            Opcode::StoreLocal(memory),
            Opcode::PushInt(1),
            probe.add(Counter::Invocations),
            Opcode::LoadLocal(start),
            probe.add(Counter::TotalTicks),
            probe.load(Counter::MaxTicks),
            Opcode::LoadLocal(start),
            Opcode::TruncateU32,
            Opcode::Less,
            Opcode::JumpIfFalse(memory_check),
        ],
    ));
    blocks.push(BasicBlock::new(
        raise_max,
        [Opcode::LoadLocal(start), probe.store(Counter::MaxTicks)],
    ));
    blocks.push(BasicBlock::new(
        memory_check,
        [
            Opcode::LoadLocal(memory),
            Opcode::PushInt(0),
            Opcode::Less,
            Opcode::JumpIfTrue(exit),
        ],
    ));
    blocks.push(BasicBlock::new(
        add_memory,
        [Opcode::LoadLocal(memory), probe.add(Counter::TotalMemory)],
    ));
    blocks.push(BasicBlock::new(exit, [Opcode::Return]));

    out.blocks = blocks;
    RewriteOutcome::Instrumented(out)
}


//=====================================================
// End of file
//=====================================================
