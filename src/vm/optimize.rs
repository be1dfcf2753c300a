//=====================================================
// File: vm/optimize.rs
//=====================================================
// Author: SolvraOS Contributors
// License: Duality Public License (DPL v1.0)
// Goal: Peephole clean-up of method bodies
// Objective: Drop no-op instruction pairs inside each basic block; the
//            host records every method it touched so the profiler can
//            leave those alone
//=====================================================

use crate::body::{Instruction, MethodBody, Opcode};

/// Rewrites `body` in place and reports whether anything changed.
pub fn optimize(body: &mut MethodBody) -> bool {
    let mut changed = false;
    for block in &mut body.blocks {
        let mut optimized = Vec::with_capacity(block.instructions.len());
        let mut index = 0;
        while index < block.instructions.len() {
            if is_identity_pair(&block.instructions[index].opcode, next(&block.instructions, index)) {
                index += 2;
                changed = true;
                continue;
            }
            if matches!(block.instructions[index].opcode, Opcode::Nop) {
                index += 1;
                changed = true;
                continue;
            }
            optimized.push(block.instructions[index].clone());
            index += 1;
        }
        block.instructions = optimized;
    }
    changed
}

fn next(instructions: &[Instruction], index: usize) -> Option<&Opcode> {
    instructions.get(index + 1).map(|instruction| &instruction.opcode)
}

/// `push 0; add` and `push 1; mul` leave the operand unchanged.
fn is_identity_pair(first: &Opcode, second: Option<&Opcode>) -> bool {
    matches!(
        (first, second),
        (Opcode::PushInt(0), Some(Opcode::Add)) | (Opcode::PushInt(1), Some(Opcode::Mul))
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::BodyBuilder;

    #[test]
    fn removes_identity_arithmetic_and_nops() {
        let mut builder = BodyBuilder::new();
        builder
            .emit(Opcode::LoadArg(0))
            .emit(Opcode::PushInt(0))
            .emit(Opcode::Add)
            .emit(Opcode::Nop)
            .emit(Opcode::PushInt(1))
            .emit(Opcode::Mul)
            .emit(Opcode::Return);
        let mut body = builder.finish();
        assert!(optimize(&mut body));
        let opcodes: Vec<_> = body.opcodes().cloned().collect();
        assert_eq!(opcodes, vec![Opcode::LoadArg(0), Opcode::Return]);
    }

    #[test]
    fn clean_bodies_are_untouched() {
        let mut builder = BodyBuilder::new();
        builder.emit(Opcode::PushInt(2)).emit(Opcode::Return);
        let mut body = builder.finish();
        let before = body.clone();
        assert!(!optimize(&mut body));
        assert_eq!(body, before);
    }
}

//=====================================================
// End of file
//=====================================================
