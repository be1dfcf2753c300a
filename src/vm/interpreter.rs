//=====================================================
// File: vm/interpreter.rs
//=====================================================
// Author: SolvraOS Contributors
// License: Duality Public License (DPL v1.0)
// Goal: Stack-machine execution of basic-block bodies
// Objective: Run original, rewritten and synthesised bodies with the same
//            loop, including the probe operations
//=====================================================

use std::collections::HashMap;

use crate::body::{Label, MethodBody, Opcode};
use crate::host::{HeapCounter, TickSource};
use crate::reflect::MethodHandle;
use crate::{ProfilerError, ProfilerResult};

use super::{MAX_CALL_DEPTH, Runtime, Value};

impl Runtime {
    pub(super) fn call(
        &self,
        method: MethodHandle,
        args: &[Value],
        depth: usize,
    ) -> ProfilerResult<Value> {
        if depth >= MAX_CALL_DEPTH {
            return Err(ProfilerError::Vm(format!(
                "call depth exceeded {MAX_CALL_DEPTH} entering {}",
                self.describe(Some(method))
            )));
        }
        let body = self.body(method)?;
        self.run(&body, args, depth, Some(method))
    }

    pub(super) fn run(
        &self,
        body: &MethodBody,
        args: &[Value],
        depth: usize,
        method: Option<MethodHandle>,
    ) -> ProfilerResult<Value> {
        let labels = body.label_table();
        let mut frame = Frame {
            stack: Vec::with_capacity(8),
            locals: vec![Value::Null; body.locals as usize],
        };

        let mut block = 0usize;
        let mut ip = 0usize;
        loop {
            let Some(current) = body.blocks.get(block) else {
                return Err(ProfilerError::Vm(format!(
                    "execution ran past the last block of {}",
                    self.describe(method)
                )));
            };
            let Some(instruction) = current.instructions.get(ip) else {
                block += 1;
                ip = 0;
                continue;
            };
            ip += 1;

            match &instruction.opcode {
                Opcode::Nop => {}
                Opcode::PushNull => frame.stack.push(Value::Null),
                Opcode::PushBool(value) => frame.stack.push(Value::Bool(*value)),
                Opcode::PushInt(value) => frame.stack.push(Value::Int(*value)),
                Opcode::LoadArg(index) => {
                    let value = args.get(*index as usize).cloned().unwrap_or_default();
                    frame.stack.push(value);
                }
                Opcode::LoadLocal(index) => {
                    let value = frame
                        .locals
                        .get(*index as usize)
                        .cloned()
                        .unwrap_or_default();
                    frame.stack.push(value);
                }
                Opcode::StoreLocal(index) => {
                    let value = frame.pop(self, method)?;
                    if let Some(slot) = frame.locals.get_mut(*index as usize) {
                        *slot = value;
                    }
                }
                Opcode::LoadStatic(field) => frame.stack.push(self.load_static(*field)),
                Opcode::StoreStatic(field) => {
                    let value = frame.pop(self, method)?;
                    self.statics.write().insert(*field, value);
                }
                Opcode::Dup => {
                    let value = frame.peek(self, method)?;
                    frame.stack.push(value);
                }
                Opcode::Pop => {
                    frame.pop(self, method)?;
                }
                Opcode::Add | Opcode::Sub | Opcode::Mul => {
                    let rhs = frame.pop_int(self, method)?;
                    let lhs = frame.pop_int(self, method)?;
                    let value = match instruction.opcode {
                        Opcode::Add => lhs.wrapping_add(rhs),
                        Opcode::Sub => lhs.wrapping_sub(rhs),
                        _ => lhs.wrapping_mul(rhs),
                    };
                    frame.stack.push(Value::Int(value));
                }
                Opcode::Less => {
                    let rhs = frame.pop_int(self, method)?;
                    let lhs = frame.pop_int(self, method)?;
                    frame.stack.push(Value::Bool(lhs < rhs));
                }
                Opcode::Equal => {
                    let rhs = frame.pop(self, method)?;
                    let lhs = frame.pop(self, method)?;
                    frame.stack.push(Value::Bool(lhs == rhs));
                }
                Opcode::Not => {
                    let value = frame.pop(self, method)?;
                    frame.stack.push(Value::Bool(!value.is_truthy()));
                }
                Opcode::TruncateU32 => {
                    let value = frame.pop_int(self, method)?;
                    frame.stack.push(Value::Int(i64::from(value as u32)));
                }
                Opcode::Jump(label) => {
                    block = self.resolve(&labels, *label, method)?;
                    ip = 0;
                }
                Opcode::JumpIfTrue(label) | Opcode::JumpIfFalse(label) => {
                    let condition = frame.pop(self, method)?.is_truthy();
                    let wanted = matches!(instruction.opcode, Opcode::JumpIfTrue(_));
                    if condition == wanted {
                        block = self.resolve(&labels, *label, method)?;
                        ip = 0;
                    }
                }
                Opcode::Call { method: callee, args: count } => {
                    let count = *count as usize;
                    if count > frame.stack.len() {
                        return Err(ProfilerError::StackUnderflow(self.describe(method)));
                    }
                    let start = frame.stack.len() - count;
                    let call_args: Vec<Value> = frame.stack.drain(start..).collect();
                    let result = self.call(*callee, &call_args, depth + 1)?;
                    frame.stack.push(result);
                }
                Opcode::Return => return Ok(frame.stack.pop().unwrap_or_default()),
                Opcode::Throw => {
                    let value = frame.stack.pop().unwrap_or_default();
                    return Err(ProfilerError::Vm(format!(
                        "{} threw {value}",
                        self.describe(method)
                    )));
                }
                Opcode::Count(shape) => match frame.pop(self, method)? {
                    Value::Container(container) if container.shape == *shape => {
                        frame.stack.push(Value::Int(container.len() as i64));
                    }
                    other => {
                        return Err(ProfilerError::Vm(format!(
                            "cannot count {} as {shape:?} in {}",
                            other.type_name(),
                            self.describe(method)
                        )));
                    }
                },
                Opcode::Allocate(bytes) => self.heap.allocate(*bytes),
                Opcode::Collect(bytes) => self.heap.collect(*bytes),
                Opcode::Spin(ticks) => self.clock.spin(*ticks),
                Opcode::Timestamp => frame.stack.push(Value::Int(self.clock.now_ticks())),
                Opcode::HeapBytes => frame.stack.push(Value::Int(self.heap.used_bytes())),
                Opcode::LoadFlag(flag) => frame.stack.push(Value::Bool(flag.is_set())),
                Opcode::LoadCounter(record, counter) => {
                    let value = record.record().get(*counter);
                    frame.stack.push(Value::Int(i64::from(value)));
                }
                Opcode::StoreCounter(record, counter) => {
                    let value = frame.pop_int(self, method)?;
                    record.record().set(*counter, value as u32);
                }
                Opcode::AddCounter(record, counter) => {
                    let value = frame.pop_int(self, method)?;
                    record.record().add(*counter, value as u32);
                }
            }
        }
    }

    fn resolve(
        &self,
        labels: &HashMap<Label, usize>,
        label: Label,
        method: Option<MethodHandle>,
    ) -> ProfilerResult<usize> {
        labels
            .get(&label)
            .copied()
            .ok_or_else(|| ProfilerError::UnknownLabel {
                method: self.describe(method),
                label: label.0,
            })
    }

    fn describe(&self, method: Option<MethodHandle>) -> String {
        match method {
            Some(method) if self.domain.contains_method(method) => {
                self.domain.method(method).display_name()
            }
            Some(method) => format!("{method:?}"),
            None => "<accessor>".to_string(),
        }
    }
}

struct Frame {
    stack: Vec<Value>,
    locals: Vec<Value>,
}

impl Frame {
    fn pop(&mut self, runtime: &Runtime, method: Option<MethodHandle>) -> ProfilerResult<Value> {
        self.stack
            .pop()
            .ok_or_else(|| ProfilerError::StackUnderflow(runtime.describe(method)))
    }

    fn peek(&self, runtime: &Runtime, method: Option<MethodHandle>) -> ProfilerResult<Value> {
        self.stack
            .last()
            .cloned()
            .ok_or_else(|| ProfilerError::StackUnderflow(runtime.describe(method)))
    }

    fn pop_int(&mut self, runtime: &Runtime, method: Option<MethodHandle>) -> ProfilerResult<i64> {
        let value = self.pop(runtime, method)?;
        value.as_int().ok_or_else(|| {
            ProfilerError::Vm(format!(
                "expected an integer, found {} in {}",
                value.type_name(),
                runtime.describe(method)
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::body::{BodyBuilder, Opcode};
    use crate::collections::ContainerShape;
    use crate::host::{HeapCounter, ManualClock, TickSource};
    use crate::reflect::{Domain, FieldInfo, MethodInfo, TypeInfo};
    use crate::vm::{Runtime, Value};
    use crate::ProfilerError;

    #[test]
    fn branches_calls_and_arithmetic() {
        let mut domain = Domain::new();
        let game = domain.add_module("Assembly-CSharp");
        let ty = domain.add_type(TypeInfo::new(game, Some("Game"), "Math"));

        let mut double = BodyBuilder::new();
        double
            .emit(Opcode::LoadArg(0))
            .emit(Opcode::PushInt(2))
            .emit(Opcode::Mul)
            .emit(Opcode::Return);
        let double = domain.add_method(ty, MethodInfo::new("Double").with_parameters(1).with_body(double.finish()));

        let mut pick = BodyBuilder::new();
        let small = pick.define_label();
        pick.emit(Opcode::LoadArg(0))
            .emit(Opcode::PushInt(10))
            .emit(Opcode::Less)
            .emit(Opcode::JumpIfTrue(small))
            .emit(Opcode::PushInt(-1))
            .emit(Opcode::Return);
        pick.mark_label(small);
        pick.emit(Opcode::LoadArg(0))
            .emit(Opcode::Call { method: double, args: 1 })
            .emit(Opcode::Return);
        let pick = domain.add_method(ty, MethodInfo::new("Pick").with_parameters(1).with_body(pick.finish()));

        let runtime = Runtime::new(Arc::new(domain));
        assert_eq!(runtime.invoke(pick, &[Value::Int(4)]), Ok(Value::Int(8)));
        assert_eq!(runtime.invoke(pick, &[Value::Int(40)]), Ok(Value::Int(-1)));
    }

    #[test]
    fn host_operations_drive_clock_and_heap() {
        let mut domain = Domain::new();
        let game = domain.add_module("Assembly-CSharp");
        let ty = domain.add_type(TypeInfo::new(game, Some("Game"), "Work"));
        let mut body = BodyBuilder::new();
        body.emit(Opcode::Spin(25))
            .emit(Opcode::Allocate(128))
            .emit(Opcode::Collect(28))
            .emit(Opcode::Return);
        let work = domain.add_method(ty, MethodInfo::new("Run").with_body(body.finish()));

        let clock = Arc::new(ManualClock::new());
        let runtime = Runtime::with_clock(Arc::new(domain), clock.clone());
        assert_eq!(runtime.invoke(work, &[]), Ok(Value::Null));
        assert_eq!(clock.now_ticks(), 25);
        assert_eq!(runtime.heap().used_bytes(), 100);
    }

    #[test]
    fn statics_and_counting() {
        let mut domain = Domain::new();
        let game = domain.add_module("Assembly-CSharp");
        let list = domain.add_container_type("List`1");
        let ty = domain.add_type(TypeInfo::new(game, Some("Game"), "Registry"));
        let field = domain.add_field(ty, FieldInfo::new_static("Items", list));
        let mut body = BodyBuilder::new();
        body.emit(Opcode::LoadStatic(field))
            .emit(Opcode::Count(ContainerShape::List))
            .emit(Opcode::Return);
        let count = domain.add_method(ty, MethodInfo::new("Count").with_body(body.finish()));

        let runtime = Runtime::new(Arc::new(domain));
        runtime
            .set_static(field, Value::container(ContainerShape::List, [Value::Int(1), Value::Int(2)]))
            .expect("field exists");
        assert_eq!(runtime.invoke(count, &[]), Ok(Value::Int(2)));
    }

    #[test]
    fn throw_and_underflow_surface_as_errors() {
        let mut domain = Domain::new();
        let game = domain.add_module("Assembly-CSharp");
        let ty = domain.add_type(TypeInfo::new(game, Some("Game"), "Faulty"));
        let mut throws = BodyBuilder::new();
        throws.emit(Opcode::PushInt(7)).emit(Opcode::Throw);
        let throws = domain.add_method(ty, MethodInfo::new("Fail").with_body(throws.finish()));
        let mut underflow = BodyBuilder::new();
        underflow.emit(Opcode::Pop).emit(Opcode::Return);
        let underflow = domain.add_method(ty, MethodInfo::new("Empty").with_body(underflow.finish()));

        let runtime = Runtime::new(Arc::new(domain));
        assert_eq!(
            runtime.invoke(throws, &[]),
            Err(ProfilerError::Vm("Game.Faulty.Fail threw 7".to_string()))
        );
        assert_eq!(
            runtime.invoke(underflow, &[]),
            Err(ProfilerError::StackUnderflow("Game.Faulty.Empty".to_string()))
        );
    }
}

//=====================================================
// End of file
//=====================================================
