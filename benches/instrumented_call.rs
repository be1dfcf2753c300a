use std::collections::HashSet;
use std::hint::black_box;
use std::sync::Arc;

use criterion::{Criterion, criterion_group, criterion_main};
use solvra_profiler::body::{BodyBuilder, Opcode};
use solvra_profiler::host::ManualClock;
use solvra_profiler::reflect::{Domain, MethodHandle, MethodInfo, TypeInfo};
use solvra_profiler::vm::{Runtime, Value};
use solvra_profiler::{EligibilityFilter, Profiler, ReportOptions};

fn sum_to_ten(domain: &mut Domain) -> MethodHandle {
    let module = domain.add_module("Assembly-CSharp");
    let ty = domain.add_type(TypeInfo::new(module, Some("Game"), "Counter"));
    let mut builder = BodyBuilder::new();
    let head = builder.define_label();
    let done = builder.define_label();
    let total = builder.declare_local();
    let index = builder.declare_local();
    builder
        .emit(Opcode::PushInt(0))
        .emit(Opcode::StoreLocal(total))
        .emit(Opcode::PushInt(0))
        .emit(Opcode::StoreLocal(index));
    builder.mark_label(head);
    builder
        .emit(Opcode::LoadLocal(index))
        .emit(Opcode::PushInt(10))
        .emit(Opcode::Less)
        .emit(Opcode::JumpIfFalse(done))
        .emit(Opcode::LoadLocal(total))
        .emit(Opcode::LoadLocal(index))
        .emit(Opcode::Add)
        .emit(Opcode::StoreLocal(total))
        .emit(Opcode::LoadLocal(index))
        .emit(Opcode::PushInt(1))
        .emit(Opcode::Add)
        .emit(Opcode::StoreLocal(index))
        .emit(Opcode::Jump(head));
    builder.mark_label(done);
    builder.emit(Opcode::LoadLocal(total)).emit(Opcode::Return);
    domain.add_method(ty, MethodInfo::new("Sum").with_body(builder.finish()))
}

fn bench_calls(c: &mut Criterion) {
    let mut domain = Domain::new();
    let method = sum_to_ten(&mut domain);
    let module = domain.module_by_name("Assembly-CSharp").expect("module");
    let domain = Arc::new(domain);

    let plain = Runtime::with_clock(domain.clone(), Arc::new(ManualClock::new()));
    c.bench_function("call_plain", |b| {
        b.iter(|| black_box(plain.invoke(method, &[]).unwrap()))
    });

    let instrumented = Runtime::with_clock(domain.clone(), Arc::new(ManualClock::new()));
    let profiler = Profiler::new(EligibilityFilter::new(module), 16, ReportOptions::default());
    profiler
        .apply(&domain, &instrumented, method, &HashSet::new())
        .expect("instrumented");
    c.bench_function("call_instrumented", |b| {
        b.iter(|| black_box(instrumented.invoke(method, &[]).unwrap()))
    });

    profiler.disable();
    c.bench_function("call_instrumented_disabled", |b| {
        b.iter(|| black_box(instrumented.invoke(method, &[]).unwrap()))
    });
    assert_eq!(instrumented.invoke(method, &[]).unwrap(), Value::Int(45));
}

criterion_group!(benches, bench_calls);
criterion_main!(benches);
