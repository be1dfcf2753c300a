//=====================================================
// File: demo.rs
//=====================================================
// Author: SolvraOS Contributors
// License: Duality Public License (DPL v1.0)
// Goal: Sample game module for the profiler CLI and benches
// Objective: Exercise every eligibility rule, both return shapes and the
//            container field scan against the reference runtime
//=====================================================

use std::sync::Arc;

use crate::body::{BodyBuilder, MethodBody, Opcode};
use crate::collections::ContainerShape;
use crate::reflect::{
    Domain, FieldHandle, FieldInfo, GenericState, MethodHandle, MethodInfo, ModuleId, TypeInfo,
};
use crate::vm::{Runtime, Value};
use crate::ProfilerResult;

pub const DEMO_MODULE: &str = "Assembly-CSharp";

/// Entry point the demo workload may call, with its parameter count.
#[derive(Debug, Clone, Copy)]
pub struct EntryPoint {
    pub method: MethodHandle,
    pub parameters: u16,
}

#[derive(Debug, Clone)]
pub struct DemoModule {
    pub domain: Arc<Domain>,
    pub module: ModuleId,
    pub entry_points: Vec<EntryPoint>,
    pub players: FieldHandle,
    pub spectators: FieldHandle,
    pub pending_jobs: FieldHandle,
}

impl DemoModule {
    pub fn build() -> Self {
        let mut domain = Domain::new();
        let module = domain.add_module(DEMO_MODULE);
        let boolean = domain.well_known().boolean;
        let coroutine = domain.well_known().coroutine;
        let int32 = domain.well_known().int32;
        let list = domain.add_container_type("List`1");
        let set = domain.add_container_type("HashSet`1");
        let queue = domain.add_container_type("Queue`1");

        let player = domain.add_type(TypeInfo::new(module, Some("Game.Actors"), "Player"));
        let update = domain.add_method(
            player,
            MethodInfo::new("Update").with_body(body(|b| {
                b.emit(Opcode::Spin(30))
                    .emit(Opcode::Allocate(256))
                    .emit(Opcode::Return);
            })),
        );
        // Two exits: a cheap early return and an expensive full path.
        let take_damage = domain.add_method(
            player,
            MethodInfo::new("TakeDamage")
                .with_parameters(1)
                .with_body(body(|b| {
                    let heavy = b.define_label();
                    b.emit(Opcode::LoadArg(0))
                        .emit(Opcode::PushInt(50))
                        .emit(Opcode::Less)
                        .emit(Opcode::JumpIfFalse(heavy))
                        .emit(Opcode::Spin(5))
                        .emit(Opcode::PushInt(0))
                        .emit(Opcode::Return);
                    b.mark_label(heavy);
                    b.emit(Opcode::Spin(120))
                        .emit(Opcode::Allocate(64))
                        .emit(Opcode::PushInt(1))
                        .emit(Opcode::Return);
                })),
        );
        let respawn_state = domain.add_nested_type(
            player,
            TypeInfo::new(module, None, "<Respawn>d__7")
                .as_compiler_generated()
                .implementing(coroutine),
        );
        let respawn_step = domain.add_method(
            respawn_state,
            MethodInfo::new("MoveNext")
                .returning(boolean)
                .as_compiler_generated()
                .with_body(body(|b| {
                    b.emit(Opcode::Spin(10)).emit(Opcode::PushBool(false)).emit(Opcode::Return);
                })),
        );
        domain.add_method(
            player,
            MethodInfo::new("get_Health")
                .with_special_name()
                .as_compiler_generated()
                .returning(int32)
                .with_body(body(|b| {
                    b.emit(Opcode::PushInt(100)).emit(Opcode::Return);
                })),
        );
        domain.add_method(player, MethodInfo::new(".ctor").as_constructor().with_body(body(|b| {
            b.emit(Opcode::Return);
        })));

        let lobby = domain.add_type(TypeInfo::new(module, Some("Game.Net"), "Lobby"));
        let players = domain.add_field(lobby, FieldInfo::new_static("Players", list));
        let spectators = domain.add_field(lobby, FieldInfo::new_static("Spectators", set));
        let join = domain.add_method(
            lobby,
            MethodInfo::new("Join").as_static().with_body(body(|b| {
                b.emit(Opcode::Spin(15))
                    .emit(Opcode::Allocate(32))
                    .emit(Opcode::Collect(512))
                    .emit(Opcode::Return);
            })),
        );
        // Never returns normally; registered but left untouched.
        domain.add_method(
            lobby,
            MethodInfo::new("Abort").with_body(body(|b| {
                b.emit(Opcode::PushNull).emit(Opcode::Throw);
            })),
        );

        let scheduler = domain.add_type(TypeInfo::new(module, Some("Game.Jobs"), "Scheduler"));
        let pending_jobs = domain.add_field(scheduler, FieldInfo::new_static("Pending", queue));
        let tick = domain.add_method(
            scheduler,
            MethodInfo::new("Tick").as_static().with_body(body(|b| {
                b.emit(Opcode::Call {
                    method: update,
                    args: 0,
                })
                .emit(Opcode::Call {
                    method: respawn_step,
                    args: 0,
                })
                .emit(Opcode::Pop)
                .emit(Opcode::Return);
            })),
        );

        let writer = domain.add_type(TypeInfo::new(module, Some("Mirror.Sync"), "NetworkWriter"));
        domain.add_method(writer, MethodInfo::new("Flush").with_body(body(|b| {
            b.emit(Opcode::Spin(2)).emit(Opcode::Return);
        })));

        let pool = domain.add_type(
            TypeInfo::new(module, Some("Game.Pooling"), "Pool`1").with_generic(GenericState::Open),
        );
        domain.add_method(pool, MethodInfo::new("Rent").with_body(body(|b| {
            b.emit(Opcode::PushNull).emit(Opcode::Return);
        })));

        Self {
            domain: Arc::new(domain),
            module,
            entry_points: vec![
                EntryPoint {
                    method: update,
                    parameters: 0,
                },
                EntryPoint {
                    method: take_damage,
                    parameters: 1,
                },
                EntryPoint {
                    method: join,
                    parameters: 0,
                },
                EntryPoint {
                    method: tick,
                    parameters: 0,
                },
            ],
            players,
            spectators,
            pending_jobs,
        }
    }

    /// Seeds the lobby with `count` players; spectators stay unset.
    pub fn populate(&self, runtime: &Runtime, count: usize) -> ProfilerResult<()> {
        let players = (0..count as i64).map(Value::Int);
        runtime.set_static(self.players, Value::container(ContainerShape::List, players))?;
        runtime.set_static(
            self.pending_jobs,
            Value::container(ContainerShape::Queue, [Value::Int(1), Value::Int(2)]),
        )
    }
}

fn body(build: impl FnOnce(&mut BodyBuilder)) -> MethodBody {
    let mut builder = BodyBuilder::new();
    build(&mut builder);
    builder.finish()
}

//=====================================================
// End of file
//=====================================================
