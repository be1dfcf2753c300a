use std::sync::Arc;

use solvra_profiler::collections::{CollectionReaders, ContainerShape};
use solvra_profiler::demo::DemoModule;
use solvra_profiler::reflect::{Domain, FieldInfo, TypeInfo};
use solvra_profiler::vm::{Runtime, Value};
use solvra_profiler::ProfilerError;

fn items(count: i64) -> impl Iterator<Item = Value> {
    (0..count).map(Value::Int)
}

#[test]
fn absent_container_counts_zero_then_tracks_contents() {
    let mut domain = Domain::new();
    let game = domain.add_module("Assembly-CSharp");
    let map = domain.add_container_type("Dictionary`2");
    let ty = domain.add_type(TypeInfo::new(game, Some("Game"), "Inventory"));
    let field = domain.add_field(ty, FieldInfo::new_static("Slots", map));
    let domain = Arc::new(domain);
    let runtime = Runtime::new(domain.clone());
    let readers = CollectionReaders::new();

    assert_eq!(readers.count_of(&domain, field, &runtime), Ok(0));
    runtime
        .set_static(field, Value::container(ContainerShape::Map, items(5)))
        .expect("field exists");
    assert_eq!(readers.count_of(&domain, field, &runtime), Ok(5));
    assert_eq!(readers.tracked(), 1);
}

#[test]
fn every_shape_counts_through_its_accessor() {
    let definitions = [
        ("List`1", ContainerShape::List),
        ("HashSet`1", ContainerShape::Set),
        ("Dictionary`2", ContainerShape::Map),
        ("Array", ContainerShape::DynamicArray),
        ("Stack`1", ContainerShape::Stack),
        ("Queue`1", ContainerShape::Queue),
        ("BitArray", ContainerShape::BitVector),
        ("ArrayList", ContainerShape::LegacyList),
    ];
    let mut domain = Domain::new();
    let game = domain.add_module("Assembly-CSharp");
    let holder = domain.add_type(TypeInfo::new(game, Some("Game"), "Holder"));
    let fields: Vec<_> = definitions
        .iter()
        .enumerate()
        .map(|(index, (definition, shape))| {
            let ty = domain.add_container_type(definition);
            let field = domain.add_field(holder, FieldInfo::new_static(format!("F{index}"), ty));
            (field, *shape, index as i64 + 1)
        })
        .collect();
    let domain = Arc::new(domain);
    let runtime = Runtime::new(domain.clone());
    for (field, shape, count) in &fields {
        runtime
            .set_static(*field, Value::container(*shape, items(*count)))
            .expect("field exists");
    }

    let readers = CollectionReaders::new();
    assert_eq!(readers.scan(&domain, game), definitions.len());
    for (field, _, count) in &fields {
        assert_eq!(readers.count_of(&domain, *field, &runtime), Ok(*count as usize));
    }
}

#[test]
fn untracked_fields_are_reported() {
    let mut domain = Domain::new();
    let game = domain.add_module("Assembly-CSharp");
    let int32 = domain.well_known().int32;
    let ty = domain.add_type(TypeInfo::new(game, Some("Game"), "Clock"));
    let generated = domain.add_type(TypeInfo::new(game, Some("Game"), "<>c").as_compiler_generated());
    let list = domain.add_container_type("List`1");
    let round = domain.add_field(ty, FieldInfo::new_static("Round", int32));
    let cache = domain.add_field(generated, FieldInfo::new_static("Cache", list));
    let domain = Arc::new(domain);
    let runtime = Runtime::new(domain.clone());
    let readers = CollectionReaders::new();

    assert_eq!(
        readers.count_of(&domain, round, &runtime),
        Err(ProfilerError::UnsupportedShape {
            field: "Clock.Round".to_string(),
            type_name: "Int32".to_string(),
        })
    );
    assert_eq!(
        readers.count_of(&domain, cache, &runtime),
        Err(ProfilerError::UnknownField("<>c.Cache".to_string()))
    );
    assert_eq!(readers.tracked(), 0);
}

#[test]
fn demo_module_lists_counts_by_field_name() {
    let demo = DemoModule::build();
    let runtime = Runtime::new(demo.domain.clone());
    demo.populate(&runtime, 4).expect("populate");

    let readers = CollectionReaders::new();
    assert_eq!(readers.scan(&demo.domain, demo.module), 3);
    let counts: Vec<_> = readers
        .counts(&runtime)
        .into_iter()
        .map(|count| (count.field, count.count))
        .collect();
    assert_eq!(
        counts,
        vec![
            ("Lobby.Players".to_string(), 4),
            ("Lobby.Spectators".to_string(), 0),
            ("Scheduler.Pending".to_string(), 2),
        ]
    );
    assert_eq!(readers.count_of(&demo.domain, demo.spectators, &runtime), Ok(0));
}
