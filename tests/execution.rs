//! End-to-end tests: build a program, load it next to the core library and run it.
//!
//! Every test goes through the public surface only, the way an embedding host would use the
//! crate: builder, type system, binder and engine.

use minclr::{
    binder::{Binder, WellKnownTypes},
    builder::{core_library, AssemblyBuilder, CoreReferences, MethodBodyBuilder},
    disassembler::{decode_method, FlowType},
    execution::{EcallRegistry, Engine, EngineConfig, ExecutionError, Value},
    metadata::{
        method::{MethodAttributes, MethodImplAttributes},
        signatures::{SignatureMethod, TypeSignature},
        tables::{FieldAttributes, TypeAttributes},
    },
    typesystem::{ModuleId, TypeSystem},
    Error, File, Result,
};

const STATIC: MethodAttributes = MethodAttributes::PUBLIC
    .union(MethodAttributes::STATIC)
    .union(MethodAttributes::HIDE_BY_SIG);

/// `Game.Scores` with a static total, an instance `Score` class and a few entry points:
///
/// - `Record(int) -> int` adds `Math.Abs(points)` to the total and returns it
/// - `Best(int, int, int) -> int` folds with `Math.Max`
/// - `Report() -> void` prints a banner and the total
/// - `Allocate(int) -> int` creates that many `Score` objects
/// - `Main() -> int` records `-5` and `7`, reports, and returns the total
fn game_image() -> Result<Vec<u8>> {
    let mut builder = AssemblyBuilder::new("Game");
    let core = CoreReferences::add(&mut builder)?;
    let banner = builder.add_user_string("Total:")?;

    builder.add_type(
        "Game",
        "Score",
        TypeAttributes::PUBLIC | TypeAttributes::BEFORE_FIELD_INIT,
        Some(core.object),
    );
    let points = builder.add_field("points", FieldAttributes::PUBLIC, TypeSignature::I8)?;
    let ctor = builder.add_method(
        ".ctor",
        MethodAttributes::PUBLIC | MethodAttributes::SPECIAL_NAME | MethodAttributes::RT_SPECIAL_NAME,
        MethodImplAttributes::empty(),
        &SignatureMethod::new_instance(TypeSignature::Void, vec![]),
    )?;
    let mut body = MethodBodyBuilder::new();
    body.ldarg(0).call(core.object_ctor).ret();
    builder.set_method_body(ctor, body)?;

    builder.add_type(
        "Game",
        "Scores",
        TypeAttributes::PUBLIC | TypeAttributes::ABSTRACT | TypeAttributes::SEALED,
        Some(core.object),
    );
    let total = builder.add_field(
        "total",
        FieldAttributes::PRIVATE | FieldAttributes::STATIC,
        TypeSignature::I4,
    )?;

    let record = builder.add_method(
        "Record",
        STATIC,
        MethodImplAttributes::empty(),
        &SignatureMethod::new_static(TypeSignature::I4, vec![TypeSignature::I4]),
    )?;
    let mut body = MethodBodyBuilder::new();
    body.ldsfld(total)
        .ldarg(0)
        .call(core.math_abs)
        .add()
        .stsfld(total)
        .ldsfld(total)
        .ret();
    builder.set_method_body(record, body)?;

    let best = builder.add_method(
        "Best",
        STATIC,
        MethodImplAttributes::empty(),
        &SignatureMethod::new_static(TypeSignature::I4, vec![TypeSignature::I4; 3]),
    )?;
    let mut body = MethodBodyBuilder::new();
    body.ldarg(0)
        .ldarg(1)
        .call(core.math_max)
        .ldarg(2)
        .call(core.math_max)
        .ret();
    builder.set_method_body(best, body)?;

    let report = builder.add_method(
        "Report",
        STATIC,
        MethodImplAttributes::empty(),
        &SignatureMethod::new_static(TypeSignature::Void, vec![]),
    )?;
    let mut body = MethodBodyBuilder::new();
    body.ldstr(banner)
        .call(core.write_string)
        .ldsfld(total)
        .call(core.write_line_int32)
        .ret();
    builder.set_method_body(report, body)?;

    let allocate = builder.add_method(
        "Allocate",
        STATIC,
        MethodImplAttributes::empty(),
        &SignatureMethod::new_static(TypeSignature::I4, vec![TypeSignature::I4]),
    )?;
    let mut body = MethodBodyBuilder::new()
        .local(TypeSignature::I4)
        .init_locals(true);
    let (head, check) = (body.define_label(), body.define_label());
    body.br(check);
    body.mark_label(head);
    body.newobj(ctor).ldloc(0).ldc_i4(1).add().stloc(0);
    body.ldfld(points).pop();
    body.mark_label(check);
    body.ldloc(0).ldarg(0).blt(head);
    body.ldloc(0).ret();
    builder.set_method_body(allocate, body)?;

    let main = builder.add_method(
        "Main",
        STATIC,
        MethodImplAttributes::empty(),
        &SignatureMethod::new_static(TypeSignature::I4, vec![]),
    )?;
    let mut body = MethodBodyBuilder::new();
    body.ldc_i4(-5)
        .call(record)
        .pop()
        .ldc_i4(7)
        .call(record)
        .pop()
        .call(report)
        .ldsfld(total)
        .ret();
    builder.set_method_body(main, body)?;
    builder.set_entry_point(main);

    builder.build()
}

fn load_game() -> Result<(TypeSystem, ModuleId, ModuleId)> {
    let mut types = TypeSystem::new(EcallRegistry::with_builtins());
    let core = types.load(File::from_mem(core_library()?)?)?;
    let game = types.load(File::from_mem(game_image()?)?)?;
    Ok((types, core, game))
}

#[test]
fn entry_point_with_console_output() -> Result<()> {
    let (types, core, game) = load_game()?;
    let well_known = WellKnownTypes::bind(&types, core)?;
    let main = types.entry_point(game).unwrap();
    assert_eq!(types.method_name(main), "Game.Scores::Main");

    let mut output = Vec::new();
    let mut engine = Engine::new(&types, EngineConfig::default())
        .with_well_known(&well_known)
        .with_output(&mut output);
    let result = engine.invoke(main, &[])?;
    assert_eq!(engine.stack().depth(), 0);
    drop(engine);

    assert_eq!(result, Some(Value::I32(12)));
    assert_eq!(String::from_utf8(output).unwrap(), "Total:12\n");
    Ok(())
}

#[test]
fn statics_outlive_the_engine() -> Result<()> {
    let (types, _, game) = load_game()?;
    let record = Binder::new(&types)
        .bind_method_in(game, "Game", "Scores", "Record")
        .unwrap();

    let mut first = Engine::new(&types, EngineConfig::minimal());
    assert_eq!(first.invoke(record, &[Value::I32(3)])?, Some(Value::I32(3)));

    let mut second = Engine::new(&types, EngineConfig::minimal());
    assert_eq!(second.invoke(record, &[Value::I32(-4)])?, Some(Value::I32(7)));
    Ok(())
}

#[test]
fn push_execute_pop() -> Result<()> {
    let (types, _, game) = load_game()?;
    let best = Binder::new(&types)
        .bind_method_in(game, "Game", "Scores", "Best")
        .unwrap();

    let mut engine = Engine::new(&types, EngineConfig::minimal());
    for value in [4, 19, -2] {
        engine.push(Value::I32(value))?;
    }
    engine.execute(best)?;

    assert_eq!(engine.pop()?, Value::I32(19));
    assert_eq!(engine.call_depth(), 0);
    assert!(matches!(
        engine.pop(),
        Err(Error::Execution(ExecutionError::StackUnderflow))
    ));
    Ok(())
}

#[test]
fn heap_limit() -> Result<()> {
    let (types, _, game) = load_game()?;
    let allocate = Binder::new(&types)
        .bind_method_in(game, "Game", "Scores", "Allocate")
        .unwrap();

    let mut engine = Engine::new(&types, EngineConfig::minimal());
    assert_eq!(engine.invoke(allocate, &[Value::I32(10)])?, Some(Value::I32(10)));
    assert_eq!(engine.heap().object_count(), 10);

    let config = EngineConfig::minimal().with_heap_capacity(256);
    let mut engine = Engine::new(&types, config);
    let result = engine.invoke(allocate, &[Value::I32(1_000)]);
    assert!(matches!(
        result,
        Err(Error::Execution(ExecutionError::OutOfMemory { capacity: 256, .. }))
    ));
    assert_eq!(engine.stack().depth(), 0);
    assert_eq!(engine.call_depth(), 0);
    Ok(())
}

#[test]
fn missing_natives() -> Result<()> {
    let mut types = TypeSystem::new(EcallRegistry::empty());
    types.load(File::from_mem(core_library()?)?)?;
    let game = types.load(File::from_mem(game_image()?)?)?;
    let best = Binder::new(&types)
        .bind_method_in(game, "Game", "Scores", "Best")
        .unwrap();

    let mut engine = Engine::new(&types, EngineConfig::minimal());
    let result = engine.invoke(best, &[Value::I32(1), Value::I32(2), Value::I32(3)]);
    match result {
        Err(Error::ECallNotFound {
            namespace,
            type_name,
            method,
        }) => {
            assert_eq!(namespace, "System");
            assert_eq!(type_name, "Math");
            assert_eq!(method, "Max");
        }
        other => panic!("unexpected result {other:?}"),
    }
    Ok(())
}

#[test]
fn disassemble_loaded_program() -> Result<()> {
    let (types, _, game) = load_game()?;
    let main = types.entry_point(game).unwrap();

    let listing = decode_method(&types, main)?;
    let mnemonics: Vec<&str> = listing.iter().map(|i| i.mnemonic).collect();
    assert_eq!(
        mnemonics,
        [
            "ldc.i4.s", "call", "pop", "ldc.i4.7", "call", "pop", "call", "ldsfld", "ret"
        ]
    );
    assert_eq!(listing.last().unwrap().flow_type, FlowType::Return);
    Ok(())
}
