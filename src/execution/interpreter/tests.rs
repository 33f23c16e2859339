use std::sync::atomic::{AtomicUsize, Ordering};

use crate::{
    binder::{Binder, WellKnownTypes},
    builder::{core_library, AssemblyBuilder, CoreReferences, MethodBodyBuilder},
    execution::{
        EcallContext, EcallGroup, EcallMethod, EcallRegistry, Engine, EngineConfig,
        ExecutionError, NativeFunction, Value, OBJECT_HEADER_SIZE,
    },
    metadata::{
        method::{MethodAttributes, MethodImplAttributes},
        signatures::{SignatureMethod, TypeSignature},
        tables::{FieldAttributes, TypeAttributes},
        token::Token,
    },
    test::{load_corlib, load_with_corlib, program_builder},
    typesystem::{MethodId, ModuleId, TypeSystem},
    Error, File,
};

fn static_method() -> MethodAttributes {
    MethodAttributes::PUBLIC | MethodAttributes::STATIC | MethodAttributes::HIDE_BY_SIG
}

// Builds a program with `Tests.Methods::Run` whose body comes from `emit`
fn program_with(
    signature: SignatureMethod,
    emit: impl FnOnce(&mut AssemblyBuilder, &CoreReferences, Token) -> MethodBodyBuilder,
) -> Vec<u8> {
    let (mut builder, core) = program_builder("Tests");
    builder.add_type(
        "Tests",
        "Methods",
        TypeAttributes::PUBLIC | TypeAttributes::ABSTRACT | TypeAttributes::SEALED,
        Some(core.object),
    );
    let run = builder
        .add_method(
            "Run",
            static_method(),
            MethodImplAttributes::empty(),
            &signature,
        )
        .unwrap();

    let body = emit(&mut builder, &core, run);
    builder.set_method_body(run, body).unwrap();
    builder.build().unwrap()
}

fn load_method(
    signature: SignatureMethod,
    emit: impl FnOnce(&mut AssemblyBuilder, &CoreReferences, Token) -> MethodBodyBuilder,
) -> (TypeSystem, ModuleId) {
    let (types, corlib, _) = load_with_corlib(program_with(signature, emit));
    (types, corlib)
}

fn run_method(types: &TypeSystem) -> MethodId {
    Binder::new(types)
        .bind_method("Tests", "Methods", "Run")
        .unwrap()
}

fn returns_int(params: usize) -> SignatureMethod {
    SignatureMethod::new_static(TypeSignature::I4, vec![TypeSignature::I4; params])
}

fn returns_void() -> SignatureMethod {
    SignatureMethod::new_static(TypeSignature::Void, vec![])
}

// Runs `Tests.Methods::Run` on a fresh engine with the minimal limits
fn invoke(types: &TypeSystem, args: &[Value]) -> crate::Result<Option<Value>> {
    let mut engine = Engine::new(types, EngineConfig::minimal());
    engine.invoke(run_method(types), args)
}

#[test]
fn constant_local_and_ret() {
    let (types, _) = load_method(returns_int(0), |_, _, _| {
        let mut body = MethodBodyBuilder::new()
            .local(TypeSignature::I4)
            .init_locals(true);
        body.ldc_i4(42).stloc(0).ldloc(0).ret();
        body
    });

    let mut engine = Engine::new(&types, EngineConfig::minimal());
    let result = engine.invoke(run_method(&types), &[]).unwrap();

    assert_eq!(result, Some(Value::I32(42)));
    assert_eq!(engine.stack().depth(), 0);
    assert_eq!(engine.call_depth(), 0);
    assert_eq!(engine.instructions_executed(), 4);
}

#[test]
fn arguments_and_arithmetic() {
    let (types, _) = load_method(returns_int(2), |_, _, _| {
        let mut body = MethodBodyBuilder::new();
        body.ldarg(0).ldarg(1).sub().ldc_i4(3).mul().ret();
        body
    });

    let result = invoke(&types, &[Value::I32(10), Value::I32(4)]).unwrap();
    assert_eq!(result, Some(Value::I32(18)));
}

#[test]
fn argument_store() {
    let (types, _) = load_method(returns_int(1), |_, _, _| {
        let mut body = MethodBodyBuilder::new();
        body.ldarg(0).neg().starg(0).ldarg(0).ret();
        body
    });

    let result = invoke(&types, &[Value::I32(9)]).unwrap();
    assert_eq!(result, Some(Value::I32(-9)));
}

#[test]
fn counting_loop() {
    let (types, _) = load_method(returns_int(0), |_, _, _| {
        let mut body = MethodBodyBuilder::new()
            .local(TypeSignature::I4)
            .local(TypeSignature::I4)
            .init_locals(true);
        let head = body.define_label();

        body.ldc_i4(0).stloc(1).ldc_i4(1).stloc(0);
        body.mark_label(head);
        body.ldloc(1).ldloc(0).add().stloc(1);
        body.ldloc(0).ldc_i4(1).add().stloc(0);
        body.ldloc(0).ldc_i4(10).ble(head);
        body.ldloc(1).ret();
        body
    });

    assert_eq!(invoke(&types, &[]).unwrap(), Some(Value::I32(55)));
}

#[test]
fn switch_table() {
    let (types, _) = load_method(returns_int(1), |_, _, _| {
        let mut body = MethodBodyBuilder::new();
        let zero = body.define_label();
        let one = body.define_label();

        body.ldarg(0).switch(&[zero, one]);
        body.ldc_i4(100).ret();
        body.mark_label(zero);
        body.ldc_i4(10).ret();
        body.mark_label(one);
        body.ldc_i4(20).ret();
        body
    });

    assert_eq!(invoke(&types, &[Value::I32(0)]).unwrap(), Some(Value::I32(10)));
    assert_eq!(invoke(&types, &[Value::I32(1)]).unwrap(), Some(Value::I32(20)));
    assert_eq!(invoke(&types, &[Value::I32(5)]).unwrap(), Some(Value::I32(100)));
    assert_eq!(invoke(&types, &[Value::I32(-1)]).unwrap(), Some(Value::I32(100)));
}

#[test]
fn recursive_factorial() {
    let (types, _) = load_method(returns_int(1), |_, _, run| {
        let mut body = MethodBodyBuilder::new().max_stack(3);
        let recurse = body.define_label();

        body.ldarg(0).ldc_i4(1).bgt(recurse);
        body.ldc_i4(1).ret();
        body.mark_label(recurse);
        body.ldarg(0)
            .ldarg(0)
            .ldc_i4(1)
            .sub()
            .call(run)
            .mul()
            .ret();
        body
    });

    let result = invoke(&types, &[Value::I32(10)]).unwrap();
    assert_eq!(result, Some(Value::I32(3_628_800)));
}

#[test]
fn call_depth_limit() {
    let (types, _) = load_method(returns_int(0), |_, _, run| {
        let mut body = MethodBodyBuilder::new();
        body.call(run).ret();
        body
    });

    let config = EngineConfig::minimal().with_max_call_depth(16);
    let mut engine = Engine::new(&types, config);
    let result = engine.invoke(run_method(&types), &[]);

    assert!(matches!(
        result,
        Err(Error::Execution(ExecutionError::CallDepthExceeded {
            depth: 17,
            limit: 16
        }))
    ));
    assert_eq!(engine.call_depth(), 0);
    assert_eq!(engine.stack().depth(), 0);
}

#[test]
fn engine_is_reusable_after_a_failure() {
    let (types, _) = load_method(returns_int(1), |_, _, _| {
        let mut body = MethodBodyBuilder::new();
        body.ldc_i4(100).ldarg(0).div().ret();
        body
    });

    let run = run_method(&types);
    let mut engine = Engine::new(&types, EngineConfig::minimal());

    assert!(matches!(
        engine.invoke(run, &[Value::I32(0)]),
        Err(Error::Execution(ExecutionError::DivideByZero))
    ));
    assert_eq!(engine.stack().depth(), 0);
    assert_eq!(
        engine.invoke(run, &[Value::I32(4)]).unwrap(),
        Some(Value::I32(25))
    );
}

#[test]
fn native_call_through_member_ref() {
    let (types, _) = load_method(returns_int(0), |_, core, _| {
        let mut body = MethodBodyBuilder::new();
        body.ldc_i4(3).ldc_i4(7).call(core.math_max).ret();
        body
    });

    assert_eq!(invoke(&types, &[]).unwrap(), Some(Value::I32(7)));
}

#[test]
fn console_output() {
    let (types, corlib) = load_method(returns_void(), |builder, core, _| {
        let hello = builder.add_user_string("Hello").unwrap();

        let mut body = MethodBodyBuilder::new();
        body.ldstr(hello)
            .call(core.write_line_string)
            .ldc_i4(5)
            .call(core.write_line_int32)
            .ret();
        body
    });
    let well_known = WellKnownTypes::bind(&types, corlib).unwrap();

    let mut output = Vec::new();
    let mut engine = Engine::new(&types, EngineConfig::minimal())
        .with_well_known(&well_known)
        .with_output(&mut output);
    let result = engine.invoke(run_method(&types), &[]).unwrap();
    drop(engine);

    assert_eq!(result, None);
    assert_eq!(String::from_utf8(output).unwrap(), "Hello\n5\n");
}

#[test]
fn string_literals_are_interned() {
    let (types, corlib) = load_method(returns_int(0), |builder, _, _| {
        let text = builder.add_user_string("same").unwrap();

        let mut body = MethodBodyBuilder::new();
        body.ldstr(text).ldstr(text).ceq().ret();
        body
    });
    let well_known = WellKnownTypes::bind(&types, corlib).unwrap();

    let mut engine = Engine::new(&types, EngineConfig::minimal()).with_well_known(&well_known);
    let run = run_method(&types);

    assert_eq!(engine.invoke(run, &[]).unwrap(), Some(Value::I32(1)));
    assert_eq!(engine.invoke(run, &[]).unwrap(), Some(Value::I32(1)));
    assert_eq!(engine.heap().object_count(), 1);
}

#[test]
fn string_literal_needs_well_known_types() {
    let (types, _) = load_method(returns_int(0), |builder, _, _| {
        let text = builder.add_user_string("orphan").unwrap();

        let mut body = MethodBodyBuilder::new();
        body.ldstr(text).pop().ldc_i4(0).ret();
        body
    });

    match invoke(&types, &[]) {
        Err(Error::WellKnownTypeMissing(name)) => assert_eq!(name, "System.String"),
        other => panic!("unexpected result {other:?}"),
    }
}

#[test]
fn object_construction_and_fields() {
    let (types, _) = load_method(returns_int(0), |builder, core, _| {
        builder.add_type(
            "Tests",
            "Point",
            TypeAttributes::PUBLIC | TypeAttributes::BEFORE_FIELD_INIT,
            Some(core.object),
        );
        let x = builder
            .add_field("x", FieldAttributes::PUBLIC, TypeSignature::I4)
            .unwrap();
        let y = builder
            .add_field("y", FieldAttributes::PUBLIC, TypeSignature::I4)
            .unwrap();
        let ctor = builder
            .add_method(
                ".ctor",
                MethodAttributes::PUBLIC
                    | MethodAttributes::HIDE_BY_SIG
                    | MethodAttributes::SPECIAL_NAME
                    | MethodAttributes::RT_SPECIAL_NAME,
                MethodImplAttributes::empty(),
                &SignatureMethod::new_instance(
                    TypeSignature::Void,
                    vec![TypeSignature::I4, TypeSignature::I4],
                ),
            )
            .unwrap();

        let mut ctor_body = MethodBodyBuilder::new();
        ctor_body
            .ldarg(0)
            .call(core.object_ctor)
            .ldarg(0)
            .ldarg(1)
            .stfld(x)
            .ldarg(0)
            .ldarg(2)
            .stfld(y)
            .ret();
        builder.set_method_body(ctor, ctor_body).unwrap();

        let mut body = MethodBodyBuilder::new()
            .local(TypeSignature::Object)
            .init_locals(true);
        body.ldc_i4(3)
            .ldc_i4(4)
            .newobj(ctor)
            .stloc(0)
            .ldloc(0)
            .ldfld(x)
            .ldloc(0)
            .ldfld(y)
            .mul()
            .ret();
        body
    });

    let mut engine = Engine::new(&types, EngineConfig::minimal());
    let result = engine.invoke(run_method(&types), &[]).unwrap();

    assert_eq!(result, Some(Value::I32(12)));
    assert_eq!(engine.heap().object_count(), 1);
    // reserved slot, then one header and two int32 fields
    assert_eq!(
        engine.heap().allocated_bytes(),
        OBJECT_HEADER_SIZE + OBJECT_HEADER_SIZE + 8
    );
}

#[test]
fn null_field_access() {
    let (types, _) = load_method(returns_int(0), |builder, _, _| {
        let field = builder
            .add_field("value", FieldAttributes::PUBLIC, TypeSignature::I4)
            .unwrap();

        let mut body = MethodBodyBuilder::new();
        body.ldnull().ldfld(field).ret();
        body
    });

    assert!(matches!(
        invoke(&types, &[]),
        Err(Error::Execution(ExecutionError::NullReference))
    ));
}

#[test]
fn static_field_keeps_its_value() {
    let (types, _) = load_method(returns_int(0), |builder, _, _| {
        let counter = builder
            .add_field(
                "counter",
                FieldAttributes::PRIVATE | FieldAttributes::STATIC,
                TypeSignature::I4,
            )
            .unwrap();

        let mut body = MethodBodyBuilder::new();
        body.ldsfld(counter)
            .ldc_i4(1)
            .add()
            .dup()
            .stsfld(counter)
            .ret();
        body
    });

    let run = run_method(&types);
    let mut engine = Engine::new(&types, EngineConfig::minimal());
    assert_eq!(engine.invoke(run, &[]).unwrap(), Some(Value::I32(1)));
    assert_eq!(engine.invoke(run, &[]).unwrap(), Some(Value::I32(2)));
}

#[test]
fn comparisons() {
    let (types, _) = load_method(returns_int(2), |_, _, _| {
        // (a < b) * 4 + (a > b) * 2 + (a == b)
        let mut body = MethodBodyBuilder::new().max_stack(4);
        body.ldarg(0)
            .ldarg(1)
            .clt()
            .ldc_i4(4)
            .mul()
            .ldarg(0)
            .ldarg(1)
            .cgt()
            .ldc_i4(2)
            .mul()
            .add()
            .ldarg(0)
            .ldarg(1)
            .ceq()
            .add()
            .ret();
        body
    });

    let compare = |a, b| invoke(&types, &[Value::I32(a), Value::I32(b)]).unwrap();
    assert_eq!(compare(1, 2), Some(Value::I32(4)));
    assert_eq!(compare(2, 1), Some(Value::I32(2)));
    assert_eq!(compare(3, 3), Some(Value::I32(1)));
}

#[test]
fn unimplemented_opcode() {
    let (types, _) = load_method(returns_int(0), |_, _, _| {
        let mut body = MethodBodyBuilder::new();
        // ldlen
        body.ldnull().op(0x8E).ret();
        body
    });

    assert!(matches!(
        invoke(&types, &[]),
        Err(Error::Execution(ExecutionError::UnimplementedOpcode {
            mnemonic: "ldlen",
            offset: 1
        }))
    ));
}

#[test]
fn falling_off_the_end() {
    let (types, _) = load_method(returns_void(), |_, _, _| {
        let mut body = MethodBodyBuilder::new();
        body.ldc_i4(1).pop();
        body
    });

    assert!(matches!(
        invoke(&types, &[]),
        Err(Error::Execution(ExecutionError::InvalidBranchTarget(2)))
    ));
}

#[test]
fn evaluation_stack_overflow() {
    let (types, _) = load_method(returns_void(), |_, _, _| {
        let mut body = MethodBodyBuilder::new();
        let head = body.define_label();
        body.mark_label(head);
        body.ldc_i4(1).br(head);
        body
    });

    let config = EngineConfig::minimal().with_stack_capacity(64);
    let mut engine = Engine::new(&types, config);

    assert!(matches!(
        engine.invoke(run_method(&types), &[]),
        Err(Error::Execution(ExecutionError::StackOverflow { capacity: 64, .. }))
    ));
    assert_eq!(engine.stack().depth(), 0);
}

#[test]
fn unbound_native() {
    let image = program_with(returns_int(0), |_, core, _| {
        let mut body = MethodBodyBuilder::new();
        body.ldc_i4(1).ldc_i4(2).call(core.math_max).ret();
        body
    });

    let mut types = TypeSystem::new(EcallRegistry::empty());
    types.load(File::from_mem(core_library().unwrap()).unwrap()).unwrap();
    types.load(File::from_mem(image).unwrap()).unwrap();

    match invoke(&types, &[]) {
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
}

#[test]
fn missing_member_ref() {
    let (types, _) = load_method(returns_int(0), |builder, core, _| {
        let math = builder
            .add_type_ref(core.assembly, "System", "Math")
            .unwrap();
        let pow = builder
            .add_method_ref(
                math,
                "Pow",
                &SignatureMethod::new_static(
                    TypeSignature::I4,
                    vec![TypeSignature::I4, TypeSignature::I4],
                ),
            )
            .unwrap();

        let mut body = MethodBodyBuilder::new();
        body.ldc_i4(2).ldc_i4(8).call(pow).ret();
        body
    });

    assert!(matches!(invoke(&types, &[]), Err(Error::BadMetadata { .. })));
}

#[test]
fn execute_with_manual_arguments() {
    let (types, _) = load_method(returns_int(2), |_, _, _| {
        let mut body = MethodBodyBuilder::new();
        body.ldarg(0).ldarg(1).add().ret();
        body
    });

    let mut engine = Engine::new(&types, EngineConfig::minimal());
    engine.push(Value::I32(2)).unwrap();
    engine.push(Value::I32(40)).unwrap();
    engine.execute(run_method(&types)).unwrap();

    assert_eq!(engine.pop().unwrap(), Value::I32(42));
    assert_eq!(engine.stack().depth(), 0);
}

#[test]
fn long_and_float_constants() {
    let (types, _) = load_method(
        SignatureMethod::new_static(TypeSignature::R8, vec![]),
        |_, _, _| {
            let mut body = MethodBodyBuilder::new();
            body.ldc_r8(1.5).ldc_r8(2.25).add().ret();
            body
        },
    );
    assert_eq!(invoke(&types, &[]).unwrap(), Some(Value::F64(3.75)));

    let (types, _) = load_method(
        SignatureMethod::new_static(TypeSignature::I8, vec![]),
        |_, _, _| {
            let mut body = MethodBodyBuilder::new();
            body.ldc_i8(i64::MAX).ldc_i8(1).add().ret();
            body
        },
    );
    assert_eq!(invoke(&types, &[]).unwrap(), Some(Value::I64(i64::MIN)));
}

#[test]
fn array_arguments_and_fields_hold_references() {
    let (types, _) = load_method(
        SignatureMethod::new_static(
            TypeSignature::I4,
            vec![TypeSignature::SzArray(Box::new(TypeSignature::I4))],
        ),
        |builder, _, _| {
            let items = builder
                .add_field(
                    "items",
                    FieldAttributes::PRIVATE | FieldAttributes::STATIC,
                    TypeSignature::SzArray(Box::new(TypeSignature::String)),
                )
                .unwrap();

            let mut body = MethodBodyBuilder::new();
            body.ldarg(0)
                .stsfld(items)
                .ldsfld(items)
                .ldnull()
                .ceq()
                .ret();
            body
        },
    );

    assert_eq!(invoke(&types, &[Value::NULL]).unwrap(), Some(Value::I32(1)));
    assert!(invoke(&types, &[Value::I32(1)]).is_err());
}

#[test]
fn self_containing_value_type() {
    let (mut builder, core) = program_builder("Tests");
    let value_type = builder
        .add_type_ref(core.assembly, "System", "ValueType")
        .unwrap();
    let node = builder.add_type(
        "Tests",
        "Node",
        TypeAttributes::PUBLIC | TypeAttributes::SEQUENTIAL_LAYOUT | TypeAttributes::SEALED,
        Some(value_type),
    );
    builder
        .add_field("next", FieldAttributes::PUBLIC, TypeSignature::ValueType(node))
        .unwrap();
    let image = builder.build().unwrap();

    let (mut types, _) = load_corlib();
    match types.load(File::from_mem(image).unwrap()) {
        Err(Error::BadMetadata { message, .. }) => {
            assert!(message.contains("Tests.Node"), "{message}");
        }
        other => panic!("unexpected result {other:?}"),
    }
}

static TICKS: AtomicUsize = AtomicUsize::new(0);

fn tick(_context: &mut EcallContext<'_>) -> crate::Result<()> {
    TICKS.fetch_add(1, Ordering::SeqCst);
    Ok(())
}

static CLOCK: &[EcallMethod] = &[EcallMethod {
    name: "Tick",
    function: NativeFunction::Void0(tick),
}];

#[test]
fn zero_argument_native_runs_once_per_execute() {
    let (mut builder, core) = program_builder("Tests");
    builder.add_type(
        "Tests",
        "Clock",
        TypeAttributes::PUBLIC | TypeAttributes::ABSTRACT | TypeAttributes::SEALED,
        Some(core.object),
    );
    let tick = builder
        .add_method(
            "Tick",
            static_method(),
            MethodImplAttributes::INTERNAL_CALL,
            &returns_void(),
        )
        .unwrap();
    let twice = builder
        .add_method(
            "TickTwice",
            static_method(),
            MethodImplAttributes::empty(),
            &returns_void(),
        )
        .unwrap();
    let mut body = MethodBodyBuilder::new();
    body.call(tick).call(tick).ret();
    builder.set_method_body(twice, body).unwrap();
    let image = builder.build().unwrap();

    let mut registry = EcallRegistry::with_builtins();
    registry.register(EcallGroup {
        namespace: "Tests",
        type_name: "Clock",
        methods: CLOCK,
    });
    let mut types = TypeSystem::new(registry);
    types.load(File::from_mem(core_library().unwrap()).unwrap()).unwrap();
    types.load(File::from_mem(image).unwrap()).unwrap();

    let binder = Binder::new(&types);
    let tick = binder.bind_method("Tests", "Clock", "Tick").unwrap();
    let twice = binder.bind_method("Tests", "Clock", "TickTwice").unwrap();

    let mut engine = Engine::new(&types, EngineConfig::minimal());
    let start = TICKS.load(Ordering::SeqCst);

    engine.execute(tick).unwrap();
    assert_eq!(TICKS.load(Ordering::SeqCst), start + 1);
    engine.execute(tick).unwrap();
    assert_eq!(TICKS.load(Ordering::SeqCst), start + 2);
    assert_eq!(engine.stack().depth(), 0);

    engine.execute(twice).unwrap();
    assert_eq!(TICKS.load(Ordering::SeqCst), start + 4);
    assert_eq!(engine.stack().depth(), 0);
}
