//! Benchmarks for loading and executing generated programs.
//!
//! - Loading the core library and a small program into a fresh type system
//! - A counting loop (branches, locals, arithmetic)
//! - Recursive calls
//! - Object allocation and field access
//! - Decoding a method body

extern crate minclr;

use criterion::{criterion_group, criterion_main, Criterion};
use minclr::{
    binder::Binder,
    builder::{core_library, AssemblyBuilder, CoreReferences, MethodBodyBuilder},
    disassembler::decode_method,
    execution::{EcallRegistry, Engine, EngineConfig, Value},
    metadata::{
        method::{MethodAttributes, MethodImplAttributes},
        signatures::{SignatureMethod, TypeSignature},
        tables::{FieldAttributes, TypeAttributes},
    },
    typesystem::{MethodId, TypeSystem},
    File,
};
use std::hint::black_box;

fn static_method() -> MethodAttributes {
    MethodAttributes::PUBLIC | MethodAttributes::STATIC | MethodAttributes::HIDE_BY_SIG
}

fn int_method(params: usize) -> SignatureMethod {
    SignatureMethod::new_static(TypeSignature::I4, vec![TypeSignature::I4; params])
}

/// `Bench.Programs` with `Loop(n)`, `Fib(n)` and `Allocate(n)`
fn program_image() -> Vec<u8> {
    let mut builder = AssemblyBuilder::new("Bench");
    let core = CoreReferences::add(&mut builder).unwrap();

    builder.add_type(
        "Bench",
        "Box",
        TypeAttributes::PUBLIC | TypeAttributes::BEFORE_FIELD_INIT,
        Some(core.object),
    );
    let value = builder
        .add_field("value", FieldAttributes::PUBLIC, TypeSignature::I4)
        .unwrap();
    let ctor = builder
        .add_method(
            ".ctor",
            MethodAttributes::PUBLIC
                | MethodAttributes::SPECIAL_NAME
                | MethodAttributes::RT_SPECIAL_NAME,
            MethodImplAttributes::empty(),
            &SignatureMethod::new_instance(TypeSignature::Void, vec![]),
        )
        .unwrap();
    let mut body = MethodBodyBuilder::new();
    body.ldarg(0).call(core.object_ctor).ret();
    builder.set_method_body(ctor, body).unwrap();

    builder.add_type(
        "Bench",
        "Programs",
        TypeAttributes::PUBLIC | TypeAttributes::ABSTRACT | TypeAttributes::SEALED,
        Some(core.object),
    );

    // sum of 0..n
    let sum = builder
        .add_method("Loop", static_method(), MethodImplAttributes::empty(), &int_method(1))
        .unwrap();
    let mut body = MethodBodyBuilder::new()
        .local(TypeSignature::I4)
        .local(TypeSignature::I4)
        .init_locals(true);
    let (head, check) = (body.define_label(), body.define_label());
    body.br(check);
    body.mark_label(head);
    body.ldloc(1).ldloc(0).add().stloc(1);
    body.ldloc(0).ldc_i4(1).add().stloc(0);
    body.mark_label(check);
    body.ldloc(0).ldarg(0).blt(head);
    body.ldloc(1).ret();
    builder.set_method_body(sum, body).unwrap();

    let fib = builder
        .add_method("Fib", static_method(), MethodImplAttributes::empty(), &int_method(1))
        .unwrap();
    let mut body = MethodBodyBuilder::new().max_stack(3);
    let recurse = body.define_label();
    body.ldarg(0).ldc_i4(2).bge(recurse);
    body.ldarg(0).ret();
    body.mark_label(recurse);
    body.ldarg(0).ldc_i4(1).sub().call(fib);
    body.ldarg(0).ldc_i4(2).sub().call(fib);
    body.add().ret();
    builder.set_method_body(fib, body).unwrap();

    let allocate = builder
        .add_method("Allocate", static_method(), MethodImplAttributes::empty(), &int_method(1))
        .unwrap();
    let mut body = MethodBodyBuilder::new()
        .max_stack(3)
        .local(TypeSignature::I4)
        .local(TypeSignature::I4)
        .init_locals(true);
    let (head, check) = (body.define_label(), body.define_label());
    body.br(check);
    body.mark_label(head);
    body.newobj(ctor).dup().ldloc(0).stfld(value).ldfld(value);
    body.ldloc(1).add().stloc(1);
    body.ldloc(0).ldc_i4(1).add().stloc(0);
    body.mark_label(check);
    body.ldloc(0).ldarg(0).blt(head);
    body.ldloc(1).ret();
    builder.set_method_body(allocate, body).unwrap();

    builder.build().unwrap()
}

fn load(corlib: &[u8], program: &[u8]) -> TypeSystem {
    let mut types = TypeSystem::new(EcallRegistry::with_builtins());
    types
        .load(File::from_mem(corlib.to_vec()).unwrap())
        .unwrap();
    types
        .load(File::from_mem(program.to_vec()).unwrap())
        .unwrap();
    types
}

fn bind(types: &TypeSystem, method: &str) -> MethodId {
    Binder::new(types)
        .bind_method("Bench", "Programs", method)
        .unwrap()
}

/// Benchmark loading both images and building the type system.
fn bench_load(c: &mut Criterion) {
    let corlib = core_library().unwrap();
    let program = program_image();

    c.bench_function("load_corlib_and_program", |b| {
        b.iter(|| black_box(load(black_box(&corlib), black_box(&program))));
    });
}

/// Benchmark a loop of 10,000 iterations.
fn bench_loop(c: &mut Criterion) {
    let types = load(&core_library().unwrap(), &program_image());
    let method = bind(&types, "Loop");

    c.bench_function("execute_loop_10000", |b| {
        b.iter(|| {
            let mut engine = Engine::new(&types, EngineConfig::default());
            black_box(engine.invoke(method, &[Value::I32(10_000)]).unwrap())
        });
    });
}

/// Benchmark naive recursive Fibonacci of 20.
fn bench_recursion(c: &mut Criterion) {
    let types = load(&core_library().unwrap(), &program_image());
    let method = bind(&types, "Fib");

    c.bench_function("execute_fib_20", |b| {
        b.iter(|| {
            let mut engine = Engine::new(&types, EngineConfig::default());
            black_box(engine.invoke(method, &[Value::I32(20)]).unwrap())
        });
    });
}

/// Benchmark 1,000 allocations with a field store and load each.
fn bench_allocation(c: &mut Criterion) {
    let types = load(&core_library().unwrap(), &program_image());
    let method = bind(&types, "Allocate");

    c.bench_function("execute_allocate_1000", |b| {
        b.iter(|| {
            let mut engine = Engine::new(&types, EngineConfig::default());
            black_box(engine.invoke(method, &[Value::I32(1_000)]).unwrap())
        });
    });
}

/// Benchmark decoding the body of `Allocate`.
fn bench_decode(c: &mut Criterion) {
    let types = load(&core_library().unwrap(), &program_image());
    let method = bind(&types, "Allocate");

    c.bench_function("decode_method", |b| {
        b.iter(|| black_box(decode_method(&types, black_box(method)).unwrap()));
    });
}

criterion_group!(
    benches,
    bench_load,
    bench_loop,
    bench_recursion,
    bench_allocation,
    bench_decode
);
criterion_main!(benches);
