//! Shared fixtures for the unit tests.
//!
//! Every image used by the tests is generated with [`crate::builder`]: an empty module, the
//! generated core library, and a program referencing that library.

use crate::{
    builder::{core_library, AssemblyBuilder, CoreReferences, MethodBodyBuilder},
    execution::EcallRegistry,
    metadata::{
        method::{MethodAttributes, MethodImplAttributes},
        signatures::{SignatureMethod, TypeSignature},
        tables::TypeAttributes,
    },
    typesystem::{ModuleId, TypeSystem},
    File,
};

// An image with nothing but the <Module> type
pub fn minimal_image() -> Vec<u8> {
    AssemblyBuilder::new("Minimal").build().unwrap()
}

// A program builder with references to the core library members
pub fn program_builder(name: &str) -> (AssemblyBuilder, CoreReferences) {
    let mut builder = AssemblyBuilder::new(name);
    let core = CoreReferences::add(&mut builder).unwrap();
    (builder, core)
}

// Demo.Program::Main prints a greeting and returns Math.Max(2, 3)
pub fn program_image() -> Vec<u8> {
    let (mut builder, core) = program_builder("Program");
    let hello = builder.add_user_string("Hello, World!").unwrap();

    builder.add_type(
        "Demo",
        "Program",
        TypeAttributes::PUBLIC | TypeAttributes::BEFORE_FIELD_INIT,
        Some(core.object),
    );
    let main = builder
        .add_method(
            "Main",
            MethodAttributes::PUBLIC | MethodAttributes::STATIC | MethodAttributes::HIDE_BY_SIG,
            MethodImplAttributes::empty(),
            &SignatureMethod::new_static(TypeSignature::I4, vec![]),
        )
        .unwrap();

    let mut body = MethodBodyBuilder::new().max_stack(2);
    body.ldstr(hello)
        .call(core.write_line_string)
        .ldc_i4(2)
        .ldc_i4(3)
        .call(core.math_max)
        .ret();
    builder.set_method_body(main, body).unwrap();
    builder.set_entry_point(main);

    builder.build().unwrap()
}

// A type system with the core library loaded
pub fn load_corlib() -> (TypeSystem, ModuleId) {
    let mut types = TypeSystem::new(EcallRegistry::with_builtins());
    let corlib = types
        .load(File::from_mem(core_library().unwrap()).unwrap())
        .unwrap();
    (types, corlib)
}

// The core library plus `image`, returns the type system and both module ids
pub fn load_with_corlib(image: Vec<u8>) -> (TypeSystem, ModuleId, ModuleId) {
    let (mut types, corlib) = load_corlib();
    let program = types.load(File::from_mem(image).unwrap()).unwrap();
    (types, corlib, program)
}

// The core library plus the program of `program_image`
pub fn load_program() -> (TypeSystem, ModuleId, ModuleId) {
    load_with_corlib(program_image())
}
