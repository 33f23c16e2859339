use std::{fs, path::Path};

use anyhow::Context;
use log::info;
use minclr::{
    binder::WellKnownTypes,
    builder::{core_library, AssemblyBuilder, CoreReferences, MethodBodyBuilder, CORE_LIBRARY_NAME},
    execution::{EcallRegistry, Engine},
    metadata::{
        method::{MethodAttributes, MethodImplAttributes},
        signatures::{SignatureMethod, TypeSignature},
        tables::{FieldAttributes, TypeAttributes},
    },
    typesystem::TypeSystem,
    File,
};
use serde::Serialize;

use crate::{
    app::{EngineOptions, GlobalOptions},
    commands::common::engine_config,
    output::print_output,
};

const PROGRAM_NAME: &str = "Demo";

#[derive(Debug, Serialize)]
struct DemoOutput {
    result: Option<String>,
    instructions: u64,
    objects: usize,
}

/// `Demo.Program::Main` prints `count` Fibonacci numbers and returns `new Counter(40).Add(2)`
fn program_image(count: i32) -> minclr::Result<Vec<u8>> {
    let mut builder = AssemblyBuilder::new(PROGRAM_NAME);
    let core = CoreReferences::add(&mut builder)?;
    let heading = builder.add_user_string("Fibonacci numbers:")?;
    let class = TypeAttributes::PUBLIC | TypeAttributes::BEFORE_FIELD_INIT;
    let instance = MethodAttributes::PUBLIC | MethodAttributes::HIDE_BY_SIG;
    let static_method = instance | MethodAttributes::STATIC;

    // Demo.Counter
    builder.add_type(PROGRAM_NAME, "Counter", class, Some(core.object));
    let value = builder.add_field("value", FieldAttributes::PRIVATE, TypeSignature::I4)?;
    let ctor = builder.add_method(
        ".ctor",
        instance | MethodAttributes::SPECIAL_NAME | MethodAttributes::RT_SPECIAL_NAME,
        MethodImplAttributes::empty(),
        &SignatureMethod::new_instance(TypeSignature::Void, vec![TypeSignature::I4]),
    )?;
    let mut body = MethodBodyBuilder::new();
    body.ldarg(0)
        .call(core.object_ctor)
        .ldarg(0)
        .ldarg(1)
        .stfld(value)
        .ret();
    builder.set_method_body(ctor, body)?;

    let add = builder.add_method(
        "Add",
        instance,
        MethodImplAttributes::empty(),
        &SignatureMethod::new_instance(TypeSignature::I4, vec![TypeSignature::I4]),
    )?;
    let mut body = MethodBodyBuilder::new().max_stack(3);
    body.ldarg(0)
        .ldarg(0)
        .ldfld(value)
        .ldarg(1)
        .add()
        .stfld(value)
        .ldarg(0)
        .ldfld(value)
        .ret();
    builder.set_method_body(add, body)?;

    // Demo.Program
    builder.add_type(PROGRAM_NAME, "Program", class, Some(core.object));
    let fibonacci = builder.add_method(
        "Fibonacci",
        static_method,
        MethodImplAttributes::empty(),
        &SignatureMethod::new_static(TypeSignature::Void, vec![TypeSignature::I4]),
    )?;
    let mut body = MethodBodyBuilder::new()
        .local(TypeSignature::I4)
        .local(TypeSignature::I4)
        .local(TypeSignature::I4)
        .local(TypeSignature::I4)
        .init_locals(true);
    let (next, check) = (body.define_label(), body.define_label());
    body.ldc_i4(0).stloc(0).ldc_i4(1).stloc(1).ldc_i4(0).stloc(2);
    body.br(check);
    body.mark_label(next);
    body.ldloc(0).call(core.write_line_int32);
    body.ldloc(0).ldloc(1).add().stloc(3);
    body.ldloc(1).stloc(0).ldloc(3).stloc(1);
    body.ldloc(2).ldc_i4(1).add().stloc(2);
    body.mark_label(check);
    body.ldloc(2).ldarg(0).blt(next);
    body.ret();
    builder.set_method_body(fibonacci, body)?;

    let main = builder.add_method(
        "Main",
        static_method,
        MethodImplAttributes::empty(),
        &SignatureMethod::new_static(TypeSignature::I4, vec![]),
    )?;
    let mut body = MethodBodyBuilder::new().max_stack(2);
    body.ldstr(heading)
        .call(core.write_line_string)
        .ldc_i4(count)
        .call(fibonacci)
        .ldc_i4(40)
        .newobj(ctor)
        .ldc_i4(2)
        .call(add)
        .ret();
    builder.set_method_body(main, body)?;
    builder.set_entry_point(main);

    builder.build()
}

pub fn run(
    out: Option<&Path>,
    count: i32,
    engine_opts: &EngineOptions,
    opts: &GlobalOptions,
) -> anyhow::Result<()> {
    let corlib = core_library().context("failed to build the core library")?;
    let program = program_image(count).context("failed to build the demo program")?;

    if let Some(dir) = out {
        fs::create_dir_all(dir)
            .with_context(|| format!("failed to create directory: {}", dir.display()))?;
        for (name, image) in [
            (format!("{CORE_LIBRARY_NAME}.dll"), &corlib),
            (format!("{PROGRAM_NAME}.exe"), &program),
        ] {
            let path = dir.join(name);
            fs::write(&path, image)
                .with_context(|| format!("failed to write image: {}", path.display()))?;
            info!("wrote {}", path.display());
        }
    }

    let mut types = TypeSystem::new(EcallRegistry::with_builtins());
    let core = types.load(File::from_mem(corlib)?)?;
    let program = types.load(File::from_mem(program)?)?;
    let well_known = WellKnownTypes::bind(&types, core)?;
    let main = types
        .entry_point(program)
        .context("the demo program has no entry point")?;

    let mut engine = Engine::new(&types, engine_config(engine_opts, opts.trace))
        .with_well_known(&well_known);
    if opts.json {
        engine = engine.with_output(std::io::sink());
    }
    let result = engine.invoke(main, &[]).context("the demo program failed")?;

    let output = DemoOutput {
        result: result.map(|value| value.to_string()),
        instructions: engine.instructions_executed(),
        objects: engine.heap().object_count(),
    };

    print_output(&output, opts, |out| {
        if let Some(result) = &out.result {
            println!("Main returned {result} after {} instruction(s)", out.instructions);
        }
    })
}
