use std::{io, path::Path};

use anyhow::{bail, Context};
use log::debug;
use minclr::{
    binder::Binder,
    execution::{Engine, Value},
    typesystem::{ElementType, MethodId, TypeDesc},
};
use serde::Serialize;

use crate::{
    app::{EngineOptions, GlobalOptions},
    commands::common::{bind_well_known, engine_config, load_program, split_type_name, Loaded},
    output::print_output,
};

#[derive(Debug, Serialize)]
pub struct RunOutput {
    pub method: String,
    pub result: Option<String>,
    /// Console output, only collected with `--json`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    pub instructions: u64,
    pub objects: usize,
    pub heap_bytes: usize,
}

/// The method to run: `--type`/`--method` if given, the entry point otherwise.
fn select_method(
    loaded: &Loaded,
    type_name: Option<&str>,
    method: Option<&str>,
) -> anyhow::Result<MethodId> {
    match (type_name, method) {
        (Some(type_name), Some(method)) => {
            let (namespace, name) = split_type_name(type_name);
            Binder::new(&loaded.types)
                .bind_method_in(loaded.program, namespace, name, method)
                .with_context(|| format!("method {type_name}::{method} not found"))
        }
        (None, None) => loaded
            .types
            .entry_point(loaded.program)
            .context("the image has no entry point, pass --type and --method"),
        _ => bail!("--type and --method must be given together"),
    }
}

/// Convert the command line integers into arguments for `params`.
///
/// A lone reference parameter with no `--arg` values, as in `Main(string[] args)`,
/// receives `null`.
fn argument_values(name: &str, params: &[TypeDesc], args: &[i32]) -> anyhow::Result<Vec<Value>> {
    if args.is_empty() && params.len() == 1 && params[0].is_object_reference() {
        return Ok(vec![Value::NULL]);
    }

    if params.len() != args.len() {
        bail!("{name} takes {} argument(s), {} given", params.len(), args.len());
    }

    params
        .iter()
        .zip(args)
        .enumerate()
        .map(|(index, (param, &arg))| {
            if param.is_managed_pointer() || param.is_object_reference() {
                bail!("argument {index} of {name} is not an integer");
            }
            Ok(match param.element {
                ElementType::I8 | ElementType::U8 => Value::I64(i64::from(arg)),
                ElementType::I | ElementType::U => Value::NativeInt(i64::from(arg)),
                ElementType::R4 | ElementType::R8 => Value::F64(f64::from(arg)),
                _ => Value::I32(arg),
            })
        })
        .collect()
}

pub fn run(
    path: &Path,
    corlib: Option<&Path>,
    type_name: Option<&str>,
    method: Option<&str>,
    args: &[i32],
    engine_opts: &EngineOptions,
    opts: &GlobalOptions,
) -> anyhow::Result<()> {
    let loaded = load_program(path, corlib)?;
    let id = select_method(&loaded, type_name, method)?;
    let types = &loaded.types;
    let name = types.method_name(id);

    let params: Vec<TypeDesc> = types.method_frame(id)?.args.iter().map(|arg| arg.ty).collect();
    let args = argument_values(&name, &params, args)?;

    let well_known = bind_well_known(&loaded);
    let config = engine_config(engine_opts, opts.trace);
    debug!("running {name} with {config:?}");

    let mut captured = Vec::new();
    let mut engine = if opts.json {
        Engine::new(types, config).with_output(&mut captured)
    } else {
        Engine::new(types, config).with_output(io::stdout())
    };
    if let Some(well_known) = &well_known {
        engine = engine.with_well_known(well_known);
    }

    let result = engine
        .invoke(id, &args)
        .with_context(|| format!("{name} failed"))?;

    let output = RunOutput {
        method: name,
        result: result.map(|value| value.to_string()),
        output: None,
        instructions: engine.instructions_executed(),
        objects: engine.heap().object_count(),
        heap_bytes: engine.heap().allocated_bytes(),
    };
    drop(engine);

    let output = RunOutput {
        output: opts
            .json
            .then(|| String::from_utf8_lossy(&captured).into_owned()),
        ..output
    };

    print_output(&output, opts, |out| {
        if let Some(result) = &out.result {
            println!("{result}");
        }
        debug!(
            "{} instruction(s), {} object(s), {} heap byte(s)",
            out.instructions, out.objects, out.heap_bytes
        );
    })
}
