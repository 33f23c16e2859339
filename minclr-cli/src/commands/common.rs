use std::path::Path;

use anyhow::Context;
use log::warn;
use minclr::{
    binder::WellKnownTypes,
    execution::{EcallRegistry, EngineConfig},
    typesystem::{ModuleId, TypeSystem},
    File,
};

use crate::app::EngineOptions;

/// A type system with the program and, if given, the core library loaded.
pub struct Loaded {
    pub types: TypeSystem,
    /// The core library, or the program itself when none was given
    pub core: ModuleId,
    pub program: ModuleId,
}

/// Load `corlib` (if any) and then `path` into a fresh type system with the built-in natives.
pub fn load_program(path: &Path, corlib: Option<&Path>) -> anyhow::Result<Loaded> {
    let mut types = TypeSystem::new(EcallRegistry::with_builtins());

    let core = match corlib {
        Some(corlib) => Some(load_module(&mut types, corlib)?),
        None => None,
    };
    let program = load_module(&mut types, path)?;

    Ok(Loaded {
        types,
        core: core.unwrap_or(program),
        program,
    })
}

fn load_module(types: &mut TypeSystem, path: &Path) -> anyhow::Result<ModuleId> {
    let file = File::from_file(path)
        .with_context(|| format!("failed to open image: {}", path.display()))?;
    types
        .load(file)
        .with_context(|| format!("failed to load image: {}", path.display()))
}

/// Bind the built-in types, `None` (with a warning) if the core module lacks them.
pub fn bind_well_known(loaded: &Loaded) -> Option<WellKnownTypes> {
    match WellKnownTypes::bind(&loaded.types, loaded.core) {
        Ok(well_known) => Some(well_known),
        Err(error) => {
            warn!("string literals are unavailable: {error}");
            None
        }
    }
}

/// Split `Namespace.Name` at the last dot; a name without dots is in the global namespace.
pub fn split_type_name(full_name: &str) -> (&str, &str) {
    full_name.rsplit_once('.').unwrap_or(("", full_name))
}

/// The engine limits selected on the command line.
pub fn engine_config(opts: &EngineOptions, trace: bool) -> EngineConfig {
    let mut config = EngineConfig::default().with_trace_instructions(trace);
    if let Some(bytes) = opts.stack_size {
        config = config.with_stack_capacity(bytes);
    }
    if let Some(depth) = opts.max_call_depth {
        config = config.with_max_call_depth(depth);
    }
    if let Some(bytes) = opts.heap_size {
        config = config.with_heap_capacity(bytes);
    }
    config
}
