use std::path::Path;

use anyhow::{bail, Context};
use minclr::{disassembler::decode_method, typesystem::ClassId};
use serde::Serialize;

use crate::{
    app::GlobalOptions,
    commands::common::{load_program, split_type_name},
    output::print_output,
};

#[derive(Debug, Serialize)]
struct MethodListing {
    method: String,
    token: String,
    code_size: usize,
    instructions: Vec<String>,
}

pub fn run(
    path: &Path,
    corlib: Option<&Path>,
    type_filter: Option<&str>,
    method_filter: Option<&str>,
    opts: &GlobalOptions,
) -> anyhow::Result<()> {
    let loaded = load_program(path, corlib)?;
    let types = &loaded.types;
    let module = types
        .module(loaded.program)
        .context("the loaded module disappeared")?;
    let type_filter = type_filter.map(split_type_name);

    let mut listings = Vec::new();
    for index in module.classes.iter() {
        let class_id = ClassId::new(index);
        let Some(class) = types.class(class_id) else {
            continue;
        };
        if let Some((namespace, name)) = type_filter {
            if !class.is_named(namespace, name) {
                continue;
            }
        }

        for (id, method) in types.class_methods(class_id) {
            if method_filter.is_some_and(|filter| filter != method.name) {
                continue;
            }
            let Some(body) = method.body() else {
                continue;
            };

            let instructions = decode_method(types, id)
                .with_context(|| format!("failed to decode {}", types.method_name(id)))?;
            listings.push(MethodListing {
                method: types.method_name(id),
                token: method.token.to_string(),
                code_size: body.code_size(),
                instructions: instructions.iter().map(ToString::to_string).collect(),
            });
        }
    }

    if listings.is_empty() {
        bail!("no method bodies matched");
    }

    print_output(&listings, opts, |listings| {
        for listing in listings {
            println!(
                ".method {} // {}, {} byte(s)",
                listing.method, listing.token, listing.code_size
            );
            println!("{{");
            for instruction in &listing.instructions {
                println!("    {instruction}");
            }
            println!("}}\n");
        }
    })
}
