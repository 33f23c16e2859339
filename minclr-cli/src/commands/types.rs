use std::path::Path;

use anyhow::Context;
use minclr::typesystem::{ClassId, MethodImplementation, TypeSystem};
use serde::Serialize;

use crate::{
    app::GlobalOptions,
    commands::common::load_program,
    output::{print_output, Align, TabWriter},
};

#[derive(Debug, Serialize)]
struct FieldEntry {
    name: String,
    r#type: String,
    offset: usize,
    size: usize,
    is_static: bool,
}

#[derive(Debug, Serialize)]
struct MethodEntry {
    token: String,
    name: String,
    kind: &'static str,
}

#[derive(Debug, Serialize)]
struct TypeEntry {
    token: String,
    kind: &'static str,
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    parent: Option<String>,
    instance_size: usize,
    static_size: usize,
    fields: Vec<FieldEntry>,
    methods: Vec<MethodEntry>,
}

#[derive(Debug, Serialize)]
struct TypesOutput {
    types: Vec<TypeEntry>,
    count: usize,
}

fn type_entry(types: &TypeSystem, id: ClassId) -> Option<TypeEntry> {
    let class = types.class(id)?;

    let fields = types
        .class_fields(id)
        .map(|(_, field)| FieldEntry {
            name: field.name.clone(),
            r#type: field.var.ty.element.name().to_string(),
            offset: field.var.offset,
            size: field.var.size,
            is_static: field.is_static(),
        })
        .collect();

    let methods = types
        .class_methods(id)
        .map(|(_, method)| MethodEntry {
            token: method.token.to_string(),
            name: method.name.clone(),
            kind: match method.implementation {
                MethodImplementation::Bytecode(_) => "il",
                MethodImplementation::Native { .. } => "native",
                MethodImplementation::UnboundNative => "unbound",
                MethodImplementation::Abstract => "abstract",
            },
        })
        .collect();

    Some(TypeEntry {
        token: class.token.to_string(),
        kind: if class.is_value_type {
            "valuetype"
        } else {
            "class"
        },
        name: class.full_name(),
        parent: class
            .parent
            .and_then(|parent| types.class(parent))
            .map(|parent| parent.full_name()),
        instance_size: class.instance_size,
        static_size: class.static_size,
        fields,
        methods,
    })
}

pub fn run(
    path: &Path,
    corlib: Option<&Path>,
    namespace: Option<&str>,
    opts: &GlobalOptions,
) -> anyhow::Result<()> {
    let loaded = load_program(path, corlib)?;
    let types = &loaded.types;
    let module = types
        .module(loaded.program)
        .context("the loaded module disappeared")?;

    let entries: Vec<TypeEntry> = module
        .classes
        .iter()
        .filter_map(|index| type_entry(types, ClassId::new(index)))
        .filter(|entry| match namespace {
            Some(namespace) => entry.name.rsplit_once('.').map(|(ns, _)| ns) == Some(namespace),
            None => true,
        })
        .collect();

    let count = entries.len();
    let output = TypesOutput {
        types: entries,
        count,
    };

    print_output(&output, opts, |out| {
        for entry in &out.types {
            let parent = entry
                .parent
                .as_deref()
                .map(|parent| format!(" : {parent}"))
                .unwrap_or_default();
            println!(
                "{} {} {}{}  (instance {} bytes, static {} bytes)",
                entry.token, entry.kind, entry.name, parent, entry.instance_size, entry.static_size
            );

            if !entry.fields.is_empty() {
                let mut tw = TabWriter::new(&[
                    ("Offset", Align::Right),
                    ("Size", Align::Right),
                    ("Type", Align::Left),
                    ("Field", Align::Left),
                ])
                .indent("    ");
                for field in &entry.fields {
                    let offset = if field.is_static {
                        format!("static+{}", field.offset)
                    } else {
                        field.offset.to_string()
                    };
                    tw.row(vec![
                        offset,
                        field.size.to_string(),
                        field.r#type.clone(),
                        field.name.clone(),
                    ]);
                }
                tw.print();
            }

            if !entry.methods.is_empty() {
                let mut tw = TabWriter::new(&[
                    ("Token", Align::Left),
                    ("Kind", Align::Left),
                    ("Method", Align::Left),
                ])
                .indent("    ");
                for method in &entry.methods {
                    tw.row(vec![
                        method.token.clone(),
                        method.kind.to_string(),
                        method.name.clone(),
                    ]);
                }
                tw.print();
            }
            println!();
        }
        println!("{} type(s) listed.", out.count);
    })
}
