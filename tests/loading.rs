//! Integration tests for loading generated images into a type system.
//!
//! Images are produced with the public builder, written to disk where the file backend is
//! under test, and inspected through the binder and the loaded class descriptors.

use minclr::{
    binder::{Binder, WellKnownType, WellKnownTypes},
    builder::{core_library, AssemblyBuilder, CoreReferences, CORE_LIBRARY_NAME},
    execution::EcallRegistry,
    metadata::{
        method::{MethodAttributes, MethodImplAttributes},
        signatures::{SignatureMethod, TypeSignature},
        tables::{FieldAttributes, TypeAttributes},
    },
    typesystem::{MethodImplementation, TypeSystem},
    Error, File, Result,
};

fn core_types() -> Result<TypeSystem> {
    let mut types = TypeSystem::new(EcallRegistry::with_builtins());
    types.load(File::from_mem(core_library()?)?)?;
    Ok(types)
}

/// `Shapes.Base { long a; int b; byte c; }` and `Shapes.Derived : Base { int d; static int e; }`
fn shapes_image() -> Result<Vec<u8>> {
    let mut builder = AssemblyBuilder::new("Shapes");
    let core = CoreReferences::add(&mut builder)?;

    let base = builder.add_type(
        "Shapes",
        "Base",
        TypeAttributes::PUBLIC | TypeAttributes::BEFORE_FIELD_INIT,
        Some(core.object),
    );
    builder.add_field("a", FieldAttributes::PUBLIC, TypeSignature::I8)?;
    builder.add_field("b", FieldAttributes::PUBLIC, TypeSignature::I4)?;
    builder.add_field("c", FieldAttributes::PUBLIC, TypeSignature::U1)?;

    builder.add_type(
        "Shapes",
        "Derived",
        TypeAttributes::PUBLIC | TypeAttributes::BEFORE_FIELD_INIT,
        Some(base),
    );
    builder.add_field("d", FieldAttributes::PUBLIC, TypeSignature::I4)?;
    builder.add_field(
        "e",
        FieldAttributes::PUBLIC | FieldAttributes::STATIC,
        TypeSignature::I4,
    )?;
    builder.add_method(
        "Area",
        MethodAttributes::PUBLIC | MethodAttributes::STATIC,
        MethodImplAttributes::INTERNAL_CALL,
        &SignatureMethod::new_static(TypeSignature::I4, vec![]),
    )?;

    builder.build()
}

#[test]
fn core_library_from_disk() -> Result<()> {
    let dir = std::env::temp_dir().join(format!("minclr-loading-{}", std::process::id()));
    std::fs::create_dir_all(&dir)?;
    let path = dir.join(format!("{CORE_LIBRARY_NAME}.dll"));
    std::fs::write(&path, core_library()?)?;

    let mut types = TypeSystem::new(EcallRegistry::with_builtins());
    let core = types.load(File::from_file(&path)?)?;
    std::fs::remove_dir_all(&dir)?;

    let module = types.module(core).unwrap();
    assert_eq!(module.name, format!("{CORE_LIBRARY_NAME}.dll"));
    assert_eq!(module.assembly_name.as_deref(), Some(CORE_LIBRARY_NAME));
    assert!(module.mvid.is_some());
    assert!(types.entry_point(core).is_none());

    let well_known = WellKnownTypes::bind(&types, core)?;
    let int64 = types.class(well_known.get(WellKnownType::Int64)).unwrap();
    assert!(int64.is_value_type);
    assert_eq!(int64.instance_size, 8);

    let string = types.class(well_known.get(WellKnownType::String)).unwrap();
    assert!(!string.is_value_type);
    assert_eq!(string.full_name(), "System.String");
    Ok(())
}

#[test]
fn missing_file() {
    let result = File::from_file(std::path::Path::new("/nonexistent/minclr/image.dll"));
    assert!(matches!(result, Err(Error::FileError(_))));
}

#[test]
fn rejects_non_images() {
    assert!(matches!(File::from_mem(Vec::new()), Err(Error::Empty)));
    assert!(matches!(
        File::from_mem(b"not a portable executable".to_vec()),
        Err(Error::ImageFormat { .. })
    ));
}

#[test]
fn rejects_truncated_images() -> Result<()> {
    let image = core_library()?;

    for len in [64, 0x80, 0x200] {
        let truncated = image[..len].to_vec();
        let loaded = File::from_mem(truncated).and_then(|file| {
            let mut types = TypeSystem::new(EcallRegistry::with_builtins());
            types.load(file)
        });
        assert!(loaded.is_err(), "{len} byte prefix was accepted");
    }
    Ok(())
}

#[test]
fn inherited_layout() -> Result<()> {
    let mut types = core_types()?;
    let shapes = types.load(File::from_mem(shapes_image()?)?)?;
    let binder = Binder::new(&types);

    let base_id = binder.bind_type_in(shapes, "Shapes", "Base").unwrap();
    let base = types.class(base_id).unwrap();
    assert_eq!(base.instance_size, 16);
    assert_eq!(base.alignment, 8);

    let offsets: Vec<(String, usize)> = types
        .class_fields(base_id)
        .map(|(_, field)| (field.name.clone(), field.var.offset))
        .collect();
    assert_eq!(
        offsets,
        vec![
            ("a".to_string(), 8),
            ("b".to_string(), 4),
            ("c".to_string(), 0),
        ]
    );

    let derived_id = binder.bind_type_in(shapes, "Shapes", "Derived").unwrap();
    let derived = types.class(derived_id).unwrap();
    assert_eq!(derived.parent, Some(base_id));
    assert_eq!(derived.instance_size, 24);
    assert_eq!(derived.static_size, 4);

    let d = binder.bind_field_in(shapes, "Shapes", "Derived", "d").unwrap();
    assert_eq!(types.field(d).unwrap().var.offset, 16);
    let e = binder.bind_field_in(shapes, "Shapes", "Derived", "e").unwrap();
    assert!(types.field(e).unwrap().is_static());
    assert_eq!(types.field(e).unwrap().var.offset, 0);
    Ok(())
}

#[test]
fn unknown_native_stays_unbound() -> Result<()> {
    let mut types = core_types()?;
    let shapes = types.load(File::from_mem(shapes_image()?)?)?;

    let area = Binder::new(&types)
        .bind_method_in(shapes, "Shapes", "Derived", "Area")
        .unwrap();
    assert!(matches!(
        types.method(area).unwrap().implementation,
        MethodImplementation::UnboundNative
    ));

    let max = Binder::new(&types)
        .bind_method("System", "Math", "Max")
        .unwrap();
    assert!(matches!(
        types.method(max).unwrap().implementation,
        MethodImplementation::Native { arg_count: 2, .. }
    ));
    Ok(())
}

#[test]
fn program_before_core_library() -> Result<()> {
    let mut types = TypeSystem::new(EcallRegistry::with_builtins());
    let shapes = types.load(File::from_mem(shapes_image()?)?)?;

    let base = Binder::new(&types)
        .bind_type_in(shapes, "Shapes", "Base")
        .unwrap();
    assert_eq!(types.class(base).unwrap().parent, None);
    Ok(())
}

#[test]
fn well_known_types_need_the_core_library() -> Result<()> {
    let mut types = core_types()?;
    let shapes = types.load(File::from_mem(shapes_image()?)?)?;

    assert!(matches!(
        WellKnownTypes::bind(&types, shapes),
        Err(Error::WellKnownTypeMissing(_))
    ));
    Ok(())
}
