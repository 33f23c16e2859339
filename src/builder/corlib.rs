//! A generated core library.
//!
//! [`core_library`] produces the smallest image that satisfies
//! [`crate::binder::WellKnownTypes::bind`] and backs the built-in native methods of
//! [`crate::execution::EcallRegistry::with_builtins`]: `System.Object` with an empty constructor,
//! `System.ValueType`, `System.Enum`, `System.String`, `System.Void`, the primitive value types
//! (each wrapping a single `m_value` field), and the `InternalCall` methods of `System.Console` and
//! `System.Math`.
//!
//! [`CoreReferences::add`] creates the `AssemblyRef`, `TypeRef` and `MemberRef` rows a program
//! needs to call into that library.

use crate::{
    builder::{AssemblyBuilder, MethodBodyBuilder},
    metadata::{
        method::{MethodAttributes, MethodImplAttributes},
        signatures::{SignatureMethod, TypeSignature},
        tables::{FieldAttributes, TypeAttributes},
        token::Token,
    },
    Result,
};

/// Assembly name of the generated core library
pub const CORE_LIBRARY_NAME: &str = "mscorlib";

/// Primitive value types and the type of their `m_value` field
const PRIMITIVES: &[(&str, TypeSignature)] = &[
    ("Boolean", TypeSignature::Boolean),
    ("Char", TypeSignature::Char),
    ("SByte", TypeSignature::I1),
    ("Byte", TypeSignature::U1),
    ("Int16", TypeSignature::I2),
    ("UInt16", TypeSignature::U2),
    ("Int32", TypeSignature::I4),
    ("UInt32", TypeSignature::U4),
    ("Int64", TypeSignature::I8),
    ("UInt64", TypeSignature::U8),
    ("Single", TypeSignature::R4),
    ("Double", TypeSignature::R8),
    ("IntPtr", TypeSignature::I),
    ("UIntPtr", TypeSignature::U),
];

fn public_static() -> MethodAttributes {
    MethodAttributes::PUBLIC | MethodAttributes::STATIC | MethodAttributes::HIDE_BY_SIG
}

fn native() -> MethodImplAttributes {
    MethodImplAttributes::INTERNAL_CALL
}

fn console_signature(param: Option<TypeSignature>) -> SignatureMethod {
    SignatureMethod::new_static(TypeSignature::Void, param.into_iter().collect())
}

fn unary_int() -> SignatureMethod {
    SignatureMethod::new_static(TypeSignature::I4, vec![TypeSignature::I4])
}

fn binary_int() -> SignatureMethod {
    SignatureMethod::new_static(TypeSignature::I4, vec![TypeSignature::I4, TypeSignature::I4])
}

fn object_constructor() -> SignatureMethod {
    SignatureMethod::new_instance(TypeSignature::Void, vec![])
}

/// Build the core library image
///
/// # Errors
/// Returns [`crate::Error::NotSupported`] only if the builder limits are exceeded, which the
/// fixed content of the library never does.
pub fn core_library() -> Result<Vec<u8>> {
    let mut builder = AssemblyBuilder::new(CORE_LIBRARY_NAME);
    let class = TypeAttributes::PUBLIC | TypeAttributes::BEFORE_FIELD_INIT;
    let primitive = TypeAttributes::PUBLIC | TypeAttributes::SEQUENTIAL_LAYOUT | TypeAttributes::SEALED;
    let static_class = class | TypeAttributes::ABSTRACT | TypeAttributes::SEALED;

    let object = builder.add_type("System", "Object", class, None);
    let ctor = builder.add_method(
        ".ctor",
        MethodAttributes::PUBLIC
            | MethodAttributes::HIDE_BY_SIG
            | MethodAttributes::SPECIAL_NAME
            | MethodAttributes::RT_SPECIAL_NAME,
        MethodImplAttributes::empty(),
        &object_constructor(),
    )?;
    let mut body = MethodBodyBuilder::new();
    body.ret();
    builder.set_method_body(ctor, body)?;

    let value_type = builder.add_type(
        "System",
        "ValueType",
        class | TypeAttributes::ABSTRACT,
        Some(object),
    );
    builder.add_type(
        "System",
        "Enum",
        class | TypeAttributes::ABSTRACT,
        Some(value_type),
    );
    builder.add_type("System", "String", class | TypeAttributes::SEALED, Some(object));
    builder.add_type("System", "Void", primitive, Some(value_type));

    for (name, field_type) in PRIMITIVES {
        builder.add_type("System", name, primitive, Some(value_type));
        builder.add_field("m_value", FieldAttributes::PRIVATE, field_type.clone())?;
    }

    builder.add_type("System", "Console", static_class, Some(object));
    for param in [None, Some(TypeSignature::String), Some(TypeSignature::I4)] {
        builder.add_method("WriteLine", public_static(), native(), &console_signature(param))?;
    }
    for param in [TypeSignature::String, TypeSignature::I4] {
        builder.add_method("Write", public_static(), native(), &console_signature(Some(param)))?;
    }

    builder.add_type("System", "Math", static_class, Some(object));
    builder.add_method("Abs", public_static(), native(), &unary_int())?;
    builder.add_method("Max", public_static(), native(), &binary_int())?;
    builder.add_method("Min", public_static(), native(), &binary_int())?;

    builder.build()
}

/// Tokens of core library members, valid inside the image they were added to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoreReferences {
    /// `AssemblyRef` of the core library
    pub assembly: Token,
    /// `TypeRef` of `System.Object`, the usual base type
    pub object: Token,
    /// `System.Object::.ctor()`
    pub object_ctor: Token,
    /// `System.Console::WriteLine()`
    pub write_line: Token,
    /// `System.Console::WriteLine(string)`
    pub write_line_string: Token,
    /// `System.Console::WriteLine(int32)`
    pub write_line_int32: Token,
    /// `System.Console::Write(string)`
    pub write_string: Token,
    /// `System.Console::Write(int32)`
    pub write_int32: Token,
    /// `System.Math::Abs(int32)`
    pub math_abs: Token,
    /// `System.Math::Max(int32, int32)`
    pub math_max: Token,
    /// `System.Math::Min(int32, int32)`
    pub math_min: Token,
}

impl CoreReferences {
    /// Reference the core library and its members from `builder`
    ///
    /// # Errors
    /// Returns [`crate::Error::NotSupported`] if a reference can not be encoded.
    pub fn add(builder: &mut AssemblyBuilder) -> Result<Self> {
        let assembly = builder.add_assembly_ref(CORE_LIBRARY_NAME);
        let object = builder.add_type_ref(assembly, "System", "Object")?;
        let console = builder.add_type_ref(assembly, "System", "Console")?;
        let math = builder.add_type_ref(assembly, "System", "Math")?;

        Ok(CoreReferences {
            assembly,
            object,
            object_ctor: builder.add_method_ref(object, ".ctor", &object_constructor())?,
            write_line: builder.add_method_ref(console, "WriteLine", &console_signature(None))?,
            write_line_string: builder.add_method_ref(
                console,
                "WriteLine",
                &console_signature(Some(TypeSignature::String)),
            )?,
            write_line_int32: builder.add_method_ref(
                console,
                "WriteLine",
                &console_signature(Some(TypeSignature::I4)),
            )?,
            write_string: builder.add_method_ref(
                console,
                "Write",
                &console_signature(Some(TypeSignature::String)),
            )?,
            write_int32: builder.add_method_ref(
                console,
                "Write",
                &console_signature(Some(TypeSignature::I4)),
            )?,
            math_abs: builder.add_method_ref(math, "Abs", &unary_int())?,
            math_max: builder.add_method_ref(math, "Max", &binary_int())?,
            math_min: builder.add_method_ref(math, "Min", &binary_int())?,
        })
    }
}
