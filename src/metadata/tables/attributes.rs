//! Attribute flags of `TypeDef` and `Field` rows (ECMA-335 II.23.1.15, II.23.1.5).

use bitflags::bitflags;

/// Mask of the visibility bits inside [`TypeAttributes`]
pub const TYPE_VISIBILITY_MASK: u32 = 0x0000_0007;

/// Mask of the layout bits inside [`TypeAttributes`]
pub const TYPE_LAYOUT_MASK: u32 = 0x0000_0018;

/// Mask of the member access bits inside [`FieldAttributes`]
pub const FIELD_ACCESS_MASK: u32 = 0x0007;

bitflags! {
    #[derive(PartialEq, Eq, Debug, Clone, Copy)]
    /// Flags of a `TypeDef` row
    pub struct TypeAttributes: u32 {
        /// Type is visible outside the assembly
        const PUBLIC = 0x0000_0001;
        /// Fields are laid out sequentially
        const SEQUENTIAL_LAYOUT = 0x0000_0008;
        /// Fields are laid out at explicit offsets
        const EXPLICIT_LAYOUT = 0x0000_0010;
        /// Type is an interface
        const INTERFACE = 0x0000_0020;
        /// Type can not be instantiated
        const ABSTRACT = 0x0000_0080;
        /// Type can not be derived from
        const SEALED = 0x0000_0100;
        /// Type name is special
        const SPECIAL_NAME = 0x0000_0400;
        /// Type is imported
        const IMPORT = 0x0000_1000;
        /// Type can be serialized
        const SERIALIZABLE = 0x0000_2000;
        /// Static constructor runs lazily before the first static field access
        const BEFORE_FIELD_INIT = 0x0010_0000;
        /// The runtime checks the name encoding
        const RT_SPECIAL_NAME = 0x0000_0800;
    }
}

bitflags! {
    #[derive(PartialEq, Eq, Debug, Clone, Copy)]
    /// Flags of a `Field` row
    pub struct FieldAttributes: u32 {
        /// Accessible only by the parent type
        const PRIVATE = 0x0001;
        /// Accessible by anyone who has visibility to this scope
        const PUBLIC = 0x0006;
        /// Defined on the type, not per instance
        const STATIC = 0x0010;
        /// Field can only be written by a constructor
        const INIT_ONLY = 0x0020;
        /// Value is a compile time constant, no storage is allocated
        const LITERAL = 0x0040;
        /// Field is not serialized
        const NOT_SERIALIZED = 0x0080;
        /// Field is special
        const SPECIAL_NAME = 0x0200;
        /// Field has an initial value stored at an RVA
        const HAS_FIELD_RVA = 0x0100;
        /// The runtime checks the name encoding
        const RT_SPECIAL_NAME = 0x0400;
        /// Field has marshalling information
        const HAS_FIELD_MARSHAL = 0x1000;
        /// Field has a default value
        const HAS_DEFAULT = 0x8000;
    }
}
