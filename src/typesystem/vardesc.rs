//! Storage descriptors for parameters, locals and fields.
//!
//! A [`VarDesc`] is a laid out slot: an offset into some byte storage (a call frame, an object's
//! instance storage or a class' static storage) plus the [`TypeDesc`] of the value stored there.
//! `TypeDesc` is the resolved form of a signature element: signature tokens are replaced by
//! [`ClassId`]s, and by-ref, generic parameter and array shapes become [`TypeModifiers`], which
//! all turn the slot into a pointer sized reference.

use bitflags::bitflags;

use crate::typesystem::ClassId;

/// Size of references, native integers and pointers.
pub const POINTER_SIZE: usize = 8;

/// Round `value` up to the next multiple of `align` (a power of two, or 1).
#[must_use]
pub const fn align_up(value: usize, align: usize) -> usize {
    if align <= 1 {
        value
    } else {
        (value + align - 1) & !(align - 1)
    }
}

/// The element kind of a [`TypeDesc`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum ElementType {
    Void,
    Boolean,
    Char,
    I1,
    U1,
    I2,
    U2,
    I4,
    U4,
    I8,
    U8,
    R4,
    R8,
    /// Native signed integer
    I,
    /// Native unsigned integer
    U,
    String,
    Object,
    /// A reference type defined in metadata
    Class,
    /// A value type defined in metadata, stored inline
    ValueType,
    /// An unmanaged pointer
    Ptr,
}

impl ElementType {
    /// Size of a value of this kind, `None` for `ValueType` whose size comes from its class
    #[must_use]
    pub fn primitive_size(&self) -> Option<usize> {
        Some(match self {
            ElementType::Void => 0,
            ElementType::Boolean | ElementType::I1 | ElementType::U1 => 1,
            ElementType::Char | ElementType::I2 | ElementType::U2 => 2,
            ElementType::I4 | ElementType::U4 | ElementType::R4 => 4,
            ElementType::I8 | ElementType::U8 | ElementType::R8 => 8,
            ElementType::I
            | ElementType::U
            | ElementType::String
            | ElementType::Object
            | ElementType::Class
            | ElementType::Ptr => POINTER_SIZE,
            ElementType::ValueType => return None,
        })
    }

    /// True for kinds that hold an object reference
    #[must_use]
    pub fn is_reference(&self) -> bool {
        matches!(
            self,
            ElementType::String | ElementType::Object | ElementType::Class
        )
    }

    /// Lowercase IL name, as used by the disassembler and the `types` listing
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            ElementType::Void => "void",
            ElementType::Boolean => "bool",
            ElementType::Char => "char",
            ElementType::I1 => "int8",
            ElementType::U1 => "uint8",
            ElementType::I2 => "int16",
            ElementType::U2 => "uint16",
            ElementType::I4 => "int32",
            ElementType::U4 => "uint32",
            ElementType::I8 => "int64",
            ElementType::U8 => "uint64",
            ElementType::R4 => "float32",
            ElementType::R8 => "float64",
            ElementType::I => "native int",
            ElementType::U => "native uint",
            ElementType::String => "string",
            ElementType::Object => "object",
            ElementType::Class => "class",
            ElementType::ValueType => "valuetype",
            ElementType::Ptr => "ptr",
        }
    }
}

bitflags! {
    /// Shape modifiers of a [`TypeDesc`]
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct TypeModifiers: u8 {
        /// A managed reference to the element (`ref`/`out` parameters, value type receivers)
        const BY_REF = 0x01;
        /// A generic type or method parameter, stored as a reference
        const GENERIC_PARAM = 0x02;
        /// A single dimensional, zero based array of the element
        const SZ_ARRAY = 0x04;
    }
}

/// The type of one storage slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeDesc {
    /// The element kind
    pub element: ElementType,
    /// Shape modifiers
    pub modifiers: TypeModifiers,
    /// The class behind `Class` and `ValueType` elements, if it could be resolved
    pub class: Option<ClassId>,
}

impl TypeDesc {
    /// A plain slot of a primitive kind
    #[must_use]
    pub const fn primitive(element: ElementType) -> Self {
        TypeDesc {
            element,
            modifiers: TypeModifiers::empty(),
            class: None,
        }
    }

    /// An inline value of `class`
    #[must_use]
    pub const fn value_type(class: ClassId) -> Self {
        TypeDesc {
            element: ElementType::ValueType,
            modifiers: TypeModifiers::empty(),
            class: Some(class),
        }
    }

    /// A reference to an instance of `class`
    #[must_use]
    pub const fn class(class: ClassId) -> Self {
        TypeDesc {
            element: ElementType::Class,
            modifiers: TypeModifiers::empty(),
            class: Some(class),
        }
    }

    /// The same type with `modifiers` added
    #[must_use]
    pub fn with_modifiers(mut self, modifiers: TypeModifiers) -> Self {
        self.modifiers |= modifiers;
        self
    }

    /// True if the slot stores a value type inline
    #[must_use]
    pub fn is_inline_value_type(&self) -> bool {
        self.element == ElementType::ValueType && self.modifiers.is_empty()
    }

    /// True if the slot holds a pointer sized value regardless of the element kind
    #[must_use]
    pub fn is_pointer_sized(&self) -> bool {
        !self.modifiers.is_empty()
    }

    /// True if the slot holds a managed pointer, stored as a native int
    #[must_use]
    pub fn is_managed_pointer(&self) -> bool {
        self.modifiers.contains(TypeModifiers::BY_REF)
    }

    /// True if the slot holds an object reference (or `null`)
    #[must_use]
    pub fn is_object_reference(&self) -> bool {
        if self.is_managed_pointer() {
            return false;
        }

        self.modifiers
            .intersects(TypeModifiers::SZ_ARRAY | TypeModifiers::GENERIC_PARAM)
            || matches!(
                self.element,
                ElementType::String | ElementType::Object | ElementType::Class
            )
    }

    /// True for `void` return types
    #[must_use]
    pub fn is_void(&self) -> bool {
        self.element == ElementType::Void && self.modifiers.is_empty()
    }
}

impl Default for TypeDesc {
    fn default() -> Self {
        TypeDesc::primitive(ElementType::Void)
    }
}

/// A laid out storage slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VarDesc {
    /// Byte offset inside the owning storage
    pub offset: usize,
    /// Size of the slot in bytes
    pub size: usize,
    /// Type of the value stored in the slot
    pub ty: TypeDesc,
}

impl VarDesc {
    /// The byte range of the slot
    #[must_use]
    pub fn range(&self) -> std::ops::Range<usize> {
        self.offset..self.offset + self.size
    }
}
