//! Field descriptors.

use crate::{
    metadata::{tables::FieldAttributes, token::Token},
    typesystem::{ClassId, ModuleId, VarDesc},
};

/// The in-memory representation of one field definition.
#[derive(Debug, Clone)]
pub struct FieldDesc {
    /// The owning class
    pub class: ClassId,
    /// The module defining the field
    pub module: ModuleId,
    /// The `Field` token
    pub token: Token,
    /// Field name
    pub name: String,
    /// Field attributes
    pub flags: FieldAttributes,
    /// The `FieldSig` blob
    pub signature: Vec<u8>,
    /// Offset inside instance or static storage and the field's type. Only meaningful once the
    /// owning class reached the matching load level; literal fields are never laid out.
    pub var: VarDesc,
}

impl FieldDesc {
    /// True for static fields, literals included
    #[must_use]
    pub fn is_static(&self) -> bool {
        self.flags.contains(FieldAttributes::STATIC)
    }

    /// True for compile time constants
    #[must_use]
    pub fn is_literal(&self) -> bool {
        self.flags.contains(FieldAttributes::LITERAL)
    }

    /// True for fields stored in the class' static storage
    #[must_use]
    pub fn has_static_storage(&self) -> bool {
        self.is_static() && !self.is_literal()
    }
}
