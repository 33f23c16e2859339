use crate::metadata::token::Token;

#[allow(non_snake_case, dead_code, missing_docs)]
/// Bytes that start a type inside a signature blob (II.23.1.16)
pub mod ELEMENT_TYPE {
    //Marks end of a list
    pub const END: u8 = 0x00;
    pub const VOID: u8 = 0x01;
    pub const BOOLEAN: u8 = 0x02;
    pub const CHAR: u8 = 0x03;
    pub const I1: u8 = 0x04;
    pub const U1: u8 = 0x05;
    pub const I2: u8 = 0x06;
    pub const U2: u8 = 0x07;
    pub const I4: u8 = 0x08;
    pub const U4: u8 = 0x09;
    pub const I8: u8 = 0x0a;
    pub const U8: u8 = 0x0b;
    pub const R4: u8 = 0x0c;
    pub const R8: u8 = 0x0d;
    pub const STRING: u8 = 0x0e;
    // Followed by type
    pub const PTR: u8 = 0x0f;
    // Followed by type
    pub const BYREF: u8 = 0x10;
    // Followed by TypeDefOrRef token
    pub const VALUETYPE: u8 = 0x11;
    // Followed by TypeDefOrRef token
    pub const CLASS: u8 = 0x12;
    // Generic parameter of a type, followed by its number
    pub const VAR: u8 = 0x13;
    pub const ARRAY: u8 = 0x14;
    pub const GENERICINST: u8 = 0x15;
    pub const TYPEDBYREF: u8 = 0x16;
    pub const I: u8 = 0x18;
    pub const U: u8 = 0x19;
    pub const FNPTR: u8 = 0x1b;
    pub const OBJECT: u8 = 0x1c;
    // Single dimension, zero based array
    pub const SZARRAY: u8 = 0x1d;
    // Generic parameter of a method, followed by its number
    pub const MVAR: u8 = 0x1e;
    pub const CMOD_REQD: u8 = 0x1f;
    pub const CMOD_OPT: u8 = 0x20;
    pub const INTERNAL: u8 = 0x21;
    pub const SENTINEL: u8 = 0x41;
    pub const PINNED: u8 = 0x45;
}

#[allow(non_snake_case, dead_code, missing_docs)]
/// Leading byte of method, field and local variable signatures (II.23.2.1 - II.23.2.6)
pub mod SIGNATURE_HEADER {
    pub const DEFAULT: u8 = 0x00;
    pub const C: u8 = 0x01;
    pub const STDCALL: u8 = 0x02;
    pub const THISCALL: u8 = 0x03;
    pub const FASTCALL: u8 = 0x04;
    pub const VARARG: u8 = 0x05;
    pub const FIELD: u8 = 0x06;
    pub const LOCAL_SIG: u8 = 0x07;
    pub const GENERIC: u8 = 0x10;
    pub const HAS_THIS: u8 = 0x20;
    pub const EXPLICIT_THIS: u8 = 0x40;
    // Mask of the calling convention kind
    pub const KIND_MASK: u8 = 0x0f;
}

/// A type as it appears inside a signature blob.
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum TypeSignature {
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
    /// Native sized signed integer
    I,
    /// Native sized unsigned integer
    U,
    String,
    Object,
    /// Unmanaged pointer to the contained type
    Ptr(Box<TypeSignature>),
    /// A value type named by a `TypeDefOrRef` token
    ValueType(Token),
    /// A reference type named by a `TypeDefOrRef` token
    Class(Token),
    /// Generic parameter of the enclosing type, by number
    GenericParamType(u32),
    /// Generic parameter of the enclosing method, by number
    GenericParamMethod(u32),
    /// Single dimensional, zero based array of the contained type
    SzArray(Box<TypeSignature>),
}

/// A parameter, return type, field type or local variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureParameter {
    /// Custom modifiers preceding the type, kept for display only
    pub modifiers: Vec<Token>,
    /// Passed by reference (`ELEMENT_TYPE_BYREF`)
    pub by_ref: bool,
    /// The type
    pub base: TypeSignature,
}

impl SignatureParameter {
    /// A by-value parameter of type `base` without modifiers
    #[must_use]
    pub fn new(base: TypeSignature) -> Self {
        SignatureParameter {
            modifiers: Vec::new(),
            by_ref: false,
            base,
        }
    }
}

/// A `MethodDefSig` or `MethodRefSig` (II.23.2.1, II.23.2.2).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureMethod {
    /// The method takes a receiver
    pub has_this: bool,
    /// The receiver is listed explicitly among `params`
    pub explicit_this: bool,
    /// Number of generic parameters, 0 for non generic methods
    pub generic_param_count: u32,
    /// Calling convention kind from the low nibble of the header byte
    pub calling_convention: u8,
    /// The return type
    pub return_type: SignatureParameter,
    /// The declared parameters, excluding the receiver
    pub params: Vec<SignatureParameter>,
}

impl SignatureMethod {
    /// Number of arguments passed on the stack, receiver included
    #[must_use]
    pub fn arg_count(&self) -> usize {
        self.params.len() + usize::from(self.has_this && !self.explicit_this)
    }

    /// True if the method returns nothing
    #[must_use]
    pub fn returns_void(&self) -> bool {
        !self.return_type.by_ref && self.return_type.base == TypeSignature::Void
    }

    /// Default calling convention signature of a static method
    #[must_use]
    pub fn new_static(return_type: TypeSignature, params: Vec<TypeSignature>) -> Self {
        SignatureMethod {
            has_this: false,
            explicit_this: false,
            generic_param_count: 0,
            calling_convention: SIGNATURE_HEADER::DEFAULT,
            return_type: SignatureParameter::new(return_type),
            params: params.into_iter().map(SignatureParameter::new).collect(),
        }
    }

    /// Default calling convention signature of an instance method, the receiver is implicit
    #[must_use]
    pub fn new_instance(return_type: TypeSignature, params: Vec<TypeSignature>) -> Self {
        SignatureMethod {
            has_this: true,
            ..Self::new_static(return_type, params)
        }
    }
}
