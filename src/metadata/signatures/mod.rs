//! Signature blobs (ECMA-335 II.23.2).
//!
//! Method, field and local variable signatures describe the types of parameters, return values,
//! fields and locals. [`SignatureParser`] decodes them into [`TypeSignature`] trees which the
//! type system resolves into [`crate::typesystem::TypeDesc`] values; the encoders produce them
//! for [`crate::builder`].
//!
//! Only the subset this virtual machine executes is decoded: primitives, strings, objects,
//! classes, value types, pointers, by-ref parameters, generic parameter references and single
//! dimensional arrays. Multi-dimensional arrays, generic instantiations, function pointers and
//! typed references are rejected with [`crate::Error::NotSupported`].

mod encoders;
mod parser;
mod types;

pub use encoders::{
    encode_field_signature, encode_local_var_signature, encode_method_signature,
    encode_type_signature,
};
pub use parser::{SignatureParser, MAX_RECURSION_DEPTH};
pub use types::*;
