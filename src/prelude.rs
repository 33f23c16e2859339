//! # minclr Prelude
//!
//! This module provides a convenient prelude for the most commonly used types from the minclr
//! library. Import it to get quick access to everything needed to load images and run methods.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all minclr operations
pub use crate::Error;

/// The result type used throughout minclr
pub use crate::Result;

/// Low-level file parsing utilities
pub use crate::{File, Parser};

// ================================================================================================
// Metadata
// ================================================================================================

/// Metadata token type for referencing table entries
pub use crate::metadata::token::Token;

/// Main headers
pub use crate::metadata::{cor20header::Cor20Header, root::Root};

/// Metadata table identifiers and the table stream
pub use crate::metadata::tables::{TableId, TablesHeader};

/// Common attribute flags for metadata tables
pub use crate::metadata::tables::{FieldAttributes, TypeAttributes};

/// Method attribute flags
pub use crate::metadata::method::{MethodAttributes, MethodImplAttributes};

/// Core signature types
pub use crate::metadata::signatures::{SignatureMethod, SignatureParameter, TypeSignature};

// ================================================================================================
// Type System and Binding
// ================================================================================================

/// Runtime type system records and their ids
pub use crate::typesystem::{
    ClassId, EEClass, FieldDesc, FieldId, MethodDesc, MethodId, ModuleId, TypeSystem,
};

/// Name based lookup and the built-in types
pub use crate::binder::{Binder, WellKnownType, WellKnownTypes};

// ================================================================================================
// Execution
// ================================================================================================

/// The interpreter and its configuration
pub use crate::execution::{EcallRegistry, Engine, EngineConfig, ExecutionError, ObjectRef, Value};

// ================================================================================================
// Disassembler
// ================================================================================================

/// CIL instruction decoding
pub use crate::disassembler::{
    decode_instruction, decode_method, decode_stream, FlowType, Instruction, Operand,
};

// ================================================================================================
// Image Builder
// ================================================================================================

/// Generation of loadable images
pub use crate::builder::{AssemblyBuilder, MethodBodyBuilder};
