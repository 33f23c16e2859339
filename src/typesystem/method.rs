//! Method descriptors and their frame layouts.

use std::{fmt, sync::OnceLock};

use crate::{
    execution::{ExecutionError, NativeFunction},
    metadata::{
        method::{MethodAttributes, MethodImplAttributes},
        token::Token,
    },
    typesystem::{ClassId, ModuleId, TypeDesc, VarDesc},
    Result,
};

/// A bytecode method body inside the image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BytecodeBody {
    /// File offset of the first instruction
    pub begin: usize,
    /// File offset one past the last instruction
    pub end: usize,
    /// Max-stack hint of the header
    pub max_stack: usize,
    /// The header requests zero initialized locals
    pub init_locals: bool,
    /// Blob of the `LocalVarSig`, if the method has locals
    pub local_signature: Option<Vec<u8>>,
}

impl BytecodeBody {
    /// Length of the code in bytes
    #[must_use]
    pub fn code_size(&self) -> usize {
        self.end - self.begin
    }
}

/// How a method is implemented.
#[derive(Debug, Clone)]
pub enum MethodImplementation {
    /// IL bytecode stored in the image
    Bytecode(BytecodeBody),
    /// A native function from the [`crate::execution::EcallRegistry`]
    Native {
        /// The bound function
        function: NativeFunction,
        /// Declared argument count, receiver included
        arg_count: usize,
    },
    /// An internal call without a registered implementation; invoking it fails with
    /// [`crate::Error::ECallNotFound`]
    UnboundNative,
    /// No body at all (abstract, runtime provided or RVA 0)
    Abstract,
}

/// Storage of one call: arguments (receiver first) followed by locals.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FrameLayout {
    /// Arguments in declaration order, receiver first
    pub args: Vec<VarDesc>,
    /// Locals in declaration order, offsets start at `params_size`
    pub locals: Vec<VarDesc>,
    /// The return type, `None` for `void`
    pub return_type: Option<TypeDesc>,
    /// Bytes used by the arguments, 8-byte aligned
    pub params_size: usize,
    /// Bytes used by the locals, 8-byte aligned
    pub locals_size: usize,
}

impl FrameLayout {
    /// Size of the scratch buffer for one call
    #[must_use]
    pub fn frame_size(&self) -> usize {
        self.params_size + self.locals_size
    }

    /// The argument at `index`
    ///
    /// # Errors
    /// Returns [`ExecutionError::InvalidVariable`] if the method has fewer arguments.
    pub fn arg(&self, index: u16) -> Result<&VarDesc> {
        self.args
            .get(usize::from(index))
            .ok_or_else(|| ExecutionError::InvalidVariable { kind: "argument", index }.into())
    }

    /// The local at `index`
    ///
    /// # Errors
    /// Returns [`ExecutionError::InvalidVariable`] if the method has fewer locals.
    pub fn local(&self, index: u16) -> Result<&VarDesc> {
        self.locals
            .get(usize::from(index))
            .ok_or_else(|| ExecutionError::InvalidVariable { kind: "local", index }.into())
    }
}

/// The in-memory representation of one method definition.
pub struct MethodDesc {
    /// The owning class
    pub class: ClassId,
    /// The module defining the method
    pub module: ModuleId,
    /// The `MethodDef` token
    pub token: Token,
    /// Method name
    pub name: String,
    /// Method attributes
    pub flags: MethodAttributes,
    /// Implementation attributes
    pub impl_flags: MethodImplAttributes,
    /// The `MethodDefSig` blob
    pub signature: Vec<u8>,
    /// Body or native binding
    pub implementation: MethodImplementation,
    pub(crate) frame: OnceLock<FrameLayout>,
}

impl MethodDesc {
    /// True for methods without a receiver
    #[must_use]
    pub fn is_static(&self) -> bool {
        self.flags.contains(MethodAttributes::STATIC)
    }

    /// True for internal calls, bound or not
    #[must_use]
    pub fn is_native(&self) -> bool {
        matches!(
            self.implementation,
            MethodImplementation::Native { .. } | MethodImplementation::UnboundNative
        )
    }

    /// The bytecode body, if the method has one
    #[must_use]
    pub fn body(&self) -> Option<&BytecodeBody> {
        match &self.implementation {
            MethodImplementation::Bytecode(body) => Some(body),
            _ => None,
        }
    }

    /// True for instance and type constructors
    #[must_use]
    pub fn is_constructor(&self) -> bool {
        self.flags.contains(MethodAttributes::RT_SPECIAL_NAME)
            && (self.name == ".ctor" || self.name == ".cctor")
    }
}

impl fmt::Debug for MethodDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodDesc")
            .field("name", &self.name)
            .field("class", &self.class)
            .field("token", &self.token)
            .field("flags", &self.flags)
            .field("implementation", &self.implementation)
            .finish_non_exhaustive()
    }
}
