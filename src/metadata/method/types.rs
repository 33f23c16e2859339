//! Attribute and header flags of methods (ECMA-335 II.23.1.10, II.23.1.11, II.25.4).

use bitflags::bitflags;

/// Mask of the member access bits inside [`MethodAttributes`]
pub const METHOD_ACCESS_MASK: u32 = 0x0007;

/// Mask of the code type bits inside [`MethodImplAttributes`]
pub const METHOD_IMPL_CODE_TYPE_MASK: u32 = 0x0003;

bitflags! {
    #[derive(PartialEq, Eq, Debug, Clone, Copy)]
    /// Flags of a `MethodDef` row
    pub struct MethodAttributes: u32 {
        /// Accessible only by the parent type
        const PRIVATE = 0x0001;
        /// Accessible by sub-types only in this assembly
        const FAM_AND_ASSEM = 0x0002;
        /// Accessible by anyone in the assembly
        const ASSEM = 0x0003;
        /// Accessible only by the type and sub-types
        const FAMILY = 0x0004;
        /// Accessible by sub-types anywhere, plus anyone in the assembly
        const FAM_OR_ASSEM = 0x0005;
        /// Accessible by anyone who has visibility to this scope
        const PUBLIC = 0x0006;
        /// Defined on the type, no receiver is passed
        const STATIC = 0x0010;
        /// Method can not be overridden
        const FINAL = 0x0020;
        /// Method is virtual
        const VIRTUAL = 0x0040;
        /// Method hides by name and signature
        const HIDE_BY_SIG = 0x0080;
        /// Method always gets a new slot in the vtable
        const NEW_SLOT = 0x0100;
        /// Overridable only if also accessible
        const STRICT = 0x0200;
        /// Method does not provide an implementation
        const ABSTRACT = 0x0400;
        /// Method is special
        const SPECIAL_NAME = 0x0800;
        /// The runtime checks the name encoding, used for `.ctor` and `.cctor`
        const RT_SPECIAL_NAME = 0x1000;
        /// Implementation is forwarded through `PInvoke`
        const PINVOKE_IMPL = 0x2000;
        /// Method has security associated with it
        const HAS_SECURITY = 0x4000;
        /// Method calls another method containing security code
        const REQUIRE_SEC_OBJECT = 0x8000;
    }
}

bitflags! {
    #[derive(PartialEq, Eq, Debug, Clone, Copy)]
    /// Implementation flags of a `MethodDef` row
    pub struct MethodImplAttributes: u32 {
        /// Method implementation is native
        const NATIVE = 0x0001;
        /// Method implementation is OPTIL
        const OPTIL = 0x0002;
        /// Method implementation is provided by the runtime
        const RUNTIME = 0x0003;
        /// Method implementation is unmanaged
        const UNMANAGED = 0x0004;
        /// Method can not be inlined
        const NO_INLINING = 0x0008;
        /// Method is defined as a forward reference
        const FORWARD_REF = 0x0010;
        /// Method is single threaded through the body
        const SYNCHRONIZED = 0x0020;
        /// Method signature is exported exactly as declared
        const PRESERVE_SIG = 0x0080;
        /// Method is implemented inside the runtime itself
        const INTERNAL_CALL = 0x1000;
        /// Method can not be optimized
        const NO_OPTIMIZATION = 0x0040;
    }
}

bitflags! {
    #[derive(PartialEq, Eq, Debug, Clone, Copy)]
    /// Flags of the first byte(s) of a method body header
    pub struct MethodBodyFlags: u16 {
        /// Tiny header, code size in the upper 6 bits
        const TINY_FORMAT = 0x2;
        /// Fat header, 12 bytes
        const FAT_FORMAT = 0x3;
        /// Extra data sections follow the code
        const MORE_SECTS = 0x8;
        /// Locals are zero initialized
        const INIT_LOCALS = 0x10;
    }
}
