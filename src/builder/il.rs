//! IL emission for one method body (ECMA-335 II.25.4).
//!
//! [`MethodBodyBuilder`] appends encoded instructions to a byte buffer. Branch targets are
//! [`Label`]s that may be marked before or after the branch referencing them; every branch is
//! emitted in its long form and patched once the body is finished.

use crate::{
    metadata::{
        method::MethodBodyFlags,
        signatures::{SignatureParameter, TypeSignature},
        token::Token,
    },
    Error, Result,
};

/// Bodies with more code than this need a fat header
const TINY_CODE_LIMIT: usize = 64;
/// Tiny headers imply this maximum stack depth
const TINY_STACK_LIMIT: u16 = 8;
/// Fat header size in 4-byte units, stored in the upper nibble of the flags
const FAT_HEADER_DWORDS: u16 = 3;

/// A branch target inside one [`MethodBodyBuilder`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Label(usize);

/// A 4-byte relative operand waiting for its label to be marked.
#[derive(Debug, Clone, Copy)]
struct Fixup {
    /// Position of the operand inside the code
    position: usize,
    /// Offset the displacement is relative to, the end of the instruction
    base: usize,
    label: Label,
}

/// Builder for the code and header of one method body.
///
/// Configuration methods consume and return the builder, emission methods work on `&mut self`
/// so instructions can be appended in loops.
///
/// # Examples
///
/// ```rust
/// use minclr::builder::MethodBodyBuilder;
///
/// let mut body = MethodBodyBuilder::new().max_stack(2);
/// let done = body.define_label();
/// body.ldarg(0).brfalse(done).ldc_i4(1).ret();
/// body.mark_label(done).ldc_i4(0).ret();
/// ```
#[derive(Debug, Clone)]
pub struct MethodBodyBuilder {
    code: Vec<u8>,
    labels: Vec<Option<usize>>,
    fixups: Vec<Fixup>,
    max_stack: u16,
    locals: Vec<SignatureParameter>,
    init_locals: bool,
}

impl Default for MethodBodyBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl MethodBodyBuilder {
    /// An empty body with a maximum stack depth of 8 and zero initialized locals
    #[must_use]
    pub fn new() -> Self {
        MethodBodyBuilder {
            code: Vec::new(),
            labels: Vec::new(),
            fixups: Vec::new(),
            max_stack: TINY_STACK_LIMIT,
            locals: Vec::new(),
            init_locals: true,
        }
    }

    /// Set the maximum evaluation stack depth recorded in the header
    #[must_use]
    pub fn max_stack(mut self, max_stack: u16) -> Self {
        self.max_stack = max_stack;
        self
    }

    /// Declare the next local variable
    ///
    /// Locals are numbered in declaration order, starting at 0.
    #[must_use]
    pub fn local(mut self, local_type: TypeSignature) -> Self {
        self.locals.push(SignatureParameter::new(local_type));
        self
    }

    /// Set whether locals are zero initialized on entry
    #[must_use]
    pub fn init_locals(mut self, init: bool) -> Self {
        self.init_locals = init;
        self
    }

    /// The declared locals
    #[must_use]
    pub fn locals(&self) -> &[SignatureParameter] {
        &self.locals
    }

    /// Current length of the code, the offset of the next instruction
    #[must_use]
    pub fn offset(&self) -> usize {
        self.code.len()
    }

    /// Create a label to be marked later with [`MethodBodyBuilder::mark_label`]
    pub fn define_label(&mut self) -> Label {
        self.labels.push(None);
        Label(self.labels.len() - 1)
    }

    /// Bind `label` to the offset of the next instruction
    pub fn mark_label(&mut self, label: Label) -> &mut Self {
        if let Some(slot) = self.labels.get_mut(label.0) {
            *slot = Some(self.code.len());
        }
        self
    }

    /// Append raw bytes, for instructions without a dedicated method
    pub fn raw(&mut self, bytes: &[u8]) -> &mut Self {
        self.code.extend_from_slice(bytes);
        self
    }

    /// Emit a one byte opcode without operand
    pub fn op(&mut self, opcode: u8) -> &mut Self {
        self.code.push(opcode);
        self
    }

    /// Emit a `0xFE` prefixed opcode without operand
    pub fn op_fe(&mut self, opcode: u8) -> &mut Self {
        self.code.extend_from_slice(&[0xFE, opcode]);
        self
    }

    fn op_token(&mut self, opcode: u8, token: Token) -> &mut Self {
        self.code.push(opcode);
        self.code.extend_from_slice(&token.value().to_le_bytes());
        self
    }

    /// Emit `nop`
    pub fn nop(&mut self) -> &mut Self {
        self.op(0x00)
    }

    /// Emit `dup`
    pub fn dup(&mut self) -> &mut Self {
        self.op(0x25)
    }

    /// Emit `pop`
    pub fn pop(&mut self) -> &mut Self {
        self.op(0x26)
    }

    /// Emit `ret`
    pub fn ret(&mut self) -> &mut Self {
        self.op(0x2A)
    }

    /// Emit `ldnull`
    pub fn ldnull(&mut self) -> &mut Self {
        self.op(0x14)
    }

    /// Emit `add`
    pub fn add(&mut self) -> &mut Self {
        self.op(0x58)
    }

    /// Emit `sub`
    pub fn sub(&mut self) -> &mut Self {
        self.op(0x59)
    }

    /// Emit `mul`
    pub fn mul(&mut self) -> &mut Self {
        self.op(0x5A)
    }

    /// Emit `div`
    pub fn div(&mut self) -> &mut Self {
        self.op(0x5B)
    }

    /// Emit `rem`
    pub fn rem(&mut self) -> &mut Self {
        self.op(0x5D)
    }

    /// Emit `neg`
    pub fn neg(&mut self) -> &mut Self {
        self.op(0x65)
    }

    /// Emit `ceq`
    pub fn ceq(&mut self) -> &mut Self {
        self.op_fe(0x01)
    }

    /// Emit `cgt`
    pub fn cgt(&mut self) -> &mut Self {
        self.op_fe(0x02)
    }

    /// Emit `clt`
    pub fn clt(&mut self) -> &mut Self {
        self.op_fe(0x04)
    }

    /// Push an `int32` constant using the shortest encoding
    pub fn ldc_i4(&mut self, value: i32) -> &mut Self {
        match value {
            -1..=8 => self.op((0x16 + value) as u8),
            -128..=127 => {
                self.code.extend_from_slice(&[0x1F, value as u8]);
                self
            }
            _ => {
                self.code.push(0x20);
                self.code.extend_from_slice(&value.to_le_bytes());
                self
            }
        }
    }

    /// Push an `int64` constant
    pub fn ldc_i8(&mut self, value: i64) -> &mut Self {
        self.code.push(0x21);
        self.code.extend_from_slice(&value.to_le_bytes());
        self
    }

    /// Push a `float32` constant
    pub fn ldc_r4(&mut self, value: f32) -> &mut Self {
        self.code.push(0x22);
        self.code.extend_from_slice(&value.to_le_bytes());
        self
    }

    /// Push a `float64` constant
    pub fn ldc_r8(&mut self, value: f64) -> &mut Self {
        self.code.push(0x23);
        self.code.extend_from_slice(&value.to_le_bytes());
        self
    }

    /// Load argument `index`, using `ldarg.0`-`ldarg.3`, `ldarg.s` or `ldarg`
    pub fn ldarg(&mut self, index: u16) -> &mut Self {
        match index {
            0..=3 => self.op(0x02 + index as u8),
            4..=255 => self.raw(&[0x0E, index as u8]),
            _ => self.variable_fe(0x09, index),
        }
    }

    /// Store into argument `index`
    pub fn starg(&mut self, index: u16) -> &mut Self {
        match index {
            0..=255 => self.raw(&[0x10, index as u8]),
            _ => self.variable_fe(0x0B, index),
        }
    }

    /// Load local `index`, using `ldloc.0`-`ldloc.3`, `ldloc.s` or `ldloc`
    pub fn ldloc(&mut self, index: u16) -> &mut Self {
        match index {
            0..=3 => self.op(0x06 + index as u8),
            4..=255 => self.raw(&[0x11, index as u8]),
            _ => self.variable_fe(0x0C, index),
        }
    }

    /// Store into local `index`, using `stloc.0`-`stloc.3`, `stloc.s` or `stloc`
    pub fn stloc(&mut self, index: u16) -> &mut Self {
        match index {
            0..=3 => self.op(0x0A + index as u8),
            4..=255 => self.raw(&[0x13, index as u8]),
            _ => self.variable_fe(0x0E, index),
        }
    }

    fn variable_fe(&mut self, opcode: u8, index: u16) -> &mut Self {
        self.op_fe(opcode);
        self.code.extend_from_slice(&index.to_le_bytes());
        self
    }

    /// Emit `call` of a `MethodDef` or `MemberRef`
    pub fn call(&mut self, method: Token) -> &mut Self {
        self.op_token(0x28, method)
    }

    /// Emit `newobj` of a constructor
    pub fn newobj(&mut self, constructor: Token) -> &mut Self {
        self.op_token(0x73, constructor)
    }

    /// Emit `ldstr` of a user string token
    pub fn ldstr(&mut self, string: Token) -> &mut Self {
        self.op_token(0x72, string)
    }

    /// Emit `ldfld`
    pub fn ldfld(&mut self, field: Token) -> &mut Self {
        self.op_token(0x7B, field)
    }

    /// Emit `stfld`
    pub fn stfld(&mut self, field: Token) -> &mut Self {
        self.op_token(0x7D, field)
    }

    /// Emit `ldsfld`
    pub fn ldsfld(&mut self, field: Token) -> &mut Self {
        self.op_token(0x7E, field)
    }

    /// Emit `stsfld`
    pub fn stsfld(&mut self, field: Token) -> &mut Self {
        self.op_token(0x80, field)
    }

    /// Emit the long form branch `opcode` (`0x38`-`0x44`) to `label`
    pub fn branch(&mut self, opcode: u8, label: Label) -> &mut Self {
        self.code.push(opcode);
        let position = self.code.len();
        self.code.extend_from_slice(&[0; 4]);
        self.fixups.push(Fixup {
            position,
            base: position + 4,
            label,
        });
        self
    }

    /// Emit `br`
    pub fn br(&mut self, label: Label) -> &mut Self {
        self.branch(0x38, label)
    }

    /// Emit `brfalse`
    pub fn brfalse(&mut self, label: Label) -> &mut Self {
        self.branch(0x39, label)
    }

    /// Emit `brtrue`
    pub fn brtrue(&mut self, label: Label) -> &mut Self {
        self.branch(0x3A, label)
    }

    /// Emit `beq`
    pub fn beq(&mut self, label: Label) -> &mut Self {
        self.branch(0x3B, label)
    }

    /// Emit `bge`
    pub fn bge(&mut self, label: Label) -> &mut Self {
        self.branch(0x3C, label)
    }

    /// Emit `bgt`
    pub fn bgt(&mut self, label: Label) -> &mut Self {
        self.branch(0x3D, label)
    }

    /// Emit `ble`
    pub fn ble(&mut self, label: Label) -> &mut Self {
        self.branch(0x3E, label)
    }

    /// Emit `blt`
    pub fn blt(&mut self, label: Label) -> &mut Self {
        self.branch(0x3F, label)
    }

    /// Emit `bne.un`
    pub fn bne_un(&mut self, label: Label) -> &mut Self {
        self.branch(0x40, label)
    }

    /// Emit `switch` over `targets`
    pub fn switch(&mut self, targets: &[Label]) -> &mut Self {
        self.code.push(0x45);
        self.code
            .extend_from_slice(&(targets.len() as u32).to_le_bytes());

        let first = self.code.len();
        let base = first + targets.len() * 4;
        for (index, label) in targets.iter().enumerate() {
            self.code.extend_from_slice(&[0; 4]);
            self.fixups.push(Fixup {
                position: first + index * 4,
                base,
                label: *label,
            });
        }
        self
    }

    /// Resolve labels and return the code without header
    ///
    /// # Errors
    /// Returns [`crate::Error::NotSupported`] if a referenced label was never marked.
    pub fn code(&self) -> Result<Vec<u8>> {
        let mut code = self.code.clone();
        for fixup in &self.fixups {
            let Some(Some(target)) = self.labels.get(fixup.label.0).copied() else {
                return Err(Error::NotSupported(format!(
                    "Branch at IL_{:04X} targets label {} which was never marked",
                    fixup.position - 1,
                    fixup.label.0
                )));
            };

            let displacement = target as i64 - fixup.base as i64;
            let displacement = i32::try_from(displacement).map_err(|_| {
                Error::NotSupported(format!("Branch displacement {} too large", displacement))
            })?;
            code[fixup.position..fixup.position + 4].copy_from_slice(&displacement.to_le_bytes());
        }

        Ok(code)
    }

    /// Encode header and code
    ///
    /// A tiny header is used when the code is shorter than 64 bytes, the stack is at most 8
    /// deep and there are no locals; otherwise a 12 byte fat header.
    ///
    /// ## Arguments
    /// * 'local_sig' - `StandAloneSig` token of the locals, null without locals
    ///
    /// # Errors
    /// See [`MethodBodyBuilder::code`].
    pub fn encode(&self, local_sig: Token) -> Result<Vec<u8>> {
        let code = self.code()?;

        if code.len() < TINY_CODE_LIMIT && self.max_stack <= TINY_STACK_LIMIT && self.locals.is_empty()
        {
            let mut body = Vec::with_capacity(code.len() + 1);
            body.push(((code.len() as u8) << 2) | MethodBodyFlags::TINY_FORMAT.bits() as u8);
            body.extend_from_slice(&code);
            return Ok(body);
        }

        let mut flags = MethodBodyFlags::FAT_FORMAT.bits() | (FAT_HEADER_DWORDS << 12);
        if self.init_locals {
            flags |= MethodBodyFlags::INIT_LOCALS.bits();
        }

        let mut body = Vec::with_capacity(code.len() + 12);
        body.extend_from_slice(&flags.to_le_bytes());
        body.extend_from_slice(&self.max_stack.to_le_bytes());
        body.extend_from_slice(&(code.len() as u32).to_le_bytes());
        body.extend_from_slice(&local_sig.value().to_le_bytes());
        body.extend_from_slice(&code);
        Ok(body)
    }
}
