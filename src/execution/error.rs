//! Errors raised while executing bytecode.

use thiserror::Error;

use crate::metadata::token::Token;

/// Failures of the interpreter.
///
/// All of them abort the current call chain. When the outermost call fails the engine empties its
/// evaluation stack and frame stack, so the same [`crate::execution::Engine`] can be reused
/// afterwards.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExecutionError {
    /// The byte (or `0xFE` pair) at `offset` is not a defined opcode
    #[error("Unknown opcode 0x{opcode:04X} at IL_{offset:04X}")]
    UnknownOpcode {
        /// Opcode, with the `0xFE` prefix in the high byte for extended opcodes
        opcode: u16,
        /// Offset inside the method body
        offset: u32,
    },

    /// The opcode is defined but has no implementation in the dispatcher
    #[error("Unimplemented opcode {mnemonic} at IL_{offset:04X}")]
    UnimplementedOpcode {
        /// Mnemonic of the instruction
        mnemonic: &'static str,
        /// Offset inside the method body
        offset: u32,
    },

    /// The decoded operand does not have the shape the instruction needs
    #[error("Invalid operand for {mnemonic} - expected {expected}")]
    InvalidOperand {
        /// Mnemonic of the instruction
        mnemonic: &'static str,
        /// The operand shape the handler needed
        expected: &'static str,
    },

    /// A token operand names a table the instruction can not use
    #[error("Token {0} is not valid for this instruction")]
    BadToken(Token),

    /// A push would exceed the evaluation stack capacity
    #[error("Evaluation stack overflow - {requested} bytes requested, capacity {capacity}")]
    StackOverflow {
        /// Bytes the stack would have needed
        requested: usize,
        /// The configured capacity
        capacity: usize,
    },

    /// A pop on an empty stack, or below the current frame's entry depth
    #[error("Evaluation stack underflow")]
    StackUnderflow,

    /// The call chain is deeper than the configured limit
    #[error("Call depth {depth} exceeds the limit of {limit}")]
    CallDepthExceeded {
        /// Depth the new call would have reached
        depth: usize,
        /// The configured limit
        limit: usize,
    },

    /// An operand does not have the type the instruction requires
    #[error("Type mismatch - expected {expected}, found {found}")]
    TypeMismatch {
        /// What the instruction needed
        expected: &'static str,
        /// What was found
        found: &'static str,
    },

    /// An instance field or the class of a null reference was accessed
    #[error("Null reference")]
    NullReference,

    /// Integer division or remainder by zero
    #[error("Division by zero")]
    DivideByZero,

    /// Integer division overflowed (`MIN / -1`)
    #[error("Arithmetic overflow")]
    Overflow,

    /// An object of a class whose instance layout is not computed was requested
    #[error("Class {0} is not loaded")]
    ClassNotLoaded(String),

    /// The object heap has no room for the allocation
    #[error("Object heap exhausted - {requested} bytes requested, capacity {capacity}")]
    OutOfMemory {
        /// Bytes the allocation needed
        requested: usize,
        /// The configured capacity
        capacity: usize,
    },

    /// An object reference does not point into the heap
    #[error("Invalid object reference 0x{0:X}")]
    InvalidReference(u32),

    /// An argument or local index beyond the method's frame
    #[error("Invalid {kind} index {index}")]
    InvalidVariable {
        /// `argument` or `local`
        kind: &'static str,
        /// The offending index
        index: u16,
    },

    /// Control left the method body without reaching `ret`
    #[error("Invalid branch target IL_{0:04X}")]
    InvalidBranchTarget(u32),

    /// A native function was invoked with the wrong number of arguments
    #[error("Native function takes {expected} arguments, {found} were passed")]
    ArgumentCountMismatch {
        /// Arity of the native function
        expected: usize,
        /// Number of arguments passed
        found: usize,
    },
}
