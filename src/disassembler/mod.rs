//! CIL bytecode decoder.
//!
//! Opcode tables for the whole instruction set (256 single byte entries plus 256 entries behind
//! the `0xFE` prefix) describing mnemonic, operand shape, control flow class and stack effect,
//! and the decoder the interpreter and the `disasm` command share.
//!
//! # Key Types
//! - [`Instruction`] - Represents a decoded CIL instruction
//! - [`Operand`] - Instruction operands (immediates, tokens, targets)
//! - [`FlowType`] - How instructions affect control flow
//!
//! # Main Functions
//! - [`decode_instruction`] - Decode a single instruction
//! - [`decode_stream`] - Decode a sequence of instructions
//! - [`decode_method`] - Decode the body of a loaded method
//!
//! # Example
//! ```rust
//! use minclr::disassembler::decode_instruction;
//! use minclr::Parser;
//! let bytecode = &[0x00, 0x2A]; // nop, ret
//! let mut parser = Parser::new(bytecode);
//! let instruction = decode_instruction(&mut parser)?;
//! assert_eq!(instruction.mnemonic, "nop");
//! # Ok::<(), minclr::Error>(())
//! ```

mod decoder;
mod instruction;
mod instructions;

pub use decoder::{decode_instruction, decode_method, decode_stream};
pub use instruction::{
    FlowType, Immediate, Instruction, InstructionCategory, Operand, OperandType, StackBehavior,
};
pub use instructions::*;
