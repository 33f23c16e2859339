//! CIL instruction decoding.
//!
//! # Example: Decoding a Single Instruction
//!
//! ```rust
//! use minclr::{Parser, disassembler::decode_instruction};
//! let code = [0x2A]; // ret
//! let mut parser = Parser::new(&code);
//! let instr = decode_instruction(&mut parser)?;
//! assert_eq!(instr.mnemonic, "ret");
//! # Ok::<(), minclr::Error>(())
//! ```
//!
//! # Example: Decoding a Stream of Instructions
//!
//! ```rust
//! use minclr::{Parser, disassembler::decode_stream};
//! let code = [0x00, 0x2A]; // nop, ret
//! let mut parser = Parser::new(&code);
//! let instrs = decode_stream(&mut parser)?;
//! assert_eq!(instrs.len(), 2);
//! # Ok::<(), minclr::Error>(())
//! ```

use crate::{
    disassembler::{
        opcodes, Immediate, Instruction, Operand, OperandType, StackBehavior, INSTRUCTIONS,
        INSTRUCTIONS_FE,
    },
    execution::ExecutionError,
    file::parser::Parser,
    metadata::token::Token,
    typesystem::{MethodId, TypeSystem},
    Result,
};

/// Decode the whole bytecode body of a loaded method
///
/// Offsets are relative to the first byte of code, after the method header.
///
/// # Errors
/// Returns [`crate::Error::NotSupported`] for methods without bytecode and the errors of
/// [`decode_stream`] for malformed code.
pub fn decode_method(types: &TypeSystem, method: MethodId) -> Result<Vec<Instruction>> {
    let mut parser = Parser::new(types.method_code(method)?);
    decode_stream(&mut parser)
}

/// Decode every instruction from the parser's position to the end of its data
///
/// Offsets in the returned instructions are positions inside the parser's buffer, so the parser
/// should cover exactly the code of one method.
///
/// # Errors
/// Returns [`ExecutionError::UnknownOpcode`] for undefined opcodes and
/// [`crate::Error::OutOfBounds`] for truncated operands.
pub fn decode_stream(parser: &mut Parser) -> Result<Vec<Instruction>> {
    let mut instructions = Vec::new();

    while parser.has_more_data() {
        instructions.push(decode_instruction(parser)?);
    }

    Ok(instructions)
}

/// Decode the instruction at the parser's position and advance past it
///
/// # Errors
/// Returns [`ExecutionError::UnknownOpcode`] for undefined opcodes and
/// [`crate::Error::OutOfBounds`] for truncated operands.
pub fn decode_instruction(parser: &mut Parser) -> Result<Instruction> {
    let offset = parser.pos();
    let first_byte = parser.read_le::<u8>()?;

    let (cil_instruction, prefix, opcode) = if first_byte == opcodes::FE_PREFIX {
        let second_byte = parser.read_le::<u8>()?;
        (
            &INSTRUCTIONS_FE[usize::from(second_byte)],
            opcodes::FE_PREFIX,
            second_byte,
        )
    } else {
        (&INSTRUCTIONS[usize::from(first_byte)], 0, first_byte)
    };

    if !cil_instruction.is_defined() {
        return Err(ExecutionError::UnknownOpcode {
            opcode: (u16::from(prefix) << 8) | u16::from(opcode),
            offset: offset as u32,
        }
        .into());
    }

    let raw_operand = read_operand(parser, cil_instruction.op_type)?;
    let next_offset = parser.pos() as u32;

    let operand = match raw_operand {
        RawOperand::Branch(delta) => Operand::Target(next_offset.wrapping_add(delta as u32)),
        RawOperand::Switch(deltas) => Operand::Switch(
            deltas
                .into_iter()
                .map(|delta| next_offset.wrapping_add(delta as u32))
                .collect(),
        ),
        RawOperand::Decoded(operand) => operand,
    };

    Ok(Instruction {
        offset: offset as u32,
        size: next_offset - offset as u32,
        opcode,
        prefix,
        mnemonic: cil_instruction.instr,
        category: cil_instruction.category,
        flow_type: cil_instruction.flow,
        stack_behavior: StackBehavior {
            pops: cil_instruction.stack_pops,
            pushes: cil_instruction.stack_pushes,
            // stack effects can legitimately be negative
            #[allow(clippy::cast_possible_wrap)]
            net_effect: cil_instruction.stack_pushes as i8 - cil_instruction.stack_pops as i8,
        },
        operand,
    })
}

enum RawOperand {
    Decoded(Operand),
    Branch(i32),
    Switch(Vec<i32>),
}

fn read_operand(parser: &mut Parser, op_type: OperandType) -> Result<RawOperand> {
    Ok(match op_type {
        OperandType::None => RawOperand::Decoded(Operand::None),
        OperandType::Variable8 => {
            RawOperand::Decoded(Operand::Variable(u16::from(parser.read_le::<u8>()?)))
        }
        OperandType::Variable16 => RawOperand::Decoded(Operand::Variable(parser.read_le::<u16>()?)),
        OperandType::Int8 => {
            RawOperand::Decoded(Operand::Immediate(Immediate::Int8(parser.read_le::<i8>()?)))
        }
        OperandType::UInt8 => {
            RawOperand::Decoded(Operand::Immediate(Immediate::UInt8(parser.read_le::<u8>()?)))
        }
        OperandType::Int32 => {
            RawOperand::Decoded(Operand::Immediate(Immediate::Int32(parser.read_le::<i32>()?)))
        }
        OperandType::Int64 => {
            RawOperand::Decoded(Operand::Immediate(Immediate::Int64(parser.read_le::<i64>()?)))
        }
        OperandType::Float32 => RawOperand::Decoded(Operand::Immediate(Immediate::Float32(
            parser.read_le::<f32>()?,
        ))),
        OperandType::Float64 => RawOperand::Decoded(Operand::Immediate(Immediate::Float64(
            parser.read_le::<f64>()?,
        ))),
        OperandType::Token => RawOperand::Decoded(Operand::Token(Token::new(parser.read_le::<u32>()?))),
        OperandType::Target8 => RawOperand::Branch(i32::from(parser.read_le::<i8>()?)),
        OperandType::Target32 => RawOperand::Branch(parser.read_le::<i32>()?),
        OperandType::Switch => {
            let case_count = parser.read_le::<u32>()? as usize;
            if case_count * 4 > parser.remaining() {
                return Err(crate::Error::OutOfBounds);
            }

            let mut targets = Vec::with_capacity(case_count);
            for _ in 0..case_count {
                targets.push(parser.read_le::<i32>()?);
            }

            RawOperand::Switch(targets)
        }
        OperandType::Phi => {
            let entry_count = parser.read_le::<u8>()?;

            let mut entries = Vec::with_capacity(usize::from(entry_count));
            for _ in 0..entry_count {
                entries.push(parser.read_le::<u16>()?);
            }

            RawOperand::Decoded(Operand::Phi(entries))
        }
    })
}
