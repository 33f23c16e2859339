//! Decoded instruction model.

use std::fmt;

use crate::metadata::token::Token;

/// Immediate operand encodings.
#[derive(Debug, Clone, Copy, PartialEq)]
#[allow(missing_docs)]
pub enum Immediate {
    Int8(i8),
    UInt8(u8),
    Int32(i32),
    Int64(i64),
    Float32(f32),
    Float64(f64),
}

impl fmt::Display for Immediate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Immediate::Int8(value) => write!(f, "{}", value),
            Immediate::UInt8(value) => write!(f, "{}", value),
            Immediate::Int32(value) => write!(f, "{}", value),
            Immediate::Int64(value) => write!(f, "{}", value),
            Immediate::Float32(value) => write!(f, "{}", value),
            Immediate::Float64(value) => write!(f, "{}", value),
        }
    }
}

/// Shape of the operand that follows an opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandType {
    /// No operand
    None,
    /// 1 byte argument or local index
    Variable8,
    /// 2 byte argument or local index
    Variable16,
    /// 1 byte signed immediate
    Int8,
    /// 1 byte unsigned immediate (prefix arguments)
    UInt8,
    /// 4 byte signed immediate
    Int32,
    /// 8 byte signed immediate
    Int64,
    /// 4 byte float
    Float32,
    /// 8 byte float
    Float64,
    /// 4 byte metadata token
    Token,
    /// 1 byte signed branch offset
    Target8,
    /// 4 byte signed branch offset
    Target32,
    /// u32 count followed by that many i32 branch offsets
    Switch,
    /// u8 count followed by that many u16 entries
    Phi,
}

/// A decoded operand.
///
/// Branch and switch targets are stored as absolute offsets into the method's code, already
/// relative to the end of the instruction as the encoding requires.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// The instruction has no operand
    None,
    /// An immediate constant
    Immediate(Immediate),
    /// A branch target
    Target(u32),
    /// A metadata token
    Token(Token),
    /// An argument or local variable index
    Variable(u16),
    /// Targets of a `switch`, in case order
    Switch(Vec<u32>),
    /// Entries of a phi node
    Phi(Vec<u16>),
}

/// How an instruction affects control flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowType {
    /// Execution continues with the next instruction
    Sequential,
    /// Branch taken depending on a popped value
    ConditionalBranch,
    /// Branch always taken
    UnconditionalBranch,
    /// Multi-way branch
    Switch,
    /// Calls another method and continues afterwards
    Call,
    /// Leaves the current method
    Return,
    /// Raises an exception
    Throw,
    /// Leaves a protected region
    Leave,
    /// Ends a finally or fault handler
    EndFinally,
    /// Debugger breakpoint
    Break,
}

/// Rough grouping of the instruction set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum InstructionCategory {
    Arithmetic,
    BitwiseLogical,
    Comparison,
    ControlFlow,
    Conversion,
    LoadStore,
    ObjectModel,
    Prefix,
    Misc,
}

/// Stack effect of an instruction. Variable effects, e.g. of calls, are recorded as 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StackBehavior {
    /// Values popped
    pub pops: u8,
    /// Values pushed
    pub pushes: u8,
    /// `pushes - pops`
    pub net_effect: i8,
}

/// One decoded instruction.
#[derive(Debug, Clone, PartialEq)]
pub struct Instruction {
    /// Offset of the opcode inside the method's code
    pub offset: u32,
    /// Encoded length, opcode and operand
    pub size: u32,
    /// The opcode byte, the second byte for `0xFE` prefixed instructions
    pub opcode: u8,
    /// `0xFE` for extended instructions, 0 otherwise
    pub prefix: u8,
    /// Assembler name
    pub mnemonic: &'static str,
    /// Instruction group
    pub category: InstructionCategory,
    /// Control flow class
    pub flow_type: FlowType,
    /// Stack effect
    pub stack_behavior: StackBehavior,
    /// The decoded operand
    pub operand: Operand,
}

impl Instruction {
    /// Offset of the instruction that follows in memory
    #[must_use]
    pub fn next_offset(&self) -> u32 {
        self.offset + self.size
    }

    /// All branch targets of this instruction, empty for non branching instructions
    #[must_use]
    pub fn branch_targets(&self) -> Vec<u32> {
        match &self.operand {
            Operand::Target(target) => vec![*target],
            Operand::Switch(targets) => targets.clone(),
            _ => Vec::new(),
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "IL_{:04X}: {}", self.offset, self.mnemonic)?;

        match &self.operand {
            Operand::None => Ok(()),
            Operand::Immediate(immediate) => write!(f, " {}", immediate),
            Operand::Target(target) => write!(f, " IL_{:04X}", target),
            Operand::Token(token) => write!(f, " {}", token),
            Operand::Variable(index) => write!(f, " {}", index),
            Operand::Switch(targets) => {
                let labels: Vec<String> = targets
                    .iter()
                    .map(|target| format!("IL_{:04X}", target))
                    .collect();
                write!(f, " ({})", labels.join(", "))
            }
            Operand::Phi(entries) => write!(f, " {:?}", entries),
        }
    }
}
