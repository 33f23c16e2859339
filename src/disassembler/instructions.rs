//! Opcode tables of the CIL instruction set (ECMA-335 III).
//!
//! [`INSTRUCTIONS`] is indexed by the first opcode byte, [`INSTRUCTIONS_FE`] by the byte that
//! follows the `0xFE` prefix. Undefined entries have an empty mnemonic.

use crate::disassembler::{FlowType, InstructionCategory, OperandType};

/// Static description of one opcode.
#[derive(Debug, Clone, Copy)]
pub struct CilInstruction {
    /// Assembler name, empty for undefined opcodes
    pub instr: &'static str,
    /// Shape of the operand
    pub op_type: OperandType,
    /// Instruction group
    pub category: InstructionCategory,
    /// Control flow class
    pub flow: FlowType,
    /// Values popped, 0 for variable effects
    pub stack_pops: u8,
    /// Values pushed
    pub stack_pushes: u8,
}

impl CilInstruction {
    /// True for opcodes the instruction set defines
    #[must_use]
    pub const fn is_defined(&self) -> bool {
        !self.instr.is_empty()
    }
}

const RESERVED: CilInstruction = CilInstruction {
    instr: "",
    op_type: OperandType::None,
    category: InstructionCategory::Misc,
    flow: FlowType::Sequential,
    stack_pops: 0,
    stack_pushes: 0,
};

const fn op(
    instr: &'static str,
    op_type: OperandType,
    category: InstructionCategory,
    flow: FlowType,
    stack_pops: u8,
    stack_pushes: u8,
) -> CilInstruction {
    CilInstruction {
        instr,
        op_type,
        category,
        flow,
        stack_pops,
        stack_pushes,
    }
}

/// Single byte opcodes
pub static INSTRUCTIONS: [CilInstruction; 256] = single_byte_table();

/// Opcodes following the `0xFE` prefix
pub static INSTRUCTIONS_FE: [CilInstruction; 256] = extended_table();

#[rustfmt::skip]
const fn single_byte_table() -> [CilInstruction; 256] {
    let mut table = [RESERVED; 256];
    table[0x00] = op("nop", OperandType::None, InstructionCategory::Misc, FlowType::Sequential, 0, 0);
    table[0x01] = op("break", OperandType::None, InstructionCategory::Misc, FlowType::Break, 0, 0);
    table[0x02] = op("ldarg.0", OperandType::None, InstructionCategory::LoadStore, FlowType::Sequential, 0, 1);
    table[0x03] = op("ldarg.1", OperandType::None, InstructionCategory::LoadStore, FlowType::Sequential, 0, 1);
    table[0x04] = op("ldarg.2", OperandType::None, InstructionCategory::LoadStore, FlowType::Sequential, 0, 1);
    table[0x05] = op("ldarg.3", OperandType::None, InstructionCategory::LoadStore, FlowType::Sequential, 0, 1);
    table[0x06] = op("ldloc.0", OperandType::None, InstructionCategory::LoadStore, FlowType::Sequential, 0, 1);
    table[0x07] = op("ldloc.1", OperandType::None, InstructionCategory::LoadStore, FlowType::Sequential, 0, 1);
    table[0x08] = op("ldloc.2", OperandType::None, InstructionCategory::LoadStore, FlowType::Sequential, 0, 1);
    table[0x09] = op("ldloc.3", OperandType::None, InstructionCategory::LoadStore, FlowType::Sequential, 0, 1);
    table[0x0A] = op("stloc.0", OperandType::None, InstructionCategory::LoadStore, FlowType::Sequential, 1, 0);
    table[0x0B] = op("stloc.1", OperandType::None, InstructionCategory::LoadStore, FlowType::Sequential, 1, 0);
    table[0x0C] = op("stloc.2", OperandType::None, InstructionCategory::LoadStore, FlowType::Sequential, 1, 0);
    table[0x0D] = op("stloc.3", OperandType::None, InstructionCategory::LoadStore, FlowType::Sequential, 1, 0);
    table[0x0E] = op("ldarg.s", OperandType::Variable8, InstructionCategory::LoadStore, FlowType::Sequential, 0, 1);
    table[0x0F] = op("ldarga.s", OperandType::Variable8, InstructionCategory::LoadStore, FlowType::Sequential, 0, 1);
    table[0x10] = op("starg.s", OperandType::Variable8, InstructionCategory::LoadStore, FlowType::Sequential, 1, 0);
    table[0x11] = op("ldloc.s", OperandType::Variable8, InstructionCategory::LoadStore, FlowType::Sequential, 0, 1);
    table[0x12] = op("ldloca.s", OperandType::Variable8, InstructionCategory::LoadStore, FlowType::Sequential, 0, 1);
    table[0x13] = op("stloc.s", OperandType::Variable8, InstructionCategory::LoadStore, FlowType::Sequential, 1, 0);
    table[0x14] = op("ldnull", OperandType::None, InstructionCategory::LoadStore, FlowType::Sequential, 0, 1);
    table[0x15] = op("ldc.i4.m1", OperandType::None, InstructionCategory::LoadStore, FlowType::Sequential, 0, 1);
    table[0x16] = op("ldc.i4.0", OperandType::None, InstructionCategory::LoadStore, FlowType::Sequential, 0, 1);
    table[0x17] = op("ldc.i4.1", OperandType::None, InstructionCategory::LoadStore, FlowType::Sequential, 0, 1);
    table[0x18] = op("ldc.i4.2", OperandType::None, InstructionCategory::LoadStore, FlowType::Sequential, 0, 1);
    table[0x19] = op("ldc.i4.3", OperandType::None, InstructionCategory::LoadStore, FlowType::Sequential, 0, 1);
    table[0x1A] = op("ldc.i4.4", OperandType::None, InstructionCategory::LoadStore, FlowType::Sequential, 0, 1);
    table[0x1B] = op("ldc.i4.5", OperandType::None, InstructionCategory::LoadStore, FlowType::Sequential, 0, 1);
    table[0x1C] = op("ldc.i4.6", OperandType::None, InstructionCategory::LoadStore, FlowType::Sequential, 0, 1);
    table[0x1D] = op("ldc.i4.7", OperandType::None, InstructionCategory::LoadStore, FlowType::Sequential, 0, 1);
    table[0x1E] = op("ldc.i4.8", OperandType::None, InstructionCategory::LoadStore, FlowType::Sequential, 0, 1);
    table[0x1F] = op("ldc.i4.s", OperandType::Int8, InstructionCategory::LoadStore, FlowType::Sequential, 0, 1);
    table[0x20] = op("ldc.i4", OperandType::Int32, InstructionCategory::LoadStore, FlowType::Sequential, 0, 1);
    table[0x21] = op("ldc.i8", OperandType::Int64, InstructionCategory::LoadStore, FlowType::Sequential, 0, 1);
    table[0x22] = op("ldc.r4", OperandType::Float32, InstructionCategory::LoadStore, FlowType::Sequential, 0, 1);
    table[0x23] = op("ldc.r8", OperandType::Float64, InstructionCategory::LoadStore, FlowType::Sequential, 0, 1);
    table[0x25] = op("dup", OperandType::None, InstructionCategory::Misc, FlowType::Sequential, 1, 2);
    table[0x26] = op("pop", OperandType::None, InstructionCategory::Misc, FlowType::Sequential, 1, 0);
    table[0x27] = op("jmp", OperandType::Token, InstructionCategory::ControlFlow, FlowType::Call, 0, 0);
    table[0x28] = op("call", OperandType::Token, InstructionCategory::ControlFlow, FlowType::Call, 0, 0);
    table[0x29] = op("calli", OperandType::Token, InstructionCategory::ControlFlow, FlowType::Call, 0, 0);
    table[0x2A] = op("ret", OperandType::None, InstructionCategory::ControlFlow, FlowType::Return, 0, 0);
    table[0x2B] = op("br.s", OperandType::Target8, InstructionCategory::ControlFlow, FlowType::UnconditionalBranch, 0, 0);
    table[0x2C] = op("brfalse.s", OperandType::Target8, InstructionCategory::ControlFlow, FlowType::ConditionalBranch, 1, 0);
    table[0x2D] = op("brtrue.s", OperandType::Target8, InstructionCategory::ControlFlow, FlowType::ConditionalBranch, 1, 0);
    table[0x2E] = op("beq.s", OperandType::Target8, InstructionCategory::ControlFlow, FlowType::ConditionalBranch, 2, 0);
    table[0x2F] = op("bge.s", OperandType::Target8, InstructionCategory::ControlFlow, FlowType::ConditionalBranch, 2, 0);
    table[0x30] = op("bgt.s", OperandType::Target8, InstructionCategory::ControlFlow, FlowType::ConditionalBranch, 2, 0);
    table[0x31] = op("ble.s", OperandType::Target8, InstructionCategory::ControlFlow, FlowType::ConditionalBranch, 2, 0);
    table[0x32] = op("blt.s", OperandType::Target8, InstructionCategory::ControlFlow, FlowType::ConditionalBranch, 2, 0);
    table[0x33] = op("bne.un.s", OperandType::Target8, InstructionCategory::ControlFlow, FlowType::ConditionalBranch, 2, 0);
    table[0x34] = op("bge.un.s", OperandType::Target8, InstructionCategory::ControlFlow, FlowType::ConditionalBranch, 2, 0);
    table[0x35] = op("bgt.un.s", OperandType::Target8, InstructionCategory::ControlFlow, FlowType::ConditionalBranch, 2, 0);
    table[0x36] = op("ble.un.s", OperandType::Target8, InstructionCategory::ControlFlow, FlowType::ConditionalBranch, 2, 0);
    table[0x37] = op("blt.un.s", OperandType::Target8, InstructionCategory::ControlFlow, FlowType::ConditionalBranch, 2, 0);
    table[0x38] = op("br", OperandType::Target32, InstructionCategory::ControlFlow, FlowType::UnconditionalBranch, 0, 0);
    table[0x39] = op("brfalse", OperandType::Target32, InstructionCategory::ControlFlow, FlowType::ConditionalBranch, 1, 0);
    table[0x3A] = op("brtrue", OperandType::Target32, InstructionCategory::ControlFlow, FlowType::ConditionalBranch, 1, 0);
    table[0x3B] = op("beq", OperandType::Target32, InstructionCategory::ControlFlow, FlowType::ConditionalBranch, 2, 0);
    table[0x3C] = op("bge", OperandType::Target32, InstructionCategory::ControlFlow, FlowType::ConditionalBranch, 2, 0);
    table[0x3D] = op("bgt", OperandType::Target32, InstructionCategory::ControlFlow, FlowType::ConditionalBranch, 2, 0);
    table[0x3E] = op("ble", OperandType::Target32, InstructionCategory::ControlFlow, FlowType::ConditionalBranch, 2, 0);
    table[0x3F] = op("blt", OperandType::Target32, InstructionCategory::ControlFlow, FlowType::ConditionalBranch, 2, 0);
    table[0x40] = op("bne.un", OperandType::Target32, InstructionCategory::ControlFlow, FlowType::ConditionalBranch, 2, 0);
    table[0x41] = op("bge.un", OperandType::Target32, InstructionCategory::ControlFlow, FlowType::ConditionalBranch, 2, 0);
    table[0x42] = op("bgt.un", OperandType::Target32, InstructionCategory::ControlFlow, FlowType::ConditionalBranch, 2, 0);
    table[0x43] = op("ble.un", OperandType::Target32, InstructionCategory::ControlFlow, FlowType::ConditionalBranch, 2, 0);
    table[0x44] = op("blt.un", OperandType::Target32, InstructionCategory::ControlFlow, FlowType::ConditionalBranch, 2, 0);
    table[0x45] = op("switch", OperandType::Switch, InstructionCategory::ControlFlow, FlowType::Switch, 1, 0);
    table[0x46] = op("ldind.i1", OperandType::None, InstructionCategory::LoadStore, FlowType::Sequential, 1, 1);
    table[0x47] = op("ldind.u1", OperandType::None, InstructionCategory::LoadStore, FlowType::Sequential, 1, 1);
    table[0x48] = op("ldind.i2", OperandType::None, InstructionCategory::LoadStore, FlowType::Sequential, 1, 1);
    table[0x49] = op("ldind.u2", OperandType::None, InstructionCategory::LoadStore, FlowType::Sequential, 1, 1);
    table[0x4A] = op("ldind.i4", OperandType::None, InstructionCategory::LoadStore, FlowType::Sequential, 1, 1);
    table[0x4B] = op("ldind.u4", OperandType::None, InstructionCategory::LoadStore, FlowType::Sequential, 1, 1);
    table[0x4C] = op("ldind.i8", OperandType::None, InstructionCategory::LoadStore, FlowType::Sequential, 1, 1);
    table[0x4D] = op("ldind.i", OperandType::None, InstructionCategory::LoadStore, FlowType::Sequential, 1, 1);
    table[0x4E] = op("ldind.r4", OperandType::None, InstructionCategory::LoadStore, FlowType::Sequential, 1, 1);
    table[0x4F] = op("ldind.r8", OperandType::None, InstructionCategory::LoadStore, FlowType::Sequential, 1, 1);
    table[0x50] = op("ldind.ref", OperandType::None, InstructionCategory::LoadStore, FlowType::Sequential, 1, 1);
    table[0x51] = op("stind.ref", OperandType::None, InstructionCategory::LoadStore, FlowType::Sequential, 2, 0);
    table[0x52] = op("stind.i1", OperandType::None, InstructionCategory::LoadStore, FlowType::Sequential, 2, 0);
    table[0x53] = op("stind.i2", OperandType::None, InstructionCategory::LoadStore, FlowType::Sequential, 2, 0);
    table[0x54] = op("stind.i4", OperandType::None, InstructionCategory::LoadStore, FlowType::Sequential, 2, 0);
    table[0x55] = op("stind.i8", OperandType::None, InstructionCategory::LoadStore, FlowType::Sequential, 2, 0);
    table[0x56] = op("stind.r4", OperandType::None, InstructionCategory::LoadStore, FlowType::Sequential, 2, 0);
    table[0x57] = op("stind.r8", OperandType::None, InstructionCategory::LoadStore, FlowType::Sequential, 2, 0);
    table[0x58] = op("add", OperandType::None, InstructionCategory::Arithmetic, FlowType::Sequential, 2, 1);
    table[0x59] = op("sub", OperandType::None, InstructionCategory::Arithmetic, FlowType::Sequential, 2, 1);
    table[0x5A] = op("mul", OperandType::None, InstructionCategory::Arithmetic, FlowType::Sequential, 2, 1);
    table[0x5B] = op("div", OperandType::None, InstructionCategory::Arithmetic, FlowType::Sequential, 2, 1);
    table[0x5C] = op("div.un", OperandType::None, InstructionCategory::Arithmetic, FlowType::Sequential, 2, 1);
    table[0x5D] = op("rem", OperandType::None, InstructionCategory::Arithmetic, FlowType::Sequential, 2, 1);
    table[0x5E] = op("rem.un", OperandType::None, InstructionCategory::Arithmetic, FlowType::Sequential, 2, 1);
    table[0x5F] = op("and", OperandType::None, InstructionCategory::BitwiseLogical, FlowType::Sequential, 2, 1);
    table[0x60] = op("or", OperandType::None, InstructionCategory::BitwiseLogical, FlowType::Sequential, 2, 1);
    table[0x61] = op("xor", OperandType::None, InstructionCategory::BitwiseLogical, FlowType::Sequential, 2, 1);
    table[0x62] = op("shl", OperandType::None, InstructionCategory::BitwiseLogical, FlowType::Sequential, 2, 1);
    table[0x63] = op("shr", OperandType::None, InstructionCategory::BitwiseLogical, FlowType::Sequential, 2, 1);
    table[0x64] = op("shr.un", OperandType::None, InstructionCategory::BitwiseLogical, FlowType::Sequential, 2, 1);
    table[0x65] = op("neg", OperandType::None, InstructionCategory::Arithmetic, FlowType::Sequential, 1, 1);
    table[0x66] = op("not", OperandType::None, InstructionCategory::BitwiseLogical, FlowType::Sequential, 1, 1);
    table[0x67] = op("conv.i1", OperandType::None, InstructionCategory::Conversion, FlowType::Sequential, 1, 1);
    table[0x68] = op("conv.i2", OperandType::None, InstructionCategory::Conversion, FlowType::Sequential, 1, 1);
    table[0x69] = op("conv.i4", OperandType::None, InstructionCategory::Conversion, FlowType::Sequential, 1, 1);
    table[0x6A] = op("conv.i8", OperandType::None, InstructionCategory::Conversion, FlowType::Sequential, 1, 1);
    table[0x6B] = op("conv.r4", OperandType::None, InstructionCategory::Conversion, FlowType::Sequential, 1, 1);
    table[0x6C] = op("conv.r8", OperandType::None, InstructionCategory::Conversion, FlowType::Sequential, 1, 1);
    table[0x6D] = op("conv.u4", OperandType::None, InstructionCategory::Conversion, FlowType::Sequential, 1, 1);
    table[0x6E] = op("conv.u8", OperandType::None, InstructionCategory::Conversion, FlowType::Sequential, 1, 1);
    table[0x6F] = op("callvirt", OperandType::Token, InstructionCategory::ObjectModel, FlowType::Call, 0, 0);
    table[0x70] = op("cpobj", OperandType::Token, InstructionCategory::ObjectModel, FlowType::Sequential, 2, 0);
    table[0x71] = op("ldobj", OperandType::Token, InstructionCategory::ObjectModel, FlowType::Sequential, 1, 1);
    table[0x72] = op("ldstr", OperandType::Token, InstructionCategory::ObjectModel, FlowType::Sequential, 0, 1);
    table[0x73] = op("newobj", OperandType::Token, InstructionCategory::ObjectModel, FlowType::Call, 0, 1);
    table[0x74] = op("castclass", OperandType::Token, InstructionCategory::ObjectModel, FlowType::Sequential, 1, 1);
    table[0x75] = op("isinst", OperandType::Token, InstructionCategory::ObjectModel, FlowType::Sequential, 1, 1);
    table[0x76] = op("conv.r.un", OperandType::None, InstructionCategory::Conversion, FlowType::Sequential, 1, 1);
    table[0x79] = op("unbox", OperandType::Token, InstructionCategory::ObjectModel, FlowType::Sequential, 1, 1);
    table[0x7A] = op("throw", OperandType::None, InstructionCategory::ControlFlow, FlowType::Throw, 1, 0);
    table[0x7B] = op("ldfld", OperandType::Token, InstructionCategory::ObjectModel, FlowType::Sequential, 1, 1);
    table[0x7C] = op("ldflda", OperandType::Token, InstructionCategory::ObjectModel, FlowType::Sequential, 1, 1);
    table[0x7D] = op("stfld", OperandType::Token, InstructionCategory::ObjectModel, FlowType::Sequential, 2, 0);
    table[0x7E] = op("ldsfld", OperandType::Token, InstructionCategory::ObjectModel, FlowType::Sequential, 0, 1);
    table[0x7F] = op("ldsflda", OperandType::Token, InstructionCategory::ObjectModel, FlowType::Sequential, 0, 1);
    table[0x80] = op("stsfld", OperandType::Token, InstructionCategory::ObjectModel, FlowType::Sequential, 1, 0);
    table[0x81] = op("stobj", OperandType::Token, InstructionCategory::ObjectModel, FlowType::Sequential, 2, 0);
    table[0x82] = op("conv.ovf.i1.un", OperandType::None, InstructionCategory::Conversion, FlowType::Sequential, 1, 1);
    table[0x83] = op("conv.ovf.i2.un", OperandType::None, InstructionCategory::Conversion, FlowType::Sequential, 1, 1);
    table[0x84] = op("conv.ovf.i4.un", OperandType::None, InstructionCategory::Conversion, FlowType::Sequential, 1, 1);
    table[0x85] = op("conv.ovf.i8.un", OperandType::None, InstructionCategory::Conversion, FlowType::Sequential, 1, 1);
    table[0x86] = op("conv.ovf.u1.un", OperandType::None, InstructionCategory::Conversion, FlowType::Sequential, 1, 1);
    table[0x87] = op("conv.ovf.u2.un", OperandType::None, InstructionCategory::Conversion, FlowType::Sequential, 1, 1);
    table[0x88] = op("conv.ovf.u4.un", OperandType::None, InstructionCategory::Conversion, FlowType::Sequential, 1, 1);
    table[0x89] = op("conv.ovf.u8.un", OperandType::None, InstructionCategory::Conversion, FlowType::Sequential, 1, 1);
    table[0x8A] = op("conv.ovf.i.un", OperandType::None, InstructionCategory::Conversion, FlowType::Sequential, 1, 1);
    table[0x8B] = op("conv.ovf.u.un", OperandType::None, InstructionCategory::Conversion, FlowType::Sequential, 1, 1);
    table[0x8C] = op("box", OperandType::Token, InstructionCategory::ObjectModel, FlowType::Sequential, 1, 1);
    table[0x8D] = op("newarr", OperandType::Token, InstructionCategory::ObjectModel, FlowType::Sequential, 1, 1);
    table[0x8E] = op("ldlen", OperandType::None, InstructionCategory::ObjectModel, FlowType::Sequential, 1, 1);
    table[0x8F] = op("ldelema", OperandType::Token, InstructionCategory::ObjectModel, FlowType::Sequential, 2, 1);
    table[0x90] = op("ldelem.i1", OperandType::None, InstructionCategory::ObjectModel, FlowType::Sequential, 2, 1);
    table[0x91] = op("ldelem.u1", OperandType::None, InstructionCategory::ObjectModel, FlowType::Sequential, 2, 1);
    table[0x92] = op("ldelem.i2", OperandType::None, InstructionCategory::ObjectModel, FlowType::Sequential, 2, 1);
    table[0x93] = op("ldelem.u2", OperandType::None, InstructionCategory::ObjectModel, FlowType::Sequential, 2, 1);
    table[0x94] = op("ldelem.i4", OperandType::None, InstructionCategory::ObjectModel, FlowType::Sequential, 2, 1);
    table[0x95] = op("ldelem.u4", OperandType::None, InstructionCategory::ObjectModel, FlowType::Sequential, 2, 1);
    table[0x96] = op("ldelem.i8", OperandType::None, InstructionCategory::ObjectModel, FlowType::Sequential, 2, 1);
    table[0x97] = op("ldelem.i", OperandType::None, InstructionCategory::ObjectModel, FlowType::Sequential, 2, 1);
    table[0x98] = op("ldelem.r4", OperandType::None, InstructionCategory::ObjectModel, FlowType::Sequential, 2, 1);
    table[0x99] = op("ldelem.r8", OperandType::None, InstructionCategory::ObjectModel, FlowType::Sequential, 2, 1);
    table[0x9A] = op("ldelem.ref", OperandType::None, InstructionCategory::ObjectModel, FlowType::Sequential, 2, 1);
    table[0x9B] = op("stelem.i", OperandType::None, InstructionCategory::ObjectModel, FlowType::Sequential, 3, 0);
    table[0x9C] = op("stelem.i1", OperandType::None, InstructionCategory::ObjectModel, FlowType::Sequential, 3, 0);
    table[0x9D] = op("stelem.i2", OperandType::None, InstructionCategory::ObjectModel, FlowType::Sequential, 3, 0);
    table[0x9E] = op("stelem.i4", OperandType::None, InstructionCategory::ObjectModel, FlowType::Sequential, 3, 0);
    table[0x9F] = op("stelem.i8", OperandType::None, InstructionCategory::ObjectModel, FlowType::Sequential, 3, 0);
    table[0xA0] = op("stelem.r4", OperandType::None, InstructionCategory::ObjectModel, FlowType::Sequential, 3, 0);
    table[0xA1] = op("stelem.r8", OperandType::None, InstructionCategory::ObjectModel, FlowType::Sequential, 3, 0);
    table[0xA2] = op("stelem.ref", OperandType::None, InstructionCategory::ObjectModel, FlowType::Sequential, 3, 0);
    table[0xA3] = op("ldelem", OperandType::Token, InstructionCategory::ObjectModel, FlowType::Sequential, 2, 1);
    table[0xA4] = op("stelem", OperandType::Token, InstructionCategory::ObjectModel, FlowType::Sequential, 3, 0);
    table[0xA5] = op("unbox.any", OperandType::Token, InstructionCategory::ObjectModel, FlowType::Sequential, 1, 1);
    table[0xB3] = op("conv.ovf.i1", OperandType::None, InstructionCategory::Conversion, FlowType::Sequential, 1, 1);
    table[0xB4] = op("conv.ovf.u1", OperandType::None, InstructionCategory::Conversion, FlowType::Sequential, 1, 1);
    table[0xB5] = op("conv.ovf.i2", OperandType::None, InstructionCategory::Conversion, FlowType::Sequential, 1, 1);
    table[0xB6] = op("conv.ovf.u2", OperandType::None, InstructionCategory::Conversion, FlowType::Sequential, 1, 1);
    table[0xB7] = op("conv.ovf.i4", OperandType::None, InstructionCategory::Conversion, FlowType::Sequential, 1, 1);
    table[0xB8] = op("conv.ovf.u4", OperandType::None, InstructionCategory::Conversion, FlowType::Sequential, 1, 1);
    table[0xB9] = op("conv.ovf.i8", OperandType::None, InstructionCategory::Conversion, FlowType::Sequential, 1, 1);
    table[0xBA] = op("conv.ovf.u8", OperandType::None, InstructionCategory::Conversion, FlowType::Sequential, 1, 1);
    table[0xC2] = op("refanyval", OperandType::Token, InstructionCategory::ObjectModel, FlowType::Sequential, 1, 1);
    table[0xC3] = op("ckfinite", OperandType::None, InstructionCategory::Arithmetic, FlowType::Sequential, 1, 1);
    table[0xC6] = op("mkrefany", OperandType::Token, InstructionCategory::ObjectModel, FlowType::Sequential, 1, 1);
    table[0xD0] = op("ldtoken", OperandType::Token, InstructionCategory::ObjectModel, FlowType::Sequential, 0, 1);
    table[0xD1] = op("conv.u2", OperandType::None, InstructionCategory::Conversion, FlowType::Sequential, 1, 1);
    table[0xD2] = op("conv.u1", OperandType::None, InstructionCategory::Conversion, FlowType::Sequential, 1, 1);
    table[0xD3] = op("conv.i", OperandType::None, InstructionCategory::Conversion, FlowType::Sequential, 1, 1);
    table[0xD4] = op("conv.ovf.i", OperandType::None, InstructionCategory::Conversion, FlowType::Sequential, 1, 1);
    table[0xD5] = op("conv.ovf.u", OperandType::None, InstructionCategory::Conversion, FlowType::Sequential, 1, 1);
    table[0xD6] = op("add.ovf", OperandType::None, InstructionCategory::Arithmetic, FlowType::Sequential, 2, 1);
    table[0xD7] = op("add.ovf.un", OperandType::None, InstructionCategory::Arithmetic, FlowType::Sequential, 2, 1);
    table[0xD8] = op("mul.ovf", OperandType::None, InstructionCategory::Arithmetic, FlowType::Sequential, 2, 1);
    table[0xD9] = op("mul.ovf.un", OperandType::None, InstructionCategory::Arithmetic, FlowType::Sequential, 2, 1);
    table[0xDA] = op("sub.ovf", OperandType::None, InstructionCategory::Arithmetic, FlowType::Sequential, 2, 1);
    table[0xDB] = op("sub.ovf.un", OperandType::None, InstructionCategory::Arithmetic, FlowType::Sequential, 2, 1);
    table[0xDC] = op("endfinally", OperandType::None, InstructionCategory::ControlFlow, FlowType::EndFinally, 0, 0);
    table[0xDD] = op("leave", OperandType::Target32, InstructionCategory::ControlFlow, FlowType::Leave, 0, 0);
    table[0xDE] = op("leave.s", OperandType::Target8, InstructionCategory::ControlFlow, FlowType::Leave, 0, 0);
    table[0xDF] = op("stind.i", OperandType::None, InstructionCategory::LoadStore, FlowType::Sequential, 2, 0);
    table[0xE0] = op("conv.u", OperandType::None, InstructionCategory::Conversion, FlowType::Sequential, 1, 1);
    table
}

#[rustfmt::skip]
const fn extended_table() -> [CilInstruction; 256] {
    let mut table = [RESERVED; 256];
    table[0x00] = op("arglist", OperandType::None, InstructionCategory::Misc, FlowType::Sequential, 0, 1);
    table[0x01] = op("ceq", OperandType::None, InstructionCategory::Comparison, FlowType::Sequential, 2, 1);
    table[0x02] = op("cgt", OperandType::None, InstructionCategory::Comparison, FlowType::Sequential, 2, 1);
    table[0x03] = op("cgt.un", OperandType::None, InstructionCategory::Comparison, FlowType::Sequential, 2, 1);
    table[0x04] = op("clt", OperandType::None, InstructionCategory::Comparison, FlowType::Sequential, 2, 1);
    table[0x05] = op("clt.un", OperandType::None, InstructionCategory::Comparison, FlowType::Sequential, 2, 1);
    table[0x06] = op("ldftn", OperandType::Token, InstructionCategory::ObjectModel, FlowType::Sequential, 0, 1);
    table[0x07] = op("ldvirtftn", OperandType::Token, InstructionCategory::ObjectModel, FlowType::Sequential, 1, 1);
    table[0x09] = op("ldarg", OperandType::Variable16, InstructionCategory::LoadStore, FlowType::Sequential, 0, 1);
    table[0x0A] = op("ldarga", OperandType::Variable16, InstructionCategory::LoadStore, FlowType::Sequential, 0, 1);
    table[0x0B] = op("starg", OperandType::Variable16, InstructionCategory::LoadStore, FlowType::Sequential, 1, 0);
    table[0x0C] = op("ldloc", OperandType::Variable16, InstructionCategory::LoadStore, FlowType::Sequential, 0, 1);
    table[0x0D] = op("ldloca", OperandType::Variable16, InstructionCategory::LoadStore, FlowType::Sequential, 0, 1);
    table[0x0E] = op("stloc", OperandType::Variable16, InstructionCategory::LoadStore, FlowType::Sequential, 1, 0);
    table[0x0F] = op("localloc", OperandType::None, InstructionCategory::Misc, FlowType::Sequential, 1, 1);
    table[0x11] = op("endfilter", OperandType::None, InstructionCategory::ControlFlow, FlowType::EndFinally, 1, 0);
    table[0x12] = op("unaligned.", OperandType::UInt8, InstructionCategory::Prefix, FlowType::Sequential, 0, 0);
    table[0x13] = op("volatile.", OperandType::None, InstructionCategory::Prefix, FlowType::Sequential, 0, 0);
    table[0x14] = op("tail.", OperandType::None, InstructionCategory::Prefix, FlowType::Sequential, 0, 0);
    table[0x15] = op("initobj", OperandType::Token, InstructionCategory::ObjectModel, FlowType::Sequential, 1, 0);
    table[0x16] = op("constrained.", OperandType::Token, InstructionCategory::Prefix, FlowType::Sequential, 0, 0);
    table[0x17] = op("cpblk", OperandType::None, InstructionCategory::Misc, FlowType::Sequential, 3, 0);
    table[0x18] = op("initblk", OperandType::None, InstructionCategory::Misc, FlowType::Sequential, 3, 0);
    table[0x19] = op("no.", OperandType::UInt8, InstructionCategory::Prefix, FlowType::Sequential, 0, 0);
    table[0x1A] = op("rethrow", OperandType::None, InstructionCategory::ControlFlow, FlowType::Throw, 0, 0);
    table[0x1C] = op("sizeof", OperandType::Token, InstructionCategory::ObjectModel, FlowType::Sequential, 0, 1);
    table[0x1D] = op("refanytype", OperandType::None, InstructionCategory::ObjectModel, FlowType::Sequential, 1, 1);
    table[0x1E] = op("readonly.", OperandType::None, InstructionCategory::Prefix, FlowType::Sequential, 0, 0);
    table
}

/// Opcode bytes of the single byte instruction set
#[allow(missing_docs)]
pub mod opcodes {
    pub const NOP: u8 = 0x00;
    pub const BREAK: u8 = 0x01;
    pub const LDARG_0: u8 = 0x02;
    pub const LDARG_1: u8 = 0x03;
    pub const LDARG_2: u8 = 0x04;
    pub const LDARG_3: u8 = 0x05;
    pub const LDLOC_0: u8 = 0x06;
    pub const LDLOC_1: u8 = 0x07;
    pub const LDLOC_2: u8 = 0x08;
    pub const LDLOC_3: u8 = 0x09;
    pub const STLOC_0: u8 = 0x0A;
    pub const STLOC_1: u8 = 0x0B;
    pub const STLOC_2: u8 = 0x0C;
    pub const STLOC_3: u8 = 0x0D;
    pub const LDARG_S: u8 = 0x0E;
    pub const LDARGA_S: u8 = 0x0F;
    pub const STARG_S: u8 = 0x10;
    pub const LDLOC_S: u8 = 0x11;
    pub const LDLOCA_S: u8 = 0x12;
    pub const STLOC_S: u8 = 0x13;
    pub const LDNULL: u8 = 0x14;
    pub const LDC_I4_M1: u8 = 0x15;
    pub const LDC_I4_0: u8 = 0x16;
    pub const LDC_I4_1: u8 = 0x17;
    pub const LDC_I4_2: u8 = 0x18;
    pub const LDC_I4_3: u8 = 0x19;
    pub const LDC_I4_4: u8 = 0x1A;
    pub const LDC_I4_5: u8 = 0x1B;
    pub const LDC_I4_6: u8 = 0x1C;
    pub const LDC_I4_7: u8 = 0x1D;
    pub const LDC_I4_8: u8 = 0x1E;
    pub const LDC_I4_S: u8 = 0x1F;
    pub const LDC_I4: u8 = 0x20;
    pub const LDC_I8: u8 = 0x21;
    pub const LDC_R4: u8 = 0x22;
    pub const LDC_R8: u8 = 0x23;
    pub const DUP: u8 = 0x25;
    pub const POP: u8 = 0x26;
    pub const JMP: u8 = 0x27;
    pub const CALL: u8 = 0x28;
    pub const CALLI: u8 = 0x29;
    pub const RET: u8 = 0x2A;
    pub const BR_S: u8 = 0x2B;
    pub const BRFALSE_S: u8 = 0x2C;
    pub const BRTRUE_S: u8 = 0x2D;
    pub const BEQ_S: u8 = 0x2E;
    pub const BGE_S: u8 = 0x2F;
    pub const BGT_S: u8 = 0x30;
    pub const BLE_S: u8 = 0x31;
    pub const BLT_S: u8 = 0x32;
    pub const BNE_UN_S: u8 = 0x33;
    pub const BGE_UN_S: u8 = 0x34;
    pub const BGT_UN_S: u8 = 0x35;
    pub const BLE_UN_S: u8 = 0x36;
    pub const BLT_UN_S: u8 = 0x37;
    pub const BR: u8 = 0x38;
    pub const BRFALSE: u8 = 0x39;
    pub const BRTRUE: u8 = 0x3A;
    pub const BEQ: u8 = 0x3B;
    pub const BGE: u8 = 0x3C;
    pub const BGT: u8 = 0x3D;
    pub const BLE: u8 = 0x3E;
    pub const BLT: u8 = 0x3F;
    pub const BNE_UN: u8 = 0x40;
    pub const BGE_UN: u8 = 0x41;
    pub const BGT_UN: u8 = 0x42;
    pub const BLE_UN: u8 = 0x43;
    pub const BLT_UN: u8 = 0x44;
    pub const SWITCH: u8 = 0x45;
    pub const LDIND_I1: u8 = 0x46;
    pub const LDIND_U1: u8 = 0x47;
    pub const LDIND_I2: u8 = 0x48;
    pub const LDIND_U2: u8 = 0x49;
    pub const LDIND_I4: u8 = 0x4A;
    pub const LDIND_U4: u8 = 0x4B;
    pub const LDIND_I8: u8 = 0x4C;
    pub const LDIND_I: u8 = 0x4D;
    pub const LDIND_R4: u8 = 0x4E;
    pub const LDIND_R8: u8 = 0x4F;
    pub const LDIND_REF: u8 = 0x50;
    pub const STIND_REF: u8 = 0x51;
    pub const STIND_I1: u8 = 0x52;
    pub const STIND_I2: u8 = 0x53;
    pub const STIND_I4: u8 = 0x54;
    pub const STIND_I8: u8 = 0x55;
    pub const STIND_R4: u8 = 0x56;
    pub const STIND_R8: u8 = 0x57;
    pub const ADD: u8 = 0x58;
    pub const SUB: u8 = 0x59;
    pub const MUL: u8 = 0x5A;
    pub const DIV: u8 = 0x5B;
    pub const DIV_UN: u8 = 0x5C;
    pub const REM: u8 = 0x5D;
    pub const REM_UN: u8 = 0x5E;
    pub const AND: u8 = 0x5F;
    pub const OR: u8 = 0x60;
    pub const XOR: u8 = 0x61;
    pub const SHL: u8 = 0x62;
    pub const SHR: u8 = 0x63;
    pub const SHR_UN: u8 = 0x64;
    pub const NEG: u8 = 0x65;
    pub const NOT: u8 = 0x66;
    pub const CONV_I1: u8 = 0x67;
    pub const CONV_I2: u8 = 0x68;
    pub const CONV_I4: u8 = 0x69;
    pub const CONV_I8: u8 = 0x6A;
    pub const CONV_R4: u8 = 0x6B;
    pub const CONV_R8: u8 = 0x6C;
    pub const CONV_U4: u8 = 0x6D;
    pub const CONV_U8: u8 = 0x6E;
    pub const CALLVIRT: u8 = 0x6F;
    pub const CPOBJ: u8 = 0x70;
    pub const LDOBJ: u8 = 0x71;
    pub const LDSTR: u8 = 0x72;
    pub const NEWOBJ: u8 = 0x73;
    pub const CASTCLASS: u8 = 0x74;
    pub const ISINST: u8 = 0x75;
    pub const CONV_R_UN: u8 = 0x76;
    pub const UNBOX: u8 = 0x79;
    pub const THROW: u8 = 0x7A;
    pub const LDFLD: u8 = 0x7B;
    pub const LDFLDA: u8 = 0x7C;
    pub const STFLD: u8 = 0x7D;
    pub const LDSFLD: u8 = 0x7E;
    pub const LDSFLDA: u8 = 0x7F;
    pub const STSFLD: u8 = 0x80;
    pub const STOBJ: u8 = 0x81;
    pub const CONV_OVF_I1_UN: u8 = 0x82;
    pub const CONV_OVF_I2_UN: u8 = 0x83;
    pub const CONV_OVF_I4_UN: u8 = 0x84;
    pub const CONV_OVF_I8_UN: u8 = 0x85;
    pub const CONV_OVF_U1_UN: u8 = 0x86;
    pub const CONV_OVF_U2_UN: u8 = 0x87;
    pub const CONV_OVF_U4_UN: u8 = 0x88;
    pub const CONV_OVF_U8_UN: u8 = 0x89;
    pub const CONV_OVF_I_UN: u8 = 0x8A;
    pub const CONV_OVF_U_UN: u8 = 0x8B;
    pub const BOX: u8 = 0x8C;
    pub const NEWARR: u8 = 0x8D;
    pub const LDLEN: u8 = 0x8E;
    pub const LDELEMA: u8 = 0x8F;
    pub const LDELEM_I1: u8 = 0x90;
    pub const LDELEM_U1: u8 = 0x91;
    pub const LDELEM_I2: u8 = 0x92;
    pub const LDELEM_U2: u8 = 0x93;
    pub const LDELEM_I4: u8 = 0x94;
    pub const LDELEM_U4: u8 = 0x95;
    pub const LDELEM_I8: u8 = 0x96;
    pub const LDELEM_I: u8 = 0x97;
    pub const LDELEM_R4: u8 = 0x98;
    pub const LDELEM_R8: u8 = 0x99;
    pub const LDELEM_REF: u8 = 0x9A;
    pub const STELEM_I: u8 = 0x9B;
    pub const STELEM_I1: u8 = 0x9C;
    pub const STELEM_I2: u8 = 0x9D;
    pub const STELEM_I4: u8 = 0x9E;
    pub const STELEM_I8: u8 = 0x9F;
    pub const STELEM_R4: u8 = 0xA0;
    pub const STELEM_R8: u8 = 0xA1;
    pub const STELEM_REF: u8 = 0xA2;
    pub const LDELEM: u8 = 0xA3;
    pub const STELEM: u8 = 0xA4;
    pub const UNBOX_ANY: u8 = 0xA5;
    pub const CONV_OVF_I1: u8 = 0xB3;
    pub const CONV_OVF_U1: u8 = 0xB4;
    pub const CONV_OVF_I2: u8 = 0xB5;
    pub const CONV_OVF_U2: u8 = 0xB6;
    pub const CONV_OVF_I4: u8 = 0xB7;
    pub const CONV_OVF_U4: u8 = 0xB8;
    pub const CONV_OVF_I8: u8 = 0xB9;
    pub const CONV_OVF_U8: u8 = 0xBA;
    pub const REFANYVAL: u8 = 0xC2;
    pub const CKFINITE: u8 = 0xC3;
    pub const MKREFANY: u8 = 0xC6;
    pub const LDTOKEN: u8 = 0xD0;
    pub const CONV_U2: u8 = 0xD1;
    pub const CONV_U1: u8 = 0xD2;
    pub const CONV_I: u8 = 0xD3;
    pub const CONV_OVF_I: u8 = 0xD4;
    pub const CONV_OVF_U: u8 = 0xD5;
    pub const ADD_OVF: u8 = 0xD6;
    pub const ADD_OVF_UN: u8 = 0xD7;
    pub const MUL_OVF: u8 = 0xD8;
    pub const MUL_OVF_UN: u8 = 0xD9;
    pub const SUB_OVF: u8 = 0xDA;
    pub const SUB_OVF_UN: u8 = 0xDB;
    pub const ENDFINALLY: u8 = 0xDC;
    pub const LEAVE: u8 = 0xDD;
    pub const LEAVE_S: u8 = 0xDE;
    pub const STIND_I: u8 = 0xDF;
    pub const CONV_U: u8 = 0xE0;
    /// Prefix selecting the extended table
    pub const FE_PREFIX: u8 = 0xFE;
    pub const FE_ARGLIST: u8 = 0x00;
    pub const FE_CEQ: u8 = 0x01;
    pub const FE_CGT: u8 = 0x02;
    pub const FE_CGT_UN: u8 = 0x03;
    pub const FE_CLT: u8 = 0x04;
    pub const FE_CLT_UN: u8 = 0x05;
    pub const FE_LDFTN: u8 = 0x06;
    pub const FE_LDVIRTFTN: u8 = 0x07;
    pub const FE_LDARG: u8 = 0x09;
    pub const FE_LDARGA: u8 = 0x0A;
    pub const FE_STARG: u8 = 0x0B;
    pub const FE_LDLOC: u8 = 0x0C;
    pub const FE_LDLOCA: u8 = 0x0D;
    pub const FE_STLOC: u8 = 0x0E;
    pub const FE_LOCALLOC: u8 = 0x0F;
    pub const FE_ENDFILTER: u8 = 0x11;
    pub const FE_UNALIGNED: u8 = 0x12;
    pub const FE_VOLATILE: u8 = 0x13;
    pub const FE_TAIL: u8 = 0x14;
    pub const FE_INITOBJ: u8 = 0x15;
    pub const FE_CONSTRAINED: u8 = 0x16;
    pub const FE_CPBLK: u8 = 0x17;
    pub const FE_INITBLK: u8 = 0x18;
    pub const FE_NO: u8 = 0x19;
    pub const FE_RETHROW: u8 = 0x1A;
    pub const FE_SIZEOF: u8 = 0x1C;
    pub const FE_REFANYTYPE: u8 = 0x1D;
    pub const FE_READONLY: u8 = 0x1E;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defined_counts() {
        assert_eq!(INSTRUCTIONS.iter().filter(|i| i.is_defined()).count(), 191);
        assert_eq!(INSTRUCTIONS_FE.iter().filter(|i| i.is_defined()).count(), 28);
    }

    #[test]
    fn lookups() {
        assert_eq!(INSTRUCTIONS[usize::from(opcodes::RET)].instr, "ret");
        assert_eq!(INSTRUCTIONS[usize::from(opcodes::RET)].flow, FlowType::Return);
        assert_eq!(INSTRUCTIONS[usize::from(opcodes::LDC_I4_S)].op_type, OperandType::Int8);
        assert_eq!(INSTRUCTIONS[usize::from(opcodes::BLT_UN)].op_type, OperandType::Target32);
        assert_eq!(INSTRUCTIONS_FE[usize::from(opcodes::FE_CLT_UN)].instr, "clt.un");
        assert_eq!(INSTRUCTIONS_FE[usize::from(opcodes::FE_STLOC)].op_type, OperandType::Variable16);
        assert!(!INSTRUCTIONS[0x24].is_defined());
        assert!(!INSTRUCTIONS[0xFF].is_defined());
        assert!(!INSTRUCTIONS_FE[0x08].is_defined());
        assert!(!INSTRUCTIONS_FE[0x1F].is_defined());
    }
}
