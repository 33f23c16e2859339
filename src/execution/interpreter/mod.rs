//! Execution Engine: the bytecode interpreter.
//!
//! The [`Engine`] executes methods of a loaded [`TypeSystem`]. Bytecode is decoded one
//! instruction at a time straight from the image and dispatched on its opcode. Calls recurse into
//! the engine, so every managed call is one native call as well; the configured call depth limit
//! keeps runaway recursion from exhausting the native stack.
//!
//! # Calling convention
//!
//! The caller pushes the arguments, receiver first, and calls [`Engine::execute`]. The engine pops
//! them into the callee's frame, runs the method and leaves the return value (if any) on the
//! stack. [`Engine::invoke`] wraps these steps for callers outside of bytecode.
//!
//! # Example
//!
//! ```rust,no_run
//! use minclr::binder::{Binder, WellKnownTypes};
//! use minclr::execution::{EcallRegistry, Engine, EngineConfig, Value};
//! use minclr::typesystem::TypeSystem;
//! use minclr::File;
//! use std::path::Path;
//!
//! let mut types = TypeSystem::new(EcallRegistry::with_builtins());
//! let corlib = types.load(File::from_file(Path::new("corlib.dll"))?)?;
//! types.load(File::from_file(Path::new("Program.dll"))?)?;
//!
//! let well_known = WellKnownTypes::bind(&types, corlib)?;
//! let main = Binder::new(&types).bind_method("Demo", "Program", "Add").unwrap();
//!
//! let mut engine = Engine::new(&types, EngineConfig::default()).with_well_known(&well_known);
//! let result = engine.invoke(main, &[Value::I32(2), Value::I32(3)])?;
//! assert_eq!(result, Some(Value::I32(5)));
//! # Ok::<(), minclr::Error>(())
//! ```

mod handlers;

#[cfg(test)]
mod tests;

use std::{collections::HashMap, io::Write};

use log::trace;

use crate::{
    binder::WellKnownTypes,
    disassembler::{decode_instruction, Instruction},
    execution::{
        frame::Frame, BinaryOp, Condition, Conversion, EcallContext, EngineConfig,
        EvaluationStack, ExecutionError, NativeFunction, ObjectHeap, ObjectRef, UnaryOp, Value,
    },
    metadata::token::Token,
    typesystem::{MethodDesc, MethodId, MethodImplementation, ModuleId, TypeSystem},
    Error, Parser, Result,
};

/// What the dispatcher does after an instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StepResult {
    /// Continue with the next instruction
    Continue,
    /// Continue at an absolute offset inside the method's code
    Branch(u32),
    /// Leave the method
    Return,
}

/// Executes the methods of one [`TypeSystem`].
pub struct Engine<'a> {
    types: &'a TypeSystem,
    config: EngineConfig,
    well_known: Option<WellKnownTypes>,
    stack: EvaluationStack,
    frames: Vec<Frame<'a>>,
    heap: ObjectHeap,
    output: Box<dyn Write + 'a>,
    /// Interned `ldstr` results
    strings: HashMap<(ModuleId, Token), ObjectRef>,
    executed: u64,
}

impl<'a> Engine<'a> {
    /// Create an engine over `types`, writing console output to stdout
    #[must_use]
    pub fn new(types: &'a TypeSystem, config: EngineConfig) -> Self {
        Engine {
            types,
            stack: EvaluationStack::with_capacity(config.stack_capacity),
            heap: ObjectHeap::with_capacity(config.heap_capacity),
            config,
            well_known: None,
            frames: Vec::new(),
            output: Box::new(std::io::stdout()),
            strings: HashMap::new(),
            executed: 0,
        }
    }

    /// Use the built-in types bound in the core library. Required by `ldstr`.
    #[must_use]
    pub fn with_well_known(mut self, well_known: &WellKnownTypes) -> Self {
        self.well_known = Some(well_known.clone());
        self
    }

    /// Redirect the output of the console natives
    #[must_use]
    pub fn with_output(mut self, output: impl Write + 'a) -> Self {
        self.output = Box::new(output);
        self
    }

    /// The type system this engine executes
    #[must_use]
    pub fn types(&self) -> &'a TypeSystem {
        self.types
    }

    /// The limits this engine enforces
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The object heap
    #[must_use]
    pub fn heap(&self) -> &ObjectHeap {
        &self.heap
    }

    /// The evaluation stack
    #[must_use]
    pub fn stack(&self) -> &EvaluationStack {
        &self.stack
    }

    /// Push an argument for a following [`Engine::execute`]
    ///
    /// # Errors
    /// Returns [`ExecutionError::StackOverflow`] if the stack is full.
    pub fn push(&mut self, value: Value) -> Result<()> {
        self.stack.push(value)
    }

    /// Pop a value, e.g. the result of a preceding [`Engine::execute`]
    ///
    /// # Errors
    /// Returns [`ExecutionError::StackUnderflow`] if the stack is empty.
    pub fn pop(&mut self) -> Result<Value> {
        self.stack.pop()
    }

    /// Number of active bytecode calls
    #[must_use]
    pub fn call_depth(&self) -> usize {
        self.frames.len()
    }

    /// Number of instructions executed since the engine was created
    #[must_use]
    pub fn instructions_executed(&self) -> u64 {
        self.executed
    }

    /// Decode the string object `object`
    ///
    /// # Errors
    /// Returns [`ExecutionError::NullReference`] for `null` and
    /// [`ExecutionError::InvalidReference`] for references outside the heap.
    pub fn read_string(&self, object: ObjectRef) -> Result<String> {
        Ok(self.heap.read_string(object)?.to_string_lossy())
    }

    /// Execute `method` with the arguments already on the stack
    ///
    /// The declared arguments, receiver first, are popped; the return value is pushed unless the
    /// method returns `void`. If the outermost call fails, the evaluation stack and the frame
    /// stack are emptied.
    ///
    /// # Errors
    /// Returns [`crate::Error::Execution`] for any runtime failure,
    /// [`crate::Error::ECallNotFound`] for native methods without a registered implementation and
    /// [`crate::Error::NotSupported`] for methods without a body.
    pub fn execute(&mut self, method: MethodId) -> Result<()> {
        let outermost = self.frames.is_empty();

        let result = self.call_method(method);
        if result.is_err() && outermost {
            self.stack.clear();
            self.frames.clear();
        }

        result
    }

    /// Push `args`, execute `method` and pop its return value
    ///
    /// ## Arguments
    /// * 'method'  - The method to run
    /// * 'args'    - Arguments in declaration order, receiver first
    ///
    /// # Errors
    /// See [`Engine::execute`].
    pub fn invoke(&mut self, method: MethodId, args: &[Value]) -> Result<Option<Value>> {
        let base = self.stack.depth();

        for arg in args {
            if let Err(error) = self.stack.push(arg.clone()) {
                self.stack.clear();
                return Err(error);
            }
        }

        self.execute(method)?;

        if self.stack.depth() > base {
            Ok(Some(self.stack.pop()?))
        } else {
            Ok(None)
        }
    }

    fn call_method(&mut self, id: MethodId) -> Result<()> {
        let types = self.types;
        let Some(method) = types.method(id) else {
            return Err(malformed_error!("Call to unknown {}", id));
        };

        trace!("call {}", types.method_name(id));

        match &method.implementation {
            MethodImplementation::Bytecode(_) => self.call_bytecode(id, method),
            MethodImplementation::Native { function, .. } => self.call_native(function),
            MethodImplementation::UnboundNative => {
                let (namespace, type_name) = types
                    .class(method.class)
                    .map(|class| (class.namespace.clone(), class.name.clone()))
                    .unwrap_or_default();

                Err(Error::ECallNotFound {
                    namespace,
                    type_name,
                    method: method.name.clone(),
                })
            }
            MethodImplementation::Abstract => Err(Error::NotSupported(format!(
                "{} has no body",
                types.method_name(id)
            ))),
        }
    }

    fn call_native(&mut self, function: &NativeFunction) -> Result<()> {
        let args = self.stack.pop_n(function.arity())?;

        let mut context = EcallContext {
            heap: &self.heap,
            output: self.output.as_mut(),
        };

        if let Some(value) = function.invoke(&mut context, &args)? {
            self.stack.push(value)?;
        }

        Ok(())
    }

    fn call_bytecode(&mut self, id: MethodId, method: &'a MethodDesc) -> Result<()> {
        let depth = self.frames.len() + 1;
        if depth > self.config.max_call_depth {
            return Err(ExecutionError::CallDepthExceeded {
                depth,
                limit: self.config.max_call_depth,
            }
            .into());
        }

        let types = self.types;
        let layout = types.method_frame(id)?;
        let code = types.method_code(id)?;

        let mut frame = Frame::new(id, method.module, layout);
        let args = self.stack.pop_n(frame.arg_count())?;
        for (index, value) in (0_u16..).zip(args.iter()) {
            frame.set_arg(index, value)?;
        }

        self.stack.push_frame();
        self.frames.push(frame);
        let result = self.run(code);
        self.frames.pop();
        result?;

        let value = match layout.return_type {
            Some(_) => Some(self.stack.pop()?),
            None => None,
        };

        self.stack.pop_frame()?;
        if let Some(value) = value {
            self.stack.push(value)?;
        }

        Ok(())
    }

    /// Fetch, decode and dispatch until `ret`
    fn run(&mut self, code: &'a [u8]) -> Result<()> {
        let mut parser = Parser::new(code);

        loop {
            if !parser.has_more_data() {
                // fell off the end of the body
                return Err(ExecutionError::InvalidBranchTarget(parser.pos() as u32).into());
            }

            let instruction = decode_instruction(&mut parser)?;
            self.executed += 1;
            if self.config.trace_instructions {
                trace!("[{}] {}", self.frames.len(), instruction);
            }

            match self.step(&instruction)? {
                StepResult::Continue => {}
                StepResult::Branch(target) => {
                    if parser.seek(target as usize).is_err() {
                        return Err(ExecutionError::InvalidBranchTarget(target).into());
                    }
                }
                StepResult::Return => return Ok(()),
            }
        }
    }

    /// Execute one decoded instruction in the innermost frame
    pub(crate) fn step(&mut self, instruction: &Instruction) -> Result<StepResult> {
        if instruction.prefix == 0xFE {
            self.execute_fe_prefixed(instruction)
        } else {
            self.execute_standard(instruction)
        }
    }

    fn execute_standard(&mut self, instruction: &Instruction) -> Result<StepResult> {
        match instruction.opcode {
            // ================================================================
            // Stack Operations (0x00, 0x01, 0x25, 0x26)
            // ================================================================
            0x00 | 0x01 => Ok(StepResult::Continue), // nop, break
            0x25 => {
                // dup
                self.stack.dup()?;
                Ok(StepResult::Continue)
            }
            0x26 => {
                // pop
                self.stack.pop()?;
                Ok(StepResult::Continue)
            }

            // ================================================================
            // Arguments (0x02 - 0x05, 0x0E, 0x10)
            // ================================================================
            0x02 => self.load_argument(0), // ldarg.0
            0x03 => self.load_argument(1), // ldarg.1
            0x04 => self.load_argument(2), // ldarg.2
            0x05 => self.load_argument(3), // ldarg.3
            0x0E => self.load_argument(Self::variable_operand(instruction)?), // ldarg.s
            0x10 => self.store_argument(Self::variable_operand(instruction)?), // starg.s

            // ================================================================
            // Locals (0x06 - 0x0D, 0x11, 0x13)
            // ================================================================
            0x06 => self.load_local(0), // ldloc.0
            0x07 => self.load_local(1), // ldloc.1
            0x08 => self.load_local(2), // ldloc.2
            0x09 => self.load_local(3), // ldloc.3
            0x0A => self.store_local(0), // stloc.0
            0x0B => self.store_local(1), // stloc.1
            0x0C => self.store_local(2), // stloc.2
            0x0D => self.store_local(3), // stloc.3
            0x11 => self.load_local(Self::variable_operand(instruction)?), // ldloc.s
            0x13 => self.store_local(Self::variable_operand(instruction)?), // stloc.s

            // ================================================================
            // Constants (0x14 - 0x23)
            // ================================================================
            0x14 => self.push_constant(Value::NULL), // ldnull
            // ldc.i4.m1 .. ldc.i4.8
            0x15..=0x1E => self.push_constant(Value::I32(i32::from(instruction.opcode) - 0x16)),
            0x1F..=0x23 => self.load_constant(instruction), // ldc.i4.s, ldc.i4, ldc.i8, ldc.r4, ldc.r8

            // ================================================================
            // Calls (0x28, 0x2A, 0x73)
            // ================================================================
            0x28 => self.call(Self::token_operand(instruction)?), // call
            0x2A => Ok(StepResult::Return),                       // ret
            0x73 => self.new_object(Self::token_operand(instruction)?), // newobj

            // ================================================================
            // Branches (0x2B - 0x45)
            // ================================================================
            0x2B | 0x38 => Ok(StepResult::Branch(Self::target_operand(instruction)?)), // br.s, br
            0x2C | 0x39 => self.branch_if(instruction, false), // brfalse.s, brfalse
            0x2D | 0x3A => self.branch_if(instruction, true),  // brtrue.s, brtrue
            0x2E | 0x3B => self.branch_compare(instruction, Condition::Eq), // beq
            0x2F | 0x3C => self.branch_compare(instruction, Condition::Ge), // bge
            0x30 | 0x3D => self.branch_compare(instruction, Condition::Gt), // bgt
            0x31 | 0x3E => self.branch_compare(instruction, Condition::Le), // ble
            0x32 | 0x3F => self.branch_compare(instruction, Condition::Lt), // blt
            0x33 | 0x40 => self.branch_compare(instruction, Condition::NeUn), // bne.un
            0x34 | 0x41 => self.branch_compare(instruction, Condition::GeUn), // bge.un
            0x35 | 0x42 => self.branch_compare(instruction, Condition::GtUn), // bgt.un
            0x36 | 0x43 => self.branch_compare(instruction, Condition::LeUn), // ble.un
            0x37 | 0x44 => self.branch_compare(instruction, Condition::LtUn), // blt.un
            0x45 => self.switch(instruction), // switch

            // ================================================================
            // Arithmetic and Bitwise (0x58 - 0x66)
            // ================================================================
            0x58 => self.binary_op(BinaryOp::Add),   // add
            0x59 => self.binary_op(BinaryOp::Sub),   // sub
            0x5A => self.binary_op(BinaryOp::Mul),   // mul
            0x5B => self.binary_op(BinaryOp::Div),   // div
            0x5C => self.binary_op(BinaryOp::DivUn), // div.un
            0x5D => self.binary_op(BinaryOp::Rem),   // rem
            0x5E => self.binary_op(BinaryOp::RemUn), // rem.un
            0x5F => self.binary_op(BinaryOp::And),   // and
            0x60 => self.binary_op(BinaryOp::Or),    // or
            0x61 => self.binary_op(BinaryOp::Xor),   // xor
            0x62 => self.binary_op(BinaryOp::Shl),   // shl
            0x63 => self.binary_op(BinaryOp::Shr),   // shr
            0x64 => self.binary_op(BinaryOp::ShrUn), // shr.un
            0x65 => self.unary_op(UnaryOp::Neg),     // neg
            0x66 => self.unary_op(UnaryOp::Not),     // not

            // ================================================================
            // Conversions (0x67 - 0x6E, 0x76, 0xD1 - 0xD3, 0xE0)
            // ================================================================
            0x67 => self.convert(Conversion::I1),  // conv.i1
            0x68 => self.convert(Conversion::I2),  // conv.i2
            0x69 => self.convert(Conversion::I4),  // conv.i4
            0x6A => self.convert(Conversion::I8),  // conv.i8
            0x6B => self.convert(Conversion::R4),  // conv.r4
            0x6C => self.convert(Conversion::R8),  // conv.r8
            0x6D => self.convert(Conversion::U4),  // conv.u4
            0x6E => self.convert(Conversion::U8),  // conv.u8
            0x76 => self.convert(Conversion::RUn), // conv.r.un
            0xD1 => self.convert(Conversion::U2),  // conv.u2
            0xD2 => self.convert(Conversion::U1),  // conv.u1
            0xD3 => self.convert(Conversion::I),   // conv.i
            0xE0 => self.convert(Conversion::U),   // conv.u

            // ================================================================
            // Objects and Fields (0x72, 0x7B - 0x80)
            // ================================================================
            0x72 => self.load_string(Self::token_operand(instruction)?), // ldstr
            0x7B => self.load_field(Self::token_operand(instruction)?),  // ldfld
            0x7D => self.store_field(Self::token_operand(instruction)?), // stfld
            0x7E => self.load_static_field(Self::token_operand(instruction)?), // ldsfld
            0x80 => self.store_static_field(Self::token_operand(instruction)?), // stsfld

            _ => Err(Self::unimplemented(instruction)),
        }
    }

    fn execute_fe_prefixed(&mut self, instruction: &Instruction) -> Result<StepResult> {
        match instruction.opcode {
            // ================================================================
            // Comparisons (0xFE 0x01 - 0xFE 0x05)
            // ================================================================
            0x01 => self.compare(Condition::Eq),   // ceq
            0x02 => self.compare(Condition::Gt),   // cgt
            0x03 => self.compare(Condition::GtUn), // cgt.un
            0x04 => self.compare(Condition::Lt),   // clt
            0x05 => self.compare(Condition::LtUn), // clt.un

            // ================================================================
            // Long form variables (0xFE 0x09 - 0xFE 0x0E)
            // ================================================================
            0x09 => self.load_argument(Self::variable_operand(instruction)?), // ldarg
            0x0B => self.store_argument(Self::variable_operand(instruction)?), // starg
            0x0C => self.load_local(Self::variable_operand(instruction)?), // ldloc
            0x0E => self.store_local(Self::variable_operand(instruction)?), // stloc

            _ => Err(Self::unimplemented(instruction)),
        }
    }
}
