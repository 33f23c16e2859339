//! Instruction handlers of the interpreter.
//!
//! Every handler works on the innermost frame and the evaluation stack and reports how the
//! dispatcher continues. They are organized by category:
//!
//! - **Operands**: `variable_operand`, `token_operand`, `target_operand`, `unimplemented`
//! - **Variables**: `load_argument`, `store_argument`, `load_local`, `store_local`
//! - **Constants**: `push_constant`, `load_constant`
//! - **Arithmetic**: `binary_op`, `unary_op`, `compare`, `convert`
//! - **Branches**: `branch_if`, `branch_compare`, `switch`
//! - **Calls**: `call`, `new_object`
//! - **Fields**: `load_field`, `store_field`, `load_static_field`, `store_static_field`
//! - **Strings**: `load_string`

use crate::{
    binder::WellKnownType,
    disassembler::{Immediate, Instruction, Operand},
    execution::{
        frame::Frame, interpreter::Engine, interpreter::StepResult, BinaryOp, Condition,
        Conversion, ExecutionError, UnaryOp, Value,
    },
    metadata::token::Token,
    typesystem::{FieldDesc, FieldId},
    Error, Result,
};

impl<'a> Engine<'a> {
    /// Creates an error for an operand of the wrong shape.
    pub(super) fn invalid_operand(instruction: &Instruction, expected: &'static str) -> Error {
        ExecutionError::InvalidOperand {
            mnemonic: instruction.mnemonic,
            expected,
        }
        .into()
    }

    /// Creates the error for a decoded instruction the dispatcher does not handle.
    pub(super) fn unimplemented(instruction: &Instruction) -> Error {
        ExecutionError::UnimplementedOpcode {
            mnemonic: instruction.mnemonic,
            offset: instruction.offset,
        }
        .into()
    }

    pub(super) fn variable_operand(instruction: &Instruction) -> Result<u16> {
        match instruction.operand {
            Operand::Variable(index) => Ok(index),
            _ => Err(Self::invalid_operand(instruction, "variable index")),
        }
    }

    pub(super) fn token_operand(instruction: &Instruction) -> Result<Token> {
        match instruction.operand {
            Operand::Token(token) => Ok(token),
            _ => Err(Self::invalid_operand(instruction, "token")),
        }
    }

    pub(super) fn target_operand(instruction: &Instruction) -> Result<u32> {
        match instruction.operand {
            Operand::Target(target) => Ok(target),
            _ => Err(Self::invalid_operand(instruction, "branch target")),
        }
    }

    fn frame(&self) -> Result<&Frame<'a>> {
        self.frames
            .last()
            .ok_or_else(|| ExecutionError::StackUnderflow.into())
    }

    fn frame_mut(&mut self) -> Result<&mut Frame<'a>> {
        self.frames
            .last_mut()
            .ok_or_else(|| ExecutionError::StackUnderflow.into())
    }

    /// Loads an argument onto the evaluation stack.
    ///
    /// # Arguments
    ///
    /// * `index` - The argument index, receiver first.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutionError::InvalidVariable`] if the method has fewer arguments.
    pub(super) fn load_argument(&mut self, index: u16) -> Result<StepResult> {
        let value = self.frame()?.arg(index)?;
        self.stack.push(value)?;
        Ok(StepResult::Continue)
    }

    /// Stores the top of the stack into an argument.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutionError::InvalidVariable`] if the method has fewer arguments, and
    /// [`ExecutionError::TypeMismatch`] if the value does not fit the argument's type.
    pub(super) fn store_argument(&mut self, index: u16) -> Result<StepResult> {
        let value = self.stack.pop()?;
        self.frame_mut()?.set_arg(index, &value)?;
        Ok(StepResult::Continue)
    }

    /// Loads a local variable onto the evaluation stack.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutionError::InvalidVariable`] if the method has fewer locals.
    pub(super) fn load_local(&mut self, index: u16) -> Result<StepResult> {
        let value = self.frame()?.local(index)?;
        self.stack.push(value)?;
        Ok(StepResult::Continue)
    }

    /// Stores the top of the stack into a local variable.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutionError::InvalidVariable`] if the method has fewer locals, and
    /// [`ExecutionError::TypeMismatch`] if the value does not fit the local's type.
    pub(super) fn store_local(&mut self, index: u16) -> Result<StepResult> {
        let value = self.stack.pop()?;
        self.frame_mut()?.set_local(index, &value)?;
        Ok(StepResult::Continue)
    }

    pub(super) fn push_constant(&mut self, value: Value) -> Result<StepResult> {
        self.stack.push(value)?;
        Ok(StepResult::Continue)
    }

    /// Pushes the immediate operand of `ldc.i4.s`, `ldc.i4`, `ldc.i8`, `ldc.r4` or `ldc.r8`.
    pub(super) fn load_constant(&mut self, instruction: &Instruction) -> Result<StepResult> {
        let Operand::Immediate(immediate) = instruction.operand else {
            return Err(Self::invalid_operand(instruction, "immediate"));
        };

        let value = match immediate {
            Immediate::Int8(value) => Value::I32(i32::from(value)),
            Immediate::UInt8(value) => Value::I32(i32::from(value)),
            Immediate::Int32(value) => Value::I32(value),
            Immediate::Int64(value) => Value::I64(value),
            Immediate::Float32(value) => Value::F32(value),
            Immediate::Float64(value) => Value::F64(value),
        };

        self.push_constant(value)
    }

    /// Pops two operands, applies `op` and pushes the result.
    ///
    /// # Errors
    ///
    /// See [`Value::binary_op`].
    pub(super) fn binary_op(&mut self, op: BinaryOp) -> Result<StepResult> {
        let right = self.stack.pop()?;
        let left = self.stack.pop()?;
        self.stack.push(left.binary_op(&right, op)?)?;
        Ok(StepResult::Continue)
    }

    pub(super) fn unary_op(&mut self, op: UnaryOp) -> Result<StepResult> {
        let value = self.stack.pop()?;
        self.stack.push(value.unary_op(op)?)?;
        Ok(StepResult::Continue)
    }

    /// Pops two operands and pushes `1` if `condition` holds, `0` otherwise.
    pub(super) fn compare(&mut self, condition: Condition) -> Result<StepResult> {
        let right = self.stack.pop()?;
        let left = self.stack.pop()?;
        self.stack
            .push(Value::from(left.compare(&right, condition)?))?;
        Ok(StepResult::Continue)
    }

    pub(super) fn convert(&mut self, conversion: Conversion) -> Result<StepResult> {
        let value = self.stack.pop()?;
        self.stack.push(value.convert(conversion)?)?;
        Ok(StepResult::Continue)
    }

    /// `brtrue` / `brfalse`: branches if the popped value's truth equals `expected`.
    pub(super) fn branch_if(
        &mut self,
        instruction: &Instruction,
        expected: bool,
    ) -> Result<StepResult> {
        let target = Self::target_operand(instruction)?;
        let value = self.stack.pop()?;

        if value.is_true()? == expected {
            Ok(StepResult::Branch(target))
        } else {
            Ok(StepResult::Continue)
        }
    }

    /// Conditional branches comparing two popped operands.
    pub(super) fn branch_compare(
        &mut self,
        instruction: &Instruction,
        condition: Condition,
    ) -> Result<StepResult> {
        let target = Self::target_operand(instruction)?;
        let right = self.stack.pop()?;
        let left = self.stack.pop()?;

        if left.compare(&right, condition)? {
            Ok(StepResult::Branch(target))
        } else {
            Ok(StepResult::Continue)
        }
    }

    /// Jump table; indices outside the table fall through.
    pub(super) fn switch(&mut self, instruction: &Instruction) -> Result<StepResult> {
        let Operand::Switch(targets) = &instruction.operand else {
            return Err(Self::invalid_operand(instruction, "switch table"));
        };

        // the index is unsigned, negative values fall through
        #[allow(clippy::cast_sign_loss)]
        let index = self.stack.pop()?.as_i32()? as u32 as usize;

        match targets.get(index) {
            Some(target) => Ok(StepResult::Branch(*target)),
            None => Ok(StepResult::Continue),
        }
    }

    /// Calls the method named by `token` with the arguments on the stack.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutionError::BadToken`] if `token` is not a `MethodDef` or `MemberRef`, and
    /// whatever the callee fails with.
    pub(super) fn call(&mut self, token: Token) -> Result<StepResult> {
        let module = self.frame()?.module;
        let method = self.types.resolve_method_token(module, token)?;
        self.call_method(method)?;
        Ok(StepResult::Continue)
    }

    /// Allocates an instance of the constructor's class, runs the constructor and pushes the
    /// new reference.
    ///
    /// The explicit constructor arguments are already on the stack; the reference is inserted
    /// underneath them as the receiver.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::NotSupported`] for value type constructors, and
    /// [`ExecutionError::OutOfMemory`] when the heap is exhausted.
    pub(super) fn new_object(&mut self, token: Token) -> Result<StepResult> {
        let types = self.types;
        let module = self.frame()?.module;
        let ctor = types.resolve_method_token(module, token)?;

        let Some(method) = types.method(ctor) else {
            return Err(ExecutionError::BadToken(token).into());
        };
        if method.is_static() {
            return Err(malformed_error!(
                "newobj of the static method {}",
                types.method_name(ctor)
            ));
        }

        let Some(class) = types.class(method.class) else {
            return Err(ExecutionError::BadToken(token).into());
        };
        if class.is_value_type {
            return Err(Error::NotSupported(format!(
                "newobj of the value type {}",
                class.full_name()
            )));
        }

        let explicit = types.method_frame(ctor)?.args.len().saturating_sub(1);
        let args = self.stack.pop_n(explicit)?;

        let object = self.heap.allocate(class, method.class)?;
        self.stack.push(Value::ObjectRef(object))?;
        for arg in args {
            self.stack.push(arg)?;
        }

        self.call_method(ctor)?;
        self.stack.push(Value::ObjectRef(object))?;
        Ok(StepResult::Continue)
    }

    fn resolve_field(&self, token: Token) -> Result<(FieldId, &'a FieldDesc)> {
        let types = self.types;
        let module = self.frame()?.module;
        let id = types.resolve_field_token(module, token)?;

        match types.field(id) {
            Some(field) => Ok((id, field)),
            None => Err(ExecutionError::BadToken(token).into()),
        }
    }

    /// Pops an object reference (or a value type instance) and pushes one of its fields.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutionError::NullReference`] for a `null` receiver.
    pub(super) fn load_field(&mut self, token: Token) -> Result<StepResult> {
        let (id, field) = self.resolve_field(token)?;
        let owner = self.stack.pop()?;

        if field.is_static() {
            return self.push_static(id, field);
        }

        let value = match &owner {
            Value::ObjectRef(object) => {
                let bytes = self.heap.read(*object, field.var.offset, field.var.size)?;
                Value::load(&field.var.ty, bytes)?
            }
            Value::ValueType { bytes, .. } => {
                let bytes = bytes
                    .get(field.var.range())
                    .ok_or(crate::Error::OutOfBounds)?;
                Value::load(&field.var.ty, bytes)?
            }
            other => return Err(crate::execution::value::mismatch("object", other)),
        };

        self.stack.push(value)?;
        Ok(StepResult::Continue)
    }

    /// Pops a value and an object reference and stores the value into the object's field.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutionError::NullReference`] for a `null` receiver and
    /// [`ExecutionError::TypeMismatch`] if the value does not fit the field.
    pub(super) fn store_field(&mut self, token: Token) -> Result<StepResult> {
        let (id, field) = self.resolve_field(token)?;
        let value = self.stack.pop()?;
        let owner = self.stack.pop()?;

        let mut bytes = vec![0; field.var.size];
        value.store(&field.var.ty, &mut bytes)?;

        if field.is_static() {
            self.write_static(id, field, &bytes)?;
        } else {
            let object = owner.as_object_ref()?;
            self.heap.write(object, field.var.offset, &bytes)?;
        }

        Ok(StepResult::Continue)
    }

    pub(super) fn load_static_field(&mut self, token: Token) -> Result<StepResult> {
        let (id, field) = self.resolve_field(token)?;
        if !field.is_static() {
            return Err(malformed_error!("ldsfld of the instance field {}", field.name));
        }

        self.push_static(id, field)
    }

    pub(super) fn store_static_field(&mut self, token: Token) -> Result<StepResult> {
        let (id, field) = self.resolve_field(token)?;
        if !field.is_static() {
            return Err(malformed_error!("stsfld of the instance field {}", field.name));
        }

        let value = self.stack.pop()?;
        let mut bytes = vec![0; field.var.size];
        value.store(&field.var.ty, &mut bytes)?;
        self.write_static(id, field, &bytes)?;

        Ok(StepResult::Continue)
    }

    fn push_static(&mut self, id: FieldId, field: &FieldDesc) -> Result<StepResult> {
        let class = self.static_owner(id, field)?;
        let bytes = class.read_static(field.var.offset, field.var.size)?;
        self.stack.push(Value::load(&field.var.ty, &bytes)?)?;
        Ok(StepResult::Continue)
    }

    fn write_static(&self, id: FieldId, field: &FieldDesc, bytes: &[u8]) -> Result<()> {
        self.static_owner(id, field)?
            .write_static(field.var.offset, bytes)
    }

    fn static_owner(&self, id: FieldId, field: &FieldDesc) -> Result<&'a crate::typesystem::EEClass> {
        if !field.has_static_storage() {
            return Err(Error::NotSupported(format!(
                "{} {} is a literal without storage",
                id, field.name
            )));
        }

        let types = self.types;
        types
            .class(field.class)
            .ok_or_else(|| malformed_error!("{} has no owning class", id))
    }

    /// Pushes the interned string object for a `#US` token.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::WellKnownTypeMissing`] if the engine was created without
    /// [`crate::binder::WellKnownTypes`].
    pub(super) fn load_string(&mut self, token: Token) -> Result<StepResult> {
        let module = self.frame()?.module;

        let object = match self.strings.get(&(module, token)) {
            Some(object) => *object,
            None => {
                let Some(well_known) = &self.well_known else {
                    return Err(Error::WellKnownTypeMissing(
                        WellKnownType::String.full_name(),
                    ));
                };

                let text = self.types.user_string(module, token)?;
                let object = self
                    .heap
                    .allocate_string(well_known.get(WellKnownType::String), text.as_slice())?;
                self.strings.insert((module, token), object);
                object
            }
        };

        self.stack.push(Value::ObjectRef(object))?;
        Ok(StepResult::Continue)
    }
}
