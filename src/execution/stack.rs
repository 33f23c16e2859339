//! The evaluation stack.
//!
//! Values live in one byte buffer of fixed capacity. Each pushed value is padded to its own
//! alignment and described by a slot `(start, offset, kind)`, so popping restores the buffer to
//! the exact length it had before the push. Frame markers record the slot depth at the entry of
//! every active call; values below the innermost marker belong to the caller and can not be
//! popped.

use crate::{
    execution::{ExecutionError, ObjectRef, Value},
    file::io::read_le,
    typesystem::{align_up, ClassId},
    Result,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SlotKind {
    I32,
    I64,
    NativeInt,
    F32,
    F64,
    ObjectRef,
    ValueType(ClassId),
}

#[derive(Debug, Clone, Copy)]
struct Slot {
    /// Buffer length before the push, padding included
    start: usize,
    /// Offset of the value itself
    offset: usize,
    /// One past the value's last byte
    end: usize,
    kind: SlotKind,
}

/// A typed evaluation stack over a fixed size byte buffer.
pub struct EvaluationStack {
    data: Vec<u8>,
    capacity: usize,
    slots: Vec<Slot>,
    frames: Vec<usize>,
}

impl EvaluationStack {
    /// Create an empty stack of `capacity` bytes
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        EvaluationStack {
            data: Vec::new(),
            capacity,
            slots: Vec::new(),
            frames: Vec::new(),
        }
    }

    /// Push a value
    ///
    /// # Errors
    /// Returns [`ExecutionError::StackOverflow`] if the value does not fit.
    pub fn push(&mut self, value: Value) -> Result<()> {
        let start = self.data.len();
        let offset = align_up(start, value.alignment());
        let end = offset + value.size();
        if end > self.capacity {
            return Err(ExecutionError::StackOverflow {
                requested: end,
                capacity: self.capacity,
            }
            .into());
        }

        self.data.resize(offset, 0);
        let kind = match value {
            Value::I32(value) => {
                self.data.extend_from_slice(&value.to_le_bytes());
                SlotKind::I32
            }
            Value::I64(value) => {
                self.data.extend_from_slice(&value.to_le_bytes());
                SlotKind::I64
            }
            Value::NativeInt(value) => {
                self.data.extend_from_slice(&value.to_le_bytes());
                SlotKind::NativeInt
            }
            Value::F32(value) => {
                self.data.extend_from_slice(&value.to_le_bytes());
                SlotKind::F32
            }
            Value::F64(value) => {
                self.data.extend_from_slice(&value.to_le_bytes());
                SlotKind::F64
            }
            Value::ObjectRef(value) => {
                self.data.extend_from_slice(&value.value().to_le_bytes());
                SlotKind::ObjectRef
            }
            Value::ValueType { class, bytes } => {
                self.data.extend_from_slice(&bytes);
                SlotKind::ValueType(class)
            }
        };

        self.slots.push(Slot {
            start,
            offset,
            end,
            kind,
        });
        Ok(())
    }

    /// Pop the top value
    ///
    /// # Errors
    /// Returns [`ExecutionError::StackUnderflow`] if the current frame has no values left.
    pub fn pop(&mut self) -> Result<Value> {
        if self.slots.len() <= self.frame_base() {
            return Err(ExecutionError::StackUnderflow.into());
        }

        let Some(slot) = self.slots.pop() else {
            return Err(ExecutionError::StackUnderflow.into());
        };

        let value = self.read(&slot)?;
        self.data.truncate(slot.start);
        Ok(value)
    }

    /// Pop `count` values and return them in push order
    ///
    /// # Errors
    /// Returns [`ExecutionError::StackUnderflow`] if fewer values are available.
    pub fn pop_n(&mut self, count: usize) -> Result<Vec<Value>> {
        if self.depth() < count {
            return Err(ExecutionError::StackUnderflow.into());
        }

        let mut values = Vec::with_capacity(count);
        for _ in 0..count {
            values.push(self.pop()?);
        }
        values.reverse();
        Ok(values)
    }

    /// Read the top value without removing it
    ///
    /// # Errors
    /// Returns [`ExecutionError::StackUnderflow`] if the current frame has no values.
    pub fn peek(&self) -> Result<Value> {
        if self.slots.len() <= self.frame_base() {
            return Err(ExecutionError::StackUnderflow.into());
        }

        match self.slots.last() {
            Some(slot) => self.read(slot),
            None => Err(ExecutionError::StackUnderflow.into()),
        }
    }

    /// Push a copy of the top value
    ///
    /// # Errors
    /// Returns [`ExecutionError::StackUnderflow`] on an empty frame and
    /// [`ExecutionError::StackOverflow`] if the copy does not fit.
    pub fn dup(&mut self) -> Result<()> {
        let value = self.peek()?;
        self.push(value)
    }

    /// Number of values in the current frame
    #[must_use]
    pub fn depth(&self) -> usize {
        self.slots.len() - self.frame_base()
    }

    /// Number of values on the whole stack
    #[must_use]
    pub fn total_depth(&self) -> usize {
        self.slots.len()
    }

    /// Bytes in use, padding included
    #[must_use]
    pub fn bytes_used(&self) -> usize {
        self.data.len()
    }

    /// Capacity in bytes
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Start a frame at the current depth
    pub fn push_frame(&mut self) {
        self.frames.push(self.slots.len());
    }

    /// Drop every value of the innermost frame, then the frame itself
    ///
    /// # Errors
    /// Returns [`ExecutionError::StackUnderflow`] if no frame is active.
    pub fn pop_frame(&mut self) -> Result<()> {
        let Some(base) = self.frames.pop() else {
            return Err(ExecutionError::StackUnderflow.into());
        };

        if let Some(slot) = self.slots.get(base) {
            self.data.truncate(slot.start);
        }
        self.slots.truncate(base);
        Ok(())
    }

    /// Number of active frames
    #[must_use]
    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// Remove all values and frames
    pub fn clear(&mut self) {
        self.data.clear();
        self.slots.clear();
        self.frames.clear();
    }

    fn frame_base(&self) -> usize {
        self.frames.last().copied().unwrap_or(0)
    }

    fn read(&self, slot: &Slot) -> Result<Value> {
        let Some(bytes) = self.data.get(slot.offset..slot.end) else {
            return Err(crate::Error::OutOfBounds);
        };
        Ok(match slot.kind {
            SlotKind::I32 => Value::I32(read_le::<i32>(bytes)?),
            SlotKind::I64 => Value::I64(read_le::<i64>(bytes)?),
            SlotKind::NativeInt => Value::NativeInt(read_le::<i64>(bytes)?),
            SlotKind::F32 => Value::F32(read_le::<f32>(bytes)?),
            SlotKind::F64 => Value::F64(read_le::<f64>(bytes)?),
            SlotKind::ObjectRef => Value::ObjectRef(ObjectRef::new(read_le::<u32>(bytes)?)),
            SlotKind::ValueType(class) => Value::ValueType {
                class,
                bytes: bytes.to_vec(),
            },
        })
    }
}
