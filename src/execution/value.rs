//! Values on the evaluation stack.
//!
//! The evaluation stack only knows a handful of kinds (ECMA-335 III.1.1): 32-bit and 64-bit
//! integers, native integers, floating point numbers, object references and inline value types.
//! Storage slots are more precise, so every transfer between a slot and the stack goes through
//! [`Value::load`] (small integers are widened to `int32`) and [`Value::store`] (they are
//! truncated back to the slot's width).

use std::fmt;

use crate::{
    execution::ExecutionError,
    typesystem::{ClassId, ElementType, TypeDesc},
    Result,
};

/// An opaque reference into the [`crate::execution::ObjectHeap`].
///
/// References are non-zero byte offsets into the heap arena; offset zero is reserved and
/// represents `null`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct ObjectRef(u32);

impl ObjectRef {
    /// The null reference
    pub const NULL: ObjectRef = ObjectRef(0);

    /// Wrap a raw heap offset
    #[must_use]
    pub const fn new(offset: u32) -> Self {
        ObjectRef(offset)
    }

    /// The raw heap offset
    #[must_use]
    pub const fn value(self) -> u32 {
        self.0
    }

    /// True for `null`
    #[must_use]
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }
}

/// A typed value of the evaluation stack.
///
/// | Slot type | Variant |
/// |-----------|---------|
/// | `bool`, `char`, `int8` … `uint32` | [`Value::I32`] |
/// | `int64`, `uint64` | [`Value::I64`] |
/// | `native int`, `native uint`, pointers, by-refs | [`Value::NativeInt`] |
/// | `float32` | [`Value::F32`] |
/// | `float64` | [`Value::F64`] |
/// | `string`, `object`, classes, arrays | [`Value::ObjectRef`] |
/// | value types | [`Value::ValueType`] |
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// 32-bit integer
    I32(i32),
    /// 64-bit integer
    I64(i64),
    /// Native sized integer
    NativeInt(i64),
    /// 32-bit floating point
    F32(f32),
    /// 64-bit floating point
    F64(f64),
    /// Object reference, possibly null
    ObjectRef(ObjectRef),
    /// An inline value type instance
    ValueType {
        /// The value type's class
        class: ClassId,
        /// Instance storage, laid out per the class' field offsets
        bytes: Vec<u8>,
    },
}

impl Value {
    /// The null reference
    pub const NULL: Value = Value::ObjectRef(ObjectRef::NULL);

    /// Short name of the stack kind, used in error messages
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::I32(_) => "int32",
            Value::I64(_) => "int64",
            Value::NativeInt(_) => "native int",
            Value::F32(_) => "float32",
            Value::F64(_) => "float64",
            Value::ObjectRef(_) => "object",
            Value::ValueType { .. } => "valuetype",
        }
    }

    /// Bytes the value occupies on the evaluation stack
    #[must_use]
    pub fn size(&self) -> usize {
        match self {
            Value::I32(_) | Value::F32(_) | Value::ObjectRef(_) => 4,
            Value::I64(_) | Value::NativeInt(_) | Value::F64(_) => 8,
            Value::ValueType { bytes, .. } => bytes.len(),
        }
    }

    /// Alignment of the value on the evaluation stack
    #[must_use]
    pub fn alignment(&self) -> usize {
        match self {
            Value::ValueType { .. } => 8,
            other => other.size(),
        }
    }

    /// Read a value of type `ty` from slot storage, widening small integers
    ///
    /// ## Arguments
    /// * 'ty'      - Type of the slot
    /// * 'bytes'   - The slot's bytes, exactly as long as the slot
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if `bytes` is too short, and
    /// [`ExecutionError::ClassNotLoaded`] for a value type slot without a resolved class.
    pub fn load(ty: &TypeDesc, bytes: &[u8]) -> Result<Value> {
        if ty.is_managed_pointer() {
            return Ok(Value::NativeInt(read_i64(bytes)?));
        }

        if ty.is_object_reference() {
            return Ok(Value::ObjectRef(ObjectRef(u32::from_le_bytes(
                first::<4>(bytes)?,
            ))));
        }

        Ok(match ty.element {
            ElementType::Boolean | ElementType::U1 => Value::I32(i32::from(first::<1>(bytes)?[0])),
            ElementType::I1 => Value::I32(i32::from(first::<1>(bytes)?[0] as i8)),
            ElementType::Char | ElementType::U2 => {
                Value::I32(i32::from(u16::from_le_bytes(first::<2>(bytes)?)))
            }
            ElementType::I2 => Value::I32(i32::from(i16::from_le_bytes(first::<2>(bytes)?))),
            ElementType::I4 | ElementType::U4 => Value::I32(i32::from_le_bytes(first::<4>(bytes)?)),
            ElementType::I8 | ElementType::U8 => Value::I64(read_i64(bytes)?),
            ElementType::I | ElementType::U | ElementType::Ptr => Value::NativeInt(read_i64(bytes)?),
            ElementType::R4 => Value::F32(f32::from_le_bytes(first::<4>(bytes)?)),
            ElementType::R8 => Value::F64(f64::from_le_bytes(first::<8>(bytes)?)),
            ElementType::String | ElementType::Object | ElementType::Class => {
                Value::ObjectRef(ObjectRef(u32::from_le_bytes(first::<4>(bytes)?)))
            }
            ElementType::ValueType => {
                let Some(class) = ty.class else {
                    return Err(
                        ExecutionError::ClassNotLoaded("unresolved value type".to_string()).into(),
                    );
                };

                Value::ValueType {
                    class,
                    bytes: bytes.to_vec(),
                }
            }
            ElementType::Void => {
                return Err(ExecutionError::TypeMismatch {
                    expected: "a storable type",
                    found: "void",
                }
                .into())
            }
        })
    }

    /// Write the value into slot storage of type `ty`, truncating to the slot's width
    ///
    /// ## Arguments
    /// * 'ty'      - Type of the slot
    /// * 'dest'    - The slot's bytes
    ///
    /// # Errors
    /// Returns [`ExecutionError::TypeMismatch`] if the value can not be stored in a slot of type
    /// `ty`, and [`crate::Error::OutOfBounds`] if `dest` is too short.
    pub fn store(&self, ty: &TypeDesc, dest: &mut [u8]) -> Result<()> {
        if ty.is_managed_pointer() {
            return write(dest, &self.as_native_int()?.to_le_bytes());
        }

        if ty.is_object_reference() {
            return write(dest, &self.as_object_ref()?.value().to_le_bytes());
        }

        match ty.element {
            ElementType::Boolean | ElementType::I1 | ElementType::U1 => {
                write(dest, &[self.as_small_int()? as u8])
            }
            ElementType::Char | ElementType::I2 | ElementType::U2 => {
                write(dest, &(self.as_small_int()? as u16).to_le_bytes())
            }
            ElementType::I4 | ElementType::U4 => write(dest, &self.as_small_int()?.to_le_bytes()),
            ElementType::I8 | ElementType::U8 => write(dest, &self.as_i64()?.to_le_bytes()),
            ElementType::I | ElementType::U | ElementType::Ptr => {
                write(dest, &self.as_native_int()?.to_le_bytes())
            }
            #[allow(clippy::cast_possible_truncation)]
            ElementType::R4 => write(dest, &(self.as_f64()? as f32).to_le_bytes()),
            ElementType::R8 => write(dest, &self.as_f64()?.to_le_bytes()),
            ElementType::String | ElementType::Object | ElementType::Class => {
                write(dest, &self.as_object_ref()?.value().to_le_bytes())
            }
            ElementType::ValueType => match self {
                Value::ValueType { bytes, .. } if bytes.len() == dest.len() => write(dest, bytes),
                other => Err(mismatch("valuetype", other)),
            },
            ElementType::Void => Err(mismatch("a storable type", self)),
        }
    }

    /// The value as `int32`
    ///
    /// # Errors
    /// Returns [`ExecutionError::TypeMismatch`] for any other kind.
    pub fn as_i32(&self) -> Result<i32> {
        match self {
            Value::I32(value) => Ok(*value),
            other => Err(mismatch("int32", other)),
        }
    }

    /// The value as `int64`
    ///
    /// # Errors
    /// Returns [`ExecutionError::TypeMismatch`] for any other kind.
    pub fn as_i64(&self) -> Result<i64> {
        match self {
            Value::I64(value) => Ok(*value),
            other => Err(mismatch("int64", other)),
        }
    }

    /// The value as a native integer, `int32` is sign extended
    ///
    /// # Errors
    /// Returns [`ExecutionError::TypeMismatch`] for any other kind.
    pub fn as_native_int(&self) -> Result<i64> {
        match self {
            Value::NativeInt(value) => Ok(*value),
            Value::I32(value) => Ok(i64::from(*value)),
            other => Err(mismatch("native int", other)),
        }
    }

    /// The value as a floating point number, `float32` is widened
    ///
    /// # Errors
    /// Returns [`ExecutionError::TypeMismatch`] for any other kind.
    pub fn as_f64(&self) -> Result<f64> {
        match self {
            Value::F64(value) => Ok(*value),
            Value::F32(value) => Ok(f64::from(*value)),
            other => Err(mismatch("float", other)),
        }
    }

    /// The value as an object reference
    ///
    /// # Errors
    /// Returns [`ExecutionError::TypeMismatch`] for any other kind.
    pub fn as_object_ref(&self) -> Result<ObjectRef> {
        match self {
            Value::ObjectRef(value) => Ok(*value),
            other => Err(mismatch("object", other)),
        }
    }

    /// Truth value as tested by `brtrue`/`brfalse`
    ///
    /// # Errors
    /// Returns [`ExecutionError::TypeMismatch`] for floating point and value type values.
    pub fn is_true(&self) -> Result<bool> {
        match self {
            Value::I32(value) => Ok(*value != 0),
            Value::I64(value) | Value::NativeInt(value) => Ok(*value != 0),
            Value::ObjectRef(value) => Ok(!value.is_null()),
            other => Err(mismatch("integer or object", other)),
        }
    }

    // int32 slots also accept native ints, which are truncated (III.1.6)
    #[allow(clippy::cast_possible_truncation)]
    fn as_small_int(&self) -> Result<i32> {
        match self {
            Value::I32(value) => Ok(*value),
            Value::NativeInt(value) => Ok(*value as i32),
            other => Err(mismatch("int32", other)),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::I32(value) => write!(f, "{value}"),
            Value::I64(value) => write!(f, "{value}L"),
            Value::NativeInt(value) => write!(f, "{value}n"),
            Value::F32(value) => write!(f, "{value}f"),
            Value::F64(value) => write!(f, "{value}"),
            Value::ObjectRef(value) if value.is_null() => write!(f, "null"),
            Value::ObjectRef(value) => write!(f, "obj@0x{:X}", value.value()),
            Value::ValueType { class, bytes } => write!(f, "{class}[{} bytes]", bytes.len()),
        }
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::I32(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::I64(value)
    }
}

impl From<f32> for Value {
    fn from(value: f32) -> Self {
        Value::F32(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::F64(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::I32(i32::from(value))
    }
}

impl From<ObjectRef> for Value {
    fn from(value: ObjectRef) -> Self {
        Value::ObjectRef(value)
    }
}

pub(crate) fn mismatch(expected: &'static str, found: &Value) -> crate::Error {
    ExecutionError::TypeMismatch {
        expected,
        found: found.type_name(),
    }
    .into()
}

fn first<const N: usize>(bytes: &[u8]) -> Result<[u8; N]> {
    bytes
        .get(..N)
        .and_then(|slice| slice.try_into().ok())
        .ok_or(crate::Error::OutOfBounds)
}

fn read_i64(bytes: &[u8]) -> Result<i64> {
    Ok(i64::from_le_bytes(first::<8>(bytes)?))
}

fn write(dest: &mut [u8], bytes: &[u8]) -> Result<()> {
    match dest.get_mut(..bytes.len()) {
        Some(target) => {
            target.copy_from_slice(bytes);
            Ok(())
        }
        None => Err(crate::Error::OutOfBounds),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::typesystem::TypeModifiers;

    fn slot(element: ElementType) -> TypeDesc {
        TypeDesc::primitive(element)
    }

    #[test]
    fn small_integers_widen_and_truncate() {
        let mut storage = [0_u8; 8];

        Value::I32(-1).store(&slot(ElementType::I1), &mut storage).unwrap();
        assert_eq!(storage[0], 0xFF);
        assert_eq!(storage[1], 0x00);
        assert_eq!(
            Value::load(&slot(ElementType::I1), &storage).unwrap(),
            Value::I32(-1)
        );
        assert_eq!(
            Value::load(&slot(ElementType::U1), &storage).unwrap(),
            Value::I32(255)
        );

        Value::I32(0x1_2345).store(&slot(ElementType::U2), &mut storage).unwrap();
        assert_eq!(
            Value::load(&slot(ElementType::U2), &storage).unwrap(),
            Value::I32(0x2345)
        );

        Value::I32(0x8000).store(&slot(ElementType::I2), &mut storage).unwrap();
        assert_eq!(
            Value::load(&slot(ElementType::I2), &storage).unwrap(),
            Value::I32(-32768)
        );
    }

    #[test]
    fn wide_values() {
        let mut storage = [0_u8; 8];

        Value::I64(-5).store(&slot(ElementType::I8), &mut storage).unwrap();
        assert_eq!(
            Value::load(&slot(ElementType::I8), &storage).unwrap(),
            Value::I64(-5)
        );

        Value::F64(1.25).store(&slot(ElementType::R8), &mut storage).unwrap();
        assert_eq!(
            Value::load(&slot(ElementType::R8), &storage).unwrap(),
            Value::F64(1.25)
        );

        Value::F64(0.5).store(&slot(ElementType::R4), &mut storage).unwrap();
        assert_eq!(
            Value::load(&slot(ElementType::R4), &storage).unwrap(),
            Value::F32(0.5)
        );

        Value::I32(-2).store(&slot(ElementType::I), &mut storage).unwrap();
        assert_eq!(
            Value::load(&slot(ElementType::I), &storage).unwrap(),
            Value::NativeInt(-2)
        );
    }

    #[test]
    fn references_and_value_types() {
        let mut storage = [0_u8; 8];
        let object = Value::ObjectRef(ObjectRef::new(0x40));
        object.store(&slot(ElementType::Class), &mut storage).unwrap();
        assert_eq!(Value::load(&slot(ElementType::String), &storage).unwrap(), object);

        let class = ClassId::new(2);
        let value = Value::ValueType {
            class,
            bytes: vec![1, 2, 3, 4],
        };
        let mut inline = [0_u8; 4];
        value.store(&TypeDesc::value_type(class), &mut inline).unwrap();
        assert_eq!(
            Value::load(&TypeDesc::value_type(class), &inline).unwrap(),
            value
        );

        let by_ref = TypeDesc::value_type(class).with_modifiers(TypeModifiers::BY_REF);
        Value::NativeInt(0x1000).store(&by_ref, &mut storage).unwrap();
        assert_eq!(Value::load(&by_ref, &storage).unwrap(), Value::NativeInt(0x1000));
    }

    #[test]
    fn mismatches() {
        let mut storage = [0_u8; 8];
        assert!(matches!(
            Value::F64(1.0).store(&slot(ElementType::I4), &mut storage),
            Err(crate::Error::Execution(ExecutionError::TypeMismatch { .. }))
        ));
        assert!(Value::I32(1).store(&slot(ElementType::I8), &mut storage).is_err());
        assert!(Value::I32(1).store(&slot(ElementType::Object), &mut storage).is_err());
        assert!(Value::I32(1).store(&slot(ElementType::I8), &mut [0_u8; 2]).is_err());
        assert!(Value::F32(1.0).is_true().is_err());
        assert!(Value::NULL.is_true().is_ok());
    }

    #[test]
    fn array_slots_hold_references() {
        let mut storage = [0xCC_u8; 8];
        let array = slot(ElementType::I4).with_modifiers(TypeModifiers::SZ_ARRAY);

        Value::NULL.store(&array, &mut storage).unwrap();
        assert_eq!(Value::load(&array, &storage).unwrap(), Value::NULL);

        Value::ObjectRef(ObjectRef::new(24))
            .store(&array, &mut storage)
            .unwrap();
        assert_eq!(
            Value::load(&array, &storage).unwrap(),
            Value::ObjectRef(ObjectRef::new(24))
        );
        assert!(Value::I32(1).store(&array, &mut storage).is_err());

        let generic = slot(ElementType::Object).with_modifiers(TypeModifiers::GENERIC_PARAM);
        Value::NULL.store(&generic, &mut storage).unwrap();
        assert_eq!(Value::load(&generic, &storage).unwrap(), Value::NULL);

        let array_ref = array.with_modifiers(TypeModifiers::BY_REF);
        Value::NativeInt(0x40).store(&array_ref, &mut storage).unwrap();
        assert_eq!(Value::load(&array_ref, &storage).unwrap(), Value::NativeInt(0x40));
    }
}
