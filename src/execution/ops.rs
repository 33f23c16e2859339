//! Arithmetic, comparison and conversion of stack values.
//!
//! Binary operations follow the operand combinations of ECMA-335 III.1.5: both operands are
//! `int32`, both `int64`, a native int mixed with a native int or `int32`, or both floating
//! point. Every other combination is a [`ExecutionError::TypeMismatch`]. Integer arithmetic
//! wraps, except for division, which reports [`ExecutionError::DivideByZero`] and
//! [`ExecutionError::Overflow`].

use std::cmp::Ordering;

use crate::{
    execution::{value::mismatch, ExecutionError, Value},
    Error::NotSupported,
    Result,
};

/// Two operand arithmetic and bitwise operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    DivUn,
    Rem,
    RemUn,
    And,
    Or,
    Xor,
    Shl,
    Shr,
    ShrUn,
}

/// Single operand operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum UnaryOp {
    Neg,
    Not,
}

/// Conditions of the compare and conditional branch instructions.
///
/// The `Un` variants compare integers as unsigned and treat unordered floating point operands
/// (a NaN on either side) as satisfying the condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum Condition {
    Eq,
    NeUn,
    Ge,
    GeUn,
    Gt,
    GtUn,
    Le,
    LeUn,
    Lt,
    LtUn,
}

impl Condition {
    fn is_unsigned(self) -> bool {
        matches!(
            self,
            Condition::NeUn
                | Condition::GeUn
                | Condition::GtUn
                | Condition::LeUn
                | Condition::LtUn
        )
    }
}

/// Targets of the `conv.*` instructions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum Conversion {
    I1,
    I2,
    I4,
    I8,
    U1,
    U2,
    U4,
    U8,
    I,
    U,
    R4,
    R8,
    /// `conv.r.un`, an unsigned integer to floating point
    RUn,
}

macro_rules! integer_binary {
    ($name:ident, $signed:ty, $unsigned:ty) => {
        #[allow(clippy::cast_sign_loss, clippy::cast_possible_wrap)]
        fn $name(op: BinaryOp, left: $signed, right: $signed) -> Result<$signed> {
            let divisor_check = || -> Result<()> {
                if right == 0 {
                    Err(ExecutionError::DivideByZero.into())
                } else {
                    Ok(())
                }
            };

            Ok(match op {
                BinaryOp::Add => left.wrapping_add(right),
                BinaryOp::Sub => left.wrapping_sub(right),
                BinaryOp::Mul => left.wrapping_mul(right),
                BinaryOp::Div => {
                    divisor_check()?;
                    left.checked_div(right).ok_or(ExecutionError::Overflow)?
                }
                BinaryOp::DivUn => {
                    divisor_check()?;
                    ((left as $unsigned) / (right as $unsigned)) as $signed
                }
                BinaryOp::Rem => {
                    divisor_check()?;
                    left.checked_rem(right).ok_or(ExecutionError::Overflow)?
                }
                BinaryOp::RemUn => {
                    divisor_check()?;
                    ((left as $unsigned) % (right as $unsigned)) as $signed
                }
                BinaryOp::And => left & right,
                BinaryOp::Or => left | right,
                BinaryOp::Xor => left ^ right,
                BinaryOp::Shl => left.wrapping_shl(right as u32),
                BinaryOp::Shr => left.wrapping_shr(right as u32),
                BinaryOp::ShrUn => ((left as $unsigned).wrapping_shr(right as u32)) as $signed,
            })
        }
    };
}

integer_binary!(binary_i32, i32, u32);
integer_binary!(binary_i64, i64, u64);

fn binary_float(op: BinaryOp, left: f64, right: f64, found: &Value) -> Result<f64> {
    Ok(match op {
        BinaryOp::Add => left + right,
        BinaryOp::Sub => left - right,
        BinaryOp::Mul => left * right,
        BinaryOp::Div => left / right,
        BinaryOp::Rem => left % right,
        _ => return Err(mismatch("integer", found)),
    })
}

impl Value {
    /// Apply a binary operation, `self` being the left operand
    ///
    /// # Errors
    /// Returns [`ExecutionError::TypeMismatch`] for operand kinds the operation does not accept,
    /// [`ExecutionError::DivideByZero`] and [`ExecutionError::Overflow`] for integer division.
    #[allow(clippy::cast_possible_truncation)]
    pub fn binary_op(&self, right: &Value, op: BinaryOp) -> Result<Value> {
        if matches!(op, BinaryOp::Shl | BinaryOp::Shr | BinaryOp::ShrUn) {
            return self.shift(right, op);
        }

        match (self, right) {
            (Value::I32(left), Value::I32(right)) => Ok(Value::I32(binary_i32(op, *left, *right)?)),
            (Value::I64(left), Value::I64(right)) => Ok(Value::I64(binary_i64(op, *left, *right)?)),
            (Value::NativeInt(_), Value::NativeInt(_) | Value::I32(_))
            | (Value::I32(_), Value::NativeInt(_)) => Ok(Value::NativeInt(binary_i64(
                op,
                self.as_native_int()?,
                right.as_native_int()?,
            )?)),
            (Value::F32(left), Value::F32(right)) => Ok(Value::F32(binary_float(
                op,
                f64::from(*left),
                f64::from(*right),
                self,
            )? as f32)),
            (Value::F32(_) | Value::F64(_), Value::F32(_) | Value::F64(_)) => Ok(Value::F64(
                binary_float(op, self.as_f64()?, right.as_f64()?, self)?,
            )),
            (Value::I32(_) | Value::I64(_) | Value::NativeInt(_) | Value::F32(_) | Value::F64(_), _) => {
                Err(mismatch(self.type_name(), right))
            }
            _ => Err(mismatch("number", self)),
        }
    }

    /// Apply `neg` or `not`
    ///
    /// # Errors
    /// Returns [`ExecutionError::TypeMismatch`] for references, value types and `not` on floats.
    pub fn unary_op(&self, op: UnaryOp) -> Result<Value> {
        match (self, op) {
            (Value::I32(value), UnaryOp::Neg) => Ok(Value::I32(value.wrapping_neg())),
            (Value::I32(value), UnaryOp::Not) => Ok(Value::I32(!value)),
            (Value::I64(value), UnaryOp::Neg) => Ok(Value::I64(value.wrapping_neg())),
            (Value::I64(value), UnaryOp::Not) => Ok(Value::I64(!value)),
            (Value::NativeInt(value), UnaryOp::Neg) => Ok(Value::NativeInt(value.wrapping_neg())),
            (Value::NativeInt(value), UnaryOp::Not) => Ok(Value::NativeInt(!value)),
            (Value::F32(value), UnaryOp::Neg) => Ok(Value::F32(-value)),
            (Value::F64(value), UnaryOp::Neg) => Ok(Value::F64(-value)),
            (other, UnaryOp::Neg) => Err(mismatch("number", other)),
            (other, UnaryOp::Not) => Err(mismatch("integer", other)),
        }
    }

    /// Evaluate `self <condition> right`
    ///
    /// Object references support equality, and `cgt.un` against `null`.
    ///
    /// # Errors
    /// Returns [`ExecutionError::TypeMismatch`] for operand kinds that can not be compared.
    pub fn compare(&self, right: &Value, condition: Condition) -> Result<bool> {
        let Some(ordering) = self.ordering(right, condition.is_unsigned())? else {
            // unordered: a NaN on either side
            return Ok(condition.is_unsigned());
        };

        Ok(match condition {
            Condition::Eq => ordering == Ordering::Equal,
            Condition::NeUn => ordering != Ordering::Equal,
            Condition::Ge | Condition::GeUn => ordering != Ordering::Less,
            Condition::Gt | Condition::GtUn => ordering == Ordering::Greater,
            Condition::Le | Condition::LeUn => ordering != Ordering::Greater,
            Condition::Lt | Condition::LtUn => ordering == Ordering::Less,
        })
    }

    /// Convert to the stack kind `conversion` produces, truncating or extending as needed
    ///
    /// # Errors
    /// Returns [`crate::Error::NotSupported`] for references and value types, and for
    /// `conv.r.un` of a floating point value.
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_possible_wrap,
        clippy::cast_precision_loss
    )]
    pub fn convert(&self, conversion: Conversion) -> Result<Value> {
        match self {
            Value::I32(value) => {
                let widened = if matches!(conversion, Conversion::U8 | Conversion::U | Conversion::RUn) {
                    i64::from(*value as u32)
                } else {
                    i64::from(*value)
                };
                Ok(convert_integer(widened, conversion))
            }
            Value::I64(value) | Value::NativeInt(value) => Ok(convert_integer(*value, conversion)),
            Value::F32(value) => convert_float(f64::from(*value), conversion),
            Value::F64(value) => convert_float(*value, conversion),
            other => Err(NotSupported(format!(
                "Conversion of {} with {:?}",
                other.type_name(),
                conversion
            ))),
        }
    }

    #[allow(clippy::cast_sign_loss)]
    fn ordering(&self, right: &Value, unsigned: bool) -> Result<Option<Ordering>> {
        Ok(match (self, right) {
            (Value::I32(left), Value::I32(right)) => Some(if unsigned {
                (*left as u32).cmp(&(*right as u32))
            } else {
                left.cmp(right)
            }),
            (Value::I64(left), Value::I64(right)) => Some(compare_i64(*left, *right, unsigned)),
            (Value::NativeInt(_), Value::NativeInt(_) | Value::I32(_))
            | (Value::I32(_), Value::NativeInt(_)) => Some(compare_i64(
                self.as_native_int()?,
                right.as_native_int()?,
                unsigned,
            )),
            (Value::F32(_) | Value::F64(_), Value::F32(_) | Value::F64(_)) => {
                self.as_f64()?.partial_cmp(&right.as_f64()?)
            }
            (Value::ObjectRef(left), Value::ObjectRef(right)) => {
                Some(left.value().cmp(&right.value()))
            }
            (Value::ValueType { .. }, _) => return Err(mismatch("comparable value", self)),
            _ => return Err(mismatch(self.type_name(), right)),
        })
    }

    fn shift(&self, amount: &Value, op: BinaryOp) -> Result<Value> {
        let amount = match amount {
            Value::I32(amount) => i64::from(*amount),
            Value::NativeInt(amount) => *amount,
            other => return Err(mismatch("int32 shift amount", other)),
        };

        #[allow(clippy::cast_possible_truncation)]
        match self {
            Value::I32(value) => Ok(Value::I32(binary_i32(op, *value, amount as i32)?)),
            Value::I64(value) => Ok(Value::I64(binary_i64(op, *value, amount)?)),
            Value::NativeInt(value) => Ok(Value::NativeInt(binary_i64(op, *value, amount)?)),
            other => Err(mismatch("integer", other)),
        }
    }
}

#[allow(clippy::cast_sign_loss)]
fn compare_i64(left: i64, right: i64, unsigned: bool) -> Ordering {
    if unsigned {
        (left as u64).cmp(&(right as u64))
    } else {
        left.cmp(&right)
    }
}

#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_possible_wrap,
    clippy::cast_precision_loss
)]
fn convert_integer(value: i64, conversion: Conversion) -> Value {
    match conversion {
        Conversion::I1 => Value::I32(i32::from(value as i8)),
        Conversion::U1 => Value::I32(i32::from(value as u8)),
        Conversion::I2 => Value::I32(i32::from(value as i16)),
        Conversion::U2 => Value::I32(i32::from(value as u16)),
        Conversion::I4 | Conversion::U4 => Value::I32(value as i32),
        Conversion::I8 | Conversion::U8 => Value::I64(value),
        Conversion::I | Conversion::U => Value::NativeInt(value),
        Conversion::R4 => Value::F32(value as f32),
        Conversion::R8 => Value::F64(value as f64),
        Conversion::RUn => Value::F64(value as u64 as f64),
    }
}

#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_possible_wrap
)]
fn convert_float(value: f64, conversion: Conversion) -> Result<Value> {
    Ok(match conversion {
        Conversion::I1 => Value::I32(i32::from(value as i8)),
        Conversion::U1 => Value::I32(i32::from(value as u8)),
        Conversion::I2 => Value::I32(i32::from(value as i16)),
        Conversion::U2 => Value::I32(i32::from(value as u16)),
        Conversion::I4 => Value::I32(value as i32),
        Conversion::U4 => Value::I32(value as u32 as i32),
        Conversion::I8 => Value::I64(value as i64),
        Conversion::U8 => Value::I64(value as u64 as i64),
        Conversion::I => Value::NativeInt(value as i64),
        Conversion::U => Value::NativeInt(value as u64 as i64),
        Conversion::R4 => Value::F32(value as f32),
        Conversion::R8 => Value::F64(value),
        Conversion::RUn => {
            return Err(NotSupported(
                "conv.r.un of a floating point value".to_string(),
            ))
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::ObjectRef;

    fn error_of(result: Result<Value>) -> ExecutionError {
        match result {
            Err(crate::Error::Execution(error)) => error,
            other => panic!("expected an execution error, got {:?}", other),
        }
    }

    #[test]
    fn int32_arithmetic() {
        let seven = Value::I32(7);
        let two = Value::I32(2);
        assert_eq!(seven.binary_op(&two, BinaryOp::Add).unwrap(), Value::I32(9));
        assert_eq!(seven.binary_op(&two, BinaryOp::Sub).unwrap(), Value::I32(5));
        assert_eq!(seven.binary_op(&two, BinaryOp::Mul).unwrap(), Value::I32(14));
        assert_eq!(seven.binary_op(&two, BinaryOp::Div).unwrap(), Value::I32(3));
        assert_eq!(seven.binary_op(&two, BinaryOp::Rem).unwrap(), Value::I32(1));
        assert_eq!(seven.binary_op(&two, BinaryOp::And).unwrap(), Value::I32(2));
        assert_eq!(seven.binary_op(&two, BinaryOp::Or).unwrap(), Value::I32(7));
        assert_eq!(seven.binary_op(&two, BinaryOp::Xor).unwrap(), Value::I32(5));
        assert_eq!(seven.binary_op(&two, BinaryOp::Shl).unwrap(), Value::I32(28));
        assert_eq!(
            Value::I32(i32::MAX).binary_op(&Value::I32(1), BinaryOp::Add).unwrap(),
            Value::I32(i32::MIN)
        );
    }

    #[test]
    fn unsigned_division_and_shifts() {
        let minus_eight = Value::I32(-8);
        assert_eq!(
            minus_eight.binary_op(&Value::I32(2), BinaryOp::Div).unwrap(),
            Value::I32(-4)
        );
        assert_eq!(
            minus_eight.binary_op(&Value::I32(2), BinaryOp::DivUn).unwrap(),
            Value::I32(0x7FFF_FFFC)
        );
        assert_eq!(
            minus_eight.binary_op(&Value::I32(3), BinaryOp::RemUn).unwrap(),
            Value::I32((0xFFFF_FFF8_u32 % 3) as i32)
        );
        assert_eq!(
            minus_eight.binary_op(&Value::I32(1), BinaryOp::Shr).unwrap(),
            Value::I32(-4)
        );
        assert_eq!(
            minus_eight.binary_op(&Value::I32(28), BinaryOp::ShrUn).unwrap(),
            Value::I32(0xF)
        );
        assert_eq!(
            Value::I64(1).binary_op(&Value::I32(40), BinaryOp::Shl).unwrap(),
            Value::I64(1 << 40)
        );
    }

    #[test]
    fn division_errors() {
        assert_eq!(
            error_of(Value::I32(1).binary_op(&Value::I32(0), BinaryOp::Div)),
            ExecutionError::DivideByZero
        );
        assert_eq!(
            error_of(Value::I64(1).binary_op(&Value::I64(0), BinaryOp::RemUn)),
            ExecutionError::DivideByZero
        );
        assert_eq!(
            error_of(Value::I32(i32::MIN).binary_op(&Value::I32(-1), BinaryOp::Div)),
            ExecutionError::Overflow
        );
        // floating point division by zero is not an error
        assert_eq!(
            Value::F64(1.0).binary_op(&Value::F64(0.0), BinaryOp::Div).unwrap(),
            Value::F64(f64::INFINITY)
        );
    }

    #[test]
    fn mixed_operands() {
        assert_eq!(
            Value::NativeInt(10).binary_op(&Value::I32(5), BinaryOp::Sub).unwrap(),
            Value::NativeInt(5)
        );
        assert_eq!(
            Value::F32(1.5).binary_op(&Value::F32(2.0), BinaryOp::Mul).unwrap(),
            Value::F32(3.0)
        );
        assert_eq!(
            Value::F32(1.5).binary_op(&Value::F64(2.0), BinaryOp::Add).unwrap(),
            Value::F64(3.5)
        );

        assert!(matches!(
            error_of(Value::I32(1).binary_op(&Value::I64(1), BinaryOp::Add)),
            ExecutionError::TypeMismatch { .. }
        ));
        assert!(matches!(
            error_of(Value::F64(1.0).binary_op(&Value::F64(1.0), BinaryOp::Xor)),
            ExecutionError::TypeMismatch { .. }
        ));
        assert!(Value::NULL.binary_op(&Value::I32(1), BinaryOp::Add).is_err());
    }

    #[test]
    fn unary() {
        assert_eq!(Value::I32(5).unary_op(UnaryOp::Neg).unwrap(), Value::I32(-5));
        assert_eq!(Value::I32(0).unary_op(UnaryOp::Not).unwrap(), Value::I32(-1));
        assert_eq!(Value::F64(2.0).unary_op(UnaryOp::Neg).unwrap(), Value::F64(-2.0));
        assert!(Value::F64(2.0).unary_op(UnaryOp::Not).is_err());
        assert!(Value::NULL.unary_op(UnaryOp::Neg).is_err());
    }

    #[test]
    fn comparisons() {
        let minus_one = Value::I32(-1);
        let one = Value::I32(1);
        assert!(minus_one.compare(&one, Condition::Lt).unwrap());
        assert!(!minus_one.compare(&one, Condition::LtUn).unwrap());
        assert!(minus_one.compare(&one, Condition::GtUn).unwrap());
        assert!(one.compare(&one, Condition::Eq).unwrap());
        assert!(one.compare(&one, Condition::Ge).unwrap());
        assert!(one.compare(&one, Condition::Le).unwrap());
        assert!(!one.compare(&one, Condition::NeUn).unwrap());

        let nan = Value::F64(f64::NAN);
        assert!(!nan.compare(&Value::F64(0.0), Condition::Lt).unwrap());
        assert!(!nan.compare(&Value::F64(0.0), Condition::Eq).unwrap());
        assert!(nan.compare(&Value::F64(0.0), Condition::LtUn).unwrap());
        assert!(nan.compare(&nan, Condition::NeUn).unwrap());

        let object = Value::ObjectRef(ObjectRef::new(8));
        assert!(object.compare(&Value::NULL, Condition::GtUn).unwrap());
        assert!(Value::NULL.compare(&Value::NULL, Condition::Eq).unwrap());
        assert!(one.compare(&Value::I64(1), Condition::Eq).is_err());
    }

    #[test]
    fn conversions() {
        assert_eq!(Value::I32(300).convert(Conversion::U1).unwrap(), Value::I32(44));
        assert_eq!(Value::I32(200).convert(Conversion::I1).unwrap(), Value::I32(-56));
        assert_eq!(Value::I32(-1).convert(Conversion::U2).unwrap(), Value::I32(0xFFFF));
        assert_eq!(Value::I32(-1).convert(Conversion::I8).unwrap(), Value::I64(-1));
        assert_eq!(
            Value::I32(-1).convert(Conversion::U8).unwrap(),
            Value::I64(0xFFFF_FFFF)
        );
        assert_eq!(
            Value::I64(0x1_0000_0005).convert(Conversion::I4).unwrap(),
            Value::I32(5)
        );
        assert_eq!(Value::I32(7).convert(Conversion::I).unwrap(), Value::NativeInt(7));
        assert_eq!(Value::I32(3).convert(Conversion::R8).unwrap(), Value::F64(3.0));
        assert_eq!(
            Value::I32(-1).convert(Conversion::RUn).unwrap(),
            Value::F64(4_294_967_295.0)
        );
        assert_eq!(Value::F64(-2.75).convert(Conversion::I4).unwrap(), Value::I32(-2));
        assert_eq!(Value::F64(2.5).convert(Conversion::R4).unwrap(), Value::F32(2.5));

        assert!(matches!(
            Value::F64(1.0).convert(Conversion::RUn),
            Err(NotSupported(_))
        ));
        assert!(matches!(
            Value::NULL.convert(Conversion::I4),
            Err(NotSupported(_))
        ));
    }
}
