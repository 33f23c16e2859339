//! Native methods available without any registration.
//!
//! `WriteLine(int32)` and `WriteLine(string)` have the same arity, so they share one trampoline
//! that prints according to the stack kind of the argument. The same holds for `Write`.

use crate::{
    execution::{
        ecall::{EcallContext, EcallGroup, EcallMethod, NativeFunction},
        ExecutionError, Value,
    },
    Result,
};

pub(super) static GROUPS: &[EcallGroup] = &[
    EcallGroup {
        namespace: "System",
        type_name: "Console",
        methods: CONSOLE,
    },
    EcallGroup {
        namespace: "System",
        type_name: "Math",
        methods: MATH,
    },
];

static CONSOLE: &[EcallMethod] = &[
    EcallMethod {
        name: "WriteLine",
        function: NativeFunction::Void0(console_write_line_empty),
    },
    EcallMethod {
        name: "WriteLine",
        function: NativeFunction::Void1(console_write_line),
    },
    EcallMethod {
        name: "Write",
        function: NativeFunction::Void1(console_write),
    },
];

static MATH: &[EcallMethod] = &[
    EcallMethod {
        name: "Abs",
        function: NativeFunction::Return1(math_abs),
    },
    EcallMethod {
        name: "Max",
        function: NativeFunction::Return2(math_max),
    },
    EcallMethod {
        name: "Min",
        function: NativeFunction::Return2(math_min),
    },
];

fn format_value(context: &EcallContext<'_>, value: &Value) -> Result<String> {
    Ok(match value {
        Value::ObjectRef(object) if object.is_null() => String::new(),
        Value::ObjectRef(object) => context.heap.read_string(*object)?.to_string_lossy(),
        Value::I32(value) => value.to_string(),
        Value::I64(value) | Value::NativeInt(value) => value.to_string(),
        Value::F32(value) => value.to_string(),
        Value::F64(value) => value.to_string(),
        other => other.to_string(),
    })
}

fn console_write_line_empty(context: &mut EcallContext<'_>) -> Result<()> {
    writeln!(context.output)?;
    Ok(())
}

fn console_write_line(context: &mut EcallContext<'_>, value: Value) -> Result<()> {
    let text = format_value(context, &value)?;
    writeln!(context.output, "{text}")?;
    Ok(())
}

fn console_write(context: &mut EcallContext<'_>, value: Value) -> Result<()> {
    let text = format_value(context, &value)?;
    write!(context.output, "{text}")?;
    Ok(())
}

fn math_abs(_context: &mut EcallContext<'_>, value: Value) -> Result<Value> {
    match value.as_i32()?.checked_abs() {
        Some(result) => Ok(Value::I32(result)),
        None => Err(ExecutionError::Overflow.into()),
    }
}

fn math_max(_context: &mut EcallContext<'_>, a: Value, b: Value) -> Result<Value> {
    Ok(Value::I32(a.as_i32()?.max(b.as_i32()?)))
}

fn math_min(_context: &mut EcallContext<'_>, a: Value, b: Value) -> Result<Value> {
    Ok(Value::I32(a.as_i32()?.min(b.as_i32()?)))
}
