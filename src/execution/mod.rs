//! Execution of loaded methods.
//!
//! This module contains the runtime half of the virtual machine:
//!
//! - [`Engine`] - fetch/decode/dispatch interpreter with recursive calls
//! - [`EvaluationStack`] - typed values in one fixed capacity byte buffer
//! - [`ObjectHeap`] - bump allocator for class instances and strings
//! - [`EcallRegistry`] - native implementations of `InternalCall` methods
//! - [`EngineConfig`] - resource limits
//!
//! Values move between storage slots (arguments, locals, fields) and the evaluation stack as
//! [`Value`]s; small integer types are widened to `int32` on the stack.

mod config;
mod ecall;
mod error;
mod frame;
mod heap;
mod interpreter;
mod ops;
mod stack;
mod value;

pub use config::EngineConfig;
pub use ecall::{EcallContext, EcallGroup, EcallMethod, EcallRegistry, NativeFunction};
pub use error::ExecutionError;
pub use heap::{ObjectHeap, OBJECT_HEADER_SIZE};
pub use interpreter::Engine;
pub use ops::{BinaryOp, Condition, Conversion, UnaryOp};
pub use stack::EvaluationStack;
pub use value::{ObjectRef, Value};
