//! External-call Bridge: methods implemented by native Rust functions.
//!
//! Methods whose implementation flags carry `InternalCall` have no bytecode. While a module is
//! loaded, each of them is looked up in the [`EcallRegistry`] by namespace, type name, method name
//! and argument count (receiver included), and the found [`NativeFunction`] is recorded on the
//! method descriptor. When the engine executes such a method it pops the declared arguments and
//! hands them, in declaration order, to the function through an arity matched trampoline.
//!
//! # Example
//!
//! ```rust
//! use minclr::execution::{EcallContext, EcallGroup, EcallMethod, EcallRegistry, NativeFunction, Value};
//!
//! fn answer(_context: &mut EcallContext<'_>) -> minclr::Result<Value> {
//!     Ok(Value::I32(42))
//! }
//!
//! static ORACLE: &[EcallMethod] = &[EcallMethod {
//!     name: "Answer",
//!     function: NativeFunction::Return0(answer),
//! }];
//!
//! let mut registry = EcallRegistry::with_builtins();
//! registry.register(EcallGroup {
//!     namespace: "Demo",
//!     type_name: "Oracle",
//!     methods: ORACLE,
//! });
//!
//! assert!(registry.lookup("Demo", "Oracle", "Answer", 0).is_some());
//! assert!(registry.lookup("Demo", "Oracle", "Answer", 1).is_none());
//! assert!(registry.lookup("System", "Console", "WriteLine", 1).is_some());
//! ```

mod builtins;

use std::{fmt, io::Write};

use crate::{
    execution::{ExecutionError, ObjectHeap, Value},
    Result,
};

/// What a native function can reach while it runs.
pub struct EcallContext<'a> {
    /// The heap of the calling engine, used to decode string arguments
    pub heap: &'a ObjectHeap,
    /// The engine's output sink (stdout unless redirected)
    pub output: &'a mut dyn Write,
}

macro_rules! as_value {
    ($arg:ident) => {
        Value
    };
}

macro_rules! native_functions {
    ($( $arity:literal: $void:ident, $returning:ident ($($arg:ident),*); )*) => {
        /// A native entry point, tagged with its arity and whether it returns a value.
        #[derive(Clone, Copy)]
        pub enum NativeFunction {
            $(
                #[doc = concat!("Takes ", $arity, " arguments, returns nothing")]
                $void(fn(&mut EcallContext<'_> $(, as_value!($arg))*) -> Result<()>),
                #[doc = concat!("Takes ", $arity, " arguments, returns a value")]
                $returning(fn(&mut EcallContext<'_> $(, as_value!($arg))*) -> Result<Value>),
            )*
        }

        impl NativeFunction {
            /// Number of arguments the function takes
            #[must_use]
            pub fn arity(&self) -> usize {
                match self {
                    $( NativeFunction::$void(_) | NativeFunction::$returning(_) => $arity, )*
                }
            }

            /// True if the function pushes a return value
            #[must_use]
            pub fn returns_value(&self) -> bool {
                match self {
                    $(
                        NativeFunction::$void(_) => false,
                        NativeFunction::$returning(_) => true,
                    )*
                }
            }

            /// Call the function with `args`
            ///
            /// # Errors
            /// Returns [`ExecutionError::ArgumentCountMismatch`] if `args` does not match the
            /// arity, or whatever the function itself fails with.
            pub fn invoke(&self, context: &mut EcallContext<'_>, args: &[Value]) -> Result<Option<Value>> {
                match self {
                    $(
                        NativeFunction::$void(function) => {
                            let [$($arg),*] = args else {
                                return Err(self.arity_mismatch(args));
                            };
                            function(context $(, $arg.clone())*)?;
                            Ok(None)
                        }
                        NativeFunction::$returning(function) => {
                            let [$($arg),*] = args else {
                                return Err(self.arity_mismatch(args));
                            };
                            Ok(Some(function(context $(, $arg.clone())*)?))
                        }
                    )*
                }
            }
        }
    };
}

native_functions! {
    0: Void0, Return0();
    1: Void1, Return1(a);
    2: Void2, Return2(a, b);
    3: Void3, Return3(a, b, c);
    4: Void4, Return4(a, b, c, d);
}

impl NativeFunction {
    fn arity_mismatch(&self, args: &[Value]) -> crate::Error {
        ExecutionError::ArgumentCountMismatch {
            expected: self.arity(),
            found: args.len(),
        }
        .into()
    }
}

impl fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "NativeFunction(arity: {}, returns: {})",
            self.arity(),
            self.returns_value()
        )
    }
}

/// One natively implemented method.
#[derive(Debug, Clone, Copy)]
pub struct EcallMethod {
    /// Method name as it appears in metadata
    pub name: &'static str,
    /// The implementation
    pub function: NativeFunction,
}

/// The natively implemented methods of one type.
#[derive(Debug, Clone, Copy)]
pub struct EcallGroup {
    /// Namespace of the type
    pub namespace: &'static str,
    /// Name of the type
    pub type_name: &'static str,
    /// The methods, overloads of different arity may share a name
    pub methods: &'static [EcallMethod],
}

/// Registry of native method groups, searched linearly.
#[derive(Debug, Clone, Default)]
pub struct EcallRegistry {
    groups: Vec<EcallGroup>,
}

impl EcallRegistry {
    /// A registry without any native methods
    #[must_use]
    pub fn empty() -> Self {
        EcallRegistry { groups: Vec::new() }
    }

    /// A registry with the built-in `System.Console` and `System.Math` groups
    #[must_use]
    pub fn with_builtins() -> Self {
        EcallRegistry {
            groups: builtins::GROUPS.to_vec(),
        }
    }

    /// Add a group; groups registered later are searched last
    pub fn register(&mut self, group: EcallGroup) {
        self.groups.push(group);
    }

    /// Find a native implementation
    ///
    /// ## Arguments
    /// * 'namespace'   - Namespace of the declaring type
    /// * 'type_name'   - Name of the declaring type
    /// * 'method'      - Method name
    /// * 'arg_count'   - Number of arguments, receiver included
    #[must_use]
    pub fn lookup(
        &self,
        namespace: &str,
        type_name: &str,
        method: &str,
        arg_count: usize,
    ) -> Option<NativeFunction> {
        self.groups
            .iter()
            .filter(|group| group.namespace == namespace && group.type_name == type_name)
            .flat_map(|group| group.methods.iter())
            .find(|candidate| candidate.name == method && candidate.function.arity() == arg_count)
            .map(|candidate| candidate.function)
    }

    /// Number of registered groups
    #[must_use]
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn add(_context: &mut EcallContext<'_>, a: Value, b: Value) -> Result<Value> {
        Ok(Value::I32(a.as_i32()? + b.as_i32()?))
    }

    fn noop(_context: &mut EcallContext<'_>) -> Result<()> {
        Ok(())
    }

    #[test]
    fn invoke_checks_arity() {
        let heap = ObjectHeap::with_capacity(64);
        let mut output = Vec::new();
        let mut context = EcallContext {
            heap: &heap,
            output: &mut output,
        };

        let function = NativeFunction::Return2(add);
        assert_eq!(function.arity(), 2);
        assert!(function.returns_value());
        assert_eq!(
            function
                .invoke(&mut context, &[Value::I32(2), Value::I32(3)])
                .unwrap(),
            Some(Value::I32(5))
        );
        assert!(matches!(
            function.invoke(&mut context, &[Value::I32(2)]),
            Err(crate::Error::Execution(ExecutionError::ArgumentCountMismatch {
                expected: 2,
                found: 1
            }))
        ));

        let function = NativeFunction::Void0(noop);
        assert_eq!(function.invoke(&mut context, &[]).unwrap(), None);
    }

    #[test]
    fn lookup_by_arity() {
        let registry = EcallRegistry::with_builtins();

        assert!(registry.lookup("System", "Console", "WriteLine", 0).is_some());
        assert!(registry.lookup("System", "Console", "WriteLine", 1).is_some());
        assert!(registry.lookup("System", "Console", "WriteLine", 3).is_none());
        assert!(registry.lookup("System", "Math", "Max", 2).is_some());
        assert!(registry.lookup("System", "Math", "Max", 1).is_none());
        assert!(registry.lookup("System", "Console", "Beep", 0).is_none());

        assert_eq!(EcallRegistry::empty().group_count(), 0);
        assert!(EcallRegistry::empty()
            .lookup("System", "Console", "WriteLine", 0)
            .is_none());
    }
}
