//! Binder: name based lookup of loaded classes, methods and fields.
//!
//! The loader identifies everything by arena id, but native code, the command line and the
//! runtime itself need to find entities by name, e.g. `System.Console::WriteLine` or the
//! primitive types of the core library. [`Binder`] performs these lookups with plain linear
//! scans over a [`TypeSystem`]; a miss is reported as `None`, never as an error.
//!
//! [`WellKnownTypes`] binds the fixed set of built-in types of the core library once and hands
//! them out in O(1).
//!
//! # Example
//!
//! ```rust,no_run
//! use minclr::{binder::Binder, execution::EcallRegistry, typesystem::TypeSystem, File};
//! use std::path::Path;
//!
//! let mut types = TypeSystem::new(EcallRegistry::with_builtins());
//! types.load(File::from_file(Path::new("corlib.dll"))?)?;
//!
//! let binder = Binder::new(&types);
//! if let Some(method) = binder.bind_method("System", "Math", "Max") {
//!     println!("{}", types.method_name(method));
//! }
//! # Ok::<(), minclr::Error>(())
//! ```

mod wellknown;

pub use wellknown::{WellKnownType, WellKnownTypes};

use crate::typesystem::{ClassId, FieldId, MethodId, ModuleId, TypeSystem};

/// Resolves `(namespace, type, member)` names against the loaded modules.
#[derive(Clone, Copy)]
pub struct Binder<'a> {
    types: &'a TypeSystem,
}

impl<'a> Binder<'a> {
    /// Create a binder over `types`
    #[must_use]
    pub fn new(types: &'a TypeSystem) -> Self {
        Binder { types }
    }

    /// Find a class by name in any loaded module, earliest loaded first
    #[must_use]
    pub fn bind_type(&self, namespace: &str, name: &str) -> Option<ClassId> {
        self.types
            .classes()
            .find(|(_, class)| class.is_named(namespace, name))
            .map(|(id, _)| id)
    }

    /// Find a class by name inside one module
    #[must_use]
    pub fn bind_type_in(&self, module: ModuleId, namespace: &str, name: &str) -> Option<ClassId> {
        self.types
            .module(module)?
            .classes
            .iter()
            .map(ClassId::new)
            .find(|id| {
                self.types
                    .class(*id)
                    .is_some_and(|class| class.is_named(namespace, name))
            })
    }

    /// Find the first method called `method` on the class `namespace.type_name`
    #[must_use]
    pub fn bind_method(&self, namespace: &str, type_name: &str, method: &str) -> Option<MethodId> {
        let class = self.bind_type(namespace, type_name)?;
        self.method_of(class, method)
    }

    /// [`Binder::bind_method`] restricted to one module
    #[must_use]
    pub fn bind_method_in(
        &self,
        module: ModuleId,
        namespace: &str,
        type_name: &str,
        method: &str,
    ) -> Option<MethodId> {
        let class = self.bind_type_in(module, namespace, type_name)?;
        self.method_of(class, method)
    }

    /// Find the field called `field` on the class `namespace.type_name`
    #[must_use]
    pub fn bind_field(&self, namespace: &str, type_name: &str, field: &str) -> Option<FieldId> {
        let class = self.bind_type(namespace, type_name)?;
        self.field_of(class, field)
    }

    /// [`Binder::bind_field`] restricted to one module
    #[must_use]
    pub fn bind_field_in(
        &self,
        module: ModuleId,
        namespace: &str,
        type_name: &str,
        field: &str,
    ) -> Option<FieldId> {
        let class = self.bind_type_in(module, namespace, type_name)?;
        self.field_of(class, field)
    }

    fn method_of(&self, class: ClassId, name: &str) -> Option<MethodId> {
        self.types
            .class_methods(class)
            .find(|(_, method)| method.name == name)
            .map(|(id, _)| id)
    }

    fn field_of(&self, class: ClassId, name: &str) -> Option<FieldId> {
        self.types
            .class_fields(class)
            .find(|(_, field)| field.name == name)
            .map(|(id, _)| id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::{load_corlib, load_program};

    #[test]
    fn bind_core_types() {
        let (types, corlib) = load_corlib();
        let binder = Binder::new(&types);

        let int32 = binder.bind_type("System", "Int32").unwrap();
        assert_eq!(types.class(int32).unwrap().full_name(), "System.Int32");
        assert_eq!(binder.bind_type_in(corlib, "System", "Int32"), Some(int32));
        assert!(binder.bind_type("System", "Missing").is_none());
        assert!(binder.bind_type("", "Int32").is_none());
    }

    #[test]
    fn bind_members() {
        let (types, corlib) = load_corlib();
        let binder = Binder::new(&types);

        let max = binder.bind_method("System", "Math", "Max").unwrap();
        assert_eq!(types.method_name(max), "System.Math::Max");
        assert_eq!(binder.bind_method_in(corlib, "System", "Math", "Max"), Some(max));
        assert!(binder.bind_method("System", "Math", "Pow").is_none());

        let value = binder.bind_field("System", "Int32", "m_value").unwrap();
        assert_eq!(types.field(value).unwrap().name, "m_value");
        assert!(binder.bind_field("System", "Int32", "missing").is_none());
    }

    #[test]
    fn module_scoped_lookups() {
        let (types, corlib, program) = load_program();
        let binder = Binder::new(&types);

        assert!(binder.bind_type_in(program, "System", "Object").is_none());
        assert!(binder.bind_type_in(corlib, "Demo", "Program").is_none());
        assert!(binder.bind_type_in(program, "Demo", "Program").is_some());
        assert!(binder.bind_field_in(program, "System", "Int32", "m_value").is_none());
        assert!(binder
            .bind_method_in(ModuleId::new(99), "Demo", "Program", "Main")
            .is_none());
    }
}
