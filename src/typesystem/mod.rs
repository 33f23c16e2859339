//! Type System Builder: classes, methods and fields of loaded modules.
//!
//! [`TypeSystem::load`] turns the metadata tables of one image into descriptors stored in three
//! arenas, addressed by [`ClassId`], [`MethodId`] and [`FieldId`]. The tables only store where
//! the method and field list of a type starts, so every type owns the rows from its own list
//! start up to the next type's list start, which makes the members of one class a contiguous
//! [`IdRange`].
//!
//! Loading runs five passes over the tables of the image:
//!
//! 1. `TypeDef` rows become [`EEClass`]es, member ranges are sliced and every method and field
//!    row is backlinked to its owner
//! 2. `MethodDef` rows become [`MethodDesc`]s; internal calls are bound through the
//!    [`EcallRegistry`], all other methods with an RVA get their body header parsed
//! 3. `Field` rows become [`FieldDesc`]s
//! 4. instance layout of every class ([`LoadLevel::InstanceFieldsLoaded`])
//! 5. static layout and storage of every class ([`LoadLevel::StaticFieldsLoaded`])
//!
//! Value type fields need the layout of their class, which is computed on demand in pass 4;
//! a value type that contains itself is detected through [`LoadLevel::InstanceFieldsInProgress`].
//!
//! Frame layouts of methods are derived lazily from their signatures the first time a method
//! runs. Together with the `RwLock` around static storage this keeps a loaded `TypeSystem`
//! usable from several engines at once.
//!
//! # Example
//!
//! ```rust,no_run
//! use minclr::{execution::EcallRegistry, typesystem::TypeSystem, File};
//! use std::path::Path;
//!
//! let mut types = TypeSystem::new(EcallRegistry::with_builtins());
//! let corlib = types.load(File::from_file(Path::new("corlib.dll"))?)?;
//! let program = types.load(File::from_file(Path::new("Program.dll"))?)?;
//!
//! for (id, class) in types.classes() {
//!     println!("{id}: {} ({} bytes)", class.full_name(), class.instance_size);
//! }
//! # Ok::<(), minclr::Error>(())
//! ```

mod class;
mod field;
mod ids;
mod layout;
mod loader;
mod method;
mod module;
mod resolver;
mod vardesc;

pub use class::{EEClass, LoadLevel};
pub use field::FieldDesc;
pub use ids::{ClassId, FieldId, IdRange, MethodId, ModuleId};
pub use layout::{pack_fields, FieldSlot, PackedLayout};
pub use method::{BytecodeBody, FrameLayout, MethodDesc, MethodImplementation};
pub use module::{LoadedModule, MemberRefInfo, TypeRefInfo};
pub use vardesc::{align_up, ElementType, TypeDesc, TypeModifiers, VarDesc, POINTER_SIZE};

use crate::{execution::EcallRegistry, metadata::token::Token, Result};

/// All modules loaded into one virtual machine.
pub struct TypeSystem {
    ecalls: EcallRegistry,
    modules: Vec<LoadedModule>,
    classes: Vec<EEClass>,
    methods: Vec<MethodDesc>,
    fields: Vec<FieldDesc>,
}

impl TypeSystem {
    /// Create an empty type system that binds internal calls against `ecalls`
    #[must_use]
    pub fn new(ecalls: EcallRegistry) -> Self {
        TypeSystem {
            ecalls,
            modules: Vec::new(),
            classes: Vec::new(),
            methods: Vec::new(),
            fields: Vec::new(),
        }
    }

    /// The registry internal calls are bound against
    #[must_use]
    pub fn ecalls(&self) -> &EcallRegistry {
        &self.ecalls
    }

    /// A class descriptor
    #[must_use]
    pub fn class(&self, id: ClassId) -> Option<&EEClass> {
        self.classes.get(id.index())
    }

    /// A method descriptor
    #[must_use]
    pub fn method(&self, id: MethodId) -> Option<&MethodDesc> {
        self.methods.get(id.index())
    }

    /// A field descriptor
    #[must_use]
    pub fn field(&self, id: FieldId) -> Option<&FieldDesc> {
        self.fields.get(id.index())
    }

    /// A loaded module
    #[must_use]
    pub fn module(&self, id: ModuleId) -> Option<&LoadedModule> {
        self.modules.get(id.index())
    }

    /// All loaded modules in load order
    pub fn modules(&self) -> impl Iterator<Item = (ModuleId, &LoadedModule)> {
        self.modules
            .iter()
            .enumerate()
            .map(|(index, module)| (ModuleId::new(index as u32), module))
    }

    /// All classes of all modules in load order
    pub fn classes(&self) -> impl Iterator<Item = (ClassId, &EEClass)> {
        self.classes
            .iter()
            .enumerate()
            .map(|(index, class)| (ClassId::new(index as u32), class))
    }

    /// Number of loaded classes
    #[must_use]
    pub fn class_count(&self) -> usize {
        self.classes.len()
    }

    /// Number of loaded methods
    #[must_use]
    pub fn method_count(&self) -> usize {
        self.methods.len()
    }

    /// The methods owned by `class`, empty for an unknown id
    pub fn class_methods(&self, class: ClassId) -> impl Iterator<Item = (MethodId, &MethodDesc)> {
        let range = self.class(class).map(|class| class.methods).unwrap_or_default();
        range
            .iter()
            .filter_map(move |index| Some((MethodId::new(index), self.methods.get(index as usize)?)))
    }

    /// The fields owned by `class`, empty for an unknown id
    pub fn class_fields(&self, class: ClassId) -> impl Iterator<Item = (FieldId, &FieldDesc)> {
        let range = self.class(class).map(|class| class.fields).unwrap_or_default();
        range
            .iter()
            .filter_map(move |index| Some((FieldId::new(index), self.fields.get(index as usize)?)))
    }

    /// The bytecode of a method
    ///
    /// # Errors
    /// Returns [`crate::Error::NotSupported`] for methods without a bytecode body.
    pub fn method_code(&self, id: MethodId) -> Result<&[u8]> {
        let Some(method) = self.method(id) else {
            return Err(crate::Error::OutOfBounds);
        };

        let Some(body) = method.body() else {
            return Err(crate::Error::NotSupported(format!(
                "Method {} has no bytecode body",
                method.name
            )));
        };

        let Some(module) = self.module(method.module) else {
            return Err(crate::Error::OutOfBounds);
        };

        module.file.data_slice(body.begin, body.code_size())
    }

    /// The method named by the CLI header's entry point token of `module`
    #[must_use]
    pub fn entry_point(&self, module: ModuleId) -> Option<MethodId> {
        let module_desc = self.module(module)?;
        if module_desc.entry_point.is_null() {
            return None;
        }

        self.resolve_method_token(module, module_desc.entry_point).ok()
    }

    /// `Namespace.Type::Method` of a method, used in logs and errors
    #[must_use]
    pub fn method_name(&self, id: MethodId) -> String {
        match self.method(id) {
            Some(method) => match self.class(method.class) {
                Some(class) => format!("{}::{}", class.full_name(), method.name),
                None => method.name.clone(),
            },
            None => id.to_string(),
        }
    }

    pub(crate) fn module_of_token(&self, module: ModuleId, token: Token) -> Result<&LoadedModule> {
        self.module(module)
            .ok_or_else(|| malformed_error!("Token {} refers to unknown module {}", token, module))
    }
}
