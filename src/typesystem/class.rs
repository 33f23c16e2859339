//! Type descriptors.

use std::{fmt, sync::RwLock};

use crate::{
    metadata::{tables::TypeAttributes, token::Token},
    typesystem::{IdRange, ModuleId},
    Error::LockError,
    Result,
};

/// How far the layout of a class has progressed.
///
/// Levels only ever increase. `InstanceFieldsInProgress` is held while the instance layout is
/// being computed; meeting it again means a value type contains itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LoadLevel {
    /// Only names and member ranges are known
    NotLoaded,
    /// The instance layout is being computed
    InstanceFieldsInProgress,
    /// Instance size, alignment and field offsets are known
    InstanceFieldsLoaded,
    /// Static storage is laid out and allocated
    StaticFieldsLoaded,
}

/// The in-memory representation of one type definition.
pub struct EEClass {
    /// The module defining the class
    pub module: ModuleId,
    /// The `TypeDef` token
    pub token: Token,
    /// Namespace, empty for the global namespace
    pub namespace: String,
    /// Simple name
    pub name: String,
    /// Type attributes of the `TypeDef` row
    pub flags: TypeAttributes,
    /// The resolved base class, `None` for `System.Object`, interfaces and unresolved parents
    pub parent: Option<super::ClassId>,
    /// True if instances are stored inline (the class derives from `System.ValueType` or
    /// `System.Enum`)
    pub is_value_type: bool,
    /// The owned methods
    pub methods: IdRange,
    /// The owned fields
    pub fields: IdRange,
    /// Bytes of instance storage, parent fields included, header excluded
    pub instance_size: usize,
    /// Alignment of the instance storage
    pub alignment: usize,
    /// Bytes of static storage
    pub static_size: usize,
    /// The static storage buffer, zero filled
    pub statics: RwLock<Vec<u8>>,
    /// Layout progress
    pub load_level: LoadLevel,
}

impl EEClass {
    pub(crate) fn new(module: ModuleId, token: Token, namespace: String, name: String) -> Self {
        EEClass {
            module,
            token,
            namespace,
            name,
            flags: TypeAttributes::empty(),
            parent: None,
            is_value_type: false,
            methods: IdRange::default(),
            fields: IdRange::default(),
            instance_size: 0,
            alignment: 1,
            static_size: 0,
            statics: RwLock::new(Vec::new()),
            load_level: LoadLevel::NotLoaded,
        }
    }

    #[cfg(test)]
    pub(crate) fn synthetic(namespace: &str, name: &str) -> Self {
        EEClass::new(
            ModuleId::new(0),
            Token::from_parts(0x02, 1),
            namespace.to_string(),
            name.to_string(),
        )
    }

    /// `Namespace.Name`, or just the name for the global namespace
    #[must_use]
    pub fn full_name(&self) -> String {
        if self.namespace.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", self.namespace, self.name)
        }
    }

    /// True if this is the class named `namespace.name`
    #[must_use]
    pub fn is_named(&self, namespace: &str, name: &str) -> bool {
        self.name == name && self.namespace == namespace
    }

    /// Copy `len` bytes of static storage at `offset`
    ///
    /// # Errors
    /// Returns [`crate::Error::LockError`] if the storage lock is poisoned and
    /// [`crate::Error::OutOfBounds`] if the range exceeds the storage.
    pub fn read_static(&self, offset: usize, len: usize) -> Result<Vec<u8>> {
        let statics = self.statics.read().map_err(|_| LockError)?;
        statics
            .get(offset..offset + len)
            .map(<[u8]>::to_vec)
            .ok_or(crate::Error::OutOfBounds)
    }

    /// Overwrite static storage at `offset`
    ///
    /// # Errors
    /// Returns [`crate::Error::LockError`] if the storage lock is poisoned and
    /// [`crate::Error::OutOfBounds`] if the range exceeds the storage.
    pub fn write_static(&self, offset: usize, bytes: &[u8]) -> Result<()> {
        let mut statics = self.statics.write().map_err(|_| LockError)?;
        match statics.get_mut(offset..offset + bytes.len()) {
            Some(target) => {
                target.copy_from_slice(bytes);
                Ok(())
            }
            None => Err(crate::Error::OutOfBounds),
        }
    }
}

impl fmt::Debug for EEClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EEClass")
            .field("name", &self.full_name())
            .field("token", &self.token)
            .field("parent", &self.parent)
            .field("is_value_type", &self.is_value_type)
            .field("methods", &self.methods)
            .field("fields", &self.fields)
            .field("instance_size", &self.instance_size)
            .field("alignment", &self.alignment)
            .field("static_size", &self.static_size)
            .field("load_level", &self.load_level)
            .finish_non_exhaustive()
    }
}
