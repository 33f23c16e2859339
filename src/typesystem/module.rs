//! Loaded modules.

use std::sync::{Arc, OnceLock};

use widestring::U16String;

use crate::{
    execution::ExecutionError,
    metadata::{
        streams::UserStrings,
        tables::CodedIndex,
        token::{Token, USER_STRING_TABLE},
    },
    typesystem::{FieldId, IdRange, MethodId},
    File, Result,
};

/// A `TypeRef` row, kept by name for resolution across modules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeRefInfo {
    /// Namespace of the referenced type
    pub namespace: String,
    /// Name of the referenced type
    pub name: String,
}

/// A `MemberRef` row with its resolution cache.
#[derive(Debug)]
pub struct MemberRefInfo {
    /// The referenced member's parent (`MemberRefParent` coded index)
    pub parent: CodedIndex,
    /// Member name
    pub name: String,
    /// Method or field signature blob
    pub signature: Vec<u8>,
    pub(crate) method: OnceLock<MethodId>,
    pub(crate) field: OnceLock<FieldId>,
}

/// One image loaded into a [`crate::typesystem::TypeSystem`].
pub struct LoadedModule {
    /// Name from the `Module` table
    pub name: String,
    /// Name from the `Assembly` table, if the image is an assembly manifest
    pub assembly_name: Option<String>,
    /// Module version id
    pub mvid: Option<uguid::Guid>,
    /// Entry point token of the CLI header
    pub entry_point: Token,
    /// Classes defined by the module, in `TypeDef` order
    pub classes: IdRange,
    /// Methods defined by the module, in `MethodDef` order
    pub methods: IdRange,
    /// Fields defined by the module, in `Field` order
    pub fields: IdRange,
    pub(crate) type_refs: Vec<TypeRefInfo>,
    pub(crate) member_refs: Vec<MemberRefInfo>,
    pub(crate) file: Arc<File>,
    pub(crate) user_strings: Option<(usize, usize)>,
}

impl LoadedModule {
    /// The image backing the module
    #[must_use]
    pub fn file(&self) -> &Arc<File> {
        &self.file
    }

    /// The `TypeRef` rows of the module
    #[must_use]
    pub fn type_refs(&self) -> &[TypeRefInfo] {
        &self.type_refs
    }

    /// The `MemberRef` rows of the module
    #[must_use]
    pub fn member_refs(&self) -> &[MemberRefInfo] {
        &self.member_refs
    }

    /// Decode the string literal an `ldstr` token points at
    ///
    /// # Errors
    /// Returns [`ExecutionError::BadToken`] if `token` does not address the `#US` heap or the
    /// module has none, and [`crate::Error::BadMetadata`] for a corrupt entry.
    pub fn user_string(&self, token: Token) -> Result<U16String> {
        if token.table() != USER_STRING_TABLE {
            return Err(ExecutionError::BadToken(token).into());
        }

        let Some((offset, size)) = self.user_strings else {
            return Err(ExecutionError::BadToken(token).into());
        };

        UserStrings::from(self.file.data_slice(offset, size)?)?.get(token.row() as usize)
    }
}

impl std::fmt::Debug for LoadedModule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadedModule")
            .field("name", &self.name)
            .field("assembly_name", &self.assembly_name)
            .field("classes", &self.classes)
            .field("methods", &self.methods)
            .field("fields", &self.fields)
            .finish_non_exhaustive()
    }
}
