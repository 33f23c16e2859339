//! Column layouts of all metadata tables (ECMA-335 II.22).
//!
//! The table stream stores rows back to back without any per-table length, so the base offset
//! of a table can only be found by knowing the row width of every table before it. That width
//! depends on the column kinds below and on the current [`TableInfo`]. The same schema drives
//! the row writer of [`crate::builder`].

use crate::metadata::tables::{CodedIndexType, TableId, TableInfo};

/// The kind of a single table column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    /// 1 byte constant
    U8,
    /// 2 byte constant
    U16,
    /// 4 byte constant
    U32,
    /// Index into `#Strings`
    Str,
    /// Index into `#GUID`
    Guid,
    /// Index into `#Blob`
    Blob,
    /// Index into one table
    Table(TableId),
    /// Coded index into one of several tables
    Coded(CodedIndexType),
}

impl Column {
    /// Width of the column in bytes
    #[must_use]
    pub fn size(&self, info: &TableInfo) -> usize {
        usize::from(match self {
            Column::U8 => 1,
            Column::U16 => 2,
            Column::U32 => 4,
            Column::Str => info.str_bytes(),
            Column::Guid => info.guid_bytes(),
            Column::Blob => info.blob_bytes(),
            Column::Table(table) => info.table_index_bytes(*table),
            Column::Coded(coded) => info.coded_index_bytes(*coded),
        })
    }
}

use self::Column::{Blob, Coded, Guid, Str, Table, U16, U32, U8};
use crate::metadata::tables::CodedIndexType as CI;

impl TableId {
    /// The columns of one row of this table, in on-disk order
    #[must_use]
    pub fn columns(&self) -> &'static [Column] {
        match self {
            TableId::Module => &[U16, Str, Guid, Guid, Guid],
            TableId::TypeRef => &[Coded(CI::ResolutionScope), Str, Str],
            TableId::TypeDef => &[
                U32,
                Str,
                Str,
                Coded(CI::TypeDefOrRef),
                Table(TableId::Field),
                Table(TableId::MethodDef),
            ],
            TableId::FieldPtr => &[Table(TableId::Field)],
            TableId::Field => &[U16, Str, Blob],
            TableId::MethodPtr => &[Table(TableId::MethodDef)],
            TableId::MethodDef => &[U32, U16, U16, Str, Blob, Table(TableId::Param)],
            TableId::ParamPtr => &[Table(TableId::Param)],
            TableId::Param => &[U16, U16, Str],
            TableId::InterfaceImpl => &[Table(TableId::TypeDef), Coded(CI::TypeDefOrRef)],
            TableId::MemberRef => &[Coded(CI::MemberRefParent), Str, Blob],
            TableId::Constant => &[U8, U8, Coded(CI::HasConstant), Blob],
            TableId::CustomAttribute => &[
                Coded(CI::HasCustomAttribute),
                Coded(CI::CustomAttributeType),
                Blob,
            ],
            TableId::FieldMarshal => &[Coded(CI::HasFieldMarshal), Blob],
            TableId::DeclSecurity => &[U16, Coded(CI::HasDeclSecurity), Blob],
            TableId::ClassLayout => &[U16, U32, Table(TableId::TypeDef)],
            TableId::FieldLayout => &[U32, Table(TableId::Field)],
            TableId::StandAloneSig => &[Blob],
            TableId::EventMap => &[Table(TableId::TypeDef), Table(TableId::Event)],
            TableId::EventPtr => &[Table(TableId::Event)],
            TableId::Event => &[U16, Str, Coded(CI::TypeDefOrRef)],
            TableId::PropertyMap => &[Table(TableId::TypeDef), Table(TableId::Property)],
            TableId::PropertyPtr => &[Table(TableId::Property)],
            TableId::Property => &[U16, Str, Blob],
            TableId::MethodSemantics => &[
                U16,
                Table(TableId::MethodDef),
                Coded(CI::HasSemantics),
            ],
            TableId::MethodImpl => &[
                Table(TableId::TypeDef),
                Coded(CI::MethodDefOrRef),
                Coded(CI::MethodDefOrRef),
            ],
            TableId::ModuleRef => &[Str],
            TableId::TypeSpec => &[Blob],
            TableId::ImplMap => &[
                U16,
                Coded(CI::MemberForwarded),
                Str,
                Table(TableId::ModuleRef),
            ],
            TableId::FieldRVA => &[U32, Table(TableId::Field)],
            TableId::EncLog => &[U32, U32],
            TableId::EncMap => &[U32],
            TableId::Assembly => &[U32, U16, U16, U16, U16, U32, Blob, Str, Str],
            TableId::AssemblyProcessor => &[U32],
            TableId::AssemblyOS => &[U32, U32, U32],
            TableId::AssemblyRef => &[U16, U16, U16, U16, U32, Blob, Str, Str, Blob],
            TableId::AssemblyRefProcessor => &[U32, Table(TableId::AssemblyRef)],
            TableId::AssemblyRefOS => &[U32, U32, U32, Table(TableId::AssemblyRef)],
            TableId::File => &[U32, Str, Blob],
            TableId::ExportedType => &[U32, U32, Str, Str, Coded(CI::Implementation)],
            TableId::ManifestResource => &[U32, U32, Str, Coded(CI::Implementation)],
            TableId::NestedClass => &[Table(TableId::TypeDef), Table(TableId::TypeDef)],
            TableId::GenericParam => &[U16, U16, Coded(CI::TypeOrMethodDef), Str],
            TableId::MethodSpec => &[Coded(CI::MethodDefOrRef), Blob],
            TableId::GenericParamConstraint => &[
                Table(TableId::GenericParam),
                Coded(CI::TypeDefOrRef),
            ],
        }
    }

    /// Width of one row of this table under `info`
    #[must_use]
    pub fn row_size(&self, info: &TableInfo) -> usize {
        self.columns().iter().map(|column| column.size(info)).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn small_row_sizes() {
        let info = TableInfo::new_test(&[], false, false, false);

        assert_eq!(TableId::Module.row_size(&info), 10);
        assert_eq!(TableId::TypeRef.row_size(&info), 6);
        assert_eq!(TableId::TypeDef.row_size(&info), 14);
        assert_eq!(TableId::Field.row_size(&info), 6);
        assert_eq!(TableId::MethodDef.row_size(&info), 14);
        assert_eq!(TableId::Param.row_size(&info), 6);
        assert_eq!(TableId::MemberRef.row_size(&info), 6);
        assert_eq!(TableId::Constant.row_size(&info), 6);
        assert_eq!(TableId::StandAloneSig.row_size(&info), 2);
        assert_eq!(TableId::Assembly.row_size(&info), 22);
        assert_eq!(TableId::AssemblyRef.row_size(&info), 20);
    }

    #[test]
    fn large_row_sizes() {
        let info = TableInfo::new_test(
            &[(TableId::Field, 70_000), (TableId::TypeSpec, 0x4000)],
            true,
            true,
            true,
        );

        // flags + 2 x str + coded(4) + field(4) + method(2)
        assert_eq!(TableId::TypeDef.row_size(&info), 4 + 4 + 4 + 4 + 4 + 2);
        assert_eq!(TableId::Module.row_size(&info), 2 + 4 + 4 + 4 + 4);
    }

    #[test]
    fn every_table_has_columns() {
        for table in TableId::iter() {
            assert!(!table.columns().is_empty(), "{table:?}");
        }
    }
}
