//! Typed rows of the tables the loader consumes.
//!
//! Each row keeps heap indices and table indices in their raw form; resolving them against the
//! heaps is the job of the [`crate::typesystem`] loader. Every row also remembers its 1-based
//! `rid`, the matching [`Token`] and the byte offset it was read from.

use crate::{
    file::io::{read_le_at, read_le_at_dyn},
    metadata::{
        tables::{CodedIndex, CodedIndexType, RowReadable, TableId, TableInfoRef},
        token::Token,
    },
    Result,
};

/// The `Module` table, exactly one row describing the current module. `TableId` = 0x00
#[derive(Clone, Debug)]
pub struct ModuleRaw {
    /// `RowID`
    pub rid: u32,
    /// Token
    pub token: Token,
    /// Offset
    pub offset: usize,
    /// Reserved, shall be zero
    pub generation: u32,
    /// An index into the String heap
    pub name: u32,
    /// An index into the Guid heap, identifies this module version
    pub mvid: u32,
    /// An index into the Guid heap, reserved
    pub encid: u32,
    /// An index into the Guid heap, reserved
    pub encbaseid: u32,
}

impl RowReadable for ModuleRaw {
    const TABLE: TableId = TableId::Module;

    fn row_read(data: &[u8], offset: &mut usize, rid: u32, sizes: &TableInfoRef) -> Result<Self> {
        Ok(ModuleRaw {
            rid,
            token: Token::from_parts(Self::TABLE as u8, rid),
            offset: *offset,
            generation: u32::from(read_le_at::<u16>(data, offset)?),
            name: read_le_at_dyn(data, offset, sizes.is_large_str())?,
            mvid: read_le_at_dyn(data, offset, sizes.is_large_guid())?,
            encid: read_le_at_dyn(data, offset, sizes.is_large_guid())?,
            encbaseid: read_le_at_dyn(data, offset, sizes.is_large_guid())?,
        })
    }
}

/// The `TypeRef` table, references to types defined in other modules or assemblies.
/// `TableId` = 0x01
#[derive(Clone, Debug)]
pub struct TypeRefRaw {
    /// `RowID`
    pub rid: u32,
    /// Token
    pub token: Token,
    /// Offset
    pub offset: usize,
    /// A `ResolutionScope` coded index: Module, `ModuleRef`, `AssemblyRef` or `TypeRef`
    pub resolution_scope: CodedIndex,
    /// An index into the String heap
    pub type_name: u32,
    /// An index into the String heap
    pub type_namespace: u32,
}

impl RowReadable for TypeRefRaw {
    const TABLE: TableId = TableId::TypeRef;

    fn row_read(data: &[u8], offset: &mut usize, rid: u32, sizes: &TableInfoRef) -> Result<Self> {
        Ok(TypeRefRaw {
            rid,
            token: Token::from_parts(Self::TABLE as u8, rid),
            offset: *offset,
            resolution_scope: CodedIndex::read(data, offset, sizes, CodedIndexType::ResolutionScope)?,
            type_name: read_le_at_dyn(data, offset, sizes.is_large_str())?,
            type_namespace: read_le_at_dyn(data, offset, sizes.is_large_str())?,
        })
    }
}

/// The `TypeDef` table, types defined in the current module. `TableId` = 0x02
#[derive(Clone, Debug)]
pub struct TypeDefRaw {
    /// `RowID`
    pub rid: u32,
    /// Token
    pub token: Token,
    /// Offset
    pub offset: usize,
    /// A 4-byte bitmask of type `TypeAttributes`
    pub flags: u32,
    /// An index into the String heap
    pub type_name: u32,
    /// An index into the String heap
    pub type_namespace: u32,
    /// A `TypeDefOrRef` coded index naming the base type, null for `System.Object` and interfaces
    pub extends: CodedIndex,
    /// An index into the Field table; first of a contiguous run of fields owned by this type
    pub field_list: u32,
    /// An index into the `MethodDef` table; first of a contiguous run of methods owned by this type
    pub method_list: u32,
}

impl RowReadable for TypeDefRaw {
    const TABLE: TableId = TableId::TypeDef;

    fn row_read(data: &[u8], offset: &mut usize, rid: u32, sizes: &TableInfoRef) -> Result<Self> {
        Ok(TypeDefRaw {
            rid,
            token: Token::from_parts(Self::TABLE as u8, rid),
            offset: *offset,
            flags: read_le_at::<u32>(data, offset)?,
            type_name: read_le_at_dyn(data, offset, sizes.is_large_str())?,
            type_namespace: read_le_at_dyn(data, offset, sizes.is_large_str())?,
            extends: CodedIndex::read(data, offset, sizes, CodedIndexType::TypeDefOrRef)?,
            field_list: read_le_at_dyn(data, offset, sizes.is_large(TableId::Field))?,
            method_list: read_le_at_dyn(data, offset, sizes.is_large(TableId::MethodDef))?,
        })
    }
}

/// The `Field` table. `TableId` = 0x04
#[derive(Clone, Debug)]
pub struct FieldRaw {
    /// `RowID`
    pub rid: u32,
    /// Token
    pub token: Token,
    /// Offset
    pub offset: usize,
    /// A 2-byte bitmask of type `FieldAttributes`
    pub flags: u32,
    /// An index into the String heap
    pub name: u32,
    /// An index into the Blob heap, the field signature
    pub signature: u32,
}

impl RowReadable for FieldRaw {
    const TABLE: TableId = TableId::Field;

    fn row_read(data: &[u8], offset: &mut usize, rid: u32, sizes: &TableInfoRef) -> Result<Self> {
        Ok(FieldRaw {
            rid,
            token: Token::from_parts(Self::TABLE as u8, rid),
            offset: *offset,
            flags: u32::from(read_le_at::<u16>(data, offset)?),
            name: read_le_at_dyn(data, offset, sizes.is_large_str())?,
            signature: read_le_at_dyn(data, offset, sizes.is_large_blob())?,
        })
    }
}

/// The `MethodDef` table. `TableId` = 0x06
#[derive(Clone, Debug)]
pub struct MethodDefRaw {
    /// `RowID`
    pub rid: u32,
    /// Token
    pub token: Token,
    /// Offset
    pub offset: usize,
    /// Relative virtual address of the method body, 0 if there is none
    pub rva: u32,
    /// A 2-byte bitmask of type `MethodImplAttributes`
    pub impl_flags: u32,
    /// A 2-byte bitmask of type `MethodAttributes`
    pub flags: u32,
    /// An index into the String heap
    pub name: u32,
    /// An index into the Blob heap, the method signature
    pub signature: u32,
    /// An index into the Param table; first of a contiguous run of parameters
    pub param_list: u32,
}

impl RowReadable for MethodDefRaw {
    const TABLE: TableId = TableId::MethodDef;

    fn row_read(data: &[u8], offset: &mut usize, rid: u32, sizes: &TableInfoRef) -> Result<Self> {
        Ok(MethodDefRaw {
            rid,
            token: Token::from_parts(Self::TABLE as u8, rid),
            offset: *offset,
            rva: read_le_at::<u32>(data, offset)?,
            impl_flags: u32::from(read_le_at::<u16>(data, offset)?),
            flags: u32::from(read_le_at::<u16>(data, offset)?),
            name: read_le_at_dyn(data, offset, sizes.is_large_str())?,
            signature: read_le_at_dyn(data, offset, sizes.is_large_blob())?,
            param_list: read_le_at_dyn(data, offset, sizes.is_large(TableId::Param))?,
        })
    }
}

/// The `Param` table. `TableId` = 0x08
#[derive(Clone, Debug)]
pub struct ParamRaw {
    /// `RowID`
    pub rid: u32,
    /// Token
    pub token: Token,
    /// Offset
    pub offset: usize,
    /// A 2-byte bitmask of type `ParamAttributes`
    pub flags: u32,
    /// Position of the parameter, 0 names the return value
    pub sequence: u32,
    /// An index into the String heap
    pub name: u32,
}

impl RowReadable for ParamRaw {
    const TABLE: TableId = TableId::Param;

    fn row_read(data: &[u8], offset: &mut usize, rid: u32, sizes: &TableInfoRef) -> Result<Self> {
        Ok(ParamRaw {
            rid,
            token: Token::from_parts(Self::TABLE as u8, rid),
            offset: *offset,
            flags: u32::from(read_le_at::<u16>(data, offset)?),
            sequence: u32::from(read_le_at::<u16>(data, offset)?),
            name: read_le_at_dyn(data, offset, sizes.is_large_str())?,
        })
    }
}

/// The `MemberRef` table, references to methods and fields of other types. `TableId` = 0x0A
#[derive(Clone, Debug)]
pub struct MemberRefRaw {
    /// `RowID`
    pub rid: u32,
    /// Token
    pub token: Token,
    /// Offset
    pub offset: usize,
    /// A `MemberRefParent` coded index naming the declaring type
    pub class: CodedIndex,
    /// An index into the String heap
    pub name: u32,
    /// An index into the Blob heap, a method or field signature
    pub signature: u32,
}

impl RowReadable for MemberRefRaw {
    const TABLE: TableId = TableId::MemberRef;

    fn row_read(data: &[u8], offset: &mut usize, rid: u32, sizes: &TableInfoRef) -> Result<Self> {
        Ok(MemberRefRaw {
            rid,
            token: Token::from_parts(Self::TABLE as u8, rid),
            offset: *offset,
            class: CodedIndex::read(data, offset, sizes, CodedIndexType::MemberRefParent)?,
            name: read_le_at_dyn(data, offset, sizes.is_large_str())?,
            signature: read_le_at_dyn(data, offset, sizes.is_large_blob())?,
        })
    }
}

/// The `StandAloneSig` table, local variable signatures of method bodies. `TableId` = 0x11
#[derive(Clone, Debug)]
pub struct StandAloneSigRaw {
    /// `RowID`
    pub rid: u32,
    /// Token
    pub token: Token,
    /// Offset
    pub offset: usize,
    /// An index into the Blob heap
    pub signature: u32,
}

impl RowReadable for StandAloneSigRaw {
    const TABLE: TableId = TableId::StandAloneSig;

    fn row_read(data: &[u8], offset: &mut usize, rid: u32, sizes: &TableInfoRef) -> Result<Self> {
        Ok(StandAloneSigRaw {
            rid,
            token: Token::from_parts(Self::TABLE as u8, rid),
            offset: *offset,
            signature: read_le_at_dyn(data, offset, sizes.is_large_blob())?,
        })
    }
}

/// The `TypeSpec` table, constructed types such as generic instantiations. `TableId` = 0x1B
#[derive(Clone, Debug)]
pub struct TypeSpecRaw {
    /// `RowID`
    pub rid: u32,
    /// Token
    pub token: Token,
    /// Offset
    pub offset: usize,
    /// An index into the Blob heap
    pub signature: u32,
}

impl RowReadable for TypeSpecRaw {
    const TABLE: TableId = TableId::TypeSpec;

    fn row_read(data: &[u8], offset: &mut usize, rid: u32, sizes: &TableInfoRef) -> Result<Self> {
        Ok(TypeSpecRaw {
            rid,
            token: Token::from_parts(Self::TABLE as u8, rid),
            offset: *offset,
            signature: read_le_at_dyn(data, offset, sizes.is_large_blob())?,
        })
    }
}

/// The `Assembly` table, identity of the current assembly. `TableId` = 0x20
#[derive(Clone, Debug)]
pub struct AssemblyRaw {
    /// `RowID`
    pub rid: u32,
    /// Token
    pub token: Token,
    /// Offset
    pub offset: usize,
    /// Hash algorithm of the manifest
    pub hash_alg_id: u32,
    /// Major version
    pub major_version: u32,
    /// Minor version
    pub minor_version: u32,
    /// Build number
    pub build_number: u32,
    /// Revision number
    pub revision_number: u32,
    /// A 4-byte bitmask of type `AssemblyFlags`
    pub flags: u32,
    /// An index into the Blob heap
    pub public_key: u32,
    /// An index into the String heap
    pub name: u32,
    /// An index into the String heap
    pub culture: u32,
}

impl RowReadable for AssemblyRaw {
    const TABLE: TableId = TableId::Assembly;

    fn row_read(data: &[u8], offset: &mut usize, rid: u32, sizes: &TableInfoRef) -> Result<Self> {
        Ok(AssemblyRaw {
            rid,
            token: Token::from_parts(Self::TABLE as u8, rid),
            offset: *offset,
            hash_alg_id: read_le_at::<u32>(data, offset)?,
            major_version: u32::from(read_le_at::<u16>(data, offset)?),
            minor_version: u32::from(read_le_at::<u16>(data, offset)?),
            build_number: u32::from(read_le_at::<u16>(data, offset)?),
            revision_number: u32::from(read_le_at::<u16>(data, offset)?),
            flags: read_le_at::<u32>(data, offset)?,
            public_key: read_le_at_dyn(data, offset, sizes.is_large_blob())?,
            name: read_le_at_dyn(data, offset, sizes.is_large_str())?,
            culture: read_le_at_dyn(data, offset, sizes.is_large_str())?,
        })
    }
}

/// The `AssemblyRef` table, assemblies this module depends on. `TableId` = 0x23
#[derive(Clone, Debug)]
pub struct AssemblyRefRaw {
    /// `RowID`
    pub rid: u32,
    /// Token
    pub token: Token,
    /// Offset
    pub offset: usize,
    /// Major version
    pub major_version: u32,
    /// Minor version
    pub minor_version: u32,
    /// Build number
    pub build_number: u32,
    /// Revision number
    pub revision_number: u32,
    /// A 4-byte bitmask of type `AssemblyFlags`
    pub flags: u32,
    /// An index into the Blob heap, the public key or its token
    pub public_key_or_token: u32,
    /// An index into the String heap
    pub name: u32,
    /// An index into the String heap
    pub culture: u32,
    /// An index into the Blob heap
    pub hash_value: u32,
}

impl RowReadable for AssemblyRefRaw {
    const TABLE: TableId = TableId::AssemblyRef;

    fn row_read(data: &[u8], offset: &mut usize, rid: u32, sizes: &TableInfoRef) -> Result<Self> {
        Ok(AssemblyRefRaw {
            rid,
            token: Token::from_parts(Self::TABLE as u8, rid),
            offset: *offset,
            major_version: u32::from(read_le_at::<u16>(data, offset)?),
            minor_version: u32::from(read_le_at::<u16>(data, offset)?),
            build_number: u32::from(read_le_at::<u16>(data, offset)?),
            revision_number: u32::from(read_le_at::<u16>(data, offset)?),
            flags: read_le_at::<u32>(data, offset)?,
            public_key_or_token: read_le_at_dyn(data, offset, sizes.is_large_blob())?,
            name: read_le_at_dyn(data, offset, sizes.is_large_str())?,
            culture: read_le_at_dyn(data, offset, sizes.is_large_str())?,
            hash_value: read_le_at_dyn(data, offset, sizes.is_large_blob())?,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::metadata::tables::{MetadataTable, TableInfo};

    #[test]
    fn typedef_crafted_short() {
        #[rustfmt::skip]
        let data = vec![
            0x00, 0x00, 0x00, 0x01, // flags
            0x42, 0x00, // type_name
            0x43, 0x00, // type_namespace
            0x00, 0x02, // extends
            0x00, 0x03, // field_list
            0x00, 0x04, // method_list
        ];

        let sizes = Arc::new(TableInfo::new_test(
            &[(TableId::Field, 1), (TableId::MethodDef, 1)],
            false,
            false,
            false,
        ));
        let table = MetadataTable::<TypeDefRaw>::new(&data, 1, sizes).unwrap();
        assert_eq!(table.row_size(), 14);

        let row = table.get(1).unwrap();
        assert_eq!(row.rid, 1);
        assert_eq!(row.token.value(), 0x0200_0001);
        assert_eq!(row.flags, 0x0100_0000);
        assert_eq!(row.type_name, 0x42);
        assert_eq!(row.type_namespace, 0x43);
        assert_eq!(row.extends, CodedIndex::new(TableId::TypeDef, 0x80));
        assert_eq!(row.field_list, 0x0300);
        assert_eq!(row.method_list, 0x0400);

        assert_eq!(table.iter().count(), 1);
    }

    #[test]
    fn typedef_crafted_long() {
        #[rustfmt::skip]
        let data = vec![
            0x00, 0x00, 0x00, 0x01, // flags
            0x00, 0x00, 0x00, 0x02, // type_name
            0x00, 0x00, 0x00, 0x03, // type_namespace
            0x00, 0x00, 0x00, 0x04, // extends
            0x00, 0x00, 0x00, 0x05, // field_list
            0x00, 0x00, 0x00, 0x06, // method_list
        ];

        let sizes = Arc::new(TableInfo::new_test(
            &[
                (TableId::Field, u32::from(u16::MAX) + 2),
                (TableId::MethodDef, u32::from(u16::MAX) + 2),
                (TableId::TypeDef, u32::from(u16::MAX) + 2),
            ],
            true,
            true,
            true,
        ));
        let table = MetadataTable::<TypeDefRaw>::new(&data, 1, sizes).unwrap();

        let row = table.get(1).unwrap();
        assert_eq!(row.type_name, 0x0200_0000);
        assert_eq!(row.type_namespace, 0x0300_0000);
        assert_eq!(row.extends, CodedIndex::new(TableId::TypeDef, 0x0100_0000));
        assert_eq!(row.field_list, 0x0500_0000);
        assert_eq!(row.method_list, 0x0600_0000);
    }

    #[test]
    fn methoddef_crafted() {
        #[rustfmt::skip]
        let data = vec![
            0x50, 0x20, 0x00, 0x00, // rva
            0x00, 0x10, // impl_flags
            0x96, 0x00, // flags
            0x0A, 0x00, // name
            0x01, 0x00, // signature
            0x01, 0x00, // param_list
        ];

        let sizes = Arc::new(TableInfo::new_test(&[(TableId::MethodDef, 1)], false, false, false));
        let table = MetadataTable::<MethodDefRaw>::new(&data, 1, sizes).unwrap();

        let row = table.get(1).unwrap();
        assert_eq!(row.token, Token::new(0x0600_0001));
        assert_eq!(row.rva, 0x2050);
        assert_eq!(row.impl_flags, 0x1000);
        assert_eq!(row.flags, 0x96);
        assert_eq!(row.name, 0x0A);
        assert_eq!(row.signature, 1);
        assert_eq!(row.param_list, 1);
    }

    #[test]
    fn memberref_crafted() {
        #[rustfmt::skip]
        let data = vec![
            0x09, 0x00, // class, TypeRef 1 (tag 1 of MemberRefParent)
            0x20, 0x00, // name
            0x05, 0x00, // signature
        ];

        let sizes = Arc::new(TableInfo::new_test(
            &[(TableId::MemberRef, 1), (TableId::TypeRef, 1)],
            false,
            false,
            false,
        ));
        let table = MetadataTable::<MemberRefRaw>::new(&data, 1, sizes).unwrap();

        let row = table.get(1).unwrap();
        assert_eq!(row.token, Token::new(0x0A00_0001));
        assert_eq!(row.class, CodedIndex::new(TableId::TypeRef, 1));
        assert_eq!(row.name, 0x20);
        assert_eq!(row.signature, 5);
    }

    #[test]
    fn row_out_of_range() {
        let data = vec![0x01, 0x00, 0x02, 0x00];
        let sizes = Arc::new(TableInfo::new_test(&[(TableId::StandAloneSig, 2)], false, false, false));
        let table = MetadataTable::<StandAloneSigRaw>::new(&data, 2, sizes).unwrap();

        assert_eq!(table.get(2).unwrap().signature, 2);
        assert!(matches!(
            table.get(0),
            Err(crate::Error::RowOutOfRange {
                table: TableId::StandAloneSig,
                row: 0
            })
        ));
        assert!(matches!(
            table.get(3),
            Err(crate::Error::RowOutOfRange {
                table: TableId::StandAloneSig,
                row: 3
            })
        ));
    }

    #[test]
    fn truncated_table() {
        let data = vec![0x01, 0x00, 0x02];
        let sizes = Arc::new(TableInfo::new_test(&[(TableId::StandAloneSig, 2)], false, false, false));
        assert!(matches!(
            MetadataTable::<StandAloneSigRaw>::new(&data, 2, sizes),
            Err(crate::Error::BadMetadata { .. })
        ));
    }
}
