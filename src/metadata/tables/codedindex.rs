use strum::{EnumCount, EnumIter};

use crate::{
    file::io::read_le_at,
    metadata::{
        tables::{TableId, TableInfo},
        token::Token,
    },
    Result,
};

/// The coded index kinds of ECMA-335 II.24.2.6.
///
/// A coded index packs a table tag into its low bits and a row index into the rest, so one
/// column can reference rows of several tables.
#[derive(Debug, Hash, Eq, PartialEq, Clone, Copy, EnumIter, EnumCount)]
#[repr(usize)]
#[allow(missing_docs)]
pub enum CodedIndexType {
    TypeDefOrRef,
    HasConstant,
    HasCustomAttribute,
    HasFieldMarshal,
    HasDeclSecurity,
    MemberRefParent,
    HasSemantics,
    MethodDefOrRef,
    MemberForwarded,
    Implementation,
    CustomAttributeType,
    ResolutionScope,
    TypeOrMethodDef,
}

impl CodedIndexType {
    /// The candidate tables, ordered by tag value
    #[must_use]
    pub fn tables(&self) -> &'static [TableId] {
        match self {
            CodedIndexType::TypeDefOrRef => {
                &[TableId::TypeDef, TableId::TypeRef, TableId::TypeSpec]
            }
            CodedIndexType::HasConstant => &[TableId::Field, TableId::Param, TableId::Property],
            CodedIndexType::HasCustomAttribute => &[
                TableId::MethodDef,
                TableId::Field,
                TableId::TypeRef,
                TableId::TypeDef,
                TableId::Param,
                TableId::InterfaceImpl,
                TableId::MemberRef,
                TableId::Module,
                TableId::DeclSecurity,
                TableId::Property,
                TableId::Event,
                TableId::StandAloneSig,
                TableId::ModuleRef,
                TableId::TypeSpec,
                TableId::Assembly,
                TableId::AssemblyRef,
                TableId::File,
                TableId::ExportedType,
                TableId::ManifestResource,
                TableId::GenericParam,
                TableId::GenericParamConstraint,
                TableId::MethodSpec,
            ],
            CodedIndexType::HasFieldMarshal => &[TableId::Field, TableId::Param],
            CodedIndexType::HasDeclSecurity => {
                &[TableId::TypeDef, TableId::MethodDef, TableId::Assembly]
            }
            CodedIndexType::MemberRefParent => &[
                TableId::TypeDef,
                TableId::TypeRef,
                TableId::ModuleRef,
                TableId::MethodDef,
                TableId::TypeSpec,
            ],
            CodedIndexType::HasSemantics => &[TableId::Event, TableId::Property],
            CodedIndexType::MethodDefOrRef => &[TableId::MethodDef, TableId::MemberRef],
            CodedIndexType::MemberForwarded => &[TableId::Field, TableId::MethodDef],
            CodedIndexType::Implementation => {
                &[TableId::File, TableId::AssemblyRef, TableId::ExportedType]
            }
            // Tags 0, 1 and 4 are unused; they are listed so the tag width comes out as 3 bits
            // and are rejected by `unused_tag`.
            CodedIndexType::CustomAttributeType => &[
                TableId::MethodDef,
                TableId::MethodDef,
                TableId::MethodDef,
                TableId::MemberRef,
                TableId::MemberRef,
            ],
            CodedIndexType::ResolutionScope => &[
                TableId::Module,
                TableId::ModuleRef,
                TableId::AssemblyRef,
                TableId::TypeRef,
            ],
            CodedIndexType::TypeOrMethodDef => &[TableId::TypeDef, TableId::MethodDef],
        }
    }

    /// Number of low bits used for the tag: `ceil(log2(candidates))`
    #[must_use]
    pub fn tag_bits(&self) -> u8 {
        let candidates = self.tables().len();
        // next_power_of_two(n).trailing_zeros() == ceil(log2(n))
        candidates.next_power_of_two().trailing_zeros() as u8
    }

    /// True for tag values the encoding reserves
    #[must_use]
    pub fn unused_tag(&self, tag: u32) -> bool {
        matches!(self, CodedIndexType::CustomAttributeType) && matches!(tag, 0 | 1 | 4)
    }
}

/// A decoded coded index.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CodedIndex {
    /// The table the index points into
    pub tag: TableId,
    /// The 1-based row, 0 for null
    pub row: u32,
    /// Token built from `tag` and `row`
    pub token: Token,
}

impl CodedIndex {
    /// Read a coded index column of kind `ci_type`, 2 or 4 bytes wide depending on `info`
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the data is too short and
    /// [`crate::Error::BadMetadata`] for an invalid tag.
    pub fn read(
        data: &[u8],
        offset: &mut usize,
        info: &TableInfo,
        ci_type: CodedIndexType,
    ) -> Result<Self> {
        let coded_index = if info.coded_index_bytes(ci_type) == 4 {
            read_le_at::<u32>(data, offset)?
        } else {
            u32::from(read_le_at::<u16>(data, offset)?)
        };

        let (tag, row) = info.decode_coded_index(coded_index, ci_type)?;
        Ok(CodedIndex::new(tag, row))
    }

    /// Build a coded index from its parts
    #[must_use]
    pub fn new(tag: TableId, row: u32) -> CodedIndex {
        CodedIndex {
            tag,
            row,
            token: Token::from_parts(tag as u8, row),
        }
    }

    /// True if the index references no row
    #[must_use]
    pub fn is_null(&self) -> bool {
        self.row == 0
    }

    /// Encode `tag` and `row` the way `ci_type` stores them
    ///
    /// Returns `None` if `tag` is not a candidate of `ci_type`.
    #[must_use]
    pub fn encode(ci_type: CodedIndexType, tag: TableId, row: u32) -> Option<u32> {
        let position = ci_type
            .tables()
            .iter()
            .enumerate()
            .position(|(index, table)| *table == tag && !ci_type.unused_tag(index as u32))?;
        Some((row << ci_type.tag_bits()) | position as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_bits() {
        assert_eq!(CodedIndexType::TypeDefOrRef.tag_bits(), 2);
        assert_eq!(CodedIndexType::HasConstant.tag_bits(), 2);
        assert_eq!(CodedIndexType::HasCustomAttribute.tag_bits(), 5);
        assert_eq!(CodedIndexType::HasFieldMarshal.tag_bits(), 1);
        assert_eq!(CodedIndexType::MemberRefParent.tag_bits(), 3);
        assert_eq!(CodedIndexType::CustomAttributeType.tag_bits(), 3);
        assert_eq!(CodedIndexType::ResolutionScope.tag_bits(), 2);
    }

    #[test]
    fn encode() {
        assert_eq!(
            CodedIndex::encode(CodedIndexType::TypeDefOrRef, TableId::TypeRef, 5),
            Some((5 << 2) | 1)
        );
        assert_eq!(
            CodedIndex::encode(CodedIndexType::MemberRefParent, TableId::TypeSpec, 1),
            Some((1 << 3) | 4)
        );
        assert_eq!(
            CodedIndex::encode(CodedIndexType::CustomAttributeType, TableId::MemberRef, 2),
            Some((2 << 3) | 3)
        );
        assert_eq!(
            CodedIndex::encode(CodedIndexType::TypeDefOrRef, TableId::Field, 1),
            None
        );
    }

    #[test]
    fn read_small_and_large() {
        let small = TableInfo::new_test(&[(TableId::TypeRef, 10)], false, false, false);
        let data = [0x15, 0x00];
        let mut offset = 0;
        let index =
            CodedIndex::read(&data, &mut offset, &small, CodedIndexType::TypeDefOrRef).unwrap();
        assert_eq!(offset, 2);
        assert_eq!(index.tag, TableId::TypeRef);
        assert_eq!(index.row, 5);
        assert_eq!(index.token, Token::new(0x0100_0005));

        let large = TableInfo::new_test(&[(TableId::TypeRef, 0x4000)], false, false, false);
        let data = [0x15, 0x00, 0x01, 0x00];
        let mut offset = 0;
        let index =
            CodedIndex::read(&data, &mut offset, &large, CodedIndexType::TypeDefOrRef).unwrap();
        assert_eq!(offset, 4);
        assert_eq!(index.row, 0x4005);
    }

    #[test]
    fn invalid_tag() {
        let info = TableInfo::new_test(&[], false, false, false);
        let mut offset = 0;
        assert!(matches!(
            CodedIndex::read(&[0x03, 0x00], &mut offset, &info, CodedIndexType::TypeDefOrRef),
            Err(crate::Error::BadMetadata { .. })
        ));

        let mut offset = 0;
        assert!(CodedIndex::read(
            &[0x01, 0x00],
            &mut offset,
            &info,
            CodedIndexType::CustomAttributeType
        )
        .is_err());
    }
}
