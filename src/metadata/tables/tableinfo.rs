use std::sync::Arc;
use strum::{EnumCount, IntoEnumIterator};

use crate::{
    file::io::read_le_at,
    metadata::tables::{CodedIndexType, TableId},
    Error::OutOfBounds,
    Result,
};

/// Row count of one table and the number of bits needed to address its rows.
#[derive(Clone, Copy, Default, PartialEq, Debug)]
pub struct TableRowInfo {
    /// Number of rows
    pub rows: u32,
    /// Bits needed to store the largest row index
    pub bits: u8,
    /// True if indices into this table need 4 bytes
    pub is_large: bool,
}

impl TableRowInfo {
    /// Derive the index width for a table with `rows` rows
    #[must_use]
    pub fn new(rows: u32) -> Self {
        let bits = if rows == 0 {
            1
        } else {
            (32 - rows.leading_zeros()) as u8
        };

        Self {
            rows,
            bits,
            is_large: rows > u32::from(u16::MAX),
        }
    }
}

/// Row counts of all tables plus the resulting width of every index kind.
///
/// Every column that references a heap, a table or several tables (coded index) is either 2 or
/// 4 bytes wide, depending on the size of its target. `TableInfo` answers those questions for a
/// specific table stream so that row sizes can be computed before any row is read.
#[derive(Clone, Default, Debug)]
pub struct TableInfo {
    rows: Vec<TableRowInfo>,
    coded_indexes: Vec<u8>,
    is_large_index_str: bool,
    is_large_index_guid: bool,
    is_large_index_blob: bool,
}

/// Shared handle to a [`TableInfo`]
pub type TableInfoRef = Arc<TableInfo>;

impl TableInfo {
    /// Read the row counts that follow the table stream header
    ///
    /// ## Arguments
    /// * 'data'            - The complete `#~` stream
    /// * 'valid_bitvec'    - The `valid` mask of the header
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the stream ends inside the row counts.
    pub fn new(data: &[u8], valid_bitvec: u64) -> Result<Self> {
        if data.len() < 24 {
            return Err(OutOfBounds);
        }

        let mut table_info = vec![TableRowInfo::default(); TableId::COUNT];
        let mut next_row_offset = 24;

        for table_id in TableId::iter() {
            if (valid_bitvec & (1 << table_id as usize)) == 0 {
                continue;
            }

            let row_count = read_le_at::<u32>(data, &mut next_row_offset)?;
            table_info[table_id as usize] = TableRowInfo::new(row_count);
        }

        let heap_size_flags = data[6];
        let mut table_info = TableInfo {
            rows: table_info,
            coded_indexes: vec![0; CodedIndexType::COUNT],
            is_large_index_str: heap_size_flags & 1 == 1,
            is_large_index_guid: heap_size_flags & 2 == 2,
            is_large_index_blob: heap_size_flags & 4 == 4,
        };

        table_info.calculate_coded_index_bits();

        Ok(table_info)
    }

    /// Build a `TableInfo` from explicit row counts
    ///
    /// Used by the image builder, which knows its row counts before any bytes exist.
    #[must_use]
    pub fn from_row_counts(
        valid_tables: &[(TableId, u32)],
        large_str: bool,
        large_blob: bool,
        large_guid: bool,
    ) -> Self {
        let mut table_info = TableInfo {
            rows: vec![TableRowInfo::default(); TableId::COUNT],
            coded_indexes: vec![0; CodedIndexType::COUNT],
            is_large_index_str: large_str,
            is_large_index_guid: large_guid,
            is_large_index_blob: large_blob,
        };

        for (table, rows) in valid_tables {
            table_info.rows[*table as usize] = TableRowInfo::new(*rows);
        }

        table_info.calculate_coded_index_bits();
        table_info
    }

    /// Table info for unit tests, built from explicit row counts
    #[cfg(test)]
    pub fn new_test(
        valid_tables: &[(TableId, u32)],
        large_str: bool,
        large_blob: bool,
        large_guid: bool,
    ) -> Self {
        Self::from_row_counts(valid_tables, large_str, large_blob, large_guid)
    }

    /// Split a raw coded index into its table and row
    ///
    /// # Errors
    /// Returns [`crate::Error::BadMetadata`] if the tag does not name a candidate table.
    pub fn decode_coded_index(
        &self,
        value: u32,
        coded_index_type: CodedIndexType,
    ) -> Result<(TableId, u32)> {
        let tables = coded_index_type.tables();
        let tag_bits = coded_index_type.tag_bits();
        let tag = value & ((1 << tag_bits) - 1);

        if tag as usize >= tables.len() || coded_index_type.unused_tag(tag) {
            return Err(malformed_error!(
                "Invalid tag {} for coded index {:?}",
                tag,
                coded_index_type
            ));
        }

        Ok((tables[tag as usize], value >> tag_bits))
    }

    /// True if indices into `id` are 4 bytes wide
    #[must_use]
    pub fn is_large(&self, id: TableId) -> bool {
        self.rows[id as usize].is_large
    }

    /// True if `#Strings` indices are 4 bytes wide
    #[must_use]
    pub fn is_large_str(&self) -> bool {
        self.is_large_index_str
    }

    /// True if `#GUID` indices are 4 bytes wide
    #[must_use]
    pub fn is_large_guid(&self) -> bool {
        self.is_large_index_guid
    }

    /// True if `#Blob` indices are 4 bytes wide
    #[must_use]
    pub fn is_large_blob(&self) -> bool {
        self.is_large_index_blob
    }

    /// Width of a `#Strings` index
    #[must_use]
    pub fn str_bytes(&self) -> u8 {
        if self.is_large_index_str {
            4
        } else {
            2
        }
    }

    /// Width of a `#GUID` index
    #[must_use]
    pub fn guid_bytes(&self) -> u8 {
        if self.is_large_index_guid {
            4
        } else {
            2
        }
    }

    /// Width of a `#Blob` index
    #[must_use]
    pub fn blob_bytes(&self) -> u8 {
        if self.is_large_index_blob {
            4
        } else {
            2
        }
    }

    /// Row information for `table`
    #[must_use]
    pub fn get(&self, table: TableId) -> &TableRowInfo {
        &self.rows[table as usize]
    }

    /// Width of a simple index into `table_id`
    #[must_use]
    pub fn table_index_bytes(&self, table_id: TableId) -> u8 {
        if self.rows[table_id as usize].bits > 16 {
            4
        } else {
            2
        }
    }

    /// Bits needed by a coded index of `coded_index_type`, tag included
    #[must_use]
    pub fn coded_index_bits(&self, coded_index_type: CodedIndexType) -> u8 {
        self.coded_indexes[coded_index_type as usize]
    }

    /// Width of a coded index of `coded_index_type`
    #[must_use]
    pub fn coded_index_bytes(&self, coded_index_type: CodedIndexType) -> u8 {
        if self.coded_indexes[coded_index_type as usize] > 16 {
            4
        } else {
            2
        }
    }

    fn calculate_coded_index_bits(&mut self) {
        for coded_index in CodedIndexType::iter() {
            self.coded_indexes[coded_index as usize] = self.calculate_coded_index_size(coded_index);
        }
    }

    /// `bits(max rows of the candidates) + tag bits`. More than 16 bits means that the largest
    /// candidate has at least `1 << (16 - tag_bits)` rows.
    fn calculate_coded_index_size(&self, coded_index: CodedIndexType) -> u8 {
        let max_bits = coded_index
            .tables()
            .iter()
            .map(|table| self.rows[*table as usize].bits)
            .max()
            .unwrap_or(1);

        max_bits + coded_index.tag_bits()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_index_boundary() {
        let info = TableInfo::new_test(
            &[(TableId::TypeDef, 65535), (TableId::MethodDef, 65536)],
            false,
            false,
            false,
        );

        assert_eq!(info.table_index_bytes(TableId::TypeDef), 2);
        assert!(!info.is_large(TableId::TypeDef));
        assert_eq!(info.table_index_bytes(TableId::MethodDef), 4);
        assert!(info.is_large(TableId::MethodDef));
        assert_eq!(info.table_index_bytes(TableId::Field), 2);
    }

    #[test]
    fn coded_index_threshold() {
        // For every coded index kind, 2 bytes just below 1 << (16 - B) rows and 4 bytes at it
        for coded_index in CodedIndexType::iter() {
            let threshold = 1_u32 << (16 - coded_index.tag_bits());
            let table = coded_index.tables()[coded_index.tables().len() - 1];

            let below = TableInfo::new_test(&[(table, threshold - 1)], false, false, false);
            assert_eq!(
                below.coded_index_bytes(coded_index),
                2,
                "{coded_index:?} with {} rows",
                threshold - 1
            );

            let at = TableInfo::new_test(&[(table, threshold)], false, false, false);
            assert_eq!(
                at.coded_index_bytes(coded_index),
                4,
                "{coded_index:?} with {threshold} rows"
            );
        }
    }

    #[test]
    fn coded_index_uses_largest_candidate() {
        let info = TableInfo::new_test(
            &[
                (TableId::TypeDef, 10),
                (TableId::TypeRef, 20),
                (TableId::TypeSpec, 0x4000),
            ],
            false,
            false,
            false,
        );
        assert_eq!(info.coded_index_bytes(CodedIndexType::TypeDefOrRef), 4);
        assert_eq!(info.coded_index_bytes(CodedIndexType::HasFieldMarshal), 2);
    }

    #[test]
    fn heap_flags_and_counts() {
        #[rustfmt::skip]
        let header = [
            0x00, 0x00, 0x00, 0x00,                         // reserved
            0x02, 0x00,                                     // major / minor
            0x05,                                           // heap sizes: strings + blob
            0x01,                                           // reserved
            0x05, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, // valid: Module, TypeDef
            0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, // sorted
            0x01, 0x00, 0x00, 0x00,                         // Module rows
            0x03, 0x00, 0x00, 0x00,                         // TypeDef rows
        ];

        let info = TableInfo::new(&header, 0x05).unwrap();
        assert!(info.is_large_str());
        assert!(!info.is_large_guid());
        assert!(info.is_large_blob());
        assert_eq!(info.get(TableId::Module).rows, 1);
        assert_eq!(info.get(TableId::TypeDef).rows, 3);
        assert_eq!(info.get(TableId::TypeRef).rows, 0);

        assert!(TableInfo::new(&header[..28], 0x05).is_err());
    }
}
