use std::sync::Arc;

use strum::{EnumCount, IntoEnumIterator};

use crate::{
    file::io::read_le,
    metadata::tables::{MetadataTable, RowReadable, TableId, TableInfo, TableInfoRef},
    Error::{NotSupported, OutOfBounds},
    Result,
};

/// Size of the fixed part of the `#~` header, the row counts follow it
const TABLES_HEADER_SIZE: usize = 24;

/// The header of the `#~` stream and the location of every table inside it (II.24.2.6).
///
/// Rows are stored back to back without padding, table after table in `TableId` order. Only the
/// row counts are stored, so every base offset is computed here from the column schemas once the
/// width of every index kind is known.
pub struct TablesHeader<'a> {
    /// Major version of the table schemata, shall be 2
    pub major_version: u8,
    /// Minor version of the table schemata, shall be 0
    pub minor_version: u8,
    /// Bit vector of present tables
    pub valid: u64,
    /// Bit vector of sorted tables
    pub sorted: u64,
    /// Row counts and index widths
    pub info: TableInfoRef,
    data: &'a [u8],
    /// Start offset of each table, `None` for absent tables
    offsets: Vec<Option<usize>>,
}

impl<'a> TablesHeader<'a> {
    /// Parse the header of a `#~` stream
    ///
    /// ## Arguments
    /// * 'data' - The complete stream
    ///
    /// # Errors
    /// Returns [`crate::Error::NotSupported`] for heaps that need 4 byte indices or unknown tables,
    /// and [`crate::Error::BadMetadata`] if the stream is too short for the declared rows.
    pub fn from(data: &'a [u8]) -> Result<TablesHeader<'a>> {
        if data.len() < TABLES_HEADER_SIZE {
            return Err(OutOfBounds);
        }

        let heap_sizes = data[6];
        if heap_sizes != 0 {
            return Err(NotSupported(format!(
                "Heap size flags 0x{:02X} - only heaps addressable with 2 byte indices are handled",
                heap_sizes
            )));
        }

        let valid = read_le::<u64>(&data[8..])?;
        let unknown = valid & !TableId::known_mask();
        if unknown != 0 {
            return Err(NotSupported(format!(
                "Unknown metadata tables present - 0x{:016X}",
                unknown
            )));
        }

        let info = Arc::new(TableInfo::new(data, valid)?);

        let mut offsets = vec![None; TableId::COUNT];
        let mut current_offset = TABLES_HEADER_SIZE + valid.count_ones() as usize * 4;
        for table_id in TableId::iter() {
            let rows = info.get(table_id).rows;
            if valid & (1 << table_id as usize) == 0 {
                continue;
            }

            offsets[table_id as usize] = Some(current_offset);
            current_offset += table_id.row_size(&info) * rows as usize;
        }

        if current_offset > data.len() {
            return Err(malformed_error!(
                "Table stream holds {} bytes but its rows need {}",
                data.len(),
                current_offset
            ));
        }

        Ok(TablesHeader {
            major_version: data[4],
            minor_version: data[5],
            valid,
            sorted: read_le::<u64>(&data[16..])?,
            info,
            data,
            offsets,
        })
    }

    /// True if the table has a bit in the `valid` vector
    #[must_use]
    pub fn has_table(&self, table_id: TableId) -> bool {
        self.offsets[table_id as usize].is_some()
    }

    /// Number of rows of a table, 0 if it is absent
    #[must_use]
    pub fn row_count(&self, table_id: TableId) -> u32 {
        self.info.get(table_id).rows
    }

    /// Typed access to the table `T` belongs to
    ///
    /// An absent table is returned as a table without rows, so that any lookup into it reports
    /// [`crate::Error::RowOutOfRange`].
    ///
    /// # Errors
    /// Returns [`crate::Error::BadMetadata`] if the table data is truncated.
    pub fn table<T: RowReadable>(&self) -> Result<MetadataTable<'a, T>> {
        match self.offsets[T::TABLE as usize] {
            Some(offset) => MetadataTable::new(
                &self.data[offset..],
                self.row_count(T::TABLE),
                self.info.clone(),
            ),
            None => MetadataTable::new(&[], 0, self.info.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::tables::{StandAloneSigRaw, TypeRefRaw};

    fn header(heap_sizes: u8, valid: u64, rows: &[u32]) -> Vec<u8> {
        let mut data = vec![
            0x00, 0x00, 0x00, 0x00, // reserved
            0x02, // major_version
            0x00, // minor_version
            heap_sizes, // heap_sizes
            0x01, // reserved
        ];
        data.extend_from_slice(&valid.to_le_bytes());
        data.extend_from_slice(&0_u64.to_le_bytes());
        for row in rows {
            data.extend_from_slice(&row.to_le_bytes());
        }
        data
    }

    #[test]
    fn offsets_follow_row_widths() {
        let valid = (1 << TableId::TypeRef as u64) | (1 << TableId::StandAloneSig as u64);
        let mut data = header(0, valid, &[2, 1]);
        #[rustfmt::skip]
        data.extend_from_slice(&[
            0x06, 0x00, 0x01, 0x00, 0x02, 0x00, // TypeRef 1
            0x06, 0x00, 0x03, 0x00, 0x04, 0x00, // TypeRef 2
            0x07, 0x00,                         // StandAloneSig 1
        ]);

        let tables = TablesHeader::from(&data).unwrap();
        assert_eq!(tables.major_version, 2);
        assert!(tables.has_table(TableId::TypeRef));
        assert!(!tables.has_table(TableId::TypeDef));
        assert_eq!(tables.row_count(TableId::TypeRef), 2);

        let type_refs = tables.table::<TypeRefRaw>().unwrap();
        assert_eq!(type_refs.get(2).unwrap().type_namespace, 4);

        let sigs = tables.table::<StandAloneSigRaw>().unwrap();
        assert_eq!(sigs.get(1).unwrap().signature, 7);

        let absent = tables.table::<crate::metadata::tables::TypeDefRaw>().unwrap();
        assert_eq!(absent.row_count(), 0);
        assert!(absent.get(1).is_err());
    }

    #[test]
    fn wide_heaps_not_supported() {
        let data = header(0x01, 1 << TableId::Module as u64, &[0]);
        assert!(matches!(TablesHeader::from(&data), Err(NotSupported(_))));
    }

    #[test]
    fn unknown_table_not_supported() {
        let data = header(0, 1 << 0x2D, &[1]);
        assert!(matches!(TablesHeader::from(&data), Err(NotSupported(_))));
    }

    #[test]
    fn truncated_rows() {
        let mut data = header(0, 1 << TableId::StandAloneSig as u64, &[3]);
        data.extend_from_slice(&[0x01, 0x00, 0x02, 0x00]);
        assert!(matches!(
            TablesHeader::from(&data),
            Err(crate::Error::BadMetadata { .. })
        ));
    }
}
