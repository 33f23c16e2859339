use std::marker::PhantomData;

use crate::{
    metadata::tables::{TableId, TableInfoRef},
    Error, Result,
};

/// A typed row that can be decoded from the raw bytes of its table.
pub trait RowReadable: Sized {
    /// The table this row type belongs to
    const TABLE: TableId;

    /// Width of one row under `sizes`
    #[must_use]
    fn row_size(sizes: &TableInfoRef) -> usize {
        Self::TABLE.row_size(sizes)
    }

    /// Decode the row with index `rid` located at `offset`, advancing `offset` past it
    ///
    /// ## Arguments
    /// * 'data'    - The bytes of the whole table
    /// * 'offset'  - Start of the row, advanced to the start of the next row
    /// * 'rid'     - The 1-based row index
    /// * 'sizes'   - Index widths of the table stream
    ///
    /// # Errors
    /// Returns an error if the row is truncated or contains an invalid coded index.
    fn row_read(data: &[u8], offset: &mut usize, rid: u32, sizes: &TableInfoRef) -> Result<Self>;
}

/// Typed view over the rows of one metadata table.
pub struct MetadataTable<'a, T> {
    data: &'a [u8],
    row_count: u32,
    row_size: usize,
    sizes: TableInfoRef,
    _phantom: PhantomData<T>,
}

impl<'a, T: RowReadable> MetadataTable<'a, T> {
    /// Wrap the bytes of a table with `row_count` rows
    ///
    /// # Errors
    /// Returns [`crate::Error::BadMetadata`] if `data` is too small for all rows.
    pub fn new(data: &'a [u8], row_count: u32, sizes: TableInfoRef) -> Result<Self> {
        let row_size = T::row_size(&sizes);
        if data.len() < row_size * row_count as usize {
            return Err(malformed_error!(
                "Table {:?} is truncated - {} rows of {} bytes in {} bytes",
                T::TABLE,
                row_count,
                row_size,
                data.len()
            ));
        }

        Ok(MetadataTable {
            data,
            row_count,
            row_size,
            sizes,
            _phantom: PhantomData,
        })
    }

    /// Number of rows
    #[must_use]
    pub fn row_count(&self) -> u32 {
        self.row_count
    }

    /// Width of one row in bytes
    #[must_use]
    pub fn row_size(&self) -> usize {
        self.row_size
    }

    /// Decode the row with 1-based index `rid`
    ///
    /// # Errors
    /// Returns [`crate::Error::RowOutOfRange`] for `rid == 0` or `rid > row_count`.
    pub fn get(&self, rid: u32) -> Result<T> {
        if rid == 0 || rid > self.row_count {
            return Err(Error::RowOutOfRange {
                table: T::TABLE,
                row: rid,
            });
        }

        T::row_read(
            self.data,
            &mut ((rid as usize - 1) * self.row_size),
            rid,
            &self.sizes,
        )
    }

    /// Iterate over all rows in order
    pub fn iter(&self) -> impl Iterator<Item = Result<T>> + '_ {
        (1..=self.row_count).map(move |rid| self.get(rid))
    }
}
