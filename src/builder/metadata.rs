//! Heap and table serialization for the image builder.
//!
//! Every heap starts with its null entry and deduplicates what is added to it, so equal names
//! and signatures share one offset. The table stream is written from plain rows of column
//! values using the same [`TableId::columns`] schema the reader uses, which keeps both sides in
//! agreement about row widths.

use std::collections::HashMap;

use strum::IntoEnumIterator;

use crate::{
    file::io::{write_compressed_uint, write_le_at, write_le_at_dyn},
    metadata::{
        tables::{TableId, TableInfo},
        token::Token,
    },
    Error::NotSupported,
    Result,
};

/// Largest heap addressable with the 2 byte indices the reader handles
const MAX_SMALL_HEAP: usize = 0xFFFF;
/// `BSJB`
const METADATA_SIGNATURE: u32 = 0x424A_5342;
/// Runtime version string stored in the metadata root
pub(crate) const METADATA_VERSION: &str = "v4.0.30319";

/// A metadata heap under construction.
pub(crate) trait HeapBuilder {
    /// Name of the stream holding this heap
    fn stream_name(&self) -> &'static str;

    /// The encoded heap
    fn data(&self) -> &[u8];
}

/// `#Strings`: NUL terminated UTF-8.
#[derive(Debug)]
pub(crate) struct StringHeap {
    data: Vec<u8>,
    offsets: HashMap<String, u32>,
}

impl StringHeap {
    pub(crate) fn new() -> Self {
        StringHeap {
            data: vec![0],
            offsets: HashMap::new(),
        }
    }

    /// Offset of `value`, the empty string is offset 0
    pub(crate) fn add(&mut self, value: &str) -> u32 {
        if value.is_empty() {
            return 0;
        }
        if let Some(offset) = self.offsets.get(value) {
            return *offset;
        }

        let offset = self.data.len() as u32;
        self.data.extend_from_slice(value.as_bytes());
        self.data.push(0);
        self.offsets.insert(value.to_string(), offset);
        offset
    }
}

impl HeapBuilder for StringHeap {
    fn stream_name(&self) -> &'static str {
        "#Strings"
    }

    fn data(&self) -> &[u8] {
        &self.data
    }
}

/// `#Blob`: compressed length followed by the bytes.
#[derive(Debug)]
pub(crate) struct BlobHeap {
    data: Vec<u8>,
    offsets: HashMap<Vec<u8>, u32>,
}

impl BlobHeap {
    pub(crate) fn new() -> Self {
        BlobHeap {
            data: vec![0],
            offsets: HashMap::new(),
        }
    }

    /// Offset of `value`, the empty blob is offset 0
    pub(crate) fn add(&mut self, value: &[u8]) -> Result<u32> {
        if value.is_empty() {
            return Ok(0);
        }
        if let Some(offset) = self.offsets.get(value) {
            return Ok(*offset);
        }

        let offset = self.data.len() as u32;
        write_compressed_uint(&mut self.data, value.len() as u32)?;
        self.data.extend_from_slice(value);
        self.offsets.insert(value.to_vec(), offset);
        Ok(offset)
    }
}

impl HeapBuilder for BlobHeap {
    fn stream_name(&self) -> &'static str {
        "#Blob"
    }

    fn data(&self) -> &[u8] {
        &self.data
    }
}

/// `#GUID`: 16 byte entries addressed by 1-based index.
#[derive(Debug)]
pub(crate) struct GuidHeap {
    data: Vec<u8>,
}

impl GuidHeap {
    pub(crate) fn new() -> Self {
        GuidHeap { data: Vec::new() }
    }

    /// 1-based index of the appended `guid`
    pub(crate) fn add(&mut self, guid: uguid::Guid) -> u32 {
        self.data.extend_from_slice(&guid.to_bytes());
        (self.data.len() / 16) as u32
    }
}

impl HeapBuilder for GuidHeap {
    fn stream_name(&self) -> &'static str {
        "#GUID"
    }

    fn data(&self) -> &[u8] {
        &self.data
    }
}

/// `#US`: compressed byte length, UTF-16 code units, and a trailing flag byte.
#[derive(Debug)]
pub(crate) struct UserStringHeap {
    data: Vec<u8>,
    offsets: HashMap<String, u32>,
}

impl UserStringHeap {
    pub(crate) fn new() -> Self {
        UserStringHeap {
            data: vec![0],
            offsets: HashMap::new(),
        }
    }

    /// Offset of the entry for `value`
    pub(crate) fn add(&mut self, value: &str) -> Result<u32> {
        if let Some(offset) = self.offsets.get(value) {
            return Ok(*offset);
        }

        let units: Vec<u16> = value.encode_utf16().collect();
        let offset = self.data.len() as u32;

        write_compressed_uint(&mut self.data, (units.len() * 2 + 1) as u32)?;
        for unit in &units {
            self.data.extend_from_slice(&unit.to_le_bytes());
        }
        self.data
            .push(u8::from(units.iter().copied().any(needs_special_handling)));

        self.offsets.insert(value.to_string(), offset);
        Ok(offset)
    }
}

impl HeapBuilder for UserStringHeap {
    fn stream_name(&self) -> &'static str {
        "#US"
    }

    fn data(&self) -> &[u8] {
        &self.data
    }
}

/// Characters that set the trailing byte of a user string (II.24.2.4)
fn needs_special_handling(unit: u16) -> bool {
    matches!(unit, 0x01..=0x08 | 0x0E..=0x1F | 0x27 | 0x2D | 0x7F) || unit > 0xFF
}

/// Rows of all tables, each row one value per schema column.
///
/// Coded index columns hold the already encoded value, heap columns the heap offset.
#[derive(Debug)]
pub(crate) struct TableRows {
    rows: Vec<Vec<Vec<u32>>>,
}

impl TableRows {
    pub(crate) fn new() -> Self {
        TableRows {
            rows: vec![Vec::new(); TableId::iter().count()],
        }
    }

    /// Append `row` to `table` and return its token
    pub(crate) fn push(&mut self, table: TableId, row: Vec<u32>) -> Token {
        let rows = &mut self.rows[table as usize];
        rows.push(row);
        Token::from_parts(table as u8, rows.len() as u32)
    }

    /// Number of rows in `table`
    pub(crate) fn count(&self, table: TableId) -> u32 {
        self.rows[table as usize].len() as u32
    }

    /// Mutable access to a row by its token
    pub(crate) fn row_mut(&mut self, token: Token) -> Option<&mut Vec<u32>> {
        let table = TableId::from_u8(token.table())?;
        let index = token.row().checked_sub(1)?;
        self.rows[table as usize].get_mut(index as usize)
    }

    /// Serialize the `#~` stream
    ///
    /// # Errors
    /// Returns [`crate::Error::NotSupported`] if a value does not fit its column.
    pub(crate) fn write(&self) -> Result<Vec<u8>> {
        let present: Vec<(TableId, u32)> = TableId::iter()
            .map(|table| (table, self.count(table)))
            .filter(|(_, rows)| *rows > 0)
            .collect();
        let info = TableInfo::from_row_counts(&present, false, false, false);

        let valid = present
            .iter()
            .fold(0_u64, |mask, (table, _)| mask | (1 << *table as usize));
        let header_size = 24 + present.len() * 4;
        let rows_size: usize = present
            .iter()
            .map(|(table, rows)| table.row_size(&info) * *rows as usize)
            .sum();

        let mut data = vec![0_u8; align4(header_size + rows_size)];
        let mut offset = 0;
        write_le_at(&mut data, &mut offset, 0_u32)?;
        write_le_at(&mut data, &mut offset, 2_u8)?;
        write_le_at(&mut data, &mut offset, 0_u8)?;
        // heap size flags, every heap uses 2 byte indices
        write_le_at(&mut data, &mut offset, 0_u8)?;
        write_le_at(&mut data, &mut offset, 1_u8)?;
        write_le_at(&mut data, &mut offset, valid)?;
        write_le_at(&mut data, &mut offset, 0_u64)?;
        for (_, rows) in &present {
            write_le_at(&mut data, &mut offset, *rows)?;
        }

        for (table, _) in &present {
            let columns = table.columns();
            for row in &self.rows[*table as usize] {
                if row.len() != columns.len() {
                    return Err(NotSupported(format!(
                        "{:?} row has {} values for {} columns",
                        table,
                        row.len(),
                        columns.len()
                    )));
                }

                for (column, value) in columns.iter().zip(row) {
                    let size = column.size(&info);
                    if size < 4 && *value >> (size * 8) != 0 {
                        return Err(NotSupported(format!(
                            "Value 0x{:X} does not fit a {:?} column of {:?}",
                            value, column, table
                        )));
                    }

                    match size {
                        1 => write_le_at(&mut data, &mut offset, *value as u8)?,
                        size => write_le_at_dyn(&mut data, &mut offset, *value, size == 4)?,
                    }
                }
            }
        }

        Ok(data)
    }
}

/// Round `value` up to a multiple of 4
pub(crate) fn align4(value: usize) -> usize {
    (value + 3) & !3
}

/// Assemble the metadata root with the table stream and the four heaps
///
/// # Errors
/// Returns [`crate::Error::NotSupported`] if a heap outgrows 2 byte indices.
pub(crate) fn write_metadata(tables: &[u8], heaps: &[&dyn HeapBuilder]) -> Result<Vec<u8>> {
    for heap in heaps {
        if heap.data().len() > MAX_SMALL_HEAP {
            return Err(NotSupported(format!(
                "{} heap of {} bytes needs 4 byte indices",
                heap.stream_name(),
                heap.data().len()
            )));
        }
    }

    let mut streams: Vec<(&str, &[u8])> = vec![("#~", tables)];
    streams.extend(heaps.iter().map(|heap| (heap.stream_name(), heap.data())));

    let version_length = align4(METADATA_VERSION.len() + 1);
    let directory_size: usize = streams
        .iter()
        .map(|(name, _)| 8 + align4(name.len() + 1))
        .sum();
    let mut stream_offset = 16 + version_length + 4 + directory_size;

    let mut root = Vec::new();
    root.extend_from_slice(&METADATA_SIGNATURE.to_le_bytes());
    root.extend_from_slice(&1_u16.to_le_bytes());
    root.extend_from_slice(&1_u16.to_le_bytes());
    root.extend_from_slice(&0_u32.to_le_bytes());
    root.extend_from_slice(&(version_length as u32).to_le_bytes());
    root.extend_from_slice(METADATA_VERSION.as_bytes());
    root.resize(16 + version_length, 0);
    root.extend_from_slice(&0_u16.to_le_bytes());
    root.extend_from_slice(&(streams.len() as u16).to_le_bytes());

    for (name, data) in &streams {
        let size = align4(data.len());
        root.extend_from_slice(&(stream_offset as u32).to_le_bytes());
        root.extend_from_slice(&(size as u32).to_le_bytes());
        root.extend_from_slice(name.as_bytes());
        root.resize(root.len() + align4(name.len() + 1) - name.len(), 0);
        stream_offset += size;
    }

    for (_, data) in &streams {
        root.extend_from_slice(data);
        root.resize(align4(root.len()), 0);
    }

    Ok(root)
}
