//! Metadata Importer: from a PE image to heaps and typed tables.
//!
//! [`Importer::new`] follows the chain CLI header → metadata root → stream directory → `#~`
//! header and wraps every recognized stream. All views borrow from the [`File`], nothing is
//! copied. The type system loader drives its passes off one `Importer` per module.
//!
//! # Examples
//!
//! ```rust,no_run
//! use minclr::{metadata::{importer::Importer, tables::TypeDefRaw}, File};
//! use std::path::Path;
//!
//! let file = File::from_file(Path::new("Program.dll"))?;
//! let importer = Importer::new(&file)?;
//!
//! for row in importer.tables.table::<TypeDefRaw>()?.iter() {
//!     let row = row?;
//!     println!(
//!         "{}.{}",
//!         importer.strings.get(row.type_namespace as usize)?,
//!         importer.strings.get(row.type_name as usize)?
//!     );
//! }
//! # Ok::<(), minclr::Error>(())
//! ```

use log::debug;

use crate::{
    metadata::{
        cor20header::Cor20Header,
        root::Root,
        streams::{Blob, Guid, Strings, UserStrings},
        tables::TablesHeader,
    },
    File, Result,
};

/// An empty heap, used when an image omits `#Blob`
const EMPTY_HEAP: &[u8] = &[0];

/// Parsed metadata of one image.
pub struct Importer<'a> {
    /// The CLI header
    pub cor20: Cor20Header,
    /// The metadata root and stream directory
    pub root: Root,
    /// The `#~` stream
    pub tables: TablesHeader<'a>,
    /// The `#Strings` heap
    pub strings: Strings<'a>,
    /// The `#Blob` heap, empty if absent
    pub blobs: Blob<'a>,
    /// The `#GUID` heap
    pub guids: Option<Guid<'a>>,
    /// The `#US` heap
    pub user_strings: Option<UserStrings<'a>>,
    user_strings_range: Option<(usize, usize)>,
}

impl<'a> Importer<'a> {
    /// Locate and parse the metadata of `file`
    ///
    /// ## Arguments
    /// * 'file' - A loaded image
    ///
    /// # Errors
    /// Returns [`crate::Error::ImageFormat`] for an invalid CLI header, and
    /// [`crate::Error::BadMetadata`] or [`crate::Error::NotSupported`] for a metadata blob that is
    /// corrupt or uses unsupported features.
    pub fn new(file: &'a File) -> Result<Importer<'a>> {
        let (clr_rva, clr_size) = file.clr()?;
        let clr_offset = file.rva_to_offset(clr_rva)?;
        let cor20 = Cor20Header::read(file.data_slice(clr_offset, clr_size)?)?;

        let metadata_offset = file.rva_to_offset(cor20.meta_data_rva as usize)?;
        let metadata = file.data_slice(metadata_offset, cor20.meta_data_size as usize)?;
        let root = Root::read(metadata)?;

        let mut tables = None;
        let mut strings = None;
        let mut blobs = None;
        let mut guids = None;
        let mut user_strings = None;
        let mut user_strings_range = None;

        for stream in &root.stream_headers {
            let start = stream.offset as usize;
            let stream_data = &metadata[start..start + stream.size as usize];

            match stream.name.as_str() {
                "#~" | "#-" => tables = Some(TablesHeader::from(stream_data)?),
                "#Strings" => strings = Some(Strings::from(stream_data)?),
                "#Blob" => blobs = Some(Blob::from(stream_data)?),
                "#GUID" => guids = Some(Guid::from(stream_data)?),
                "#US" => {
                    user_strings = Some(UserStrings::from(stream_data)?);
                    user_strings_range = Some((metadata_offset + start, stream_data.len()));
                }
                _ => {
                    return Err(malformed_error!("Unknown metadata stream - {}", stream.name));
                }
            }
        }

        let Some(tables) = tables else {
            return Err(malformed_error!("Metadata has no #~ stream"));
        };

        let Some(strings) = strings else {
            return Err(malformed_error!("Metadata has no #Strings stream"));
        };

        let blobs = match blobs {
            Some(blobs) => blobs,
            None => Blob::from(EMPTY_HEAP)?,
        };

        debug!(
            "metadata {} with {} streams, tables 0x{:016X}",
            root.version,
            root.stream_headers.len(),
            tables.valid
        );

        Ok(Importer {
            cor20,
            root,
            tables,
            strings,
            blobs,
            guids,
            user_strings,
            user_strings_range,
        })
    }

    /// File offset and size of the `#US` heap, if present
    ///
    /// Loaded modules keep this range so that `ldstr` can decode literals long after the importer
    /// is gone.
    #[must_use]
    pub fn user_strings_range(&self) -> Option<(usize, usize)> {
        self.user_strings_range
    }
}
