//! Container Reader: access to the PE/COFF image that carries a CLI assembly.
//!
//! A managed image is an ordinary PE file whose data directory 14 points at the CLI header
//! (`IMAGE_COR20_HEADER`). [`File`] validates the container signatures, makes sure that directory
//! is present and resolvable, and translates relative virtual addresses into file offsets so the
//! metadata importer and method body reader can work directly on the raw bytes.
//!
//! Two backends are available: [`File::from_mem`] keeps the image in a `Vec<u8>`, and
//! [`File::from_file`] memory-maps it from disk. PE header parsing is done by `goblin`.
//!
//! # Examples
//!
//! ```rust,no_run
//! use minclr::File;
//! use std::path::Path;
//!
//! let file = File::from_file(Path::new("Program.dll"))?;
//! let (clr_rva, clr_size) = file.clr()?;
//! let clr_offset = file.rva_to_offset(clr_rva)?;
//! let header = file.data_slice(clr_offset, clr_size)?;
//! # Ok::<(), minclr::Error>(())
//! ```

pub mod io;
pub mod parser;

mod memory;
mod physical;

use std::path::Path;

use crate::{Error::Empty, Result};
use goblin::pe::{section_table::SectionTable, PE};
use memory::Memory;
use ouroboros::self_referencing;
use physical::Physical;

/// Offset of `e_lfanew` inside the DOS header
const DOS_LFANEW_OFFSET: usize = 0x3C;

/// Storage for the raw bytes of an image.
pub trait Backend: Send + Sync {
    /// Borrow `len` bytes starting at `offset`
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the range exceeds the data.
    fn data_slice(&self, offset: usize, len: usize) -> Result<&[u8]>;

    /// Borrow the complete data
    fn data(&self) -> &[u8];

    /// Length of the data in bytes
    fn len(&self) -> usize;
}

/// A loaded managed image: raw bytes plus the PE headers parsed from them.
#[self_referencing]
pub struct File {
    data: Box<dyn Backend>,
    #[borrows(data)]
    #[not_covariant]
    pe: PE<'this>,
}

impl File {
    /// Map and parse the image at `file`
    ///
    /// ## Arguments
    /// * 'file' - Path to the image on disk
    ///
    /// # Errors
    /// Returns [`crate::Error::FileError`] if the file can not be mapped, and
    /// [`crate::Error::ImageFormat`] if it is not a managed PE image.
    pub fn from_file(file: &Path) -> Result<File> {
        let input = Physical::new(file)?;

        Self::load(input)
    }

    /// Parse an image held in memory
    ///
    /// ## Arguments
    /// * 'data' - The complete image bytes
    ///
    /// # Errors
    /// Returns [`crate::Error::ImageFormat`] if `data` is not a managed PE image.
    pub fn from_mem(data: Vec<u8>) -> Result<File> {
        let input = Memory::new(data);

        Self::load(input)
    }

    fn load<T: Backend + 'static>(data: T) -> Result<File> {
        if data.len() == 0 {
            return Err(Empty);
        }

        check_signatures(data.data())?;

        File::try_new(Box::new(data), |data| {
            let pe = PE::parse(data.data()).map_err(|error| image_error!("{}", error))?;

            let Some(optional_header) = pe.header.optional_header else {
                return Err(image_error!("File does not have an OptionalHeader"));
            };

            let Some((clr_rva, clr_size)) =
                clr_directory(&optional_header.data_directories)
            else {
                return Err(image_error!(
                    "File does not have a CLR runtime header directory"
                ));
            };

            if clr_size == 0 {
                return Err(image_error!("CLR runtime header directory is empty"));
            }

            if section_offset(&pe.sections, clr_rva).is_none() {
                return Err(image_error!(
                    "No section contains the CLR runtime header at RVA 0x{:X}",
                    clr_rva
                ));
            }

            Ok(pe)
        })
    }

    /// Length of the image in bytes
    #[must_use]
    pub fn len(&self) -> usize {
        self.data().len()
    }

    /// True if the image holds no bytes
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Preferred load address from the optional header
    #[must_use]
    pub fn imagebase(&self) -> u64 {
        self.with_pe(|pe| pe.image_base)
    }

    /// RVA and size of the CLI header (data directory 14)
    ///
    /// # Errors
    /// Returns [`crate::Error::ImageFormat`] if the directory is missing, which a successfully
    /// loaded `File` never reports.
    pub fn clr(&self) -> Result<(usize, usize)> {
        self.with_pe(|pe| {
            pe.header
                .optional_header
                .and_then(|optional_header| clr_directory(&optional_header.data_directories))
                .map(|(rva, size)| (rva as usize, size as usize))
                .ok_or_else(|| image_error!("File does not have a CLR runtime header directory"))
        })
    }

    /// Iterate over the section headers
    pub fn sections(&self) -> impl Iterator<Item = &SectionTable> {
        self.with_pe(|pe| pe.sections.iter())
    }

    /// Find a section by its name, e.g. `.text`
    #[must_use]
    pub fn section(&self, name: &str) -> Option<&SectionTable> {
        self.sections().find(|section| {
            std::str::from_utf8(&section.name)
                .map(|section_name| section_name.trim_end_matches('\0') == name)
                .unwrap_or(false)
        })
    }

    /// The complete image
    #[must_use]
    pub fn data(&self) -> &[u8] {
        self.with_data(|data| data.data())
    }

    /// Borrow `len` bytes at file offset `offset`
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the range is not inside the image.
    pub fn data_slice(&self, offset: usize, len: usize) -> Result<&[u8]> {
        self.with_data(|data| data.data_slice(offset, len))
    }

    /// Translate a relative virtual address into a file offset
    ///
    /// ## Arguments
    /// * 'rva' - The relative virtual address to translate
    ///
    /// # Errors
    /// Returns [`crate::Error::ImageFormat`] if no section contains `rva`.
    pub fn rva_to_offset(&self, rva: usize) -> Result<usize> {
        let Ok(rva_u32) = u32::try_from(rva) else {
            return Err(image_error!("RVA too large to fit in u32: {}", rva));
        };

        self.with_pe(|pe| section_offset(&pe.sections, rva_u32))
            .ok_or_else(|| image_error!("RVA could not be converted to offset - 0x{:X}", rva))
    }
}

/// Check the `MZ` and `PE\0\0` signatures before handing the bytes to goblin, so that foreign
/// files are rejected with a precise message.
fn check_signatures(data: &[u8]) -> Result<()> {
    if data.len() < DOS_LFANEW_OFFSET + 4 || &data[..2] != b"MZ" {
        return Err(image_error!("Missing DOS signature"));
    }

    let mut offset = DOS_LFANEW_OFFSET;
    let pe_offset = io::read_le_at::<u32>(data, &mut offset)? as usize;
    match pe_offset
        .checked_add(4)
        .and_then(|end| data.get(pe_offset..end))
    {
        Some(signature) if signature == b"PE\0\0" => Ok(()),
        _ => Err(image_error!("Missing PE signature at 0x{:X}", pe_offset)),
    }
}

fn clr_directory(
    directories: &goblin::pe::data_directories::DataDirectories,
) -> Option<(u32, u32)> {
    if let Some(directory) = directories.get_clr_runtime_header() {
        return Some((directory.virtual_address, directory.size));
    }
    None
}

fn section_offset(sections: &[SectionTable], rva: u32) -> Option<usize> {
    sections.iter().find_map(|section| {
        let size = section.virtual_size.max(section.size_of_raw_data);
        let section_max = section.virtual_address.checked_add(size)?;
        if section.virtual_address <= rva && rva < section_max {
            Some((rva - section.virtual_address) as usize + section.pointer_to_raw_data as usize)
        } else {
            None
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::minimal_image;

    #[test]
    fn load_generated_image() {
        let file = File::from_mem(minimal_image()).unwrap();

        let (clr_rva, clr_size) = file.clr().unwrap();
        assert_eq!(clr_rva, 0x2000);
        assert_eq!(clr_size, 72);
        assert_eq!(file.rva_to_offset(0x2000).unwrap(), 0x200);
        assert_eq!(file.rva_to_offset(0x2010).unwrap(), 0x210);
        assert_eq!(file.imagebase(), 0x0040_0000);
        assert!(file.section(".text").is_some());
        assert!(file.section(".rsrc").is_none());
        assert!(file.rva_to_offset(0x1000).is_err());
    }

    #[test]
    fn reject_empty() {
        assert!(matches!(File::from_mem(Vec::new()), Err(Empty)));
    }

    #[test]
    fn reject_bad_dos_signature() {
        let mut image = minimal_image();
        image[0] = b'X';
        assert!(matches!(
            File::from_mem(image),
            Err(crate::Error::ImageFormat { .. })
        ));
    }

    #[test]
    fn reject_bad_pe_signature() {
        let mut image = minimal_image();
        image[0x81] = b'X';
        assert!(matches!(
            File::from_mem(image),
            Err(crate::Error::ImageFormat { .. })
        ));
    }

    #[test]
    fn reject_missing_clr_directory() {
        let mut image = minimal_image();
        // PE signature (4) + COFF header (20) + optional header up to the directories (96),
        // then 14 directories of 8 bytes each
        let clr_entry = 0x80 + 4 + 20 + 96 + 14 * 8;
        image[clr_entry..clr_entry + 8].fill(0);
        assert!(matches!(
            File::from_mem(image),
            Err(crate::Error::ImageFormat { .. })
        ));
    }
}
