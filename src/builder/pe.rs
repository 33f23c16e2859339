//! PE32 container around the `.text` section of a generated image.
//!
//! The layout is fixed: a DOS header whose `e_lfanew` points at offset `0x80`, the NT headers
//! right after it, one section header, and the `.text` section starting at file offset `0x200`
//! and RVA `0x2000`. No import table or native entry stub is written; the image is meant for a
//! loader that only follows data directory 14.

use crate::{file::io::write_le_at, Result};

/// Offset of the PE signature
const PE_OFFSET: usize = 0x80;
/// `IMAGE_FILE_MACHINE_I386`
const MACHINE_I386: u16 = 0x014C;
/// Size of the PE32 optional header with 16 data directories
const OPTIONAL_HEADER_SIZE: u16 = 0xE0;
const IMAGE_BASE: u32 = 0x0040_0000;
const SECTION_ALIGNMENT: u32 = 0x2000;
const FILE_ALIGNMENT: u32 = 0x200;
/// Size of all headers, rounded to the file alignment
const HEADERS_SIZE: u32 = 0x200;
/// RVA of the `.text` section
pub(crate) const TEXT_RVA: u32 = 0x2000;
/// `IMAGE_SUBSYSTEM_WINDOWS_CUI`
const SUBSYSTEM_CONSOLE: u16 = 3;
/// Dynamic base, NX compatible, no SEH, terminal server aware
const DLL_CHARACTERISTICS: u16 = 0x8540;
/// Code, execute, read
const TEXT_CHARACTERISTICS: u32 = 0x6000_0020;
/// Index of the CLI header in the data directories
const CLR_DIRECTORY: usize = 14;
const DATA_DIRECTORY_COUNT: usize = 16;

bitflags::bitflags! {
    /// COFF file header characteristics written by the builder
    #[derive(PartialEq, Eq, Debug, Clone, Copy)]
    struct FileCharacteristics: u16 {
        const EXECUTABLE_IMAGE = 0x0002;
        const MACHINE_32BIT = 0x0100;
        const DLL = 0x2000;
    }
}

/// Wrap `text` into a PE32 image
///
/// ## Arguments
/// * 'text'      - Content of the `.text` section, starting with the CLI header
/// * 'cli_size'  - Size of the CLI header at the start of `text`
/// * 'is_dll'    - Mark the image as a library rather than an executable
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] if the header writes exceed the image, which only
/// happens if the layout constants are inconsistent.
pub(crate) fn write_image(text: &[u8], cli_size: u32, is_dll: bool) -> Result<Vec<u8>> {
    let raw_size = align_to(text.len() as u32, FILE_ALIGNMENT);
    let image_size = align_to(TEXT_RVA + text.len() as u32, SECTION_ALIGNMENT);

    let mut image = vec![0_u8; (HEADERS_SIZE + raw_size) as usize];

    // DOS header
    image[0..2].copy_from_slice(b"MZ");
    let mut offset = 0x3C;
    write_le_at(&mut image, &mut offset, PE_OFFSET as u32)?;

    // PE signature and COFF header
    image[PE_OFFSET..PE_OFFSET + 4].copy_from_slice(b"PE\0\0");
    let mut offset = PE_OFFSET + 4;
    write_le_at(&mut image, &mut offset, MACHINE_I386)?;
    write_le_at(&mut image, &mut offset, 1_u16)?;
    write_le_at(&mut image, &mut offset, 0_u32)?;
    write_le_at(&mut image, &mut offset, 0_u32)?;
    write_le_at(&mut image, &mut offset, 0_u32)?;
    write_le_at(&mut image, &mut offset, OPTIONAL_HEADER_SIZE)?;
    let mut characteristics =
        FileCharacteristics::EXECUTABLE_IMAGE | FileCharacteristics::MACHINE_32BIT;
    if is_dll {
        characteristics |= FileCharacteristics::DLL;
    }
    write_le_at(&mut image, &mut offset, characteristics.bits())?;

    // Optional header, standard fields
    write_le_at(&mut image, &mut offset, 0x010B_u16)?;
    write_le_at(&mut image, &mut offset, 48_u8)?;
    write_le_at(&mut image, &mut offset, 0_u8)?;
    write_le_at(&mut image, &mut offset, raw_size)?;
    write_le_at(&mut image, &mut offset, 0_u32)?;
    write_le_at(&mut image, &mut offset, 0_u32)?;
    // no native entry point
    write_le_at(&mut image, &mut offset, 0_u32)?;
    write_le_at(&mut image, &mut offset, TEXT_RVA)?;
    write_le_at(&mut image, &mut offset, 0_u32)?;

    // Optional header, Windows fields
    write_le_at(&mut image, &mut offset, IMAGE_BASE)?;
    write_le_at(&mut image, &mut offset, SECTION_ALIGNMENT)?;
    write_le_at(&mut image, &mut offset, FILE_ALIGNMENT)?;
    write_le_at(&mut image, &mut offset, 4_u16)?;
    write_le_at(&mut image, &mut offset, 0_u16)?;
    write_le_at(&mut image, &mut offset, 0_u16)?;
    write_le_at(&mut image, &mut offset, 0_u16)?;
    write_le_at(&mut image, &mut offset, 4_u16)?;
    write_le_at(&mut image, &mut offset, 0_u16)?;
    write_le_at(&mut image, &mut offset, 0_u32)?;
    write_le_at(&mut image, &mut offset, image_size)?;
    write_le_at(&mut image, &mut offset, HEADERS_SIZE)?;
    write_le_at(&mut image, &mut offset, 0_u32)?;
    write_le_at(&mut image, &mut offset, SUBSYSTEM_CONSOLE)?;
    write_le_at(&mut image, &mut offset, DLL_CHARACTERISTICS)?;
    write_le_at(&mut image, &mut offset, 0x0010_0000_u32)?;
    write_le_at(&mut image, &mut offset, 0x0000_1000_u32)?;
    write_le_at(&mut image, &mut offset, 0x0010_0000_u32)?;
    write_le_at(&mut image, &mut offset, 0x0000_1000_u32)?;
    write_le_at(&mut image, &mut offset, 0_u32)?;
    write_le_at(&mut image, &mut offset, DATA_DIRECTORY_COUNT as u32)?;

    for index in 0..DATA_DIRECTORY_COUNT {
        let (rva, size) = if index == CLR_DIRECTORY {
            (TEXT_RVA, cli_size)
        } else {
            (0, 0)
        };
        write_le_at(&mut image, &mut offset, rva)?;
        write_le_at(&mut image, &mut offset, size)?;
    }

    // Section table
    image[offset..offset + 8].copy_from_slice(b".text\0\0\0");
    offset += 8;
    write_le_at(&mut image, &mut offset, text.len() as u32)?;
    write_le_at(&mut image, &mut offset, TEXT_RVA)?;
    write_le_at(&mut image, &mut offset, raw_size)?;
    write_le_at(&mut image, &mut offset, HEADERS_SIZE)?;
    write_le_at(&mut image, &mut offset, 0_u32)?;
    write_le_at(&mut image, &mut offset, 0_u32)?;
    write_le_at(&mut image, &mut offset, 0_u16)?;
    write_le_at(&mut image, &mut offset, 0_u16)?;
    write_le_at(&mut image, &mut offset, TEXT_CHARACTERISTICS)?;

    let start = HEADERS_SIZE as usize;
    image[start..start + text.len()].copy_from_slice(text);

    Ok(image)
}

/// Round `value` up to `alignment`, a power of two
fn align_to(value: u32, alignment: u32) -> u32 {
    (value + alignment - 1) & !(alignment - 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use goblin::pe::PE;

    #[test]
    fn goblin_accepts_the_headers() {
        let image = crate::builder::AssemblyBuilder::new("Headers").build().unwrap();
        assert_eq!(image.len() % 0x200, 0);

        let pe = PE::parse(&image).unwrap();
        assert!(!pe.is_64);
        assert!(pe.is_lib);
        assert_eq!(pe.image_base, u64::from(IMAGE_BASE));
        assert_eq!(pe.sections.len(), 1);
        assert_eq!(pe.sections[0].virtual_address, TEXT_RVA);
        assert_eq!(pe.sections[0].pointer_to_raw_data, HEADERS_SIZE);

        let optional_header = pe.header.optional_header.unwrap();
        let clr = optional_header
            .data_directories
            .get_clr_runtime_header()
            .unwrap();
        assert_eq!(clr.virtual_address, TEXT_RVA);
        assert_eq!(clr.size, 72);

        // The CLI header opens the text section and starts with its own size
        let start = HEADERS_SIZE as usize;
        assert_eq!(&image[start..start + 4], &72_u32.to_le_bytes());
    }

    #[test]
    fn text_is_padded_to_file_alignment() {
        let image = write_image(&[0_u8; 10], 72, false).unwrap();
        assert_eq!(image.len(), 0x400);
        assert_eq!(&image[..2], b"MZ");
    }

    #[test]
    fn alignment() {
        assert_eq!(align_to(0, 0x200), 0);
        assert_eq!(align_to(1, 0x200), 0x200);
        assert_eq!(align_to(0x200, 0x200), 0x200);
        assert_eq!(align_to(0x2001, 0x2000), 0x4000);
    }
}
