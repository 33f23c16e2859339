//! The CLI header (`IMAGE_COR20_HEADER`, ECMA-335 II.25.3.3).
//!
//! Data directory 14 of a managed image points at this 72 byte structure. It locates the
//! metadata root and states whether the image contains only IL. Mixed-mode images, which carry
//! native code next to IL, can not be executed by this virtual machine and are rejected here.

use bitflags::bitflags;

use crate::{file::parser::Parser, Error::OutOfBounds, Result};

bitflags! {
    /// Runtime flags of the CLI header
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct CorFlags: u32 {
        /// The image contains only IL code
        const ILONLY = 0x0000_0001;
        /// The image can only be loaded into a 32-bit process
        const REQUIRED_32BIT = 0x0000_0002;
        /// The image is a library with IL only (obsolete)
        const IL_LIBRARY = 0x0000_0004;
        /// The image is strong-name signed
        const STRONGNAMESIGNED = 0x0000_0008;
        /// The entry point is a native RVA instead of a token
        const NATIVE_ENTRYPOINT = 0x0000_0010;
        /// Debug tracking is enabled
        const TRACKDEBUGDATA = 0x0001_0000;
        /// Prefer running as 32-bit process
        const PREFERRED_32BIT = 0x0002_0000;
    }
}

/// The decoded CLI header.
pub struct Cor20Header {
    /// Size of the header, always 72
    pub cb: u32,
    /// Major runtime version the image was built for
    pub major_runtime_version: u16,
    /// Minor runtime version the image was built for
    pub minor_runtime_version: u16,
    /// RVA of the metadata root
    pub meta_data_rva: u32,
    /// Size of the metadata blob
    pub meta_data_size: u32,
    /// Runtime flags
    pub flags: CorFlags,
    /// Token of the entry point method (or native RVA, which is rejected)
    pub entry_point_token: u32,
    /// RVA of the managed resources
    pub resource_rva: u32,
    /// Size of the managed resources
    pub resource_size: u32,
}

impl Cor20Header {
    /// Decode and validate the header
    ///
    /// ## Arguments
    /// * 'data' - The 72 bytes the CLR runtime header directory points at
    ///
    /// # Errors
    /// Returns [`crate::Error::ImageFormat`] for an invalid size, an empty metadata directory,
    /// or flags that describe anything but a pure IL image.
    pub fn read(data: &[u8]) -> Result<Cor20Header> {
        if data.len() < 72 {
            return Err(OutOfBounds);
        }

        let mut parser = Parser::new(data);

        let cb = parser.read_le::<u32>()?;
        if cb != 72 {
            return Err(image_error!(
                "Invalid CLR header size: expected 72, got {}",
                cb
            ));
        }

        let major_runtime_version = parser.read_le::<u16>()?;
        let minor_runtime_version = parser.read_le::<u16>()?;

        let meta_data_rva = parser.read_le::<u32>()?;
        let meta_data_size = parser.read_le::<u32>()?;
        if meta_data_rva == 0 || meta_data_size == 0 {
            return Err(image_error!("CLR header has no metadata directory"));
        }

        let raw_flags = parser.read_le::<u32>()?;
        let Some(flags) = CorFlags::from_bits(raw_flags) else {
            return Err(image_error!(
                "Invalid CLR flags: 0x{:08X} contains undefined bits",
                raw_flags
            ));
        };

        if !flags.contains(CorFlags::ILONLY) {
            return Err(image_error!(
                "Mixed-mode images are not supported (flags 0x{:08X})",
                raw_flags
            ));
        }
        if flags.contains(CorFlags::NATIVE_ENTRYPOINT) {
            return Err(image_error!("Native entry points are not supported"));
        }

        let entry_point_token = parser.read_le::<u32>()?;
        let resource_rva = parser.read_le::<u32>()?;
        let resource_size = parser.read_le::<u32>()?;

        Ok(Cor20Header {
            cb,
            major_runtime_version,
            minor_runtime_version,
            meta_data_rva,
            meta_data_size,
            flags,
            entry_point_token,
            resource_rva,
            resource_size,
        })
    }
}
