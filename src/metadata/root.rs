//! The metadata root (ECMA-335 II.24.2.1).
//!
//! The root sits at the RVA named by the CLI header. It starts with the `BSJB` signature,
//! carries a padded runtime version string and is followed by the stream directory, which lists
//! the offset (relative to the root), size and name of every metadata stream.

use crate::{
    file::parser::Parser,
    metadata::streams::StreamHeader,
    Error::OutOfBounds,
    Result,
};

/// Signature every metadata root starts with (`BSJB`)
pub const CIL_HEADER_MAGIC: u32 = 0x424A_5342;

/// The metadata root and its stream directory.
pub struct Root {
    /// Major version of the metadata format (1)
    pub major_version: u16,
    /// Minor version of the metadata format (1)
    pub minor_version: u16,
    /// Runtime version the assembly targets, e.g. `v4.0.30319`
    pub version: String,
    /// Reserved flags
    pub flags: u16,
    /// The stream directory in declaration order
    pub stream_headers: Vec<StreamHeader>,
}

impl Root {
    /// Parse the root from the start of the metadata blob
    ///
    /// ## Arguments
    /// * 'data' - The metadata blob, as sized by the CLI header
    ///
    /// # Errors
    /// Returns [`crate::Error::BadMetadata`] for a wrong signature, an empty or oversized stream
    /// directory, or a stream that does not fit inside the blob.
    pub fn read(data: &[u8]) -> Result<Root> {
        if data.len() < 20 {
            return Err(OutOfBounds);
        }

        let mut parser = Parser::new(data);
        let signature = parser.read_le::<u32>()?;
        if signature != CIL_HEADER_MAGIC {
            return Err(malformed_error!(
                "CIL_HEADER_MAGIC does not match - 0x{:08X}",
                signature
            ));
        }

        let major_version = parser.read_le::<u16>()?;
        let minor_version = parser.read_le::<u16>()?;
        let _reserved = parser.read_le::<u32>()?;

        let version_length = parser.read_le::<u32>()? as usize;
        let version_bytes = parser.read_bytes(version_length)?;
        let version = String::from_utf8_lossy(version_bytes)
            .trim_end_matches('\0')
            .to_string();

        let flags = parser.read_le::<u16>()?;
        let stream_count = parser.read_le::<u16>()?;
        if stream_count == 0 || stream_count > 6 {
            return Err(malformed_error!("Invalid stream count - {}", stream_count));
        }

        let mut stream_headers = Vec::with_capacity(usize::from(stream_count));
        for _ in 0..stream_count {
            let header = StreamHeader::read(&mut parser)?;
            match header.offset.checked_add(header.size) {
                Some(end) if end as usize <= data.len() => {}
                _ => {
                    return Err(malformed_error!(
                        "Stream {} exceeds the metadata blob - {} + {}",
                        header.name,
                        header.offset,
                        header.size
                    ))
                }
            }

            if stream_headers
                .iter()
                .any(|existing: &StreamHeader| existing.name == header.name)
            {
                return Err(malformed_error!("Duplicate stream - {}", header.name));
            }

            stream_headers.push(header);
        }

        Ok(Root {
            major_version,
            minor_version,
            version,
            flags,
            stream_headers,
        })
    }

    /// Find a stream header by name
    #[must_use]
    pub fn stream(&self, name: &str) -> Option<&StreamHeader> {
        self.stream_headers.iter().find(|header| header.name == name)
    }
}
