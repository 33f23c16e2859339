//! Entries of the metadata stream directory (ECMA-335 II.24.2.2).

use crate::{file::parser::Parser, Result};

/// Names of the streams this virtual machine understands. `#-` is the uncompressed table stream
/// some compilers emit; it shares the `#~` layout.
pub const KNOWN_STREAMS: [&str; 6] = ["#~", "#-", "#Strings", "#US", "#GUID", "#Blob"];

/// One stream of the metadata blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamHeader {
    /// Offset of the stream, relative to the metadata root
    pub offset: u32,
    /// Size of the stream in bytes
    pub size: u32,
    /// Name of the stream
    pub name: String,
}

impl StreamHeader {
    /// Read one header and leave the parser after its 4-byte aligned name
    ///
    /// # Errors
    /// Returns [`crate::Error::BadMetadata`] for an unknown or unterminated name.
    pub fn read(parser: &mut Parser<'_>) -> Result<StreamHeader> {
        let offset = parser.read_le::<u32>()?;
        let size = parser.read_le::<u32>()?;

        let mut name = String::with_capacity(16);
        loop {
            let name_char = parser.read_le::<u8>()?;
            if name_char == 0 {
                break;
            }
            if name.len() == 32 {
                return Err(malformed_error!("Stream name is not terminated"));
            }
            name.push(char::from(name_char));
        }

        // name + terminator is padded to a multiple of 4
        let consumed = name.len() + 1;
        let padding = ((consumed + 3) & !3) - consumed;
        parser.advance_by(padding)?;

        if !KNOWN_STREAMS.contains(&name.as_str()) {
            return Err(malformed_error!("Invalid stream header name - {}", name));
        }

        Ok(StreamHeader { offset, size, name })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crafted() {
        #[rustfmt::skip]
        let header_bytes = [
            0x6C, 0x00, 0x00, 0x00,
            0xA4, 0x45, 0x00, 0x00,
            0x23, 0x7E, 0x00, 0x00,
            0xFF,
        ];

        let mut parser = Parser::new(&header_bytes);
        let parsed_header = StreamHeader::read(&mut parser).unwrap();

        assert_eq!(parsed_header.offset, 0x6C);
        assert_eq!(parsed_header.size, 0x45A4);
        assert_eq!(parsed_header.name, "#~");
        assert_eq!(parser.pos(), 12);
    }

    #[test]
    fn crafted_invalid() {
        #[rustfmt::skip]
        let header_bytes = [
            0x6C, 0x00, 0x00, 0x00,
            0xA4, 0x45, 0x00, 0x00,
            0x24, 0x7E, 0x00, 0x00,
        ];

        let mut parser = Parser::new(&header_bytes);
        assert!(StreamHeader::read(&mut parser).is_err());
    }
}
