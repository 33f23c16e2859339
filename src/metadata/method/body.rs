//! Method body headers (ECMA-335 II.25.4).
//!
//! Every bytecode body starts with either a 1 byte tiny header or a 12 byte fat header. The
//! header tells where the code starts, how long it is, how deep the evaluation stack may grow
//! and which `StandAloneSig` row describes the local variables.
//!
//! # Examples
//!
//! ```rust
//! use minclr::metadata::method::MethodBody;
//!
//! // tiny header for 2 bytes of code, followed by `ldc.i4.1; ret`
//! let body = MethodBody::from(&[0x0A, 0x17, 0x2A])?;
//! assert!(!body.is_fat);
//! assert_eq!(body.size_code, 2);
//! assert_eq!(body.size_header, 1);
//! # Ok::<(), minclr::Error>(())
//! ```

use crate::{
    file::io::read_le,
    metadata::{method::MethodBodyFlags, token::Token},
    Result,
};

/// Maximum stack depth implied by a tiny header
pub const TINY_MAX_STACK: usize = 8;

/// Smallest legal fat header
const FAT_HEADER_SIZE: usize = 12;

/// A decoded method body header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodBody {
    /// Length of the code in bytes
    pub size_code: usize,
    /// Length of the header in bytes, the code starts right after it
    pub size_header: usize,
    /// `StandAloneSig` token of the local variable signature, null if there are no locals
    pub local_var_sig_token: Token,
    /// Maximum number of items on the evaluation stack
    pub max_stack: usize,
    /// True for a fat header
    pub is_fat: bool,
    /// True if locals are zero initialized
    pub is_init_local: bool,
    /// True if extra data sections follow the code
    pub has_more_sections: bool,
}

impl MethodBody {
    /// Decode the header at the start of `data`
    ///
    /// ## Arguments
    /// * 'data' - The image bytes starting at the method body
    ///
    /// # Errors
    /// Returns [`crate::Error::ImageFormat`] for an unknown header format, a fat header smaller
    /// than 12 bytes, or a body running past the end of `data`.
    pub fn from(data: &[u8]) -> Result<MethodBody> {
        let Some(first_byte) = data.first().copied() else {
            return Err(image_error!("Provided data for body parsing is empty"));
        };

        match MethodBodyFlags::from_bits_truncate(u16::from(first_byte & 0b_0000_0011)) {
            MethodBodyFlags::TINY_FORMAT => {
                let size_code = usize::from(first_byte >> 2);
                if size_code + 1 > data.len() {
                    return Err(image_error!(
                        "Tiny method body of {} bytes exceeds the image",
                        size_code
                    ));
                }

                Ok(MethodBody {
                    size_code,
                    size_header: 1,
                    local_var_sig_token: Token::new(0),
                    max_stack: TINY_MAX_STACK,
                    is_fat: false,
                    is_init_local: false,
                    has_more_sections: false,
                })
            }
            MethodBodyFlags::FAT_FORMAT => {
                if data.len() < FAT_HEADER_SIZE {
                    return Err(image_error!("Fat method header is truncated"));
                }

                let first_duo = read_le::<u16>(data)?;
                let size_header = usize::from(first_duo >> 12) * 4;
                if size_header < FAT_HEADER_SIZE {
                    return Err(image_error!(
                        "Fat method header declares {} bytes",
                        size_header
                    ));
                }

                let size_code = read_le::<u32>(&data[4..])? as usize;
                match size_header.checked_add(size_code) {
                    Some(end) if end <= data.len() => {}
                    _ => {
                        return Err(image_error!(
                            "Fat method body of {} bytes exceeds the image",
                            size_code
                        ))
                    }
                }

                let flags = MethodBodyFlags::from_bits_truncate(first_duo & 0x0FFF);

                Ok(MethodBody {
                    size_code,
                    size_header,
                    local_var_sig_token: Token::new(read_le::<u32>(&data[8..])?),
                    max_stack: usize::from(read_le::<u16>(&data[2..])?),
                    is_fat: true,
                    is_init_local: flags.contains(MethodBodyFlags::INIT_LOCALS),
                    has_more_sections: flags.contains(MethodBodyFlags::MORE_SECTS),
                })
            }
            _ => Err(image_error!(
                "MethodHeader is neither FAT nor TINY - {}",
                first_byte
            )),
        }
    }

    /// Total size of header and code
    #[must_use]
    pub fn size(&self) -> usize {
        self.size_code + self.size_header
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tiny() {
        // 0x0A = 2 << 2 | TINY_FORMAT
        let data = [0x0A, 0x17, 0x2A, 0x00];

        let body = MethodBody::from(&data).unwrap();
        assert!(!body.is_fat);
        assert_eq!(body.size_code, 2);
        assert_eq!(body.size_header, 1);
        assert_eq!(body.size(), 3);
        assert_eq!(body.max_stack, 8);
        assert!(body.local_var_sig_token.is_null());
    }

    #[test]
    fn fat() {
        #[rustfmt::skip]
        let data = [
            0x13, 0x30,             // flags (FAT_FORMAT | INIT_LOCALS), header size 3 * 4
            0x05, 0x00,             // max_stack
            0x02, 0x00, 0x00, 0x00, // code_size
            0x01, 0x00, 0x00, 0x11, // local_var_sig_token
            0x16, 0x2A,             // ldc.i4.0; ret
        ];

        let body = MethodBody::from(&data).unwrap();
        assert!(body.is_fat);
        assert!(body.is_init_local);
        assert!(!body.has_more_sections);
        assert_eq!(body.size_header, 12);
        assert_eq!(body.size_code, 2);
        assert_eq!(body.max_stack, 5);
        assert_eq!(body.local_var_sig_token, Token::new(0x1100_0001));
        assert_eq!(&data[body.size_header..body.size()], &[0x16, 0x2A]);
    }

    #[test]
    fn invalid_format() {
        assert!(matches!(
            MethodBody::from(&[0x00, 0x00]),
            Err(crate::Error::ImageFormat { .. })
        ));
        assert!(matches!(
            MethodBody::from(&[0x01, 0x00]),
            Err(crate::Error::ImageFormat { .. })
        ));
        assert!(MethodBody::from(&[]).is_err());
    }

    #[test]
    fn fat_header_too_small() {
        #[rustfmt::skip]
        let data = [
            0x03, 0x20,             // header size 2 * 4
            0x08, 0x00,
            0x00, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x00, 0x00,
        ];
        assert!(matches!(
            MethodBody::from(&data),
            Err(crate::Error::ImageFormat { .. })
        ));
    }

    #[test]
    fn body_past_image() {
        // tiny body claims 4 bytes, only 1 follows
        assert!(matches!(
            MethodBody::from(&[0x12, 0x2A]),
            Err(crate::Error::ImageFormat { .. })
        ));

        #[rustfmt::skip]
        let data = [
            0x03, 0x30,
            0x08, 0x00,
            0x10, 0x00, 0x00, 0x00, // code_size 16, nothing follows
            0x00, 0x00, 0x00, 0x00,
        ];
        assert!(matches!(
            MethodBody::from(&data),
            Err(crate::Error::ImageFormat { .. })
        ));
    }
}
