use widestring::U16String;

use crate::{file::parser::Parser, Error::OutOfBounds, Result};

/// The `#US` heap: string literals referenced by `ldstr`.
///
/// Each entry is a compressed byte length, the UTF-16LE characters and one trailing flag byte.
pub struct UserStrings<'a> {
    data: &'a [u8],
}

impl<'a> UserStrings<'a> {
    /// Wrap the heap bytes
    ///
    /// # Errors
    /// Returns [`crate::Error::BadMetadata`] if the heap does not start with the empty entry.
    pub fn from(data: &'a [u8]) -> Result<UserStrings<'a>> {
        if data.first() != Some(&0) {
            return Err(malformed_error!("Invalid memory for #US heap"));
        }

        Ok(UserStrings { data })
    }

    /// Decode the literal at byte offset `index`
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the entry exceeds the heap, or
    /// [`crate::Error::BadMetadata`] if its length is not `2 * chars + 1`.
    pub fn get(&self, index: usize) -> Result<U16String> {
        if index >= self.data.len() {
            return Err(OutOfBounds);
        }

        let mut parser = Parser::new(&self.data[index..]);
        let len = parser.read_compressed_uint()? as usize;
        if len == 0 {
            return Ok(U16String::new());
        }
        if len % 2 == 0 {
            return Err(malformed_error!(
                "Invalid user string length at {} - {}",
                index,
                len
            ));
        }

        let bytes = parser.read_bytes(len - 1)?;
        let chars: Vec<u16> = bytes
            .chunks_exact(2)
            .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
            .collect();

        Ok(U16String::from_vec(chars))
    }
}
