use std::ffi::CStr;

use crate::{Error::OutOfBounds, Result};

/// The `#Strings` heap: identifiers referenced by table rows.
///
/// Index 0 is always the empty string.
pub struct Strings<'a> {
    data: &'a [u8],
}

impl<'a> Strings<'a> {
    /// Wrap the heap bytes
    ///
    /// # Errors
    /// Returns [`crate::Error::BadMetadata`] if the heap does not start with a NUL byte.
    pub fn from(data: &'a [u8]) -> Result<Strings<'a>> {
        if data.first() != Some(&0) {
            return Err(malformed_error!("Provided #String heap is empty or invalid"));
        }

        Ok(Strings { data })
    }

    /// Get the identifier at byte offset `index`
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] for an offset past the heap and
    /// [`crate::Error::BadMetadata`] for unterminated or non UTF-8 data.
    pub fn get(&self, index: usize) -> Result<&'a str> {
        if index >= self.data.len() {
            return Err(OutOfBounds);
        }

        match CStr::from_bytes_until_nul(&self.data[index..]) {
            Ok(result) => result
                .to_str()
                .map_err(|_| malformed_error!("Invalid UTF-8 in #Strings at {}", index)),
            Err(_) => Err(malformed_error!("Unterminated string at {}", index)),
        }
    }
}
