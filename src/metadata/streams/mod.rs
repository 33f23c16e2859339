//! Metadata streams (ECMA-335 II.24.2).
//!
//! Besides the table stream (`#~`, see [`crate::metadata::tables`]) a metadata blob holds four
//! heaps which table rows and IL operands point into:
//!
//! - [`Strings`] (`#Strings`): NUL-terminated UTF-8 identifiers
//! - [`Blob`] (`#Blob`): length-prefixed binary data, mostly signatures
//! - [`Guid`] (`#GUID`): 16 byte GUIDs addressed by 1-based index
//! - [`UserStrings`] (`#US`): length-prefixed UTF-16 string literals used by `ldstr`

mod blob;
mod guid;
mod streamheader;
mod strings;
mod userstrings;

pub use blob::Blob;
pub use guid::Guid;
pub use streamheader::{StreamHeader, KNOWN_STREAMS};
pub use strings::Strings;
pub use userstrings::UserStrings;
