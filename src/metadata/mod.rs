//! Metadata Importer: the ECMA-335 metadata database embedded in a managed image.
//!
//! # Key Components
//!
//! - [`importer`] - Entry point, locates and wraps all streams of an image
//! - [`cor20header`] - The CLI header referenced by data directory 14
//! - [`root`] - The metadata root and its stream directory
//! - [`streams`] - The `#Strings`, `#Blob`, `#GUID` and `#US` heaps
//! - [`tables`] - The `#~` stream with typed, bounds-checked row access
//! - [`signatures`] - Decoding and encoding of signature blobs
//! - [`method`] - Method body headers and method attribute flags
//! - [`token`] - Table/row references used by rows and bytecode operands

/// Implementation of the Header of CIL
pub mod cor20header;
/// Implementation of the stream walk over one image
pub mod importer;
/// Implementation of the MethodHeader of CIL
pub mod method;
/// Implementation of the root metadata structure
pub mod root;
/// Implementation of method, field and local variable signatures
pub mod signatures;
/// Implementation of the metadata heaps
pub mod streams;
/// Implementation of the .NET metadata tables
pub mod tables;
/// Commonly used metadata token type
pub mod token;
