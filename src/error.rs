use thiserror::Error;

use crate::{execution::ExecutionError, metadata::tables::TableId};

macro_rules! malformed_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::BadMetadata {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::BadMetadata {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

macro_rules! image_error {
    ($msg:expr) => {
        crate::Error::ImageFormat {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::ImageFormat {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// Errors fall into the phases they can occur in:
///
/// ## Loading
/// - [`Error::ImageFormat`] - Bad container signatures, missing sections, unsupported CLI flags or
///   method body headers
/// - [`Error::BadMetadata`] - Corrupted metadata root, streams, tables, coded indices or
///   self-referential value type layouts
/// - [`Error::RowOutOfRange`] - A 1-based row index of zero or beyond the table's row count
/// - [`Error::OutOfBounds`] - A read would have run past the end of a buffer
/// - [`Error::NotSupported`] - Valid input this virtual machine does not implement (wide heaps,
///   generic instantiations, unsupported conversions)
///
/// ## Binding
/// - [`Error::ECallNotFound`] - A native method without a registered implementation was invoked
/// - [`Error::WellKnownTypeMissing`] - The core library lacks a required built-in type
///
/// ## Execution
/// - [`Error::Execution`] - Any failure raised by the interpreter, see [`ExecutionError`]
///
/// Load errors abort the whole load, execution errors abort the current call chain. Name based
/// lookups through the [`crate::binder::Binder`] never produce an error, they return `None`.
#[derive(Error, Debug)]
pub enum Error {
    /// The PE/COFF container or a method body header is invalid or unsupported.
    #[error("Image format - {file}:{line}: {message}")]
    ImageFormat {
        /// Description of the problem
        message: String,
        /// Source file that raised the error
        file: &'static str,
        /// Source line that raised the error
        line: u32,
    },

    /// The embedded metadata is corrupt or violates a structural invariant.
    #[error("Bad metadata - {file}:{line}: {message}")]
    BadMetadata {
        /// Description of the problem
        message: String,
        /// Source file that raised the error
        file: &'static str,
        /// Source line that raised the error
        line: u32,
    },

    /// A row index of zero, or one greater than the row count, was dereferenced.
    #[error("Row {row} is out of range for table {table:?}")]
    RowOutOfRange {
        /// The table that was accessed
        table: TableId,
        /// The offending 1-based row index
        row: u32,
    },

    /// Out of Bound read would have occurred.
    #[error("Out of Bound read would have occurred!")]
    OutOfBounds,

    /// The input is well formed but uses a feature that is not implemented.
    #[error("Not supported - {0}")]
    NotSupported(String),

    /// A method flagged as an internal call has no native implementation registered.
    #[error("No native implementation registered for {namespace}.{type_name}::{method}")]
    ECallNotFound {
        /// Namespace of the declaring type
        namespace: String,
        /// Name of the declaring type
        type_name: String,
        /// Name of the method
        method: String,
    },

    /// A built-in type required by the runtime is absent from the core library.
    #[error("Core library does not define the well-known type {0}")]
    WellKnownTypeMissing(String),

    /// The interpreter failed while executing bytecode.
    #[error(transparent)]
    Execution(#[from] ExecutionError),

    /// Failed to lock a shared buffer.
    #[error("Failed to lock target")]
    LockError,

    /// Provided input was empty.
    #[error("Provided input was empty")]
    Empty,

    /// Filesystem I/O error.
    #[error("{0}")]
    FileError(#[from] std::io::Error),
}
