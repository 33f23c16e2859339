// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
#![allow(clippy::too_many_arguments)]
// - 'file/physical.rs' uses mmap to map a file into memory

//! # minclr
//!
//! A minimal virtual machine for the Common Language Infrastructure (ECMA-335), written in pure
//! Rust. `minclr` reads managed PE images, imports their metadata, builds a runtime type system
//! with computed field layouts and executes CIL bytecode in a stack based interpreter.
//!
//! ## Features
//!
//! - **📦 Container reader** - PE32/PE32+ parsing via `goblin`, memory mapped or in-memory images
//! - **🔍 Metadata importer** - `#~` table stream, `#Strings`, `#US`, `#GUID` and `#Blob` heaps
//! - **🧩 Type system** - Classes, methods and fields with instance and static layouts
//! - **⚡ Interpreter** - Arithmetic, branches, calls, objects, fields and string literals
//! - **🔧 Native bridge** - `System.Console` and `System.Math` implemented in Rust
//! - **🛠 Image builder** - Generate loadable images from Rust for tests and demos
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use minclr::prelude::*;
//! use std::path::Path;
//!
//! let mut types = TypeSystem::new(EcallRegistry::with_builtins());
//! let corlib = types.load(File::from_file(Path::new("corlib.dll"))?)?;
//! let program = types.load(File::from_file(Path::new("Program.exe"))?)?;
//!
//! let well_known = WellKnownTypes::bind(&types, corlib)?;
//! if let Some(main) = types.entry_point(program) {
//!     let mut engine = Engine::new(&types, EngineConfig::default()).with_well_known(&well_known);
//!     let result = engine.invoke(main, &[])?;
//!     println!("Main returned {:?}", result);
//! }
//! # Ok::<(), minclr::Error>(())
//! ```
//!
//! ## Architecture
//!
//! Loading runs bottom up, each layer only knowing the one below:
//!
//! 1. [`File`] - the PE container, locates the CLI header through data directory 14
//! 2. [`metadata`] - CLI header, metadata root, heaps and tables of one image
//! 3. [`typesystem`] - `EEClass`, `MethodDesc` and `FieldDesc` records for every loaded module
//! 4. [`binder`] - name based lookup and the well-known types of the core library
//! 5. [`execution`] - evaluation stack, object heap, interpreter and native methods
//!
//! [`builder`] goes the other way and writes images the loader accepts.
//!
//! ## Error Handling
//!
//! All fallible operations return [`Result<T>`]. Loading problems are reported as
//! [`Error::ImageFormat`], [`Error::BadMetadata`] or [`Error::NotSupported`], runtime failures as
//! [`Error::Execution`] wrapping an [`execution::ExecutionError`].

#[macro_use]
pub(crate) mod error;
pub(crate) mod file;

/// Shared functionality which is used in unit-tests
#[cfg(test)]
pub(crate) mod test;

/// Convenient re-exports of the most commonly used types.
///
/// # Example
///
/// ```rust
/// use minclr::prelude::*;
///
/// let config = EngineConfig::minimal();
/// let registry = EcallRegistry::with_builtins();
/// let types = TypeSystem::new(registry);
/// assert_eq!(types.class_count(), 0);
/// assert!(config.max_call_depth > 0);
/// ```
pub mod prelude;

/// CIL instruction tables and the bytecode decoder based on ECMA-335
///
/// # Key Types
///
/// - [`disassembler::Instruction`] - Represents a decoded CIL instruction
/// - [`disassembler::Operand`] - Instruction operands (immediates, tokens, targets)
/// - [`disassembler::FlowType`] - How instructions affect control flow
///
/// # Main Functions
///
/// - [`disassembler::decode_instruction`] - Decode a single instruction
/// - [`disassembler::decode_stream`] - Decode a sequence of instructions
/// - [`disassembler::decode_method`] - Decode the body of a loaded method
///
/// # Examples
///
/// ```rust
/// use minclr::{disassembler::decode_instruction, Parser};
///
/// let bytecode = &[0x00, 0x2A]; // nop, ret
/// let mut parser = Parser::new(bytecode);
/// let instruction = decode_instruction(&mut parser)?;
///
/// assert_eq!(instruction.mnemonic, "nop");
/// # Ok::<(), minclr::Error>(())
/// ```
pub mod disassembler;

/// Parsing of CLI metadata based on ECMA-335
///
/// # Key Components
///
/// - [`metadata::cor20header`] - The CLI header located through the PE data directory
/// - [`metadata::root`] - Metadata root and stream directory
/// - [`metadata::streams`] - String, GUID, Blob and UserString heaps
/// - [`metadata::tables`] - The `#~` table stream with row schemas for every table
/// - [`metadata::signatures`] - Method, field and local variable signatures
/// - [`metadata::method`] - Method body headers
/// - [`metadata::importer`] - One image's metadata, opened for the type system loader
pub mod metadata;

/// The runtime type system: classes, methods and fields of all loaded modules
pub mod typesystem;

/// Name based lookup of loaded types and members
pub mod binder;

/// The interpreter, its evaluation stack, object heap and native methods
pub mod execution;

/// Writer for managed PE images
pub mod builder;

/// `minclr` Result type
///
/// A type alias for [`std::result::Result<T, Error>`] where the error type is always [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// `minclr` Error type
///
/// # Examples
///
/// ```rust
/// use minclr::{Error, File};
///
/// match File::from_mem(vec![0; 16]) {
///     Ok(_) => println!("Loaded"),
///     Err(Error::ImageFormat { message, .. }) => println!("Not an image: {}", message),
///     Err(e) => println!("Error: {}", e),
/// }
/// ```
pub use error::Error;

pub use metadata::streams::{Blob, Guid, StreamHeader, Strings, UserStrings};
pub use metadata::tables::TablesHeader;

pub use file::{parser::Parser, File};
