//! Image Builder: emit small managed images from code.
//!
//! [`AssemblyBuilder`] collects type, member and reference rows together with method bodies
//! built by [`MethodBodyBuilder`], and serializes them into a PE32 image that the container
//! reader and the type system load like any compiler produced file. It is used to create test
//! programs and the core library stub without depending on external tooling.
//!
//! [`core_library`] generates the core library the interpreter's native methods expect, and
//! [`CoreReferences`] wires a program to it.
//!
//! Members are always attached to the most recently added type, mirroring how the `TypeDef`
//! table owns contiguous ranges of the `Field` and `MethodDef` tables.
//!
//! # Examples
//!
//! ```rust
//! use minclr::builder::{AssemblyBuilder, MethodBodyBuilder};
//! use minclr::metadata::method::{MethodAttributes, MethodImplAttributes};
//! use minclr::metadata::signatures::{SignatureMethod, TypeSignature};
//! use minclr::metadata::tables::TypeAttributes;
//!
//! let mut builder = AssemblyBuilder::new("Program");
//! builder.add_type("Demo", "Program", TypeAttributes::PUBLIC, None);
//! let main = builder.add_method(
//!     "Main",
//!     MethodAttributes::PUBLIC | MethodAttributes::STATIC,
//!     MethodImplAttributes::empty(),
//!     &SignatureMethod::new_static(TypeSignature::I4, vec![]),
//! )?;
//!
//! let mut body = MethodBodyBuilder::new();
//! body.ldc_i4(42).ret();
//! builder.set_method_body(main, body)?;
//! builder.set_entry_point(main);
//!
//! let image = builder.build()?;
//! let file = minclr::File::from_mem(image)?;
//! # Ok::<(), minclr::Error>(())
//! ```

mod corlib;
mod il;
mod metadata;
mod pe;

pub use corlib::{core_library, CoreReferences, CORE_LIBRARY_NAME};
pub use il::{Label, MethodBodyBuilder};

use std::{
    collections::hash_map::DefaultHasher,
    hash::{Hash, Hasher},
};

use log::debug;

use crate::{
    metadata::{
        method::{MethodAttributes, MethodImplAttributes},
        signatures::{
            encode_field_signature, encode_local_var_signature, encode_method_signature,
            SignatureMethod, SignatureParameter, TypeSignature,
        },
        tables::{CodedIndex, CodedIndexType, FieldAttributes, TableId, TypeAttributes},
        token::{Token, USER_STRING_TABLE},
    },
    Error::NotSupported,
    Result,
};
use metadata::{
    align4, write_metadata, BlobHeap, GuidHeap, StringHeap, TableRows, UserStringHeap,
};

/// Size of the CLI header
const CLI_HEADER_SIZE: u32 = 72;
/// `COMIMAGE_FLAGS_ILONLY`
const CLI_FLAGS_ILONLY: u32 = 0x1;
/// `CALG_SHA1`, the customary hash algorithm of an `Assembly` row
const HASH_ALGORITHM_SHA1: u32 = 0x8004;
/// Version stamped into `Assembly` and `AssemblyRef` rows
const ASSEMBLY_VERSION: [u16; 4] = [1, 0, 0, 0];

/// Builder for a single module managed image.
#[derive(Debug)]
pub struct AssemblyBuilder {
    name: String,
    strings: StringHeap,
    blobs: BlobHeap,
    guids: GuidHeap,
    user_strings: UserStringHeap,
    tables: TableRows,
    /// Encoded body of every `MethodDef` row, by row index
    bodies: Vec<Option<Vec<u8>>>,
    entry_point: Token,
}

impl AssemblyBuilder {
    /// Start an image for the assembly `name`
    ///
    /// The `Module` and `Assembly` rows and the `<Module>` type are created right away, so
    /// the first user type receives `TypeDef` row 2.
    #[must_use]
    pub fn new(name: &str) -> Self {
        let mut builder = AssemblyBuilder {
            name: name.to_string(),
            strings: StringHeap::new(),
            blobs: BlobHeap::new(),
            guids: GuidHeap::new(),
            user_strings: UserStringHeap::new(),
            tables: TableRows::new(),
            bodies: Vec::new(),
            entry_point: Token::new(0),
        };

        let module_name = builder.strings.add(&format!("{}.dll", name));
        let mvid = builder.guids.add(module_version_id(name));
        builder
            .tables
            .push(TableId::Module, vec![0, module_name, mvid, 0, 0]);

        let assembly_name = builder.strings.add(name);
        let [major, minor, build, revision] = ASSEMBLY_VERSION;
        builder.tables.push(
            TableId::Assembly,
            vec![
                HASH_ALGORITHM_SHA1,
                u32::from(major),
                u32::from(minor),
                u32::from(build),
                u32::from(revision),
                0,
                0,
                assembly_name,
                0,
            ],
        );

        builder.add_type("", "<Module>", TypeAttributes::empty(), None);
        builder
    }

    /// Name of the assembly being built
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Reference another assembly by name
    pub fn add_assembly_ref(&mut self, name: &str) -> Token {
        let name = self.strings.add(name);
        let [major, minor, build, revision] = ASSEMBLY_VERSION;
        self.tables.push(
            TableId::AssemblyRef,
            vec![
                u32::from(major),
                u32::from(minor),
                u32::from(build),
                u32::from(revision),
                0,
                0,
                name,
                0,
                0,
            ],
        )
    }

    /// Reference a type defined in `scope`, usually an `AssemblyRef`
    ///
    /// # Errors
    /// Returns [`crate::Error::NotSupported`] if `scope` is not a valid resolution scope.
    pub fn add_type_ref(&mut self, scope: Token, namespace: &str, name: &str) -> Result<Token> {
        let scope = coded(CodedIndexType::ResolutionScope, scope)?;
        let name = self.strings.add(name);
        let namespace = self.strings.add(namespace);
        Ok(self.tables.push(TableId::TypeRef, vec![scope, name, namespace]))
    }

    /// Define a type, which receives all fields and methods added until the next type
    ///
    /// ## Arguments
    /// * 'namespace'   - Namespace, empty for the global namespace
    /// * 'name'        - Simple name
    /// * 'flags'       - Visibility, layout and semantics
    /// * 'extends'     - `TypeDef` or `TypeRef` of the base type, `None` for interfaces,
    ///                   `System.Object` and `<Module>`
    pub fn add_type(
        &mut self,
        namespace: &str,
        name: &str,
        flags: TypeAttributes,
        extends: Option<Token>,
    ) -> Token {
        let extends = extends
            .and_then(|token| {
                let table = TableId::from_u8(token.table())?;
                CodedIndex::encode(CodedIndexType::TypeDefOrRef, table, token.row())
            })
            .unwrap_or(0);
        let name = self.strings.add(name);
        let namespace = self.strings.add(namespace);
        let field_list = self.tables.count(TableId::Field) + 1;
        let method_list = self.tables.count(TableId::MethodDef) + 1;

        self.tables.push(
            TableId::TypeDef,
            vec![
                flags.bits(),
                name,
                namespace,
                extends,
                field_list,
                method_list,
            ],
        )
    }

    /// Add a field to the last defined type
    ///
    /// # Errors
    /// Returns [`crate::Error::NotSupported`] if the signature can not be encoded.
    pub fn add_field(
        &mut self,
        name: &str,
        flags: FieldAttributes,
        field_type: TypeSignature,
    ) -> Result<Token> {
        let signature = encode_field_signature(&SignatureParameter::new(field_type))?;
        let signature = self.blobs.add(&signature)?;
        let name = self.strings.add(name);

        Ok(self.tables.push(
            TableId::Field,
            vec![flags.bits(), name, signature],
        ))
    }

    /// Add a method to the last defined type
    ///
    /// The method has no body until [`AssemblyBuilder::set_method_body`] is called for it;
    /// `InternalCall` and abstract methods never get one.
    ///
    /// # Errors
    /// Returns [`crate::Error::NotSupported`] if the signature can not be encoded.
    pub fn add_method(
        &mut self,
        name: &str,
        flags: MethodAttributes,
        impl_flags: MethodImplAttributes,
        signature: &SignatureMethod,
    ) -> Result<Token> {
        let signature = encode_method_signature(signature)?;
        let signature = self.blobs.add(&signature)?;
        let name = self.strings.add(name);

        self.bodies.push(None);
        Ok(self.tables.push(
            TableId::MethodDef,
            vec![0, impl_flags.bits(), flags.bits(), name, signature, 1],
        ))
    }

    /// Attach `body` to `method`, replacing any earlier body
    ///
    /// Locals of the body are stored as a new `StandAloneSig` row.
    ///
    /// # Errors
    /// Returns [`crate::Error::NotSupported`] if `method` is not a `MethodDef` of this builder,
    /// or for unmarked labels and signatures that can not be encoded.
    pub fn set_method_body(&mut self, method: Token, body: MethodBodyBuilder) -> Result<()> {
        let slot = match method.row().checked_sub(1) {
            Some(index) if method.table() == TableId::MethodDef as u8 => index as usize,
            _ => return Err(NotSupported(format!("{} is not a method definition", method))),
        };
        if slot >= self.bodies.len() {
            return Err(NotSupported(format!("{} is not defined by this builder", method)));
        }

        let local_sig = if body.locals().is_empty() {
            Token::new(0)
        } else {
            self.add_standalone_sig(&encode_local_var_signature(body.locals())?)?
        };

        self.bodies[slot] = Some(body.encode(local_sig)?);
        Ok(())
    }

    /// Reference a method of another type, usually one of a `TypeRef`
    ///
    /// # Errors
    /// Returns [`crate::Error::NotSupported`] if `parent` can not own a member reference.
    pub fn add_method_ref(
        &mut self,
        parent: Token,
        name: &str,
        signature: &SignatureMethod,
    ) -> Result<Token> {
        let signature = encode_method_signature(signature)?;
        self.add_member_ref(parent, name, &signature)
    }

    /// Reference a field of another type
    ///
    /// # Errors
    /// Returns [`crate::Error::NotSupported`] if `parent` can not own a member reference.
    pub fn add_field_ref(
        &mut self,
        parent: Token,
        name: &str,
        field_type: TypeSignature,
    ) -> Result<Token> {
        let signature = encode_field_signature(&SignatureParameter::new(field_type))?;
        self.add_member_ref(parent, name, &signature)
    }

    fn add_member_ref(&mut self, parent: Token, name: &str, signature: &[u8]) -> Result<Token> {
        let parent = coded(CodedIndexType::MemberRefParent, parent)?;
        let name = self.strings.add(name);
        let signature = self.blobs.add(signature)?;
        Ok(self
            .tables
            .push(TableId::MemberRef, vec![parent, name, signature]))
    }

    /// Store a string literal and return its `ldstr` token
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] for a string too long to encode.
    pub fn add_user_string(&mut self, value: &str) -> Result<Token> {
        let offset = self.user_strings.add(value)?;
        Ok(Token::from_parts(USER_STRING_TABLE, offset))
    }

    /// Store an encoded signature as a `StandAloneSig` row
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] for a blob too long to encode.
    pub fn add_standalone_sig(&mut self, signature: &[u8]) -> Result<Token> {
        let signature = self.blobs.add(signature)?;
        Ok(self.tables.push(TableId::StandAloneSig, vec![signature]))
    }

    /// Make `method` the entry point recorded in the CLI header
    pub fn set_entry_point(&mut self, method: Token) {
        self.entry_point = method;
    }

    /// Serialize the image
    ///
    /// The `.text` section holds the CLI header, then every method body 4-byte aligned, then
    /// the metadata. Images without an entry point are marked as libraries.
    ///
    /// # Errors
    /// Returns [`crate::Error::NotSupported`] if a heap outgrows 2 byte indices or a value does
    /// not fit its table column.
    pub fn build(mut self) -> Result<Vec<u8>> {
        let mut text = vec![0_u8; CLI_HEADER_SIZE as usize];

        for (index, body) in self.bodies.iter().enumerate() {
            let Some(body) = body else {
                continue;
            };

            text.resize(align4(text.len()), 0);
            let rva = pe::TEXT_RVA + text.len() as u32;
            text.extend_from_slice(body);

            let token = Token::from_parts(TableId::MethodDef as u8, index as u32 + 1);
            if let Some(row) = self.tables.row_mut(token) {
                row[0] = rva;
            }
        }

        text.resize(align4(text.len()), 0);
        let metadata_rva = pe::TEXT_RVA + text.len() as u32;
        let tables = self.tables.write()?;
        let metadata = write_metadata(
            &tables,
            &[&self.strings, &self.user_strings, &self.guids, &self.blobs],
        )?;
        text.extend_from_slice(&metadata);

        let mut header = Vec::with_capacity(CLI_HEADER_SIZE as usize);
        header.extend_from_slice(&CLI_HEADER_SIZE.to_le_bytes());
        header.extend_from_slice(&2_u16.to_le_bytes());
        header.extend_from_slice(&5_u16.to_le_bytes());
        header.extend_from_slice(&metadata_rva.to_le_bytes());
        header.extend_from_slice(&(metadata.len() as u32).to_le_bytes());
        header.extend_from_slice(&CLI_FLAGS_ILONLY.to_le_bytes());
        header.extend_from_slice(&self.entry_point.value().to_le_bytes());
        text[..header.len()].copy_from_slice(&header);

        debug!(
            "built {} - {} types, {} methods, {} bytes of metadata",
            self.name,
            self.tables.count(TableId::TypeDef),
            self.tables.count(TableId::MethodDef),
            metadata.len()
        );

        pe::write_image(&text, CLI_HEADER_SIZE, self.entry_point.is_null())
    }
}

/// Encode `token` as a coded index of `ci_type`
fn coded(ci_type: CodedIndexType, token: Token) -> Result<u32> {
    TableId::from_u8(token.table())
        .and_then(|table| CodedIndex::encode(ci_type, table, token.row()))
        .ok_or_else(|| NotSupported(format!("{} can not be encoded as {:?}", token, ci_type)))
}

/// A stable module version id derived from the assembly name
fn module_version_id(name: &str) -> uguid::Guid {
    let mut bytes = [0_u8; 16];
    for (seed, chunk) in bytes.chunks_mut(8).enumerate() {
        let mut hasher = DefaultHasher::new();
        seed.hash(&mut hasher);
        name.hash(&mut hasher);
        chunk.copy_from_slice(&hasher.finish().to_le_bytes());
    }
    // version 4, RFC 4122 variant
    bytes[7] = (bytes[7] & 0x0F) | 0x40;
    bytes[8] = (bytes[8] & 0x3F) | 0x80;
    uguid::Guid::from_bytes(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        file::File,
        metadata::{
            importer::Importer,
            method::MethodBody,
            tables::{MemberRefRaw, MethodDefRaw, TypeDefRaw, TypeRefRaw},
        },
    };

    #[test]
    fn empty_assembly_loads() {
        let image = AssemblyBuilder::new("Empty").build().unwrap();
        let file = File::from_mem(image).unwrap();
        let importer = Importer::new(&file).unwrap();

        assert_eq!(importer.cor20.entry_point_token, 0);
        assert_eq!(importer.tables.row_count(TableId::TypeDef), 1);
        assert_eq!(importer.tables.row_count(TableId::Assembly), 1);
        assert!(importer.guids.is_some());

        let module = importer.tables.table::<TypeDefRaw>().unwrap().get(1).unwrap();
        assert_eq!(importer.strings.get(module.type_name as usize).unwrap(), "<Module>");
    }

    #[test]
    fn members_belong_to_the_last_type() {
        let mut builder = AssemblyBuilder::new("Members");
        builder.add_type("Demo", "First", TypeAttributes::PUBLIC, None);
        builder
            .add_field("value", FieldAttributes::PUBLIC, TypeSignature::I4)
            .unwrap();
        let second = builder.add_type("Demo", "Second", TypeAttributes::PUBLIC, None);
        let method = builder
            .add_method(
                "Run",
                MethodAttributes::PUBLIC | MethodAttributes::STATIC,
                MethodImplAttributes::empty(),
                &SignatureMethod::new_static(TypeSignature::Void, vec![]),
            )
            .unwrap();
        assert_eq!(second, Token::new(0x0200_0003));
        assert_eq!(method, Token::new(0x0600_0001));

        let file = File::from_mem(builder.build().unwrap()).unwrap();
        let importer = Importer::new(&file).unwrap();
        let types = importer.tables.table::<TypeDefRaw>().unwrap();

        let first = types.get(2).unwrap();
        assert_eq!(first.field_list, 1);
        assert_eq!(first.method_list, 1);
        let second = types.get(3).unwrap();
        assert_eq!(second.field_list, 2);
        assert_eq!(second.method_list, 1);
    }

    #[test]
    fn bodies_and_entry_point() {
        let mut builder = AssemblyBuilder::new("Bodies");
        builder.add_type("Demo", "Program", TypeAttributes::PUBLIC, None);
        let main = builder
            .add_method(
                "Main",
                MethodAttributes::PUBLIC | MethodAttributes::STATIC,
                MethodImplAttributes::empty(),
                &SignatureMethod::new_static(TypeSignature::I4, vec![]),
            )
            .unwrap();
        let mut body = MethodBodyBuilder::new().local(TypeSignature::I4);
        body.ldc_i4(7).stloc(0).ldloc(0).ret();
        builder.set_method_body(main, body).unwrap();
        builder.set_entry_point(main);

        let file = File::from_mem(builder.build().unwrap()).unwrap();
        let importer = Importer::new(&file).unwrap();
        assert_eq!(importer.cor20.entry_point_token, main.value());
        assert_eq!(importer.tables.row_count(TableId::StandAloneSig), 1);

        let row = importer.tables.table::<MethodDefRaw>().unwrap().get(1).unwrap();
        assert_eq!(row.rva % 4, 0);
        let offset = file.rva_to_offset(row.rva as usize).unwrap();
        let header = MethodBody::from(&file.data()[offset..]).unwrap();
        assert!(header.is_fat);
        assert_eq!(header.size_code, 4);
        assert_eq!(header.local_var_sig_token, Token::new(0x1100_0001));
    }

    #[test]
    fn references() {
        let mut builder = AssemblyBuilder::new("References");
        let corlib = builder.add_assembly_ref("mscorlib");
        let console = builder.add_type_ref(corlib, "System", "Console").unwrap();
        let write_line = builder
            .add_method_ref(
                console,
                "WriteLine",
                &SignatureMethod::new_static(TypeSignature::Void, vec![TypeSignature::String]),
            )
            .unwrap();
        let hello = builder.add_user_string("Hello").unwrap();
        assert_eq!(write_line, Token::new(0x0A00_0001));
        assert_eq!(hello, Token::new(0x7000_0001));

        let file = File::from_mem(builder.build().unwrap()).unwrap();
        let importer = Importer::new(&file).unwrap();

        let type_ref = importer.tables.table::<TypeRefRaw>().unwrap().get(1).unwrap();
        assert_eq!(importer.strings.get(type_ref.type_name as usize).unwrap(), "Console");

        let member_ref = importer.tables.table::<MemberRefRaw>().unwrap().get(1).unwrap();
        assert_eq!(member_ref.class.token, console);
        assert_eq!(importer.strings.get(member_ref.name as usize).unwrap(), "WriteLine");
    }

    #[test]
    fn invalid_tokens() {
        let mut builder = AssemblyBuilder::new("Invalid");
        assert!(builder
            .add_type_ref(Token::new(0x0600_0001), "System", "Object")
            .is_err());
        assert!(builder
            .set_method_body(Token::new(0x0600_0001), MethodBodyBuilder::new())
            .is_err());
        assert!(builder
            .set_method_body(Token::new(0x0200_0001), MethodBodyBuilder::new())
            .is_err());
    }

    #[test]
    fn mvid_is_stable() {
        assert_eq!(module_version_id("Program"), module_version_id("Program"));
        assert_ne!(module_version_id("Program"), module_version_id("Library"));
    }
}
