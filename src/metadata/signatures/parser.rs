use crate::{
    file::parser::Parser,
    metadata::{
        signatures::{
            SignatureMethod, SignatureParameter, TypeSignature, ELEMENT_TYPE, SIGNATURE_HEADER,
        },
        token::Token,
    },
    Error::NotSupported,
    Result,
};

/// Maximum nesting of types inside one signature
pub const MAX_RECURSION_DEPTH: usize = 50;

/// Decoder for signature blobs from the `#Blob` heap.
///
/// # Examples
///
/// ```rust
/// use minclr::metadata::signatures::{SignatureParser, TypeSignature};
///
/// // instance int32 (int32, string)
/// let mut parser = SignatureParser::new(&[0x20, 0x02, 0x08, 0x08, 0x0E]);
/// let method = parser.parse_method_signature()?;
///
/// assert!(method.has_this);
/// assert_eq!(method.return_type.base, TypeSignature::I4);
/// assert_eq!(method.params.len(), 2);
/// # Ok::<(), minclr::Error>(())
/// ```
pub struct SignatureParser<'a> {
    parser: Parser<'a>,
    depth: usize,
}

impl<'a> SignatureParser<'a> {
    /// Create a parser over one signature blob
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        SignatureParser {
            parser: Parser::new(data),
            depth: 0,
        }
    }

    fn parse_type(&mut self) -> Result<TypeSignature> {
        self.depth += 1;
        if self.depth > MAX_RECURSION_DEPTH {
            return Err(malformed_error!(
                "Signature nesting exceeds {} levels",
                MAX_RECURSION_DEPTH
            ));
        }

        let result = self.parse_type_inner();
        self.depth -= 1;
        result
    }

    fn parse_type_inner(&mut self) -> Result<TypeSignature> {
        let current_byte = self.parser.read_le::<u8>()?;
        match current_byte {
            ELEMENT_TYPE::VOID => Ok(TypeSignature::Void),
            ELEMENT_TYPE::BOOLEAN => Ok(TypeSignature::Boolean),
            ELEMENT_TYPE::CHAR => Ok(TypeSignature::Char),
            ELEMENT_TYPE::I1 => Ok(TypeSignature::I1),
            ELEMENT_TYPE::U1 => Ok(TypeSignature::U1),
            ELEMENT_TYPE::I2 => Ok(TypeSignature::I2),
            ELEMENT_TYPE::U2 => Ok(TypeSignature::U2),
            ELEMENT_TYPE::I4 => Ok(TypeSignature::I4),
            ELEMENT_TYPE::U4 => Ok(TypeSignature::U4),
            ELEMENT_TYPE::I8 => Ok(TypeSignature::I8),
            ELEMENT_TYPE::U8 => Ok(TypeSignature::U8),
            ELEMENT_TYPE::R4 => Ok(TypeSignature::R4),
            ELEMENT_TYPE::R8 => Ok(TypeSignature::R8),
            ELEMENT_TYPE::STRING => Ok(TypeSignature::String),
            ELEMENT_TYPE::I => Ok(TypeSignature::I),
            ELEMENT_TYPE::U => Ok(TypeSignature::U),
            ELEMENT_TYPE::OBJECT => Ok(TypeSignature::Object),
            ELEMENT_TYPE::PTR => {
                self.parse_custom_mods()?;
                Ok(TypeSignature::Ptr(Box::new(self.parse_type()?)))
            }
            ELEMENT_TYPE::VALUETYPE => Ok(TypeSignature::ValueType(
                self.parser.read_compressed_token()?,
            )),
            ELEMENT_TYPE::CLASS => Ok(TypeSignature::Class(self.parser.read_compressed_token()?)),
            ELEMENT_TYPE::VAR => Ok(TypeSignature::GenericParamType(
                self.parser.read_compressed_uint()?,
            )),
            ELEMENT_TYPE::MVAR => Ok(TypeSignature::GenericParamMethod(
                self.parser.read_compressed_uint()?,
            )),
            ELEMENT_TYPE::SZARRAY => {
                self.parse_custom_mods()?;
                Ok(TypeSignature::SzArray(Box::new(self.parse_type()?)))
            }
            ELEMENT_TYPE::CMOD_REQD | ELEMENT_TYPE::CMOD_OPT => {
                // modifier applies to the type that follows it
                self.parser.read_compressed_token()?;
                self.parse_type_inner()
            }
            ELEMENT_TYPE::PINNED => self.parse_type_inner(),
            ELEMENT_TYPE::ARRAY => Err(NotSupported("multi-dimensional arrays".to_string())),
            ELEMENT_TYPE::GENERICINST => {
                Err(NotSupported("generic instantiations".to_string()))
            }
            ELEMENT_TYPE::FNPTR => Err(NotSupported("function pointers".to_string())),
            ELEMENT_TYPE::TYPEDBYREF => Err(NotSupported("typed references".to_string())),
            _ => Err(NotSupported(format!(
                "element type 0x{:02X}",
                current_byte
            ))),
        }
    }

    fn parse_custom_mods(&mut self) -> Result<Vec<Token>> {
        let mut mods = Vec::new();

        while self.parser.has_more_data() {
            let next_byte = self.parser.peek_byte()?;
            if next_byte != ELEMENT_TYPE::CMOD_REQD && next_byte != ELEMENT_TYPE::CMOD_OPT {
                break;
            }

            self.parser.advance_by(1)?;
            mods.push(self.parser.read_compressed_token()?);
        }

        Ok(mods)
    }

    fn parse_param(&mut self) -> Result<SignatureParameter> {
        let modifiers = self.parse_custom_mods()?;

        let mut by_ref = false;
        if self.parser.peek_byte()? == ELEMENT_TYPE::BYREF {
            self.parser.advance_by(1)?;
            by_ref = true;
        }

        Ok(SignatureParameter {
            modifiers,
            by_ref,
            base: self.parse_type()?,
        })
    }

    /// Decode a `MethodDefSig` or `MethodRefSig`
    ///
    /// # Errors
    /// Returns [`crate::Error::NotSupported`] for vararg parameter lists and unsupported types,
    /// [`crate::Error::BadMetadata`] for excessive nesting and [`crate::Error::OutOfBounds`] for
    /// truncated blobs.
    pub fn parse_method_signature(&mut self) -> Result<SignatureMethod> {
        let convention_byte = self.parser.read_le::<u8>()?;

        let generic_param_count = if convention_byte & SIGNATURE_HEADER::GENERIC != 0 {
            self.parser.read_compressed_uint()?
        } else {
            0
        };

        let param_count = self.parser.read_compressed_uint()?;
        let return_type = self.parse_param()?;

        let mut params = Vec::with_capacity(param_count as usize);
        for _ in 0..param_count {
            if self.parser.peek_byte()? == ELEMENT_TYPE::SENTINEL {
                return Err(NotSupported("vararg parameter lists".to_string()));
            }

            params.push(self.parse_param()?);
        }

        Ok(SignatureMethod {
            has_this: convention_byte & SIGNATURE_HEADER::HAS_THIS != 0,
            explicit_this: convention_byte & SIGNATURE_HEADER::EXPLICIT_THIS != 0,
            generic_param_count,
            calling_convention: convention_byte & SIGNATURE_HEADER::KIND_MASK,
            return_type,
            params,
        })
    }

    /// Decode a `FieldSig`
    ///
    /// # Errors
    /// Returns [`crate::Error::BadMetadata`] if the blob does not start with `0x06`.
    pub fn parse_field_signature(&mut self) -> Result<SignatureParameter> {
        let head_byte = self.parser.read_le::<u8>()?;
        if head_byte != SIGNATURE_HEADER::FIELD {
            return Err(malformed_error!(
                "SignatureField - invalid start - {}",
                head_byte
            ));
        }

        self.parse_param()
    }

    /// Decode a `LocalVarSig`, one entry per local
    ///
    /// # Errors
    /// Returns [`crate::Error::BadMetadata`] if the blob does not start with `0x07`.
    pub fn parse_local_var_signature(&mut self) -> Result<Vec<SignatureParameter>> {
        let head_byte = self.parser.read_le::<u8>()?;
        if head_byte != SIGNATURE_HEADER::LOCAL_SIG {
            return Err(malformed_error!(
                "SignatureLocalVar - invalid start - {}",
                head_byte
            ));
        }

        let count = self.parser.read_compressed_uint()?;

        let mut locals = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let mut modifiers = Vec::new();
            while self.parser.has_more_data() {
                match self.parser.peek_byte()? {
                    ELEMENT_TYPE::CMOD_REQD | ELEMENT_TYPE::CMOD_OPT => {
                        self.parser.advance_by(1)?;
                        modifiers.push(self.parser.read_compressed_token()?);
                    }
                    ELEMENT_TYPE::PINNED => self.parser.advance_by(1)?,
                    _ => break,
                }
            }

            let by_ref = if self.parser.peek_byte()? == ELEMENT_TYPE::BYREF {
                self.parser.advance_by(1)?;
                true
            } else {
                false
            };

            locals.push(SignatureParameter {
                modifiers,
                by_ref,
                base: self.parse_type()?,
            });
        }

        Ok(locals)
    }
}
