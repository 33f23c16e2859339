//! Signature blob encoders, the inverse of [`SignatureParser`](super::SignatureParser).
//!
//! Used by [`crate::builder`] to emit method, field and local variable signatures.

use crate::{
    file::io::write_compressed_uint,
    metadata::{
        signatures::{
            SignatureMethod, SignatureParameter, TypeSignature, ELEMENT_TYPE, SIGNATURE_HEADER,
        },
        token::Token,
    },
    Error::NotSupported,
    Result,
};

fn encode_type_def_or_ref(token: Token, buffer: &mut Vec<u8>) -> Result<()> {
    let tag = match token.table() {
        0x02 => 0,
        0x01 => 1,
        0x1B => 2,
        table => {
            return Err(NotSupported(format!(
                "Token table 0x{:02X} is not a TypeDefOrRef target",
                table
            )))
        }
    };

    write_compressed_uint(buffer, (token.row() << 2) | tag)
}

/// Append the encoding of `signature` to `buffer`
///
/// # Errors
/// Returns [`crate::Error::NotSupported`] for tokens that are not TypeDef, TypeRef or TypeSpec.
pub fn encode_type_signature(signature: &TypeSignature, buffer: &mut Vec<u8>) -> Result<()> {
    match signature {
        TypeSignature::Void => buffer.push(ELEMENT_TYPE::VOID),
        TypeSignature::Boolean => buffer.push(ELEMENT_TYPE::BOOLEAN),
        TypeSignature::Char => buffer.push(ELEMENT_TYPE::CHAR),
        TypeSignature::I1 => buffer.push(ELEMENT_TYPE::I1),
        TypeSignature::U1 => buffer.push(ELEMENT_TYPE::U1),
        TypeSignature::I2 => buffer.push(ELEMENT_TYPE::I2),
        TypeSignature::U2 => buffer.push(ELEMENT_TYPE::U2),
        TypeSignature::I4 => buffer.push(ELEMENT_TYPE::I4),
        TypeSignature::U4 => buffer.push(ELEMENT_TYPE::U4),
        TypeSignature::I8 => buffer.push(ELEMENT_TYPE::I8),
        TypeSignature::U8 => buffer.push(ELEMENT_TYPE::U8),
        TypeSignature::R4 => buffer.push(ELEMENT_TYPE::R4),
        TypeSignature::R8 => buffer.push(ELEMENT_TYPE::R8),
        TypeSignature::I => buffer.push(ELEMENT_TYPE::I),
        TypeSignature::U => buffer.push(ELEMENT_TYPE::U),
        TypeSignature::String => buffer.push(ELEMENT_TYPE::STRING),
        TypeSignature::Object => buffer.push(ELEMENT_TYPE::OBJECT),
        TypeSignature::Ptr(base) => {
            buffer.push(ELEMENT_TYPE::PTR);
            encode_type_signature(base, buffer)?;
        }
        TypeSignature::ValueType(token) => {
            buffer.push(ELEMENT_TYPE::VALUETYPE);
            encode_type_def_or_ref(*token, buffer)?;
        }
        TypeSignature::Class(token) => {
            buffer.push(ELEMENT_TYPE::CLASS);
            encode_type_def_or_ref(*token, buffer)?;
        }
        TypeSignature::GenericParamType(number) => {
            buffer.push(ELEMENT_TYPE::VAR);
            write_compressed_uint(buffer, *number)?;
        }
        TypeSignature::GenericParamMethod(number) => {
            buffer.push(ELEMENT_TYPE::MVAR);
            write_compressed_uint(buffer, *number)?;
        }
        TypeSignature::SzArray(base) => {
            buffer.push(ELEMENT_TYPE::SZARRAY);
            encode_type_signature(base, buffer)?;
        }
    }

    Ok(())
}

fn encode_parameter(parameter: &SignatureParameter, buffer: &mut Vec<u8>) -> Result<()> {
    for modifier in &parameter.modifiers {
        buffer.push(ELEMENT_TYPE::CMOD_OPT);
        encode_type_def_or_ref(*modifier, buffer)?;
    }

    if parameter.by_ref {
        buffer.push(ELEMENT_TYPE::BYREF);
    }

    encode_type_signature(&parameter.base, buffer)
}

/// Encode a method signature
///
/// # Errors
/// Returns [`crate::Error::NotSupported`] if a contained token can not be encoded.
pub fn encode_method_signature(signature: &SignatureMethod) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();

    let mut head = signature.calling_convention & SIGNATURE_HEADER::KIND_MASK;
    if signature.has_this {
        head |= SIGNATURE_HEADER::HAS_THIS;
    }
    if signature.explicit_this {
        head |= SIGNATURE_HEADER::EXPLICIT_THIS;
    }
    if signature.generic_param_count > 0 {
        head |= SIGNATURE_HEADER::GENERIC;
    }
    buffer.push(head);

    if signature.generic_param_count > 0 {
        write_compressed_uint(&mut buffer, signature.generic_param_count)?;
    }

    let Ok(param_count) = u32::try_from(signature.params.len()) else {
        return Err(NotSupported("too many parameters".to_string()));
    };
    write_compressed_uint(&mut buffer, param_count)?;

    encode_parameter(&signature.return_type, &mut buffer)?;
    for param in &signature.params {
        encode_parameter(param, &mut buffer)?;
    }

    Ok(buffer)
}

/// Encode a field signature
///
/// # Errors
/// Returns [`crate::Error::NotSupported`] if a contained token can not be encoded.
pub fn encode_field_signature(field: &SignatureParameter) -> Result<Vec<u8>> {
    let mut buffer = vec![SIGNATURE_HEADER::FIELD];
    encode_parameter(field, &mut buffer)?;
    Ok(buffer)
}

/// Encode a local variable signature
///
/// # Errors
/// Returns [`crate::Error::NotSupported`] if a contained token can not be encoded.
pub fn encode_local_var_signature(locals: &[SignatureParameter]) -> Result<Vec<u8>> {
    let mut buffer = vec![SIGNATURE_HEADER::LOCAL_SIG];

    let Ok(count) = u32::try_from(locals.len()) else {
        return Err(NotSupported("too many locals".to_string()));
    };
    write_compressed_uint(&mut buffer, count)?;

    for local in locals {
        encode_parameter(local, &mut buffer)?;
    }

    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::signatures::SignatureParser;

    #[test]
    fn method_signature() {
        let signature = SignatureMethod {
            has_this: true,
            explicit_this: false,
            generic_param_count: 0,
            calling_convention: SIGNATURE_HEADER::DEFAULT,
            return_type: SignatureParameter::new(TypeSignature::I4),
            params: vec![
                SignatureParameter::new(TypeSignature::String),
                SignatureParameter::new(TypeSignature::ValueType(Token::new(0x0200_0003))),
            ],
        };

        let encoded = encode_method_signature(&signature).unwrap();
        assert_eq!(encoded, vec![0x20, 0x02, 0x08, 0x0E, 0x11, 0x0C]);

        let parsed = SignatureParser::new(&encoded)
            .parse_method_signature()
            .unwrap();
        assert_eq!(parsed, signature);
    }

    #[test]
    fn locals_and_fields() {
        let locals = vec![
            SignatureParameter::new(TypeSignature::I8),
            SignatureParameter::new(TypeSignature::Class(Token::new(0x0100_0001))),
        ];
        assert_eq!(
            encode_local_var_signature(&locals).unwrap(),
            vec![0x07, 0x02, 0x0A, 0x12, 0x05]
        );

        assert_eq!(
            encode_field_signature(&SignatureParameter::new(TypeSignature::R8)).unwrap(),
            vec![0x06, 0x0D]
        );
    }

    #[test]
    fn invalid_token() {
        let mut buffer = Vec::new();
        assert!(encode_type_signature(
            &TypeSignature::Class(Token::new(0x0600_0001)),
            &mut buffer
        )
        .is_err());
    }
}
