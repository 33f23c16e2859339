//! Token and signature resolution.
//!
//! Tokens found in metadata rows, signatures and bytecode operands are relative to the module
//! that contains them. The functions here turn them into arena ids of the [`TypeSystem`]:
//!
//! - `TypeDef` tokens index the defining module's class range directly
//! - `TypeRef` tokens are bound by name, first inside the referencing module and then across all
//!   loaded modules
//! - `MemberRef` tokens are bound by name and signature against their parent class and its base
//!   classes; the result is cached on the [`crate::typesystem::MemberRefInfo`]
//!
//! Signatures resolve into [`TypeDesc`]s and, for methods, into a [`FrameLayout`].

use log::warn;
use widestring::U16String;

use crate::{
    binder::Binder,
    execution::ExecutionError,
    metadata::{
        signatures::{SignatureMethod, SignatureParameter, SignatureParser, TypeSignature},
        tables::TableId,
        token::Token,
    },
    typesystem::{
        align_up, ClassId, ElementType, FieldId, FrameLayout, IdRange, LoadedModule, MethodId,
        ModuleId, TypeDesc, TypeModifiers, TypeSystem, VarDesc, POINTER_SIZE,
    },
    Error::{NotSupported, OutOfBounds, RowOutOfRange},
    Result,
};

/// Maximum length of a parent chain walked while resolving members
const MAX_HIERARCHY_DEPTH: usize = 64;

impl TypeSystem {
    /// Resolve a `TypeDefOrRef` token to a class
    ///
    /// Returns `Ok(None)` for a `TypeRef` that names a type no loaded module defines.
    ///
    /// ## Arguments
    /// * 'module'  - The module containing the token
    /// * 'token'   - A `TypeDef`, `TypeRef` or `TypeSpec` token
    ///
    /// # Errors
    /// Returns [`crate::Error::RowOutOfRange`] for a row outside the table,
    /// [`crate::Error::NotSupported`] for `TypeSpec` tokens and
    /// [`ExecutionError::BadToken`] for tokens of any other table.
    pub fn resolve_type_token(&self, module: ModuleId, token: Token) -> Result<Option<ClassId>> {
        let module_desc = self.module_of_token(module, token)?;

        match TableId::from_u8(token.table()) {
            Some(TableId::TypeDef) => {
                range_row(module_desc.classes, TableId::TypeDef, token.row())
                    .map(|index| Some(ClassId::new(index)))
            }
            Some(TableId::TypeRef) => {
                let Some(type_ref) = token
                    .row()
                    .checked_sub(1)
                    .and_then(|index| module_desc.type_refs.get(index as usize))
                else {
                    return Err(RowOutOfRange {
                        table: TableId::TypeRef,
                        row: token.row(),
                    });
                };

                let binder = Binder::new(self);
                Ok(binder
                    .bind_type_in(module, &type_ref.namespace, &type_ref.name)
                    .or_else(|| binder.bind_type(&type_ref.namespace, &type_ref.name)))
            }
            Some(TableId::TypeSpec) => Err(NotSupported(format!(
                "Generic instantiation or array type {}",
                token
            ))),
            _ => Err(ExecutionError::BadToken(token).into()),
        }
    }

    /// Resolve a parameter, field type or local of `module` into a [`TypeDesc`]
    ///
    /// # Errors
    /// Returns [`crate::Error::BadMetadata`] for a value type that no loaded module defines, and
    /// the errors of [`TypeSystem::resolve_type_token`].
    pub fn type_desc(&self, module: ModuleId, param: &SignatureParameter) -> Result<TypeDesc> {
        let ty = self.type_signature_desc(module, &param.base)?;
        if param.by_ref {
            Ok(ty.with_modifiers(TypeModifiers::BY_REF))
        } else {
            Ok(ty)
        }
    }

    /// Resolve one signature type of `module` into a [`TypeDesc`]
    ///
    /// Classes that can not be resolved are kept as an untyped reference and logged; value types
    /// must resolve since their size is needed.
    ///
    /// # Errors
    /// See [`TypeSystem::type_desc`].
    pub fn type_signature_desc(&self, module: ModuleId, signature: &TypeSignature) -> Result<TypeDesc> {
        let element = match signature {
            TypeSignature::Void => ElementType::Void,
            TypeSignature::Boolean => ElementType::Boolean,
            TypeSignature::Char => ElementType::Char,
            TypeSignature::I1 => ElementType::I1,
            TypeSignature::U1 => ElementType::U1,
            TypeSignature::I2 => ElementType::I2,
            TypeSignature::U2 => ElementType::U2,
            TypeSignature::I4 => ElementType::I4,
            TypeSignature::U4 => ElementType::U4,
            TypeSignature::I8 => ElementType::I8,
            TypeSignature::U8 => ElementType::U8,
            TypeSignature::R4 => ElementType::R4,
            TypeSignature::R8 => ElementType::R8,
            TypeSignature::I => ElementType::I,
            TypeSignature::U => ElementType::U,
            TypeSignature::String => ElementType::String,
            TypeSignature::Object => ElementType::Object,
            TypeSignature::Ptr(_) => ElementType::Ptr,
            TypeSignature::ValueType(token) => {
                return match self.resolve_type_token(module, *token)? {
                    Some(class) => Ok(TypeDesc::value_type(class)),
                    None => Err(malformed_error!(
                        "Value type {} can not be resolved",
                        token
                    )),
                };
            }
            TypeSignature::Class(token) => {
                return match self.resolve_type_token(module, *token)? {
                    Some(class) => Ok(TypeDesc::class(class)),
                    None => {
                        warn!("class {} of module {} is not loaded", token, module);
                        Ok(TypeDesc::primitive(ElementType::Class))
                    }
                };
            }
            TypeSignature::GenericParamType(_) | TypeSignature::GenericParamMethod(_) => {
                return Ok(TypeDesc::primitive(ElementType::Object)
                    .with_modifiers(TypeModifiers::GENERIC_PARAM));
            }
            TypeSignature::SzArray(inner) => {
                return Ok(self
                    .type_signature_desc(module, inner)?
                    .with_modifiers(TypeModifiers::SZ_ARRAY));
            }
        };

        Ok(TypeDesc::primitive(element))
    }

    /// The argument and local layout of a method, computed on first use
    ///
    /// Arguments are placed in declaration order with the receiver first, each aligned to its
    /// own alignment. Locals follow the 8-byte aligned argument block.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] for an unknown method, and any error raised while
    /// decoding or resolving its signatures.
    pub fn method_frame(&self, id: MethodId) -> Result<&FrameLayout> {
        let Some(method) = self.method(id) else {
            return Err(OutOfBounds);
        };

        if let Some(frame) = method.frame.get() {
            return Ok(frame);
        }

        let signature = SignatureParser::new(&method.signature).parse_method_signature()?;

        let mut arg_types = Vec::with_capacity(signature.arg_count());
        if signature.has_this && !signature.explicit_this {
            let receiver = match self.class(method.class) {
                Some(class) if class.is_value_type => {
                    TypeDesc::value_type(method.class).with_modifiers(TypeModifiers::BY_REF)
                }
                _ => TypeDesc::class(method.class),
            };
            arg_types.push(receiver);
        }
        for param in &signature.params {
            arg_types.push(self.type_desc(method.module, param)?);
        }

        let (args, end) = self.place_slots(0, &arg_types)?;
        let params_size = align_up(end, POINTER_SIZE);

        let local_types = match method.body().and_then(|body| body.local_signature.as_deref()) {
            Some(blob) => SignatureParser::new(blob)
                .parse_local_var_signature()?
                .iter()
                .map(|local| self.type_desc(method.module, local))
                .collect::<Result<Vec<_>>>()?,
            None => Vec::new(),
        };
        let (locals, end) = self.place_slots(params_size, &local_types)?;
        let locals_size = align_up(end - params_size, POINTER_SIZE);

        let return_type = self.type_desc(method.module, &signature.return_type)?;

        let frame = FrameLayout {
            args,
            locals,
            return_type: (!return_type.is_void()).then_some(return_type),
            params_size,
            locals_size,
        };

        Ok(method.frame.get_or_init(|| frame))
    }

    /// Resolve a `MethodDef` or `MemberRef` token used by `call` or `newobj`
    ///
    /// # Errors
    /// Returns [`ExecutionError::BadToken`] for tokens of other tables,
    /// [`crate::Error::RowOutOfRange`] for rows outside the table, and
    /// [`crate::Error::BadMetadata`] for a `MemberRef` that matches no method.
    pub fn resolve_method_token(&self, module: ModuleId, token: Token) -> Result<MethodId> {
        let module_desc = self.module_of_token(module, token)?;

        match TableId::from_u8(token.table()) {
            Some(TableId::MethodDef) => {
                range_row(module_desc.methods, TableId::MethodDef, token.row()).map(MethodId::new)
            }
            Some(TableId::MemberRef) => {
                let member_ref = member_ref(module_desc, token)?;
                if let Some(method) = member_ref.method.get() {
                    return Ok(*method);
                }

                let Some(class) = self.member_ref_parent(module, token)? else {
                    // A MemberRef whose parent is a MethodDef names that method directly
                    return range_row(
                        module_desc.methods,
                        TableId::MethodDef,
                        member_ref.parent.row,
                    )
                    .map(MethodId::new);
                };

                let wanted = SignatureParser::new(&member_ref.signature).parse_method_signature()?;

                for class in self.hierarchy(class) {
                    for (id, candidate) in self.class_methods(class) {
                        if candidate.name != member_ref.name {
                            continue;
                        }

                        let signature =
                            SignatureParser::new(&candidate.signature).parse_method_signature()?;
                        if self.signatures_match(module, &wanted, candidate.module, &signature)? {
                            return Ok(*member_ref.method.get_or_init(|| id));
                        }
                    }
                }

                Err(malformed_error!(
                    "MemberRef {} names the missing method {}",
                    token,
                    member_ref.name
                ))
            }
            _ => Err(ExecutionError::BadToken(token).into()),
        }
    }

    /// Resolve a `Field` or `MemberRef` token used by the field access instructions
    ///
    /// # Errors
    /// Returns [`ExecutionError::BadToken`] for tokens of other tables,
    /// [`crate::Error::RowOutOfRange`] for rows outside the table, and
    /// [`crate::Error::BadMetadata`] for a `MemberRef` that matches no field.
    pub fn resolve_field_token(&self, module: ModuleId, token: Token) -> Result<FieldId> {
        let module_desc = self.module_of_token(module, token)?;

        match TableId::from_u8(token.table()) {
            Some(TableId::Field) => {
                range_row(module_desc.fields, TableId::Field, token.row()).map(FieldId::new)
            }
            Some(TableId::MemberRef) => {
                let member_ref = member_ref(module_desc, token)?;
                if let Some(field) = member_ref.field.get() {
                    return Ok(*field);
                }

                let Some(class) = self.member_ref_parent(module, token)? else {
                    return Err(ExecutionError::BadToken(token).into());
                };

                for class in self.hierarchy(class) {
                    if let Some((id, _)) = self
                        .class_fields(class)
                        .find(|(_, field)| field.name == member_ref.name)
                    {
                        return Ok(*member_ref.field.get_or_init(|| id));
                    }
                }

                Err(malformed_error!(
                    "MemberRef {} names the missing field {}",
                    token,
                    member_ref.name
                ))
            }
            _ => Err(ExecutionError::BadToken(token).into()),
        }
    }

    /// Decode the string literal behind an `ldstr` token of `module`
    ///
    /// # Errors
    /// Returns [`ExecutionError::BadToken`] if the token does not address the `#US` heap.
    pub fn user_string(&self, module: ModuleId, token: Token) -> Result<U16String> {
        self.module_of_token(module, token)?.user_string(token)
    }

    /// The class a `MemberRef` is declared on, `None` if the parent is a `MethodDef`
    fn member_ref_parent(&self, module: ModuleId, token: Token) -> Result<Option<ClassId>> {
        let module_desc = self.module_of_token(module, token)?;
        let parent = &member_ref(module_desc, token)?.parent;

        match parent.tag {
            TableId::TypeDef | TableId::TypeRef => {
                match self.resolve_type_token(module, parent.token)? {
                    Some(class) => Ok(Some(class)),
                    None => {
                        let name = match parent.row.checked_sub(1).and_then(|index| {
                            module_desc.type_refs.get(index as usize)
                        }) {
                            Some(type_ref) if parent.tag == TableId::TypeRef => {
                                format!("{}.{}", type_ref.namespace, type_ref.name)
                            }
                            _ => parent.token.to_string(),
                        };
                        Err(ExecutionError::ClassNotLoaded(name).into())
                    }
                }
            }
            TableId::MethodDef => Ok(None),
            _ => Err(NotSupported(format!(
                "MemberRef {} on a {:?} parent",
                token, parent.tag
            ))),
        }
    }

    /// `class` followed by its base classes
    fn hierarchy(&self, class: ClassId) -> impl Iterator<Item = ClassId> + '_ {
        std::iter::successors(Some(class), |current| {
            self.class(*current).and_then(|class| class.parent)
        })
        .take(MAX_HIERARCHY_DEPTH)
    }

    /// True if two method signatures, each relative to its own module, describe the same method
    fn signatures_match(
        &self,
        left_module: ModuleId,
        left: &SignatureMethod,
        right_module: ModuleId,
        right: &SignatureMethod,
    ) -> Result<bool> {
        if left.has_this != right.has_this
            || left.generic_param_count != right.generic_param_count
            || left.params.len() != right.params.len()
        {
            return Ok(false);
        }

        if self.type_desc(left_module, &left.return_type)?
            != self.type_desc(right_module, &right.return_type)?
        {
            return Ok(false);
        }

        for (left_param, right_param) in left.params.iter().zip(&right.params) {
            if self.type_desc(left_module, left_param)? != self.type_desc(right_module, right_param)?
            {
                return Ok(false);
            }
        }

        Ok(true)
    }

    /// Lay out `types` one after another from `start`, returns the slots and the end offset
    fn place_slots(&self, start: usize, types: &[TypeDesc]) -> Result<(Vec<VarDesc>, usize)> {
        let mut offset = start;
        let mut slots = Vec::with_capacity(types.len());

        for ty in types {
            let (size, alignment) = self.slot_layout(ty)?;
            offset = align_up(offset, alignment);
            slots.push(VarDesc {
                offset,
                size,
                ty: *ty,
            });
            offset += size;
        }

        Ok((slots, offset))
    }
}

/// Arena index of the 1-based `row` inside `range`
fn range_row(range: IdRange, table: TableId, row: u32) -> Result<u32> {
    if row == 0 || row as usize > range.len() {
        return Err(RowOutOfRange { table, row });
    }

    Ok(range.start + row - 1)
}

fn member_ref(module: &LoadedModule, token: Token) -> Result<&crate::typesystem::MemberRefInfo> {
    token
        .row()
        .checked_sub(1)
        .and_then(|index| module.member_refs.get(index as usize))
        .ok_or(RowOutOfRange {
            table: TableId::MemberRef,
            row: token.row(),
        })
}
