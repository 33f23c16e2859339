//! The five load passes of [`TypeSystem::load`].

use std::sync::{Arc, OnceLock};

use log::{debug, warn};

use crate::{
    metadata::{
        importer::Importer,
        method::{MethodAttributes, MethodBody, MethodImplAttributes},
        signatures::SignatureParser,
        streams::Strings,
        tables::{
            AssemblyRaw, CodedIndex, FieldAttributes, FieldRaw, MemberRefRaw, MethodDefRaw,
            ModuleRaw, StandAloneSigRaw, TableId, TypeAttributes, TypeDefRaw, TypeRefRaw,
        },
        token::Token,
    },
    typesystem::{
        BytecodeBody, ClassId, EEClass, FieldDesc, IdRange, LoadedModule, MemberRefInfo,
        MethodDesc, MethodImplementation, ModuleId, TypeRefInfo, TypeSystem, VarDesc,
    },
    File, Result,
};

/// Arena lengths before a load, restored when the load fails
struct Checkpoint {
    modules: usize,
    classes: usize,
    methods: usize,
    fields: usize,
}

impl TypeSystem {
    /// Load an image and build descriptors for everything it defines
    ///
    /// Type references are bound against the modules loaded so far, so the core library has to
    /// be loaded before the modules that use it. A failed load leaves the type system as it was.
    ///
    /// ## Arguments
    /// * 'file' - The image to load, owned by the type system from now on
    ///
    /// # Errors
    /// Returns [`crate::Error::ImageFormat`], [`crate::Error::BadMetadata`],
    /// [`crate::Error::RowOutOfRange`] or [`crate::Error::NotSupported`] if the image can not be
    /// loaded.
    pub fn load(&mut self, file: File) -> Result<ModuleId> {
        let checkpoint = Checkpoint {
            modules: self.modules.len(),
            classes: self.classes.len(),
            methods: self.methods.len(),
            fields: self.fields.len(),
        };

        match self.load_module(Arc::new(file)) {
            Ok(module) => Ok(module),
            Err(error) => {
                self.modules.truncate(checkpoint.modules);
                self.classes.truncate(checkpoint.classes);
                self.methods.truncate(checkpoint.methods);
                self.fields.truncate(checkpoint.fields);
                Err(error)
            }
        }
    }

    fn load_module(&mut self, file: Arc<File>) -> Result<ModuleId> {
        let importer = Importer::new(&file)?;
        let module_id = ModuleId::new(self.modules.len() as u32);

        let type_defs = importer
            .tables
            .table::<TypeDefRaw>()?
            .iter()
            .collect::<Result<Vec<_>>>()?;
        let method_count = importer.tables.row_count(TableId::MethodDef);
        let field_count = importer.tables.row_count(TableId::Field);

        let method_ranges = slice_member_lists(
            type_defs.iter().map(|row| row.method_list),
            method_count,
            TableId::MethodDef,
        )?;
        let field_ranges = slice_member_lists(
            type_defs.iter().map(|row| row.field_list),
            field_count,
            TableId::Field,
        )?;

        let class_start = self.classes.len() as u32;
        let method_start = self.methods.len() as u32;
        let field_start = self.fields.len() as u32;

        let module = read_module_info(&importer, Arc::clone(&file))?;
        self.modules.push(LoadedModule {
            classes: IdRange::new(class_start, class_start + type_defs.len() as u32),
            methods: IdRange::new(method_start, method_start + method_count),
            fields: IdRange::new(field_start, field_start + field_count),
            ..module
        });

        // Pass 1
        let mut method_owners = vec![ClassId::new(0); method_count as usize];
        let mut field_owners = vec![ClassId::new(0); field_count as usize];

        for (index, row) in type_defs.iter().enumerate() {
            let class_id = ClassId::new(class_start + index as u32);
            let (methods, fields) = (method_ranges[index], field_ranges[index]);

            method_owners[methods.start as usize..methods.end as usize].fill(class_id);
            field_owners[fields.start as usize..fields.end as usize].fill(class_id);

            let mut class = EEClass::new(
                module_id,
                row.token,
                importer.strings.get(row.type_namespace as usize)?.to_string(),
                importer.strings.get(row.type_name as usize)?.to_string(),
            );
            class.flags = TypeAttributes::from_bits_retain(row.flags);
            class.methods = methods.offset(method_start);
            class.fields = fields.offset(field_start);
            self.classes.push(class);
        }

        for (index, row) in type_defs.iter().enumerate() {
            if row.extends.is_null() {
                continue;
            }

            let class_index = class_start as usize + index;
            let parent = self.resolve_type_token(module_id, row.extends.token)?;
            if parent.is_none() {
                warn!(
                    "base class {} of {} is not loaded",
                    row.extends.token,
                    self.classes[class_index].full_name()
                );
            }

            let (namespace, name) = referenced_name(&importer, &row.extends)?;
            let class = &mut self.classes[class_index];
            class.parent = parent;
            class.is_value_type = namespace == "System"
                && (name == "ValueType" || name == "Enum")
                && !class.is_named("System", "Enum");
        }

        debug!(
            "module {} - pass 1, {} classes",
            self.modules[module_id.index()].name,
            type_defs.len()
        );

        // Pass 2
        let stand_alone_sigs = importer.tables.table::<StandAloneSigRaw>()?;
        for (index, row) in importer.tables.table::<MethodDefRaw>()?.iter().enumerate() {
            let row = row?;
            let class = method_owners[index];
            let name = importer.strings.get(row.name as usize)?.to_string();
            let signature = importer.blobs.get(row.signature as usize)?.to_vec();
            let impl_flags = MethodImplAttributes::from_bits_retain(row.impl_flags);

            let implementation = if impl_flags.contains(MethodImplAttributes::INTERNAL_CALL) {
                let arg_count = SignatureParser::new(&signature)
                    .parse_method_signature()?
                    .arg_count();
                let owner = &self.classes[class.index()];

                match self
                    .ecalls
                    .lookup(&owner.namespace, &owner.name, &name, arg_count)
                {
                    Some(function) => MethodImplementation::Native {
                        function,
                        arg_count,
                    },
                    None => {
                        warn!(
                            "no native implementation for {}::{} with {} arguments",
                            owner.full_name(),
                            name,
                            arg_count
                        );
                        MethodImplementation::UnboundNative
                    }
                }
            } else if row.rva == 0 {
                MethodImplementation::Abstract
            } else {
                let offset = file.rva_to_offset(row.rva as usize)?;
                let Some(data) = file.data().get(offset..) else {
                    return Err(image_error!("Method body of {} starts past the image", name));
                };
                let header = MethodBody::from(data)?;

                let local_signature = if header.local_var_sig_token.is_null() {
                    None
                } else {
                    let token = header.local_var_sig_token;
                    if token.table() != TableId::StandAloneSig as u8 {
                        return Err(malformed_error!(
                            "Local signature token {} of {} is not a StandAloneSig",
                            token,
                            name
                        ));
                    }
                    let sig = stand_alone_sigs.get(token.row())?;
                    Some(importer.blobs.get(sig.signature as usize)?.to_vec())
                };

                let begin = offset + header.size_header;
                MethodImplementation::Bytecode(BytecodeBody {
                    begin,
                    end: begin + header.size_code,
                    max_stack: header.max_stack,
                    init_locals: header.is_init_local,
                    local_signature,
                })
            };

            self.methods.push(MethodDesc {
                class,
                module: module_id,
                token: row.token,
                name,
                flags: MethodAttributes::from_bits_retain(row.flags),
                impl_flags,
                signature,
                implementation,
                frame: OnceLock::new(),
            });
        }

        debug!("module {} - pass 2, {} methods", module_id, method_count);

        // Pass 3
        for (index, row) in importer.tables.table::<FieldRaw>()?.iter().enumerate() {
            let row = row?;
            self.fields.push(FieldDesc {
                class: field_owners[index],
                module: module_id,
                token: row.token,
                name: importer.strings.get(row.name as usize)?.to_string(),
                flags: FieldAttributes::from_bits_retain(row.flags),
                signature: importer.blobs.get(row.signature as usize)?.to_vec(),
                var: VarDesc::default(),
            });
        }

        debug!("module {} - pass 3, {} fields", module_id, field_count);

        // Pass 4
        let classes = self.modules[module_id.index()].classes;
        for class in classes.iter().map(ClassId::new) {
            self.layout_instance(class)?;
        }

        debug!("module {} - pass 4, instance layout done", module_id);

        // Pass 5
        for class in classes.iter().map(ClassId::new) {
            self.layout_statics(class)?;
        }

        debug!("module {} - pass 5, static layout done", module_id);

        Ok(module_id)
    }
}

/// Namespace and name of the `TypeDef` or `TypeRef` a coded index points at
fn referenced_name(importer: &Importer<'_>, index: &CodedIndex) -> Result<(String, String)> {
    match index.tag {
        TableId::TypeDef => {
            let row = importer.tables.table::<TypeDefRaw>()?.get(index.row)?;
            Ok((
                importer.strings.get(row.type_namespace as usize)?.to_string(),
                importer.strings.get(row.type_name as usize)?.to_string(),
            ))
        }
        TableId::TypeRef => {
            let row = importer.tables.table::<TypeRefRaw>()?.get(index.row)?;
            Ok((
                importer.strings.get(row.type_namespace as usize)?.to_string(),
                importer.strings.get(row.type_name as usize)?.to_string(),
            ))
        }
        _ => Ok((String::new(), String::new())),
    }
}

/// Turn the list starts of consecutive `TypeDef` rows into 0-based member ranges
///
/// Every type owns the rows from its own list start up to the next type's list start, the last
/// type owns everything up to the end of the table.
///
/// ## Arguments
/// * 'starts'  - The 1-based `MethodList` or `FieldList` column of every `TypeDef` row
/// * 'count'   - Row count of the member table
/// * 'table'   - The member table, for error messages
pub(crate) fn slice_member_lists(
    starts: impl Iterator<Item = u32>,
    count: u32,
    table: TableId,
) -> Result<Vec<IdRange>> {
    let starts: Vec<u32> = starts.collect();
    let mut ranges = Vec::with_capacity(starts.len());

    if let Some(&first) = starts.first() {
        if first > 1 && count > 0 {
            return Err(malformed_error!(
                "{:?} rows 1..{} are owned by no type",
                table,
                first
            ));
        }
    } else if count > 0 {
        return Err(malformed_error!("{:?} has {} rows but no types", table, count));
    }

    let mut previous = 1;
    for (index, &start) in starts.iter().enumerate() {
        if start < previous || start > count + 1 {
            return Err(malformed_error!(
                "{:?} list of type {} starts at {}, expected {}..={}",
                table,
                index + 1,
                start,
                previous,
                count + 1
            ));
        }

        let end = starts.get(index + 1).copied().unwrap_or(count + 1).clamp(start, count + 1);
        ranges.push(IdRange::new(start - 1, end - 1));
        previous = start;
    }

    Ok(ranges)
}

/// Name, identity and name tables of a module, with empty arena ranges
fn read_module_info(importer: &Importer<'_>, file: Arc<File>) -> Result<LoadedModule> {
    let module_table = importer.tables.table::<ModuleRaw>()?;
    let (name, mvid) = if module_table.row_count() > 0 {
        let row = module_table.get(1)?;
        let mvid = match &importer.guids {
            Some(guids) if row.mvid != 0 => Some(guids.get(row.mvid as usize)?),
            _ => None,
        };
        (importer.strings.get(row.name as usize)?.to_string(), mvid)
    } else {
        return Err(malformed_error!("Image has no Module row"));
    };

    let assembly_table = importer.tables.table::<AssemblyRaw>()?;
    let assembly_name = if assembly_table.row_count() > 0 {
        Some(
            importer
                .strings
                .get(assembly_table.get(1)?.name as usize)?
                .to_string(),
        )
    } else {
        None
    };

    let type_refs = importer
        .tables
        .table::<TypeRefRaw>()?
        .iter()
        .map(|row| {
            let row = row?;
            Ok(TypeRefInfo {
                namespace: string(&importer.strings, row.type_namespace)?,
                name: string(&importer.strings, row.type_name)?,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let member_refs = importer
        .tables
        .table::<MemberRefRaw>()?
        .iter()
        .map(|row| {
            let row = row?;
            Ok(MemberRefInfo {
                parent: row.class,
                name: string(&importer.strings, row.name)?,
                signature: importer.blobs.get(row.signature as usize)?.to_vec(),
                method: OnceLock::new(),
                field: OnceLock::new(),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(LoadedModule {
        name,
        assembly_name,
        mvid,
        entry_point: Token::new(importer.cor20.entry_point_token),
        classes: IdRange::default(),
        methods: IdRange::default(),
        fields: IdRange::default(),
        type_refs,
        member_refs,
        user_strings: importer.user_strings_range(),
        file,
    })
}

fn string(strings: &Strings<'_>, index: u32) -> Result<String> {
    Ok(strings.get(index as usize)?.to_string())
}
