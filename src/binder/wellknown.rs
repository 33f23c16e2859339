//! The built-in types of the core library.

use strum::{EnumCount, EnumIter, IntoEnumIterator};

use crate::{
    binder::Binder,
    typesystem::{ClassId, ModuleId, TypeSystem},
    Error::WellKnownTypeMissing,
    Result,
};

/// A type every core library has to define.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, EnumCount)]
#[repr(usize)]
pub enum WellKnownType {
    /// System.Object - root of the class hierarchy
    Object,
    /// System.ValueType - base of all value types
    ValueType,
    /// System.Enum - base of all enumerations
    Enum,
    /// System.String - immutable UTF-16 text
    String,
    /// System.Void - the absence of a value
    Void,
    /// System.Boolean - true/false value
    Boolean,
    /// System.Char - UTF-16 code unit
    Char,
    /// System.SByte - signed 8-bit integer
    SByte,
    /// System.Byte - unsigned 8-bit integer
    Byte,
    /// System.Int16 - signed 16-bit integer
    Int16,
    /// System.UInt16 - unsigned 16-bit integer
    UInt16,
    /// System.Int32 - signed 32-bit integer
    Int32,
    /// System.UInt32 - unsigned 32-bit integer
    UInt32,
    /// System.Int64 - signed 64-bit integer
    Int64,
    /// System.UInt64 - unsigned 64-bit integer
    UInt64,
    /// System.Single - 32-bit floating point
    Single,
    /// System.Double - 64-bit floating point
    Double,
    /// System.IntPtr - native sized signed integer
    IntPtr,
    /// System.UIntPtr - native sized unsigned integer
    UIntPtr,
}

impl WellKnownType {
    /// Namespace of the type
    #[must_use]
    pub fn namespace(&self) -> &'static str {
        "System"
    }

    /// Simple name of the type
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            WellKnownType::Object => "Object",
            WellKnownType::ValueType => "ValueType",
            WellKnownType::Enum => "Enum",
            WellKnownType::String => "String",
            WellKnownType::Void => "Void",
            WellKnownType::Boolean => "Boolean",
            WellKnownType::Char => "Char",
            WellKnownType::SByte => "SByte",
            WellKnownType::Byte => "Byte",
            WellKnownType::Int16 => "Int16",
            WellKnownType::UInt16 => "UInt16",
            WellKnownType::Int32 => "Int32",
            WellKnownType::UInt32 => "UInt32",
            WellKnownType::Int64 => "Int64",
            WellKnownType::UInt64 => "UInt64",
            WellKnownType::Single => "Single",
            WellKnownType::Double => "Double",
            WellKnownType::IntPtr => "IntPtr",
            WellKnownType::UIntPtr => "UIntPtr",
        }
    }

    /// `System.Name`
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{}.{}", self.namespace(), self.name())
    }
}

/// The bound [`WellKnownType`]s of one core library.
///
/// Bound once after the core library is loaded and passed explicitly to whoever needs it,
/// e.g. [`crate::execution::Engine::with_well_known`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WellKnownTypes {
    module: ModuleId,
    classes: [ClassId; WellKnownType::COUNT],
}

impl WellKnownTypes {
    /// Bind every well-known type inside `core_module`
    ///
    /// ## Arguments
    /// * 'types'       - The type system the core library was loaded into
    /// * 'core_module' - The core library
    ///
    /// # Errors
    /// Returns [`crate::Error::WellKnownTypeMissing`] naming the first type the core library does
    /// not define.
    pub fn bind(types: &TypeSystem, core_module: ModuleId) -> Result<Self> {
        let binder = Binder::new(types);
        let mut classes = [ClassId::new(0); WellKnownType::COUNT];

        for well_known in WellKnownType::iter() {
            let Some(class) =
                binder.bind_type_in(core_module, well_known.namespace(), well_known.name())
            else {
                return Err(WellKnownTypeMissing(well_known.full_name()));
            };
            classes[well_known as usize] = class;
        }

        Ok(WellKnownTypes {
            module: core_module,
            classes,
        })
    }

    /// The class bound for `well_known`
    #[must_use]
    pub fn get(&self, well_known: WellKnownType) -> ClassId {
        self.classes[well_known as usize]
    }

    /// The core library the types were bound in
    #[must_use]
    pub fn module(&self) -> ModuleId {
        self.module
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{test::load_corlib, typesystem::LoadLevel};

    #[test]
    fn bind_all() {
        let (types, corlib) = load_corlib();
        let well_known = WellKnownTypes::bind(&types, corlib).unwrap();
        assert_eq!(well_known.module(), corlib);

        for kind in WellKnownType::iter() {
            let class = types.class(well_known.get(kind)).unwrap();
            assert!(class.is_named("System", kind.name()));
            assert_eq!(class.load_level, LoadLevel::StaticFieldsLoaded);
        }

        let int32 = types.class(well_known.get(WellKnownType::Int32)).unwrap();
        assert!(int32.is_value_type);
        assert_eq!(int32.instance_size, 4);

        let void = types.class(well_known.get(WellKnownType::Void)).unwrap();
        assert_eq!(void.instance_size, 1);

        let enum_class = types.class(well_known.get(WellKnownType::Enum)).unwrap();
        assert!(!enum_class.is_value_type);

        let string = types.class(well_known.get(WellKnownType::String)).unwrap();
        assert!(!string.is_value_type);
    }

    #[test]
    fn missing_type_fails_fast() {
        let mut types = TypeSystem::new(crate::execution::EcallRegistry::empty());
        let module = types
            .load(crate::File::from_mem(crate::test::minimal_image()).unwrap())
            .unwrap();

        match WellKnownTypes::bind(&types, module) {
            Err(WellKnownTypeMissing(name)) => assert_eq!(name, "System.Object"),
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn names() {
        assert_eq!(WellKnownType::COUNT, 19);
        assert_eq!(WellKnownType::UIntPtr.full_name(), "System.UIntPtr");
    }
}
