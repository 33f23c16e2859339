//! Indices into the type system arenas.

use std::fmt;

macro_rules! arena_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(u32);

        impl $name {
            /// Build an id from its raw arena index
            #[must_use]
            pub const fn new(index: u32) -> Self {
                $name(index)
            }

            /// Position inside the arena
            #[must_use]
            pub const fn index(self) -> usize {
                self.0 as usize
            }

            /// The raw arena index
            #[must_use]
            pub const fn value(self) -> u32 {
                self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "#{}"), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "#{}"), self.0)
            }
        }
    };
}

arena_id!(
    /// Identifies an [`crate::typesystem::EEClass`]. Also stored in every object header.
    ClassId,
    "class"
);
arena_id!(
    /// Identifies a [`crate::typesystem::MethodDesc`]
    MethodId,
    "method"
);
arena_id!(
    /// Identifies a [`crate::typesystem::FieldDesc`]
    FieldId,
    "field"
);
arena_id!(
    /// Identifies a [`crate::typesystem::LoadedModule`]
    ModuleId,
    "module"
);

/// A contiguous run of arena indices, as owned by one class or one module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IdRange {
    /// First index
    pub start: u32,
    /// One past the last index
    pub end: u32,
}

impl IdRange {
    /// Create a range
    #[must_use]
    pub const fn new(start: u32, end: u32) -> Self {
        IdRange { start, end }
    }

    /// Number of entries
    #[must_use]
    pub const fn len(&self) -> usize {
        (self.end - self.start) as usize
    }

    /// True for an empty range
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// True if `index` lies inside the range
    #[must_use]
    pub const fn contains(&self, index: u32) -> bool {
        self.start <= index && index < self.end
    }

    /// The raw indices of the range
    pub fn iter(&self) -> std::ops::Range<u32> {
        self.start..self.end
    }

    /// The range shifted by `base`
    #[must_use]
    pub(crate) const fn offset(self, base: u32) -> IdRange {
        IdRange::new(self.start + base, self.end + base)
    }
}
