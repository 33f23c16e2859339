//! Metadata tables (ECMA-335 II.22) stored in the `#~` stream.
//!
//! [`TablesHeader`] locates every present table, [`TableInfo`] decides how wide each heap,
//! table and coded index column is, and [`MetadataTable`] gives typed, bounds-checked access to
//! the rows of one table. Row types exist for the tables the type system loader consumes; every
//! other table is still described by its column [`schema`](TableId::columns) so it can be
//! skipped correctly.

mod attributes;
mod codedindex;
mod header;
mod rows;
mod schema;
mod table;
mod tableid;
mod tableinfo;

pub use attributes::{
    FieldAttributes, TypeAttributes, FIELD_ACCESS_MASK, TYPE_LAYOUT_MASK, TYPE_VISIBILITY_MASK,
};
pub use codedindex::{CodedIndex, CodedIndexType};
pub use header::TablesHeader;
pub use rows::{
    AssemblyRaw, AssemblyRefRaw, FieldRaw, MemberRefRaw, MethodDefRaw, ModuleRaw, ParamRaw,
    StandAloneSigRaw, TypeDefRaw, TypeRefRaw, TypeSpecRaw,
};
pub use schema::Column;
pub use table::{MetadataTable, RowReadable};
pub use tableid::TableId;
pub use tableinfo::{TableInfo, TableInfoRef, TableRowInfo};
