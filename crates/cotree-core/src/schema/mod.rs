//! Module: schema
//! Responsibility: immutable group catalog consumed by the scan core.
//! Does not own: DDL, persistence of definitions, or migration.
//! Boundary: built once through `GroupBuilder`, then shared by reference.

mod builder;
mod index;
mod table;

#[cfg(test)]
mod tests;

use crate::error::InternalError;
use serde::{Deserialize, Serialize};
use std::fmt;

// re-exports
pub use builder::GroupBuilder;
pub use index::IndexDef;
pub use table::{HKeyColumn, HKeyDef, HKeySegment, TableDef, TableRole};

///
/// TableId
///

#[derive(
    Clone, Copy, Debug, Default, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize,
)]
pub struct TableId(pub u32);

impl fmt::Display for TableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "table#{}", self.0)
    }
}

///
/// IndexId
///

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct IndexId(pub u32);

impl fmt::Display for IndexId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "index#{}", self.0)
    }
}

///
/// Ordinal
///
/// Stable per-group table tag written at the head of every hkey segment.
///

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Ordinal(pub u16);

impl fmt::Display for Ordinal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

///
/// GroupDef
///
/// A set of parent-child tables sharing one ordered key space.
/// Tables are stored in hkey pre-order (sorted by ordinal path), which is
/// also the order of their columns in the flattened group row.
///

#[derive(Clone, Debug)]
pub struct GroupDef {
    name: String,
    tables: Vec<TableDef>,
    indexes: Vec<IndexDef>,
    column_count: usize,
}

impl GroupDef {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Tables in hkey pre-order.
    #[must_use]
    pub fn tables(&self) -> &[TableDef] {
        &self.tables
    }

    pub fn table(&self, id: TableId) -> Result<&TableDef, InternalError> {
        self.tables
            .iter()
            .find(|table| table.id() == id)
            .ok_or_else(|| InternalError::schema_not_found("table", id))
    }

    #[must_use]
    pub fn table_by_name(&self, name: &str) -> Option<&TableDef> {
        self.tables.iter().find(|table| table.name() == name)
    }

    #[must_use]
    pub fn table_by_ordinal(&self, ordinal: Ordinal) -> Option<&TableDef> {
        self.tables.iter().find(|table| table.ordinal() == ordinal)
    }

    pub fn index(&self, id: IndexId) -> Result<&IndexDef, InternalError> {
        self.indexes
            .iter()
            .find(|index| index.id() == id)
            .ok_or_else(|| InternalError::schema_not_found("index", id))
    }

    #[must_use]
    pub fn index_by_name(&self, name: &str) -> Option<&IndexDef> {
        self.indexes.iter().find(|index| index.name() == name)
    }

    #[must_use]
    pub fn indexes(&self) -> &[IndexDef] {
        &self.indexes
    }

    /// Width of the flattened group row.
    #[must_use]
    pub const fn column_count(&self) -> usize {
        self.column_count
    }

    #[must_use]
    pub fn is_single_table(&self) -> bool {
        self.tables.len() == 1
    }

    /// Direct children of `id`, in ordinal order.
    pub fn children(&self, id: TableId) -> impl Iterator<Item = &TableDef> {
        self.tables
            .iter()
            .filter(move |table| table.parent() == Some(id))
    }
}
