use crate::schema::{IndexId, TableId};
use std::fmt::{self, Display};

///
/// IndexDef
///
/// Secondary index over one table.
///
/// An entry key holds the index fields followed by every hkey column the
/// fields do not already contain, so each entry resolves to exactly one row.
/// All positions are relative to the indexed table.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct IndexDef {
    pub(super) id: IndexId,
    pub(super) name: String,
    pub(super) table: TableId,
    pub(super) fields: Vec<usize>,
    pub(super) key_fields: Vec<usize>,
    pub(super) hkey_map: Vec<usize>,
    pub(super) hkey_equivalent: bool,
}

impl IndexDef {
    /// Name given to the index every table carries over its hkey columns.
    pub const PRIMARY: &'static str = "PRIMARY";

    #[must_use]
    pub const fn id(&self) -> IndexId {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub const fn table(&self) -> TableId {
        self.table
    }

    /// Declared index fields.
    #[must_use]
    pub fn fields(&self) -> &[usize] {
        &self.fields
    }

    /// Full entry-key layout.
    #[must_use]
    pub fn key_fields(&self) -> &[usize] {
        &self.key_fields
    }

    /// Entry-key depth of each hkey column, in hkey column order.
    #[must_use]
    pub fn hkey_map(&self) -> &[usize] {
        &self.hkey_map
    }

    /// Entry keys order exactly like the table's hkeys; scanning through the
    /// index is the same as scanning the group tree directly.
    #[must_use]
    pub const fn is_hkey_equivalent(&self) -> bool {
        self.hkey_equivalent
    }

    /// Entry-key depth holding table column `position`, if any.
    #[must_use]
    pub fn key_depth_of(&self, position: usize) -> Option<usize> {
        self.key_fields.iter().position(|&field| field == position)
    }
}

impl Display for IndexDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields = self
            .fields
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");

        write!(f, "{}({})", self.name, fields)
    }
}
