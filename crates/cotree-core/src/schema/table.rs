use crate::schema::{IndexId, Ordinal, TableId};

///
/// TableRole
///
/// Position of a table in its group tree.
/// A childless root reports `Root`.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TableRole {
    Root,
    Intermediate,
    Leaf,
}

impl TableRole {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Root => "root",
            Self::Intermediate => "intermediate",
            Self::Leaf => "leaf",
        }
    }
}

///
/// HKeyColumn
///
/// One key column inside an hkey segment.
///
/// `position` is relative to the table owning the hkey definition.
/// `equivalents` are every group-relative position holding the same value:
/// the segment table's column and the join column of each descendant, in
/// table pre-order.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct HKeyColumn {
    pub position: usize,
    pub equivalents: Vec<usize>,
}

///
/// HKeySegment
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct HKeySegment {
    pub table: TableId,
    pub ordinal: Ordinal,
    pub columns: Vec<HKeyColumn>,
}

///
/// HKeyDef
///
/// Root-to-leaf segments of a table's hierarchical key.
///

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct HKeyDef {
    pub segments: Vec<HKeySegment>,
}

impl HKeyDef {
    /// Number of key elements: one ordinal plus one per column, per segment.
    #[must_use]
    pub fn element_count(&self) -> usize {
        self.segments.iter().map(|seg| 1 + seg.columns.len()).sum()
    }

    /// Key columns in key order, flattened across segments.
    pub fn columns(&self) -> impl Iterator<Item = &HKeyColumn> {
        self.segments.iter().flat_map(|seg| seg.columns.iter())
    }

    #[must_use]
    pub fn column_count(&self) -> usize {
        self.segments.iter().map(|seg| seg.columns.len()).sum()
    }
}

///
/// TableDef
///

#[derive(Clone, Debug)]
pub struct TableDef {
    pub(super) id: TableId,
    pub(super) name: String,
    pub(super) ordinal: Ordinal,
    pub(super) parent: Option<TableId>,
    pub(super) depth: usize,
    pub(super) column_offset: usize,
    pub(super) fields: Vec<String>,
    pub(super) primary_key: Vec<usize>,
    pub(super) hkey: HKeyDef,
    pub(super) indexes: Vec<IndexId>,
    pub(super) role: TableRole,
}

impl TableDef {
    #[must_use]
    pub const fn id(&self) -> TableId {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub const fn ordinal(&self) -> Ordinal {
        self.ordinal
    }

    #[must_use]
    pub const fn parent(&self) -> Option<TableId> {
        self.parent
    }

    /// Depth in the group tree; roots are at 0.
    #[must_use]
    pub const fn depth(&self) -> usize {
        self.depth
    }

    /// Position of this table's first column in the flattened group row.
    #[must_use]
    pub const fn column_offset(&self) -> usize {
        self.column_offset
    }

    #[must_use]
    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    #[must_use]
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    #[must_use]
    pub fn field_position(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|field| field == name)
    }

    #[must_use]
    pub fn primary_key(&self) -> &[usize] {
        &self.primary_key
    }

    #[must_use]
    pub const fn hkey(&self) -> &HKeyDef {
        &self.hkey
    }

    /// Element count of every row key of this table.
    #[must_use]
    pub fn hkey_depth(&self) -> usize {
        self.hkey.element_count()
    }

    #[must_use]
    pub fn indexes(&self) -> &[IndexId] {
        &self.indexes
    }

    #[must_use]
    pub const fn role(&self) -> TableRole {
        self.role
    }

    /// Group-relative column range of this table.
    #[must_use]
    pub fn group_columns(&self) -> std::ops::Range<usize> {
        self.column_offset..self.column_offset + self.fields.len()
    }
}
