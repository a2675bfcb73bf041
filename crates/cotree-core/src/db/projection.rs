//! Module: db::projection
//! Responsibility: which tables a scan materializes and whether an index
//! covers the requested columns.
//! Does not own: row elision itself (see `db::row`).

use crate::{
    db::{scan::ScanTarget, selector::ColumnSelector},
    error::{InternalError, ScanError},
    schema::{GroupDef, IndexDef, Ordinal, TableDef, TableId, TableRole},
};

///
/// ProjectedTable
///
/// One materialized level. `selector_offset` maps the table's field `i` to
/// selector bit `selector_offset + i`.
///
/// `role` is relative to the projection: a table with no projected
/// descendant is a `Leaf` and completes a chain, whatever its place in the
/// group.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ProjectedTable {
    pub table: TableId,
    pub hkey_depth: usize,
    pub ordinals: Vec<Ordinal>,
    pub selector_offset: usize,
    pub field_count: usize,
    pub role: TableRole,
}

impl ProjectedTable {
    fn new(table: &TableDef, selector_offset: usize) -> Self {
        Self {
            table: table.id(),
            hkey_depth: table.hkey_depth(),
            ordinals: table.hkey().segments.iter().map(|seg| seg.ordinal).collect(),
            selector_offset,
            field_count: table.field_count(),
            role: table.role(),
        }
    }

    /// Whether `other` sits strictly below this table.
    fn is_above(&self, other: &Self) -> bool {
        other.ordinals.len() > self.ordinals.len() && other.ordinals.starts_with(&self.ordinals)
    }

    /// Whether a row of this table ends a delivered chain.
    #[must_use]
    pub fn completes_chain(&self) -> bool {
        self.role == TableRole::Leaf
    }

    /// Whether field `position` survives elision.
    #[must_use]
    pub fn keeps(&self, selector: &ColumnSelector, position: usize) -> bool {
        selector.includes(self.selector_offset + position)
    }
}

///
/// Projection
///
/// Tables a scan produces rows for, ordered by hkey depth.
///
/// `branch` is the deepest table that is an ancestor-or-self of every
/// projected table; its hkey drives the primary filter. It is `None` when
/// projected tables sit under different roots, and when the selector keeps
/// no column of the target (an empty projection scans nothing).
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Projection {
    tables: Vec<ProjectedTable>,
    branch: Option<TableId>,
    max_hkey_depth: usize,
}

impl Projection {
    pub fn compute(
        group: &GroupDef,
        target: ScanTarget,
        selector: &ColumnSelector,
    ) -> Result<Self, ScanError> {
        let mut tables = Vec::new();

        match target {
            ScanTarget::Table(id) => {
                let table = group.table(id)?;
                // A table target's bit space holds only its own columns.
                if selector.is_empty() || selector.any_in(0..table.field_count()) {
                    tables.push(ProjectedTable::new(table, 0));
                }
            }
            ScanTarget::Group if selector.is_empty() => {
                if !group.is_single_table() {
                    return Err(ScanError::ProjectionAmbiguous {
                        tables: group.tables().len(),
                    });
                }
                let table = &group.tables()[0];
                tables.push(ProjectedTable::new(table, table.column_offset()));
            }
            ScanTarget::Group => {
                for table in group.tables() {
                    if selector.any_in(table.group_columns()) {
                        tables.push(ProjectedTable::new(table, table.column_offset()));
                    }
                }
            }
        }

        tables.sort_by_key(|level| level.hkey_depth);
        let roles: Vec<_> = tables
            .iter()
            .map(|level| {
                if tables.iter().any(|other| level.is_above(other)) {
                    level.role
                } else {
                    TableRole::Leaf
                }
            })
            .collect();
        for (level, role) in tables.iter_mut().zip(roles) {
            level.role = role;
        }

        let branch = common_branch(group, &tables)?;
        let max_hkey_depth = tables.iter().map(|level| level.hkey_depth).max().unwrap_or(0);

        Ok(Self {
            tables,
            branch,
            max_hkey_depth,
        })
    }

    #[must_use]
    pub fn levels(&self) -> &[ProjectedTable] {
        &self.tables
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    #[must_use]
    pub fn level(&self, level: usize) -> Option<&ProjectedTable> {
        self.tables.get(level)
    }

    #[must_use]
    pub fn level_of(&self, table: TableId) -> Option<usize> {
        self.tables.iter().position(|level| level.table == table)
    }

    /// Deepest projected level.
    #[must_use]
    pub fn leaf(&self) -> Option<&ProjectedTable> {
        self.tables.last()
    }

    #[must_use]
    pub const fn branch(&self) -> Option<TableId> {
        self.branch
    }

    #[must_use]
    pub const fn max_hkey_depth(&self) -> usize {
        self.max_hkey_depth
    }
}

fn common_branch(
    group: &GroupDef,
    tables: &[ProjectedTable],
) -> Result<Option<TableId>, InternalError> {
    let mut common: Option<Vec<TableId>> = None;

    for level in tables {
        let chain = ancestor_chain(group, level.table)?;
        common = Some(match common {
            None => chain,
            Some(prev) => prev
                .iter()
                .zip(&chain)
                .take_while(|(a, b)| a == b)
                .map(|(a, _)| *a)
                .collect(),
        });
    }

    Ok(common.and_then(|chain| chain.last().copied()))
}

// Root first.
fn ancestor_chain(group: &GroupDef, table: TableId) -> Result<Vec<TableId>, InternalError> {
    let mut chain = vec![table];
    let mut current = group.table(table)?;
    while let Some(parent) = current.parent() {
        chain.push(parent);
        current = group.table(parent)?;
    }
    chain.reverse();

    Ok(chain)
}

///
/// CoveredField
///
/// Entry-key depth holding one requested table field.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct CoveredField {
    pub index_depth: usize,
    pub field: usize,
}

/// Index depth of every requested column, or `None` when the index does not
/// hold them all. Group targets are never covered.
#[must_use]
pub fn covering_fields(
    target: ScanTarget,
    table: &TableDef,
    index: &IndexDef,
    selector: &ColumnSelector,
) -> Option<Vec<CoveredField>> {
    let ScanTarget::Table(id) = target else {
        return None;
    };
    if id != table.id() || index.table() != id {
        return None;
    }

    selector
        .columns()
        .take_while(|field| *field < table.field_count())
        .map(|field| {
            index.key_depth_of(field).map(|index_depth| CoveredField {
                index_depth,
                field,
            })
        })
        .collect()
}

///
/// TESTS
///
