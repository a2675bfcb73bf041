use crate::{
    MAX_GROUP_TABLES,
    error::InternalError,
    schema::{
        GroupDef, HKeyColumn, HKeyDef, HKeySegment, IndexDef, IndexId, Ordinal, TableDef,
        TableId, TableRole,
    },
};
use std::collections::BTreeSet;

///
/// GroupBuilder
///
/// Fluent catalog builder. Declaration order assigns table ids; parents must
/// be declared before their children. `build` resolves the tree, assigns
/// column offsets in hkey pre-order, derives every hkey definition, and
/// creates a `PRIMARY` index per table ahead of declared indexes.
///

#[derive(Debug, Default)]
pub struct GroupBuilder {
    name: String,
    tables: Vec<TableSpec>,
    indexes: Vec<IndexSpec>,
}

#[derive(Debug)]
struct TableSpec {
    name: String,
    ordinal: u16,
    fields: Vec<String>,
    primary_key: Vec<String>,
    parent: Option<ParentSpec>,
}

#[derive(Debug)]
struct ParentSpec {
    table: String,
    // (child column, parent column)
    join: Vec<(String, String)>,
}

#[derive(Debug)]
struct IndexSpec {
    table: String,
    name: String,
    fields: Vec<String>,
}

impl GroupBuilder {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Declare a table without a parent.
    #[must_use]
    pub fn root(mut self, name: &str, ordinal: u16, fields: &[&str], primary_key: &[&str]) -> Self {
        self.tables.push(TableSpec {
            name: name.to_string(),
            ordinal,
            fields: to_strings(fields),
            primary_key: to_strings(primary_key),
            parent: None,
        });
        self
    }

    /// Declare a child table joined to `parent` through `(child, parent)`
    /// column pairs. The join must cover every parent hkey column.
    #[must_use]
    pub fn child(
        mut self,
        name: &str,
        ordinal: u16,
        fields: &[&str],
        primary_key: &[&str],
        parent: &str,
        join: &[(&str, &str)],
    ) -> Self {
        self.tables.push(TableSpec {
            name: name.to_string(),
            ordinal,
            fields: to_strings(fields),
            primary_key: to_strings(primary_key),
            parent: Some(ParentSpec {
                table: parent.to_string(),
                join: join
                    .iter()
                    .map(|(child, parent)| ((*child).to_string(), (*parent).to_string()))
                    .collect(),
            }),
        });
        self
    }

    /// Declare a secondary index over `table`.
    #[must_use]
    pub fn index(mut self, table: &str, name: &str, fields: &[&str]) -> Self {
        self.indexes.push(IndexSpec {
            table: table.to_string(),
            name: name.to_string(),
            fields: to_strings(fields),
        });
        self
    }

    pub fn build(self) -> Result<GroupDef, InternalError> {
        self.validate_tables()?;

        let parents = self.resolve_parents()?;
        let order = pre_order(&self.tables, &parents);

        // depth and column offsets follow pre-order
        let mut depth = vec![0usize; self.tables.len()];
        let mut offset = vec![0usize; self.tables.len()];
        let mut column_count = 0;
        for &idx in &order {
            if let Some(parent) = parents[idx] {
                depth[idx] = depth[parent] + 1;
            }
            offset[idx] = column_count;
            column_count += self.tables[idx].fields.len();
        }

        let mut hkeys: Vec<Option<HKeyDef>> = vec![None; self.tables.len()];
        for &idx in &order {
            let hkey = self.derive_hkey(idx, parents[idx], &hkeys)?;
            hkeys[idx] = Some(hkey);
        }
        let mut hkeys: Vec<HKeyDef> = hkeys.into_iter().map(Option::unwrap_or_default).collect();
        assign_equivalents(&mut hkeys, &order, &offset);

        let indexes = self.build_indexes(&order, &hkeys)?;

        let mut tables = Vec::with_capacity(order.len());
        for &idx in &order {
            let spec = &self.tables[idx];
            let id = table_id(idx);
            let has_children = parents.contains(&Some(idx));
            let role = match (parents[idx], has_children) {
                (None, _) => TableRole::Root,
                (Some(_), true) => TableRole::Intermediate,
                (Some(_), false) => TableRole::Leaf,
            };

            tables.push(TableDef {
                id,
                name: spec.name.clone(),
                ordinal: Ordinal(spec.ordinal),
                parent: parents[idx].map(table_id),
                depth: depth[idx],
                column_offset: offset[idx],
                fields: spec.fields.clone(),
                primary_key: positions(spec, &spec.primary_key)?,
                hkey: hkeys[idx].clone(),
                indexes: indexes
                    .iter()
                    .filter(|index| index.table == id)
                    .map(IndexDef::id)
                    .collect(),
                role,
            });
        }

        Ok(GroupDef {
            name: self.name,
            tables,
            indexes,
            column_count,
        })
    }

    fn validate_tables(&self) -> Result<(), InternalError> {
        if self.tables.is_empty() {
            return Err(InternalError::schema_invariant(format!(
                "group '{}' declares no tables",
                self.name
            )));
        }
        if self.tables.len() > MAX_GROUP_TABLES {
            return Err(InternalError::schema_invariant(format!(
                "group '{}' declares {} tables (limit {MAX_GROUP_TABLES})",
                self.name,
                self.tables.len()
            )));
        }

        let mut names = BTreeSet::new();
        let mut ordinals = BTreeSet::new();
        for spec in &self.tables {
            if !names.insert(spec.name.as_str()) {
                return Err(InternalError::schema_invariant(format!(
                    "duplicate table name '{}'",
                    spec.name
                )));
            }
            if !ordinals.insert(spec.ordinal) {
                return Err(InternalError::schema_invariant(format!(
                    "duplicate ordinal {} on table '{}'",
                    spec.ordinal, spec.name
                )));
            }
            if spec.fields.is_empty() {
                return Err(InternalError::schema_invariant(format!(
                    "table '{}' declares no fields",
                    spec.name
                )));
            }
        }

        Ok(())
    }

    fn resolve_parents(&self) -> Result<Vec<Option<usize>>, InternalError> {
        self.tables
            .iter()
            .enumerate()
            .map(|(idx, spec)| {
                let Some(parent) = &spec.parent else {
                    return Ok(None);
                };
                let parent_idx = self.tables[..idx]
                    .iter()
                    .position(|candidate| candidate.name == parent.table)
                    .ok_or_else(|| {
                        InternalError::schema_invariant(format!(
                            "parent '{}' of table '{}' must be declared first",
                            parent.table, spec.name
                        ))
                    })?;

                Ok(Some(parent_idx))
            })
            .collect()
    }

    fn derive_hkey(
        &self,
        idx: usize,
        parent: Option<usize>,
        hkeys: &[Option<HKeyDef>],
    ) -> Result<HKeyDef, InternalError> {
        let spec = &self.tables[idx];
        let mut segments = Vec::new();
        let mut joined = BTreeSet::new();

        if let (Some(parent_idx), Some(parent_spec)) = (parent, spec.parent.as_ref()) {
            let parent_table = &self.tables[parent_idx];
            let join = parent_spec
                .join
                .iter()
                .map(|(child_col, parent_col)| {
                    Ok((
                        position(spec, child_col)?,
                        position(parent_table, parent_col)?,
                    ))
                })
                .collect::<Result<Vec<_>, InternalError>>()?;

            let parent_hkey = hkeys[parent_idx].as_ref().ok_or_else(|| {
                InternalError::schema_invariant(format!(
                    "hkey of '{}' derived before its parent",
                    spec.name
                ))
            })?;

            for segment in &parent_hkey.segments {
                let mut columns = Vec::with_capacity(segment.columns.len());
                for column in &segment.columns {
                    let child_pos = join
                        .iter()
                        .find(|(_, parent_pos)| *parent_pos == column.position)
                        .map(|(child_pos, _)| *child_pos)
                        .ok_or_else(|| {
                            InternalError::schema_invariant(format!(
                                "join of '{}' does not cover parent hkey column '{}'",
                                spec.name, parent_table.fields[column.position]
                            ))
                        })?;

                    joined.insert(child_pos);
                    columns.push(HKeyColumn {
                        position: child_pos,
                        equivalents: Vec::new(),
                    });
                }

                segments.push(HKeySegment {
                    table: segment.table,
                    ordinal: segment.ordinal,
                    columns,
                });
            }
        }

        let own = positions(spec, &spec.primary_key)?
            .into_iter()
            .filter(|pos| !joined.contains(pos))
            .map(|pos| HKeyColumn {
                position: pos,
                equivalents: Vec::new(),
            })
            .collect();

        segments.push(HKeySegment {
            table: table_id(idx),
            ordinal: Ordinal(spec.ordinal),
            columns: own,
        });

        Ok(HKeyDef { segments })
    }

    fn build_indexes(
        &self,
        order: &[usize],
        hkeys: &[HKeyDef],
    ) -> Result<Vec<IndexDef>, InternalError> {
        let mut indexes = Vec::with_capacity(order.len() + self.indexes.len());

        for &idx in order {
            let hkey_columns: Vec<usize> = hkeys[idx].columns().map(|col| col.position).collect();
            indexes.push(IndexDef {
                id: IndexId(0),
                name: IndexDef::PRIMARY.to_string(),
                table: table_id(idx),
                fields: hkey_columns.clone(),
                hkey_map: (0..hkey_columns.len()).collect(),
                key_fields: hkey_columns,
                hkey_equivalent: true,
            });
        }

        let mut names = BTreeSet::new();
        for spec in &self.indexes {
            if !names.insert(spec.name.as_str()) || spec.name == IndexDef::PRIMARY {
                return Err(InternalError::schema_invariant(format!(
                    "duplicate index name '{}'",
                    spec.name
                )));
            }

            let idx = self
                .tables
                .iter()
                .position(|table| table.name == spec.table)
                .ok_or_else(|| InternalError::schema_not_found("table", &spec.table))?;
            if spec.fields.is_empty() {
                return Err(InternalError::schema_invariant(format!(
                    "index '{}' declares no fields",
                    spec.name
                )));
            }

            let fields = positions(&self.tables[idx], &spec.fields)?;
            let hkey_columns: Vec<usize> = hkeys[idx].columns().map(|col| col.position).collect();

            let mut key_fields = fields.clone();
            for &pos in &hkey_columns {
                if !key_fields.contains(&pos) {
                    key_fields.push(pos);
                }
            }

            let hkey_map = hkey_columns
                .iter()
                .map(|pos| key_fields.iter().position(|field| field == pos).unwrap_or(0))
                .collect();

            indexes.push(IndexDef {
                id: IndexId(0),
                name: spec.name.clone(),
                table: table_id(idx),
                hkey_equivalent: key_fields == hkey_columns,
                fields,
                key_fields,
                hkey_map,
            });
        }

        for (slot, index) in indexes.iter_mut().enumerate() {
            index.id = IndexId(u32::try_from(slot + 1).unwrap_or(u32::MAX));
        }

        Ok(indexes)
    }
}

// Every group position holding the value of one segment column: the
// segment table's own column plus the join column of each descendant.
fn assign_equivalents(hkeys: &mut [HKeyDef], order: &[usize], offset: &[usize]) {
    let snapshot = hkeys.to_vec();

    for hkey in hkeys.iter_mut() {
        for (seg_idx, segment) in hkey.segments.iter_mut().enumerate() {
            let segment_table = segment.table;
            for (col_idx, column) in segment.columns.iter_mut().enumerate() {
                column.equivalents = order
                    .iter()
                    .filter_map(|&idx| {
                        snapshot[idx]
                            .segments
                            .get(seg_idx)
                            .filter(|seg| seg.table == segment_table)
                            .and_then(|seg| seg.columns.get(col_idx))
                            .map(|col| offset[idx] + col.position)
                    })
                    .collect();
            }
        }
    }
}

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|item| (*item).to_string()).collect()
}

fn table_id(idx: usize) -> TableId {
    // bounded by MAX_GROUP_TABLES
    TableId(u32::try_from(idx + 1).unwrap_or(u32::MAX))
}

fn position(spec: &TableSpec, column: &str) -> Result<usize, InternalError> {
    spec.fields
        .iter()
        .position(|field| field == column)
        .ok_or_else(|| InternalError::schema_not_found("column", format!("{}.{column}", spec.name)))
}

fn positions(spec: &TableSpec, columns: &[String]) -> Result<Vec<usize>, InternalError> {
    columns.iter().map(|column| position(spec, column)).collect()
}

// Tables sorted so every parent precedes its subtree and siblings follow
// ordinal order, matching hkey byte order.
fn pre_order(tables: &[TableSpec], parents: &[Option<usize>]) -> Vec<usize> {
    fn visit(
        idx: usize,
        tables: &[TableSpec],
        parents: &[Option<usize>],
        out: &mut Vec<usize>,
    ) {
        out.push(idx);
        for child in children_of(Some(idx), tables, parents) {
            visit(child, tables, parents, out);
        }
    }

    fn children_of(
        parent: Option<usize>,
        tables: &[TableSpec],
        parents: &[Option<usize>],
    ) -> Vec<usize> {
        let mut children: Vec<usize> = (0..tables.len())
            .filter(|&idx| parents[idx] == parent)
            .collect();
        children.sort_by_key(|&idx| tables[idx].ordinal);
        children
    }

    let mut out = Vec::with_capacity(tables.len());
    for root in children_of(None, tables, parents) {
        visit(root, tables, parents, &mut out);
    }
    out
}
