//! Module: db::scan::ancestor
//! Responsibility: per-level pending rows and the decision of which
//! ancestor levels changed between consecutive keys.
//! Does not own: traversal or delivery.

use crate::{
    db::{
        hkey::{HKey, first_differing_offset},
        projection::{ProjectedTable, Projection},
        row::RowData,
        selector::ColumnSelector,
    },
    error::{InternalError, ScanError},
    obs::sink::{self, MetricsEvent},
    schema::{GroupDef, TableDef},
};

///
/// AncestorSource
///
/// Point lookup of an ancestor row by its hkey prefix.
///

pub(crate) trait AncestorSource {
    fn fetch_ancestor(&mut self, key: &[u8], out: &mut Vec<u8>) -> Result<bool, ScanError>;
}

///
/// SlotRole
///
/// Part a slot plays in the chain being delivered.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum SlotRole {
    Ancestor,
    Leaf,
    Deep,
}

impl SlotRole {
    pub(crate) const fn of(level: usize, leaf: usize, deep_level: usize) -> Self {
        if level == deep_level {
            Self::Deep
        } else if level == leaf {
            Self::Leaf
        } else {
            Self::Ancestor
        }
    }

    pub(crate) const fn label(self) -> &'static str {
        match self {
            Self::Ancestor => "ancestor",
            Self::Leaf => "leaf",
            Self::Deep => "deep",
        }
    }
}

///
/// PendingRow
///
/// Reusable slot for one projection level: the materialized row, its
/// delivery encoding, and the key it was materialized for.
///

#[derive(Debug, Default)]
pub(crate) struct PendingRow {
    pub(crate) row: RowData,
    pub(crate) encoded: Vec<u8>,
    pub(crate) key: Vec<u8>,
    pub(crate) synthesized: bool,
    pub(crate) shipped: bool,
}

impl PendingRow {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            encoded: Vec::with_capacity(capacity),
            ..Self::default()
        }
    }

    /// Materialize from a stored payload. Projected levels are elided to the
    /// selector; deep rows pass `None` and keep every field.
    pub(crate) fn load(
        &mut self,
        key: &[u8],
        stored: &[u8],
        level: Option<(&ProjectedTable, &ColumnSelector)>,
    ) -> Result<(), ScanError> {
        self.row = RowData::decode(stored)?;

        if let Some((projected, selector)) = level {
            if self.row.table != projected.table {
                return Err(InternalError::store_corruption(format!(
                    "row under key of {} decoded as {}",
                    projected.table, self.row.table
                ))
                .into());
            }
            self.row.elide(|position| projected.keeps(selector, position));
        }

        self.synthesized = false;
        self.finish(key)
    }

    /// Stand-in for a missing ancestor: hkey columns decoded from `key`,
    /// everything else `Null`.
    pub(crate) fn synthesize(
        &mut self,
        key: &HKey,
        table: &TableDef,
        projected: &ProjectedTable,
        selector: &ColumnSelector,
    ) -> Result<(), ScanError> {
        self.row.reset(table.id(), table.field_count());

        let mut element = 0;
        for segment in &table.hkey().segments {
            element += 1;
            for column in &segment.columns {
                if let Some(field) = self.row.fields.get_mut(column.position) {
                    *field = key.decode_value(element)?;
                }
                element += 1;
            }
        }
        self.row.elide(|position| projected.keeps(selector, position));

        self.synthesized = true;
        self.finish(key.truncate_to_depth(projected.hkey_depth))
    }

    /// Encode the current row and record the key it belongs to.
    pub(crate) fn finish(&mut self, key: &[u8]) -> Result<(), ScanError> {
        self.row
            .encode_into(&mut self.encoded)
            .map_err(InternalError::from)?;
        self.key.clear();
        self.key.extend_from_slice(key);
        self.shipped = false;

        Ok(())
    }

    /// Whether this slot holds an ancestor-or-self of `key`.
    pub(crate) fn is_on_chain_of(&self, key: &[u8]) -> bool {
        !self.key.is_empty() && key.starts_with(&self.key)
    }
}

///
/// AncestorLevels
///
/// Read-only context for one backfill pass.
///

pub(crate) struct AncestorLevels<'a> {
    pub(crate) group: &'a GroupDef,
    pub(crate) projection: &'a Projection,
    pub(crate) selector: &'a ColumnSelector,
}

///
/// AncestorCache
///
/// One pending row per projection level plus a trailing deep slot, and the
/// last key that went through a backfill.
///

#[derive(Debug)]
pub(crate) struct AncestorCache {
    last_key: Vec<u8>,
    slots: Vec<PendingRow>,
    scratch: Vec<u8>,
    refetched: u64,
    synthesized: u64,
}

impl AncestorCache {
    pub(crate) fn new(levels: usize, capacity: usize) -> Self {
        Self {
            last_key: Vec::new(),
            slots: (0..=levels)
                .map(|_| PendingRow::with_capacity(capacity))
                .collect(),
            scratch: Vec::with_capacity(capacity),
            refetched: 0,
            synthesized: 0,
        }
    }

    pub(crate) fn slots(&self) -> &[PendingRow] {
        &self.slots
    }

    pub(crate) fn slot_mut(&mut self, level: usize) -> &mut PendingRow {
        &mut self.slots[level]
    }

    /// Index of the slot holding unprojected deep rows.
    pub(crate) const fn deep_level(&self) -> usize {
        self.slots.len() - 1
    }

    pub(crate) const fn refetched(&self) -> u64 {
        self.refetched
    }

    pub(crate) const fn synthesized(&self) -> u64 {
        self.synthesized
    }

    /// Refresh every projected level on `key`'s branch whose hkey depth is
    /// below `below_depth`. A level is reused when `key` agrees with the
    /// last key through the level's boundary; otherwise it is refetched, or
    /// synthesized when the store has no row for it.
    ///
    /// Returns the shallowest refreshed level.
    pub(crate) fn backfill(
        &mut self,
        key: &HKey,
        below_depth: usize,
        levels: &AncestorLevels<'_>,
        source: &mut dyn AncestorSource,
    ) -> Result<Option<usize>, ScanError> {
        let differs = first_differing_offset(key.as_bytes(), &self.last_key);
        let mut first_changed = None;

        for (level, projected) in levels.projection.levels().iter().enumerate() {
            if projected.hkey_depth >= below_depth || !key.follows_path(&projected.ordinals) {
                continue;
            }

            let prefix = key.truncate_to_depth(projected.hkey_depth);
            let slot = &mut self.slots[level];
            if differs >= prefix.len() && slot.key == prefix {
                continue;
            }

            self.refetched += 1;
            let found = source.fetch_ancestor(prefix, &mut self.scratch)?;
            if found {
                slot.load(prefix, &self.scratch, Some((projected, levels.selector)))?;
            } else {
                let table = levels.group.table(projected.table)?;
                slot.synthesize(key, table, projected, levels.selector)?;
                self.synthesized += 1;
                tracing::debug!(
                    table = table.name(),
                    depth = projected.hkey_depth,
                    "synthesized missing ancestor row"
                );
            }
            sink::record(MetricsEvent::AncestorRefetch {
                synthesized: !found,
            });

            first_changed.get_or_insert(level);
        }

        self.last_key.clear();
        self.last_key.extend_from_slice(key.as_bytes());

        Ok(first_changed)
    }
}
