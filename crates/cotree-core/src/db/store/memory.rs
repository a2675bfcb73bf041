use crate::{
    db::{
        direction::KeyDirection,
        filter::KeyFilter,
        hkey::{encode_index_key, encode_row_hkey},
        row::RowData,
        store::{OrderedStore, Position, ReadHandle, StoreError, TreeName},
    },
    error::InternalError,
    schema::{GroupDef, TableId},
    value::Value,
};
use derive_more::{Deref, DerefMut};
use std::{cell::Cell, collections::BTreeMap, ops::Bound};

///
/// OrderedTree
///

#[derive(Clone, Debug, Default, Deref, DerefMut)]
pub struct OrderedTree(BTreeMap<Vec<u8>, Vec<u8>>);

///
/// MemoryStore
///
/// In-memory `OrderedStore` with handle accounting, per-tree read counters,
/// and an injectable failure point.
///

#[derive(Debug, Default)]
pub struct MemoryStore {
    trees: BTreeMap<TreeName, OrderedTree>,
    next_handle: Cell<u64>,
    acquired: Cell<u64>,
    released: Cell<u64>,
    operations: Cell<u64>,
    fail_after: Cell<Option<u64>>,
    group_reads: Cell<u64>,
    index_reads: Cell<u64>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, tree: TreeName, key: Vec<u8>, value: Vec<u8>) {
        self.trees.entry(tree).or_default().insert(key, value);
    }

    /// Store a row of `table` and every secondary index entry for it.
    /// Returns the row's hkey.
    pub fn load_row(
        &mut self,
        group: &GroupDef,
        table: TableId,
        fields: Vec<Value>,
    ) -> Result<Vec<u8>, InternalError> {
        let def = group.table(table)?;
        if fields.len() != def.field_count() {
            return Err(InternalError::schema_invariant(format!(
                "row of '{}' has {} fields, expected {}",
                def.name(),
                fields.len(),
                def.field_count()
            )));
        }

        let mut key = Vec::new();
        encode_row_hkey(def, &fields, &mut key);

        for id in def.indexes() {
            let index = group.index(*id)?;
            if index.is_hkey_equivalent() {
                continue;
            }
            let mut entry = Vec::new();
            encode_index_key(index, &fields, &mut entry);
            self.insert(TreeName::Index(*id), entry, Vec::new());
        }

        let value = RowData::new(table, fields).encode()?;
        self.insert(TreeName::Group, key.clone(), value);

        Ok(key)
    }

    /// Fail every operation after the next `operations` succeed.
    pub fn fail_after(&self, operations: u64) {
        self.fail_after
            .set(Some(self.operations.get().saturating_add(operations)));
    }

    #[must_use]
    pub fn handles_acquired(&self) -> u64 {
        self.acquired.get()
    }

    #[must_use]
    pub fn handles_released(&self) -> u64 {
        self.released.get()
    }

    #[must_use]
    pub fn handles_open(&self) -> u64 {
        self.acquired.get().saturating_sub(self.released.get())
    }

    /// Traversals and fetches against the group tree.
    #[must_use]
    pub fn group_reads(&self) -> u64 {
        self.group_reads.get()
    }

    #[must_use]
    pub fn index_reads(&self) -> u64 {
        self.index_reads.get()
    }

    fn begin(&self, handle: &ReadHandle) -> Result<(), StoreError> {
        if !handle.is_open() {
            return Err(StoreError::HandleNotOpen { handle: handle.id() });
        }
        self.tick()?;

        let reads = match handle.tree() {
            TreeName::Group => &self.group_reads,
            TreeName::Index(_) => &self.index_reads,
        };
        reads.set(reads.get() + 1);

        Ok(())
    }

    fn tick(&self) -> Result<(), StoreError> {
        let done = self.operations.get();
        if self.fail_after.get().is_some_and(|limit| done >= limit) {
            return Err(StoreError::Io {
                message: format!("injected failure at operation {done}"),
            });
        }
        self.operations.set(done + 1);

        Ok(())
    }
}

impl OrderedStore for MemoryStore {
    fn acquire(&self, tree: TreeName) -> Result<ReadHandle, StoreError> {
        self.tick()?;

        let id = self.next_handle.get() + 1;
        self.next_handle.set(id);
        self.acquired.set(self.acquired.get() + 1);

        Ok(ReadHandle::new(id, tree))
    }

    fn release(&self, mut handle: ReadHandle) {
        if handle.is_open() {
            handle.close();
            self.released.set(self.released.get() + 1);
        }
    }

    fn traverse(
        &self,
        handle: &mut ReadHandle,
        direction: KeyDirection,
        filter: &KeyFilter,
        max_value_bytes: usize,
    ) -> Result<bool, StoreError> {
        self.begin(handle)?;

        let forward = direction.is_forward();
        let found = self.trees.get(&handle.tree()).and_then(|tree| {
            let selected = |entry: &(&Vec<u8>, &Vec<u8>)| filter.selects(entry.0);
            let key = handle.key();

            match (handle.position(), direction) {
                (Position::After, _) if forward => None,
                (Position::Before, _) if !forward => None,
                (Position::Before, _) => tree.iter().find(selected),
                (Position::After, _) => tree.iter().rev().find(selected),
                (Position::At, KeyDirection::Gteq) => tree
                    .range::<[u8], _>((Bound::Included(key), Bound::Unbounded))
                    .find(selected),
                (Position::At, KeyDirection::Gt) => tree
                    .range::<[u8], _>((Bound::Excluded(key), Bound::Unbounded))
                    .find(selected),
                (Position::At, KeyDirection::Lteq) => tree
                    .range::<[u8], _>((Bound::Unbounded, Bound::Included(key)))
                    .rev()
                    .find(selected),
                (Position::At, KeyDirection::Lt) => tree
                    .range::<[u8], _>((Bound::Unbounded, Bound::Excluded(key)))
                    .rev()
                    .find(selected),
            }
        });

        match found {
            Some((key, value)) => {
                handle.load(key, value, max_value_bytes);
                Ok(true)
            }
            None => {
                handle.rewind(!forward);
                Ok(false)
            }
        }
    }

    fn fetch(
        &self,
        handle: &ReadHandle,
        key: &[u8],
        out: &mut Vec<u8>,
    ) -> Result<bool, StoreError> {
        self.begin(handle)?;

        let Some(value) = self
            .trees
            .get(&handle.tree())
            .and_then(|tree| tree.get(key))
        else {
            return Ok(false);
        };
        out.clear();
        out.extend_from_slice(value);

        Ok(true)
    }

    fn fetch_full_value(&self, handle: &mut ReadHandle) -> Result<(), StoreError> {
        self.begin(handle)?;

        if handle.position() != Position::At {
            return Err(InternalError::store_corruption(format!(
                "handle {} has no current key",
                handle.id()
            ))
            .into());
        }

        let value = self
            .trees
            .get(&handle.tree())
            .and_then(|tree| tree.get(handle.key()))
            .ok_or_else(|| {
                InternalError::store_corruption(format!(
                    "key at handle {} vanished before full read",
                    handle.id()
                ))
            })?;
        handle.value.clear();
        handle.value.extend_from_slice(value);
        handle.value_len = value.len();

        Ok(())
    }
}

///
/// TESTS
///
