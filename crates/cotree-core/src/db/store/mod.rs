//! Module: db::store
//! Responsibility: the ordered key-value store boundary the cursor reads
//! through, plus an in-memory implementation.
//! Does not own: transactions, paging, or concurrency control.

mod memory;

use crate::{
    db::{direction::KeyDirection, filter::KeyFilter},
    error::InternalError,
    schema::IndexId,
};
use thiserror::Error as ThisError;

// re-exports
pub use memory::{MemoryStore, OrderedTree};

///
/// StoreError
///

#[derive(Debug, ThisError)]
pub enum StoreError {
    #[error("read handle {handle} is not open")]
    HandleNotOpen { handle: u64 },

    #[error("store I/O failure: {message}")]
    Io { message: String },

    #[error(transparent)]
    Internal(#[from] InternalError),
}

///
/// TreeName
///
/// One ordered tree: the group tree or a secondary index tree.
///

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum TreeName {
    Group,
    Index(IndexId),
}

///
/// Position
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Position {
    Before,
    After,
    At,
}

///
/// ReadHandle
///
/// Cursor position on one tree. The current key and the loaded (possibly
/// partial) value are owned buffers reused across traversals.
///

#[derive(Debug)]
pub struct ReadHandle {
    id: u64,
    tree: TreeName,
    position: Position,
    key: Vec<u8>,
    value: Vec<u8>,
    value_len: usize,
    open: bool,
}

impl ReadHandle {
    #[must_use]
    pub const fn new(id: u64, tree: TreeName) -> Self {
        Self {
            id,
            tree,
            position: Position::Before,
            key: Vec::new(),
            value: Vec::new(),
            value_len: 0,
            open: true,
        }
    }

    #[must_use]
    pub const fn id(&self) -> u64 {
        self.id
    }

    #[must_use]
    pub const fn tree(&self) -> TreeName {
        self.tree
    }

    #[must_use]
    pub const fn position(&self) -> Position {
        self.position
    }

    #[must_use]
    pub fn key(&self) -> &[u8] {
        &self.key
    }

    #[must_use]
    pub fn value(&self) -> &[u8] {
        &self.value
    }

    /// Whether only a prefix of the stored value was loaded.
    #[must_use]
    pub fn is_partial(&self) -> bool {
        self.value.len() < self.value_len
    }

    #[must_use]
    pub const fn is_open(&self) -> bool {
        self.open
    }

    /// Position at `key` without loading anything; an inclusive traverse
    /// then starts at `key` itself.
    pub fn seek(&mut self, key: &[u8]) {
        self.position = Position::At;
        self.key.clear();
        self.key.extend_from_slice(key);
        self.value.clear();
        self.value_len = 0;
    }

    /// Park before the first key (forward scans) or after the last.
    pub fn rewind(&mut self, forward: bool) {
        self.position = if forward {
            Position::Before
        } else {
            Position::After
        };
        self.key.clear();
        self.value.clear();
        self.value_len = 0;
    }

    fn load(&mut self, key: &[u8], value: &[u8], max_bytes: usize) {
        self.position = Position::At;
        self.key.clear();
        self.key.extend_from_slice(key);
        self.value.clear();
        self.value
            .extend_from_slice(&value[..value.len().min(max_bytes)]);
        self.value_len = value.len();
    }

    const fn close(&mut self) {
        self.open = false;
    }
}

///
/// OrderedStore
///
/// Byte-ordered key-value store read through explicit handles.
///

pub trait OrderedStore {
    fn acquire(&self, tree: TreeName) -> Result<ReadHandle, StoreError>;

    /// Release a handle. Releasing a closed handle is a no-op.
    fn release(&self, handle: ReadHandle);

    /// Move `handle` to the next key in `direction` that `filter` selects,
    /// loading at most `max_value_bytes` of its value (`is_partial` reports
    /// a truncated load). Returns `false` and parks the handle past the end
    /// when no key remains.
    fn traverse(
        &self,
        handle: &mut ReadHandle,
        direction: KeyDirection,
        filter: &KeyFilter,
        max_value_bytes: usize,
    ) -> Result<bool, StoreError>;

    /// Load the full value stored at exactly `key` into `out` without moving
    /// `handle`.
    fn fetch(&self, handle: &ReadHandle, key: &[u8], out: &mut Vec<u8>)
    -> Result<bool, StoreError>;

    /// Complete a partially loaded value at the handle's position.
    fn fetch_full_value(&self, handle: &mut ReadHandle) -> Result<(), StoreError>;
}
