//! Module: db::scan
//! Responsibility: the hierarchical group-scan cursor. Walks the group tree
//! directly or through a secondary index, materializes changed ancestors,
//! and hands complete chains to paged delivery.
//! Does not own: key encoding, filter construction, or buffer framing.

mod ancestor;
mod id;
mod request;


use crate::{
    config::ScanConfig,
    db::{
        delivery::{FRAME_OVERHEAD, PagedDelivery, PayloadBuffer},
        direction::KeyDirection,
        filter::{FilterBuilder, KeyFilter},
        hkey::{HKey, decode_covered_fields, first_differing_offset, rebuild_hkey},
        projection::{CoveredField, ProjectedTable, Projection, covering_fields},
        store::{OrderedStore, ReadHandle, TreeName},
    },
    error::{InternalError, ScanError},
    obs::sink::{self, MetricsEvent},
    schema::{GroupDef, IndexId, TableId},
};
use ancestor::{AncestorCache, AncestorLevels, AncestorSource, SlotRole};

// re-exports
pub use id::{AtomicScanIds, ScanIdSource};
pub use request::{ScanFlags, ScanRequest, ScanTarget};

///
/// ScanContext
///
/// Collaborators a cursor borrows for its lifetime.
///

pub struct ScanContext<'a, S: OrderedStore> {
    pub store: &'a S,
    pub group: &'a GroupDef,
    pub ids: &'a dyn ScanIdSource,
    pub config: ScanConfig,
}

///
/// ScanState
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ScanState {
    IndexTraverse,
    RowTraverse,
    Done,
}

///
/// Pending
///
/// Slot range `from..to` still owed to the caller. `to - 1` is the leaf of
/// the chain; slots in between that are not its ancestors are skipped.
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
struct Pending {
    from: usize,
    to: usize,
}

impl Pending {
    const fn has_rows(self) -> bool {
        self.from < self.to
    }
}

enum Flush {
    Delivered,
    Full,
}

///
/// SecondaryScan
///

#[derive(Debug)]
struct SecondaryScan {
    index: IndexId,
    table: TableId,
    filter: KeyFilter,
    covering: Option<Vec<CoveredField>>,
}

///
/// StoreAncestors
///
/// Ancestor lookups through the cursor's group-tree handle.
///

struct StoreAncestors<'a, S: OrderedStore> {
    store: &'a S,
    handle: &'a ReadHandle,
}

impl<S: OrderedStore> AncestorSource for StoreAncestors<'_, S> {
    fn fetch_ancestor(&mut self, key: &[u8], out: &mut Vec<u8>) -> Result<bool, ScanError> {
        Ok(self.store.fetch(self.handle, key, out)?)
    }
}

///
/// GroupScan
///
/// Cursor over one group scan request.
///
/// Each `collect_next_row` call appends at most one complete chain (the
/// changed ancestors of a leaf row followed by the leaf itself) to the
/// caller's buffer. A leaf is a row of a projected table with no projected
/// descendant, or a deep row. Ancestor rows wait in their slots until a
/// leaf below them arrives; an ancestor without one is never delivered. A
/// chain that does not fit is rolled back and resent whole into the next
/// buffer, so every buffer ends on a leaf.
///

pub struct GroupScan<'a, S: OrderedStore> {
    store: &'a S,
    group: &'a GroupDef,
    config: ScanConfig,
    id: u64,
    request: ScanRequest,
    projection: Projection,
    primary: KeyFilter,
    secondary: Option<SecondaryScan>,
    encode_calls: usize,

    h_handle: Option<ReadHandle>,
    i_handle: Option<ReadHandle>,
    state: ScanState,
    direction: KeyDirection,
    index_direction: KeyDirection,

    cache: AncestorCache,
    pending: Pending,
    carried_from: Option<usize>,
    current: HKey,
    index_entry: HKey,
    pinned: Vec<u8>,
    pinned_len: Option<usize>,

    delivery: PagedDelivery,
    completion_logged: bool,
    closed: bool,
}

impl<'a, S: OrderedStore> GroupScan<'a, S> {
    /// Validate `request`, build its filters, and acquire store handles.
    pub fn open(ctx: ScanContext<'a, S>, request: ScanRequest) -> Result<Self, ScanError> {
        let ScanContext {
            store,
            group,
            ids,
            config,
        } = ctx;

        let target_table = match request.target {
            ScanTarget::Table(id) => Some(group.table(id)?.id()),
            ScanTarget::Group => None,
        };
        let projection = Projection::compute(group, request.target, &request.selector)?;

        let mut builder = FilterBuilder::new(group, &request);
        let primary = builder.primary(&projection, request.has(ScanFlags::DEEP))?;

        let secondary = match request.index {
            None => None,
            Some(index_id) => {
                let index = group.index(index_id)?;
                let Some(table_id) = target_table else {
                    return Err(InternalError::scan_invariant(format!(
                        "index scan on '{}' requires a table target",
                        index.name()
                    ))
                    .into());
                };
                if index.table() != table_id {
                    return Err(InternalError::scan_invariant(format!(
                        "index '{}' does not belong to table {table_id}",
                        index.name()
                    ))
                    .into());
                }

                if index.is_hkey_equivalent() {
                    None
                } else {
                    let table = group.table(table_id)?;
                    Some(SecondaryScan {
                        index: index_id,
                        table: table_id,
                        filter: builder.secondary(index)?,
                        covering: covering_fields(
                            request.target,
                            table,
                            index,
                            &request.selector,
                        ),
                    })
                }
            }
        };
        let encode_calls = builder.encode_calls();

        let mut h_handle = store.acquire(TreeName::Group)?;
        let i_handle = match secondary
            .as_ref()
            .map(|scan| store.acquire(TreeName::Index(scan.index)))
            .transpose()
        {
            Ok(handle) => handle,
            Err(err) => {
                store.release(h_handle);
                return Err(err.into());
            }
        };

        let direction = request.direction();
        let forward = direction.initial(false).is_forward();
        let exclusive = if forward {
            request.has(ScanFlags::START_EXCLUSIVE)
        } else {
            request.has(ScanFlags::END_EXCLUSIVE) || request.has(ScanFlags::PREFIX)
        };
        let initial = direction.initial(exclusive);

        h_handle.rewind(forward);
        let i_handle = i_handle.map(|mut handle| {
            handle.rewind(forward);
            handle
        });

        let selects_nothing = projection.is_empty()
            || primary.is_empty()
            || secondary.as_ref().is_some_and(|scan| scan.filter.is_empty());
        let state = if selects_nothing {
            ScanState::Done
        } else if secondary.is_some() {
            ScanState::IndexTraverse
        } else {
            ScanState::RowTraverse
        };

        let id = ids.next_scan_id();
        tracing::debug!(
            scan_id = id,
            target = ?request.target,
            index = ?request.index,
            flags = ?request.flags,
            tables = projection.len(),
            covering = secondary.as_ref().is_some_and(|scan| scan.covering.is_some()),
            "group scan opened"
        );
        sink::record(MetricsEvent::ScanOpened);

        let cache = AncestorCache::new(projection.len(), config.initial_row_capacity);

        Ok(Self {
            store,
            group,
            config,
            id,
            request,
            projection,
            primary,
            secondary,
            encode_calls,
            h_handle: Some(h_handle),
            i_handle,
            state,
            direction: initial,
            index_direction: initial,
            cache,
            pending: Pending::default(),
            carried_from: None,
            current: HKey::default(),
            index_entry: HKey::default(),
            pinned: Vec::new(),
            pinned_len: None,
            delivery: PagedDelivery::default(),
            completion_logged: false,
            closed: false,
        })
    }

    /// Append the next complete chain to `buffer`.
    ///
    /// Returns `false` when the buffer is full or the scan is exhausted;
    /// `has_more` tells the two apart.
    pub fn collect_next_row(&mut self, buffer: &mut PayloadBuffer) -> Result<bool, ScanError> {
        let result = if buffer.remaining() < FRAME_OVERHEAD {
            Err(ScanError::BufferTooSmall {
                available: buffer.remaining(),
                required: FRAME_OVERHEAD,
            })
        } else {
            self.collect(buffer)
        };

        if let Err(err) = &result {
            tracing::debug!(scan_id = self.id, error = %err, kind = err.kind(), "group scan aborted");
            self.state = ScanState::Done;
            self.pending = Pending::default();
        }

        result
    }

    /// Whether another call can produce rows.
    #[must_use]
    pub fn has_more(&self) -> bool {
        self.state != ScanState::Done || self.pending.has_rows()
    }

    /// Release every store handle. Safe to call more than once.
    pub fn close(&mut self) {
        if let Some(handle) = self.h_handle.take() {
            self.store.release(handle);
        }
        if let Some(handle) = self.i_handle.take() {
            self.store.release(handle);
        }
        if self.closed {
            return;
        }

        self.closed = true;
        self.state = ScanState::Done;
        self.pending = Pending::default();
        self.log_completion();
        sink::record(MetricsEvent::ScanClosed {
            rows: self.delivery.rows_delivered(),
            repeated: self.delivery.rows_repeated(),
        });
    }

    #[must_use]
    pub const fn id(&self) -> u64 {
        self.id
    }

    /// Table being scanned; `None` for a group target.
    #[must_use]
    pub const fn target_table(&self) -> Option<TableId> {
        match self.request.target {
            ScanTarget::Table(id) => Some(id),
            ScanTarget::Group => None,
        }
    }

    #[must_use]
    pub const fn state(&self) -> ScanState {
        self.state
    }

    #[must_use]
    pub const fn projection(&self) -> &Projection {
        &self.projection
    }

    /// Whether index entries alone produce the requested rows.
    #[must_use]
    pub fn is_covering(&self) -> bool {
        self.secondary
            .as_ref()
            .is_some_and(|scan| scan.covering.is_some())
    }

    #[must_use]
    pub const fn rows_delivered(&self) -> u64 {
        self.delivery.rows_delivered()
    }

    #[must_use]
    pub const fn buffers_delivered(&self) -> u64 {
        self.delivery.buffers_delivered()
    }

    #[must_use]
    pub const fn bytes_delivered(&self) -> u64 {
        self.delivery.bytes_delivered()
    }

    #[must_use]
    pub const fn rows_repeated(&self) -> u64 {
        self.delivery.rows_repeated()
    }

    #[must_use]
    pub const fn rows_synthesized(&self) -> u64 {
        self.cache.synthesized()
    }

    /// Ancestor rows fetched (or synthesized) because their level changed.
    #[must_use]
    pub const fn ancestor_refetches(&self) -> u64 {
        self.cache.refetched()
    }

    /// Key-encoding calls spent building this scan's filters.
    #[must_use]
    pub const fn encode_calls(&self) -> usize {
        self.encode_calls
    }

    fn collect(&mut self, buffer: &mut PayloadBuffer) -> Result<bool, ScanError> {
        loop {
            if self.pending.has_rows() {
                match self.flush(buffer)? {
                    Flush::Delivered => return Ok(true),
                    Flush::Full => {
                        self.finish_buffer(buffer);
                        return Ok(false);
                    }
                }
            }

            match self.state {
                ScanState::IndexTraverse => self.index_step()?,
                ScanState::RowTraverse => self.row_step()?,
                ScanState::Done => {
                    self.finish_buffer(buffer);
                    self.log_completion();
                    return Ok(false);
                }
            }
        }
    }

    // Deliver pending slots on the leaf's ancestor chain.
    fn flush(&mut self, buffer: &mut PayloadBuffer) -> Result<Flush, ScanError> {
        let attempt_from = self.pending.from;
        let leaf = self.pending.to - 1;
        let whole_chain = (0..attempt_from).all(|level| !self.on_chain(level, leaf));
        let mut resent = 0;

        while self.pending.from < self.pending.to {
            let level = self.pending.from;
            if !self.on_chain(level, leaf) {
                self.pending.from += 1;
                continue;
            }

            let role = SlotRole::of(level, leaf, self.cache.deep_level());
            let slot = &self.cache.slots()[level];
            if !self
                .delivery
                .try_deliver(buffer, &slot.encoded, role != SlotRole::Ancestor)
            {
                if whole_chain && buffer.is_empty() {
                    return Err(ScanError::OversizeRow {
                        size: slot.encoded.len() + FRAME_OVERHEAD,
                        limit: buffer.limit(),
                    });
                }
                self.pending.from = 0;
                return Ok(Flush::Full);
            }

            if slot.shipped {
                resent += 1;
            }
            tracing::trace!(
                scan_id = self.id,
                level,
                role = role.label(),
                table = %slot.row.table,
                synthesized = slot.synthesized,
                bytes = slot.encoded.len(),
                "row delivered"
            );
            self.pending.from += 1;
        }

        self.delivery.count_repeated(resent);
        for level in 0..=leaf {
            if self.on_chain(level, leaf) {
                self.cache.slot_mut(level).shipped = true;
            }
        }
        if self.request.has(ScanFlags::SINGLE_ROW) {
            self.state = ScanState::Done;
        }

        Ok(Flush::Delivered)
    }

    fn on_chain(&self, level: usize, leaf: usize) -> bool {
        let slots = self.cache.slots();
        level == leaf || slots[level].is_on_chain_of(&slots[leaf].key)
    }

    // One secondary-index entry: either emit a covered row or pin the row's
    // subtree and hand over to row traversal.
    fn index_step(&mut self) -> Result<(), ScanError> {
        let Some(secondary) = self.secondary.as_ref() else {
            self.state = ScanState::Done;
            return Ok(());
        };
        let handle = self.i_handle.as_mut().ok_or_else(released)?;

        let found = self
            .store
            .traverse(handle, self.index_direction, &secondary.filter, 0)?;
        self.index_direction = self.index_direction.strict();
        if !found {
            self.state = ScanState::Done;
            return Ok(());
        }
        self.index_entry.parse_from(handle.key())?;

        let table = self.group.table(secondary.table)?;
        if let Some(covered) = &secondary.covering {
            let slot = self.cache.slot_mut(0);
            slot.row.reset(table.id(), table.field_count());
            decode_covered_fields(covered, &self.index_entry, &mut slot.row.fields)?;
            slot.synthesized = false;
            slot.finish(self.index_entry.as_bytes())?;
            self.pending = Pending { from: 0, to: 1 };

            return Ok(());
        }

        let index = self.group.index(secondary.index)?;
        rebuild_hkey(table, index, &self.index_entry, &mut self.pinned)?;
        self.current.parse_from(&self.pinned)?;
        self.pinned_len = Some(self.pinned.len());

        let handle = self.h_handle.as_mut().ok_or_else(released)?;
        handle.seek(&self.pinned);
        let levels = AncestorLevels {
            group: self.group,
            projection: &self.projection,
            selector: &self.request.selector,
        };
        let mut source = StoreAncestors {
            store: self.store,
            handle: &*handle,
        };
        self.carried_from =
            self.cache
                .backfill(&self.current, self.current.depth(), &levels, &mut source)?;

        // the subtree under one entry is always walked in key order
        self.direction = KeyDirection::Gteq;
        self.state = ScanState::RowTraverse;

        Ok(())
    }

    fn row_step(&mut self) -> Result<(), ScanError> {
        let handle = self.h_handle.as_mut().ok_or_else(released)?;
        let found = self.store.traverse(
            handle,
            self.direction,
            &self.primary,
            self.config.max_short_record,
        )?;
        self.direction = self.direction.strict();

        let left_subtree = self
            .pinned_len
            .is_some_and(|len| first_differing_offset(handle.key(), &self.pinned) < len);
        if !found || left_subtree {
            self.pinned_len = None;
            self.state = if self.secondary.is_some() {
                ScanState::IndexTraverse
            } else {
                ScanState::Done
            };
            return Ok(());
        }

        self.current.parse_from(handle.key())?;
        self.materialize()
    }

    // Classify the current key and prepare its chain.
    fn materialize(&mut self) -> Result<(), ScanError> {
        let depth = self.current.depth();
        let Some(ordinal) = self.current.last_ordinal() else {
            return Err(InternalError::store_corruption("group key without an ordinal").into());
        };
        let table = self.group.table_by_ordinal(ordinal).ok_or_else(|| {
            InternalError::store_corruption(format!("group key names unknown ordinal {ordinal}"))
        })?;
        if table.hkey_depth() != depth {
            return Err(InternalError::store_corruption(format!(
                "key of depth {depth} under '{}' of hkey depth {}",
                table.name(),
                table.hkey_depth()
            ))
            .into());
        }

        let (level, backfill_below, completes_chain) =
            if let Some(level) = self.projection.level_of(table.id()) {
                let leaf = self
                    .projection
                    .level(level)
                    .is_some_and(ProjectedTable::completes_chain);
                (level, depth, leaf)
            } else if self.is_deep_row(depth) {
                (self.cache.deep_level(), usize::MAX, true)
            } else {
                tracing::trace!(scan_id = self.id, table = table.name(), "key skipped");
                return Ok(());
            };

        let first = self.backfill(backfill_below)?;

        let slot = &self.cache.slots()[level];
        if slot.shipped && slot.key == self.current.as_bytes() {
            // already delivered as an ancestor of a later key
            return Ok(());
        }

        let handle = self.h_handle.as_mut().ok_or_else(released)?;
        if handle.is_partial() {
            self.store.fetch_full_value(handle)?;
        }
        let projected = self
            .projection
            .level(level)
            .map(|projected| (projected, &self.request.selector));
        self.cache
            .slot_mut(level)
            .load(self.current.as_bytes(), handle.value(), projected)?;

        let from = [first, self.carried_from, Some(level)]
            .into_iter()
            .flatten()
            .min()
            .unwrap_or(level);
        if completes_chain {
            self.carried_from = None;
            self.pending = Pending {
                from,
                to: level + 1,
            };
        } else {
            // waits in its slot until a leaf below it arrives
            self.carried_from = Some(from);
        }

        Ok(())
    }

    // Deep rows sit below every projected level on their branch.
    fn is_deep_row(&self, depth: usize) -> bool {
        if !self.request.has(ScanFlags::DEEP) {
            return false;
        }

        self.projection
            .levels()
            .iter()
            .filter(|level| self.current.follows_path(&level.ordinals))
            .map(|level| level.hkey_depth)
            .max()
            .is_some_and(|deepest| deepest < depth)
    }

    fn backfill(&mut self, below_depth: usize) -> Result<Option<usize>, ScanError> {
        let handle = self.h_handle.as_ref().ok_or_else(released)?;
        let levels = AncestorLevels {
            group: self.group,
            projection: &self.projection,
            selector: &self.request.selector,
        };
        let mut source = StoreAncestors {
            store: self.store,
            handle,
        };

        self.cache
            .backfill(&self.current, below_depth, &levels, &mut source)
    }

    fn finish_buffer(&mut self, buffer: &PayloadBuffer) {
        if let Some((rows, bytes)) = self.delivery.finish_buffer(buffer) {
            tracing::debug!(scan_id = self.id, rows, bytes, "buffer delivered");
            sink::record(MetricsEvent::RowsDelivered { rows, bytes });
        }
    }

    fn log_completion(&mut self) {
        if !self.config.verbose || self.completion_logged {
            return;
        }
        self.completion_logged = true;

        tracing::info!(
            scan_id = self.id,
            rows = self.delivery.rows_delivered(),
            buffers = self.delivery.buffers_delivered(),
            bytes = self.delivery.bytes_delivered(),
            repeated = self.delivery.rows_repeated(),
            synthesized = self.cache.synthesized(),
            "group scan complete"
        );
    }
}

impl<S: OrderedStore> Drop for GroupScan<'_, S> {
    fn drop(&mut self) {
        self.close();
    }
}

fn released() -> InternalError {
    InternalError::scan_invariant("store handle already released")
}
