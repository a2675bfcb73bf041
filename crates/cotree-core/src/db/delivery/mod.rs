//! Module: db::delivery
//! Responsibility: length-framed row delivery into size-bounded buffers
//! with chain-atomic rollback.
//! Does not own: deciding which rows form a chain (the cursor does).

#[cfg(test)]
mod tests;

use crate::{db::row::RowData, error::InternalError};

/// Bytes of framing in front of every delivered row (big-endian `u32`
/// payload length).
pub const FRAME_OVERHEAD: usize = 4;

///
/// PayloadBuffer
///
/// Destination for delivered rows: a fixed byte limit, a write position,
/// and a safe mark at the end of the last complete chain.
///

#[derive(Clone, Debug)]
pub struct PayloadBuffer {
    bytes: Vec<u8>,
    limit: usize,
    safe_mark: usize,
}

impl PayloadBuffer {
    #[must_use]
    pub fn with_limit(limit: usize) -> Self {
        Self {
            bytes: Vec::with_capacity(limit),
            limit,
            safe_mark: 0,
        }
    }

    #[must_use]
    pub fn position(&self) -> usize {
        self.bytes.len()
    }

    #[must_use]
    pub fn remaining(&self) -> usize {
        self.limit - self.bytes.len()
    }

    #[must_use]
    pub const fn limit(&self) -> usize {
        self.limit
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    #[must_use]
    pub const fn safe_mark(&self) -> usize {
        self.safe_mark
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Empty the buffer for reuse.
    pub fn clear(&mut self) {
        self.bytes.clear();
        self.safe_mark = 0;
    }

    /// Append one frame if it fits.
    pub fn push_frame(&mut self, payload: &[u8]) -> bool {
        let Ok(len) = u32::try_from(payload.len()) else {
            return false;
        };
        if payload.len() + FRAME_OVERHEAD > self.remaining() {
            return false;
        }

        self.bytes.extend_from_slice(&len.to_be_bytes());
        self.bytes.extend_from_slice(payload);

        true
    }

    pub(crate) fn set_mark(&mut self) {
        self.safe_mark = self.bytes.len();
    }

    /// Drop everything written after the safe mark.
    pub(crate) fn reset_to_mark(&mut self) {
        self.bytes.truncate(self.safe_mark);
    }

    /// Frame payloads in delivery order.
    #[must_use]
    pub fn frames(&self) -> Frames<'_> {
        Frames { rest: &self.bytes }
    }

    /// Decode every delivered row.
    pub fn rows(&self) -> Result<Vec<RowData>, InternalError> {
        self.frames().map(RowData::decode).collect()
    }
}

///
/// Frames
///

#[derive(Debug)]
pub struct Frames<'a> {
    rest: &'a [u8],
}

impl<'a> Iterator for Frames<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<Self::Item> {
        let (header, body) = self.rest.split_first_chunk::<FRAME_OVERHEAD>()?;
        let len = usize::try_from(u32::from_be_bytes(*header)).ok()?;
        if body.len() < len {
            return None;
        }

        let (frame, rest) = body.split_at(len);
        self.rest = rest;

        Some(frame)
    }
}

///
/// PagedDelivery
///
/// Delivery accounting for one cursor. A chain counts once, when its leaf
/// lands; a failed row rolls the buffer back to the last complete chain.
///

#[derive(Debug, Default)]
pub(crate) struct PagedDelivery {
    rows_delivered: u64,
    rows_repeated: u64,
    buffers_delivered: u64,
    bytes_delivered: u64,
    chains_in_buffer: u64,
}

impl PagedDelivery {
    /// Append `row`; on failure roll back to the safe mark and report
    /// `false`.
    pub(crate) fn try_deliver(
        &mut self,
        buffer: &mut PayloadBuffer,
        row: &[u8],
        leaf_of_chain: bool,
    ) -> bool {
        if !buffer.push_frame(row) {
            buffer.reset_to_mark();
            return false;
        }

        if leaf_of_chain {
            buffer.set_mark();
            self.rows_delivered += 1;
            self.chains_in_buffer += 1;
        }

        true
    }

    /// Rows resent because their first delivery was in an earlier buffer.
    pub(crate) const fn count_repeated(&mut self, rows: u64) {
        self.rows_repeated += rows;
    }

    /// Close out the current buffer. Returns `(chains, bytes)` when it holds
    /// anything not yet accounted for.
    pub(crate) fn finish_buffer(&mut self, buffer: &PayloadBuffer) -> Option<(u64, u64)> {
        if self.chains_in_buffer == 0 || buffer.position() == 0 {
            return None;
        }

        let chains = std::mem::take(&mut self.chains_in_buffer);
        let bytes = buffer.position() as u64;
        self.buffers_delivered += 1;
        self.bytes_delivered += bytes;

        Some((chains, bytes))
    }

    pub(crate) const fn rows_delivered(&self) -> u64 {
        self.rows_delivered
    }

    pub(crate) const fn rows_repeated(&self) -> u64 {
        self.rows_repeated
    }

    pub(crate) const fn buffers_delivered(&self) -> u64 {
        self.buffers_delivered
    }

    pub(crate) const fn bytes_delivered(&self) -> u64 {
        self.bytes_delivered
    }
}
