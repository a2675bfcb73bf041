//! Module: db::hkey
//! Responsibility: hierarchical key framing over order-preserving elements.
//! Does not own: per-element value encoding (see `value::ordered`).
//! Boundary: the filter builder, ancestor cache, and cursor read keys only
//! through this module.

mod index_key;

#[cfg(test)]
mod tests;

use crate::{
    error::InternalError,
    schema::{Ordinal, TableDef},
    value::{
        Value, decode_element, decode_ordinal, element_len, encode_element,
        encode_ordinal_element,
    },
};
use thiserror::Error as ThisError;

// re-exports
pub use index_key::encode_index_key;
pub(crate) use index_key::{decode_covered_fields, rebuild_hkey};

///
/// EncodingError
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum EncodingError {
    #[error("key of {len} bytes has no successor prefix")]
    CannotAdvance { len: usize },
}

///
/// HKey
///
/// A parsed key: raw bytes plus the end offset of every element.
/// Parsing reuses both allocations.
///

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct HKey {
    bytes: Vec<u8>,
    ends: Vec<usize>,
}

impl HKey {
    pub fn parse(bytes: &[u8]) -> Result<Self, InternalError> {
        let mut key = Self::default();
        key.parse_from(bytes)?;

        Ok(key)
    }

    /// Replace this key with `bytes`, validating element framing.
    pub fn parse_from(&mut self, bytes: &[u8]) -> Result<(), InternalError> {
        self.bytes.clear();
        self.ends.clear();

        let mut offset = 0;
        while offset < bytes.len() {
            offset += element_len(&bytes[offset..])?;
            self.ends.push(offset);
        }
        self.bytes.extend_from_slice(bytes);

        Ok(())
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Number of elements.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.ends.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ends.is_empty()
    }

    /// Byte length of the first `depth` elements.
    #[must_use]
    pub fn offset_of_depth(&self, depth: usize) -> usize {
        if depth == 0 || self.ends.is_empty() {
            0
        } else {
            self.ends[depth.min(self.ends.len()) - 1]
        }
    }

    /// Key of the ancestor row at `depth`.
    #[must_use]
    pub fn truncate_to_depth(&self, depth: usize) -> &[u8] {
        &self.bytes[..self.offset_of_depth(depth)]
    }

    #[must_use]
    pub fn element(&self, index: usize) -> Option<&[u8]> {
        let end = *self.ends.get(index)?;
        let start = if index == 0 { 0 } else { self.ends[index - 1] };

        Some(&self.bytes[start..end])
    }

    pub fn decode_value(&self, index: usize) -> Result<Value, InternalError> {
        let element = self.element(index).ok_or_else(|| {
            InternalError::index_invariant(format!(
                "key element {index} out of range (depth {})",
                self.depth()
            ))
        })?;

        Ok(decode_element(element)?)
    }

    /// Ordinals of every segment, root first.
    pub fn ordinals(&self) -> impl Iterator<Item = Ordinal> + '_ {
        (0..self.depth()).filter_map(|index| {
            self.element(index)
                .and_then(|element| decode_ordinal(element).ok())
                .map(Ordinal)
        })
    }

    /// Ordinal of the deepest segment, which names the row's table.
    #[must_use]
    pub fn last_ordinal(&self) -> Option<Ordinal> {
        self.ordinals().last()
    }

    /// Whether this key lies in the subtree of a table with ordinal `path`.
    #[must_use]
    pub fn follows_path(&self, path: &[Ordinal]) -> bool {
        let mut ordinals = self.ordinals();

        path.iter().all(|ordinal| ordinals.next() == Some(*ordinal))
    }
}

/// Append the hkey of a `table` row with `fields` to `out`.
pub fn encode_row_hkey(table: &TableDef, fields: &[Value], out: &mut Vec<u8>) {
    for segment in &table.hkey().segments {
        encode_ordinal_element(segment.ordinal.0, out);
        for column in &segment.columns {
            encode_element(fields.get(column.position).unwrap_or(&Value::Null), out);
        }
    }
}

/// First byte position where `a` and `b` differ, or the shorter length when
/// one is a prefix of the other.
#[must_use]
pub fn first_differing_offset(a: &[u8], b: &[u8]) -> usize {
    a.iter()
        .zip(b)
        .position(|(x, y)| x != y)
        .unwrap_or_else(|| a.len().min(b.len()))
}

/// Rewrite `key` into the smallest key greater than every key it prefixes.
pub fn advance_to_next_prefix(key: &mut Vec<u8>) -> Result<(), EncodingError> {
    let len = key.len();
    let last = key
        .iter()
        .rposition(|byte| *byte != 0xFF)
        .ok_or(EncodingError::CannotAdvance { len })?;

    key.truncate(last + 1);
    key[last] += 1;

    Ok(())
}
