//! Module: db::row
//! Responsibility: stored row payloads and their CBOR framing.
//! Does not own: key layout or column projection policy.

use crate::{
    MAX_ROW_BYTES,
    error::{ErrorOrigin, InternalError},
    schema::TableId,
    serialize::{self, SerializeError},
    value::Value,
};
use serde::{Deserialize, Serialize};

///
/// RowData
///
/// One table row: the owning table and its fields in declaration order.
/// Elided columns are carried as `Null`.
///

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct RowData {
    pub table: TableId,
    pub fields: Vec<Value>,
}

impl RowData {
    #[must_use]
    pub const fn new(table: TableId, fields: Vec<Value>) -> Self {
        Self { table, fields }
    }

    #[must_use]
    pub fn field(&self, position: usize) -> Option<&Value> {
        self.fields.get(position)
    }

    /// Reset to an all-null row of `table`, keeping the field allocation.
    pub fn reset(&mut self, table: TableId, field_count: usize) {
        self.table = table;
        self.fields.clear();
        self.fields.resize(field_count, Value::Null);
    }

    /// Replace every field whose position fails `keep` with `Null`.
    pub fn elide(&mut self, keep: impl Fn(usize) -> bool) {
        for (position, field) in self.fields.iter_mut().enumerate() {
            if !keep(position) {
                *field = Value::Null;
            }
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>, SerializeError> {
        serialize::serialize(self)
    }

    /// Encode into `out`, reusing its allocation.
    pub fn encode_into(&self, out: &mut Vec<u8>) -> Result<(), SerializeError> {
        serialize::serialize_into(self, out)
    }

    /// Decode a stored row payload, bounded by the maximum row size.
    pub fn decode(bytes: &[u8]) -> Result<Self, InternalError> {
        serialize::deserialize_bounded(bytes, MAX_ROW_BYTES).map_err(|err| {
            InternalError::corruption(ErrorOrigin::Store, format!("undecodable row: {err}"))
        })
    }
}

///
/// TESTS
///
