//! Core runtime for cotree: the hierarchical group-scan cursor, its key
//! codec, filters, projection analysis, and paged row delivery.
#![warn(unreachable_pub)]

// public exports are one module level down
pub mod config;
pub mod db;
pub mod error;
pub mod obs;
pub mod schema;
pub mod serialize;
pub mod value;

// test
#[cfg(test)]
pub(crate) mod test_support;

///
/// CONSTANTS
///

/// Maximum encoded size of one stored row.
///
/// Bounds CBOR decode of row payloads and keeps the oversize check meaningful
/// for callers that size buffers from it.
pub const MAX_ROW_BYTES: usize = 1024 * 1024;

/// Maximum number of tables a single group may hold.
pub const MAX_GROUP_TABLES: usize = 64;

///
/// Prelude
///
/// Prelude contains only domain vocabulary.
/// No errors, stores, serializers, or helpers are re-exported here.
///

pub mod prelude {
    pub use crate::{
        db::{
            ColumnSelector, PayloadBuffer, RowData, ScanFlags, ScanRequest, ScanTarget,
            scan::GroupScan,
        },
        schema::{GroupDef, IndexId, Ordinal, TableId},
        value::Value,
    };
}
