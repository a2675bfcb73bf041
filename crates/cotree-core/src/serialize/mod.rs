//! Module: serialize
//! Responsibility: CBOR encoding of row payloads.
//! Does not own: size policy; callers pass their own decode limit.

mod cbor;

use crate::error::InternalError;
use thiserror::Error as ThisError;

pub(crate) use cbor::{deserialize_bounded, serialize, serialize_into};

///
/// SerializeError
///

#[derive(Debug, ThisError)]
pub enum SerializeError {
    #[error("cbor encode failed: {0}")]
    Serialize(String),

    #[error("cbor decode failed: {0}")]
    Deserialize(String),

    #[error("payload of {len} bytes exceeds the {max_bytes} byte limit")]
    TooLarge { len: usize, max_bytes: usize },
}

impl From<SerializeError> for InternalError {
    fn from(err: SerializeError) -> Self {
        Self::serialize_internal(err.to_string())
    }
}
