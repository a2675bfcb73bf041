//! Module: value::ordered
//! Responsibility: order-preserving byte encoding of one key element.
//! Does not own: hkey framing or segment/ordinal layout.
//! Boundary: hkey and index-key codecs call into this module per element.

use crate::{
    error::{ErrorOrigin, InternalError},
    value::{Value, ValueTag},
};
use thiserror::Error as ThisError;

const ORDINAL_TAG: u8 = 0x10;
const SIGN_FLIP: u64 = 1 << 63;
const ESCAPE: u8 = 0x00;
const ESCAPED_ZERO: u8 = 0xFF;
const TERMINATOR: [u8; 2] = [0x00, 0x00];

/// Encoded length of one ordinal element (tag + big-endian u16).
pub(crate) const ORDINAL_ELEMENT_LEN: usize = 3;

///
/// OrderedDecodeError
///
/// Reasons a byte run is not a well-formed key element.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq, ThisError)]
pub(crate) enum OrderedDecodeError {
    #[error("empty key element")]
    Empty,

    #[error("unknown key element tag 0x{tag:02x}")]
    UnknownTag { tag: u8 },

    #[error("truncated key element")]
    Truncated,

    #[error("invalid escape sequence in key element")]
    InvalidEscape,

    #[error("trailing bytes after key element")]
    Trailing,

    #[error("ordinal element where a value was expected")]
    UnexpectedOrdinal,
}

impl From<OrderedDecodeError> for InternalError {
    fn from(err: OrderedDecodeError) -> Self {
        Self::corruption(ErrorOrigin::Index, format!("malformed key element: {err}"))
    }
}

/// Append one value element so lexicographic byte order matches value order
/// within a variant, and variants order by tag.
pub(crate) fn encode_element(value: &Value, out: &mut Vec<u8>) {
    out.push(value.canonical_tag().to_u8());

    match value {
        Value::Null => {}
        Value::Bool(v) => out.push(u8::from(*v)),
        Value::Int(v) => out.extend_from_slice(&ordered_i64_bytes(*v)),
        Value::Uint(v) => out.extend_from_slice(&v.to_be_bytes()),
        Value::Text(v) => push_terminated_bytes(out, v.as_bytes()),
        Value::Blob(v) => push_terminated_bytes(out, v),
    }
}

/// Append the open (unterminated) prefix form of one value element.
///
/// Byte strings omit the terminator so every longer string sharing the
/// prefix also shares these bytes. Fixed-width variants encode in full.
pub(crate) fn encode_open_prefix(value: &Value, out: &mut Vec<u8>) {
    match value {
        Value::Text(v) => {
            out.push(ValueTag::Text.to_u8());
            push_escaped_bytes(out, v.as_bytes());
        }
        Value::Blob(v) => {
            out.push(ValueTag::Blob.to_u8());
            push_escaped_bytes(out, v);
        }
        _ => encode_element(value, out),
    }
}

/// Append one ordinal element.
pub(crate) fn encode_ordinal_element(ordinal: u16, out: &mut Vec<u8>) {
    out.push(ORDINAL_TAG);
    out.extend_from_slice(&ordinal.to_be_bytes());
}

/// Length of the element starting at `bytes[0]`.
pub(crate) fn element_len(bytes: &[u8]) -> Result<usize, OrderedDecodeError> {
    let Some(&tag) = bytes.first() else {
        return Err(OrderedDecodeError::Empty);
    };

    let fixed = |width: usize| {
        if bytes.len() > width {
            Ok(1 + width)
        } else {
            Err(OrderedDecodeError::Truncated)
        }
    };

    if tag == ORDINAL_TAG {
        return fixed(ORDINAL_ELEMENT_LEN - 1);
    }

    match ValueTag::from_u8(tag) {
        Some(ValueTag::Null) => Ok(1),
        Some(ValueTag::Bool) => fixed(1),
        Some(ValueTag::Int | ValueTag::Uint) => fixed(8),
        Some(ValueTag::Text | ValueTag::Blob) => terminated_len(&bytes[1..]).map(|len| 1 + len),
        None => Err(OrderedDecodeError::UnknownTag { tag }),
    }
}

/// Decode an ordinal element occupying exactly `bytes`.
pub(crate) fn decode_ordinal(bytes: &[u8]) -> Result<u16, OrderedDecodeError> {
    match bytes {
        [ORDINAL_TAG, hi, lo] => Ok(u16::from_be_bytes([*hi, *lo])),
        [ORDINAL_TAG, ..] => Err(OrderedDecodeError::Truncated),
        [] => Err(OrderedDecodeError::Empty),
        [tag, ..] => Err(OrderedDecodeError::UnknownTag { tag: *tag }),
    }
}

/// Decode a value element occupying exactly `bytes`.
pub(crate) fn decode_element(bytes: &[u8]) -> Result<Value, OrderedDecodeError> {
    let len = element_len(bytes)?;
    if len != bytes.len() {
        return Err(OrderedDecodeError::Trailing);
    }

    let tag = bytes[0];
    if tag == ORDINAL_TAG {
        return Err(OrderedDecodeError::UnexpectedOrdinal);
    }

    let payload = &bytes[1..];
    let value = match ValueTag::from_u8(tag) {
        Some(ValueTag::Null) => Value::Null,
        Some(ValueTag::Bool) => Value::Bool(payload[0] != 0),
        Some(ValueTag::Int) => Value::Int(decode_ordered_i64(payload)),
        Some(ValueTag::Uint) => Value::Uint(u64::from_be_bytes(fixed8(payload))),
        Some(ValueTag::Text) => {
            let raw = unescape(payload)?;
            Value::Text(String::from_utf8(raw).map_err(|_| OrderedDecodeError::InvalidEscape)?)
        }
        Some(ValueTag::Blob) => Value::Blob(unescape(payload)?),
        None => return Err(OrderedDecodeError::UnknownTag { tag }),
    };

    Ok(value)
}

// Zero bytes are escaped so the two-byte terminator stays unambiguous.
fn push_escaped_bytes(out: &mut Vec<u8>, bytes: &[u8]) {
    for &byte in bytes {
        if byte == ESCAPE {
            out.extend_from_slice(&[ESCAPE, ESCAPED_ZERO]);
        } else {
            out.push(byte);
        }
    }
}

fn push_terminated_bytes(out: &mut Vec<u8>, bytes: &[u8]) {
    push_escaped_bytes(out, bytes);
    out.extend_from_slice(&TERMINATOR);
}

// Length of an escaped payload including its terminator.
fn terminated_len(payload: &[u8]) -> Result<usize, OrderedDecodeError> {
    let mut idx = 0;
    while idx < payload.len() {
        if payload[idx] == ESCAPE {
            match payload.get(idx + 1) {
                Some(&ESCAPE) => return Ok(idx + 2),
                Some(&ESCAPED_ZERO) => idx += 2,
                Some(_) => return Err(OrderedDecodeError::InvalidEscape),
                None => return Err(OrderedDecodeError::Truncated),
            }
        } else {
            idx += 1;
        }
    }

    Err(OrderedDecodeError::Truncated)
}

// Input is a full escaped payload including its terminator.
fn unescape(payload: &[u8]) -> Result<Vec<u8>, OrderedDecodeError> {
    let body = payload
        .strip_suffix(&TERMINATOR)
        .ok_or(OrderedDecodeError::Truncated)?;

    let mut out = Vec::with_capacity(body.len());
    let mut iter = body.iter();
    while let Some(&byte) = iter.next() {
        if byte == ESCAPE {
            match iter.next() {
                Some(&ESCAPED_ZERO) => out.push(0),
                _ => return Err(OrderedDecodeError::InvalidEscape),
            }
        } else {
            out.push(byte);
        }
    }

    Ok(out)
}

const fn ordered_i64_bytes(value: i64) -> [u8; 8] {
    (value.cast_unsigned() ^ SIGN_FLIP).to_be_bytes()
}

fn decode_ordered_i64(payload: &[u8]) -> i64 {
    (u64::from_be_bytes(fixed8(payload)) ^ SIGN_FLIP).cast_signed()
}

fn fixed8(payload: &[u8]) -> [u8; 8] {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&payload[..8]);
    buf
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn encoded(value: &Value) -> Vec<u8> {
        let mut out = Vec::new();
        encode_element(value, &mut out);
        out
    }

    #[test]
    fn ordinal_elements_have_fixed_width() {
        let mut out = Vec::new();
        encode_ordinal_element(100, &mut out);

        assert_eq!(out.len(), ORDINAL_ELEMENT_LEN);
        assert_eq!(element_len(&out), Ok(ORDINAL_ELEMENT_LEN));
        assert_eq!(decode_ordinal(&out), Ok(100));
        assert_eq!(
            decode_element(&out),
            Err(OrderedDecodeError::UnexpectedOrdinal)
        );
    }

    #[test]
    fn null_sorts_before_every_other_value() {
        let null = encoded(&Value::Null);
        for value in [
            Value::Bool(false),
            Value::Int(i64::MIN),
            Value::Uint(0),
            Value::Text(String::new()),
            Value::Blob(Vec::new()),
        ] {
            assert!(null < encoded(&value), "null must sort before {value}");
        }
    }

    #[test]
    fn embedded_zero_bytes_round_trip() {
        let value = Value::Blob(vec![0, 1, 0, 0, 0xFF]);
        let bytes = encoded(&value);

        assert_eq!(element_len(&bytes), Ok(bytes.len()));
        assert_eq!(decode_element(&bytes), Ok(value));
    }

    #[test]
    fn malformed_escape_is_rejected() {
        let bytes = [ValueTag::Text.to_u8(), b'a', 0x00, 0x07, 0x00, 0x00];

        assert_eq!(element_len(&bytes), Err(OrderedDecodeError::InvalidEscape));
    }

    #[test]
    fn open_prefix_is_a_byte_prefix_of_longer_text() {
        let mut prefix = Vec::new();
        encode_open_prefix(&Value::from("ab"), &mut prefix);

        for text in ["ab", "abc", "ab\0z"] {
            assert!(encoded(&Value::from(text)).starts_with(&prefix));
        }
        assert!(!encoded(&Value::from("ac")).starts_with(&prefix));
    }

    proptest! {
        #[test]
        fn int_encoding_preserves_order(a in any::<i64>(), b in any::<i64>()) {
            prop_assert_eq!(a.cmp(&b), encoded(&Value::Int(a)).cmp(&encoded(&Value::Int(b))));
        }

        #[test]
        fn text_encoding_preserves_order(a in ".{0,12}", b in ".{0,12}") {
            let left = encoded(&Value::Text(a.clone()));
            let right = encoded(&Value::Text(b.clone()));
            prop_assert_eq!(a.as_bytes().cmp(b.as_bytes()), left.cmp(&right));
        }

        #[test]
        fn text_elements_are_self_delimiting(a in ".{0,12}", tail in prop::collection::vec(any::<u8>(), 0..8)) {
            let mut bytes = encoded(&Value::Text(a.clone()));
            let len = bytes.len();
            bytes.extend_from_slice(&tail);

            prop_assert_eq!(element_len(&bytes), Ok(len));
            prop_assert_eq!(decode_element(&bytes[..len]), Ok(Value::Text(a)));
        }
    }
}
