use crate::value::Value;

///
/// ValueTag
///
/// Stable canonical value-variant tag, written as the first byte of every
/// encoded key element.
///
/// IMPORTANT:
/// Tag values are part of the on-disk key order and must remain fixed.
/// `Null` sorts first so null key columns stay addressable.
///
#[repr(u8)]
#[derive(Clone, Copy, Debug, Eq, Ord, PartialEq, PartialOrd)]
pub enum ValueTag {
    Null = 0x01,
    Bool = 0x02,
    Int = 0x03,
    Uint = 0x04,
    Text = 0x05,
    Blob = 0x06,
}

impl ValueTag {
    /// Stable key byte tag for this variant.
    #[must_use]
    pub const fn to_u8(self) -> u8 {
        self as u8
    }

    pub(crate) const fn from_u8(tag: u8) -> Option<Self> {
        match tag {
            0x01 => Some(Self::Null),
            0x02 => Some(Self::Bool),
            0x03 => Some(Self::Int),
            0x04 => Some(Self::Uint),
            0x05 => Some(Self::Text),
            0x06 => Some(Self::Blob),
            _ => None,
        }
    }

    /// Stable human-readable value kind label for diagnostics.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Null => "Null",
            Self::Bool => "Bool",
            Self::Int => "Int",
            Self::Uint => "Uint",
            Self::Text => "Text",
            Self::Blob => "Blob",
        }
    }
}

#[must_use]
pub(super) const fn canonical_tag(value: &Value) -> ValueTag {
    match value {
        Value::Null => ValueTag::Null,
        Value::Bool(_) => ValueTag::Bool,
        Value::Int(_) => ValueTag::Int,
        Value::Uint(_) => ValueTag::Uint,
        Value::Text(_) => ValueTag::Text,
        Value::Blob(_) => ValueTag::Blob,
    }
}
