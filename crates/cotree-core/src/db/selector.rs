use std::fmt;

///
/// ColumnSelector
///
/// Immutable column bitmap, positional over the scan target's fields:
/// table-relative for a table target, group-relative for a group target.
/// Bit `i` lives in byte `i / 8` at mask `1 << (i % 8)`.
///

#[derive(Clone, Default, Eq, PartialEq)]
pub struct ColumnSelector {
    bits: Vec<u8>,
}

impl ColumnSelector {
    #[must_use]
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self {
            bits: bytes.to_vec(),
        }
    }

    /// No columns requested.
    #[must_use]
    pub const fn empty() -> Self {
        Self { bits: Vec::new() }
    }

    /// Every column of a `width`-column target.
    #[must_use]
    pub fn all(width: usize) -> Self {
        Self::with_columns(0..width)
    }

    #[must_use]
    pub fn with_columns(columns: impl IntoIterator<Item = usize>) -> Self {
        let mut bits = Vec::new();
        for column in columns {
            let byte = column / 8;
            if bits.len() <= byte {
                bits.resize(byte + 1, 0);
            }
            bits[byte] |= 1 << (column % 8);
        }

        Self { bits }
    }

    #[must_use]
    pub fn includes(&self, column: usize) -> bool {
        self.bits
            .get(column / 8)
            .is_some_and(|byte| byte & (1 << (column % 8)) != 0)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bits.iter().all(|byte| *byte == 0)
    }

    /// Whether any bit in `range` is set.
    #[must_use]
    pub fn any_in(&self, range: std::ops::Range<usize>) -> bool {
        range.into_iter().any(|column| self.includes(column))
    }

    /// Set bits, ascending.
    pub fn columns(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.bits.len() * 8).filter(|column| self.includes(*column))
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bits
    }
}

impl fmt::Debug for ColumnSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.columns()).finish()
    }
}

///
/// TESTS
///
