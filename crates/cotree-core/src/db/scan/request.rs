use crate::{
    db::{direction::Direction, selector::ColumnSelector},
    schema::{IndexId, TableId},
    value::Value,
};
use std::{fmt, ops::BitOr};

///
/// ScanTarget
///
/// What the scan's rows and selector are positional over.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ScanTarget {
    Table(TableId),
    Group,
}

///
/// ScanFlags
///
/// Scan modifier bits. Values are stable.
///

#[derive(Clone, Copy, Default, Eq, PartialEq)]
pub struct ScanFlags(u8);

impl ScanFlags {
    pub const DESCENDING: Self = Self(1 << 0);
    pub const START_EXCLUSIVE: Self = Self(1 << 1);
    pub const END_EXCLUSIVE: Self = Self(1 << 2);
    pub const SINGLE_ROW: Self = Self(1 << 3);
    pub const PREFIX: Self = Self(1 << 4);
    pub const START_AT_EDGE: Self = Self(1 << 5);
    pub const END_AT_EDGE: Self = Self(1 << 6);
    pub const DEEP: Self = Self(1 << 7);

    const NAMES: [(Self, &'static str); 8] = [
        (Self::DESCENDING, "DESCENDING"),
        (Self::START_EXCLUSIVE, "START_EXCLUSIVE"),
        (Self::END_EXCLUSIVE, "END_EXCLUSIVE"),
        (Self::SINGLE_ROW, "SINGLE_ROW"),
        (Self::PREFIX, "PREFIX"),
        (Self::START_AT_EDGE, "START_AT_EDGE"),
        (Self::END_AT_EDGE, "END_AT_EDGE"),
        (Self::DEEP, "DEEP"),
    ];

    #[must_use]
    pub const fn empty() -> Self {
        Self(0)
    }

    #[must_use]
    pub const fn from_bits(bits: u8) -> Self {
        Self(bits)
    }

    #[must_use]
    pub const fn bits(self) -> u8 {
        self.0
    }

    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for ScanFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl fmt::Debug for ScanFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<_> = Self::NAMES
            .iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, name)| *name)
            .collect();

        if names.is_empty() {
            f.write_str("(none)")
        } else {
            f.write_str(&names.join("|"))
        }
    }
}

///
/// ScanRequest
///
/// One scan: target, optional driving index, boundary templates, column
/// selector, and flags. Templates are rows shaped like the target; only key
/// columns participate and a `Null` field is unbound.
///

#[derive(Clone, Debug)]
pub struct ScanRequest {
    pub target: ScanTarget,
    pub index: Option<IndexId>,
    pub start: Option<Vec<Value>>,
    pub end: Option<Vec<Value>>,
    pub selector: ColumnSelector,
    pub flags: ScanFlags,
}

impl ScanRequest {
    #[must_use]
    pub const fn new(target: ScanTarget) -> Self {
        Self {
            target,
            index: None,
            start: None,
            end: None,
            selector: ColumnSelector::empty(),
            flags: ScanFlags::empty(),
        }
    }

    #[must_use]
    pub const fn table(table: TableId) -> Self {
        Self::new(ScanTarget::Table(table))
    }

    #[must_use]
    pub const fn group() -> Self {
        Self::new(ScanTarget::Group)
    }

    #[must_use]
    pub const fn with_index(mut self, index: IndexId) -> Self {
        self.index = Some(index);
        self
    }

    #[must_use]
    pub fn with_start(mut self, start: Vec<Value>) -> Self {
        self.start = Some(start);
        self
    }

    #[must_use]
    pub fn with_end(mut self, end: Vec<Value>) -> Self {
        self.end = Some(end);
        self
    }

    /// Use the same template for both bounds.
    #[must_use]
    pub fn with_key(self, key: Vec<Value>) -> Self {
        self.with_start(key.clone()).with_end(key)
    }

    #[must_use]
    pub fn with_selector(mut self, selector: ColumnSelector) -> Self {
        self.selector = selector;
        self
    }

    #[must_use]
    pub fn with_flags(mut self, flags: ScanFlags) -> Self {
        self.flags = self.flags | flags;
        self
    }

    #[must_use]
    pub const fn has(&self, flag: ScanFlags) -> bool {
        self.flags.contains(flag)
    }

    #[must_use]
    pub const fn direction(&self) -> Direction {
        if self.has(ScanFlags::DESCENDING) {
            Direction::Desc
        } else {
            Direction::Asc
        }
    }

    /// Start template value at `column`, unless unbound or ignored.
    #[must_use]
    pub fn start_value(&self, column: usize) -> Option<&Value> {
        if self.has(ScanFlags::START_AT_EDGE) {
            return None;
        }

        bound_value(self.start.as_deref(), column)
    }

    /// End template value at `column`, unless unbound or ignored.
    #[must_use]
    pub fn end_value(&self, column: usize) -> Option<&Value> {
        if self.has(ScanFlags::END_AT_EDGE) {
            return None;
        }

        bound_value(self.end.as_deref(), column)
    }
}

fn bound_value(template: Option<&[Value]>, column: usize) -> Option<&Value> {
    template?.get(column).filter(|value| !value.is_null())
}
