use serde::{Deserialize, Serialize};

///
/// Direction
///
/// Scan traversal direction.
///

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl Direction {
    /// First-step key direction, inclusive unless the near bound is
    /// exclusive.
    #[must_use]
    pub const fn initial(self, exclusive: bool) -> KeyDirection {
        match (self, exclusive) {
            (Self::Asc, false) => KeyDirection::Gteq,
            (Self::Asc, true) => KeyDirection::Gt,
            (Self::Desc, false) => KeyDirection::Lteq,
            (Self::Desc, true) => KeyDirection::Lt,
        }
    }
}

///
/// KeyDirection
///
/// Store traversal step relative to the handle's current position.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum KeyDirection {
    Gteq,
    Gt,
    Lteq,
    Lt,
}

impl KeyDirection {
    /// The strict form of this direction, used once a position is consumed.
    #[must_use]
    pub const fn strict(self) -> Self {
        match self {
            Self::Gteq | Self::Gt => Self::Gt,
            Self::Lteq | Self::Lt => Self::Lt,
        }
    }

    #[must_use]
    pub const fn is_forward(self) -> bool {
        matches!(self, Self::Gteq | Self::Gt)
    }

    #[must_use]
    pub const fn is_inclusive(self) -> bool {
        matches!(self, Self::Gteq | Self::Lteq)
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strict_is_idempotent() {
        for dir in [
            KeyDirection::Gteq,
            KeyDirection::Gt,
            KeyDirection::Lteq,
            KeyDirection::Lt,
        ] {
            assert_eq!(dir.strict(), dir.strict().strict());
            assert!(!dir.strict().is_inclusive());
            assert_eq!(dir.is_forward(), dir.strict().is_forward());
        }
    }

    #[test]
    fn initial_direction_honors_near_bound() {
        assert_eq!(Direction::Asc.initial(false), KeyDirection::Gteq);
        assert_eq!(Direction::Asc.initial(true), KeyDirection::Gt);
        assert_eq!(Direction::Desc.initial(false), KeyDirection::Lteq);
        assert_eq!(Direction::Desc.initial(true), KeyDirection::Lt);
    }
}
