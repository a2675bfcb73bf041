use crate::db::{hkey::EncodingError, store::StoreError};
use std::fmt;
use thiserror::Error as ThisError;

///
/// ScanError
///
/// Error surface of one group scan.
/// Buffer-full is never an error; it is reported through `has_more`.
///

#[derive(Debug, ThisError)]
pub enum ScanError {
    #[error(transparent)]
    Encoding(#[from] EncodingError),

    #[error("empty column selector on a {tables}-table group has no inferable projection")]
    ProjectionAmbiguous { tables: usize },

    #[error("payload buffer must have at least {required} available bytes: {available}")]
    BufferTooSmall { available: usize, required: usize },

    #[error("row of {size} bytes cannot fit a {limit}-byte payload buffer")]
    OversizeRow { size: usize, limit: usize },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Internal(#[from] InternalError),
}

impl ScanError {
    /// Stable label used in logs and metrics.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Encoding(_) => "encoding",
            Self::ProjectionAmbiguous { .. } => "projection_ambiguous",
            Self::BufferTooSmall { .. } => "buffer_too_small",
            Self::OversizeRow { .. } => "oversize_row",
            Self::Store(_) => "store",
            Self::Internal(_) => "internal",
        }
    }
}

///
/// InternalError
///
/// Structured runtime error with a stable internal classification.
/// Not a stable API; intended for internal use and may change without notice.
///

#[derive(Debug, ThisError)]
#[error("{message}")]
pub struct InternalError {
    pub class: ErrorClass,
    pub origin: ErrorOrigin,
    pub message: String,
}

impl InternalError {
    pub fn new(class: ErrorClass, origin: ErrorOrigin, message: impl Into<String>) -> Self {
        Self {
            class,
            origin,
            message: message.into(),
        }
    }

    /// Construct a schema-origin invariant violation.
    pub(crate) fn schema_invariant(message: impl Into<String>) -> Self {
        Self::new(
            ErrorClass::InvariantViolation,
            ErrorOrigin::Schema,
            message.into(),
        )
    }

    /// Construct a scan-origin invariant violation.
    pub(crate) fn scan_invariant(message: impl Into<String>) -> Self {
        Self::new(
            ErrorClass::InvariantViolation,
            ErrorOrigin::Scan,
            message.into(),
        )
    }

    /// Construct an index-origin invariant violation.
    pub(crate) fn index_invariant(message: impl Into<String>) -> Self {
        Self::new(
            ErrorClass::InvariantViolation,
            ErrorOrigin::Index,
            message.into(),
        )
    }

    /// Construct a corruption error for a specific origin.
    pub(crate) fn corruption(origin: ErrorOrigin, message: impl Into<String>) -> Self {
        Self::new(ErrorClass::Corruption, origin, message.into())
    }

    /// Construct a store-origin corruption error.
    pub(crate) fn store_corruption(message: impl Into<String>) -> Self {
        Self::corruption(ErrorOrigin::Store, message)
    }

    /// Construct a serialize-origin internal error.
    pub(crate) fn serialize_internal(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::Internal, ErrorOrigin::Serialize, message.into())
    }

    /// Construct a not-found error for a catalog lookup.
    pub(crate) fn schema_not_found(what: &str, key: impl fmt::Display) -> Self {
        Self::new(
            ErrorClass::NotFound,
            ErrorOrigin::Schema,
            format!("{what} not found: {key}"),
        )
    }

    #[must_use]
    pub fn display_with_class(&self) -> String {
        format!("{}:{}: {}", self.origin, self.class, self.message)
    }
}

///
/// ErrorClass
/// Internal error taxonomy for runtime classification.
/// Not a stable API; may change without notice.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorClass {
    Corruption,
    NotFound,
    Internal,
    Unsupported,
    InvariantViolation,
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Corruption => "corruption",
            Self::NotFound => "not_found",
            Self::Internal => "internal",
            Self::Unsupported => "unsupported",
            Self::InvariantViolation => "invariant_violation",
        };
        write!(f, "{label}")
    }
}

///
/// ErrorOrigin
/// Internal origin taxonomy for runtime classification.
/// Not a stable API; may change without notice.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorOrigin {
    Serialize,
    Schema,
    Store,
    Index,
    Scan,
    Delivery,
}

impl fmt::Display for ErrorOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Serialize => "serialize",
            Self::Schema => "schema",
            Self::Store => "store",
            Self::Index => "index",
            Self::Scan => "scan",
            Self::Delivery => "delivery",
        };
        write!(f, "{label}")
    }
}

///
/// TESTS
///
