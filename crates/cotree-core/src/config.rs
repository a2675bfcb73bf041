//! Scan tuning knobs passed at cursor open.

use serde::Deserialize;

///
/// ScanConfig
///
/// Per-cursor tuning. Every field has a default, so partial configuration
/// documents deserialize cleanly.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(default)]
pub struct ScanConfig {
    /// Values at least this long are read partially during traversal and
    /// completed with a full fetch only when the row is materialized.
    pub max_short_record: usize,

    /// Initial capacity of each pending-row scratch buffer.
    pub initial_row_capacity: usize,

    /// Emit a completion line when the scan finishes.
    pub verbose: bool,
}

impl ScanConfig {
    pub const DEFAULT_MAX_SHORT_RECORD: usize = 4096;
    pub const DEFAULT_INITIAL_ROW_CAPACITY: usize = 256;

    #[must_use]
    pub const fn verbose(mut self) -> Self {
        self.verbose = true;
        self
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            max_short_record: Self::DEFAULT_MAX_SHORT_RECORD,
            initial_row_capacity: Self::DEFAULT_INITIAL_ROW_CAPACITY,
            verbose: false,
        }
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_document_keeps_defaults() {
        let config: ScanConfig =
            serde_json::from_str(r#"{ "verbose": true }"#).expect("config should parse");

        assert!(config.verbose);
        assert_eq!(config.max_short_record, ScanConfig::DEFAULT_MAX_SHORT_RECORD);
        assert_eq!(
            config.initial_row_capacity,
            ScanConfig::DEFAULT_INITIAL_ROW_CAPACITY
        );
    }

    #[test]
    fn empty_document_is_default() {
        let config: ScanConfig = serde_json::from_str("{}").expect("config should parse");

        assert_eq!(config, ScanConfig::default());
    }
}
