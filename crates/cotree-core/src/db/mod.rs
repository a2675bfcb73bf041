//! Module: db
//! Responsibility: the group-scan core and the key, filter, projection,
//! store, and delivery layers it drives.
//! Does not own: catalog construction or value encoding.

pub mod delivery;
pub mod direction;
pub mod filter;
pub mod hkey;
pub mod projection;
pub mod row;
pub mod scan;
pub mod selector;
pub mod store;

// re-exports
pub use delivery::PayloadBuffer;
pub use row::RowData;
pub use scan::{ScanFlags, ScanRequest, ScanTarget};
pub use selector::ColumnSelector;
