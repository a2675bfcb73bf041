use serde::{Deserialize, Serialize};
use std::cell::RefCell;

///
/// ScanCounters
/// Ephemeral, in-memory counters for group scans on this thread.
///

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct ScanCounters {
    pub scans_opened: u64,
    pub scans_closed: u64,

    // delivery
    pub rows_delivered: u64,
    pub rows_repeated: u64,
    pub buffers_delivered: u64,
    pub bytes_delivered: u64,

    // ancestor cache
    pub ancestor_refetches: u64,
    pub ancestors_synthesized: u64,
}

thread_local! {
    static SCAN_COUNTERS: RefCell<ScanCounters> = RefCell::new(ScanCounters::default());
}

/// Borrow counters immutably.
pub(crate) fn with_state<R>(f: impl FnOnce(&ScanCounters) -> R) -> R {
    SCAN_COUNTERS.with(|m| f(&m.borrow()))
}

/// Borrow counters mutably.
pub(crate) fn with_state_mut<R>(f: impl FnOnce(&mut ScanCounters) -> R) -> R {
    SCAN_COUNTERS.with(|m| f(&mut m.borrow_mut()))
}

/// Reset all counters.
pub(crate) fn reset_all() {
    with_state_mut(|m| *m = ScanCounters::default());
}
