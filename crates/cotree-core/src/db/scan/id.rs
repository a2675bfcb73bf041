use std::sync::atomic::{AtomicU64, Ordering};

///
/// ScanIdSource
///
/// Hands out stable per-cursor scan ids.
///

pub trait ScanIdSource {
    fn next_scan_id(&self) -> u64;
}

///
/// AtomicScanIds
///
/// Default id source; safe to share between threads.
///

#[derive(Debug, Default)]
pub struct AtomicScanIds(AtomicU64);

impl AtomicScanIds {
    #[must_use]
    pub const fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    /// First id handed out will be `first`.
    #[must_use]
    pub const fn starting_at(first: u64) -> Self {
        Self(AtomicU64::new(first))
    }
}

impl ScanIdSource for AtomicScanIds {
    fn next_scan_id(&self) -> u64 {
        self.0.fetch_add(1, Ordering::Relaxed)
    }
}
