//! Store call counters.
//!
//! Every call that reaches the store is counted, which lets tests assert
//! things like "an empty batch read makes no store calls".

use std::sync::atomic::{AtomicU64, Ordering};

/// Call counters for a store.
///
/// All counters are atomic and monotonically increasing.
#[derive(Debug, Default)]
pub struct StoreStats {
    /// Single-key reads.
    gets: AtomicU64,
    /// Batch reads.
    batch_gets: AtomicU64,
    /// Scans started (filtered or not).
    scans: AtomicU64,
    /// Scan pages fetched.
    scan_pages: AtomicU64,
    /// Writes.
    puts: AtomicU64,
    /// Touch rewrites.
    touches: AtomicU64,
    /// Deletes.
    deletes: AtomicU64,
    /// Calls that returned an error.
    errors: AtomicU64,
}

impl StoreStats {
    /// Creates zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_get(&self) {
        self.gets.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_batch_get(&self) {
        self.batch_gets.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_scan(&self) {
        self.scans.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_scan_page(&self) {
        self.scan_pages.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_put(&self) {
        self.puts.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_touch(&self) {
        self.touches.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_delete(&self) {
        self.deletes.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns a point-in-time copy of the counters.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            gets: self.gets.load(Ordering::Relaxed),
            batch_gets: self.batch_gets.load(Ordering::Relaxed),
            scans: self.scans.load(Ordering::Relaxed),
            scan_pages: self.scan_pages.load(Ordering::Relaxed),
            puts: self.puts.load(Ordering::Relaxed),
            touches: self.touches.load(Ordering::Relaxed),
            deletes: self.deletes.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
        }
    }

    /// Resets all counters to zero.
    pub fn reset(&self) {
        self.gets.store(0, Ordering::Relaxed);
        self.batch_gets.store(0, Ordering::Relaxed);
        self.scans.store(0, Ordering::Relaxed);
        self.scan_pages.store(0, Ordering::Relaxed);
        self.puts.store(0, Ordering::Relaxed);
        self.touches.store(0, Ordering::Relaxed);
        self.deletes.store(0, Ordering::Relaxed);
        self.errors.store(0, Ordering::Relaxed);
    }
}

/// A snapshot of store counters at a point in time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Single-key reads.
    pub gets: u64,
    /// Batch reads.
    pub batch_gets: u64,
    /// Scans started.
    pub scans: u64,
    /// Scan pages fetched.
    pub scan_pages: u64,
    /// Writes.
    pub puts: u64,
    /// Touch rewrites.
    pub touches: u64,
    /// Deletes.
    pub deletes: u64,
    /// Failed calls.
    pub errors: u64,
}

impl StatsSnapshot {
    /// Total calls that reached the store.
    pub fn total_calls(&self) -> u64 {
        self.gets + self.batch_gets + self.scans + self.puts + self.touches + self.deletes
    }

    /// Read calls only (single, batch, scan).
    pub fn reads(&self) -> u64 {
        self.gets + self.batch_gets + self.scans
    }
}
