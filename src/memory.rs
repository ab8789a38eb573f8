//! # Memory watchdog.
//!
//! A best-effort backpressure signal for the run loop. The watchdog samples
//! the process resident set once per `check_interval` calls; when it exceeds
//! 80% of the soft limit a collect pass is forced, and when it still exceeds
//! the limit the run loop is told to stop. It never cancels individual
//! tasks.
//!
//! "Collect" in a runtime without a garbage collector means shrinking the
//! scheduler's queue and side-table allocations back to their occupancy.
//!
//! Residency is read from `/proc/self/statm` on Linux; on other platforms
//! the watchdog is inert.

use std::cell::Cell;

/// RSS sampler with interval-based throttling.
#[derive(Debug)]
pub struct MemoryWatchdog {
    soft_limit_mb: Cell<u64>,
    check_interval: Cell<u32>,
    gc_interval: Cell<u32>,
    check_calls: Cell<u32>,
    gc_calls: Cell<u32>,
}

impl MemoryWatchdog {
    /// Creates a watchdog. A zero `soft_limit_mb` disables it; intervals are
    /// clamped to at least one.
    pub fn new(soft_limit_mb: u64, check_interval: u32, gc_interval: u32) -> Self {
        MemoryWatchdog {
            soft_limit_mb: Cell::new(soft_limit_mb),
            check_interval: Cell::new(check_interval.max(1)),
            gc_interval: Cell::new(gc_interval.max(1)),
            check_calls: Cell::new(0),
            gc_calls: Cell::new(0),
        }
    }

    pub(crate) fn set_soft_limit_mb(&self, mb: u64) {
        self.soft_limit_mb.set(mb);
    }

    /// Returns `false` when the run loop should stop: the resident set
    /// exceeds the soft limit and `collect` could not bring it back down.
    ///
    /// Sampling happens once per `check_interval` calls; all other calls
    /// return `true` without touching procfs.
    pub fn check_memory_usage(&self, collect: impl FnOnce()) -> bool {
        let calls = self.check_calls.get().wrapping_add(1);
        self.check_calls.set(calls);
        if calls % self.check_interval.get() != 0 {
            return true;
        }

        let limit = self.soft_limit_mb.get();
        if limit == 0 {
            return true;
        }
        let Some(rss) = current_rss_mb() else {
            return true;
        };

        // Above 80% of the limit: try to recover before deciding.
        if rss * 5 >= limit * 4 {
            collect();
        }

        match current_rss_mb() {
            Some(rss) => rss <= limit,
            None => true,
        }
    }

    /// Advisory collection: runs `collect` once per `gc_interval` calls.
    pub fn collect_garbage(&self, collect: impl FnOnce()) {
        let calls = self.gc_calls.get().wrapping_add(1);
        self.gc_calls.set(calls);
        if calls % self.gc_interval.get() == 0 {
            collect();
        }
    }

    /// Unconditional collection.
    pub fn force_collect(&self, collect: impl FnOnce()) {
        collect();
    }
}

/// Current resident set size in megabytes, if the platform exposes it.
#[cfg(target_os = "linux")]
pub fn current_rss_mb() -> Option<u64> {
    let statm = std::fs::read_to_string("/proc/self/statm").ok()?;
    let resident_pages: u64 = statm.split_whitespace().nth(1)?.parse().ok()?;
    // statm reports pages; assume the common 4 KiB page size.
    Some(resident_pages * 4 / 1024)
}

/// Current resident set size in megabytes, if the platform exposes it.
#[cfg(not(target_os = "linux"))]
pub fn current_rss_mb() -> Option<u64> {
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sampling_respects_check_interval() {
        let dog = MemoryWatchdog::new(1, 1000, 1);
        let mut collected = false;
        // Far below the sampling interval: never reads procfs, never stops.
        for _ in 0..10 {
            assert!(dog.check_memory_usage(|| collected = true));
        }
        assert!(!collected);
    }

    #[test]
    fn zero_limit_disables_the_watchdog() {
        let dog = MemoryWatchdog::new(0, 1, 1);
        for _ in 0..3 {
            assert!(dog.check_memory_usage(|| {}));
        }
    }

    #[test]
    fn gc_interval_throttles_collect() {
        let dog = MemoryWatchdog::new(512, 1, 4);
        let mut collects = 0;
        for _ in 0..8 {
            dog.collect_garbage(|| collects += 1);
        }
        assert_eq!(collects, 2);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn rss_is_readable_on_linux() {
        assert!(current_rss_mb().is_some());
    }
}
