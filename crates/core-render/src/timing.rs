//! Flush timing instrumentation: duration of the last completed flush in
//! nanoseconds, for the HUD and for pacing diagnostics.

use std::sync::atomic::{AtomicU64, Ordering};

static LAST_FLUSH_NS: AtomicU64 = AtomicU64::new(0);

pub fn record_last_flush_ns(ns: u64) {
    LAST_FLUSH_NS.store(ns, Ordering::Relaxed);
}

pub fn last_flush_ns() -> u64 {
    LAST_FLUSH_NS.load(Ordering::Relaxed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_and_load() {
        record_last_flush_ns(4321);
        assert_eq!(last_flush_ns(), 4321);
    }
}
