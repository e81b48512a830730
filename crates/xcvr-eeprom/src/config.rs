use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Process-wide tunables shared across all device sessions.
///
/// Both values are externally settable at runtime (the host typically wires
/// them to its tunable-parameter mechanism) and are read without locking:
/// they affect only timing heuristics, never the correctness of the address
/// translation, so a racing update is benign.
#[derive(Debug)]
pub struct Tunables {
    /// How long a cached page value is trusted without re-confirmation, in
    /// seconds. The retention bounds the window in which an undetected
    /// module swap could be acted on; it is a traffic/latency trade-off,
    /// not a correctness guarantee.
    page_retention_secs: AtomicU64,
    /// Settle delay after page-select register activity, in milliseconds.
    /// Writing upper page select and immediately reading the page causes
    /// some modules to hang.
    page_load_wait_ms: AtomicU64,
}

impl Default for Tunables {
    fn default() -> Self {
        Self {
            page_retention_secs: AtomicU64::new(1),
            page_load_wait_ms: AtomicU64::new(4),
        }
    }
}

impl Tunables {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page_retention(&self) -> Duration {
        Duration::from_secs(self.page_retention_secs.load(Ordering::Relaxed))
    }

    pub fn set_page_retention_secs(&self, secs: u64) {
        self.page_retention_secs.store(secs, Ordering::Relaxed);
    }

    pub fn page_load_wait(&self) -> Duration {
        Duration::from_millis(self.page_load_wait_ms.load(Ordering::Relaxed))
    }

    pub fn set_page_load_wait_ms(&self, ms: u64) {
        self.page_load_wait_ms.store(ms, Ordering::Relaxed);
    }
}
