use std::time::Duration;

/// Last-known state of the hardware's page-select register.
///
/// Logically independent of the session that embeds it: the cache only
/// decides, it never touches the bus. `page == None` means the register
/// value is unknown or untrusted (never read, or the last page-select bus
/// operation failed); the engine must then re-read the hardware before
/// relying on it. `stamp` anchors both the retention window and the
/// post-page-switch settle window, and is refreshed by every successful
/// page-select register access (confirm-read or select-write alike).
#[derive(Debug, Default)]
pub(crate) struct PageCache {
    page: Option<u8>,
    stamp: Option<Duration>,
}

impl PageCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(&self) -> Option<u8> {
        self.page
    }

    /// Whether the cached value must be re-confirmed from the hardware:
    /// unknown, or confirmed longer than `retention` ago.
    pub fn is_stale(&self, now: Duration, retention: Duration) -> bool {
        match (self.page, self.stamp) {
            (Some(_), Some(stamp)) => now.saturating_sub(stamp) > retention,
            _ => true,
        }
    }

    /// Time left before the settle window since the last page-select access
    /// has elapsed, if any.
    pub fn settle_remaining(&self, now: Duration, wait: Duration) -> Option<Duration> {
        let stamp = self.stamp?;
        let elapsed = now.saturating_sub(stamp);
        if elapsed < wait {
            Some(wait - elapsed)
        } else {
            None
        }
    }

    /// Adopt `page` as the active page, confirmed at `now`.
    pub fn record(&mut self, page: u8, now: Duration) {
        self.page = Some(page);
        self.stamp = Some(now);
    }

    /// Stop trusting the cached value. Called after any page-select bus
    /// failure; the next upper-half access re-reads the register regardless
    /// of elapsed time.
    pub fn invalidate(&mut self) {
        self.page = None;
        self.stamp = None;
    }
}
