use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Monotonic time source plus the ability to block for a settle delay.
///
/// The engine never looks at wall-clock time; everything is a monotonic
/// reading since an arbitrary origin. Production sessions use
/// [`SystemClock`]; tests drive the protocol deterministically with
/// [`FakeClock`].
pub trait Clock: Send + Sync {
    /// Monotonic reading since the clock's origin.
    fn now(&self) -> Duration;

    /// Block the calling thread for `d`.
    fn sleep(&self, d: Duration);
}

/// [`Clock`] backed by [`Instant`] and [`std::thread::sleep`].
#[derive(Clone, Debug)]
pub struct SystemClock {
    origin: Instant,
}

impl Default for SystemClock {
    fn default() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }

    fn sleep(&self, d: Duration) {
        std::thread::sleep(d);
    }
}

/// Deterministic [`Clock`] for tests.
///
/// `sleep` advances the clock instead of blocking, so settle delays are
/// observable as exact jumps in simulator event timestamps. Clones share the
/// same underlying time.
#[derive(Clone, Debug, Default)]
pub struct FakeClock {
    now: Arc<Mutex<Duration>>,
}

impl FakeClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move time forward without sleeping.
    pub fn advance(&self, d: Duration) {
        let mut now = self.now.lock().unwrap();
        *now += d;
    }
}

impl Clock for FakeClock {
    fn now(&self) -> Duration {
        *self.now.lock().unwrap()
    }

    fn sleep(&self, d: Duration) {
        self.advance(d);
    }
}
