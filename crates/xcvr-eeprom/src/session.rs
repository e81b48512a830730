use std::sync::{Arc, Mutex};

use crate::cache::PageCache;
use crate::clock::{Clock, SystemClock};
use crate::config::Tunables;
use crate::engine::{Transaction, Xfer};
use crate::error::{EepromError, Result};
use crate::module::ModuleKind;
use crate::transport::BusTransport;

/// One attached transceiver module, exposing its EEPROM as a flat byte range.
///
/// The session binds the module kind, the (non-owned, possibly shared) bus
/// transport and the page-cache state behind a single mutex. The mutex is the
/// per-device exclusivity lock: it fully brackets address translation, page
/// refresh, page switch, settle delay and the data transfer, so transactions
/// on one device never interleave on the bus. Concurrent callers block;
/// operations on the same session are strictly serialized, with no ordering
/// promised across sessions.
///
/// `std::sync::Mutex` does not inherit priority; a high-priority caller can
/// briefly invert behind a low-priority holder for the duration of one bus
/// transaction. This is an accepted limitation on targets without a
/// priority-inheriting primitive.
pub struct DeviceSession<T: BusTransport + ?Sized, C: Clock = SystemClock> {
    transport: Arc<T>,
    kind: ModuleKind,
    base_addr: u16,
    size: u64,
    tunables: Arc<Tunables>,
    clock: C,
    inner: Mutex<Inner>,
}

struct Inner {
    attached: bool,
    page: PageCache,
}

impl<T: BusTransport + ?Sized> DeviceSession<T> {
    /// Bind a module that the host's device-matching mechanism identified as
    /// `kind`, reachable at `base_addr` through `transport`.
    ///
    /// The session starts attached, with the active page unknown. An
    /// [`ModuleKind::Unknown`] module is not rejected: hardware
    /// identification may lag module support, so it degrades to best-effort
    /// flat access to the first bank, with a warning.
    pub fn attach(
        transport: Arc<T>,
        base_addr: u16,
        kind: ModuleKind,
        tunables: Arc<Tunables>,
    ) -> Arc<Self> {
        Self::attach_with_clock(transport, base_addr, kind, tunables, SystemClock::default())
    }
}

impl<T: BusTransport + ?Sized, C: Clock> DeviceSession<T, C> {
    /// [`DeviceSession::attach`] with an explicit clock, used by tests to
    /// drive retention and settle timing deterministically.
    pub fn attach_with_clock(
        transport: Arc<T>,
        base_addr: u16,
        kind: ModuleKind,
        tunables: Arc<Tunables>,
        clock: C,
    ) -> Arc<Self> {
        if kind == ModuleKind::Unknown {
            tracing::warn!(
                base_addr,
                "unknown module kind; exposing a single 256-byte bank best-effort"
            );
        }
        Arc::new(Self {
            transport,
            kind,
            base_addr,
            size: kind.exposed_size(),
            tunables,
            clock,
            inner: Mutex::new(Inner {
                attached: true,
                page: PageCache::new(),
            }),
        })
    }

    pub fn kind(&self) -> ModuleKind {
        self.kind
    }

    /// Total linear byte-address space visible through this session.
    pub fn exposed_size(&self) -> u64 {
        self.size
    }

    pub fn is_attached(&self) -> bool {
        self.inner.lock().unwrap().attached
    }

    /// Tear down the binding. Idempotent; any operation issued afterwards
    /// fails with [`EepromError::Detached`]. An operation already holding
    /// the lock completes first.
    pub fn detach(&self) {
        self.inner.lock().unwrap().attached = false;
    }

    /// Read up to `buf.len()` bytes starting at `ofs` in the flat space.
    ///
    /// Returns the number of bytes actually read, which may be less than
    /// requested: transfers are clamped at bank/page boundaries and capped
    /// at [`crate::MAX_TRANSFER`] bytes. Loop to cover a full range.
    pub fn read_at(&self, ofs: u64, buf: &mut [u8]) -> Result<usize> {
        self.rw(ofs, Xfer::Read(buf))
    }

    /// Write up to `data.len()` bytes starting at `ofs` in the flat space.
    /// Same short-transfer semantics as [`DeviceSession::read_at`].
    pub fn write_at(&self, ofs: u64, data: &[u8]) -> Result<usize> {
        self.rw(ofs, Xfer::Write(data))
    }

    fn rw(&self, ofs: u64, xfer: Xfer<'_>) -> Result<usize> {
        // Validate the request before taking the lock or touching the bus.
        let len = xfer.len();
        if ofs >= self.size {
            return Err(EepromError::InvalidSeek {
                offset: ofs,
                size: self.size,
            });
        }
        if len == 0 {
            return Err(EepromError::InvalidLength);
        }
        if ofs + len as u64 > self.size {
            return Err(EepromError::NoSpace {
                offset: ofs,
                len,
                size: self.size,
            });
        }

        let mut inner = self.inner.lock().unwrap();
        if !inner.attached {
            return Err(EepromError::Detached);
        }

        Transaction {
            transport: &*self.transport,
            clock: &self.clock,
            tunables: &self.tunables,
            kind: self.kind,
            base_addr: self.base_addr,
            page: &mut inner.page,
        }
        .run(ofs, xfer)
    }
}
