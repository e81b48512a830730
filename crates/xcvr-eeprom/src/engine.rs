//! The transaction engine: one locked bus operation from translation to the
//! data transfer.
//!
//! A [`Transaction`] borrows everything it needs from the session while the
//! session's exclusivity lock is held, so the whole sequence — translate,
//! refresh the page cache, switch pages, settle, move data — executes with
//! no other operation interleaving on the device.

use crate::cache::PageCache;
use crate::clock::Clock;
use crate::config::Tunables;
use crate::error::{EepromError, Result};
use crate::module::{ModuleKind, MAX_TRANSFER, PAGE_SELECT_REG};
use crate::translate::translate;
use crate::transport::{BusTransport, Segment};

/// Direction and caller buffer for one operation.
pub(crate) enum Xfer<'a> {
    Read(&'a mut [u8]),
    Write(&'a [u8]),
}

impl Xfer<'_> {
    pub(crate) fn len(&self) -> usize {
        match self {
            Xfer::Read(buf) => buf.len(),
            Xfer::Write(buf) => buf.len(),
        }
    }
}

/// One in-flight operation on a device. Constructed by the session with its
/// lock held; consumed by [`Transaction::run`].
pub(crate) struct Transaction<'a, T: BusTransport + ?Sized, C: Clock> {
    pub transport: &'a T,
    pub clock: &'a C,
    pub tunables: &'a Tunables,
    pub kind: ModuleKind,
    pub base_addr: u16,
    pub page: &'a mut PageCache,
}

impl<T: BusTransport + ?Sized, C: Clock> Transaction<'_, T, C> {
    /// Execute one pre-validated read or write. Returns the number of bytes
    /// actually moved, which may be less than requested: the translator
    /// clamps at bank/page boundaries and the engine additionally caps each
    /// transfer at [`MAX_TRANSFER`]. Callers loop for full coverage.
    pub fn run(mut self, ofs: u64, xfer: Xfer<'_>) -> Result<usize> {
        let map = translate(self.kind, self.base_addr, ofs, xfer.len());

        if let Some(page) = map.page {
            self.ensure_page(map.bus_addr, page)?;
        }

        let len = map.len.min(MAX_TRANSFER);
        self.settle();

        match xfer {
            Xfer::Read(buf) => {
                let reg = [map.reg];
                let mut segments = [Segment::Write(&reg), Segment::Read(&mut buf[..len])];
                self.transfer(map.bus_addr, &mut segments)?;
            }
            Xfer::Write(data) => {
                // Register address concatenated with the payload, one segment.
                let mut iobuf = [0u8; MAX_TRANSFER + 1];
                iobuf[0] = map.reg;
                iobuf[1..=len].copy_from_slice(&data[..len]);
                let mut segments = [Segment::Write(&iobuf[..len + 1])];
                self.transfer(map.bus_addr, &mut segments)?;
            }
        }

        Ok(len)
    }

    /// Make sure the hardware has `required` selected, re-confirming the
    /// page-select register when the cached value is unknown or older than
    /// the retention window.
    ///
    /// Blindly writing page select is not an option: some modules (DACs in
    /// particular) NAK the data write afterwards, even for selecting the
    /// page already active. So the register is written only when the
    /// (possibly refreshed) cached value differs from the required page.
    fn ensure_page(&mut self, addr: u16, required: u8) -> Result<()> {
        if self
            .page
            .is_stale(self.clock.now(), self.tunables.page_retention())
        {
            let mut cur = [0u8];
            let reg = [PAGE_SELECT_REG];
            let mut segments = [Segment::Write(&reg), Segment::Read(&mut cur)];
            self.transfer(addr, &mut segments)?;

            // Modules are hot-pluggable and nothing tracks removal, so an
            // unexpected value is worth a notice but is adopted as truth.
            match self.page.page() {
                Some(old) if old != cur[0] => {
                    tracing::info!(new = cur[0], was = old, "resetting current page");
                }
                _ => {}
            }
            self.page.record(cur[0], self.clock.now());
        }

        if self.page.page() == Some(required) {
            return Ok(());
        }

        let select = [PAGE_SELECT_REG, required];
        let mut segments = [Segment::Write(&select)];
        self.transfer(addr, &mut segments)?;

        tracing::debug!(page = required, "selected upper page");
        self.page.record(required, self.clock.now());
        Ok(())
    }

    /// Wait out whatever is left of the settle window since the last
    /// page-select register access. Reading the upper page immediately after
    /// selecting it hangs some modules while they load the page EEPROM.
    fn settle(&self) {
        let wait = self.tunables.page_load_wait();
        if wait.is_zero() {
            return;
        }
        if let Some(remaining) = self.page.settle_remaining(self.clock.now(), wait) {
            self.clock.sleep(remaining);
        }
    }

    /// Execute one bus transaction. A transport error invalidates the cached
    /// page (the hardware's page-select state can no longer be trusted) and
    /// is propagated verbatim; completing fewer segments than requested is a
    /// distinct incomplete-transfer condition.
    fn transfer(&mut self, addr: u16, segments: &mut [Segment<'_>]) -> Result<()> {
        let expected = segments.len();
        match self.transport.transfer(addr, segments) {
            Ok(completed) if completed == expected => Ok(()),
            Ok(completed) => Err(EepromError::IncompleteTransfer {
                completed,
                expected,
            }),
            Err(e) => {
                self.page.invalidate();
                Err(e.into())
            }
        }
    }
}
