//! In-memory transceiver module behind the [`BusTransport`] trait.
//!
//! Models the hardware the engine talks to: an auto-incrementing register
//! pointer per device, a real page-select register at 127 for paged modules,
//! and a second flat bank at the next bus address for SFP+. Transactions are
//! logged (with clock timestamps when a [`FakeClock`] is attached) so tests
//! can assert on the exact page-select protocol, and single transactions can
//! be scripted to fail or complete partially.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::clock::{Clock, FakeClock};
use crate::module::{FULL_SIZE, HALF_SIZE, PAGE_COUNT, PAGE_SELECT_REG};
use crate::transport::{BusError, BusTransport, Segment};

/// One bus transaction as observed by the simulated module.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum SimEvent {
    /// Two-segment read of the page-select register.
    PageSelectRead { value: u8, at: Duration },
    /// Two-byte write selecting an upper page.
    PageSelectWrite { page: u8, at: Duration },
    /// A data transfer starting at `reg`.
    Data {
        addr: u16,
        reg: u8,
        len: usize,
        write: bool,
        at: Duration,
    },
}

enum DevKind {
    /// Single 256-byte bank with flat addressing.
    Flat(Vec<u8>),
    /// QSFP-style: unpaged lower half, 256 upper pages multiplexed through
    /// the page-select register.
    Paged {
        lower: Vec<u8>,
        pages: Vec<Vec<u8>>,
        page_sel: u8,
    },
}

impl DevKind {
    fn read_reg(&self, reg: u8) -> u8 {
        match self {
            DevKind::Flat(mem) => mem[reg as usize],
            DevKind::Paged {
                lower,
                pages,
                page_sel,
            } => {
                if reg == PAGE_SELECT_REG {
                    *page_sel
                } else if (reg as usize) < HALF_SIZE {
                    lower[reg as usize]
                } else {
                    pages[*page_sel as usize][reg as usize - HALF_SIZE]
                }
            }
        }
    }

    fn write_reg(&mut self, reg: u8, value: u8) {
        match self {
            DevKind::Flat(mem) => mem[reg as usize] = value,
            DevKind::Paged {
                lower,
                pages,
                page_sel,
            } => {
                if reg == PAGE_SELECT_REG {
                    *page_sel = value;
                } else if (reg as usize) < HALF_SIZE {
                    lower[reg as usize] = value;
                } else {
                    pages[*page_sel as usize][reg as usize - HALF_SIZE] = value;
                }
            }
        }
    }

    fn is_paged(&self) -> bool {
        matches!(self, DevKind::Paged { .. })
    }
}

struct Dev {
    kind: DevKind,
    /// On-chip register pointer; auto-increments per byte transferred.
    pointer: u8,
}

struct SimState {
    devices: BTreeMap<u16, Dev>,
    events: Vec<SimEvent>,
    fail_next: Option<BusError>,
    complete_next: Option<usize>,
}

/// Simulated module (or pair of banks) on a two-wire bus.
pub struct SimTransport {
    state: Mutex<SimState>,
    /// Overlap detector: set for the duration of each transaction. The
    /// session lock must make overlap impossible; the simulator panics if
    /// it ever observes two transactions in flight.
    busy: AtomicBool,
    timestamps: Option<FakeClock>,
}

impl SimTransport {
    fn with_devices(devices: BTreeMap<u16, Dev>) -> Self {
        Self {
            state: Mutex::new(SimState {
                devices,
                events: Vec::new(),
                fail_next: None,
                complete_next: None,
            }),
            busy: AtomicBool::new(false),
            timestamps: None,
        }
    }

    /// QSFP-style paged module at `base_addr`.
    pub fn qsfp(base_addr: u16) -> Self {
        let mut devices = BTreeMap::new();
        devices.insert(
            base_addr,
            Dev {
                kind: DevKind::Paged {
                    lower: vec![0u8; HALF_SIZE],
                    pages: vec![vec![0u8; HALF_SIZE]; PAGE_COUNT],
                    page_sel: 0,
                },
                pointer: 0,
            },
        );
        Self::with_devices(devices)
    }

    /// SFP+-style module: primary bank at `base_addr`, diagnostics bank at
    /// `base_addr + 1`.
    pub fn sfp(base_addr: u16) -> Self {
        let mut devices = BTreeMap::new();
        for addr in [base_addr, base_addr + 1] {
            devices.insert(
                addr,
                Dev {
                    kind: DevKind::Flat(vec![0u8; FULL_SIZE]),
                    pointer: 0,
                },
            );
        }
        Self::with_devices(devices)
    }

    /// Single flat 256-byte bank at `base_addr`.
    pub fn flat(base_addr: u16) -> Self {
        let mut devices = BTreeMap::new();
        devices.insert(
            base_addr,
            Dev {
                kind: DevKind::Flat(vec![0u8; FULL_SIZE]),
                pointer: 0,
            },
        );
        Self::with_devices(devices)
    }

    /// Stamp logged events with readings from `clock` (shared with the
    /// session under test).
    pub fn with_timestamps(mut self, clock: FakeClock) -> Self {
        self.timestamps = Some(clock);
        self
    }

    // --- seeding & inspection -------------------------------------------

    pub fn load_bank(&self, addr: u16, data: &[u8]) {
        let mut state = self.state.lock().unwrap();
        match &mut state.devices.get_mut(&addr).expect("no such device").kind {
            DevKind::Flat(mem) => mem[..data.len()].copy_from_slice(data),
            DevKind::Paged { .. } => panic!("load_bank on a paged device"),
        }
    }

    pub fn load_lower(&self, addr: u16, data: &[u8]) {
        let mut state = self.state.lock().unwrap();
        match &mut state.devices.get_mut(&addr).expect("no such device").kind {
            DevKind::Paged { lower, .. } => lower[..data.len()].copy_from_slice(data),
            DevKind::Flat(_) => panic!("load_lower on a flat device"),
        }
    }

    pub fn load_page(&self, addr: u16, page: u8, data: &[u8]) {
        let mut state = self.state.lock().unwrap();
        match &mut state.devices.get_mut(&addr).expect("no such device").kind {
            DevKind::Paged { pages, .. } => {
                pages[page as usize][..data.len()].copy_from_slice(data)
            }
            DevKind::Flat(_) => panic!("load_page on a flat device"),
        }
    }

    pub fn bank(&self, addr: u16) -> Vec<u8> {
        let state = self.state.lock().unwrap();
        match &state.devices.get(&addr).expect("no such device").kind {
            DevKind::Flat(mem) => mem.clone(),
            DevKind::Paged { .. } => panic!("bank on a paged device"),
        }
    }

    pub fn lower(&self, addr: u16) -> Vec<u8> {
        let state = self.state.lock().unwrap();
        match &state.devices.get(&addr).expect("no such device").kind {
            DevKind::Paged { lower, .. } => lower.clone(),
            DevKind::Flat(_) => panic!("lower on a flat device"),
        }
    }

    pub fn page(&self, addr: u16, page: u8) -> Vec<u8> {
        let state = self.state.lock().unwrap();
        match &state.devices.get(&addr).expect("no such device").kind {
            DevKind::Paged { pages, .. } => pages[page as usize].clone(),
            DevKind::Flat(_) => panic!("page on a flat device"),
        }
    }

    /// Current value of the hardware page-select register.
    pub fn page_select(&self, addr: u16) -> u8 {
        let state = self.state.lock().unwrap();
        match &state.devices.get(&addr).expect("no such device").kind {
            DevKind::Paged { page_sel, .. } => *page_sel,
            DevKind::Flat(_) => panic!("page_select on a flat device"),
        }
    }

    /// Force the hardware page-select register behind the engine's back,
    /// as a hot-swapped module would.
    pub fn set_page_select(&self, addr: u16, page: u8) {
        let mut state = self.state.lock().unwrap();
        match &mut state.devices.get_mut(&addr).expect("no such device").kind {
            DevKind::Paged { page_sel, .. } => *page_sel = page,
            DevKind::Flat(_) => panic!("set_page_select on a flat device"),
        }
    }

    pub fn events(&self) -> Vec<SimEvent> {
        self.state.lock().unwrap().events.clone()
    }

    pub fn take_events(&self) -> Vec<SimEvent> {
        std::mem::take(&mut self.state.lock().unwrap().events)
    }

    // --- fault injection ------------------------------------------------

    /// Fail the next transaction (whole segment list) with `err`.
    pub fn fail_next_transfer(&self, err: BusError) {
        self.state.lock().unwrap().fail_next = Some(err);
    }

    /// Execute only the first `n` segments of the next transaction and
    /// report `n` completed, without an error.
    pub fn complete_only_next(&self, n: usize) {
        self.state.lock().unwrap().complete_next = Some(n);
    }

    fn stamp(&self) -> Duration {
        self.timestamps
            .as_ref()
            .map(|clock| clock.now())
            .unwrap_or_default()
    }
}

impl BusTransport for SimTransport {
    fn transfer(
        &self,
        addr: u16,
        segments: &mut [Segment<'_>],
    ) -> std::result::Result<usize, BusError> {
        if self.busy.swap(true, Ordering::SeqCst) {
            panic!("overlapping bus transactions on the simulated bus");
        }
        std::thread::yield_now();
        let result = self.execute(addr, segments);
        self.busy.store(false, Ordering::SeqCst);
        result
    }
}

impl SimTransport {
    fn execute(
        &self,
        addr: u16,
        segments: &mut [Segment<'_>],
    ) -> std::result::Result<usize, BusError> {
        let at = self.stamp();
        let mut state = self.state.lock().unwrap();
        if let Some(err) = state.fail_next.take() {
            return Err(err);
        }
        let limit = state.complete_next.take().unwrap_or(segments.len());
        let state = &mut *state;
        let Some(dev) = state.devices.get_mut(&addr) else {
            return Err(BusError::Nak { addr });
        };

        // Classify for the event log before touching the device state.
        let page_select_write = matches!(
            &*segments,
            [Segment::Write(buf)]
                if dev.kind.is_paged() && buf.len() == 2 && buf[0] == PAGE_SELECT_REG
        );
        let page_select_read = matches!(
            &*segments,
            [Segment::Write(reg), Segment::Read(out)]
                if dev.kind.is_paged()
                    && reg.len() == 1
                    && reg[0] == PAGE_SELECT_REG
                    && out.len() == 1
        );

        let mut data_reg = dev.pointer;
        let mut data_len = 0usize;
        let mut data_write = false;
        let mut completed = 0;

        for segment in segments.iter_mut().take(limit) {
            match segment {
                Segment::Write(buf) => {
                    if let Some((&reg, payload)) = buf.split_first() {
                        dev.pointer = reg;
                        data_reg = reg;
                        for &byte in payload {
                            dev.kind.write_reg(dev.pointer, byte);
                            dev.pointer = dev.pointer.wrapping_add(1);
                        }
                        if !payload.is_empty() {
                            data_len += payload.len();
                            data_write = true;
                        }
                    }
                }
                Segment::Read(buf) => {
                    for byte in buf.iter_mut() {
                        *byte = dev.kind.read_reg(dev.pointer);
                        dev.pointer = dev.pointer.wrapping_add(1);
                    }
                    data_len += buf.len();
                }
            }
            completed += 1;
        }

        let event = if page_select_write {
            (completed == 1).then(|| {
                let page = match &dev.kind {
                    DevKind::Paged { page_sel, .. } => *page_sel,
                    DevKind::Flat(_) => unreachable!(),
                };
                SimEvent::PageSelectWrite { page, at }
            })
        } else if page_select_read {
            (completed == 2).then(|| {
                let value = match &dev.kind {
                    DevKind::Paged { page_sel, .. } => *page_sel,
                    DevKind::Flat(_) => unreachable!(),
                };
                SimEvent::PageSelectRead { value, at }
            })
        } else if data_len > 0 {
            Some(SimEvent::Data {
                addr,
                reg: data_reg,
                len: data_len,
                write: data_write,
                at,
            })
        } else {
            None
        };
        if let Some(event) = event {
            state.events.push(event);
        }

        Ok(completed)
    }
}
