//! Flat, byte-addressed access to the EEPROM of pluggable optical transceivers.
//!
//! SFP+, QSFP+, QSFP28 and QSFP-DD modules all expose their EEPROM through
//! mechanisms that are anything but flat: SFP+ keeps diagnostic memory behind a
//! *second* I2C address, while the QSFP family multiplexes 256 upper-half pages
//! through a shared page-select register. This crate hides all of that behind a
//! single linearly-addressable byte array:
//!
//! - [`DeviceSession`]: one attached module, exposing `read_at`/`write_at` over
//!   the virtual flat space and serializing all bus activity for the device
//! - [`translate`](translate::translate): the pure offset → (bus address,
//!   register, page) mapping
//! - [`BusTransport`]: the consumed two-wire bus interface (one transaction =
//!   an atomically executed list of write/read segments)
//! - [`Tunables`]: the two process-wide knobs (page retention, page-load wait)
//! - [`SimTransport`]: an in-memory module model for tests and embedders' tests
//!
//! The engine caches nothing but the active page pointer. Module content is
//! always fetched from the hardware; correctness comes from the per-session
//! lock plus re-confirming the page-select register at least once per
//! retention period.

mod cache;
mod clock;
mod config;
mod engine;
mod error;
mod module;
mod session;
mod sim;
mod transport;

pub mod translate;

pub use clock::{Clock, FakeClock, SystemClock};
pub use config::Tunables;
pub use error::{EepromError, Result};
pub use module::{
    ModuleKind, FULL_SIZE, HALF_SIZE, MAX_TRANSFER, PAGE_COUNT, PAGE_SELECT_REG,
};
pub use session::DeviceSession;
pub use sim::{SimEvent, SimTransport};
pub use transport::{BusError, BusTransport, Segment};

#[cfg(test)]
mod proptests;
