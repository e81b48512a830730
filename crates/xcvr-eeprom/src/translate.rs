//! Pure mapping from linear offsets to physical bus accesses.
//!
//! The translator assumes pre-validated input (the engine bounds-checks
//! offset and length against the module's exposed size before calling in)
//! and clamps the length so that the resulting access never crosses a bank
//! or page boundary. It performs no I/O and holds no state.

use crate::module::{ModuleKind, FULL_SIZE, HALF_SIZE};

/// Physical access computed from a `(module kind, linear offset, length)`
/// request.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Mapping {
    /// 7-bit bus device address to target.
    pub bus_addr: u16,
    /// On-chip register address the access starts at.
    pub reg: u8,
    /// Requested length clamped to the containing bank/half/page.
    pub len: usize,
    /// Upper-half page that must be active for the access, if any.
    pub page: Option<u8>,
}

/// Map a linear offset into the flat virtual EEPROM onto a physical access.
///
/// `base_addr` is the module's primary bus address; SFP+ diagnostic memory
/// lives at `base_addr + 1` and is reached through the second 256-byte bank
/// of the flat space.
pub fn translate(kind: ModuleKind, base_addr: u16, ofs: u64, len: usize) -> Mapping {
    debug_assert!(ofs < kind.exposed_size());
    debug_assert!(len > 0);
    debug_assert!(ofs + len as u64 <= kind.exposed_size());

    let ofs = ofs as usize;
    match kind {
        ModuleKind::SfpPlus => {
            // Two contiguous 256-byte banks at consecutive bus addresses.
            // On-chip address auto-increment never crosses devices, so the
            // access must stay within one bank.
            let reg = ofs % FULL_SIZE;
            Mapping {
                bus_addr: base_addr + (ofs / FULL_SIZE) as u16,
                reg: reg as u8,
                len: len.min(FULL_SIZE - reg),
                page: None,
            }
        }
        ModuleKind::QsfpPlus | ModuleKind::Qsfp28 | ModuleKind::QsfpDd => {
            if ofs < HALF_SIZE {
                // Lower half: always addressable, never cross into the
                // upper half.
                Mapping {
                    bus_addr: base_addr,
                    reg: ofs as u8,
                    len: len.min(HALF_SIZE - ofs),
                    page: None,
                }
            } else {
                // Upper half page X starts at flat offset 128 + X * 128.
                // Registers 128..=255 view the active page; stay within it.
                let reg = ofs % HALF_SIZE + HALF_SIZE;
                Mapping {
                    bus_addr: base_addr,
                    reg: reg as u8,
                    len: len.min(FULL_SIZE - reg),
                    page: Some((ofs / HALF_SIZE - 1) as u8),
                }
            }
        }
        ModuleKind::Unknown => Mapping {
            // Best-effort flat access to the first bank; the bounds check
            // against the 256-byte exposed size already confines the access.
            bus_addr: base_addr,
            reg: ofs as u8,
            len,
            page: None,
        },
    }
}
