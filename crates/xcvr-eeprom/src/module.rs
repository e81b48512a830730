/// The maximum EEPROM window given an 8-bit register address.
pub const FULL_SIZE: usize = 256;

/// The division of the window into a lower and an upper half.
pub const HALF_SIZE: usize = FULL_SIZE / 2;

/// Page-select register for QSFP+, QSFP28 and QSFP-DD modules.
pub const PAGE_SELECT_REG: u8 = 127;

/// Number of addressable upper-half pages.
pub const PAGE_COUNT: usize = 256;

/// Largest data transfer the engine will put on the bus in one transaction.
/// Downstream SPI-I2C bridge adapters have a small transfer buffer and reject
/// anything larger instead of splitting it.
pub const MAX_TRANSFER: usize = 64;

/// Kind of pluggable transceiver module behind a session.
///
/// Fixed for the lifetime of a [`DeviceSession`](crate::DeviceSession);
/// determines the address-translation rules and the total exposed size.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum ModuleKind {
    /// See SFF-8431 & SFF-8472.
    SfpPlus,
    /// See SFF-8679.
    QsfpPlus,
    /// See SFF-8661.
    Qsfp28,
    /// See <http://www.qsfp-dd.com/>.
    QsfpDd,
    /// Unidentified module; degrades to best-effort flat access to the first
    /// 256-byte bank.
    Unknown,
}

impl ModuleKind {
    /// Look up a module-type identifier as reported by the host's
    /// device-matching mechanism. Identifiers outside this table are not
    /// recognized.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "sfp+" => Some(ModuleKind::SfpPlus),
            "qsfp+" => Some(ModuleKind::QsfpPlus),
            "qsfp28" => Some(ModuleKind::Qsfp28),
            "qsfp-dd" => Some(ModuleKind::QsfpDd),
            _ => None,
        }
    }

    /// Total linear byte-address space visible to callers.
    ///
    /// SFP+ has DDI in a separate EEPROM at the next I2C address; it is
    /// exposed as the second half of a double-sized window. The QSFP family
    /// is the concatenation of 257 halves: 1 lower half plus 256 paged upper
    /// halves.
    pub fn exposed_size(self) -> u64 {
        match self {
            ModuleKind::SfpPlus => (2 * FULL_SIZE) as u64,
            ModuleKind::QsfpPlus | ModuleKind::Qsfp28 | ModuleKind::QsfpDd => {
                ((1 + PAGE_COUNT) * HALF_SIZE) as u64
            }
            ModuleKind::Unknown => FULL_SIZE as u64,
        }
    }

    /// Whether upper-half accesses go through the page-select register.
    pub fn is_paged(self) -> bool {
        matches!(
            self,
            ModuleKind::QsfpPlus | ModuleKind::Qsfp28 | ModuleKind::QsfpDd
        )
    }
}
