use crate::transport::BusError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, EepromError>;

/// Unified error type for virtual EEPROM operations.
///
/// The request-validation variants ([`EepromError::InvalidSeek`],
/// [`EepromError::InvalidLength`], [`EepromError::NoSpace`]) are reported
/// before any bus activity and never mutate session state. Bus-level failures
/// are propagated verbatim from the transport; the only internal recovery is
/// invalidating the cached page so the next access re-derives ground truth.
#[derive(Debug, Error)]
pub enum EepromError {
    #[error("invalid seek: offset {offset} is beyond eeprom size {size}")]
    InvalidSeek { offset: u64, size: u64 },

    #[error("zero-length transfer")]
    InvalidLength,

    #[error("no space: offset={offset} len={len} size={size}")]
    NoSpace { offset: u64, len: usize, size: u64 },

    #[error("module is detached")]
    Detached,

    /// The transport executed fewer segments than requested without reporting
    /// a bus error. Distinct from [`EepromError::Bus`]: the transfer is known
    /// to be truncated, not failed outright.
    #[error("incomplete transfer: {completed} of {expected} segments completed")]
    IncompleteTransfer { completed: usize, expected: usize },

    #[error(transparent)]
    Bus(#[from] BusError),
}
