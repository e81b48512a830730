use thiserror::Error;

/// One message segment of a bus transaction.
///
/// A transaction is a list of segments executed atomically by the transport
/// as a single bus operation (repeated-start between segments, no stop until
/// the last one). A register-pointer write followed by a data read is the
/// classic two-segment read; writes carry the register address concatenated
/// with the payload in a single segment.
pub enum Segment<'a> {
    /// Master-to-device bytes.
    Write(&'a [u8]),
    /// Device-to-master bytes; the transport fills the buffer completely.
    Read(&'a mut [u8]),
}

impl Segment<'_> {
    pub fn len(&self) -> usize {
        match self {
            Segment::Write(buf) => buf.len(),
            Segment::Read(buf) => buf.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_read(&self) -> bool {
        matches!(self, Segment::Read(_))
    }
}

impl std::fmt::Debug for Segment<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Segment::Write(buf) => f.debug_tuple("Write").field(buf).finish(),
            Segment::Read(buf) => f.debug_tuple("Read").field(&buf.len()).finish(),
        }
    }
}

/// Transport-level failure reported by the bus adapter.
#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum BusError {
    #[error("device 0x{addr:02x} did not acknowledge")]
    Nak { addr: u16 },

    #[error("bus transfer timed out")]
    Timeout,

    #[error("bus adapter error: {0}")]
    Adapter(String),
}

/// Raw addressed transactions over a two-wire bus.
///
/// Consumed, not implemented, by this crate; the host supplies the adapter
/// binding. `transfer` executes the segment list as one atomic bus operation
/// against the given 7-bit device address and returns the number of segments
/// completed. Implementations own any bus-level arbitration and timeout
/// policy; several sessions may share one physical bus through a single
/// transport, so `transfer` takes `&self` and must be safe to call from any
/// thread.
pub trait BusTransport: Send + Sync {
    fn transfer(
        &self,
        addr: u16,
        segments: &mut [Segment<'_>],
    ) -> std::result::Result<usize, BusError>;
}
