/// Errors that can occur while building or reassembling ISO-TP frames.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
    /// Empty payload, or a frame shorter than its PCI type requires.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The payload length cannot be expressed in the 12-bit length field
    /// (or exceeds the configured maximum).
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// A consecutive frame arrived out of order.
    #[error("sequence number mismatch (expected {expected}, got {actual})")]
    SequenceMismatch { expected: u8, actual: u8 },

    /// The high nibble of byte 0 is not a supported PCI type.
    #[error("unknown PCI type: {0}")]
    UnknownPciType(u8),

    /// A consecutive frame arrived while no reassembly was in progress.
    #[error("consecutive frame received without a first frame")]
    ConsecutiveWithoutFirst,
}

impl FrameError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;
