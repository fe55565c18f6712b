//! Link protocol errors.

/// Result type alias for link operations.
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Errors raised by the serial link.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// A bounded wait expired.
    ///
    /// Only raised when [`LinkConfig::wait_timeout`](crate::LinkConfig) is set;
    /// by default waits are unbounded.
    #[error("Link stalled after {waited_ms}ms waiting for {waiting_for}")]
    Stall {
        waited_ms: u64,
        waiting_for: &'static str,
    },

    /// The peer end of the link is gone.
    #[error("Link closed by peer")]
    LinkClosed,

    /// More bytes than allowed arrived without a terminator.
    #[error("Payload exceeded {scanned} bytes without terminator")]
    PayloadOverflow { scanned: usize },

    /// An outgoing payload contains the terminator byte.
    #[error("Payload contains terminator 0x{terminator:02X} at position {position}")]
    TerminatorInPayload { terminator: u8, position: usize },

    /// A received byte is not a valid value for the expected field.
    #[error("Decode error: {0}")]
    Decode(#[from] twinlock_core::Error),

    /// Underlying I/O failure.
    #[error("I/O error: {0}")]
    Io(std::io::Error),
}

impl From<std::io::Error> for ProtocolError {
    fn from(error: std::io::Error) -> Self {
        use std::io::ErrorKind;

        match error.kind() {
            ErrorKind::UnexpectedEof | ErrorKind::BrokenPipe | ErrorKind::ConnectionReset => {
                ProtocolError::LinkClosed
            }
            _ => ProtocolError::Io(error),
        }
    }
}

impl ProtocolError {
    /// Create a new stall error.
    pub fn stall(waited_ms: u64, waiting_for: &'static str) -> Self {
        Self::Stall {
            waited_ms,
            waiting_for,
        }
    }

    /// Returns `true` if the error came from a bounded wait.
    pub fn is_stall(&self) -> bool {
        matches!(self, Self::Stall { .. })
    }
}
