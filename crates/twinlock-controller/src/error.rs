use thiserror::Error;
use twinlock_hardware::HardwareError;
use twinlock_protocol::ProtocolError;
use twinlock_storage::StorageError;

/// Errors that stop a controller loop.
///
/// A wrong credential is not among them; it is an
/// [`AuthOutcome`](crate::AuthOutcome).
#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("Link error: {0}")]
    Link(#[from] ProtocolError),

    #[error("Hardware error: {0}")]
    Hardware(#[from] HardwareError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Core(#[from] twinlock_core::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, ControllerError>;

impl ControllerError {
    pub fn config(message: impl Into<String>) -> Self {
        ControllerError::Config(message.into())
    }

    /// Returns `true` if the link partner went away or stopped answering.
    pub fn is_link_failure(&self) -> bool {
        matches!(
            self,
            ControllerError::Link(ProtocolError::LinkClosed | ProtocolError::Stall { .. })
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_link_failure_detection() {
        assert!(ControllerError::from(ProtocolError::LinkClosed).is_link_failure());
        assert!(ControllerError::from(ProtocolError::stall(10, "READY token")).is_link_failure());
        assert!(!ControllerError::config("bad").is_link_failure());
    }

    #[test]
    fn test_storage_error_wraps() {
        let err = ControllerError::from(StorageError::Corrupted {
            address: 2,
            scanned: 7,
        });
        assert!(err.to_string().starts_with("Storage error:"));
    }
}
