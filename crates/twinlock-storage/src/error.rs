use thiserror::Error;
use twinlock_hardware::HardwareError;

/// Errors raised while persisting or loading the credential.
///
/// "No credential stored yet" is not an error; it is `Ok(None)` from
/// [`CredentialRepository::load`](crate::CredentialRepository::load).
#[derive(Debug, Error)]
pub enum StorageError {
    /// The byte-storage device rejected a read or write
    #[error("Storage unavailable: {0}")]
    Unavailable(#[from] HardwareError),

    /// A stored string has no terminator where one was expected
    #[error("Corrupted string at 0x{address:04X}: no terminator within {scanned} bytes")]
    Corrupted { address: u16, scanned: usize },

    /// Stored bytes do not form a valid credential
    #[error("Invalid stored credential: {0}")]
    InvalidCredential(#[from] twinlock_core::Error),

    /// A credential was required but none has been stored
    #[error("No credential stored")]
    Missing,
}

/// Specialized result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

impl StorageError {
    /// Returns `true` when the device itself failed, as opposed to holding
    /// bad data.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, StorageError::Unavailable(_))
    }
}
