use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    // Wire decoding errors
    #[error("Invalid system state byte: 0x{0:02X}")]
    InvalidStateByte(u8),

    #[error("Invalid gate status byte: 0x{0:02X}")]
    InvalidGateStatusByte(u8),

    #[error("Invalid option byte: 0x{0:02X}")]
    InvalidOptionByte(u8),

    #[error("Invalid authentication result byte: 0x{0:02X}")]
    InvalidAuthResultByte(u8),

    // Credential errors
    #[error("Invalid credential: {0}")]
    InvalidCredential(String),

    // State machine errors
    #[error("Invalid state transition from {from} to {to}")]
    InvalidStateTransition { from: String, to: String },
}

pub type Result<T> = std::result::Result<T, Error>;
