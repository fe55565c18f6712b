//! Error types for hardware operations.
//!
//! Covers peripheral failures (disconnection, timeouts, storage faults) and
//! timer contract violations (bad configuration, occupied callback slot,
//! stale handles).

use crate::timer::TimerId;

/// Result type alias for hardware operations.
pub type Result<T> = std::result::Result<T, HardwareError>;

/// Errors that can occur during hardware device operations.
#[derive(Debug, thiserror::Error)]
pub enum HardwareError {
    /// Device is not connected or has been disconnected.
    #[error("Device disconnected: {device}")]
    Disconnected { device: String },

    /// Invalid data received from or sent to a device.
    #[error("Invalid data: {message}")]
    InvalidData { message: String },

    /// Invalid or incomplete timer configuration.
    ///
    /// Always raised before any timer state is touched.
    #[error("Configuration error: {message}")]
    ConfigurationError { message: String },

    /// The single callback slot of a timer is already owned.
    #[error("Callback slot of {timer} is already occupied")]
    CallbackSlotOccupied { timer: TimerId },

    /// Handle refers to a configuration that was deinitialized or replaced.
    #[error("Stale handle for {timer} (generation {generation})")]
    StaleHandle { timer: TimerId, generation: u64 },

    /// Timer is configured; it must be deinitialized before reconfiguring.
    #[error("{timer} is busy; deinit before configuring a new mode")]
    TimerBusy { timer: TimerId },

    /// Byte storage read or write failed.
    #[error("Storage unavailable at 0x{address:04X}: {message}")]
    StorageUnavailable { address: u16, message: String },

    /// Generic error with custom message.
    #[error("{0}")]
    Other(String),
}

impl HardwareError {
    /// Create a new disconnected error.
    pub fn disconnected(device: impl Into<String>) -> Self {
        Self::Disconnected {
            device: device.into(),
        }
    }

    /// Create a new invalid data error.
    pub fn invalid_data(message: impl Into<String>) -> Self {
        Self::InvalidData {
            message: message.into(),
        }
    }

    /// Create a new configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::ConfigurationError {
            message: message.into(),
        }
    }

    /// Create a new storage unavailable error.
    pub fn storage(address: u16, message: impl Into<String>) -> Self {
        Self::StorageUnavailable {
            address,
            message: message.into(),
        }
    }

    /// Create a generic error with custom message.
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disconnected_error() {
        let error = HardwareError::disconnected("keypad");
        assert!(matches!(error, HardwareError::Disconnected { .. }));
        assert_eq!(error.to_string(), "Device disconnected: keypad");
    }

    #[test]
    fn test_configuration_error() {
        let error = HardwareError::configuration("compare mode requires parameters");
        assert_eq!(
            error.to_string(),
            "Configuration error: compare mode requires parameters"
        );
    }

    #[test]
    fn test_timer_errors_name_the_unit() {
        let error = HardwareError::CallbackSlotOccupied {
            timer: TimerId::Timer1,
        };
        assert_eq!(error.to_string(), "Callback slot of TIMER1 is already occupied");

        let error = HardwareError::StaleHandle {
            timer: TimerId::Timer0,
            generation: 3,
        };
        assert_eq!(error.to_string(), "Stale handle for TIMER0 (generation 3)");
    }

    #[test]
    fn test_storage_error() {
        let error = HardwareError::storage(0x0002, "bus fault");
        assert_eq!(
            error.to_string(),
            "Storage unavailable at 0x0002: bus fault"
        );
    }
}
