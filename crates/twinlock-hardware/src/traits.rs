//! Peripheral trait definitions.
//!
//! These traits are the contract between the two controllers and their
//! peripherals: keypad and character display on the interface node, gate
//! motor, buzzer and non-volatile byte storage on the authority node.
//! Mock implementations live in [`crate::mock`].
//!
//! The keypad is the only peripheral with an asynchronous wait; the others
//! are register-style writes that complete immediately.

#![allow(async_fn_in_trait)]

use crate::error::{HardwareError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use twinlock_core::{Credential, constants::ENTER_KEY};

/// One key press from the keypad.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeypadInput {
    /// Numeric digit (0-9).
    Digit(u8),

    /// Any other printable key (`*`, `+`, `-`, `%`, ...).
    Symbol(u8),

    /// Enter/confirm key.
    Enter,
}

impl KeypadInput {
    /// Create a digit input.
    ///
    /// # Errors
    ///
    /// Returns an error if the digit is greater than 9.
    ///
    /// # Examples
    ///
    /// ```
    /// use twinlock_hardware::traits::KeypadInput;
    ///
    /// let input = KeypadInput::digit(5).unwrap();
    /// assert_eq!(input.as_digit(), Some(5));
    ///
    /// assert!(KeypadInput::digit(10).is_err());
    /// ```
    pub fn digit(d: u8) -> Result<Self> {
        if d > 9 {
            return Err(HardwareError::invalid_data(format!(
                "Digit must be 0-9, got {d}"
            )));
        }
        Ok(Self::Digit(d))
    }

    /// Map a raw key code as produced by the keypad scanner.
    ///
    /// Raw values `0..=9` become [`KeypadInput::Digit`]; everything else is
    /// mapped as text by [`from_text_byte`](Self::from_text_byte).
    ///
    /// # Errors
    ///
    /// Returns an error for non-printable codes above `9`.
    pub fn from_key_code(code: u8) -> Result<Self> {
        match code {
            0..=9 => Ok(Self::Digit(code)),
            other => Self::from_text_byte(other),
        }
    }

    /// Map one byte of typed text.
    ///
    /// ASCII digits become [`KeypadInput::Digit`], [`ENTER_KEY`] and `\n`
    /// become [`KeypadInput::Enter`], and any other printable ASCII becomes
    /// [`KeypadInput::Symbol`].
    ///
    /// # Errors
    ///
    /// Returns an error for every other byte, including raw scan codes.
    pub fn from_text_byte(byte: u8) -> Result<Self> {
        match byte {
            b'0'..=b'9' => Ok(Self::Digit(byte - b'0')),
            ENTER_KEY | b'\n' => Ok(Self::Enter),
            c if c.is_ascii_graphic() => Ok(Self::Symbol(c)),
            other => Err(HardwareError::invalid_data(format!(
                "Unmapped key code 0x{other:02X}"
            ))),
        }
    }

    /// Get the digit value if this is a digit input.
    pub fn as_digit(&self) -> Option<u8> {
        match self {
            Self::Digit(d) => Some(*d),
            _ => None,
        }
    }

    /// Byte this key contributes to a credential.
    ///
    /// Digits map to ASCII `'0'..='9'`. Enter and reserved symbols return
    /// `None`.
    pub fn as_credential_byte(&self) -> Option<u8> {
        match self {
            Self::Digit(d) => Some(b'0' + d),
            Self::Symbol(b) if Credential::is_valid_byte(*b) => Some(*b),
            _ => None,
        }
    }
}

/// Keypad device abstraction.
///
/// # Object Safety
///
/// This trait is not object-safe because `read_input` is an `async fn`.
/// Use a generic parameter instead of `dyn KeypadDevice`.
pub trait KeypadDevice: Send + Sync {
    /// Read the next input from the keypad.
    ///
    /// Waits until a key is pressed.
    ///
    /// # Errors
    ///
    /// Returns an error if the device is disconnected.
    async fn read_input(&mut self) -> Result<KeypadInput>;
}

/// Character display with fixed-position writes.
///
/// Rows and columns are zero-based.
pub trait DisplayDevice: Send {
    /// Clear the screen and home the cursor.
    fn clear(&mut self) -> Result<()>;

    /// Move the cursor.
    ///
    /// # Errors
    ///
    /// Returns an error if the position is outside the display.
    fn go_to_row_column(&mut self, row: usize, column: usize) -> Result<()>;

    /// Write a string at the cursor, advancing it.
    fn display_string(&mut self, text: &str) -> Result<()>;

    /// Write one character at the cursor, advancing it.
    fn display_char(&mut self, c: char) -> Result<()>;

    /// Move the cursor, then write a string.
    fn display_string_at(&mut self, row: usize, column: usize, text: &str) -> Result<()> {
        self.go_to_row_column(row, column)?;
        self.display_string(text)
    }
}

/// Direction the gate motor is driven in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MotorDirection {
    #[default]
    Stopped,
    /// Clockwise, opens the gate.
    Forward,
    /// Anticlockwise, closes the gate.
    Reverse,
}

impl fmt::Display for MotorDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MotorDirection::Stopped => write!(f, "stopped"),
            MotorDirection::Forward => write!(f, "forward"),
            MotorDirection::Reverse => write!(f, "reverse"),
        }
    }
}

/// Polarity-driven DC motor.
pub trait MotorDriver: Send {
    /// Drive the motor in `direction`.
    fn set_direction(&mut self, direction: MotorDirection) -> Result<()>;

    /// Current drive direction.
    fn direction(&self) -> MotorDirection;

    fn rotate_clockwise(&mut self) -> Result<()> {
        self.set_direction(MotorDirection::Forward)
    }

    fn rotate_anticlockwise(&mut self) -> Result<()> {
        self.set_direction(MotorDirection::Reverse)
    }

    fn stop(&mut self) -> Result<()> {
        self.set_direction(MotorDirection::Stopped)
    }
}

/// Alarm buzzer output.
pub trait BuzzerDriver: Send {
    fn on(&mut self) -> Result<()>;

    fn off(&mut self) -> Result<()>;

    fn is_on(&self) -> bool;
}

/// Byte-addressed non-volatile storage.
pub trait ByteStorage: Send {
    /// Read one byte.
    ///
    /// # Errors
    ///
    /// Returns [`HardwareError::StorageUnavailable`] when the device cannot be read.
    fn read_byte(&mut self, address: u16) -> Result<u8>;

    /// Write one byte.
    ///
    /// # Errors
    ///
    /// Returns [`HardwareError::StorageUnavailable`] when the device cannot be written.
    fn write_byte(&mut self, address: u16, value: u8) -> Result<()>;
}
