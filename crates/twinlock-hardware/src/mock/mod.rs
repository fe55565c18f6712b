//! Mock peripherals for testing and simulation.
//!
//! Each mock comes with a handle that tests keep to feed input or observe
//! output while the controller owns the device itself.

pub mod buzzer;
pub mod eeprom;
pub mod keypad;
pub mod motor;

pub use buzzer::{MockBuzzer, MockBuzzerHandle};
pub use eeprom::MockEeprom;
pub use keypad::{MockKeypad, MockKeypadHandle};
pub use motor::{MockMotor, MockMotorHandle};
