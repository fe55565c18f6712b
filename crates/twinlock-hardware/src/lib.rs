//! Hardware abstraction layer for the twinlock controllers.
//!
//! This crate defines the peripheral contracts both controllers are written
//! against, plus the pieces that turn interrupt-driven timer events into
//! main-loop progress:
//!
//! - [`timer`]: three timer units with typed mode configuration, a single
//!   owned callback slot per unit, and two drivers
//!   ([`SimulatedTimerBank`](timer::SimulatedTimerBank) fired by tests,
//!   [`ClockedTimerBank`](timer::ClockedTimerBank) fired by the tokio clock)
//! - [`TickCounter`]: counts timer events and reports completion after a
//!   configured number of them
//! - [`Guarded`]: a critical-section cell the interrupt side writes and the
//!   main loop waits on
//! - [`traits`]: keypad, display, motor, buzzer and byte storage
//! - [`mock`]: channel-backed peripherals for tests and simulation
//!
//! # Interrupt Context
//!
//! Timer callbacks run in interrupt context. They may only write state held
//! in a [`Guarded`] cell; they never block, log or perform I/O.
//!
//! ```
//! use std::sync::Arc;
//! use twinlock_hardware::{
//!     Guarded, TickCounter,
//!     timer::{ClockSource, SimulatedTimerBank, TimerConfig, TimerDriver, TimerId},
//! };
//!
//! let bank = SimulatedTimerBank::new();
//! let handle = bank
//!     .configure(&TimerConfig::normal(TimerId::Timer1, ClockSource::Div1024))
//!     .unwrap();
//!
//! let elapsed = Arc::new(Guarded::new(false));
//! let flag = elapsed.clone();
//! let counter = TickCounter::start(&bank, handle, 8, move || flag.set(true)).unwrap();
//!
//! bank.fire_n(TimerId::Timer1, 8);
//! assert!(elapsed.get());
//!
//! counter.stop(&bank).unwrap();
//! bank.deinit(handle).unwrap();
//! ```

pub mod error;
pub mod guard;
pub mod mock;
pub mod tick;
pub mod timer;
pub mod traits;

pub use error::{HardwareError, Result};
pub use guard::Guarded;
pub use tick::TickCounter;
pub use timer::{TimerConfig, TimerDriver, TimerHandle, TimerId};
pub use traits::{
    BuzzerDriver, ByteStorage, DisplayDevice, KeypadDevice, KeypadInput, MotorDirection,
    MotorDriver,
};
