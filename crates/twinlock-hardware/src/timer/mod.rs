//! Hardware timer contract.
//!
//! A [`TimerDriver`] owns three physical counting units. Each unit runs in
//! exactly one [`TimerMode`] at a time and has a single callback slot that is
//! invoked from interrupt context on every timer event, whichever channel
//! produced it.
//!
//! # Lifecycle
//!
//! ```text
//! configure ──► TimerHandle ──► set_callback ──► CallbackToken
//!     ▲              │                                │
//!     │              ▼                                ▼
//!     └─────────── deinit                     release_callback
//! ```
//!
//! Reconfiguring a running unit fails with [`HardwareError::TimerBusy`];
//! the unit must be deinitialized first. Deinit invalidates the handle but
//! leaves the callback slot owned, so a tick counter can span several
//! configure/deinit phases on one unit.
//!
//! [`HardwareError::TimerBusy`]: crate::HardwareError::TimerBusy

mod bank;
mod clocked;
mod config;
mod simulated;

pub use clocked::ClockedTimerBank;
pub use config::{
    CaptureConfig, CaptureEdge, CompareConfig, OutputPinPolicy, PwmConfig, PwmOutput,
    TimerConfig, TimerConfigBuilder, TimerMode, TimerModeKind,
};
pub use simulated::SimulatedTimerBank;

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::{fmt, sync::Arc};

/// Physical timer unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerId {
    /// 8-bit, single channel.
    Timer0,
    /// 16-bit, channels A/B, input capture.
    Timer1,
    /// 8-bit, single channel, extra prescalers.
    Timer2,
}

impl TimerId {
    pub const ALL: [TimerId; 3] = [TimerId::Timer0, TimerId::Timer1, TimerId::Timer2];

    /// Largest counter value before overflow.
    pub fn counter_max(self) -> u16 {
        match self {
            TimerId::Timer0 | TimerId::Timer2 => u8::MAX as u16,
            TimerId::Timer1 => u16::MAX,
        }
    }

    pub fn has_channel_b(self) -> bool {
        matches!(self, TimerId::Timer1)
    }

    pub fn has_input_capture(self) -> bool {
        matches!(self, TimerId::Timer1)
    }

    pub(crate) fn index(self) -> usize {
        match self {
            TimerId::Timer0 => 0,
            TimerId::Timer1 => 1,
            TimerId::Timer2 => 2,
        }
    }
}

impl fmt::Display for TimerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimerId::Timer0 => write!(f, "TIMER0"),
            TimerId::Timer1 => write!(f, "TIMER1"),
            TimerId::Timer2 => write!(f, "TIMER2"),
        }
    }
}

/// Counter clock selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClockSource {
    /// No clock; the counter is frozen.
    Stopped,
    Div1,
    Div8,
    Div64,
    Div256,
    Div1024,
    /// `Timer2` only.
    Div32,
    /// `Timer2` only.
    Div128,
}

impl ClockSource {
    /// CPU cycles per counter increment, `None` when stopped.
    pub fn prescale(self) -> Option<u32> {
        match self {
            ClockSource::Stopped => None,
            ClockSource::Div1 => Some(1),
            ClockSource::Div8 => Some(8),
            ClockSource::Div32 => Some(32),
            ClockSource::Div64 => Some(64),
            ClockSource::Div128 => Some(128),
            ClockSource::Div256 => Some(256),
            ClockSource::Div1024 => Some(1024),
        }
    }

    pub fn available_on(self, timer: TimerId) -> bool {
        match self {
            ClockSource::Div32 | ClockSource::Div128 => timer == TimerId::Timer2,
            _ => true,
        }
    }
}

impl fmt::Display for ClockSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.prescale() {
            None => write!(f, "stopped clock"),
            Some(1) => write!(f, "F_CPU"),
            Some(n) => write!(f, "F_CPU/{n}"),
        }
    }
}

/// Proof of a successful `configure`.
///
/// Becomes stale once the unit is deinitialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerHandle {
    pub timer: TimerId,
    pub generation: u64,
}

/// Ownership of a unit's callback slot.
///
/// Not `Clone`: exactly one owner can release the slot.
#[derive(Debug, PartialEq, Eq)]
#[must_use = "dropping the token leaves the callback slot occupied"]
pub struct CallbackToken {
    timer: TimerId,
    serial: u64,
}

impl CallbackToken {
    pub(crate) fn new(timer: TimerId, serial: u64) -> Self {
        Self { timer, serial }
    }

    pub fn timer(&self) -> TimerId {
        self.timer
    }

    pub(crate) fn serial(&self) -> u64 {
        self.serial
    }
}

/// Function invoked on every event of a unit.
///
/// Runs in interrupt context: it must not block.
pub type TimerCallback = Arc<dyn Fn() + Send + Sync>;

/// Driver for the three timer units.
pub trait TimerDriver: Send + Sync {
    /// Validate `config` and start the unit.
    ///
    /// # Errors
    ///
    /// - [`HardwareError::ConfigurationError`] if `config` fails validation
    /// - [`HardwareError::TimerBusy`] if the unit is already configured
    ///
    /// [`HardwareError::ConfigurationError`]: crate::HardwareError::ConfigurationError
    /// [`HardwareError::TimerBusy`]: crate::HardwareError::TimerBusy
    fn configure(&self, config: &TimerConfig) -> Result<TimerHandle>;

    /// Claim the unit's callback slot.
    ///
    /// # Errors
    ///
    /// - [`HardwareError::StaleHandle`] if `handle` is no longer current
    /// - [`HardwareError::CallbackSlotOccupied`] if the slot is owned
    ///
    /// [`HardwareError::StaleHandle`]: crate::HardwareError::StaleHandle
    /// [`HardwareError::CallbackSlotOccupied`]: crate::HardwareError::CallbackSlotOccupied
    fn set_callback(&self, handle: TimerHandle, callback: TimerCallback) -> Result<CallbackToken>;

    /// Free the callback slot owned by `token`.
    fn release_callback(&self, token: CallbackToken) -> Result<()>;

    /// Stop the unit, zero its registers and disable its interrupts.
    fn deinit(&self, handle: TimerHandle) -> Result<()>;

    /// Current counter value.
    fn read(&self, handle: TimerHandle) -> Result<u16>;

    /// Reset the counter to zero.
    fn clear(&self, handle: TimerHandle) -> Result<()>;

    /// Switch the latched edge of a unit in input-capture mode.
    fn set_capture_edge(&self, handle: TimerHandle, edge: CaptureEdge) -> Result<()>;

    /// Counter value latched by the last capture event.
    fn capture_value(&self, handle: TimerHandle) -> Result<u16>;
}

impl<D: TimerDriver + ?Sized> TimerDriver for Arc<D> {
    fn configure(&self, config: &TimerConfig) -> Result<TimerHandle> {
        (**self).configure(config)
    }

    fn set_callback(&self, handle: TimerHandle, callback: TimerCallback) -> Result<CallbackToken> {
        (**self).set_callback(handle, callback)
    }

    fn release_callback(&self, token: CallbackToken) -> Result<()> {
        (**self).release_callback(token)
    }

    fn deinit(&self, handle: TimerHandle) -> Result<()> {
        (**self).deinit(handle)
    }

    fn read(&self, handle: TimerHandle) -> Result<u16> {
        (**self).read(handle)
    }

    fn clear(&self, handle: TimerHandle) -> Result<()> {
        (**self).clear(handle)
    }

    fn set_capture_edge(&self, handle: TimerHandle, edge: CaptureEdge) -> Result<()> {
        (**self).set_capture_edge(handle, edge)
    }

    fn capture_value(&self, handle: TimerHandle) -> Result<u16> {
        (**self).capture_value(handle)
    }
}
