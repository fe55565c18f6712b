//! Timer bank whose events are fired on demand.
//!
//! Tests drive time explicitly: [`SimulatedTimerBank::fire`] delivers one
//! overflow/compare/PWM event, [`SimulatedTimerBank::capture`] one capture
//! edge. [`SimulatedTimerBank::wait_armed`] lets a test follow a controller
//! through successive configure phases of the same unit.

use super::{
    CallbackToken, CaptureEdge, TimerCallback, TimerConfig, TimerDriver, TimerHandle, TimerId,
    bank::TimerBank,
};
use crate::error::Result;
use tokio::sync::Notify;

/// On-demand timer driver for tests and scripted simulations.
///
/// # Examples
///
/// ```
/// use std::sync::{Arc, atomic::{AtomicU32, Ordering}};
/// use twinlock_hardware::timer::{
///     ClockSource, SimulatedTimerBank, TimerConfig, TimerDriver, TimerId,
/// };
///
/// let bank = SimulatedTimerBank::new();
/// let handle = bank
///     .configure(&TimerConfig::normal(TimerId::Timer1, ClockSource::Div256))
///     .unwrap();
///
/// let hits = Arc::new(AtomicU32::new(0));
/// let counter = hits.clone();
/// let _token = bank
///     .set_callback(handle, Arc::new(move || {
///         counter.fetch_add(1, Ordering::SeqCst);
///     }))
///     .unwrap();
///
/// assert_eq!(bank.fire_n(TimerId::Timer1, 3), 3);
/// assert_eq!(hits.load(Ordering::SeqCst), 3);
/// ```
pub struct SimulatedTimerBank {
    bank: TimerBank,
    changed: Notify,
}

impl SimulatedTimerBank {
    pub fn new() -> Self {
        Self {
            bank: TimerBank::new(),
            changed: Notify::new(),
        }
    }

    /// Deliver one timer event.
    ///
    /// Returns `true` if a callback ran.
    pub fn fire(&self, timer: TimerId) -> bool {
        match self.bank.event(timer, None, None) {
            Some(callback) => {
                callback();
                true
            }
            None => false,
        }
    }

    /// Deliver `count` events, returning how many reached a callback.
    pub fn fire_n(&self, timer: TimerId, count: u32) -> u32 {
        (0..count).filter(|_| self.fire(timer)).count() as u32
    }

    /// Deliver one capture edge latching `count`.
    pub fn capture(&self, timer: TimerId, count: u16) -> bool {
        match self.bank.event(timer, None, Some(count)) {
            Some(callback) => {
                callback();
                true
            }
            None => false,
        }
    }

    /// Preload the counter of a configured unit.
    pub fn set_counter(&self, timer: TimerId, value: u16) -> Result<()> {
        let handle = TimerHandle {
            timer,
            generation: self.bank.generation(timer),
        };
        self.bank.write_counter(handle, value)
    }

    /// Number of successful `configure` calls on `timer` so far.
    pub fn generation(&self, timer: TimerId) -> u64 {
        self.bank.generation(timer)
    }

    pub fn config(&self, timer: TimerId) -> Option<TimerConfig> {
        self.bank.config(timer)
    }

    pub fn is_configured(&self, timer: TimerId) -> bool {
        self.bank.config(timer).is_some()
    }

    /// Whether an event fired now would reach a callback.
    pub fn is_armed(&self, timer: TimerId) -> bool {
        self.bank.is_armed(timer)
    }

    pub fn has_callback(&self, timer: TimerId) -> bool {
        self.bank.has_callback(timer)
    }

    /// Wait until `timer` is armed in a generation newer than `after`.
    ///
    /// Returns the armed generation.
    pub async fn wait_armed(&self, timer: TimerId, after: u64) -> u64 {
        loop {
            let notified = self.changed.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            let generation = self.bank.generation(timer);
            if generation > after && self.bank.is_armed(timer) {
                return generation;
            }

            notified.await;
        }
    }

    fn changed(&self) {
        self.changed.notify_waiters();
    }
}

impl Default for SimulatedTimerBank {
    fn default() -> Self {
        Self::new()
    }
}

impl TimerDriver for SimulatedTimerBank {
    fn configure(&self, config: &TimerConfig) -> Result<TimerHandle> {
        let handle = self.bank.configure(config)?;
        self.changed();
        Ok(handle)
    }

    fn set_callback(&self, handle: TimerHandle, callback: TimerCallback) -> Result<CallbackToken> {
        let token = self.bank.set_callback(handle, callback)?;
        self.changed();
        Ok(token)
    }

    fn release_callback(&self, token: CallbackToken) -> Result<()> {
        self.bank.release_callback(token)?;
        self.changed();
        Ok(())
    }

    fn deinit(&self, handle: TimerHandle) -> Result<()> {
        self.bank.deinit(handle)?;
        self.changed();
        Ok(())
    }

    fn read(&self, handle: TimerHandle) -> Result<u16> {
        self.bank.read(handle)
    }

    fn clear(&self, handle: TimerHandle) -> Result<()> {
        self.bank.write_counter(handle, 0)
    }

    fn set_capture_edge(&self, handle: TimerHandle, edge: CaptureEdge) -> Result<()> {
        self.bank.set_capture_edge(handle, edge)
    }

    fn capture_value(&self, handle: TimerHandle) -> Result<u16> {
        self.bank.capture_value(handle)
    }
}
