//! Tick-of-ticks counter on top of a timer unit.
//!
//! Hardware counters overflow far more often than the durations the gate
//! and alarm need, so a software counter counts timer events and reports
//! completion after a configured number of them. The mapping from ticks to
//! seconds is a per-duration constant, see `twinlock_core::constants`.

use crate::{
    error::{HardwareError, Result},
    guard::Guarded,
    timer::{CallbackToken, TimerCallback, TimerDriver, TimerHandle, TimerId},
};
use std::sync::Arc;

/// Counts timer events and fires `on_complete` every `target` of them.
///
/// Owns the unit's callback slot until [`TickCounter::stop`].
#[derive(Debug)]
#[must_use = "a dropped counter keeps the callback slot occupied; call stop()"]
pub struct TickCounter {
    token: CallbackToken,
    ticks: Arc<Guarded<u32>>,
    target: u32,
}

impl TickCounter {
    /// Register on the unit behind `handle`.
    ///
    /// `on_complete` runs in interrupt context each time the count reaches
    /// `ticks_for_target`; the count then restarts at zero. It must only
    /// write state, never block.
    ///
    /// # Errors
    ///
    /// - [`HardwareError::ConfigurationError`] if `ticks_for_target` is zero
    /// - any error of [`TimerDriver::set_callback`]
    pub fn start<D, F>(
        driver: &D,
        handle: TimerHandle,
        ticks_for_target: u32,
        on_complete: F,
    ) -> Result<Self>
    where
        D: TimerDriver + ?Sized,
        F: Fn() + Send + Sync + 'static,
    {
        if ticks_for_target == 0 {
            return Err(HardwareError::configuration(
                "tick counter target must be at least one tick",
            ));
        }

        let ticks = Arc::new(Guarded::new(0u32));
        let counter = ticks.clone();
        let callback: TimerCallback = Arc::new(move || {
            let now = counter.update(|count| {
                if count + 1 >= ticks_for_target {
                    0
                } else {
                    count + 1
                }
            });
            if now == 0 {
                on_complete();
            }
        });

        let token = driver.set_callback(handle, callback)?;

        Ok(Self {
            token,
            ticks,
            target: ticks_for_target,
        })
    }

    /// Ticks counted since the last completion.
    pub fn ticks(&self) -> u32 {
        self.ticks.get()
    }

    pub fn target(&self) -> u32 {
        self.target
    }

    pub fn timer(&self) -> TimerId {
        self.token.timer()
    }

    /// Release the callback slot.
    pub fn stop<D: TimerDriver + ?Sized>(self, driver: &D) -> Result<()> {
        driver.release_callback(self.token)
    }
}
