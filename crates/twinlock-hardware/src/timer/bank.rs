//! Register model shared by the simulated and clocked drivers.
//!
//! All register access happens inside a critical section. Callbacks are
//! cloned out of the section and invoked after it ends, so a callback may
//! itself enter a critical section.

use super::{
    CallbackToken, CaptureEdge, TimerCallback, TimerConfig, TimerHandle, TimerId, TimerMode,
};
use crate::error::{HardwareError, Result};
use critical_section::Mutex;
use std::{
    cell::RefCell,
    sync::atomic::{AtomicU64, Ordering},
};

#[derive(Default)]
struct UnitRegisters {
    config: Option<TimerConfig>,
    generation: u64,
    counter: u16,
    capture: u16,
    callback: Option<(u64, TimerCallback)>,
}

impl UnitRegisters {
    fn check(&self, handle: TimerHandle) -> Result<&TimerConfig> {
        match &self.config {
            Some(config) if self.generation == handle.generation => Ok(config),
            _ => Err(HardwareError::StaleHandle {
                timer: handle.timer,
                generation: handle.generation,
            }),
        }
    }

    fn reset(&mut self) {
        self.config = None;
        self.counter = 0;
        self.capture = 0;
    }
}

pub(crate) struct TimerBank {
    units: Mutex<RefCell<[UnitRegisters; 3]>>,
    next_serial: AtomicU64,
}

impl TimerBank {
    pub(crate) fn new() -> Self {
        Self {
            units: Mutex::new(RefCell::new(Default::default())),
            next_serial: AtomicU64::new(1),
        }
    }

    fn with_unit<R>(&self, timer: TimerId, f: impl FnOnce(&mut UnitRegisters) -> R) -> R {
        critical_section::with(|cs| {
            let mut units = self.units.borrow_ref_mut(cs);
            f(&mut units[timer.index()])
        })
    }

    pub(crate) fn configure(&self, config: &TimerConfig) -> Result<TimerHandle> {
        config.validate()?;

        self.with_unit(config.timer, |unit| {
            if unit.config.is_some() {
                return Err(HardwareError::TimerBusy {
                    timer: config.timer,
                });
            }
            unit.generation += 1;
            unit.config = Some(*config);
            unit.counter = 0;
            unit.capture = 0;
            Ok(TimerHandle {
                timer: config.timer,
                generation: unit.generation,
            })
        })
    }

    pub(crate) fn set_callback(
        &self,
        handle: TimerHandle,
        callback: TimerCallback,
    ) -> Result<CallbackToken> {
        let serial = self.next_serial.fetch_add(1, Ordering::Relaxed);

        self.with_unit(handle.timer, |unit| {
            unit.check(handle)?;
            if unit.callback.is_some() {
                return Err(HardwareError::CallbackSlotOccupied {
                    timer: handle.timer,
                });
            }
            unit.callback = Some((serial, callback));
            Ok(CallbackToken::new(handle.timer, serial))
        })
    }

    pub(crate) fn release_callback(&self, token: CallbackToken) -> Result<()> {
        let timer = token.timer();
        self.with_unit(timer, |unit| {
            let owned = matches!(&unit.callback, Some((serial, _)) if *serial == token.serial());
            if !owned {
                return Err(HardwareError::other(format!(
                    "callback token does not own the {timer} slot"
                )));
            }
            unit.callback = None;
            Ok(())
        })
    }

    pub(crate) fn deinit(&self, handle: TimerHandle) -> Result<()> {
        self.with_unit(handle.timer, |unit| {
            unit.check(handle)?;
            unit.reset();
            Ok(())
        })
    }

    pub(crate) fn read(&self, handle: TimerHandle) -> Result<u16> {
        self.with_unit(handle.timer, |unit| {
            unit.check(handle)?;
            Ok(unit.counter)
        })
    }

    pub(crate) fn write_counter(&self, handle: TimerHandle, value: u16) -> Result<()> {
        self.with_unit(handle.timer, |unit| {
            let max = unit.check(handle)?.timer.counter_max();
            unit.counter = value.min(max);
            Ok(())
        })
    }

    pub(crate) fn set_capture_edge(&self, handle: TimerHandle, edge: CaptureEdge) -> Result<()> {
        self.with_unit(handle.timer, |unit| {
            let mut config = *unit.check(handle)?;
            match config.mode {
                TimerMode::InputCapture(mut capture) => {
                    capture.edge = edge;
                    config.mode = TimerMode::InputCapture(capture);
                    unit.config = Some(config);
                    Ok(())
                }
                _ => Err(HardwareError::configuration(format!(
                    "{} is not in input-capture mode",
                    handle.timer
                ))),
            }
        })
    }

    pub(crate) fn capture_value(&self, handle: TimerHandle) -> Result<u16> {
        self.with_unit(handle.timer, |unit| {
            unit.check(handle)?;
            Ok(unit.capture)
        })
    }

    /// Apply one hardware event and return the callback to invoke.
    ///
    /// With `expected` set, the event is dropped unless the unit is still
    /// in that configure generation.
    pub(crate) fn event(
        &self,
        timer: TimerId,
        expected: Option<u64>,
        latched: Option<u16>,
    ) -> Option<TimerCallback> {
        self.with_unit(timer, |unit| {
            let config = unit.config?;
            if expected.is_some_and(|generation| generation != unit.generation) {
                return None;
            }
            if config.clock.prescale().is_none() {
                return None;
            }

            match config.mode {
                TimerMode::Normal | TimerMode::Compare(_) | TimerMode::Pwm(_) => {
                    unit.counter = 0;
                }
                TimerMode::InputCapture(_) => {
                    unit.capture = latched.unwrap_or(unit.counter);
                }
            }

            if !config.interrupts_enabled {
                return None;
            }
            unit.callback.as_ref().map(|(_, callback)| callback.clone())
        })
    }

    pub(crate) fn generation(&self, timer: TimerId) -> u64 {
        self.with_unit(timer, |unit| unit.generation)
    }

    pub(crate) fn config(&self, timer: TimerId) -> Option<TimerConfig> {
        self.with_unit(timer, |unit| unit.config)
    }

    /// Configured, clocked, interrupts on, callback registered.
    pub(crate) fn is_armed(&self, timer: TimerId) -> bool {
        self.with_unit(timer, |unit| {
            unit.config.is_some_and(|config| {
                config.interrupts_enabled && config.clock.prescale().is_some()
            }) && unit.callback.is_some()
        })
    }

    pub(crate) fn has_callback(&self, timer: TimerId) -> bool {
        self.with_unit(timer, |unit| unit.callback.is_some())
    }
}
