//! Gate cycle driven by timer ticks.
//!
//! ```text
//! Closed ──begin──► Opening ──travel──► Opened ──hold──► Closing ──travel──► Closed
//!                   motor fwd           motor off        motor rev           motor off
//! ```
//!
//! Each phase arms a [`TickCounter`] whose completion callback advances the
//! status held in a [`Guarded`] cell. The main loop waits on that cell, so
//! the only clock is the timer interrupt.

use std::sync::Arc;

use tracing::{debug, info};
use twinlock_core::{Error as CoreError, GateStatus};
use twinlock_hardware::{
    Guarded, HardwareError, MotorDirection, MotorDriver, TickCounter, TimerDriver, TimerHandle,
};

use crate::{config::GateConfig, error::Result};

struct Phase {
    from: GateStatus,
    handle: TimerHandle,
    counter: TickCounter,
}

/// Gate motor and its tick-driven status.
pub struct GateStateMachine<T, M> {
    driver: T,
    motor: M,
    config: GateConfig,
    status: Arc<Guarded<GateStatus>>,
    phase: Option<Phase>,
    pwm: Option<TimerHandle>,
}

impl<T, M> GateStateMachine<T, M>
where
    T: TimerDriver,
    M: MotorDriver,
{
    pub fn new(driver: T, motor: M, config: GateConfig) -> Self {
        Self {
            driver,
            motor,
            config,
            status: Arc::new(Guarded::new(GateStatus::Closed)),
            phase: None,
            pwm: None,
        }
    }

    pub fn status(&self) -> GateStatus {
        self.status.get()
    }

    pub fn motor(&self) -> &M {
        &self.motor
    }

    /// Whether a cycle is in progress.
    pub fn is_active(&self) -> bool {
        self.pwm.is_some()
    }

    /// Enable the motor PWM and enter `Opening`.
    ///
    /// The motor does not move until [`start_phase`](Self::start_phase).
    ///
    /// # Errors
    ///
    /// Fails if a cycle is already running or the PWM unit is busy.
    pub fn begin(&mut self) -> Result<GateStatus> {
        let status = self.status.get();
        if status != GateStatus::Closed || self.pwm.is_some() {
            return Err(CoreError::InvalidStateTransition {
                from: status.to_string(),
                to: GateStatus::Opening.to_string(),
            }
            .into());
        }

        self.pwm = Some(self.driver.configure(&self.config.motor_pwm)?);
        self.status.set(GateStatus::Opening);
        info!("Gate cycle started");
        Ok(GateStatus::Opening)
    }

    /// Drive the motor for the current status and arm the phase timer.
    pub fn start_phase(&mut self) -> Result<()> {
        let from = self.status.get();
        let (direction, timer_config, ticks) = match from {
            GateStatus::Opening => (
                MotorDirection::Forward,
                self.config.travel_timer(),
                self.config.travel_ticks,
            ),
            GateStatus::Opened => (
                MotorDirection::Stopped,
                self.config.hold_timer(),
                self.config.hold_ticks,
            ),
            GateStatus::Closing => (
                MotorDirection::Reverse,
                self.config.travel_timer(),
                self.config.travel_ticks,
            ),
            GateStatus::Closed => {
                return Err(HardwareError::configuration("no gate cycle in progress").into());
            }
        };

        if let Some(phase) = &self.phase {
            return Err(HardwareError::TimerBusy {
                timer: phase.counter.timer(),
            }
            .into());
        }

        let handle = self.driver.configure(&timer_config)?;
        let next = from.next();
        let cell = self.status.clone();
        let counter = match TickCounter::start(&self.driver, handle, ticks, move || cell.set(next)) {
            Ok(counter) => counter,
            Err(e) => {
                self.driver.deinit(handle)?;
                return Err(e.into());
            }
        };

        // The motor only moves once the phase timer is counting.
        if let Err(e) = self.motor.set_direction(direction) {
            counter.stop(&self.driver)?;
            self.driver.deinit(handle)?;
            return Err(e.into());
        }

        debug!(status = %from, %direction, ticks, "Gate phase armed");
        self.phase = Some(Phase {
            from,
            handle,
            counter,
        });
        Ok(())
    }

    /// Wait until the armed phase completes, then release its timer.
    ///
    /// Reaching `Closed` also stops the motor and its PWM.
    pub async fn finish_phase(&mut self) -> Result<GateStatus> {
        let Some(phase) = self.phase.take() else {
            return Err(HardwareError::configuration("no gate phase armed").into());
        };

        let reached = self.status.wait_while(|status| status == phase.from).await;

        phase.counter.stop(&self.driver)?;
        self.driver.deinit(phase.handle)?;
        debug!(from = %phase.from, to = %reached, "Gate phase complete");

        if reached == GateStatus::Closed {
            self.motor.stop()?;
            if let Some(pwm) = self.pwm.take() {
                self.driver.deinit(pwm)?;
            }
            info!("Gate cycle complete");
        }

        Ok(reached)
    }

    /// Run a whole cycle without reporting intermediate statuses.
    pub async fn run_cycle(&mut self) -> Result<()> {
        let mut status = self.begin()?;
        while status != GateStatus::Closed {
            self.start_phase()?;
            status = self.finish_phase().await?;
        }
        Ok(())
    }
}

impl<T, M> std::fmt::Debug for GateStateMachine<T, M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GateStateMachine")
            .field("status", &self.status.get())
            .field("phase_armed", &self.phase.is_some())
            .field("pwm_enabled", &self.pwm.is_some())
            .finish()
    }
}
