//! Fixed-duration lockout alarm.

use std::sync::Arc;

use tracing::{info, warn};
use twinlock_hardware::{BuzzerDriver, Guarded, TickCounter, TimerDriver};

use crate::{config::AlarmConfig, error::Result};

/// Buzzer held on for a fixed number of timer ticks.
///
/// The tick callback only raises the `elapsed` flag; the waiting main loop
/// turns the buzzer off and releases the timer.
pub struct AlarmTimer<T, B> {
    driver: T,
    buzzer: B,
    config: AlarmConfig,
    elapsed: Arc<Guarded<bool>>,
}

impl<T, B> AlarmTimer<T, B>
where
    T: TimerDriver,
    B: BuzzerDriver,
{
    pub fn new(driver: T, buzzer: B, config: AlarmConfig) -> Self {
        Self {
            driver,
            buzzer,
            config,
            elapsed: Arc::new(Guarded::new(false)),
        }
    }

    pub fn is_sounding(&self) -> bool {
        self.buzzer.is_on()
    }

    pub fn buzzer(&self) -> &B {
        &self.buzzer
    }

    /// Sound the buzzer and wait until the configured ticks have elapsed.
    pub async fn sound(&mut self) -> Result<()> {
        let handle = self.driver.configure(&self.config.timer_config())?;

        self.elapsed.set(false);
        let flag = self.elapsed.clone();
        let counter =
            match TickCounter::start(&self.driver, handle, self.config.ticks, move || flag.set(true)) {
                Ok(counter) => counter,
                Err(e) => {
                    self.driver.deinit(handle)?;
                    return Err(e.into());
                }
            };

        self.buzzer.on()?;
        warn!(ticks = self.config.ticks, "Alarm sounding");

        self.elapsed.wait_while(|elapsed| !elapsed).await;

        self.buzzer.off()?;
        counter.stop(&self.driver)?;
        self.driver.deinit(handle)?;
        info!("Alarm elapsed");
        Ok(())
    }
}

impl<T, B> std::fmt::Debug for AlarmTimer<T, B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlarmTimer")
            .field("config", &self.config)
            .field("elapsed", &self.elapsed.get())
            .finish()
    }
}
