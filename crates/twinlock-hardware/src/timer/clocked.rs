//! Timer bank driven by the tokio clock.
//!
//! Each configured unit with interrupts enabled gets a task that fires the
//! unit's event at the period the real hardware would produce:
//!
//! ```text
//! period = counts_per_event * prescale / cpu_frequency / time_scale
//! ```
//!
//! where `counts_per_event` is the counter width for Normal mode, the
//! compare value + 1 for Compare mode and `top` + 1 for PWM. Input capture
//! depends on external edges and never fires on its own.

use super::{
    CallbackToken, CaptureEdge, TimerCallback, TimerConfig, TimerDriver, TimerHandle, TimerId,
    TimerMode, bank::TimerBank,
};
use crate::error::{HardwareError, Result};
use critical_section::Mutex;
use std::{cell::RefCell, sync::Arc, time::Duration};
use tokio::{
    runtime::Handle,
    task::JoinHandle,
    time::{Instant, MissedTickBehavior},
};
use tracing::debug;

/// Shortest event period the scheduler is asked for.
const MIN_EVENT_PERIOD: Duration = Duration::from_millis(1);

struct Ticker {
    task: Option<JoinHandle<()>>,
    epoch: Instant,
    count_period: Duration,
    counts_per_event: u32,
}

/// Real-time timer driver.
pub struct ClockedTimerBank {
    bank: Arc<TimerBank>,
    runtime: Handle,
    cpu_frequency_hz: u32,
    time_scale: f64,
    tickers: Mutex<RefCell<[Option<Ticker>; 3]>>,
}

impl ClockedTimerBank {
    /// Create a bank on the current tokio runtime.
    ///
    /// `time_scale` speeds up (> 1.0) or slows down (< 1.0) every unit.
    ///
    /// # Errors
    ///
    /// Returns [`HardwareError::ConfigurationError`] if called outside a
    /// tokio runtime, if `cpu_frequency_hz` is zero or if `time_scale` is
    /// not a positive finite number.
    pub fn new(cpu_frequency_hz: u32, time_scale: f64) -> Result<Self> {
        if cpu_frequency_hz == 0 {
            return Err(HardwareError::configuration("CPU frequency must be non-zero"));
        }
        if !time_scale.is_finite() || time_scale <= 0.0 {
            return Err(HardwareError::configuration(format!(
                "time scale must be positive, got {time_scale}"
            )));
        }
        let runtime = Handle::try_current()
            .map_err(|_| HardwareError::configuration("clocked timers need a tokio runtime"))?;

        Ok(Self {
            bank: Arc::new(TimerBank::new()),
            runtime,
            cpu_frequency_hz,
            time_scale,
            tickers: Mutex::new(RefCell::new(Default::default())),
        })
    }

    /// Counter increments between two events, `None` for input capture.
    fn counts_per_event(config: &TimerConfig) -> Option<u32> {
        let max = u32::from(config.timer.counter_max());
        match config.mode {
            TimerMode::Normal => Some(max + 1),
            TimerMode::Compare(compare) => Some(u32::from(compare.compare_a) + 1),
            TimerMode::Pwm(pwm) => Some(pwm.top.map_or(max, u32::from) + 1),
            TimerMode::InputCapture(_) => None,
        }
    }

    /// Wall-clock duration of one counter increment.
    fn count_period(&self, config: &TimerConfig) -> Option<Duration> {
        let prescale = config.clock.prescale()?;
        let seconds = f64::from(prescale) / f64::from(self.cpu_frequency_hz) / self.time_scale;
        Some(Duration::from_secs_f64(seconds))
    }

    /// Wall-clock time between two events of `config`, `None` if it never fires.
    pub fn event_period(&self, config: &TimerConfig) -> Option<Duration> {
        let counts = Self::counts_per_event(config)?;
        let period = self.count_period(config)?.checked_mul(counts)?;
        Some(period.max(MIN_EVENT_PERIOD))
    }

    fn spawn_ticker(&self, handle: TimerHandle, period: Duration) -> JoinHandle<()> {
        let bank = self.bank.clone();
        self.runtime.spawn(async move {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                if let Some(callback) = bank.event(handle.timer, Some(handle.generation), None) {
                    callback();
                }
            }
        })
    }

    fn replace_ticker(&self, timer: TimerId, ticker: Option<Ticker>) {
        let previous = critical_section::with(|cs| {
            std::mem::replace(&mut self.tickers.borrow_ref_mut(cs)[timer.index()], ticker)
        });
        if let Some(task) = previous.and_then(|t| t.task) {
            task.abort();
        }
    }
}

impl TimerDriver for ClockedTimerBank {
    fn configure(&self, config: &TimerConfig) -> Result<TimerHandle> {
        let handle = self.bank.configure(config)?;

        let ticker = Self::counts_per_event(config)
            .zip(self.count_period(config))
            .map(|(counts_per_event, count_period)| {
                let task = self
                    .event_period(config)
                    .filter(|_| config.interrupts_enabled)
                    .map(|period| {
                        debug!(
                            timer = %config.timer,
                            clock = %config.clock,
                            period_ms = period.as_millis() as u64,
                            "Timer events scheduled"
                        );
                        self.spawn_ticker(handle, period)
                    });
                Ticker {
                    task,
                    epoch: Instant::now(),
                    count_period,
                    counts_per_event,
                }
            });
        self.replace_ticker(config.timer, ticker);

        Ok(handle)
    }

    fn set_callback(&self, handle: TimerHandle, callback: TimerCallback) -> Result<CallbackToken> {
        self.bank.set_callback(handle, callback)
    }

    fn release_callback(&self, token: CallbackToken) -> Result<()> {
        self.bank.release_callback(token)
    }

    fn deinit(&self, handle: TimerHandle) -> Result<()> {
        self.bank.deinit(handle)?;
        self.replace_ticker(handle.timer, None);
        debug!(timer = %handle.timer, "Timer deinitialized");
        Ok(())
    }

    fn read(&self, handle: TimerHandle) -> Result<u16> {
        let latched = self.bank.read(handle)?;
        let elapsed = critical_section::with(|cs| {
            self.tickers.borrow_ref(cs)[handle.timer.index()]
                .as_ref()
                .map(|t| (t.epoch.elapsed(), t.count_period, t.counts_per_event))
        });

        Ok(match elapsed {
            Some((elapsed, count_period, counts)) if !count_period.is_zero() => {
                let counts_elapsed = elapsed.as_nanos() / count_period.as_nanos();
                (counts_elapsed % u128::from(counts)) as u16
            }
            _ => latched,
        })
    }

    fn clear(&self, handle: TimerHandle) -> Result<()> {
        self.bank.write_counter(handle, 0)?;
        critical_section::with(|cs| {
            if let Some(ticker) = self.tickers.borrow_ref_mut(cs)[handle.timer.index()].as_mut() {
                ticker.epoch = Instant::now();
            }
        });
        Ok(())
    }

    fn set_capture_edge(&self, handle: TimerHandle, edge: CaptureEdge) -> Result<()> {
        self.bank.set_capture_edge(handle, edge)
    }

    fn capture_value(&self, handle: TimerHandle) -> Result<u16> {
        self.bank.capture_value(handle)
    }
}

impl Drop for ClockedTimerBank {
    fn drop(&mut self) {
        for timer in TimerId::ALL {
            self.replace_ticker(timer, None);
        }
    }
}
