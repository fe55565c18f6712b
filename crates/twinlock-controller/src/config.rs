//! Controller configuration.
//!
//! Loaded once at construction and never changed while a controller runs.
//! Every field has a default matching the wired hardware, so an empty JSON
//! object is a complete configuration:
//!
//! ```
//! use twinlock_controller::ControllerConfig;
//!
//! let config = ControllerConfig::from_json_str("{}").unwrap();
//! assert_eq!(config, ControllerConfig::default());
//! assert_eq!(config.gate.travel_ticks, 7);
//! ```

use crate::error::{ControllerError, Result};
use serde::{Deserialize, Serialize};
use std::{path::Path, time::Duration};
use twinlock_core::constants::{
    ALARM_TICKS, GATE_HOLD_COMPARE_VALUE, GATE_HOLD_TICKS, GATE_TRAVEL_TICKS, MAX_FAILED_ATTEMPTS,
    MESSAGE_PAUSE_MS, MOTOR_PWM_DUTY,
};
use twinlock_hardware::timer::{ClockSource, TimerConfig, TimerId};
use twinlock_protocol::LinkConfig;

/// Gate cycle timing and motor PWM.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    /// Unit counting travel and hold ticks.
    pub timer: TimerId,
    pub clock: ClockSource,
    /// Overflow ticks to open or close (≈ 15 s at F_CPU/256).
    pub travel_ticks: u32,
    /// Compare ticks the gate stays open (≈ 1.4 s).
    pub hold_ticks: u32,
    pub hold_compare_value: u16,
    /// Enable signal for the motor, active for a whole cycle.
    pub motor_pwm: TimerConfig,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            timer: TimerId::Timer1,
            clock: ClockSource::Div256,
            travel_ticks: GATE_TRAVEL_TICKS,
            hold_ticks: GATE_HOLD_TICKS,
            hold_compare_value: GATE_HOLD_COMPARE_VALUE,
            motor_pwm: TimerConfig::pwm(TimerId::Timer0, ClockSource::Div64, MOTOR_PWM_DUTY),
        }
    }
}

impl GateConfig {
    pub fn travel_timer(&self) -> TimerConfig {
        TimerConfig::normal(self.timer, self.clock)
    }

    pub fn hold_timer(&self) -> TimerConfig {
        TimerConfig::compare(self.timer, self.clock, self.hold_compare_value)
    }
}

/// Lockout alarm timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlarmConfig {
    pub timer: TimerId,
    pub clock: ClockSource,
    /// Overflow ticks the buzzer sounds (≈ 67 s at F_CPU/1024).
    pub ticks: u32,
}

impl Default for AlarmConfig {
    fn default() -> Self {
        Self {
            timer: TimerId::Timer1,
            clock: ClockSource::Div1024,
            ticks: ALARM_TICKS,
        }
    }
}

impl AlarmConfig {
    pub fn timer_config(&self) -> TimerConfig {
        TimerConfig::normal(self.timer, self.clock)
    }
}

/// Interface controller presentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    /// How long an error message stays on screen.
    pub message_pause: Duration,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            message_pause: Duration::from_millis(MESSAGE_PAUSE_MS),
        }
    }
}

/// Configuration shared by both controllers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    pub gate: GateConfig,
    pub alarm: AlarmConfig,
    /// Consecutive wrong credentials before the alarm.
    pub lockout_threshold: u8,
    pub link: LinkConfig,
    pub ui: UiConfig,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            gate: GateConfig::default(),
            alarm: AlarmConfig::default(),
            lockout_threshold: MAX_FAILED_ATTEMPTS,
            link: LinkConfig::default(),
            ui: UiConfig::default(),
        }
    }
}

impl ControllerConfig {
    /// Parse and validate a JSON configuration.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| ControllerError::config(format!("invalid configuration: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON configuration file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            ControllerError::config(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_json_str(&contents)
    }

    /// Check tick counts, the lockout threshold and every timer setup.
    ///
    /// # Errors
    ///
    /// Returns [`ControllerError::Config`] for zero counts and
    /// [`ControllerError::Hardware`] for timer setups the unit cannot run.
    pub fn validate(&self) -> Result<()> {
        for (name, ticks) in [
            ("gate.travel_ticks", self.gate.travel_ticks),
            ("gate.hold_ticks", self.gate.hold_ticks),
            ("alarm.ticks", self.alarm.ticks),
        ] {
            if ticks == 0 {
                return Err(ControllerError::config(format!("{name} must be at least 1")));
            }
        }

        if self.lockout_threshold == 0 {
            return Err(ControllerError::config(
                "lockout_threshold must be at least 1",
            ));
        }

        if self.gate.motor_pwm.timer == self.gate.timer {
            return Err(ControllerError::config(format!(
                "motor PWM and gate ticks both use {}",
                self.gate.timer
            )));
        }

        self.gate.travel_timer().validate()?;
        self.gate.hold_timer().validate()?;
        self.gate.motor_pwm.validate()?;
        self.alarm.timer_config().validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use twinlock_core::constants::CPU_FREQUENCY_HZ;
    use twinlock_hardware::timer::{ClockedTimerBank, TimerMode};

    #[test]
    fn test_default_matches_hardware() {
        let config = ControllerConfig::default();
        assert!(config.validate().is_ok());

        assert_eq!(config.gate.travel_ticks, 7);
        assert_eq!(config.gate.hold_ticks, 2);
        assert_eq!(config.alarm.ticks, 8);
        assert_eq!(config.lockout_threshold, 3);
        assert!(config.link.wait_timeout.is_none());
        assert!(matches!(config.gate.hold_timer().mode, TimerMode::Compare(c) if c.compare_a == 21_900));
    }

    #[tokio::test]
    async fn test_default_phase_durations() {
        let clock = ClockedTimerBank::new(CPU_FREQUENCY_HZ, 1.0).unwrap();
        let total = |timer: TimerConfig, ticks: u32| {
            clock.event_period(&timer).unwrap().as_secs_f64() * f64::from(ticks)
        };
        let config = ControllerConfig::default();

        let travel = total(config.gate.travel_timer(), config.gate.travel_ticks);
        let hold = total(config.gate.hold_timer(), config.gate.hold_ticks);
        let alarm = total(config.alarm.timer_config(), config.alarm.ticks);

        assert!((travel - 14.68).abs() < 0.01, "travel {travel}");
        assert!((hold - 1.40).abs() < 0.01, "hold {hold}");
        assert!((alarm - 67.11).abs() < 0.01, "alarm {alarm}");
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = ControllerConfig::from_json_str(
            r#"{ "alarm": { "ticks": 3 }, "lockout_threshold": 5 }"#,
        )
        .unwrap();

        assert_eq!(config.alarm.ticks, 3);
        assert_eq!(config.alarm.clock, ClockSource::Div1024);
        assert_eq!(config.lockout_threshold, 5);
        assert_eq!(config.gate, GateConfig::default());
    }

    #[test]
    fn test_round_trip_through_json() {
        let config = ControllerConfig {
            link: LinkConfig::bounded(Duration::from_millis(250)),
            ..ControllerConfig::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        assert_eq!(ControllerConfig::from_json_str(&json).unwrap(), config);
    }

    #[rstest]
    #[case(r#"{ "gate": { "travel_ticks": 0 } }"#)]
    #[case(r#"{ "gate": { "hold_ticks": 0 } }"#)]
    #[case(r#"{ "alarm": { "ticks": 0 } }"#)]
    #[case(r#"{ "lockout_threshold": 0 }"#)]
    fn test_rejects_zero_counts(#[case] json: &str) {
        assert!(matches!(
            ControllerConfig::from_json_str(json),
            Err(ControllerError::Config(_))
        ));
    }

    #[test]
    fn test_rejects_unit_conflicts() {
        let mut config = ControllerConfig::default();
        config.gate.motor_pwm = TimerConfig::pwm(TimerId::Timer1, ClockSource::Div64, 128);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_clock_unavailable_on_unit() {
        let mut config = ControllerConfig::default();
        config.alarm.clock = ClockSource::Div128;
        assert!(matches!(
            config.validate(),
            Err(ControllerError::Hardware(_))
        ));
    }

    #[test]
    fn test_malformed_json() {
        assert!(ControllerConfig::from_json_str("{ not json").is_err());
    }

    #[test]
    fn test_missing_file() {
        let err = ControllerConfig::from_json_file("/nonexistent/twinlock.json").unwrap_err();
        assert!(err.to_string().contains("cannot read"));
    }
}
