//! Typed timer configuration.
//!
//! Every mode carries exactly the parameters it needs. [`TimerConfigBuilder`]
//! accepts the mode tag and the parameter blocks separately and rejects
//! combinations where the tag needs a block that was never supplied.

use super::{ClockSource, TimerId};
use crate::error::{HardwareError, Result};
use serde::{Deserialize, Serialize};

/// Output pin behaviour on compare match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputPinPolicy {
    #[default]
    Disconnected,
    Toggle,
    SetOnMatch,
    ClearOnMatch,
}

/// Output pin behaviour in PWM mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PwmOutput {
    #[default]
    Disconnected,
    Inverting,
    NonInverting,
}

/// Edge latched by input capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureEdge {
    #[default]
    Falling,
    Rising,
}

/// Compare-match parameters.
///
/// Channel B exists only on `Timer1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompareConfig {
    pub compare_a: u16,
    pub output_a: OutputPinPolicy,
    pub compare_b: Option<u16>,
    pub output_b: OutputPinPolicy,
}

impl CompareConfig {
    /// Single-channel compare with the output pin disconnected.
    pub fn new(compare_a: u16) -> Self {
        Self {
            compare_a,
            output_a: OutputPinPolicy::Disconnected,
            compare_b: None,
            output_b: OutputPinPolicy::Disconnected,
        }
    }

    pub fn with_output_a(mut self, policy: OutputPinPolicy) -> Self {
        self.output_a = policy;
        self
    }

    pub fn with_channel_b(mut self, compare_b: u16, policy: OutputPinPolicy) -> Self {
        self.compare_b = Some(compare_b);
        self.output_b = policy;
        self
    }
}

/// PWM parameters.
///
/// `top` and channel B exist only on `Timer1`. Without `top` the period is
/// the full counter width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PwmConfig {
    pub duty_a: u16,
    pub output_a: PwmOutput,
    pub duty_b: Option<u16>,
    pub output_b: PwmOutput,
    pub top: Option<u16>,
}

impl PwmConfig {
    /// Single-channel non-inverting PWM.
    pub fn new(duty_a: u16) -> Self {
        Self {
            duty_a,
            output_a: PwmOutput::NonInverting,
            duty_b: None,
            output_b: PwmOutput::Disconnected,
            top: None,
        }
    }

    pub fn with_output_a(mut self, output: PwmOutput) -> Self {
        self.output_a = output;
        self
    }

    pub fn with_channel_b(mut self, duty_b: u16, output: PwmOutput) -> Self {
        self.duty_b = Some(duty_b);
        self.output_b = output;
        self
    }

    pub fn with_top(mut self, top: u16) -> Self {
        self.top = Some(top);
        self
    }
}

/// Input-capture parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CaptureConfig {
    pub edge: CaptureEdge,
}

/// Operating mode of a timer unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "params", rename_all = "snake_case")]
pub enum TimerMode {
    /// Free-running; one event per counter overflow.
    Normal,
    /// Clear on compare match; one event per match of channel A.
    Compare(CompareConfig),
    /// Duty-cycle generation.
    Pwm(PwmConfig),
    /// Latches the counter on an external edge; one event per edge.
    InputCapture(CaptureConfig),
}

impl TimerMode {
    pub fn kind(&self) -> TimerModeKind {
        match self {
            TimerMode::Normal => TimerModeKind::Normal,
            TimerMode::Compare(_) => TimerModeKind::Compare,
            TimerMode::Pwm(_) => TimerModeKind::Pwm,
            TimerMode::InputCapture(_) => TimerModeKind::InputCapture,
        }
    }
}

/// Mode tag without parameters, as used by [`TimerConfigBuilder`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerModeKind {
    Normal,
    Compare,
    Pwm,
    InputCapture,
}

/// Full configuration of one timer unit.
///
/// # Examples
///
/// ```
/// use twinlock_hardware::timer::{ClockSource, TimerConfig, TimerId};
///
/// let config = TimerConfig::normal(TimerId::Timer1, ClockSource::Div256);
/// assert!(config.validate().is_ok());
///
/// // Timer0 is 8-bit, so a 16-bit compare value does not fit
/// let config = TimerConfig::compare(TimerId::Timer0, ClockSource::Div64, 21_900);
/// assert!(config.validate().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerConfig {
    pub timer: TimerId,
    pub clock: ClockSource,
    pub interrupts_enabled: bool,
    pub mode: TimerMode,
}

impl TimerConfig {
    /// Normal mode with the overflow interrupt enabled.
    pub fn normal(timer: TimerId, clock: ClockSource) -> Self {
        Self {
            timer,
            clock,
            interrupts_enabled: true,
            mode: TimerMode::Normal,
        }
    }

    /// Compare mode on channel A with the match interrupt enabled.
    pub fn compare(timer: TimerId, clock: ClockSource, compare_a: u16) -> Self {
        Self {
            timer,
            clock,
            interrupts_enabled: true,
            mode: TimerMode::Compare(CompareConfig::new(compare_a)),
        }
    }

    /// Non-inverting PWM on channel A without interrupts.
    pub fn pwm(timer: TimerId, clock: ClockSource, duty: u16) -> Self {
        Self {
            timer,
            clock,
            interrupts_enabled: false,
            mode: TimerMode::Pwm(PwmConfig::new(duty)),
        }
    }

    pub fn builder(timer: TimerId) -> TimerConfigBuilder {
        TimerConfigBuilder::new(timer)
    }

    /// Check the configuration against the unit's capabilities.
    ///
    /// # Errors
    ///
    /// Returns [`HardwareError::ConfigurationError`] if:
    /// - The clock source is not available on this unit
    /// - A compare, duty or top value does not fit the counter width
    /// - A duty value exceeds `top`
    /// - Channel B, `top` or input capture is requested on an 8-bit unit
    pub fn validate(&self) -> Result<()> {
        let timer = self.timer;
        let max = timer.counter_max();

        if !self.clock.available_on(timer) {
            return Err(HardwareError::configuration(format!(
                "{} is not available on {timer}",
                self.clock
            )));
        }

        let fits = |name: &str, value: u16, limit: u16| -> Result<()> {
            if value > limit {
                return Err(HardwareError::configuration(format!(
                    "{name} {value} exceeds {limit} on {timer}"
                )));
            }
            Ok(())
        };

        match self.mode {
            TimerMode::Normal => {}
            TimerMode::Compare(compare) => {
                fits("compare_a", compare.compare_a, max)?;
                if let Some(compare_b) = compare.compare_b {
                    if !timer.has_channel_b() {
                        return Err(HardwareError::configuration(format!(
                            "{timer} has no compare channel B"
                        )));
                    }
                    fits("compare_b", compare_b, max)?;
                }
            }
            TimerMode::Pwm(pwm) => {
                if pwm.top.is_some() && !timer.has_channel_b() {
                    return Err(HardwareError::configuration(format!(
                        "{timer} has no adjustable PWM top"
                    )));
                }
                let top = pwm.top.unwrap_or(max);
                fits("top", top, max)?;
                fits("duty_a", pwm.duty_a, top)?;
                if let Some(duty_b) = pwm.duty_b {
                    if !timer.has_channel_b() {
                        return Err(HardwareError::configuration(format!(
                            "{timer} has no PWM channel B"
                        )));
                    }
                    fits("duty_b", duty_b, top)?;
                }
            }
            TimerMode::InputCapture(_) => {
                if !timer.has_input_capture() {
                    return Err(HardwareError::configuration(format!(
                        "{timer} has no input capture unit"
                    )));
                }
            }
        }

        Ok(())
    }
}

/// Builder taking the mode tag and its parameters separately.
///
/// # Examples
///
/// ```
/// use twinlock_hardware::timer::{
///     ClockSource, CompareConfig, TimerConfig, TimerId, TimerModeKind,
/// };
///
/// let config = TimerConfig::builder(TimerId::Timer1)
///     .clock(ClockSource::Div256)
///     .mode(TimerModeKind::Compare)
///     .compare(CompareConfig::new(21_900))
///     .build()
///     .unwrap();
/// assert!(config.interrupts_enabled);
///
/// // Compare mode without compare parameters is rejected
/// let missing = TimerConfig::builder(TimerId::Timer1)
///     .mode(TimerModeKind::Compare)
///     .build();
/// assert!(missing.is_err());
/// ```
#[derive(Debug, Clone)]
pub struct TimerConfigBuilder {
    timer: TimerId,
    clock: ClockSource,
    interrupts_enabled: bool,
    mode: TimerModeKind,
    compare: Option<CompareConfig>,
    pwm: Option<PwmConfig>,
    capture: Option<CaptureConfig>,
}

impl TimerConfigBuilder {
    pub fn new(timer: TimerId) -> Self {
        Self {
            timer,
            clock: ClockSource::Div1,
            interrupts_enabled: true,
            mode: TimerModeKind::Normal,
            compare: None,
            pwm: None,
            capture: None,
        }
    }

    pub fn clock(mut self, clock: ClockSource) -> Self {
        self.clock = clock;
        self
    }

    pub fn interrupts(mut self, enabled: bool) -> Self {
        self.interrupts_enabled = enabled;
        self
    }

    pub fn mode(mut self, mode: TimerModeKind) -> Self {
        self.mode = mode;
        self
    }

    pub fn compare(mut self, params: CompareConfig) -> Self {
        self.compare = Some(params);
        self
    }

    pub fn pwm(mut self, params: PwmConfig) -> Self {
        self.pwm = Some(params);
        self
    }

    pub fn capture(mut self, params: CaptureConfig) -> Self {
        self.capture = Some(params);
        self
    }

    /// Assemble and validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`HardwareError::ConfigurationError`] if the selected mode
    /// needs a parameter block that was not supplied, or if the assembled
    /// configuration fails [`TimerConfig::validate`].
    pub fn build(self) -> Result<TimerConfig> {
        let missing = |kind: &str| {
            HardwareError::configuration(format!(
                "{kind} mode on {} requires {kind} parameters",
                self.timer
            ))
        };

        let mode = match self.mode {
            TimerModeKind::Normal => TimerMode::Normal,
            TimerModeKind::Compare => {
                TimerMode::Compare(self.compare.ok_or_else(|| missing("compare"))?)
            }
            TimerModeKind::Pwm => TimerMode::Pwm(self.pwm.ok_or_else(|| missing("pwm"))?),
            TimerModeKind::InputCapture => {
                TimerMode::InputCapture(self.capture.ok_or_else(|| missing("capture"))?)
            }
        };

        let config = TimerConfig {
            timer: self.timer,
            clock: self.clock,
            interrupts_enabled: self.interrupts_enabled,
            mode,
        };
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(TimerModeKind::Compare)]
    #[case(TimerModeKind::Pwm)]
    #[case(TimerModeKind::InputCapture)]
    fn test_builder_rejects_missing_parameters(#[case] kind: TimerModeKind) {
        let result = TimerConfig::builder(TimerId::Timer1).mode(kind).build();
        assert!(matches!(
            result,
            Err(HardwareError::ConfigurationError { .. })
        ));
    }

    #[test]
    fn test_builder_normal_needs_no_parameters() {
        let config = TimerConfig::builder(TimerId::Timer2)
            .clock(ClockSource::Div128)
            .build()
            .unwrap();
        assert_eq!(config.mode, TimerMode::Normal);
    }

    #[test]
    fn test_builder_ignores_unused_blocks() {
        let config = TimerConfig::builder(TimerId::Timer1)
            .mode(TimerModeKind::Normal)
            .pwm(PwmConfig::new(10))
            .build()
            .unwrap();
        assert_eq!(config.mode.kind(), TimerModeKind::Normal);
    }

    #[rstest]
    #[case(TimerId::Timer0, ClockSource::Div32, false)]
    #[case(TimerId::Timer1, ClockSource::Div128, false)]
    #[case(TimerId::Timer2, ClockSource::Div32, true)]
    #[case(TimerId::Timer0, ClockSource::Div1024, true)]
    #[case(TimerId::Timer1, ClockSource::Stopped, true)]
    fn test_clock_availability(
        #[case] timer: TimerId,
        #[case] clock: ClockSource,
        #[case] valid: bool,
    ) {
        assert_eq!(TimerConfig::normal(timer, clock).validate().is_ok(), valid);
    }

    #[test]
    fn test_compare_width_checks() {
        assert!(TimerConfig::compare(TimerId::Timer0, ClockSource::Div8, 255)
            .validate()
            .is_ok());
        assert!(TimerConfig::compare(TimerId::Timer0, ClockSource::Div8, 256)
            .validate()
            .is_err());
        assert!(TimerConfig::compare(TimerId::Timer1, ClockSource::Div256, 21_900)
            .validate()
            .is_ok());
    }

    #[test]
    fn test_channel_b_only_on_timer1() {
        let mut config = TimerConfig::compare(TimerId::Timer2, ClockSource::Div8, 100);
        config.mode = TimerMode::Compare(
            CompareConfig::new(100).with_channel_b(50, OutputPinPolicy::Toggle),
        );
        assert!(config.validate().is_err());

        config.timer = TimerId::Timer1;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_pwm_duty_bounded_by_top() {
        let mut config = TimerConfig::pwm(TimerId::Timer1, ClockSource::Div8, 500);
        config.mode = TimerMode::Pwm(PwmConfig::new(500).with_top(400));
        assert!(config.validate().is_err());

        config.mode = TimerMode::Pwm(PwmConfig::new(300).with_top(400));
        assert!(config.validate().is_ok());

        let mut config = TimerConfig::pwm(TimerId::Timer0, ClockSource::Div64, 128);
        assert!(config.validate().is_ok());
        config.mode = TimerMode::Pwm(PwmConfig::new(128).with_top(200));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_input_capture_only_on_timer1() {
        let config = TimerConfig::builder(TimerId::Timer0)
            .mode(TimerModeKind::InputCapture)
            .capture(CaptureConfig::default())
            .build();
        assert!(config.is_err());

        let config = TimerConfig::builder(TimerId::Timer1)
            .mode(TimerModeKind::InputCapture)
            .capture(CaptureConfig {
                edge: CaptureEdge::Rising,
            })
            .build()
            .unwrap();
        assert_eq!(
            config.mode,
            TimerMode::InputCapture(CaptureConfig {
                edge: CaptureEdge::Rising
            })
        );
    }

    #[test]
    fn test_mode_serialization() {
        let json = serde_json::to_string(&TimerMode::Compare(CompareConfig::new(7))).unwrap();
        assert!(json.contains("\"kind\":\"compare\""));
        let back: TimerMode = serde_json::from_str(&json).unwrap();
        assert_eq!(back, TimerMode::Compare(CompareConfig::new(7)));
    }
}
