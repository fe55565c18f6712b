//! The two twinlock controllers.
//!
//! [`AuthorityController`] owns the session, the stored credential, the
//! gate motor and the alarm. [`UiController`] owns the keypad and LCD and
//! mirrors whatever state the authority announces. The two only talk over a
//! [`Link`](twinlock_protocol::Link).
//!
//! Building blocks:
//!
//! - [`SessionStateMachine`]: the validated transition table plus history
//! - [`Authenticator`]: credential comparison with a lockout counter
//! - [`GateStateMachine`]: tick-driven open/hold/close cycle
//! - [`AlarmTimer`]: tick-driven buzzer
//! - [`VirtualLcd`]: 2×16 character display model

pub mod alarm;
pub mod auth;
pub mod authority;
pub mod config;
pub mod display;
pub mod error;
pub mod gate;
pub mod session;
pub mod ui;

pub use alarm::AlarmTimer;
pub use auth::{AuthOutcome, Authenticator};
pub use authority::AuthorityController;
pub use config::{AlarmConfig, ControllerConfig, GateConfig, UiConfig};
pub use display::VirtualLcd;
pub use error::{ControllerError, Result};
pub use gate::GateStateMachine;
pub use session::{SessionEvent, SessionStateMachine, SessionStateMachineBuilder, SessionTransition};
pub use ui::UiController;
