//! Session state machine.
//!
//! Each controller owns one [`SessionStateMachine`]. The authority applies
//! events and is the source of truth; the interface controller mirrors the
//! state it receives at the start of every round. There is no shared copy.
//!
//! # Transitions
//!
//! | From | Event | To |
//! |---|---|---|
//! | `NewPassword` | credential stored | `ViewOptions` |
//! | `ViewOptions` | option `OpenGate` | `OpeningGate` |
//! | `ViewOptions` | option `CreateNewPassword` | `CheckPasswordForNewPassword` |
//! | `CheckPasswordForNewPassword` | correct credential | `NewPassword` |
//! | `CheckPasswordToLogIn` | correct credential | `ViewOptions` |
//! | either check state | wrong credential | unchanged |
//! | either check state | lockout | `BuzzerOn` |
//! | `OpeningGate` | gate closed | `ViewOptions` |
//! | `BuzzerOn` | alarm elapsed | `CheckPasswordToLogIn` |
//!
//! # Examples
//!
//! ```
//! use twinlock_controller::{AuthOutcome, SessionEvent, SessionStateMachine};
//! use twinlock_core::SystemState;
//!
//! let mut session = SessionStateMachine::new(true);
//! assert_eq!(session.current_state(), SystemState::CheckPasswordToLogIn);
//!
//! session.handle(SessionEvent::Authenticated(AuthOutcome::Correct)).unwrap();
//! assert_eq!(session.current_state(), SystemState::ViewOptions);
//! ```

use std::{
    collections::VecDeque,
    time::{Duration, Instant},
};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use twinlock_core::{Error, Result, SystemState, UserOption};

use crate::auth::AuthOutcome;

/// Transitions kept for inspection.
const MAX_HISTORY_SIZE: usize = 100;

/// Something that happened during a round on the authority.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// A new credential was received and persisted.
    CredentialStored,
    /// The user picked a menu option.
    OptionSelected(UserOption),
    /// A submitted credential was checked.
    Authenticated(AuthOutcome),
    /// The gate finished its cycle.
    GateClosed,
    /// The lockout alarm ran out.
    AlarmElapsed,
}

impl SessionEvent {
    /// Target state for this event in `state`.
    ///
    /// `Ok(None)` means the event leaves the state unchanged.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidStateTransition` for events that cannot occur
    /// in `state`.
    pub fn target(self, state: SystemState) -> Result<Option<SystemState>> {
        use SystemState::*;

        let target = match (state, self) {
            (NewPassword, SessionEvent::CredentialStored) => Some(ViewOptions),
            (ViewOptions, SessionEvent::OptionSelected(UserOption::OpenGate)) => Some(OpeningGate),
            (ViewOptions, SessionEvent::OptionSelected(UserOption::CreateNewPassword)) => {
                Some(CheckPasswordForNewPassword)
            }
            (CheckPasswordForNewPassword, SessionEvent::Authenticated(AuthOutcome::Correct)) => {
                Some(NewPassword)
            }
            (CheckPasswordToLogIn, SessionEvent::Authenticated(AuthOutcome::Correct)) => {
                Some(ViewOptions)
            }
            (s, SessionEvent::Authenticated(AuthOutcome::Wrong { .. })) if s.is_password_check() => {
                None
            }
            (s, SessionEvent::Authenticated(AuthOutcome::Lockout)) if s.is_password_check() => {
                Some(BuzzerOn)
            }
            (OpeningGate, SessionEvent::GateClosed) => Some(ViewOptions),
            (BuzzerOn, SessionEvent::AlarmElapsed) => Some(CheckPasswordToLogIn),
            (state, event) => {
                return Err(Error::InvalidStateTransition {
                    from: state.to_string(),
                    to: format!("{event:?}"),
                });
            }
        };
        Ok(target)
    }
}

/// One recorded state change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionTransition {
    pub from: SystemState,
    pub to: SystemState,

    /// Not serialized; set to the deserialization time when read back.
    #[serde(skip, default = "Instant::now")]
    pub timestamp: Instant,
}

impl SessionTransition {
    pub fn new(from: SystemState, to: SystemState) -> Self {
        Self {
            from,
            to,
            timestamp: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.timestamp.elapsed()
    }
}

/// One controller's copy of the session state.
#[derive(Debug)]
pub struct SessionStateMachine {
    current_state: SystemState,
    state_entered_at: Instant,
    history: VecDeque<SessionTransition>,
}

impl SessionStateMachine {
    /// Machine in the boot state for whether a credential is stored.
    pub fn new(credential_stored: bool) -> Self {
        Self::builder()
            .with_initial_state(SystemState::initial(credential_stored))
            .build()
    }

    pub fn builder() -> SessionStateMachineBuilder {
        SessionStateMachineBuilder::default()
    }

    pub fn current_state(&self) -> SystemState {
        self.current_state
    }

    pub fn time_in_current_state(&self) -> Duration {
        self.state_entered_at.elapsed()
    }

    /// Recent transitions, oldest first.
    pub fn history(&self) -> &VecDeque<SessionTransition> {
        &self.history
    }

    pub fn last_transitions(&self, count: usize) -> Vec<SessionTransition> {
        self.history
            .iter()
            .rev()
            .take(count)
            .rev()
            .cloned()
            .collect()
    }

    /// Apply an event.
    ///
    /// Returns the recorded transition, or `None` if the event keeps the
    /// state (a wrong credential below the lockout threshold).
    pub fn handle(&mut self, event: SessionEvent) -> Result<Option<SessionTransition>> {
        match event.target(self.current_state)? {
            Some(target) => self.transition_to(target).map(Some),
            None => Ok(None),
        }
    }

    /// Move to `new_state`, validating against the transition table.
    pub fn transition_to(&mut self, new_state: SystemState) -> Result<SessionTransition> {
        if !self.current_state.can_transition_to(new_state) {
            return Err(Error::InvalidStateTransition {
                from: self.current_state.to_string(),
                to: new_state.to_string(),
            });
        }

        let transition = SessionTransition::new(self.current_state, new_state);
        self.perform_state_change(transition.clone());
        debug!(from = %transition.from, to = %transition.to, "Session transition");
        Ok(transition)
    }

    /// Adopt a state received from the authority.
    ///
    /// The authority decides; a mirrored state outside the transition table
    /// is logged and taken anyway so the two copies converge.
    pub fn mirror(&mut self, received: SystemState) -> Option<SessionTransition> {
        if received == self.current_state {
            return None;
        }

        if !self.current_state.can_transition_to(received) {
            warn!(
                from = %self.current_state,
                to = %received,
                "Mirroring a state outside the transition table"
            );
        }

        let transition = SessionTransition::new(self.current_state, received);
        self.perform_state_change(transition.clone());
        Some(transition)
    }

    fn perform_state_change(&mut self, transition: SessionTransition) {
        self.current_state = transition.to;
        self.state_entered_at = Instant::now();

        self.history.push_back(transition);
        if self.history.len() > MAX_HISTORY_SIZE {
            self.history.pop_front();
        }
    }
}

/// Builder for [`SessionStateMachine`].
#[derive(Debug)]
pub struct SessionStateMachineBuilder {
    initial_state: SystemState,
    history: VecDeque<SessionTransition>,
}

impl Default for SessionStateMachineBuilder {
    fn default() -> Self {
        Self {
            initial_state: SystemState::NewPassword,
            history: VecDeque::new(),
        }
    }
}

impl SessionStateMachineBuilder {
    pub fn with_initial_state(mut self, state: SystemState) -> Self {
        self.initial_state = state;
        self
    }

    pub fn with_history(mut self, history: VecDeque<SessionTransition>) -> Self {
        self.history = history;
        self
    }

    pub fn build(self) -> SessionStateMachine {
        let mut history = self.history;
        while history.len() > MAX_HISTORY_SIZE {
            history.pop_front();
        }

        SessionStateMachine {
            current_state: self.initial_state,
            state_entered_at: Instant::now(),
            history,
        }
    }
}
