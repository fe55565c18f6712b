//! Authority controller: credential storage, gate motor and alarm.
//!
//! The authority owns the session. Every round starts with it waiting for
//! the interface's READY and answering with the current [`SystemState`];
//! the rest of the round depends on that state:
//!
//! | State | Round |
//! |---|---|
//! | `NewPassword` | READY, receive payload, store it |
//! | `ViewOptions` | READY, receive option byte |
//! | `CheckPassword*` | READY, receive payload, compare, await READY, send verdict |
//! | `OpeningGate` | one status byte per gate phase, sent on READY |
//! | `BuzzerOn` | sound the alarm; the interface's next READY waits meanwhile |

use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, error, info, warn};
use twinlock_core::{Credential, GateStatus, SystemState, UserOption};
use twinlock_hardware::{BuzzerDriver, MotorDriver, TimerDriver};
use twinlock_protocol::Link;
use twinlock_storage::{CredentialRepository, StorageError};

use crate::{
    alarm::AlarmTimer,
    auth::{AuthOutcome, Authenticator},
    config::ControllerConfig,
    error::Result,
    gate::GateStateMachine,
    session::{SessionEvent, SessionStateMachine},
};

/// The deciding node.
pub struct AuthorityController<S, R, T, M, B> {
    link: Link<S>,
    credentials: R,
    session: SessionStateMachine,
    auth: Authenticator,
    gate: GateStateMachine<T, M>,
    alarm: AlarmTimer<T, B>,
}

impl<S, R, T, M, B> AuthorityController<S, R, T, M, B>
where
    S: AsyncRead + AsyncWrite + Unpin,
    R: CredentialRepository,
    T: TimerDriver + Clone,
    M: MotorDriver,
    B: BuzzerDriver,
{
    /// Validate `config` and pick the boot state from storage.
    ///
    /// # Errors
    ///
    /// Fails on an invalid configuration or if the initialized flag cannot
    /// be read.
    pub fn new(
        link: Link<S>,
        mut credentials: R,
        driver: T,
        motor: M,
        buzzer: B,
        config: &ControllerConfig,
    ) -> Result<Self> {
        config.validate()?;

        let stored = credentials.is_initialized()?;
        let session = SessionStateMachine::new(stored);
        info!(state = %session.current_state(), stored, "Authority booted");

        Ok(Self {
            link,
            credentials,
            session,
            auth: Authenticator::new(config.lockout_threshold),
            gate: GateStateMachine::new(driver.clone(), motor, config.gate),
            alarm: AlarmTimer::new(driver, buzzer, config.alarm),
        })
    }

    pub fn state(&self) -> SystemState {
        self.session.current_state()
    }

    pub fn gate_status(&self) -> GateStatus {
        self.gate.status()
    }

    pub fn session(&self) -> &SessionStateMachine {
        &self.session
    }

    pub fn authenticator(&self) -> &Authenticator {
        &self.auth
    }

    pub fn credentials(&self) -> &R {
        &self.credentials
    }

    pub fn gate(&self) -> &GateStateMachine<T, M> {
        &self.gate
    }

    pub fn alarm(&self) -> &AlarmTimer<T, B> {
        &self.alarm
    }

    /// Announce the state and run its round.
    ///
    /// Returns the state after the round.
    pub async fn run_round(&mut self) -> Result<SystemState> {
        let state = self.session.current_state();
        self.link.send_state_on_ready(state).await?;
        debug!(%state, "State sent");

        match state {
            SystemState::NewPassword => self.receive_new_password().await?,
            SystemState::ViewOptions => self.receive_option().await?,
            SystemState::CheckPasswordToLogIn | SystemState::CheckPasswordForNewPassword => {
                self.check_password().await?
            }
            SystemState::OpeningGate => self.open_gate().await?,
            SystemState::BuzzerOn => self.sound_alarm().await?,
        }

        Ok(self.session.current_state())
    }

    /// Run rounds until an error stops the loop.
    pub async fn run(&mut self) -> Result<()> {
        loop {
            self.run_round().await?;
        }
    }

    async fn receive_new_password(&mut self) -> Result<()> {
        let payload = self.link.request_payload().await?;

        match Credential::new(&payload) {
            Ok(credential) => {
                self.credentials
                    .store(&credential)
                    .inspect_err(|e| error!(error = %e, "Failed to store credential"))?;
                info!("New credential stored");
                self.session.handle(SessionEvent::CredentialStored)?;
            }
            Err(e) => warn!(error = %e, "Received credential rejected"),
        }
        Ok(())
    }

    async fn receive_option(&mut self) -> Result<()> {
        let byte = self.link.request_option_byte().await?;

        match UserOption::from_u8(byte) {
            Ok(option) => {
                info!(%option, "Option received");
                self.session.handle(SessionEvent::OptionSelected(option))?;
            }
            // Stay in ViewOptions; the interface node returns to its menu too.
            Err(_) => warn!(byte = format_args!("0x{byte:02X}"), "Unknown option byte"),
        }
        Ok(())
    }

    async fn check_password(&mut self) -> Result<()> {
        let payload = self.link.request_payload().await?;

        let stored = self
            .credentials
            .load()
            .inspect_err(|e| error!(error = %e, "Failed to load credential"))?
            .ok_or(StorageError::Missing)?;

        let outcome = match Credential::new(&payload) {
            Ok(submitted) => self.auth.check(&stored, &submitted),
            Err(e) => {
                debug!(error = %e, "Submitted payload is not a credential");
                self.auth.reject()
            }
        };

        self.link.send_auth_result_on_ready(outcome.result()).await?;
        self.session.handle(SessionEvent::Authenticated(outcome))?;

        if let AuthOutcome::Wrong { attempts } = outcome {
            debug!(attempts, "Awaiting retry");
        }
        Ok(())
    }

    async fn open_gate(&mut self) -> Result<()> {
        let mut status = self.gate.begin()?;
        while status != GateStatus::Closed {
            self.link.send_gate_status_on_ready(status).await?;
            self.gate.start_phase()?;
            status = self.gate.finish_phase().await?;
        }

        self.session.handle(SessionEvent::GateClosed)?;
        Ok(())
    }

    async fn sound_alarm(&mut self) -> Result<()> {
        self.alarm.sound().await?;
        self.session.handle(SessionEvent::AlarmElapsed)?;
        Ok(())
    }
}

impl<S, R, T, M, B> std::fmt::Debug for AuthorityController<S, R, T, M, B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthorityController")
            .field("session", &self.session)
            .field("auth", &self.auth)
            .field("gate", &self.gate)
            .field("alarm", &self.alarm)
            .finish()
    }
}
