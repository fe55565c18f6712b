//! Interface controller: keypad and LCD on one end of the link.
//!
//! The interface node owns no decisions. Each round it polls the authority
//! for the current [`SystemState`], mirrors it, and runs the matching screen
//! flow, sending whatever the user entered back over the link.

use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, info};
use twinlock_core::{
    AuthResult, Credential, GateStatus, SystemState, UserOption, constants::CREDENTIAL_LENGTH,
};
use twinlock_hardware::{DisplayDevice, KeypadDevice, KeypadInput};
use twinlock_protocol::Link;

use crate::{
    config::{ControllerConfig, UiConfig},
    error::Result,
    session::SessionStateMachine,
};

/// Keypad, display and the mirrored session.
pub struct UiController<S, K, D> {
    link: Link<S>,
    keypad: K,
    display: D,
    session: Option<SessionStateMachine>,
    config: UiConfig,
}

impl<S, K, D> UiController<S, K, D>
where
    S: AsyncRead + AsyncWrite + Unpin,
    K: KeypadDevice,
    D: DisplayDevice,
{
    pub fn new(link: Link<S>, keypad: K, display: D, config: &ControllerConfig) -> Self {
        Self {
            link,
            keypad,
            display,
            session: None,
            config: config.ui,
        }
    }

    /// Last state received from the authority, if any.
    pub fn state(&self) -> Option<SystemState> {
        self.session.as_ref().map(SessionStateMachine::current_state)
    }

    pub fn session(&self) -> Option<&SessionStateMachine> {
        self.session.as_ref()
    }

    pub fn display(&self) -> &D {
        &self.display
    }

    /// Poll the authority for its state and run one screen flow.
    ///
    /// Returns the state the round was run for.
    pub async fn run_round(&mut self) -> Result<SystemState> {
        let state = self.link.request_state().await?;
        debug!(%state, "State received");

        match self.session.as_mut() {
            Some(session) => {
                session.mirror(state);
            }
            None => {
                self.session = Some(SessionStateMachine::builder().with_initial_state(state).build());
            }
        }

        match state {
            SystemState::NewPassword => self.create_new_password().await?,
            SystemState::CheckPasswordToLogIn | SystemState::CheckPasswordForNewPassword => {
                self.submit_password().await?
            }
            SystemState::ViewOptions => self.view_options().await?,
            SystemState::OpeningGate => self.show_gate_progress().await?,
            SystemState::BuzzerOn => self.show_alarm()?,
        }

        Ok(state)
    }

    /// Run rounds until an error stops the loop.
    pub async fn run(&mut self) -> Result<()> {
        loop {
            self.run_round().await?;
        }
    }

    async fn create_new_password(&mut self) -> Result<()> {
        let credential = loop {
            self.show(&["EnterNewPASSWORD"])?;
            let first = self.read_password().await?;

            self.show(&["CONFIRM PASSWORD"])?;
            let second = self.read_password().await?;

            if first == second {
                break first;
            }

            info!("Password confirmation did not match");
            self.show(&["PASSWORDS NOT", "MATCHED!tryAgain"])?;
            self.pause().await;
        };

        self.show(&["SAVING PASSWORD"])?;
        self.link.send_payload_on_ready(credential.as_bytes()).await?;
        self.show(&["PASSWORD SAVED"])?;
        Ok(())
    }

    async fn submit_password(&mut self) -> Result<()> {
        self.show(&["ENTER PASSWORD"])?;
        let credential = self.read_password().await?;

        self.link.send_payload_on_ready(credential.as_bytes()).await?;
        let result = self.link.request_auth_result().await?;
        debug!(?result, "Authentication result");

        if result == AuthResult::Wrong {
            self.show(&["WRONG PASSWORD!!"])?;
            self.pause().await;
        }
        Ok(())
    }

    async fn view_options(&mut self) -> Result<()> {
        self.show(&["0-->OPEN GATE", "1-->NEW PASSWORD"])?;

        let option = loop {
            let input = self.keypad.read_input().await?;
            let Some(digit) = input.as_digit() else {
                continue;
            };
            if let Ok(option) = UserOption::from_u8(digit) {
                break option;
            }
        };

        info!(%option, "Option selected");
        self.link.send_option_on_ready(option).await?;
        Ok(())
    }

    async fn show_gate_progress(&mut self) -> Result<()> {
        loop {
            let status = self.link.request_gate_status().await?;
            debug!(%status, "Gate status received");

            let text = match status {
                GateStatus::Opening => "UNLOCKING",
                GateStatus::Opened => "GATE OPEN",
                GateStatus::Closing => "LOCKING",
                GateStatus::Closed => return Ok(()),
            };
            self.show(&[text])?;

            if status == GateStatus::Closing {
                return Ok(());
            }
        }
    }

    fn show_alarm(&mut self) -> Result<()> {
        self.show(&["THIEF!!!"])
    }

    /// Read exactly one credential from the keypad.
    ///
    /// Each accepted key echoes `*`. Keys past the credential length are
    /// ignored, as is Enter before the credential is complete.
    async fn read_password(&mut self) -> Result<Credential> {
        let mut bytes = Vec::with_capacity(CREDENTIAL_LENGTH);
        loop {
            let input = self.keypad.read_input().await?;
            match input {
                KeypadInput::Enter if bytes.len() == CREDENTIAL_LENGTH => break,
                KeypadInput::Enter => continue,
                _ if bytes.len() == CREDENTIAL_LENGTH => continue,
                _ => {
                    if let Some(byte) = input.as_credential_byte() {
                        bytes.push(byte);
                        self.display.display_char('*')?;
                    }
                }
            }
        }
        Ok(Credential::new(&bytes)?)
    }

    /// Clear the screen and write one line per row.
    fn show(&mut self, rows: &[&str]) -> Result<()> {
        self.display.clear()?;
        for (row, text) in rows.iter().enumerate() {
            self.display.display_string_at(row, 0, text)?;
        }
        if rows.len() == 1 {
            self.display.go_to_row_column(1, 0)?;
        }
        Ok(())
    }

    async fn pause(&self) {
        if self.config.message_pause > Duration::ZERO {
            tokio::time::sleep(self.config.message_pause).await;
        }
    }
}

impl<S, K, D> std::fmt::Debug for UiController<S, K, D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UiController")
            .field(
                "state",
                &self.session.as_ref().map(SessionStateMachine::current_state),
            )
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::VirtualLcd;
    use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream, duplex};
    use twinlock_core::constants::{CORRECT_PASSWORD, READY_TOKEN, WRONG_PASSWORD};
    use twinlock_hardware::mock::{MockKeypad, MockKeypadHandle};
    use twinlock_protocol::LinkConfig;

    fn controller() -> (
        UiController<DuplexStream, MockKeypad, VirtualLcd>,
        MockKeypadHandle,
        DuplexStream,
    ) {
        let (near, far) = duplex(64);
        let (keypad, keys) = MockKeypad::new();
        let config = ControllerConfig {
            ui: UiConfig {
                message_pause: Duration::ZERO,
            },
            ..ControllerConfig::default()
        };
        let ui = UiController::new(
            Link::new(near, LinkConfig::default()),
            keypad,
            VirtualLcd::new(),
            &config,
        );
        (ui, keys, far)
    }

    async fn answer_state(peer: &mut DuplexStream, state: SystemState) {
        assert_eq!(peer.read_u8().await.unwrap(), READY_TOKEN);
        peer.write_u8(state.to_u8()).await.unwrap();
    }

    #[tokio::test]
    async fn test_password_entry_ignores_extra_keys_and_early_enter() {
        let (mut ui, keys, mut peer) = controller();
        keys.type_text("12\n3456789\n").await.unwrap();

        let authority = async {
            answer_state(&mut peer, SystemState::CheckPasswordToLogIn).await;
            peer.write_u8(READY_TOKEN).await.unwrap();
            let mut payload = [0u8; 7];
            peer.read_exact(&mut payload).await.unwrap();
            assert_eq!(peer.read_u8().await.unwrap(), READY_TOKEN);
            peer.write_u8(CORRECT_PASSWORD).await.unwrap();
            payload
        };

        let (state, payload) = tokio::join!(ui.run_round(), authority);
        assert_eq!(state.unwrap(), SystemState::CheckPasswordToLogIn);
        assert_eq!(&payload, b"123456#");
        assert_eq!(ui.display().lines(), vec!["ENTER PASSWORD", "******"]);
    }

    #[tokio::test]
    async fn test_wrong_password_message() {
        let (mut ui, keys, mut peer) = controller();
        keys.send_code("000000").await.unwrap();

        let authority = async {
            answer_state(&mut peer, SystemState::CheckPasswordForNewPassword).await;
            peer.write_u8(READY_TOKEN).await.unwrap();
            let mut payload = [0u8; 7];
            peer.read_exact(&mut payload).await.unwrap();
            assert_eq!(peer.read_u8().await.unwrap(), READY_TOKEN);
            peer.write_u8(WRONG_PASSWORD).await.unwrap();
        };

        let (state, ()) = tokio::join!(ui.run_round(), authority);
        state.unwrap();
        assert_eq!(ui.display().line(0).unwrap(), "WRONG PASSWORD!!");
    }

    #[tokio::test]
    async fn test_new_password_retries_until_confirmed() {
        let (mut ui, keys, mut peer) = controller();
        keys.send_code("111111").await.unwrap();
        keys.send_code("222222").await.unwrap();
        keys.send_code("333333").await.unwrap();
        keys.send_code("333333").await.unwrap();

        let authority = async {
            answer_state(&mut peer, SystemState::NewPassword).await;
            peer.write_u8(READY_TOKEN).await.unwrap();
            let mut payload = [0u8; 7];
            peer.read_exact(&mut payload).await.unwrap();
            payload
        };

        let (state, payload) = tokio::join!(ui.run_round(), authority);
        state.unwrap();
        assert_eq!(&payload, b"333333#");
        assert_eq!(ui.display().line(0).unwrap(), "PASSWORD SAVED");
    }

    #[tokio::test]
    async fn test_view_options_ignores_other_keys() {
        let (mut ui, keys, mut peer) = controller();
        keys.type_text("7*1").await.unwrap();

        let authority = async {
            answer_state(&mut peer, SystemState::ViewOptions).await;
            peer.write_u8(READY_TOKEN).await.unwrap();
            peer.read_u8().await.unwrap()
        };

        let (state, option) = tokio::join!(ui.run_round(), authority);
        state.unwrap();
        assert_eq!(option, UserOption::CreateNewPassword.to_u8());
        assert_eq!(ui.display().lines(), vec!["0-->OPEN GATE", "1-->NEW PASSWORD"]);
    }

    #[tokio::test]
    async fn test_gate_progress_screens() {
        let (mut ui, _keys, mut peer) = controller();
        let mut frames = ui.display().subscribe();

        let authority = async {
            answer_state(&mut peer, SystemState::OpeningGate).await;
            for status in [GateStatus::Opening, GateStatus::Opened, GateStatus::Closing] {
                assert_eq!(peer.read_u8().await.unwrap(), READY_TOKEN);
                peer.write_u8(status.to_u8()).await.unwrap();
            }
        };

        let (state, ()) = tokio::join!(ui.run_round(), authority);
        assert_eq!(state.unwrap(), SystemState::OpeningGate);
        assert_eq!(frames.borrow_and_update()[0], "LOCKING");
    }

    #[tokio::test]
    async fn test_alarm_screen_and_mirror() {
        let (mut ui, _keys, mut peer) = controller();
        assert_eq!(ui.state(), None);

        let authority = answer_state(&mut peer, SystemState::BuzzerOn);
        let (state, ()) = tokio::join!(ui.run_round(), authority);
        state.unwrap();

        assert_eq!(ui.state(), Some(SystemState::BuzzerOn));
        assert_eq!(ui.display().line(0).unwrap(), "THIEF!!!");
    }

    #[tokio::test]
    async fn test_closed_link_stops_round() {
        let (mut ui, _keys, peer) = controller();
        drop(peer);

        let err = ui.run_round().await.unwrap_err();
        assert!(err.is_link_failure());
    }
}
