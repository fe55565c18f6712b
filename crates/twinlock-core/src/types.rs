use crate::{
    Result,
    constants::{CORRECT_PASSWORD, CREDENTIAL_LENGTH, PAYLOAD_TERMINATOR, WRONG_PASSWORD},
    error::Error,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use subtle::ConstantTimeEq;

/// Session state shared by both controllers.
///
/// Each controller owns its own copy; the copies are reconciled only through
/// the link handshake. The discriminants are the wire encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum SystemState {
    /// No credential yet, or replacing the current one.
    NewPassword = 0,
    /// Credential required before the option menu.
    CheckPasswordToLogIn = 1,
    /// Credential required before replacing it.
    CheckPasswordForNewPassword = 2,
    /// Option menu.
    ViewOptions = 3,
    /// Gate cycle in progress.
    OpeningGate = 4,
    /// Lockout alarm in progress.
    BuzzerOn = 5,
}

impl SystemState {
    /// State a controller boots into.
    ///
    /// # Examples
    ///
    /// ```
    /// use twinlock_core::SystemState;
    ///
    /// assert_eq!(SystemState::initial(false), SystemState::NewPassword);
    /// assert_eq!(SystemState::initial(true), SystemState::CheckPasswordToLogIn);
    /// ```
    #[must_use]
    pub fn initial(credential_stored: bool) -> Self {
        if credential_stored {
            SystemState::CheckPasswordToLogIn
        } else {
            SystemState::NewPassword
        }
    }

    /// Decode a state from its wire ordinal.
    ///
    /// # Errors
    /// Returns `Error::InvalidStateByte` for bytes outside `0..=5`.
    #[inline]
    pub fn from_u8(value: u8) -> Result<Self> {
        match value {
            0 => Ok(SystemState::NewPassword),
            1 => Ok(SystemState::CheckPasswordToLogIn),
            2 => Ok(SystemState::CheckPasswordForNewPassword),
            3 => Ok(SystemState::ViewOptions),
            4 => Ok(SystemState::OpeningGate),
            5 => Ok(SystemState::BuzzerOn),
            _ => Err(Error::InvalidStateByte(value)),
        }
    }

    /// Wire ordinal of this state.
    #[inline]
    #[must_use]
    pub fn to_u8(self) -> u8 {
        self as u8
    }

    /// Returns `true` for both credential check states.
    #[inline]
    #[must_use]
    pub fn is_password_check(self) -> bool {
        matches!(
            self,
            SystemState::CheckPasswordToLogIn | SystemState::CheckPasswordForNewPassword
        )
    }

    /// Check if the authority may move from this state to `target`.
    ///
    /// A failed credential check that does not lock out keeps the state
    /// unchanged, which is not a transition.
    ///
    /// # Examples
    ///
    /// ```
    /// use twinlock_core::SystemState;
    ///
    /// assert!(SystemState::ViewOptions.can_transition_to(SystemState::OpeningGate));
    /// assert!(!SystemState::NewPassword.can_transition_to(SystemState::OpeningGate));
    /// ```
    #[must_use]
    pub fn can_transition_to(self, target: SystemState) -> bool {
        use SystemState::*;

        matches!(
            (self, target),
            (NewPassword, ViewOptions)
                | (ViewOptions, OpeningGate | CheckPasswordForNewPassword)
                | (CheckPasswordForNewPassword, NewPassword | BuzzerOn)
                | (CheckPasswordToLogIn, ViewOptions | BuzzerOn)
                | (OpeningGate, ViewOptions)
                | (BuzzerOn, CheckPasswordToLogIn)
        )
    }
}

impl TryFrom<u8> for SystemState {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        SystemState::from_u8(value)
    }
}

impl fmt::Display for SystemState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SystemState::NewPassword => "NewPassword",
            SystemState::CheckPasswordToLogIn => "CheckPasswordToLogIn",
            SystemState::CheckPasswordForNewPassword => "CheckPasswordForNewPassword",
            SystemState::ViewOptions => "ViewOptions",
            SystemState::OpeningGate => "OpeningGate",
            SystemState::BuzzerOn => "BuzzerOn",
        };
        write!(f, "{name}")
    }
}

/// Physical gate position, owned by the authority controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum GateStatus {
    #[default]
    Closed = 0,
    Opening = 1,
    Opened = 2,
    Closing = 3,
}

impl GateStatus {
    /// Decode a gate status from its wire ordinal.
    ///
    /// # Errors
    /// Returns `Error::InvalidGateStatusByte` for bytes outside `0..=3`.
    #[inline]
    pub fn from_u8(value: u8) -> Result<Self> {
        match value {
            0 => Ok(GateStatus::Closed),
            1 => Ok(GateStatus::Opening),
            2 => Ok(GateStatus::Opened),
            3 => Ok(GateStatus::Closing),
            _ => Err(Error::InvalidGateStatusByte(value)),
        }
    }

    #[inline]
    #[must_use]
    pub fn to_u8(self) -> u8 {
        self as u8
    }

    /// Next status in the Closed → Opening → Opened → Closing → Closed cycle.
    #[must_use]
    pub fn next(self) -> Self {
        match self {
            GateStatus::Closed => GateStatus::Opening,
            GateStatus::Opening => GateStatus::Opened,
            GateStatus::Opened => GateStatus::Closing,
            GateStatus::Closing => GateStatus::Closed,
        }
    }
}

impl TryFrom<u8> for GateStatus {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        GateStatus::from_u8(value)
    }
}

impl fmt::Display for GateStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GateStatus::Closed => write!(f, "Closed"),
            GateStatus::Opening => write!(f, "Opening"),
            GateStatus::Opened => write!(f, "Opened"),
            GateStatus::Closing => write!(f, "Closing"),
        }
    }
}

/// Menu option picked on the interface controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum UserOption {
    OpenGate = 0,
    CreateNewPassword = 1,
}

impl UserOption {
    /// # Errors
    /// Returns `Error::InvalidOptionByte` for bytes other than 0 and 1.
    #[inline]
    pub fn from_u8(value: u8) -> Result<Self> {
        match value {
            0 => Ok(UserOption::OpenGate),
            1 => Ok(UserOption::CreateNewPassword),
            _ => Err(Error::InvalidOptionByte(value)),
        }
    }

    #[inline]
    #[must_use]
    pub fn to_u8(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for UserOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserOption::OpenGate => write!(f, "OpenGate"),
            UserOption::CreateNewPassword => write!(f, "CreateNewPassword"),
        }
    }
}

/// Authentication verdict as carried on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthResult {
    Correct,
    Wrong,
}

impl AuthResult {
    /// # Errors
    /// Returns `Error::InvalidAuthResultByte` for anything but `0xCC`/`0xBB`.
    #[inline]
    pub fn from_u8(value: u8) -> Result<Self> {
        match value {
            CORRECT_PASSWORD => Ok(AuthResult::Correct),
            WRONG_PASSWORD => Ok(AuthResult::Wrong),
            _ => Err(Error::InvalidAuthResultByte(value)),
        }
    }

    #[inline]
    #[must_use]
    pub fn to_u8(self) -> u8 {
        match self {
            AuthResult::Correct => CORRECT_PASSWORD,
            AuthResult::Wrong => WRONG_PASSWORD,
        }
    }

    #[inline]
    #[must_use]
    pub fn is_correct(self) -> bool {
        matches!(self, AuthResult::Correct)
    }
}

/// Credential of up to [`CREDENTIAL_LENGTH`] characters.
///
/// Stored in plaintext; compared in constant time.
///
/// # Examples
///
/// ```
/// use twinlock_core::Credential;
///
/// let credential = Credential::new(b"SECRET").unwrap();
/// assert_eq!(credential.as_bytes(), b"SECRET");
///
/// // The terminator can never be part of a credential
/// assert!(Credential::new(b"AB#CD").is_err());
/// ```
#[derive(Clone, Copy, Eq)]
pub struct Credential {
    bytes: [u8; CREDENTIAL_LENGTH],
    len: u8,
}

impl Credential {
    /// Create a credential with validation.
    ///
    /// # Errors
    /// Returns `Error::InvalidCredential` if:
    /// - More than [`CREDENTIAL_LENGTH`] bytes are given
    /// - A byte is the payload terminator or `0x00`
    pub fn new(bytes: &[u8]) -> Result<Self> {
        if bytes.len() > CREDENTIAL_LENGTH {
            return Err(Error::InvalidCredential(format!(
                "at most {CREDENTIAL_LENGTH} characters, got {}",
                bytes.len()
            )));
        }

        if let Some(position) = bytes.iter().position(|&b| !Self::is_valid_byte(b)) {
            return Err(Error::InvalidCredential(format!(
                "reserved byte 0x{:02X} at position {position}",
                bytes[position]
            )));
        }

        let mut buffer = [0u8; CREDENTIAL_LENGTH];
        buffer[..bytes.len()].copy_from_slice(bytes);

        Ok(Credential {
            bytes: buffer,
            len: bytes.len() as u8,
        })
    }

    /// Returns `true` if `byte` may appear inside a credential.
    #[inline]
    #[must_use]
    pub fn is_valid_byte(byte: u8) -> bool {
        byte != PAYLOAD_TERMINATOR && byte != 0
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len as usize]
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.len as usize
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Constant-time comparison over the full fixed-length buffer.
impl PartialEq for Credential {
    fn eq(&self, other: &Self) -> bool {
        let same_len = self.len.ct_eq(&other.len);
        let same_bytes = self.bytes.ct_eq(&other.bytes);
        (same_len & same_bytes).into()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Credential({})", "*".repeat(self.len()))
    }
}

impl TryFrom<&[u8]> for Credential {
    type Error = Error;

    fn try_from(bytes: &[u8]) -> Result<Self> {
        Credential::new(bytes)
    }
}

impl std::str::FromStr for Credential {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Credential::new(s.as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(SystemState::NewPassword, SystemState::ViewOptions)]
    #[case(SystemState::ViewOptions, SystemState::OpeningGate)]
    #[case(SystemState::ViewOptions, SystemState::CheckPasswordForNewPassword)]
    #[case(SystemState::CheckPasswordForNewPassword, SystemState::NewPassword)]
    #[case(SystemState::CheckPasswordToLogIn, SystemState::ViewOptions)]
    #[case(SystemState::CheckPasswordToLogIn, SystemState::BuzzerOn)]
    #[case(SystemState::CheckPasswordForNewPassword, SystemState::BuzzerOn)]
    #[case(SystemState::OpeningGate, SystemState::ViewOptions)]
    #[case(SystemState::BuzzerOn, SystemState::CheckPasswordToLogIn)]
    fn test_allowed_transitions(#[case] from: SystemState, #[case] to: SystemState) {
        assert!(from.can_transition_to(to));
    }

    #[rstest]
    #[case(SystemState::NewPassword, SystemState::OpeningGate)]
    #[case(SystemState::CheckPasswordToLogIn, SystemState::NewPassword)]
    #[case(SystemState::BuzzerOn, SystemState::ViewOptions)]
    #[case(SystemState::OpeningGate, SystemState::BuzzerOn)]
    #[case(SystemState::ViewOptions, SystemState::ViewOptions)]
    fn test_rejected_transitions(#[case] from: SystemState, #[case] to: SystemState) {
        assert!(!from.can_transition_to(to));
    }

    #[rstest]
    #[case(0, SystemState::NewPassword)]
    #[case(1, SystemState::CheckPasswordToLogIn)]
    #[case(2, SystemState::CheckPasswordForNewPassword)]
    #[case(3, SystemState::ViewOptions)]
    #[case(4, SystemState::OpeningGate)]
    #[case(5, SystemState::BuzzerOn)]
    fn test_system_state_ordinals(#[case] byte: u8, #[case] state: SystemState) {
        assert_eq!(SystemState::from_u8(byte).unwrap(), state);
        assert_eq!(state.to_u8(), byte);
    }

    #[test]
    fn test_system_state_rejects_unknown_byte() {
        assert_eq!(
            SystemState::from_u8(6),
            Err(Error::InvalidStateByte(6))
        );
        assert!(SystemState::try_from(0xFF).is_err());
    }

    #[test]
    fn test_password_check_states() {
        assert!(SystemState::CheckPasswordToLogIn.is_password_check());
        assert!(SystemState::CheckPasswordForNewPassword.is_password_check());
        assert!(!SystemState::ViewOptions.is_password_check());
    }

    #[test]
    fn test_gate_status_cycle() {
        let mut status = GateStatus::Closed;
        let mut visited = vec![status];
        for _ in 0..4 {
            status = status.next();
            visited.push(status);
        }
        assert_eq!(
            visited,
            vec![
                GateStatus::Closed,
                GateStatus::Opening,
                GateStatus::Opened,
                GateStatus::Closing,
                GateStatus::Closed,
            ]
        );
    }

    #[test]
    fn test_gate_status_wire_bytes() {
        assert_eq!(GateStatus::Opened.to_u8(), 2);
        assert_eq!(GateStatus::from_u8(3).unwrap(), GateStatus::Closing);
        assert!(GateStatus::from_u8(4).is_err());
    }

    #[test]
    fn test_user_option_bytes() {
        assert_eq!(UserOption::from_u8(0).unwrap(), UserOption::OpenGate);
        assert_eq!(UserOption::from_u8(1).unwrap(), UserOption::CreateNewPassword);
        assert_eq!(UserOption::from_u8(2), Err(Error::InvalidOptionByte(2)));
    }

    #[test]
    fn test_auth_result_bytes() {
        assert_eq!(AuthResult::Correct.to_u8(), 0xCC);
        assert_eq!(AuthResult::Wrong.to_u8(), 0xBB);
        assert_eq!(AuthResult::from_u8(0xCC).unwrap(), AuthResult::Correct);
        assert!(AuthResult::from_u8(0xFF).is_err());
    }

    #[rstest]
    #[case(b"")]
    #[case(b"A")]
    #[case(b"123456")]
    #[case(b"SECRET")]
    fn test_credential_accepts_valid(#[case] bytes: &[u8]) {
        let credential = Credential::new(bytes).unwrap();
        assert_eq!(credential.as_bytes(), bytes);
        assert_eq!(credential.len(), bytes.len());
    }

    #[rstest]
    #[case(b"1234567")]
    #[case(b"12#456")]
    #[case(b"12\x00456")]
    fn test_credential_rejects_invalid(#[case] bytes: &[u8]) {
        assert!(matches!(
            Credential::new(bytes),
            Err(Error::InvalidCredential(_))
        ));
    }

    #[test]
    fn test_credential_equality() {
        let a: Credential = "SECRET".parse().unwrap();
        let b = Credential::new(b"SECRET").unwrap();
        let c = Credential::new(b"SECRE").unwrap();
        let d = Credential::new(b"WRONG1").unwrap();

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, d);
    }

    #[test]
    fn test_credential_debug_is_redacted() {
        let credential = Credential::new(b"SECRET").unwrap();
        assert_eq!(format!("{credential:?}"), "Credential(******)");
    }

    #[test]
    fn test_state_serialization() {
        let serialized = serde_json::to_string(&SystemState::BuzzerOn).unwrap();
        assert_eq!(serialized, "\"buzzer_on\"");
    }
}
