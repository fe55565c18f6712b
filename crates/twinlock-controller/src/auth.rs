//! Credential check with a consecutive-failure lockout.

use tracing::{info, warn};
use twinlock_core::{AuthResult, Credential};

/// Result of one credential check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthOutcome {
    Correct,
    /// Mismatch below the lockout threshold.
    Wrong { attempts: u8 },
    /// Mismatch that reached the threshold; the counter is already reset.
    Lockout,
}

impl AuthOutcome {
    /// Byte sent back to the interface controller. A lockout is reported
    /// as a wrong credential.
    pub fn result(self) -> AuthResult {
        match self {
            AuthOutcome::Correct => AuthResult::Correct,
            AuthOutcome::Wrong { .. } | AuthOutcome::Lockout => AuthResult::Wrong,
        }
    }
}

/// Compares submitted credentials and counts consecutive failures.
///
/// The count lives for the authentication session only and is not
/// persisted.
///
/// # Examples
///
/// ```
/// use twinlock_controller::{AuthOutcome, Authenticator};
/// use twinlock_core::Credential;
///
/// let stored: Credential = "SECRET".parse().unwrap();
/// let wrong: Credential = "WRONG1".parse().unwrap();
/// let mut auth = Authenticator::new(3);
///
/// assert_eq!(auth.check(&stored, &wrong), AuthOutcome::Wrong { attempts: 1 });
/// assert_eq!(auth.check(&stored, &wrong), AuthOutcome::Wrong { attempts: 2 });
/// assert_eq!(auth.check(&stored, &wrong), AuthOutcome::Lockout);
/// assert_eq!(auth.failed_attempts(), 0);
/// ```
#[derive(Debug)]
pub struct Authenticator {
    failed_attempts: u8,
    lockout_threshold: u8,
}

impl Authenticator {
    pub fn new(lockout_threshold: u8) -> Self {
        Self {
            failed_attempts: 0,
            lockout_threshold: lockout_threshold.max(1),
        }
    }

    pub fn failed_attempts(&self) -> u8 {
        self.failed_attempts
    }

    pub fn lockout_threshold(&self) -> u8 {
        self.lockout_threshold
    }

    /// Compare `submitted` to `stored` in constant time.
    pub fn check(&mut self, stored: &Credential, submitted: &Credential) -> AuthOutcome {
        if stored == submitted {
            self.failed_attempts = 0;
            info!("Credential accepted");
            return AuthOutcome::Correct;
        }
        self.record_failure()
    }

    /// Count a submission that could not be compared at all, such as a
    /// payload that is not a valid credential.
    pub fn reject(&mut self) -> AuthOutcome {
        self.record_failure()
    }

    fn record_failure(&mut self) -> AuthOutcome {
        self.failed_attempts += 1;

        if self.failed_attempts >= self.lockout_threshold {
            self.failed_attempts = 0;
            warn!(
                threshold = self.lockout_threshold,
                "Too many wrong credentials, locking out"
            );
            return AuthOutcome::Lockout;
        }

        info!(attempts = self.failed_attempts, "Credential rejected");
        AuthOutcome::Wrong {
            attempts: self.failed_attempts,
        }
    }
}
