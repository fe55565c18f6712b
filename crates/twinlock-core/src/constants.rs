//! Wire, storage and timing constants shared by both controllers.
//!
//! The two controllers talk over a single byte-oriented serial link with no
//! framing beyond what is defined here. Every reserved byte value below is
//! distinct from the others so a receiver can never confuse a handshake
//! token with a state ordinal, an authentication result, or a payload
//! terminator.
//!
//! # Wire Contract
//!
//! | Byte | Name | Meaning |
//! |------|------|---------|
//! | `0xFF` | [`READY_TOKEN`] | sender is about to become the receiver |
//! | `0x00..=0x05` | system state | [`SystemState`](crate::SystemState) ordinal |
//! | `0x00..=0x03` | gate status | [`GateStatus`](crate::GateStatus) ordinal |
//! | `0x00..=0x01` | option | [`UserOption`](crate::UserOption) ordinal |
//! | `0xCC` | [`CORRECT_PASSWORD`] | credential matched |
//! | `0xBB` | [`WRONG_PASSWORD`] | credential mismatched |
//! | `#` (`0x23`) | [`PAYLOAD_TERMINATOR`] | end of a credential payload |
//!
//! # Non-volatile Layout
//!
//! ```text
//! 0x0001  INITIALIZED_FLAG (0xAA once a credential was stored)
//! 0x0002  credential bytes ... '#'
//! ```
//!
//! # Timing
//!
//! Durations are expressed as tick counts, not computed values. A tick is one
//! hardware timer event; its wall-clock length depends on the CPU frequency,
//! the prescaler and the counter width (or compare value). The nominal
//! figures assume [`CPU_FREQUENCY_HZ`] and the prescalers listed per constant.

// ============================================================================
// Link Protocol
// ============================================================================

/// Handshake token: "I am ready to receive the next protocol step".
pub const READY_TOKEN: u8 = 0xFF;

/// Terminator appended to every credential payload on the wire.
///
/// Must never appear inside a credential.
pub const PAYLOAD_TERMINATOR: u8 = b'#';

/// Authentication result byte for a matching credential.
pub const CORRECT_PASSWORD: u8 = 0xCC;

/// Authentication result byte for a mismatching credential.
pub const WRONG_PASSWORD: u8 = 0xBB;

/// Upper bound on bytes scanned while waiting for a payload terminator.
///
/// A receiver that sees more bytes than this without a terminator gives up
/// instead of accumulating forever.
pub const MAX_PAYLOAD_SCAN: usize = 64;

// ============================================================================
// Credential
// ============================================================================

/// Number of characters in a credential.
pub const CREDENTIAL_LENGTH: usize = 6;

/// Consecutive failed attempts that trigger the alarm.
pub const MAX_FAILED_ATTEMPTS: u8 = 3;

/// Keypad code of the enter key.
pub const ENTER_KEY: u8 = 13;

// ============================================================================
// Non-volatile Storage
// ============================================================================

/// Value of the initialized flag once a credential has been stored.
pub const INITIALIZED_FLAG: u8 = 0xAA;

/// Address of the initialized flag byte.
pub const INITIALIZED_FLAG_ADDRESS: u16 = 0x0001;

/// First address of the stored credential string.
pub const CREDENTIAL_ADDRESS: u16 = 0x0002;

/// Terminator written after the stored credential.
///
/// Same byte as the wire terminator so a stored string and a payload share
/// one framing rule.
pub const STORAGE_TERMINATOR: u8 = PAYLOAD_TERMINATOR;

// ============================================================================
// Timing
// ============================================================================

/// CPU clock the nominal durations are computed for.
pub const CPU_FREQUENCY_HZ: u32 = 8_000_000;

/// Ticks for the gate to travel open or closed.
///
/// Timer1 overflow at F_CPU/256: 65536 * 256 / 8 MHz ≈ 2.1 s per tick,
/// 7 ticks ≈ 15 s.
pub const GATE_TRAVEL_TICKS: u32 = 7;

/// Ticks the gate is held open.
///
/// Timer1 compare match at F_CPU/256 with [`GATE_HOLD_COMPARE_VALUE`]:
/// 21901 * 256 / 8 MHz ≈ 0.7 s per tick, 2 ticks ≈ 1.4 s.
pub const GATE_HOLD_TICKS: u32 = 2;

/// Timer1 compare value used while the gate is held open.
pub const GATE_HOLD_COMPARE_VALUE: u16 = 21_900;

/// Ticks the alarm buzzer stays on.
///
/// Timer1 overflow at F_CPU/1024: 65536 * 1024 / 8 MHz ≈ 8.4 s per tick,
/// 8 ticks ≈ 67 s. Tunable through configuration.
pub const ALARM_TICKS: u32 = 8;

/// Duty value of the motor enable PWM (Timer0, 8-bit, ≈ 50%).
pub const MOTOR_PWM_DUTY: u16 = 128;

/// How long the interface controller keeps an error message on screen.
pub const MESSAGE_PAUSE_MS: u64 = 1_000;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reserved_bytes_are_distinct() {
        let reserved = [
            READY_TOKEN,
            CORRECT_PASSWORD,
            WRONG_PASSWORD,
            PAYLOAD_TERMINATOR,
        ];
        for (i, a) in reserved.iter().enumerate() {
            for b in &reserved[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn test_reserved_bytes_outside_ordinal_space() {
        for byte in [READY_TOKEN, CORRECT_PASSWORD, WRONG_PASSWORD, PAYLOAD_TERMINATOR] {
            assert!(byte > 5, "0x{byte:02X} collides with a state ordinal");
        }
    }

    #[test]
    fn test_storage_layout_does_not_overlap() {
        assert!(CREDENTIAL_ADDRESS > INITIALIZED_FLAG_ADDRESS);
    }
}
