//! Mock keypad fed through a channel.

use crate::{
    HardwareError, Result,
    traits::{KeypadDevice, KeypadInput},
};
use tokio::sync::mpsc;

/// Mock keypad device.
///
/// Input is queued through a [`MockKeypadHandle`].
///
/// # Examples
///
/// ```
/// use twinlock_hardware::mock::MockKeypad;
/// use twinlock_hardware::traits::{KeypadDevice, KeypadInput};
///
/// #[tokio::main]
/// async fn main() -> twinlock_hardware::Result<()> {
///     let (mut keypad, handle) = MockKeypad::new();
///
///     handle.type_text("12\n").await?;
///
///     assert_eq!(keypad.read_input().await?, KeypadInput::Digit(1));
///     assert_eq!(keypad.read_input().await?, KeypadInput::Digit(2));
///     assert_eq!(keypad.read_input().await?, KeypadInput::Enter);
///
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct MockKeypad {
    input_rx: mpsc::Receiver<KeypadInput>,
}

impl MockKeypad {
    /// Create a mock keypad and the handle that feeds it.
    pub fn new() -> (Self, MockKeypadHandle) {
        let (input_tx, input_rx) = mpsc::channel(64);
        (Self { input_rx }, MockKeypadHandle { input_tx })
    }
}

impl KeypadDevice for MockKeypad {
    async fn read_input(&mut self) -> Result<KeypadInput> {
        self.input_rx
            .recv()
            .await
            .ok_or_else(|| HardwareError::disconnected("Keypad input channel closed"))
    }
}

/// Handle for feeding a mock keypad. Cloneable.
#[derive(Debug, Clone)]
pub struct MockKeypadHandle {
    input_tx: mpsc::Sender<KeypadInput>,
}

impl MockKeypadHandle {
    /// Queue one key press.
    ///
    /// # Errors
    ///
    /// Returns an error if the keypad has been dropped.
    pub async fn send_input(&self, input: KeypadInput) -> Result<()> {
        self.input_tx
            .send(input)
            .await
            .map_err(|_| HardwareError::disconnected("Keypad input channel closed"))
    }

    /// Queue one key press per byte of `text`.
    ///
    /// Bytes are mapped with [`KeypadInput::from_text_byte`], so `'\n'` is
    /// Enter and control bytes are rejected.
    ///
    /// # Errors
    ///
    /// Returns an error for unmapped bytes or if the keypad has been dropped.
    pub async fn type_text(&self, text: &str) -> Result<()> {
        for byte in text.bytes() {
            self.send_input(KeypadInput::from_text_byte(byte)?).await?;
        }
        Ok(())
    }

    /// Queue `code` followed by Enter.
    pub async fn send_code(&self, code: &str) -> Result<()> {
        self.type_text(code).await?;
        self.send_input(KeypadInput::Enter).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_keypad_basic_input() {
        let (mut keypad, handle) = MockKeypad::new();

        handle.send_input(KeypadInput::Digit(5)).await.unwrap();

        let input = keypad.read_input().await.unwrap();
        assert_eq!(input, KeypadInput::Digit(5));
    }

    #[tokio::test]
    async fn test_mock_keypad_send_code() {
        let (mut keypad, handle) = MockKeypad::new();

        tokio::spawn(async move {
            handle.send_code("A1*").await.unwrap();
        });

        let expected = [
            KeypadInput::Symbol(b'A'),
            KeypadInput::Digit(1),
            KeypadInput::Symbol(b'*'),
            KeypadInput::Enter,
        ];
        for want in expected {
            assert_eq!(keypad.read_input().await.unwrap(), want);
        }
    }

    #[tokio::test]
    async fn test_mock_keypad_rejects_unmapped_text() {
        let (mut keypad, handle) = MockKeypad::new();
        assert!(handle.type_text("\t").await.is_err());
        assert!(handle.type_text("\u{1}").await.is_err());

        handle.send_input(KeypadInput::Enter).await.unwrap();
        assert_eq!(keypad.read_input().await.unwrap(), KeypadInput::Enter);
    }

    #[tokio::test]
    async fn test_mock_keypad_closed_channel() {
        let (mut keypad, handle) = MockKeypad::new();

        drop(handle);

        let result = keypad.read_input().await;
        assert!(matches!(result, Err(HardwareError::Disconnected { .. })));
    }
}
