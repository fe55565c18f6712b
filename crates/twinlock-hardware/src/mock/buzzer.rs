//! Mock alarm buzzer.

use crate::{Result, traits::BuzzerDriver};
use tokio::sync::watch;

/// Mock buzzer publishing its output level.
#[derive(Debug)]
pub struct MockBuzzer {
    level_tx: watch::Sender<bool>,
    activations: u32,
}

impl MockBuzzer {
    pub fn new() -> (Self, MockBuzzerHandle) {
        let (level_tx, level_rx) = watch::channel(false);
        (
            Self {
                level_tx,
                activations: 0,
            },
            MockBuzzerHandle { level_rx },
        )
    }

    /// Number of off → on transitions so far.
    pub fn activations(&self) -> u32 {
        self.activations
    }
}

impl BuzzerDriver for MockBuzzer {
    fn on(&mut self) -> Result<()> {
        if !self.is_on() {
            self.activations += 1;
        }
        self.level_tx.send_replace(true);
        Ok(())
    }

    fn off(&mut self) -> Result<()> {
        self.level_tx.send_replace(false);
        Ok(())
    }

    fn is_on(&self) -> bool {
        *self.level_tx.borrow()
    }
}

/// Observer side of a [`MockBuzzer`].
#[derive(Debug, Clone)]
pub struct MockBuzzerHandle {
    level_rx: watch::Receiver<bool>,
}

impl MockBuzzerHandle {
    pub fn is_on(&self) -> bool {
        *self.level_rx.borrow()
    }

    /// Wait until the output reaches `level`.
    pub async fn wait_for(&mut self, level: bool) -> Result<()> {
        self.level_rx
            .wait_for(|current| *current == level)
            .await
            .map(|_| ())
            .map_err(|_| crate::HardwareError::disconnected("Buzzer dropped"))
    }
}
