//! Mock gate motor recording every direction change.

use crate::{
    Result,
    traits::{MotorDirection, MotorDriver},
};
use tokio::sync::{mpsc, watch};

/// Mock motor.
///
/// The current direction is published on a watch channel and every change
/// is appended to a history the [`MockMotorHandle`] can drain.
#[derive(Debug)]
pub struct MockMotor {
    direction_tx: watch::Sender<MotorDirection>,
    history_tx: mpsc::UnboundedSender<MotorDirection>,
}

impl MockMotor {
    pub fn new() -> (Self, MockMotorHandle) {
        let (direction_tx, direction_rx) = watch::channel(MotorDirection::Stopped);
        let (history_tx, history_rx) = mpsc::unbounded_channel();
        (
            Self {
                direction_tx,
                history_tx,
            },
            MockMotorHandle {
                direction_rx,
                history_rx,
            },
        )
    }
}

impl MotorDriver for MockMotor {
    fn set_direction(&mut self, direction: MotorDirection) -> Result<()> {
        self.direction_tx.send_replace(direction);
        // History is best effort once the handle is gone
        let _ = self.history_tx.send(direction);
        Ok(())
    }

    fn direction(&self) -> MotorDirection {
        *self.direction_tx.borrow()
    }
}

/// Observer side of a [`MockMotor`].
#[derive(Debug)]
pub struct MockMotorHandle {
    direction_rx: watch::Receiver<MotorDirection>,
    history_rx: mpsc::UnboundedReceiver<MotorDirection>,
}

impl MockMotorHandle {
    pub fn direction(&self) -> MotorDirection {
        *self.direction_rx.borrow()
    }

    /// Every direction written since the last drain, in order.
    pub fn drain_history(&mut self) -> Vec<MotorDirection> {
        let mut history = Vec::new();
        while let Ok(direction) = self.history_rx.try_recv() {
            history.push(direction);
        }
        history
    }

    /// Wait until the motor is driven in `direction`.
    pub async fn wait_for(&mut self, direction: MotorDirection) -> Result<()> {
        self.direction_rx
            .wait_for(|current| *current == direction)
            .await
            .map(|_| ())
            .map_err(|_| crate::HardwareError::disconnected("Motor dropped"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_records_direction_changes() {
        let (mut motor, mut handle) = MockMotor::new();
        assert_eq!(motor.direction(), MotorDirection::Stopped);

        motor.rotate_clockwise().unwrap();
        motor.stop().unwrap();
        motor.rotate_anticlockwise().unwrap();
        motor.stop().unwrap();

        assert_eq!(handle.direction(), MotorDirection::Stopped);
        assert_eq!(
            handle.drain_history(),
            vec![
                MotorDirection::Forward,
                MotorDirection::Stopped,
                MotorDirection::Reverse,
                MotorDirection::Stopped,
            ]
        );
        assert!(handle.drain_history().is_empty());
    }

    #[tokio::test]
    async fn test_wait_for_direction() {
        let (mut motor, mut handle) = MockMotor::new();

        tokio::spawn(async move {
            tokio::task::yield_now().await;
            motor.rotate_anticlockwise().unwrap();
            // Keep the sender alive until the waiter has seen the change
            tokio::time::sleep(std::time::Duration::from_millis(50)).await;
            drop(motor);
        });

        handle.wait_for(MotorDirection::Reverse).await.unwrap();
        assert_eq!(handle.direction(), MotorDirection::Reverse);
    }

    #[test]
    fn test_motor_survives_dropped_handle() {
        let (mut motor, handle) = MockMotor::new();
        drop(handle);
        assert!(motor.rotate_clockwise().is_ok());
        assert_eq!(motor.direction(), MotorDirection::Forward);
    }
}
