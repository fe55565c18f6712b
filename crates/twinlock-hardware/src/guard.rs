//! Cell shared between interrupt context and the main loop.
//!
//! Every access runs inside a critical section, so a multi-step update is
//! never observed half-written. Writers wake any task waiting in
//! [`Guarded::wait_while`]; waking is a non-blocking notification and is safe
//! from a timer callback.

use critical_section::Mutex;
use std::{cell::Cell, fmt};
use tokio::sync::Notify;

/// Critical-section protected value with change notification.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use twinlock_hardware::Guarded;
///
/// # #[tokio::main]
/// # async fn main() {
/// let status = Arc::new(Guarded::new(0u8));
///
/// let writer = status.clone();
/// tokio::spawn(async move {
///     writer.set(3);
/// });
///
/// // Main loop blocks on the value changing, not on a fixed delay
/// let seen = status.wait_while(|v| v == 0).await;
/// assert_eq!(seen, 3);
/// # }
/// ```
pub struct Guarded<T: Copy> {
    value: Mutex<Cell<T>>,
    changed: Notify,
}

impl<T: Copy> Guarded<T> {
    pub fn new(value: T) -> Self {
        Self {
            value: Mutex::new(Cell::new(value)),
            changed: Notify::new(),
        }
    }

    pub fn get(&self) -> T {
        critical_section::with(|cs| self.value.borrow(cs).get())
    }

    /// Store `value` and wake waiters.
    pub fn set(&self, value: T) {
        critical_section::with(|cs| self.value.borrow(cs).set(value));
        self.changed.notify_waiters();
    }

    /// Read-modify-write in one critical section, returning the new value.
    pub fn update(&self, f: impl FnOnce(T) -> T) -> T {
        let updated = critical_section::with(|cs| {
            let cell = self.value.borrow(cs);
            let updated = f(cell.get());
            cell.set(updated);
            updated
        });
        self.changed.notify_waiters();
        updated
    }

    /// Wait while `predicate` holds, returning the first value for which it
    /// does not.
    ///
    /// Unbounded: if no writer ever changes the value, this never returns.
    pub async fn wait_while(&self, mut predicate: impl FnMut(T) -> bool) -> T {
        loop {
            let notified = self.changed.notified();
            tokio::pin!(notified);
            // Register before reading so a write between the read and the
            // await is not lost.
            notified.as_mut().enable();

            let value = self.get();
            if !predicate(value) {
                return value;
            }

            notified.await;
        }
    }
}

impl<T: Copy + fmt::Debug> fmt::Debug for Guarded<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Guarded").field(&self.get()).finish()
    }
}

impl<T: Copy + Default> Default for Guarded<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{sync::Arc, time::Duration};

    #[test]
    fn test_get_set_update() {
        let cell = Guarded::new(1u32);
        assert_eq!(cell.get(), 1);

        cell.set(5);
        assert_eq!(cell.get(), 5);

        assert_eq!(cell.update(|v| v * 2), 10);
        assert_eq!(cell.get(), 10);
    }

    #[tokio::test]
    async fn test_wait_while_returns_immediately_when_false() {
        let cell = Guarded::new(7u8);
        assert_eq!(cell.wait_while(|v| v == 0).await, 7);
    }

    #[tokio::test]
    async fn test_wait_while_wakes_on_write_from_other_thread() {
        let cell = Arc::new(Guarded::new(false));
        let writer = cell.clone();

        std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(20));
            writer.set(true);
        });

        let value = tokio::time::timeout(Duration::from_secs(5), cell.wait_while(|v| !v))
            .await
            .unwrap();
        assert!(value);
    }

    #[tokio::test]
    async fn test_wait_while_ignores_irrelevant_writes() {
        let cell = Arc::new(Guarded::new(0u32));
        let writer = cell.clone();

        let waiter = tokio::spawn(async move { cell.wait_while(|v| v < 3).await });

        for v in 1..=3 {
            tokio::task::yield_now().await;
            writer.set(v);
        }

        assert_eq!(waiter.await.unwrap(), 3);
    }
}
