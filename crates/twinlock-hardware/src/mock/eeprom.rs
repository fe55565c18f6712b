//! In-memory byte storage with fault injection.

use crate::{HardwareError, Result, traits::ByteStorage};
use critical_section::Mutex;
use std::{cell::RefCell, fmt, sync::Arc};

/// Erased value of an unwritten cell.
pub const ERASED: u8 = 0xFF;

struct Cells {
    bytes: Vec<u8>,
    fail_reads: bool,
    fail_writes: bool,
    writes: usize,
}

/// Mock EEPROM.
///
/// Clones share the same cells, so a test can keep one clone to inspect or
/// corrupt what the controller stores through another.
///
/// # Examples
///
/// ```
/// use twinlock_hardware::mock::MockEeprom;
/// use twinlock_hardware::traits::ByteStorage;
///
/// let mut eeprom = MockEeprom::new(64);
/// let observer = eeprom.clone();
///
/// eeprom.write_byte(0x0001, 0xAA).unwrap();
/// assert_eq!(observer.peek(0x0001), Some(0xAA));
/// ```
#[derive(Clone)]
pub struct MockEeprom {
    cells: Arc<Mutex<RefCell<Cells>>>,
}

impl MockEeprom {
    /// Create an erased device of `size` bytes.
    pub fn new(size: usize) -> Self {
        Self {
            cells: Arc::new(Mutex::new(RefCell::new(Cells {
                bytes: vec![ERASED; size],
                fail_reads: false,
                fail_writes: false,
                writes: 0,
            }))),
        }
    }

    fn with_cells<R>(&self, f: impl FnOnce(&mut Cells) -> R) -> R {
        critical_section::with(|cs| f(&mut self.cells.borrow_ref_mut(cs)))
    }

    /// Write `bytes` starting at `address` without counting as device writes.
    pub fn preload(&self, address: u16, bytes: &[u8]) {
        self.with_cells(|cells| {
            let start = usize::from(address);
            for (offset, byte) in bytes.iter().enumerate() {
                if let Some(cell) = cells.bytes.get_mut(start + offset) {
                    *cell = *byte;
                }
            }
        });
    }

    /// Read a cell without fault injection.
    pub fn peek(&self, address: u16) -> Option<u8> {
        self.with_cells(|cells| cells.bytes.get(usize::from(address)).copied())
    }

    pub fn fail_reads(&self, fail: bool) {
        self.with_cells(|cells| cells.fail_reads = fail);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.with_cells(|cells| cells.fail_writes = fail);
    }

    /// Number of successful device writes.
    pub fn write_count(&self) -> usize {
        self.with_cells(|cells| cells.writes)
    }
}

impl fmt::Debug for MockEeprom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (size, writes) = self.with_cells(|cells| (cells.bytes.len(), cells.writes));
        f.debug_struct("MockEeprom")
            .field("size", &size)
            .field("writes", &writes)
            .finish()
    }
}

impl ByteStorage for MockEeprom {
    fn read_byte(&mut self, address: u16) -> Result<u8> {
        self.with_cells(|cells| {
            if cells.fail_reads {
                return Err(HardwareError::storage(address, "read fault"));
            }
            cells
                .bytes
                .get(usize::from(address))
                .copied()
                .ok_or_else(|| HardwareError::storage(address, "address out of range"))
        })
    }

    fn write_byte(&mut self, address: u16, value: u8) -> Result<()> {
        self.with_cells(|cells| {
            if cells.fail_writes {
                return Err(HardwareError::storage(address, "write fault"));
            }
            let cell = cells
                .bytes
                .get_mut(usize::from(address))
                .ok_or_else(|| HardwareError::storage(address, "address out of range"))?;
            *cell = value;
            cells.writes += 1;
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_erased_by_default() {
        let mut eeprom = MockEeprom::new(16);
        assert_eq!(eeprom.read_byte(0).unwrap(), ERASED);
        assert_eq!(eeprom.read_byte(15).unwrap(), ERASED);
    }

    #[test]
    fn test_write_read() {
        let mut eeprom = MockEeprom::new(16);
        eeprom.write_byte(3, 0x42).unwrap();
        assert_eq!(eeprom.read_byte(3).unwrap(), 0x42);
        assert_eq!(eeprom.write_count(), 1);
    }

    #[test]
    fn test_out_of_range() {
        let mut eeprom = MockEeprom::new(4);
        assert!(matches!(
            eeprom.read_byte(4),
            Err(HardwareError::StorageUnavailable { address: 4, .. })
        ));
        assert!(eeprom.write_byte(100, 0).is_err());
    }

    #[test]
    fn test_fault_injection() {
        let mut eeprom = MockEeprom::new(8);
        let control = eeprom.clone();

        control.fail_reads(true);
        assert!(eeprom.read_byte(0).is_err());
        control.fail_reads(false);
        assert!(eeprom.read_byte(0).is_ok());

        control.fail_writes(true);
        assert!(eeprom.write_byte(0, 1).is_err());
        assert_eq!(control.peek(0), Some(ERASED));
        assert_eq!(control.write_count(), 0);
    }

    #[test]
    fn test_preload_is_not_a_device_write() {
        let mut eeprom = MockEeprom::new(8);
        eeprom.preload(2, b"ABC");
        assert_eq!(eeprom.read_byte(3).unwrap(), b'B');
        assert_eq!(eeprom.write_count(), 0);
    }
}
