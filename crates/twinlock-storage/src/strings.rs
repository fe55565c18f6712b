//! Terminator-delimited strings on a byte-addressed device.
//!
//! A string occupies its bytes followed by [`STORAGE_TERMINATOR`]. Both
//! directions include the terminator: writing always emits it, reading
//! always consumes it.

use crate::error::{StorageError, StorageResult};
use twinlock_core::constants::STORAGE_TERMINATOR;
use twinlock_hardware::{HardwareError, traits::ByteStorage};

fn offset_address(address: u16, offset: usize) -> StorageResult<u16> {
    u16::try_from(offset)
        .ok()
        .and_then(|offset| address.checked_add(offset))
        .ok_or_else(|| HardwareError::storage(address, "address space exhausted").into())
}

/// Write `bytes` at `address` followed by the terminator.
///
/// # Errors
///
/// Returns [`StorageError::Corrupted`] if `bytes` contains the terminator
/// (it could not be read back), or [`StorageError::Unavailable`] if the
/// device rejects a write.
pub fn write_string<S>(storage: &mut S, address: u16, bytes: &[u8]) -> StorageResult<()>
where
    S: ByteStorage + ?Sized,
{
    if let Some(position) = bytes.iter().position(|&b| b == STORAGE_TERMINATOR) {
        return Err(StorageError::Corrupted {
            address,
            scanned: position,
        });
    }

    for (offset, byte) in bytes.iter().enumerate() {
        storage.write_byte(offset_address(address, offset)?, *byte)?;
    }
    storage.write_byte(offset_address(address, bytes.len())?, STORAGE_TERMINATOR)?;
    Ok(())
}

/// Read a string starting at `address`, up to and including the terminator.
///
/// At most `max_len` bytes may precede the terminator. The returned bytes
/// exclude it.
///
/// # Errors
///
/// Returns [`StorageError::Corrupted`] when no terminator appears within
/// `max_len + 1` bytes.
pub fn read_string<S>(storage: &mut S, address: u16, max_len: usize) -> StorageResult<Vec<u8>>
where
    S: ByteStorage + ?Sized,
{
    let mut bytes = Vec::with_capacity(max_len);
    for offset in 0..=max_len {
        let byte = storage.read_byte(offset_address(address, offset)?)?;
        if byte == STORAGE_TERMINATOR {
            return Ok(bytes);
        }
        bytes.push(byte);
    }

    Err(StorageError::Corrupted {
        address,
        scanned: max_len + 1,
    })
}
