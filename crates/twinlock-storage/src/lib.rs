//! Credential persistence for the authority controller.
//!
//! The credential lives on a byte-addressed non-volatile device behind the
//! [`ByteStorage`](twinlock_hardware::traits::ByteStorage) contract. This
//! crate adds the layout on top of it:
//!
//! - [`strings`]: terminator-delimited string read/write at an address
//! - [`CredentialRepository`]: load/store of the single credential
//! - [`CredentialStore`]: the EEPROM-backed implementation
//!
//! A device that has never held a credential yields `Ok(None)`; a device
//! that fails yields [`StorageError::Unavailable`]. The two are never
//! conflated.

pub mod credential;
pub mod error;
pub mod strings;

pub use credential::{CredentialRepository, CredentialStore};
pub use error::{StorageError, StorageResult};
pub use strings::{read_string, write_string};
