use crate::{
    error::StorageResult,
    strings::{read_string, write_string},
};
use tracing::{debug, warn};
use twinlock_core::{
    Credential,
    constants::{CREDENTIAL_ADDRESS, CREDENTIAL_LENGTH, INITIALIZED_FLAG, INITIALIZED_FLAG_ADDRESS},
};
use twinlock_hardware::traits::ByteStorage;

/// Repository for the single stored credential.
///
/// The authority controller only talks to this trait, so tests can swap the
/// EEPROM-backed store for anything that keeps one credential.
pub trait CredentialRepository: Send {
    /// Whether a credential has ever been stored.
    fn is_initialized(&mut self) -> StorageResult<bool>;

    /// Load the stored credential, `None` if none was stored yet.
    fn load(&mut self) -> StorageResult<Option<Credential>>;

    /// Replace the stored credential.
    fn store(&mut self, credential: &Credential) -> StorageResult<()>;
}

/// Credential persisted on a byte-addressed device.
///
/// Layout:
///
/// ```text
/// INITIALIZED_FLAG_ADDRESS  0xAA once a credential was stored
/// CREDENTIAL_ADDRESS        credential bytes, then '#'
/// ```
///
/// # Examples
///
/// ```
/// use twinlock_core::Credential;
/// use twinlock_hardware::mock::MockEeprom;
/// use twinlock_storage::{CredentialRepository, CredentialStore};
///
/// let mut store = CredentialStore::new(MockEeprom::new(64));
/// assert!(store.load().unwrap().is_none());
///
/// let secret: Credential = "SECRET".parse().unwrap();
/// store.store(&secret).unwrap();
/// assert_eq!(store.load().unwrap(), Some(secret));
/// ```
#[derive(Debug)]
pub struct CredentialStore<S> {
    storage: S,
}

impl<S: ByteStorage> CredentialStore<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn into_inner(self) -> S {
        self.storage
    }
}

impl<S: ByteStorage> CredentialRepository for CredentialStore<S> {
    fn is_initialized(&mut self) -> StorageResult<bool> {
        let flag = self.storage.read_byte(INITIALIZED_FLAG_ADDRESS)?;
        Ok(flag == INITIALIZED_FLAG)
    }

    fn load(&mut self) -> StorageResult<Option<Credential>> {
        if !self.is_initialized()? {
            debug!("No credential stored");
            return Ok(None);
        }

        let bytes = read_string(&mut self.storage, CREDENTIAL_ADDRESS, CREDENTIAL_LENGTH)
            .inspect_err(|e| warn!(error = %e, "Stored credential unreadable"))?;
        Ok(Some(Credential::new(&bytes)?))
    }

    /// Write the credential string, then the flag.
    ///
    /// On a fresh device the flag goes last, so an interrupted first store
    /// leaves the flag clear. Replacing a credential keeps the flag set
    /// throughout; an interrupted replacement can leave a mix of the old and
    /// new strings behind it.
    fn store(&mut self, credential: &Credential) -> StorageResult<()> {
        write_string(&mut self.storage, CREDENTIAL_ADDRESS, credential.as_bytes())?;
        self.storage
            .write_byte(INITIALIZED_FLAG_ADDRESS, INITIALIZED_FLAG)?;
        debug!(len = credential.len(), "Credential stored");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StorageError;
    use twinlock_hardware::mock::MockEeprom;

    fn credential(text: &str) -> Credential {
        text.parse().unwrap()
    }

    #[test]
    fn test_fresh_device_has_no_credential() {
        let mut store = CredentialStore::new(MockEeprom::new(32));

        assert!(!store.is_initialized().unwrap());
        assert_eq!(store.load().unwrap(), None);
    }

    #[test]
    fn test_store_sets_flag_after_string() {
        let eeprom = MockEeprom::new(32);
        let mut store = CredentialStore::new(eeprom.clone());

        store.store(&credential("AAAAAA")).unwrap();

        assert_eq!(eeprom.peek(INITIALIZED_FLAG_ADDRESS), Some(INITIALIZED_FLAG));
        assert_eq!(eeprom.peek(CREDENTIAL_ADDRESS + 6), Some(b'#'));
        assert_eq!(eeprom.write_count(), 8);
        assert!(store.is_initialized().unwrap());
    }

    #[test]
    fn test_overwrite_shorter_credential() {
        let mut store = CredentialStore::new(MockEeprom::new(32));

        store.store(&credential("SECRET")).unwrap();
        store.store(&credential("AB")).unwrap();

        assert_eq!(store.load().unwrap(), Some(credential("AB")));
    }

    #[test]
    fn test_read_fault_is_not_missing_credential() {
        let eeprom = MockEeprom::new(32);
        let mut store = CredentialStore::new(eeprom.clone());
        store.store(&credential("SECRET")).unwrap();

        eeprom.fail_reads(true);
        let err = store.load().unwrap_err();
        assert!(matches!(err, StorageError::Unavailable(_)));
    }

    #[test]
    fn test_flag_without_terminator_is_corrupted() {
        let eeprom = MockEeprom::new(32);
        eeprom.preload(INITIALIZED_FLAG_ADDRESS, &[INITIALIZED_FLAG]);
        eeprom.preload(CREDENTIAL_ADDRESS, b"1234567890");

        let mut store = CredentialStore::new(eeprom);
        assert!(matches!(
            store.load(),
            Err(StorageError::Corrupted { .. })
        ));
    }

    #[test]
    fn test_interrupted_replacement_keeps_flag() {
        let eeprom = MockEeprom::new(32);
        let mut store = CredentialStore::new(eeprom.clone());
        store.store(&credential("SECRET")).unwrap();

        eeprom.fail_writes(true);
        assert!(store.store(&credential("NEWONE")).is_err());
        eeprom.fail_writes(false);
        assert_eq!(store.load().unwrap(), Some(credential("SECRET")));

        // Torn write: the first two bytes of the new string landed.
        eeprom.preload(CREDENTIAL_ADDRESS, b"NE");
        assert!(store.is_initialized().unwrap());
        assert_eq!(store.load().unwrap(), Some(credential("NECRET")));
    }

    #[test]
    fn test_write_fault_leaves_flag_clear() {
        let eeprom = MockEeprom::new(32);
        let mut store = CredentialStore::new(eeprom.clone());

        eeprom.fail_writes(true);
        assert!(store.store(&credential("SECRET")).is_err());

        eeprom.fail_writes(false);
        assert!(!store.is_initialized().unwrap());
    }
}
