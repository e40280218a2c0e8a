use std::collections::HashMap;
use std::sync::Mutex;

use keyring::Entry;

use super::{SessionStore, StoreError, StoreKey};

const SERVICE_NAME: &str = "authfront";

/// Store backed by the OS keychain, one entry per key.
pub struct KeyringStore {
    service: String,
    // Entries are opened once and reused
    entries: Mutex<HashMap<StoreKey, Entry>>,
}

impl KeyringStore {
    pub fn new() -> Self {
        Self::with_service(SERVICE_NAME)
    }

    pub fn with_service(service: &str) -> Self {
        Self {
            service: service.to_string(),
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn with_entry<T>(
        &self,
        key: StoreKey,
        f: impl FnOnce(&Entry) -> keyring::Result<T>,
    ) -> Result<keyring::Result<T>, StoreError> {
        let mut entries = self.entries.lock().map_err(|_| StoreError::Poisoned)?;
        let entry = match entries.entry(key) {
            std::collections::hash_map::Entry::Occupied(e) => e.into_mut(),
            std::collections::hash_map::Entry::Vacant(v) => {
                v.insert(Entry::new(&self.service, key.as_str())?)
            }
        };
        Ok(f(&*entry))
    }
}

impl Default for KeyringStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore for KeyringStore {
    /// Retrieve a value from the OS keychain
    fn get(&self, key: StoreKey) -> Result<Option<String>, StoreError> {
        match self.with_entry(key, |entry| entry.get_password())? {
            Ok(value) => Ok(Some(value)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Store a value in the OS keychain
    fn set(&self, key: StoreKey, value: &str) -> Result<(), StoreError> {
        self.with_entry(key, |entry| entry.set_password(value))??;
        Ok(())
    }

    /// Delete a value from the OS keychain
    fn remove(&self, key: StoreKey) -> Result<(), StoreError> {
        match self.with_entry(key, |entry| entry.delete_credential())? {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
