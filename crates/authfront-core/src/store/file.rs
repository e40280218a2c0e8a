use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{SessionStore, StoreError, StoreKey};

/// Session file name in the data directory
const SESSION_FILE: &str = "session.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SessionDocument {
    entries: BTreeMap<String, String>,
    updated_at: DateTime<Utc>,
}

/// Store backed by a single JSON document on disk.
pub struct FileStore {
    dir: PathBuf,
    // Serializes read-modify-write cycles within this process
    lock: Mutex<()>,
}

impl FileStore {
    pub fn new(dir: PathBuf) -> Self {
        Self {
            dir,
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(SESSION_FILE)
    }

    /// When the session document was last written, if it exists
    pub fn updated_at(&self) -> Result<Option<DateTime<Utc>>, StoreError> {
        Ok(self.read()?.map(|doc| doc.updated_at))
    }

    fn read(&self) -> Result<Option<SessionDocument>, StoreError> {
        let path = self.path();
        if !path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(&path)?;
        Ok(Some(serde_json::from_str(&contents)?))
    }

    fn write(&self, entries: BTreeMap<String, String>) -> Result<(), StoreError> {
        let path = self.path();
        if entries.is_empty() {
            if path.exists() {
                std::fs::remove_file(&path)?;
                debug!(path = %path.display(), "Session file removed");
            }
            return Ok(());
        }
        std::fs::create_dir_all(&self.dir)?;
        let doc = SessionDocument {
            entries,
            updated_at: Utc::now(),
        };
        std::fs::write(&path, serde_json::to_string_pretty(&doc)?)?;
        Ok(())
    }

    fn entries(&self) -> Result<BTreeMap<String, String>, StoreError> {
        Ok(self.read()?.map(|doc| doc.entries).unwrap_or_default())
    }
}

impl SessionStore for FileStore {
    fn get(&self, key: StoreKey) -> Result<Option<String>, StoreError> {
        let _guard = self.lock.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(self.entries()?.remove(key.as_str()))
    }

    fn set(&self, key: StoreKey, value: &str) -> Result<(), StoreError> {
        let _guard = self.lock.lock().map_err(|_| StoreError::Poisoned)?;
        let mut entries = self.entries()?;
        entries.insert(key.as_str().to_string(), value.to_string());
        self.write(entries)
    }

    fn remove(&self, key: StoreKey) -> Result<(), StoreError> {
        let _guard = self.lock.lock().map_err(|_| StoreError::Poisoned)?;
        let mut entries = self.entries()?;
        if entries.remove(key.as_str()).is_none() {
            return Ok(());
        }
        self.write(entries)
    }
}
