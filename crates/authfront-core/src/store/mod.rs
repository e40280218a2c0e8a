//! Persistent key-value storage for the session.
//!
//! The front-end keeps the bearer `token`, the JSON-encoded `user` profile,
//! and the HTTP client's `cookies` so the refresh cookie outlives the
//! process. `SessionStore` abstracts where they live so
//! the session can be backed by a file, the OS keychain, or memory in tests.

pub mod file;
pub mod keychain;
pub mod memory;

use thiserror::Error;

pub use self::file::FileStore;
pub use self::keychain::KeyringStore;
pub use self::memory::MemoryStore;

/// Keys held by the session store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StoreKey {
    Token,
    User,
    Cookies,
}

impl StoreKey {
    pub const ALL: [StoreKey; 3] = [StoreKey::Token, StoreKey::User, StoreKey::Cookies];

    /// Storage name of the key
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreKey::Token => "token",
            StoreKey::User => "user",
            StoreKey::Cookies => "cookies",
        }
    }
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Session file I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Session file is malformed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Keychain access failed: {0}")]
    Keyring(#[from] keyring::Error),

    #[error("Session store lock poisoned")]
    Poisoned,
}

/// Get/set/remove capability over the session's key-value storage.
///
/// Removing a key that is not present succeeds.
pub trait SessionStore: Send + Sync {
    fn get(&self, key: StoreKey) -> Result<Option<String>, StoreError>;

    fn set(&self, key: StoreKey, value: &str) -> Result<(), StoreError>;

    fn remove(&self, key: StoreKey) -> Result<(), StoreError>;
}
