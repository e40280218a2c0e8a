//! Typed access to the stored bearer token, cached user profile and cookies.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::models::User;
use crate::store::{SessionStore, StoreError, StoreKey};

/// Session credential and profile, backed by an injected `SessionStore`.
/// Clone is cheap - the store is shared.
#[derive(Clone)]
pub struct Session {
    store: Arc<dyn SessionStore>,
}

impl Session {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self { store }
    }

    /// Get the stored bearer token, if any
    pub fn token(&self) -> Option<String> {
        match self.store.get(StoreKey::Token) {
            Ok(token) => token.filter(|t| !t.is_empty()),
            Err(e) => {
                warn!(error = %e, "Failed to read token, treating session as signed out");
                None
            }
        }
    }

    /// A token is stored, so the session is possibly authenticated
    pub fn is_present(&self) -> bool {
        self.token().is_some()
    }

    pub fn set_token(&self, token: &str) -> Result<(), StoreError> {
        self.store.set(StoreKey::Token, token)
    }

    /// Cookie header saved from the HTTP client's jar, if any
    pub fn cookies(&self) -> Option<String> {
        match self.store.get(StoreKey::Cookies) {
            Ok(cookies) => cookies.filter(|c| !c.is_empty()),
            Err(e) => {
                warn!(error = %e, "Failed to read saved cookies");
                None
            }
        }
    }

    pub fn set_cookies(&self, cookies: &str) -> Result<(), StoreError> {
        self.store.set(StoreKey::Cookies, cookies)
    }

    /// Get the cached profile. A malformed entry reads as absent.
    pub fn user(&self) -> Option<User> {
        let raw = match self.store.get(StoreKey::User) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!(error = %e, "Failed to read cached user");
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(user) => Some(user),
            Err(e) => {
                warn!(error = %e, "Cached user is not valid JSON, ignoring");
                None
            }
        }
    }

    pub fn set_user(&self, user: &User) -> Result<(), StoreError> {
        let encoded = serde_json::to_string(user)?;
        self.store.set(StoreKey::User, &encoded)
    }

    /// Persist the result of a successful login. Absent parts are left untouched.
    pub fn save_login(&self, token: Option<&str>, user: Option<&User>) -> Result<(), StoreError> {
        if let Some(token) = token {
            self.set_token(token)?;
        }
        if let Some(user) = user {
            self.set_user(user)?;
        }
        Ok(())
    }

    /// Remove the token, the profile and the saved cookies.
    ///
    /// Every removal is attempted even when one fails; the first error is returned.
    pub fn clear(&self) -> Result<(), StoreError> {
        let mut first_error = None;
        for key in StoreKey::ALL {
            if let Err(e) = self.store.remove(key) {
                warn!(key = key.as_str(), error = %e, "Failed to remove session entry");
                first_error.get_or_insert(e);
            }
        }
        debug!("Session cleared");
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
